//! Bearer token claims.
//!
//! The client never holds the signing key, so decoding only reads the
//! claims. Mock mode signs its own tokens with a fixed key.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::error::Result;
use crate::model::JwtPayload;

const MOCK_SIGNING_KEY: &[u8] = b"tickly-mock-signing-key";

/// Lifetime of tokens issued in mock mode.
pub const MOCK_TOKEN_LIFETIME_HOURS: i64 = 24;

/// Reads the claims of `token` without checking its signature or expiry.
pub fn decode_payload(token: &str) -> Result<JwtPayload> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<JwtPayload>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

/// Signs `payload` as a mock token valid for 24 hours from `now`.
pub fn issue_mock_token(payload: JwtPayload, now: DateTime<Utc>) -> Result<String> {
    let exp = now + Duration::hours(MOCK_TOKEN_LIFETIME_HOURS);
    let claims = payload.issued(now.timestamp(), exp.timestamp());
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(MOCK_SIGNING_KEY),
    )?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn issued_token_decodes_back() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let payload = JwtPayload::new("admin@example.com", 1, "STRUCTURE_ADMINISTRATOR")
            .with_structure(Some(4), false);

        let token = issue_mock_token(payload, now).unwrap();
        let decoded = decode_payload(&token).unwrap();

        assert_eq!(decoded.sub(), "admin@example.com");
        assert_eq!(*decoded.structure_id(), Some(4));
        assert_eq!(*decoded.iat(), Some(now.timestamp()));
        assert_eq!(*decoded.exp(), Some(now.timestamp() + 24 * 3600));
        assert!(!decoded.is_expired_at(now + Duration::hours(23)));
        assert!(decoded.is_expired_at(now + Duration::hours(24)));
    }

    #[test]
    fn expired_tokens_still_decode() {
        let long_ago = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        let token = issue_mock_token(JwtPayload::new("x@y.z", 2, "SPECTATOR"), long_ago).unwrap();
        let decoded = decode_payload(&token).unwrap();
        assert!(decoded.is_expired_at(Utc::now()));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_payload("not-a-jwt").is_err());
        assert!(decode_payload("a.b.c").is_err());
    }
}
