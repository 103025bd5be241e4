use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use getset::Getters;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Spectator,
    StructureAdministrator,
    ReservationService,
    OrganizationService,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Spectator => "SPECTATOR",
            UserRole::StructureAdministrator => "STRUCTURE_ADMINISTRATOR",
            UserRole::ReservationService => "RESERVATION_SERVICE",
            UserRole::OrganizationService => "ORGANIZATION_SERVICE",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SPECTATOR" => Ok(UserRole::Spectator),
            "STRUCTURE_ADMINISTRATOR" => Ok(UserRole::StructureAdministrator),
            "RESERVATION_SERVICE" => Ok(UserRole::ReservationService),
            "ORGANIZATION_SERVICE" => Ok(UserRole::OrganizationService),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// The user registers as a structure administrator and still has to
    /// create their structure.
    #[serde(default)]
    pub create_structure: bool,
}

/// Body returned by `/auth/login`, `/auth/register` and `/auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
#[getset(get = "pub")]
pub struct AuthResponse {
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    needs_structure_setup: bool,
    user_id: u64,
    role: String,
}

impl AuthResponse {
    pub fn new(token: String, user_id: u64, role: &str, needs_structure_setup: bool) -> Self {
        Self {
            token,
            refresh_token: None,
            needs_structure_setup,
            user_id,
            role: role.to_owned(),
        }
    }
}

/// Claims carried by the bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
#[getset(get = "pub")]
pub struct JwtPayload {
    /// The user's email.
    sub: String,
    user_id: u64,
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    needs_structure_setup: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    structure_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

impl JwtPayload {
    pub fn new(sub: &str, user_id: u64, role: &str) -> Self {
        Self {
            sub: sub.to_owned(),
            user_id,
            role: role.to_owned(),
            needs_structure_setup: None,
            structure_id: None,
            iat: None,
            exp: None,
        }
    }

    pub fn with_structure(mut self, structure_id: Option<u64>, needs_setup: bool) -> Self {
        self.structure_id = structure_id;
        self.needs_structure_setup = Some(needs_setup);
        self
    }

    pub fn issued(mut self, iat: i64, exp: i64) -> Self {
        self.iat = Some(iat);
        self.exp = Some(exp);
        self
    }

    pub fn needs_setup(&self) -> bool {
        self.needs_structure_setup == Some(true)
    }

    pub fn user_role(&self) -> Option<UserRole> {
        self.role.parse().ok()
    }

    /// A token is expired once `exp * 1000 <= now` in milliseconds. A token
    /// without `exp` counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.exp {
            Some(exp) => exp.saturating_mul(1000) <= now.timestamp_millis(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn expiry_boundaries() {
        let payload = JwtPayload::new("a@b.c", 1, "SPECTATOR").issued(0, 1_000);
        let at = |ms: i64| Utc.timestamp_millis_opt(ms).unwrap();

        assert!(!payload.is_expired_at(at(999_999)));
        assert!(payload.is_expired_at(at(1_000_000)));
        assert!(payload.is_expired_at(at(1_000_001)));
    }

    #[test]
    fn missing_exp_is_expired() {
        let payload = JwtPayload::new("a@b.c", 1, "SPECTATOR");
        assert!(payload.is_expired_at(Utc.timestamp_opt(0, 0).unwrap()));
    }

    #[test]
    fn role_round_trips_through_wire_name() {
        for role in [
            UserRole::Spectator,
            UserRole::StructureAdministrator,
            UserRole::ReservationService,
            UserRole::OrganizationService,
        ] {
            assert_eq!(role.as_str().parse::<UserRole>(), Ok(role));
        }
        assert!("ADMIN".parse::<UserRole>().is_err());
    }
}
