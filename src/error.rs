use std::fmt;

use thiserror::Error;

const MSG_BAD_CREDENTIALS: &str = "Email ou mot de passe incorrect.";
const MSG_DUPLICATE_EMAIL: &str = "Cette adresse email est déjà utilisée.";
const MSG_INVALID_PAYLOAD: &str = "Données invalides. Veuillez vérifier les champs.";
const MSG_FORBIDDEN: &str =
    "Vous n'avez pas les droits nécessaires pour effectuer cette action.";
const MSG_NOT_FOUND: &str = "La ressource demandée n'existe pas.";
const MSG_EVENT_NOT_FOUND: &str = "Événement non trouvé.";
const MSG_TICKET_NOT_FOUND: &str = "Billet ou réservation non trouvé(e).";
const MSG_TICKET_FORBIDDEN: &str = "Action non autorisée sur ce billet/cette réservation.";
const MSG_TICKET_INVALID: &str = "Données de réservation ou de billet invalides.";
const MSG_TICKET_CONFLICT: &str = "Conflit lors de l'opération de billetterie (ex: plus de places disponibles, billet déjà utilisé).";
const MSG_SESSION_REQUIRED: &str = "Vous devez être connecté pour effectuer cette action.";
const MSG_GENERIC: &str = "Une erreur technique est survenue. Veuillez réessayer plus tard.";
const MSG_UNREACHABLE: &str =
    "Impossible de communiquer avec le serveur. Vérifiez votre connexion internet.";

/// Which family of calls produced an API error. Drives the user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiContext {
    Login,
    Register,
    Refresh,
    PasswordReset,
    Event,
    Structure,
    Statistics,
    Ticket,
}

impl fmt::Display for ApiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiContext::Login => "login",
            ApiContext::Register => "register",
            ApiContext::Refresh => "refresh",
            ApiContext::PasswordReset => "password-reset",
            ApiContext::Event => "event",
            ApiContext::Structure => "structure",
            ApiContext::Statistics => "statistics",
            ApiContext::Ticket => "ticket",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        context: ApiContext,
    },

    #[error("Impossible de communiquer avec le serveur. Vérifiez votre connexion internet.")]
    Transport(#[from] reqwest::Error),

    #[error("JSON (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Input refused before any request was sent.
    #[error("{0}")]
    Invalid(String),

    #[error("Vous devez être connecté pour effectuer cette action.")]
    NotAuthenticated,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds an API error from a status code, picking the user-facing message
    /// for that status in the given context. `server_message` is the `message`
    /// field of the error body, when the back end sent one.
    pub fn from_status(status: u16, context: ApiContext, server_message: Option<&str>) -> Self {
        Error::Api {
            status,
            message: user_message(status, context, server_message),
            context,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_status(&self, code: u16) -> bool {
        self.status() == Some(code)
    }
}

/// Maps an HTTP status to the message shown to the user.
pub fn user_message(status: u16, context: ApiContext, server_message: Option<&str>) -> String {
    let server_message = server_message.map(str::trim).filter(|m| !m.is_empty());
    let msg = match (status, context) {
        (401, ApiContext::Login) => MSG_BAD_CREDENTIALS,
        (401, _) => MSG_SESSION_REQUIRED,
        (409, ApiContext::Register) => return server_message.unwrap_or(MSG_DUPLICATE_EMAIL).to_owned(),
        (409, ApiContext::Ticket) => return server_message.unwrap_or(MSG_TICKET_CONFLICT).to_owned(),
        (400, ApiContext::Ticket) => return server_message.unwrap_or(MSG_TICKET_INVALID).to_owned(),
        (403, ApiContext::Ticket) => MSG_TICKET_FORBIDDEN,
        (404, ApiContext::Ticket) => MSG_TICKET_NOT_FOUND,
        (400, _) => return server_message.unwrap_or(MSG_INVALID_PAYLOAD).to_owned(),
        (403, _) => MSG_FORBIDDEN,
        (404, ApiContext::Event) => MSG_EVENT_NOT_FOUND,
        (404, _) => MSG_NOT_FOUND,
        (0, _) => MSG_UNREACHABLE,
        _ => MSG_GENERIC,
    };
    msg.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_unauthorized_is_bad_credentials() {
        let err = Error::from_status(401, ApiContext::Login, Some("nope"));
        assert_eq!(err.to_string(), MSG_BAD_CREDENTIALS);
        assert!(err.is_status(401));
    }

    #[test]
    fn duplicate_email_prefers_server_message() {
        assert_eq!(
            user_message(409, ApiContext::Register, Some("Email déjà pris")),
            "Email déjà pris"
        );
        assert_eq!(user_message(409, ApiContext::Register, None), MSG_DUPLICATE_EMAIL);
        assert_eq!(user_message(409, ApiContext::Register, Some("  ")), MSG_DUPLICATE_EMAIL);
    }

    #[test]
    fn conflict_outside_register_is_generic() {
        assert_eq!(user_message(409, ApiContext::Event, None), MSG_GENERIC);
    }

    #[test]
    fn fixed_statuses() {
        assert_eq!(user_message(400, ApiContext::Event, None), MSG_INVALID_PAYLOAD);
        assert_eq!(user_message(403, ApiContext::Structure, None), MSG_FORBIDDEN);
        assert_eq!(user_message(404, ApiContext::Structure, None), MSG_NOT_FOUND);
        assert_eq!(user_message(404, ApiContext::Event, None), MSG_EVENT_NOT_FOUND);
        assert_eq!(user_message(500, ApiContext::Login, None), MSG_GENERIC);
        assert_eq!(user_message(0, ApiContext::Statistics, None), MSG_UNREACHABLE);
    }

    #[test]
    fn ticket_messages() {
        assert_eq!(user_message(404, ApiContext::Ticket, None), MSG_TICKET_NOT_FOUND);
        assert_eq!(user_message(403, ApiContext::Ticket, None), MSG_TICKET_FORBIDDEN);
        assert_eq!(user_message(400, ApiContext::Ticket, None), MSG_TICKET_INVALID);
        assert_eq!(user_message(409, ApiContext::Ticket, None), MSG_TICKET_CONFLICT);
        assert_eq!(
            user_message(409, ApiContext::Ticket, Some("Billet déjà utilisé.")),
            "Billet déjà utilisé."
        );
    }
}
