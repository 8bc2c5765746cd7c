//! Error types for Tootcast

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TootcastError>;

#[derive(Error, Debug)]
pub enum TootcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication failed ({step}): {source}")]
    AuthFailed {
        step: AuthStep,
        #[source]
        source: RemoteError,
    },

    #[error(
        "Login required: the application is registered but no username/password was supplied. \
         Run toot-setup to complete the login."
    )]
    CredentialsRequired,

    #[error(
        "Session expired: {0}. The stored access token was rejected; \
         run toot-setup --relogin to obtain a new one."
    )]
    SessionExpired(#[source] RemoteError),

    #[error("Rejected by remote service: {0}")]
    RemoteRejected(#[source] RemoteError),

    #[error("Remote service unavailable: {0}")]
    RemoteUnavailable(#[source] RemoteError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TootcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TootcastError::InvalidInput(_) => 3,
            TootcastError::AuthFailed { .. }
            | TootcastError::SessionExpired(_)
            | TootcastError::CredentialsRequired => 2,
            TootcastError::Config(_)
            | TootcastError::RemoteRejected(_)
            | TootcastError::RemoteUnavailable(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config file {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("No usable instance.base_url: {reason}")]
    NoInstance { reason: String },

    #[error("Instance already configured as {base_url} in {}", path.display())]
    AlreadyConfigured { path: PathBuf, base_url: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine the user configuration directory")]
    NoConfigDir,
}

/// Which bootstrap step an authentication failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStep {
    Register,
    Login,
}

impl fmt::Display for AuthStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStep::Register => write!(f, "register application"),
            AuthStep::Login => write!(f, "login"),
        }
    }
}

/// Failure reported by a remote collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Credentials or token rejected (HTTP 401/403)
    Unauthorized,
    /// Request understood but refused (validation, other 4xx)
    Rejected,
    /// HTTP 429
    RateLimited,
    /// Transport failure or server error
    Unavailable,
    /// Response could not be understood
    Protocol,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RemoteErrorKind::Unauthorized => "unauthorized",
            RemoteErrorKind::Rejected => "rejected",
            RemoteErrorKind::RateLimited => "rate limited",
            RemoteErrorKind::Unavailable => "unavailable",
            RemoteErrorKind::Protocol => "protocol error",
        };
        f.write_str(label)
    }
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unauthorized, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Rejected, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unavailable, message)
    }

    /// Classify an HTTP status code returned by the remote service
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => RemoteErrorKind::Unauthorized,
            429 => RemoteErrorKind::RateLimited,
            500..=599 => RemoteErrorKind::Unavailable,
            _ => RemoteErrorKind::Rejected,
        };
        Self::new(kind, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = TootcastError::InvalidInput("Empty content".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_auth_and_session_errors() {
        let auth = TootcastError::AuthFailed {
            step: AuthStep::Login,
            source: RemoteError::unauthorized("bad password"),
        };
        assert_eq!(auth.exit_code(), 2);
        assert_eq!(
            TootcastError::SessionExpired(RemoteError::unauthorized("revoked")).exit_code(),
            2
        );
        assert_eq!(TootcastError::CredentialsRequired.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_config_and_remote_errors() {
        let missing = TootcastError::Config(ConfigError::Missing {
            path: PathBuf::from("/tmp/config.toml"),
        });
        assert_eq!(missing.exit_code(), 1);
        assert_eq!(
            TootcastError::RemoteRejected(RemoteError::rejected("too long")).exit_code(),
            1
        );
        assert_eq!(
            TootcastError::RemoteUnavailable(RemoteError::unavailable("timeout")).exit_code(),
            1
        );
    }

    #[test]
    fn test_auth_failed_message_names_step() {
        let error = TootcastError::AuthFailed {
            step: AuthStep::Register,
            source: RemoteError::unavailable("connection refused"),
        };
        assert_eq!(
            error.to_string(),
            "Authentication failed (register application): unavailable: connection refused"
        );
    }

    #[test]
    fn test_error_source_chain_preserves_cause() {
        use std::error::Error as _;

        let error = TootcastError::SessionExpired(RemoteError::unauthorized("token revoked"));
        let source = error.source().expect("session errors carry their cause");
        assert_eq!(source.to_string(), "unauthorized: token revoked");
    }

    #[test]
    fn test_conversion_from_config_error() {
        let error: TootcastError = ConfigError::NoConfigDir.into();
        match error {
            TootcastError::Config(ConfigError::NoConfigDir) => {}
            other => panic!("Expected TootcastError::Config, got {:?}", other),
        }
    }

    #[test]
    fn test_remote_error_from_http_status() {
        assert_eq!(
            RemoteError::from_http_status(401, "x").kind,
            RemoteErrorKind::Unauthorized
        );
        assert_eq!(
            RemoteError::from_http_status(403, "x").kind,
            RemoteErrorKind::Unauthorized
        );
        assert_eq!(
            RemoteError::from_http_status(422, "x").kind,
            RemoteErrorKind::Rejected
        );
        assert_eq!(
            RemoteError::from_http_status(429, "x").kind,
            RemoteErrorKind::RateLimited
        );
        assert_eq!(
            RemoteError::from_http_status(503, "x").kind,
            RemoteErrorKind::Unavailable
        );
    }
}
