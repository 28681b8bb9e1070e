//! Error types for Postline

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PostlineError>;

#[derive(Error, Debug)]
pub enum PostlineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Rate limit exceeded for {resource}: retry after {reset_at}")]
    RateLimitExceeded { resource: String, reset_at: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PostlineError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PostlineError::InvalidInput(_) => 3,
            PostlineError::NotAuthorized(_) => 2,
            PostlineError::Network(NetworkError::AuthExchange(_))
            | PostlineError::Network(NetworkError::CredentialExpired) => 2,
            PostlineError::Network(_) => 1,
            PostlineError::Generation(_) => 1,
            PostlineError::RateLimitExceeded { .. } => 1,
            PostlineError::Config(_) => 1,
            PostlineError::Database(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors from the downstream social-network API.
///
/// `PublishRejected` carries the upstream status and body so a failed post
/// stores enough detail for the owner to diagnose it.
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Authorization code exchange failed: {0}")]
    AuthExchange(String),

    #[error("Profile fetch failed: {0}")]
    ProfileFetch(String),

    #[error("Credential is expired or inactive")]
    CredentialExpired,

    #[error("Publish rejected with status {status}: {body}")]
    PublishRejected { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    #[error("Provider {name} failed: {reason}")]
    Provider { name: String, reason: String },

    #[error("All generation providers failed: {0}")]
    Exhausted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = PostlineError::InvalidInput("Empty body".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_auth_errors() {
        let exchange = PostlineError::Network(NetworkError::AuthExchange("denied".to_string()));
        assert_eq!(exchange.exit_code(), 2);

        let expired = PostlineError::Network(NetworkError::CredentialExpired);
        assert_eq!(expired.exit_code(), 2);

        let not_authorized = PostlineError::NotAuthorized("owner mismatch".to_string());
        assert_eq!(not_authorized.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_publish_rejected() {
        let error = PostlineError::Network(NetworkError::PublishRejected {
            status: 401,
            body: "unauthorized".to_string(),
        });
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_config_and_database() {
        let config = PostlineError::Config(ConfigError::MissingField("database.path".to_string()));
        assert_eq!(config.exit_code(), 1);

        let db = PostlineError::Database(DbError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        )));
        assert_eq!(db.exit_code(), 1);
    }

    #[test]
    fn test_publish_rejected_formatting_includes_status() {
        let error = NetworkError::PublishRejected {
            status: 401,
            body: "token revoked".to_string(),
        };
        let message = format!("{}", error);
        assert!(message.contains("401"));
        assert!(message.contains("token revoked"));
    }

    #[test]
    fn test_rate_limit_formatting() {
        let error = PostlineError::RateLimitExceeded {
            resource: "generate.text".to_string(),
            reset_at: 1700000000,
        };
        let message = format!("{}", error);
        assert!(message.contains("generate.text"));
        assert!(message.contains("1700000000"));
    }

    #[test]
    fn test_error_conversion_from_network_error() {
        let network_error = NetworkError::ProfileFetch("timeout".to_string());
        let error: PostlineError = network_error.into();

        match error {
            PostlineError::Network(NetworkError::ProfileFetch(_)) => {}
            _ => panic!("Expected PostlineError::Network"),
        }
    }

    #[test]
    fn test_error_conversion_from_generation_error() {
        let generation_error = GenerationError::Exhausted("2 providers tried".to_string());
        let error: PostlineError = generation_error.into();

        match error {
            PostlineError::Generation(_) => {}
            _ => panic!("Expected PostlineError::Generation"),
        }
    }

    #[test]
    fn test_network_error_clone() {
        let original = NetworkError::Transport("connection reset".to_string());
        let cloned = original.clone();
        assert_eq!(format!("{}", original), format!("{}", cloned));
    }

    #[test]
    fn test_error_message_formatting() {
        let error = PostlineError::Network(NetworkError::AuthExchange("bad code".to_string()));
        assert_eq!(
            format!("{}", error),
            "Network error: Authorization code exchange failed: bad code"
        );
    }
}
