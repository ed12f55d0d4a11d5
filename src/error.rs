use axum::http::StatusCode;

pub type AuthResult<T> = Result<T, AuthError>;

/// Errors surfaced by the credential authority and the account flows around it.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Required field missing, malformed email or password outside the length policy.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Another record already owns this email.
    #[error("email already registered")]
    EmailTaken,

    /// Signing secret or token lifetime missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Stored derived secret is absent or corrupt.
    #[error("stored password secret is malformed: {0}")]
    MalformedSecret(String),

    /// Wrong password, unknown account or unusable reset proof. Deliberately uninformative.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No usable bearer credentials on the request.
    #[error("{0}")]
    MissingCredentials(&'static str),

    #[error("invalid or expired token: {0}")]
    InvalidToken(String),

    #[error("user not found")]
    NotFound,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::InvalidToken("token expired".into()),
            ErrorKind::InvalidSignature => AuthError::InvalidToken("invalid signature".into()),
            _ => AuthError::InvalidToken(e.to_string()),
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::MissingCredentials(_)
            | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Configuration(_)
            | AuthError::MalformedSecret(_)
            | AuthError::Hashing(_)
            | AuthError::Database(_)
            | AuthError::Migration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the error points at a fault in this process rather than at the caller's input.
    pub fn is_internal(&self) -> bool {
        self.status().is_server_error()
    }

    /// Shape used by extractors and handlers: internal faults never leak their details.
    pub fn rejection(self) -> (StatusCode, String) {
        let status = self.status();
        if self.is_internal() {
            (status, "Internal server error".into())
        } else {
            (status, self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_map_to_client_statuses() {
        assert_eq!(AuthError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::EmailTaken.status(), StatusCode::CONFLICT);
        assert_eq!(AuthError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn internal_rejection_hides_details() {
        let (status, body) = AuthError::MalformedSecret("bad prefix".into()).rejection();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("bad prefix"));
    }

    #[test]
    fn migration_failure_is_internal() {
        let err = AuthError::from(sqlx::migrate::MigrateError::VersionMissing(1));
        assert!(err.is_internal());
        let (status, body) = err.rejection();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Internal server error");
    }

    #[test]
    fn token_rejection_keeps_reason() {
        let (status, body) = AuthError::InvalidToken("token expired".into()).rejection();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "invalid or expired token: token expired");

        let (status, body) = AuthError::MissingCredentials("invalid auth scheme").rejection();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "invalid auth scheme");
    }
}
