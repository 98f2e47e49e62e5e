//! Authentication Errors

/// Reasons a request could not be attributed to a verified caller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Signature, issuer, audience or expiry check failed
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("email not verified")]
    EmailNotVerified,

    #[error("token has no email claim")]
    MissingEmail,

    /// A protected handler ran without the authentication middleware
    #[error("request is not authenticated")]
    MissingIdentity,

    /// Discovery document or signing keys could not be fetched
    #[error("identity provider error: {0}")]
    Provider(String),
}

impl AuthError {
    pub fn invalid_token(err: impl std::fmt::Display) -> Self {
        Self::InvalidToken(err.to_string())
    }

    pub fn provider(err: impl std::fmt::Display) -> Self {
        Self::Provider(err.to_string())
    }
}
