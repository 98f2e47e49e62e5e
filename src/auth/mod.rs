//! Authenticator
//!
//! Turns the bearer credential of a request into a verified [`CallerIdentity`].

mod claims;
mod error;
pub mod oidc;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::domain::CallerIdentity;

pub use claims::IdTokenClaims;
pub use error::AuthError;
pub use oidc::{OidcVerifier, ProviderMetadata};

/// Verifies a raw identity token and returns its claims
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<IdTokenClaims, AuthError>;
}

#[derive(Clone)]
pub struct Authenticator {
    verifier: Arc<dyn TokenVerifier>,
}

impl Authenticator {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// Verify `credential` and extract the caller's email.
    ///
    /// A valid signature is not enough: the provider must also vouch that
    /// the email address was verified.
    pub async fn authenticate(&self, credential: &str) -> Result<CallerIdentity, AuthError> {
        if credential.is_empty() {
            return Err(AuthError::InvalidToken("missing bearer token".into()));
        }

        let claims = self.verifier.verify(credential).await?;
        if !claims.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        match claims.email {
            Some(email) if !email.is_empty() => Ok(CallerIdentity::new(email)),
            _ => Err(AuthError::MissingEmail),
        }
    }
}

/// Credential from the `Authorization` header, without its `Bearer ` scheme.
///
/// An absent or unreadable header yields an empty credential.
pub fn bearer_credential(headers: &HeaderMap) -> &str {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    value.strip_prefix("Bearer ").unwrap_or(value).trim()
}
