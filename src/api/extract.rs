//! Request extractors
//!
//! [`Lease`] binds a pooled repository to the authenticated caller.
//! [`Decoder`] holds the request body until a handler asks for it.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::auth::AuthError;
use crate::context::AppContext;
use crate::domain::CallerIdentity;
use crate::error::AppError;
use crate::pool::Lease;

/// Largest request body accepted by save operations
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[async_trait]
impl FromRequestParts<AppContext> for Lease {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        // Set by auth_middleware; absent means the route is not protected
        let identity = parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or(AuthError::MissingIdentity)?;

        Ok(ctx.pool.acquire(identity).await?)
    }
}

/// Lazily decoded JSON body.
///
/// The body is neither read nor parsed until [`Decoder::decode`] is called.
/// No `Content-Type` header is required.
pub struct Decoder {
    body: Body,
}

impl Decoder {
    pub async fn decode<T: DeserializeOwned>(self) -> Result<T, AppError> {
        let bytes = to_bytes(self.body, MAX_BODY_BYTES)
            .await
            .map_err(|e| AppError::Body(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(AppError::Decode)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for Decoder {
    type Rejection = AppError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            body: req.into_body(),
        })
    }
}
