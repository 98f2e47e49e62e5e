//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use coa_server::api;
use coa_server::auth::{Authenticator, OidcVerifier, ProviderMetadata};
use coa_server::pool::RepositoryPool;
use coa_server::store::{BackendSettings, MemoryStoreFactory, StoreFactory};
use coa_server::AppContext;

pub const ISSUER: &str = "https://id.example.com";
pub const CLIENT_ID: &str = "coa-client";
pub const KEY_ID: &str = "test-key";
pub const SECRET: &[u8] = b"coa-server-test-secret-0123456789";
/// base64url of `SECRET`
const SECRET_B64: &str = "Y29hLXNlcnZlci10ZXN0LXNlY3JldC0wMTIzNDU2Nzg5";

pub struct TestApp {
    pub router: Router,
    pub pool: RepositoryPool,
}

/// Router backed by the in-memory store and an HS256 test key
pub fn test_app() -> TestApp {
    test_app_with(Arc::new(MemoryStoreFactory::new()))
}

pub fn test_app_with(factory: Arc<dyn StoreFactory>) -> TestApp {
    let keys: JwkSet = serde_json::from_value(json!({
        "keys": [{"kty": "oct", "kid": KEY_ID, "alg": "HS256", "k": SECRET_B64}]
    }))
    .unwrap();
    let metadata = ProviderMetadata {
        issuer: ISSUER.to_string(),
        jwks_uri: None,
    };
    let verifier = OidcVerifier::with_keys(metadata, CLIENT_ID, keys);

    let pool = RepositoryPool::with_max_idle(factory, BackendSettings::new(), 4);
    let ctx = AppContext::new(Authenticator::new(Arc::new(verifier)), pool.clone());

    TestApp {
        router: api::build_router(ctx),
        pool,
    }
}

pub fn claims_for(email: &str, verified: bool) -> Value {
    json!({
        "sub": email,
        "email": email,
        "email_verified": verified,
        "aud": CLIENT_ID,
        "iss": ISSUER,
        "exp": chrono::Utc::now().timestamp() + 600,
    })
}

pub fn sign(claims: &Value, secret: &[u8]) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(KEY_ID.to_string());
    encode(&header, claims, &EncodingKey::from_secret(secret)).unwrap()
}

/// Valid token for a verified email
pub fn token_for(email: &str) -> String {
    sign(&claims_for(email, true), SECRET)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> TestResponse {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header("Authorization", format!("Bearer {}", token));
    }
    let req = req
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    TestResponse {
        status,
        headers,
        body,
    }
}
