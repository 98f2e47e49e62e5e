//! OpenID Connect token verification.
//!
//! Verifies identity tokens against the signing keys an identity provider
//! publishes. Keys are fetched once at discovery and refreshed when a token
//! names a key id we have not seen, at most once per refresh interval.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{AuthError, IdTokenClaims, TokenVerifier};

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const JWKS_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Subset of the provider discovery document we use
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    #[serde(default)]
    pub jwks_uri: Option<String>,
}

pub struct OidcVerifier {
    http: reqwest::Client,
    metadata: ProviderMetadata,
    client_id: String,
    keys: ArcSwap<JwkSet>,
    /// Time of the last refresh; the fetch made by discovery does not count
    last_refresh: Mutex<Option<Instant>>,
}

impl OidcVerifier {
    /// Fetch the provider's discovery document and signing keys.
    pub async fn discover(issuer: &str, client_id: impl Into<String>) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(AuthError::provider)?;
        Self::discover_with(http, issuer, client_id).await
    }

    async fn discover_with(
        http: reqwest::Client,
        issuer: &str,
        client_id: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let url = format!("{}{}", issuer.trim_end_matches('/'), DISCOVERY_PATH);
        let metadata: ProviderMetadata = http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(AuthError::provider)?
            .json()
            .await
            .map_err(AuthError::provider)?;

        if metadata.issuer.trim_end_matches('/') != issuer.trim_end_matches('/') {
            return Err(AuthError::Provider(format!(
                "issuer did not match: expected {}, got {}",
                issuer, metadata.issuer
            )));
        }

        let jwks_uri = metadata
            .jwks_uri
            .as_deref()
            .ok_or_else(|| AuthError::Provider("discovery document has no jwks_uri".into()))?;
        let keys = fetch_jwks(&http, jwks_uri).await?;

        tracing::info!(
            issuer = %metadata.issuer,
            keys = keys.keys.len(),
            "Loaded identity provider signing keys"
        );

        Ok(Self {
            http,
            metadata,
            client_id: client_id.into(),
            keys: ArcSwap::from_pointee(keys),
            last_refresh: Mutex::new(None),
        })
    }

    /// Build a verifier from already-known metadata and keys.
    ///
    /// When `metadata.jwks_uri` is set, unknown key ids still trigger a refresh.
    pub fn with_keys(metadata: ProviderMetadata, client_id: impl Into<String>, keys: JwkSet) -> Self {
        Self {
            http: reqwest::Client::new(),
            metadata,
            client_id: client_id.into(),
            keys: ArcSwap::from_pointee(keys),
            last_refresh: Mutex::new(None),
        }
    }

    fn find_key(&self, kid: Option<&str>) -> Option<Jwk> {
        let keys = self.keys.load();
        match kid {
            Some(kid) => keys.find(kid).cloned(),
            None if keys.keys.len() == 1 => keys.keys.first().cloned(),
            None => None,
        }
    }

    /// Refetch the key set unless it was refreshed recently
    async fn refresh_keys(&self) -> Result<(), AuthError> {
        let Some(jwks_uri) = self.metadata.jwks_uri.as_deref() else {
            return Ok(());
        };

        let mut last_refresh = self.last_refresh.lock().await;
        if let Some(at) = *last_refresh {
            if at.elapsed() < JWKS_REFRESH_INTERVAL {
                tracing::debug!("Signing keys refreshed recently, not refetching");
                return Ok(());
            }
        }

        let keys = fetch_jwks(&self.http, jwks_uri).await?;
        tracing::debug!(keys = keys.keys.len(), "Refreshed identity provider signing keys");
        self.keys.store(Arc::new(keys));
        *last_refresh = Some(Instant::now());
        Ok(())
    }
}

#[async_trait]
impl TokenVerifier for OidcVerifier {
    async fn verify(&self, token: &str) -> Result<IdTokenClaims, AuthError> {
        let header = decode_header(token).map_err(AuthError::invalid_token)?;
        let kid = header.kid.as_deref();

        let jwk = match self.find_key(kid) {
            Some(jwk) => jwk,
            None => {
                self.refresh_keys().await?;
                self.find_key(kid)
                    .ok_or_else(|| AuthError::InvalidToken("no matching signing key".into()))?
            }
        };

        let algorithm = signing_algorithm(&jwk, header.alg)?;
        let key = DecodingKey::from_jwk(&jwk).map_err(AuthError::invalid_token)?;

        let mut validation = Validation::new(algorithm);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&[self.metadata.issuer.as_str()]);

        let data = decode::<IdTokenClaims>(token, &key, &validation)
            .map_err(AuthError::invalid_token)?;
        Ok(data.claims)
    }
}

/// Accept the token's algorithm only if the key allows it.
///
/// A key that declares `alg` allows exactly that algorithm. Otherwise any
/// algorithm of the key's type is allowed.
fn signing_algorithm(jwk: &Jwk, requested: Algorithm) -> Result<Algorithm, AuthError> {
    let allowed = match &jwk.common.key_algorithm {
        Some(declared) => declared_algorithm(declared) == Some(requested),
        None => key_family(&jwk.algorithm).contains(&requested),
    };

    if allowed {
        Ok(requested)
    } else {
        Err(AuthError::InvalidToken(
            "algorithm does not match signing key".into(),
        ))
    }
}

/// Signature algorithm named by a key's `alg`; `None` for encryption algorithms
fn declared_algorithm(alg: &KeyAlgorithm) -> Option<Algorithm> {
    Some(match alg {
        KeyAlgorithm::HS256 => Algorithm::HS256,
        KeyAlgorithm::HS384 => Algorithm::HS384,
        KeyAlgorithm::HS512 => Algorithm::HS512,
        KeyAlgorithm::ES256 => Algorithm::ES256,
        KeyAlgorithm::ES384 => Algorithm::ES384,
        KeyAlgorithm::RS256 => Algorithm::RS256,
        KeyAlgorithm::RS384 => Algorithm::RS384,
        KeyAlgorithm::RS512 => Algorithm::RS512,
        KeyAlgorithm::PS256 => Algorithm::PS256,
        KeyAlgorithm::PS384 => Algorithm::PS384,
        KeyAlgorithm::PS512 => Algorithm::PS512,
        KeyAlgorithm::EdDSA => Algorithm::EdDSA,
        _ => return None,
    })
}

fn key_family(params: &AlgorithmParameters) -> &'static [Algorithm] {
    match params {
        AlgorithmParameters::OctetKey(_) => &[Algorithm::HS256, Algorithm::HS384, Algorithm::HS512],
        AlgorithmParameters::RSA(_) => &[
            Algorithm::RS256,
            Algorithm::RS384,
            Algorithm::RS512,
            Algorithm::PS256,
            Algorithm::PS384,
            Algorithm::PS512,
        ],
        AlgorithmParameters::EllipticCurve(_) => &[Algorithm::ES256, Algorithm::ES384],
        AlgorithmParameters::OctetKeyPair(_) => &[Algorithm::EdDSA],
    }
}

async fn fetch_jwks(http: &reqwest::Client, uri: &str) -> Result<JwkSet, AuthError> {
    http.get(uri)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(AuthError::provider)?
        .json()
        .await
        .map_err(AuthError::provider)
}
