//! API Middleware
//!
//! Bearer-token authentication and request logging.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::header::{HeaderName, AUTHORIZATION, COOKIE, SET_COOKIE},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use crate::auth::bearer_credential;
use crate::context::AppContext;
use crate::error::AppError;

/// Header carrying the request id set by the request-id layer
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// =========================================================================
// Authentication
// =========================================================================

/// Verify the caller's bearer token and attach their `CallerIdentity`.
///
/// Fails closed: any verification failure answers the request before a
/// handler runs.
pub async fn auth_middleware(
    State(ctx): State<AppContext>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    // Owned copy: the body is not Sync, so no borrow of the request may cross the await
    let credential = bearer_credential(request.headers()).to_string();

    let identity = match ctx.authenticator.authenticate(&credential).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(
                method = %request.method(),
                uri = %request.uri(),
                error = %e,
                "Authentication failed"
            );
            return Err(e.into());
        }
    };

    tracing::debug!(user = %identity, "Authenticated request");
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

// =========================================================================
// Logging
// =========================================================================

const REDACTED: &str = "[REDACTED]";

fn is_sensitive(name: &HeaderName) -> bool {
    *name == AUTHORIZATION || *name == COOKIE || *name == SET_COOKIE
}

/// Header pairs that are safe to write to logs
pub fn redacted_headers(headers: &HeaderMap) -> Vec<(&str, &str)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if is_sensitive(name) {
                REDACTED
            } else {
                value.to_str().unwrap_or("<non-ascii>")
            };
            (name.as_str(), shown)
        })
        .collect()
}

/// Wraps each request in a span carrying its method, path and request id
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_owned();

    let span = tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    );
    tracing::debug!(parent: &span, headers = ?redacted_headers(request.headers()), "Request received");

    let started = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;

    tracing::info!(
        parent: &span,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request finished"
    );
    response
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use axum::{routing::get, Router};
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn test_redacted_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.insert("authorization", "Bearer secret.token".parse().unwrap());
        headers.insert("cookie", "session=abc".parse().unwrap());

        let shown = redacted_headers(&headers);

        assert!(shown.contains(&("content-type", "application/json")));
        assert!(shown.contains(&("authorization", REDACTED)));
        assert!(shown.contains(&("cookie", REDACTED)));
    }

    /// Log sink shared between the subscriber and the test
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_request_logs_hide_credentials() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer({
                let captured = captured.clone();
                move || captured.clone()
            })
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(axum::middleware::from_fn(logging_middleware));
        let request = Request::builder()
            .uri("/ping")
            .header("authorization", "Bearer secret.token")
            .header(REQUEST_ID_HEADER, "req-42")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), 200);

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("Request received"), "{}", logs);
        assert!(logs.contains("Request finished"), "{}", logs);
        assert!(logs.contains("request_id=req-42"), "{}", logs);
        assert!(logs.contains("path=/ping"), "{}", logs);
        assert!(logs.contains(REDACTED), "{}", logs);
        assert!(!logs.contains("secret.token"), "{}", logs);
    }
}
