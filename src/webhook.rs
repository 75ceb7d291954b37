//! Inbound webhook transport (SPEC_FULL §4.6): a single `axum` route that
//! accepts the raw message body, checks it against a pre-shared secret, and
//! hands it to the [`ExchangeManager`] without waiting for processing to
//! finish. Grounded on the pack's only in-tree `axum` usage
//! (`hot3246624-pm_as_ofi/src/admin.rs`: `Router::new().route(...).with_state(...)`,
//! `tokio::net::TcpListener::bind` + `axum::serve`).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tracing::{info, warn};

use crate::domain::credentials::Credentials;
use crate::manager::ExchangeManager;

#[derive(Clone)]
struct AppState {
    manager: Arc<ExchangeManager>,
    credentials: Arc<Vec<Credentials>>,
    shared_secret: Arc<String>,
}

/// Build the router: `POST /webhook/:secret` and `GET /healthz` (§4.6).
pub fn router(manager: Arc<ExchangeManager>, credentials: Vec<Credentials>, shared_secret: String) -> Router {
    let state = AppState {
        manager,
        credentials: Arc::new(credentials),
        shared_secret: Arc::new(shared_secret),
    };
    Router::new()
        .route("/webhook/:secret", post(handle_webhook))
        .route("/healthz", get(handle_healthz))
        .with_state(state)
}

/// Bind and serve `router(...)` until the process is signalled to stop.
pub async fn serve(manager: Arc<ExchangeManager>, credentials: Vec<Credentials>, shared_secret: String, bind_address: SocketAddr) -> std::io::Result<()> {
    let app = router(manager, credentials, shared_secret);
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!(%bind_address, "webhook listener bound");
    axum::serve(listener, app).await
}

/// A mismatched `:secret` path segment returns `401` without touching the
/// parser or the manager (§4.6). The handler spawns message processing onto
/// the runtime and replies `202 Accepted` immediately — the HTTP client
/// never waits for order placement (§5: "no hard timeout on the runtime").
async fn handle_webhook(State(state): State<AppState>, Path(secret): Path<String>, body: String) -> StatusCode {
    if !constant_time_eq(secret.as_bytes(), state.shared_secret.as_bytes()) {
        warn!("webhook request rejected: secret mismatch");
        return StatusCode::UNAUTHORIZED;
    }

    let manager = state.manager.clone();
    let credentials = state.credentials.as_ref().clone();
    tokio::spawn(async move {
        manager.execute_message(&body, &credentials).await;
    });

    StatusCode::ACCEPTED
}

async fn handle_healthz(State(state): State<AppState>) -> String {
    state.manager.open_exchange_count().to_string()
}

/// Constant-time byte comparison so a mistyped secret doesn't leak timing
/// information about how many leading bytes matched (§4.6).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::exchange::PollingBounds;
    use crate::port::notifier::LoggingNotifier;
    use crate::testkit::exchange::FakeExchangeApi;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn manager() -> Arc<ExchangeManager> {
        let factory: crate::manager::ApiFactory = Arc::new(|_creds| Arc::new(FakeExchangeApi::new()));
        ExchangeManager::new(factory, PollingBounds { min: 0, max: 0 }, Arc::new(LoggingNotifier))
    }

    #[tokio::test]
    async fn mismatched_secret_is_rejected_without_dispatch() {
        let app = router(manager(), vec![], "correct-secret".to_string());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/wrong-secret")
                    .body(Body::from("hello"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn matching_secret_is_accepted_immediately() {
        let app = router(manager(), vec![], "correct-secret".to_string());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/correct-secret")
                    .body(Body::from("hello"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn healthz_reports_open_exchange_count() {
        let manager = manager();
        let app = router(manager.clone(), vec![], "s".to_string());
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
