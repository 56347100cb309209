//! HTTP server for the ChatOps hook.
//!
//! # Endpoints
//!
//! - `POST /hook` (alias `POST /webhook`) - Accepts GitHub webhook deliveries (returns 200)
//! - `GET /plugin-help` - Describes the registered plugins as JSON
//! - `GET /metrics` - Dumps the in-process counters
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

use tracing::info;

use crate::dispatch::{EventRouter, InFlightTasks};

pub mod health;
pub mod webhook;

pub use health::{health_handler, metrics_handler, plugin_help_handler};
pub use webhook::{ACK_BODY, WebhookError, webhook_handler};

/// Returns the current webhook secret.
pub type SecretSource = Arc<dyn Fn() -> Vec<u8> + Send + Sync>;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Consulted on every delivery.
    secret: SecretSource,

    router: EventRouter,
}

impl AppState {
    pub fn new(secret: SecretSource, router: EventRouter) -> Self {
        AppState {
            inner: Arc::new(AppStateInner { secret, router }),
        }
    }

    /// A state whose secret never changes.
    pub fn with_fixed_secret(secret: impl Into<Vec<u8>>, router: EventRouter) -> Self {
        let secret = secret.into();
        Self::new(Arc::new(move || secret.clone()), router)
    }

    pub fn webhook_secret(&self) -> Vec<u8> {
        (self.inner.secret)()
    }

    pub fn router(&self) -> &EventRouter {
        &self.inner.router
    }

    pub fn in_flight(&self) -> &InFlightTasks {
        self.inner.router.in_flight()
    }

    /// Stops taking on new dispatch work and waits until every accepted
    /// delivery and every plugin task it started has finished.
    ///
    /// Has no deadline of its own.
    pub async fn graceful_shutdown(&self) {
        info!(in_flight = self.in_flight().len(), "Draining in-flight work");
        self.in_flight().wait_for_zero().await;
        info!("All in-flight work finished");
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/hook", post(webhook_handler))
        .route("/webhook", post(webhook_handler))
        .route("/plugin-help", get(plugin_help_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
