//! HTTP surface.
//!
//! # Endpoints
//!
//! - `POST <webhook_path>` - runs a deployment pass before answering:
//!   `200` with a JSON summary when a new build went live, `204` when the
//!   sources were unchanged, `500` naming the failed stage otherwise
//! - anything else - forwarded to the live slot's static files

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::error::DeployError;
use crate::orchestrator::{DeployOutcome, DeploymentOrchestrator, Trigger};
use crate::router::TrafficRouter;

/// Shared application state, passed to handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<DeploymentOrchestrator>,
    router: TrafficRouter,
}

impl AppState {
    pub fn new(orchestrator: Arc<DeploymentOrchestrator>) -> Self {
        let router = orchestrator.router();
        Self {
            orchestrator,
            router,
        }
    }
}

/// Builds the axum Router: the webhook route plus a catch-all forwarder.
pub fn build_router(app_state: AppState, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, post(webhook_handler))
        .fallback(forward_handler)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

/// Errors a webhook delivery can end in.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("{} stage failed: {0}", .0.stage())]
    Deploy(#[from] DeployError),

    #[error("deployment task aborted: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Webhook handler. The request body is ignored.
pub async fn webhook_handler(State(app_state): State<AppState>) -> Result<Response, WebhookError> {
    let orchestrator = app_state.orchestrator.clone();
    let outcome = tokio::task::spawn_blocking(move || orchestrator.deploy(Trigger::Webhook))
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "deployment task aborted");
            WebhookError::from(err)
        })??;

    Ok(match outcome {
        DeployOutcome::Deployed(summary) => (StatusCode::OK, Json(summary)).into_response(),
        DeployOutcome::Unchanged { .. } => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn forward_handler(State(app_state): State<AppState>, request: Request) -> Response {
    app_state.router.forward(request).await
}
