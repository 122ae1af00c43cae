//! Live-traffic routing.
//!
//! The router holds one [`Route`] behind an [`ArcSwap`]: every request loads
//! it lock-free, and a swap is a single pointer store. A request that loaded
//! the old route finishes against the old slot; the next one sees the new.

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use swapsite_core::Slot;

/// Anything that can answer a request from a complete output tree.
pub trait SiteHandler: Send + Sync + 'static {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'static, Response>;
}

/// Static file handler rooted at one slot directory.
///
/// Serves `index.html` for directory requests and 404 for missing files.
#[derive(Clone)]
pub struct StaticSite {
    files: ServeDir,
}

impl StaticSite {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            files: ServeDir::new(root.as_ref()),
        }
    }
}

impl SiteHandler for StaticSite {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        let files = self.files.clone();
        Box::pin(async move {
            match files.oneshot(request).await {
                Ok(response) => response.into_response(),
                Err(err) => {
                    tracing::error!(error = %err, "static file service failed");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        })
    }
}

/// The handler currently receiving traffic, tagged with its slot.
pub struct Route {
    pub slot: Slot,
    pub handler: Arc<dyn SiteHandler>,
}

/// Swappable forwarding façade shared by every request task.
#[derive(Clone)]
pub struct TrafficRouter {
    current: Arc<ArcSwap<Route>>,
}

impl TrafficRouter {
    pub fn new(slot: Slot, handler: Arc<dyn SiteHandler>) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(Route { slot, handler })),
        }
    }

    /// Point all subsequent requests at `handler`.
    pub fn install(&self, slot: Slot, handler: Arc<dyn SiteHandler>) {
        self.current.store(Arc::new(Route { slot, handler }));
    }

    pub fn active_slot(&self) -> Slot {
        self.current.load().slot
    }

    pub fn forward(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        self.current.load().handler.forward(request)
    }
}
