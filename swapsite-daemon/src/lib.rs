//! swapsite daemon: blue-green build slots, the deployment orchestrator,
//! the swappable traffic router, and the HTTP server around them.

mod error;
pub mod orchestrator;
pub mod router;
mod runtime;
pub mod server;
pub mod slots;

pub use error::{DaemonError, DeployError, DirectoryError, Stage};
pub use orchestrator::{
    Collaborators, DeployOutcome, DeploySummary, DeploymentOrchestrator, OrchestratorState, Phase,
    SiteLayout, Trigger,
};
pub use router::{SiteHandler, StaticSite, TrafficRouter};
pub use runtime::{init_tracing, run, serve, start_blocking, startup};
pub use server::{build_router, AppState};
pub use slots::BuildSlotManager;
