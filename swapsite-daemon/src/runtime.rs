use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use swapsite_core::Settings;

use crate::error::{io_err, DaemonError};
use crate::orchestrator::{DeployOutcome, DeploymentOrchestrator, Trigger};
use crate::server::{build_router, AppState};

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(settings: Settings) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(settings))
}

/// Run the daemon: prepare slots, build once, then serve until ctrl-c.
///
/// Nothing is bound until the startup build has gone live; any failure
/// before that is returned and the process should exit.
pub async fn run(settings: Settings) -> Result<(), DaemonError> {
    let orchestrator = Arc::new(DeploymentOrchestrator::from_settings(&settings));
    orchestrator.slots().bootstrap()?;

    if let DeployOutcome::Deployed(summary) = startup(orchestrator.clone()).await? {
        tracing::info!(
            slot = %summary.slot,
            duration_ms = summary.duration_ms,
            "startup build is live",
        );
    }

    let addr = settings.app.server.listen;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| DaemonError::Bind { addr, source })?;
    serve(
        listener,
        orchestrator,
        &settings.app.server.webhook_path,
        shutdown_signal(),
    )
    .await
}

/// The unconditional first pass, on the blocking pool.
pub async fn startup(
    orchestrator: Arc<DeploymentOrchestrator>,
) -> Result<DeployOutcome, DaemonError> {
    let outcome = tokio::task::spawn_blocking(move || orchestrator.deploy(Trigger::Startup))
        .await??;
    Ok(outcome)
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    orchestrator: Arc<DeploymentOrchestrator>,
    webhook_path: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DaemonError> {
    let local = listener.local_addr().map_err(|e| io_err("listener", e))?;
    let app = build_router(AppState::new(orchestrator), webhook_path);
    tracing::info!(addr = %local, webhook = webhook_path, "serving");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| io_err(local.to_string(), e))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received ctrl-c, shutting down"),
        Err(err) => tracing::error!(error = %err, "ctrl-c handler failed, shutting down"),
    }
}

/// `RUST_LOG` filter (default `info`); `SWAPSITE_LOG_FORMAT=json` for JSON lines.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("SWAPSITE_LOG_FORMAT")
        .is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
