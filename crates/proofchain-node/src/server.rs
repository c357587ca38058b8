//! Node runtime: HTTP serving and periodic consensus resolution.

use crate::api::{create_router, AppState};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Serves the API on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, node_id = %state.node_id, "API server listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Runs a resolution round every `period` until `shutdown` fires.
///
/// The first round runs one full period after startup, giving peers listed
/// in the configuration time to come up.
pub fn spawn_resolve_loop(
    state: AppState,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let replaced = state.resolve().await;
                    tracing::debug!(replaced, length = state.engine.len(), "periodic resolution");
                }
            }
        }

        tracing::debug!("resolve loop stopped");
    })
}

/// Resolves once `ctrl_c` is received.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
