use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::check::RegisteredCheck;
use crate::limiter::ConcurrencyLimiter;
use crate::status::CheckResult;
use crate::timeout;

/// Spawns the logical runner for one admitted check: run immediately,
/// then on `run_interval` until `shutdown` fires. Exits cleanly without
/// ever missing an in-flight probe's eventual abandonment.
pub(crate) fn spawn(
    registered: Arc<RegisteredCheck>,
    limiter: ConcurrencyLimiter,
    results_tx: mpsc::Sender<CheckResult>,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let id = registered.check.id.clone();
        loop {
            let permit = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                permit = limiter.acquire() => permit,
            };
            let permit = match permit {
                Ok(p) => p,
                Err(_) => break, // limiter closed, nothing left to run for
            };

            trace!(check_id = %id, "running probe");
            let result = timeout::run_with_timeout(&id, &registered.probe, registered.opts.timeout).await;
            drop(permit);

            if results_tx.send(result).await.is_err() {
                debug!(check_id = %id, "serializer gone; stopping scheduler");
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(registered.opts.run_interval) => {}
            }
        }
        debug!(check_id = %id, "scheduler stopped");
    });
}
