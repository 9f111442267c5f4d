mod cache;
mod check;
pub mod config;
mod error;
mod health;
mod limiter;
mod scheduler;
mod serializer;
pub mod startup;
mod status;
mod subscription;
mod timeout;

use std::sync::Arc;

use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub use check::{Check, CheckerOpts, Probe, ProbeFuture, RegisteredCheck};
pub use config::ServiceOptions;
pub use error::{CoreError, CoreResult, ValidationError, Violation};
pub use status::{CheckResult, ProbeError, ProbeOutcome, Status};
pub use subscription::Filter;

use serializer::{
    ListChecksCmd, ListResultsCmd, OverallHealthCmd, Outbound, RegisterCmd, SubscribeChecksCmd,
    SubscribeResultsCmd,
};

/// No replay: a subscriber only sees events published after it subscribed.
pub type Stream<T> = ReceiverStream<T>;

/// Cheap to clone, every clone shares the same Serializer task and shutdown signal.
#[derive(Clone)]
pub struct Service {
    outbound: Outbound,
    shutdown: CancellationToken,
}

impl Service {
    pub fn new(options: ServiceOptions) -> Self {
        let (outbound, shutdown) = serializer::start(options);
        Self { outbound, shutdown }
    }

    fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// `probe: None` is rejected as `Violation::NilChecker` alongside any other
    /// violation in the same call, matching the validator's all-at-once aggregation.
    pub async fn register(
        &self,
        check: Check,
        opts: CheckerOpts,
        probe: Option<Probe>,
    ) -> CoreResult<()> {
        if !self.is_running() {
            return Err(CoreError::ServiceNotRunning);
        }
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        let cmd = RegisterCmd {
            check,
            opts,
            probe,
            reply: reply_tx,
        };
        if self.outbound.register.send(cmd).await.is_err() {
            return Err(CoreError::ServiceNotRunning);
        }
        reply_rx.await.unwrap_or(Err(CoreError::ServiceNotRunning))
    }

    pub async fn list_checks(&self) -> Vec<Arc<RegisteredCheck>> {
        if !self.is_running() {
            return Vec::new();
        }
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        if self
            .outbound
            .list_checks
            .send(ListChecksCmd { reply: reply_tx })
            .await
            .is_err()
        {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    pub async fn list_results(&self, filter: Option<Filter<CheckResult>>) -> Vec<CheckResult> {
        if !self.is_running() {
            return Vec::new();
        }
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        if self
            .outbound
            .list_results
            .send(ListResultsCmd { filter, reply: reply_tx })
            .await
            .is_err()
        {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    /// No filter, no replay: call `list_checks` first to seed current state.
    pub async fn subscribe_checks(&self) -> Stream<Arc<RegisteredCheck>> {
        if !self.is_running() {
            return closed_stream();
        }
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        if self
            .outbound
            .subscribe_checks
            .send(SubscribeChecksCmd { reply: reply_tx })
            .await
            .is_err()
        {
            return closed_stream();
        }
        match reply_rx.await {
            Ok(rx) => ReceiverStream::new(rx),
            Err(_) => closed_stream(),
        }
    }

    pub async fn subscribe_results(&self, filter: Option<Filter<CheckResult>>) -> Stream<CheckResult> {
        if !self.is_running() {
            return closed_stream();
        }
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        if self
            .outbound
            .subscribe_results
            .send(SubscribeResultsCmd { filter, reply: reply_tx })
            .await
            .is_err()
        {
            return closed_stream();
        }
        match reply_rx.await {
            Ok(rx) => ReceiverStream::new(rx),
            Err(_) => closed_stream(),
        }
    }

    /// Green for an empty cache, Red once shut down.
    pub async fn overall_health(&self) -> Status {
        if !self.is_running() {
            return Status::Red;
        }
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        if self
            .outbound
            .overall_health
            .send(OverallHealthCmd { reply: reply_tx })
            .await
            .is_err()
        {
            return Status::Red;
        }
        reply_rx.await.unwrap_or(Status::Red)
    }

    /// Idempotent, non-blocking.
    pub fn shutdown(&self) {
        debug!("shutdown requested");
        self.shutdown.cancel();
    }
}

fn closed_stream<T: Send + 'static>() -> Stream<T> {
    let (_tx, rx) = tokio::sync::mpsc::channel(1);
    ReceiverStream::new(rx)
}
