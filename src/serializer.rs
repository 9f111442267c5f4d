use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::ResultCache;
use crate::check::{Check, CheckerOpts, Probe, RegisteredCheck};
use crate::config::ServiceOptions;
use crate::error::{CoreError, CoreResult};
use crate::health;
use crate::limiter::ConcurrencyLimiter;
use crate::scheduler;
use crate::status::{CheckResult, Status};
use crate::subscription::{Filter, Topic};

const REQUEST_QUEUE_CAPACITY: usize = 256;

pub(crate) struct RegisterCmd {
    pub check: Check,
    pub opts: CheckerOpts,
    pub probe: Option<Probe>,
    pub reply: oneshot::Sender<CoreResult<()>>,
}

pub(crate) struct ListChecksCmd {
    pub reply: oneshot::Sender<Vec<Arc<RegisteredCheck>>>,
}

pub(crate) struct ListResultsCmd {
    pub filter: Option<Filter<CheckResult>>,
    pub reply: oneshot::Sender<Vec<CheckResult>>,
}

pub(crate) struct SubscribeChecksCmd {
    pub reply: oneshot::Sender<mpsc::Receiver<Arc<RegisteredCheck>>>,
}

pub(crate) struct SubscribeResultsCmd {
    pub filter: Option<Filter<CheckResult>>,
    pub reply: oneshot::Sender<mpsc::Receiver<CheckResult>>,
}

pub(crate) struct OverallHealthCmd {
    pub reply: oneshot::Sender<Status>,
}

pub(crate) struct Inbound {
    pub register: mpsc::Receiver<RegisterCmd>,
    pub results: mpsc::Receiver<CheckResult>,
    pub list_checks: mpsc::Receiver<ListChecksCmd>,
    pub list_results: mpsc::Receiver<ListResultsCmd>,
    pub subscribe_checks: mpsc::Receiver<SubscribeChecksCmd>,
    pub subscribe_results: mpsc::Receiver<SubscribeResultsCmd>,
    pub overall_health: mpsc::Receiver<OverallHealthCmd>,
}

pub(crate) struct Outbound {
    pub register: mpsc::Sender<RegisterCmd>,
    pub results: mpsc::Sender<CheckResult>,
    pub list_checks: mpsc::Sender<ListChecksCmd>,
    pub list_results: mpsc::Sender<ListResultsCmd>,
    pub subscribe_checks: mpsc::Sender<SubscribeChecksCmd>,
    pub subscribe_results: mpsc::Sender<SubscribeResultsCmd>,
    pub overall_health: mpsc::Sender<OverallHealthCmd>,
}

pub(crate) fn channels() -> (Outbound, Inbound) {
    let (register_tx, register_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
    let (results_tx, results_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
    let (list_checks_tx, list_checks_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
    let (list_results_tx, list_results_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
    let (subscribe_checks_tx, subscribe_checks_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
    let (subscribe_results_tx, subscribe_results_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
    let (overall_health_tx, overall_health_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
    (
        Outbound {
            register: register_tx,
            results: results_tx,
            list_checks: list_checks_tx,
            list_results: list_results_tx,
            subscribe_checks: subscribe_checks_tx,
            subscribe_results: subscribe_results_tx,
            overall_health: overall_health_tx,
        },
        Inbound {
            register: register_rx,
            results: results_rx,
            list_checks: list_checks_rx,
            list_results: list_results_rx,
            subscribe_checks: subscribe_checks_rx,
            subscribe_results: subscribe_results_rx,
            overall_health: overall_health_rx,
        },
    )
}

/// Awaits `rx.recv()` when the receiver is still live; once it has
/// observed a closed channel it never polls again (a closed mpsc
/// receiver resolves immediately, which would otherwise starve the
/// other `select!` branches).
async fn recv_or_pending<T>(rx: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(r) => r.recv().await,
        None => std::future::pending().await,
    }
}

fn disable_if_closed<T>(rx: &mut Option<mpsc::Receiver<T>>, item: Option<T>) -> Option<T> {
    if item.is_none() {
        *rx = None;
    }
    item
}

/// Single-owner event loop: every mutation of check set, cache,
/// subscriber sets, and filters happens here and only here.
pub(crate) struct Serializer {
    options: ServiceOptions,
    ids: HashSet<String>,
    checks: Vec<Arc<RegisteredCheck>>,
    cache: ResultCache,
    registrations: Topic<Arc<RegisteredCheck>>,
    results_topic: Topic<CheckResult>,
    limiter: ConcurrencyLimiter,
    shutdown: CancellationToken,
}

impl Serializer {
    pub(crate) fn new(options: ServiceOptions, shutdown: CancellationToken) -> Self {
        let limiter = ConcurrencyLimiter::new(options.max_check_parallelism);
        Self {
            options,
            ids: HashSet::new(),
            checks: Vec::new(),
            cache: ResultCache::new(),
            registrations: Topic::new(),
            results_topic: Topic::new(),
            limiter,
            shutdown,
        }
    }

    pub(crate) fn spawn_loop(self, inbound: Inbound, results_tx: mpsc::Sender<CheckResult>) {
        tokio::spawn(self.run(inbound, results_tx));
    }

    async fn run(mut self, inbound: Inbound, results_tx: mpsc::Sender<CheckResult>) {
        let Inbound {
            register,
            results,
            list_checks,
            list_results,
            subscribe_checks,
            subscribe_results,
            overall_health,
        } = inbound;
        let mut register = Some(register);
        let mut results = Some(results);
        let mut list_checks = Some(list_checks);
        let mut list_results = Some(list_results);
        let mut subscribe_checks = Some(subscribe_checks);
        let mut subscribe_results = Some(subscribe_results);
        let mut overall_health = Some(overall_health);

        info!("health-check serializer started");
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    info!("shutdown observed; closing subscriber channels");
                    self.registrations.close_all();
                    self.results_topic.close_all();
                    break;
                }

                item = recv_or_pending(&mut results) => {
                    if let Some(result) = disable_if_closed(&mut results, item) {
                        self.cache.record(result.clone());
                        self.results_topic.publish(result);
                    }
                }

                item = recv_or_pending(&mut register) => {
                    if let Some(cmd) = disable_if_closed(&mut register, item) {
                        self.handle_register(cmd, results_tx.clone());
                    }
                }

                item = recv_or_pending(&mut list_checks) => {
                    if let Some(cmd) = disable_if_closed(&mut list_checks, item) {
                        let _ = cmd.reply.send(self.checks.clone());
                    }
                }

                item = recv_or_pending(&mut list_results) => {
                    if let Some(cmd) = disable_if_closed(&mut list_results, item) {
                        let filter = cmd.filter.as_deref();
                        let _ = cmd.reply.send(self.cache.snapshot(filter));
                    }
                }

                item = recv_or_pending(&mut subscribe_checks) => {
                    if let Some(cmd) = disable_if_closed(&mut subscribe_checks, item) {
                        let rx = self.registrations.subscribe(None);
                        let _ = cmd.reply.send(rx);
                    }
                }

                item = recv_or_pending(&mut subscribe_results) => {
                    if let Some(cmd) = disable_if_closed(&mut subscribe_results, item) {
                        let rx = self.results_topic.subscribe(cmd.filter);
                        let _ = cmd.reply.send(rx);
                    }
                }

                item = recv_or_pending(&mut overall_health) => {
                    if let Some(cmd) = disable_if_closed(&mut overall_health, item) {
                        let _ = cmd.reply.send(health::overall(self.cache.values()));
                    }
                }

                else => {
                    debug!("all inbound queues closed; stopping");
                    break;
                }
            }
        }
        debug!("serializer loop exited");
    }

    fn handle_register(&mut self, cmd: RegisterCmd, results_tx: mpsc::Sender<CheckResult>) {
        let RegisterCmd { check, opts, probe, reply } = cmd;

        let normalized = crate::check::normalize_and_validate(
            check,
            opts,
            probe.as_ref(),
            self.options.min_run_interval,
            self.options.max_timeout,
            self.options.default_timeout,
            self.options.default_run_interval,
        );

        let (check, opts) = match normalized {
            Ok(pair) => pair,
            Err(e) => {
                let _ = reply.send(Err(CoreError::Validation(e)));
                return;
            }
        };

        // `probe` is guaranteed `Some` here: a `None` probe is exactly
        // `Violation::NilChecker`, which normalize_and_validate rejects.
        let probe = probe.expect("validated registration always carries a probe");

        if self.ids.contains(&check.id) {
            warn!(check_id = %check.id, "duplicate registration rejected");
            let _ = reply.send(Err(CoreError::AlreadyRegistered(check.id)));
            return;
        }

        let registered = Arc::new(RegisteredCheck { check, opts, probe });
        self.ids.insert(registered.check.id.clone());
        self.checks.push(registered.clone());

        scheduler::spawn(
            registered.clone(),
            self.limiter.clone(),
            results_tx,
            self.shutdown.clone(),
        );

        info!(check_id = %registered.check.id, "check registered");
        self.registrations.publish(registered);
        let _ = reply.send(Ok(()));
    }
}

/// Spawns the Serializer task and wires its inbound queues. Returns the
/// sender bundle the public `Service` handle uses, plus the
/// `CancellationToken` that drives shutdown.
pub(crate) fn start(options: ServiceOptions) -> (Outbound, CancellationToken) {
    let (outbound, inbound) = channels();
    let shutdown = CancellationToken::new();
    let serializer = Serializer::new(options, shutdown.clone());
    serializer.spawn_loop(inbound, outbound.results.clone());
    (outbound, shutdown)
}
