use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use ulid::Ulid;

use crate::error::{Violation, ValidationError};
use crate::status::ProbeOutcome;

pub type ProbeFuture = Pin<Box<dyn Future<Output = ProbeOutcome> + Send>>;
pub type Probe = Arc<dyn Fn() -> ProbeFuture + Send + Sync>;

/// Immutable once admitted.
#[derive(Debug, Clone)]
pub struct Check {
    pub id: String,
    pub description: String,
    pub red_impact: String,
    pub yellow_impact: Option<String>,
    pub tags: Vec<String>,
}

/// `Duration::ZERO` for either field means "use the service default".
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckerOpts {
    pub timeout: Duration,
    pub run_interval: Duration,
}

/// Fields are never mutated after construction.
#[derive(Clone)]
pub struct RegisteredCheck {
    pub check: Check,
    pub opts: CheckerOpts,
    pub probe: Probe,
}

impl std::fmt::Debug for RegisteredCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCheck")
            .field("check", &self.check)
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

fn is_ulid(s: &str) -> bool {
    Ulid::from_string(s).is_ok()
}

/// Returns the normalized pair, or every violation found at once (never
/// just the first).
pub(crate) fn normalize_and_validate(
    mut check: Check,
    mut opts: CheckerOpts,
    probe: Option<&Probe>,
    min_run_interval: Duration,
    max_timeout: Duration,
    default_timeout: Duration,
    default_run_interval: Duration,
) -> Result<(Check, CheckerOpts), ValidationError> {
    // Normalization order: trim, then default-fill, then validate.
    check.id = check.id.trim().to_string();
    check.description = check.description.trim().to_string();
    check.red_impact = check.red_impact.trim().to_string();
    check.yellow_impact = check
        .yellow_impact
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    check.tags = check.tags.iter().map(|t| t.trim().to_string()).collect();

    if opts.timeout.is_zero() {
        opts.timeout = default_timeout;
    }
    if opts.run_interval.is_zero() {
        opts.run_interval = default_run_interval;
    }

    let mut violations = Vec::new();

    if !is_ulid(&check.id) {
        violations.push(Violation::IdNotUlid);
    }
    if check.description.is_empty() {
        violations.push(Violation::BlankDescription);
    }
    if check.red_impact.is_empty() {
        violations.push(Violation::BlankRedImpact);
    }
    for tag in &check.tags {
        if !is_ulid(tag) {
            violations.push(Violation::TagNotUlid(tag.clone()));
        }
    }
    if probe.is_none() {
        violations.push(Violation::NilChecker);
    }
    if opts.run_interval < min_run_interval {
        violations.push(Violation::RunIntervalTooFrequent);
    }
    if opts.timeout > max_timeout {
        violations.push(Violation::RunTimeoutTooHigh);
    }

    if violations.is_empty() {
        Ok((check, opts))
    } else {
        Err(ValidationError::new(violations))
    }
}
