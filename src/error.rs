use thiserror::Error;

/// One reason a `Check`/`CheckerOpts` pair was rejected at registration.
///
/// The validator collects every violation it finds rather than stopping at
/// the first one, so a single `Register` call can carry several of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("id is not a valid ULID")]
    IdNotUlid,
    #[error("description is blank")]
    BlankDescription,
    #[error("redImpact is blank")]
    BlankRedImpact,
    #[error("tag {0:?} is not a valid ULID")]
    TagNotUlid(String),
    #[error("probe is nil")]
    NilChecker,
    #[error("runInterval is shorter than the configured minimum")]
    RunIntervalTooFrequent,
    #[error("timeout exceeds the configured maximum")]
    RunTimeoutTooHigh,
}

/// Composite validation failure: every [`Violation`] found in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid check: {}", .violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub(crate) fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn contains(&self, violation: &Violation) -> bool {
        self.violations.contains(violation)
    }
}

/// The closed error taxonomy the core surfaces to callers.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// The service has shut down; it accepts no further requests.
    #[error("service is not running")]
    ServiceNotRunning,

    /// `Register` was called for an id that is already admitted.
    #[error("check {0:?} is already registered")]
    AlreadyRegistered(String),

    /// The submitted Check/CheckerOpts pair failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type CoreResult<T> = Result<T, CoreError>;
