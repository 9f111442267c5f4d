use std::error::Error as StdError;
use std::fmt;
use std::time::{Duration, SystemTime};

/// Ordered `Green < Yellow < Red` so `max` picks the worst one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Status {
    Green,
    Yellow,
    Red,
}

impl Status {
    pub fn max(self, other: Status) -> Status {
        std::cmp::max(self, other)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Green => "green",
            Status::Yellow => "yellow",
            Status::Red => "red",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeErrorKind {
    Failed,
    Degraded,
    Timeout,
    Panicked,
}

/// Error returned by a probe. A probe that wants to report "functioning but
/// degraded" rather than outright failure returns `ProbeError::degraded(..)`;
/// anything else maps to Red. `is_timeout` distinguishes the wrapper's own
/// `ErrTimeout` from an ordinary probe failure so callers can match it
/// symbolically instead of on the error text.
#[derive(Debug)]
pub struct ProbeError {
    source: Box<dyn StdError + Send + Sync>,
    kind: ProbeErrorKind,
}

impl ProbeError {
    pub fn degraded<E>(source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self {
            source: source.into(),
            kind: ProbeErrorKind::Degraded,
        }
    }

    pub fn failed<E>(source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self {
            source: source.into(),
            kind: ProbeErrorKind::Failed,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.kind == ProbeErrorKind::Degraded
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ProbeErrorKind::Timeout
    }

    pub fn is_panic(&self) -> bool {
        self.kind == ProbeErrorKind::Panicked
    }

    pub(crate) fn timeout() -> Self {
        Self {
            source: "probe did not complete before its timeout".into(),
            kind: ProbeErrorKind::Timeout,
        }
    }

    pub(crate) fn panicked(message: String) -> Self {
        Self {
            source: message.into(),
            kind: ProbeErrorKind::Panicked,
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl StdError for ProbeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

impl<E> From<E> for ProbeError
where
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    fn from(source: E) -> Self {
        Self::failed(source)
    }
}

pub type ProbeOutcome = Result<(), ProbeError>;

/// Snapshot of one probe run, cached per check id and published to
/// subscribers of the results topic.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub id: String,
    pub status: Status,
    pub err: Option<std::sync::Arc<ProbeError>>,
    pub started_at: SystemTime,
    pub duration: Duration,
}

impl CheckResult {
    pub(crate) fn from_outcome(
        id: String,
        outcome: ProbeOutcome,
        started_at: SystemTime,
        duration: Duration,
    ) -> Self {
        match outcome {
            Ok(()) => Self {
                id,
                status: Status::Green,
                err: None,
                started_at,
                duration,
            },
            Err(e) => {
                let status = if e.is_degraded() { Status::Yellow } else { Status::Red };
                Self {
                    id,
                    status,
                    err: Some(std::sync::Arc::new(e)),
                    started_at,
                    duration,
                }
            }
        }
    }

    pub(crate) fn timeout(id: String, started_at: SystemTime, duration: Duration) -> Self {
        Self {
            id,
            status: Status::Red,
            err: Some(std::sync::Arc::new(ProbeError::timeout())),
            started_at,
            duration,
        }
    }

    pub(crate) fn panicked(id: String, message: String, started_at: SystemTime, duration: Duration) -> Self {
        Self {
            id,
            status: Status::Red,
            err: Some(std::sync::Arc::new(ProbeError::panicked(message))),
            started_at,
            duration,
        }
    }
}
