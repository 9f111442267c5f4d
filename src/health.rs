use crate::status::{CheckResult, Status};

/// Reduces the current cache to a single aggregate `Status`: Red if any
/// cached result is Red, else Yellow if any is Yellow, else Green
/// (including the empty-cache case).
pub(crate) fn overall<'a>(results: impl Iterator<Item = &'a CheckResult>) -> Status {
    results.fold(Status::Green, |acc, r| acc.max(r.status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn result(status: Status) -> CheckResult {
        CheckResult {
            id: "x".into(),
            status,
            err: None,
            started_at: SystemTime::now(),
            duration: Duration::from_millis(1),
        }
    }

    #[test]
    fn empty_cache_is_green() {
        assert_eq!(overall(std::iter::empty()), Status::Green);
    }

    #[test]
    fn red_dominates() {
        let results = vec![result(Status::Green), result(Status::Yellow), result(Status::Red)];
        assert_eq!(overall(results.iter()), Status::Red);
    }

    #[test]
    fn yellow_without_red() {
        let results = vec![result(Status::Green), result(Status::Yellow)];
        assert_eq!(overall(results.iter()), Status::Yellow);
    }

    #[test]
    fn all_green_is_green() {
        let results = vec![result(Status::Green), result(Status::Green)];
        assert_eq!(overall(results.iter()), Status::Green);
    }
}
