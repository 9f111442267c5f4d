use std::collections::HashMap;

use crate::status::CheckResult;

/// Latest result per admitted check, owned exclusively by the Serializer.
#[derive(Default)]
pub(crate) struct ResultCache {
    latest: HashMap<String, CheckResult>,
}

impl ResultCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Write is the only mutation the cache ever sees; it always
    /// supersedes whatever was there for this id.
    pub(crate) fn record(&mut self, result: CheckResult) {
        self.latest.insert(result.id.clone(), result);
    }

    /// A defensive copy of every cached result, optionally filtered.
    pub(crate) fn snapshot(&self, filter: Option<&(dyn Fn(&CheckResult) -> bool + Send + Sync)>) -> Vec<CheckResult> {
        self.latest
            .values()
            .filter(|r| filter.map(|f| f(r)).unwrap_or(true))
            .cloned()
            .collect()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &CheckResult> {
        self.latest.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;
    use std::time::{Duration, SystemTime};

    fn result(id: &str, status: Status) -> CheckResult {
        CheckResult {
            id: id.to_string(),
            status,
            err: None,
            started_at: SystemTime::now(),
            duration: Duration::from_millis(1),
        }
    }

    #[test]
    fn record_supersedes_previous_result() {
        let mut cache = ResultCache::new();
        cache.record(result("a", Status::Green));
        cache.record(result("a", Status::Red));
        let snap = cache.snapshot(None);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].status, Status::Red);
    }

    #[test]
    fn snapshot_applies_filter() {
        let mut cache = ResultCache::new();
        cache.record(result("a", Status::Green));
        cache.record(result("b", Status::Red));
        let filter: &(dyn Fn(&CheckResult) -> bool + Send + Sync) = &|r: &CheckResult| r.status == Status::Red;
        let snap = cache.snapshot(Some(filter));
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].id, "b");
    }
}
