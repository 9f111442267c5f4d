use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, warn};

use crate::check::Probe;
use crate::status::CheckResult;

// On timeout the probe's task is not aborted, it is abandoned: user probes
// cannot always be interrupted safely. A panic is caught via JoinHandle.
pub(crate) async fn run_with_timeout(id: &str, probe: &Probe, timeout: Duration) -> CheckResult {
    let started_at = SystemTime::now();
    let start = Instant::now();
    let fut = probe();
    let handle = tokio::spawn(fut);

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(outcome)) => {
            let duration = start.elapsed();
            CheckResult::from_outcome(id.to_string(), outcome, started_at, duration)
        }
        Ok(Err(join_err)) => {
            let duration = start.elapsed();
            let message = if join_err.is_panic() {
                panic_message(join_err.into_panic())
            } else {
                "probe task was cancelled".to_string()
            };
            warn!(check_id = id, %message, "probe panicked");
            CheckResult::panicked(id.to_string(), message, started_at, duration)
        }
        Err(_elapsed) => {
            debug!(check_id = id, ?timeout, "probe timed out; abandoning worker");
            CheckResult::timeout(id.to_string(), SystemTime::now() - timeout, timeout)
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "probe panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::ProbeFuture;
    use crate::status::{ProbeError, Status};
    use std::sync::Arc;

    #[tokio::test]
    async fn completes_fast_probe_as_green() {
        let probe: Probe = Arc::new(|| Box::pin(async { Ok(()) }) as ProbeFuture);
        let result = run_with_timeout("id", &probe, Duration::from_secs(1)).await;
        assert_eq!(result.status, Status::Green);
        assert!(result.err.is_none());
    }

    #[tokio::test]
    async fn maps_degraded_error_to_yellow() {
        let probe: Probe = Arc::new(|| {
            Box::pin(async { Err(ProbeError::degraded("slow downstream")) }) as ProbeFuture
        });
        let result = run_with_timeout("id", &probe, Duration::from_secs(1)).await;
        assert_eq!(result.status, Status::Yellow);
    }

    #[tokio::test]
    async fn maps_other_error_to_red() {
        let probe: Probe =
            Arc::new(|| Box::pin(async { Err(ProbeError::failed("boom")) }) as ProbeFuture);
        let result = run_with_timeout("id", &probe, Duration::from_secs(1)).await;
        assert_eq!(result.status, Status::Red);
    }

    #[tokio::test]
    async fn abandons_slow_probe_as_timeout() {
        let probe: Probe = Arc::new(|| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            }) as ProbeFuture
        });
        let result = run_with_timeout("id", &probe, Duration::from_millis(1)).await;
        assert_eq!(result.status, Status::Red);
        assert!(result.err.as_ref().expect("timeout carries an error").is_timeout());
    }

    #[tokio::test]
    async fn catches_panic_as_red() {
        let probe: Probe = Arc::new(|| Box::pin(async { panic!("boom") }) as ProbeFuture);
        let result = run_with_timeout("id", &probe, Duration::from_secs(1)).await;
        assert_eq!(result.status, Status::Red);
        assert!(!result.err.expect("panic carries an error").is_timeout());
    }
}
