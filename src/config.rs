use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Copy)]
pub struct ServiceOptions {
    pub min_run_interval: Duration,
    pub max_timeout: Duration,
    pub default_timeout: Duration,
    pub default_run_interval: Duration,
    pub max_check_parallelism: usize,
    pub fail_fast_on_startup: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            min_run_interval: Duration::from_secs(1),
            max_timeout: Duration::from_secs(30),
            default_timeout: Duration::from_secs(5),
            default_run_interval: Duration::from_secs(15),
            max_check_parallelism: 8,
            fail_fast_on_startup: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawServiceOptions {
    #[serde(default = "default_min_run_interval_ms")]
    min_run_interval_ms: u64,
    #[serde(default = "default_max_timeout_ms")]
    max_timeout_ms: u64,
    #[serde(default = "default_timeout_ms")]
    default_timeout_ms: u64,
    #[serde(default = "default_run_interval_ms")]
    default_run_interval_ms: u64,
    #[serde(default = "default_max_parallelism")]
    max_check_parallelism: usize,
    #[serde(default)]
    fail_fast_on_startup: bool,
}

fn default_min_run_interval_ms() -> u64 {
    1_000
}
fn default_max_timeout_ms() -> u64 {
    30_000
}
fn default_timeout_ms() -> u64 {
    5_000
}
fn default_run_interval_ms() -> u64 {
    15_000
}
fn default_max_parallelism() -> usize {
    8
}

impl ServiceOptions {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let bytes = fs::read(path_ref)
            .with_context(|| format!("failed to read service options file {:?}", path_ref))?;
        let raw: RawServiceOptions =
            serde_json::from_slice(&bytes).context("failed to parse service options JSON")?;
        Ok(Self {
            min_run_interval: Duration::from_millis(raw.min_run_interval_ms),
            max_timeout: Duration::from_millis(raw.max_timeout_ms),
            default_timeout: Duration::from_millis(raw.default_timeout_ms),
            default_run_interval: Duration::from_millis(raw.default_run_interval_ms),
            max_check_parallelism: raw.max_check_parallelism.max(1),
            fail_fast_on_startup: raw.fail_fast_on_startup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let opts = ServiceOptions::default();
        assert!(opts.max_check_parallelism >= 1);
        assert!(opts.max_timeout >= opts.default_timeout);
    }

    #[test]
    fn loads_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"min_run_interval_ms": 500, "max_timeout_ms": 10000, "default_timeout_ms": 2000, "default_run_interval_ms": 5000, "max_check_parallelism": 4, "fail_fast_on_startup": true}}"#
        )
        .unwrap();
        let opts = ServiceOptions::from_file(file.path()).unwrap();
        assert_eq!(opts.min_run_interval, Duration::from_millis(500));
        assert_eq!(opts.max_check_parallelism, 4);
        assert!(opts.fail_fast_on_startup);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        let opts = ServiceOptions::from_file(file.path()).unwrap();
        assert_eq!(opts.default_timeout, Duration::from_secs(5));
    }
}
