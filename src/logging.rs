//! Logging setup for the binary
//!
//! Two sinks: stderr at INFO (overridable through `RUST_LOG`) and a log file
//! at DEBUG. The library itself never installs a subscriber.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{Error, Result};

/// Host name from `HOSTNAME` or `/etc/hostname`, else `localhost`.
#[must_use]
pub fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// `compare-<host>-<YYYY-MM-DD-HH:MM>`, the stem of the log and results files.
///
/// ```rust
/// use bkz_compare::logging::run_name;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap();
/// assert_eq!(run_name("lab1", &at), "compare-lab1-2024-03-09-07:05");
/// ```
#[must_use]
pub fn run_name<Tz: TimeZone>(host: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("compare-{host}-{}", at.format("%Y-%m-%d-%H:%M"))
}

/// Install the global subscriber. With `log_file`, DEBUG output also goes
/// there (ANSI off).
///
/// # Errors
///
/// Returns `Io` if the log file cannot be created and `Other` if a global
/// subscriber is already set.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_writer(Mutex::new(File::create(path)?))
                .with_ansi(false)
                .with_filter(LevelFilter::DEBUG),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                ),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("failed to install subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_run_name_format() {
        let at = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 30).unwrap();
        assert_eq!(run_name("node", &at), "compare-node-2025-12-31-23:59");
    }

    #[test]
    fn test_hostname_not_empty() {
        assert!(!hostname().is_empty());
    }
}
