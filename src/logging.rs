//! Logging setup
//!
//! Every run writes to the console and to a fresh timestamped file under
//! the log directory, e.g. `logs/10_17_2026_14_03_59.log`.

use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{PipelineError, Result};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "regress_pipeline=info,regress=info,tower_http=info";

/// Log file name for a run started at `started_at`
pub fn log_file_name(started_at: DateTime<Local>) -> String {
    started_at.format("%m_%d_%Y_%H_%M_%S.log").to_string()
}

/// Install the global subscriber and return the path of the log file.
pub fn init(log_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(log_file_name(Local::now()));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .try_init()
        .map_err(|e| PipelineError::Config(format!("cannot install logger: {}", e)))?;

    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_file_name_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(log_file_name(at), "03_07_2024_09_05_01.log");
    }
}
