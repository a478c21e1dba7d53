//! Process-wide log setup: one daily-rotated file, installed at most once.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::ServiceError;

pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_FILE: &str = "application.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub dir: PathBuf,
    /// Rotated files are named `<file_name>.YYYY-MM-DD`.
    pub file_name: String,
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from(DEFAULT_LOG_DIR), file_name: DEFAULT_LOG_FILE.into(), default_filter: "info".into() }
    }
}

static INSTALLED: Mutex<bool> = Mutex::new(false);
// Keeps the background writer alive for the life of the process.
static WRITER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the file subscriber. Returns `Ok(false)` when logging was already set up.
pub fn init_logging(config: &LogConfig) -> Result<bool, ServiceError> {
    let mut installed = INSTALLED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if *installed { return Ok(false); }

    fs::create_dir_all(&config.dir)
        .map_err(|e| ServiceError::Logging(format!("create log dir `{}`: {e}", config.dir.display())))?;
    let appender = tracing_appender::rolling::daily(&config.dir, &config.file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| ServiceError::Logging(e.to_string()))?;

    let _ = WRITER_GUARD.set(guard);
    *installed = true;
    Ok(true)
}

/// Whether [`init_logging`] has installed the subscriber in this process.
pub fn is_initialized() -> bool {
    *INSTALLED.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
