//! CLI command implementations

pub mod logs;
pub mod migrate;
pub mod normalize;

use std::path::{Path, PathBuf};

use anyhow::Result;
use vinotes_core::config::Config;
use vinotes_core::{ImageTarget, LogEvent, LoggingService, MaintenanceContext};

/// Get the run log
///
/// Returns None if the log cannot be opened (logging never blocks a run)
pub fn get_logger() -> Option<LoggingService> {
    let state_dir = get_state_dir();
    std::fs::create_dir_all(&state_dir).ok()?;
    LoggingService::new(&state_dir, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// State directory from VINOTES_DIR, else ~/.vinotes
pub fn get_state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("VINOTES_DIR") {
        PathBuf::from(dir)
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vinotes")
    }
}

/// Load configuration and build the context
///
/// Fails before any network traffic when the endpoint or key is missing.
pub fn get_context(env_file: Option<&Path>, target: ImageTarget) -> Result<MaintenanceContext> {
    let config = Config::load(env_file)?;
    MaintenanceContext::new(config, target)
}
