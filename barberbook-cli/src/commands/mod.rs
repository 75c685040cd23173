//! CLI command implementations

pub mod barber;
pub mod booking;
pub mod client;
pub mod demo;
pub mod logs;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use barberbook_core::services::{EntryPoint, LogEvent, LoggingService};
use barberbook_core::BarberbookContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<Arc<LoggingService>> {
    let app_dir = get_app_dir().ok()?;
    std::fs::create_dir_all(&app_dir).ok()?;
    LoggingService::new(&app_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
        .ok()
        .map(Arc::new)
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the app directory from environment or default
pub fn get_app_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BARBERBOOK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".barberbook"))
        .ok_or_else(|| anyhow!("Could not find home directory; set BARBERBOOK_DIR"))
}

/// Open the barberbook context, restoring both sessions
pub fn get_context(logger: &Option<Arc<LoggingService>>) -> Result<BarberbookContext> {
    let app_dir = get_app_dir()?;

    std::fs::create_dir_all(&app_dir)
        .with_context(|| format!("Failed to create barberbook directory: {:?}", app_dir))?;

    BarberbookContext::open(&app_dir, logger.clone()).context("Failed to initialize barberbook context")
}

/// Ask before a destructive action unless `--force` was given
pub fn confirm(prompt: &str, force: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }
    Ok(dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

/// Read a password from the flag or prompt for it without echo
pub fn password_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(password) => Ok(password),
        None => Ok(dialoguer::Password::new().with_prompt(prompt).interact()?),
    }
}
