// EDB - Ethereum Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Logging configuration for EDR components
//!
//! Provides centralized logging setup with:
//! - Colorful console output with structured formatting
//! - File logging to a per-component directory
//! - Environment variable support (RUST_LOG, EDR_LOG_DIR)
//!
//! The file-backed initialisers return the path of the log file so that the
//! runtime can report it to its owner.

use eyre::Result;
use std::{env, fs, path::PathBuf, sync::Once};
use tracing::Level;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::env::EDR_LOG_DIR;

/// Initialize logging for EDR components
///
/// This function sets up:
/// - Colorful, structured console logging with timestamps
/// - Optional file logging into the component's log directory
/// - Environment variable support for log levels (RUST_LOG)
/// - Default INFO level if no RUST_LOG is set
///
/// # Arguments
/// * `component_name` - Name of the component (e.g., "edr")
/// * `enable_file_logging` - Whether to also write logs to a file
///
/// # Returns
/// The log file path when file logging is enabled, `None` otherwise
///
/// # Examples
/// ```rust,no_run
/// use edr_common::logging;
///
/// fn main() -> eyre::Result<()> {
///     let log_file = logging::init_logging("edr", true)?;
///     tracing::info!(?log_file, "Application started");
///     Ok(())
/// }
/// ```
pub fn init_logging(component_name: &str, enable_file_logging: bool) -> Result<Option<PathBuf>> {
    let env_filter = default_env_filter(Level::INFO)?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_timer(LocalTime::rfc_3339())
        .with_ansi(true)
        .pretty();

    if enable_file_logging {
        let log_dir = create_log_directory(component_name)?;
        let log_file = log_dir.join(log_file_name(component_name));

        let file_appender = rolling::never(&log_dir, log_file_name(component_name));
        let (non_blocking_appender, guard) = non_blocking(file_appender);

        // The guard flushes on drop; the subscriber lives for the whole process
        std::mem::forget(guard);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(LocalTime::rfc_3339())
            .with_ansi(false)
            .with_writer(non_blocking_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer.with_filter(filter_for_console()?))
            .with(file_layer.with_filter(filter_for_file()))
            .try_init()
            .map_err(|e| eyre::eyre!("Failed to initialize tracing subscriber: {}", e))?;

        tracing::info!(
            component = component_name,
            log_file = %log_file.display(),
            "Logging initialized with console and file output"
        );
        log_environment_info(component_name);

        Ok(Some(log_file))
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()
            .map_err(|e| eyre::eyre!("Failed to initialize tracing subscriber: {}", e))?;

        tracing::info!(component = component_name, "Logging initialized with console output only");
        log_environment_info(component_name);

        Ok(None)
    }
}

/// Initialize logging that only writes to the component's log file
///
/// Used when the console belongs to something else, e.g. when the output of
/// a client command is piped into another program.
pub fn init_file_only_logging(component_name: &str) -> Result<PathBuf> {
    let env_filter = default_env_filter(Level::INFO)?;

    let log_dir = create_log_directory(component_name)?;
    let log_file = log_dir.join(log_file_name(component_name));

    let file_appender = rolling::never(&log_dir, log_file_name(component_name));
    let (non_blocking_appender, guard) = non_blocking(file_appender);
    std::mem::forget(guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(LocalTime::rfc_3339())
                .with_ansi(false)
                .with_writer(non_blocking_appender),
        )
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(component = component_name, log_file = %log_file.display(), "File logging initialized");

    Ok(log_file)
}

fn log_file_name(component_name: &str) -> String {
    format!("{component_name}.log")
}

fn default_env_filter(level: Level) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .map_err(|e| eyre::eyre!("Failed to create environment filter: {}", e))
}

/// Create the log directory, honouring `EDR_LOG_DIR` when it is set
fn create_log_directory(component_name: &str) -> Result<PathBuf> {
    let log_dir = match env::var(EDR_LOG_DIR) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir).join(component_name),
        _ => env::temp_dir().join("edr-logs").join(component_name),
    };

    fs::create_dir_all(&log_dir)?;

    Ok(log_dir)
}

/// Filter for console output
fn filter_for_console() -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("tower_http=warn".parse()?) // Reduce HTTP noise
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?))
}

/// Filter for file output - be more verbose for debugging
fn filter_for_file() -> EnvFilter {
    EnvFilter::from_default_env()
}

fn log_environment_info(component_name: &str) {
    let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let args: Vec<String> = env::args().collect();

    tracing::info!(
        component = component_name,
        rust_log = %rust_log,
        args = ?args,
        "Environment information"
    );

    if let Ok(current_dir) = env::current_dir() {
        tracing::debug!(
            working_directory = %current_dir.display(),
            "Working directory"
        );
    }
}

/// Initialize simple logging (console only, no fancy formatting)
///
/// # Arguments
/// * `level` - The default log level to use
pub fn init_simple_logging(level: Level) -> Result<()> {
    let env_filter = default_env_filter(level)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to initialize simple logging: {}", e))?;

    Ok(())
}

static TEST_LOGGING_INIT: Once = Once::new();

/// Safe logging initialization for tests - can be called multiple times
///
/// Console-only, INFO by default, respects RUST_LOG.
///
/// # Usage
/// ```rust
/// use edr_common::logging;
/// use tracing::info;
///
/// logging::ensure_test_logging(None);
/// info!("This will work safely in any test!");
/// ```
pub fn ensure_test_logging(default_level: Option<Level>) {
    TEST_LOGGING_INIT.call_once(|| {
        let default_level = default_level.unwrap_or(Level::INFO);
        // A subscriber may already be installed by another harness
        let _ = init_simple_logging(default_level);
    });
}
