//! # Logger
//!
//! Installs the global `tracing` subscriber for Bazaar binaries.
//!
//! The console gets compact colored lines. A [`FileOutput`] adds a rolling,
//! non-blocking file writer that can emit JSON lines. `RUST_LOG` wins over the
//! configured level unless explicit directives are given with
//! [`LoggerBuilder::env_filter`].
//!
//! ## Example
//!
//! ```rust
//! # use bazaar_logger::{FileOutput, Logger, LevelFilter, parse_rotation};
//! # let dir = tempfile::tempdir().unwrap();
//! let _logger = Logger::builder()
//!     .name("bazaar-client")
//!     .level(LevelFilter::DEBUG)
//!     .file(FileOutput::new(dir.path()).rotation(parse_rotation("hourly").unwrap()).max_files(3))
//!     .init()
//!     .unwrap();
//! ```

mod builder;
mod error;
mod output;

pub use crate::builder::{LoggerBuilder, Named, Unnamed};
pub use crate::error::{LoggerError, LoggerErrorExt};
pub use crate::output::FileOutput;
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;

/// Handle to the installed subscriber.
///
/// Owns the background file writer; buffered lines are flushed when it drops.
#[must_use = "Dropping this handle stops the background file writer."]
#[derive(Debug)]
pub struct Logger {
    writer: Option<(PathBuf, WorkerGuard)>,
}

impl Logger {
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Directory receiving log files, if file output is enabled.
    #[must_use]
    pub fn directory(&self) -> Option<&Path> {
        self.writer.as_ref().map(|(dir, _)| dir.as_path())
    }

    #[must_use]
    pub const fn writes_to_file(&self) -> bool {
        self.writer.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if let Some((dir, _)) = &self.writer {
            tracing::debug!(directory = %dir.display(), "Flushing log files");
        }
    }
}

/// Parses a level name from configuration (`"trace"` .. `"error"`, `"off"`).
///
/// # Errors
/// Returns [`LoggerError::InvalidConfiguration`] for unknown names.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggerError> {
    level.trim().parse::<LevelFilter>().map_err(|e| LoggerError::InvalidConfiguration {
        message: format!("Unknown log level '{level}': {e}").into(),
        context: None,
    })
}

/// Parses a rotation name from configuration: `minutely`, `hourly`, `daily`, or `never`.
///
/// # Errors
/// Returns [`LoggerError::InvalidConfiguration`] for anything else.
pub fn parse_rotation(rotation: &str) -> Result<Rotation, LoggerError> {
    match rotation.trim().to_ascii_lowercase().as_str() {
        "minutely" => Ok(Rotation::MINUTELY),
        "hourly" => Ok(Rotation::HOURLY),
        "daily" => Ok(Rotation::DAILY),
        "never" => Ok(Rotation::NEVER),
        _ => Err(LoggerError::InvalidConfiguration {
            message: format!("Unknown rotation '{rotation}', expected minutely, hourly, daily or never").into(),
            context: None,
        }),
    }
}
