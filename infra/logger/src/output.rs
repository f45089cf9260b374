use crate::error::LoggerError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::Layer;
use tracing_subscriber::registry::LookupSpan;

const LOG_FILE_SUFFIX: &str = "log";

pub(crate) type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Rolling file output. Files are named `<logger name>.<period>.log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutput {
    directory: PathBuf,
    rotation: Rotation,
    max_files: usize,
    json: bool,
}

impl FileOutput {
    /// Daily rotation keeping the last seven files, plain text.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into(), rotation: Rotation::DAILY, max_files: 7, json: false }
    }

    #[must_use]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Rotated files kept on disk; older ones are deleted.
    #[must_use]
    pub const fn max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    /// One JSON object per line instead of plain text.
    #[must_use]
    pub const fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Creates the directory and a non-blocking writer rolling over `prefix.*.log`.
    pub(crate) fn open<S>(&self, prefix: &str) -> Result<(BoxedLayer<S>, WorkerGuard), LoggerError>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        if self.max_files == 0 {
            return Err(LoggerError::InvalidConfiguration {
                message: "max_files must be greater than zero".into(),
                context: Some(self.directory.display().to_string().into()),
            });
        }

        fs::create_dir_all(&self.directory).map_err(|e| LoggerError::Internal {
            message: e.to_string().into(),
            context: Some(format!("Failed to create log directory {}", self.directory.display()).into()),
        })?;

        let appender = RollingFileAppender::builder()
            .rotation(self.rotation.clone())
            .filename_prefix(prefix)
            .filename_suffix(LOG_FILE_SUFFIX)
            .max_log_files(self.max_files)
            .build(&self.directory)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let fmt = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
        let layer = if self.json { fmt.json().boxed() } else { fmt.boxed() };
        Ok((layer, guard))
    }
}
