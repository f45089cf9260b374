use crate::Logger;
use crate::error::LoggerError;
use crate::output::{BoxedLayer, FileOutput};
use private::Sealed;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type Filtered = Layered<EnvFilter, Registry>;

#[derive(Debug)]
pub struct Unnamed;
#[derive(Debug)]
pub struct Named(String);

mod private {
    pub trait Sealed {}
}
impl Sealed for Unnamed {}
impl Sealed for Named {}

/// Configures the global subscriber. A name is required before [`init`](LoggerBuilder::init).
#[derive(Debug)]
pub struct LoggerBuilder<N: Sealed = Unnamed> {
    name: N,
    level: LevelFilter,
    directives: Option<String>,
    console: bool,
    targets: bool,
    file: Option<FileOutput>,
}

impl LoggerBuilder {
    pub(crate) const fn new() -> Self {
        Self { name: Unnamed, level: LevelFilter::INFO, directives: None, console: true, targets: false, file: None }
    }

    /// Identifies the process; also the prefix of rolled log files.
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<Named> {
        LoggerBuilder {
            name: Named(name.into()),
            level: self.level,
            directives: self.directives,
            console: self.console,
            targets: self.targets,
            file: self.file,
        }
    }
}

impl<N: Sealed> LoggerBuilder<N> {
    /// Minimum level when neither `RUST_LOG` nor explicit directives say otherwise.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Explicit filter directives (e.g. `bazaar_realtime=debug,tungstenite=warn`).
    /// They replace `RUST_LOG`.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn env_filter(mut self, directives: impl Into<String>) -> Self {
        self.directives = Some(directives.into());
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    /// Prints event targets (module paths) on the console.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn targets(mut self, enabled: bool) -> Self {
        self.targets = enabled;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn file(mut self, output: FileOutput) -> Self {
        self.file = Some(output);
        self
    }

    fn filter(&self) -> Result<EnvFilter, LoggerError> {
        let builder = EnvFilter::builder().with_default_directive(self.level.into());
        match &self.directives {
            Some(directives) => builder.parse(directives).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("Invalid env filter '{directives}': {e}").into(),
                context: None,
            }),
            None => Ok(builder.from_env_lossy()),
        }
    }
}

impl LoggerBuilder<Named> {
    /// Installs the global subscriber.
    ///
    /// Keep the returned [`Logger`] alive until shutdown so file output is flushed.
    ///
    /// # Errors
    /// Returns [`LoggerError::InvalidConfiguration`] for a blank name, bad
    /// directives, zero `max_files`, or when no output is enabled.
    /// Returns [`LoggerError::Appender`] if the log file cannot be created and
    /// [`LoggerError::Subscriber`] if a global subscriber is already set.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let name = self.name.0.trim();
        if name.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "Logger name cannot be empty".into(),
                context: None,
            });
        }
        if !self.console && self.file.is_none() {
            return Err(LoggerError::InvalidConfiguration {
                message: "No log output enabled; enable the console or a log directory".into(),
                context: Some(name.to_owned().into()),
            });
        }

        let filter = self.filter()?;
        let mut layers: Vec<BoxedLayer<Filtered>> = Vec::with_capacity(2);

        if self.console {
            layers.push(tracing_subscriber::fmt::layer().compact().with_target(self.targets).boxed());
        }

        let writer = match &self.file {
            Some(output) => {
                let (layer, guard) = output.open(name)?;
                layers.push(layer);
                Some((output.directory().to_path_buf(), guard))
            },
            None => None,
        };

        tracing_subscriber::registry().with(filter).with(layers).try_init()?;
        Ok(Logger { writer })
    }
}
