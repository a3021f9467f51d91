//! # Logger
//!
//! Installs the process-wide `tracing` subscriber for dynconf services.
//!
//! Output goes to the console, to a rolling file written by a non-blocking
//! worker, or both. Settings come either from a [`LogSettings`] section of the
//! service configuration or from the builder.
//!
//! ## Example
//!
//! ```rust
//! # use dynconf_logger::{LevelFilter, Logger};
//!
//! let _logger = Logger::builder("dynconf-agent")
//!     .level(LevelFilter::DEBUG)
//!     .filter("dynconf=trace")
//!     .init()
//!     .unwrap();
//! ```

mod error;
mod settings;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use crate::settings::{ConsoleFormat, FileSettings, LogSettings, RotationKind};
pub use tracing::level_filters::LevelFilter;

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const LOG_FILE_SUFFIX: &str = "log";

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Configures and installs the global subscriber.
#[derive(Debug)]
pub struct LoggerBuilder {
    name: String,
    settings: LogSettings,
}

impl LoggerBuilder {
    /// Replaces every setting with `settings`, typically read from a config file.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn settings(mut self, settings: LogSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn level(mut self, level: LevelFilter) -> Self {
        self.settings.level = level.to_string();
        self
    }

    /// Adds directives in `EnvFilter` syntax (e.g., `dynconf=debug,hyper=info`).
    ///
    /// Without them `RUST_LOG` applies. Invalid directives make
    /// [`LoggerBuilder::init`] fail.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn filter(mut self, directives: impl Into<String>) -> Self {
        self.settings.filter = Some(directives.into());
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.settings.console = enabled;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn format(mut self, format: ConsoleFormat) -> Self {
        self.settings.format = format;
        self
    }

    /// Also writes to daily rolling files under `path`, named after the logger.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.file = Some(FileSettings::new(path));
        self
    }

    /// Installs the global subscriber.
    ///
    /// Keep the returned [`Logger`] alive: dropping it stops the file worker.
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] for an empty name, an unknown
    ///   level, invalid filter directives, `max_files = 0` or no output at all.
    /// * [`LoggerError::Io`] / [`LoggerError::Appender`] if the log directory is unusable.
    /// * [`LoggerError::Subscriber`] if a global subscriber is already set.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let Self { name, settings } = self;
        if name.trim().is_empty() {
            return Err(invalid("Logger name cannot be empty"));
        }
        if !settings.console && settings.file.is_none() {
            return Err(invalid("No logging output enabled. Enable console or file output."));
        }

        let filter = env_filter(&settings)?;
        let mut layers: Vec<BoxedLayer<_>> = Vec::new();

        if settings.console {
            layers.push(console_layer(settings.format));
        }

        let guard = match &settings.file {
            Some(file) => {
                let (layer, guard) = file_layer(&name, file)?;
                layers.push(layer);
                Some(guard)
            },
            None => None,
        };

        tracing_subscriber::registry().with(filter).with(layers).try_init()?;

        Ok(Logger { guard })
    }
}

/// Handle to the installed logging system.
///
/// Holds the worker guard of the file writer; drop it only on shutdown so
/// buffered lines are flushed.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    /// Starts configuring a logger. `name` prefixes rolling files
    /// (e.g., `dynconf-agent.2026-10-16.log`).
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder { name: name.into(), settings: LogSettings::default() }
    }

    /// Installs a logger straight from a settings section.
    pub fn from_settings(name: impl Into<String>, settings: LogSettings) -> Result<Self, LoggerError> {
        Self::builder(name).settings(settings).init()
    }

    /// `true` when a file writer is running.
    #[must_use]
    pub const fn has_file_output(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

fn console_layer<S>(format: ConsoleFormat) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer().with_ansi(true);
    match format {
        ConsoleFormat::Compact => layer.compact().boxed(),
        ConsoleFormat::Pretty => layer.pretty().boxed(),
        ConsoleFormat::Json => layer.json().with_ansi(false).boxed(),
    }
}

fn file_layer<S>(name: &str, file: &FileSettings) -> Result<(BoxedLayer<S>, WorkerGuard), LoggerError>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if file.max_files == 0 {
        return Err(invalid("max_files must be greater than zero"));
    }
    fs::create_dir_all(&file.path)
        .context(format!("Failed to create path: {}", file.path.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(file.rotation.into())
        .filename_prefix(name)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(file.max_files)
        .build(&file.path)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer().with_writer(writer).with_ansi(false);
    let layer = if file.json { layer.json().boxed() } else { layer.boxed() };
    Ok((layer, guard))
}

fn env_filter(settings: &LogSettings) -> Result<EnvFilter, LoggerError> {
    let level = LevelFilter::from_str(&settings.level)
        .map_err(|e| invalid(format!("Invalid level '{}': {e}", settings.level)))?;
    let builder = EnvFilter::builder().with_default_directive(level.into());
    settings.filter.as_ref().map_or_else(
        || Ok(builder.from_env_lossy()),
        |filter| builder.parse(filter).map_err(|e| invalid(format!("Invalid filter '{filter}': {e}"))),
    )
}

fn invalid(message: impl Into<std::borrow::Cow<'static, str>>) -> LoggerError {
    LoggerError::InvalidConfiguration { message: message.into(), context: None }
}
