//! Structured logging setup for the UHRP overlay
//!
//! All crates in the workspace log through `tracing`; this crate owns the
//! subscriber that turns those events into output.
//!
//! # Features
//!
//! - **JSONL Output**: one JSON object per event on stderr (default)
//! - **Pretty Console**: Human-readable output for interactive use
//! - **File Rotation**: Daily/hourly JSONL files via tracing-appender
//!
//! # Quick Start
//!
//! ```ignore
//! use uhrp_logging::{LogConfig, UhrpSubscriberBuilder};
//!
//! // JSONL on stderr at `info`
//! let _guard = UhrpSubscriberBuilder::new().init();
//!
//! // Rolling files under /var/log/uhrp, no console
//! let _guard = UhrpSubscriberBuilder::new()
//!     .with_config(LogConfig::production("/var/log/uhrp"))
//!     .init();
//! ```

pub mod config;

pub use config::{
    ConsoleConfig, ConsoleFormat, ConsoleStream, FileConfig, JsonlConfig, LogConfig,
    RotationStrategy,
};

use std::fs;

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create log file appender: {0}")]
    Appender(#[from] InitError),

    #[error("Global subscriber already set: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn json_layer<W>(jsonl: &JsonlConfig, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(jsonl.include_spans)
        .with_span_list(jsonl.include_spans)
        .flatten_event(true)
        .with_file(jsonl.include_location)
        .with_line_number(jsonl.include_location)
        .with_writer(writer)
        .boxed()
}

fn file_writer(file: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&file.directory)?;

    let rotation = match file.rotation {
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
        RotationStrategy::Never => Rotation::NEVER,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(file.prefix.clone())
        .filename_suffix("log");
    if let Some(max_files) = file.max_files {
        builder = builder.max_log_files(max_files);
    }

    let appender = builder.build(&file.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Builder for configuring and initializing the UHRP logging subscriber
///
/// By default events go to stderr as JSONL. `LogConfig::pretty()` switches
/// the console to human-readable output.
#[derive(Debug, Default)]
pub struct UhrpSubscriberBuilder {
    config: LogConfig,
}

impl UhrpSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the base log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// Console format; [`ConsoleFormat::Off`] silences the console
    pub fn with_console(mut self, format: ConsoleFormat) -> Self {
        self.config.console.format = format;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Output layers for the configured sinks, without a filter
    fn layers(&self) -> Result<(Vec<BoxedLayer>, Option<WorkerGuard>), LoggingError> {
        let mut layers = Vec::new();
        let mut guard = None;

        let console = &self.config.console;
        let json = &self.config.json;
        let pretty = || {
            tracing_subscriber::fmt::layer()
                .with_ansi(console.ansi)
                .with_target(true)
        };
        match (console.format, console.stream) {
            (ConsoleFormat::Off, _) => {}
            (ConsoleFormat::Pretty, ConsoleStream::Stdout) => layers.push(pretty().boxed()),
            (ConsoleFormat::Pretty, ConsoleStream::Stderr) => {
                layers.push(pretty().with_writer(std::io::stderr).boxed())
            }
            (ConsoleFormat::Json, ConsoleStream::Stdout) => {
                layers.push(json_layer(json, std::io::stdout))
            }
            (ConsoleFormat::Json, ConsoleStream::Stderr) => {
                layers.push(json_layer(json, std::io::stderr))
            }
        }

        if let Some(file) = &self.config.file {
            let (writer, file_guard) = file_writer(file)?;
            layers.push(json_layer(json, writer));
            guard = Some(file_guard);
        }

        Ok((layers, guard))
    }

    /// Install the subscriber globally
    ///
    /// The returned guard flushes file output when dropped and must be kept
    /// alive for the duration of the program.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.filter_string()));
        let (layers, guard) = self.layers()?;

        tracing_subscriber::registry()
            .with(layers)
            .with(env_filter)
            .try_init()?;

        Ok(guard)
    }

    /// Like [`try_init`](Self::try_init), reporting failures on stderr
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: Failed to initialize logging: {}", e);
                None
            }
        }
    }
}
