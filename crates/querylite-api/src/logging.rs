//! Logging configuration for querylite
//!
//! Structured logging through `tracing`, written to stdout, to a daily
//! rolling file, or to both.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable that overrides the configured filter
pub const LOG_ENV: &str = "QUERYLITE_LOG";

const DEFAULT_FILE_NAME: &str = "querylite.log";

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    /// Standard output only
    Stdout,
    /// Daily rolling file
    File(PathBuf),
    /// Standard output and a daily rolling file
    Both(PathBuf),
}

/// Log format style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-readable
    Pretty,
    /// Single line per event
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directives used when no environment override is set
    pub level: String,
    /// Where events are written
    pub output: LogOutput,
    /// Event layout
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Stdout,
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    /// `info` level to stdout, pretty printed.
    pub fn info() -> Self {
        Self::default()
    }

    /// Same as [`info`](Self::info) at `debug` level.
    pub fn debug() -> Self {
        Self::default().with_level("debug")
    }

    /// Same as [`info`](Self::info) at `warn` level.
    pub fn warn() -> Self {
        Self::default().with_level("warn")
    }

    /// Writes to a daily rolling file instead of stdout.
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Writes to stdout and a daily rolling file.
    pub fn with_both<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    /// Sets the event layout.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the filter directives, such as `querylite=debug`.
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    /// Installs the global subscriber.
    ///
    /// The filter comes from `QUERYLITE_LOG`, then `RUST_LOG`, then the
    /// configured level. When logging to a file the returned guard must be
    /// kept alive; dropping it flushes and stops the writer thread.
    ///
    /// ```rust,no_run
    /// use querylite::logging::LogConfig;
    ///
    /// let _guard = LogConfig::debug().with_file("logs/querylite.log").init()?;
    /// # Ok::<(), querylite::Error>(())
    /// ```
    pub fn init(self) -> Result<Option<WorkerGuard>> {
        let directives = self.directives(|var| std::env::var(var).ok());
        let filter = parse_filter(&directives)?;

        let (to_stdout, file) = match &self.output {
            LogOutput::Stdout => (true, None),
            LogOutput::File(path) => (false, Some(path.as_path())),
            LogOutput::Both(path) => (true, Some(path.as_path())),
        };

        let mut layers = Vec::new();
        let mut guard = None;
        if to_stdout {
            layers.push(self.format_layer(std::io::stdout, true));
        }
        if let Some(path) = file {
            let (writer, file_guard) = file_writer(path);
            layers.push(self.format_layer(writer, false));
            guard = Some(file_guard);
        }

        tracing_subscriber::registry()
            .with(filter)
            .with(layers)
            .try_init()
            .map_err(|e| Error::InvalidArgument(format!("logging already initialized: {}", e)))?;

        Ok(guard)
    }

    /// First non-empty filter source, in precedence order.
    fn directives(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        [LOG_ENV, "RUST_LOG"]
            .into_iter()
            .filter_map(&lookup)
            .find(|value| !value.trim().is_empty())
            .unwrap_or_else(|| self.level.clone())
    }

    fn format_layer<S, W>(&self, writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = fmt::layer().with_writer(writer).with_ansi(ansi);
        match self.format {
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Compact => layer.compact().boxed(),
        }
    }
}

fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| Error::InvalidArgument(format!("invalid log filter {:?}: {}", directives, e)))
}

fn file_writer(path: &Path) -> (tracing_appender::non_blocking::NonBlocking, WorkerGuard) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_FILE_NAME);
    tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name))
}
