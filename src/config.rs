use std::{fmt, str::FromStr};

use tracing_subscriber::fmt::{time::FormatTime, writer::BoxMakeWriter, MakeWriter};

use crate::time::Rfc3339Nanos;

/// Severity of a record, ordered from the least to the most verbose.
///
/// A record is written when its severity is less than or equal to the configured level, so a
/// logger configured with [`Severity::Info`] writes `error` and `warning` records but drops
/// `debug` ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Panic,
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Severity {
    /// The name written to the `severity` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Panic => "panic",
            Severity::Fatal => "fatal",
            Severity::Error => "error",
            Severity::Warn => "warning",
            Severity::Info => "info",
            Severity::Debug => "debug",
            Severity::Trace => "trace",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ConfigError;

    fn from_str(level: &str) -> Result<Self, Self::Err> {
        match level.to_ascii_lowercase().as_str() {
            "panic" => Ok(Severity::Panic),
            "fatal" => Ok(Severity::Fatal),
            "error" => Ok(Severity::Error),
            "warn" | "warning" => Ok(Severity::Warn),
            "info" => Ok(Severity::Info),
            "debug" => Ok(Severity::Debug),
            "trace" => Ok(Severity::Trace),
            _ => Err(ConfigError::InvalidLevel(level.to_owned())),
        }
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        if level == tracing::Level::ERROR {
            Severity::Error
        } else if level == tracing::Level::WARN {
            Severity::Warn
        } else if level == tracing::Level::INFO {
            Severity::Info
        } else if level == tracing::Level::DEBUG {
            Severity::Debug
        } else {
            Severity::Trace
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("not a valid logging level: {0:?}")]
    InvalidLevel(String),
}

/// Settings used by [`Logger::new`](crate::Logger::new).
///
/// # Examples
///
/// ```rust
/// use stackdriver_logger::{Config, Logger};
///
/// let logger = Logger::new(
///     Config::new("info", "checkout", "1.4.2").with_writer(std::io::stderr),
/// )
/// .unwrap();
/// logger.info("ready");
/// ```
pub struct Config {
    /// Records less severe than this level are not written.
    pub logging_level: String,
    pub service_name: String,
    pub version: String,
    /// Where records are written. Standard output when unset.
    pub writer: Option<BoxMakeWriter>,
    pub(crate) timer: Option<Box<dyn FormatTime + Send + Sync>>,
    pub(crate) log_internal_errors: bool,
}

impl Config {
    pub fn new(
        logging_level: impl Into<String>,
        service_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            logging_level: logging_level.into(),
            service_name: service_name.into(),
            version: version.into(),
            writer: None,
            timer: None,
            log_internal_errors: false,
        }
    }

    /// Sets the [`MakeWriter`] records are written to.
    ///
    /// Any writer works, which makes it easy to capture the output in tests:
    ///
    /// ```rust
    /// # use stackdriver_logger::Config;
    /// let config = Config::new("debug", "test", "1.0.0").with_writer(std::io::sink);
    /// ```
    pub fn with_writer<W>(mut self, make_writer: W) -> Self
    where
        W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
    {
        self.writer = Some(BoxMakeWriter::new(make_writer));
        self
    }

    /// Use the given [`timer`] for the `timestamp` and `eventTime` fields.
    ///
    /// [`timer`]: tracing_subscriber::fmt::time::FormatTime
    pub fn with_timer<T: FormatTime + Send + Sync + 'static>(mut self, timer: T) -> Self {
        self.timer = Some(Box::new(timer));
        self
    }

    /// Sets whether failures to serialize or write a record are reported on stderr.
    /// Defaults to false.
    pub fn log_internal_errors(mut self, log_internal_errors: bool) -> Self {
        self.log_internal_errors = log_internal_errors;
        self
    }

    pub(crate) fn take_timer(&mut self) -> Box<dyn FormatTime + Send + Sync> {
        self.timer.take().unwrap_or_else(|| Box::new(Rfc3339Nanos))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("logging_level", &self.logging_level)
            .field("service_name", &self.service_name)
            .field("version", &self.version)
            .field("writer", &self.writer.as_ref().map(|_| ".."))
            .field("log_internal_errors", &self.log_internal_errors)
            .finish_non_exhaustive()
    }
}
