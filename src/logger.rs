use std::{backtrace::Backtrace, error::Error, fmt, io, sync::Arc};

use serde_json::json;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::{
    config::{Config, ConfigError, Severity},
    engine::{Engine, Entry},
    fields::{to_fields, Fields, Payload},
    layer::StackdriverLayer,
};

/// Identifies the deployed service a record came from.
///
/// Error Reporting groups errors by this pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContext {
    service: String,
    version: String,
}

impl ServiceContext {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        json!({
            "service": self.service,
            "version": self.version,
        })
    }
}

/// Logger writing records in the format expected by Cloud Logging and Error Reporting.
///
/// Build one at startup and pass it by reference to whatever needs to log. Per request, derive a
/// [`RequestLogger`](crate::RequestLogger) with [`Logger::request_logger`].
///
/// # Examples
///
/// ```rust
/// use std::collections::HashMap;
///
/// use stackdriver_logger::{Config, Logger};
///
/// let logger = Logger::new(Config::new("info", "billing", "2.1.0")).unwrap();
///
/// logger.info("started");
///
/// let payload = HashMap::from([("invoices".to_owned(), serde_json::json!(12))]);
/// logger.json_payload(&payload).info("batch done");
///
/// let err = std::io::Error::new(std::io::ErrorKind::Other, "database unreachable");
/// logger.error(&err);
/// ```
pub struct Logger {
    engine: Arc<Engine>,
    service_context: ServiceContext,
}

impl Logger {
    /// Builds a logger from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLevel`] if the logging level is not one of `trace`, `debug`,
    /// `info`, `warn`, `error`, `fatal` or `panic`.
    pub fn new(mut config: Config) -> Result<Self, ConfigError> {
        let level = config.logging_level.parse::<Severity>()?;
        let timer = config.take_timer();
        let make_writer = config
            .writer
            .take()
            .unwrap_or_else(|| BoxMakeWriter::new(io::stdout));

        Ok(Self {
            engine: Arc::new(Engine::new(
                level,
                make_writer,
                timer,
                config.log_internal_errors,
            )),
            service_context: ServiceContext {
                service: config.service_name,
                version: config.version,
            },
        })
    }

    /// Logs `message` at the info level.
    pub fn info(&self, message: impl fmt::Display) {
        self.entry().info(message);
    }

    /// Returns an entry carrying every pair of `payload` as a top-level field.
    ///
    /// Cloud Logging shows structured fields as the entry's `jsonPayload`, so the message passed
    /// to the severity method is mostly informative.
    pub fn json_payload(&self, payload: &Payload) -> Entry<'_> {
        self.entry().with_fields(to_fields(payload))
    }

    /// Reports `err` to Error Reporting.
    ///
    /// The stack trace is captured here, so it points at the place the error was logged rather
    /// than where it was created.
    pub fn error(&self, err: &dyn Error) {
        if !self.engine.enabled(Severity::Error) {
            return;
        }

        let mut fields = Fields::new();
        fields.insert("serviceContext".to_owned(), self.service_context.to_json());
        fields.insert("eventTime".to_owned(), self.engine.timestamp().into());
        fields.insert("stack_trace".to_owned(), stack_trace(err).into());

        self.entry().with_fields(fields).error(err);
    }

    /// Direct access to the underlying engine, for anything the methods above do not cover.
    pub fn entry(&self) -> Entry<'_> {
        self.engine.entry()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    /// Returns a [`tracing_subscriber::Layer`] writing `tracing` events through this logger.
    pub fn layer(&self) -> StackdriverLayer {
        StackdriverLayer::new(Arc::clone(&self.engine))
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("engine", &self.engine)
            .field("service_context", &self.service_context)
            .finish()
    }
}

/// The error text on top of the current call stack, the layout Error Reporting parses.
pub(crate) fn stack_trace(err: &dyn Error) -> String {
    format!("{err}\n{}", Backtrace::force_capture())
}

#[cfg(test)]
mod tests {
    use std::{io, thread};

    use serde_json::json;

    use super::Logger;
    use crate::{
        config::{Config, ConfigError},
        fields::Payload,
        tests::{parse_lines, test_logger, MockMakeWriter},
    };

    #[test]
    fn accepts_valid_levels() {
        for level in ["trace", "DEBUG", "Info", "warn", "error", "fatal", "panic"] {
            Logger::new(Config::new(level, "test", "1.0.0").with_writer(io::sink)).unwrap();
        }
    }

    #[test]
    fn rejects_invalid_level() {
        let err = Logger::new(Config::new("loud", "test", "1.0.0")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLevel(level) if level == "loud"));
    }

    #[test]
    fn logs_an_error() {
        let make_writer = MockMakeWriter::default();
        let subject = Logger::new(
            Config::new("INFO", "test", "1.0.0").with_writer(make_writer.clone()),
        )
        .unwrap();

        subject.error(&io::Error::new(io::ErrorKind::Other, "oh no"));

        let buf = make_writer.buf();
        let got: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(got["message"], "oh no");
        assert_eq!(got["severity"], "error");
    }

    #[test]
    fn error_carries_service_context_and_trace() {
        let (logger, make_writer) = test_logger("info");

        logger.error(&io::Error::new(io::ErrorKind::Other, "disk full"));

        let records = parse_lines(&make_writer);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(
            record["serviceContext"],
            json!({"service": "test", "version": "1.0.0"}),
        );
        assert_eq!(record["eventTime"], "fake time");
        assert_eq!(record["timestamp"], "fake time");

        let trace = record["stack_trace"].as_str().unwrap();
        assert!(trace.starts_with("disk full\n"), "{trace}");
        assert!(trace.len() > "disk full\n".len());
    }

    #[inline(never)]
    fn build_disk_error() -> io::Error {
        io::Error::new(io::ErrorKind::Other, "disk full")
    }

    #[test]
    fn error_trace_points_at_logging_site() {
        let (logger, make_writer) = test_logger("info");
        let err = build_disk_error();

        logger.error(&err);

        let records = parse_lines(&make_writer);
        let trace = records[0]["stack_trace"].as_str().unwrap();
        assert!(trace.contains("error_trace_points_at_logging_site"), "{trace}");
        assert!(!trace.contains("build_disk_error"), "{trace}");
    }

    #[test]
    fn error_is_dropped_above_level() {
        let (logger, make_writer) = test_logger("fatal");

        logger.error(&io::Error::new(io::ErrorKind::Other, "ignored"));

        assert!(make_writer.buf().is_empty());
    }

    #[test]
    fn info_respects_level() {
        let (logger, make_writer) = test_logger("warn");
        logger.info("quiet");
        assert!(make_writer.buf().is_empty());

        let (logger, make_writer) = test_logger("info");
        logger.info(format_args!("{} requests", 3));
        assert_eq!(
            parse_lines(&make_writer),
            vec![json!({
                "message": "3 requests",
                "severity": "info",
                "timestamp": "fake time",
            })],
        );
    }

    #[test]
    fn json_payload_keeps_every_field() {
        let (logger, make_writer) = test_logger("debug");
        let payload = Payload::from([
            ("order".to_owned(), json!("A-17")),
            ("items".to_owned(), json!([1, 2, 3])),
            ("meta".to_owned(), json!({"retry": false})),
        ]);

        logger.json_payload(&payload).debug("");

        let record = &parse_lines(&make_writer)[0];
        for (key, value) in &payload {
            assert_eq!(&record[key], value, "{key}");
        }
        assert_eq!(record["severity"], "debug");
    }

    #[test]
    fn shared_between_threads() {
        let (logger, make_writer) = test_logger("info");

        thread::scope(|scope| {
            for worker in 0..4 {
                let logger = &logger;
                scope.spawn(move || {
                    for n in 0..25 {
                        logger.entry().with_field("worker", worker).info(n);
                    }
                });
            }
        });

        let records = parse_lines(&make_writer);
        assert_eq!(records.len(), 100);
        assert!(records.iter().all(|record| record["severity"] == "info"));
    }
}
