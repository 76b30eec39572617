use std::{fmt, sync::Arc};

use serde_json::json;
use tracing_core::{Event, Subscriber};
#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;
use tracing_subscriber::{layer::Context, Layer};

use crate::{
    config::Severity,
    engine::Engine,
    visitor::{EventFields, JsonVisitor},
};

/// Key Cloud Logging reads the source location of an entry from.
const SOURCE_LOCATION: &str = "logging.googleapis.com/sourceLocation";

/// A [`Layer`] that writes `tracing` events as Cloud Logging entries.
///
/// Created with [`Logger::layer`](crate::Logger::layer), it shares the logger's writer, timer
/// and level. The event's `message` becomes the entry message and every other field is written
/// at the top level.
///
/// ```rust
/// use stackdriver_logger::{Config, Logger};
/// use tracing_subscriber::prelude::*;
///
/// let logger = Logger::new(Config::new("info", "worker", "0.3.0")).unwrap();
/// let subscriber = tracing_subscriber::registry().with(logger.layer());
///
/// tracing::subscriber::with_default(subscriber, || {
///     tracing::info!(queue = "emails", "drained");
/// });
/// ```
#[derive(Clone)]
pub struct StackdriverLayer {
    engine: Arc<Engine>,
}

impl StackdriverLayer {
    pub(crate) fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

impl<S> Layer<S> for StackdriverLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        let severity = Severity::from(*meta.level());
        if !self.engine.enabled(severity) {
            return;
        }

        let mut recorded = EventFields::default();
        event.record(&mut JsonVisitor::new(&mut recorded));

        if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
            recorded.fields.insert(
                SOURCE_LOCATION.to_owned(),
                json!({
                    "file": file,
                    "line": line.to_string(),
                }),
            );
        }

        self.engine
            .write(severity, &recorded.message, &recorded.fields);
    }
}

impl fmt::Debug for StackdriverLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackdriverLayer")
            .field("engine", &self.engine)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use serde_json::json;
    use tracing::subscriber::with_default;
    use tracing_subscriber::{layer::SubscriberExt, registry};

    use crate::tests::{parse_lines, test_logger};

    #[test]
    fn formats_events_as_log_entries() {
        let (logger, make_writer) = test_logger("info");
        let collector = registry().with(logger.layer());

        with_default(collector, || {
            tracing::info!(answer = 42, ratio = 0.5, ok = true, who = "world", "hello {}", "there");
        });

        let mut records = parse_lines(&make_writer);
        assert_eq!(records.len(), 1);
        let location = records[0]
            .as_object_mut()
            .unwrap()
            .remove("logging.googleapis.com/sourceLocation")
            .unwrap();
        assert_eq!(location["file"], file!());
        assert!(location["line"].as_str().unwrap().parse::<u32>().is_ok());

        assert_eq!(
            records[0],
            json!({
                "answer": 42,
                "ratio": 0.5,
                "ok": true,
                "who": "world",
                "message": "hello there",
                "severity": "info",
                "timestamp": "fake time",
            }),
        );
    }

    #[test]
    fn maps_levels_and_filters() {
        let (logger, make_writer) = test_logger("warn");
        let collector = registry().with(logger.layer());

        with_default(collector, || {
            tracing::debug!("hidden");
            tracing::info!("hidden");
            tracing::warn!("careful");
            let err = io::Error::new(io::ErrorKind::Other, "broken");
            tracing::error!(error = &err as &(dyn std::error::Error + 'static), "failed");
        });

        let records = parse_lines(&make_writer);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["severity"], "warning");
        assert_eq!(records[0]["message"], "careful");
        assert_eq!(records[1]["severity"], "error");
        assert_eq!(records[1]["error"], "broken");
    }

    #[test]
    fn raw_identifiers_lose_prefix() {
        let (logger, make_writer) = test_logger("info");
        let collector = registry().with(logger.layer());

        with_default(collector, || {
            tracing::info!(r#type = "raw", "typed");
        });

        assert_eq!(parse_lines(&make_writer)[0]["type"], "raw");
    }
}
