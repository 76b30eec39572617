use std::fmt;

use super::Engine;
use crate::{config::Severity, fields::Fields};

/// A record under construction: the engine it will be written to and the fields it carries.
///
/// Nothing is written until one of the severity methods is called.
///
/// ```rust
/// # use stackdriver_logger::{Config, Logger};
/// # let logger = Logger::new(Config::new("info", "svc", "1").with_writer(std::io::sink)).unwrap();
/// logger
///     .entry()
///     .with_field("user", "ferris")
///     .with_field("attempt", 3)
///     .warn("login throttled");
/// ```
#[derive(Clone)]
pub struct Entry<'a> {
    engine: &'a Engine,
    fields: Fields,
}

impl<'a> Entry<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Self {
            engine,
            fields: Fields::new(),
        }
    }

    /// Adds `fields` to the entry. Keys already present are replaced.
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn engine(&self) -> &'a Engine {
        self.engine
    }

    pub fn log(&self, severity: Severity, message: impl fmt::Display) {
        // Filtered records never format their message.
        if self.engine.enabled(severity) {
            self.engine
                .write(severity, &message.to_string(), &self.fields);
        }
    }

    pub fn trace(&self, message: impl fmt::Display) {
        self.log(Severity::Trace, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Severity::Debug, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Severity::Info, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Severity::Warn, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Severity::Error, message);
    }
}

impl fmt::Debug for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
