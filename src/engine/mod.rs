use std::{cell::RefCell, fmt, io};

use serde::{ser::SerializeMap, Serializer as _};
use tracing_subscriber::fmt::{
    format::Writer,
    time::FormatTime,
    writer::BoxMakeWriter,
    MakeWriter,
};

use crate::{config::Severity, fields::Fields};

mod entry;

pub use entry::Entry;

/// Names of the fields every record carries.
///
/// Cloud Logging looks for `message`, `timestamp` and `severity`, so these are the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldKeys {
    pub(crate) message: &'static str,
    pub(crate) timestamp: &'static str,
    pub(crate) severity: &'static str,
}

impl Default for FieldKeys {
    fn default() -> Self {
        Self {
            message: "message",
            timestamp: "timestamp",
            severity: "severity",
        }
    }
}

impl FieldKeys {
    fn is_reserved(&self, key: &str) -> bool {
        key == self.message || key == self.timestamp || key == self.severity
    }
}

/// Writes records as single JSON lines to the configured writer.
///
/// The engine is immutable once built and can be shared between threads. Every record is handed
/// to a fresh writer from the [`MakeWriter`] in one `write_all` call; keeping concurrent lines
/// apart is up to that writer.
pub struct Engine {
    level: Severity,
    keys: FieldKeys,
    make_writer: BoxMakeWriter,
    timer: Box<dyn FormatTime + Send + Sync>,
    log_internal_errors: bool,
}

impl Engine {
    pub(crate) fn new(
        level: Severity,
        make_writer: BoxMakeWriter,
        timer: Box<dyn FormatTime + Send + Sync>,
        log_internal_errors: bool,
    ) -> Self {
        Self {
            level,
            keys: FieldKeys::default(),
            make_writer,
            timer,
            log_internal_errors,
        }
    }

    /// The least severe level that is still written.
    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        severity <= self.level
    }

    /// Returns an [`Entry`] with no fields.
    pub fn entry(&self) -> Entry<'_> {
        Entry::new(self)
    }

    /// The current time as rendered by the configured timer.
    pub fn timestamp(&self) -> String {
        let mut timestamp = String::with_capacity(32);
        if self
            .timer
            .format_time(&mut Writer::new(&mut timestamp))
            .is_err()
            && self.log_internal_errors
        {
            eprintln!("[stackdriver-logger] Unable to format the current time.");
        }
        timestamp
    }

    /// Writes one record if `severity` is enabled. Failures are never returned to the caller.
    pub fn write(&self, severity: Severity, message: &str, fields: &Fields) {
        if !self.enabled(severity) {
            return;
        }

        thread_local! {
            static BUF: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
        }

        BUF.with(|buf| {
            let borrow = buf.try_borrow_mut();
            let mut a;
            let mut b;
            let buf = if let Ok(buf) = borrow {
                a = buf;
                &mut *a
            } else {
                b = Vec::new();
                &mut b
            };

            match self.format_record(buf, severity, message, fields) {
                Ok(()) => {
                    buf.push(b'\n');
                    let mut writer = self.make_writer.make_writer();
                    let res = io::Write::write_all(&mut writer, &buf[..]);
                    if self.log_internal_errors {
                        if let Err(e) = res {
                            eprintln!(
                                "[stackdriver-logger] Unable to write a record to the writer! \
                                 Error: {e}",
                            );
                        }
                    }
                },
                Err(e) => {
                    if self.log_internal_errors {
                        eprintln!(
                            "[stackdriver-logger] Unable to format a record. Message: {message}; \
                             Error: {e}",
                        );
                    }
                },
            }

            buf.clear();
        });
    }

    fn format_record(
        &self,
        buf: &mut Vec<u8>,
        severity: Severity,
        message: &str,
        fields: &Fields,
    ) -> serde_json::Result<()> {
        let mut serializer = serde_json::Serializer::new(buf);
        let mut serializer = serializer.serialize_map(None)?;

        for (key, value) in fields {
            if self.keys.is_reserved(key) {
                serializer.serialize_entry(&format!("fields.{key}"), value)?;
            } else {
                serializer.serialize_entry(key, value)?;
            }
        }

        serializer.serialize_entry(self.keys.timestamp, &self.timestamp())?;
        serializer.serialize_entry(self.keys.severity, severity.as_str())?;
        serializer.serialize_entry(self.keys.message, message)?;

        serializer.end()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("level", &self.level)
            .field("keys", &self.keys)
            .field("log_internal_errors", &self.log_internal_errors)
            .finish_non_exhaustive()
    }
}
