use std::{error::Error, fmt};

use tracing_core::field;

use crate::fields::Fields;

/// Fields of a single `tracing` event, with the `message` field kept apart.
#[derive(Debug, Default)]
pub(crate) struct EventFields {
    pub(crate) message: String,
    pub(crate) fields: Fields,
}

/// The [visitor] collecting event fields into [`EventFields`].
///
/// [visitor]: tracing_subscriber::field::Visit
pub(crate) struct JsonVisitor<'a>(&'a mut EventFields);

impl<'a> JsonVisitor<'a> {
    pub fn new(fields: &'a mut EventFields) -> Self {
        Self(fields)
    }

    fn insert(&mut self, field: &field::Field, value: serde_json::Value) {
        match field.name() {
            // Metadata of `log` records, already used for the level.
            #[cfg(feature = "tracing-log")]
            name if name.starts_with("log.") => (),
            name if name.starts_with("r#") => {
                self.0.fields.insert(name[2..].to_owned(), value);
            },
            name => {
                self.0.fields.insert(name.to_owned(), value);
            },
        }
    }
}

impl field::Visit for JsonVisitor<'_> {
    /// Visit a double precision floating point value.
    fn record_f64(&mut self, field: &field::Field, value: f64) {
        self.insert(field, serde_json::Value::from(value));
    }

    /// Visit a signed 64-bit integer value.
    fn record_i64(&mut self, field: &field::Field, value: i64) {
        self.insert(field, serde_json::Value::from(value));
    }

    /// Visit an unsigned 64-bit integer value.
    fn record_u64(&mut self, field: &field::Field, value: u64) {
        self.insert(field, serde_json::Value::from(value));
    }

    /// Visit a boolean value.
    fn record_bool(&mut self, field: &field::Field, value: bool) {
        self.insert(field, serde_json::Value::from(value));
    }

    /// Visit a string value.
    fn record_str(&mut self, field: &field::Field, value: &str) {
        if field.name() == "message" {
            self.0.message = value.to_owned();
        } else {
            self.insert(field, serde_json::Value::from(value));
        }
    }

    fn record_error(&mut self, field: &field::Field, value: &(dyn Error + 'static)) {
        self.insert(field, serde_json::Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0.message = format!("{value:?}");
        } else {
            self.insert(field, serde_json::Value::from(format!("{value:?}")));
        }
    }
}
