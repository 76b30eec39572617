//! Structured logging for services running on Google Cloud.
//!
//! Records are written as one JSON object per line with the `message`, `timestamp` and `severity`
//! keys Cloud Logging expects. Errors are written in the shape Error Reporting picks up, with the
//! service name and version, the event time and a stack trace.
//!
//! - [`Logger`] is the general purpose logger, built once from a [`Config`].
//! - [`RequestLogger`] is derived from a [`Logger`] for a single HTTP request and adds the request
//!   details to every record.
//! - [`StackdriverLayer`] routes `tracing` events through the same output.
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use http::{Request, StatusCode};
//! use stackdriver_logger::{Config, HttpRequestFields, Logger};
//!
//! let logger = Logger::new(Config::new("info", "frontend", "1.0.0")).unwrap();
//!
//! let request = Request::get("/search?q=rust&key=hunter2").body(()).unwrap();
//! let request_logger = logger
//!     .request_logger(HttpRequestFields::new(&request, StatusCode::OK))
//!     .unwrap();
//!
//! // `key` is not written to the log.
//! request_logger.info_json_payload(&HashMap::from([(
//!     "results".to_owned(),
//!     serde_json::json!(10),
//! )]));
//! ```
mod config;
mod engine;
mod fields;
mod layer;
mod logger;
mod request;
mod time;
mod visitor;


pub use config::{Config, ConfigError, Severity};
pub use engine::{Engine, Entry};
pub use fields::{to_fields, Fields, Payload};
pub use layer::StackdriverLayer;
pub use logger::{Logger, ServiceContext};
pub use request::{HttpRequestFields, RequestLogger, ValidationError};
pub use time::Rfc3339Nanos;
