use std::{error::Error, net::SocketAddr};

use http::{header::USER_AGENT, Request, StatusCode, Uri};
use serde_json::json;
use url::form_urlencoded;

use crate::{
    config::Severity,
    fields::{to_fields, Fields, Payload},
    logger::{stack_trace, Logger},
};

/// Query parameter removed from logged URLs; it usually carries an API key.
const STRIPPED_QUERY_PARAM: &str = "key";

/// Forces Error Reporting to treat a record as an error event whatever other fields it has.
const REPORTED_ERROR_EVENT_TYPE: &str =
    "type.googleapis.com/google.devtools.clouderrorreporting.v1beta1.ReportedErrorEvent";

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("cannot log nil request")]
    NilRequest,
}

/// The request and response details a [`RequestLogger`] is built from.
#[derive(Debug)]
pub struct HttpRequestFields<'r, B> {
    pub request: Option<&'r Request<B>>,
    pub status: StatusCode,
    /// Address of the client. When unset, a [`SocketAddr`] stored in the request's extensions is
    /// used instead.
    pub remote_addr: Option<SocketAddr>,
}

impl<'r, B> HttpRequestFields<'r, B> {
    pub fn new(request: &'r Request<B>, status: StatusCode) -> Self {
        Self {
            request: Some(request),
            status,
            remote_addr: None,
        }
    }

    pub fn with_remote_addr(mut self, remote_addr: SocketAddr) -> Self {
        self.remote_addr = Some(remote_addr);
        self
    }
}

/// Logger for a single HTTP request.
///
/// Cloud Logging and Error Reporting describe a request with differently named fields, so
/// [`info_json_payload`](Self::info_json_payload) and [`error`](Self::error) write different
/// shapes from the same snapshot.
#[derive(Debug)]
pub struct RequestLogger<'l> {
    method: String,
    url: String,
    user_agent: String,
    remote_ip: String,
    status: u16,
    protocol: String,
    logger: &'l Logger,
}

impl Logger {
    /// Snapshots `fields` into a [`RequestLogger`] that logs through `self`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NilRequest`] when no request is given.
    pub fn request_logger<B>(
        &self,
        fields: HttpRequestFields<'_, B>,
    ) -> Result<RequestLogger<'_>, ValidationError> {
        let request = fields.request.ok_or(ValidationError::NilRequest)?;

        let remote_ip = fields
            .remote_addr
            .or_else(|| request.extensions().get::<SocketAddr>().copied())
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        let user_agent = request
            .headers()
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();

        Ok(RequestLogger {
            method: request.method().to_string(),
            url: strip_query_param(request.uri(), STRIPPED_QUERY_PARAM),
            user_agent,
            remote_ip,
            status: fields.status.as_u16(),
            protocol: format!("{:?}", request.version()),
            logger: self,
        })
    }
}

impl<'l> RequestLogger<'l> {
    /// Logs `payload` at the info level with the request in Cloud Logging's `httpRequest` field.
    ///
    /// Payload keys are written after `httpRequest`, so a payload that has its own `httpRequest`
    /// key replaces it.
    pub fn info_json_payload(&self, payload: &Payload) {
        let mut fields = Fields::new();
        fields.insert(
            "httpRequest".to_owned(),
            json!({
                "requestMethod": self.method,
                "requestUrl": self.url,
                "userAgent": self.user_agent,
                "remoteIp": self.remote_ip,
                "status": self.status,
                "protocol": self.protocol,
            }),
        );
        fields.extend(to_fields(payload));

        self.logger.entry().with_fields(fields).info("");
    }

    /// Reports `err` to Error Reporting together with the request that caused it.
    pub fn error(&self, err: &dyn Error) {
        let engine = self.logger.engine();
        if !engine.enabled(Severity::Error) {
            return;
        }

        let mut fields = Fields::new();
        fields.insert(
            "serviceContext".to_owned(),
            self.logger.service_context().to_json(),
        );
        fields.insert(
            "context".to_owned(),
            json!({
                "httpRequest": {
                    "method": self.method,
                    "url": self.url,
                    "userAgent": self.user_agent,
                    "responseStatusCode": self.status,
                    "remoteIp": self.remote_ip,
                },
            }),
        );
        fields.insert("eventTime".to_owned(), engine.timestamp().into());
        fields.insert("stack_trace".to_owned(), stack_trace(err).into());
        fields.insert("@type".to_owned(), REPORTED_ERROR_EVENT_TYPE.into());

        self.logger.entry().with_fields(fields).error(err);
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request URL without the stripped query parameter.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn remote_ip(&self) -> &str {
        &self.remote_ip
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn logger(&self) -> &'l Logger {
        self.logger
    }
}

/// Rebuilds `uri` without any `strip_key` query parameter.
///
/// Remaining parameters are sorted by key and form-encoded again; an empty query drops the `?`.
/// An authority without a scheme (`CONNECT` targets) is written as `//host:port`.
fn strip_query_param(uri: &Uri, strip_key: &str) -> String {
    let mut stripped = String::new();
    if let Some(scheme) = uri.scheme_str() {
        stripped.push_str(scheme);
        stripped.push(':');
    }
    if let Some(authority) = uri.authority() {
        stripped.push_str("//");
        stripped.push_str(authority.as_str());
    }
    stripped.push_str(uri.path());

    let mut pairs = form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes())
        .filter(|(key, _)| key != strip_key)
        .collect::<Vec<_>>();
    pairs.sort_by(|(a, _), (b, _)| a.cmp(b));

    if !pairs.is_empty() {
        stripped.push('?');
        stripped.push_str(
            &form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish(),
        );
    }

    stripped
}
