// ── Request descriptor ──
//
// Immutable description of one HTTP request: method, URL, headers,
// optional body, and a status-acceptance policy. Built once per call
// and consumed by the provider; it has no lifecycle beyond that.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use url::Url;

use crate::error::NetworkError;

/// Status-code acceptance policy for a single request.
///
/// Statuses the policy rejects surface as transport-level failures;
/// accepted statuses proceed to the decode step, where 4xx/5xx bodies
/// may still classify as semantic errors.
#[derive(Clone, Default)]
pub enum StatusValidator {
    /// Accept any status in [200,300) or [400,600): "a response was
    /// received". 3xx and 600+ never reach the decoder; whether a
    /// 4xx/5xx is acceptable is decided later by body inspection.
    #[default]
    Received,
    /// Accept every status; the decode step sees all of them.
    Any,
    /// Accept exactly these statuses.
    OneOf(Vec<u16>),
    /// Caller-supplied predicate.
    Custom(Arc<dyn Fn(u16) -> bool + Send + Sync>),
}

impl StatusValidator {
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            Self::Received => matches!(status, 200..=299 | 400..=599),
            Self::Any => true,
            Self::OneOf(set) => set.contains(&status),
            Self::Custom(check) => check(status),
        }
    }
}

impl fmt::Debug for StatusValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => f.write_str("Received"),
            Self::Any => f.write_str("Any"),
            Self::OneOf(set) => f.debug_tuple("OneOf").field(set).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One HTTP request, ready for dispatch.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    validator: StatusValidator,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            validator: StatusValidator::default(),
        }
    }

    /// Shorthand for a GET descriptor.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Shorthand for a POST descriptor.
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Append a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a raw body with its content type.
    pub fn body(mut self, body: impl Into<Bytes>, content_type: HeaderValue) -> Self {
        self.headers.insert(CONTENT_TYPE, content_type);
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body and set `Content-Type`.
    pub fn json(self, value: &impl Serialize) -> Result<Self, NetworkError> {
        let body = serde_json::to_vec(value)
            .map_err(|e| NetworkError::Encoding { message: format!("JSON body: {e}") })?;
        Ok(self.body(body, HeaderValue::from_static("application/json")))
    }

    /// Replace the default status validator.
    pub fn validate(mut self, validator: StatusValidator) -> Self {
        self.validator = validator;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn validator(&self) -> &StatusValidator {
        &self.validator
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_validator_accepts_received_statuses() {
        let v = StatusValidator::default();
        assert!(v.accepts(200));
        assert!(v.accepts(299));
        assert!(v.accepts(400));
        assert!(v.accepts(599));
    }

    #[test]
    fn default_validator_rejects_redirects_and_nonstandard() {
        let v = StatusValidator::default();
        assert!(!v.accepts(301));
        assert!(!v.accepts(304));
        assert!(!v.accepts(600));
        assert!(!v.accepts(199));
    }

    #[test]
    fn one_of_is_exact() {
        let v = StatusValidator::OneOf(vec![201]);
        assert!(v.accepts(201));
        assert!(!v.accepts(200));
    }

    #[test]
    fn custom_predicate_runs() {
        let v = StatusValidator::Custom(Arc::new(|s| s % 2 == 0));
        assert!(v.accepts(200));
        assert!(!v.accepts(201));
    }

    #[test]
    fn json_body_sets_content_type() {
        let url = Url::parse("https://api.example.com/things").unwrap();
        let req = RequestDescriptor::post(url).json(&json!({"a": 1})).unwrap();
        assert_eq!(
            req.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(req.body_bytes().unwrap().as_ref(), br#"{"a":1}"#);
    }
}
