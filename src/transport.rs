// ── Transport capability ──
//
// The provider never talks HTTP directly: it hands a `RequestDescriptor`
// to a `Transport` and gets back status/headers/body bytes, or a
// transport error if the exchange itself failed. `HttpTransport` is the
// production implementation over a shared `reqwest::Client`; tests
// substitute in-memory transports.

use std::error::Error as StdError;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use thiserror::Error;

use crate::descriptor::RequestDescriptor;

/// Raw outcome of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportReply {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The exchange failed before a usable response existed: connection
/// refused, DNS failure, timeout, or a status the validator rejected.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), source: None }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Status fell outside the request's validator set.
    pub(crate) fn unacceptable_status(status: u16) -> Self {
        Self::new(format!("unacceptable status code {status}"))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            "request timed out"
        } else if e.is_connect() {
            "connection failed"
        } else {
            "HTTP exchange failed"
        };
        Self::with_source(message, e)
    }
}

/// Capability: perform one HTTP exchange asynchronously.
///
/// Implementations are shared across every request issued through a
/// provider, so they own whatever connection pooling applies.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: &RequestDescriptor,
    ) -> impl Future<Output = Result<TransportReply, TransportError>> + Send;
}

// ── Transport configuration ──────────────────────────────────────────

/// TLS verification mode for the built-in reqwest transport.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (for self-signed endpoints).
    DangerAcceptInvalid,
}

/// Configuration for building an `HttpTransport`.
///
/// Timeout policy lives here, not in the provider: the request layer
/// imposes none of its own.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            user_agent: concat!("courier/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, TransportError> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| TransportError::with_source("failed to read CA cert", e))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| TransportError::with_source("invalid CA cert", e))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| TransportError::with_source("failed to build HTTP client", e))
    }
}

// ── Production transport ─────────────────────────────────────────────

/// Transport over a shared `reqwest::Client` connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        Ok(Self { http: config.build_client()? })
    }

    /// Wrap an existing client (caller manages TLS, timeouts, and any
    /// default headers such as auth).
    pub fn from_reqwest(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: &RequestDescriptor,
    ) -> impl Future<Output = Result<TransportReply, TransportError>> + Send {
        let mut builder = self
            .http
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = request.body_bytes() {
            builder = builder.body(body.clone());
        }

        async move {
            let resp = builder.send().await.map_err(TransportError::from)?;
            let status = resp.status().as_u16();
            let headers = resp.headers().clone();
            let body = resp.bytes().await.map_err(TransportError::from)?;
            Ok(TransportReply { status, headers, body })
        }
    }
}
