// ── Network error taxonomy ──
//
// Every failure a request can surface, classified with a stable
// `ErrorCode` so callers match programmatically instead of comparing
// message text. `Display` is the human-readable channel; underlying
// causes ride along via `#[source]`.

use thiserror::Error;

use crate::transport::TransportError;

/// Stable error codes for programmatic matching.
///
/// Ordered by detection phase. The `as u16` values are part of the
/// crate's compatibility surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    /// The HTTP exchange failed before a usable response existed.
    Transport = 1,
    /// The response body was not valid JSON.
    Parse = 2,
    /// The server reported an invalid or expired session (HTTP 400/401).
    InvalidSession = 3,
    /// The server reported a failure in the response body.
    Transfer = 4,
    /// The body parsed but did not match the requested shape.
    InvalidResponse = 5,
    /// Multipart body construction failed; the transport was never invoked.
    Encoding = 6,
    /// The pending request was cancelled before resolution.
    Cancelled = 7,
}

/// Unified error type for the request provider.
///
/// Variants mirror the detection order: transport, parse, then semantic
/// classification of an unmappable body. `Encoding` and `Cancelled` are
/// terminal states that never involve the decoder.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection failure, timeout, or a status the validator rejected.
    #[error("data transfer failed: {0}")]
    Transport(#[from] TransportError),

    /// Body bytes could not be parsed into a JSON tree.
    #[error("response parsing failed: {0}")]
    Parse(#[source] serde_json::Error),

    /// HTTP 400/401 with a string `error` field in the body.
    #[error("{message}")]
    InvalidSession { message: String },

    /// Server-reported failure: the body carried a string `error` field.
    #[error("{message}")]
    Transfer { message: String },

    /// Body parsed but the mapping returned nothing and no `error` field
    /// explained why.
    #[error("invalid response shape")]
    InvalidResponse,

    /// Multipart body construction failed before dispatch.
    #[error("multipart encoding failed: {message}")]
    Encoding { message: String },

    /// The request was cancelled through its `PendingRequest` handle.
    #[error("request cancelled")]
    Cancelled,
}

impl NetworkError {
    /// The stable code for this error. Match on this, not the message.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Transport(_) => ErrorCode::Transport,
            Self::Parse(_) => ErrorCode::Parse,
            Self::InvalidSession { .. } => ErrorCode::InvalidSession,
            Self::Transfer { .. } => ErrorCode::Transfer,
            Self::InvalidResponse => ErrorCode::InvalidResponse,
            Self::Encoding { .. } => ErrorCode::Encoding,
            Self::Cancelled => ErrorCode::Cancelled,
        }
    }

    /// `true` if retrying the same request unchanged might succeed.
    ///
    /// Encoding and shape errors need a fixed request, not a retry.
    pub fn is_transient(&self) -> bool {
        matches!(self.code(), ErrorCode::Transport | ErrorCode::Transfer)
    }

    /// `true` if re-authentication is required before retrying.
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, Self::InvalidSession { .. })
    }
}
