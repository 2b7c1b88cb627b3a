// courier: Typed, future-based HTTP request provider with in-flight
// activity tracking and multipart upload.

pub mod activity;
pub mod descriptor;
pub mod error;
pub mod multipart;
pub mod provider;
pub mod transport;

mod decode;

// ── Primary re-exports ──────────────────────────────────────────────
pub use activity::ActivityCounter;
pub use descriptor::{RequestDescriptor, StatusValidator};
pub use error::{ErrorCode, NetworkError};
pub use multipart::FileUploadPart;
pub use provider::{FailureNotice, PendingRequest, RequestProvider};
pub use transport::{
    HttpTransport, TlsMode, Transport, TransportConfig, TransportError, TransportReply,
};

// Re-export the primitives callers build requests and mappings with.
pub use reqwest::Method;
pub use serde_json::Value;
pub use url::Url;
