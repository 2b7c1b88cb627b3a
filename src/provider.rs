// ── Request provider ──
//
// Orchestrates Transport + ActivityCounter + response decoding. Every
// request spawns a task and returns a cancellable, single-assignment
// future. The activity count balances exactly once per request via a
// drop guard, on every exit path including cancellation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::activity::ActivityCounter;
use crate::decode;
use crate::descriptor::{RequestDescriptor, StatusValidator};
use crate::error::{ErrorCode, NetworkError};
use crate::multipart::{self, FileUploadPart};
use crate::transport::{HttpTransport, Transport, TransportConfig, TransportError, TransportReply};

const FAILURE_CHANNEL_SIZE: usize = 32;

/// Report of a failed request, broadcast for an external monitoring
/// consumer. Not processed internally.
#[derive(Debug, Clone)]
pub struct FailureNotice {
    pub url: Url,
    pub method: Method,
    pub code: ErrorCode,
    pub message: String,
    pub duration: Duration,
}

// ── Pending request ──────────────────────────────────────────────────

/// Cancellable handle plus single-assignment future for one request.
///
/// The underlying one-shot channel guarantees the result is delivered
/// at most once. Awaiting after `cancel` yields
/// [`NetworkError::Cancelled`].
pub struct PendingRequest<T> {
    rx: oneshot::Receiver<Result<T, NetworkError>>,
    cancel: CancellationToken,
}

impl<T> PendingRequest<T> {
    /// Abandon the exchange. The decoder never runs for a cancelled
    /// request and the activity count still balances.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A request that never reached dispatch (e.g. encoding failure).
    fn resolved(result: Result<T, NetworkError>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx, cancel: CancellationToken::new() }
    }
}

impl<T> Future for PendingRequest<T> {
    type Output = Result<T, NetworkError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.rx).poll(cx).map(|res| match res {
            Ok(result) => result,
            // Sender dropped without resolving: the task was cancelled.
            Err(_) => Err(NetworkError::Cancelled),
        })
    }
}

/// Balances the activity count exactly once, whichever way the request
/// task exits.
struct ActivityGuard(ActivityCounter);

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

// ── Provider ─────────────────────────────────────────────────────────

/// Turns request descriptors into typed, future-based results.
///
/// Holds one shared transport (and its connection pool), an activity
/// counter, and a failure broadcast. Constructed explicitly and passed
/// around; there is no process-wide default instance.
pub struct RequestProvider<T: Transport = HttpTransport> {
    transport: Arc<T>,
    activity: ActivityCounter,
    failures: broadcast::Sender<FailureNotice>,
}

impl RequestProvider<HttpTransport> {
    /// Provider over a fresh `reqwest`-backed transport.
    pub fn over_http(config: &TransportConfig) -> Result<Self, TransportError> {
        Ok(Self::new(HttpTransport::new(config)?))
    }
}

impl<T: Transport> RequestProvider<T> {
    pub fn new(transport: T) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_SIZE);
        Self {
            transport: Arc::new(transport),
            activity: ActivityCounter::new(),
            failures,
        }
    }

    /// Share an externally built counter (e.g. one indicator signal
    /// across several providers).
    pub fn with_activity(mut self, activity: ActivityCounter) -> Self {
        self.activity = activity;
        self
    }

    /// The counter tracking this provider's in-flight requests.
    pub fn activity(&self) -> &ActivityCounter {
        &self.activity
    }

    /// Subscribe to failure notices (URL, method, code, message,
    /// duration of the attempt).
    pub fn failures(&self) -> broadcast::Receiver<FailureNotice> {
        self.failures.subscribe()
    }

    // ── Request shapes ───────────────────────────────────────────────

    /// Request a single object decoded from the response body.
    pub fn request_object<M>(&self, request: RequestDescriptor) -> PendingRequest<M>
    where
        M: DeserializeOwned + Send + 'static,
    {
        self.request_json(request, decode::map_object)
    }

    /// Request an array of objects.
    ///
    /// Elements that fail to decode are dropped, so the result may be
    /// shorter than the server's array. A non-array body classifies as
    /// a semantic error.
    pub fn request_array<M>(&self, request: RequestDescriptor) -> PendingRequest<Vec<M>>
    where
        M: DeserializeOwned + Send + 'static,
    {
        self.request_json(request, decode::map_array)
    }

    /// Request with an arbitrary mapping over the parsed JSON tree.
    ///
    /// Returning `None` from `map` classifies the response from its
    /// `error` field and status code; see [`NetworkError`].
    pub fn request_json<V, F>(&self, request: RequestDescriptor, map: F) -> PendingRequest<V>
    where
        V: Send + 'static,
        F: FnOnce(&Value) -> Option<V> + Send + 'static,
    {
        self.spawn_exchange(request, move |reply| {
            decode::parse_and_map(reply.status, &reply.body, map)
        })
    }

    /// Upload files as a `multipart/form-data` body.
    ///
    /// Two phases: the body is encoded first, and an encoding failure
    /// resolves immediately without touching the transport or the
    /// activity count. The exchange then expects exactly HTTP 201; any
    /// other status or an unparsable body classifies as `Transfer`. A
    /// 201 with an empty body resolves `Ok(None)`.
    pub fn upload(
        &self,
        request: RequestDescriptor,
        parts: &[FileUploadPart],
    ) -> PendingRequest<Option<Value>> {
        let boundary = multipart::boundary();
        let body = match multipart::encode(&boundary, parts) {
            Ok(body) => body,
            Err(e) => return PendingRequest::resolved(Err(e)),
        };
        let content_type = match multipart::content_type(&boundary) {
            Ok(value) => value,
            Err(e) => return PendingRequest::resolved(Err(e)),
        };

        let request = request
            .body(body, content_type)
            // Every status reaches the decode step so non-201 classifies
            // as Transfer rather than a transport failure.
            .validate(StatusValidator::Any);

        self.spawn_exchange(request, |reply| {
            if reply.status != 201 {
                let message = serde_json::from_slice::<Value>(&reply.body)
                    .ok()
                    .as_ref()
                    .and_then(|v| v.get("error").and_then(Value::as_str))
                    .map_or_else(
                        || format!("upload rejected with status {}", reply.status),
                        str::to_owned,
                    );
                return Err(NetworkError::Transfer { message });
            }
            if reply.body.is_empty() {
                return Ok(None);
            }
            serde_json::from_slice(&reply.body)
                .map(Some)
                .map_err(|e| NetworkError::Transfer {
                    message: format!("unparsable upload response: {e}"),
                })
        })
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    /// Increment the counter, run the exchange on a spawned task, and
    /// settle the one-shot future from exactly one completion event.
    fn spawn_exchange<V, F>(&self, request: RequestDescriptor, finish: F) -> PendingRequest<V>
    where
        V: Send + 'static,
        F: FnOnce(TransportReply) -> Result<V, NetworkError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let transport = Arc::clone(&self.transport);
        let failures = self.failures.clone();

        self.activity.increment();
        let guard = ActivityGuard(self.activity.clone());

        tokio::spawn(async move {
            let _guard = guard;
            let started = Instant::now();
            debug!("{} {}", request.method(), request.url());

            let outcome = tokio::select! {
                () = token.cancelled() => {
                    debug!("cancelled {} {}", request.method(), request.url());
                    // Dropping the sender settles the future as Cancelled.
                    return;
                }
                outcome = transport.send(&request) => outcome,
            };

            let result = match outcome {
                Ok(reply) if request.validator().accepts(reply.status) => finish(reply),
                Ok(reply) => Err(NetworkError::Transport(TransportError::unacceptable_status(
                    reply.status,
                ))),
                Err(e) => Err(NetworkError::Transport(e)),
            };

            if let Err(error) = &result {
                debug!("{} {} failed: {error}", request.method(), request.url());
                let _ = failures.send(FailureNotice {
                    url: request.url().clone(),
                    method: request.method().clone(),
                    code: error.code(),
                    message: error.to_string(),
                    duration: started.elapsed(),
                });
            }

            let _ = tx.send(result);
        });

        PendingRequest { rx, cancel }
    }
}
