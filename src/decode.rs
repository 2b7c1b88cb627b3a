// ── Response decoding ──
//
// Raw body bytes become a `serde_json::Value`, then a typed value via
// the caller's mapping function. A mapping miss is inspected for a
// server-reported `error` field (the semantic failure channel) before
// falling back to a plain shape mismatch.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::NetworkError;

/// Parse `body` and apply `map`, classifying every failure.
pub(crate) fn parse_and_map<V>(
    status: u16,
    body: &[u8],
    map: impl FnOnce(&Value) -> Option<V>,
) -> Result<V, NetworkError> {
    let json: Value = serde_json::from_slice(body).map_err(NetworkError::Parse)?;
    match map(&json) {
        Some(value) => Ok(value),
        None => Err(classify_unmapped(status, &json)),
    }
}

/// The mapping returned `None`: decide between a server-reported
/// failure and a shape mismatch. 400/401 with an `error` field means
/// the session is gone; any other status with an `error` field is a
/// transfer failure.
fn classify_unmapped(status: u16, json: &Value) -> NetworkError {
    match json.get("error").and_then(Value::as_str) {
        Some(message) if status == 400 || status == 401 => NetworkError::InvalidSession {
            message: message.to_owned(),
        },
        Some(message) => NetworkError::Transfer {
            message: message.to_owned(),
        },
        None => NetworkError::InvalidResponse,
    }
}

/// Map the whole tree into one `M`.
pub(crate) fn map_object<M: DeserializeOwned>(json: &Value) -> Option<M> {
    serde_json::from_value(json.clone()).ok()
}

/// Map a JSON array element-wise. Elements that fail to decode are
/// dropped, so the result may be shorter than the input array; a
/// non-array tree maps to `None`.
pub(crate) fn map_array<M: DeserializeOwned>(json: &Value) -> Option<Vec<M>> {
    json.as_array().map(|items| {
        items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect()
    })
}
