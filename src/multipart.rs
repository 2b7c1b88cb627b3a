// ── Multipart encoding ──
//
// Byte-exact `multipart/form-data` framing for file uploads. Parts are
// encoded in order, each with its declared field name, file name, and
// MIME type. The framing crosses a real wire boundary, so every byte
// here follows the standard format.

use bytes::Bytes;
use reqwest::header::HeaderValue;
use uuid::Uuid;

use crate::error::NetworkError;

/// One file in a multipart upload. Constructed by the caller, consumed
/// once by the upload call.
#[derive(Debug, Clone)]
pub struct FileUploadPart {
    pub data: Bytes,
    pub field_name: String,
    pub file_name: String,
    pub mime_type: String,
}

impl FileUploadPart {
    pub fn new(
        data: impl Into<Bytes>,
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            field_name: field_name.into(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }

    /// A part named `file` whose file name extension is derived from
    /// the MIME type (unknown types get `.bin`).
    pub fn file(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        let file_name = format!("file.{}", extension_for(&mime_type));
        Self::new(data, "file", file_name, mime_type)
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "application/json" => "json",
        "application/pdf" => "pdf",
        "text/plain" => "txt",
        _ => "bin",
    }
}

/// Fresh random boundary for one upload.
pub(crate) fn boundary() -> String {
    format!("courier.boundary.{}", Uuid::new_v4().simple())
}

/// `Content-Type` header value carrying the boundary.
pub(crate) fn content_type(boundary: &str) -> Result<HeaderValue, NetworkError> {
    HeaderValue::from_str(&format!("multipart/form-data; boundary={boundary}"))
        .map_err(|e| NetworkError::Encoding {
            message: format!("content type: {e}"),
        })
}

/// Encode `parts` into a complete multipart body.
///
/// Fails without touching the wire if any part would corrupt the
/// framing, or if there is nothing to upload.
pub(crate) fn encode(boundary: &str, parts: &[FileUploadPart]) -> Result<Vec<u8>, NetworkError> {
    if parts.is_empty() {
        return Err(NetworkError::Encoding { message: "no parts to upload".into() });
    }

    let mut body = Vec::new();
    for part in parts {
        check_token("field name", &part.field_name)?;
        check_token("file name", &part.file_name)?;
        check_token("MIME type", &part.mime_type)?;

        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.field_name, part.file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.mime_type).as_bytes());
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Ok(body)
}

/// Reject values that would break out of the multipart framing.
fn check_token(what: &str, value: &str) -> Result<(), NetworkError> {
    if value.is_empty() || value.contains(['\r', '\n', '"']) {
        return Err(NetworkError::Encoding {
            message: format!("invalid {what}: {value:?}"),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn frames_a_single_part_byte_exactly() {
        let part = FileUploadPart::new(&b"PNGDATA"[..], "avatar", "avatar.png", "image/png");
        let body = encode("XBOUND", &[part]).unwrap();

        let expected = b"--XBOUND\r\n\
            Content-Disposition: form-data; name=\"avatar\"; filename=\"avatar.png\"\r\n\
            Content-Type: image/png\r\n\
            \r\n\
            PNGDATA\r\n\
            --XBOUND--\r\n";
        assert_eq!(body, expected);
    }

    #[test]
    fn frames_parts_in_order() {
        let parts = [
            FileUploadPart::new(&b"one"[..], "first", "a.txt", "text/plain"),
            FileUploadPart::new(&b"two"[..], "second", "b.txt", "text/plain"),
        ];
        let body = encode("B", &parts).unwrap();
        let text = String::from_utf8(body).unwrap();

        let first = text.find("name=\"first\"").unwrap();
        let second = text.find("name=\"second\"").unwrap();
        assert!(first < second);
        assert!(text.ends_with("--B--\r\n"));
    }

    #[test]
    fn rejects_framing_breakers() {
        let part = FileUploadPart::new(&b"x"[..], "field\"; evil", "a.txt", "text/plain");
        let err = encode("B", &[part]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Encoding);

        let part = FileUploadPart::new(&b"x"[..], "field", "a\r\nb", "text/plain");
        assert_eq!(encode("B", &[part]).unwrap_err().code(), ErrorCode::Encoding);
    }

    #[test]
    fn rejects_empty_part_lists() {
        assert_eq!(encode("B", &[]).unwrap_err().code(), ErrorCode::Encoding);
    }

    #[test]
    fn content_type_carries_boundary() {
        let value = content_type("courier.boundary.0af1").unwrap();
        assert_eq!(value, "multipart/form-data; boundary=courier.boundary.0af1");

        // Framing-breaking boundaries stay on the encoding error channel.
        let err = content_type("bad\r\nboundary").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Encoding);
    }

    #[test]
    fn generated_boundaries_are_valid_header_values() {
        for _ in 0..8 {
            assert!(content_type(&boundary()).is_ok());
        }
    }

    #[test]
    fn file_constructor_derives_names_from_mime() {
        let part = FileUploadPart::file(&b"x"[..], "image/png");
        assert_eq!(part.field_name, "file");
        assert_eq!(part.file_name, "file.png");

        let part = FileUploadPart::file(&b"x"[..], "application/x-custom");
        assert_eq!(part.file_name, "file.bin");
    }
}
