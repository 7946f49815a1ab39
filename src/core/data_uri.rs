//! `data:` URI transcoding for uploaded payloads.
//!
//! The media host accepts a file as text, so the raw bytes travel as
//! `data:<media type>;base64,<payload>`. Encoding is lossless for any input,
//! including an empty payload.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::utils::error::{Result, ServiceError};

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Used when the multipart part does not declare a content type.
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

pub fn encode(media_type: &str, bytes: &[u8]) -> String {
    let payload = STANDARD.encode(bytes);
    let mut uri =
        String::with_capacity(SCHEME.len() + media_type.len() + BASE64_MARKER.len() + payload.len());
    uri.push_str(SCHEME);
    uri.push_str(media_type);
    uri.push_str(BASE64_MARKER);
    uri.push_str(&payload);
    uri
}

/// Splits a `data:` URI back into its media type and bytes.
pub fn decode(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix(SCHEME)
        .ok_or_else(|| ServiceError::validation("data URI must start with 'data:'"))?;
    let (media_type, payload) = rest
        .split_once(BASE64_MARKER)
        .ok_or_else(|| ServiceError::validation("data URI is not base64 encoded"))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| ServiceError::validation(format!("invalid base64 payload: {}", e)))?;

    Ok((media_type.to_string(), bytes))
}
