//! Base64 data URIs, the textual form payloads take inside the cache.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{LogoError, Result};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Picks the media type for `bytes`: the response's `Content-Type` when given,
/// otherwise whatever the image signature says.
pub fn media_type(content_type: Option<&str>, bytes: &[u8]) -> String {
    let declared = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .filter(|ct| !ct.is_empty());

    match declared {
        Some(ct) => ct.to_ascii_lowercase(),
        None => image::guess_format(bytes)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| FALLBACK_MIME.to_string()),
    }
}

/// Encodes `bytes` as `data:<mime>;base64,<payload>`.
pub fn encode(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Splits a data URI into its media type and decoded bytes.
pub fn decode(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| LogoError::Decode("Payload is not a data URI".to_string()))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| LogoError::Decode("Data URI is not base64 encoded".to_string()))?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| LogoError::Decode(format!("Invalid base64 payload: {}", e)))?;

    Ok((mime.to_string(), bytes))
}
