//! Decoding of JSON-submitted images (`data:` URLs or bare base64)

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{Result, StoreError};

const DEFAULT_MIME: &str = "image/png";

/// Decode a `data:<mime>;base64,<data>` URL, or failing that the whole
/// input as plain base64. Returns the bytes and the MIME type.
pub fn decode_data_url_or_base64(input: &str) -> Result<(Vec<u8>, String)> {
    if let Some(decoded) = parse_data_url(input) {
        return Ok(decoded);
    }

    decode_base64(input.trim())
        .map(|data| (data, DEFAULT_MIME.to_string()))
        .ok_or_else(|| StoreError::InvalidInput("reference image is not valid base64".to_string()))
}

fn parse_data_url(input: &str) -> Option<(Vec<u8>, String)> {
    let rest = input.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;

    let mime = header.split(';').next().unwrap_or_default().trim();
    let mime = if mime.is_empty() { DEFAULT_MIME } else { mime };

    let data = decode_base64(payload)?;
    Some((data, mime.to_string()))
}

/// Standard alphabet with padding; embedded whitespace (line-wrapped payloads) is ignored
fn decode_base64(payload: &str) -> Option<Vec<u8>> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return None;
    }
    STANDARD.decode(compact).ok()
}
