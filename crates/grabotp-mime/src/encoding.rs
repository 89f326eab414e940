//! Transport decoding for message bodies.
//!
//! The mail API delivers body data as URL-safe Base64. Padding is sometimes
//! present and sometimes not, so decoding accepts both.

use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Decodes URL-safe Base64, with or without padding.
///
/// Whitespace is ignored and the standard alphabet's `+`/`/` are accepted.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    URL_SAFE_NO_PAD
        .decode(cleaned.trim_end_matches('='))
        .map_err(Into::into)
}

/// Decodes URL-safe Base64 into text, replacing invalid UTF-8.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64url_text(data: &str) -> Result<String> {
    let bytes = decode_base64url(data)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
