//! Body text selection and passcode extraction for a message payload.

use crate::encoding::decode_base64url_text;
use crate::html::html_to_text;
use crate::otp::find_code;
use crate::payload::MessagePart;

const TEXT_PLAIN: &str = "text/plain";
const TEXT_HTML: &str = "text/html";

/// Returns the plain text of a message payload, or an empty string.
///
/// A payload with body data of its own is single-part. Otherwise its parts
/// are scanned in order, descending into nested multipart containers.
/// Attachments and empty parts are skipped. The first `text/plain` part is
/// preferred; failing that, the first `text/html` part is rendered to text.
/// Parts whose data cannot be decoded are passed over.
#[must_use]
pub fn body_text(payload: &MessagePart) -> String {
    if payload.data().is_some() {
        return decode_part(payload).unwrap_or_default();
    }

    let candidates = leaf_parts(payload);

    candidates
        .iter()
        .filter(|part| part.has_mime_type(TEXT_PLAIN))
        .chain(candidates.iter().filter(|part| part.has_mime_type(TEXT_HTML)))
        .find_map(|part| decode_part(part))
        .unwrap_or_default()
}

/// Extracts the passcode from a message payload.
///
/// Returns `None` when the body has no standalone six-digit run.
#[must_use]
pub fn extract_code(payload: &MessagePart) -> Option<String> {
    find_code(&body_text(payload)).map(str::to_string)
}

/// Non-attachment parts with data, in document order.
fn leaf_parts(payload: &MessagePart) -> Vec<&MessagePart> {
    let mut leaves = Vec::new();
    let mut pending: Vec<&MessagePart> = payload.parts.iter().rev().collect();

    while let Some(part) = pending.pop() {
        if part.is_attachment() {
            continue;
        }
        if part.is_multipart() {
            pending.extend(part.parts.iter().rev());
        } else if part.data().is_some() {
            leaves.push(part);
        }
    }

    leaves
}

/// Decodes a text part; HTML is rendered to text. Other types yield `None`.
fn decode_part(part: &MessagePart) -> Option<String> {
    let data = part.data()?;

    if part.has_mime_type(TEXT_PLAIN) {
        decode_base64url_text(data).ok()
    } else if part.has_mime_type(TEXT_HTML) {
        let html = decode_base64url_text(data).ok()?;
        html_to_text(&html).ok()
    } else {
        None
    }
}
