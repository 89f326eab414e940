//! Message payload as delivered by the mail API in `full` format.

use serde::Deserialize;

/// A header name/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Header {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

/// Body of a message part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    /// Base64url body data. Absent for containers and remote attachments.
    #[serde(default)]
    pub data: Option<String>,
    /// Declared size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Set when the body must be fetched separately.
    #[serde(default)]
    pub attachment_id: Option<String>,
}

/// One node of the MIME tree. The top-level payload is also a part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    /// MIME type such as `text/plain` or `multipart/alternative`.
    #[serde(default)]
    pub mime_type: String,
    /// File name for attachments.
    #[serde(default)]
    pub filename: String,
    /// Part headers.
    #[serde(default)]
    pub headers: Vec<Header>,
    /// Part body.
    #[serde(default)]
    pub body: Option<PartBody>,
    /// Child parts for multipart containers.
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl MessagePart {
    /// Returns the first value of a header, matching the name case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Returns the encoded body data if there is any.
    #[must_use]
    pub fn data(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .filter(|d| !d.is_empty())
    }

    /// True when `Content-Disposition` marks this part as an attachment.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.header("content-disposition")
            .is_some_and(|v| v.to_ascii_lowercase().contains("attachment"))
    }

    /// True for `multipart/*` containers.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.mime_type
            .get(..10)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"))
    }

    /// Checks the MIME type, ignoring case and parameters.
    #[must_use]
    pub fn has_mime_type(&self, mime_type: &str) -> bool {
        self.mime_type
            .split(';')
            .next()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case(mime_type))
    }
}
