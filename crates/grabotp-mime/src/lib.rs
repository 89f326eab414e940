//! # grabotp-mime
//!
//! Turns a mail API message payload into plain text and pulls a
//! one-time passcode out of it.
//!
//! ## Features
//!
//! - **Payload model**: the API's `full` message format (headers, Base64url
//!   body data, nested parts)
//! - **Part selection**: skips attachments, prefers `text/plain`, falls back
//!   to `text/html`
//! - **HTML to text**: document-tree walk that ignores `script` and `style`
//! - **Passcode rule**: first standalone run of exactly six digits
//!
//! ## Quick Start
//!
//! ```ignore
//! use grabotp_mime::{MessagePart, extract_code};
//!
//! let payload: MessagePart = serde_json::from_value(message["payload"].clone())?;
//! if let Some(code) = extract_code(&payload) {
//!     println!("OTP: {code}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod extract;
mod payload;

pub mod encoding;
pub mod html;
pub mod otp;

pub use error::{Error, Result};
pub use extract::{body_text, extract_code};
pub use otp::{CODE_LENGTH, find_code};
pub use payload::{Header, MessagePart, PartBody};
