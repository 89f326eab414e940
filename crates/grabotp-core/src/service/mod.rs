//! Services that talk to the mail provider.
//!
//! This module provides the session layer over the Gmail API and the
//! concurrent pipeline that turns recent messages into OTPs.

pub mod fetch;
pub mod gmail;
pub mod session;

pub use fetch::{DEFAULT_MAX_MESSAGES, DEFAULT_WINDOW, FetchOptions, FetchPipeline, ParsedOtp};
pub use gmail::{GMAIL_API_BASE, GmailMessage, GmailSession, MessageRef};
pub use session::{Authorizer, InteractiveAuthorizer, Presenter, SessionManager};
