//! Read-only web view of an IMAP inbox
//!
//! Serves a single page and a JSON endpoint. Each request to
//! `GET /emails` opens a fresh IMAP session over TLS, lists the inbox
//! (newest first) or fetches one message by UID, logs out, and
//! returns the result.
//!
//! The library parts ([`MailboxClient`], [`router`]) can be embedded
//! elsewhere; the `inbox-viewer` binary wires them to the environment.

mod client;
mod config;
mod connection;
mod error;
mod flag;
mod message;
mod parse;
mod server;

pub use client::{INBOX, MailboxClient};
pub use config::{ImapConfig, Security};
pub use error::{Error, Result};
pub use flag::{Flag, FlagSet};
pub use message::{
    Address, EmailDetail, EmailSummary, Inbox, NO_SUBJECT, UNKNOWN_SENDER_ADDRESS,
    UNKNOWN_SENDER_NAME,
};
pub use parse::{PREVIEW_CHARS, ParsedMessage};
pub use server::{ApiError, AppState, EmailsQuery, EmailsResponse, FETCH_FAILED, get_emails, router};
