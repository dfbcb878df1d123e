//! Response models for the inbox listing and message detail views.

use crate::flag::FlagSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subject used when a message has none.
pub const NO_SUBJECT: &str = "No Subject";
/// Display name used when a message has no sender.
pub const UNKNOWN_SENDER_NAME: &str = "Unknown";
/// Address used when a message has no sender.
pub const UNKNOWN_SENDER_ADDRESS: &str = "unknown@email.com";

/// A mailbox address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub address: String,
}

impl Address {
    /// The placeholder sender for messages without a `From` header.
    #[must_use]
    pub fn unknown_sender() -> Self {
        Self {
            name: Some(UNKNOWN_SENDER_NAME.to_string()),
            address: UNKNOWN_SENDER_ADDRESS.to_string(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// One row of the inbox listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSummary {
    pub uid: u32,
    pub subject: String,
    pub from: Address,
    pub date: DateTime<Utc>,
    pub flags: FlagSet,
    pub preview: String,
}

/// A single message with recipients and full content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDetail {
    pub uid: u32,
    pub subject: String,
    pub from: Address,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub date: DateTime<Utc>,
    pub flags: FlagSet,
    /// Plain text if present, else the HTML body untouched, else empty.
    pub content: String,
    pub has_html: bool,
}

/// The inbox listing: newest message first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Inbox {
    pub emails: Vec<EmailSummary>,
    /// Message count reported by the server when the inbox was opened.
    pub total: u32,
}
