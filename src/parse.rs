//! MIME projection of a raw RFC 5322 message
//!
//! Turns the `BODY[]` bytes returned by the server into the fields the
//! listing and detail views need, applying the fallback policy for
//! missing headers.

use crate::error::{Error, Result};
use crate::flag::FlagSet;
use crate::message::{Address, EmailDetail, EmailSummary, NO_SUBJECT};
use chrono::{DateTime, Utc};
use mail_parser::{Addr, Message, MessageParser, PartType};

/// Maximum number of characters kept in a listing preview.
pub const PREVIEW_CHARS: usize = 200;

/// Header and body fields extracted from one message.
///
/// Every field is optional; the conversion into response models fills
/// the gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMessage {
    pub subject: Option<String>,
    pub from: Option<Address>,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub date: Option<DateTime<Utc>>,
    pub text: Option<String>,
    pub html: Option<String>,
}

impl ParsedMessage {
    /// Parse raw message bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the bytes are not a message at all.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let message = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| Error::Parse("not an RFC 5322 message".to_string()))?;

        Ok(Self {
            subject: message
                .subject()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string),
            from: message
                .from()
                .and_then(|from| addresses(from).into_iter().next()),
            to: message.to().map(addresses).unwrap_or_default(),
            cc: message.cc().map(addresses).unwrap_or_default(),
            date: message
                .date()
                .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0)),
            text: first_body(&message, BodyKind::Text),
            html: first_body(&message, BodyKind::Html),
        })
    }

    /// Listing projection. `now` stands in for a missing date.
    #[must_use]
    pub fn into_summary(self, uid: u32, flags: FlagSet, now: DateTime<Utc>) -> EmailSummary {
        EmailSummary {
            uid,
            preview: self.text.as_deref().map(preview).unwrap_or_default(),
            subject: self.subject.unwrap_or_else(|| NO_SUBJECT.to_string()),
            from: self.from.unwrap_or_else(Address::unknown_sender),
            date: self.date.unwrap_or(now),
            flags,
        }
    }

    /// Detail projection. `now` stands in for a missing date.
    #[must_use]
    pub fn into_detail(self, uid: u32, flags: FlagSet, now: DateTime<Utc>) -> EmailDetail {
        let has_html = self.html.is_some();
        let content = self.text.or(self.html).unwrap_or_default();
        EmailDetail {
            uid,
            subject: self.subject.unwrap_or_else(|| NO_SUBJECT.to_string()),
            from: self.from.unwrap_or_else(Address::unknown_sender),
            to: self.to,
            cc: self.cc,
            date: self.date.unwrap_or(now),
            flags,
            content,
            has_html,
        }
    }
}

/// Flatten an address header (plain list or groups) into addresses,
/// skipping entries without an address.
fn addresses(header: &mail_parser::Address<'_>) -> Vec<Address> {
    let convert = |addr: &Addr<'_>| {
        let address = addr.address.as_deref()?.trim();
        if address.is_empty() {
            return None;
        }
        Some(Address {
            name: addr
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(ToString::to_string),
            address: address.to_string(),
        })
    };

    match header {
        mail_parser::Address::List(list) => list.iter().filter_map(convert).collect(),
        mail_parser::Address::Group(groups) => groups
            .iter()
            .flat_map(|group| group.addresses.iter())
            .filter_map(convert)
            .collect(),
    }
}

#[derive(Debug, Clone, Copy)]
enum BodyKind {
    Text,
    Html,
}

/// First non-blank body part of the given kind.
///
/// `text_body` may list HTML parts when no plain alternative exists
/// (and `html_body` plain ones), so the part type is checked too.
fn first_body(message: &Message<'_>, kind: BodyKind) -> Option<String> {
    let ids = match kind {
        BodyKind::Text => &message.text_body,
        BodyKind::Html => &message.html_body,
    };
    ids.iter()
        .filter_map(|id| usize::try_from(*id).ok())
        .filter_map(|idx| message.parts.get(idx))
        .filter_map(|part| match (&part.body, kind) {
            (PartType::Text(body), BodyKind::Text) | (PartType::Html(body), BodyKind::Html) => {
                Some(body.as_ref())
            }
            _ => None,
        })
        .find(|body| !body.trim().is_empty())
        .map(ToString::to_string)
}

/// Collapse whitespace and cap the length of a plain-text body.
fn preview(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= PREVIEW_CHARS {
        collapsed
    } else {
        collapsed.chars().take(PREVIEW_CHARS).collect()
    }
}
