//! Read-only inbox client
//!
//! Each public call opens its own IMAP session, does its work, and
//! logs out before returning. Nothing is shared between calls, so a
//! failed session never affects the next one.

use crate::config::ImapConfig;
use crate::connection::{self, ImapSession};
use crate::error::{Error, Result};
use crate::flag::{Flag, FlagSet};
use crate::message::{EmailDetail, EmailSummary, Inbox};
use crate::parse::ParsedMessage;
use async_imap::types::Fetch;
use chrono::Utc;
use futures::StreamExt;
use std::future::Future;
use tracing::{debug, info, warn};

/// The only mailbox this client reads.
pub const INBOX: &str = "INBOX";

/// Data items requested for every message: enough for both views.
const FETCH_QUERY: &str = "(UID FLAGS BODY.PEEK[])";

/// Read-only IMAP client for a single inbox
#[derive(Debug, Clone)]
pub struct MailboxClient {
    config: ImapConfig,
}

impl MailboxClient {
    #[must_use]
    pub const fn new(config: ImapConfig) -> Self {
        Self { config }
    }

    /// List every message in the inbox, newest (highest sequence
    /// number) first, along with the server's message count.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, SELECT, or FETCH fails, if
    /// the server returns fewer messages than it reported, or if the
    /// configured timeout expires.
    pub async fn list_inbox(&self) -> Result<Inbox> {
        self.with_session(|session| {
            Box::pin(async move {
                let total = connection::select(session, INBOX).await?.exists;
                if total == 0 {
                    debug!("{} is empty", INBOX);
                    return Ok(Inbox::default());
                }

                let fetched = fetch_exact(session, "1:*", false, total).await?;
                info!("Fetched {} messages", fetched.len());

                let now = Utc::now();
                let mut numbered: Vec<(u32, EmailSummary)> = fetched
                    .into_iter()
                    .map(|m| (m.seq, m.parsed.into_summary(m.uid, m.flags, now)))
                    .collect();
                numbered.sort_by(|a, b| b.0.cmp(&a.0));

                Ok(Inbox {
                    emails: numbered.into_iter().map(|(_, summary)| summary).collect(),
                    total,
                })
            })
        })
        .await
    }

    /// Fetch one message from the inbox by UID.
    ///
    /// Returns `Ok(None)` if no message has that UID.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, SELECT, SEARCH, or FETCH
    /// fails, or if the configured timeout expires.
    pub async fn fetch_detail(&self, uid: u32) -> Result<Option<EmailDetail>> {
        // UIDs start at 1.
        if uid == 0 {
            return Ok(None);
        }

        self.with_session(|session| {
            Box::pin(async move {
                connection::select(session, INBOX).await?;

                let found = session
                    .uid_search(format!("UID {uid}"))
                    .await
                    .map_err(|e| Error::Imap(format!("Search failed: {e}")))?;
                if !found.contains(&uid) {
                    info!("UID {} not found in {}", uid, INBOX);
                    return Ok(None);
                }

                let message = fetch_exact(session, &uid.to_string(), true, 1)
                    .await?
                    .into_iter()
                    .find(|m| m.uid == uid)
                    .ok_or_else(|| Error::Imap(format!("FETCH did not return UID {uid}")))?;

                Ok(Some(message.parsed.into_detail(
                    uid,
                    message.flags,
                    Utc::now(),
                )))
            })
        })
        .await
    }

    // -- private helpers --

    /// Run `op` against a fresh session within the configured timeout.
    ///
    /// Once logged in, LOGOUT is sent whether `op` succeeds or fails.
    /// On timeout the whole future, socket included, is dropped.
    async fn with_session<T, F>(&self, op: F) -> Result<T>
    where
        F: for<'s> FnOnce(
            &'s mut ImapSession,
        ) -> std::pin::Pin<Box<dyn Future<Output = Result<T>> + Send + 's>>,
    {
        let timeout = self.config.timeout;
        let work = async {
            let mut session = connection::connect(&self.config).await?;
            let result = op(&mut session).await;
            connection::logout(&mut session).await;
            result
        };

        tokio::time::timeout(timeout, work)
            .await
            .map_err(|_| Error::Timeout(timeout.as_secs()))?
    }
}

/// One message as returned by FETCH, body already parsed.
struct Fetched {
    seq: u32,
    uid: u32,
    flags: FlagSet,
    parsed: ParsedMessage,
}

/// Issue FETCH (or UID FETCH) and require exactly `expected` messages,
/// each carrying a UID.
///
/// The response stream ends at the tagged completion whatever its
/// status, so a rejected FETCH shows up as missing messages.
async fn fetch_exact(
    session: &mut ImapSession,
    set: &str,
    by_uid: bool,
    expected: u32,
) -> Result<Vec<Fetched>> {
    let fetches = fetch_all(session, set, by_uid).await?;

    if fetches.len() != expected as usize {
        return Err(Error::Imap(format!(
            "FETCH {set} returned {} of {expected} messages",
            fetches.len()
        )));
    }

    fetches
        .iter()
        .map(|fetch| {
            let uid = fetch.uid.ok_or_else(|| {
                Error::Imap(format!("FETCH response for message {} has no UID", fetch.message))
            })?;
            Ok(Fetched {
                seq: fetch.message,
                uid,
                flags: flags_of(fetch),
                parsed: parse_fetch(fetch),
            })
        })
        .collect()
}

/// Issue FETCH (or UID FETCH) and collect every response.
async fn fetch_all(session: &mut ImapSession, set: &str, by_uid: bool) -> Result<Vec<Fetch>> {
    let failed = |e: async_imap::error::Error| Error::Imap(format!("Fetch failed: {e}"));

    let results: Vec<_> = if by_uid {
        session.uid_fetch(set, FETCH_QUERY).await.map_err(failed)?.collect().await
    } else {
        session.fetch(set, FETCH_QUERY).await.map_err(failed)?.collect().await
    };

    results
        .into_iter()
        .map(|item| item.map_err(|e| Error::Imap(format!("Fetch error: {e}"))))
        .collect()
}

fn flags_of(fetch: &Fetch) -> FlagSet {
    fetch.flags().map(Flag::from).collect()
}

/// Parse the message body, falling back to an empty projection so a
/// single malformed message never fails the whole request.
fn parse_fetch(fetch: &Fetch) -> ParsedMessage {
    let Some(body) = fetch.body() else {
        warn!("No body returned for message {}", fetch.message);
        return ParsedMessage::default();
    };
    ParsedMessage::parse(body).unwrap_or_else(|e| {
        warn!("Failed to parse message {}: {}", fetch.message, e);
        ParsedMessage::default()
    })
}
