//! UID SEARCH command handler.
//!
//! The client only asks whether a UID exists (`UID SEARCH UID <n>`),
//! so only `ALL` and `UID <set>` are matched; other keys match
//! everything. Response format (RFC 3501 Section 7.2.5):
//!
//! ```text
//! * SEARCH 42
//! A0003 OK SEARCH completed
//! ```

use super::fetch::contains;
use crate::fake_imap::io::{write_line, write_tagged};
use crate::fake_imap::mailbox::{Mailbox, TestEmail};
use imap_codec::imap_types::search::SearchKey;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle UID SEARCH. Returns matching UIDs from the selected folder.
pub async fn handle_uid_search<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    criteria: &[SearchKey<'_>],
    mailbox: &Mailbox,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder_name) = selected_folder else {
        let _ = write_tagged(stream, tag, "BAD No folder selected").await;
        return;
    };

    let Some(folder) = mailbox.get_folder(folder_name) else {
        let _ = write_tagged(stream, tag, "BAD Folder not found").await;
        return;
    };

    let largest = folder.emails.iter().map(|e| e.uid).max().unwrap_or(0);
    let uids: Vec<String> = folder
        .emails
        .iter()
        .filter(|e| criteria.iter().all(|key| matches_key(e, key, largest)))
        .map(|e| e.uid.to_string())
        .collect();

    if write_line(stream, &format!("* SEARCH {}\r\n", uids.join(" ")))
        .await
        .is_err()
    {
        return;
    }
    let _ = write_tagged(stream, tag, "OK SEARCH completed").await;
}

fn matches_key(email: &TestEmail, key: &SearchKey<'_>, largest: u32) -> bool {
    match key {
        SearchKey::Uid(set) => contains(set, email.uid, largest),
        SearchKey::And(keys) => keys.as_ref().iter().all(|k| matches_key(email, k, largest)),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use imap_codec::imap_types::sequence::{SeqOrUid, Sequence, SequenceSet};
    use std::num::NonZeroU32;
    use tokio::io::BufReader;

    const RAW: &[u8] = b"From: a@b.com\r\nSubject: Test\r\n\r\nBody";

    fn uid_key(n: u32) -> SearchKey<'static> {
        let value = SeqOrUid::Value(NonZeroU32::new(n).unwrap());
        SearchKey::Uid(SequenceSet(
            vec![Sequence::Single(value)].try_into().unwrap(),
        ))
    }

    async fn run(
        criteria: &[SearchKey<'_>],
        mailbox: &Mailbox,
        selected: Option<&str>,
    ) -> String {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        handle_uid_search("A1", criteria, mailbox, selected, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn inbox() -> Mailbox {
        MailboxBuilder::new()
            .folder("INBOX")
            .email(7, RAW)
            .email(42, RAW)
            .build()
    }

    #[tokio::test]
    async fn search_all_returns_all_uids() {
        let output = run(&[SearchKey::All], &inbox(), Some("INBOX")).await;
        assert!(output.contains("* SEARCH 7 42\r\n"));
        assert!(output.contains("A1 OK SEARCH completed"));
    }

    #[tokio::test]
    async fn search_by_uid_finds_one() {
        let output = run(&[uid_key(42)], &inbox(), Some("INBOX")).await;
        assert!(output.contains("* SEARCH 42\r\n"));
    }

    #[tokio::test]
    async fn search_by_unknown_uid_is_empty() {
        let output = run(&[uid_key(99)], &inbox(), Some("INBOX")).await;
        assert!(output.contains("* SEARCH \r\n"));
        assert!(output.contains("A1 OK SEARCH completed"));
    }

    #[tokio::test]
    async fn no_folder_selected_returns_bad() {
        let output = run(&[SearchKey::All], &inbox(), None).await;
        assert!(output.contains("A1 BAD No folder selected"));
    }
}
