//! FETCH and UID FETCH command handler.
//!
//! Message bodies travel as **counted literals**:
//!
//! ```text
//! * <seq> FETCH (UID <uid> FLAGS (<flags>) BODY[] {<length>}
//! <exactly length bytes of raw RFC 5322 message>
//! )
//! ```
//!
//! The `{length}\r\n` marker tells the client that the next `length`
//! bytes are raw data, not protocol text. Whatever data items were
//! requested, the reply always carries UID, FLAGS and BODY[], which is
//! what the inbox client asks for.
//!
//! With plain FETCH the set addresses sequence numbers (1-based
//! position in the folder); with UID FETCH it addresses UIDs. `*`
//! means the last message (or the highest UID). Unknown numbers are
//! skipped silently, as RFC 3501 allows.
//!
//! A mailbox built with `reject_fetch()` answers `NO` without any
//! untagged data.

use crate::fake_imap::io::{write_bytes, write_line, write_tagged};
use crate::fake_imap::mailbox::{Mailbox, TestEmail};
use imap_codec::imap_types::sequence::{SeqOrUid, Sequence, SequenceSet};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Resolve one end of a range. `*` is the largest value in use.
fn resolve(value: &SeqOrUid, largest: u32) -> u32 {
    match value {
        SeqOrUid::Value(v) => v.get(),
        SeqOrUid::Asterisk => largest,
    }
}

/// Does `number` fall inside the sequence set?
pub(super) fn contains(seq_set: &SequenceSet, number: u32, largest: u32) -> bool {
    seq_set.0.as_ref().iter().any(|seq| match seq {
        Sequence::Single(v) => resolve(v, largest) == number,
        Sequence::Range(a, b) => {
            let (a, b) = (resolve(a, largest), resolve(b, largest));
            (a.min(b)..=a.max(b)).contains(&number)
        }
    })
}

/// Select `(sequence number, email)` pairs addressed by the set.
fn select_emails<'m>(
    emails: &'m [TestEmail],
    seq_set: &SequenceSet,
    by_uid: bool,
) -> Vec<(usize, &'m TestEmail)> {
    let largest = if by_uid {
        emails.iter().map(|e| e.uid).max().unwrap_or(0)
    } else {
        u32::try_from(emails.len()).unwrap_or(u32::MAX)
    };

    emails
        .iter()
        .enumerate()
        .map(|(idx, email)| (idx + 1, email))
        .filter(|(seq, email)| {
            let number = if by_uid {
                email.uid
            } else {
                u32::try_from(*seq).unwrap_or(u32::MAX)
            };
            contains(seq_set, number, largest)
        })
        .collect()
}

/// Handle FETCH / UID FETCH. Returns each addressed email as an IMAP
/// literal.
pub async fn handle_fetch<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    sequence_set: &SequenceSet,
    by_uid: bool,
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

    if mailbox.reject_fetch {
        let _ = write_tagged(stream, tag, "NO [SERVERBUG] Fetch failed").await;
        return;
    }

    for (seq, email) in select_emails(&folder.emails, sequence_set, by_uid) {
        let header = format!(
            "* {seq} FETCH (UID {} FLAGS ({}) BODY[] {{{}}}\r\n",
            email.uid,
            email.flags.join(" "),
            email.raw.len()
        );
        if write_line(stream, &header).await.is_err()
            || write_bytes(stream, &email.raw).await.is_err()
            || write_line(stream, ")\r\n").await.is_err()
        {
            return;
        }
    }

    let _ = write_tagged(stream, tag, "OK FETCH completed").await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use std::num::NonZeroU32;
    use tokio::io::BufReader;

    const RAW: &[u8] = b"From: a@b.com\r\nSubject: Test\r\n\r\nBody";

    fn value(n: u32) -> SeqOrUid {
        SeqOrUid::Value(NonZeroU32::new(n).unwrap())
    }

    fn single(n: u32) -> SequenceSet {
        SequenceSet(vec![Sequence::Single(value(n))].try_into().unwrap())
    }

    fn one_to_star() -> SequenceSet {
        SequenceSet(
            vec![Sequence::Range(value(1), SeqOrUid::Asterisk)]
                .try_into()
                .unwrap(),
        )
    }

    async fn run(
        tag: &str,
        sequence_set: &SequenceSet,
        by_uid: bool,
        mailbox: &Mailbox,
        selected: Option<&str>,
    ) -> String {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let mut stream = BufReader::new(server);

        handle_fetch(tag, sequence_set, by_uid, mailbox, selected, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn uid_fetch_returns_uid_flags_and_literal() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(7, RAW)
            .email_with_flags(42, &["\\Seen", "\\Flagged"], RAW)
            .build();

        let output = run("A1", &single(42), true, &mailbox, Some("INBOX")).await;

        assert!(output.contains(&format!(
            "* 2 FETCH (UID 42 FLAGS (\\Seen \\Flagged) BODY[] {{{}}}",
            RAW.len()
        )));
        assert!(!output.contains("UID 7 "));
        assert!(output.contains("A1 OK FETCH completed"));
    }

    #[tokio::test]
    async fn sequence_range_to_star_returns_everything_in_order() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(10, RAW)
            .email(20, RAW)
            .email(30, RAW)
            .build();

        let output = run("A1", &one_to_star(), false, &mailbox, Some("INBOX")).await;

        let first = output.find("* 1 FETCH (UID 10").unwrap();
        let second = output.find("* 2 FETCH (UID 20").unwrap();
        let third = output.find("* 3 FETCH (UID 30").unwrap();
        assert!(first < second && second < third);
    }

    #[tokio::test]
    async fn sequence_number_is_not_a_uid() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(10, RAW)
            .build();

        let output = run("A1", &single(10), false, &mailbox, Some("INBOX")).await;
        assert!(!output.contains("FETCH (UID"));
    }

    #[tokio::test]
    async fn missing_uid_returns_only_ok() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();

        let output = run("A1", &single(99), true, &mailbox, Some("INBOX")).await;

        assert!(!output.contains("FETCH (UID"));
        assert!(output.contains("A1 OK FETCH completed"));
    }

    #[tokio::test]
    async fn rejected_fetch_returns_no_without_data() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(1, RAW)
            .reject_fetch()
            .build();

        let output = run("A1", &one_to_star(), false, &mailbox, Some("INBOX")).await;

        assert!(!output.contains("FETCH (UID"));
        assert!(output.contains("A1 NO [SERVERBUG] Fetch failed"));
    }

    #[tokio::test]
    async fn no_folder_selected_returns_bad() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();

        let output = run("A1", &single(1), true, &mailbox, None).await;

        assert!(output.contains("A1 BAD No folder selected"));
    }
}
