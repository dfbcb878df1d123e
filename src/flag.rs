//! IMAP message flags
//!
//! Provides a strongly-typed enum for IMAP flags instead of raw
//! strings. Standard system flags have dedicated variants; arbitrary
//! keyword flags use the `Keyword` variant.
//!
//! A message's flags form a set: order carries no meaning. They are
//! collected into a [`FlagSet`] and serialized as a JSON array of
//! their IMAP string forms.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// An IMAP message flag.
///
/// System flags (prefixed with `\` in the IMAP protocol) have
/// dedicated variants. User-defined keyword flags use [`Flag::Keyword`].
///
/// # Examples
///
/// ```
/// use inbox_viewer::Flag;
///
/// let seen = Flag::Seen;
/// assert_eq!(seen.as_imap_str(), "\\Seen");
///
/// let kw = Flag::from("$Important");
/// assert_eq!(kw, Flag::Keyword("$Important".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    /// Message has been read (`\Seen`).
    Seen,
    /// Message has been answered (`\Answered`).
    Answered,
    /// Message is flagged for attention (`\Flagged`).
    Flagged,
    /// Message is marked for deletion (`\Deleted`).
    Deleted,
    /// Message is a draft (`\Draft`).
    Draft,
    /// Message arrived in this session (`\Recent`).
    Recent,
    /// A user-defined keyword flag (no `\` prefix).
    Keyword(String),
}

/// The unordered set of flags on one message.
pub type FlagSet = BTreeSet<Flag>;

impl Flag {
    /// The IMAP wire representation of this flag.
    ///
    /// System flags include the leading backslash (e.g. `\Seen`).
    /// Keyword flags are returned as-is.
    #[must_use]
    pub fn as_imap_str(&self) -> &str {
        match self {
            Self::Seen => "\\Seen",
            Self::Answered => "\\Answered",
            Self::Flagged => "\\Flagged",
            Self::Deleted => "\\Deleted",
            Self::Draft => "\\Draft",
            Self::Recent => "\\Recent",
            Self::Keyword(kw) => kw,
        }
    }
}

impl From<&str> for Flag {
    fn from(s: &str) -> Self {
        let system = |name: &str| {
            s.strip_prefix('\\')
                .is_some_and(|rest| rest.eq_ignore_ascii_case(name))
        };
        if system("Seen") {
            Self::Seen
        } else if system("Answered") {
            Self::Answered
        } else if system("Flagged") {
            Self::Flagged
        } else if system("Deleted") {
            Self::Deleted
        } else if system("Draft") {
            Self::Draft
        } else if system("Recent") {
            Self::Recent
        } else {
            Self::Keyword(s.to_string())
        }
    }
}

impl From<async_imap::types::Flag<'_>> for Flag {
    fn from(flag: async_imap::types::Flag<'_>) -> Self {
        use async_imap::types::Flag as Wire;
        match flag {
            Wire::Seen => Self::Seen,
            Wire::Answered => Self::Answered,
            Wire::Flagged => Self::Flagged,
            Wire::Deleted => Self::Deleted,
            Wire::Draft => Self::Draft,
            Wire::Recent => Self::Recent,
            Wire::MayCreate => Self::Keyword("\\*".to_string()),
            Wire::Custom(name) => Self::from(name.as_ref()),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_imap_str())
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_imap_str())
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}
