//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., using an
//! `IssueIid` where an `IssueId` is expected) and make the code more
//! self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned when a string is not a valid 40-character hex revision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid SHA {0:?}: expected 40 lowercase hex characters")]
pub struct InvalidSha(pub String);

/// A git commit SHA (40 hex characters).
///
/// The all-zero SHA is the blank sentinel git uses in push notifications: as
/// the old revision it means the ref did not exist, as the new revision it
/// means the ref was deleted.
///
/// Deserialization goes through [`Sha::parse`], so revisions arriving over
/// the wire are always 40 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha(String);

impl Sha {
    /// The blank sentinel revision.
    pub const BLANK: &'static str = "0000000000000000000000000000000000000000";

    /// Creates a new Sha from a string.
    ///
    /// Note: This does not validate the format. Use [`Sha::parse`] for input
    /// arriving from outside the process.
    pub fn new(s: impl Into<String>) -> Self {
        Sha(s.into())
    }

    /// Parses and validates a SHA.
    ///
    /// Accepts exactly 40 hex characters; uppercase input is normalised to
    /// lowercase.
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidSha> {
        let s = s.into();
        if s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Sha(s.to_ascii_lowercase()))
        } else {
            Err(InvalidSha(s))
        }
    }

    /// Returns the blank sentinel.
    pub fn blank() -> Self {
        Sha(Self::BLANK.to_string())
    }

    /// Returns true if this is the blank sentinel.
    pub fn is_blank(&self) -> bool {
        self.0 == Self::BLANK
    }

    /// Returns the SHA as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (8-character) version of the SHA for display.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Sha {
    type Error = InvalidSha;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Sha::parse(s)
    }
}

impl From<Sha> for String {
    fn from(sha: Sha) -> Self {
        sha.0
    }
}

impl From<&str> for Sha {
    fn from(s: &str) -> Self {
        Sha(s.to_string())
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                $name(n)
            }
        }
    };
}

numeric_id!(
    /// A project identifier.
    ProjectId
);

numeric_id!(
    /// A user identifier.
    UserId
);

numeric_id!(
    /// A globally unique issue identifier.
    IssueId
);

numeric_id!(
    /// Sequence number assigned to a record in the push event log.
    EventId
);

/// A project-scoped issue number, the `N` in `#N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueIid(pub u64);

impl fmt::Display for IssueIid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for IssueIid {
    fn from(n: u64) -> Self {
        IssueIid(n)
    }
}
