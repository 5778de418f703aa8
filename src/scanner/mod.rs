//! Issue reference extraction from commit messages.
//!
//! Each tracker supplies a token pattern (`#12` for the internal tracker,
//! `JIRA-1` for an external one). From it two pattern sets are built: the
//! mention pattern, which is the bare token, and the closing pattern, which is
//! a closing keyword followed by one or more tokens:
//!
//! ```text
//! Closes #12
//! fixes: JIRA-1
//! Resolves issues #1, #2 and #3
//! ```
//!
//! A token consumed by a closing phrase is a closing reference everywhere in
//! that message, so it never also produces a mention.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::payload::CommitSummary;
use crate::trackers::{IssueHandle, IssueTracker};
use crate::types::{Project, Sha};

/// Closing keywords, matched case-insensitively, with an optional colon and
/// an optional `issue`/`issues` word before the first token.
const CLOSING_KEYWORDS: &str =
    r"\b(?i:clos(?:e[sd]?|ing)|fix(?:e[sd]|ing)?|resolv(?:e[sd]?|ing))\b:?\s+(?:(?i:issues?)\s+)?";

/// Separators allowed between tokens in one closing phrase.
const TOKEN_LIST_SEPARATOR: &str = r"(?:\s*,\s*(?:and\s+)?|\s+and\s+|\s+)";

/// `#12`, not preceded by a word character.
pub const INTERNAL_TOKEN: &str = r"\B#\d+\b";

/// `PROJ-123`: an upper-case project key, a dash and a number.
pub const EXTERNAL_TOKEN: &str = r"\b[A-Z][A-Z0-9_]+-\d+\b";

static INTERNAL_PATTERNS: LazyLock<ReferencePatterns> = LazyLock::new(|| {
    ReferencePatterns::new(INTERNAL_TOKEN).expect("internal reference pattern is valid")
});

static EXTERNAL_PATTERNS: LazyLock<ReferencePatterns> = LazyLock::new(|| {
    ReferencePatterns::new(EXTERNAL_TOKEN).expect("external reference pattern is valid")
});

/// The mention and closing patterns of one tracker.
#[derive(Debug, Clone)]
pub struct ReferencePatterns {
    mention: Regex,
    closing: Regex,
}

impl ReferencePatterns {
    /// Builds both pattern sets from a token regex.
    pub fn new(token: &str) -> Result<Self, regex::Error> {
        let mention = Regex::new(token)?;
        let closing = Regex::new(&format!(
            "{CLOSING_KEYWORDS}(?P<refs>{token}(?:{TOKEN_LIST_SEPARATOR}{token})*)"
        ))?;
        Ok(ReferencePatterns { mention, closing })
    }

    /// Patterns for `#N` references.
    pub fn internal() -> &'static ReferencePatterns {
        &INTERNAL_PATTERNS
    }

    /// Patterns for `KEY-N` references.
    pub fn external() -> &'static ReferencePatterns {
        &EXTERNAL_PATTERNS
    }

    /// Every reference token in `text`, in order of appearance.
    pub fn match_references<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.mention.find_iter(text).map(|m| m.as_str()).collect()
    }

    /// Tokens that follow a closing keyword, in order of appearance.
    pub fn match_closing<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.closing
            .captures_iter(text)
            .filter_map(|caps| caps.name("refs"))
            .flat_map(|refs| self.mention.find_iter(refs.as_str()))
            .map(|m| m.as_str())
            .collect()
    }
}

/// A raw token found in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceToken {
    pub text: String,
    pub closing: bool,
}

/// Splits a message into closing and mention tokens.
///
/// Closing tokens come first. Each distinct token text appears once, and a
/// token that is closing anywhere in the message is never a mention.
pub fn scan_message(patterns: &ReferencePatterns, message: &str) -> Vec<ReferenceToken> {
    let mut seen = HashSet::new();
    let closing = patterns
        .match_closing(message)
        .into_iter()
        .map(|text| (text, true));
    let mentions = patterns
        .match_references(message)
        .into_iter()
        .map(|text| (text, false));

    closing
        .chain(mentions)
        .filter(|(text, _)| seen.insert(*text))
        .map(|(text, closing)| ReferenceToken {
            text: text.to_string(),
            closing,
        })
        .collect()
}

/// A resolved reference from a commit to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueReference {
    pub issue: IssueHandle,
    pub commit_id: Sha,
    pub is_closing: bool,
}

/// Scans one commit and resolves its tokens against the tracker.
///
/// Tokens the tracker cannot resolve are dropped. Two tokens resolving to the
/// same issue yield one reference, closing if either was closing.
pub async fn scan<T: IssueTracker>(
    tracker: &T,
    project: &Project,
    commit: &CommitSummary,
) -> Vec<IssueReference> {
    let mut references: Vec<IssueReference> = Vec::new();
    for token in scan_message(tracker.patterns(), &commit.message) {
        let Some(issue) = tracker.resolve(project, &token.text).await else {
            trace!(
                token = %token.text,
                commit = %commit.id.short(),
                "dropping unresolved reference"
            );
            continue;
        };
        // Closing tokens are scanned first, so an existing entry already
        // carries the stronger flag.
        if references.iter().any(|r| r.issue == issue) {
            continue;
        }
        references.push(IssueReference {
            issue,
            commit_id: commit.id.clone(),
            is_closing: token.closing,
        });
    }
    references
}
