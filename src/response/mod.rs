//! Atom response parsing: feed and entry documents into normalized
//! [`Post`](post::Post) records.
//!
//! Parsing is synchronous, pure, and stateless. Each call operates only
//! on its own input document and produces a fresh output structure, so
//! concurrent calls need no locking. Optional XML fields degrade to
//! empty/omitted values; only a malformed document or an entry identifier
//! without a trailing UUID segment abort a parse.
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub mod feed;
pub mod post;

pub use feed::{parse_feed, parse_feed_document, PostFeed};
pub use post::{
    parse_entry, parse_post, parse_post_document, LinkRelation, Post, PostCollection, PostLink,
    UserInfo,
};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that abort an entry or feed parse.
///
/// Field-level absence is never an error; these two cover the only hard
/// failures the parsers produce.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input could not be parsed as XML, or a single-entry document does
    /// not have an `atom:entry` root.
    #[error("Malformed Atom document: {0}")]
    MalformedDocument(String),

    /// The entry's `atom:id` does not end in a UUID-shaped segment, so
    /// the short `id` (the primary external key) cannot be derived.
    #[error("Entry identifier '{urn}' does not end in a UUID segment")]
    MalformedIdentifier { urn: String },
}

// ============================================================================
// Field Normalization
// ============================================================================

fn urn_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"([0-9A-Za-z]{8}-[0-9A-Za-z]{4}-[0-9A-Za-z]{4}-[0-9A-Za-z]{4}-[0-9A-Za-z]{12})$",
        )
        .expect("URN pattern compiles")
    })
}

/// Extracts the trailing UUID-shaped segment from an entry's URN
/// identifier, e.g. `urn:lsid:ibm.com:blogs:entry-<uuid>` → `<uuid>`.
pub(crate) fn urn_to_id(urn: &str) -> Result<String, ParseError> {
    urn_regex()
        .captures(urn)
        .map(|captures| captures[1].to_string())
        .ok_or_else(|| ParseError::MalformedIdentifier {
            urn: urn.to_string(),
        })
}

/// Parses an Atom timestamp (RFC 3339) to epoch milliseconds.
///
/// Empty or unparseable input yields `None`, never an error; timestamp
/// elements are optional on entries.
pub(crate) fn parse_timestamp(text: &str) -> Option<i64> {
    if text.is_empty() {
        return None;
    }
    chrono::DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Normalizes a raw XPath `number()` result into a count.
///
/// The accessor passes NaN through for absent rank elements; every
/// rank-derived count in the output (hit, collection counts, feed total)
/// goes through this one coercion: NaN and negative values become 0,
/// everything else truncates to an unsigned integer.
pub(crate) fn coerce_count(value: f64) -> u64 {
    if value.is_nan() || value < 0.0 {
        0
    } else {
        value as u64
    }
}

// ============================================================================
// Tests
// ============================================================================
