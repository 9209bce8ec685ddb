//! Feed parser: an Atom `<feed>` document into an ordered collection of
//! posts plus the OpenSearch total-result count.
use roxmltree::Document;
use serde::Serialize;
use std::sync::OnceLock;

use super::{coerce_count, post, ParseError, Post};
use crate::xml::select::Expr;

/// A parsed feed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostFeed {
    /// Total number of posts across all pages; 0 when the feed carries
    /// no `opensearch:totalResults` element.
    pub total_results: u64,
    /// Posts in document order (the service emits reverse-chronological).
    pub entries: Vec<Post>,
}

struct FeedSelectors {
    entries: Expr,
    total_results: Expr,
}

fn selectors() -> &'static FeedSelectors {
    static SELECTORS: OnceLock<FeedSelectors> = OnceLock::new();
    SELECTORS.get_or_init(|| FeedSelectors {
        entries: Expr::parse("/atom:feed/atom:entry").expect("fixed selector compiles"),
        total_results: Expr::parse("number(/atom:feed/opensearch:totalResults/text())")
            .expect("fixed selector compiles"),
    })
}

/// Parses an Atom feed document from its XML text.
///
/// The parse is all-or-nothing: a malformed document or a malformed
/// identifier in any single entry fails the whole feed, so callers never
/// see a partial entry list.
pub fn parse_feed(xml: &str) -> Result<PostFeed, ParseError> {
    let doc = Document::parse(xml)
        .map_err(|e| ParseError::MalformedDocument(e.to_string()))?;
    parse_feed_document(&doc)
}

/// Document-accepting variant of [`parse_feed`].
///
/// A well-formed document whose root is not `atom:feed` matches no
/// entries and yields an empty feed.
pub fn parse_feed_document(doc: &Document<'_>) -> Result<PostFeed, ParseError> {
    let s = selectors();

    let entries = s
        .entries
        .nodes(doc.root())
        .into_iter()
        .map(post::parse_entry)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PostFeed {
        total_results: coerce_count(s.total_results.number(doc.root())),
        entries,
    })
}
