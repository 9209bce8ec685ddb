//! Entry parser: one Atom `<entry>` node into a normalized [`Post`].
//!
//! Every field is extracted by a fixed compiled expression; the
//! expressions are compiled once and shared across calls. All
//! extractions are independent — a missing optional element degrades to
//! an empty string, zero, or an omitted `Option`/map key, and never
//! aborts the rest of the entry. The only mandatory field is the URN
//! identifier, which must end in a UUID segment.
use roxmltree::{Document, Node};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

use super::{coerce_count, parse_timestamp, urn_to_id, ParseError};
use crate::xml::select::Expr;
use crate::xml::NS_ATOM;

// ============================================================================
// Vendor Schemes
// ============================================================================

/// `snx:rank` scheme carrying the view count.
const SCHEME_HIT: &str = "http://www.ibm.com/xmlns/prod/sn/hit";
/// `snx:rank` scheme carrying the recommendation count.
const SCHEME_RECOMMENDATIONS: &str = "http://www.ibm.com/xmlns/prod/sn/recommendations";
/// `snx:rank` scheme carrying the comment count.
const SCHEME_COMMENT: &str = "http://www.ibm.com/xmlns/prod/sn/comment";
/// `atom:category` scheme marking `app:collection` children.
const SCHEME_COLLECTION: &str = "http://www.ibm.com/xmlns/prod/sn/collection";

// ============================================================================
// Data Model
// ============================================================================

/// A normalized blog post parsed from one Atom entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    /// Trailing UUID segment of [`urn`](Self::urn); the primary external key.
    pub id: String,
    /// Full raw `atom:id` value.
    pub urn: String,
    /// Owning community UUID; empty for standalone blogs.
    pub community_uuid: String,
    pub title: String,
    /// Moderation status (e.g. `"approved"`); empty when the entry
    /// carries no `snx:moderation` element.
    pub status: String,
    /// Epoch milliseconds; `None` when the element is absent.
    pub updated: Option<i64>,
    /// Epoch milliseconds of the last edit (`app:edited`).
    pub edited: Option<i64>,
    /// Epoch milliseconds of first publication.
    pub published: Option<i64>,
    /// MIME subtype of the summary (e.g. `"html"`); may be empty.
    pub summary_type: String,
    pub summary: String,
    /// MIME subtype of the content; may be empty.
    pub content_type: String,
    pub content: String,
    /// View count; 0 when the hit-scheme rank element is absent.
    pub hit: u64,
    /// Recommendations collection; `None` when the entry has no
    /// recommend `app:collection`.
    pub recommendations: Option<PostCollection>,
    /// Comments collection; `None` when the entry has no comments
    /// `app:collection`.
    pub comments: Option<PostCollection>,
    /// Only relations present in the entry appear as keys.
    pub links: HashMap<LinkRelation, PostLink>,
    pub author: Option<UserInfo>,
    pub contributor: Option<UserInfo>,
}

/// A sub-resource collection (recommendations or comments) attached to a
/// post, with its count taken from the matching entry-level rank element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostCollection {
    pub title: String,
    pub href: String,
    pub count: u64,
}

/// One hyperlink attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostLink {
    pub href: String,
    /// Media type advertised on the link (`type` attribute).
    pub media_type: String,
}

/// The five fixed link relations an entry can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRelation {
    /// Edit link; only present when the authenticated user is the blog author.
    Edit,
    #[serde(rename = "self")]
    SelfLink,
    Replies,
    /// Not always present; media resource for the entry.
    Media,
    /// Points at the rendered HTML view.
    Alternate,
}

/// Author or contributor identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub name: String,
    pub user_id: String,
    /// Directory state of the user (e.g. `"active"`).
    pub state: String,
    /// Whether the user is external to the organization.
    pub external: bool,
}

// ============================================================================
// Compiled Selectors
// ============================================================================

struct EntrySelectors {
    urn: Expr,
    community_uuid: Expr,
    title: Expr,
    status: Expr,
    updated: Expr,
    edited: Expr,
    published: Expr,
    summary_type: Expr,
    summary: Expr,
    content_type: Expr,
    content: Expr,
    hit: Expr,
    recommend_collection: Expr,
    recommend_count: Expr,
    comment_collection: Expr,
    comment_count: Expr,
    collection_title: Expr,
    collection_href: Expr,
    author: Expr,
    contributor: Expr,
    user_name: Expr,
    user_id: Expr,
    user_state: Expr,
    user_external: Expr,
    links: Vec<(LinkRelation, Expr)>,
}

/// Fixed expressions; a compile failure here is a programmer error and
/// covered by `test_selectors_compile`.
fn compile(expression: &str) -> Expr {
    Expr::parse(expression).expect("fixed selector compiles")
}

fn collection_selector(term: &str) -> Expr {
    compile(&format!(
        r#"app:collection[atom:category[@term="{term}" and @scheme="{SCHEME_COLLECTION}"]]"#
    ))
}

fn rank_selector(scheme: &str) -> Expr {
    compile(&format!(r#"number(snx:rank[@scheme="{scheme}"]/text())"#))
}

fn link_selector(rel: &str, media_type: &str) -> Expr {
    compile(&format!(
        r#"atom:link[@rel="{rel}" and @type="{media_type}"]"#
    ))
}

fn selectors() -> &'static EntrySelectors {
    static SELECTORS: OnceLock<EntrySelectors> = OnceLock::new();
    SELECTORS.get_or_init(|| EntrySelectors {
        urn: compile("string(atom:id/text())"),
        community_uuid: compile("string(snx:communityUuid/text())"),
        title: compile("string(atom:title/text())"),
        status: compile("string(snx:moderation/@status)"),
        updated: compile("string(atom:updated/text())"),
        edited: compile("string(app:edited/text())"),
        published: compile("string(atom:published/text())"),
        summary_type: compile("string(atom:summary/@type)"),
        summary: compile("string(atom:summary/text())"),
        content_type: compile("string(atom:content/@type)"),
        content: compile("string(atom:content/text())"),
        hit: rank_selector(SCHEME_HIT),
        recommend_collection: collection_selector("recommend"),
        recommend_count: rank_selector(SCHEME_RECOMMENDATIONS),
        comment_collection: collection_selector("comments"),
        comment_count: rank_selector(SCHEME_COMMENT),
        collection_title: compile("string(atom:title/text())"),
        collection_href: compile("string(@href)"),
        author: compile("atom:author"),
        contributor: compile("atom:contributor"),
        user_name: compile("string(atom:name/text())"),
        user_id: compile("string(snx:userid/text())"),
        user_state: compile("string(snx:userState/text())"),
        user_external: compile("boolean(snx:isExternal/text())"),
        links: vec![
            (
                LinkRelation::Edit,
                link_selector("edit", "application/atom+xml"),
            ),
            (
                LinkRelation::SelfLink,
                link_selector("self", "application/atom+xml"),
            ),
            (
                LinkRelation::Replies,
                link_selector("replies", "application/atom+xml"),
            ),
            (
                LinkRelation::Media,
                link_selector("media", "application/atom+xml"),
            ),
            (LinkRelation::Alternate, link_selector("alternate", "text/html")),
        ],
    })
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses one `atom:entry` element node into a [`Post`].
pub fn parse_entry(entry: Node<'_, '_>) -> Result<Post, ParseError> {
    let s = selectors();

    let urn = s.urn.string(entry);
    let id = urn_to_id(&urn)?;

    let recommendations = s
        .recommend_collection
        .node(entry)
        .map(|collection| parse_collection(entry, collection, &s.recommend_count));
    let comments = s
        .comment_collection
        .node(entry)
        .map(|collection| parse_collection(entry, collection, &s.comment_count));

    let mut links = HashMap::new();
    for (relation, selector) in &s.links {
        if let Some(link) = selector.node(entry) {
            links.insert(
                *relation,
                PostLink {
                    href: link.attribute("href").unwrap_or_default().to_string(),
                    media_type: link.attribute("type").unwrap_or_default().to_string(),
                },
            );
        }
    }

    let author = s.author.node(entry).map(parse_user_info);
    let contributor = s.contributor.node(entry).map(parse_user_info);

    Ok(Post {
        id,
        urn,
        community_uuid: s.community_uuid.string(entry),
        title: s.title.string(entry),
        status: s.status.string(entry),
        updated: parse_timestamp(&s.updated.string(entry)),
        edited: parse_timestamp(&s.edited.string(entry)),
        published: parse_timestamp(&s.published.string(entry)),
        summary_type: s.summary_type.string(entry),
        summary: s.summary.string(entry),
        content_type: s.content_type.string(entry),
        content: s.content.string(entry),
        hit: coerce_count(s.hit.number(entry)),
        recommendations,
        comments,
        links,
        author,
        contributor,
    })
}

/// The collection's title and href come from the `app:collection` node;
/// its count comes from the entry-level rank element for the matching
/// scheme.
fn parse_collection(
    entry: Node<'_, '_>,
    collection: Node<'_, '_>,
    count: &Expr,
) -> PostCollection {
    let s = selectors();
    PostCollection {
        title: s.collection_title.string(collection),
        href: s.collection_href.string(collection),
        count: coerce_count(count.number(entry)),
    }
}

fn parse_user_info(node: Node<'_, '_>) -> UserInfo {
    let s = selectors();
    UserInfo {
        name: s.user_name.string(node),
        user_id: s.user_id.string(node),
        state: s.user_state.string(node),
        external: s.user_external.boolean(node),
    }
}

/// Parses a standalone Atom entry document.
pub fn parse_post(xml: &str) -> Result<Post, ParseError> {
    let doc = Document::parse(xml)
        .map_err(|e| ParseError::MalformedDocument(e.to_string()))?;
    parse_post_document(&doc)
}

/// Document-accepting variant of [`parse_post`]; the root element must
/// be `atom:entry`.
pub fn parse_post_document(doc: &Document<'_>) -> Result<Post, ParseError> {
    let root = doc.root_element();
    if root.tag_name().namespace() != Some(NS_ATOM) || root.tag_name().name() != "entry" {
        return Err(ParseError::MalformedDocument(format!(
            "expected an atom:entry root, found '{}'",
            root.tag_name().name()
        )));
    }
    parse_entry(root)
}

// ============================================================================
// Tests
// ============================================================================
