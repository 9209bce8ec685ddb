//! XML support: the fixed namespace table, the constrained XPath-subset
//! evaluator used by the response parsers, and the Atom entry writer.

pub mod select;
pub mod write;

/// Atom 1.0 namespace.
pub const NS_ATOM: &str = "http://www.w3.org/2005/Atom";
/// IBM Connections vendor extension namespace (ranks, user info, moderation).
pub const NS_SNX: &str = "http://www.ibm.com/xmlns/prod/sn";
/// Atom Publishing Protocol namespace.
pub const NS_APP: &str = "http://www.w3.org/2007/app";
/// OpenSearch namespace (feed-level result counters).
pub const NS_OPENSEARCH: &str = "http://a9.com/-/spec/opensearch/1.1/";

/// Resolves one of the fixed namespace prefixes to its URI.
///
/// The prefix table is not user-configurable; every expression the
/// parsers compile uses only these four prefixes.
pub fn resolve_prefix(prefix: &str) -> Option<&'static str> {
    match prefix {
        "atom" => Some(NS_ATOM),
        "snx" => Some(NS_SNX),
        "app" => Some(NS_APP),
        "opensearch" => Some(NS_OPENSEARCH),
        _ => None,
    }
}
