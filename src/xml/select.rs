//! Constrained XPath-subset evaluator over `roxmltree` nodes.
//!
//! The response parsers only ever use a small, fixed set of expression
//! shapes (scalar casts, child steps with attribute-equality predicates,
//! terminal `text()`/attribute steps), so this module implements exactly
//! that subset instead of pulling in a full XPath engine. Scalar results
//! follow XPath 1.0 function semantics: `string()` of an empty node-set
//! is `""`, `number()` of an empty node-set is NaN, `boolean()` tests
//! node-set non-emptiness.
//!
//! Supported grammar:
//!
//! ```text
//! expression := cast "(" location ")" | location
//! cast       := "string" | "number" | "boolean"
//! location   := ["/"] step ("/" step)*
//! step       := "text()" | "@" name | qname predicate*
//! predicate  := "[" condition (" and " condition)* "]"
//! condition  := "@" name "=" "\"" value "\"" | qname predicate*
//! qname      := prefix ":" name
//! ```
//!
//! Namespace prefixes resolve against the fixed table in [`super`];
//! unknown prefixes are parse errors.
use roxmltree::Node;
use thiserror::Error;

use super::resolve_prefix;

// ============================================================================
// Error Types
// ============================================================================

/// Parse-time diagnostics for the fixed expression grammar.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExprError {
    /// Prefix is not in the fixed namespace table.
    #[error("unknown namespace prefix '{0}'")]
    UnknownPrefix(String),

    /// The input deviates from the supported grammar.
    #[error("expected {expected} at byte {offset}")]
    Expected { expected: &'static str, offset: usize },

    /// `text()` and `@attr` select leaves; nothing can follow them.
    #[error("text() and attribute steps must terminate the path")]
    NonFinalStep,

    /// Leftover input after a complete expression.
    #[error("trailing input at byte {0}")]
    TrailingInput(usize),
}

// ============================================================================
// Compiled Expressions
// ============================================================================

/// Scalar cast wrapping a location path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cast {
    String,
    Number,
    Boolean,
}

/// Element name test plus its predicates, shared by steps and
/// child-existence conditions.
#[derive(Debug, Clone)]
struct ElementTest {
    namespace: &'static str,
    local: String,
    predicates: Vec<Condition>,
}

/// One predicate condition; all conditions of a step must hold.
#[derive(Debug, Clone)]
enum Condition {
    AttrEquals { name: String, value: String },
    HasChild(ElementTest),
}

#[derive(Debug, Clone)]
enum Step {
    Element(ElementTest),
    Text,
    Attr(String),
}

/// A compiled expression. Compile once (the parsers hold these in
/// `OnceLock` statics) and evaluate against any context node.
#[derive(Debug, Clone)]
pub struct Expr {
    cast: Option<Cast>,
    absolute: bool,
    steps: Vec<Step>,
}

/// Result of [`Expr::evaluate`]: the scalar named by the expression's
/// cast, or the matched node-set in document order for uncast paths.
#[derive(Debug, Clone)]
pub enum Value<'a, 'input> {
    String(String),
    Number(f64),
    Boolean(bool),
    Nodes(Vec<Node<'a, 'input>>),
}

// ============================================================================
// Parsing
// ============================================================================

struct Parser<'s> {
    input: &'s str,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(input: &'s str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'s str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char, what: &'static str) -> Result<(), ExprError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(ExprError::Expected {
                expected: what,
                offset: self.pos,
            })
        }
    }

    fn name(&mut self) -> Result<&'s str, ExprError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(ExprError::Expected {
                expected: "a name",
                offset: start,
            });
        }
        Ok(&self.input[start..self.pos])
    }

    /// `prefix:local` with the prefix resolved against the fixed table.
    fn qname(&mut self) -> Result<(&'static str, String), ExprError> {
        let prefix = self.name()?;
        self.expect(':', "':' after namespace prefix")?;
        let local = self.name()?;
        let namespace = resolve_prefix(prefix)
            .ok_or_else(|| ExprError::UnknownPrefix(prefix.to_string()))?;
        Ok((namespace, local.to_string()))
    }

    /// Quoted literal; the fixed expression set never embeds quotes.
    fn quoted(&mut self) -> Result<String, ExprError> {
        self.expect('"', "'\"'")?;
        let start = self.pos;
        match self.rest().find('"') {
            Some(len) => {
                let value = self.input[start..start + len].to_string();
                self.pos = start + len + 1;
                Ok(value)
            }
            None => Err(ExprError::Expected {
                expected: "closing '\"'",
                offset: self.pos,
            }),
        }
    }

    fn condition(&mut self) -> Result<Condition, ExprError> {
        if self.eat('@') {
            let name = self.name()?.to_string();
            self.expect('=', "'='")?;
            let value = self.quoted()?;
            Ok(Condition::AttrEquals { name, value })
        } else {
            Ok(Condition::HasChild(self.element_test()?))
        }
    }

    fn predicates(&mut self) -> Result<Vec<Condition>, ExprError> {
        let mut conditions = Vec::new();
        while self.eat('[') {
            loop {
                conditions.push(self.condition()?);
                if !self.eat_str(" and ") {
                    break;
                }
            }
            self.expect(']', "']'")?;
        }
        Ok(conditions)
    }

    fn element_test(&mut self) -> Result<ElementTest, ExprError> {
        let (namespace, local) = self.qname()?;
        let predicates = self.predicates()?;
        Ok(ElementTest {
            namespace,
            local,
            predicates,
        })
    }

    fn step(&mut self) -> Result<Step, ExprError> {
        if self.eat_str("text()") {
            Ok(Step::Text)
        } else if self.eat('@') {
            Ok(Step::Attr(self.name()?.to_string()))
        } else {
            Ok(Step::Element(self.element_test()?))
        }
    }

    fn location(&mut self) -> Result<(bool, Vec<Step>), ExprError> {
        let absolute = self.eat('/');
        let mut steps = vec![self.step()?];
        while self.eat('/') {
            steps.push(self.step()?);
        }
        // Leaf steps select text nodes or attribute values; a path cannot
        // continue below them.
        if steps[..steps.len() - 1]
            .iter()
            .any(|s| !matches!(s, Step::Element(_)))
        {
            return Err(ExprError::NonFinalStep);
        }
        Ok((absolute, steps))
    }
}

impl Expr {
    /// Compiles an expression of the supported grammar.
    pub fn parse(input: &str) -> Result<Self, ExprError> {
        let mut parser = Parser::new(input);

        let cast = if parser.eat_str("string(") {
            Some(Cast::String)
        } else if parser.eat_str("number(") {
            Some(Cast::Number)
        } else if parser.eat_str("boolean(") {
            Some(Cast::Boolean)
        } else {
            None
        };

        let (absolute, steps) = parser.location()?;

        if cast.is_some() {
            parser.expect(')', "')'")?;
        }
        if parser.pos != parser.input.len() {
            return Err(ExprError::TrailingInput(parser.pos));
        }

        Ok(Self {
            cast,
            absolute,
            steps,
        })
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Evaluates with the cast the expression was written with: cast
    /// expressions yield the scalar directly, uncast expressions yield
    /// the matched element node-set in document order.
    pub fn evaluate<'a, 'input>(&self, ctx: Node<'a, 'input>) -> Value<'a, 'input> {
        match self.cast {
            Some(Cast::String) => Value::String(self.string(ctx)),
            Some(Cast::Number) => Value::Number(self.number(ctx)),
            Some(Cast::Boolean) => Value::Boolean(self.boolean(ctx)),
            None => Value::Nodes(self.nodes(ctx)),
        }
    }

    /// XPath `string()`: string-value of the first matched item, `""`
    /// for an empty node-set.
    pub fn string(&self, ctx: Node<'_, '_>) -> String {
        self.items(ctx)
            .into_iter()
            .next()
            .map(|item| item.string_value())
            .unwrap_or_default()
    }

    /// XPath `number()`: string-value of the first matched item converted
    /// per XPath 1.0, NaN for an empty node-set or a non-numeric value.
    pub fn number(&self, ctx: Node<'_, '_>) -> f64 {
        match self.items(ctx).into_iter().next() {
            Some(item) => xpath_number(&item.string_value()),
            None => f64::NAN,
        }
    }

    /// XPath `boolean()` of a node-set: non-emptiness.
    pub fn boolean(&self, ctx: Node<'_, '_>) -> bool {
        !self.items(ctx).is_empty()
    }

    /// First matched element node, if any.
    pub fn node<'a, 'input>(&self, ctx: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
        self.nodes(ctx).into_iter().next()
    }

    /// All matched element/text nodes in document order.
    pub fn nodes<'a, 'input>(&self, ctx: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
        self.items(ctx)
            .into_iter()
            .filter_map(|item| match item {
                Item::Node(node) => Some(node),
                Item::Attr(_) => None,
            })
            .collect()
    }

    fn items<'a, 'input>(&self, ctx: Node<'a, 'input>) -> Vec<Item<'a, 'input>> {
        let mut current: Vec<Node<'a, 'input>> = if self.absolute {
            vec![ctx.document().root()]
        } else {
            vec![ctx]
        };

        for step in &self.steps {
            match step {
                Step::Element(test) => {
                    current = current
                        .iter()
                        .flat_map(|node| node.children())
                        .filter(|child| test.matches(*child))
                        .collect();
                }
                // Terminal by construction.
                Step::Text => {
                    return current
                        .iter()
                        .flat_map(|node| node.children())
                        .filter(|child| child.is_text())
                        .map(Item::Node)
                        .collect();
                }
                Step::Attr(name) => {
                    return current
                        .iter()
                        .filter_map(|node| node.attribute(name.as_str()))
                        .map(Item::Attr)
                        .collect();
                }
            }
        }

        current.into_iter().map(Item::Node).collect()
    }
}

impl ElementTest {
    fn matches(&self, node: Node<'_, '_>) -> bool {
        node.is_element()
            && node.tag_name().namespace() == Some(self.namespace)
            && node.tag_name().name() == self.local
            && self.predicates.iter().all(|p| p.holds(node))
    }
}

impl Condition {
    fn holds(&self, node: Node<'_, '_>) -> bool {
        match self {
            Condition::AttrEquals { name, value } => {
                node.attribute(name.as_str()) == Some(value.as_str())
            }
            Condition::HasChild(test) => node.children().any(|child| test.matches(child)),
        }
    }
}

/// One matched item: an element/text node, or an attribute value.
enum Item<'a, 'input> {
    Node(Node<'a, 'input>),
    Attr(&'a str),
}

impl Item<'_, '_> {
    fn string_value(&self) -> String {
        match self {
            Item::Node(node) if node.is_element() => node
                .descendants()
                .filter(|d| d.is_text())
                .filter_map(|d| d.text())
                .collect(),
            Item::Node(node) => node.text().unwrap_or_default().to_string(),
            Item::Attr(value) => (*value).to_string(),
        }
    }
}

/// XPath 1.0 string→number conversion: optional leading minus, digits
/// with at most one decimal point, surrounding whitespace ignored.
/// Everything else (including `+` signs and exponents) is NaN.
pub(crate) fn xpath_number(s: &str) -> f64 {
    let trimmed = s.trim();
    let body = trimmed.strip_prefix('-').unwrap_or(trimmed);
    if body.is_empty() {
        return f64::NAN;
    }

    let mut digits = 0usize;
    let mut dots = 0usize;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' if dots == 0 => dots += 1,
            _ => return f64::NAN,
        }
    }
    if digits == 0 {
        return f64::NAN;
    }

    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DOC: &str = r#"<entry xmlns="http://www.w3.org/2005/Atom"
        xmlns:snx="http://www.ibm.com/xmlns/prod/sn"
        xmlns:app="http://www.w3.org/2007/app">
    <id>urn:lsid:ibm.com:blogs:entry-4a8d6ca2-fc47-433b-8061-989e14745b19</id>
    <title type="text">Hello</title>
    <snx:rank scheme="http://www.ibm.com/xmlns/prod/sn/hit">15</snx:rank>
    <link rel="self" type="application/atom+xml" href="https://example.com/self"/>
    <link rel="alternate" type="text/html" href="https://example.com/alt"/>
    <app:collection href="https://example.com/recs">
        <category term="recommend" scheme="http://www.ibm.com/xmlns/prod/sn/collection"/>
        <title>Recommendations</title>
    </app:collection>
</entry>"#;

    fn entry<'a>(doc: &'a roxmltree::Document<'a>) -> roxmltree::Node<'a, 'a> {
        doc.root_element()
    }

    #[test]
    fn test_string_of_text() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let expr = Expr::parse("string(atom:title/text())").unwrap();
        assert_eq!(expr.string(entry(&doc)), "Hello");
    }

    #[test]
    fn test_string_of_attribute() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let expr = Expr::parse("string(atom:title/@type)").unwrap();
        assert_eq!(expr.string(entry(&doc)), "text");
    }

    #[test]
    fn test_string_of_empty_node_set_is_empty_string() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let expr = Expr::parse("string(atom:missing/text())").unwrap();
        assert_eq!(expr.string(entry(&doc)), "");
    }

    #[test]
    fn test_number_with_scheme_predicate() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let expr = Expr::parse(
            r#"number(snx:rank[@scheme="http://www.ibm.com/xmlns/prod/sn/hit"]/text())"#,
        )
        .unwrap();
        assert_eq!(expr.number(entry(&doc)), 15.0);
    }

    #[test]
    fn test_number_of_empty_node_set_is_nan() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let expr = Expr::parse(
            r#"number(snx:rank[@scheme="http://www.ibm.com/xmlns/prod/sn/comment"]/text())"#,
        )
        .unwrap();
        assert!(expr.number(entry(&doc)).is_nan());
    }

    #[test]
    fn test_boolean_is_node_set_non_emptiness() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let present = Expr::parse("boolean(atom:title/text())").unwrap();
        let absent = Expr::parse("boolean(snx:isExternal/text())").unwrap();
        assert!(present.boolean(entry(&doc)));
        assert!(!absent.boolean(entry(&doc)));
    }

    #[test]
    fn test_link_selection_by_rel_and_type() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let expr =
            Expr::parse(r#"atom:link[@rel="self" and @type="application/atom+xml"]"#).unwrap();
        let node = expr.node(entry(&doc)).unwrap();
        assert_eq!(node.attribute("href"), Some("https://example.com/self"));

        let miss =
            Expr::parse(r#"atom:link[@rel="edit" and @type="application/atom+xml"]"#).unwrap();
        assert!(miss.node(entry(&doc)).is_none());
    }

    #[test]
    fn test_nested_child_predicate() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let expr = Expr::parse(
            r#"app:collection[atom:category[@term="recommend" and @scheme="http://www.ibm.com/xmlns/prod/sn/collection"]]"#,
        )
        .unwrap();
        let node = expr.node(entry(&doc)).unwrap();
        assert_eq!(node.attribute("href"), Some("https://example.com/recs"));

        let miss = Expr::parse(
            r#"app:collection[atom:category[@term="comments" and @scheme="http://www.ibm.com/xmlns/prod/sn/collection"]]"#,
        )
        .unwrap();
        assert!(miss.node(entry(&doc)).is_none());
    }

    #[test]
    fn test_absolute_path_from_any_context() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
            <entry><id>a</id></entry>
            <entry><id>b</id></entry>
        </feed>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let entries = Expr::parse("/atom:feed/atom:entry").unwrap();

        let from_root = entries.nodes(doc.root());
        assert_eq!(from_root.len(), 2);

        // Context node is ignored for absolute paths.
        let from_entry = entries.nodes(from_root[0]);
        assert_eq!(from_entry.len(), 2);
    }

    #[test]
    fn test_document_order_preserved() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
            <entry><title>first</title></entry>
            <entry><title>second</title></entry>
            <entry><title>third</title></entry>
        </feed>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let entries = Expr::parse("/atom:feed/atom:entry").unwrap();
        let title = Expr::parse("string(atom:title/text())").unwrap();

        let titles: Vec<String> = entries
            .nodes(doc.root())
            .into_iter()
            .map(|n| title.string(n))
            .collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn test_unknown_prefix_rejected() {
        let err = Expr::parse("string(dc:creator/text())").unwrap_err();
        assert_eq!(err, ExprError::UnknownPrefix("dc".to_string()));
    }

    #[test]
    fn test_non_final_leaf_step_rejected() {
        let err = Expr::parse("string(atom:title/text()/atom:x)").unwrap_err();
        assert_eq!(err, ExprError::NonFinalStep);
    }

    #[test]
    fn test_trailing_input_rejected() {
        assert!(matches!(
            Expr::parse("atom:title)"),
            Err(ExprError::TrailingInput(_))
        ));
    }

    #[test]
    fn test_xpath_number_conversion() {
        assert_eq!(xpath_number("15"), 15.0);
        assert_eq!(xpath_number("  42 "), 42.0);
        assert_eq!(xpath_number("-3.5"), -3.5);
        assert_eq!(xpath_number(".5"), 0.5);
        assert_eq!(xpath_number("5."), 5.0);
        assert!(xpath_number("").is_nan());
        assert!(xpath_number("abc").is_nan());
        assert!(xpath_number("+5").is_nan());
        assert!(xpath_number("1e3").is_nan());
        assert!(xpath_number("1.2.3").is_nan());
    }

    proptest! {
        #[test]
        fn prop_integer_strings_convert_exactly(n in 0u32..1_000_000u32) {
            prop_assert_eq!(xpath_number(&n.to_string()), f64::from(n));
        }

        #[test]
        fn prop_conversion_never_panics(s in "\\PC*") {
            let _ = xpath_number(&s);
        }
    }
}
