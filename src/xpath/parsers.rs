//! XPath Parsers for identity constraints
//!
//! `xs:selector` and `xs:field` use a restricted XPath subset:
//!
//! ```text
//! Selector ::= Path ( '|' Path )*
//! Path     ::= ('.//')? Step ( '/' Step )*
//! Field    ::= Path ( '|' Path )*, whose last step may be '@' NameTest
//! Step     ::= '.' | ('child::')? NameTest
//! NameTest ::= QName | '*' | NCName ':' '*'
//! ```
//!
//! Prefixes are resolved while parsing against the namespace context
//! captured on the constraint. Unprefixed names are in no namespace.

use std::fmt;

use thiserror::Error;

use crate::names::{is_name_char, is_name_start_char};
use crate::namespaces::{NamespaceContext, QName};

/// XPath axis types allowed in the subset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XPathAxis {
    /// child:: axis (default)
    Child,
    /// self:: axis, written `.`
    SelfAxis,
    /// attribute:: axis, fields only
    Attribute,
}

impl fmt::Display for XPathAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Child => "child",
            Self::SelfAxis => "self",
            Self::Attribute => "attribute",
        };
        write!(f, "{}", s)
    }
}

/// Node test in an XPath step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// Name test with the prefix resolved
    Name(QName),
    /// Wildcard test (*)
    Wildcard,
    /// Namespace wildcard (prefix:*), holding the resolved namespace
    NamespaceWildcard(String),
    /// The context node itself, for `.`
    Node,
}

impl NodeTest {
    /// Check if this test matches any node of its axis
    pub fn matches_any(&self) -> bool {
        matches!(self, Self::Wildcard | Self::Node)
    }

    /// Check if the test matches a name
    pub fn matches(&self, name: &QName) -> bool {
        match self {
            Self::Name(n) => n == name,
            Self::Wildcard | Self::Node => true,
            Self::NamespaceWildcard(ns) => &name.namespace == ns,
        }
    }
}

/// A parsed step in a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStep {
    /// The axis
    pub axis: XPathAxis,
    /// The node test
    pub node_test: NodeTest,
}

/// One `|`-separated alternative
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    /// Whether the path starts with `.//`
    pub descendant: bool,
    /// Steps in order
    pub steps: Vec<ParsedStep>,
}

impl ParsedPath {
    /// Whether the path selects an attribute
    pub fn is_attribute(&self) -> bool {
        self.steps
            .last()
            .map_or(false, |s| s.axis == XPathAxis::Attribute)
    }
}

/// Parsed XPath expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedXPath {
    /// Original expression
    pub expression: String,
    /// Alternatives in order
    pub paths: Vec<ParsedPath>,
}

impl ParsedXPath {
    /// Get the number of alternatives
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }
}

/// XPath parse error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XPathParseError {
    /// Prefix not bound in the captured context
    #[error("undefined namespace prefix '{0}' in XPath expression")]
    UndefinedPrefix(String),
    /// Invalid syntax
    #[error("invalid XPath expression '{expression}': {message}")]
    InvalidSyntax {
        /// The whole expression
        expression: String,
        /// What went wrong
        message: String,
    },
}

struct Cursor<'a> {
    expression: &'a str,
    chars: Vec<char>,
    pos: usize,
    namespaces: &'a NamespaceContext,
}

impl<'a> Cursor<'a> {
    fn error(&self, message: impl Into<String>) -> XPathParseError {
        XPathParseError::InvalidSyntax {
            expression: self.expression.to_string(),
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, literal: &str) -> bool {
        let len = literal.chars().count();
        let matches = literal
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c));
        if matches {
            self.pos += len;
        }
        matches
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn ncname(&mut self) -> Option<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c != ':' && is_name_start_char(c) => self.pos += 1,
            _ => return None,
        }
        while matches!(self.peek(), Some(c) if c != ':' && is_name_char(c)) {
            self.pos += 1;
        }
        Some(self.chars[start..self.pos].iter().collect())
    }

    fn name_test(&mut self) -> Result<NodeTest, XPathParseError> {
        self.skip_whitespace();
        if self.eat("*") {
            return Ok(NodeTest::Wildcard);
        }
        let first = self
            .ncname()
            .ok_or_else(|| self.error("expected a name test"))?;
        if self.peek() == Some(':') {
            self.pos += 1;
            let namespace = self
                .namespaces
                .get_namespace(&first)
                .ok_or_else(|| XPathParseError::UndefinedPrefix(first.clone()))?
                .to_string();
            if self.eat("*") {
                return Ok(NodeTest::NamespaceWildcard(namespace));
            }
            let local = self
                .ncname()
                .ok_or_else(|| self.error("expected a local name after the prefix"))?;
            return Ok(NodeTest::Name(QName::new(namespace, local)));
        }
        Ok(NodeTest::Name(QName::local(first)))
    }

    fn step(&mut self) -> Result<ParsedStep, XPathParseError> {
        self.skip_whitespace();
        if self.peek() == Some('.') {
            if self.peek_at(1) == Some('.') {
                return Err(self.error("the parent axis is not allowed"));
            }
            self.pos += 1;
            return Ok(ParsedStep {
                axis: XPathAxis::SelfAxis,
                node_test: NodeTest::Node,
            });
        }
        let axis = if self.eat("@") || self.eat("attribute::") {
            XPathAxis::Attribute
        } else {
            self.eat("child::");
            XPathAxis::Child
        };
        Ok(ParsedStep {
            axis,
            node_test: self.name_test()?,
        })
    }

    fn path(&mut self, allow_attribute: bool) -> Result<ParsedPath, XPathParseError> {
        self.skip_whitespace();
        let descendant = self.eat(".//");
        let mut steps = Vec::new();
        loop {
            let step = self.step()?;
            if step.axis == XPathAxis::Attribute && !allow_attribute {
                return Err(self.error("the attribute axis is not allowed in a selector"));
            }
            let is_attribute = step.axis == XPathAxis::Attribute;
            steps.push(step);
            self.skip_whitespace();
            if self.peek() == Some('/') {
                if self.peek_at(1) == Some('/') {
                    return Err(self.error("'//' is only allowed at the start of a path as './/'"));
                }
                if is_attribute {
                    return Err(self.error("an attribute step must be the last step"));
                }
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(ParsedPath { descendant, steps })
    }
}

/// Parser for identity constraint XPath (xs:selector, xs:field)
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityXPathParser {
    /// Whether to allow a final attribute step
    allow_attributes: bool,
}

impl IdentityXPathParser {
    /// Create a new parser for selector expressions
    pub fn new() -> Self {
        Self {
            allow_attributes: false,
        }
    }

    /// Create a parser for field expressions (allows attributes)
    pub fn for_field() -> Self {
        Self {
            allow_attributes: true,
        }
    }

    /// Parse an identity constraint XPath expression
    pub fn parse(
        &self,
        xpath: &str,
        namespaces: &NamespaceContext,
    ) -> Result<ParsedXPath, XPathParseError> {
        let mut cursor = Cursor {
            expression: xpath,
            chars: xpath.chars().collect(),
            pos: 0,
            namespaces,
        };
        cursor.skip_whitespace();
        if cursor.at_end() {
            return Err(cursor.error("the expression is empty"));
        }
        let mut paths = Vec::new();
        loop {
            paths.push(cursor.path(self.allow_attributes)?);
            cursor.skip_whitespace();
            if !cursor.eat("|") {
                break;
            }
        }
        if !cursor.at_end() {
            let rest: String = cursor.chars[cursor.pos..].iter().collect();
            return Err(cursor.error(format!("unexpected '{}'", rest)));
        }
        Ok(ParsedXPath {
            expression: xpath.to_string(),
            paths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> NamespaceContext {
        let mut ns = NamespaceContext::new();
        ns.add_prefix("t", "urn:t");
        ns
    }

    #[test]
    fn test_selector_paths() {
        let parsed = IdentityXPathParser::new().parse(".//t:item | t:a/*", &ctx()).unwrap();
        assert_eq!(parsed.path_count(), 2);
        assert!(parsed.paths[0].descendant);
        assert_eq!(
            parsed.paths[0].steps[0].node_test,
            NodeTest::Name(QName::new("urn:t", "item"))
        );
        assert_eq!(parsed.paths[1].steps.len(), 2);
        assert_eq!(parsed.paths[1].steps[1].node_test, NodeTest::Wildcard);
    }

    #[test]
    fn test_self_and_child_axis() {
        let parsed = IdentityXPathParser::new().parse("./child::a", &ctx()).unwrap();
        assert_eq!(parsed.paths[0].steps[0].axis, XPathAxis::SelfAxis);
        assert_eq!(parsed.paths[0].steps[1].axis, XPathAxis::Child);
        assert_eq!(
            parsed.paths[0].steps[1].node_test,
            NodeTest::Name(QName::local("a"))
        );
    }

    #[test]
    fn test_field_attribute() {
        let parser = IdentityXPathParser::for_field();
        let parsed = parser.parse("t:a/@id", &ctx()).unwrap();
        assert!(parsed.paths[0].is_attribute());
        assert!(parser.parse("@t:*", &ctx()).is_ok());
        assert!(parser.parse("@id/a", &ctx()).is_err());
    }

    #[test]
    fn test_selector_rejects_attribute() {
        assert!(IdentityXPathParser::new().parse("@id", &ctx()).is_err());
    }

    #[test]
    fn test_invalid_expressions() {
        let parser = IdentityXPathParser::new();
        assert!(parser.parse("", &ctx()).is_err());
        assert!(parser.parse("a//b", &ctx()).is_err());
        assert!(parser.parse("../a", &ctx()).is_err());
        assert!(parser.parse("a[1]", &ctx()).is_err());
        assert!(parser.parse("/a", &ctx()).is_err());
        assert_eq!(
            parser.parse("x:a", &ctx()),
            Err(XPathParseError::UndefinedPrefix("x".to_string()))
        );
    }

    #[test]
    fn test_node_test_matching() {
        let name = QName::new("urn:t", "a");
        assert!(NodeTest::NamespaceWildcard("urn:t".into()).matches(&name));
        assert!(!NodeTest::Name(QName::local("a")).matches(&name));
        assert!(NodeTest::Wildcard.matches_any());
    }
}
