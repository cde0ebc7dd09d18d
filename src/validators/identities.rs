//! XSD Identity Constraints
//!
//! This module implements identity constraint definitions:
//! - xs:unique - Ensures values are unique within scope
//! - xs:key - Like unique, but all field values must be present
//! - xs:keyref - References a key/unique constraint (foreign key)
//!
//! Selector and field expressions are parsed when the constraint is read,
//! against the prefix bindings in scope on the constraint element.

use std::fmt;
use std::sync::Arc;

use super::base::SourceInfo;
use crate::namespaces::{NamespaceContext, QName};
use crate::xpath::{IdentityXPathParser, ParsedXPath, XPathParseError};

/// Kind of identity constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityConstraintKind {
    /// xs:unique
    Unique,
    /// xs:key
    Key,
    /// xs:keyref
    KeyRef,
}

impl IdentityConstraintKind {
    /// Parse from element local name
    pub fn from_local_name(tag: &str) -> Option<Self> {
        match tag {
            "unique" => Some(Self::Unique),
            "key" => Some(Self::Key),
            "keyref" => Some(Self::KeyRef),
            _ => None,
        }
    }
}

impl fmt::Display for IdentityConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unique => write!(f, "unique"),
            Self::Key => write!(f, "key"),
            Self::KeyRef => write!(f, "keyref"),
        }
    }
}

/// Selector or field XPath as written, with its parsed form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityXPath {
    /// Expression as written
    pub xpath: String,
    /// Parsed expression
    pub parsed: ParsedXPath,
}

impl IdentityXPath {
    /// Parse a selector expression
    pub fn selector(xpath: &str, namespaces: &NamespaceContext) -> Result<Self, XPathParseError> {
        Ok(Self {
            xpath: xpath.to_string(),
            parsed: IdentityXPathParser::new().parse(xpath, namespaces)?,
        })
    }

    /// Parse a field expression
    pub fn field(xpath: &str, namespaces: &NamespaceContext) -> Result<Self, XPathParseError> {
        Ok(Self {
            xpath: xpath.to_string(),
            parsed: IdentityXPathParser::for_field().parse(xpath, namespaces)?,
        })
    }
}

/// An identity constraint definition
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityConstraint {
    /// Constraint name in the target namespace
    pub name: QName,
    /// Kind of constraint
    pub kind: IdentityConstraintKind,
    /// Selector expression
    pub selector: IdentityXPath,
    /// Field expressions, at least one
    pub fields: Vec<IdentityXPath>,
    /// Referenced key or unique, keyref only
    pub refer: Option<QName>,
    /// Prefix bindings in scope on the constraint element
    pub namespaces: Arc<NamespaceContext>,
    /// Element declaring the constraint
    pub element: QName,
    /// Declaration site
    pub source: SourceInfo,
}

impl IdentityConstraint {
    /// Target namespace of the constraint
    pub fn target_namespace(&self) -> &str {
        &self.name.namespace
    }

    /// Check if this is a key constraint
    pub fn is_key(&self) -> bool {
        self.kind == IdentityConstraintKind::Key
    }

    /// Check if this is a keyref constraint
    pub fn is_keyref(&self) -> bool {
        self.kind == IdentityConstraintKind::KeyRef
    }

    /// Whether a keyref may refer to this constraint
    pub fn is_referenceable(&self) -> bool {
        !self.is_keyref()
    }
}
