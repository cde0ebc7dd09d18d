//! XSD attribute declarations
//!
//! This module implements attribute declarations, attribute uses
//! and attribute groups.

use std::fmt;

use super::base::{Form, SourceInfo, TypeRef, ValueConstraint, ValueConstraintKind};
use super::wildcards::Wildcard;
use crate::namespaces::QName;

/// Attribute use mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeUseKind {
    /// Attribute is optional (default)
    #[default]
    Optional,
    /// Attribute is required
    Required,
    /// Attribute is prohibited
    Prohibited,
}

impl AttributeUseKind {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "optional" => Some(AttributeUseKind::Optional),
            "required" => Some(AttributeUseKind::Required),
            "prohibited" => Some(AttributeUseKind::Prohibited),
            _ => None,
        }
    }

    /// Get the use as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeUseKind::Optional => "optional",
            AttributeUseKind::Required => "required",
            AttributeUseKind::Prohibited => "prohibited",
        }
    }
}

impl fmt::Display for AttributeUseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attribute declaration, attribute use or attribute reference
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDecl {
    /// Attribute name; the referenced name for references
    pub name: QName,
    /// Simple type of the attribute
    pub type_ref: TypeRef,
    /// Use mode, always optional for global declarations
    pub use_kind: AttributeUseKind,
    /// Effective form of the name
    pub form: Form,
    /// `default` or `fixed` value
    pub value_constraint: Option<ValueConstraint>,
    /// Whether this is a `ref` to a global declaration
    pub is_reference: bool,
    /// Whether this is a top-level declaration
    pub is_global: bool,
    /// Target namespace of the declaring document
    pub source_namespace: String,
    /// Declaration site
    pub source: SourceInfo,
}

impl AttributeDecl {
    /// Create an optional attribute of type xs:anySimpleType
    pub fn new(name: QName) -> Self {
        Self {
            source_namespace: name.namespace.clone(),
            name,
            type_ref: TypeRef::any_simple_type(),
            use_kind: AttributeUseKind::Optional,
            form: Form::Unqualified,
            value_constraint: None,
            is_reference: false,
            is_global: false,
            source: SourceInfo::default(),
        }
    }

    /// Create a reference to the global attribute `name`
    pub fn reference(name: QName) -> Self {
        Self {
            type_ref: TypeRef::OfAttribute(name.clone()),
            is_reference: true,
            ..Self::new(name)
        }
    }

    /// Default value, if any
    pub fn default_value(&self) -> Option<&str> {
        self.value_constraint
            .as_ref()
            .filter(|vc| vc.kind == ValueConstraintKind::Default)
            .map(|vc| vc.lexical.as_str())
    }

    /// Fixed value, if any
    pub fn fixed_value(&self) -> Option<&str> {
        self.value_constraint
            .as_ref()
            .filter(|vc| vc.is_fixed())
            .map(|vc| vc.lexical.as_str())
    }

    /// Check if the attribute is required
    pub fn is_required(&self) -> bool {
        self.use_kind == AttributeUseKind::Required
    }

    /// Check if the attribute is prohibited
    pub fn is_prohibited(&self) -> bool {
        self.use_kind == AttributeUseKind::Prohibited
    }
}

/// Attribute uses of a complex type or attribute group after group expansion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveAttributes {
    /// Attribute uses in declaration order, prohibited uses removed
    pub attributes: Vec<AttributeDecl>,
    /// Attribute wildcard
    pub wildcard: Option<Wildcard>,
}

impl EffectiveAttributes {
    /// Find an attribute use by name
    pub fn get(&self, name: &QName) -> Option<&AttributeDecl> {
        self.attributes.iter().find(|a| &a.name == name)
    }

    /// Number of attribute uses
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if there are no attribute uses
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// A named attribute group definition
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeGroup {
    /// Group name
    pub name: QName,
    /// Attribute uses declared directly in the group
    pub attributes: Vec<AttributeDecl>,
    /// Referenced attribute groups, in document order
    pub attribute_groups: Vec<QName>,
    /// Attribute wildcard declared directly in the group
    pub any_attribute: Option<Wildcard>,
    /// Target namespace of the declaring document
    pub source_namespace: String,
    /// Declaration site
    pub source: SourceInfo,
    /// Expanded attribute uses, once resolved
    pub effective: Option<EffectiveAttributes>,
}

impl AttributeGroup {
    /// Create an empty attribute group
    pub fn new(name: QName) -> Self {
        Self {
            source_namespace: name.namespace.clone(),
            name,
            attributes: Vec::new(),
            attribute_groups: Vec::new(),
            any_attribute: None,
            source: SourceInfo::default(),
            effective: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_use() {
        assert_eq!(AttributeUseKind::from_str("required"), Some(AttributeUseKind::Required));
        assert_eq!(AttributeUseKind::from_str("Required"), None);
        assert_eq!(AttributeUseKind::default().to_string(), "optional");
    }

    #[test]
    fn test_attribute_reference() {
        let attr = AttributeDecl::reference(QName::new("urn:t", "lang"));
        assert!(attr.is_reference);
        assert_eq!(attr.type_ref, TypeRef::OfAttribute(QName::new("urn:t", "lang")));
        assert!(!attr.is_required());
    }

    #[test]
    fn test_effective_lookup() {
        let mut effective = EffectiveAttributes::default();
        effective.attributes.push(AttributeDecl::new(QName::local("a")));
        assert!(effective.get(&QName::local("a")).is_some());
        assert!(effective.get(&QName::local("b")).is_none());
        assert_eq!(effective.len(), 1);
    }
}
