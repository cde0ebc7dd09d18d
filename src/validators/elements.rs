//! XSD Element declarations
//!
//! This module implements element declarations for XSD schemas.
//! Elements are the primary building blocks of XML documents.
//!
//! Global declarations live in the schema set's element table. Local
//! declarations and element references are owned by the particle that
//! introduced them; a reference keeps the referenced name and takes its
//! type from the global declaration.

use super::base::{DerivationSet, Form, SourceInfo, TypeRef, ValueConstraint, ValueConstraintKind};
use super::particles::Occurs;
use crate::namespaces::QName;

/// An element declaration or element reference
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDecl {
    /// Element name; the referenced name for references
    pub name: QName,
    /// Type definition of the element
    pub type_ref: TypeRef,
    /// Whether the type was given by a `type` attribute or inline type
    pub type_explicit: bool,
    /// Effective form of the name
    pub form: Form,
    /// Occurrence bounds, always `[1..1]` for global declarations
    pub occurs: Occurs,
    /// Whether `xsi:nil` is allowed
    pub nillable: bool,
    /// Whether the element is abstract
    pub is_abstract: bool,
    /// `default` or `fixed` value
    pub value_constraint: Option<ValueConstraint>,
    /// Blocked derivations and substitutions
    pub block: DerivationSet,
    /// Derivations excluded from substitution group membership
    pub final_set: DerivationSet,
    /// Head of the substitution group this element belongs to
    pub substitution_group: Option<QName>,
    /// Whether this is a `ref` to a global declaration
    pub is_reference: bool,
    /// Whether this is a top-level declaration
    pub is_global: bool,
    /// Names of the identity constraints defined on the element
    pub constraints: Vec<QName>,
    /// Target namespace of the declaring document
    pub source_namespace: String,
    /// Declaration site
    pub source: SourceInfo,
}

impl ElementDecl {
    /// Create a local element declaration of type xs:anyType
    pub fn new(name: QName) -> Self {
        Self {
            source_namespace: name.namespace.clone(),
            name,
            type_ref: TypeRef::any_type(),
            type_explicit: false,
            form: Form::Unqualified,
            occurs: Occurs::once(),
            nillable: false,
            is_abstract: false,
            value_constraint: None,
            block: DerivationSet::default(),
            final_set: DerivationSet::default(),
            substitution_group: None,
            is_reference: false,
            is_global: false,
            constraints: Vec::new(),
            source: SourceInfo::default(),
        }
    }

    /// Create a reference to the global element `name`
    pub fn reference(name: QName, occurs: Occurs) -> Self {
        Self {
            type_ref: TypeRef::OfElement(name.clone()),
            is_reference: true,
            occurs,
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

    /// Whether substitution group members may replace this element
    pub fn is_substitutable(&self) -> bool {
        !self.block.substitution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::NamespaceContext;
    use std::sync::Arc;

    #[test]
    fn test_new_element() {
        let decl = ElementDecl::new(QName::new("urn:t", "root"));
        assert_eq!(decl.type_ref, TypeRef::any_type());
        assert_eq!(decl.occurs, Occurs::once());
        assert_eq!(decl.source_namespace, "urn:t");
        assert!(!decl.is_reference);
    }

    #[test]
    fn test_reference() {
        let decl = ElementDecl::reference(QName::new("urn:t", "item"), Occurs::zero_or_more());
        assert!(decl.is_reference);
        assert_eq!(decl.type_ref, TypeRef::OfElement(QName::new("urn:t", "item")));
        assert_eq!(decl.occurs.max, None);
    }

    #[test]
    fn test_value_constraint_accessors() {
        let mut decl = ElementDecl::new(QName::local("size"));
        decl.value_constraint = Some(ValueConstraint::new(
            ValueConstraintKind::Fixed,
            "10",
            Arc::new(NamespaceContext::new()),
        ));
        assert_eq!(decl.fixed_value(), Some("10"));
        assert_eq!(decl.default_value(), None);
    }
}
