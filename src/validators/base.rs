//! Shared schema component pieces
//!
//! Source information, forms, derivation sets, type references and value
//! constraints used by every kind of schema component.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::complex_types::ComplexType;
use super::simple_types::SimpleType;
use super::values::Value;
use crate::error::Diagnostic;
use crate::names::split_xml_whitespace;
use crate::namespaces::{NamespaceContext, QName};

/// Where a component was declared
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    /// Location of the schema document
    pub document: Option<Arc<str>>,
    /// XSD component path, e.g. `/schema/complexType[@name='T']/sequence`
    pub path: String,
    /// 1-based line of the component's start tag
    pub line: usize,
    /// 1-based column of the component's start tag
    pub column: usize,
}

impl SourceInfo {
    /// Create source info for a component path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Attach this source to a diagnostic
    pub fn annotate(&self, diagnostic: Diagnostic) -> Diagnostic {
        let mut diagnostic = diagnostic.with_path(self.path.clone());
        if self.line > 0 {
            diagnostic = diagnostic.with_position(self.line, self.column);
        }
        diagnostic.or_document(self.document.as_deref())
    }
}

/// Form of a local element or attribute name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Form {
    /// Unqualified (default)
    #[default]
    Unqualified,
    /// Qualified
    Qualified,
}

impl Form {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "qualified" => Some(Self::Qualified),
            "unqualified" => Some(Self::Unqualified),
            _ => None,
        }
    }

    /// Check if qualified
    pub fn is_qualified(&self) -> bool {
        matches!(self, Self::Qualified)
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qualified => write!(f, "qualified"),
            Self::Unqualified => write!(f, "unqualified"),
        }
    }
}

/// A derivation or substitution method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivationMethod {
    /// Derivation by extension
    Extension,
    /// Derivation by restriction
    Restriction,
    /// Substitution group membership (`block` and `final` on elements)
    Substitution,
    /// List construction from an item type
    List,
    /// Union construction from member types
    Union,
}

impl DerivationMethod {
    /// Token used in derivation set attributes
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extension => "extension",
            Self::Restriction => "restriction",
            Self::Substitution => "substitution",
            Self::List => "list",
            Self::Union => "union",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "extension" => Some(Self::Extension),
            "restriction" => Some(Self::Restriction),
            "substitution" => Some(Self::Substitution),
            "list" => Some(Self::List),
            "union" => Some(Self::Union),
            _ => None,
        }
    }
}

impl fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Methods allowed in `final` of simple types
pub const SIMPLE_FINAL: &[DerivationMethod] = &[
    DerivationMethod::Restriction,
    DerivationMethod::List,
    DerivationMethod::Union,
];

/// Methods allowed in `block`/`final` of complex types and `final` of elements
pub const COMPLEX_DERIVATION: &[DerivationMethod] =
    &[DerivationMethod::Extension, DerivationMethod::Restriction];

/// Methods allowed in `block` of elements and `blockDefault`
pub const ELEMENT_BLOCK: &[DerivationMethod] = &[
    DerivationMethod::Extension,
    DerivationMethod::Restriction,
    DerivationMethod::Substitution,
];

/// Methods allowed in `finalDefault`
pub const FINAL_DEFAULT: &[DerivationMethod] = &[
    DerivationMethod::Extension,
    DerivationMethod::Restriction,
    DerivationMethod::List,
    DerivationMethod::Union,
];

/// Derivation method flags for block, final, blockDefault and finalDefault
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DerivationSet {
    /// Block/final extension derivation
    pub extension: bool,
    /// Block/final restriction derivation
    pub restriction: bool,
    /// Block substitution (elements only)
    pub substitution: bool,
    /// Final list derivation (simple types only)
    pub list: bool,
    /// Final union derivation (simple types only)
    pub union: bool,
}

impl DerivationSet {
    /// Create with the given methods set
    pub fn of(methods: &[DerivationMethod]) -> Self {
        let mut set = Self::default();
        for method in methods {
            set.insert(*method);
        }
        set
    }

    /// Parse from attribute value
    ///
    /// `#all` expands to `allowed` and cannot be combined with other tokens;
    /// every other token must be one of `allowed`.
    pub fn parse(value: &str, allowed: &[DerivationMethod]) -> Result<Self, String> {
        let tokens: Vec<&str> = split_xml_whitespace(value).collect();
        if tokens.contains(&"#all") {
            if tokens.len() > 1 {
                return Err(format!(
                    "derivation set cannot combine '#all' with other values: '{}'",
                    value
                ));
            }
            return Ok(Self::of(allowed));
        }

        let mut result = Self::default();
        for token in tokens {
            match DerivationMethod::from_token(token) {
                Some(method) if allowed.contains(&method) => result.insert(method),
                _ => {
                    let expected: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
                    return Err(format!(
                        "invalid derivation set token '{}', expected '#all' or a list of {}",
                        token,
                        expected.join("|")
                    ));
                }
            }
        }
        Ok(result)
    }

    /// Set a method
    pub fn insert(&mut self, method: DerivationMethod) {
        match method {
            DerivationMethod::Extension => self.extension = true,
            DerivationMethod::Restriction => self.restriction = true,
            DerivationMethod::Substitution => self.substitution = true,
            DerivationMethod::List => self.list = true,
            DerivationMethod::Union => self.union = true,
        }
    }

    /// Whether a method is in the set
    pub fn contains(&self, method: DerivationMethod) -> bool {
        match method {
            DerivationMethod::Extension => self.extension,
            DerivationMethod::Restriction => self.restriction,
            DerivationMethod::Substitution => self.substitution,
            DerivationMethod::List => self.list,
            DerivationMethod::Union => self.union,
        }
    }

    /// Keep only the methods applicable to a component kind
    pub fn mask(&self, applicable: &[DerivationMethod]) -> Self {
        let mut result = Self::default();
        for method in applicable {
            if self.contains(*method) {
                result.insert(*method);
            }
        }
        result
    }

    /// Check if any flag is set
    pub fn is_empty(&self) -> bool {
        !self.extension && !self.restriction && !self.substitution && !self.list && !self.union
    }
}

impl fmt::Display for DerivationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let all = [
            DerivationMethod::Extension,
            DerivationMethod::Restriction,
            DerivationMethod::Substitution,
            DerivationMethod::List,
            DerivationMethod::Union,
        ];
        let tokens: Vec<&str> = all
            .iter()
            .filter(|m| self.contains(**m))
            .map(|m| m.as_str())
            .collect();
        f.write_str(&tokens.join(" "))
    }
}

/// Reference from a declaration or derivation to a type definition
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// Named reference not yet looked up
    Placeholder(QName),
    /// Type taken from another declaration, decided during resolution
    Inferred,
    /// Resolved reference to a global or built-in type
    Named(QName),
    /// The type of the global element with this name
    OfElement(QName),
    /// The type of the global attribute with this name
    OfAttribute(QName),
    /// Anonymous simple type owned by the referrer
    Simple(Box<SimpleType>),
    /// Anonymous complex type owned by the referrer
    Complex(Box<ComplexType>),
}

impl TypeRef {
    /// Reference to xs:anyType
    pub fn any_type() -> Self {
        TypeRef::Named(QName::xsd("anyType"))
    }

    /// Reference to xs:anySimpleType
    pub fn any_simple_type() -> Self {
        TypeRef::Named(QName::xsd("anySimpleType"))
    }

    /// Whether the reference still awaits resolution
    pub fn is_placeholder(&self) -> bool {
        matches!(self, TypeRef::Placeholder(_) | TypeRef::Inferred)
    }

    /// Referenced name, for named references
    pub fn name(&self) -> Option<&QName> {
        match self {
            TypeRef::Placeholder(q) | TypeRef::Named(q) => Some(q),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Placeholder(q) => write!(f, "unresolved {}", q),
            TypeRef::Inferred => write!(f, "inferred"),
            TypeRef::Named(q) => write!(f, "{}", q),
            TypeRef::OfElement(q) => write!(f, "type of element {}", q),
            TypeRef::OfAttribute(q) => write!(f, "type of attribute {}", q),
            TypeRef::Simple(_) => write!(f, "anonymous simpleType"),
            TypeRef::Complex(_) => write!(f, "anonymous complexType"),
        }
    }
}

/// Whether a value constraint is a default or a fixed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueConstraintKind {
    /// `default` attribute
    Default,
    /// `fixed` attribute
    Fixed,
}

/// `default` or `fixed` value of an element or attribute
#[derive(Debug, Clone, PartialEq)]
pub struct ValueConstraint {
    /// Default or fixed
    pub kind: ValueConstraintKind,
    /// Literal as written
    pub lexical: String,
    /// Prefix bindings in scope where the value was written
    pub namespaces: Arc<NamespaceContext>,
    /// Value in the declaration type's value space, once resolved
    pub value: Option<Value>,
}

impl ValueConstraint {
    /// Create an unresolved value constraint
    pub fn new(
        kind: ValueConstraintKind,
        lexical: impl Into<String>,
        namespaces: Arc<NamespaceContext>,
    ) -> Self {
        Self {
            kind,
            lexical: lexical.into(),
            namespaces,
            value: None,
        }
    }

    /// Whether this is a fixed value
    pub fn is_fixed(&self) -> bool {
        self.kind == ValueConstraintKind::Fixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_derivation_set_all() {
        let set = DerivationSet::parse("#all", COMPLEX_DERIVATION).unwrap();
        assert!(set.extension && set.restriction);
        assert!(!set.substitution);
        assert_eq!(set.to_string(), "extension restriction");
    }

    #[test]
    fn test_derivation_set_tokens() {
        let set = DerivationSet::parse(" list\tunion ", SIMPLE_FINAL).unwrap();
        assert!(set.list && set.union && !set.restriction);
        assert!(DerivationSet::parse("", SIMPLE_FINAL).unwrap().is_empty());
        assert!(DerivationSet::parse("extension", SIMPLE_FINAL).is_err());
        assert!(DerivationSet::parse("\u{a0}list", SIMPLE_FINAL).is_err());
    }

    #[test]
    fn test_derivation_set_all_conflict() {
        let err = DerivationSet::parse("#all extension", ELEMENT_BLOCK).unwrap_err();
        assert!(err.contains("derivation set cannot combine '#all' with other values"));
    }

    #[test]
    fn test_mask() {
        let set = DerivationSet::parse("#all", ELEMENT_BLOCK).unwrap();
        let masked = set.mask(COMPLEX_DERIVATION);
        assert!(masked.extension && masked.restriction && !masked.substitution);
    }

    #[test]
    fn test_form() {
        assert_eq!(Form::from_str("qualified"), Some(Form::Qualified));
        assert_eq!(Form::from_str("Qualified"), None);
        assert!(!Form::default().is_qualified());
    }

    #[test]
    fn test_type_ref_placeholder() {
        assert!(TypeRef::Placeholder(QName::local("T")).is_placeholder());
        assert!(TypeRef::Inferred.is_placeholder());
        assert!(!TypeRef::any_type().is_placeholder());
    }

    proptest! {
        #[test]
        fn prop_all_with_any_other_token_is_rejected(
            tokens in proptest::collection::vec(
                prop_oneof![Just("extension"), Just("restriction"), Just("substitution")],
                1..4,
            ),
            position in 0usize..4,
        ) {
            let mut tokens: Vec<&str> = tokens;
            let position = position.min(tokens.len());
            tokens.insert(position, "#all");
            let value = tokens.join(" ");
            prop_assert!(DerivationSet::parse(&value, ELEMENT_BLOCK).is_err());
        }
    }
}
