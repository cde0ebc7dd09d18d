//! XSD Simple Type definitions
//!
//! This module implements XSD simple types in two layers:
//! - [`SimpleType`]: the symbolic definition as parsed, with its derivation
//!   step (restriction, list or union) referring to other types by name
//! - [`SimpleTypeInfo`]: the resolved form computed by folding the
//!   derivation chain, carrying the variety, primitive and effective facets
//!
//! See: https://www.w3.org/TR/xmlschema-2/

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::base::{DerivationSet, SourceInfo, TypeRef};
use super::builtins::{
    builtin_derives_from, get_builtin_type, BuiltinType, BuiltinVariety, Primitive,
    BUILTIN_TYPES, LIST_FACETS, UNION_FACETS, XSD_ANY_SIMPLE_TYPE, XSD_ID,
};
use super::facets::{Facet, FacetKind, FacetSet, FacetValue, WhiteSpace};
use super::values::Value;
use crate::error::Diagnostic;
use crate::names::split_xml_whitespace;
use crate::namespaces::{NamespaceContext, QName};

// =============================================================================
// Simple Type Variety
// =============================================================================

/// Variety of a simple type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variety {
    /// Atomic type (single value)
    Atomic,
    /// List type (whitespace-separated values)
    List,
    /// Union type (value matches one of several types)
    Union,
}

impl fmt::Display for Variety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variety::Atomic => write!(f, "atomic"),
            Variety::List => write!(f, "list"),
            Variety::Union => write!(f, "union"),
        }
    }
}

// =============================================================================
// Symbolic Definition
// =============================================================================

/// The derivation step of a simple type
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleDerivation {
    /// Restriction of a base type by facets in source order
    Restriction {
        /// Base type, by name or inline
        base: TypeRef,
        /// Facets of this step
        facets: Vec<Facet>,
    },
    /// List of an item type
    List {
        /// Item type, by name or inline
        item: TypeRef,
        /// Facets of an embedded `restriction`, applied to the whole list
        facets: Vec<Facet>,
    },
    /// Union of member types
    Union {
        /// `memberTypes` names first, then inline members in document order
        members: Vec<TypeRef>,
    },
}

/// A simple type definition
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleType {
    /// Type name, `None` for anonymous types
    pub name: Option<QName>,
    /// Derivation step
    pub derivation: SimpleDerivation,
    /// Derivations forbidden on this type
    pub final_set: DerivationSet,
    /// Explicit whiteSpace facet value of this step
    pub white_space: Option<WhiteSpace>,
    /// Target namespace of the declaring document
    pub source_namespace: String,
    /// Declaration site
    pub source: SourceInfo,
    /// Resolved form, filled in by the resolver
    pub info: Option<Arc<SimpleTypeInfo>>,
}

impl SimpleType {
    /// Create an unresolved simple type
    pub fn new(name: Option<QName>, derivation: SimpleDerivation) -> Self {
        Self {
            name,
            derivation,
            final_set: DerivationSet::default(),
            white_space: None,
            source_namespace: String::new(),
            source: SourceInfo::default(),
            info: None,
        }
    }

    /// Variety as far as it is known from the definition alone
    ///
    /// Restrictions report `Atomic` until resolved, since a restriction
    /// takes the variety of its base.
    pub fn variety(&self) -> Variety {
        if let Some(info) = &self.info {
            return info.variety;
        }
        match self.derivation {
            SimpleDerivation::Restriction { .. } => Variety::Atomic,
            SimpleDerivation::List { .. } => Variety::List,
            SimpleDerivation::Union { .. } => Variety::Union,
        }
    }

    /// Whether the type has been resolved
    pub fn is_resolved(&self) -> bool {
        self.info.is_some()
    }

    /// Human readable name for diagnostics
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => "anonymous simpleType".to_string(),
        }
    }
}

// =============================================================================
// Resolved Form
// =============================================================================

/// A simple type with its derivation chain folded
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleTypeInfo {
    /// Type name, `None` for anonymous types
    pub name: Option<QName>,
    /// Variety
    pub variety: Variety,
    /// Primitive ancestor of atomic types
    pub primitive: Option<Primitive>,
    /// Nearest built-in ancestor of atomic types
    pub builtin: Option<&'static BuiltinType>,
    /// Effective facets
    pub facets: FacetSet,
    /// Item type of list types
    pub item: Option<Arc<SimpleTypeInfo>>,
    /// Flattened member types of union types
    pub members: Vec<Arc<SimpleTypeInfo>>,
    /// Derivations forbidden on this type
    pub final_set: DerivationSet,
}

static BUILTIN_INFOS: Lazy<HashMap<&'static str, Arc<SimpleTypeInfo>>> = Lazy::new(|| {
    let mut infos: HashMap<&'static str, Arc<SimpleTypeInfo>> = HashMap::new();
    let atomic = BUILTIN_TYPES
        .iter()
        .filter(|b| !b.is_complex() && b.variety == BuiltinVariety::Atomic);
    for builtin in atomic {
        infos.insert(builtin.name, Arc::new(SimpleTypeInfo::atomic_builtin(builtin)));
    }
    for builtin in BUILTIN_TYPES.iter() {
        if let BuiltinVariety::List(item) = builtin.variety {
            if let Some(item) = infos.get(item).cloned() {
                infos.insert(
                    builtin.name,
                    Arc::new(SimpleTypeInfo {
                        name: Some(builtin.qname()),
                        variety: Variety::List,
                        primitive: None,
                        builtin: Some(builtin),
                        facets: builtin.facets().clone(),
                        item: Some(item),
                        members: Vec::new(),
                        final_set: DerivationSet::default(),
                    }),
                );
            }
        }
    }
    infos
});

/// Resolved form of a built-in simple type
pub fn builtin_info(name: &str) -> Option<Arc<SimpleTypeInfo>> {
    BUILTIN_INFOS.get(name).cloned()
}

impl SimpleTypeInfo {
    fn atomic_builtin(builtin: &'static BuiltinType) -> Self {
        Self {
            name: Some(builtin.qname()),
            variety: Variety::Atomic,
            primitive: builtin.primitive,
            builtin: Some(builtin),
            facets: builtin.facets().clone(),
            item: None,
            members: Vec::new(),
            final_set: DerivationSet::default(),
        }
    }

    /// Resolved form of xs:anySimpleType
    pub fn any_simple_type() -> Arc<SimpleTypeInfo> {
        match builtin_info(XSD_ANY_SIMPLE_TYPE) {
            Some(info) => info,
            None => Arc::new(SimpleTypeInfo {
                name: Some(QName::xsd(XSD_ANY_SIMPLE_TYPE)),
                variety: Variety::Atomic,
                primitive: Some(Primitive::AnySimpleType),
                builtin: get_builtin_type(XSD_ANY_SIMPLE_TYPE),
                facets: FacetSet::new(),
                item: None,
                members: Vec::new(),
                final_set: DerivationSet::default(),
            }),
        }
    }

    /// Fold a restriction step over `base`
    ///
    /// Returns the derived type together with every facet problem found.
    pub fn restrict(
        base: &SimpleTypeInfo,
        name: Option<QName>,
        facets: &[Facet],
        final_set: DerivationSet,
    ) -> (SimpleTypeInfo, Vec<Diagnostic>) {
        let parse = |literal: &str, ns: &NamespaceContext| base.lexical(literal, ns);
        let (effective, errors) = base.facets.derive(facets, base.admitted_facets(), &parse);
        let info = SimpleTypeInfo {
            name,
            variety: base.variety,
            primitive: base.primitive,
            builtin: base.builtin,
            facets: effective,
            item: base.item.clone(),
            members: base.members.clone(),
            final_set,
        };
        (info, errors)
    }

    /// Build a list type over `item`
    pub fn list_of(
        item: Arc<SimpleTypeInfo>,
        name: Option<QName>,
        final_set: DerivationSet,
    ) -> Result<SimpleTypeInfo, String> {
        if item.variety == Variety::List {
            return Err(format!(
                "the item type of a list cannot itself be a list type: '{}'",
                item.display_name()
            ));
        }
        if item.members.iter().any(|m| m.variety == Variety::List) {
            return Err(format!(
                "the item type of a list cannot be a union with list members: '{}'",
                item.display_name()
            ));
        }
        let mut facets = FacetSet::new();
        facets.white_space = Some(FacetValue::fixed(WhiteSpace::Collapse));
        Ok(SimpleTypeInfo {
            name,
            variety: Variety::List,
            primitive: None,
            builtin: None,
            facets,
            item: Some(item),
            members: Vec::new(),
            final_set,
        })
    }

    /// Build a union type over `members`, flattening plain member unions
    pub fn union_of(
        members: Vec<Arc<SimpleTypeInfo>>,
        name: Option<QName>,
        final_set: DerivationSet,
    ) -> SimpleTypeInfo {
        let mut flattened = Vec::with_capacity(members.len());
        for member in members {
            if member.variety == Variety::Union && member.facets == FacetSet::default() {
                flattened.extend(member.members.iter().cloned());
            } else {
                flattened.push(member);
            }
        }
        SimpleTypeInfo {
            name,
            variety: Variety::Union,
            primitive: None,
            builtin: None,
            facets: FacetSet::new(),
            item: None,
            members: flattened,
            final_set,
        }
    }

    /// Human readable name for diagnostics
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => format!("anonymous {} simpleType", self.variety),
        }
    }

    /// Facets admitted for restrictions of this type
    pub fn admitted_facets(&self) -> &'static std::collections::HashSet<FacetKind> {
        match self.variety {
            Variety::List => &LIST_FACETS,
            Variety::Union => &UNION_FACETS,
            Variety::Atomic => match self.primitive {
                Some(primitive) => primitive.admitted_facets(),
                None => &UNION_FACETS,
            },
        }
    }

    /// Effective white space handling
    pub fn white_space(&self) -> WhiteSpace {
        match self.variety {
            Variety::List => WhiteSpace::Collapse,
            _ => self.facets.white_space_mode(),
        }
    }

    /// Whether the type is ID or derived from it
    pub fn is_id(&self) -> bool {
        self.variety == Variety::Atomic
            && self.builtin.map_or(false, |b| builtin_derives_from(b.name, XSD_ID))
    }

    /// Whether values are QNames or NOTATIONs needing a namespace context
    pub fn is_qualified(&self) -> bool {
        match self.variety {
            Variety::Atomic => self.primitive.map_or(false, |p| p.is_qualified()),
            Variety::List => self.item.as_ref().map_or(false, |i| i.is_qualified()),
            Variety::Union => self.members.iter().any(|m| m.is_qualified()),
        }
    }

    /// Whether the type is NOTATION or derived from it
    pub fn is_notation(&self) -> bool {
        self.variety == Variety::Atomic && self.primitive == Some(Primitive::Notation)
    }

    /// Lexical mapping without this type's own facets
    ///
    /// `normalized` must already be whitespace-normalised for atomic and
    /// list types.
    pub fn lexical(&self, normalized: &str, namespaces: &NamespaceContext) -> Result<Value, String> {
        match self.variety {
            Variety::Atomic => match self.builtin {
                Some(builtin) => builtin.parse(normalized, namespaces),
                None => Ok(Value::String(normalized.to_string())),
            },
            Variety::List => {
                let item = self
                    .item
                    .as_ref()
                    .ok_or_else(|| format!("list type '{}' has no item type", self.display_name()))?;
                split_xml_whitespace(normalized)
                    .map(|token| item.validate(token, namespaces))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List)
            }
            Variety::Union => {
                let mut reasons = Vec::new();
                for member in &self.members {
                    match member.validate(normalized, namespaces) {
                        Ok(value) => return Ok(value),
                        Err(reason) => reasons.push(reason),
                    }
                }
                Err(format!(
                    "'{}' is not valid for any member of union '{}': {}",
                    normalized,
                    self.display_name(),
                    reasons.join("; ")
                ))
            }
        }
    }

    /// Validate a literal against the type, including its facets
    pub fn validate(&self, literal: &str, namespaces: &NamespaceContext) -> Result<Value, String> {
        let normalized = self.white_space().normalize(literal);
        let value = self.lexical(&normalized, namespaces)?;
        self.facets.check_value(&normalized, &value)?;
        Ok(value)
    }
}
