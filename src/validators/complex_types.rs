//! XSD Complex Type definitions
//!
//! This module implements complex types, which define elements that can
//! contain other elements and/or attributes.
//!
//! A complex type has one of four content shapes:
//! - Empty: no content model at all
//! - Element content: a model group given directly under `complexType`
//! - Simple content: `simpleContent` extending or restricting a simple base
//! - Complex content: `complexContent` extending or restricting a complex base
//!
//! The base type is held as a [`TypeRef`] until the resolver binds it.

use std::fmt;
use std::sync::Arc;

use super::attributes::{AttributeDecl, EffectiveAttributes};
use super::base::{DerivationMethod, DerivationSet, SourceInfo, TypeRef};
use super::facets::Facet;
use super::groups::GroupKind;
use super::particles::Particle;
use super::simple_types::{SimpleType, SimpleTypeInfo};
use super::wildcards::Wildcard;
use crate::namespaces::QName;

/// Kind of content allowed by a complex type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// No character or element content
    Empty,
    /// Character content of a simple type
    Simple,
    /// Element content without character data
    ElementOnly,
    /// Element content interleaved with character data
    Mixed,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Empty => write!(f, "empty"),
            ContentKind::Simple => write!(f, "simple"),
            ContentKind::ElementOnly => write!(f, "element-only"),
            ContentKind::Mixed => write!(f, "mixed"),
        }
    }
}

/// `simpleContent` derivation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleContent {
    /// Facets of a restriction, in source order
    pub facets: Vec<Facet>,
    /// Inline `simpleType` of a restriction
    pub inline_base: Option<Box<SimpleType>>,
    /// Resolved value type of the content
    pub value_type: Option<Arc<SimpleTypeInfo>>,
}

/// `complexContent` derivation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplexContent {
    /// Content model of the derivation step
    pub particle: Option<Particle>,
    /// `mixed` attribute of `complexContent`
    pub mixed_override: Option<bool>,
}

/// Content of a complex type
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// No content model given
    Empty,
    /// A model group given directly under `complexType`
    ElementContent {
        /// The content particle
        particle: Particle,
    },
    /// `simpleContent` derivation
    SimpleContent(SimpleContent),
    /// `complexContent` derivation
    ComplexContent(ComplexContent),
}

/// A complex type definition
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexType {
    /// Type name, `None` for anonymous types
    pub name: Option<QName>,
    /// Whether the type is abstract
    pub is_abstract: bool,
    /// `mixed` attribute of `complexType`
    pub mixed: bool,
    /// Blocked derivations
    pub block: DerivationSet,
    /// Forbidden derivations
    pub final_set: DerivationSet,
    /// Base type; xs:anyType unless derived explicitly
    pub base: TypeRef,
    /// Derivation method, restriction for types derived implicitly from xs:anyType
    pub derivation_method: DerivationMethod,
    /// Content
    pub content: Content,
    /// Attribute uses declared directly on the type
    pub attributes: Vec<AttributeDecl>,
    /// Referenced attribute groups, in document order
    pub attribute_groups: Vec<QName>,
    /// Attribute wildcard declared directly on the type
    pub any_attribute: Option<Wildcard>,
    /// Target namespace of the declaring document
    pub source_namespace: String,
    /// Declaration site
    pub source: SourceInfo,
    /// Attribute uses after group expansion and inheritance, once resolved
    pub effective: Option<EffectiveAttributes>,
    /// Content kind, once resolved
    pub content_kind: Option<ContentKind>,
}

impl ComplexType {
    /// Create an empty type restricting xs:anyType
    pub fn new(name: Option<QName>) -> Self {
        Self {
            name,
            is_abstract: false,
            mixed: false,
            block: DerivationSet::default(),
            final_set: DerivationSet::default(),
            base: TypeRef::any_type(),
            derivation_method: DerivationMethod::Restriction,
            content: Content::Empty,
            attributes: Vec::new(),
            attribute_groups: Vec::new(),
            any_attribute: None,
            source_namespace: String::new(),
            source: SourceInfo::default(),
            effective: None,
            content_kind: None,
        }
    }

    /// Human readable name for diagnostics
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => "anonymous complexType".to_string(),
        }
    }

    /// Whether character data may interleave with child elements
    pub fn is_mixed(&self) -> bool {
        match &self.content {
            Content::ComplexContent(cc) => cc.mixed_override.unwrap_or(self.mixed),
            Content::SimpleContent(_) => false,
            _ => self.mixed,
        }
    }

    /// Whether the content is a simple type
    pub fn has_simple_content(&self) -> bool {
        matches!(self.content, Content::SimpleContent(_))
    }

    /// Content particle of this derivation step
    pub fn particle(&self) -> Option<&Particle> {
        match &self.content {
            Content::ElementContent { particle } => Some(particle),
            Content::ComplexContent(cc) => cc.particle.as_ref(),
            _ => None,
        }
    }

    /// Mutable content particle of this derivation step
    pub fn particle_mut(&mut self) -> Option<&mut Particle> {
        match &mut self.content {
            Content::ElementContent { particle } => Some(particle),
            Content::ComplexContent(cc) => cc.particle.as_mut(),
            _ => None,
        }
    }

    /// Content kind given by this step alone
    ///
    /// `base_kind` is the content kind of the base type and matters only
    /// for extensions that add no particle of their own.
    pub fn step_content_kind(&self, base_kind: Option<ContentKind>) -> ContentKind {
        if self.has_simple_content() {
            return ContentKind::Simple;
        }
        let own_empty = self.particle().map_or(true, is_empty_particle);
        let mixed = self.is_mixed();
        if own_empty && self.derivation_method == DerivationMethod::Extension {
            if let Some(kind) = base_kind {
                return match (kind, mixed) {
                    (ContentKind::Empty, true) => ContentKind::Mixed,
                    (kind, _) => kind,
                };
            }
        }
        match (own_empty, mixed) {
            (_, true) => ContentKind::Mixed,
            (true, false) => ContentKind::Empty,
            (false, false) => ContentKind::ElementOnly,
        }
    }

    /// Effective attribute uses, falling back to the declared ones before resolution
    pub fn attribute_uses(&self) -> &[AttributeDecl] {
        match &self.effective {
            Some(effective) => &effective.attributes,
            None => &self.attributes,
        }
    }
}

/// Whether a particle can only ever match nothing
pub fn is_empty_particle(particle: &Particle) -> bool {
    if particle.occurs().is_empty() {
        return true;
    }
    match particle {
        Particle::Group(group) => {
            group.kind != GroupKind::Choice && group.particles.iter().all(is_empty_particle)
                || group.kind == GroupKind::Choice && group.particles.is_empty()
        }
        _ => false,
    }
}
