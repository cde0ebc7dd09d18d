//! Component tree walking
//!
//! [`Visitor`] and [`VisitorMut`] are called back for every component
//! reachable from a set of global tables: global declarations and
//! definitions, local declarations inside content models and attribute
//! lists, anonymous types and wildcards. Hooks default to doing nothing.
//!
//! Resolved group references are not followed; their targets are reached
//! through the model group definitions they point to.

use std::sync::Arc;

use super::attributes::{AttributeDecl, AttributeGroup};
use super::base::{SourceInfo, TypeRef};
use super::complex_types::{ComplexType, Content};
use super::elements::ElementDecl;
use super::globals::{GlobalMaps, NotationDecl, TypeDefinition};
use super::groups::{GroupDefinition, GroupRef, ModelGroup};
use super::identities::IdentityConstraint;
use super::particles::Particle;
use super::simple_types::{SimpleDerivation, SimpleType};
use super::wildcards::Wildcard;

/// Read-only component visitor
///
/// `owner` is the declaration site of the innermost component holding the
/// visited item.
#[allow(unused_variables)]
pub trait Visitor {
    fn visit_element(&mut self, element: &ElementDecl) {}
    fn visit_attribute(&mut self, attribute: &AttributeDecl) {}
    fn visit_simple_type(&mut self, simple_type: &SimpleType) {}
    fn visit_complex_type(&mut self, complex_type: &ComplexType) {}
    fn visit_type_ref(&mut self, owner: &SourceInfo, type_ref: &TypeRef) {}
    fn visit_group_ref(&mut self, group_ref: &GroupRef) {}
    fn visit_model_group(&mut self, group: &ModelGroup) {}
    fn visit_wildcard(&mut self, wildcard: &Wildcard) {}
    fn visit_group_definition(&mut self, group: &GroupDefinition) {}
    fn visit_attribute_group(&mut self, group: &AttributeGroup) {}
    fn visit_notation(&mut self, notation: &NotationDecl) {}
    fn visit_identity_constraint(&mut self, constraint: &IdentityConstraint) {}
}

/// Mutating component visitor
///
/// Hooks run before the walker descends into the visited component.
#[allow(unused_variables)]
pub trait VisitorMut {
    fn visit_element(&mut self, element: &mut ElementDecl) {}
    fn visit_attribute(&mut self, attribute: &mut AttributeDecl) {}
    fn visit_simple_type(&mut self, simple_type: &mut SimpleType) {}
    fn visit_complex_type(&mut self, complex_type: &mut ComplexType) {}
    fn visit_type_ref(&mut self, type_ref: &mut TypeRef) {}
    fn visit_group_ref(&mut self, group_ref: &mut GroupRef) {}
    fn visit_model_group(&mut self, group: &mut ModelGroup) {}
    fn visit_wildcard(&mut self, wildcard: &mut Wildcard) {}
    fn visit_group_definition(&mut self, group: &mut GroupDefinition) {}
    fn visit_attribute_group(&mut self, group: &mut AttributeGroup) {}
    fn visit_notation(&mut self, notation: &mut NotationDecl) {}
    fn visit_identity_constraint(&mut self, constraint: &mut IdentityConstraint) {}
}

// =============================================================================
// Read-only walk
// =============================================================================

/// Walk every component of the tables
pub fn walk_components<V: Visitor + ?Sized>(visitor: &mut V, maps: &GlobalMaps) {
    for definition in maps.types.values() {
        match definition {
            TypeDefinition::Simple(t) => walk_simple_type(visitor, t),
            TypeDefinition::Complex(t) => walk_complex_type(visitor, t),
        }
    }
    for element in maps.elements.values() {
        walk_element(visitor, element);
    }
    for attribute in maps.attributes.values() {
        walk_attribute(visitor, attribute);
    }
    for group in maps.groups.values() {
        visitor.visit_group_definition(group);
        walk_model_group(visitor, &group.group);
    }
    for group in maps.attribute_groups.values() {
        visitor.visit_attribute_group(group);
        for attribute in &group.attributes {
            walk_attribute(visitor, attribute);
        }
        if let Some(wildcard) = &group.any_attribute {
            visitor.visit_wildcard(wildcard);
        }
    }
    for notation in maps.notations.values() {
        visitor.visit_notation(notation);
    }
    for constraint in maps.identity_constraints.values() {
        visitor.visit_identity_constraint(constraint);
    }
}

/// Walk an element declaration and its anonymous type
pub fn walk_element<V: Visitor + ?Sized>(visitor: &mut V, element: &ElementDecl) {
    visitor.visit_element(element);
    walk_type_ref(visitor, &element.source, &element.type_ref);
}

/// Walk an attribute declaration and its anonymous type
pub fn walk_attribute<V: Visitor + ?Sized>(visitor: &mut V, attribute: &AttributeDecl) {
    visitor.visit_attribute(attribute);
    walk_type_ref(visitor, &attribute.source, &attribute.type_ref);
}

fn walk_type_ref<V: Visitor + ?Sized>(visitor: &mut V, owner: &SourceInfo, type_ref: &TypeRef) {
    visitor.visit_type_ref(owner, type_ref);
    match type_ref {
        TypeRef::Simple(t) => walk_simple_type(visitor, t),
        TypeRef::Complex(t) => walk_complex_type(visitor, t),
        _ => {}
    }
}

/// Walk a simple type and the anonymous types of its derivation
pub fn walk_simple_type<V: Visitor + ?Sized>(visitor: &mut V, simple_type: &SimpleType) {
    visitor.visit_simple_type(simple_type);
    let owner = &simple_type.source;
    match &simple_type.derivation {
        SimpleDerivation::Restriction { base, .. } => walk_type_ref(visitor, owner, base),
        SimpleDerivation::List { item, .. } => walk_type_ref(visitor, owner, item),
        SimpleDerivation::Union { members } => {
            for member in members {
                walk_type_ref(visitor, owner, member);
            }
        }
    }
}

/// Walk a complex type, its content model and attribute uses
pub fn walk_complex_type<V: Visitor + ?Sized>(visitor: &mut V, complex_type: &ComplexType) {
    visitor.visit_complex_type(complex_type);
    walk_type_ref(visitor, &complex_type.source, &complex_type.base);
    match &complex_type.content {
        Content::SimpleContent(sc) => {
            if let Some(inline) = &sc.inline_base {
                walk_simple_type(visitor, inline);
            }
        }
        _ => {
            if let Some(particle) = complex_type.particle() {
                walk_particle(visitor, particle);
            }
        }
    }
    for attribute in &complex_type.attributes {
        walk_attribute(visitor, attribute);
    }
    if let Some(wildcard) = &complex_type.any_attribute {
        visitor.visit_wildcard(wildcard);
    }
}

/// Walk a particle
pub fn walk_particle<V: Visitor + ?Sized>(visitor: &mut V, particle: &Particle) {
    match particle {
        Particle::Element(e) => walk_element(visitor, e),
        Particle::Group(g) => walk_model_group(visitor, g),
        Particle::GroupRef(r) => visitor.visit_group_ref(r),
        Particle::Any(any) => visitor.visit_wildcard(&any.wildcard),
    }
}

/// Walk a model group and its particles
pub fn walk_model_group<V: Visitor + ?Sized>(visitor: &mut V, group: &ModelGroup) {
    visitor.visit_model_group(group);
    for particle in &group.particles {
        walk_particle(visitor, particle);
    }
}

// =============================================================================
// Mutating walk
// =============================================================================

/// Walk every component of the tables, mutably
///
/// Model group definitions shared through an `Arc` are copied on write.
pub fn walk_components_mut<V: VisitorMut + ?Sized>(visitor: &mut V, maps: &mut GlobalMaps) {
    for definition in maps.types.values_mut() {
        match definition {
            TypeDefinition::Simple(t) => walk_simple_type_mut(visitor, t),
            TypeDefinition::Complex(t) => walk_complex_type_mut(visitor, t),
        }
    }
    for element in maps.elements.values_mut() {
        walk_element_mut(visitor, element);
    }
    for attribute in maps.attributes.values_mut() {
        walk_attribute_mut(visitor, attribute);
    }
    for group in maps.groups.values_mut() {
        visitor.visit_group_definition(group);
        walk_model_group_mut(visitor, Arc::make_mut(&mut group.group));
    }
    for group in maps.attribute_groups.values_mut() {
        visitor.visit_attribute_group(group);
        for attribute in &mut group.attributes {
            walk_attribute_mut(visitor, attribute);
        }
        if let Some(wildcard) = &mut group.any_attribute {
            visitor.visit_wildcard(wildcard);
        }
    }
    for notation in maps.notations.values_mut() {
        visitor.visit_notation(notation);
    }
    for constraint in maps.identity_constraints.values_mut() {
        visitor.visit_identity_constraint(constraint);
    }
}

/// Walk an element declaration and its anonymous type, mutably
pub fn walk_element_mut<V: VisitorMut + ?Sized>(visitor: &mut V, element: &mut ElementDecl) {
    visitor.visit_element(element);
    walk_type_ref_mut(visitor, &mut element.type_ref);
}

/// Walk an attribute declaration and its anonymous type, mutably
pub fn walk_attribute_mut<V: VisitorMut + ?Sized>(visitor: &mut V, attribute: &mut AttributeDecl) {
    visitor.visit_attribute(attribute);
    walk_type_ref_mut(visitor, &mut attribute.type_ref);
}

fn walk_type_ref_mut<V: VisitorMut + ?Sized>(visitor: &mut V, type_ref: &mut TypeRef) {
    visitor.visit_type_ref(type_ref);
    match type_ref {
        TypeRef::Simple(t) => walk_simple_type_mut(visitor, t),
        TypeRef::Complex(t) => walk_complex_type_mut(visitor, t),
        _ => {}
    }
}

/// Walk a simple type, mutably
pub fn walk_simple_type_mut<V: VisitorMut + ?Sized>(visitor: &mut V, simple_type: &mut SimpleType) {
    visitor.visit_simple_type(simple_type);
    match &mut simple_type.derivation {
        SimpleDerivation::Restriction { base, .. } => walk_type_ref_mut(visitor, base),
        SimpleDerivation::List { item, .. } => walk_type_ref_mut(visitor, item),
        SimpleDerivation::Union { members } => {
            for member in members {
                walk_type_ref_mut(visitor, member);
            }
        }
    }
}

/// Walk a complex type, mutably
pub fn walk_complex_type_mut<V: VisitorMut + ?Sized>(visitor: &mut V, complex_type: &mut ComplexType) {
    visitor.visit_complex_type(complex_type);
    walk_type_ref_mut(visitor, &mut complex_type.base);
    match &mut complex_type.content {
        Content::SimpleContent(sc) => {
            if let Some(inline) = &mut sc.inline_base {
                walk_simple_type_mut(visitor, inline);
            }
        }
        _ => {
            if let Some(particle) = complex_type.particle_mut() {
                walk_particle_mut(visitor, particle);
            }
        }
    }
    for attribute in &mut complex_type.attributes {
        walk_attribute_mut(visitor, attribute);
    }
    if let Some(wildcard) = &mut complex_type.any_attribute {
        visitor.visit_wildcard(wildcard);
    }
}

/// Walk a particle, mutably
pub fn walk_particle_mut<V: VisitorMut + ?Sized>(visitor: &mut V, particle: &mut Particle) {
    match particle {
        Particle::Element(e) => walk_element_mut(visitor, e),
        Particle::Group(g) => walk_model_group_mut(visitor, g),
        Particle::GroupRef(r) => visitor.visit_group_ref(r),
        Particle::Any(any) => visitor.visit_wildcard(&mut any.wildcard),
    }
}

/// Walk a model group, mutably
pub fn walk_model_group_mut<V: VisitorMut + ?Sized>(visitor: &mut V, group: &mut ModelGroup) {
    visitor.visit_model_group(group);
    for particle in &mut group.particles {
        walk_particle_mut(visitor, particle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::QName;
    use crate::validators::groups::GroupKind;
    use crate::validators::particles::Occurs;

    #[derive(Default)]
    struct Counter {
        elements: usize,
        group_refs: usize,
        anonymous_types: usize,
    }

    impl Visitor for Counter {
        fn visit_element(&mut self, _: &ElementDecl) {
            self.elements += 1;
        }
        fn visit_group_ref(&mut self, _: &GroupRef) {
            self.group_refs += 1;
        }
        fn visit_complex_type(&mut self, t: &ComplexType) {
            if t.name.is_none() {
                self.anonymous_types += 1;
            }
        }
    }

    fn maps() -> GlobalMaps {
        let mut group = ModelGroup::new(GroupKind::Sequence);
        group
            .particles
            .push(Particle::Element(Box::new(ElementDecl::new(QName::local("a")))));
        group
            .particles
            .push(Particle::GroupRef(GroupRef::new(QName::local("g"), Occurs::once())));
        let mut ct = ComplexType::new(None);
        ct.content = Content::ElementContent {
            particle: Particle::Group(group),
        };
        let mut root = ElementDecl::new(QName::local("root"));
        root.type_ref = TypeRef::Complex(Box::new(ct));
        let mut maps = GlobalMaps::new();
        maps.add_element(root).unwrap();
        maps
    }

    #[test]
    fn test_walk_reaches_local_components() {
        let mut counter = Counter::default();
        walk_components(&mut counter, &maps());
        assert_eq!(counter.elements, 2);
        assert_eq!(counter.group_refs, 1);
        assert_eq!(counter.anonymous_types, 1);
    }

    struct Renamer;

    impl VisitorMut for Renamer {
        fn visit_element(&mut self, element: &mut ElementDecl) {
            element.name = element.name.with_namespace("urn:x");
        }
    }

    #[test]
    fn test_walk_mut_renames() {
        let mut maps = maps();
        walk_components_mut(&mut Renamer, &mut maps);
        let root = maps.elements.values().next().unwrap();
        assert_eq!(root.name.namespace, "urn:x");
        match &root.type_ref {
            TypeRef::Complex(ct) => match ct.particle() {
                Some(Particle::Group(g)) => match &g.particles[0] {
                    Particle::Element(a) => assert_eq!(a.name.namespace, "urn:x"),
                    other => panic!("unexpected particle {:?}", other),
                },
                other => panic!("unexpected content {:?}", other),
            },
            other => panic!("unexpected type {:?}", other),
        }
    }
}
