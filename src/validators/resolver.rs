//! Semantic resolution of schema sets
//!
//! [`Resolver`] runs once over a loaded [`SchemaSet`] and turns its
//! symbolic references into resolved components:
//!
//! 1. named references are checked and placeholders bound
//! 2. simple types are folded into [`SimpleTypeInfo`]s, base first
//! 3. attribute default and fixed values are normalised
//! 4. attribute groups are expanded
//! 5. complex types get their content kind, value type and effective
//!    attribute uses, base first
//! 6. substitution groups are closed and element types inferred from heads
//! 7. element default and fixed values are normalised
//! 8. model group references are bound to their definitions
//! 9. keyrefs are checked against the constraints they refer to
//!
//! Unresolved references abort after the first phase. Every later problem
//! is collected, so a failed resolution reports all of them at once. On
//! success no placeholder remains and the set is frozen.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};

use super::attributes::{AttributeDecl, AttributeGroup, EffectiveAttributes};
use super::base::{DerivationMethod, DerivationSet, SourceInfo, TypeRef};
use super::builtins::{builtin_type, XSD_ANY_SIMPLE_TYPE, XSD_ANY_TYPE};
use super::complex_types::{is_empty_particle, ComplexType, Content, ContentKind};
use super::elements::ElementDecl;
use super::globals::{GlobalMaps, SchemaSet, TypeDefinition};
use super::groups::{GroupKind, GroupRef, ModelGroup};
use super::identities::IdentityConstraint;
use super::particles::Particle;
use super::simple_types::{builtin_info, SimpleDerivation, SimpleType, SimpleTypeInfo};
use super::values::Value;
use super::visitor::{walk_components, walk_components_mut, Visitor, VisitorMut};
use super::wildcards::{ProcessContents, Wildcard};
use crate::error::{Diagnostic, Error, Result, ValidationList};
use crate::namespaces::{QName, XSD_NAMESPACE};

/// Resolver of loaded schema sets
///
/// # Example
///
/// ```
/// use xsdcore::{Resolver, SchemaSet};
///
/// let mut set = SchemaSet::new();
/// Resolver::new().resolve(&mut set).unwrap();
/// assert!(set.is_frozen());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    cancel: Option<Arc<AtomicBool>>,
}

impl Resolver {
    /// Create a resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort with [`Error::Cancelled`] once `cancel` is set
    ///
    /// The flag is checked between global components.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Resolve every component of `set` and freeze it
    pub fn resolve(&self, set: &mut SchemaSet) -> Result<()> {
        if set.is_frozen() {
            return Err(Error::Frozen("resolve".to_string()));
        }
        let declared: IndexMap<QName, Vec<QName>> = set
            .substitution_groups()
            .map(|(head, members)| (head.clone(), members.clone()))
            .collect();

        let mut resolution = Resolution::new(self.cancel.as_deref());
        let substitution_groups = resolution.run(set.components_mut()?, &declared)?;
        set.set_substitution_groups(substitution_groups)?;
        set.freeze();

        let counts = set.counts();
        info!(
            documents = counts.documents,
            types = counts.types,
            elements = counts.elements,
            attributes = counts.attributes,
            groups = counts.groups,
            attribute_groups = counts.attribute_groups,
            notations = counts.notations,
            identity_constraints = counts.identity_constraints,
            substitution_groups = counts.substitution_groups,
            "schema set frozen"
        );
        Ok(())
    }
}

fn into_error(errors: ValidationList) -> Error {
    let mut diagnostics = errors.into_vec();
    if diagnostics.len() == 1 {
        if let Some(diagnostic) = diagnostics.pop() {
            return diagnostic.into();
        }
    }
    Error::Semantic(ValidationList::from(diagnostics))
}

// =============================================================================
// Dependency graphs
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Directed graph over global component names
///
/// Edges to names that are not nodes of the graph are ignored.
#[derive(Debug, Default)]
struct DependencyGraph {
    edges: IndexMap<QName, Vec<QName>>,
}

impl DependencyGraph {
    fn add(&mut self, node: QName, targets: Vec<QName>) {
        self.edges.entry(node).or_default().extend(targets);
    }

    /// Nodes with their dependencies first, and every cycle found
    fn order(&self) -> (Vec<QName>, Vec<Vec<QName>>) {
        let mut marks = HashMap::new();
        let mut path = Vec::new();
        let mut order = Vec::with_capacity(self.edges.len());
        let mut cycles = Vec::new();
        for node in self.edges.keys() {
            if !marks.contains_key(node) {
                self.visit(node, &mut marks, &mut path, &mut order, &mut cycles);
            }
        }
        (order, cycles)
    }

    fn visit<'g>(
        &'g self,
        node: &'g QName,
        marks: &mut HashMap<&'g QName, Mark>,
        path: &mut Vec<&'g QName>,
        order: &mut Vec<QName>,
        cycles: &mut Vec<Vec<QName>>,
    ) {
        marks.insert(node, Mark::Visiting);
        path.push(node);
        for target in self.edges.get(node).into_iter().flatten() {
            if !self.edges.contains_key(target) {
                continue;
            }
            match marks.get(target) {
                None => self.visit(target, marks, path, order, cycles),
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|n| *n == target).unwrap_or(0);
                    cycles.push(path[start..].iter().map(|n| (*n).clone()).collect());
                }
                Some(Mark::Done) => {}
            }
        }
        path.pop();
        marks.insert(node, Mark::Done);
        order.push(node.clone());
    }
}

fn describe_cycle(cycle: &[QName]) -> String {
    let mut names: Vec<String> = cycle.iter().map(|n| format!("'{}'", n)).collect();
    if let Some(first) = names.first().cloned() {
        names.push(first);
    }
    names.join(" -> ")
}

// =============================================================================
// Resolution state
// =============================================================================

/// What later phases need to know about a resolved complex type
#[derive(Debug, Clone)]
struct ComplexSummary {
    content_kind: ContentKind,
    value_type: Option<Arc<SimpleTypeInfo>>,
    attributes: EffectiveAttributes,
    final_set: DerivationSet,
}

fn any_type_summary() -> ComplexSummary {
    let mut wildcard = Wildcard::new(XSD_NAMESPACE);
    wildcard.process_contents = ProcessContents::Lax;
    ComplexSummary {
        content_kind: ContentKind::Mixed,
        value_type: None,
        attributes: EffectiveAttributes {
            attributes: Vec::new(),
            wildcard: Some(wildcard),
        },
        final_set: DerivationSet::default(),
    }
}

#[derive(Debug, Clone)]
enum BaseDefinition {
    Simple(Arc<SimpleTypeInfo>),
    Complex(ComplexSummary),
}

/// Value space of a declaration's type, for default and fixed values
#[derive(Debug, Clone)]
enum ValueSpace {
    Simple(Arc<SimpleTypeInfo>),
    Complex(ContentKind, Option<Arc<SimpleTypeInfo>>),
    Unknown,
}

/// Global attribute as seen by attribute uses referring to it
#[derive(Debug, Clone)]
struct GlobalAttribute {
    info: Option<Arc<SimpleTypeInfo>>,
    fixed: Option<(String, Option<Value>)>,
}

struct Resolution<'c> {
    cancel: Option<&'c AtomicBool>,
    errors: ValidationList,
    simple: HashMap<QName, Arc<SimpleTypeInfo>>,
    complex_names: HashSet<QName>,
    complex: HashMap<QName, ComplexSummary>,
    attribute_groups: HashMap<QName, EffectiveAttributes>,
    global_attributes: HashMap<QName, GlobalAttribute>,
    model_groups: HashMap<QName, Arc<ModelGroup>>,
}

impl<'c> Resolution<'c> {
    fn new(cancel: Option<&'c AtomicBool>) -> Self {
        Self {
            cancel,
            errors: ValidationList::new(),
            simple: HashMap::new(),
            complex_names: HashSet::new(),
            complex: HashMap::new(),
            attribute_groups: HashMap::new(),
            global_attributes: HashMap::new(),
            model_groups: HashMap::new(),
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        match self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    fn report(&mut self, source: &SourceInfo, diagnostic: Diagnostic) {
        self.errors.push(source.annotate(diagnostic));
    }

    fn report_cycles(
        &mut self,
        cycles: &[Vec<QName>],
        source_of: impl Fn(&QName) -> Option<SourceInfo>,
        code: &str,
        what: &str,
    ) -> HashSet<QName> {
        let mut cyclic = HashSet::new();
        for cycle in cycles {
            let source = cycle.first().and_then(&source_of).unwrap_or_default();
            self.report(
                &source,
                Diagnostic::semantic(format!("circular {}: {}", what, describe_cycle(cycle)))
                    .with_code(code)
                    .with_expected(cycle.iter().map(|n| n.to_string())),
            );
            cyclic.extend(cycle.iter().cloned());
        }
        cyclic
    }

    fn final_violation(&mut self, source: &SourceInfo, code: &str, base: &str, method: DerivationMethod) {
        self.report(
            source,
            Diagnostic::semantic(format!(
                "type '{}' does not allow derivation by {}",
                base, method
            ))
            .with_code(code)
            .with_actual(method.as_str()),
        );
    }

    fn run(
        &mut self,
        maps: &mut GlobalMaps,
        declared: &IndexMap<QName, Vec<QName>>,
    ) -> Result<IndexMap<QName, Vec<QName>>> {
        debug!(components = maps.len(), "resolving references");
        self.check_references(maps);
        if !self.errors.is_empty() {
            return Err(into_error(std::mem::take(&mut self.errors)));
        }
        walk_components_mut(&mut BindPlaceholders, maps);

        debug!("resolving simple types");
        self.resolve_simple_types(maps)?;
        debug!("normalising attribute values");
        self.resolve_attribute_values(maps)?;
        debug!("expanding attribute groups");
        self.resolve_attribute_groups(maps)?;
        debug!("resolving complex types");
        self.resolve_complex_types(maps)?;
        debug!("closing substitution groups");
        let substitution_groups = self.resolve_substitution_groups(maps, declared)?;
        debug!("normalising element values");
        self.resolve_element_values(maps)?;
        debug!("expanding model groups");
        self.expand_groups(maps)?;
        debug!("checking identity constraints");
        self.check_identity_constraints(maps);

        if self.errors.is_empty() {
            let mut check = PlaceholderCheck::default();
            walk_components(&mut check, maps);
            for diagnostic in check.errors {
                self.errors.push(diagnostic);
            }
        }
        if !self.errors.is_empty() {
            return Err(into_error(std::mem::take(&mut self.errors)));
        }
        Ok(substitution_groups)
    }

    // =========================================================================
    // References
    // =========================================================================

    fn check_references(&mut self, maps: &GlobalMaps) {
        let mut check = ReferenceCheck {
            maps,
            errors: Vec::new(),
        };
        walk_components(&mut check, maps);
        for diagnostic in check.errors {
            self.errors.push(diagnostic);
        }
    }

    // =========================================================================
    // Simple types
    // =========================================================================

    fn resolve_simple_types(&mut self, maps: &mut GlobalMaps) -> Result<()> {
        let mut graph = DependencyGraph::default();
        for (name, definition) in &maps.types {
            match definition {
                TypeDefinition::Simple(simple_type) => {
                    let mut dependencies = Vec::new();
                    simple_dependencies(simple_type, &mut dependencies);
                    graph.add(name.clone(), dependencies);
                }
                TypeDefinition::Complex(_) => {
                    self.complex_names.insert(name.clone());
                }
            }
        }
        let (order, cycles) = graph.order();
        let cyclic = self.report_cycles(
            &cycles,
            |name| maps.types.get(name).map(|t| t.source().clone()),
            "st-props-correct.2",
            "simple type derivation",
        );

        for name in order {
            self.check_cancelled()?;
            if cyclic.contains(&name) {
                continue;
            }
            if let Some(TypeDefinition::Simple(simple_type)) = maps.types.get_mut(&name) {
                if let Some(info) = self.resolve_simple(simple_type) {
                    self.simple.insert(name, info);
                }
            }
        }
        self.check_cancelled()?;
        walk_components_mut(&mut AnonymousSimpleTypes(self), maps);
        Ok(())
    }

    /// Resolve a simple type and its anonymous parts, innermost first
    fn resolve_simple(&mut self, simple_type: &mut SimpleType) -> Option<Arc<SimpleTypeInfo>> {
        if let Some(info) = &simple_type.info {
            return Some(info.clone());
        }
        let name = simple_type.name.clone();
        let final_set = simple_type.final_set;
        let source = simple_type.source.clone();

        let info = match &mut simple_type.derivation {
            SimpleDerivation::Restriction { base, facets } => {
                let base = self.simple_ref(base, &source)?;
                if base.final_set.restriction {
                    self.final_violation(
                        &source,
                        "st-props-correct.3",
                        &base.display_name(),
                        DerivationMethod::Restriction,
                    );
                }
                let (info, problems) = SimpleTypeInfo::restrict(&base, name, facets, final_set);
                for problem in problems {
                    self.report(&source, problem);
                }
                info
            }
            SimpleDerivation::List { item, facets } => {
                let item = self.simple_ref(item, &source)?;
                if item.final_set.list {
                    self.final_violation(
                        &source,
                        "cos-st-restricts.2.1",
                        &item.display_name(),
                        DerivationMethod::List,
                    );
                }
                let list = match SimpleTypeInfo::list_of(item, name.clone(), final_set) {
                    Ok(info) => info,
                    Err(message) => {
                        self.report(
                            &source,
                            Diagnostic::semantic(message).with_code("cos-st-restricts.2.1"),
                        );
                        return None;
                    }
                };
                if facets.is_empty() {
                    list
                } else {
                    let (info, problems) = SimpleTypeInfo::restrict(&list, name, facets, final_set);
                    for problem in problems {
                        self.report(&source, problem);
                    }
                    info
                }
            }
            SimpleDerivation::Union { members } => {
                let mut infos = Vec::with_capacity(members.len());
                for member in members.iter_mut() {
                    let info = self.simple_ref(member, &source)?;
                    if info.final_set.union {
                        self.final_violation(
                            &source,
                            "cos-st-restricts.3.3",
                            &info.display_name(),
                            DerivationMethod::Union,
                        );
                    }
                    infos.push(info);
                }
                SimpleTypeInfo::union_of(infos, name, final_set)
            }
        };

        let info = Arc::new(info);
        simple_type.info = Some(info.clone());
        Some(info)
    }

    fn simple_ref(&mut self, type_ref: &mut TypeRef, source: &SourceInfo) -> Option<Arc<SimpleTypeInfo>> {
        match type_ref {
            TypeRef::Named(name) => {
                let found = self.lookup_simple(name);
                if found.is_none() && self.is_complex_name(name) {
                    self.report(
                        source,
                        Diagnostic::reference(format!(
                            "'{}' is a complex type where a simple type is required",
                            name
                        ))
                        .with_code("src-resolve")
                        .with_actual(name.to_string()),
                    );
                }
                found
            }
            TypeRef::Simple(inner) => self.resolve_simple(inner),
            _ => None,
        }
    }

    /// Resolved simple type by name, user types first
    fn lookup_simple(&self, name: &QName) -> Option<Arc<SimpleTypeInfo>> {
        if let Some(info) = self.simple.get(name) {
            return Some(info.clone());
        }
        if name.is_xsd() {
            return builtin_info(&name.local_name);
        }
        None
    }

    fn is_complex_name(&self, name: &QName) -> bool {
        self.complex_names.contains(name) || (name.is_xsd() && name.local_name == XSD_ANY_TYPE)
    }

    // =========================================================================
    // Attribute values
    // =========================================================================

    fn resolve_attribute_values(&mut self, maps: &mut GlobalMaps) -> Result<()> {
        for attribute in maps.attributes.values_mut() {
            self.check_cancelled()?;
            let info = self.check_attribute(attribute);
            let fixed = attribute
                .value_constraint
                .as_ref()
                .filter(|vc| vc.is_fixed())
                .map(|vc| (vc.lexical.clone(), vc.value.clone()));
            self.global_attributes
                .insert(attribute.name.clone(), GlobalAttribute { info, fixed });
        }
        self.check_cancelled()?;
        walk_components_mut(&mut AttributeValues(self), maps);
        Ok(())
    }

    /// Check an attribute declaration or use, returning its resolved type
    fn check_attribute(&mut self, attribute: &mut AttributeDecl) -> Option<Arc<SimpleTypeInfo>> {
        let global = match &attribute.type_ref {
            TypeRef::OfAttribute(name) => self.global_attributes.get(name).cloned(),
            _ => None,
        };
        let info = match &attribute.type_ref {
            TypeRef::Named(name) => {
                let found = self.lookup_simple(name);
                if found.is_none() && self.is_complex_name(name) {
                    self.report(
                        &attribute.source,
                        Diagnostic::reference(format!(
                            "attribute '{}' must have a simple type, '{}' is complex",
                            attribute.name, name
                        ))
                        .with_code("src-resolve")
                        .with_actual(name.to_string()),
                    );
                }
                found
            }
            TypeRef::Simple(simple_type) => simple_type.info.clone(),
            TypeRef::OfAttribute(_) => global.as_ref().and_then(|g| g.info.clone()),
            _ => None,
        };

        if let Some(info) = &info {
            if !attribute.is_reference && info.is_notation() && info.facets.enumeration.is_none() {
                self.report(
                    &attribute.source,
                    Diagnostic::semantic(format!(
                        "attribute '{}' uses NOTATION directly; an enumeration is required",
                        attribute.name
                    ))
                    .with_code("enumeration-required-notation"),
                );
            }
        }

        let source = attribute.source.clone();
        let name = attribute.name.clone();
        if let (Some(info), Some(vc)) = (&info, &mut attribute.value_constraint) {
            let kind = if vc.is_fixed() { "fixed" } else { "default" };
            if info.is_id() {
                self.report(
                    &source,
                    Diagnostic::semantic(format!(
                        "attribute '{}' of type ID cannot have a {} value",
                        name, kind
                    ))
                    .with_code("a-props-correct.3"),
                );
            } else {
                match info.validate(&vc.lexical, &vc.namespaces) {
                    Ok(value) => vc.value = Some(value),
                    Err(reason) => self.report(
                        &source,
                        Diagnostic::semantic(format!(
                            "{} value '{}' of attribute '{}' is not valid: {}",
                            kind, vc.lexical, name, reason
                        ))
                        .with_code("a-props-correct.2")
                        .with_actual(vc.lexical.clone()),
                    ),
                }
            }
        }

        if let (Some((lexical, value)), Some(vc)) = (
            global.and_then(|g| g.fixed),
            attribute.value_constraint.as_ref(),
        ) {
            let same = match (&value, &vc.value) {
                (Some(a), Some(b)) => a.same_value(b),
                _ => lexical == vc.lexical,
            };
            if !vc.is_fixed() || !same {
                self.report(
                    &source,
                    Diagnostic::semantic(format!(
                        "attribute use '{}' must keep the fixed value '{}' of its declaration",
                        name, lexical
                    ))
                    .with_code("au-props-correct.2")
                    .with_actual(vc.lexical.clone())
                    .with_expected([lexical.clone()]),
                );
            }
        }
        info
    }

    // =========================================================================
    // Attribute groups
    // =========================================================================

    fn resolve_attribute_groups(&mut self, maps: &mut GlobalMaps) -> Result<()> {
        let mut graph = DependencyGraph::default();
        for (name, group) in &maps.attribute_groups {
            graph.add(name.clone(), group.attribute_groups.clone());
        }
        let (order, cycles) = graph.order();
        let cyclic = self.report_cycles(
            &cycles,
            |name| maps.attribute_groups.get(name).map(|g| g.source.clone()),
            "src-attribute_group.3",
            "attribute group reference",
        );

        for name in order {
            self.check_cancelled()?;
            if cyclic.contains(&name) {
                continue;
            }
            if let Some(group) = maps.attribute_groups.get(&name) {
                let (effective, _) = self.flatten(
                    &group.attributes,
                    &group.attribute_groups,
                    group.any_attribute.as_ref(),
                    &group.source,
                    "ag-props-correct.2",
                );
                self.attribute_groups.insert(name, effective);
            }
        }
        for (name, group) in maps.attribute_groups.iter_mut() {
            group.effective = self.attribute_groups.get(name).cloned();
        }
        Ok(())
    }

    /// Local attribute uses plus referenced groups, with the complete wildcard
    ///
    /// Prohibited uses are returned apart.
    fn flatten(
        &mut self,
        attributes: &[AttributeDecl],
        groups: &[QName],
        wildcard: Option<&Wildcard>,
        source: &SourceInfo,
        code: &str,
    ) -> (EffectiveAttributes, Vec<QName>) {
        let mut effective = EffectiveAttributes {
            attributes: Vec::new(),
            wildcard: wildcard.cloned(),
        };
        let mut prohibited = Vec::new();
        for attribute in attributes {
            if attribute.is_prohibited() {
                prohibited.push(attribute.name.clone());
            } else {
                self.add_use(&mut effective, attribute.clone(), source, code);
            }
        }

        let mut seen = HashSet::new();
        for name in groups {
            if !seen.insert(name) {
                continue;
            }
            let group = match self.attribute_groups.get(name) {
                Some(group) => group.clone(),
                None => continue,
            };
            for attribute in group.attributes {
                self.add_use(&mut effective, attribute, source, code);
            }
            if let Some(other) = group.wildcard {
                effective.wildcard = match effective.wildcard.take() {
                    None => Some(other),
                    Some(current) => match current.intersect(&other) {
                        Some(intersection) => Some(intersection),
                        None => {
                            self.report(
                                source,
                                Diagnostic::semantic(format!(
                                    "the intersection of attribute wildcards '{}' and '{}' is not expressible",
                                    current.namespace, other.namespace
                                ))
                                .with_code("cos-aw-intersect"),
                            );
                            Some(current)
                        }
                    },
                };
            }
        }
        (effective, prohibited)
    }

    fn add_use(
        &mut self,
        effective: &mut EffectiveAttributes,
        attribute: AttributeDecl,
        source: &SourceInfo,
        code: &str,
    ) {
        let position = effective
            .attributes
            .iter()
            .position(|a| a.name == attribute.name);
        match position {
            Some(index) if effective.attributes[index] == attribute => {}
            Some(_) => self.report(
                source,
                Diagnostic::semantic(format!("duplicate attribute use '{}'", attribute.name))
                    .with_code(code)
                    .with_actual(attribute.name.to_string()),
            ),
            None => effective.attributes.push(attribute),
        }
    }

    // =========================================================================
    // Complex types
    // =========================================================================

    fn resolve_complex_types(&mut self, maps: &mut GlobalMaps) -> Result<()> {
        self.complex.insert(QName::xsd(XSD_ANY_TYPE), any_type_summary());

        let mut graph = DependencyGraph::default();
        for (name, definition) in &maps.types {
            if let TypeDefinition::Complex(complex_type) = definition {
                graph.add(name.clone(), complex_type.base.name().cloned().into_iter().collect());
            }
        }
        let (order, cycles) = graph.order();
        let cyclic = self.report_cycles(
            &cycles,
            |name| maps.types.get(name).map(|t| t.source().clone()),
            "ct-props-correct.3",
            "complex type derivation",
        );

        for name in order {
            self.check_cancelled()?;
            if cyclic.contains(&name) {
                continue;
            }
            if let Some(TypeDefinition::Complex(complex_type)) = maps.types.get_mut(&name) {
                if let Some(summary) = self.resolve_complex(complex_type) {
                    self.complex.insert(name, summary);
                }
            }
        }
        self.check_cancelled()?;
        walk_components_mut(&mut AnonymousComplexTypes(self), maps);
        Ok(())
    }

    fn base_definition(&self, name: &QName) -> Option<BaseDefinition> {
        if let Some(summary) = self.complex.get(name) {
            return Some(BaseDefinition::Complex(summary.clone()));
        }
        self.lookup_simple(name).map(BaseDefinition::Simple)
    }

    fn resolve_complex(&mut self, complex_type: &mut ComplexType) -> Option<ComplexSummary> {
        let base = match &complex_type.base {
            TypeRef::Named(name) => self.base_definition(name)?,
            _ => return None,
        };
        let method = complex_type.derivation_method;
        let source = complex_type.source.clone();
        let base_label = complex_type.base.to_string();

        if let BaseDefinition::Complex(summary) = &base {
            if summary.final_set.contains(method) {
                let code = match method {
                    DerivationMethod::Extension => "cos-ct-extends.1.1",
                    _ => "derivation-ok-restriction.1",
                };
                self.final_violation(&source, code, &base_label, method);
            }
        }

        let base_kind = match &base {
            BaseDefinition::Simple(_) => ContentKind::Simple,
            BaseDefinition::Complex(summary) => summary.content_kind,
        };
        let own_empty = complex_type.particle().map_or(true, is_empty_particle);
        let mixed = complex_type.is_mixed();
        let explicit_content = matches!(complex_type.content, Content::ComplexContent(_));

        let mut value_type = None;
        match &mut complex_type.content {
            Content::SimpleContent(content) => {
                value_type = match (&base, method) {
                    (BaseDefinition::Simple(info), DerivationMethod::Extension) => Some(info.clone()),
                    (BaseDefinition::Complex(summary), DerivationMethod::Extension)
                        if summary.content_kind == ContentKind::Simple =>
                    {
                        summary.value_type.clone()
                    }
                    (BaseDefinition::Complex(summary), DerivationMethod::Restriction)
                        if summary.content_kind == ContentKind::Simple
                            || (summary.content_kind == ContentKind::Mixed
                                && content.inline_base.is_some()) =>
                    {
                        let start = match &content.inline_base {
                            Some(inline) => inline.info.clone(),
                            None => summary.value_type.clone(),
                        };
                        match start {
                            Some(start) => {
                                let (info, problems) = SimpleTypeInfo::restrict(
                                    &start,
                                    None,
                                    &content.facets,
                                    DerivationSet::default(),
                                );
                                for problem in problems {
                                    self.report(&source, problem);
                                }
                                Some(Arc::new(info))
                            }
                            None => None,
                        }
                    }
                    _ => {
                        self.report(
                            &source,
                            Diagnostic::semantic(format!(
                                "'{}' cannot be the base of a simpleContent {}",
                                base_label, method
                            ))
                            .with_code("src-ct.2")
                            .with_actual(base_label.clone()),
                        );
                        None
                    }
                };
                content.value_type = value_type.clone();
            }
            _ => match (&base, method) {
                (BaseDefinition::Simple(_), _) => self.report(
                    &source,
                    Diagnostic::semantic(format!(
                        "the base type '{}' of a complexContent derivation must be a complex type",
                        base_label
                    ))
                    .with_code("src-ct.1")
                    .with_actual(base_label.clone()),
                ),
                (BaseDefinition::Complex(summary), DerivationMethod::Extension) => {
                    if base_kind == ContentKind::Simple && !own_empty {
                        self.report(
                            &source,
                            Diagnostic::semantic(format!(
                                "type '{}' has simple content and cannot be extended with element content",
                                base_label
                            ))
                            .with_code("cos-ct-extends.1.4"),
                        );
                    } else if matches!(base_kind, ContentKind::ElementOnly | ContentKind::Mixed)
                        && !own_empty
                        && (base_kind == ContentKind::Mixed) != mixed
                    {
                        self.report(
                            &source,
                            Diagnostic::semantic(format!(
                                "an extension must be mixed exactly when its base type '{}' is",
                                base_label
                            ))
                            .with_code("cos-ct-extends.1.4"),
                        );
                    }
                    if base_kind == ContentKind::Simple {
                        value_type = summary.value_type.clone();
                    }
                }
                (BaseDefinition::Complex(_), _) => {
                    if explicit_content && base_kind == ContentKind::Simple {
                        self.report(
                            &source,
                            Diagnostic::semantic(format!(
                                "type '{}' has simple content and cannot be restricted by complexContent",
                                base_label
                            ))
                            .with_code("derivation-ok-restriction.5"),
                        );
                    } else if mixed && base_kind != ContentKind::Mixed {
                        self.report(
                            &source,
                            Diagnostic::semantic(format!(
                                "a restriction of the non-mixed type '{}' cannot be mixed",
                                base_label
                            ))
                            .with_code("derivation-ok-restriction.5"),
                        );
                    }
                }
            },
        }

        let content_kind = complex_type.step_content_kind(Some(base_kind));
        complex_type.content_kind = Some(content_kind);
        if content_kind != ContentKind::Simple {
            value_type = None;
        }

        let (own, prohibited) = self.flatten(
            &complex_type.attributes,
            &complex_type.attribute_groups,
            complex_type.any_attribute.as_ref(),
            &source,
            "ct-props-correct.4",
        );
        let effective = match (base, method) {
            (BaseDefinition::Complex(summary), DerivationMethod::Extension) => {
                self.extend_attributes(summary.attributes, own, &source)
            }
            (BaseDefinition::Complex(summary), _) => {
                self.restrict_attributes(summary.attributes, own, &prohibited, &source, &base_label)
            }
            (BaseDefinition::Simple(_), _) => own,
        };
        complex_type.effective = Some(effective.clone());

        Some(ComplexSummary {
            content_kind,
            value_type,
            attributes: effective,
            final_set: complex_type.final_set,
        })
    }

    fn extend_attributes(
        &mut self,
        base: EffectiveAttributes,
        own: EffectiveAttributes,
        source: &SourceInfo,
    ) -> EffectiveAttributes {
        let mut result = base;
        for attribute in own.attributes {
            if result.get(&attribute.name).is_some() {
                self.report(
                    source,
                    Diagnostic::semantic(format!(
                        "attribute '{}' is already declared by the base type",
                        attribute.name
                    ))
                    .with_code("ct-props-correct.4")
                    .with_actual(attribute.name.to_string()),
                );
            } else {
                result.attributes.push(attribute);
            }
        }
        result.wildcard = match (result.wildcard.take(), own.wildcard) {
            (Some(base), Some(own)) => match own.unite(&base) {
                Some(union) => Some(union),
                None => {
                    self.report(
                        source,
                        Diagnostic::semantic(format!(
                            "the union of attribute wildcards '{}' and '{}' is not expressible",
                            own.namespace, base.namespace
                        ))
                        .with_code("cos-aw-union"),
                    );
                    Some(own)
                }
            },
            (base, own) => own.or(base),
        };
        result
    }

    fn restrict_attributes(
        &mut self,
        base: EffectiveAttributes,
        own: EffectiveAttributes,
        prohibited: &[QName],
        source: &SourceInfo,
        base_label: &str,
    ) -> EffectiveAttributes {
        let mut result = EffectiveAttributes {
            attributes: base.attributes.clone(),
            wildcard: own.wildcard.clone(),
        };
        for name in prohibited {
            if let Some(index) = result.attributes.iter().position(|a| &a.name == name) {
                if result.attributes[index].is_required() {
                    self.report(
                        source,
                        Diagnostic::semantic(format!(
                            "attribute '{}' is required by base type '{}' and cannot be prohibited",
                            name, base_label
                        ))
                        .with_code("derivation-ok-restriction.3"),
                    );
                } else {
                    result.attributes.remove(index);
                }
            }
        }
        for attribute in own.attributes {
            match result.attributes.iter().position(|a| a.name == attribute.name) {
                Some(index) => {
                    if result.attributes[index].is_required() && !attribute.is_required() {
                        self.report(
                            source,
                            Diagnostic::semantic(format!(
                                "attribute '{}' is required by base type '{}'",
                                attribute.name, base_label
                            ))
                            .with_code("derivation-ok-restriction.3"),
                        );
                    }
                    result.attributes[index] = attribute;
                }
                None => {
                    let allowed = base
                        .wildcard
                        .as_ref()
                        .map_or(false, |w| w.is_namespace_allowed(&attribute.name.namespace));
                    if !allowed {
                        self.report(
                            source,
                            Diagnostic::semantic(format!(
                                "attribute '{}' is not allowed by base type '{}'",
                                attribute.name, base_label
                            ))
                            .with_code("derivation-ok-restriction.2.2")
                            .with_actual(attribute.name.to_string()),
                        );
                    }
                    result.attributes.push(attribute);
                }
            }
        }
        if let Some(wildcard) = &own.wildcard {
            let subset = base
                .wildcard
                .as_ref()
                .map_or(false, |b| wildcard.namespace.is_subset_of(&b.namespace));
            if !subset {
                self.report(
                    source,
                    Diagnostic::semantic(format!(
                        "attribute wildcard '{}' is not a subset of the wildcard of base type '{}'",
                        wildcard.namespace, base_label
                    ))
                    .with_code("derivation-ok-restriction.4"),
                );
            }
        }
        result
    }

    // =========================================================================
    // Substitution groups
    // =========================================================================

    fn resolve_substitution_groups(
        &mut self,
        maps: &mut GlobalMaps,
        declared: &IndexMap<QName, Vec<QName>>,
    ) -> Result<IndexMap<QName, Vec<QName>>> {
        let mut graph = DependencyGraph::default();
        for (name, element) in &maps.elements {
            graph.add(name.clone(), element.substitution_group.iter().cloned().collect());
        }
        let (order, cycles) = graph.order();
        self.report_cycles(
            &cycles,
            |name| maps.elements.get(name).map(|e| e.source.clone()),
            "e-props-correct.6",
            "substitution group",
        );
        if !cycles.is_empty() {
            return Ok(declared.clone());
        }

        for name in &order {
            self.check_cancelled()?;
            let head = match maps.elements.get(name) {
                Some(element) if element.type_ref == TypeRef::Inferred => {
                    element.substitution_group.clone()
                }
                _ => None,
            };
            let inferred = match head.as_ref().and_then(|h| maps.elements.get(h).map(|e| (h, e))) {
                Some((_, head)) if matches!(head.type_ref, TypeRef::Named(_) | TypeRef::OfElement(_)) => {
                    head.type_ref.clone()
                }
                Some((head_name, _)) => TypeRef::OfElement(head_name.clone()),
                None => continue,
            };
            if let Some(element) = maps.elements.get_mut(name) {
                element.type_ref = inferred;
            }
        }

        let maps = &*maps;
        for element in maps.elements.values() {
            let head = match element
                .substitution_group
                .as_ref()
                .and_then(|h| maps.elements.get(h))
            {
                Some(head) => head,
                None => continue,
            };
            match type_derivation(maps, &element.type_ref, &head.type_ref) {
                None => self.report(
                    &element.source,
                    Diagnostic::semantic(format!(
                        "the type of element '{}' does not derive from the type of its substitution group head '{}'",
                        element.name, head.name
                    ))
                    .with_code("e-props-correct.3"),
                ),
                Some(methods) => {
                    for method in [DerivationMethod::Extension, DerivationMethod::Restriction] {
                        if methods.contains(method) && head.final_set.contains(method) {
                            self.report(
                                &element.source,
                                Diagnostic::semantic(format!(
                                    "substitution group head '{}' does not allow members derived by {}",
                                    head.name, method
                                ))
                                .with_code("e-props-correct.3")
                                .with_actual(element.name.to_string()),
                            );
                        }
                    }
                }
            }
        }

        let mut closed = IndexMap::with_capacity(declared.len());
        for head_name in declared.keys() {
            let head = match maps.elements.get(head_name) {
                Some(head) => head,
                None => continue,
            };
            let mut members = Vec::new();
            let mut seen = HashSet::new();
            collect_members(declared, head_name, &mut seen, &mut members);
            let allowed: Vec<QName> = members
                .into_iter()
                .filter(|member| {
                    maps.elements
                        .get(member)
                        .map_or(false, |m| is_substitutable(maps, head, m))
                })
                .collect();
            closed.insert(head_name.clone(), allowed);
        }
        Ok(closed)
    }

    // =========================================================================
    // Element values
    // =========================================================================

    fn resolve_element_values(&mut self, maps: &mut GlobalMaps) -> Result<()> {
        let mut spaces: HashMap<QName, ValueSpace> = HashMap::new();
        for (name, element) in &maps.elements {
            if !matches!(element.type_ref, TypeRef::OfElement(_)) {
                let space = self.value_space(&element.type_ref, &spaces);
                spaces.insert(name.clone(), space);
            }
        }
        let mut pending: Vec<(&QName, &QName)> = maps
            .elements
            .iter()
            .filter_map(|(name, element)| match &element.type_ref {
                TypeRef::OfElement(target) => Some((name, target)),
                _ => None,
            })
            .collect();
        while !pending.is_empty() {
            let before = pending.len();
            pending.retain(|(name, target)| match spaces.get(*target).cloned() {
                Some(space) => {
                    spaces.insert((*name).clone(), space);
                    false
                }
                None => true,
            });
            if pending.len() == before {
                break;
            }
        }

        self.check_cancelled()?;
        walk_components_mut(&mut ElementValues { resolution: self, spaces: &spaces }, maps);
        Ok(())
    }

    fn value_space(&self, type_ref: &TypeRef, elements: &HashMap<QName, ValueSpace>) -> ValueSpace {
        match type_ref {
            TypeRef::Named(name) => match self.complex.get(name) {
                Some(summary) => ValueSpace::Complex(summary.content_kind, summary.value_type.clone()),
                None => self.lookup_simple(name).map_or(ValueSpace::Unknown, ValueSpace::Simple),
            },
            TypeRef::Simple(simple_type) => simple_type
                .info
                .clone()
                .map_or(ValueSpace::Unknown, ValueSpace::Simple),
            TypeRef::Complex(complex_type) => match complex_type.content_kind {
                Some(kind) => {
                    let value = match &complex_type.content {
                        Content::SimpleContent(content) => content.value_type.clone(),
                        _ => None,
                    };
                    ValueSpace::Complex(kind, value)
                }
                None => ValueSpace::Unknown,
            },
            TypeRef::OfElement(name) => elements.get(name).cloned().unwrap_or(ValueSpace::Unknown),
            _ => ValueSpace::Unknown,
        }
    }

    fn check_element(&mut self, element: &mut ElementDecl, space: ValueSpace) {
        let source = element.source.clone();
        let name = element.name.clone();
        let info = match space {
            ValueSpace::Simple(info) => {
                if info.is_notation() && info.facets.enumeration.is_none() {
                    self.report(
                        &source,
                        Diagnostic::semantic(format!(
                            "element '{}' uses NOTATION directly; an enumeration is required",
                            name
                        ))
                        .with_code("enumeration-required-notation"),
                    );
                }
                info
            }
            ValueSpace::Complex(ContentKind::Simple, Some(info)) => info,
            ValueSpace::Complex(ContentKind::Mixed, _) => {
                if let Some(vc) = &mut element.value_constraint {
                    vc.value = Some(Value::String(vc.lexical.clone()));
                }
                return;
            }
            ValueSpace::Complex(kind, _) => {
                if let Some(vc) = &element.value_constraint {
                    let what = if vc.is_fixed() { "fixed" } else { "default" };
                    self.report(
                        &source,
                        Diagnostic::semantic(format!(
                            "element '{}' has {} content and cannot have a {} value",
                            name, kind, what
                        ))
                        .with_code("cos-valid-default.2.1"),
                    );
                }
                return;
            }
            ValueSpace::Unknown => return,
        };

        if let Some(vc) = &mut element.value_constraint {
            let what = if vc.is_fixed() { "fixed" } else { "default" };
            if info.is_id() {
                self.report(
                    &source,
                    Diagnostic::semantic(format!(
                        "element '{}' of type ID cannot have a {} value",
                        name, what
                    ))
                    .with_code("e-props-correct.4"),
                );
                return;
            }
            match info.validate(&vc.lexical, &vc.namespaces) {
                Ok(value) => vc.value = Some(value),
                Err(reason) => self.report(
                    &source,
                    Diagnostic::semantic(format!(
                        "{} value '{}' of element '{}' is not valid: {}",
                        what, vc.lexical, name, reason
                    ))
                    .with_code("e-props-correct.2")
                    .with_actual(vc.lexical.clone()),
                ),
            }
        }
    }

    // =========================================================================
    // Model groups
    // =========================================================================

    fn expand_groups(&mut self, maps: &mut GlobalMaps) -> Result<()> {
        let mut graph = DependencyGraph::default();
        for (name, definition) in &maps.groups {
            let mut references = Vec::new();
            group_references(&definition.group, &mut references);
            graph.add(name.clone(), references);
        }
        let (order, cycles) = graph.order();
        let cyclic = self.report_cycles(
            &cycles,
            |name| maps.groups.get(name).map(|g| g.source.clone()),
            "mg-props-correct.2",
            "model group reference",
        );

        for name in order {
            self.check_cancelled()?;
            if cyclic.contains(&name) {
                continue;
            }
            if let Some(definition) = maps.groups.get_mut(&name) {
                bind_particles(Arc::make_mut(&mut definition.group), &self.model_groups);
                self.model_groups.insert(name, definition.group.clone());
            }
        }

        self.check_cancelled()?;
        let mut binder = GroupBinder {
            groups: &self.model_groups,
            errors: Vec::new(),
        };
        walk_components_mut(&mut binder, maps);
        for diagnostic in binder.errors {
            self.errors.push(diagnostic);
        }
        Ok(())
    }

    // =========================================================================
    // Identity constraints
    // =========================================================================

    fn check_identity_constraints(&mut self, maps: &GlobalMaps) {
        for constraint in maps.identity_constraints.values() {
            let referenced = match constraint
                .refer
                .as_ref()
                .and_then(|r| maps.identity_constraints.get(r))
            {
                Some(referenced) => referenced,
                None => continue,
            };
            if let Some(diagnostic) = check_keyref(constraint, referenced) {
                self.report(&constraint.source, diagnostic);
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn simple_dependencies(simple_type: &SimpleType, out: &mut Vec<QName>) {
    let references: &[TypeRef] = match &simple_type.derivation {
        SimpleDerivation::Restriction { base, .. } => std::slice::from_ref(base),
        SimpleDerivation::List { item, .. } => std::slice::from_ref(item),
        SimpleDerivation::Union { members } => members,
    };
    for reference in references {
        match reference {
            TypeRef::Named(name) => out.push(name.clone()),
            TypeRef::Simple(inner) => simple_dependencies(inner, out),
            _ => {}
        }
    }
}

/// Group references reachable without crossing an element declaration
fn group_references(group: &ModelGroup, out: &mut Vec<QName>) {
    for particle in &group.particles {
        match particle {
            Particle::GroupRef(reference) => out.push(reference.name.clone()),
            Particle::Group(inner) => group_references(inner, out),
            _ => {}
        }
    }
}

fn bind_particles(group: &mut ModelGroup, groups: &HashMap<QName, Arc<ModelGroup>>) {
    for particle in &mut group.particles {
        match particle {
            Particle::GroupRef(reference) => reference.target = groups.get(&reference.name).cloned(),
            Particle::Group(inner) => bind_particles(inner, groups),
            _ => {}
        }
    }
}

fn collect_members(
    declared: &IndexMap<QName, Vec<QName>>,
    head: &QName,
    seen: &mut HashSet<QName>,
    out: &mut Vec<QName>,
) {
    for member in declared.get(head).into_iter().flatten() {
        if seen.insert(member.clone()) {
            out.push(member.clone());
            collect_members(declared, member, seen, out);
        }
    }
}

fn is_substitutable(maps: &GlobalMaps, head: &ElementDecl, member: &ElementDecl) -> bool {
    if member.is_abstract || head.block.substitution {
        return false;
    }
    match type_derivation(maps, &member.type_ref, &head.type_ref) {
        Some(methods) => {
            !(methods.extension && head.block.extension)
                && !(methods.restriction && head.block.restriction)
        }
        None => false,
    }
}

/// The type a declaration ends up with, following element and attribute references
fn declared_type<'m>(maps: &'m GlobalMaps, type_ref: &'m TypeRef) -> Option<&'m TypeRef> {
    let mut current = type_ref;
    for _ in 0..=maps.elements.len() + maps.attributes.len() {
        current = match current {
            TypeRef::OfElement(name) => &maps.elements.get(name)?.type_ref,
            TypeRef::OfAttribute(name) => &maps.attributes.get(name)?.type_ref,
            other => return Some(other),
        };
    }
    None
}

/// Derivation methods leading from `derived` to `base`, `None` when unrelated
fn type_derivation<'m>(
    maps: &'m GlobalMaps,
    derived: &'m TypeRef,
    base: &'m TypeRef,
) -> Option<DerivationSet> {
    let derived = declared_type(maps, derived)?;
    let base = declared_type(maps, base)?;
    if std::ptr::eq(derived, base) || derived == base {
        return Some(DerivationSet::default());
    }
    let target = match base {
        TypeRef::Named(name) => name,
        _ => return None,
    };

    let mut methods = DerivationSet::default();
    let mut current = match derived {
        TypeRef::Named(name) => name.clone(),
        TypeRef::Simple(simple_type) => {
            let (method, next) = simple_step(simple_type)?;
            methods.insert(method);
            next
        }
        TypeRef::Complex(complex_type) => {
            methods.insert(complex_type.derivation_method);
            complex_type.base.name()?.clone()
        }
        _ => return None,
    };
    for _ in 0..=maps.types.len() + 64 {
        if &current == target {
            return Some(methods);
        }
        let (method, next) = named_step(maps, &current)?;
        methods.insert(method);
        current = next;
    }
    None
}

fn simple_step(simple_type: &SimpleType) -> Option<(DerivationMethod, QName)> {
    match &simple_type.derivation {
        SimpleDerivation::Restriction { base: TypeRef::Named(name), .. } => {
            Some((DerivationMethod::Restriction, name.clone()))
        }
        SimpleDerivation::Restriction { base: TypeRef::Simple(inner), .. } => {
            simple_step(inner).map(|(_, next)| (DerivationMethod::Restriction, next))
        }
        SimpleDerivation::List { .. } | SimpleDerivation::Union { .. } => {
            Some((DerivationMethod::Restriction, QName::xsd(XSD_ANY_SIMPLE_TYPE)))
        }
        _ => None,
    }
}

fn named_step(maps: &GlobalMaps, name: &QName) -> Option<(DerivationMethod, QName)> {
    match maps.types.get(name) {
        Some(TypeDefinition::Complex(complex_type)) => {
            Some((complex_type.derivation_method, complex_type.base.name()?.clone()))
        }
        Some(TypeDefinition::Simple(simple_type)) => simple_step(simple_type),
        None => builtin_type(name)
            .and_then(|builtin| builtin.base_type)
            .map(|base| (DerivationMethod::Restriction, QName::xsd(base))),
    }
}

fn check_keyref(constraint: &IdentityConstraint, referenced: &IdentityConstraint) -> Option<Diagnostic> {
    if !referenced.is_referenceable() {
        return Some(
            Diagnostic::semantic(format!(
                "keyref '{}' refers to keyref '{}'; a key or unique constraint is required",
                constraint.name, referenced.name
            ))
            .with_code("c-props-correct.1")
            .with_actual(referenced.name.to_string()),
        );
    }
    if referenced.fields.len() != constraint.fields.len() {
        return Some(
            Diagnostic::semantic(format!(
                "keyref '{}' has {} fields but '{}' has {}",
                constraint.name,
                constraint.fields.len(),
                referenced.name,
                referenced.fields.len()
            ))
            .with_code("c-props-correct.2"),
        );
    }
    None
}

// =============================================================================
// Visitors
// =============================================================================

struct ReferenceCheck<'m> {
    maps: &'m GlobalMaps,
    errors: Vec<Diagnostic>,
}

impl ReferenceCheck<'_> {
    fn missing(&mut self, source: &SourceInfo, what: &str, name: &QName) {
        self.errors.push(
            source.annotate(
                Diagnostic::reference(format!("unresolved reference to {} '{}'", what, name))
                    .with_code("src-resolve")
                    .with_actual(name.to_string()),
            ),
        );
    }
}

impl Visitor for ReferenceCheck<'_> {
    fn visit_type_ref(&mut self, owner: &SourceInfo, type_ref: &TypeRef) {
        match type_ref {
            TypeRef::Placeholder(name) | TypeRef::Named(name) if !self.maps.has_type(name) => {
                self.missing(owner, "type", name)
            }
            TypeRef::OfElement(name) if !self.maps.elements.contains_key(name) => {
                self.missing(owner, "element", name)
            }
            TypeRef::OfAttribute(name) if !self.maps.attributes.contains_key(name) => {
                self.missing(owner, "attribute", name)
            }
            _ => {}
        }
    }

    fn visit_element(&mut self, element: &ElementDecl) {
        if let Some(head) = &element.substitution_group {
            if !self.maps.elements.contains_key(head) {
                self.missing(&element.source, "substitution group head", head);
            }
        }
    }

    fn visit_complex_type(&mut self, complex_type: &ComplexType) {
        for name in &complex_type.attribute_groups {
            if !self.maps.attribute_groups.contains_key(name) {
                self.missing(&complex_type.source, "attribute group", name);
            }
        }
    }

    fn visit_group_ref(&mut self, group_ref: &GroupRef) {
        if !self.maps.groups.contains_key(&group_ref.name) {
            self.missing(&group_ref.source, "group", &group_ref.name);
        }
    }

    fn visit_attribute_group(&mut self, group: &AttributeGroup) {
        for name in &group.attribute_groups {
            if !self.maps.attribute_groups.contains_key(name) {
                self.missing(&group.source, "attribute group", name);
            }
        }
    }

    fn visit_identity_constraint(&mut self, constraint: &IdentityConstraint) {
        if let Some(refer) = &constraint.refer {
            if !self.maps.identity_constraints.contains_key(refer) {
                self.missing(&constraint.source, "identity constraint", refer);
            }
        }
    }
}

struct BindPlaceholders;

impl VisitorMut for BindPlaceholders {
    fn visit_type_ref(&mut self, type_ref: &mut TypeRef) {
        if let TypeRef::Placeholder(name) = type_ref {
            let name = name.clone();
            *type_ref = TypeRef::Named(name);
        }
    }
}

struct AnonymousSimpleTypes<'r, 'c>(&'r mut Resolution<'c>);

impl VisitorMut for AnonymousSimpleTypes<'_, '_> {
    fn visit_simple_type(&mut self, simple_type: &mut SimpleType) {
        if simple_type.name.is_none() && simple_type.info.is_none() {
            self.0.resolve_simple(simple_type);
        }
    }
}

struct AnonymousComplexTypes<'r, 'c>(&'r mut Resolution<'c>);

impl VisitorMut for AnonymousComplexTypes<'_, '_> {
    fn visit_complex_type(&mut self, complex_type: &mut ComplexType) {
        if complex_type.name.is_none() && complex_type.content_kind.is_none() {
            self.0.resolve_complex(complex_type);
        }
    }
}

struct AttributeValues<'r, 'c>(&'r mut Resolution<'c>);

impl VisitorMut for AttributeValues<'_, '_> {
    fn visit_attribute(&mut self, attribute: &mut AttributeDecl) {
        if !attribute.is_global {
            self.0.check_attribute(attribute);
        }
    }
}

struct ElementValues<'r, 'c, 's> {
    resolution: &'r mut Resolution<'c>,
    spaces: &'s HashMap<QName, ValueSpace>,
}

impl VisitorMut for ElementValues<'_, '_, '_> {
    fn visit_element(&mut self, element: &mut ElementDecl) {
        if element.is_reference {
            return;
        }
        let space = match (&element.type_ref, element.is_global) {
            (_, true) => self
                .spaces
                .get(&element.name)
                .cloned()
                .unwrap_or(ValueSpace::Unknown),
            (type_ref, false) => self.resolution.value_space(type_ref, self.spaces),
        };
        self.resolution.check_element(element, space);
    }
}

struct GroupBinder<'g> {
    groups: &'g HashMap<QName, Arc<ModelGroup>>,
    errors: Vec<Diagnostic>,
}

impl VisitorMut for GroupBinder<'_> {
    fn visit_group_ref(&mut self, group_ref: &mut GroupRef) {
        if group_ref.target.is_none() {
            group_ref.target = self.groups.get(&group_ref.name).cloned();
        }
        let is_all = group_ref
            .target
            .as_ref()
            .map_or(false, |target| target.kind == GroupKind::All);
        if is_all && (group_ref.occurs.min > 1 || group_ref.occurs.max != Some(1)) {
            self.errors.push(
                group_ref.source.annotate(
                    Diagnostic::semantic(format!(
                        "a reference to the 'all' group '{}' must occur at most once",
                        group_ref.name
                    ))
                    .with_code("cos-all-limited"),
                ),
            );
        }
    }

    fn visit_model_group(&mut self, group: &mut ModelGroup) {
        for particle in &group.particles {
            if let Particle::GroupRef(reference) = particle {
                let is_all = self
                    .groups
                    .get(&reference.name)
                    .map_or(false, |g| g.kind == GroupKind::All);
                if is_all {
                    self.errors.push(
                        reference.source.annotate(
                            Diagnostic::semantic(format!(
                                "the 'all' group '{}' cannot appear inside another model group",
                                reference.name
                            ))
                            .with_code("cos-all-limited"),
                        ),
                    );
                }
            }
        }
    }
}

#[derive(Default)]
struct PlaceholderCheck {
    errors: Vec<Diagnostic>,
}

impl PlaceholderCheck {
    fn remaining(&mut self, source: &SourceInfo, what: String) {
        self.errors.push(
            source.annotate(
                Diagnostic::semantic(format!("{} remains after resolution", what))
                    .with_code("schema-placeholder"),
            ),
        );
    }
}

impl Visitor for PlaceholderCheck {
    fn visit_type_ref(&mut self, owner: &SourceInfo, type_ref: &TypeRef) {
        if type_ref.is_placeholder() {
            self.remaining(owner, format!("placeholder type '{}'", type_ref));
        }
    }

    fn visit_group_ref(&mut self, group_ref: &GroupRef) {
        if !group_ref.is_resolved() {
            self.remaining(&group_ref.source, format!("unbound reference to group '{}'", group_ref.name));
        }
    }

    fn visit_simple_type(&mut self, simple_type: &SimpleType) {
        if !simple_type.is_resolved() {
            self.remaining(&simple_type.source, format!("unresolved {}", simple_type.display_name()));
        }
    }

    fn visit_complex_type(&mut self, complex_type: &ComplexType) {
        if complex_type.content_kind.is_none() {
            self.remaining(&complex_type.source, format!("unresolved {}", complex_type.display_name()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::loaders::MemoryProvider;
    use crate::validators::loader::{build_schema_set, load_schema_set};
    use crate::validators::simple_types::Variety;
    use pretty_assertions::assert_eq;

    const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

    fn build(body: &str) -> Result<Arc<SchemaSet>> {
        let xml = format!(
            r#"<xs:schema {} xmlns:tns="urn:t" targetNamespace="urn:t">{}</xs:schema>"#,
            XS, body
        );
        build_schema_set(MemoryProvider::new().with_file("main.xsd", xml), "main.xsd")
    }

    fn t(local: &str) -> QName {
        QName::new("urn:t", local)
    }

    fn codes(err: &Error) -> Vec<String> {
        err.diagnostics().into_iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_forward_type_reference() {
        let set = build(
            r#"<xs:element name="root" type="tns:T"/>
               <xs:complexType name="T"><xs:sequence><xs:element name="a" type="xs:int"/></xs:sequence></xs:complexType>"#,
        )
        .unwrap();
        assert!(set.is_frozen());
        let root = set.lookup_element(&t("root")).unwrap();
        assert_eq!(root.type_ref, TypeRef::Named(t("T")));
        let view = set.element_type(root).unwrap();
        assert_eq!(view.content_kind(), Some(ContentKind::ElementOnly));
    }

    #[test]
    fn test_wildcard_content_model() {
        let set = build(
            r#"<xs:element name="root" type="tns:Open"/>
               <xs:complexType name="Open"><xs:any processContents="skip"/></xs:complexType>"#,
        )
        .unwrap();
        let root = set.lookup_element(&t("root")).unwrap();
        let view = set.element_type(root).unwrap();
        assert_eq!(view.content_kind(), Some(ContentKind::ElementOnly));
    }

    #[test]
    fn test_unresolved_type() {
        let err = build(r#"<xs:element name="root" type="tns:Missing"/>"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert_eq!(err.code(), "src-resolve");
        assert!(err.to_string().contains("tns:Missing") || err.to_string().contains("Missing"));
    }

    #[test]
    fn test_unresolved_references_are_all_reported() {
        let err = build(
            r#"<xs:element name="a" type="tns:X"/>
               <xs:complexType name="T"><xs:sequence><xs:group ref="tns:G"/></xs:sequence>
                 <xs:attributeGroup ref="tns:AG"/></xs:complexType>"#,
        )
        .unwrap_err();
        assert_eq!(err.diagnostics().len(), 3);
        assert!(err.diagnostics().iter().all(|d| d.kind == ErrorKind::Reference));
    }

    #[test]
    fn test_simple_type_chain() {
        let set = build(
            r#"<xs:simpleType name="small"><xs:restriction base="tns:int10"><xs:maxInclusive value="5"/></xs:restriction></xs:simpleType>
               <xs:simpleType name="int10"><xs:restriction base="xs:int"><xs:maxInclusive value="10"/></xs:restriction></xs:simpleType>
               <xs:simpleType name="smalls"><xs:list itemType="tns:small"/></xs:simpleType>"#,
        )
        .unwrap();
        let small = set.lookup_type(&t("small")).unwrap().value_type().unwrap();
        let ns = crate::namespaces::NamespaceContext::new();
        assert!(small.validate("5", &ns).is_ok());
        assert!(small.validate("6", &ns).is_err());
        let smalls = set.lookup_type(&t("smalls")).unwrap().value_type().unwrap();
        assert_eq!(smalls.variety, Variety::List);
        assert!(smalls.validate("1 2 3", &ns).is_ok());
    }

    #[test]
    fn test_list_length_from_embedded_restriction() {
        let set = build(
            r#"<xs:simpleType name="pair"><xs:list itemType="xs:int">
                 <xs:restriction><xs:length value="2"/></xs:restriction>
               </xs:list></xs:simpleType>"#,
        )
        .unwrap();
        let pair = set.lookup_type(&t("pair")).unwrap().value_type().unwrap();
        let ns = crate::namespaces::NamespaceContext::new();
        assert_eq!(pair.variety, Variety::List);
        assert!(pair.validate("1 2", &ns).is_ok());
        assert!(pair.validate("1 2 3", &ns).is_err());
        assert!(pair.validate("1", &ns).is_err());
        assert!(pair.validate("1 x", &ns).is_err());
    }

    #[test]
    fn test_facet_inconsistency_is_semantic() {
        let err = build(
            r#"<xs:simpleType name="s"><xs:restriction base="xs:string">
                 <xs:minLength value="5"/><xs:maxLength value="2"/>
               </xs:restriction></xs:simpleType>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Semantic);
    }

    #[test]
    fn test_simple_type_cycle() {
        let err = build(
            r#"<xs:simpleType name="a"><xs:restriction base="tns:b"/></xs:simpleType>
               <xs:simpleType name="b"><xs:restriction base="tns:a"/></xs:simpleType>"#,
        )
        .unwrap_err();
        assert_eq!(codes(&err), vec!["st-props-correct.2"]);
    }

    #[test]
    fn test_simple_final_forbids_restriction() {
        let err = build(
            r#"<xs:simpleType name="a" final="restriction"><xs:restriction base="xs:string"/></xs:simpleType>
               <xs:simpleType name="b"><xs:restriction base="tns:a"/></xs:simpleType>"#,
        )
        .unwrap_err();
        assert_eq!(codes(&err), vec!["st-props-correct.3"]);
    }

    #[test]
    fn test_complex_base_for_simple_type() {
        let err = build(
            r#"<xs:complexType name="c"/>
               <xs:simpleType name="s"><xs:restriction base="tns:c"/></xs:simpleType>"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "src-resolve");
    }

    #[test]
    fn test_extension_attributes_and_content() {
        let set = build(
            r#"<xs:complexType name="base"><xs:sequence><xs:element name="a"/></xs:sequence>
                 <xs:attribute name="x" type="xs:string"/></xs:complexType>
               <xs:complexType name="derived"><xs:complexContent><xs:extension base="tns:base">
                 <xs:sequence><xs:element name="b"/></xs:sequence>
                 <xs:attribute name="y" type="xs:int" use="required"/>
               </xs:extension></xs:complexContent></xs:complexType>"#,
        )
        .unwrap();
        let derived = set.lookup_type(&t("derived")).unwrap().as_complex().unwrap();
        assert_eq!(derived.content_kind, Some(ContentKind::ElementOnly));
        let names: Vec<&str> = derived
            .attribute_uses()
            .iter()
            .map(|a| a.name.local_name.as_str())
            .collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_extension_duplicate_attribute() {
        let err = build(
            r#"<xs:complexType name="base"><xs:attribute name="x"/></xs:complexType>
               <xs:complexType name="derived"><xs:complexContent><xs:extension base="tns:base">
                 <xs:attribute name="x"/>
               </xs:extension></xs:complexContent></xs:complexType>"#,
        )
        .unwrap_err();
        assert_eq!(codes(&err), vec!["ct-props-correct.4"]);
    }

    #[test]
    fn test_restriction_prohibits_attribute() {
        let set = build(
            r#"<xs:complexType name="base"><xs:attribute name="x"/><xs:attribute name="y"/></xs:complexType>
               <xs:complexType name="derived"><xs:complexContent><xs:restriction base="tns:base">
                 <xs:attribute name="y" use="prohibited"/>
               </xs:restriction></xs:complexContent></xs:complexType>"#,
        )
        .unwrap();
        let derived = set.lookup_type(&t("derived")).unwrap().as_complex().unwrap();
        let names: Vec<&str> = derived
            .attribute_uses()
            .iter()
            .map(|a| a.name.local_name.as_str())
            .collect();
        assert_eq!(names, vec!["x"]);
    }

    #[test]
    fn test_restriction_adds_undeclared_attribute() {
        let err = build(
            r#"<xs:complexType name="base"><xs:attribute name="x"/></xs:complexType>
               <xs:complexType name="derived"><xs:complexContent><xs:restriction base="tns:base">
                 <xs:attribute name="z"/>
               </xs:restriction></xs:complexContent></xs:complexType>"#,
        )
        .unwrap_err();
        assert_eq!(codes(&err), vec!["derivation-ok-restriction.2.2"]);
    }

    #[test]
    fn test_complex_final_and_cycle() {
        let err = build(
            r#"<xs:complexType name="base" final="extension"/>
               <xs:complexType name="derived"><xs:complexContent><xs:extension base="tns:base"/></xs:complexContent></xs:complexType>"#,
        )
        .unwrap_err();
        assert_eq!(codes(&err), vec!["cos-ct-extends.1.1"]);

        let err = build(
            r#"<xs:complexType name="a"><xs:complexContent><xs:extension base="tns:b"/></xs:complexContent></xs:complexType>
               <xs:complexType name="b"><xs:complexContent><xs:extension base="tns:a"/></xs:complexContent></xs:complexType>"#,
        )
        .unwrap_err();
        assert_eq!(codes(&err), vec!["ct-props-correct.3"]);
        assert!(err.to_string().contains("circular complex type derivation"));
    }

    #[test]
    fn test_simple_content_value_type() {
        let set = build(
            r#"<xs:complexType name="price"><xs:simpleContent><xs:extension base="xs:decimal">
                 <xs:attribute name="currency" type="xs:string"/>
               </xs:extension></xs:simpleContent></xs:complexType>
               <xs:complexType name="small"><xs:simpleContent><xs:restriction base="tns:price">
                 <xs:maxExclusive value="100"/>
               </xs:restriction></xs:simpleContent></xs:complexType>"#,
        )
        .unwrap();
        let small = set.lookup_type(&t("small")).unwrap();
        assert_eq!(small.content_kind(), Some(ContentKind::Simple));
        let value = small.value_type().unwrap();
        let ns = crate::namespaces::NamespaceContext::new();
        assert!(value.validate("99.5", &ns).is_ok());
        assert!(value.validate("100", &ns).is_err());
        assert_eq!(small.as_complex().unwrap().attribute_uses().len(), 1);
    }

    #[test]
    fn test_simple_content_of_element_only_base() {
        let err = build(
            r#"<xs:complexType name="base"><xs:sequence><xs:element name="a"/></xs:sequence></xs:complexType>
               <xs:complexType name="bad"><xs:simpleContent><xs:extension base="tns:base"/></xs:simpleContent></xs:complexType>"#,
        )
        .unwrap_err();
        assert_eq!(codes(&err), vec!["src-ct.2"]);
    }

    #[test]
    fn test_attribute_group_expansion() {
        let set = build(
            r###"<xs:attributeGroup name="inner"><xs:attribute name="a"/><xs:anyAttribute namespace="##other"/></xs:attributeGroup>
               <xs:attributeGroup name="outer"><xs:attribute name="b"/><xs:attributeGroup ref="tns:inner"/></xs:attributeGroup>
               <xs:complexType name="T"><xs:attribute name="c"/><xs:attributeGroup ref="tns:outer"/>
                 <xs:anyAttribute namespace="urn:x ##local"/></xs:complexType>"###,
        )
        .unwrap();
        let outer = set.lookup_attribute_group(&t("outer")).unwrap();
        assert_eq!(outer.effective.as_ref().unwrap().len(), 2);
        let ty = set.lookup_type(&t("T")).unwrap().as_complex().unwrap();
        let effective = ty.effective.as_ref().unwrap();
        let names: Vec<&str> = effective
            .attributes
            .iter()
            .map(|a| a.name.local_name.as_str())
            .collect();
        assert_eq!(names, vec!["c", "b", "a"]);
        let wildcard = effective.wildcard.as_ref().unwrap();
        assert!(wildcard.is_namespace_allowed("urn:x"));
        assert!(!wildcard.is_namespace_allowed(""));
    }

    #[test]
    fn test_attribute_group_cycle_and_duplicates() {
        let err = build(
            r#"<xs:attributeGroup name="a"><xs:attributeGroup ref="tns:b"/></xs:attributeGroup>
               <xs:attributeGroup name="b"><xs:attributeGroup ref="tns:a"/></xs:attributeGroup>"#,
        )
        .unwrap_err();
        assert_eq!(codes(&err), vec!["src-attribute_group.3"]);

        let err = build(
            r#"<xs:attributeGroup name="g"><xs:attribute name="a" type="xs:int"/></xs:attributeGroup>
               <xs:complexType name="T"><xs:attribute name="a" type="xs:string"/><xs:attributeGroup ref="tns:g"/></xs:complexType>"#,
        )
        .unwrap_err();
        assert_eq!(codes(&err), vec!["ct-props-correct.4"]);
    }

    #[test]
    fn test_wildcard_intersection_of_equal_constraints() {
        let set = build(
            r###"<xs:attributeGroup name="g"><xs:anyAttribute namespace="##other"/></xs:attributeGroup>
               <xs:complexType name="T"><xs:attributeGroup ref="tns:g"/><xs:anyAttribute namespace="##other"/></xs:complexType>"###,
        )
        .unwrap();
        let ty = set.lookup_type(&t("T")).unwrap().as_complex().unwrap();
        let wildcard = ty.effective.as_ref().unwrap().wildcard.as_ref().unwrap();
        assert!(wildcard.is_namespace_allowed("urn:x"));
        assert!(!wildcard.is_namespace_allowed("urn:t"));
    }

    #[test]
    fn test_wildcard_intersection_not_expressible() {
        let main = format!(
            r###"<xs:schema {} xmlns:o="urn:o" targetNamespace="urn:t">
                 <xs:import namespace="urn:o" schemaLocation="o.xsd"/>
                 <xs:complexType name="T"><xs:attributeGroup ref="o:g"/><xs:anyAttribute namespace="##other"/></xs:complexType>
               </xs:schema>"###,
            XS
        );
        let other = format!(
            r###"<xs:schema {} targetNamespace="urn:o">
                 <xs:attributeGroup name="g"><xs:anyAttribute namespace="##other"/></xs:attributeGroup>
               </xs:schema>"###,
            XS
        );
        let provider = MemoryProvider::new()
            .with_file("main.xsd", main)
            .with_file("o.xsd", other);
        let err = build_schema_set(provider, "main.xsd").unwrap_err();
        assert_eq!(codes(&err), vec!["cos-aw-intersect"]);
    }

    #[test]
    fn test_substitution_group_closure_and_inferred_type() {
        let set = build(
            r#"<xs:element name="head" type="xs:string"/>
               <xs:element name="a" substitutionGroup="tns:head"/>
               <xs:element name="b" substitutionGroup="tns:a"/>
               <xs:element name="hidden" abstract="true" substitutionGroup="tns:head" type="xs:string"/>"#,
        )
        .unwrap();
        assert_eq!(set.substitution_members(&t("head")), &[t("a"), t("b")]);
        assert_eq!(set.substitution_members(&t("a")), &[t("b")]);
        let a = set.lookup_element(&t("a")).unwrap();
        assert_eq!(a.type_ref, TypeRef::Named(QName::xsd("string")));
        let b = set.lookup_element(&t("b")).unwrap();
        assert_eq!(b.type_ref, TypeRef::Named(QName::xsd("string")));
    }

    #[test]
    fn test_substitution_group_cycle() {
        let err = build(
            r#"<xs:element name="a" substitutionGroup="tns:b"/>
               <xs:element name="b" substitutionGroup="tns:a"/>"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "e-props-correct.6");
        let message = err.to_string();
        assert!(message.contains("substitution group"));
        assert!(message.contains("{urn:t}a") || message.contains("a'"));
    }

    #[test]
    fn test_substitution_member_type_must_derive() {
        let err = build(
            r#"<xs:element name="head" type="xs:int"/>
               <xs:element name="m" type="xs:string" substitutionGroup="tns:head"/>"#,
        )
        .unwrap_err();
        assert_eq!(codes(&err), vec!["e-props-correct.3"]);
    }

    #[test]
    fn test_substitution_head_final() {
        let err = build(
            r#"<xs:complexType name="base"/>
               <xs:complexType name="ext"><xs:complexContent><xs:extension base="tns:base">
                 <xs:attribute name="x"/></xs:extension></xs:complexContent></xs:complexType>
               <xs:element name="head" type="tns:base" final="extension"/>
               <xs:element name="m" type="tns:ext" substitutionGroup="tns:head"/>"#,
        )
        .unwrap_err();
        assert_eq!(codes(&err), vec!["e-props-correct.3"]);
    }

    #[test]
    fn test_substitution_head_block() {
        let set = build(
            r#"<xs:complexType name="base"/>
               <xs:complexType name="ext"><xs:complexContent><xs:extension base="tns:base">
                 <xs:attribute name="x"/></xs:extension></xs:complexContent></xs:complexType>
               <xs:element name="head" type="tns:base" block="extension"/>
               <xs:element name="m" type="tns:ext" substitutionGroup="tns:head"/>
               <xs:element name="n" type="tns:base" substitutionGroup="tns:head"/>"#,
        )
        .unwrap();
        assert_eq!(set.substitution_members(&t("head")), &[t("n")]);
    }

    #[test]
    fn test_default_values() {
        let set = build(
            r#"<xs:element name="n" type="xs:int" default="42"/>
               <xs:attribute name="flag" type="xs:boolean" fixed="true"/>"#,
        )
        .unwrap();
        let n = set.lookup_element(&t("n")).unwrap();
        assert!(n.value_constraint.as_ref().unwrap().value.is_some());
        let flag = set.lookup_attribute(&t("flag")).unwrap();
        assert!(flag.value_constraint.as_ref().unwrap().value.is_some());
    }

    #[test]
    fn test_invalid_default_values() {
        let err = build(
            r#"<xs:element name="n" type="xs:int" default="many"/>
               <xs:attribute name="id" type="xs:ID" default="x"/>
               <xs:element name="c" default="x"><xs:complexType><xs:sequence><xs:element name="a"/></xs:sequence></xs:complexType></xs:element>"#,
        )
        .unwrap_err();
        let mut found = codes(&err);
        found.sort();
        assert_eq!(
            found,
            vec!["a-props-correct.3", "cos-valid-default.2.1", "e-props-correct.2"]
        );
    }

    #[test]
    fn test_fixed_attribute_use_must_agree() {
        let err = build(
            r#"<xs:attribute name="v" type="xs:int" fixed="1"/>
               <xs:complexType name="T"><xs:attribute ref="tns:v" fixed="01"/></xs:complexType>
               <xs:complexType name="U"><xs:attribute ref="tns:v" default="2"/></xs:complexType>"#,
        )
        .unwrap_err();
        assert_eq!(codes(&err), vec!["au-props-correct.2"]);
    }

    #[test]
    fn test_group_expansion() {
        let set = build(
            r#"<xs:group name="inner"><xs:sequence><xs:element name="a"/></xs:sequence></xs:group>
               <xs:group name="outer"><xs:choice><xs:group ref="tns:inner"/><xs:element name="b"/></xs:choice></xs:group>
               <xs:complexType name="T"><xs:sequence><xs:group ref="tns:outer"/></xs:sequence></xs:complexType>"#,
        )
        .unwrap();
        let ty = set.lookup_type(&t("T")).unwrap().as_complex().unwrap();
        match ty.particle() {
            Some(Particle::Group(sequence)) => match &sequence.particles[0] {
                Particle::GroupRef(reference) => {
                    let target = reference.target.as_ref().unwrap();
                    assert_eq!(target.kind, GroupKind::Choice);
                    match &target.particles[0] {
                        Particle::GroupRef(inner) => assert!(inner.is_resolved()),
                        other => panic!("unexpected particle {:?}", other),
                    }
                }
                other => panic!("unexpected particle {:?}", other),
            },
            other => panic!("unexpected particle {:?}", other),
        }
    }

    #[test]
    fn test_group_cycle() {
        let err = build(
            r#"<xs:group name="a"><xs:sequence><xs:group ref="tns:b"/></xs:sequence></xs:group>
               <xs:group name="b"><xs:sequence><xs:group ref="tns:a"/></xs:sequence></xs:group>"#,
        )
        .unwrap_err();
        assert_eq!(codes(&err), vec!["mg-props-correct.2"]);
    }

    #[test]
    fn test_recursion_through_elements_is_allowed() {
        let set = build(
            r#"<xs:group name="tree"><xs:sequence>
                 <xs:element name="node" minOccurs="0"><xs:complexType><xs:group ref="tns:tree"/></xs:complexType></xs:element>
               </xs:sequence></xs:group>"#,
        );
        assert!(set.is_ok());
    }

    #[test]
    fn test_keyref_checks() {
        let err = build(
            r#"<xs:element name="root">
                 <xs:key name="k"><xs:selector xpath="tns:item"/><xs:field xpath="@id"/><xs:field xpath="@sub"/></xs:key>
                 <xs:keyref name="r" refer="tns:k"><xs:selector xpath="tns:ref"/><xs:field xpath="@to"/></xs:keyref>
                 <xs:keyref name="rr" refer="tns:r"><xs:selector xpath="tns:ref"/><xs:field xpath="@to"/></xs:keyref>
               </xs:element>"#,
        )
        .unwrap_err();
        assert_eq!(codes(&err), vec!["c-props-correct.2", "c-props-correct.1"]);
    }

    #[test]
    fn test_notation_requires_enumeration() {
        let err = build(r#"<xs:attribute name="n" type="xs:NOTATION"/>"#).unwrap_err();
        assert_eq!(err.code(), "enumeration-required-notation");
    }

    #[test]
    fn test_frozen_set_is_rejected() {
        let mut set = load_schema_set(
            MemoryProvider::new().with_file("a.xsd", format!("<xs:schema {}/>", XS)),
            "a.xsd",
        )
        .unwrap();
        Resolver::new().resolve(&mut set).unwrap();
        let err = Resolver::new().resolve(&mut set).unwrap_err();
        assert!(matches!(err, Error::Frozen(_)));
    }

    #[test]
    fn test_cancelled_resolution() {
        let mut set = load_schema_set(
            MemoryProvider::new().with_file(
                "a.xsd",
                format!(r#"<xs:schema {}><xs:simpleType name="s"><xs:restriction base="xs:string"/></xs:simpleType></xs:schema>"#, XS),
            ),
            "a.xsd",
        )
        .unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        let err = Resolver::new()
            .with_cancel_flag(flag)
            .resolve(&mut set)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(!set.is_frozen());
    }

    #[test]
    fn test_dependency_graph_order() {
        let mut graph = DependencyGraph::default();
        graph.add(QName::local("c"), vec![QName::local("b")]);
        graph.add(QName::local("b"), vec![QName::local("a"), QName::xsd("string")]);
        graph.add(QName::local("a"), vec![]);
        let (order, cycles) = graph.order();
        assert_eq!(order, vec![QName::local("a"), QName::local("b"), QName::local("c")]);
        assert!(cycles.is_empty());

        let mut graph = DependencyGraph::default();
        graph.add(QName::local("x"), vec![QName::local("x")]);
        let (_, cycles) = graph.order();
        assert_eq!(cycles, vec![vec![QName::local("x")]]);
    }
}
