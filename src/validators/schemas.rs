//! XML Schema documents
//!
//! A [`Schema`] is the result of parsing one schema document: its
//! document-level metadata ([`SchemaDocument`]) and the global components it
//! declares. The loader merges schemas into a [`SchemaSet`].
//!
//! [`SchemaSet`]: super::globals::SchemaSet

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use super::attributes::{AttributeDecl, AttributeGroup};
use super::base::{DerivationSet, Form, SourceInfo, TypeRef};
use super::complex_types::ComplexType;
use super::elements::ElementDecl;
use super::globals::{ComponentId, GlobalMaps, NotationDecl};
use super::groups::{GroupDefinition, GroupRef};
use super::identities::IdentityConstraint;
use super::simple_types::SimpleType;
use super::visitor::{walk_components_mut, VisitorMut};
use super::wildcards::{NamespaceConstraint, Wildcard};
use crate::namespaces::{NamespaceContext, QName};

/// An `include` or `import` directive, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `xs:include`
    Include {
        /// `schemaLocation` as written
        location: String,
        /// Directive site
        source: SourceInfo,
    },
    /// `xs:import`
    Import {
        /// Imported namespace, empty for no namespace
        namespace: String,
        /// `schemaLocation` as written, if any
        location: Option<String>,
        /// Directive site
        source: SourceInfo,
    },
}

impl Directive {
    /// `schemaLocation`, if any
    pub fn location(&self) -> Option<&str> {
        match self {
            Directive::Include { location, .. } => Some(location),
            Directive::Import { location, .. } => location.as_deref(),
        }
    }

    /// Directive site
    pub fn source(&self) -> &SourceInfo {
        match self {
            Directive::Include { source, .. } | Directive::Import { source, .. } => source,
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Include { location, .. } => write!(f, "include '{}'", location),
            Directive::Import {
                namespace,
                location: Some(location),
                ..
            } => write!(f, "import '{}' from '{}'", namespace, location),
            Directive::Import { namespace, .. } => write!(f, "import '{}'", namespace),
        }
    }
}

/// Document-level metadata of a schema document
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    /// Canonical location the document was loaded from
    pub location: String,
    /// Target namespace, empty for none
    pub target_namespace: String,
    /// Prefix bindings declared on the `schema` element
    pub namespaces: Arc<NamespaceContext>,
    /// `elementFormDefault`
    pub element_form_default: Form,
    /// `attributeFormDefault`
    pub attribute_form_default: Form,
    /// `blockDefault`
    pub block_default: DerivationSet,
    /// `finalDefault`
    pub final_default: DerivationSet,
    /// `version` attribute
    pub version: Option<String>,
    /// Directives in document order
    pub directives: Vec<Directive>,
    /// Whether the document was included as a chameleon
    pub chameleon: bool,
}

impl SchemaDocument {
    /// Create metadata for a document with the given target namespace
    pub fn new(location: impl Into<String>, target_namespace: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            target_namespace: target_namespace.into(),
            namespaces: Arc::new(NamespaceContext::new()),
            element_form_default: Form::Unqualified,
            attribute_form_default: Form::Unqualified,
            block_default: DerivationSet::default(),
            final_default: DerivationSet::default(),
            version: None,
            directives: Vec::new(),
            chameleon: false,
        }
    }

    /// Namespaces imported by this document
    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.directives.iter().filter_map(|d| match d {
            Directive::Import { namespace, .. } => Some(namespace.as_str()),
            _ => None,
        })
    }
}

/// A parsed schema document
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Document metadata
    pub document: SchemaDocument,
    /// Global components declared in the document
    pub components: GlobalMaps,
    /// Substitution group members by head, in document order
    pub substitution_groups: IndexMap<QName, Vec<QName>>,
    /// Schema component ids
    pub ids: IndexMap<String, ComponentId>,
}

impl Schema {
    /// Create an empty schema for a document
    pub fn new(document: SchemaDocument) -> Self {
        Self {
            document,
            components: GlobalMaps::new(),
            substitution_groups: IndexMap::new(),
            ids: IndexMap::new(),
        }
    }

    /// Target namespace of the document
    pub fn target_namespace(&self) -> &str {
        &self.document.target_namespace
    }

    /// Namespaces imported by the document
    pub fn imported_namespaces(&self) -> IndexSet<String> {
        self.document.imports().map(str::to_string).collect()
    }

    /// Settle the document into `namespace`
    ///
    /// For a document without a target namespace included from a document
    /// of namespace `namespace`, every no-namespace component name and
    /// reference moves into `namespace`. In every case `##targetNamespace`
    /// wildcard tokens are replaced by the effective target namespace.
    pub fn rehome(&mut self, namespace: &str) {
        let chameleon = self.document.target_namespace.is_empty() && !namespace.is_empty();
        let mut rehome = Rehome {
            namespace,
            rename: chameleon,
        };
        walk_components_mut(&mut rehome, &mut self.components);
        if !chameleon {
            return;
        }

        let maps = &mut self.components;
        maps.types = std::mem::take(&mut maps.types)
            .into_iter()
            .map(|(name, t)| (t.name().cloned().unwrap_or(name), t))
            .collect();
        maps.elements = rekey(std::mem::take(&mut maps.elements), |e| &e.name);
        maps.attributes = rekey(std::mem::take(&mut maps.attributes), |a| &a.name);
        maps.groups = rekey(std::mem::take(&mut maps.groups), |g| &g.name);
        maps.attribute_groups = rekey(std::mem::take(&mut maps.attribute_groups), |g| &g.name);
        maps.notations = rekey(std::mem::take(&mut maps.notations), |n| &n.name);
        maps.identity_constraints =
            rekey(std::mem::take(&mut maps.identity_constraints), |c| &c.name);

        self.substitution_groups = std::mem::take(&mut self.substitution_groups)
            .into_iter()
            .map(|(mut head, mut members)| {
                rehome_name(&mut head, namespace);
                for member in &mut members {
                    rehome_name(member, namespace);
                }
                (head, members)
            })
            .collect();
        self.document.target_namespace = namespace.to_string();
        self.document.chameleon = true;
    }
}

fn rekey<T>(map: IndexMap<QName, T>, key: impl Fn(&T) -> &QName) -> IndexMap<QName, T> {
    map.into_values().map(|v| (key(&v).clone(), v)).collect()
}

fn rehome_name(name: &mut QName, namespace: &str) {
    if name.namespace.is_empty() {
        name.namespace = namespace.to_string();
    }
}

struct Rehome<'a> {
    namespace: &'a str,
    rename: bool,
}

impl Rehome<'_> {
    fn name(&self, name: &mut QName) {
        if self.rename {
            rehome_name(name, self.namespace);
        }
    }

    fn source_namespace(&self, source_namespace: &mut String) {
        if self.rename && source_namespace.is_empty() {
            *source_namespace = self.namespace.to_string();
        }
    }
}

impl VisitorMut for Rehome<'_> {
    fn visit_element(&mut self, element: &mut ElementDecl) {
        if element.is_global || element.is_reference || element.form.is_qualified() {
            self.name(&mut element.name);
        }
        if let Some(head) = &mut element.substitution_group {
            self.name(head);
        }
        for constraint in &mut element.constraints {
            self.name(constraint);
        }
        self.source_namespace(&mut element.source_namespace);
    }

    fn visit_attribute(&mut self, attribute: &mut AttributeDecl) {
        if attribute.is_global || attribute.is_reference || attribute.form.is_qualified() {
            self.name(&mut attribute.name);
        }
        self.source_namespace(&mut attribute.source_namespace);
    }

    fn visit_simple_type(&mut self, simple_type: &mut SimpleType) {
        if let Some(name) = &mut simple_type.name {
            self.name(name);
        }
        self.source_namespace(&mut simple_type.source_namespace);
    }

    fn visit_complex_type(&mut self, complex_type: &mut ComplexType) {
        if let Some(name) = &mut complex_type.name {
            self.name(name);
        }
        for group in &mut complex_type.attribute_groups {
            self.name(group);
        }
        self.source_namespace(&mut complex_type.source_namespace);
    }

    fn visit_type_ref(&mut self, type_ref: &mut TypeRef) {
        match type_ref {
            TypeRef::Placeholder(name) | TypeRef::OfElement(name) | TypeRef::OfAttribute(name) => {
                self.name(name)
            }
            _ => {}
        }
    }

    fn visit_group_ref(&mut self, group_ref: &mut GroupRef) {
        self.name(&mut group_ref.name);
    }

    fn visit_wildcard(&mut self, wildcard: &mut Wildcard) {
        if self.rename {
            if wildcard.target_namespace.is_empty() {
                wildcard.target_namespace = self.namespace.to_string();
            }
            if let NamespaceConstraint::Other(excluded) = &mut wildcard.namespace {
                if excluded.is_empty() {
                    *excluded = self.namespace.to_string();
                }
            }
        }
        wildcard.namespace.resolve_target(self.namespace);
    }

    fn visit_group_definition(&mut self, group: &mut GroupDefinition) {
        self.name(&mut group.name);
        self.source_namespace(&mut group.source_namespace);
    }

    fn visit_attribute_group(&mut self, group: &mut AttributeGroup) {
        self.name(&mut group.name);
        for reference in &mut group.attribute_groups {
            self.name(reference);
        }
        self.source_namespace(&mut group.source_namespace);
    }

    fn visit_notation(&mut self, notation: &mut NotationDecl) {
        self.name(&mut notation.name);
        self.source_namespace(&mut notation.source_namespace);
    }

    fn visit_identity_constraint(&mut self, constraint: &mut IdentityConstraint) {
        self.name(&mut constraint.name);
        if let Some(refer) = &mut constraint.refer {
            self.name(refer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::base::Form;
    use crate::validators::complex_types::Content;
    use crate::validators::groups::{GroupKind, ModelGroup};
    use crate::validators::particles::{Occurs, Particle};
    use crate::validators::wildcards::AnyElement;
    use crate::namespaces::TARGET_NAMESPACE_PLACEHOLDER;

    fn chameleon() -> Schema {
        let mut schema = Schema::new(SchemaDocument::new("inc.xsd", ""));
        let mut ct = ComplexType::new(Some(QName::local("T")));
        let mut sequence = ModelGroup::new(GroupKind::Sequence);
        let mut local = ElementDecl::new(QName::local("child"));
        local.type_ref = TypeRef::Placeholder(QName::local("T"));
        sequence.particles.push(Particle::Element(Box::new(local)));
        let mut wildcard = Wildcard::new("");
        wildcard.namespace =
            NamespaceConstraint::Enumeration(vec![TARGET_NAMESPACE_PLACEHOLDER.to_string()]);
        sequence.particles.push(Particle::Any(AnyElement {
            wildcard,
            occurs: Occurs::once(),
        }));
        ct.content = Content::ElementContent {
            particle: Particle::Group(sequence),
        };
        schema
            .components
            .add_type(QName::local("T"), super::super::globals::TypeDefinition::Complex(ct))
            .unwrap();
        let mut root = ElementDecl::new(QName::local("item"));
        root.is_global = true;
        root.form = Form::Qualified;
        root.type_ref = TypeRef::Placeholder(QName::local("T"));
        root.substitution_group = Some(QName::local("head"));
        schema.components.add_element(root).unwrap();
        schema
            .substitution_groups
            .insert(QName::local("head"), vec![QName::local("item")]);
        schema
    }

    #[test]
    fn test_chameleon_rehome() {
        let mut schema = chameleon();
        schema.rehome("urn:a");
        assert_eq!(schema.target_namespace(), "urn:a");
        assert!(schema.document.chameleon);

        let item = &schema.components.elements[&QName::new("urn:a", "item")];
        assert_eq!(item.type_ref, TypeRef::Placeholder(QName::new("urn:a", "T")));
        assert_eq!(item.substitution_group, Some(QName::new("urn:a", "head")));
        assert_eq!(item.source_namespace, "urn:a");
        assert_eq!(
            schema.substitution_groups[&QName::new("urn:a", "head")],
            vec![QName::new("urn:a", "item")]
        );

        let ty = schema.components.types[&QName::new("urn:a", "T")]
            .as_complex()
            .unwrap();
        match ty.particle() {
            Some(Particle::Group(g)) => {
                match &g.particles[0] {
                    Particle::Element(e) => {
                        assert_eq!(e.name, QName::local("child"));
                        assert_eq!(e.type_ref, TypeRef::Placeholder(QName::new("urn:a", "T")));
                    }
                    other => panic!("unexpected particle {:?}", other),
                }
                match &g.particles[1] {
                    Particle::Any(any) => assert_eq!(
                        any.wildcard.namespace,
                        NamespaceConstraint::Enumeration(vec!["urn:a".to_string()])
                    ),
                    other => panic!("unexpected particle {:?}", other),
                }
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_rehome_same_namespace_only_resolves_wildcards() {
        let mut schema = chameleon();
        schema.rehome("");
        assert!(!schema.document.chameleon);
        assert!(schema.components.elements.contains_key(&QName::local("item")));
        let ty = schema.components.types[&QName::local("T")].as_complex().unwrap();
        match ty.particle() {
            Some(Particle::Group(g)) => match &g.particles[1] {
                Particle::Any(any) => assert_eq!(
                    any.wildcard.namespace,
                    NamespaceConstraint::Enumeration(vec![String::new()])
                ),
                other => panic!("unexpected particle {:?}", other),
            },
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_directives() {
        let mut document = SchemaDocument::new("main.xsd", "urn:a");
        document.directives.push(Directive::Import {
            namespace: "urn:b".to_string(),
            location: None,
            source: SourceInfo::new("/schema/import"),
        });
        document.directives.push(Directive::Include {
            location: "inc.xsd".to_string(),
            source: SourceInfo::new("/schema/include"),
        });
        assert_eq!(document.imports().collect::<Vec<_>>(), vec!["urn:b"]);
        assert_eq!(document.directives[1].location(), Some("inc.xsd"));
        assert_eq!(document.directives[0].to_string(), "import 'urn:b'");
    }
}
