//! Global XSD declarations management
//!
//! This module provides [`GlobalMaps`], the tables of global components
//! (types, elements, attributes, groups, attribute groups, notations and
//! identity constraints) kept by each parsed schema document, and
//! [`SchemaSet`], the merged tables of every loaded document together with
//! substitution groups, namespace imports and schema component ids.
//!
//! A schema set is mutable while it is loaded and resolved. Once frozen it
//! only exposes read accessors and can be shared across threads.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::error::{Diagnostic, Error, Result};
use crate::namespaces::QName;

use super::attributes::{AttributeDecl, AttributeGroup};
use super::base::{SourceInfo, TypeRef};
use super::builtins::{builtin_type, BuiltinType};
use super::complex_types::{ComplexType, ContentKind};
use super::elements::ElementDecl;
use super::groups::{GroupDefinition, ModelGroup};
use super::identities::IdentityConstraint;
use super::schemas::SchemaDocument;
use super::simple_types::{builtin_info, SimpleType, SimpleTypeInfo};

/// XSD Notation declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotationDecl {
    /// Notation name
    pub name: QName,
    /// Public identifier
    pub public: Option<String>,
    /// System identifier
    pub system: Option<String>,
    /// Target namespace of the declaring document
    pub source_namespace: String,
    /// Declaration site
    pub source: SourceInfo,
}

/// A global type definition
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    /// Simple type
    Simple(SimpleType),
    /// Complex type
    Complex(ComplexType),
}

impl TypeDefinition {
    /// Type name
    pub fn name(&self) -> Option<&QName> {
        match self {
            TypeDefinition::Simple(t) => t.name.as_ref(),
            TypeDefinition::Complex(t) => t.name.as_ref(),
        }
    }

    /// Declaration site
    pub fn source(&self) -> &SourceInfo {
        match self {
            TypeDefinition::Simple(t) => &t.source,
            TypeDefinition::Complex(t) => &t.source,
        }
    }

    /// Check if this is a simple type
    pub fn is_simple(&self) -> bool {
        matches!(self, TypeDefinition::Simple(_))
    }

    /// Get as simple type
    pub fn as_simple(&self) -> Option<&SimpleType> {
        match self {
            TypeDefinition::Simple(t) => Some(t),
            _ => None,
        }
    }

    /// Get as complex type
    pub fn as_complex(&self) -> Option<&ComplexType> {
        match self {
            TypeDefinition::Complex(t) => Some(t),
            _ => None,
        }
    }
}

/// A type definition as returned by lookups: user-defined or built-in
#[derive(Debug, Clone, Copy)]
pub enum TypeView<'a> {
    /// User-defined simple type
    Simple(&'a SimpleType),
    /// User-defined complex type
    Complex(&'a ComplexType),
    /// Built-in type, xs:anyType included
    Builtin(&'static BuiltinType),
}

impl<'a> TypeView<'a> {
    /// Type name, `None` for anonymous types
    pub fn name(&self) -> Option<QName> {
        match self {
            TypeView::Simple(t) => t.name.clone(),
            TypeView::Complex(t) => t.name.clone(),
            TypeView::Builtin(b) => Some(b.qname()),
        }
    }

    /// Check if this is a simple type
    pub fn is_simple(&self) -> bool {
        match self {
            TypeView::Simple(_) => true,
            TypeView::Complex(_) => false,
            TypeView::Builtin(b) => !b.is_complex(),
        }
    }

    /// Check if this is a complex type
    pub fn is_complex(&self) -> bool {
        !self.is_simple()
    }

    /// Get as user-defined complex type
    pub fn as_complex(&self) -> Option<&'a ComplexType> {
        match self {
            TypeView::Complex(t) => Some(t),
            _ => None,
        }
    }

    /// Resolved value type: the type itself for simple types, the content
    /// type for complex types with simple content
    pub fn value_type(&self) -> Option<Arc<SimpleTypeInfo>> {
        match self {
            TypeView::Simple(t) => t.info.clone(),
            TypeView::Builtin(b) => builtin_info(b.name),
            TypeView::Complex(t) => match &t.content {
                super::complex_types::Content::SimpleContent(sc) => sc.value_type.clone(),
                _ => None,
            },
        }
    }

    /// Content kind; simple types have simple content and xs:anyType mixed content
    pub fn content_kind(&self) -> Option<ContentKind> {
        match self {
            TypeView::Simple(_) => Some(ContentKind::Simple),
            TypeView::Builtin(b) if b.is_complex() => Some(ContentKind::Mixed),
            TypeView::Builtin(_) => Some(ContentKind::Simple),
            TypeView::Complex(t) => t.content_kind,
        }
    }
}

fn duplicate(what: &str, name: &QName, source: &SourceInfo) -> Diagnostic {
    source.annotate(
        Diagnostic::parse(format!("duplicate {} '{}'", what, name))
            .with_code("sch-props-correct.2")
            .with_actual(name.to_string()),
    )
}

/// Tables of global components, keyed by qualified name in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalMaps {
    /// Type definitions
    pub types: IndexMap<QName, TypeDefinition>,
    /// Element declarations
    pub elements: IndexMap<QName, ElementDecl>,
    /// Attribute declarations
    pub attributes: IndexMap<QName, AttributeDecl>,
    /// Model group definitions
    pub groups: IndexMap<QName, GroupDefinition>,
    /// Attribute group definitions
    pub attribute_groups: IndexMap<QName, AttributeGroup>,
    /// Notation declarations
    pub notations: IndexMap<QName, NotationDecl>,
    /// Identity constraints, global per schema set
    pub identity_constraints: IndexMap<QName, IdentityConstraint>,
}

impl GlobalMaps {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of global components
    pub fn len(&self) -> usize {
        self.types.len()
            + self.elements.len()
            + self.attributes.len()
            + self.groups.len()
            + self.attribute_groups.len()
            + self.notations.len()
            + self.identity_constraints.len()
    }

    /// Check if there are no components
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a type definition
    pub fn add_type(&mut self, name: QName, definition: TypeDefinition) -> std::result::Result<(), Diagnostic> {
        if self.types.contains_key(&name) {
            return Err(duplicate("type definition", &name, definition.source()));
        }
        self.types.insert(name, definition);
        Ok(())
    }

    /// Register an element declaration
    pub fn add_element(&mut self, element: ElementDecl) -> std::result::Result<(), Diagnostic> {
        if self.elements.contains_key(&element.name) {
            return Err(duplicate("element declaration", &element.name, &element.source));
        }
        self.elements.insert(element.name.clone(), element);
        Ok(())
    }

    /// Register an attribute declaration
    pub fn add_attribute(&mut self, attribute: AttributeDecl) -> std::result::Result<(), Diagnostic> {
        if self.attributes.contains_key(&attribute.name) {
            return Err(duplicate("attribute declaration", &attribute.name, &attribute.source));
        }
        self.attributes.insert(attribute.name.clone(), attribute);
        Ok(())
    }

    /// Register a model group definition
    pub fn add_group(&mut self, group: GroupDefinition) -> std::result::Result<(), Diagnostic> {
        if self.groups.contains_key(&group.name) {
            return Err(duplicate("model group definition", &group.name, &group.source));
        }
        self.groups.insert(group.name.clone(), group);
        Ok(())
    }

    /// Register an attribute group definition
    pub fn add_attribute_group(&mut self, group: AttributeGroup) -> std::result::Result<(), Diagnostic> {
        if self.attribute_groups.contains_key(&group.name) {
            return Err(duplicate("attribute group definition", &group.name, &group.source));
        }
        self.attribute_groups.insert(group.name.clone(), group);
        Ok(())
    }

    /// Register a notation declaration
    pub fn add_notation(&mut self, notation: NotationDecl) -> std::result::Result<(), Diagnostic> {
        if self.notations.contains_key(&notation.name) {
            return Err(duplicate("notation declaration", &notation.name, &notation.source));
        }
        self.notations.insert(notation.name.clone(), notation);
        Ok(())
    }

    /// Register an identity constraint
    pub fn add_identity_constraint(
        &mut self,
        constraint: IdentityConstraint,
    ) -> std::result::Result<(), Diagnostic> {
        if self.identity_constraints.contains_key(&constraint.name) {
            return Err(duplicate("identity constraint", &constraint.name, &constraint.source)
                .with_code("c-props-correct.1"));
        }
        self.identity_constraints
            .insert(constraint.name.clone(), constraint);
        Ok(())
    }

    /// Move every component of `other` into these tables
    ///
    /// Components are appended in `other`'s order; the first duplicate
    /// aborts the merge.
    pub fn merge(&mut self, other: GlobalMaps) -> std::result::Result<(), Diagnostic> {
        for (name, definition) in other.types {
            self.add_type(name, definition)?;
        }
        for (_, element) in other.elements {
            self.add_element(element)?;
        }
        for (_, attribute) in other.attributes {
            self.add_attribute(attribute)?;
        }
        for (_, group) in other.groups {
            self.add_group(group)?;
        }
        for (_, group) in other.attribute_groups {
            self.add_attribute_group(group)?;
        }
        for (_, notation) in other.notations {
            self.add_notation(notation)?;
        }
        for (_, constraint) in other.identity_constraints {
            self.add_identity_constraint(constraint)?;
        }
        Ok(())
    }

    /// Look up a user type or a built-in
    pub fn lookup_type(&self, name: &QName) -> Option<TypeView<'_>> {
        match self.types.get(name) {
            Some(TypeDefinition::Simple(t)) => Some(TypeView::Simple(t)),
            Some(TypeDefinition::Complex(t)) => Some(TypeView::Complex(t)),
            None => builtin_type(name).map(TypeView::Builtin),
        }
    }

    /// Whether a type name resolves to a user type or a built-in
    pub fn has_type(&self, name: &QName) -> bool {
        self.types.contains_key(name) || builtin_type(name).is_some()
    }
}

/// Component carrying a schema component `id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentId {
    /// Description of the component, e.g. `element 'root'`
    pub component: String,
    /// Declaration site
    pub source: SourceInfo,
}

/// Component counts of a schema set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ComponentCounts {
    /// Schema documents
    pub documents: usize,
    /// Type definitions
    pub types: usize,
    /// Element declarations
    pub elements: usize,
    /// Attribute declarations
    pub attributes: usize,
    /// Model group definitions
    pub groups: usize,
    /// Attribute group definitions
    pub attribute_groups: usize,
    /// Notation declarations
    pub notations: usize,
    /// Identity constraints
    pub identity_constraints: usize,
    /// Substitution group heads
    pub substitution_groups: usize,
}

/// A set of schema documents merged into one unit of validation
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    components: GlobalMaps,
    substitution_groups: IndexMap<QName, Vec<QName>>,
    imported_namespaces: IndexMap<String, IndexSet<String>>,
    ids: IndexMap<String, ComponentId>,
    documents: Vec<SchemaDocument>,
    frozen: bool,
}

impl SchemaSet {
    /// Create an empty, unfrozen schema set
    pub fn new() -> Self {
        Self::default()
    }

    fn check_mutable(&self, operation: &str) -> Result<()> {
        if self.frozen {
            Err(Error::Frozen(operation.to_string()))
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// Merge the components of one parsed document
    pub fn add_components(&mut self, components: GlobalMaps) -> Result<()> {
        self.check_mutable("add components")?;
        self.components.merge(components)?;
        Ok(())
    }

    /// Append substitution group members of one document
    pub fn add_substitution_members(&mut self, head: QName, members: Vec<QName>) -> Result<()> {
        self.check_mutable("add substitution group members")?;
        let entry = self.substitution_groups.entry(head).or_default();
        for member in members {
            if !entry.contains(&member) {
                entry.push(member);
            }
        }
        Ok(())
    }

    /// Record that documents of `source` import `imported`
    pub fn add_import(&mut self, source: &str, imported: &str) -> Result<()> {
        self.check_mutable("add import")?;
        self.imported_namespaces
            .entry(source.to_string())
            .or_default()
            .insert(imported.to_string());
        Ok(())
    }

    /// Register a schema component id, rejecting duplicates
    ///
    /// The same id seen again from the same document is accepted, which
    /// happens when a chameleon document is included into several namespaces.
    pub fn add_id(&mut self, id: &str, component: ComponentId) -> Result<()> {
        self.check_mutable("add id")?;
        if let Some(previous) = self.ids.get(id) {
            if previous.source.document.is_some()
                && previous.source.document == component.source.document
                && previous.source.path == component.source.path
            {
                return Ok(());
            }
            return Err(component
                .source
                .annotate(
                    Diagnostic::parse(format!(
                        "duplicate id '{}', already used by {}",
                        id, previous.component
                    ))
                    .with_code("schema-duplicate-id")
                    .with_actual(id),
                )
                .into());
        }
        self.ids.insert(id.to_string(), component);
        Ok(())
    }

    /// Record the metadata of a loaded document
    pub fn add_document(&mut self, document: SchemaDocument) -> Result<()> {
        self.check_mutable("add document")?;
        self.documents.push(document);
        Ok(())
    }

    /// Mutable access to the component tables
    pub fn components_mut(&mut self) -> Result<&mut GlobalMaps> {
        self.check_mutable("modify components")?;
        Ok(&mut self.components)
    }

    /// Replace the substitution group table
    pub fn set_substitution_groups(&mut self, groups: IndexMap<QName, Vec<QName>>) -> Result<()> {
        self.check_mutable("replace substitution groups")?;
        self.substitution_groups = groups;
        Ok(())
    }

    /// Mark the set immutable
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Whether the set has been frozen
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Freeze and wrap for sharing across threads
    pub fn into_shared(mut self) -> Arc<SchemaSet> {
        self.freeze();
        Arc::new(self)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Look up a global element declaration
    pub fn lookup_element(&self, name: &QName) -> Option<&ElementDecl> {
        self.components.elements.get(name)
    }

    /// Look up a type definition, user-defined first, then built-in
    pub fn lookup_type(&self, name: &QName) -> Option<TypeView<'_>> {
        self.components.lookup_type(name)
    }

    /// Look up a global attribute declaration
    pub fn lookup_attribute(&self, name: &QName) -> Option<&AttributeDecl> {
        self.components.attributes.get(name)
    }

    /// Look up a model group definition
    pub fn lookup_group(&self, name: &QName) -> Option<&Arc<ModelGroup>> {
        self.components.groups.get(name).map(|g| &g.group)
    }

    /// Look up a model group definition with its metadata
    pub fn lookup_group_definition(&self, name: &QName) -> Option<&GroupDefinition> {
        self.components.groups.get(name)
    }

    /// Look up an attribute group definition
    pub fn lookup_attribute_group(&self, name: &QName) -> Option<&AttributeGroup> {
        self.components.attribute_groups.get(name)
    }

    /// Look up a notation declaration
    pub fn lookup_notation(&self, name: &QName) -> Option<&NotationDecl> {
        self.components.notations.get(name)
    }

    /// Look up an identity constraint
    pub fn identity_constraint(&self, name: &QName) -> Option<&IdentityConstraint> {
        self.components.identity_constraints.get(name)
    }

    /// Members that may substitute for `head`, transitively once resolved
    pub fn substitution_members(&self, head: &QName) -> &[QName] {
        self.substitution_groups
            .get(head)
            .map(|m| m.as_slice())
            .unwrap_or(&[])
    }

    /// Namespaces imported by documents of namespace `source`
    pub fn imported_namespaces(&self, source: &str) -> Option<&IndexSet<String>> {
        self.imported_namespaces.get(source)
    }

    /// Resolve a type reference held by a component
    ///
    /// Anonymous types are returned as they are; element and attribute
    /// references follow the referenced global declaration.
    pub fn resolve_type_ref<'a>(&'a self, type_ref: &'a TypeRef) -> Option<TypeView<'a>> {
        match type_ref {
            TypeRef::Named(name) => self.lookup_type(name),
            TypeRef::Simple(t) => Some(TypeView::Simple(t)),
            TypeRef::Complex(t) => Some(TypeView::Complex(t)),
            TypeRef::OfElement(name) => self
                .lookup_element(name)
                .filter(|e| !matches!(e.type_ref, TypeRef::OfElement(ref n) if n == name))
                .and_then(|e| self.resolve_type_ref(&e.type_ref)),
            TypeRef::OfAttribute(name) => self
                .lookup_attribute(name)
                .filter(|a| !matches!(a.type_ref, TypeRef::OfAttribute(ref n) if n == name))
                .and_then(|a| self.resolve_type_ref(&a.type_ref)),
            TypeRef::Placeholder(_) | TypeRef::Inferred => None,
        }
    }

    /// Type of an element declaration or reference
    pub fn element_type<'a>(&'a self, element: &'a ElementDecl) -> Option<TypeView<'a>> {
        self.resolve_type_ref(&element.type_ref)
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    /// Read-only access to the component tables
    pub fn components(&self) -> &GlobalMaps {
        &self.components
    }

    /// Global element declarations in load order
    pub fn elements(&self) -> impl Iterator<Item = (&QName, &ElementDecl)> {
        self.components.elements.iter()
    }

    /// Global type definitions in load order
    pub fn types(&self) -> impl Iterator<Item = (&QName, &TypeDefinition)> {
        self.components.types.iter()
    }

    /// Global attribute declarations in load order
    pub fn attributes(&self) -> impl Iterator<Item = (&QName, &AttributeDecl)> {
        self.components.attributes.iter()
    }

    /// Model group definitions in load order
    pub fn groups(&self) -> impl Iterator<Item = (&QName, &GroupDefinition)> {
        self.components.groups.iter()
    }

    /// Attribute group definitions in load order
    pub fn attribute_groups(&self) -> impl Iterator<Item = (&QName, &AttributeGroup)> {
        self.components.attribute_groups.iter()
    }

    /// Notation declarations in load order
    pub fn notations(&self) -> impl Iterator<Item = (&QName, &NotationDecl)> {
        self.components.notations.iter()
    }

    /// Identity constraints in load order
    pub fn identity_constraints(&self) -> impl Iterator<Item = (&QName, &IdentityConstraint)> {
        self.components.identity_constraints.iter()
    }

    /// Substitution groups, head to members
    pub fn substitution_groups(&self) -> impl Iterator<Item = (&QName, &Vec<QName>)> {
        self.substitution_groups.iter()
    }

    /// Schema component ids and the components carrying them
    pub fn ids(&self) -> impl Iterator<Item = (&str, &ComponentId)> {
        self.ids.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Metadata of the loaded documents, in load order
    pub fn documents(&self) -> &[SchemaDocument] {
        &self.documents
    }

    /// Component counts
    pub fn counts(&self) -> ComponentCounts {
        ComponentCounts {
            documents: self.documents.len(),
            types: self.components.types.len(),
            elements: self.components.elements.len(),
            attributes: self.components.attributes.len(),
            groups: self.components.groups.len(),
            attribute_groups: self.components.attribute_groups.len(),
            notations: self.components.notations.len(),
            identity_constraints: self.components.identity_constraints.len(),
            substitution_groups: self.substitution_groups.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::validators::simple_types::SimpleDerivation;

    fn string_type(name: &str) -> TypeDefinition {
        TypeDefinition::Simple(SimpleType::new(
            Some(QName::new("urn:t", name)),
            SimpleDerivation::Restriction {
                base: TypeRef::Named(QName::xsd("string")),
                facets: Vec::new(),
            },
        ))
    }

    #[test]
    fn test_duplicate_element() {
        let mut maps = GlobalMaps::new();
        maps.add_element(ElementDecl::new(QName::new("urn:t", "root"))).unwrap();
        let err = maps
            .add_element(ElementDecl::new(QName::new("urn:t", "root")))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SchemaParse);
        assert!(err
            .message
            .contains("duplicate element declaration '{urn:t}root'"));
    }

    #[test]
    fn test_kinds_have_separate_name_spaces() {
        let mut maps = GlobalMaps::new();
        maps.add_type(QName::new("urn:t", "x"), string_type("x")).unwrap();
        maps.add_element(ElementDecl::new(QName::new("urn:t", "x"))).unwrap();
        maps.add_attribute(AttributeDecl::new(QName::new("urn:t", "x"))).unwrap();
        assert_eq!(maps.len(), 3);
    }

    #[test]
    fn test_merge_rejects_duplicates() {
        let mut a = GlobalMaps::new();
        a.add_type(QName::new("urn:t", "T"), string_type("T")).unwrap();
        let mut b = GlobalMaps::new();
        b.add_type(QName::new("urn:t", "T"), string_type("T")).unwrap();
        assert!(a.merge(b).is_err());
    }

    #[test]
    fn test_lookup_type_falls_back_to_builtins() {
        let set = SchemaSet::new();
        assert!(set.lookup_type(&QName::xsd("string")).unwrap().is_simple());
        assert!(set.lookup_type(&QName::xsd("anyType")).unwrap().is_complex());
        assert!(set.lookup_type(&QName::local("string")).is_none());
    }

    #[test]
    fn test_frozen_set_rejects_mutation() {
        let mut set = SchemaSet::new();
        set.add_import("urn:a", "urn:b").unwrap();
        set.freeze();
        assert!(set.is_frozen());
        let err = set.add_components(GlobalMaps::new()).unwrap_err();
        assert!(matches!(err, Error::Frozen(_)));
        assert!(set.components_mut().is_err());
        assert!(set.imported_namespaces("urn:a").unwrap().contains("urn:b"));
    }

    #[test]
    fn test_duplicate_ids() {
        let mut set = SchemaSet::new();
        let mut source = SourceInfo::new("/schema/element[@name='a']");
        source.document = Some(Arc::from("a.xsd"));
        let id = |component: &str, source: &SourceInfo| ComponentId {
            component: component.to_string(),
            source: source.clone(),
        };
        set.add_id("x1", id("element 'a'", &source)).unwrap();
        set.add_id("x1", id("element 'a'", &source)).unwrap();
        let mut other = source.clone();
        other.path = "/schema/element[@name='b']".to_string();
        let err = set.add_id("x1", id("element 'b'", &other)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaParse);
    }

    #[test]
    fn test_substitution_members_keep_order() {
        let mut set = SchemaSet::new();
        let head = QName::local("head");
        set.add_substitution_members(head.clone(), vec![QName::local("b"), QName::local("a")])
            .unwrap();
        set.add_substitution_members(head.clone(), vec![QName::local("b"), QName::local("c")])
            .unwrap();
        assert_eq!(
            set.substitution_members(&head),
            &[QName::local("b"), QName::local("a"), QName::local("c")]
        );
        assert!(set.substitution_members(&QName::local("none")).is_empty());
    }
}
