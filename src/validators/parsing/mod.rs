//! XSD Document Parsing
//!
//! This module translates one schema document, materialised as a
//! [`Document`] arena, into a per-document [`Schema`]. Every XSD element
//! is checked against its allowed attributes and child order as the
//! schema for schemas lays them out; the first violation aborts the
//! document.
//!
//! The top-level flow makes two passes over the children of `xs:schema`:
//! the first records `include` and `import` directives in document order,
//! the second builds the global components. References between components
//! are kept symbolic; the resolver binds them once the whole schema set is
//! loaded.

mod attributes;
mod elements;
mod groups;
mod identities;
mod types;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use super::base::{
    DerivationMethod, DerivationSet, Form, SourceInfo, TypeRef, ValueConstraint,
    ValueConstraintKind, ELEMENT_BLOCK, FINAL_DEFAULT,
};
use super::builtins::{builtin_type, is_builtin_name};
use super::globals::{ComponentId, GlobalMaps};
use super::particles::{parse_occurs, Occurs};
use super::schemas::{Directive, Schema, SchemaDocument};
use crate::documents::{Document, NodeId};
use crate::error::{Diagnostic, Error, Result};
use crate::names::{is_valid_ncname, split_xml_whitespace, trim_xml_whitespace};
use crate::namespaces::{
    NamespaceContext, QName, QNamePolicy, XML_NAMESPACE, XMLNS_NAMESPACE, XSD_NAMESPACE,
};

/// XSD element local names
mod xsd_elements {
    pub const SCHEMA: &str = "schema";
    pub const ELEMENT: &str = "element";
    pub const COMPLEX_TYPE: &str = "complexType";
    pub const SIMPLE_TYPE: &str = "simpleType";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const GROUP: &str = "group";
    pub const SEQUENCE: &str = "sequence";
    pub const CHOICE: &str = "choice";
    pub const ALL: &str = "all";
    pub const ANNOTATION: &str = "annotation";
    pub const IMPORT: &str = "import";
    pub const INCLUDE: &str = "include";
    pub const REDEFINE: &str = "redefine";
    pub const OVERRIDE: &str = "override";
    pub const RESTRICTION: &str = "restriction";
    pub const EXTENSION: &str = "extension";
    pub const LIST: &str = "list";
    pub const UNION: &str = "union";
    pub const COMPLEX_CONTENT: &str = "complexContent";
    pub const SIMPLE_CONTENT: &str = "simpleContent";
    pub const ANY: &str = "any";
    pub const ANY_ATTRIBUTE: &str = "anyAttribute";
    pub const NOTATION: &str = "notation";
    pub const UNIQUE: &str = "unique";
    pub const KEY: &str = "key";
    pub const KEYREF: &str = "keyref";
    pub const SELECTOR: &str = "selector";
    pub const FIELD: &str = "field";
    pub const DEFAULT_OPEN_CONTENT: &str = "defaultOpenContent";
    pub const OPEN_CONTENT: &str = "openContent";
    pub const ASSERT: &str = "assert";
    pub const ALTERNATIVE: &str = "alternative";
}

/// XSD attribute names
mod xsd_attrs {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const REF: &str = "ref";
    pub const TARGET_NAMESPACE: &str = "targetNamespace";
    pub const VERSION: &str = "version";
    pub const ELEMENT_FORM_DEFAULT: &str = "elementFormDefault";
    pub const ATTRIBUTE_FORM_DEFAULT: &str = "attributeFormDefault";
    pub const BLOCK_DEFAULT: &str = "blockDefault";
    pub const FINAL_DEFAULT: &str = "finalDefault";
    pub const NILLABLE: &str = "nillable";
    pub const DEFAULT: &str = "default";
    pub const FIXED: &str = "fixed";
    pub const BASE: &str = "base";
    pub const VALUE: &str = "value";
    pub const MIXED: &str = "mixed";
    pub const ABSTRACT: &str = "abstract";
    pub const BLOCK: &str = "block";
    pub const FINAL: &str = "final";
    pub const FORM: &str = "form";
    pub const SUBSTITUTION_GROUP: &str = "substitutionGroup";
    pub const NAMESPACE: &str = "namespace";
    pub const PROCESS_CONTENTS: &str = "processContents";
    pub const SCHEMA_LOCATION: &str = "schemaLocation";
    pub const ITEM_TYPE: &str = "itemType";
    pub const MEMBER_TYPES: &str = "memberTypes";
    pub const PUBLIC: &str = "public";
    pub const SYSTEM: &str = "system";
    pub const MIN_OCCURS: &str = "minOccurs";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const USE: &str = "use";
    pub const REFER: &str = "refer";
    pub const XPATH: &str = "xpath";
}

use xsd_attrs as attrs;
use xsd_elements as elems;

/// Attributes introduced by XSD 1.1 that XSD 1.0 documents cannot carry
const XSD11_ATTRIBUTES: &[&str] = &[
    "notNamespace",
    "notQName",
    "defaultAttributes",
    "xpathDefaultNamespace",
    "defaultAttributesApply",
    "inheritable",
    "targetNamespace",
    "appliesToEmpty",
    "mode",
];

/// XSD elements introduced by XSD 1.1
const XSD11_ELEMENTS: &[&str] = &[
    elems::OVERRIDE,
    elems::DEFAULT_OPEN_CONTENT,
    elems::OPEN_CONTENT,
    elems::ASSERT,
    "assertion",
    elems::ALTERNATIVE,
    "explicitTimezone",
];

/// Parse one schema document loaded from `location`
pub fn parse_schema(document: &Document, location: &str) -> Result<Schema> {
    SchemaParser::new(document, location)?
        .parse()
        .map_err(|e| e.in_document(location))
}

/// Parse a schema document from text
pub fn parse_schema_str(xml: &str, location: &str) -> Result<Schema> {
    let document = Document::from_string(xml).map_err(|e| e.in_document(location))?;
    parse_schema(&document, location)
}

/// Parser state for one schema document
pub(crate) struct SchemaParser<'a> {
    doc: &'a Document,
    root: NodeId,
    location: Arc<str>,
    target_namespace: String,
    element_form_default: Form,
    attribute_form_default: Form,
    block_default: DerivationSet,
    final_default: DerivationSet,
    imported: IndexSet<String>,
    namespaces: HashMap<NodeId, Arc<NamespaceContext>>,
    components: GlobalMaps,
    substitution_groups: IndexMap<QName, Vec<QName>>,
    ids: IndexMap<String, ComponentId>,
}

impl<'a> SchemaParser<'a> {
    fn new(doc: &'a Document, location: &str) -> Result<Self> {
        let root = doc.document_element().ok_or_else(|| {
            Error::from(Diagnostic::parse("the document has no root element").with_document(location))
        })?;
        Ok(Self {
            doc,
            root,
            location: Arc::from(location),
            target_namespace: String::new(),
            element_form_default: Form::Unqualified,
            attribute_form_default: Form::Unqualified,
            block_default: DerivationSet::default(),
            final_default: DerivationSet::default(),
            imported: IndexSet::new(),
            namespaces: HashMap::new(),
            components: GlobalMaps::new(),
            substitution_groups: IndexMap::new(),
            ids: IndexMap::new(),
        })
    }

    // =========================================================================
    // Schema element
    // =========================================================================

    fn parse(mut self) -> Result<Schema> {
        let root = self.root;
        if self.doc.namespace_uri(root) != XSD_NAMESPACE || self.local(root) != elems::SCHEMA {
            return Err(self.error(
                root,
                format!(
                    "the root element {} is not an XSD schema",
                    QName::new(self.doc.namespace_uri(root), self.local(root))
                ),
            ));
        }
        self.check_attributes(
            root,
            &[
                attrs::ID,
                attrs::TARGET_NAMESPACE,
                attrs::VERSION,
                attrs::ELEMENT_FORM_DEFAULT,
                attrs::ATTRIBUTE_FORM_DEFAULT,
                attrs::BLOCK_DEFAULT,
                attrs::FINAL_DEFAULT,
            ],
        )?;

        if let Some(tns) = self.attr(root, attrs::TARGET_NAMESPACE) {
            let tns = trim_xml_whitespace(tns);
            if tns.is_empty() {
                return Err(self.error_code(
                    root,
                    "sch-props-correct",
                    "the targetNamespace attribute cannot be an empty string",
                ));
            }
            self.target_namespace = tns.to_string();
        }
        self.element_form_default = self.form_attr(root, attrs::ELEMENT_FORM_DEFAULT, Form::Unqualified)?;
        self.attribute_form_default =
            self.form_attr(root, attrs::ATTRIBUTE_FORM_DEFAULT, Form::Unqualified)?;
        self.block_default =
            self.derivation_attr(root, attrs::BLOCK_DEFAULT, ELEMENT_BLOCK, DerivationSet::default())?;
        self.final_default =
            self.derivation_attr(root, attrs::FINAL_DEFAULT, FINAL_DEFAULT, DerivationSet::default())?;

        let directives = self.parse_directives()?;
        self.parse_components()?;

        let document = SchemaDocument {
            location: self.location.to_string(),
            target_namespace: self.target_namespace.clone(),
            namespaces: self.namespaces(root),
            element_form_default: self.element_form_default,
            attribute_form_default: self.attribute_form_default,
            block_default: self.block_default,
            final_default: self.final_default,
            version: self.attr(root, attrs::VERSION).map(str::to_string),
            directives,
            chameleon: false,
        };
        Ok(Schema {
            document,
            components: self.components,
            substitution_groups: self.substitution_groups,
            ids: self.ids,
        })
    }

    /// First pass: directives, which must precede every component
    fn parse_directives(&mut self) -> Result<Vec<Directive>> {
        let mut directives = Vec::new();
        let mut component_seen = false;
        for &child in self.doc.children(self.root) {
            if self.doc.namespace_uri(child) != XSD_NAMESPACE {
                continue;
            }
            match self.local(child) {
                elems::ANNOTATION => self.check_annotation(child)?,
                elems::INCLUDE | elems::IMPORT if component_seen => {
                    return Err(self.error(
                        child,
                        format!(
                            "'{}' must precede every component declaration of the schema",
                            self.local(child)
                        ),
                    ))
                }
                elems::INCLUDE => {
                    self.check_attributes(child, &[attrs::ID, attrs::SCHEMA_LOCATION])?;
                    self.xsd_children(child)?;
                    let location = self.required_attr(child, attrs::SCHEMA_LOCATION)?;
                    directives.push(Directive::Include {
                        location: trim_xml_whitespace(location).to_string(),
                        source: self.source(child),
                    });
                }
                elems::IMPORT => {
                    self.check_attributes(
                        child,
                        &[attrs::ID, attrs::NAMESPACE, attrs::SCHEMA_LOCATION],
                    )?;
                    self.xsd_children(child)?;
                    let namespace = self
                        .attr(child, attrs::NAMESPACE)
                        .map(|ns| trim_xml_whitespace(ns).to_string())
                        .unwrap_or_default();
                    if namespace == self.target_namespace {
                        let message = if namespace.is_empty() {
                            "a schema without a target namespace cannot import no namespace"
                                .to_string()
                        } else {
                            format!(
                                "the imported namespace '{}' is the target namespace of the importing schema",
                                namespace
                            )
                        };
                        return Err(self.error_code(child, "src-import.1", message));
                    }
                    self.imported.insert(namespace.clone());
                    directives.push(Directive::Import {
                        namespace,
                        location: self
                            .attr(child, attrs::SCHEMA_LOCATION)
                            .map(|l| trim_xml_whitespace(l).to_string()),
                        source: self.source(child),
                    });
                }
                elems::REDEFINE => {
                    return Err(self.error(child, "'redefine' is not supported"));
                }
                _ => component_seen = true,
            }
        }
        Ok(directives)
    }

    /// Second pass: global components
    fn parse_components(&mut self) -> Result<()> {
        for &child in self.doc.children(self.root) {
            if self.doc.namespace_uri(child) != XSD_NAMESPACE {
                continue;
            }
            let local = self.local(child);
            match local {
                elems::ANNOTATION | elems::INCLUDE | elems::IMPORT => {}
                elems::ELEMENT => {
                    let element = self.parse_global_element(child)?;
                    self.components.add_element(element)?;
                }
                elems::ATTRIBUTE => {
                    let attribute = self.parse_global_attribute(child)?;
                    self.components.add_attribute(attribute)?;
                }
                elems::COMPLEX_TYPE => {
                    let complex_type = self.parse_complex_type(child, true)?;
                    if let Some(name) = complex_type.name.clone() {
                        self.components
                            .add_type(name, super::globals::TypeDefinition::Complex(complex_type))?;
                    }
                }
                elems::SIMPLE_TYPE => {
                    let simple_type = self.parse_simple_type(child, true)?;
                    if let Some(name) = simple_type.name.clone() {
                        self.components
                            .add_type(name, super::globals::TypeDefinition::Simple(simple_type))?;
                    }
                }
                elems::GROUP => {
                    let group = self.parse_group_definition(child)?;
                    self.components.add_group(group)?;
                }
                elems::ATTRIBUTE_GROUP => {
                    let group = self.parse_attribute_group(child)?;
                    self.components.add_attribute_group(group)?;
                }
                elems::NOTATION => {
                    let notation = self.parse_notation(child)?;
                    self.components.add_notation(notation)?;
                }
                other if XSD11_ELEMENTS.contains(&other) => {
                    return Err(self.error(child, format!("XSD 1.1 element '{}' is not supported", other)))
                }
                other => {
                    return Err(self.error(
                        child,
                        format!("unexpected element '{}' at the top level of the schema", other),
                    ))
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Source information and errors
    // =========================================================================

    fn local(&self, node: NodeId) -> &'a str {
        self.doc.local_name(node)
    }

    /// XSD component path of a node
    fn path(&self, node: NodeId) -> String {
        let mut chain = vec![node];
        let mut current = node;
        while let Some(parent) = self.doc.parent(current) {
            chain.push(parent);
            current = parent;
        }
        let mut path = String::new();
        for id in chain.into_iter().rev() {
            path.push('/');
            path.push_str(self.local(id));
            if let Some(name) = self.doc.get_attribute(id, attrs::NAME) {
                path.push_str(&format!("[@name='{}']", name));
            } else if let Some(reference) = self.doc.get_attribute(id, attrs::REF) {
                path.push_str(&format!("[@ref='{}']", reference));
            }
        }
        path
    }

    fn source(&self, node: NodeId) -> SourceInfo {
        let position = self.doc.position(node);
        SourceInfo {
            document: Some(self.location.clone()),
            path: self.path(node),
            line: position.line,
            column: position.column,
        }
    }

    fn annotate(&self, node: NodeId, diagnostic: Diagnostic) -> Error {
        self.source(node).annotate(diagnostic).into()
    }

    fn error(&self, node: NodeId, message: impl Into<String>) -> Error {
        self.annotate(node, Diagnostic::parse(message))
    }

    fn error_code(&self, node: NodeId, code: &str, message: impl Into<String>) -> Error {
        self.annotate(node, Diagnostic::parse(message).with_code(code))
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    fn attr(&self, node: NodeId, name: &str) -> Option<&'a str> {
        self.doc.get_attribute(node, name)
    }

    fn required_attr(&self, node: NodeId, name: &str) -> Result<&'a str> {
        self.attr(node, name).ok_or_else(|| {
            self.error(
                node,
                format!("missing required attribute '{}' on '{}'", name, self.local(node)),
            )
        })
    }

    /// Check attributes against the allowed profile and register `id`
    fn check_attributes(&mut self, node: NodeId, allowed: &[&str]) -> Result<()> {
        for attribute in self.doc.attributes(node) {
            if attribute.namespace == XMLNS_NAMESPACE {
                continue;
            }
            if attribute.namespace == XSD_NAMESPACE {
                return Err(self.error(
                    node,
                    format!(
                        "XSD-namespaced attribute '{}' is not allowed on '{}'",
                        attribute.local,
                        self.local(node)
                    ),
                ));
            }
            if !attribute.namespace.is_empty() {
                continue;
            }
            let name = attribute.local.as_str();
            if !allowed.contains(&name) {
                let message = if XSD11_ATTRIBUTES.contains(&name) {
                    format!("XSD 1.1 attribute '{}' is not supported on '{}'", name, self.local(node))
                } else {
                    format!("attribute '{}' is not allowed on '{}'", name, self.local(node))
                };
                return Err(self.annotate(node, Diagnostic::parse(message).with_actual(name)));
            }
        }
        if let Some(id) = self.attr(node, attrs::ID) {
            self.register_id(node, trim_xml_whitespace(id))?;
        }
        Ok(())
    }

    fn register_id(&mut self, node: NodeId, id: &str) -> Result<()> {
        if !is_valid_ncname(id) {
            return Err(self.error(node, format!("id '{}' is not a valid NCName", id)));
        }
        let component = match self.attr(node, attrs::NAME) {
            Some(name) => format!("{} '{}'", self.local(node), name),
            None => self.local(node).to_string(),
        };
        if let Some(previous) = self.ids.get(id) {
            return Err(self.error_code(
                node,
                "schema-duplicate-id",
                format!("duplicate id '{}', already used by {}", id, previous.component),
            ));
        }
        let source = self.source(node);
        self.ids
            .insert(id.to_string(), ComponentId { component, source });
        Ok(())
    }

    fn ncname_attr(&self, node: NodeId, name: &str) -> Result<String> {
        let value = trim_xml_whitespace(self.required_attr(node, name)?);
        if !is_valid_ncname(value) {
            return Err(self.error(
                node,
                format!("attribute '{}' value '{}' is not a valid NCName", name, value),
            ));
        }
        Ok(value.to_string())
    }

    fn bool_attr(&self, node: NodeId, name: &str, default: bool) -> Result<bool> {
        match self.attr(node, name).map(trim_xml_whitespace) {
            None => Ok(default),
            Some("true") | Some("1") => Ok(true),
            Some("false") | Some("0") => Ok(false),
            Some(other) => Err(self.error(
                node,
                format!("attribute '{}' must be a boolean, got '{}'", name, other),
            )),
        }
    }

    fn form_attr(&self, node: NodeId, name: &str, default: Form) -> Result<Form> {
        match self.attr(node, name) {
            None => Ok(default),
            Some(value) => Form::from_str(trim_xml_whitespace(value)).ok_or_else(|| {
                self.error(
                    node,
                    format!(
                        "attribute '{}' must be 'qualified' or 'unqualified', got '{}'",
                        name, value
                    ),
                )
            }),
        }
    }

    /// Derivation set attribute, falling back to the masked schema default
    fn derivation_attr(
        &self,
        node: NodeId,
        name: &str,
        allowed: &[DerivationMethod],
        default: DerivationSet,
    ) -> Result<DerivationSet> {
        match self.attr(node, name) {
            None => Ok(default.mask(allowed)),
            Some(value) => DerivationSet::parse(value, allowed).map_err(|message| {
                self.annotate(node, Diagnostic::parse(message).with_actual(value))
            }),
        }
    }

    fn occurs(&self, node: NodeId) -> Result<Occurs> {
        parse_occurs(
            self.attr(node, attrs::MIN_OCCURS),
            self.attr(node, attrs::MAX_OCCURS),
        )
        .map_err(|message| self.error(node, message))
    }

    /// `default` or `fixed` value with the namespace context needed to read it
    fn value_constraint(&mut self, node: NodeId) -> Result<Option<ValueConstraint>> {
        let default = self.attr(node, attrs::DEFAULT);
        let fixed = self.attr(node, attrs::FIXED);
        let (kind, lexical) = match (default, fixed) {
            (Some(_), Some(_)) => {
                let code = if self.local(node) == elems::ELEMENT {
                    "src-element.1"
                } else {
                    "src-attribute.1"
                };
                return Err(self.error_code(
                    node,
                    code,
                    "'default' and 'fixed' attributes are mutually exclusive",
                ));
            }
            (Some(value), None) => (ValueConstraintKind::Default, value),
            (None, Some(value)) => (ValueConstraintKind::Fixed, value),
            (None, None) => return Ok(None),
        };
        let namespaces = self.namespaces(node);
        Ok(Some(ValueConstraint::new(kind, lexical, namespaces)))
    }

    // =========================================================================
    // Children
    // =========================================================================

    fn check_annotation(&mut self, node: NodeId) -> Result<()> {
        self.check_attributes(node, &[attrs::ID])?;
        for &child in self.doc.children(node) {
            let local = self.local(child);
            if self.doc.namespace_uri(child) != XSD_NAMESPACE
                || (local != "appinfo" && local != "documentation")
            {
                return Err(self.error(
                    child,
                    format!("unexpected element '{}' in 'annotation'", local),
                ));
            }
        }
        Ok(())
    }

    /// XSD children of a node, with a leading annotation checked and dropped
    fn xsd_children(&mut self, node: NodeId) -> Result<Vec<NodeId>> {
        let mut children = Vec::new();
        for (index, &child) in self.doc.children(node).iter().enumerate() {
            if self.doc.namespace_uri(child) != XSD_NAMESPACE {
                return Err(self.error(
                    child,
                    format!(
                        "element {} is not allowed in '{}'",
                        QName::new(self.doc.namespace_uri(child), self.local(child)),
                        self.local(node)
                    ),
                ));
            }
            if self.local(child) == elems::ANNOTATION {
                if index > 0 {
                    return Err(self.error(
                        child,
                        format!(
                            "'annotation' must be the first child of '{}' and appear at most once",
                            self.local(node)
                        ),
                    ));
                }
                self.check_annotation(child)?;
                continue;
            }
            children.push(child);
        }
        Ok(children)
    }

    /// Reject any child but a leading annotation
    fn no_children(&mut self, node: NodeId) -> Result<()> {
        let children = self.xsd_children(node)?;
        match children.first() {
            Some(&child) => Err(self.error(
                child,
                format!("unexpected element '{}' in '{}'", self.local(child), self.local(node)),
            )),
            None => Ok(()),
        }
    }

    fn unexpected(&self, child: NodeId, parent: NodeId) -> Error {
        let local = self.local(child);
        if XSD11_ELEMENTS.contains(&local) {
            self.error(child, format!("XSD 1.1 element '{}' is not supported", local))
        } else {
            self.error(
                child,
                format!("unexpected element '{}' in '{}'", local, self.local(parent)),
            )
        }
    }

    // =========================================================================
    // Names and references
    // =========================================================================

    /// Prefix bindings in scope at a node
    fn namespaces(&mut self, node: NodeId) -> Arc<NamespaceContext> {
        if let Some(context) = self.namespaces.get(&node) {
            return context.clone();
        }
        let declares = self
            .doc
            .attributes(node)
            .iter()
            .any(|a| a.is_namespace_declaration());
        let context = match (self.doc.parent(node), declares) {
            (Some(parent), false) => self.namespaces(parent),
            (Some(parent), true) => {
                let mut context = (*self.namespaces(parent)).clone();
                for attribute in self.doc.attributes(node) {
                    if attribute.is_namespace_declaration() {
                        context.declare(attribute.declared_prefix(), &attribute.value);
                    }
                }
                Arc::new(context)
            }
            (None, _) => Arc::new(self.doc.namespace_context(node)),
        };
        self.namespaces.insert(node, context.clone());
        context
    }

    /// Name of a declaration in the target namespace
    fn qualified(&self, local: impl Into<String>) -> QName {
        QName::new(self.target_namespace.clone(), local)
    }

    /// Name of a local declaration under the given form
    fn local_name(&self, local: impl Into<String>, form: Form) -> QName {
        if form.is_qualified() {
            self.qualified(local)
        } else {
            QName::local(local)
        }
    }

    /// Resolve a QName-valued reference and check its namespace is visible
    fn resolve_reference(&mut self, node: NodeId, lexical: &str, policy: QNamePolicy) -> Result<QName> {
        let namespaces = self.namespaces(node);
        let name = namespaces
            .resolve_qname(lexical, policy)
            .map_err(|d| self.annotate(node, d))?;
        self.check_reference_namespace(node, &name)?;
        Ok(name)
    }

    fn check_reference_namespace(&self, node: NodeId, name: &QName) -> Result<()> {
        let namespace = name.namespace.as_str();
        if namespace == self.target_namespace
            || namespace == XSD_NAMESPACE
            || namespace == XML_NAMESPACE
            || self.imported.contains(namespace)
        {
            return Ok(());
        }
        let message = if namespace.is_empty() {
            format!(
                "reference to '{}' in no namespace requires an import without namespace",
                name.local_name
            )
        } else {
            format!(
                "namespace '{}' of reference '{}' is not imported by the schema",
                namespace, name.local_name
            )
        };
        Err(self.annotate(
            node,
            Diagnostic::reference(message)
                .with_code("src-resolve.4.2")
                .with_actual(name.to_string()),
        ))
    }

    /// Resolve a type-valued QName (`type`, `base`, `itemType`, `memberTypes`)
    ///
    /// Unprefixed built-in names in a `type` attribute always denote the
    /// built-in. Unprefixed other names under an XSD default namespace are
    /// in no namespace.
    fn resolve_type_name(&mut self, node: NodeId, lexical: &str, type_attribute: bool) -> Result<TypeRef> {
        let lexical = trim_xml_whitespace(lexical);
        let namespaces = self.namespaces(node);
        let unprefixed = !lexical.contains(':');
        let name = if unprefixed && type_attribute && is_builtin_name(lexical) {
            QName::xsd(lexical)
        } else if unprefixed
            && namespaces.get_default_namespace() == Some(XSD_NAMESPACE)
            && !is_builtin_name(lexical)
        {
            namespaces
                .resolve_qname(lexical, QNamePolicy::ForceEmptyNamespace)
                .map_err(|d| self.annotate(node, d))?
        } else {
            namespaces
                .resolve_qname(lexical, QNamePolicy::UseDefaultNamespace)
                .map_err(|d| self.annotate(node, d))?
        };
        self.check_reference_namespace(node, &name)?;
        if name.is_xsd() {
            return match builtin_type(&name) {
                Some(_) => Ok(TypeRef::Named(name)),
                None => Err(self.annotate(
                    node,
                    Diagnostic::reference(format!(
                        "'{}' is not a built-in type of the XSD namespace",
                        name.local_name
                    ))
                    .with_code("src-resolve")
                    .with_actual(lexical),
                )),
            };
        }
        Ok(TypeRef::Placeholder(name))
    }

    /// Resolve a whitespace-separated list of type names
    fn resolve_type_list(&mut self, node: NodeId, value: &str) -> Result<Vec<TypeRef>> {
        split_xml_whitespace(value)
            .map(|token| self.resolve_type_name(node, token, false))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::validators::base::TypeRef;
    use crate::validators::globals::TypeDefinition;
    use pretty_assertions::assert_eq;

    fn parse(body: &str) -> Result<Schema> {
        let xml = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:tns="urn:t" targetNamespace="urn:t">{}</xs:schema>"#,
            body
        );
        parse_schema_str(&xml, "test.xsd")
    }

    fn parse_err(body: &str) -> Error {
        match parse(body) {
            Ok(schema) => panic!("expected an error, parsed {:?}", schema.document),
            Err(e) => e,
        }
    }

    #[test]
    fn test_minimal_schema() {
        let schema = parse(r#"<xs:element name="root" type="xs:string"/>"#).unwrap();
        assert_eq!(schema.target_namespace(), "urn:t");
        let root = &schema.components.elements[&QName::new("urn:t", "root")];
        assert_eq!(root.type_ref, TypeRef::Named(QName::xsd("string")));
        assert!(root.is_global);
        assert_eq!(root.source.path, "/schema/element[@name='root']");
        assert_eq!(root.source.document.as_deref(), Some("test.xsd"));
        assert!(root.source.line >= 1);
    }

    #[test]
    fn test_root_must_be_schema() {
        let err = parse_schema_str("<root/>", "x.xsd").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaParse);
    }

    #[test]
    fn test_empty_target_namespace_rejected() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace=""/>"#;
        assert!(parse_schema_str(xml, "x.xsd").is_err());
    }

    #[test]
    fn test_block_default_all_conflict() {
        let xml = r###"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" blockDefault="#all extension"/>"###;
        let err = parse_schema_str(xml, "x.xsd").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaParse);
        assert!(err
            .to_string()
            .contains("derivation set cannot combine '#all' with other values"));
    }

    #[test]
    fn test_duplicate_element() {
        let err = parse_err(r#"<xs:element name="root"/><xs:element name="root"/>"#);
        assert_eq!(err.kind(), ErrorKind::SchemaParse);
        assert!(err.to_string().contains("duplicate element declaration"));
    }

    #[test]
    fn test_unknown_prefix() {
        let err = parse_err(r#"<xs:element name="root" type="abc:string"/>"#);
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert!(err.to_string().contains("undefined namespace prefix 'abc'"));
    }

    #[test]
    fn test_reference_to_unimported_namespace() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:o="urn:o" targetNamespace="urn:t">
            <xs:element name="root" type="o:T"/>
        </xs:schema>"#;
        let err = parse_schema_str(xml, "x.xsd").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert_eq!(err.code(), "src-resolve.4.2");

        let imported = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:o="urn:o" targetNamespace="urn:t">
            <xs:import namespace="urn:o"/>
            <xs:element name="root" type="o:T"/>
        </xs:schema>"#;
        let schema = parse_schema_str(imported, "x.xsd").unwrap();
        assert_eq!(schema.imported_namespaces().len(), 1);
    }

    #[test]
    fn test_redefine_rejected() {
        let err = parse_err(r#"<xs:redefine schemaLocation="a.xsd"/>"#);
        assert!(err.to_string().contains("'redefine' is not supported"));
    }

    #[test]
    fn test_directives_in_order_and_before_components() {
        let schema = parse(
            r#"<xs:include schemaLocation="a.xsd"/><xs:annotation/><xs:import namespace="urn:o" schemaLocation="o.xsd"/>"#,
        )
        .unwrap();
        assert_eq!(schema.document.directives.len(), 2);
        assert_eq!(schema.document.directives[0].location(), Some("a.xsd"));

        let err = parse_err(r#"<xs:element name="a"/><xs:include schemaLocation="a.xsd"/>"#);
        assert_eq!(err.kind(), ErrorKind::SchemaParse);
    }

    #[test]
    fn test_import_of_own_namespace() {
        let err = parse_err(r#"<xs:import namespace="urn:t"/>"#);
        assert_eq!(err.code(), "src-import.1");
    }

    #[test]
    fn test_attribute_profiles() {
        let err = parse_err(r#"<xs:element name="a" form="qualified"/>"#);
        assert!(err.to_string().contains("attribute 'form' is not allowed on 'element'"));
        let err = parse_err(r#"<xs:element name="a" xs:type="xs:string"/>"#);
        assert!(err.to_string().contains("XSD-namespaced attribute"));
        assert!(parse(r#"<xs:element name="a" xmlns:f="urn:f" f:note="x"/>"#).is_ok());
    }

    #[test]
    fn test_ids() {
        let err = parse_err(r#"<xs:element name="a" id="x"/><xs:element name="b" id="x"/>"#);
        assert_eq!(err.code(), "schema-duplicate-id");
        let err = parse_err(r#"<xs:element name="a" id="1x"/>"#);
        assert!(err.to_string().contains("not a valid NCName"));
        let schema = parse(r#"<xs:element name="a" id="e1"/>"#).unwrap();
        assert_eq!(schema.ids["e1"].component, "element 'a'");
    }

    #[test]
    fn test_builtin_name_under_default_namespace() {
        let xml = r#"<schema xmlns="http://www.w3.org/2001/XMLSchema">
            <element name="a" type="string"/>
            <element name="b" type="T"/>
            <simpleType name="T"><restriction base="string"/></simpleType>
        </schema>"#;
        let schema = parse_schema_str(xml, "x.xsd").unwrap();
        let a = &schema.components.elements[&QName::local("a")];
        assert_eq!(a.type_ref, TypeRef::Named(QName::xsd("string")));
        let b = &schema.components.elements[&QName::local("b")];
        assert_eq!(b.type_ref, TypeRef::Placeholder(QName::local("T")));
        assert!(schema.components.types.contains_key(&QName::local("T")));
        assert!(matches!(
            schema.components.types[&QName::local("T")],
            TypeDefinition::Simple(_)
        ));
    }

    #[test]
    fn test_unknown_xsd_type() {
        let err = parse_err(r#"<xs:element name="a" type="xs:strin"/>"#);
        assert_eq!(err.kind(), ErrorKind::Reference);
    }

    #[test]
    fn test_xsd11_rejected() {
        let err = parse_err(r#"<xs:defaultOpenContent><xs:any/></xs:defaultOpenContent>"#);
        assert!(err.to_string().contains("XSD 1.1"));
    }

    #[test]
    fn test_foreign_top_level_elements_ignored() {
        let schema = parse(r#"<f:extra xmlns:f="urn:f"/><xs:element name="a"/>"#).unwrap();
        assert_eq!(schema.components.elements.len(), 1);
    }

    #[test]
    fn test_annotation_must_come_first() {
        let err = parse_err(
            r#"<xs:element name="a"><xs:simpleType><xs:restriction base="xs:string"/></xs:simpleType><xs:annotation/></xs:element>"#,
        );
        assert_eq!(err.kind(), ErrorKind::SchemaParse);
    }
}
