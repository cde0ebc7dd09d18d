//! DOM arena for schema documents
//!
//! A [`Document`] materialises one XML document, or one subtree of it,
//! into flat vectors addressed by [`NodeId`]. The children of a node, its
//! attributes and its direct character data each occupy one contiguous
//! slice of a shared buffer, so a tree costs a handful of allocations
//! regardless of its size. Element names are interned.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Mutex;

use crate::error::Result;
use crate::limits::Limits;
use crate::namespaces::{NamespaceContext, XMLNS_NAMESPACE};
use crate::reader::{Attribute, Position, StartElement, XmlEvent, XmlReader};

/// Index of an element node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in document order
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct Node {
    namespace: u32,
    local: u32,
    parent: Option<NodeId>,
    children: Range<u32>,
    attributes: Range<u32>,
    text: Range<u32>,
    position: Position,
}

/// Element being built
struct OpenNode {
    id: NodeId,
    children: Vec<NodeId>,
    text: String,
}

/// Arena-backed XML document
#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<Node>,
    children: Vec<NodeId>,
    attributes: Vec<Attribute>,
    text: String,
    names: Vec<String>,
    name_index: HashMap<String, u32>,
    limits: Limits,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limits applied while building
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Parse a whole document from raw bytes
    pub fn from_bytes(xml: &[u8]) -> Result<Self> {
        let mut reader = XmlReader::new(xml);
        Self::parse(&mut reader)
    }

    /// Parse a whole document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::from_bytes(xml.as_bytes())
    }

    /// Build a whole document from a pull reader
    ///
    /// Only the namespace declarations written on an element are attached
    /// to it.
    pub fn parse(reader: &mut XmlReader<'_>) -> Result<Self> {
        let mut doc = Self::new();
        doc.load(reader)?;
        Ok(doc)
    }

    /// Build the subtree rooted at `start`, which the reader has just produced
    ///
    /// Consumes exactly the matching end event. Every namespace binding in
    /// scope at the subtree root is synthesised as an `xmlns` attribute on
    /// it, so prefixes used inside the subtree resolve without the rest of
    /// the document.
    pub fn parse_subtree(reader: &mut XmlReader<'_>, start: StartElement) -> Result<Self> {
        let mut doc = Self::new();
        doc.load_subtree(reader, start)?;
        Ok(doc)
    }

    /// Reset and build a whole document, reusing the buffers
    pub fn load(&mut self, reader: &mut XmlReader<'_>) -> Result<()> {
        self.reset();
        let mut stack: Vec<OpenNode> = Vec::new();

        while let Some(event) = reader.next_event()? {
            self.apply(event, &mut stack)?;
        }
        Ok(())
    }

    /// Reset and build a subtree, reusing the buffers
    pub fn load_subtree(&mut self, reader: &mut XmlReader<'_>, start: StartElement) -> Result<()> {
        self.reset();

        let mut root = start;
        if let Some(scope) = reader.in_scope_namespaces(root.scope_depth) {
            root.attributes.retain(|a| !a.is_namespace_declaration());
            if let Some(default) = scope.get_default_namespace() {
                root.attributes.push(Attribute {
                    namespace: XMLNS_NAMESPACE.to_string(),
                    local: "xmlns".to_string(),
                    value: default.to_string(),
                });
            }
            for (prefix, uri) in scope.prefixes() {
                root.attributes.push(Attribute {
                    namespace: XMLNS_NAMESPACE.to_string(),
                    local: prefix.to_string(),
                    value: uri.to_string(),
                });
            }
        }

        let mut stack: Vec<OpenNode> = Vec::new();
        self.apply(XmlEvent::StartElement(root), &mut stack)?;

        while !stack.is_empty() {
            match reader.next_event()? {
                Some(event) => self.apply(event, &mut stack)?,
                None => break,
            }
        }
        Ok(())
    }

    fn apply(&mut self, event: XmlEvent, stack: &mut Vec<OpenNode>) -> Result<()> {
        match event {
            XmlEvent::StartElement(start) => {
                self.limits.check_xml_depth(stack.len() + 1)?;
                self.limits.check_attributes(start.attributes.len())?;

                let id = NodeId(self.nodes.len() as u32);
                let namespace = self.intern(&start.name.namespace);
                let local = self.intern(&start.name.local_name);
                let attr_start = self.attributes.len() as u32;
                self.attributes.extend(start.attributes);
                let attr_end = self.attributes.len() as u32;

                self.nodes.push(Node {
                    namespace,
                    local,
                    parent: stack.last().map(|open| open.id),
                    children: 0..0,
                    attributes: attr_start..attr_end,
                    text: 0..0,
                    position: start.position,
                });
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(id);
                }
                stack.push(OpenNode {
                    id,
                    children: Vec::new(),
                    text: String::new(),
                });
            }
            XmlEvent::EndElement { .. } => {
                if let Some(open) = stack.pop() {
                    let child_start = self.children.len() as u32;
                    self.children.extend(open.children);
                    let text_start = self.text.len() as u32;
                    self.text.push_str(&open.text);

                    let node = &mut self.nodes[open.id.index()];
                    node.children = child_start..self.children.len() as u32;
                    node.text = text_start..self.text.len() as u32;
                }
            }
            XmlEvent::CharData(text) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&text);
                }
            }
            XmlEvent::Comment(_)
            | XmlEvent::ProcessingInstruction(_)
            | XmlEvent::Directive(_) => {}
        }
        Ok(())
    }

    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&idx) = self.name_index.get(name) {
            return idx;
        }
        let idx = self.names.len() as u32;
        self.names.push(name.to_string());
        self.name_index.insert(name.to_string(), idx);
        idx
    }

    /// Clear all content, keeping allocated capacity
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.children.clear();
        self.attributes.clear();
        self.text.clear();
        self.names.clear();
        self.name_index.clear();
    }

    /// Number of element nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document holds no element
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The root element
    pub fn document_element(&self) -> Option<NodeId> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(NodeId(0))
        }
    }

    /// Local name of an element
    pub fn local_name(&self, id: NodeId) -> &str {
        &self.names[self.nodes[id.index()].local as usize]
    }

    /// Namespace URI of an element, empty for no namespace
    pub fn namespace_uri(&self, id: NodeId) -> &str {
        &self.names[self.nodes[id.index()].namespace as usize]
    }

    /// Parent element
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Child elements in document order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        let range = &self.nodes[id.index()].children;
        &self.children[range.start as usize..range.end as usize]
    }

    /// Attributes, namespace declarations included
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        let range = &self.nodes[id.index()].attributes;
        &self.attributes[range.start as usize..range.end as usize]
    }

    /// Whether an unqualified attribute is present
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    /// Value of an unqualified attribute
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.namespace.is_empty() && a.local == name)
            .map(|a| a.value.as_str())
    }

    /// Value of a namespace-qualified attribute
    pub fn get_attribute_ns(&self, id: NodeId, namespace: &str, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.namespace == namespace && a.local == name)
            .map(|a| a.value.as_str())
    }

    /// Concatenated character data directly inside an element
    pub fn direct_text_content(&self, id: NodeId) -> &str {
        let range = &self.nodes[id.index()].text;
        &self.text[range.start as usize..range.end as usize]
    }

    /// Source position of an element's start tag
    pub fn position(&self, id: NodeId) -> Position {
        self.nodes[id.index()].position
    }

    /// Namespace bindings in scope at an element
    pub fn namespace_context(&self, id: NodeId) -> NamespaceContext {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }

        let mut ctx = NamespaceContext::new();
        for node in chain.into_iter().rev() {
            for attr in self.attributes(node) {
                if attr.is_namespace_declaration() {
                    ctx.declare(attr.declared_prefix(), &attr.value);
                }
            }
        }
        ctx
    }
}

/// Pool of reusable documents
///
/// Acquisition and release are exclusive; acquired documents are always
/// reset.
#[derive(Debug)]
pub struct DocumentPool {
    free: Mutex<Vec<Document>>,
    max_retained: usize,
}

impl DocumentPool {
    /// Create a pool retaining up to `max_retained` released documents
    pub fn new(max_retained: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_retained,
        }
    }

    /// Take a reset document from the pool, or a new one
    pub fn acquire(&self) -> Document {
        let mut free = self.free.lock().unwrap_or_else(|e| e.into_inner());
        let mut doc = free.pop().unwrap_or_default();
        doc.reset();
        doc
    }

    /// Return a document to the pool
    pub fn release(&self, document: Document) {
        let mut free = self.free.lock().unwrap_or_else(|e| e.into_inner());
        if free.len() < self.max_retained {
            free.push(document);
        }
    }

    /// Number of idle documents
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for DocumentPool {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t">
  <xs:element name="a">text<!-- c -->more</xs:element>
  <xs:element name="b"/>
</xs:schema>"#;

    #[test]
    fn test_parse_document() {
        let doc = Document::from_string(SAMPLE).unwrap();
        let root = doc.document_element().unwrap();

        assert_eq!(doc.local_name(root), "schema");
        assert_eq!(doc.namespace_uri(root), "http://www.w3.org/2001/XMLSchema");
        assert_eq!(doc.get_attribute(root, "targetNamespace"), Some("urn:t"));
        assert!(!doc.has_attribute(root, "xs"));

        let children = doc.children(root);
        assert_eq!(children.len(), 2);
        assert_eq!(doc.get_attribute(children[0], "name"), Some("a"));
        assert_eq!(doc.direct_text_content(children[0]), "textmore");
        assert_eq!(doc.parent(children[1]), Some(root));
        assert_eq!(doc.position(children[0]).line, 3);
    }

    #[test]
    fn test_children_are_contiguous() {
        let doc = Document::from_string("<r><a><x/><y/></a><b><z/></b></r>").unwrap();
        let root = doc.document_element().unwrap();
        let names: Vec<_> = doc
            .children(root)
            .iter()
            .flat_map(|&c| doc.children(c).iter().map(|&g| doc.local_name(g).to_string()))
            .collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_namespace_context_walks_ancestors() {
        let doc = Document::from_string(r#"<r xmlns:p="urn:p"><s xmlns="urn:d"/></r>"#).unwrap();
        let root = doc.document_element().unwrap();
        let child = doc.children(root)[0];
        let ctx = doc.namespace_context(child);
        assert_eq!(ctx.get_namespace("p"), Some("urn:p"));
        assert_eq!(ctx.get_default_namespace(), Some("urn:d"));
    }

    #[test]
    fn test_parse_subtree_synthesizes_namespaces() {
        let xml = r#"<r xmlns:p="urn:p"><p:s><p:t/></p:s><after/></r>"#;
        let mut reader = XmlReader::from_str(xml);
        reader.next_event().unwrap();
        let start = match reader.next_event().unwrap() {
            Some(XmlEvent::StartElement(s)) => s,
            other => panic!("unexpected {:?}", other),
        };

        let doc = Document::parse_subtree(&mut reader, start).unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(doc.local_name(root), "s");
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get_attribute_ns(root, XMLNS_NAMESPACE, "p"), Some("urn:p"));

        // the reader continues right after the subtree
        match reader.next_event().unwrap() {
            Some(XmlEvent::StartElement(s)) => assert_eq!(s.name.local_name, "after"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_malformed_xml() {
        let err = Document::from_string("<r><a></r>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::XmlParse);
    }

    #[test]
    fn test_depth_limit() {
        let mut reader = XmlReader::from_str("<a><b><c/></b></a>");
        let mut doc = Document::new().with_limits(Limits::default().with_max_xml_depth(2));
        assert!(doc.load(&mut reader).is_err());
    }

    #[test]
    fn test_pool_resets() {
        let pool = DocumentPool::new(2);
        let mut doc = pool.acquire();
        let mut reader = XmlReader::from_str("<r/>");
        doc.load(&mut reader).unwrap();
        assert_eq!(doc.len(), 1);
        pool.release(doc);
        assert_eq!(pool.idle(), 1);

        let doc = pool.acquire();
        assert!(doc.is_empty());
        assert_eq!(pool.idle(), 0);
    }
}
