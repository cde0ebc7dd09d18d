//! XML pull reader
//!
//! A thin layer over `quick-xml` producing namespace-resolved events. The
//! reader keeps its own stack of in-scope namespace contexts so callers can
//! ask for the bindings visible at any open element by its scope depth, and
//! it enforces the document-level rules `quick-xml` leaves to its users:
//! one root element, whitespace-only character data outside it, no
//! unclosed elements at end of input. A single leading UTF-8 BOM is
//! skipped.

use crate::error::{Diagnostic, Error, Result};
use crate::limits::Limits;
use crate::names::is_all_whitespace;
use crate::namespaces::{NamespaceContext, QName, XMLNS_NAMESPACE};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 1-based source position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Position {
    /// Byte offset in the input
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column, in characters
    pub column: usize,
}

/// Attribute with a resolved name
///
/// Namespace declarations are reported as attributes in the `xmlns`
/// namespace: `xmlns="u"` has local name `xmlns`, `xmlns:p="u"` has local
/// name `p`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    /// Namespace URI, empty for unprefixed attributes
    pub namespace: String,
    /// Local name
    pub local: String,
    /// Normalised, unescaped value
    pub value: String,
}

impl Attribute {
    /// Whether this attribute is a namespace declaration
    pub fn is_namespace_declaration(&self) -> bool {
        self.namespace == XMLNS_NAMESPACE
    }

    /// Declared prefix of a namespace declaration, `None` for the default namespace
    pub fn declared_prefix(&self) -> Option<&str> {
        if self.local == "xmlns" {
            None
        } else {
            Some(&self.local)
        }
    }
}

/// Start tag event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartElement {
    /// Resolved element name
    pub name: QName,
    /// Attributes, namespace declarations included
    pub attributes: Vec<Attribute>,
    /// Depth of the scope opened by this element (root is 1)
    pub scope_depth: usize,
    /// Position of the `<`
    pub position: Position,
}

/// Pull reader event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// Start tag (empty tags produce a start and an end)
    StartElement(StartElement),
    /// End tag
    EndElement {
        /// Resolved element name
        name: QName,
        /// Position of the `</`
        position: Position,
    },
    /// Character data inside the root element, CDATA included
    CharData(String),
    /// Comment body
    Comment(String),
    /// Processing instruction body
    ProcessingInstruction(String),
    /// `<!DOCTYPE ...>` body
    Directive(String),
}

/// Byte offset to line/column mapping
#[derive(Debug, Clone)]
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(input: &[u8]) -> Self {
        let mut starts = vec![0];
        starts.extend(
            input
                .iter()
                .enumerate()
                .filter(|(_, &b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    fn position(&self, input: &[u8], offset: usize) -> Position {
        let offset = offset.min(input.len());
        let line = match self.starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let start = self.starts[line];
        // count characters, not UTF-8 continuation bytes
        let column = input[start..offset]
            .iter()
            .filter(|&&b| (b & 0xC0) != 0x80)
            .count();
        Position {
            offset,
            line: line + 1,
            column: column + 1,
        }
    }
}

/// Namespace-aware pull reader over one XML document
pub struct XmlReader<'a> {
    reader: Reader<&'a [u8]>,
    input: &'a [u8],
    bom_len: usize,
    lines: LineIndex,
    buf: Vec<u8>,
    scopes: Vec<NamespaceContext>,
    pending_pop: bool,
    pending_end: Option<(QName, Position)>,
    root_seen: bool,
    root_closed: bool,
    limits: Limits,
}

impl<'a> XmlReader<'a> {
    /// Create a reader over raw bytes
    pub fn new(input: &'a [u8]) -> Self {
        let bom_len = if input.starts_with(UTF8_BOM) {
            UTF8_BOM.len()
        } else {
            0
        };

        let mut reader = Reader::from_reader(&input[bom_len..]);
        reader.trim_text(false);
        reader.expand_empty_elements(true);
        reader.check_end_names(true);

        Self {
            reader,
            input,
            bom_len,
            lines: LineIndex::new(input),
            buf: Vec::new(),
            scopes: vec![NamespaceContext::new()],
            pending_pop: false,
            pending_end: None,
            root_seen: false,
            root_closed: false,
            limits: Limits::default(),
        }
    }

    /// Create a reader over a string
    pub fn from_str(input: &'a str) -> Self {
        Self::new(input.as_bytes())
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Current depth: number of open elements
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1 - usize::from(self.pending_pop)
    }

    /// Namespace bindings in scope at the given scope depth
    pub fn in_scope_namespaces(&self, scope_depth: usize) -> Option<&NamespaceContext> {
        self.scopes.get(scope_depth)
    }

    /// Current position in the input
    pub fn position(&self) -> Position {
        self.position_at(self.reader.buffer_position() as usize)
    }

    fn position_at(&self, relative: usize) -> Position {
        self.lines.position(self.input, relative + self.bom_len)
    }

    fn error_at(&self, message: impl Into<String>, position: Position) -> Error {
        Error::from(
            Diagnostic::xml(format!("{} (byte offset {})", message.into(), position.offset))
                .with_position(position.line, position.column),
        )
    }

    /// Pull the next event, `None` at end of input
    pub fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        if self.pending_pop {
            self.scopes.pop();
            self.pending_pop = false;
        }

        if let Some((name, position)) = self.pending_end.take() {
            return Ok(Some(self.close_element(name, position)));
        }

        let mut buf = std::mem::take(&mut self.buf);
        let result = self.read_one(&mut buf);
        buf.clear();
        self.buf = buf;
        result
    }

    fn read_one(&mut self, buf: &mut Vec<u8>) -> Result<Option<XmlEvent>> {
        loop {
            buf.clear();
            let position = self.position();
            let event = match self.reader.read_event_into(buf) {
                Ok(event) => event,
                Err(e) => {
                    let pos = self.position();
                    return Err(self.error_at(e.to_string(), pos));
                }
            };

            match event {
                Event::Start(e) => {
                    let start = self.open_element(&e, position)?;
                    return Ok(Some(XmlEvent::StartElement(start)));
                }
                Event::Empty(e) => {
                    let start = self.open_element(&e, position)?;
                    self.pending_end = Some((start.name.clone(), position));
                    return Ok(Some(XmlEvent::StartElement(start)));
                }
                Event::End(e) => {
                    if self.depth() == 0 {
                        return Err(self.error_at("unexpected end tag", position));
                    }
                    let raw = std::str::from_utf8(e.name().as_ref())
                        .map_err(|_| self.error_at("end tag name is not valid UTF-8", position))?
                        .to_string();
                    let name = self.resolve_element_name(&raw, position)?;
                    return Ok(Some(self.close_element(name, position)));
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(|err| self.error_at(err.to_string(), position))?
                        .into_owned();
                    if self.depth() == 0 {
                        if !is_all_whitespace(&text) {
                            let msg = if self.root_closed {
                                "character data after the root element"
                            } else {
                                "non-whitespace character data before the root element"
                            };
                            return Err(self.error_at(msg, position));
                        }
                        continue;
                    }
                    return Ok(Some(XmlEvent::CharData(text)));
                }
                Event::CData(e) => {
                    if self.depth() == 0 {
                        return Err(self.error_at("CDATA section outside the root element", position));
                    }
                    let text = std::str::from_utf8(&e)
                        .map_err(|_| self.error_at("CDATA section is not valid UTF-8", position))?
                        .to_string();
                    return Ok(Some(XmlEvent::CharData(text)));
                }
                Event::Comment(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    return Ok(Some(XmlEvent::Comment(text)));
                }
                Event::PI(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    return Ok(Some(XmlEvent::ProcessingInstruction(text)));
                }
                Event::DocType(e) => {
                    if self.root_seen {
                        return Err(self.error_at("DOCTYPE after the root element", position));
                    }
                    let text = String::from_utf8_lossy(&e).into_owned();
                    return Ok(Some(XmlEvent::Directive(text)));
                }
                Event::Decl(_) => continue,
                Event::Eof => {
                    if self.depth() > 0 {
                        return Err(self.error_at("unexpected end of input: unclosed element", position));
                    }
                    if !self.root_seen {
                        return Err(self.error_at("document has no root element", position));
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Consume events up to and including the end tag matching the last start tag
    pub fn skip_subtree(&mut self) -> Result<()> {
        let target = self.depth().saturating_sub(1);
        loop {
            match self.next_event()? {
                Some(XmlEvent::EndElement { .. }) if self.depth() == target => return Ok(()),
                Some(_) => {}
                None => {
                    let pos = self.position();
                    return Err(self.error_at("unexpected end of input while skipping", pos));
                }
            }
        }
    }

    fn open_element(&mut self, e: &BytesStart<'_>, position: Position) -> Result<StartElement> {
        if self.root_closed && self.depth() == 0 {
            return Err(self.error_at("content after the root element", position));
        }
        self.limits.check_xml_depth(self.depth() + 1)?;

        let mut scope = self.scopes.last().cloned().unwrap_or_default();
        let mut declarations = Vec::new();
        let mut raw_attributes = Vec::new();

        for attr in e.attributes() {
            let attr = attr.map_err(|err| self.error_at(err.to_string(), position))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|_| self.error_at("attribute name is not valid UTF-8", position))?
                .to_string();
            let raw = std::str::from_utf8(&attr.value)
                .map_err(|_| self.error_at("attribute value is not valid UTF-8", position))?;
            // attribute-value normalisation happens before reference expansion
            let normalized: String = raw
                .chars()
                .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
                .collect();
            let value = quick_xml::escape::unescape(&normalized)
                .map_err(|err| self.error_at(err.to_string(), position))?
                .into_owned();

            if key == "xmlns" {
                scope.declare(None, &value);
                declarations.push(Attribute {
                    namespace: XMLNS_NAMESPACE.to_string(),
                    local: "xmlns".to_string(),
                    value,
                });
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                if value.is_empty() {
                    return Err(self.error_at(
                        format!("namespace prefix '{}' cannot be undeclared", prefix),
                        position,
                    ));
                }
                scope.declare(Some(prefix), &value);
                declarations.push(Attribute {
                    namespace: XMLNS_NAMESPACE.to_string(),
                    local: prefix.to_string(),
                    value,
                });
            } else {
                raw_attributes.push((key, value));
            }
        }

        let count = declarations.len() + raw_attributes.len();
        self.limits.check_attributes(count)?;

        self.scopes.push(scope);
        self.root_seen = true;

        let raw_name = std::str::from_utf8(e.name().as_ref())
            .map_err(|_| self.error_at("element name is not valid UTF-8", position))?
            .to_string();
        let name = self.resolve_element_name(&raw_name, position)?;

        let mut attributes = declarations;
        for (key, value) in raw_attributes {
            let (namespace, local) = match key.split_once(':') {
                Some((prefix, local)) => {
                    let ns = self.current_scope().get_namespace(prefix).ok_or_else(|| {
                        self.error_at(format!("undeclared namespace prefix '{}'", prefix), position)
                    })?;
                    (ns.to_string(), local.to_string())
                }
                None => (String::new(), key),
            };
            if attributes
                .iter()
                .any(|a| a.namespace == namespace && a.local == local)
            {
                return Err(self.error_at(
                    format!("duplicate attribute '{}'", local),
                    position,
                ));
            }
            attributes.push(Attribute {
                namespace,
                local,
                value,
            });
        }

        Ok(StartElement {
            name,
            attributes,
            scope_depth: self.scopes.len() - 1,
            position,
        })
    }

    fn close_element(&mut self, name: QName, position: Position) -> XmlEvent {
        self.pending_pop = true;
        if self.scopes.len() == 2 {
            self.root_closed = true;
        }
        XmlEvent::EndElement { name, position }
    }

    fn current_scope(&self) -> &NamespaceContext {
        &self.scopes[self.scopes.len() - 1]
    }

    fn resolve_element_name(&self, raw: &str, position: Position) -> Result<QName> {
        match raw.split_once(':') {
            Some((prefix, local)) => {
                let ns = self.current_scope().get_namespace(prefix).ok_or_else(|| {
                    self.error_at(format!("undeclared namespace prefix '{}'", prefix), position)
                })?;
                Ok(QName::new(ns, local))
            }
            None => Ok(QName::new(
                self.current_scope().get_default_namespace().unwrap_or_default(),
                raw,
            )),
        }
    }
}
