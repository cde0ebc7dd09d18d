//! XML namespace handling
//!
//! Qualified names, the reserved namespace URIs, and the prefix context
//! used to turn lexical QNames found in schema documents into [`QName`]s.

use crate::error::Diagnostic;
use crate::names::is_valid_qname;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// XML Namespace URI; the empty string denotes "no namespace"
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace, bound to the `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace of `xmlns` declarations
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Placeholder for `##targetNamespace` inside namespace-list wildcards
pub const TARGET_NAMESPACE_PLACEHOLDER: &str = "##targetNamespace";

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QName {
    /// Namespace URI, empty for no namespace
    pub namespace: NamespaceUri,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new(String::new(), local_name)
    }

    /// Create a QName in the XSD namespace
    pub fn xsd(local_name: impl Into<String>) -> Self {
        Self::new(XSD_NAMESPACE, local_name)
    }

    /// Whether the name has no namespace
    pub fn has_no_namespace(&self) -> bool {
        self.namespace.is_empty()
    }

    /// Whether the name lives in the XSD namespace
    pub fn is_xsd(&self) -> bool {
        self.namespace == XSD_NAMESPACE
    }

    /// The same local name moved to another namespace
    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        Self::new(namespace, self.local_name.clone())
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        }
    }
}

/// How unprefixed lexical QNames are bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QNamePolicy {
    /// Unprefixed names take the in-scope default namespace, if any
    UseDefaultNamespace,
    /// Unprefixed names are always in no namespace
    ForceEmptyNamespace,
}

/// Namespace context for resolving prefixes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: BTreeMap<Prefix, NamespaceUri>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace prefix mapping; an empty URI undeclares the prefix
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        let prefix = prefix.into();
        let namespace = namespace.into();
        if namespace.is_empty() {
            self.prefixes.remove(&prefix);
        } else {
            self.prefixes.insert(prefix, namespace);
        }
    }

    /// Set the default namespace; empty undeclares it
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        self.default_namespace = if namespace.is_empty() { None } else { Some(namespace) };
    }

    /// Apply one `xmlns` / `xmlns:p` declaration
    pub fn declare(&mut self, prefix: Option<&str>, namespace: &str) {
        match prefix {
            Some(p) => self.add_prefix(p, namespace),
            None => self.set_default_namespace(namespace),
        }
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Iterate over prefix bindings in prefix order
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Number of declared bindings, default namespace included
    pub fn len(&self) -> usize {
        self.prefixes.len() + usize::from(self.default_namespace.is_some())
    }

    /// Whether nothing is declared
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a lexical QName under the given policy
    ///
    /// An unknown prefix is a `schema-reference-error`.
    pub fn resolve_qname(&self, lexical: &str, policy: QNamePolicy) -> Result<QName, Diagnostic> {
        let lexical = crate::names::trim_xml_whitespace(lexical);
        if !is_valid_qname(lexical) {
            return Err(Diagnostic::parse(format!("'{}' is not a valid QName", lexical))
                .with_actual(lexical));
        }

        if let Some((prefix, local)) = lexical.split_once(':') {
            let namespace = self.get_namespace(prefix).ok_or_else(|| {
                Diagnostic::reference(format!("undefined namespace prefix '{}'", prefix))
                    .with_actual(lexical)
            })?;
            Ok(QName::new(namespace, local))
        } else {
            let namespace = match policy {
                QNamePolicy::UseDefaultNamespace => {
                    self.default_namespace.clone().unwrap_or_default()
                }
                QNamePolicy::ForceEmptyNamespace => String::new(),
            };
            Ok(QName::new(namespace, lexical))
        }
    }

    /// Resolve with the default-namespace policy
    pub fn resolve(&self, lexical: &str) -> Result<QName, Diagnostic> {
        self.resolve_qname(lexical, QNamePolicy::UseDefaultNamespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_qname_creation() {
        let qname = QName::new("http://example.com", "element");
        assert_eq!(qname.namespace, "http://example.com");
        assert_eq!(qname.local_name, "element");
        assert!(QName::local("x").has_no_namespace());
        assert!(QName::xsd("string").is_xsd());
    }

    #[test]
    fn test_qname_display() {
        let qname = QName::new("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");
        assert_eq!(QName::local("element").to_string(), "element");
    }

    #[test]
    fn test_namespace_context() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", XSD_NAMESPACE);
        ctx.set_default_namespace("http://example.com");

        assert_eq!(ctx.get_namespace("xs"), Some(XSD_NAMESPACE));
        assert_eq!(ctx.get_namespace("xml"), Some(XML_NAMESPACE));
        assert_eq!(ctx.get_default_namespace(), Some("http://example.com"));

        ctx.declare(None, "");
        assert_eq!(ctx.get_default_namespace(), None);
    }

    #[test]
    fn test_resolve_policies() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", XSD_NAMESPACE);
        ctx.set_default_namespace("urn:d");

        let q = ctx.resolve("xs:element").unwrap();
        assert_eq!(q, QName::xsd("element"));

        let q = ctx.resolve_qname("a", QNamePolicy::UseDefaultNamespace).unwrap();
        assert_eq!(q, QName::new("urn:d", "a"));

        let q = ctx.resolve_qname("a", QNamePolicy::ForceEmptyNamespace).unwrap();
        assert_eq!(q, QName::local("a"));
    }

    #[test]
    fn test_unknown_prefix() {
        let ctx = NamespaceContext::new();
        let err = ctx.resolve("abc:string").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Reference);
        assert!(err.message.contains("undefined namespace prefix 'abc'"));
    }
}
