//! Schema set loading
//!
//! [`SchemaSetLoader`] assembles a [`SchemaSet`] from one entry location:
//! it parses the entry document, follows its `include` and `import`
//! directives in document order and merges every reached document into the
//! set. Included documents without a target namespace are chameleons and
//! are rehomed into the including namespace.
//!
//! Documents are cached per loader under `(provider, location, effective
//! namespace)`, so a chameleon included into two namespaces is merged
//! twice while any other repeat visit is skipped.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::base::SourceInfo;
use super::globals::SchemaSet;
use super::parsing::parse_schema;
use super::resolver::Resolver;
use super::schemas::{Directive, Schema};
use crate::documents::DocumentPool;
use crate::error::{Diagnostic, Error, Result};
use crate::limits::Limits;
use crate::loaders::{load_bytes, FsProvider, ResourceProvider};
use crate::locations::Location;
use crate::reader::XmlReader;

/// How a document was reached
#[derive(Debug, Clone)]
enum Context {
    /// The entry document
    Root,
    /// `include` from a document of this namespace
    Include {
        namespace: String,
        source: SourceInfo,
    },
    /// `import` of this namespace
    Import {
        namespace: String,
        source: SourceInfo,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    provider: String,
    location: String,
    namespace: String,
}

/// Loader of schema sets over a resource provider
///
/// # Example
///
/// ```
/// use xsdcore::{MemoryProvider, QName, SchemaSetLoader};
///
/// let provider = MemoryProvider::new().with_file(
///     "main.xsd",
///     r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t">
///          <xs:element name="root" type="xs:string"/>
///        </xs:schema>"#,
/// );
/// let set = SchemaSetLoader::new(provider).build("main.xsd").unwrap();
/// assert!(set.lookup_element(&QName::new("urn:t", "root")).is_some());
/// ```
pub struct SchemaSetLoader {
    provider: Arc<dyn ResourceProvider>,
    limits: Limits,
    cancel: Option<Arc<AtomicBool>>,
    pool: DocumentPool,
}

impl SchemaSetLoader {
    /// Create a loader over `provider` with default limits
    pub fn new(provider: impl ResourceProvider + 'static) -> Self {
        Self::from_shared(Arc::new(provider))
    }

    /// Create a loader over a shared provider
    pub fn from_shared(provider: Arc<dyn ResourceProvider>) -> Self {
        Self {
            provider,
            limits: Limits::default(),
            cancel: None,
            pool: DocumentPool::default(),
        }
    }

    /// Create a loader over the local filesystem
    pub fn filesystem() -> Self {
        Self::new(FsProvider::new())
    }

    /// Set the resource limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set a flag that cancels loading and resolution once raised
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Resource limits in effect
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Load the schema set reachable from `location`, unresolved
    pub fn load(&self, location: &str) -> Result<SchemaSet> {
        let mut state = LoadState {
            loader: self,
            set: SchemaSet::new(),
            parsed: HashMap::new(),
            visited: HashSet::new(),
            components: 0,
        };
        state.load_document(&Location::parse(location), Context::Root, 0)?;
        debug!(
            location,
            documents = state.set.documents().len(),
            "schema set loaded"
        );
        Ok(state.set)
    }

    /// Load, resolve and freeze the schema set reachable from `location`
    pub fn build(&self, location: &str) -> Result<Arc<SchemaSet>> {
        let mut set = self.load(location)?;
        let mut resolver = Resolver::new();
        if let Some(cancel) = &self.cancel {
            resolver = resolver.with_cancel_flag(cancel.clone());
        }
        resolver.resolve(&mut set)?;
        Ok(set.into_shared())
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    /// Read and parse one document
    fn parse_document(&self, location: &Location) -> Result<Schema> {
        let bytes = load_bytes(self.provider.as_ref(), location, &self.limits)?;
        let mut reader = XmlReader::new(&bytes).with_limits(self.limits.clone());
        let mut document = self.pool.acquire().with_limits(self.limits.clone());
        let loaded = document
            .load(&mut reader)
            .map_err(|e| e.in_document(location.as_str()))
            .and_then(|_| parse_schema(&document, location.as_str()));
        self.pool.release(document);
        loaded
    }
}

impl std::fmt::Debug for SchemaSetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaSetLoader")
            .field("provider", &self.provider.id())
            .field("limits", &self.limits)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// Load the schema set reachable from `location` over `provider`, unresolved
pub fn load_schema_set(provider: impl ResourceProvider + 'static, location: &str) -> Result<SchemaSet> {
    SchemaSetLoader::new(provider).load(location)
}

/// Load, resolve and freeze the schema set reachable from `location`
pub fn build_schema_set(
    provider: impl ResourceProvider + 'static,
    location: &str,
) -> Result<Arc<SchemaSet>> {
    SchemaSetLoader::new(provider).build(location)
}

struct LoadState<'l> {
    loader: &'l SchemaSetLoader,
    set: SchemaSet,
    parsed: HashMap<String, Schema>,
    visited: HashSet<CacheKey>,
    components: usize,
}

impl LoadState<'_> {
    fn load_document(&mut self, location: &Location, context: Context, depth: usize) -> Result<()> {
        self.loader.check_cancelled()?;
        self.loader.limits.check_schema_depth(depth)?;

        let mut schema = match self.parsed.get(location.as_str()) {
            Some(schema) => schema.clone(),
            None => {
                let schema = self.loader.parse_document(location)?;
                self.parsed
                    .insert(location.as_str().to_string(), schema.clone());
                schema
            }
        };

        let namespace = effective_namespace(&schema, location, &context)?;
        let key = CacheKey {
            provider: self.loader.provider.id().to_string(),
            location: location.as_str().to_string(),
            namespace: namespace.clone(),
        };
        if !self.visited.insert(key) {
            debug!(location = %location, namespace = %namespace, "schema document already loaded");
            return Ok(());
        }
        self.loader
            .limits
            .check_schema_documents(self.set.documents().len() + 1)?;

        schema.rehome(&namespace);
        self.components += schema.components.len();
        self.loader.limits.check_schema_components(self.components)?;
        debug!(
            location = %location,
            target_namespace = %namespace,
            chameleon = schema.document.chameleon,
            components = schema.components.len(),
            "loaded schema document"
        );

        let directives = schema.document.directives.clone();
        self.merge(schema, &namespace)
            .map_err(|e| e.in_document(location.as_str()))?;

        for directive in directives {
            match directive {
                Directive::Include {
                    location: target,
                    source,
                } => {
                    let target = location.join(&target);
                    debug!(from = %location, to = %target, "following include");
                    self.load_document(
                        &target,
                        Context::Include {
                            namespace: namespace.clone(),
                            source,
                        },
                        depth + 1,
                    )?;
                }
                Directive::Import {
                    namespace: imported,
                    location: Some(target),
                    source,
                } => {
                    let target = location.join(&target);
                    debug!(from = %location, to = %target, namespace = %imported, "following import");
                    self.load_document(
                        &target,
                        Context::Import {
                            namespace: imported,
                            source,
                        },
                        depth + 1,
                    )?;
                }
                Directive::Import {
                    namespace: imported,
                    location: None,
                    ..
                } => {
                    debug!(from = %location, namespace = %imported, "import without schemaLocation");
                }
            }
        }
        Ok(())
    }

    fn merge(&mut self, schema: Schema, namespace: &str) -> Result<()> {
        for imported in schema.imported_namespaces() {
            self.set.add_import(namespace, &imported)?;
        }
        self.set.add_components(schema.components)?;
        for (head, members) in schema.substitution_groups {
            self.set.add_substitution_members(head, members)?;
        }
        for (id, component) in schema.ids {
            self.set.add_id(&id, component)?;
        }
        self.set.add_document(schema.document)
    }
}

/// Namespace the document's components land in
fn effective_namespace(schema: &Schema, location: &Location, context: &Context) -> Result<String> {
    let own = schema.target_namespace();
    match context {
        Context::Root => Ok(own.to_string()),
        Context::Include { namespace, .. } if own.is_empty() || own == namespace => {
            Ok(namespace.clone())
        }
        Context::Include { namespace, source } => Err(source
            .annotate(
                Diagnostic::parse(format!(
                    "included document '{}' has target namespace '{}' but the including namespace is '{}'",
                    location, own, namespace
                ))
                .with_code("src-include.2.1")
                .with_actual(own)
                .with_expected([namespace.as_str()]),
            )
            .into()),
        Context::Import { namespace, .. } if own == namespace => Ok(own.to_string()),
        Context::Import { namespace, source } => Err(source
            .annotate(
                Diagnostic::parse(format!(
                    "imported document '{}' has target namespace '{}' but the import names '{}'",
                    location, own, namespace
                ))
                .with_code("src-import.3.1")
                .with_actual(own)
                .with_expected([namespace.as_str()]),
            )
            .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::loaders::MemoryProvider;
    use crate::namespaces::QName;
    use pretty_assertions::assert_eq;

    const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

    fn schema(attrs: &str, body: &str) -> String {
        format!("<xs:schema {} {}>{}</xs:schema>", XS, attrs, body)
    }

    #[test]
    fn test_include_and_import() {
        let provider = MemoryProvider::new()
            .with_file(
                "dir/main.xsd",
                schema(
                    r#"targetNamespace="urn:a" xmlns:b="urn:b""#,
                    r#"<xs:include schemaLocation="part.xsd"/>
                       <xs:import namespace="urn:b" schemaLocation="../other/b.xsd"/>
                       <xs:element name="root" type="b:T"/>"#,
                ),
            )
            .with_file(
                "dir/part.xsd",
                schema(r#"targetNamespace="urn:a""#, r#"<xs:element name="part"/>"#),
            )
            .with_file(
                "other/b.xsd",
                schema(r#"targetNamespace="urn:b""#, r#"<xs:simpleType name="T"><xs:restriction base="xs:string"/></xs:simpleType>"#),
            );
        let set = SchemaSetLoader::new(provider).load("dir/main.xsd").unwrap();
        assert_eq!(set.documents().len(), 3);
        assert!(set.lookup_element(&QName::new("urn:a", "part")).is_some());
        assert!(set.lookup_type(&QName::new("urn:b", "T")).is_some());
        assert!(set.imported_namespaces("urn:a").unwrap().contains("urn:b"));
        assert!(!set.is_frozen());
    }

    #[test]
    fn test_include_namespace_mismatch() {
        let provider = MemoryProvider::new()
            .with_file(
                "main.xsd",
                schema(r#"targetNamespace="urn:a""#, r#"<xs:include schemaLocation="b.xsd"/>"#),
            )
            .with_file("b.xsd", schema(r#"targetNamespace="urn:b""#, ""));
        let err = SchemaSetLoader::new(provider).load("main.xsd").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaParse);
        assert_eq!(err.code(), "src-include.2.1");
        assert!(err.to_string().contains("included document"));
    }

    #[test]
    fn test_import_namespace_mismatch() {
        let provider = MemoryProvider::new()
            .with_file(
                "main.xsd",
                schema(
                    r#"targetNamespace="urn:a""#,
                    r#"<xs:import namespace="urn:c" schemaLocation="b.xsd"/>"#,
                ),
            )
            .with_file("b.xsd", schema(r#"targetNamespace="urn:b""#, ""));
        let err = SchemaSetLoader::new(provider).load("main.xsd").unwrap_err();
        assert_eq!(err.code(), "src-import.3.1");
    }

    #[test]
    fn test_chameleon_include_into_two_namespaces() {
        let provider = MemoryProvider::new()
            .with_file(
                "a.xsd",
                schema(
                    r#"targetNamespace="urn:a""#,
                    r#"<xs:include schemaLocation="common.xsd"/><xs:import namespace="urn:b" schemaLocation="b.xsd"/>"#,
                ),
            )
            .with_file(
                "b.xsd",
                schema(r#"targetNamespace="urn:b""#, r#"<xs:include schemaLocation="common.xsd"/>"#),
            )
            .with_file(
                "common.xsd",
                schema("", r#"<xs:element name="shared" id="shared-id"/>"#),
            );
        let set = SchemaSetLoader::new(provider).load("a.xsd").unwrap();
        assert!(set.lookup_element(&QName::new("urn:a", "shared")).is_some());
        assert!(set.lookup_element(&QName::new("urn:b", "shared")).is_some());
        assert!(set.lookup_element(&QName::local("shared")).is_none());
        assert_eq!(set.documents().len(), 4);
    }

    #[test]
    fn test_cyclic_includes_visit_once() {
        let provider = MemoryProvider::new()
            .with_file(
                "a.xsd",
                schema(
                    r#"targetNamespace="urn:a""#,
                    r#"<xs:include schemaLocation="./b.xsd"/><xs:element name="a"/>"#,
                ),
            )
            .with_file(
                "b.xsd",
                schema(
                    r#"targetNamespace="urn:a""#,
                    r#"<xs:include schemaLocation="sub/../a.xsd"/><xs:element name="b"/>"#,
                ),
            );
        let set = SchemaSetLoader::new(provider).load("a.xsd").unwrap();
        assert_eq!(set.documents().len(), 2);
        assert_eq!(set.elements().count(), 2);
    }

    #[test]
    fn test_duplicate_across_documents() {
        let provider = MemoryProvider::new()
            .with_file(
                "a.xsd",
                schema("", r#"<xs:include schemaLocation="b.xsd"/><xs:element name="x"/>"#),
            )
            .with_file("b.xsd", schema("", r#"<xs:element name="x"/>"#));
        let err = SchemaSetLoader::new(provider).load("a.xsd").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaParse);
        assert!(err.to_string().contains("duplicate element declaration"));
    }

    #[test]
    fn test_missing_document() {
        let provider = MemoryProvider::new().with_file(
            "a.xsd",
            schema("", r#"<xs:include schemaLocation="missing.xsd"/>"#),
        );
        let err = SchemaSetLoader::new(provider).load("a.xsd").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_xml_error_in_included_document() {
        let provider = MemoryProvider::new()
            .with_file("a.xsd", schema("", r#"<xs:include schemaLocation="b.xsd"/>"#))
            .with_file("b.xsd", schema("", "<xs:element name='x'></xs:complexType>"));
        let err = SchemaSetLoader::new(provider).load("a.xsd").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::XmlParse);
        assert_eq!(err.diagnostics()[0].document.as_deref(), Some("b.xsd"));
    }

    #[test]
    fn test_limits() {
        let provider = MemoryProvider::new()
            .with_file("a.xsd", schema("", r#"<xs:include schemaLocation="b.xsd"/>"#))
            .with_file("b.xsd", schema("", r#"<xs:element name="x"/><xs:element name="y"/>"#));
        let loader = SchemaSetLoader::new(provider)
            .with_limits(Limits::default().with_max_schema_documents(1));
        assert!(matches!(loader.load("a.xsd"), Err(Error::LimitExceeded(_))));

        let provider = MemoryProvider::new()
            .with_file("a.xsd", schema("", r#"<xs:element name="x"/><xs:element name="y"/>"#));
        let loader = SchemaSetLoader::new(provider)
            .with_limits(Limits::default().with_max_schema_components(1));
        assert!(matches!(loader.load("a.xsd"), Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn test_cancelled() {
        let provider = MemoryProvider::new().with_file("a.xsd", schema("", ""));
        let flag = Arc::new(AtomicBool::new(true));
        let loader = SchemaSetLoader::new(provider).with_cancel_flag(flag);
        assert!(matches!(loader.load("a.xsd"), Err(Error::Cancelled)));
    }
}
