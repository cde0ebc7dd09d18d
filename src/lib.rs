//! # xsdcore
//!
//! XML Schema 1.0 loading, parsing and semantic resolution.
//!
//! Given the location of a root schema document and a resource provider,
//! xsdcore follows `include` and `import` directives, parses every
//! reachable document into schema components, binds every named
//! reference, checks derivations and facets, and returns a frozen
//! [`SchemaSet`] with fast lookups by qualified name. The frozen set is
//! read-only and can be shared across threads behind an `Arc`.
//!
//! ## Pipeline
//!
//! - [`reader`]: pull reader over `quick-xml` with namespace resolution
//! - [`documents`]: arena DOM built from reader events
//! - [`validators::parsing`]: one schema document into components
//! - [`validators::loader`]: the document graph into one schema set
//! - [`validators::resolver`]: references, derivations and values
//!
//! ## Example
//!
//! ```rust
//! use xsdcore::{MemoryProvider, QName, SchemaSetLoader};
//!
//! let provider = MemoryProvider::new().with_file(
//!     "main.xsd",
//!     r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
//!                   xmlns:tns="urn:t" targetNamespace="urn:t">
//!          <xs:element name="root" type="tns:T"/>
//!          <xs:complexType name="T"><xs:sequence>
//!            <xs:element name="item" type="xs:int" maxOccurs="unbounded"/>
//!          </xs:sequence></xs:complexType>
//!        </xs:schema>"#,
//! );
//! let set = SchemaSetLoader::new(provider).build("main.xsd")?;
//! let root = set.lookup_element(&QName::new("urn:t", "root")).unwrap();
//! assert!(set.element_type(root).unwrap().is_complex());
//! # Ok::<(), xsdcore::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Names and locations
pub mod locations;
pub mod names;
pub mod namespaces;

// Resource loading and XML
pub mod documents;
pub mod loaders;
pub mod reader;

// Schema components
pub mod validators;
pub mod xpath;

// Re-exports for convenience
pub use error::{Diagnostic, Error, ErrorKind, Result, ValidationList};
pub use limits::Limits;
pub use loaders::{FsProvider, MemoryProvider, ResourceProvider};
pub use locations::Location;
pub use namespaces::{NamespaceContext, QName};
pub use validators::{
    build_schema_set, load_schema_set, ComponentCounts, Resolver, SchemaSet, SchemaSetLoader,
    TypeView,
};

/// Version of the xsdcore library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD 1.0 namespace
pub const XSD_NAMESPACE: &str = namespaces::XSD_NAMESPACE;

/// XML namespace
pub const XML_NAMESPACE: &str = namespaces::XML_NAMESPACE;

/// XSI namespace
pub const XSI_NAMESPACE: &str = namespaces::XSI_NAMESPACE;
