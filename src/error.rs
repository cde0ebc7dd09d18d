//! Error types for xsdcore
//!
//! This module defines the closed set of error kinds produced while loading,
//! parsing and resolving XML Schema documents, the structured [`Diagnostic`]
//! record carried by each of them, and the [`ValidationList`] aggregate the
//! resolver uses to report every remaining issue at once.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias using xsdcore Error
pub type Result<T> = std::result::Result<T, Error>;

/// The closed family of error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Malformed XML fed to any stage
    XmlParse,
    /// Structural XSD violation found while parsing one document
    SchemaParse,
    /// Unresolved QName, undeclared prefix or non-imported namespace
    Reference,
    /// Facet inconsistency, cycles, derivation violations, leftover placeholders
    Semantic,
    /// Failure of the resource provider
    Io,
}

impl ErrorKind {
    /// The generic error code of this kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::XmlParse => "xml-parse-error",
            Self::SchemaParse => "schema-parse-error",
            Self::Reference => "schema-reference-error",
            Self::Semantic => "schema-semantic-error",
            Self::Io => "io-error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One structured diagnostic
///
/// `code` is either a W3C XSD code (`src-resolve`, `cos-st-restricts`, ...)
/// or the generic code of the kind. `path` is the XSD component path, e.g.
/// `/schema/complexType[@name='T']/sequence/element[@name='x']`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Error kind
    pub kind: ErrorKind,
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// XSD component path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Offending value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    /// Values that would have been accepted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expected: Vec<String>,
    /// 1-based source line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// 1-based source column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    /// Location of the schema document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic carrying the generic code of `kind`
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code().to_string(),
            message: message.into(),
            path: None,
            actual: None,
            expected: Vec::new(),
            line: None,
            column: None,
            document: None,
        }
    }

    /// Shorthand for a `schema-parse-error`
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaParse, message)
    }

    /// Shorthand for a `schema-reference-error`
    pub fn reference(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Reference, message)
    }

    /// Shorthand for a `schema-semantic-error`
    pub fn semantic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Semantic, message)
    }

    /// Shorthand for an `xml-parse-error`
    pub fn xml(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::XmlParse, message)
    }

    /// Set a specific error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Set the component path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the offending value
    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    /// Set the accepted values
    pub fn with_expected<I, S>(mut self, expected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected = expected.into_iter().map(Into::into).collect();
        self
    }

    /// Set the source position
    pub fn with_position(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Set the schema document location
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Fill in the document location unless one is already present
    pub fn or_document(mut self, document: Option<&str>) -> Self {
        if self.document.is_none() {
            self.document = document.map(str::to_string);
        }
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;

        if let Some(ref path) = self.path {
            write!(f, " at {}", path)?;
        }

        match (&self.document, self.line, self.column) {
            (Some(doc), Some(line), Some(col)) => write!(f, " ({}:{}:{})", doc, line, col)?,
            (Some(doc), _, _) => write!(f, " ({})", doc)?,
            (None, Some(line), Some(col)) => write!(f, " (line {}, column {})", line, col)?,
            _ => {}
        }

        Ok(())
    }
}

/// Diagnostics in their order of discovery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationList(Vec<Diagnostic>);

impl ValidationList {
    /// Create an empty list
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Number of diagnostics
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the diagnostics
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// Borrow the diagnostics as a slice
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    /// Extract the underlying list
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }

    /// Turn a non-empty list into an error
    pub fn into_result(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(Error::Semantic(self))
        }
    }
}

impl Extend<Diagnostic> for ValidationList {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl IntoIterator for ValidationList {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationList {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Diagnostic>> for ValidationList {
    fn from(items: Vec<Diagnostic>) -> Self {
        Self(items)
    }
}

impl fmt::Display for ValidationList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.len() {
            0 => write!(f, "no errors"),
            1 => write!(f, "{}", self.0[0]),
            n => {
                write!(f, "{} errors:", n)?;
                for d in &self.0 {
                    write!(f, "\n  {}", d)?;
                }
                Ok(())
            }
        }
    }
}

/// Main error type for xsdcore operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed XML
    #[error("{0}")]
    Xml(Box<Diagnostic>),

    /// Structural violation in a schema document
    #[error("{0}")]
    Parse(Box<Diagnostic>),

    /// Unresolvable reference
    #[error("{0}")]
    Reference(Box<Diagnostic>),

    /// Every semantic issue found by the resolver
    #[error("{0}")]
    Semantic(ValidationList),

    /// Resource provider failure
    #[error("cannot read '{location}': {source}")]
    Io {
        /// Attempted location
        location: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Mutation attempted on a frozen schema set
    #[error("schema set is frozen: {0}")]
    Frozen(String),

    /// Loading or resolution was cancelled
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Wrap an I/O error with the attempted location
    pub fn io(location: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            location: location.into(),
            source,
        }
    }

    /// The error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Xml(_) => ErrorKind::XmlParse,
            Self::Parse(_) | Self::LimitExceeded(_) => ErrorKind::SchemaParse,
            Self::Reference(_) => ErrorKind::Reference,
            Self::Semantic(_) | Self::Frozen(_) => ErrorKind::Semantic,
            Self::Io { .. } | Self::Cancelled => ErrorKind::Io,
        }
    }

    /// The code of the first underlying diagnostic
    pub fn code(&self) -> String {
        match self {
            Self::Xml(d) | Self::Parse(d) | Self::Reference(d) => d.code.clone(),
            Self::Semantic(list) => list
                .iter()
                .next()
                .map(|d| d.code.clone())
                .unwrap_or_else(|| ErrorKind::Semantic.code().to_string()),
            other => other.kind().code().to_string(),
        }
    }

    /// Extract every underlying diagnostic
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::Xml(d) | Self::Parse(d) | Self::Reference(d) => vec![(**d).clone()],
            Self::Semantic(list) => list.as_slice().to_vec(),
            Self::Io { location, source } => vec![Diagnostic::new(ErrorKind::Io, source.to_string())
                .with_document(location.clone())],
            other => vec![Diagnostic::new(other.kind(), other.to_string())],
        }
    }

    /// Consume the error into its diagnostic list
    pub fn into_diagnostics(self) -> ValidationList {
        match self {
            Self::Semantic(list) => list,
            other => ValidationList::from(other.diagnostics()),
        }
    }

    /// Attach a document location to single-diagnostic errors that lack one
    pub fn in_document(self, document: &str) -> Self {
        match self {
            Self::Xml(d) => Self::Xml(Box::new(d.or_document(Some(document)))),
            Self::Parse(d) => Self::Parse(Box::new(d.or_document(Some(document)))),
            Self::Reference(d) => Self::Reference(Box::new(d.or_document(Some(document)))),
            other => other,
        }
    }
}

impl From<Diagnostic> for Error {
    fn from(d: Diagnostic) -> Self {
        match d.kind {
            ErrorKind::XmlParse => Self::Xml(Box::new(d)),
            ErrorKind::SchemaParse => Self::Parse(Box::new(d)),
            ErrorKind::Reference => Self::Reference(Box::new(d)),
            ErrorKind::Semantic => Self::Semantic(ValidationList::from(vec![d])),
            ErrorKind::Io => Self::Io {
                location: d.document.clone().unwrap_or_default(),
                source: std::io::Error::new(std::io::ErrorKind::Other, d.message),
            },
        }
    }
}
