//! Resource providers
//!
//! The schema-set loader reads schema bytes through a [`ResourceProvider`],
//! a filesystem-like interface with a single `open` primitive. Two
//! providers ship with the crate: [`FsProvider`] over the local filesystem
//! and [`MemoryProvider`] over an in-memory map, handy for tests and for
//! embedding schemas in a binary.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::{normalize_path, Location};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;

/// Filesystem-like source of schema documents
pub trait ResourceProvider: Send + Sync {
    /// Open the resource at a canonical location
    fn open(&self, location: &Location) -> io::Result<Box<dyn Read + '_>>;

    /// Identifier of this provider, part of every document cache key
    fn id(&self) -> &str;
}

/// Provider over the local filesystem, optionally rooted at a directory
#[derive(Debug, Clone, Default)]
pub struct FsProvider {
    root: Option<PathBuf>,
}

impl FsProvider {
    /// Create a provider resolving locations against the working directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider resolving relative locations against `root`
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, location: &Location) -> io::Result<PathBuf> {
        match location {
            Location::Path(p) => {
                let path = PathBuf::from(p);
                match &self.root {
                    Some(root) if path.is_relative() => Ok(root.join(path)),
                    _ => Ok(path),
                }
            }
            Location::Url(url) if url.scheme() == "file" => url.to_file_path().map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, format!("invalid file URL '{}'", url))
            }),
            Location::Url(url) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("remote resources are not supported: '{}'", url),
            )),
        }
    }
}

impl ResourceProvider for FsProvider {
    fn open(&self, location: &Location) -> io::Result<Box<dyn Read + '_>> {
        let path = self.path_for(location)?;
        Ok(Box::new(fs::File::open(path)?))
    }

    fn id(&self) -> &str {
        "fs"
    }
}

/// Provider over an in-memory map of documents
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    id: String,
    files: HashMap<String, Vec<u8>>,
}

impl MemoryProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self {
            id: "memory".to_string(),
            files: HashMap::new(),
        }
    }

    /// Set the provider identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Add a document, builder style
    pub fn with_file(mut self, location: &str, content: impl Into<Vec<u8>>) -> Self {
        self.insert(location, content);
        self
    }

    /// Add or replace a document
    pub fn insert(&mut self, location: &str, content: impl Into<Vec<u8>>) {
        self.files
            .insert(Location::parse(location).as_str().to_string(), content.into());
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no document is stored
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ResourceProvider for MemoryProvider {
    fn open(&self, location: &Location) -> io::Result<Box<dyn Read + '_>> {
        let key = match location {
            Location::Path(p) => normalize_path(p),
            Location::Url(u) => u.as_str().to_string(),
        };
        match self.files.get(&key) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such resource '{}'", key),
            )),
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// Read a whole resource, enforcing the size limit
pub fn load_bytes(
    provider: &dyn ResourceProvider,
    location: &Location,
    limits: &Limits,
) -> Result<Vec<u8>> {
    let reader = provider
        .open(location)
        .map_err(|e| Error::io(location.as_str(), e))?;

    let cap = limits.max_xml_size.saturating_add(1) as u64;
    let mut bytes = Vec::new();
    reader
        .take(cap)
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(location.as_str(), e))?;

    limits.check_xml_size(bytes.len())?;
    Ok(bytes)
}
