//! Resource location resolution
//!
//! Locations handed to a resource provider are opaque strings, but two
//! spellings of the same resource must produce the same cache key. This
//! module canonicalises separators and `.`/`..` segments and resolves
//! `schemaLocation` values against the location of the referring document.

use std::fmt;
use url::Url;

/// Canonical resource location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// Absolute URL with a scheme (http, https, file, urn, ...)
    Url(Url),
    /// Filesystem-like path, absolute or relative, `/`-separated
    Path(String),
}

impl Location {
    /// Parse and canonicalise a location string
    pub fn parse(s: &str) -> Self {
        if has_url_scheme(s) {
            if let Ok(url) = Url::parse(s) {
                return Location::Url(url);
            }
        }
        Location::Path(normalize_path(s))
    }

    /// Resolve `relative` against this location
    pub fn join(&self, relative: &str) -> Self {
        if has_url_scheme(relative) {
            return Self::parse(relative);
        }

        match self {
            Location::Url(base) => match base.join(&relative.replace('\\', "/")) {
                Ok(url) => Location::Url(url),
                Err(_) => Location::Path(normalize_path(relative)),
            },
            Location::Path(base) => {
                let relative = relative.replace('\\', "/");
                if relative.starts_with('/') {
                    return Location::Path(normalize_path(&relative));
                }
                let dir = match base.rfind('/') {
                    Some(idx) => &base[..=idx],
                    None => "",
                };
                Location::Path(normalize_path(&format!("{}{}", dir, relative)))
            }
        }
    }

    /// Get the location as a string
    pub fn as_str(&self) -> &str {
        match self {
            Location::Url(u) => u.as_str(),
            Location::Path(p) => p.as_str(),
        }
    }

    /// Check if this is a URL location
    pub fn is_url(&self) -> bool {
        matches!(self, Location::Url(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the string starts with a URL scheme; single letters are drive letters
fn has_url_scheme(s: &str) -> bool {
    match s.find(':') {
        Some(idx) if idx > 1 => {
            let scheme = &s[..idx];
            scheme.chars().next().map_or(false, |c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Canonicalise a path lexically
///
/// Backslashes become `/`, repeated separators collapse, `.` segments drop
/// and `..` pops the previous segment. Leading `..` of relative paths are
/// kept; `..` above the root of an absolute path is discarded.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_location_from_url() {
        let loc = Location::parse("http://example.com/schema.xsd");
        assert!(loc.is_url());
    }

    #[test]
    fn test_location_from_path() {
        let loc = Location::parse("./schemas//a/../main.xsd");
        assert_eq!(loc, Location::Path("schemas/main.xsd".to_string()));
        let loc = Location::parse("C:\\schemas\\main.xsd");
        assert!(!loc.is_url());
        assert_eq!(loc.as_str(), "C:/schemas/main.xsd");
    }

    #[test]
    fn test_join_relative() {
        let base = Location::parse("schemas/main.xsd");
        assert_eq!(base.join("common/types.xsd").as_str(), "schemas/common/types.xsd");
        assert_eq!(base.join("../other.xsd").as_str(), "other.xsd");
        assert_eq!(base.join("./x/./y.xsd").as_str(), "schemas/x/y.xsd");
        assert_eq!(base.join("/abs/z.xsd").as_str(), "/abs/z.xsd");
    }

    #[test]
    fn test_join_url() {
        let base = Location::parse("http://example.com/a/main.xsd");
        assert_eq!(base.join("../b.xsd").as_str(), "http://example.com/b.xsd");
    }

    #[test]
    fn test_parent_of_relative_root() {
        assert_eq!(normalize_path("../../a.xsd"), "../../a.xsd");
        assert_eq!(normalize_path("/../a.xsd"), "/a.xsd");
    }

    proptest! {
        #[test]
        fn prop_normalize_idempotent(path in "[a-c./\\\\]{0,24}") {
            let once = normalize_path(&path);
            prop_assert_eq!(normalize_path(&once), once);
        }

        #[test]
        fn prop_dot_segments_equivalent(dir in "[a-z]{1,6}", file in "[a-z]{1,6}") {
            let plain = Location::parse(&format!("{}/{}.xsd", dir, file));
            let dotted = Location::parse(&format!("./{}/./x/../{}.xsd", dir, file));
            prop_assert_eq!(plain, dotted);
        }
    }
}
