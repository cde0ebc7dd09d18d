//! XSD Wildcard components
//!
//! This module implements wildcards for XSD element and attribute content:
//! - xs:any - allows any element from specified namespaces
//! - xs:anyAttribute - allows any attribute from specified namespaces
//!
//! Namespace lists may hold the `##targetNamespace` sentinel until the
//! wildcard is resolved, so that chameleon includes can rehome it.

use std::fmt;

use super::base::SourceInfo;
use super::particles::Occurs;
use crate::names::split_xml_whitespace;
use crate::namespaces::TARGET_NAMESPACE_PLACEHOLDER;

/// Process contents mode for wildcards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    /// Validate strictly - element/attribute must be declared
    #[default]
    Strict,
    /// Validate if declaration found, otherwise accept
    Lax,
    /// Skip validation entirely
    Skip,
}

impl ProcessContents {
    /// Parse from string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Namespace constraint for wildcards
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceConstraint {
    /// Any namespace is allowed (##any)
    #[default]
    Any,
    /// Any namespace except the given one and no namespace (##other)
    Other(String),
    /// Listed namespaces, the empty string standing for no namespace
    Enumeration(Vec<String>),
}

impl NamespaceConstraint {
    /// Create from a `namespace` attribute value
    ///
    /// A missing attribute means `##any`, an empty one `##local`.
    /// `##targetNamespace` tokens are kept as the sentinel.
    pub fn from_namespace_attr(value: Option<&str>, target_namespace: &str) -> Result<Self, String> {
        let value = match value {
            None => return Ok(Self::Any),
            Some(v) => v,
        };
        let tokens: Vec<&str> = split_xml_whitespace(value).collect();
        match tokens.as_slice() {
            [] => Ok(Self::Enumeration(vec![String::new()])),
            ["##any"] => Ok(Self::Any),
            ["##other"] => Ok(Self::Other(target_namespace.to_string())),
            _ => {
                let mut namespaces: Vec<String> = Vec::new();
                for token in tokens {
                    let ns = match token {
                        "##local" => String::new(),
                        "##targetNamespace" => TARGET_NAMESPACE_PLACEHOLDER.to_string(),
                        "##any" | "##other" => {
                            return Err(format!(
                                "'{}' cannot appear in a namespace list: '{}'",
                                token, value
                            ))
                        }
                        s if s.starts_with("##") => {
                            return Err(format!("wrong value '{}' in 'namespace' attribute", s))
                        }
                        uri => uri.to_string(),
                    };
                    if !namespaces.contains(&ns) {
                        namespaces.push(ns);
                    }
                }
                Ok(Self::Enumeration(namespaces))
            }
        }
    }

    /// Replace `##targetNamespace` sentinels with the actual namespace
    pub fn resolve_target(&mut self, target_namespace: &str) {
        if let Self::Enumeration(list) = self {
            let mut resolved: Vec<String> = Vec::with_capacity(list.len());
            for ns in list.drain(..) {
                let ns = if ns == TARGET_NAMESPACE_PLACEHOLDER {
                    target_namespace.to_string()
                } else {
                    ns
                };
                if !resolved.contains(&ns) {
                    resolved.push(ns);
                }
            }
            *list = resolved;
        }
    }

    /// Whether any `##targetNamespace` sentinel remains
    pub fn has_placeholder(&self) -> bool {
        matches!(self, Self::Enumeration(list) if list.iter().any(|ns| ns == TARGET_NAMESPACE_PLACEHOLDER))
    }

    /// Check if a namespace is allowed by this constraint
    pub fn is_allowed(&self, namespace: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Other(excluded) => !namespace.is_empty() && namespace != excluded,
            Self::Enumeration(list) => list.iter().any(|ns| ns == namespace),
        }
    }

    /// Intersection of two constraints, `None` when not expressible
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (a, b) if a == b => Some(a.clone()),
            (Self::Any, x) | (x, Self::Any) => Some(x.clone()),
            (Self::Other(excluded), Self::Enumeration(list))
            | (Self::Enumeration(list), Self::Other(excluded)) => Some(Self::Enumeration(
                list.iter()
                    .filter(|ns| !ns.is_empty() && *ns != excluded)
                    .cloned()
                    .collect(),
            )),
            (Self::Enumeration(a), Self::Enumeration(b)) => Some(Self::Enumeration(
                a.iter().filter(|ns| b.contains(ns)).cloned().collect(),
            )),
            (Self::Other(a), Self::Other(b)) => {
                if a.is_empty() {
                    Some(Self::Other(b.clone()))
                } else if b.is_empty() {
                    Some(Self::Other(a.clone()))
                } else {
                    None
                }
            }
        }
    }

    /// Union of two constraints, `None` when not expressible
    pub fn union(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (a, b) if a == b => Some(a.clone()),
            (Self::Any, _) | (_, Self::Any) => Some(Self::Any),
            (Self::Enumeration(a), Self::Enumeration(b)) => {
                let mut merged = a.clone();
                for ns in b {
                    if !merged.contains(ns) {
                        merged.push(ns.clone());
                    }
                }
                Some(Self::Enumeration(merged))
            }
            (Self::Other(_), Self::Other(_)) => Some(Self::Other(String::new())),
            (Self::Other(excluded), Self::Enumeration(list))
            | (Self::Enumeration(list), Self::Other(excluded)) => {
                let has_absent = list.iter().any(|ns| ns.is_empty());
                if excluded.is_empty() {
                    return Some(if has_absent { Self::Any } else { Self::Other(String::new()) });
                }
                let has_excluded = list.iter().any(|ns| ns == excluded);
                match (has_excluded, has_absent) {
                    (true, true) => Some(Self::Any),
                    (true, false) => Some(Self::Other(String::new())),
                    (false, true) => None,
                    (false, false) => Some(Self::Other(excluded.clone())),
                }
            }
        }
    }

    /// Whether this constraint allows a subset of `other`'s namespaces
    pub fn is_subset_of(&self, other: &Self) -> bool {
        match (self, other) {
            (_, Self::Any) => true,
            (Self::Any, _) => false,
            (Self::Other(a), Self::Other(b)) => a == b || b.is_empty(),
            (Self::Enumeration(list), Self::Other(excluded)) => list
                .iter()
                .all(|ns| !ns.is_empty() && ns != excluded),
            (Self::Other(_), Self::Enumeration(_)) => false,
            (Self::Enumeration(a), Self::Enumeration(b)) => a.iter().all(|ns| b.contains(ns)),
        }
    }
}

impl fmt::Display for NamespaceConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "##any"),
            Self::Other(ns) => write!(f, "##other({})", ns),
            Self::Enumeration(list) => {
                let tokens: Vec<&str> = list
                    .iter()
                    .map(|ns| if ns.is_empty() { "##local" } else { ns.as_str() })
                    .collect();
                write!(f, "{}", tokens.join(" "))
            }
        }
    }
}

/// Wildcard shared by `any` and `anyAttribute`
#[derive(Debug, Clone, PartialEq)]
pub struct Wildcard {
    /// Namespace constraint
    pub namespace: NamespaceConstraint,
    /// Process contents mode
    pub process_contents: ProcessContents,
    /// Target namespace of the declaring document
    pub target_namespace: String,
    /// Declaration site
    pub source: SourceInfo,
}

impl Wildcard {
    /// Create a `##any` strict wildcard
    pub fn new(target_namespace: impl Into<String>) -> Self {
        Self {
            namespace: NamespaceConstraint::Any,
            process_contents: ProcessContents::Strict,
            target_namespace: target_namespace.into(),
            source: SourceInfo::default(),
        }
    }

    /// Check if a namespace is allowed
    pub fn is_namespace_allowed(&self, namespace: &str) -> bool {
        self.namespace.is_allowed(namespace)
    }

    /// Attribute wildcard intersection, keeping this wildcard's process contents
    pub fn intersect(&self, other: &Wildcard) -> Option<Wildcard> {
        let namespace = self.namespace.intersection(&other.namespace)?;
        Some(Wildcard {
            namespace,
            ..self.clone()
        })
    }

    /// Attribute wildcard union, keeping this wildcard's process contents
    pub fn unite(&self, other: &Wildcard) -> Option<Wildcard> {
        let namespace = self.namespace.union(&other.namespace)?;
        Some(Wildcard {
            namespace,
            ..self.clone()
        })
    }
}

/// Element wildcard particle (`xs:any`)
#[derive(Debug, Clone, PartialEq)]
pub struct AnyElement {
    /// Wildcard
    pub wildcard: Wildcard,
    /// Occurrence bounds
    pub occurs: Occurs,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> NamespaceConstraint {
        NamespaceConstraint::Enumeration(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_namespace_attr() {
        assert_eq!(
            NamespaceConstraint::from_namespace_attr(None, "urn:t").unwrap(),
            NamespaceConstraint::Any
        );
        assert_eq!(
            NamespaceConstraint::from_namespace_attr(Some(""), "urn:t").unwrap(),
            list(&[""])
        );
        assert_eq!(
            NamespaceConstraint::from_namespace_attr(Some("##other"), "urn:t").unwrap(),
            NamespaceConstraint::Other("urn:t".into())
        );
        assert_eq!(
            NamespaceConstraint::from_namespace_attr(Some("##local urn:a ##targetNamespace"), "urn:t")
                .unwrap(),
            list(&["", "urn:a", "##targetNamespace"])
        );
    }

    #[test]
    fn test_namespace_attr_errors() {
        assert!(NamespaceConstraint::from_namespace_attr(Some("urn:a ##any"), "").is_err());
        assert!(NamespaceConstraint::from_namespace_attr(Some("##other ##local"), "").is_err());
        assert!(NamespaceConstraint::from_namespace_attr(Some("##foo"), "").is_err());
    }

    #[test]
    fn test_resolve_target() {
        let mut c = list(&["##targetNamespace", "urn:t"]);
        assert!(c.has_placeholder());
        c.resolve_target("urn:t");
        assert_eq!(c, list(&["urn:t"]));
        assert!(!c.has_placeholder());
    }

    #[test]
    fn test_is_allowed() {
        let other = NamespaceConstraint::Other("urn:t".into());
        assert!(other.is_allowed("urn:x"));
        assert!(!other.is_allowed("urn:t"));
        assert!(!other.is_allowed(""));
        assert!(list(&["", "urn:a"]).is_allowed(""));
    }

    #[test]
    fn test_intersection() {
        let other = NamespaceConstraint::Other("urn:t".into());
        assert_eq!(
            other.intersection(&list(&["", "urn:t", "urn:a"])),
            Some(list(&["urn:a"]))
        );
        assert_eq!(
            list(&["urn:a", "urn:b"]).intersection(&list(&["urn:b", "urn:c"])),
            Some(list(&["urn:b"]))
        );
        assert_eq!(
            other.intersection(&NamespaceConstraint::Other("urn:u".into())),
            None
        );
        assert_eq!(
            other.intersection(&NamespaceConstraint::Any),
            Some(other.clone())
        );
    }

    #[test]
    fn test_union() {
        let other = NamespaceConstraint::Other("urn:t".into());
        assert_eq!(other.union(&list(&["urn:t", ""])), Some(NamespaceConstraint::Any));
        assert_eq!(other.union(&list(&[""])), None);
        assert_eq!(other.union(&list(&["urn:a"])), Some(other.clone()));
        assert_eq!(
            other.union(&NamespaceConstraint::Other("urn:u".into())),
            Some(NamespaceConstraint::Other(String::new()))
        );
    }

    #[test]
    fn test_subset() {
        let other = NamespaceConstraint::Other("urn:t".into());
        assert!(list(&["urn:a"]).is_subset_of(&other));
        assert!(!list(&[""]).is_subset_of(&other));
        assert!(!NamespaceConstraint::Any.is_subset_of(&other));
    }
}
