//! XSD Particle Schema Components
//!
//! This module implements the particle model for XSD elements, groups, and wildcards.
//! Particles define occurrence constraints (minOccurs, maxOccurs) for schema components.

use std::fmt;
use std::num::IntErrorKind;

use super::elements::ElementDecl;
use super::groups::{GroupRef, ModelGroup};
use super::wildcards::AnyElement;
use crate::names::trim_xml_whitespace;

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// Check if this particle can be empty (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if this particle is empty (maxOccurs == 0)
    pub fn is_empty(&self) -> bool {
        self.max == Some(0)
    }

    /// Check if particle has maxOccurs == 1
    pub fn is_single(&self) -> bool {
        self.max == Some(1)
    }

    /// Check if this particle has a valid occurs restriction compared to another
    pub fn has_occurs_restriction(&self, other: &Occurs) -> bool {
        if self.min < other.min {
            return false;
        }
        match (self.max, other.max) {
            (Some(0), _) => true,
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(b)) => a <= b,
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}..{}]", self.min, max),
            None => write!(f, "[{}..unbounded]", self.min),
        }
    }
}

/// Occurrence bound, clamped to `u32::MAX` when larger
fn occurs_bound(text: &str) -> Option<u32> {
    match text.parse::<u32>() {
        Ok(value) => Some(value),
        Err(err) if *err.kind() == IntErrorKind::PosOverflow => Some(u32::MAX),
        Err(_) => None,
    }
}

/// Parse minOccurs/maxOccurs from XML attribute values
pub fn parse_occurs(min_occurs: Option<&str>, max_occurs: Option<&str>) -> Result<Occurs, String> {
    let mut occurs = Occurs::once();

    if let Some(min_str) = min_occurs {
        match occurs_bound(trim_xml_whitespace(min_str)) {
            Some(min) => occurs.min = min,
            None => {
                return Err(format!(
                    "minOccurs value '{}' is not a valid non-negative integer",
                    min_str
                ))
            }
        }
    }

    match max_occurs.map(trim_xml_whitespace) {
        Some("unbounded") => occurs.max = None,
        Some(max_str) => match occurs_bound(max_str) {
            Some(max) if occurs.min > max => {
                return Err(format!(
                    "maxOccurs {} must be 'unbounded' or not less than minOccurs {}",
                    max, occurs.min
                ))
            }
            Some(max) => occurs.max = Some(max),
            None => {
                return Err(format!(
                    "maxOccurs value '{}' must be a non-negative integer or 'unbounded'",
                    max_str
                ))
            }
        },
        None if occurs.min > 1 => {
            return Err(format!(
                "minOccurs {} is greater than the default maxOccurs 1",
                occurs.min
            ))
        }
        None => {}
    }

    Ok(occurs)
}

/// An item participating in a content model
#[derive(Debug, Clone, PartialEq)]
pub enum Particle {
    /// Local element declaration or element reference
    Element(Box<ElementDecl>),
    /// Inline model group
    Group(ModelGroup),
    /// Reference to a named model group
    GroupRef(GroupRef),
    /// Element wildcard
    Any(AnyElement),
}

impl Particle {
    /// Get the occurrence constraints
    pub fn occurs(&self) -> Occurs {
        match self {
            Self::Element(e) => e.occurs,
            Self::Group(g) => g.occurs,
            Self::GroupRef(r) => r.occurs,
            Self::Any(a) => a.occurs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_occurs_defaults() {
        assert_eq!(parse_occurs(None, None).unwrap(), Occurs::once());
        assert_eq!(
            parse_occurs(Some("0"), Some("unbounded")).unwrap(),
            Occurs::zero_or_more()
        );
        assert_eq!(parse_occurs(Some(" 2 "), Some("5")).unwrap(), Occurs::new(2, Some(5)));
    }

    #[test]
    fn test_parse_occurs_errors() {
        assert!(parse_occurs(Some("-1"), None).is_err());
        assert!(parse_occurs(Some("unbounded"), None).is_err());
        assert!(parse_occurs(Some("3"), Some("2")).is_err());
        assert!(parse_occurs(Some("2"), None).is_err());
        assert!(parse_occurs(None, Some("many")).is_err());
    }

    #[test]
    fn test_parse_occurs_large_values_saturate() {
        assert_eq!(
            parse_occurs(Some("1"), Some("99999999999999999999")).unwrap(),
            Occurs::new(1, Some(u32::MAX))
        );
        assert_eq!(
            parse_occurs(Some("5000000000"), Some("unbounded")).unwrap(),
            Occurs::new(u32::MAX, None)
        );
        assert_eq!(
            parse_occurs(Some("5000000000"), Some("6000000000")).unwrap(),
            Occurs::new(u32::MAX, Some(u32::MAX))
        );
        let err = parse_occurs(Some("5000000000"), None).unwrap_err();
        assert!(err.contains("greater than the default maxOccurs"));
        assert!(parse_occurs(None, Some("-5000000000")).is_err());
    }

    #[test]
    fn test_occurs_restriction() {
        let base = Occurs::new(0, None);
        assert!(Occurs::once().has_occurs_restriction(&base));
        assert!(!base.has_occurs_restriction(&Occurs::once()));
        assert!(Occurs::new(0, Some(0)).has_occurs_restriction(&Occurs::new(0, Some(1))));
        assert_eq!(Occurs::zero_or_more().to_string(), "[0..unbounded]");
    }
}
