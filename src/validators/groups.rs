//! XSD Model Group components
//!
//! This module implements model groups for XSD content models:
//! - xs:sequence - ordered content
//! - xs:choice - alternative content
//! - xs:all - unordered content, elements only
//!
//! Named groups (`xs:group name="..."`) are stored as [`GroupDefinition`]s,
//! distinct from the inline [`ModelGroup`]s they wrap. References to them
//! stay [`GroupRef`] particles whose target is filled in during resolution.

use std::fmt;
use std::sync::Arc;

use super::base::SourceInfo;
use super::particles::{Occurs, Particle};
use crate::namespaces::QName;

/// Model group compositor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupKind {
    /// Ordered sequence of particles
    #[default]
    Sequence,
    /// One of multiple alternatives
    Choice,
    /// Unordered set of element particles
    All,
}

impl GroupKind {
    /// Parse from element local name
    pub fn from_local_name(tag: &str) -> Option<Self> {
        match tag {
            "sequence" => Some(Self::Sequence),
            "choice" => Some(Self::Choice),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence"),
            Self::Choice => write!(f, "choice"),
            Self::All => write!(f, "all"),
        }
    }
}

/// An inline model group
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGroup {
    /// Compositor
    pub kind: GroupKind,
    /// Particles in document order
    pub particles: Vec<Particle>,
    /// Occurrence bounds
    pub occurs: Occurs,
    /// Declaration site
    pub source: SourceInfo,
}

impl ModelGroup {
    /// Create an empty group
    pub fn new(kind: GroupKind) -> Self {
        Self {
            kind,
            particles: Vec::new(),
            occurs: Occurs::once(),
            source: SourceInfo::default(),
        }
    }

    /// Whether the group satisfies the `xs:all` shape constraints
    pub fn is_valid_all(&self) -> bool {
        self.kind == GroupKind::All
            && self.occurs.min <= 1
            && self.occurs.max == Some(1)
            && self.particles.iter().all(|p| match p {
                Particle::Element(e) => e.occurs.min <= 1 && e.occurs.max.map_or(false, |m| m <= 1),
                _ => false,
            })
    }

    /// Whether the group can match empty content
    pub fn is_emptiable(&self) -> bool {
        if self.occurs.is_emptiable() || self.particles.is_empty() {
            return true;
        }
        let particle_emptiable = |p: &Particle| match p {
            Particle::Group(g) => g.is_emptiable(),
            Particle::GroupRef(r) => {
                r.occurs.is_emptiable() || r.target.as_ref().map_or(false, |g| g.is_emptiable())
            }
            other => other.occurs().is_emptiable(),
        };
        match self.kind {
            GroupKind::Choice => self.particles.iter().any(particle_emptiable),
            GroupKind::Sequence | GroupKind::All => self.particles.iter().all(particle_emptiable),
        }
    }
}

/// A named, top-level model group definition
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDefinition {
    /// Group name
    pub name: QName,
    /// The wrapped model group
    pub group: Arc<ModelGroup>,
    /// Target namespace of the declaring document
    pub source_namespace: String,
    /// Declaration site
    pub source: SourceInfo,
}

/// Reference to a named model group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRef {
    /// Referenced group name
    pub name: QName,
    /// Occurrence bounds of the reference
    pub occurs: Occurs,
    /// Referenced group, once resolved
    pub target: Option<Arc<ModelGroup>>,
    /// Reference site
    pub source: SourceInfo,
}

impl GroupRef {
    /// Create an unresolved reference
    pub fn new(name: QName, occurs: Occurs) -> Self {
        Self {
            name,
            occurs,
            target: None,
            source: SourceInfo::default(),
        }
    }

    /// Whether the reference has been resolved
    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::elements::ElementDecl;

    fn element(name: &str, occurs: Occurs) -> Particle {
        let mut decl = ElementDecl::new(QName::local(name));
        decl.occurs = occurs;
        Particle::Element(Box::new(decl))
    }

    #[test]
    fn test_all_shape() {
        let mut group = ModelGroup::new(GroupKind::All);
        group.particles.push(element("a", Occurs::once()));
        group.particles.push(element("b", Occurs::optional()));
        assert!(group.is_valid_all());

        group.particles.push(element("c", Occurs::zero_or_more()));
        assert!(!group.is_valid_all());
    }

    #[test]
    fn test_emptiable() {
        let mut choice = ModelGroup::new(GroupKind::Choice);
        choice.particles.push(element("a", Occurs::once()));
        choice.particles.push(element("b", Occurs::optional()));
        assert!(choice.is_emptiable());

        let mut sequence = ModelGroup::new(GroupKind::Sequence);
        sequence.particles.push(element("a", Occurs::once()));
        assert!(!sequence.is_emptiable());
        sequence.particles.push(Particle::GroupRef(GroupRef::new(QName::local("g"), Occurs::once())));
        assert!(!sequence.is_emptiable());
    }

    #[test]
    fn test_group_kind() {
        assert_eq!(GroupKind::from_local_name("all"), Some(GroupKind::All));
        assert_eq!(GroupKind::from_local_name("group"), None);
        assert_eq!(GroupKind::Choice.to_string(), "choice");
    }
}
