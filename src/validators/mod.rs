//! XML Schema components
//!
//! The component model, the schema document parser and the two stages that
//! turn a root location into a frozen [`SchemaSet`]: the [`loader`], which
//! follows `include` and `import` directives and merges symbol tables,
//! and the [`resolver`], which binds every reference and checks derivations.

// Values and facets
pub mod builtins;
pub mod facets;
pub mod patterns;
pub mod values;

// Component model
pub mod attributes;
pub mod base;
pub mod complex_types;
pub mod elements;
pub mod groups;
pub mod identities;
pub mod particles;
pub mod simple_types;
pub mod wildcards;

// Schema documents and sets
pub mod globals;
pub mod parsing;
pub mod schemas;
pub mod visitor;

// Loading and resolution
pub mod loader;
pub mod resolver;

pub use attributes::{AttributeDecl, AttributeGroup, AttributeUseKind, EffectiveAttributes};
pub use base::{DerivationMethod, DerivationSet, Form, SourceInfo, TypeRef, ValueConstraint, ValueConstraintKind};
pub use builtins::{builtin_type, BuiltinType};
pub use complex_types::{ComplexType, Content, ContentKind};
pub use elements::ElementDecl;
pub use facets::{Facet, FacetKind, FacetSet, WhiteSpace};
pub use globals::{ComponentCounts, ComponentId, GlobalMaps, NotationDecl, SchemaSet, TypeDefinition, TypeView};
pub use groups::{GroupDefinition, GroupKind, GroupRef, ModelGroup};
pub use identities::{IdentityConstraint, IdentityConstraintKind};
pub use loader::{build_schema_set, load_schema_set, SchemaSetLoader};
pub use parsing::{parse_schema, parse_schema_str};
pub use particles::{Occurs, Particle};
pub use resolver::Resolver;
pub use schemas::{Directive, Schema, SchemaDocument};
pub use simple_types::{SimpleDerivation, SimpleType, SimpleTypeInfo, Variety};
pub use values::Value;
pub use wildcards::{AnyElement, NamespaceConstraint, ProcessContents, Wildcard};
