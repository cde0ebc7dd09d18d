//! XSD built-in types
//!
//! This module defines the built-in primitive and derived types for XML Schema.
//! These types form the foundation of every user simple type: each one knows
//! its primitive, its whiteSpace mode, the facets its primitive admits and the
//! facets it carries itself (integer ranges, list minimum lengths).

use crate::namespaces::{NamespaceContext, QName, XSD_NAMESPACE};
use crate::names::split_xml_whitespace;
use crate::validators::facets::{BoundFacet, FacetKind, FacetSet, FacetValue, WhiteSpace};
use crate::validators::values::*;
use once_cell::sync::OnceCell;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Type Names
// =============================================================================

/// XSD anyType type name
pub const XSD_ANY_TYPE: &str = "anyType";
/// XSD anySimpleType type name
pub const XSD_ANY_SIMPLE_TYPE: &str = "anySimpleType";
/// XSD string type name
pub const XSD_STRING: &str = "string";
/// XSD ID type name
pub const XSD_ID: &str = "ID";
/// XSD QName type name
pub const XSD_QNAME: &str = "QName";
/// XSD NOTATION type name
pub const XSD_NOTATION: &str = "NOTATION";

// =============================================================================
// Primitives
// =============================================================================

/// The primitive datatypes of XSD 1.0, plus anySimpleType at the root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    AnySimpleType,
    String,
    Boolean,
    Decimal,
    Float,
    Double,
    Duration,
    DateTime,
    Time,
    Date,
    GYearMonth,
    GYear,
    GMonthDay,
    GDay,
    GMonth,
    HexBinary,
    Base64Binary,
    AnyUri,
    QName,
    Notation,
}

impl Primitive {
    /// Facets the primitive admits
    pub fn admitted_facets(&self) -> &'static HashSet<FacetKind> {
        match self {
            Primitive::AnySimpleType
            | Primitive::String
            | Primitive::HexBinary
            | Primitive::Base64Binary
            | Primitive::AnyUri
            | Primitive::QName
            | Primitive::Notation => &STRING_FACETS,
            Primitive::Boolean => &BOOLEAN_FACETS,
            Primitive::Decimal => &DECIMAL_FACETS,
            _ => &ORDERED_FACETS,
        }
    }

    /// Whether values of the primitive may contain namespace-qualified names
    pub fn is_qualified(&self) -> bool {
        matches!(self, Primitive::QName | Primitive::Notation)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// =============================================================================
// Admitted Facets Sets
// =============================================================================

lazy_static::lazy_static! {
    /// Facets admitted for string-like primitives
    pub static ref STRING_FACETS: HashSet<FacetKind> = [
        FacetKind::Length,
        FacetKind::MinLength,
        FacetKind::MaxLength,
        FacetKind::Pattern,
        FacetKind::Enumeration,
        FacetKind::WhiteSpace,
    ]
    .into_iter()
    .collect();

    /// Facets admitted for boolean
    pub static ref BOOLEAN_FACETS: HashSet<FacetKind> =
        [FacetKind::Pattern, FacetKind::WhiteSpace].into_iter().collect();

    /// Facets admitted for float, double, duration and the date/time family
    pub static ref ORDERED_FACETS: HashSet<FacetKind> = [
        FacetKind::Pattern,
        FacetKind::Enumeration,
        FacetKind::WhiteSpace,
        FacetKind::MaxInclusive,
        FacetKind::MaxExclusive,
        FacetKind::MinInclusive,
        FacetKind::MinExclusive,
    ]
    .into_iter()
    .collect();

    /// Facets admitted for decimal and its derivatives
    pub static ref DECIMAL_FACETS: HashSet<FacetKind> = [
        FacetKind::TotalDigits,
        FacetKind::FractionDigits,
        FacetKind::Pattern,
        FacetKind::Enumeration,
        FacetKind::WhiteSpace,
        FacetKind::MaxInclusive,
        FacetKind::MaxExclusive,
        FacetKind::MinInclusive,
        FacetKind::MinExclusive,
    ]
    .into_iter()
    .collect();

    /// Facets admitted for list types
    pub static ref LIST_FACETS: HashSet<FacetKind> = [
        FacetKind::Length,
        FacetKind::MinLength,
        FacetKind::MaxLength,
        FacetKind::Pattern,
        FacetKind::Enumeration,
        FacetKind::WhiteSpace,
    ]
    .into_iter()
    .collect();

    /// Facets admitted for union types
    pub static ref UNION_FACETS: HashSet<FacetKind> =
        [FacetKind::Pattern, FacetKind::Enumeration].into_iter().collect();
}

// =============================================================================
// Built-in Type Definition
// =============================================================================

/// Category of XSD type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    /// Primitive type (defined directly by XML Schema Part 2)
    Primitive,
    /// Derived type (derived from another type)
    Derived,
    /// Special type (anyType, anySimpleType)
    Special,
}

/// Variety of a built-in simple type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinVariety {
    /// Atomic type
    Atomic,
    /// List of the named built-in item type
    List(&'static str),
}

/// Definition of a built-in XSD type
#[derive(Debug)]
pub struct BuiltinType {
    /// Type name (local name in the XSD namespace)
    pub name: &'static str,
    /// Type category
    pub category: TypeCategory,
    /// Base type name (for derived types)
    pub base_type: Option<&'static str>,
    /// Primitive ancestor, `None` for anyType
    pub primitive: Option<Primitive>,
    /// Atomic or list
    pub variety: BuiltinVariety,
    /// White space handling
    pub white_space: WhiteSpace,
    /// Whether derived types may not change the white space handling
    pub white_space_fixed: bool,
    /// Inclusive integer range, as lexical bounds
    range: (Option<&'static str>, Option<&'static str>),
    /// Lexical validator
    validator: LexicalValidator,
    facets: OnceCell<FacetSet>,
}

impl BuiltinType {
    fn new(
        name: &'static str,
        category: TypeCategory,
        base_type: Option<&'static str>,
        primitive: Option<Primitive>,
        white_space: WhiteSpace,
        validator: LexicalValidator,
    ) -> Self {
        let white_space_fixed = !matches!(
            primitive,
            None | Some(Primitive::String) | Some(Primitive::AnySimpleType)
        );
        Self {
            name,
            category,
            base_type,
            primitive,
            variety: BuiltinVariety::Atomic,
            white_space,
            white_space_fixed,
            range: (None, None),
            validator,
            facets: OnceCell::new(),
        }
    }

    fn range(mut self, min: Option<&'static str>, max: Option<&'static str>) -> Self {
        self.range = (min, max);
        self
    }

    fn list(mut self, item: &'static str) -> Self {
        self.variety = BuiltinVariety::List(item);
        self.white_space_fixed = true;
        self
    }

    /// Qualified name in the XSD namespace
    pub fn qname(&self) -> QName {
        QName::xsd(self.name)
    }

    /// Whether this is xs:anyType, the only complex built-in
    pub fn is_complex(&self) -> bool {
        self.primitive.is_none()
    }

    /// Whether the type is an integer-family derivation of decimal
    pub fn is_integer(&self) -> bool {
        self.primitive == Some(Primitive::Decimal) && self.name != "decimal"
    }

    /// Facets admitted for restrictions of this type
    pub fn admitted_facets(&self) -> &'static HashSet<FacetKind> {
        match (self.variety, self.primitive) {
            (BuiltinVariety::List(_), _) => &LIST_FACETS,
            (_, Some(p)) => p.admitted_facets(),
            (_, None) => &STRING_FACETS,
        }
    }

    /// Facets carried by the type itself
    pub fn facets(&self) -> &FacetSet {
        self.facets.get_or_init(|| {
            let mut set = FacetSet::new();
            if self.primitive != Some(Primitive::AnySimpleType) && !self.is_complex() {
                set.white_space = Some(FacetValue {
                    value: self.white_space,
                    fixed: self.white_space_fixed,
                });
            }
            if self.is_integer() {
                set.fraction_digits = Some(FacetValue::fixed(0));
            }
            let bound = |lexical: &'static str| {
                Decimal::from_str(lexical).ok().map(|d| BoundFacet {
                    lexical: lexical.to_string(),
                    value: Value::Decimal(d),
                    fixed: false,
                })
            };
            set.min_inclusive = self.range.0.and_then(bound);
            set.max_inclusive = self.range.1.and_then(bound);
            if matches!(self.variety, BuiltinVariety::List(_)) {
                set.min_length = Some(FacetValue::new(1));
            }
            set
        })
    }

    /// Lexical validation without the type's own facets
    pub fn parse(&self, normalized: &str, namespaces: &NamespaceContext) -> Result<Value, String> {
        match self.variety {
            BuiltinVariety::Atomic => (self.validator)(normalized, namespaces),
            BuiltinVariety::List(item) => {
                let item = get_builtin_type(item)
                    .ok_or_else(|| format!("unknown list item type '{}'", item))?;
                split_xml_whitespace(normalized)
                    .map(|token| item.validate(token, namespaces))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List)
            }
        }
    }

    /// Validate a string value against this type
    pub fn validate(&self, value: &str, namespaces: &NamespaceContext) -> Result<Value, String> {
        let normalized = self.white_space.normalize(value);
        let parsed = self.parse(&normalized, namespaces)?;
        self.facets().check_value(&normalized, &parsed)?;
        Ok(parsed)
    }
}

impl PartialEq for BuiltinType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

// =============================================================================
// Built-in Type Registry
// =============================================================================

lazy_static::lazy_static! {
    /// Registry of all built-in XSD 1.0 types
    pub static ref BUILTIN_TYPES: Vec<BuiltinType> = {
        use TypeCategory::{Derived, Special};
        use WhiteSpace::*;
        let primitive = TypeCategory::Primitive;
        vec![
            // Special types
            BuiltinType::new(XSD_ANY_TYPE, Special, None, None, Preserve, validate_string),
            BuiltinType::new(XSD_ANY_SIMPLE_TYPE, Special, Some(XSD_ANY_TYPE), Some(Primitive::AnySimpleType), Preserve, validate_string),

            // Primitive types
            BuiltinType::new(XSD_STRING, primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::String), Preserve, validate_string),
            BuiltinType::new("boolean", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::Boolean), Collapse, validate_boolean),
            BuiltinType::new("decimal", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::Decimal), Collapse, validate_decimal),
            BuiltinType::new("float", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::Float), Collapse, validate_float),
            BuiltinType::new("double", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::Double), Collapse, validate_double),
            BuiltinType::new("duration", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::Duration), Collapse, validate_duration),
            BuiltinType::new("dateTime", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::DateTime), Collapse, validate_date_time),
            BuiltinType::new("time", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::Time), Collapse, validate_time),
            BuiltinType::new("date", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::Date), Collapse, validate_date),
            BuiltinType::new("gYearMonth", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::GYearMonth), Collapse, validate_g_year_month),
            BuiltinType::new("gYear", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::GYear), Collapse, validate_g_year),
            BuiltinType::new("gMonthDay", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::GMonthDay), Collapse, validate_g_month_day),
            BuiltinType::new("gDay", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::GDay), Collapse, validate_g_day),
            BuiltinType::new("gMonth", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::GMonth), Collapse, validate_g_month),
            BuiltinType::new("hexBinary", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::HexBinary), Collapse, validate_hex_binary),
            BuiltinType::new("base64Binary", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::Base64Binary), Collapse, validate_base64_binary),
            BuiltinType::new("anyURI", primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::AnyUri), Collapse, validate_any_uri),
            BuiltinType::new(XSD_QNAME, primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::QName), Collapse, validate_qname),
            BuiltinType::new(XSD_NOTATION, primitive, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::Notation), Collapse, validate_qname),

            // Derived string types
            BuiltinType::new("normalizedString", Derived, Some(XSD_STRING), Some(Primitive::String), Replace, validate_normalized_string),
            BuiltinType::new("token", Derived, Some("normalizedString"), Some(Primitive::String), Collapse, validate_token),
            BuiltinType::new("language", Derived, Some("token"), Some(Primitive::String), Collapse, validate_language),
            BuiltinType::new("NMTOKEN", Derived, Some("token"), Some(Primitive::String), Collapse, validate_nmtoken),
            BuiltinType::new("NMTOKENS", Derived, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::String), Collapse, validate_nmtoken).list("NMTOKEN"),
            BuiltinType::new("Name", Derived, Some("token"), Some(Primitive::String), Collapse, validate_name),
            BuiltinType::new("NCName", Derived, Some("Name"), Some(Primitive::String), Collapse, validate_ncname),
            BuiltinType::new(XSD_ID, Derived, Some("NCName"), Some(Primitive::String), Collapse, validate_ncname),
            BuiltinType::new("IDREF", Derived, Some("NCName"), Some(Primitive::String), Collapse, validate_ncname),
            BuiltinType::new("IDREFS", Derived, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::String), Collapse, validate_ncname).list("IDREF"),
            BuiltinType::new("ENTITY", Derived, Some("NCName"), Some(Primitive::String), Collapse, validate_ncname),
            BuiltinType::new("ENTITIES", Derived, Some(XSD_ANY_SIMPLE_TYPE), Some(Primitive::String), Collapse, validate_ncname).list("ENTITY"),

            // Derived numeric types
            BuiltinType::new("integer", Derived, Some("decimal"), Some(Primitive::Decimal), Collapse, validate_integer),
            BuiltinType::new("nonPositiveInteger", Derived, Some("integer"), Some(Primitive::Decimal), Collapse, validate_non_positive_integer)
                .range(None, Some("0")),
            BuiltinType::new("negativeInteger", Derived, Some("nonPositiveInteger"), Some(Primitive::Decimal), Collapse, validate_negative_integer)
                .range(None, Some("-1")),
            BuiltinType::new("long", Derived, Some("integer"), Some(Primitive::Decimal), Collapse, validate_long)
                .range(Some("-9223372036854775808"), Some("9223372036854775807")),
            BuiltinType::new("int", Derived, Some("long"), Some(Primitive::Decimal), Collapse, validate_int)
                .range(Some("-2147483648"), Some("2147483647")),
            BuiltinType::new("short", Derived, Some("int"), Some(Primitive::Decimal), Collapse, validate_short)
                .range(Some("-32768"), Some("32767")),
            BuiltinType::new("byte", Derived, Some("short"), Some(Primitive::Decimal), Collapse, validate_byte)
                .range(Some("-128"), Some("127")),
            BuiltinType::new("nonNegativeInteger", Derived, Some("integer"), Some(Primitive::Decimal), Collapse, validate_non_negative_integer)
                .range(Some("0"), None),
            BuiltinType::new("unsignedLong", Derived, Some("nonNegativeInteger"), Some(Primitive::Decimal), Collapse, validate_unsigned_long)
                .range(Some("0"), Some("18446744073709551615")),
            BuiltinType::new("unsignedInt", Derived, Some("unsignedLong"), Some(Primitive::Decimal), Collapse, validate_unsigned_int)
                .range(Some("0"), Some("4294967295")),
            BuiltinType::new("unsignedShort", Derived, Some("unsignedInt"), Some(Primitive::Decimal), Collapse, validate_unsigned_short)
                .range(Some("0"), Some("65535")),
            BuiltinType::new("unsignedByte", Derived, Some("unsignedShort"), Some(Primitive::Decimal), Collapse, validate_unsigned_byte)
                .range(Some("0"), Some("255")),
            BuiltinType::new("positiveInteger", Derived, Some("nonNegativeInteger"), Some(Primitive::Decimal), Collapse, validate_positive_integer)
                .range(Some("1"), None),
        ]
    };
}

/// Get a built-in type by local name
pub fn get_builtin_type(name: &str) -> Option<&'static BuiltinType> {
    BUILTIN_TYPES.iter().find(|t| t.name == name)
}

/// Get a built-in type by qualified name
pub fn builtin_type(qname: &QName) -> Option<&'static BuiltinType> {
    if qname.namespace == XSD_NAMESPACE {
        get_builtin_type(&qname.local_name)
    } else {
        None
    }
}

/// Whether a local name is the name of an XSD built-in type
pub fn is_builtin_name(name: &str) -> bool {
    get_builtin_type(name).is_some()
}

/// Validate a value against a built-in type by local name
pub fn validate_builtin(
    type_name: &str,
    value: &str,
    namespaces: &NamespaceContext,
) -> Result<Value, String> {
    match get_builtin_type(type_name) {
        Some(builtin) => builtin.validate(value, namespaces),
        None => Err(format!("unknown built-in type '{}'", type_name)),
    }
}

/// Whether built-in `derived` is `base` or derives from it
pub fn builtin_derives_from(derived: &str, base: &str) -> bool {
    let mut current = get_builtin_type(derived);
    while let Some(t) = current {
        if t.name == base {
            return true;
        }
        current = t.base_type.and_then(get_builtin_type);
    }
    false
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ns() -> NamespaceContext {
        NamespaceContext::new()
    }

    #[test]
    fn test_registry_is_complete() {
        assert_eq!(BUILTIN_TYPES.len(), 46);
        for t in BUILTIN_TYPES.iter() {
            if let Some(base) = t.base_type {
                assert!(get_builtin_type(base).is_some(), "{} has unknown base", t.name);
            }
            if let BuiltinVariety::List(item) = t.variety {
                assert!(get_builtin_type(item).is_some());
            }
        }
    }

    #[test]
    fn test_string_types() {
        assert!(validate_builtin(XSD_STRING, "Hello World", &ns()).is_ok());
        assert!(validate_builtin("token", "  Hello   World ", &ns()).is_ok());
        assert!(validate_builtin("NCName", "validName", &ns()).is_ok());
        assert!(validate_builtin("NCName", "invalid:name", &ns()).is_err());
    }

    #[test]
    fn test_boolean_type() {
        assert_eq!(
            validate_builtin("boolean", " 1 ", &ns()).unwrap(),
            Value::Boolean(true)
        );
        assert!(validate_builtin("boolean", "yes", &ns()).is_err());
    }

    #[test]
    fn test_integer_ranges_as_facets() {
        let int = get_builtin_type("int").unwrap();
        let facets = int.facets();
        assert_eq!(facets.max_inclusive.as_ref().unwrap().lexical, "2147483647");
        assert_eq!(facets.fraction_digits, Some(FacetValue::fixed(0)));
        assert!(int.validate("2147483648", &ns()).is_err());
        assert!(validate_builtin("unsignedLong", "18446744073709551615", &ns()).is_ok());
    }

    #[test]
    fn test_list_builtins() {
        match validate_builtin("NMTOKENS", " a  b c ", &ns()).unwrap() {
            Value::List(items) => assert_eq!(items.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
        assert!(validate_builtin("IDREFS", "", &ns()).is_err());
        assert!(validate_builtin("ENTITIES", "a b:c", &ns()).is_err());
    }

    #[test]
    fn test_white_space_fixed() {
        let decimal = get_builtin_type("decimal").unwrap();
        assert!(decimal.facets().white_space.unwrap().fixed);
        let string = get_builtin_type(XSD_STRING).unwrap();
        assert!(!string.facets().white_space.unwrap().fixed);
    }

    #[test]
    fn test_admitted_facets() {
        let boolean = get_builtin_type("boolean").unwrap();
        assert!(!boolean.admitted_facets().contains(&FacetKind::Enumeration));
        let int = get_builtin_type("int").unwrap();
        assert!(int.admitted_facets().contains(&FacetKind::TotalDigits));
        let nmtokens = get_builtin_type("NMTOKENS").unwrap();
        assert!(nmtokens.admitted_facets().contains(&FacetKind::Length));
    }

    #[test]
    fn test_derivation_chain() {
        assert!(builtin_derives_from("byte", "integer"));
        assert!(builtin_derives_from("ID", "string"));
        assert!(!builtin_derives_from("string", "token"));
        assert!(builtin_type(&QName::xsd("anyType")).unwrap().is_complex());
        assert!(builtin_type(&QName::new("urn:x", "string")).is_none());
    }
}
