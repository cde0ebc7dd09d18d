//! XSD constraining facets
//!
//! Facets are stored in source order on each restriction step as [`Facet`]
//! values. At resolution time they are folded over the facets inherited from
//! the base type into one effective [`FacetSet`], checking fixed facets,
//! restriction validity and consistency on the way.

use crate::error::Diagnostic;
use crate::namespaces::NamespaceContext;
use crate::validators::patterns::Pattern;
use crate::validators::values::{decimal_digits, Value};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// White space handling modes, ordered by strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl WhiteSpace {
    /// Lexical form of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            WhiteSpace::Preserve => "preserve",
            WhiteSpace::Replace => "replace",
            WhiteSpace::Collapse => "collapse",
        }
    }

    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => crate::names::replace_whitespace(s),
            WhiteSpace::Collapse => crate::names::collapse_whitespace(s),
        }
    }
}

impl FromStr for WhiteSpace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preserve" => Ok(WhiteSpace::Preserve),
            "replace" => Ok(WhiteSpace::Replace),
            "collapse" => Ok(WhiteSpace::Collapse),
            _ => Err(format!(
                "invalid whiteSpace value '{}', expected 'preserve', 'replace' or 'collapse'",
                s
            )),
        }
    }
}

impl fmt::Display for WhiteSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed family of XSD 1.0 facets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FacetKind {
    Length,
    MinLength,
    MaxLength,
    Pattern,
    Enumeration,
    WhiteSpace,
    MaxInclusive,
    MaxExclusive,
    MinInclusive,
    MinExclusive,
    TotalDigits,
    FractionDigits,
}

impl FacetKind {
    /// Every facet kind
    pub const ALL: [FacetKind; 12] = [
        FacetKind::Length,
        FacetKind::MinLength,
        FacetKind::MaxLength,
        FacetKind::Pattern,
        FacetKind::Enumeration,
        FacetKind::WhiteSpace,
        FacetKind::MaxInclusive,
        FacetKind::MaxExclusive,
        FacetKind::MinInclusive,
        FacetKind::MinExclusive,
        FacetKind::TotalDigits,
        FacetKind::FractionDigits,
    ];

    /// Element local name of the facet
    pub fn name(&self) -> &'static str {
        match self {
            FacetKind::Length => "length",
            FacetKind::MinLength => "minLength",
            FacetKind::MaxLength => "maxLength",
            FacetKind::Pattern => "pattern",
            FacetKind::Enumeration => "enumeration",
            FacetKind::WhiteSpace => "whiteSpace",
            FacetKind::MaxInclusive => "maxInclusive",
            FacetKind::MaxExclusive => "maxExclusive",
            FacetKind::MinInclusive => "minInclusive",
            FacetKind::MinExclusive => "minExclusive",
            FacetKind::TotalDigits => "totalDigits",
            FacetKind::FractionDigits => "fractionDigits",
        }
    }

    /// Facet kind for an element local name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    /// Whether the facet value is a literal of the base type
    pub fn is_bound(&self) -> bool {
        matches!(
            self,
            FacetKind::MaxInclusive
                | FacetKind::MaxExclusive
                | FacetKind::MinInclusive
                | FacetKind::MinExclusive
        )
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Facet value with its `fixed` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacetValue<T> {
    /// Facet value
    pub value: T,
    /// Whether derived types may not change the value
    pub fixed: bool,
}

impl<T> FacetValue<T> {
    /// Create a non-fixed facet value
    pub fn new(value: T) -> Self {
        Self {
            value,
            fixed: false,
        }
    }

    /// Create a fixed facet value
    pub fn fixed(value: T) -> Self {
        Self { value, fixed: true }
    }
}

/// Ordered bound facet: min/max inclusive/exclusive
#[derive(Debug, Clone, PartialEq)]
pub struct BoundFacet {
    /// Literal as written
    pub lexical: String,
    /// Value in the base type's value space
    pub value: Value,
    /// Whether derived types may not change the value
    pub fixed: bool,
}

/// One value of an enumeration facet
#[derive(Debug, Clone, PartialEq)]
pub struct EnumerationValue {
    /// Literal as written
    pub lexical: String,
    /// Prefix bindings in scope at the `enumeration` element
    pub namespaces: Arc<NamespaceContext>,
    /// Value in the base type's value space, once resolved
    pub value: Option<Value>,
}

impl EnumerationValue {
    /// Create an unresolved enumeration value
    pub fn new(lexical: impl Into<String>, namespaces: Arc<NamespaceContext>) -> Self {
        Self {
            lexical: lexical.into(),
            namespaces,
            value: None,
        }
    }
}

/// Ordered facet whose value awaits the base type's primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredFacet {
    /// Facet kind, one of the bound facets
    pub kind: FacetKind,
    /// Literal as written
    pub lexical: String,
    /// Whether derived types may not change the value
    pub fixed: bool,
}

/// A facet as written on one restriction step
#[derive(Debug, Clone, PartialEq)]
pub enum Facet {
    Length(FacetValue<u64>),
    MinLength(FacetValue<u64>),
    MaxLength(FacetValue<u64>),
    /// Sibling pattern values OR-ed together
    Pattern(Pattern),
    /// Sibling enumeration values in document order
    Enumeration(Vec<EnumerationValue>),
    WhiteSpace(FacetValue<WhiteSpace>),
    MaxInclusive(BoundFacet),
    MaxExclusive(BoundFacet),
    MinInclusive(BoundFacet),
    MinExclusive(BoundFacet),
    TotalDigits(FacetValue<u32>),
    FractionDigits(FacetValue<u32>),
    /// Bound facet realized during resolution
    Deferred(DeferredFacet),
}

impl Facet {
    /// Kind of the facet
    pub fn kind(&self) -> FacetKind {
        match self {
            Facet::Length(_) => FacetKind::Length,
            Facet::MinLength(_) => FacetKind::MinLength,
            Facet::MaxLength(_) => FacetKind::MaxLength,
            Facet::Pattern(_) => FacetKind::Pattern,
            Facet::Enumeration(_) => FacetKind::Enumeration,
            Facet::WhiteSpace(_) => FacetKind::WhiteSpace,
            Facet::MaxInclusive(_) => FacetKind::MaxInclusive,
            Facet::MaxExclusive(_) => FacetKind::MaxExclusive,
            Facet::MinInclusive(_) => FacetKind::MinInclusive,
            Facet::MinExclusive(_) => FacetKind::MinExclusive,
            Facet::TotalDigits(_) => FacetKind::TotalDigits,
            Facet::FractionDigits(_) => FacetKind::FractionDigits,
            Facet::Deferred(d) => d.kind,
        }
    }

    /// Build a bound facet, deferring it when no value parser is known yet
    pub fn bound(
        kind: FacetKind,
        lexical: &str,
        fixed: bool,
        parse: Option<&dyn Fn(&str) -> Result<Value, String>>,
    ) -> Result<Facet, String> {
        let parse = match parse {
            Some(parse) => parse,
            None => {
                return Ok(Facet::Deferred(DeferredFacet {
                    kind,
                    lexical: lexical.to_string(),
                    fixed,
                }))
            }
        };
        let facet = BoundFacet {
            lexical: lexical.to_string(),
            value: parse(lexical)?,
            fixed,
        };
        Ok(match kind {
            FacetKind::MaxInclusive => Facet::MaxInclusive(facet),
            FacetKind::MaxExclusive => Facet::MaxExclusive(facet),
            FacetKind::MinInclusive => Facet::MinInclusive(facet),
            FacetKind::MinExclusive => Facet::MinExclusive(facet),
            other => return Err(format!("'{}' is not an ordered facet", other)),
        })
    }

    /// Whether the facet still awaits resolution
    pub fn is_deferred(&self) -> bool {
        matches!(self, Facet::Deferred(_))
    }
}

/// Parser from a normalised literal to a value of the base type
pub type ValueParser<'a> = &'a dyn Fn(&str, &NamespaceContext) -> Result<Value, String>;

/// Effective facets of a simple type after folding its derivation chain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetSet {
    pub length: Option<FacetValue<u64>>,
    pub min_length: Option<FacetValue<u64>>,
    pub max_length: Option<FacetValue<u64>>,
    /// One entry per derivation step, all of which must match
    pub patterns: Vec<Pattern>,
    pub enumeration: Option<Vec<EnumerationValue>>,
    pub white_space: Option<FacetValue<WhiteSpace>>,
    pub max_inclusive: Option<BoundFacet>,
    pub max_exclusive: Option<BoundFacet>,
    pub min_inclusive: Option<BoundFacet>,
    pub min_exclusive: Option<BoundFacet>,
    pub total_digits: Option<FacetValue<u32>>,
    pub fraction_digits: Option<FacetValue<u32>>,
}

fn facet_error(code: &str, message: String) -> Diagnostic {
    Diagnostic::semantic(message).with_code(code)
}

fn check_fixed<T: PartialEq + fmt::Display>(
    base: Option<&FacetValue<T>>,
    value: &T,
    kind: FacetKind,
    errors: &mut Vec<Diagnostic>,
) -> bool {
    match base {
        Some(base) if base.fixed && base.value != *value => {
            errors.push(
                facet_error(
                    &format!("{}-valid-restriction", kind),
                    format!(
                        "facet '{}' is fixed to '{}' in the base type and cannot be changed to '{}'",
                        kind, base.value, value
                    ),
                )
                .with_actual(value.to_string())
                .with_expected(vec![base.value.to_string()]),
            );
            false
        }
        _ => true,
    }
}

/// Relation the new bound must have with an inherited bound
fn bound_relation(new: FacetKind, base: FacetKind) -> &'static [Ordering] {
    use FacetKind::*;
    const LE: &[Ordering] = &[Ordering::Less, Ordering::Equal];
    const LT: &[Ordering] = &[Ordering::Less];
    const GE: &[Ordering] = &[Ordering::Greater, Ordering::Equal];
    const GT: &[Ordering] = &[Ordering::Greater];
    match (new, base) {
        (MaxInclusive, MaxInclusive) => LE,
        (MaxInclusive, MaxExclusive) => LT,
        (MaxInclusive, MinInclusive) => GE,
        (MaxInclusive, MinExclusive) => GT,
        (MaxExclusive, MaxExclusive) => LE,
        (MaxExclusive, MaxInclusive) => LE,
        (MaxExclusive, MinInclusive) => GT,
        (MaxExclusive, MinExclusive) => GT,
        (MinInclusive, MinInclusive) => GE,
        (MinInclusive, MinExclusive) => GT,
        (MinInclusive, MaxInclusive) => LE,
        (MinInclusive, MaxExclusive) => LT,
        (MinExclusive, MinExclusive) => GE,
        (MinExclusive, MinInclusive) => GE,
        (MinExclusive, MaxInclusive) => LT,
        (MinExclusive, MaxExclusive) => LT,
        _ => LE,
    }
}

fn relation_text(allowed: &[Ordering]) -> &'static str {
    match allowed {
        [Ordering::Less] => "less than",
        [Ordering::Greater] => "greater than",
        [Ordering::Less, Ordering::Equal] => "less than or equal to",
        _ => "greater than or equal to",
    }
}

impl FacetSet {
    /// Create an empty facet set
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective white space mode, `preserve` when unset
    pub fn white_space_mode(&self) -> WhiteSpace {
        self.white_space.map(|w| w.value).unwrap_or(WhiteSpace::Preserve)
    }

    fn bound(&self, kind: FacetKind) -> Option<&BoundFacet> {
        match kind {
            FacetKind::MaxInclusive => self.max_inclusive.as_ref(),
            FacetKind::MaxExclusive => self.max_exclusive.as_ref(),
            FacetKind::MinInclusive => self.min_inclusive.as_ref(),
            FacetKind::MinExclusive => self.min_exclusive.as_ref(),
            _ => None,
        }
    }

    fn bound_slot(&mut self, kind: FacetKind) -> Option<&mut Option<BoundFacet>> {
        match kind {
            FacetKind::MaxInclusive => Some(&mut self.max_inclusive),
            FacetKind::MaxExclusive => Some(&mut self.max_exclusive),
            FacetKind::MinInclusive => Some(&mut self.min_inclusive),
            FacetKind::MinExclusive => Some(&mut self.min_exclusive),
            _ => None,
        }
    }

    /// Kinds present in the set
    pub fn kinds(&self) -> Vec<FacetKind> {
        FacetKind::ALL
            .iter()
            .copied()
            .filter(|k| match k {
                FacetKind::Length => self.length.is_some(),
                FacetKind::MinLength => self.min_length.is_some(),
                FacetKind::MaxLength => self.max_length.is_some(),
                FacetKind::Pattern => !self.patterns.is_empty(),
                FacetKind::Enumeration => self.enumeration.is_some(),
                FacetKind::WhiteSpace => self.white_space.is_some(),
                FacetKind::TotalDigits => self.total_digits.is_some(),
                FacetKind::FractionDigits => self.fraction_digits.is_some(),
                bound => self.bound(*bound).is_some(),
            })
            .collect()
    }

    /// Fold one restriction step over this (base) facet set
    ///
    /// `admitted` is the facet set allowed for the primitive variety and
    /// `parse` turns a normalised literal into a value of the base type.
    /// Problems are reported as diagnostics; the returned set keeps the
    /// base facet wherever the new one was rejected.
    pub fn derive(
        &self,
        facets: &[Facet],
        admitted: &HashSet<FacetKind>,
        parse: ValueParser<'_>,
    ) -> (FacetSet, Vec<Diagnostic>) {
        let mut result = self.clone();
        let mut errors = Vec::new();
        let base_ws = self.white_space_mode();
        let empty_ns = NamespaceContext::new();
        let mut step_bounds: Vec<FacetKind> = Vec::new();

        for facet in facets {
            let kind = facet.kind();
            if !admitted.contains(&kind) {
                errors.push(facet_error(
                    "cos-applicable-facets",
                    format!("facet '{}' is not applicable to the base type", kind),
                ));
                continue;
            }

            match facet {
                Facet::Length(v) => {
                    if check_fixed(self.length.as_ref(), &v.value, kind, &mut errors) {
                        if let Some(base) = &self.length {
                            if base.value != v.value {
                                errors.push(facet_error(
                                    "length-valid-restriction",
                                    format!(
                                        "length {} differs from the base type's length {}",
                                        v.value, base.value
                                    ),
                                ));
                                continue;
                            }
                        }
                        result.length = Some(*v);
                    }
                }
                Facet::MinLength(v) => {
                    if check_fixed(self.min_length.as_ref(), &v.value, kind, &mut errors) {
                        if let Some(base) = self.min_length.filter(|b| v.value < b.value) {
                            errors.push(facet_error(
                                "minLength-valid-restriction",
                                format!(
                                    "minLength {} is less than the base type's minLength {}",
                                    v.value, base.value
                                ),
                            ));
                            continue;
                        }
                        result.min_length = Some(*v);
                    }
                }
                Facet::MaxLength(v) => {
                    if check_fixed(self.max_length.as_ref(), &v.value, kind, &mut errors) {
                        if let Some(base) = self.max_length.filter(|b| v.value > b.value) {
                            errors.push(facet_error(
                                "maxLength-valid-restriction",
                                format!(
                                    "maxLength {} is greater than the base type's maxLength {}",
                                    v.value, base.value
                                ),
                            ));
                            continue;
                        }
                        result.max_length = Some(*v);
                    }
                }
                Facet::Pattern(p) => {
                    if let Err(message) = p.regex() {
                        errors.push(facet_error("cos-pattern", message));
                        continue;
                    }
                    result.patterns.push(p.clone());
                }
                Facet::Enumeration(values) => {
                    let mut realized = Vec::with_capacity(values.len());
                    for ev in values {
                        let normalized = base_ws.normalize(&ev.lexical);
                        let checked = parse(&normalized, &ev.namespaces)
                            .and_then(|value| self.check_value(&normalized, &value).map(|_| value));
                        match checked {
                            Ok(value) => realized.push(EnumerationValue {
                                value: Some(value),
                                ..ev.clone()
                            }),
                            Err(reason) => errors.push(
                                facet_error(
                                    "enumeration-valid-restriction",
                                    format!(
                                        "enumeration value '{}' is not valid for the base type: {}",
                                        ev.lexical, reason
                                    ),
                                )
                                .with_actual(ev.lexical.clone()),
                            ),
                        }
                    }
                    result.enumeration = Some(realized);
                }
                Facet::WhiteSpace(v) => {
                    if !check_fixed(self.white_space.as_ref(), &v.value, kind, &mut errors) {
                        continue;
                    }
                    if v.value < base_ws && self.white_space.is_some() {
                        errors.push(
                            facet_error(
                                "whiteSpace-valid-restriction",
                                format!(
                                    "whiteSpace '{}' is weaker than the base type's '{}'",
                                    v.value, base_ws
                                ),
                            )
                            .with_actual(v.value.as_str()),
                        );
                        continue;
                    }
                    result.white_space = Some(*v);
                }
                Facet::TotalDigits(v) => {
                    if check_fixed(self.total_digits.as_ref(), &v.value, kind, &mut errors) {
                        if let Some(base) = self.total_digits.filter(|b| v.value > b.value) {
                            errors.push(facet_error(
                                "totalDigits-valid-restriction",
                                format!(
                                    "totalDigits {} is greater than the base type's totalDigits {}",
                                    v.value, base.value
                                ),
                            ));
                            continue;
                        }
                        result.total_digits = Some(*v);
                    }
                }
                Facet::FractionDigits(v) => {
                    if check_fixed(self.fraction_digits.as_ref(), &v.value, kind, &mut errors) {
                        if let Some(base) = self.fraction_digits.filter(|b| v.value > b.value) {
                            errors.push(facet_error(
                                "fractionDigits-valid-restriction",
                                format!(
                                    "fractionDigits {} is greater than the base type's fractionDigits {}",
                                    v.value, base.value
                                ),
                            ));
                            continue;
                        }
                        result.fraction_digits = Some(*v);
                    }
                }
                Facet::MaxInclusive(b)
                | Facet::MaxExclusive(b)
                | Facet::MinInclusive(b)
                | Facet::MinExclusive(b) => {
                    if self.apply_bound(&mut result, kind, b.clone(), &mut errors) {
                        step_bounds.push(kind);
                    }
                }
                Facet::Deferred(d) => {
                    let normalized = base_ws.normalize(&d.lexical);
                    match parse(&normalized, &empty_ns) {
                        Ok(value) => {
                            let bound = BoundFacet {
                                lexical: d.lexical.clone(),
                                value,
                                fixed: d.fixed,
                            };
                            if self.apply_bound(&mut result, kind, bound, &mut errors) {
                                step_bounds.push(kind);
                            }
                        }
                        Err(reason) => errors.push(
                            facet_error(
                                &format!("{}-valid-restriction", kind),
                                format!(
                                    "{} value '{}' is not valid for the base type: {}",
                                    kind, d.lexical, reason
                                ),
                            )
                            .with_actual(d.lexical.clone()),
                        ),
                    }
                }
            }
        }

        // a bound set on this step replaces the inherited bound of the other flavour
        for kind in &step_bounds {
            let other = match kind {
                FacetKind::MaxInclusive => FacetKind::MaxExclusive,
                FacetKind::MaxExclusive => FacetKind::MaxInclusive,
                FacetKind::MinInclusive => FacetKind::MinExclusive,
                _ => FacetKind::MinInclusive,
            };
            if step_bounds.contains(&other) {
                let (a, b) = if kind.name() < other.name() {
                    (*kind, other)
                } else {
                    (other, *kind)
                };
                let code = format!("{}-{}", b, a);
                if !errors.iter().any(|e| e.code == code) {
                    errors.push(facet_error(
                        &code,
                        format!("'{}' and '{}' cannot both be specified", a, b),
                    ));
                }
            } else if let Some(slot) = result.bound_slot(other) {
                *slot = None;
            }
        }

        result.check_consistency(&mut errors);
        (result, errors)
    }

    fn apply_bound(
        &self,
        result: &mut FacetSet,
        kind: FacetKind,
        bound: BoundFacet,
        errors: &mut Vec<Diagnostic>,
    ) -> bool {
        if let Some(base) = self.bound(kind) {
            if base.fixed && base.value.compare(&bound.value) != Some(Ordering::Equal) {
                errors.push(
                    facet_error(
                        &format!("{}-valid-restriction", kind),
                        format!(
                            "facet '{}' is fixed to '{}' in the base type and cannot be changed to '{}'",
                            kind, base.lexical, bound.lexical
                        ),
                    )
                    .with_actual(bound.lexical.clone()),
                );
                return false;
            }
        }
        for base_kind in [
            FacetKind::MaxInclusive,
            FacetKind::MaxExclusive,
            FacetKind::MinInclusive,
            FacetKind::MinExclusive,
        ] {
            let Some(base) = self.bound(base_kind) else {
                continue;
            };
            let allowed = bound_relation(kind, base_kind);
            match bound.value.compare(&base.value) {
                Some(ord) if allowed.contains(&ord) => {}
                _ => {
                    errors.push(
                        facet_error(
                            &format!("{}-valid-restriction", kind),
                            format!(
                                "{} '{}' must be {} the base type's {} '{}'",
                                kind,
                                bound.lexical,
                                relation_text(allowed),
                                base_kind,
                                base.lexical
                            ),
                        )
                        .with_actual(bound.lexical.clone()),
                    );
                    return false;
                }
            }
        }
        if let Some(slot) = result.bound_slot(kind) {
            *slot = Some(bound);
        }
        true
    }

    fn check_consistency(&self, errors: &mut Vec<Diagnostic>) {
        if let (Some(min), Some(max)) = (&self.min_length, &self.max_length) {
            if min.value > max.value {
                errors.push(facet_error(
                    "minLength-less-than-equal-to-maxLength",
                    format!("minLength {} is greater than maxLength {}", min.value, max.value),
                ));
            }
        }
        if let Some(length) = &self.length {
            let conflict = self.min_length.is_some_and(|m| m.value > length.value)
                || self.max_length.is_some_and(|m| m.value < length.value);
            if conflict {
                errors.push(facet_error(
                    "length-minLength-maxLength",
                    format!(
                        "length {} is outside the minLength/maxLength range",
                        length.value
                    ),
                ));
            }
        }
        if let (Some(total), Some(fraction)) = (&self.total_digits, &self.fraction_digits) {
            if fraction.value > total.value {
                errors.push(facet_error(
                    "fractionDigits-totalDigits",
                    format!(
                        "fractionDigits {} is greater than totalDigits {}",
                        fraction.value, total.value
                    ),
                ));
            }
        }

        let pairs: [(FacetKind, FacetKind, &[Ordering], &str); 4] = [
            (
                FacetKind::MinInclusive,
                FacetKind::MaxInclusive,
                &[Ordering::Less, Ordering::Equal],
                "minInclusive-less-than-equal-to-maxInclusive",
            ),
            (
                FacetKind::MinInclusive,
                FacetKind::MaxExclusive,
                &[Ordering::Less],
                "minInclusive-less-than-maxExclusive",
            ),
            (
                FacetKind::MinExclusive,
                FacetKind::MaxInclusive,
                &[Ordering::Less],
                "minExclusive-less-than-maxInclusive",
            ),
            (
                FacetKind::MinExclusive,
                FacetKind::MaxExclusive,
                &[Ordering::Less, Ordering::Equal],
                "minExclusive-less-than-equal-to-maxExclusive",
            ),
        ];
        for (low_kind, high_kind, allowed, code) in pairs {
            if let (Some(low), Some(high)) = (self.bound(low_kind), self.bound(high_kind)) {
                let ok = matches!(low.value.compare(&high.value), Some(ord) if allowed.contains(&ord));
                if !ok {
                    errors.push(facet_error(
                        code,
                        format!(
                            "{} '{}' must be {} {} '{}'",
                            low_kind,
                            low.lexical,
                            relation_text(allowed),
                            high_kind,
                            high.lexical
                        ),
                    ));
                }
            }
        }
    }

    /// Check a value against every facet
    ///
    /// `normalized` is the whitespace-normalised literal the value was
    /// parsed from, used for patterns.
    pub fn check_value(&self, normalized: &str, value: &Value) -> Result<(), String> {
        if let Some(length) = value.length() {
            if let Some(f) = &self.length {
                if length != f.value {
                    return Err(format!("length {} differs from required length {}", length, f.value));
                }
            }
            if let Some(f) = &self.min_length {
                if length < f.value {
                    return Err(format!("length {} is less than minLength {}", length, f.value));
                }
            }
            if let Some(f) = &self.max_length {
                if length > f.value {
                    return Err(format!("length {} is greater than maxLength {}", length, f.value));
                }
            }
        }

        for pattern in &self.patterns {
            if !pattern.is_match(normalized)? {
                return Err(format!(
                    "'{}' does not match pattern '{}'",
                    normalized,
                    pattern.branches().join("|")
                ));
            }
        }

        if let Some(values) = &self.enumeration {
            let found = values
                .iter()
                .filter_map(|ev| ev.value.as_ref())
                .any(|v| v.same_value(value));
            if !found {
                let expected: Vec<&str> = values.iter().map(|v| v.lexical.as_str()).collect();
                return Err(format!(
                    "'{}' is not one of the enumerated values [{}]",
                    normalized,
                    expected.join(", ")
                ));
            }
        }

        let checks: [(Option<&BoundFacet>, &[Ordering], &str); 4] = [
            (self.min_inclusive.as_ref(), &[Ordering::Greater, Ordering::Equal], "minInclusive"),
            (self.min_exclusive.as_ref(), &[Ordering::Greater], "minExclusive"),
            (self.max_inclusive.as_ref(), &[Ordering::Less, Ordering::Equal], "maxInclusive"),
            (self.max_exclusive.as_ref(), &[Ordering::Less], "maxExclusive"),
        ];
        for (bound, allowed, name) in checks {
            if let Some(bound) = bound {
                match value.compare(&bound.value) {
                    Some(ord) if allowed.contains(&ord) => {}
                    _ => {
                        return Err(format!(
                            "'{}' violates {} '{}'",
                            normalized, name, bound.lexical
                        ))
                    }
                }
            }
        }

        if self.total_digits.is_some() || self.fraction_digits.is_some() {
            if let Value::Decimal(d) = value {
                let (total, fraction) = decimal_digits(d);
                if let Some(f) = &self.total_digits {
                    if total > f.value {
                        return Err(format!(
                            "'{}' has {} digits, more than totalDigits {}",
                            normalized, total, f.value
                        ));
                    }
                }
                if let Some(f) = &self.fraction_digits {
                    if fraction > f.value {
                        return Err(format!(
                            "'{}' has {} fraction digits, more than fractionDigits {}",
                            normalized, fraction, f.value
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
