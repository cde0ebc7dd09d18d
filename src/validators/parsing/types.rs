//! Simple and complex type definitions

use std::sync::Arc;

use super::{attrs, elems, SchemaParser};
use crate::documents::NodeId;
use crate::error::{Diagnostic, Result};
use crate::names::trim_xml_whitespace;
use crate::validators::base::{DerivationMethod, TypeRef, COMPLEX_DERIVATION, SIMPLE_FINAL};
use crate::validators::complex_types::{ComplexContent, ComplexType, Content, SimpleContent};
use crate::validators::facets::{EnumerationValue, Facet, FacetKind, FacetValue, WhiteSpace};
use crate::validators::particles::Particle;
use crate::validators::patterns::Pattern;
use crate::validators::simple_types::{builtin_info, SimpleDerivation, SimpleType, SimpleTypeInfo};

impl SchemaParser<'_> {
    // =========================================================================
    // Simple types
    // =========================================================================

    /// Parse an `xs:simpleType`, top-level when `global`
    pub(super) fn parse_simple_type(&mut self, node: NodeId, global: bool) -> Result<SimpleType> {
        let (name, final_set) = if global {
            self.check_attributes(node, &[attrs::ID, attrs::NAME, attrs::FINAL])?;
            let name = self.qualified(self.ncname_attr(node, attrs::NAME)?);
            let final_set =
                self.derivation_attr(node, attrs::FINAL, SIMPLE_FINAL, self.final_default)?;
            (Some(name), final_set)
        } else {
            if self.attr(node, attrs::NAME).is_some() {
                return Err(self.error(node, "a local simpleType cannot have a name"));
            }
            self.check_attributes(node, &[attrs::ID])?;
            (None, Default::default())
        };

        let children = self.xsd_children(node)?;
        let child = match children.as_slice() {
            [child] => *child,
            [] => {
                return Err(self.error(
                    node,
                    "'simpleType' requires one of 'restriction', 'list' or 'union'",
                ))
            }
            [_, extra, ..] => return Err(self.unexpected(*extra, node)),
        };
        let derivation = match self.local(child) {
            elems::RESTRICTION => self.parse_simple_restriction(child)?,
            elems::LIST => self.parse_list(child)?,
            elems::UNION => self.parse_union(child)?,
            _ => return Err(self.unexpected(child, node)),
        };

        let white_space = match &derivation {
            SimpleDerivation::Restriction { facets, .. } => facets.iter().find_map(|f| match f {
                Facet::WhiteSpace(v) => Some(v.value),
                _ => None,
            }),
            _ => None,
        };
        let mut simple_type = SimpleType::new(name, derivation);
        simple_type.white_space = white_space;
        simple_type.final_set = final_set;
        simple_type.source_namespace = self.target_namespace.clone();
        simple_type.source = self.source(node);
        Ok(simple_type)
    }

    fn parse_simple_restriction(&mut self, node: NodeId) -> Result<SimpleDerivation> {
        self.check_attributes(node, &[attrs::ID, attrs::BASE])?;
        let children = self.xsd_children(node)?;
        let inline = children
            .first()
            .copied()
            .filter(|&child| self.local(child) == elems::SIMPLE_TYPE);

        let base = match (self.attr(node, attrs::BASE), inline) {
            (Some(_), Some(_)) => {
                return Err(self.error_code(
                    node,
                    "src-restriction-base-or-simpleType",
                    "the 'base' attribute and an inline simpleType are mutually exclusive",
                ))
            }
            (Some(base), None) => self.resolve_type_name(node, base, false)?,
            (None, Some(child)) => TypeRef::Simple(Box::new(self.parse_simple_type(child, false)?)),
            (None, None) => {
                return Err(self.error_code(
                    node,
                    "src-restriction-base-or-simpleType",
                    "a restriction requires a 'base' attribute or an inline simpleType",
                ))
            }
        };

        let rest = &children[usize::from(inline.is_some())..];
        let builtin = match &base {
            TypeRef::Named(name) if name.is_xsd() => builtin_info(&name.local_name),
            _ => None,
        };
        let (facets, consumed) = self.parse_facets(node, rest, builtin)?;
        if let Some(&extra) = rest.get(consumed) {
            return Err(self.unexpected(extra, node));
        }
        Ok(SimpleDerivation::Restriction { base, facets })
    }

    fn parse_list(&mut self, node: NodeId) -> Result<SimpleDerivation> {
        self.check_attributes(node, &[attrs::ID, attrs::ITEM_TYPE])?;
        let children = self.xsd_children(node)?;
        let inline = children
            .first()
            .copied()
            .filter(|&child| self.local(child) == elems::SIMPLE_TYPE);

        let item = match (self.attr(node, attrs::ITEM_TYPE), inline) {
            (Some(_), Some(_)) => {
                return Err(self.error_code(
                    node,
                    "src-list-itemType-or-simpleType",
                    "the 'itemType' attribute and an inline simpleType are mutually exclusive",
                ))
            }
            (Some(item), None) => self.resolve_type_name(node, item, false)?,
            (None, Some(child)) => TypeRef::Simple(Box::new(self.parse_simple_type(child, false)?)),
            (None, None) => {
                return Err(self.error_code(
                    node,
                    "src-list-itemType-or-simpleType",
                    "a list requires an 'itemType' attribute or an inline simpleType",
                ))
            }
        };

        let rest = &children[usize::from(inline.is_some())..];
        let facets = match rest {
            [] => Vec::new(),
            [child] if self.local(*child) == elems::RESTRICTION => self.parse_list_facets(*child)?,
            [first, more @ ..] => {
                let extra = if self.local(*first) == elems::RESTRICTION {
                    more.first().copied().unwrap_or(*first)
                } else {
                    *first
                };
                return Err(self.unexpected(extra, node));
            }
        };
        Ok(SimpleDerivation::List { item, facets })
    }

    /// Facets of a `restriction` embedded in a `list`, constraining the list as a whole
    fn parse_list_facets(&mut self, node: NodeId) -> Result<Vec<Facet>> {
        self.check_attributes(node, &[attrs::ID])?;
        let children = self.xsd_children(node)?;
        let (facets, consumed) = self.parse_facets(node, &children, None)?;
        if let Some(&extra) = children.get(consumed) {
            return Err(self.unexpected(extra, node));
        }
        Ok(facets)
    }

    fn parse_union(&mut self, node: NodeId) -> Result<SimpleDerivation> {
        self.check_attributes(node, &[attrs::ID, attrs::MEMBER_TYPES])?;
        let mut members = match self.attr(node, attrs::MEMBER_TYPES) {
            Some(value) => self.resolve_type_list(node, value)?,
            None => Vec::new(),
        };
        for child in self.xsd_children(node)? {
            if self.local(child) != elems::SIMPLE_TYPE {
                return Err(self.unexpected(child, node));
            }
            members.push(TypeRef::Simple(Box::new(self.parse_simple_type(child, false)?)));
        }
        if members.is_empty() {
            return Err(self.error_code(
                node,
                "src-union-memberTypes-or-simpleTypes",
                "a union requires member types",
            ));
        }
        Ok(SimpleDerivation::Union { members })
    }

    // =========================================================================
    // Facets
    // =========================================================================

    /// Parse the leading facet children, returning them with the count consumed
    ///
    /// Sibling `pattern` values are OR-ed into one facet and sibling
    /// `enumeration` values gathered into one. Ordered facets are read with
    /// `builtin` when the base is a built-in and deferred otherwise.
    fn parse_facets(
        &mut self,
        parent: NodeId,
        children: &[NodeId],
        builtin: Option<Arc<SimpleTypeInfo>>,
    ) -> Result<(Vec<Facet>, usize)> {
        let mut facets: Vec<Facet> = Vec::new();
        let mut consumed = 0;
        for &child in children {
            let local = self.local(child);
            let kind = match FacetKind::from_name(local) {
                Some(kind) => kind,
                None if local == "assertion" || local == "explicitTimezone" => {
                    return Err(self.unexpected(child, parent))
                }
                None => break,
            };
            consumed += 1;

            match kind {
                FacetKind::Pattern | FacetKind::Enumeration => {
                    self.check_attributes(child, &[attrs::ID, attrs::VALUE])?
                }
                _ => self.check_attributes(child, &[attrs::ID, attrs::VALUE, attrs::FIXED])?,
            }
            self.no_children(child)?;
            let value = self.required_attr(child, attrs::VALUE)?;
            let fixed = self.bool_attr(child, attrs::FIXED, false)?;

            if kind != FacetKind::Pattern
                && kind != FacetKind::Enumeration
                && facets.iter().any(|f| f.kind() == kind)
            {
                return Err(self.error(
                    child,
                    format!("multiple '{}' facets in one restriction", kind.name()),
                ));
            }

            let facet = match kind {
                FacetKind::Pattern => {
                    let pattern = Pattern::new(value);
                    if let Err(message) = pattern.regex() {
                        return Err(self.annotate(
                            child,
                            Diagnostic::parse(message)
                                .with_code("cos-pattern")
                                .with_actual(value),
                        ));
                    }
                    if let Some(Facet::Pattern(existing)) =
                        facets.iter_mut().find(|f| f.kind() == FacetKind::Pattern)
                    {
                        existing.push_branch(value);
                        continue;
                    }
                    Facet::Pattern(pattern)
                }
                FacetKind::Enumeration => {
                    let enumeration = EnumerationValue::new(value, self.namespaces(child));
                    if let Some(Facet::Enumeration(values)) =
                        facets.iter_mut().find(|f| f.kind() == FacetKind::Enumeration)
                    {
                        values.push(enumeration);
                        continue;
                    }
                    Facet::Enumeration(vec![enumeration])
                }
                FacetKind::Length | FacetKind::MinLength | FacetKind::MaxLength => {
                    let length = self.facet_number::<u64>(child, kind, value)?;
                    let length = FacetValue { value: length, fixed };
                    match kind {
                        FacetKind::Length => Facet::Length(length),
                        FacetKind::MinLength => Facet::MinLength(length),
                        _ => Facet::MaxLength(length),
                    }
                }
                FacetKind::TotalDigits => {
                    let digits = self.facet_number::<u32>(child, kind, value)?;
                    if digits == 0 {
                        return Err(self.error(child, "totalDigits must be a positive integer"));
                    }
                    Facet::TotalDigits(FacetValue { value: digits, fixed })
                }
                FacetKind::FractionDigits => {
                    let digits = self.facet_number::<u32>(child, kind, value)?;
                    Facet::FractionDigits(FacetValue { value: digits, fixed })
                }
                FacetKind::WhiteSpace => {
                    let mode: WhiteSpace = trim_xml_whitespace(value)
                        .parse()
                        .map_err(|message: String| self.error(child, message))?;
                    Facet::WhiteSpace(FacetValue { value: mode, fixed })
                }
                FacetKind::MaxInclusive
                | FacetKind::MaxExclusive
                | FacetKind::MinInclusive
                | FacetKind::MinExclusive => {
                    let namespaces = self.namespaces(child);
                    let bound = match &builtin {
                        Some(info) => {
                            let parse = |lexical: &str| info.validate(lexical, &namespaces);
                            Facet::bound(kind, value, fixed, Some(&parse))
                        }
                        None => Facet::bound(kind, value, fixed, None),
                    };
                    bound.map_err(|reason| {
                        self.annotate(
                            child,
                            Diagnostic::parse(format!(
                                "{} value '{}' is not valid for the base type: {}",
                                kind.name(),
                                value,
                                reason
                            ))
                            .with_code(format!("{}-valid-restriction", kind.name()))
                            .with_actual(value),
                        )
                    })?
                }
            };
            facets.push(facet);
        }
        Ok((facets, consumed))
    }

    fn facet_number<T: std::str::FromStr>(&self, node: NodeId, kind: FacetKind, value: &str) -> Result<T> {
        trim_xml_whitespace(value).parse::<T>().map_err(|_| {
            self.annotate(
                node,
                Diagnostic::parse(format!(
                    "'{}' facet requires a non-negative integer, got '{}'",
                    kind.name(),
                    value
                ))
                .with_actual(value),
            )
        })
    }

    // =========================================================================
    // Complex types
    // =========================================================================

    /// Parse an `xs:complexType`, top-level when `global`
    pub(super) fn parse_complex_type(&mut self, node: NodeId, global: bool) -> Result<ComplexType> {
        let mut complex_type = if global {
            self.check_attributes(
                node,
                &[
                    attrs::ID,
                    attrs::NAME,
                    attrs::MIXED,
                    attrs::ABSTRACT,
                    attrs::FINAL,
                    attrs::BLOCK,
                ],
            )?;
            let name = self.qualified(self.ncname_attr(node, attrs::NAME)?);
            let mut complex_type = ComplexType::new(Some(name));
            complex_type.is_abstract = self.bool_attr(node, attrs::ABSTRACT, false)?;
            complex_type.final_set =
                self.derivation_attr(node, attrs::FINAL, COMPLEX_DERIVATION, self.final_default)?;
            complex_type.block =
                self.derivation_attr(node, attrs::BLOCK, COMPLEX_DERIVATION, self.block_default)?;
            complex_type
        } else {
            if self.attr(node, attrs::NAME).is_some() {
                return Err(self.error(node, "a local complexType cannot have a name"));
            }
            self.check_attributes(node, &[attrs::ID, attrs::MIXED])?;
            ComplexType::new(None)
        };
        complex_type.mixed = self.bool_attr(node, attrs::MIXED, false)?;
        complex_type.source_namespace = self.target_namespace.clone();
        complex_type.source = self.source(node);

        let children = self.xsd_children(node)?;
        match children.first().map(|&c| self.local(c)) {
            Some(elems::SIMPLE_CONTENT) | Some(elems::COMPLEX_CONTENT) => {
                if let Some(&extra) = children.get(1) {
                    return Err(self.unexpected(extra, node));
                }
                if self.local(children[0]) == elems::SIMPLE_CONTENT {
                    self.parse_simple_content(children[0], &mut complex_type)?;
                } else {
                    self.parse_complex_content(children[0], &mut complex_type)?;
                }
            }
            Some(elems::ANY) => {
                complex_type.content = Content::ElementContent {
                    particle: self.parse_any_particle(children[0])?,
                };
                self.apply_attribute_content(node, &children[1..], &mut complex_type)?;
            }
            _ => {
                let (particle, rest) = self.parse_optional_particle(&children)?;
                if let Some(particle) = particle {
                    complex_type.content = Content::ElementContent { particle };
                }
                self.apply_attribute_content(node, rest, &mut complex_type)?;
            }
        }
        Ok(complex_type)
    }

    /// Split off a leading model group or group reference
    fn parse_optional_particle<'c>(
        &mut self,
        children: &'c [NodeId],
    ) -> Result<(Option<Particle>, &'c [NodeId])> {
        match children.first() {
            Some(&child)
                if matches!(
                    self.local(child),
                    elems::SEQUENCE | elems::CHOICE | elems::ALL | elems::GROUP
                ) =>
            {
                Ok((Some(self.parse_particle(child)?), &children[1..]))
            }
            _ => Ok((None, children)),
        }
    }

    fn apply_attribute_content(
        &mut self,
        parent: NodeId,
        children: &[NodeId],
        complex_type: &mut ComplexType,
    ) -> Result<()> {
        let content = self.parse_attribute_content(parent, children)?;
        complex_type.attributes = content.attributes;
        complex_type.attribute_groups = content.attribute_groups;
        complex_type.any_attribute = content.any_attribute;
        Ok(())
    }

    /// The single `restriction` or `extension` child of a content element
    fn derivation_child(&mut self, node: NodeId) -> Result<(NodeId, DerivationMethod)> {
        let children = self.xsd_children(node)?;
        let child = match children.as_slice() {
            [child] => *child,
            [] => {
                return Err(self.error(
                    node,
                    format!("'{}' requires a 'restriction' or 'extension'", self.local(node)),
                ))
            }
            [_, extra, ..] => return Err(self.unexpected(*extra, node)),
        };
        let method = match self.local(child) {
            elems::RESTRICTION => DerivationMethod::Restriction,
            elems::EXTENSION => DerivationMethod::Extension,
            _ => return Err(self.unexpected(child, node)),
        };
        self.check_attributes(child, &[attrs::ID, attrs::BASE])?;
        Ok((child, method))
    }

    fn parse_simple_content(&mut self, node: NodeId, complex_type: &mut ComplexType) -> Result<()> {
        self.check_attributes(node, &[attrs::ID])?;
        let (derivation, method) = self.derivation_child(node)?;
        let base = self.required_attr(derivation, attrs::BASE)?;
        complex_type.base = self.resolve_type_name(derivation, base, false)?;
        complex_type.derivation_method = method;

        let children = self.xsd_children(derivation)?;
        let mut content = SimpleContent::default();
        let mut rest: &[NodeId] = &children;
        if method == DerivationMethod::Restriction {
            if let Some(&first) = rest.first() {
                if self.local(first) == elems::SIMPLE_TYPE {
                    content.inline_base = Some(Box::new(self.parse_simple_type(first, false)?));
                    rest = &rest[1..];
                }
            }
            let (facets, consumed) = self.parse_facets(derivation, rest, None)?;
            content.facets = facets;
            rest = &rest[consumed..];
        }
        complex_type.content = Content::SimpleContent(content);
        self.apply_attribute_content(derivation, rest, complex_type)
    }

    fn parse_complex_content(&mut self, node: NodeId, complex_type: &mut ComplexType) -> Result<()> {
        self.check_attributes(node, &[attrs::ID, attrs::MIXED])?;
        let mixed_override = match self.attr(node, attrs::MIXED) {
            Some(_) => Some(self.bool_attr(node, attrs::MIXED, false)?),
            None => None,
        };
        let (derivation, method) = self.derivation_child(node)?;
        let base = self.required_attr(derivation, attrs::BASE)?;
        complex_type.base = self.resolve_type_name(derivation, base, false)?;
        complex_type.derivation_method = method;

        let children = self.xsd_children(derivation)?;
        let (particle, rest) = self.parse_optional_particle(&children)?;
        complex_type.content = Content::ComplexContent(ComplexContent {
            particle,
            mixed_override,
        });
        self.apply_attribute_content(derivation, rest, complex_type)
    }
}
