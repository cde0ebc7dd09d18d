//! Model groups, group definitions and element wildcards

use std::sync::Arc;

use super::{attrs, elems, SchemaParser};
use crate::documents::NodeId;
use crate::error::Result;
use crate::names::trim_xml_whitespace;
use crate::namespaces::QNamePolicy;
use crate::validators::groups::{GroupDefinition, GroupKind, GroupRef, ModelGroup};
use crate::validators::particles::Particle;
use crate::validators::wildcards::{AnyElement, NamespaceConstraint, ProcessContents, Wildcard};

impl SchemaParser<'_> {
    /// Parse a model group or group reference used as a content model
    pub(super) fn parse_particle(&mut self, node: NodeId) -> Result<Particle> {
        match self.local(node) {
            elems::SEQUENCE | elems::CHOICE | elems::ALL => {
                Ok(Particle::Group(self.parse_model_group(node, None)?))
            }
            elems::GROUP => Ok(Particle::GroupRef(self.parse_group_ref(node)?)),
            _ => Err(self.error(
                node,
                format!("'{}' is not a model group", self.local(node)),
            )),
        }
    }

    /// Parse `sequence`, `choice` or `all`, nested in `parent` when given
    fn parse_model_group(&mut self, node: NodeId, parent: Option<GroupKind>) -> Result<ModelGroup> {
        self.check_attributes(node, &[attrs::ID, attrs::MIN_OCCURS, attrs::MAX_OCCURS])?;
        let kind = GroupKind::from_local_name(self.local(node))
            .ok_or_else(|| self.error(node, "not a model group"))?;
        if kind == GroupKind::All && parent.is_some() {
            return Err(self.error_code(
                node,
                "cos-all-limited",
                "an 'all' group cannot appear inside another model group",
            ));
        }

        let mut group = ModelGroup::new(kind);
        group.occurs = self.occurs(node)?;
        group.source = self.source(node);

        for child in self.xsd_children(node)? {
            let local = self.local(child);
            if kind == GroupKind::All && local != elems::ELEMENT {
                return Err(self.error_code(
                    child,
                    "cos-all-limited",
                    format!("'{}' is not allowed in an 'all' group", local),
                ));
            }
            let particle = match local {
                elems::ELEMENT => Particle::Element(Box::new(self.parse_local_element(child)?)),
                elems::GROUP => Particle::GroupRef(self.parse_group_ref(child)?),
                elems::SEQUENCE | elems::CHOICE | elems::ALL => {
                    Particle::Group(self.parse_model_group(child, Some(kind))?)
                }
                elems::ANY => self.parse_any_particle(child)?,
                elems::UNIQUE | elems::KEY | elems::KEYREF => {
                    return Err(self.error(
                        child,
                        "identity constraints are only allowed in element declarations",
                    ))
                }
                _ => return Err(self.unexpected(child, node)),
            };
            group.particles.push(particle);
        }

        if kind == GroupKind::All && !group.is_valid_all() {
            return Err(self.error_code(
                node,
                "cos-all-limited",
                "an 'all' group must occur at most once and its elements at most once each",
            ));
        }
        Ok(group)
    }

    /// Parse a top-level `xs:group`
    pub(super) fn parse_group_definition(&mut self, node: NodeId) -> Result<GroupDefinition> {
        if self.attr(node, attrs::REF).is_some() {
            return Err(self.error(node, "a top-level group cannot be a reference"));
        }
        self.check_attributes(node, &[attrs::ID, attrs::NAME])?;
        let name = self.qualified(self.ncname_attr(node, attrs::NAME)?);

        let children = self.xsd_children(node)?;
        let compositor = match children.as_slice() {
            [child] if matches!(self.local(*child), elems::SEQUENCE | elems::CHOICE | elems::ALL) => *child,
            [] => {
                return Err(self.error(
                    node,
                    "a group definition requires one of 'sequence', 'choice' or 'all'",
                ))
            }
            [first, rest @ ..] => {
                let extra = match self.local(*first) {
                    elems::SEQUENCE | elems::CHOICE | elems::ALL => rest.first().copied().unwrap_or(*first),
                    _ => *first,
                };
                return Err(self.unexpected(extra, node));
            }
        };
        if self.attr(compositor, attrs::MIN_OCCURS).is_some()
            || self.attr(compositor, attrs::MAX_OCCURS).is_some()
        {
            return Err(self.error(
                compositor,
                "the compositor of a group definition cannot carry 'minOccurs' or 'maxOccurs'",
            ));
        }
        let group = self.parse_model_group(compositor, None)?;

        Ok(GroupDefinition {
            name,
            group: Arc::new(group),
            source_namespace: self.target_namespace.clone(),
            source: self.source(node),
        })
    }

    fn parse_group_ref(&mut self, node: NodeId) -> Result<GroupRef> {
        if self.attr(node, attrs::NAME).is_some() {
            return Err(self.error(node, "a local group must be a reference"));
        }
        self.check_attributes(
            node,
            &[attrs::ID, attrs::REF, attrs::MIN_OCCURS, attrs::MAX_OCCURS],
        )?;
        let reference = self.required_attr(node, attrs::REF)?;
        let name = self.resolve_reference(node, reference, QNamePolicy::UseDefaultNamespace)?;
        self.no_children(node)?;
        let mut group_ref = GroupRef::new(name, self.occurs(node)?);
        group_ref.source = self.source(node);
        Ok(group_ref)
    }

    /// Parse `xs:any` (with occurrence attributes) or `xs:anyAttribute`
    /// An `any` element as a wildcard particle
    pub(super) fn parse_any_particle(&mut self, node: NodeId) -> Result<Particle> {
        Ok(Particle::Any(AnyElement {
            occurs: self.occurs(node)?,
            wildcard: self.parse_wildcard(node, true)?,
        }))
    }

    pub(super) fn parse_wildcard(&mut self, node: NodeId, element: bool) -> Result<Wildcard> {
        if element {
            self.check_attributes(
                node,
                &[
                    attrs::ID,
                    attrs::NAMESPACE,
                    attrs::PROCESS_CONTENTS,
                    attrs::MIN_OCCURS,
                    attrs::MAX_OCCURS,
                ],
            )?;
        } else {
            self.check_attributes(node, &[attrs::ID, attrs::NAMESPACE, attrs::PROCESS_CONTENTS])?;
        }
        self.no_children(node)?;

        let namespace = NamespaceConstraint::from_namespace_attr(
            self.attr(node, attrs::NAMESPACE),
            &self.target_namespace,
        )
        .map_err(|message| self.error(node, message))?;
        let process_contents = match self.attr(node, attrs::PROCESS_CONTENTS) {
            None => ProcessContents::Strict,
            Some(value) => ProcessContents::from_str(trim_xml_whitespace(value)).ok_or_else(|| {
                self.error(
                    node,
                    format!(
                        "processContents must be 'strict', 'lax' or 'skip', got '{}'",
                        value
                    ),
                )
            })?,
        };

        let mut wildcard = Wildcard::new(self.target_namespace.clone());
        wildcard.namespace = namespace;
        wildcard.process_contents = process_contents;
        wildcard.source = self.source(node);
        Ok(wildcard)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::namespaces::{QName, TARGET_NAMESPACE_PLACEHOLDER};
    use crate::validators::groups::GroupKind;
    use crate::validators::parsing::parse_schema_str;
    use crate::validators::particles::{Occurs, Particle};
    use crate::validators::schemas::Schema;
    use crate::validators::wildcards::{NamespaceConstraint, ProcessContents};
    use pretty_assertions::assert_eq;

    fn parse(body: &str) -> crate::error::Result<Schema> {
        let xml = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:tns="urn:t" targetNamespace="urn:t">{}</xs:schema>"#,
            body
        );
        parse_schema_str(&xml, "groups.xsd")
    }

    #[test]
    fn test_group_definition_and_reference() {
        let schema = parse(
            r#"<xs:group name="g"><xs:choice><xs:element name="a"/><xs:element name="b"/></xs:choice></xs:group>
               <xs:complexType name="t"><xs:sequence><xs:group ref="tns:g" maxOccurs="3"/></xs:sequence></xs:complexType>"#,
        )
        .unwrap();
        let g = &schema.components.groups[&QName::new("urn:t", "g")];
        assert_eq!(g.group.kind, GroupKind::Choice);
        assert_eq!(g.group.particles.len(), 2);

        let t = schema.components.types[&QName::new("urn:t", "t")]
            .as_complex()
            .unwrap();
        match t.particle() {
            Some(Particle::Group(seq)) => match &seq.particles[0] {
                Particle::GroupRef(r) => {
                    assert_eq!(r.name, QName::new("urn:t", "g"));
                    assert_eq!(r.occurs, Occurs::new(1, Some(3)));
                    assert!(!r.is_resolved());
                }
                other => panic!("unexpected particle {:?}", other),
            },
            other => panic!("unexpected particle {:?}", other),
        }
    }

    #[test]
    fn test_group_compositor_occurs_rejected() {
        let err = parse(r#"<xs:group name="g"><xs:sequence minOccurs="0"/></xs:group>"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaParse);
    }

    #[test]
    fn test_all_group_limits() {
        assert!(parse(
            r#"<xs:complexType name="ok"><xs:all minOccurs="0"><xs:element name="a" minOccurs="0"/></xs:all></xs:complexType>"#
        )
        .is_ok());
        let err = parse(
            r#"<xs:complexType name="t"><xs:all><xs:element name="a" maxOccurs="2"/></xs:all></xs:complexType>"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "cos-all-limited");
        let err = parse(
            r#"<xs:complexType name="t"><xs:sequence><xs:all><xs:element name="a"/></xs:all></xs:sequence></xs:complexType>"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "cos-all-limited");
        let err = parse(
            r#"<xs:complexType name="t"><xs:all><xs:any/></xs:all></xs:complexType>"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "cos-all-limited");
    }

    #[test]
    fn test_any_wildcard() {
        let schema = parse(
            r###"<xs:complexType name="t"><xs:sequence>
                 <xs:any namespace="##targetNamespace ##local urn:x" processContents="skip" minOccurs="0"/>
               </xs:sequence></xs:complexType>"###,
        )
        .unwrap();
        let t = schema.components.types[&QName::new("urn:t", "t")]
            .as_complex()
            .unwrap();
        match t.particle() {
            Some(Particle::Group(seq)) => match &seq.particles[0] {
                Particle::Any(any) => {
                    assert_eq!(any.occurs, Occurs::new(0, Some(1)));
                    assert_eq!(any.wildcard.process_contents, ProcessContents::Skip);
                    assert_eq!(
                        any.wildcard.namespace,
                        NamespaceConstraint::Enumeration(vec![
                            TARGET_NAMESPACE_PLACEHOLDER.to_string(),
                            String::new(),
                            "urn:x".to_string()
                        ])
                    );
                }
                other => panic!("unexpected particle {:?}", other),
            },
            other => panic!("unexpected particle {:?}", other),
        }
    }

    #[test]
    fn test_wildcard_errors() {
        let err = parse(
            r#"<xs:complexType name="t"><xs:sequence><xs:any processContents=""/></xs:sequence></xs:complexType>"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("processContents"));
        let err = parse(
            r###"<xs:complexType name="t"><xs:sequence><xs:any namespace="##any urn:x"/></xs:sequence></xs:complexType>"###,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaParse);
    }

    #[test]
    fn test_identity_constraint_in_group_rejected() {
        let err = parse(
            r#"<xs:complexType name="t"><xs:sequence><xs:key name="k"><xs:selector xpath="."/><xs:field xpath="@a"/></xs:key></xs:sequence></xs:complexType>"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("identity constraints"));
    }
}
