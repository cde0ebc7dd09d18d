//! Attribute declarations, attribute groups and notations

use super::{attrs, elems, SchemaParser};
use crate::documents::NodeId;
use crate::error::{Diagnostic, Result};
use crate::namespaces::{QName, QNamePolicy, XSI_NAMESPACE};
use crate::validators::attributes::{AttributeDecl, AttributeGroup, AttributeUseKind};
use crate::validators::base::{Form, TypeRef};
use crate::validators::globals::NotationDecl;
use crate::validators::wildcards::Wildcard;

/// Attribute uses, group references and wildcard of a component
#[derive(Debug, Default)]
pub(super) struct AttributeContent {
    pub attributes: Vec<AttributeDecl>,
    pub attribute_groups: Vec<QName>,
    pub any_attribute: Option<Wildcard>,
}

impl SchemaParser<'_> {
    /// Parse a top-level `xs:attribute`
    pub(super) fn parse_global_attribute(&mut self, node: NodeId) -> Result<AttributeDecl> {
        self.check_attributes(
            node,
            &[attrs::ID, attrs::NAME, attrs::TYPE, attrs::DEFAULT, attrs::FIXED],
        )?;
        let local = self.ncname_attr(node, attrs::NAME)?;
        if local == "xmlns" {
            return Err(self.error_code(node, "no-xmlns", "an attribute cannot be named 'xmlns'"));
        }
        if self.target_namespace == XSI_NAMESPACE {
            return Err(self.error_code(
                node,
                "no-xsi",
                "attributes cannot be declared in the XML Schema instance namespace",
            ));
        }
        let mut attribute = AttributeDecl::new(self.qualified(local));
        attribute.is_global = true;
        attribute.form = Form::Qualified;
        attribute.source = self.source(node);
        attribute.source_namespace = self.target_namespace.clone();
        attribute.value_constraint = self.value_constraint(node)?;
        self.parse_attribute_type(node, &mut attribute)?;
        Ok(attribute)
    }

    /// Parse an `xs:attribute` inside a complex type or attribute group
    pub(super) fn parse_local_attribute(&mut self, node: NodeId) -> Result<AttributeDecl> {
        let use_kind = match self.attr(node, attrs::USE) {
            None => AttributeUseKind::Optional,
            Some(value) => AttributeUseKind::from_str(value.trim()).ok_or_else(|| {
                self.error(
                    node,
                    format!(
                        "attribute 'use' must be 'optional', 'required' or 'prohibited', got '{}'",
                        value
                    ),
                )
            })?,
        };

        let mut attribute = if let Some(reference) = self.attr(node, attrs::REF) {
            if self.attr(node, attrs::NAME).is_some() {
                return Err(self.error_code(
                    node,
                    "src-attribute.3.1",
                    "'name' and 'ref' attributes are mutually exclusive",
                ));
            }
            self.check_attributes(
                node,
                &[attrs::ID, attrs::REF, attrs::USE, attrs::DEFAULT, attrs::FIXED],
            )?;
            let name = self.resolve_reference(node, reference, QNamePolicy::ForceEmptyNamespace)?;
            let mut attribute = AttributeDecl::reference(name);
            attribute.source = self.source(node);
            self.no_children(node)?;
            attribute
        } else {
            self.check_attributes(
                node,
                &[
                    attrs::ID,
                    attrs::NAME,
                    attrs::TYPE,
                    attrs::USE,
                    attrs::DEFAULT,
                    attrs::FIXED,
                    attrs::FORM,
                ],
            )?;
            let local = self.ncname_attr(node, attrs::NAME)?;
            if local == "xmlns" {
                return Err(self.error_code(node, "no-xmlns", "an attribute cannot be named 'xmlns'"));
            }
            let form = self.form_attr(node, attrs::FORM, self.attribute_form_default)?;
            let name = self.local_name(local, form);
            if name.namespace == XSI_NAMESPACE {
                return Err(self.error_code(
                    node,
                    "no-xsi",
                    "attributes cannot be declared in the XML Schema instance namespace",
                ));
            }
            let mut attribute = AttributeDecl::new(name);
            attribute.form = form;
            attribute.source = self.source(node);
            self.parse_attribute_type(node, &mut attribute)?;
            attribute
        };

        attribute.use_kind = use_kind;
        attribute.source_namespace = self.target_namespace.clone();
        attribute.value_constraint = self.value_constraint(node)?;
        if attribute.default_value().is_some() && use_kind != AttributeUseKind::Optional {
            return Err(self.error_code(
                node,
                "src-attribute.2",
                format!(
                    "an attribute with a default value must be optional, found use='{}'",
                    use_kind
                ),
            ));
        }
        Ok(attribute)
    }

    fn parse_attribute_type(&mut self, node: NodeId, attribute: &mut AttributeDecl) -> Result<()> {
        let type_attr = self.attr(node, attrs::TYPE);
        if let Some(lexical) = type_attr {
            attribute.type_ref = self.resolve_type_name(node, lexical, true)?;
        }
        let children = self.xsd_children(node)?;
        match children.as_slice() {
            [] => Ok(()),
            [child] if self.local(*child) == elems::SIMPLE_TYPE => {
                if type_attr.is_some() {
                    return Err(self.annotate(
                        node,
                        Diagnostic::parse(
                            "the 'type' attribute and an anonymous type definition are mutually exclusive",
                        )
                        .with_code("src-attribute.4"),
                    ));
                }
                attribute.type_ref = TypeRef::Simple(Box::new(self.parse_simple_type(*child, false)?));
                Ok(())
            }
            [first, rest @ ..] => {
                let extra = if self.local(*first) == elems::SIMPLE_TYPE {
                    rest.first().copied().unwrap_or(*first)
                } else {
                    *first
                };
                Err(self.unexpected(extra, node))
            }
        }
    }

    /// Parse `(attribute | attributeGroup)*, anyAttribute?` from `children`
    pub(super) fn parse_attribute_content(
        &mut self,
        parent: NodeId,
        children: &[NodeId],
    ) -> Result<AttributeContent> {
        let mut content = AttributeContent::default();
        for &child in children {
            if content.any_attribute.is_some() {
                return Err(self.error(
                    child,
                    format!(
                        "'anyAttribute' must be the last child of '{}'",
                        self.local(parent)
                    ),
                ));
            }
            match self.local(child) {
                elems::ATTRIBUTE => {
                    let attribute = self.parse_local_attribute(child)?;
                    if content.attributes.iter().any(|a| a.name == attribute.name) {
                        return Err(self.error_code(
                            child,
                            "ct-props-correct.4",
                            format!("duplicate attribute use '{}'", attribute.name),
                        ));
                    }
                    content.attributes.push(attribute);
                }
                elems::ATTRIBUTE_GROUP => {
                    self.check_attributes(child, &[attrs::ID, attrs::REF])?;
                    self.no_children(child)?;
                    let reference = self.required_attr(child, attrs::REF)?;
                    let name =
                        self.resolve_reference(child, reference, QNamePolicy::UseDefaultNamespace)?;
                    if !content.attribute_groups.contains(&name) {
                        content.attribute_groups.push(name);
                    }
                }
                elems::ANY_ATTRIBUTE => {
                    content.any_attribute = Some(self.parse_wildcard(child, false)?);
                }
                _ => return Err(self.unexpected(child, parent)),
            }
        }
        Ok(content)
    }

    /// Parse a top-level `xs:attributeGroup`
    pub(super) fn parse_attribute_group(&mut self, node: NodeId) -> Result<AttributeGroup> {
        if self.attr(node, attrs::REF).is_some() {
            return Err(self.error(node, "a top-level attribute group cannot be a reference"));
        }
        self.check_attributes(node, &[attrs::ID, attrs::NAME])?;
        let name = self.qualified(self.ncname_attr(node, attrs::NAME)?);
        let children = self.xsd_children(node)?;
        let content = self.parse_attribute_content(node, &children)?;

        let mut group = AttributeGroup::new(name);
        group.source = self.source(node);
        group.source_namespace = self.target_namespace.clone();
        group.attributes = content.attributes;
        group.attribute_groups = content.attribute_groups;
        group.any_attribute = content.any_attribute;
        Ok(group)
    }

    /// Parse a top-level `xs:notation`
    pub(super) fn parse_notation(&mut self, node: NodeId) -> Result<NotationDecl> {
        self.check_attributes(node, &[attrs::ID, attrs::NAME, attrs::PUBLIC, attrs::SYSTEM])?;
        let name = self.qualified(self.ncname_attr(node, attrs::NAME)?);
        self.no_children(node)?;
        let public = self.attr(node, attrs::PUBLIC).map(str::to_string);
        let system = self.attr(node, attrs::SYSTEM).map(str::to_string);
        if public.is_none() && system.is_none() {
            return Err(self.error(
                node,
                "a notation requires a 'public' or 'system' attribute",
            ));
        }
        Ok(NotationDecl {
            name,
            public,
            system,
            source_namespace: self.target_namespace.clone(),
            source: self.source(node),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::namespaces::QName;
    use crate::validators::attributes::AttributeUseKind;
    use crate::validators::base::TypeRef;
    use crate::validators::parsing::parse_schema_str;
    use crate::validators::schemas::Schema;
    use crate::validators::wildcards::{NamespaceConstraint, ProcessContents};
    use pretty_assertions::assert_eq;

    fn parse(body: &str) -> crate::error::Result<Schema> {
        let xml = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:tns="urn:t" targetNamespace="urn:t">{}</xs:schema>"#,
            body
        );
        parse_schema_str(&xml, "attributes.xsd")
    }

    #[test]
    fn test_global_attribute() {
        let schema = parse(r#"<xs:attribute name="lang" type="xs:language" default="en"/>"#).unwrap();
        let lang = &schema.components.attributes[&QName::new("urn:t", "lang")];
        assert!(lang.is_global);
        assert_eq!(lang.type_ref, TypeRef::Named(QName::xsd("language")));
        assert_eq!(lang.default_value(), Some("en"));
    }

    #[test]
    fn test_xmlns_rejected() {
        let err = parse(r#"<xs:attribute name="xmlns"/>"#).unwrap_err();
        assert_eq!(err.code(), "no-xmlns");
    }

    #[test]
    fn test_attribute_group_content() {
        let schema = parse(
            r###"<xs:attributeGroup name="common">
                 <xs:attribute name="id" type="xs:ID" use="required"/>
                 <xs:attribute ref="tns:lang"/>
                 <xs:attributeGroup ref="tns:other"/>
                 <xs:anyAttribute namespace="##other" processContents="lax"/>
               </xs:attributeGroup>
               <xs:attribute name="lang"/>
               <xs:attributeGroup name="other"/>"###,
        )
        .unwrap();
        let group = &schema.components.attribute_groups[&QName::new("urn:t", "common")];
        assert_eq!(group.attributes.len(), 2);
        assert_eq!(group.attributes[0].name, QName::local("id"));
        assert_eq!(group.attributes[0].use_kind, AttributeUseKind::Required);
        assert!(group.attributes[1].is_reference);
        assert_eq!(group.attribute_groups, vec![QName::new("urn:t", "other")]);
        let wildcard = group.any_attribute.as_ref().unwrap();
        assert_eq!(wildcard.namespace, NamespaceConstraint::Other("urn:t".to_string()));
        assert_eq!(wildcard.process_contents, ProcessContents::Lax);
    }

    #[test]
    fn test_unprefixed_attribute_ref_ignores_default_namespace() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns="urn:d">
              <xs:attribute name="a"/>
              <xs:attributeGroup name="g"><xs:attribute ref="a"/></xs:attributeGroup>
            </xs:schema>"#;
        let schema = parse_schema_str(xml, "refs.xsd").unwrap();
        let group = &schema.components.attribute_groups[&QName::local("g")];
        assert!(group.attributes[0].is_reference);
        assert_eq!(group.attributes[0].name, QName::local("a"));
    }

    #[test]
    fn test_prefixed_attribute_ref_keeps_its_namespace() {
        let schema = parse(
            r#"<xs:attribute name="lang"/>
               <xs:attributeGroup name="g"><xs:attribute ref="tns:lang"/></xs:attributeGroup>"#,
        )
        .unwrap();
        let group = &schema.components.attribute_groups[&QName::new("urn:t", "g")];
        assert_eq!(group.attributes[0].name, QName::new("urn:t", "lang"));
    }

    #[test]
    fn test_any_attribute_must_be_last() {
        let err = parse(
            r#"<xs:attributeGroup name="g"><xs:anyAttribute/><xs:attribute name="a"/></xs:attributeGroup>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaParse);
    }

    #[test]
    fn test_default_requires_optional_use() {
        let err = parse(
            r#"<xs:attributeGroup name="g"><xs:attribute name="a" use="required" default="x"/></xs:attributeGroup>"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "src-attribute.2");
    }

    #[test]
    fn test_duplicate_local_attribute() {
        let err = parse(
            r#"<xs:attributeGroup name="g"><xs:attribute name="a"/><xs:attribute name="a"/></xs:attributeGroup>"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "ct-props-correct.4");
    }

    #[test]
    fn test_notation() {
        let schema = parse(r#"<xs:notation name="png" public="image/png"/>"#).unwrap();
        let png = &schema.components.notations[&QName::new("urn:t", "png")];
        assert_eq!(png.public.as_deref(), Some("image/png"));
        assert!(parse(r#"<xs:notation name="bad"/>"#).is_err());
    }
}
