//! Identity constraint definitions

use super::{attrs, elems, SchemaParser};
use crate::documents::NodeId;
use crate::error::Result;
use crate::namespaces::{QName, QNamePolicy};
use crate::validators::identities::{IdentityConstraint, IdentityConstraintKind, IdentityXPath};

impl SchemaParser<'_> {
    /// Parse `xs:unique`, `xs:key` or `xs:keyref` declared on `element`
    pub(super) fn parse_identity_constraint(
        &mut self,
        node: NodeId,
        element: &QName,
    ) -> Result<IdentityConstraint> {
        let kind = IdentityConstraintKind::from_local_name(self.local(node))
            .ok_or_else(|| self.error(node, "not an identity constraint"))?;
        if kind == IdentityConstraintKind::KeyRef {
            self.check_attributes(node, &[attrs::ID, attrs::NAME, attrs::REFER])?;
        } else {
            self.check_attributes(node, &[attrs::ID, attrs::NAME])?;
        }
        let name = self.qualified(self.ncname_attr(node, attrs::NAME)?);
        let refer = match kind {
            IdentityConstraintKind::KeyRef => {
                let refer = self.required_attr(node, attrs::REFER)?;
                Some(self.resolve_reference(node, refer, QNamePolicy::UseDefaultNamespace)?)
            }
            _ => None,
        };

        let children = self.xsd_children(node)?;
        let (selector_node, field_nodes) = match children.split_first() {
            Some((&first, rest)) if self.local(first) == elems::SELECTOR => (first, rest),
            _ => {
                return Err(self.error(
                    node,
                    format!("'{}' requires a 'selector' child", self.local(node)),
                ))
            }
        };
        if field_nodes.is_empty() {
            return Err(self.error(
                node,
                format!("'{}' requires at least one 'field' child", self.local(node)),
            ));
        }

        let selector = self.parse_identity_xpath(selector_node, true)?;
        let mut fields = Vec::with_capacity(field_nodes.len());
        for &field in field_nodes {
            if self.local(field) != elems::FIELD {
                return Err(self.unexpected(field, node));
            }
            fields.push(self.parse_identity_xpath(field, false)?);
        }

        Ok(IdentityConstraint {
            name,
            kind,
            selector,
            fields,
            refer,
            namespaces: self.namespaces(node),
            element: element.clone(),
            source: self.source(node),
        })
    }

    fn parse_identity_xpath(&mut self, node: NodeId, selector: bool) -> Result<IdentityXPath> {
        self.check_attributes(node, &[attrs::ID, attrs::XPATH])?;
        self.no_children(node)?;
        let xpath = self.required_attr(node, attrs::XPATH)?;
        let namespaces = self.namespaces(node);
        let parsed = if selector {
            IdentityXPath::selector(xpath, &namespaces)
        } else {
            IdentityXPath::field(xpath, &namespaces)
        };
        parsed.map_err(|e| self.error(node, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::validators::parsing::parse_schema_str;

    fn parse_constraint(constraint: &str) -> crate::error::Result<()> {
        let xml = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:tns="urn:t" targetNamespace="urn:t">
                 <xs:element name="root">{}</xs:element>
               </xs:schema>"#,
            constraint
        );
        parse_schema_str(&xml, "identities.xsd").map(|_| ())
    }

    #[test]
    fn test_valid_unique() {
        assert!(parse_constraint(
            r#"<xs:unique name="u"><xs:selector xpath=".//tns:item | tns:other"/><xs:field xpath="@id"/><xs:field xpath="tns:code"/></xs:unique>"#
        )
        .is_ok());
    }

    #[test]
    fn test_keyref_requires_refer() {
        let err = parse_constraint(
            r#"<xs:keyref name="r"><xs:selector xpath="tns:item"/><xs:field xpath="@id"/></xs:keyref>"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing required attribute 'refer'"));
    }

    #[test]
    fn test_selector_and_fields_required() {
        assert!(parse_constraint(r#"<xs:key name="k"><xs:field xpath="@id"/></xs:key>"#).is_err());
        assert!(parse_constraint(r#"<xs:key name="k"><xs:selector xpath="."/></xs:key>"#).is_err());
    }

    #[test]
    fn test_invalid_xpath() {
        let err = parse_constraint(
            r#"<xs:key name="k"><xs:selector xpath="tns:item[1]"/><xs:field xpath="@id"/></xs:key>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaParse);

        let err = parse_constraint(
            r#"<xs:key name="k"><xs:selector xpath="zz:item"/><xs:field xpath="@id"/></xs:key>"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("undefined namespace prefix 'zz'"));
    }

    #[test]
    fn test_duplicate_constraint_names() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:element name="a"><xs:key name="k"><xs:selector xpath="."/><xs:field xpath="@id"/></xs:key></xs:element>
            <xs:element name="b"><xs:unique name="k"><xs:selector xpath="."/><xs:field xpath="@id"/></xs:unique></xs:element>
        </xs:schema>"#;
        let err = parse_schema_str(xml, "x.xsd").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaParse);
    }
}
