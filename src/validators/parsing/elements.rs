//! Element declarations

use super::{attrs, elems, SchemaParser};
use crate::documents::NodeId;
use crate::error::{Diagnostic, Result};
use crate::namespaces::QNamePolicy;
use crate::validators::base::{Form, TypeRef, COMPLEX_DERIVATION, ELEMENT_BLOCK};
use crate::validators::elements::ElementDecl;

impl SchemaParser<'_> {
    /// Parse a top-level `xs:element`
    pub(super) fn parse_global_element(&mut self, node: NodeId) -> Result<ElementDecl> {
        self.check_attributes(
            node,
            &[
                attrs::ID,
                attrs::NAME,
                attrs::TYPE,
                attrs::SUBSTITUTION_GROUP,
                attrs::DEFAULT,
                attrs::FIXED,
                attrs::NILLABLE,
                attrs::ABSTRACT,
                attrs::FINAL,
                attrs::BLOCK,
            ],
        )?;
        let local = self.ncname_attr(node, attrs::NAME)?;
        let name = self.qualified(local);

        let mut element = ElementDecl::new(name.clone());
        element.is_global = true;
        element.form = Form::Qualified;
        element.source = self.source(node);
        element.source_namespace = self.target_namespace.clone();
        element.nillable = self.bool_attr(node, attrs::NILLABLE, false)?;
        element.is_abstract = self.bool_attr(node, attrs::ABSTRACT, false)?;
        element.block = self.derivation_attr(node, attrs::BLOCK, ELEMENT_BLOCK, self.block_default)?;
        element.final_set =
            self.derivation_attr(node, attrs::FINAL, COMPLEX_DERIVATION, self.final_default)?;
        element.value_constraint = self.value_constraint(node)?;

        if let Some(head) = self.attr(node, attrs::SUBSTITUTION_GROUP) {
            let head = self.resolve_reference(node, head, QNamePolicy::UseDefaultNamespace)?;
            self.substitution_groups
                .entry(head.clone())
                .or_default()
                .push(name);
            element.substitution_group = Some(head);
        }

        self.parse_element_content(node, &mut element)?;
        if !element.type_explicit && element.substitution_group.is_some() {
            element.type_ref = TypeRef::Inferred;
        }
        Ok(element)
    }

    /// Parse an `xs:element` inside a model group
    pub(super) fn parse_local_element(&mut self, node: NodeId) -> Result<ElementDecl> {
        if let Some(reference) = self.attr(node, attrs::REF) {
            if self.attr(node, attrs::NAME).is_some() {
                return Err(self.error_code(
                    node,
                    "src-element.2.1",
                    "'name' and 'ref' attributes are mutually exclusive",
                ));
            }
            self.check_attributes(
                node,
                &[attrs::ID, attrs::REF, attrs::MIN_OCCURS, attrs::MAX_OCCURS],
            )?;
            let name = self.resolve_reference(node, reference, QNamePolicy::UseDefaultNamespace)?;
            let mut element = ElementDecl::reference(name, self.occurs(node)?);
            element.source = self.source(node);
            element.source_namespace = self.target_namespace.clone();
            self.no_children(node)?;
            return Ok(element);
        }

        self.check_attributes(
            node,
            &[
                attrs::ID,
                attrs::NAME,
                attrs::TYPE,
                attrs::MIN_OCCURS,
                attrs::MAX_OCCURS,
                attrs::DEFAULT,
                attrs::FIXED,
                attrs::NILLABLE,
                attrs::BLOCK,
                attrs::FORM,
            ],
        )?;
        let local = self.ncname_attr(node, attrs::NAME)?;
        let form = self.form_attr(node, attrs::FORM, self.element_form_default)?;

        let mut element = ElementDecl::new(self.local_name(local, form));
        element.form = form;
        element.occurs = self.occurs(node)?;
        element.source = self.source(node);
        element.source_namespace = self.target_namespace.clone();
        element.nillable = self.bool_attr(node, attrs::NILLABLE, false)?;
        element.block = self.derivation_attr(node, attrs::BLOCK, ELEMENT_BLOCK, self.block_default)?;
        element.value_constraint = self.value_constraint(node)?;
        self.parse_element_content(node, &mut element)?;
        Ok(element)
    }

    /// Type and identity constraints of an element declaration
    fn parse_element_content(&mut self, node: NodeId, element: &mut ElementDecl) -> Result<()> {
        let type_attr = self.attr(node, attrs::TYPE);
        if let Some(lexical) = type_attr {
            element.type_ref = self.resolve_type_name(node, lexical, true)?;
            element.type_explicit = true;
        }

        let mut seen_type = false;
        let mut seen_constraint = false;
        for child in self.xsd_children(node)? {
            match self.local(child) {
                elems::SIMPLE_TYPE | elems::COMPLEX_TYPE => {
                    if seen_type || seen_constraint {
                        return Err(self.unexpected(child, node));
                    }
                    if type_attr.is_some() {
                        return Err(self.annotate(
                            node,
                            Diagnostic::parse(
                                "the 'type' attribute and an anonymous type definition are mutually exclusive",
                            )
                            .with_code("src-element.3"),
                        ));
                    }
                    seen_type = true;
                    element.type_ref = if self.local(child) == elems::SIMPLE_TYPE {
                        TypeRef::Simple(Box::new(self.parse_simple_type(child, false)?))
                    } else {
                        TypeRef::Complex(Box::new(self.parse_complex_type(child, false)?))
                    };
                    element.type_explicit = true;
                }
                elems::UNIQUE | elems::KEY | elems::KEYREF => {
                    seen_constraint = true;
                    let constraint = self.parse_identity_constraint(child, &element.name)?;
                    element.constraints.push(constraint.name.clone());
                    self.components.add_identity_constraint(constraint)?;
                }
                _ => return Err(self.unexpected(child, node)),
            }
        }
        Ok(())
    }
}
