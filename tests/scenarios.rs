//! End-to-end scenarios
//!
//! Each test feeds schema documents through an in-memory provider and
//! checks the decision of the whole pipeline: a frozen schema set or the
//! error that aborts it.

use pretty_assertions::assert_eq;
use xsdcore::validators::{ContentKind, TypeRef};
use xsdcore::{build_schema_set, ErrorKind, MemoryProvider, QName, SchemaSetLoader};

const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

fn schema(attrs: &str, body: &str) -> String {
    format!("<xs:schema {} {}>{}</xs:schema>", XS, attrs, body)
}

fn single(attrs: &str, body: &str) -> MemoryProvider {
    MemoryProvider::new().with_file("main.xsd", schema(attrs, body))
}

// ============================================================================
// S1 - S8
// ============================================================================

#[test]
fn test_s1_minimal_element() {
    let set = build_schema_set(
        single(
            r#"targetNamespace="urn:t""#,
            r#"<xs:element name="root" type="xs:string"/>"#,
        ),
        "main.xsd",
    )
    .unwrap();

    assert!(set.is_frozen());
    assert_eq!(set.elements().count(), 1);
    let root = set.lookup_element(&QName::new("urn:t", "root")).unwrap();
    assert_eq!(root.type_ref, TypeRef::Named(QName::xsd("string")));
    let ty = set.element_type(root).unwrap();
    assert!(ty.is_simple());
    assert_eq!(ty.name(), Some(QName::xsd("string")));
}

#[test]
fn test_s2_duplicate_element() {
    let err = build_schema_set(
        single(
            r#"targetNamespace="urn:t""#,
            r#"<xs:element name="root"/><xs:element name="root"/>"#,
        ),
        "main.xsd",
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaParse);
    assert!(err.to_string().contains("duplicate element declaration"));
}

#[test]
fn test_s3_forward_type_reference() {
    let set = build_schema_set(
        single(
            r#"targetNamespace="urn:t" xmlns:tns="urn:t""#,
            r#"<xs:element name="root" type="tns:T"/>
               <xs:complexType name="T"><xs:sequence>
                 <xs:element name="child" type="xs:int"/>
               </xs:sequence></xs:complexType>"#,
        ),
        "main.xsd",
    )
    .unwrap();

    let root = set.lookup_element(&QName::new("urn:t", "root")).unwrap();
    let ty = set.element_type(root).unwrap();
    assert!(ty.is_complex());
    assert_eq!(ty.name(), Some(QName::new("urn:t", "T")));
    assert_eq!(ty.content_kind(), Some(ContentKind::ElementOnly));
}

#[test]
fn test_s4_unknown_prefix() {
    let err = build_schema_set(
        single(
            r#"targetNamespace="urn:t""#,
            r#"<xs:element name="root" type="abc:string"/>"#,
        ),
        "main.xsd",
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Reference);
    assert_eq!(err.code(), "schema-reference-error");
    assert!(err.to_string().contains("undefined namespace prefix 'abc'"));
}

#[test]
fn test_s5_include_namespace_mismatch() {
    let provider = MemoryProvider::new()
        .with_file(
            "main.xsd",
            schema(r#"targetNamespace="urn:a""#, r#"<xs:include schemaLocation="b.xsd"/>"#),
        )
        .with_file("b.xsd", schema(r#"targetNamespace="urn:b""#, ""));

    let err = build_schema_set(provider, "main.xsd").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaParse);
    assert_eq!(err.code(), "src-include.2.1");
    let message = err.to_string();
    assert!(message.contains("urn:a"));
    assert!(message.contains("urn:b"));
}

#[test]
fn test_s6_substitution_cycle() {
    let err = build_schema_set(
        single(
            r#"targetNamespace="urn:t" xmlns:tns="urn:t""#,
            r#"<xs:element name="A" substitutionGroup="tns:B"/>
               <xs:element name="B" substitutionGroup="tns:A"/>"#,
        ),
        "main.xsd",
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Semantic);
    assert_eq!(err.code(), "e-props-correct.6");
    let message = err.to_string();
    assert!(message.contains("{urn:t}A"));
    assert!(message.contains("{urn:t}B"));
}

#[test]
fn test_s7_chameleon_include() {
    let provider = MemoryProvider::new()
        .with_file(
            "main.xsd",
            schema(
                r#"targetNamespace="urn:a" xmlns:a="urn:a""#,
                r#"<xs:include schemaLocation="common.xsd"/>
                   <xs:element name="root" type="a:Shared"/>"#,
            ),
        )
        .with_file(
            "common.xsd",
            schema(
                "",
                r#"<xs:simpleType name="Shared"><xs:restriction base="xs:token"/></xs:simpleType>
                   <xs:element name="item" type="Shared"/>"#,
            ),
        );

    let set = build_schema_set(provider, "main.xsd").unwrap();
    let item = set.lookup_element(&QName::new("urn:a", "item")).unwrap();
    assert_eq!(item.name.namespace, "urn:a");
    assert_eq!(item.type_ref, TypeRef::Named(QName::new("urn:a", "Shared")));
    assert!(set.lookup_element(&QName::local("item")).is_none());
    assert!(set.documents().iter().any(|d| d.chameleon));
}

#[test]
fn test_s8_all_conflict() {
    let err = build_schema_set(
        single(r###"targetNamespace="urn:t" blockDefault="#all extension""###, ""),
        "main.xsd",
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaParse);
    assert!(err
        .to_string()
        .contains("derivation set cannot combine '#all' with other values"));
}

// ============================================================================
// Larger sets
// ============================================================================

#[test]
fn test_import_graph_resolves_across_namespaces() {
    let provider = MemoryProvider::new()
        .with_file(
            "po/order.xsd",
            schema(
                r#"targetNamespace="urn:po" xmlns:po="urn:po" xmlns:addr="urn:addr" elementFormDefault="qualified""#,
                r#"<xs:import namespace="urn:addr" schemaLocation="../common/address.xsd"/>
                   <xs:element name="order" type="po:Order"/>
                   <xs:complexType name="Order">
                     <xs:sequence>
                       <xs:element name="shipTo" type="addr:Address"/>
                       <xs:element ref="addr:note" minOccurs="0"/>
                     </xs:sequence>
                     <xs:attribute name="date" type="xs:date" use="required"/>
                   </xs:complexType>"#,
            ),
        )
        .with_file(
            "common/address.xsd",
            schema(
                r#"targetNamespace="urn:addr" xmlns:addr="urn:addr""#,
                r#"<xs:complexType name="Address"><xs:sequence>
                     <xs:element name="street" type="xs:string"/>
                     <xs:element name="zip" type="addr:Zip"/>
                   </xs:sequence></xs:complexType>
                   <xs:simpleType name="Zip"><xs:restriction base="xs:string">
                     <xs:pattern value="[0-9]{5}"/>
                   </xs:restriction></xs:simpleType>
                   <xs:element name="note" type="xs:string"/>"#,
            ),
        );

    let set = SchemaSetLoader::new(provider).build("po/order.xsd").unwrap();
    let counts = set.counts();
    assert_eq!(counts.documents, 2);
    assert_eq!(counts.types, 3);
    assert_eq!(counts.elements, 2);

    let zip = set
        .lookup_type(&QName::new("urn:addr", "Zip"))
        .unwrap()
        .value_type()
        .unwrap();
    let ns = xsdcore::NamespaceContext::new();
    assert!(zip.validate("12345", &ns).is_ok());
    assert!(zip.validate("1234", &ns).is_err());

    let order = set
        .lookup_type(&QName::new("urn:po", "Order"))
        .unwrap()
        .as_complex()
        .unwrap();
    let date = &order.attribute_uses()[0];
    assert!(date.is_required());
}

#[test]
fn test_frozen_set_is_shared_across_threads() {
    let set = build_schema_set(
        single(
            r#"targetNamespace="urn:t""#,
            r#"<xs:element name="a" type="xs:int"/><xs:element name="b" type="xs:string"/>"#,
        ),
        "main.xsd",
    )
    .unwrap();

    let handles: Vec<_> = ["a", "b"]
        .into_iter()
        .map(|name| {
            let set = set.clone();
            std::thread::spawn(move || set.lookup_element(&QName::new("urn:t", name)).is_some())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn test_resolver_reports_every_problem() {
    let err = build_schema_set(
        single(
            r#"targetNamespace="urn:t" xmlns:tns="urn:t""#,
            r#"<xs:simpleType name="a"><xs:restriction base="tns:b"/></xs:simpleType>
               <xs:simpleType name="b"><xs:restriction base="tns:a"/></xs:simpleType>
               <xs:element name="n" type="xs:int" default="ten"/>"#,
        ),
        "main.xsd",
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Semantic);
    let codes: Vec<String> = err.diagnostics().into_iter().map(|d| d.code).collect();
    assert_eq!(codes, vec!["st-props-correct.2", "e-props-correct.2"]);
}

#[test]
fn test_frozen_set_lookups() {
    let set = build_schema_set(
        single(
            r#"targetNamespace="urn:t" xmlns:tns="urn:t""#,
            r#"<xs:notation name="png" public="image/png" system="viewer"/>
               <xs:simpleType name="Code" id="code-type"><xs:restriction base="xs:token"/></xs:simpleType>
               <xs:group name="pair"><xs:sequence>
                 <xs:element name="left" type="tns:Code"/>
                 <xs:element name="right" type="tns:Code"/>
               </xs:sequence></xs:group>
               <xs:element name="root">
                 <xs:complexType><xs:group ref="tns:pair" maxOccurs="unbounded"/></xs:complexType>
                 <xs:key name="leftKey"><xs:selector xpath="tns:left"/><xs:field xpath="."/></xs:key>
               </xs:element>"#,
        ),
        "main.xsd",
    )
    .unwrap();

    let png = set.lookup_notation(&QName::new("urn:t", "png")).unwrap();
    assert_eq!(png.public.as_deref(), Some("image/png"));
    assert_eq!(png.system.as_deref(), Some("viewer"));

    let pair = set.lookup_group_definition(&QName::new("urn:t", "pair")).unwrap();
    assert_eq!(pair.group.particles.len(), 2);
    assert_eq!(pair.source_namespace, "urn:t");

    let key = set.identity_constraint(&QName::new("urn:t", "leftKey")).unwrap();
    assert!(key.is_key());
    assert!(key.is_referenceable());
    assert_eq!(key.element, QName::new("urn:t", "root"));

    let (_, code) = set
        .types()
        .find(|(name, _)| name.local_name == "Code")
        .unwrap();
    assert!(code.as_simple().unwrap().is_resolved());
    assert!(set.ids().any(|(id, _)| id == "code-type"));
}
