//! XML name validation and whitespace utilities
//!
//! Lexical checks for XML 1.0 (fifth edition) `Name`, `NCName`, `QName`
//! and `Nmtoken`, plus the XML whitespace helpers shared by the parser
//! and the value validators. XML whitespace is space, tab, CR and LF only.

use crate::error::{Diagnostic, ErrorKind};

/// Check the XML 1.0 `NameStartChar` production, colon included
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

/// Check the XML 1.0 `NameChar` production
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}

/// Check if a string is a valid XML Name
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start_char(first) => chars.all(is_name_char),
        _ => false,
    }
}

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    !name.contains(':') && is_valid_name(name)
}

/// Check if a string is a valid QName (qualified name)
pub fn is_valid_qname(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_valid_ncname(prefix) && is_valid_ncname(local),
        None => is_valid_ncname(name),
    }
}

/// Check if a string is a valid Nmtoken
pub fn is_valid_nmtoken(token: &str) -> bool {
    !token.is_empty() && token.chars().all(is_name_char)
}

/// Validate an NCName, reporting a schema parse error
pub fn validate_ncname(name: &str) -> Result<(), Diagnostic> {
    if is_valid_ncname(name) {
        Ok(())
    } else {
        Err(Diagnostic::new(ErrorKind::SchemaParse, format!("'{}' is not a valid NCName", name))
            .with_actual(name))
    }
}

/// Validate a lexical QName, reporting a schema parse error
pub fn validate_qname(name: &str) -> Result<(), Diagnostic> {
    if is_valid_qname(name) {
        Ok(())
    } else {
        Err(Diagnostic::new(ErrorKind::SchemaParse, format!("'{}' is not a valid QName", name))
            .with_actual(name))
    }
}

/// Split a QName into prefix and local name
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some((prefix, local)) = qname.split_once(':') {
        (Some(prefix), local)
    } else {
        (None, qname)
    }
}

/// XML whitespace: space, tab, CR, LF
pub fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Whether the string consists of XML whitespace only
pub fn is_all_whitespace(s: &str) -> bool {
    s.chars().all(is_xml_whitespace)
}

/// Split on runs of XML whitespace, skipping empty tokens
pub fn split_xml_whitespace(s: &str) -> impl Iterator<Item = &str> {
    s.split(is_xml_whitespace).filter(|t| !t.is_empty())
}

/// Trim leading and trailing XML whitespace
pub fn trim_xml_whitespace(s: &str) -> &str {
    s.trim_matches(is_xml_whitespace)
}

/// `whiteSpace="replace"`: every tab, CR and LF becomes a space
pub fn replace_whitespace(s: &str) -> String {
    s.chars()
        .map(|c| if is_xml_whitespace(c) { ' ' } else { c })
        .collect()
}

/// `whiteSpace="collapse"`: replace, squeeze runs, trim
pub fn collapse_whitespace(s: &str) -> String {
    split_xml_whitespace(s).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("element"));
        assert!(is_valid_name("my-element"));
        assert!(is_valid_name("my_element"));
        assert!(is_valid_name("element123"));
        assert!(is_valid_name("_element"));
        assert!(is_valid_name("a:b"));
        assert!(is_valid_name("\u{00E9}l\u{00E9}ment"));

        assert!(!is_valid_name(""));
        assert!(!is_valid_name("123element"));
        assert!(!is_valid_name("-element"));
        assert!(!is_valid_name("a b"));
    }

    #[test]
    fn test_is_valid_ncname() {
        assert!(is_valid_ncname("element"));
        assert!(is_valid_ncname("my-element"));
        assert!(is_valid_ncname("x.y\u{B7}z"));

        assert!(!is_valid_ncname(""));
        assert!(!is_valid_ncname("prefix:element"));
    }

    #[test]
    fn test_is_valid_qname() {
        assert!(is_valid_qname("element"));
        assert!(is_valid_qname("prefix:element"));
        assert!(is_valid_qname("xs:schema"));

        assert!(!is_valid_qname(""));
        assert!(!is_valid_qname(":element"));
        assert!(!is_valid_qname("element:"));
        assert!(!is_valid_qname("a:b:c"));
    }

    #[test]
    fn test_nmtoken() {
        assert!(is_valid_nmtoken("123"));
        assert!(is_valid_nmtoken("-x"));
        assert!(!is_valid_nmtoken(""));
        assert!(!is_valid_nmtoken("a b"));
    }

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("element"), (None, "element"));
        assert_eq!(split_qname("xs:element"), (Some("xs"), "element"));
    }

    #[test]
    fn test_whitespace_helpers() {
        assert_eq!(replace_whitespace("a\tb\nc"), "a b c");
        assert_eq!(collapse_whitespace("  a \t\n b  "), "a b");
        // non-breaking space is not XML whitespace
        assert_eq!(collapse_whitespace("a\u{A0}b"), "a\u{A0}b");
        let tokens: Vec<_> = split_xml_whitespace("#all\u{A0}extension").collect();
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn test_validate_ncname_error() {
        let err = validate_ncname("1abc").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SchemaParse);
        assert_eq!(err.actual.as_deref(), Some("1abc"));
    }

    proptest! {
        #[test]
        fn prop_ascii_ncnames_accepted(name in "[A-Za-z_][A-Za-z0-9_.-]{0,20}") {
            prop_assert!(is_valid_ncname(&name));
            prop_assert!(is_valid_qname(&name));
        }

        #[test]
        fn prop_colon_never_ncname(a in "[a-z]{1,5}", b in "[a-z]{1,5}") {
            let name = format!("{}:{}", a, b);
            prop_assert!(!is_valid_ncname(&name));
            prop_assert!(is_valid_qname(&name));
        }

        #[test]
        fn prop_collapse_is_idempotent(s in "[ a-c\t\r\n]{0,30}") {
            let once = collapse_whitespace(&s);
            prop_assert_eq!(collapse_whitespace(&once), once.clone());
            prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
        }
    }
}
