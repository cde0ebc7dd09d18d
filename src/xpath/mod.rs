//! XPath Support for XML Schema
//!
//! XPath is used in XSD 1.0 only by identity constraints (`xs:selector`,
//! `xs:field`). This module parses the restricted XPath subset those
//! elements allow; evaluation belongs to the instance validator.

mod parsers;

pub use parsers::{
    IdentityXPathParser, NodeTest, ParsedPath, ParsedStep, ParsedXPath, XPathAxis,
    XPathParseError,
};
