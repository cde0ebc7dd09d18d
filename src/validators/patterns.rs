//! XSD regular expressions
//!
//! Translation of the XML Schema regex dialect into `regex` crate syntax.
//! XSD patterns are implicitly anchored, treat `^` and `$` as ordinary
//! characters, add the `\i`/`\c` name escapes, use `-[...]` for class
//! subtraction and `\p{IsBlock}` for Unicode blocks.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::fmt;

const NAME_START_CLASS: &str = r":A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}\u{200C}-\u{200D}\u{2070}-\u{218F}\u{2C00}-\u{2FEF}\u{3001}-\u{D7FF}\u{F900}-\u{FDCF}\u{FDF0}-\u{FFFD}\u{10000}-\u{EFFFF}";

const NAME_EXTRA_CLASS: &str = r"\-.0-9\u{B7}\u{300}-\u{36F}\u{203F}-\u{2040}";

/// Unicode blocks accepted in `\p{Is...}` escapes
const BLOCKS: &[(&str, &str)] = &[
    ("BasicLatin", r"\u{0}-\u{7F}"),
    ("Latin-1Supplement", r"\u{80}-\u{FF}"),
    ("LatinExtended-A", r"\u{100}-\u{17F}"),
    ("LatinExtended-B", r"\u{180}-\u{24F}"),
    ("IPAExtensions", r"\u{250}-\u{2AF}"),
    ("SpacingModifierLetters", r"\u{2B0}-\u{2FF}"),
    ("CombiningDiacriticalMarks", r"\u{300}-\u{36F}"),
    ("Greek", r"\u{370}-\u{3FF}"),
    ("Cyrillic", r"\u{400}-\u{4FF}"),
    ("Armenian", r"\u{530}-\u{58F}"),
    ("Hebrew", r"\u{590}-\u{5FF}"),
    ("Arabic", r"\u{600}-\u{6FF}"),
    ("Devanagari", r"\u{900}-\u{97F}"),
    ("Thai", r"\u{E00}-\u{E7F}"),
    ("LatinExtendedAdditional", r"\u{1E00}-\u{1EFF}"),
    ("GreekExtended", r"\u{1F00}-\u{1FFF}"),
    ("GeneralPunctuation", r"\u{2000}-\u{206F}"),
    ("SuperscriptsandSubscripts", r"\u{2070}-\u{209F}"),
    ("CurrencySymbols", r"\u{20A0}-\u{20CF}"),
    ("LetterlikeSymbols", r"\u{2100}-\u{214F}"),
    ("NumberForms", r"\u{2150}-\u{218F}"),
    ("Arrows", r"\u{2190}-\u{21FF}"),
    ("MathematicalOperators", r"\u{2200}-\u{22FF}"),
    ("BoxDrawing", r"\u{2500}-\u{257F}"),
    ("GeometricShapes", r"\u{25A0}-\u{25FF}"),
    ("MiscellaneousSymbols", r"\u{2600}-\u{26FF}"),
    ("CJKSymbolsandPunctuation", r"\u{3000}-\u{303F}"),
    ("Hiragana", r"\u{3040}-\u{309F}"),
    ("Katakana", r"\u{30A0}-\u{30FF}"),
    ("CJKUnifiedIdeographs", r"\u{4E00}-\u{9FFF}"),
    ("HangulSyllables", r"\u{AC00}-\u{D7A3}"),
    ("PrivateUse", r"\u{E000}-\u{F8FF}"),
    ("AlphabeticPresentationForms", r"\u{FB00}-\u{FB4F}"),
    ("HalfwidthandFullwidthForms", r"\u{FF00}-\u{FFEF}"),
    ("Specials", r"\u{FFF0}-\u{FFFF}"),
];

fn block_range(name: &str) -> Option<&'static str> {
    BLOCKS.iter().find(|(n, _)| *n == name).map(|(_, r)| *r)
}

/// Translate one XSD regular expression to `regex` syntax, unanchored
pub fn translate_pattern(xsd: &str) -> Result<String, String> {
    let chars: Vec<char> = xsd.chars().collect();
    let mut out = String::with_capacity(xsd.len() + 8);
    let mut class_depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                let next = *chars
                    .get(i + 1)
                    .ok_or_else(|| format!("pattern '{}' ends with a bare backslash", xsd))?;
                i += 1;
                match next {
                    'i' => out.push_str(&format!("[{}]", NAME_START_CLASS)),
                    'I' => out.push_str(&format!("[^{}]", NAME_START_CLASS)),
                    'c' => out.push_str(&format!("[{}{}]", NAME_START_CLASS, NAME_EXTRA_CLASS)),
                    'C' => out.push_str(&format!("[^{}{}]", NAME_START_CLASS, NAME_EXTRA_CLASS)),
                    's' => out.push_str(r"[ \t\n\r]"),
                    'S' => out.push_str(r"[^ \t\n\r]"),
                    'd' => out.push_str(r"\p{Nd}"),
                    'D' => out.push_str(r"\P{Nd}"),
                    'w' => out.push_str(r"[^\p{P}\p{Z}\p{C}]"),
                    'W' => out.push_str(r"[\p{P}\p{Z}\p{C}]"),
                    'p' | 'P' => {
                        if chars.get(i + 1) != Some(&'{') {
                            return Err(format!("malformed \\{} escape in '{}'", next, xsd));
                        }
                        let close = chars[i + 1..]
                            .iter()
                            .position(|&ch| ch == '}')
                            .ok_or_else(|| format!("unterminated \\{} escape in '{}'", next, xsd))?;
                        let name: String = chars[i + 2..i + 1 + close].iter().collect();
                        i += 1 + close;
                        if let Some(block) = name.strip_prefix("Is") {
                            let range = block_range(block)
                                .ok_or_else(|| format!("unsupported Unicode block '{}'", block))?;
                            if next == 'p' {
                                out.push_str(&format!("[{}]", range));
                            } else {
                                out.push_str(&format!("[^{}]", range));
                            }
                        } else {
                            out.push('\\');
                            out.push(next);
                            out.push('{');
                            out.push_str(&name);
                            out.push('}');
                        }
                    }
                    'n' | 'r' | 't' | '\\' | '|' | '.' | '-' | '^' | '?' | '*' | '+' | '{'
                    | '}' | '(' | ')' | '[' | ']' => {
                        out.push('\\');
                        out.push(next);
                    }
                    other => return Err(format!("invalid escape '\\{}' in '{}'", other, xsd)),
                }
            }
            '[' => {
                class_depth += 1;
                out.push('[');
                if chars.get(i + 1) == Some(&'^') {
                    out.push('^');
                    i += 1;
                }
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(']');
            }
            '-' if class_depth > 0 && chars.get(i + 1) == Some(&'[') => {
                // class subtraction
                out.push_str("--");
            }
            '.' if class_depth == 0 => out.push_str(r"[^\n\r]"),
            '^' | '$' if class_depth == 0 => {
                out.push('\\');
                out.push(c);
            }
            '(' if class_depth == 0 => out.push_str("(?:"),
            '&' | '~' | '$' | '^' if class_depth > 0 => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
        i += 1;
    }

    if class_depth != 0 {
        return Err(format!("unbalanced character class in '{}'", xsd));
    }
    Ok(out)
}

/// Pattern facet value: the OR of sibling `pattern` values
///
/// Compiled on first use.
pub struct Pattern {
    branches: Vec<String>,
    compiled: OnceCell<Result<Regex, String>>,
}

impl Pattern {
    /// Create a pattern with one branch
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            branches: vec![source.into()],
            compiled: OnceCell::new(),
        }
    }

    /// Add an alternative branch
    pub fn push_branch(&mut self, source: impl Into<String>) {
        self.branches.push(source.into());
        self.compiled = OnceCell::new();
    }

    /// Source branches in document order
    pub fn branches(&self) -> &[String] {
        &self.branches
    }

    /// Compiled anchored regex
    pub fn regex(&self) -> Result<&Regex, String> {
        self.compiled
            .get_or_init(|| {
                let parts = self
                    .branches
                    .iter()
                    .map(|b| translate_pattern(b).map(|t| format!("(?:{})", t)))
                    .collect::<Result<Vec<_>, _>>()?;
                Regex::new(&format!("^(?:{})$", parts.join("|")))
                    .map_err(|e| format!("invalid pattern: {}", e))
            })
            .as_ref()
            .map_err(|e| e.clone())
    }

    /// Whether a normalised lexical value matches
    pub fn is_match(&self, value: &str) -> Result<bool, String> {
        self.regex().map(|re| re.is_match(value))
    }
}

impl Clone for Pattern {
    fn clone(&self) -> Self {
        Self {
            branches: self.branches.clone(),
            compiled: self.compiled.clone(),
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.branches == other.branches
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("branches", &self.branches)
            .field("compiled", &self.compiled.get().map(|r| r.is_ok()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, value: &str) -> bool {
        Pattern::new(pattern).is_match(value).unwrap()
    }

    #[test]
    fn test_implicit_anchoring() {
        assert!(matches("[0-9]{3}", "123"));
        assert!(!matches("[0-9]{3}", "1234"));
        assert!(!matches("a|b", "ab"));
    }

    #[test]
    fn test_caret_and_dollar_are_literal() {
        assert!(matches("^a$", "^a$"));
        assert!(!matches("^a$", "a"));
    }

    #[test]
    fn test_name_escapes() {
        assert!(matches(r"\i\c*", "_abc-1.x"));
        assert!(!matches(r"\i\c*", "1abc"));
    }

    #[test]
    fn test_class_subtraction() {
        assert!(matches("[a-z-[aeiou]]+", "bcd"));
        assert!(!matches("[a-z-[aeiou]]+", "bad"));
    }

    #[test]
    fn test_unicode_blocks_and_categories() {
        assert!(matches(r"\p{IsBasicLatin}+", "abc"));
        assert!(!matches(r"\p{IsBasicLatin}+", "\u{E9}"));
        assert!(matches(r"\p{Lu}\p{Ll}+", "Hello"));
        assert!(Pattern::new(r"\p{IsNoSuchBlock}").regex().is_err());
    }

    #[test]
    fn test_dot_excludes_line_breaks() {
        assert!(matches("a.c", "abc"));
        assert!(!matches("a.c", "a\rc"));
    }

    #[test]
    fn test_branches_are_ored() {
        let mut p = Pattern::new("[0-9]+");
        p.push_branch("[a-z]+");
        assert!(p.is_match("123").unwrap());
        assert!(p.is_match("abc").unwrap());
        assert!(!p.is_match("1a").unwrap());
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(translate_pattern("[abc").is_err());
        assert!(translate_pattern(r"\q").is_err());
        assert!(Pattern::new("(a").regex().is_err());
    }
}
