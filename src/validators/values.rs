//! Lexical validation and value spaces of the XSD 1.0 builtins
//!
//! Each builtin has a lexical validator turning a whitespace-normalised
//! literal into a [`Value`]. Values carry enough of their value space to
//! evaluate facets: numeric and calendar values are ordered, strings and
//! binaries have lengths, QNames are resolved against a namespace context.

use crate::names::{is_valid_name, is_valid_ncname, is_valid_nmtoken, is_valid_qname};
use crate::namespaces::{NamespaceContext, QName};
use base64::Engine;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Signature of a builtin lexical validator
pub type LexicalValidator = fn(&str, &NamespaceContext) -> Result<Value, String>;

/// Calendar value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalKind {
    /// xs:dateTime
    DateTime,
    /// xs:date
    Date,
    /// xs:time
    Time,
    /// xs:gYearMonth
    GYearMonth,
    /// xs:gYear
    GYear,
    /// xs:gMonthDay
    GMonthDay,
    /// xs:gDay
    GDay,
    /// xs:gMonth
    GMonth,
}

/// Calendar value placed on a timeline in seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Temporal {
    /// Kind of calendar value
    pub kind: TemporalKind,
    /// Seconds from the reference point, UTC-normalised when a timezone is present
    pub seconds: Decimal,
    /// Whether the literal carried a timezone
    pub timezone: bool,
}

/// Duration split into its two incommensurable parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationValue {
    /// Signed total months
    pub months: i64,
    /// Signed total seconds
    pub seconds: Decimal,
}

/// Value of an XSD simple type
#[derive(Debug, Clone)]
pub enum Value {
    /// String family value
    String(String),
    /// Boolean value
    Boolean(bool),
    /// Decimal and integer family value
    Decimal(Decimal),
    /// Float value
    Float(f64),
    /// Double value
    Double(f64),
    /// Duration value
    Duration(DurationValue),
    /// Date/time family value
    Temporal(Temporal),
    /// hexBinary or base64Binary octets
    Binary(Vec<u8>),
    /// anyURI value
    Uri(String),
    /// QName or NOTATION value
    QName(QName),
    /// List value
    List(Vec<Value>),
}

impl Value {
    /// Compare two values in their value space
    ///
    /// `None` when the values are of different spaces or incomparable
    /// (NaN, durations whose months and seconds disagree, calendar values
    /// with and without timezone within fourteen hours of each other).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) | (Value::Double(a), Value::Double(b)) => {
                a.partial_cmp(b)
            }
            (Value::Duration(a), Value::Duration(b)) => {
                let months = a.months.cmp(&b.months);
                let seconds = a.seconds.cmp(&b.seconds);
                match (months, seconds) {
                    (m, s) if m == s => Some(m),
                    (Ordering::Equal, s) => Some(s),
                    (m, Ordering::Equal) => Some(m),
                    _ => None,
                }
            }
            (Value::Temporal(a), Value::Temporal(b)) if a.kind == b.kind => {
                if a.timezone == b.timezone {
                    Some(a.seconds.cmp(&b.seconds))
                } else {
                    let margin = Decimal::from(14 * 3600);
                    if a.seconds + margin < b.seconds {
                        Some(Ordering::Less)
                    } else if a.seconds > b.seconds + margin {
                        Some(Ordering::Greater)
                    } else {
                        None
                    }
                }
            }
            _ => None,
        }
    }

    /// Equality in the value space, as used by enumeration facets
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) | (Value::Uri(a), Value::Uri(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Float(a), Value::Float(b)) | (Value::Double(a), Value::Double(b)) => {
                (a.is_nan() && b.is_nan()) || a == b
            }
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::QName(a), Value::QName(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Temporal(a), Value::Temporal(b)) => {
                a.kind == b.kind && a.timezone == b.timezone && a.seconds == b.seconds
            }
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_value(y))
            }
            _ => false,
        }
    }

    /// Length as measured by the length facets
    ///
    /// Characters for strings and URIs, octets for binaries, items for
    /// lists. QName and NOTATION values have no length.
    pub fn length(&self) -> Option<u64> {
        match self {
            Value::String(s) | Value::Uri(s) => Some(s.chars().count() as u64),
            Value::Binary(b) => Some(b.len() as u64),
            Value::List(items) => Some(items.len() as u64),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) | Value::Uri(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Float(v) | Value::Double(v) => {
                if v.is_nan() {
                    write!(f, "NaN")
                } else if *v == f64::INFINITY {
                    write!(f, "INF")
                } else if *v == f64::NEG_INFINITY {
                    write!(f, "-INF")
                } else {
                    write!(f, "{}", v)
                }
            }
            Value::Duration(d) => write!(f, "P{}M{}S", d.months, d.seconds),
            Value::Temporal(t) => write!(f, "{:?}@{}", t.kind, t.seconds),
            Value::Binary(b) => {
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            Value::QName(q) => write!(f, "{}", q),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(" "))
            }
        }
    }
}

// =============================================================================
// Lexical patterns
// =============================================================================

static DECIMAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)$").unwrap());

static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").unwrap());

static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?|INF|-INF|NaN)$")
        .unwrap()
});

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(-)?P(?:([0-9]+)Y)?(?:([0-9]+)M)?(?:([0-9]+)D)?(?:T(?:([0-9]+)H)?(?:([0-9]+)M)?(?:([0-9]+(?:\.[0-9]+)?)S)?)?$",
    )
    .unwrap()
});

static TIMEZONE: &str = r"(Z|[+-][0-9]{2}:[0-9]{2})?";

static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(-?[0-9]{{4,}})-([0-9]{{2}})-([0-9]{{2}})T([0-9]{{2}}):([0-9]{{2}}):([0-9]{{2}}(?:\.[0-9]+)?){}$",
        TIMEZONE
    ))
    .unwrap()
});

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(-?[0-9]{{4,}})-([0-9]{{2}})-([0-9]{{2}}){}$", TIMEZONE)).unwrap()
});

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^([0-9]{{2}}):([0-9]{{2}}):([0-9]{{2}}(?:\.[0-9]+)?){}$",
        TIMEZONE
    ))
    .unwrap()
});

static GYEAR_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(-?[0-9]{{4,}})-([0-9]{{2}}){}$", TIMEZONE)).unwrap()
});

static GYEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^(-?[0-9]{{4,}}){}$", TIMEZONE)).unwrap());

static GMONTH_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^--([0-9]{{2}})-([0-9]{{2}}){}$", TIMEZONE)).unwrap()
});

static GDAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^---([0-9]{{2}}){}$", TIMEZONE)).unwrap());

static GMONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^--([0-9]{{2}}){}$", TIMEZONE)).unwrap());

static LANGUAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]{1,8}(?:-[a-zA-Z0-9]{1,8})*$").unwrap());

// =============================================================================
// String family
// =============================================================================

fn check_chars(value: &str) -> Result<(), String> {
    match value.chars().find(|&c| {
        !matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
    }) {
        Some(c) => Err(format!("character U+{:04X} is not allowed in XML", c as u32)),
        None => Ok(()),
    }
}

/// xs:string and xs:anySimpleType
pub fn validate_string(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    check_chars(value)?;
    Ok(Value::String(value.to_string()))
}

/// xs:normalizedString
pub fn validate_normalized_string(value: &str, ns: &NamespaceContext) -> Result<Value, String> {
    if value.contains(['\t', '\n', '\r']) {
        return Err(format!("'{}' contains tab, carriage return or line feed", value));
    }
    validate_string(value, ns)
}

/// xs:token
pub fn validate_token(value: &str, ns: &NamespaceContext) -> Result<Value, String> {
    if value.starts_with(' ') || value.ends_with(' ') || value.contains("  ") {
        return Err(format!("'{}' is not a collapsed token", value));
    }
    validate_normalized_string(value, ns)
}

/// xs:language
pub fn validate_language(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    if LANGUAGE_RE.is_match(value) {
        Ok(Value::String(value.to_string()))
    } else {
        Err(format!("'{}' is not a valid language tag", value))
    }
}

/// xs:Name
pub fn validate_name(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    if is_valid_name(value) {
        Ok(Value::String(value.to_string()))
    } else {
        Err(format!("'{}' is not a valid Name", value))
    }
}

/// xs:NCName, xs:ID, xs:IDREF, xs:ENTITY
pub fn validate_ncname(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    if is_valid_ncname(value) {
        Ok(Value::String(value.to_string()))
    } else {
        Err(format!("'{}' is not a valid NCName", value))
    }
}

/// xs:NMTOKEN
pub fn validate_nmtoken(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    if is_valid_nmtoken(value) {
        Ok(Value::String(value.to_string()))
    } else {
        Err(format!("'{}' is not a valid NMTOKEN", value))
    }
}

// =============================================================================
// Boolean and numeric family
// =============================================================================

/// xs:boolean
pub fn validate_boolean(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    match value {
        "true" | "1" => Ok(Value::Boolean(true)),
        "false" | "0" => Ok(Value::Boolean(false)),
        _ => Err(format!("'{}' is not a valid boolean", value)),
    }
}

fn parse_decimal(value: &str) -> Result<Decimal, String> {
    let unsigned = value.trim_start_matches(['+', '-']);
    let negative = value.starts_with('-');
    let mut text = String::with_capacity(unsigned.len() + 2);
    if negative {
        text.push('-');
    }
    if unsigned.starts_with('.') {
        text.push('0');
    }
    text.push_str(unsigned.trim_end_matches('.'));
    Decimal::from_str(&text).map_err(|_| format!("'{}' exceeds the supported decimal precision", value))
}

/// xs:decimal
pub fn validate_decimal(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    if !DECIMAL_RE.is_match(value) {
        return Err(format!("'{}' is not a valid decimal", value));
    }
    parse_decimal(value).map(Value::Decimal)
}

fn integer_in_range(value: &str, min: Option<Decimal>, max: Option<Decimal>, type_name: &str) -> Result<Value, String> {
    if !INTEGER_RE.is_match(value) {
        return Err(format!("'{}' is not a valid {}", value, type_name));
    }
    let number = parse_decimal(value)?;
    if min.map_or(false, |m| number < m) || max.map_or(false, |m| number > m) {
        return Err(format!("'{}' is out of range for {}", value, type_name));
    }
    Ok(Value::Decimal(number))
}

/// xs:integer
pub fn validate_integer(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    integer_in_range(value, None, None, "integer")
}

/// xs:nonPositiveInteger
pub fn validate_non_positive_integer(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    integer_in_range(value, None, Some(Decimal::ZERO), "nonPositiveInteger")
}

/// xs:negativeInteger
pub fn validate_negative_integer(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    integer_in_range(value, None, Some(Decimal::NEGATIVE_ONE), "negativeInteger")
}

/// xs:nonNegativeInteger
pub fn validate_non_negative_integer(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    integer_in_range(value, Some(Decimal::ZERO), None, "nonNegativeInteger")
}

/// xs:positiveInteger
pub fn validate_positive_integer(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    integer_in_range(value, Some(Decimal::ONE), None, "positiveInteger")
}

/// xs:long
pub fn validate_long(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    integer_in_range(value, Some(Decimal::from(i64::MIN)), Some(Decimal::from(i64::MAX)), "long")
}

/// xs:int
pub fn validate_int(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    integer_in_range(value, Some(Decimal::from(i32::MIN)), Some(Decimal::from(i32::MAX)), "int")
}

/// xs:short
pub fn validate_short(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    integer_in_range(value, Some(Decimal::from(i16::MIN)), Some(Decimal::from(i16::MAX)), "short")
}

/// xs:byte
pub fn validate_byte(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    integer_in_range(value, Some(Decimal::from(i8::MIN)), Some(Decimal::from(i8::MAX)), "byte")
}

/// xs:unsignedLong
pub fn validate_unsigned_long(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    integer_in_range(value, Some(Decimal::ZERO), Some(Decimal::from(u64::MAX)), "unsignedLong")
}

/// xs:unsignedInt
pub fn validate_unsigned_int(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    integer_in_range(value, Some(Decimal::ZERO), Some(Decimal::from(u32::MAX)), "unsignedInt")
}

/// xs:unsignedShort
pub fn validate_unsigned_short(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    integer_in_range(value, Some(Decimal::ZERO), Some(Decimal::from(u16::MAX)), "unsignedShort")
}

/// xs:unsignedByte
pub fn validate_unsigned_byte(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    integer_in_range(value, Some(Decimal::ZERO), Some(Decimal::from(u8::MAX)), "unsignedByte")
}

fn parse_float(value: &str, type_name: &str) -> Result<f64, String> {
    if !FLOAT_RE.is_match(value) {
        return Err(format!("'{}' is not a valid {}", value, type_name));
    }
    match value {
        "INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        _ => value
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a valid {}", value, type_name)),
    }
}

/// xs:float
pub fn validate_float(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    // value space of float is single precision
    parse_float(value, "float").map(|v| Value::Float(v as f32 as f64))
}

/// xs:double
pub fn validate_double(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    parse_float(value, "double").map(Value::Double)
}

// =============================================================================
// Duration and calendar family
// =============================================================================

/// xs:duration
pub fn validate_duration(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    let err = || format!("'{}' is not a valid duration", value);
    let caps = DURATION_RE.captures(value).ok_or_else(err)?;
    if value.ends_with('P') || value.ends_with('T') {
        return Err(err());
    }

    let int = |idx: usize| -> Result<i64, String> {
        caps.get(idx)
            .map_or(Ok(0), |m| m.as_str().parse::<i64>().map_err(|_| err()))
    };
    let years = int(2)?;
    let months = int(3)?;
    let days = int(4)?;
    let hours = int(5)?;
    let minutes = int(6)?;
    let seconds = match caps.get(7) {
        Some(m) => Decimal::from_str(m.as_str()).map_err(|_| err())?,
        None => Decimal::ZERO,
    };

    let total_months = years
        .checked_mul(12)
        .and_then(|y| y.checked_add(months))
        .ok_or_else(err)?;
    let total_seconds = Decimal::from(days) * Decimal::from(86400)
        + Decimal::from(hours) * Decimal::from(3600)
        + Decimal::from(minutes) * Decimal::from(60)
        + seconds;

    let sign = if caps.get(1).is_some() { -1 } else { 1 };
    Ok(Value::Duration(DurationValue {
        months: sign * total_months,
        seconds: if sign < 0 { -total_seconds } else { total_seconds },
    }))
}

fn parse_year(text: &str) -> Result<i32, String> {
    let digits = text.trim_start_matches('-');
    if digits.len() > 4 && digits.starts_with('0') {
        return Err(format!("year '{}' has leading zeros", text));
    }
    let year: i32 = text
        .parse()
        .map_err(|_| format!("year '{}' is out of the supported range", text))?;
    if year == 0 {
        return Err("year 0000 is not allowed".to_string());
    }
    Ok(year)
}

/// Days since the common era for an XSD year (no year zero)
fn days_from_ce(year: i32, month: u32, day: u32) -> Result<i64, String> {
    let chrono_year = if year < 0 { year + 1 } else { year };
    let date = NaiveDate::from_ymd_opt(chrono_year, month, day)
        .ok_or_else(|| format!("{:04}-{:02}-{:02} is not a valid date", year, month, day))?;
    Ok(date.num_days_from_ce() as i64)
}

fn parse_two(text: &str) -> Result<u32, String> {
    text.parse().map_err(|_| format!("'{}' is not a number", text))
}

/// Timezone offset in seconds, `None` when absent
fn parse_timezone(tz: Option<&str>) -> Result<Option<i64>, String> {
    match tz {
        None => Ok(None),
        Some("Z") => Ok(Some(0)),
        Some(text) => {
            let sign = if text.starts_with('-') { -1 } else { 1 };
            let hours = parse_two(&text[1..3])? as i64;
            let minutes = parse_two(&text[4..6])? as i64;
            if minutes > 59 || hours * 60 + minutes > 14 * 60 {
                return Err(format!("timezone '{}' is out of range", text));
            }
            Ok(Some(sign * (hours * 3600 + minutes * 60)))
        }
    }
}

fn time_seconds(hour: &str, minute: &str, second: &str) -> Result<Decimal, String> {
    let hour = parse_two(hour)?;
    let minute = parse_two(minute)?;
    let second = Decimal::from_str(second).map_err(|_| format!("'{}' is not valid seconds", second))?;
    if minute > 59 || second >= Decimal::from(60) {
        return Err("time component out of range".to_string());
    }
    if hour > 24 || (hour == 24 && (minute != 0 || !second.is_zero())) {
        return Err("hour out of range".to_string());
    }
    Ok(Decimal::from(hour * 3600 + minute * 60) + second)
}

fn temporal(kind: TemporalKind, days: i64, seconds: Decimal, tz: Option<i64>) -> Value {
    let mut total = Decimal::from(days) * Decimal::from(86400) + seconds;
    if let Some(offset) = tz {
        total -= Decimal::from(offset);
    }
    Value::Temporal(Temporal {
        kind,
        seconds: total,
        timezone: tz.is_some(),
    })
}

/// xs:dateTime
pub fn validate_date_time(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    let caps = DATETIME_RE
        .captures(value)
        .ok_or_else(|| format!("'{}' is not a valid dateTime", value))?;
    let year = parse_year(&caps[1])?;
    let days = days_from_ce(year, parse_two(&caps[2])?, parse_two(&caps[3])?)?;
    let seconds = time_seconds(&caps[4], &caps[5], &caps[6])?;
    let tz = parse_timezone(caps.get(7).map(|m| m.as_str()))?;
    Ok(temporal(TemporalKind::DateTime, days, seconds, tz))
}

/// xs:date
pub fn validate_date(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    let caps = DATE_RE
        .captures(value)
        .ok_or_else(|| format!("'{}' is not a valid date", value))?;
    let year = parse_year(&caps[1])?;
    let days = days_from_ce(year, parse_two(&caps[2])?, parse_two(&caps[3])?)?;
    let tz = parse_timezone(caps.get(4).map(|m| m.as_str()))?;
    Ok(temporal(TemporalKind::Date, days, Decimal::ZERO, tz))
}

/// xs:time
pub fn validate_time(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    let caps = TIME_RE
        .captures(value)
        .ok_or_else(|| format!("'{}' is not a valid time", value))?;
    let seconds = time_seconds(&caps[1], &caps[2], &caps[3])?;
    let tz = parse_timezone(caps.get(4).map(|m| m.as_str()))?;
    Ok(temporal(TemporalKind::Time, 0, seconds, tz))
}

/// xs:gYearMonth
pub fn validate_g_year_month(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    let caps = GYEAR_MONTH_RE
        .captures(value)
        .ok_or_else(|| format!("'{}' is not a valid gYearMonth", value))?;
    let year = parse_year(&caps[1])?;
    let days = days_from_ce(year, parse_two(&caps[2])?, 1)?;
    let tz = parse_timezone(caps.get(3).map(|m| m.as_str()))?;
    Ok(temporal(TemporalKind::GYearMonth, days, Decimal::ZERO, tz))
}

/// xs:gYear
pub fn validate_g_year(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    let caps = GYEAR_RE
        .captures(value)
        .ok_or_else(|| format!("'{}' is not a valid gYear", value))?;
    let year = parse_year(&caps[1])?;
    let days = days_from_ce(year, 1, 1)?;
    let tz = parse_timezone(caps.get(2).map(|m| m.as_str()))?;
    Ok(temporal(TemporalKind::GYear, days, Decimal::ZERO, tz))
}

/// xs:gMonthDay, checked against a leap year
pub fn validate_g_month_day(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    let caps = GMONTH_DAY_RE
        .captures(value)
        .ok_or_else(|| format!("'{}' is not a valid gMonthDay", value))?;
    let days = days_from_ce(2000, parse_two(&caps[1])?, parse_two(&caps[2])?)?;
    let tz = parse_timezone(caps.get(3).map(|m| m.as_str()))?;
    Ok(temporal(TemporalKind::GMonthDay, days, Decimal::ZERO, tz))
}

/// xs:gDay
pub fn validate_g_day(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    let caps = GDAY_RE
        .captures(value)
        .ok_or_else(|| format!("'{}' is not a valid gDay", value))?;
    let days = days_from_ce(2000, 1, parse_two(&caps[1])?)?;
    let tz = parse_timezone(caps.get(2).map(|m| m.as_str()))?;
    Ok(temporal(TemporalKind::GDay, days, Decimal::ZERO, tz))
}

/// xs:gMonth
pub fn validate_g_month(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    let caps = GMONTH_RE
        .captures(value)
        .ok_or_else(|| format!("'{}' is not a valid gMonth", value))?;
    let days = days_from_ce(2000, parse_two(&caps[1])?, 1)?;
    let tz = parse_timezone(caps.get(2).map(|m| m.as_str()))?;
    Ok(temporal(TemporalKind::GMonth, days, Decimal::ZERO, tz))
}

// =============================================================================
// Binary, URI and name-valued family
// =============================================================================

/// xs:hexBinary
pub fn validate_hex_binary(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    if value.len() % 2 != 0 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("'{}' is not a valid hexBinary", value));
    }
    let bytes = (0..value.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&value[i..i + 2], 16))
        .collect::<std::result::Result<Vec<u8>, _>>()
        .map_err(|_| format!("'{}' is not a valid hexBinary", value))?;
    Ok(Value::Binary(bytes))
}

/// xs:base64Binary
pub fn validate_base64_binary(value: &str, _ns: &NamespaceContext) -> Result<Value, String> {
    let compact: String = value.chars().filter(|c| *c != ' ').collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map(Value::Binary)
        .map_err(|_| format!("'{}' is not a valid base64Binary", value))
}

/// xs:anyURI
pub fn validate_any_uri(value: &str, ns: &NamespaceContext) -> Result<Value, String> {
    let bytes = value.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'%'
            && !(i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit())
        {
            return Err(format!("'{}' has a malformed percent escape", value));
        }
    }
    if value.matches('#').count() > 1 {
        return Err(format!("'{}' has more than one fragment separator", value));
    }
    validate_string(value, ns).map(|_| Value::Uri(value.to_string()))
}

/// xs:QName and xs:NOTATION, resolved against the namespace context
pub fn validate_qname(value: &str, ns: &NamespaceContext) -> Result<Value, String> {
    if !is_valid_qname(value) {
        return Err(format!("'{}' is not a valid QName", value));
    }
    ns.resolve(value)
        .map(Value::QName)
        .map_err(|d| d.message)
}

// =============================================================================
// Digits
// =============================================================================

/// Total and fraction digit counts of a decimal value
///
/// Trailing fraction zeros are insignificant; the total never falls below
/// the fraction digit count.
pub fn decimal_digits(value: &Decimal) -> (u32, u32) {
    let normalized = value.normalize();
    let fraction = normalized.scale();
    let mut mantissa = normalized.mantissa().unsigned_abs();
    let mut total = 0u32;
    while mantissa > 0 {
        total += 1;
        mantissa /= 10;
    }
    (total.max(fraction).max(1), fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> NamespaceContext {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("t", "urn:t");
        ctx
    }

    #[test]
    fn test_integer_ranges() {
        let ns = ctx();
        assert!(validate_byte("127", &ns).is_ok());
        assert!(validate_byte("128", &ns).is_err());
        assert!(validate_unsigned_long("18446744073709551615", &ns).is_ok());
        assert!(validate_positive_integer("0", &ns).is_err());
        assert!(validate_integer("1.0", &ns).is_err());
        assert!(validate_int("+42", &ns).is_ok());
    }

    #[test]
    fn test_decimal_forms() {
        let ns = ctx();
        for ok in ["1", "-1.5", ".5", "5.", "+0.0"] {
            assert!(validate_decimal(ok, &ns).is_ok(), "{}", ok);
        }
        for bad in ["", ".", "1e3", "1,5"] {
            assert!(validate_decimal(bad, &ns).is_err(), "{}", bad);
        }
        let a = validate_decimal("1.50", &ns).unwrap();
        let b = validate_decimal("1.5", &ns).unwrap();
        assert!(a.same_value(&b));
    }

    #[test]
    fn test_float_and_double() {
        let ns = ctx();
        assert!(validate_double("1e10", &ns).is_ok());
        assert!(validate_float("INF", &ns).is_ok());
        assert!(validate_float("+INF", &ns).is_err());
        let nan = validate_double("NaN", &ns).unwrap();
        assert!(nan.same_value(&nan));
        assert_eq!(nan.compare(&nan), None);
    }

    #[test]
    fn test_duration() {
        let ns = ctx();
        assert!(validate_duration("P1Y2M3DT4H5M6.5S", &ns).is_ok());
        assert!(validate_duration("-PT1S", &ns).is_ok());
        assert!(validate_duration("P", &ns).is_err());
        assert!(validate_duration("P1YT", &ns).is_err());

        let month = validate_duration("P1M", &ns).unwrap();
        let days = validate_duration("P30D", &ns).unwrap();
        assert_eq!(month.compare(&days), None);
        let year = validate_duration("P1Y", &ns).unwrap();
        assert_eq!(year.compare(&month), Some(Ordering::Greater));
    }

    #[test]
    fn test_calendar_validity() {
        let ns = ctx();
        assert!(validate_date("2000-02-29", &ns).is_ok());
        assert!(validate_date("2001-02-29", &ns).is_err());
        assert!(validate_date("0000-01-01", &ns).is_err());
        assert!(validate_date_time("2000-01-01T24:00:00Z", &ns).is_ok());
        assert!(validate_date_time("2000-01-01T24:00:01", &ns).is_err());
        assert!(validate_time("12:00:00+15:00", &ns).is_err());
        assert!(validate_g_month_day("--02-29", &ns).is_ok());
        assert!(validate_g_day("---32", &ns).is_err());
        assert!(validate_g_month("--13", &ns).is_err());
        assert!(validate_g_year("-0001", &ns).is_ok());
    }

    #[test]
    fn test_calendar_ordering() {
        let ns = ctx();
        let a = validate_date_time("2000-01-01T12:00:00Z", &ns).unwrap();
        let b = validate_date_time("2000-01-01T13:00:00+01:00", &ns).unwrap();
        assert!(a.same_value(&b));
        let c = validate_date("2000-01-02", &ns).unwrap();
        let d = validate_date("2000-01-01", &ns).unwrap();
        assert_eq!(c.compare(&d), Some(Ordering::Greater));
    }

    #[test]
    fn test_binary() {
        let ns = ctx();
        assert_eq!(validate_hex_binary("0FB7", &ns).unwrap().length(), Some(2));
        assert!(validate_hex_binary("0FB", &ns).is_err());
        assert_eq!(validate_base64_binary("AQID", &ns).unwrap().length(), Some(3));
        assert!(validate_base64_binary("A", &ns).is_err());
    }

    #[test]
    fn test_names_and_qnames() {
        let ns = ctx();
        assert!(validate_ncname("a:b", &ns).is_err());
        assert!(validate_language("en-US", &ns).is_ok());
        assert!(validate_language("toolongtag", &ns).is_err());
        match validate_qname("t:x", &ns).unwrap() {
            Value::QName(q) => assert_eq!(q, QName::new("urn:t", "x")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(validate_qname("u:x", &ns).is_err());
        assert!(validate_token(" a", &ns).is_err());
    }

    #[test]
    fn test_any_uri() {
        let ns = ctx();
        assert!(validate_any_uri("http://example.com/a%20b#frag", &ns).is_ok());
        assert!(validate_any_uri("a%2", &ns).is_err());
    }

    #[test]
    fn test_decimal_digits() {
        let digits = |s: &str| decimal_digits(&Decimal::from_str(s).unwrap());
        assert_eq!(digits("123.450"), (5, 2));
        assert_eq!(digits("-0.001"), (3, 3));
        assert_eq!(digits("000"), (1, 0));
    }
}
