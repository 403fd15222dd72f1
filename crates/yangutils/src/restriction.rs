// Copyright (C) 2025-present The NetGauze Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Restriction predicates used to validate leaf values.
//!
//! Numeric literals are parsed the same way for schema bounds and for user
//! values: decimal, `0x` hexadecimal and leading zero octal, with an optional
//! sign. Integers are kept as `i128` so the full `int64`/`uint64` ranges are
//! exact.

use crate::{
    linker::LinkedSchema,
    path::split_qualified,
    tree::{NodeId, NodeKind},
};
use regex::Regex;
use std::{cmp::Ordering, fmt, sync::Arc};
use tracing::{debug, warn};

#[derive(Debug, Clone, thiserror::Error)]
pub enum RestrictionError {
    #[error("`{0}` is not a valid numeric literal")]
    InvalidNumber(String),

    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A parsed numeric literal
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Integer(i128),
    Decimal(f64),
}

impl Number {
    fn as_f64(&self) -> f64 {
        match self {
            Self::Integer(v) => *v as f64,
            Self::Decimal(v) => *v,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
        }
    }
}

/// Parse a numeric literal.
///
/// `0x1F` is hexadecimal, `017` is octal (a lone `0` is zero), anything else
/// made of digits is decimal. Literals with a fraction or an exponent are
/// parsed as [`Number::Decimal`].
pub fn parse_number(literal: &str) -> Option<Number> {
    let literal = literal.trim();
    let (negative, body) = match literal.as_bytes().first() {
        Some(b'-') => (true, &literal[1..]),
        Some(b'+') => (false, &literal[1..]),
        _ => (false, literal),
    };
    if body.is_empty() {
        return None;
    }
    let all_digits = body.bytes().all(|b| b.is_ascii_digit());
    let integer = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        i128::from_str_radix(hex, 16).ok()
    } else if all_digits && body.len() > 1 && body.starts_with('0') {
        // invalid octal digits (`08`) are rejected rather than read as decimal
        return i128::from_str_radix(&body[1..], 8)
            .ok()
            .map(|v| Number::Integer(if negative { -v } else { v }));
    } else if all_digits {
        body.parse::<i128>().ok()
    } else {
        None
    };
    if let Some(value) = integer {
        return Some(Number::Integer(if negative { -value } else { value }));
    }
    let decimal_chars = body
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !decimal_chars || !body.bytes().any(|b| matches!(b, b'.' | b'e' | b'E')) {
        return None;
    }
    body.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| Number::Decimal(if negative { -v } else { v }))
}

fn parse_bound(literal: &str) -> Result<Number, RestrictionError> {
    parse_number(literal).ok_or_else(|| RestrictionError::InvalidNumber(literal.to_string()))
}

type CheckFn = dyn Fn(&str) -> bool + Send + Sync;

/// Predicate over a candidate leaf value with a human readable message
/// describing what is expected
#[derive(Clone)]
pub struct Restriction {
    check: Arc<CheckFn>,
    info: String,
}

impl fmt::Debug for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Restriction")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl Restriction {
    pub fn new<F>(info: impl Into<String>, check: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(check),
            info: info.into(),
        }
    }

    pub fn check(&self, value: &str) -> bool {
        (self.check)(value)
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    /// Satisfied when at least one alternative is satisfied
    pub fn any(alternatives: Vec<Restriction>) -> Self {
        let info = alternatives
            .iter()
            .map(|x| x.info.as_str())
            .collect::<Vec<_>>()
            .join(" or ");
        Self::new(info, move |value| alternatives.iter().any(|x| x.check(value)))
    }

    /// Satisfied when every restriction is satisfied
    pub fn all(restrictions: Vec<Restriction>) -> Self {
        let info = restrictions
            .iter()
            .map(|x| x.info.as_str())
            .collect::<Vec<_>>()
            .join(" and ");
        Self::new(info, move |value| restrictions.iter().all(|x| x.check(value)))
    }
}

fn within(min: Option<Number>, max: Option<Number>, value: Number) -> bool {
    min.map_or(true, |min| min <= value) && max.map_or(true, |max| value <= max)
}

fn min_max(min: Option<Number>, max: Option<Number>, info: String) -> Restriction {
    Restriction::new(info, move |value| {
        parse_number(value).is_some_and(|number| within(min, max, number))
    })
}

/// Value must be a number within `min..=max`
pub fn get_min_max_fnc(min: &str, max: &str) -> Result<Restriction, RestrictionError> {
    let info = format!("value must be in range {min}..{max}");
    Ok(min_max(Some(parse_bound(min)?), Some(parse_bound(max)?), info))
}

/// Value must be numerically equal to `target`
pub fn get_equals_fnc(target: &str) -> Result<Restriction, RestrictionError> {
    let expected = parse_bound(target)?;
    Ok(Restriction::new(
        format!("value must be equal to {target}"),
        move |value| parse_number(value).is_some_and(|number| number == expected),
    ))
}

/// Value must match the schema `pattern`, used verbatim
pub fn get_regexp_validation_fnc(pattern: &str) -> Result<Restriction, RestrictionError> {
    let regex = Regex::new(pattern).map_err(|source| RestrictionError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    Ok(Restriction::new(
        format!("value must match pattern {pattern}"),
        move |value| regex.is_match(value),
    ))
}

/// Value must be one of `values`
pub fn is_in_array(values: Vec<String>) -> Restriction {
    let info = format!("value must be one of: {}", values.join(", "));
    Restriction::new(info, move |value| values.iter().any(|x| x == value))
}

pub fn get_is_number_fnc() -> Restriction {
    Restriction::new("value must be an integer", |value| {
        matches!(parse_number(value), Some(Number::Integer(_)))
    })
}

pub fn get_is_unumber_fnc() -> Restriction {
    Restriction::new("value must be a non-negative integer", |value| {
        matches!(parse_number(value), Some(Number::Integer(v)) if v >= 0)
    })
}

pub fn get_is_decimal_fnc() -> Restriction {
    Restriction::new("value must be a decimal number", |value| {
        parse_number(value).is_some()
    })
}

/// Number of characters must be within `min..=max`
fn length_fnc(min: Option<Number>, max: Option<Number>, expr: &str) -> Restriction {
    Restriction::new(format!("length must be in {expr}"), move |value| {
        within(min, max, Number::Integer(value.chars().count() as i128))
    })
}

pub const BUILTIN_TYPES: &[&str] = &[
    "int8",
    "int16",
    "int32",
    "int64",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "decimal64",
    "string",
    "boolean",
    "enumeration",
    "bits",
    "binary",
    "leafref",
    "identityref",
    "empty",
    "union",
    "instance-identifier",
];

pub fn is_builtin_type(name: &str) -> bool {
    BUILTIN_TYPES.contains(&name)
}

/// Value bounds of the integer built-in types
pub fn integer_type_bounds(name: &str) -> Option<(i128, i128)> {
    let bounds = match name {
        "int8" => (i8::MIN as i128, i8::MAX as i128),
        "int16" => (i16::MIN as i128, i16::MAX as i128),
        "int32" => (i32::MIN as i128, i32::MAX as i128),
        "int64" => (i64::MIN as i128, i64::MAX as i128),
        "uint8" => (0, u8::MAX as i128),
        "uint16" => (0, u16::MAX as i128),
        "uint32" => (0, u32::MAX as i128),
        "uint64" => (0, u64::MAX as i128),
        _ => return None,
    };
    Some(bounds)
}

/// Parse one side of a `range`/`length` part, `min` and `max` map to the
/// type defaults.
fn range_bound(
    literal: &str,
    default_min: Option<Number>,
    default_max: Option<Number>,
) -> Result<Option<Number>, RestrictionError> {
    match literal.trim() {
        "min" => Ok(default_min),
        "max" => Ok(default_max),
        other => parse_bound(other).map(Some),
    }
}

/// Compile a `range` or `length` expression such as `1..10 | 20 | 30..max`
fn compile_ranges(
    expr: &str,
    default_min: Option<Number>,
    default_max: Option<Number>,
    length: bool,
) -> Result<Restriction, RestrictionError> {
    let mut alternatives = vec![];
    for part in expr.split('|').map(str::trim).filter(|x| !x.is_empty()) {
        let restriction = match part.split_once("..") {
            Some((low, high)) => {
                let low = range_bound(low, default_min, default_max)?;
                let high = range_bound(high, default_min, default_max)?;
                if length {
                    length_fnc(low, high, part)
                } else {
                    min_max(low, high, format!("value must be in range {part}"))
                }
            }
            None => {
                let exact = range_bound(part, default_min, default_max)?;
                if length {
                    length_fnc(exact, exact, part)
                } else {
                    match exact {
                        Some(exact) => min_max(
                            Some(exact),
                            Some(exact),
                            format!("value must be equal to {part}"),
                        ),
                        None => min_max(None, None, format!("value must be {part}")),
                    }
                }
            }
        };
        alternatives.push(restriction);
    }
    Ok(Restriction::any(alternatives))
}

/// All checks a resolved `type` statement imposes on a leaf value
#[derive(Debug, Clone)]
pub struct TypeRestrictions {
    type_name: String,
    checks: Vec<Restriction>,
}

impl TypeRestrictions {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.checks
    }

    /// Check `value`, returning the message of every failing restriction
    pub fn check(&self, value: &str) -> Result<(), Vec<String>> {
        let failures = self
            .checks
            .iter()
            .filter(|x| !x.check(value))
            .map(|x| x.info().to_string())
            .collect::<Vec<_>>();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    fn as_restriction(&self) -> Restriction {
        Restriction::all(self.checks.clone())
    }

    /// Compile the restrictions of a linked `type` node.
    ///
    /// Invalid restriction statements are skipped with a warning, a value is
    /// never rejected because the schema itself is broken.
    pub fn compile(schema: &LinkedSchema, type_node: NodeId) -> Self {
        let arena = schema.arena();
        let node = &arena[type_node];
        let (_, type_name) = split_qualified(node.label());
        let type_name = type_name.to_string();
        let mut checks = vec![];

        let children_of = |kind: NodeKind| arena.children_of_kind(type_node, kind);
        let labels_of = |kind: NodeKind| {
            children_of(kind)
                .map(|x| arena[x].label().to_string())
                .collect::<Vec<_>>()
        };

        let (default_min, default_max) = match integer_type_bounds(&type_name) {
            Some((min, max)) => (Some(Number::Integer(min)), Some(Number::Integer(max))),
            None => (None, None),
        };

        match type_name.as_str() {
            name if integer_type_bounds(name).is_some() => {
                if name.starts_with('u') {
                    checks.push(get_is_unumber_fnc());
                } else {
                    checks.push(get_is_number_fnc());
                }
                checks.push(min_max(
                    default_min,
                    default_max,
                    format!("value must fit in {name}"),
                ));
            }
            "decimal64" => checks.push(get_is_decimal_fnc()),
            "boolean" => checks.push(is_in_array(vec!["true".to_string(), "false".to_string()])),
            "enumeration" => checks.push(is_in_array(labels_of(NodeKind::Enum))),
            "bits" => {
                let bits = labels_of(NodeKind::Bit);
                let info = format!("value must be a set of: {}", bits.join(", "));
                checks.push(Restriction::new(info, move |value| {
                    value.split_whitespace().all(|x| bits.iter().any(|b| b == x))
                }));
            }
            "union" => {
                let members = children_of(NodeKind::Type)
                    .map(|x| TypeRestrictions::compile(schema, x).as_restriction())
                    .collect::<Vec<_>>();
                if !members.is_empty() {
                    checks.push(Restriction::any(members));
                }
            }
            "identityref" => {
                let allowed = children_of(NodeKind::Base)
                    .flat_map(|base| {
                        schema
                            .derived_from_base(base)
                            .into_iter()
                            .map(|x| arena[x].label().to_string())
                    })
                    .collect::<Vec<_>>();
                if allowed.is_empty() {
                    debug!(node = %type_node, "no derived identities known for identityref");
                } else {
                    let allowed_info = allowed.clone();
                    checks.push(Restriction::new(
                        format!("value must be one of: {}", allowed_info.join(", ")),
                        move |value| {
                            let (_, name) = split_qualified(value);
                            allowed.iter().any(|x| x == name)
                        },
                    ));
                }
            }
            "string" | "binary" | "leafref" | "empty" | "instance-identifier" => {}
            other => {
                debug!(type_name = other, "no built-in checks for unresolved type");
            }
        }

        for range in children_of(NodeKind::Range) {
            match compile_ranges(arena[range].label(), default_min, default_max, false) {
                Ok(restriction) => checks.push(restriction),
                Err(err) => warn!(range = arena[range].label(), error = %err, "skipping invalid range restriction"),
            }
        }
        for length in children_of(NodeKind::Length) {
            match compile_ranges(
                arena[length].label(),
                Some(Number::Integer(0)),
                Some(Number::Integer(u64::MAX as i128)),
                true,
            ) {
                Ok(restriction) => checks.push(restriction),
                Err(err) => warn!(length = arena[length].label(), error = %err, "skipping invalid length restriction"),
            }
        }
        for pattern in children_of(NodeKind::Pattern) {
            match get_regexp_validation_fnc(arena[pattern].label()) {
                Ok(restriction) => checks.push(restriction),
                Err(err) => warn!(error = %err, "skipping invalid pattern restriction"),
            }
        }

        Self { type_name, checks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("15", true)]
    #[case("10", true)]
    #[case("20", true)]
    #[case("5", false)]
    #[case("25", false)]
    #[case("abc", false)]
    #[case("", false)]
    fn test_min_max_decimal(#[case] value: &str, #[case] expected: bool) {
        let restriction = get_min_max_fnc("10", "20").unwrap();
        assert_eq!(restriction.check(value), expected);
    }

    #[rstest]
    #[case("0xFF", true)]
    #[case("0x100", false)]
    #[case("0377", true)]
    #[case("0400", false)]
    #[case("255", true)]
    #[case("-1", false)]
    #[case("08", false)]
    fn test_min_max_hex_and_octal(#[case] value: &str, #[case] expected: bool) {
        let restriction = get_min_max_fnc("0", "255").unwrap();
        assert_eq!(restriction.check(value), expected);
    }

    #[test]
    fn test_wide_bounds_are_exact() {
        let restriction = get_min_max_fnc("0", "18446744073709551615").unwrap();
        assert!(restriction.check("18446744073709551615"));
        assert!(!restriction.check("18446744073709551616"));
        let signed = get_min_max_fnc("-9223372036854775808", "9223372036854775807").unwrap();
        assert!(signed.check("-9223372036854775808"));
        assert!(!signed.check("-9223372036854775809"));
    }

    #[test]
    fn test_equals_uses_same_parsing() {
        let restriction = get_equals_fnc("0x10").unwrap();
        assert!(restriction.check("16"));
        assert!(restriction.check("020"));
        assert!(!restriction.check("10"));
        assert!(get_equals_fnc("ten").is_err());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("-0x10"), Some(Number::Integer(-16)));
        assert_eq!(parse_number("0"), Some(Number::Integer(0)));
        assert_eq!(parse_number("+7"), Some(Number::Integer(7)));
        assert_eq!(parse_number("1.5"), Some(Number::Decimal(1.5)));
        assert_eq!(parse_number("0x"), None);
        assert_eq!(parse_number("1e"), None);
        assert_eq!(parse_number("--1"), None);
    }

    #[test]
    fn test_pattern_not_anchored() {
        let restriction = get_regexp_validation_fnc("[a-z]+").unwrap();
        assert!(restriction.check("abc"));
        assert!(restriction.check("123abc"));
        let anchored = get_regexp_validation_fnc("^[a-z]+$").unwrap();
        assert!(!anchored.check("123abc"));
        assert!(get_regexp_validation_fnc("[a-").is_err());
    }

    #[test]
    fn test_in_array_and_kinds() {
        let restriction = is_in_array(vec!["firewall".to_string(), "dpi".to_string()]);
        assert!(restriction.check("dpi"));
        assert!(!restriction.check("DPI"));
        assert!(get_is_number_fnc().check("-5"));
        assert!(!get_is_unumber_fnc().check("-5"));
        assert!(get_is_decimal_fnc().check("2.25"));
        assert!(!get_is_decimal_fnc().check("x"));
    }

    #[test]
    fn test_compose_any_all() {
        let low = get_min_max_fnc("1", "10").unwrap();
        let high = get_min_max_fnc("20", "30").unwrap();
        let any = Restriction::any(vec![low.clone(), high.clone()]);
        assert!(any.check("5"));
        assert!(any.check("25"));
        assert!(!any.check("15"));
        let all = Restriction::all(vec![low, get_equals_fnc("5").unwrap()]);
        assert!(all.check("5"));
        assert!(!all.check("6"));
        assert_eq!(all.info(), "value must be in range 1..10 and value must be equal to 5");
    }

    #[test]
    fn test_compile_ranges() {
        let restriction = compile_ranges(
            "min..10 | 20 | 30..max",
            Some(Number::Integer(0)),
            Some(Number::Integer(255)),
            false,
        )
        .unwrap();
        assert!(restriction.check("0"));
        assert!(restriction.check("20"));
        assert!(restriction.check("255"));
        assert!(!restriction.check("15"));
        assert!(!restriction.check("256"));

        let length = compile_ranges("1..4", None, None, true).unwrap();
        assert!(length.check("abcd"));
        assert!(!length.check(""));
        assert!(!length.check("abcde"));
    }
}
