// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Value resolution and the comparison engine.
//!
//! Values are compared with loose, dynamic-language semantics:
//!
//! - equality coerces between numbers, numeric strings and booleans; arrays
//!   and objects compare structurally with each other and by their string
//!   form with primitives;
//! - ordering compares two strings lexicographically and everything else
//!   numerically; incomparable values are never ordered;
//! - containment works on the string form of both operands.

use crate::config::PositionConfig;
use crate::context::ContextLookup;
use crate::descriptor::{PropertySource, SourceKind};
use crate::ephemeris::Ephemeris;
use crate::error::Error;
use crate::resolve::{lookup, rule_date};
use chrono::{DateTime, Utc};
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, warn};

// ═══════════════════════════════════════════════════════════════════════════
// Truthiness
// ═══════════════════════════════════════════════════════════════════════════

const TRUE_WORDS: &[&str] = &["true", "yes", "on", "ok", "enable", "enabled", "1", "+"];
const FALSE_WORDS: &[&str] = &["false", "no", "off", "nok", "disable", "disabled", "0", "-"];

/// `true`-like words (`yes`, `on`, `enabled`, `1`, ...) or a positive number.
pub fn is_true(value: &Value) -> bool {
    let text = loose_string(value).trim().to_lowercase();
    TRUE_WORDS.contains(&text.as_str()) || number_of(value).is_some_and(|n| n > 0.0)
}

/// `false`-like words (`no`, `off`, `disabled`, `0`, ...) or a number `≤ 0`.
pub fn is_false(value: &Value) -> bool {
    let text = loose_string(value).trim().to_lowercase();
    FALSE_WORDS.contains(&text.as_str()) || number_of(value).is_some_and(|n| n <= 0.0)
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Loose coercions
// ═══════════════════════════════════════════════════════════════════════════

fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 1e21 => {
            if f == 0.0 {
                "0".to_string()
            } else {
                format!("{f:.0}")
            }
        }
        _ => n.to_string(),
    }
}

/// String form of a value: `null`, `true`, `5`, `a,b` for arrays.
pub(crate) fn loose_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::Null => String::new(),
                other => loose_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Numeric form; `NaN` when there is none.
fn loose_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => loose_number(&Value::String(loose_string(value))),
    }
}

fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Loose equality.
pub(crate) fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Bool(_), _) => loose_eq(&Value::from(loose_number(a)), b),
        (_, Value::Bool(_)) => loose_eq(a, &Value::from(loose_number(b))),
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            loose_number(a) == loose_number(b)
        }
        _ if is_primitive(a) != is_primitive(b) => {
            let (composite, primitive) = if is_primitive(a) { (b, a) } else { (a, b) };
            loose_eq(&Value::String(loose_string(composite)), primitive)
        }
        _ => a == b,
    }
}

/// Loose ordering; `None` for incomparable operands.
pub(crate) fn loose_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    let as_primitive = |v: &Value| match v {
        Value::Array(_) | Value::Object(_) => Value::String(loose_string(v)),
        other => other.clone(),
    };
    match (as_primitive(a), as_primitive(b)) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(&y)),
        (x, y) => loose_number(&x).partial_cmp(&loose_number(&y)),
    }
}

fn emptiness(value: &Value) -> Option<bool> {
    match value {
        Value::String(s) => Some(s.is_empty()),
        Value::Array(items) => Some(items.is_empty()),
        Value::Object(map) => Some(map.is_empty()),
        _ => None,
    }
}

fn parts(list: &Value) -> Vec<String> {
    loose_string(list)
        .split([',', ';', '|'])
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Operators
// ═══════════════════════════════════════════════════════════════════════════

/// Closed set of comparison operators.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// Exactly boolean `true`.
    IsTrue,
    /// Exactly boolean `false`.
    IsFalse,
    IsNull,
    IsNotNull,
    /// Zero-length string or array, or an object without keys.
    IsEmpty,
    IsNotEmpty,
    /// [`is_true`].
    TrueExpr,
    /// [`is_false`].
    FalseExpr,
    NotTrueExpr,
    NotFalseExpr,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Contains,
    /// Any `,`/`;`/`|`-separated part of B occurs in A.
    ContainsAny,
    /// Every part of B occurs in A.
    ContainsAll,
}

impl CompareOp {
    pub const fn tag(self) -> &'static str {
        match self {
            CompareOp::IsTrue => "true",
            CompareOp::IsFalse => "false",
            CompareOp::IsNull => "null",
            CompareOp::IsNotNull => "nnull",
            CompareOp::IsEmpty => "empty",
            CompareOp::IsNotEmpty => "nempty",
            CompareOp::TrueExpr => "true_expr",
            CompareOp::FalseExpr => "false_expr",
            CompareOp::NotTrueExpr => "ntrue_expr",
            CompareOp::NotFalseExpr => "nfalse_expr",
            CompareOp::Equal => "equal",
            CompareOp::NotEqual => "nequal",
            CompareOp::Less => "lt",
            CompareOp::LessOrEqual => "lte",
            CompareOp::Greater => "gt",
            CompareOp::GreaterOrEqual => "gte",
            CompareOp::Contains => "contain",
            CompareOp::ContainsAny => "containSome",
            CompareOp::ContainsAll => "containEvery",
        }
    }

    /// Whether the operator reads operand B.
    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            CompareOp::Equal
                | CompareOp::NotEqual
                | CompareOp::Less
                | CompareOp::LessOrEqual
                | CompareOp::Greater
                | CompareOp::GreaterOrEqual
                | CompareOp::Contains
                | CompareOp::ContainsAny
                | CompareOp::ContainsAll
        )
    }

    /// Apply to `a`; `b` is only evaluated by binary operators.
    pub fn evaluate<F>(self, a: &Value, b: F) -> bool
    where
        F: FnOnce() -> Value,
    {
        match self {
            CompareOp::IsTrue => *a == Value::Bool(true),
            CompareOp::IsFalse => *a == Value::Bool(false),
            CompareOp::IsNull => a.is_null(),
            CompareOp::IsNotNull => !a.is_null(),
            CompareOp::IsEmpty => emptiness(a) == Some(true),
            CompareOp::IsNotEmpty => emptiness(a) == Some(false),
            CompareOp::TrueExpr => is_true(a),
            CompareOp::FalseExpr => is_false(a),
            CompareOp::NotTrueExpr => !is_true(a),
            CompareOp::NotFalseExpr => !is_false(a),
            CompareOp::Equal => loose_eq(a, &b()),
            CompareOp::NotEqual => !loose_eq(a, &b()),
            CompareOp::Less => loose_cmp(a, &b()) == Some(Ordering::Less),
            CompareOp::LessOrEqual => {
                matches!(loose_cmp(a, &b()), Some(Ordering::Less | Ordering::Equal))
            }
            CompareOp::Greater => loose_cmp(a, &b()) == Some(Ordering::Greater),
            CompareOp::GreaterOrEqual => {
                matches!(loose_cmp(a, &b()), Some(Ordering::Greater | Ordering::Equal))
            }
            CompareOp::Contains => loose_string(a).contains(&loose_string(&b())),
            CompareOp::ContainsAny => {
                let text = loose_string(a);
                parts(&b()).iter().any(|p| text.contains(p.as_str()))
            }
            CompareOp::ContainsAll => {
                let text = loose_string(a);
                parts(&b()).iter().all(|p| text.contains(p.as_str()))
            }
        }
    }
}

impl FromStr for CompareOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "true" => CompareOp::IsTrue,
            "false" => CompareOp::IsFalse,
            "null" => CompareOp::IsNull,
            "nnull" | "not-null" => CompareOp::IsNotNull,
            "empty" => CompareOp::IsEmpty,
            "nempty" | "not-empty" => CompareOp::IsNotEmpty,
            "true_expr" | "truthy-expression" => CompareOp::TrueExpr,
            "false_expr" | "falsy-expression" => CompareOp::FalseExpr,
            "ntrue_expr" | "not-truthy-expression" => CompareOp::NotTrueExpr,
            "nfalse_expr" | "not-falsy-expression" => CompareOp::NotFalseExpr,
            "equal" => CompareOp::Equal,
            "nequal" | "not-equal" => CompareOp::NotEqual,
            "lt" => CompareOp::Less,
            "lte" => CompareOp::LessOrEqual,
            "gt" => CompareOp::Greater,
            "gte" => CompareOp::GreaterOrEqual,
            "contain" | "contains" => CompareOp::Contains,
            "containSome" | "contains-any" => CompareOp::ContainsAny,
            "containEvery" | "contains-all" => CompareOp::ContainsAll,
            other => return Err(Error::UnknownOperator(other.to_string())),
        })
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Resolution
// ═══════════════════════════════════════════════════════════════════════════

impl<E: Ephemeris> PositionConfig<E> {
    /// Resolve `source` to a value without any date coercion.
    ///
    /// `dayOfMonth` sources yield whether today is the configured day.
    /// Failed or empty lookups are logged and yield `None`.
    pub fn resolve_value(
        &self,
        source: &PropertySource,
        ctx: &dyn ContextLookup,
        now: DateTime<Utc>,
    ) -> Option<Value> {
        let kind = &source.kind;
        let value = match kind {
            SourceKind::None => return None,
            SourceKind::DayOfMonth => {
                let today = now.date_naive();
                let matches = rule_date(&source.value, now).map(|d| d.date_naive()) == Some(today);
                Some(Value::Bool(matches))
            }
            _ => lookup(ctx, kind, &source.value).unwrap_or_else(|err| {
                debug!(%err, "value lookup failed");
                None
            }),
        };
        if value.is_none() {
            warn!(kind = %kind, value = %source.value, "property could not be evaluated");
        }
        value
    }

    /// Compare two sources with the operator tag `op`.
    ///
    /// A `none` operand A is always `false`. An unknown operator is logged
    /// and treated as [`CompareOp::TrueExpr`].
    pub fn compare(
        &self,
        a: &PropertySource,
        op: &str,
        b: &PropertySource,
        ctx: &dyn ContextLookup,
        now: DateTime<Utc>,
    ) -> bool {
        let op = op.parse::<CompareOp>().unwrap_or_else(|err| {
            error!(%err, "falling back to a truthy test");
            CompareOp::TrueExpr
        });
        self.compare_with(a, op, b, ctx, now)
    }

    /// [`compare`](Self::compare) with a parsed operator.
    pub fn compare_with(
        &self,
        a: &PropertySource,
        op: CompareOp,
        b: &PropertySource,
        ctx: &dyn ContextLookup,
        now: DateTime<Utc>,
    ) -> bool {
        if a.kind.is_none() {
            return false;
        }
        let left = self.resolve_value(a, ctx, now).unwrap_or(Value::Null);
        op.evaluate(&left, || {
            self.resolve_value(b, ctx, now).unwrap_or(Value::Null)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{JsonContext, NoContext};
    use crate::testing::{may15, stub_config};
    use serde_json::json;

    fn cmp(a: Value, op: &str, b: Value) -> bool {
        let c = stub_config();
        let ctx = JsonContext::new(json!({ "payload": a, "value": b }));
        c.compare(
            &PropertySource::new("msgPayload", ""),
            op,
            &PropertySource::new("msgValue", ""),
            &ctx,
            may15(10, 0),
        )
    }

    #[test]
    fn concrete_cases() {
        assert!(cmp(json!(""), "empty", Value::Null));
        assert!(cmp(json!([1, 2]), "nempty", Value::Null));
        assert!(cmp(json!(5), "lte", json!(5)));
        assert!(cmp(json!("abc"), "containSome", json!("x|b|z")));
    }

    #[test]
    fn unknown_operator_falls_back_to_truthiness() {
        assert!(cmp(json!("yes"), "frobnicate", Value::Null));
        assert!(!cmp(json!("no"), "frobnicate", Value::Null));
        assert_eq!(
            "frobnicate".parse::<CompareOp>(),
            Err(Error::UnknownOperator("frobnicate".into()))
        );
    }

    #[test]
    fn none_operand_is_false_without_evaluating_b() {
        let c = stub_config();
        let a = PropertySource::none();
        let b = PropertySource::new("jsonata", "$boom()");
        assert!(!c.compare(&a, "nnull", &b, &NoContext, may15(10, 0)));
        assert!(!c.compare(&a, "ntrue_expr", &b, &NoContext, may15(10, 0)));
    }

    #[test]
    fn exact_boolean_and_null_checks() {
        assert!(cmp(json!(true), "true", Value::Null));
        assert!(!cmp(json!("true"), "true", Value::Null));
        assert!(cmp(json!(false), "false", Value::Null));
        assert!(cmp(Value::Null, "null", Value::Null));
        assert!(cmp(json!(0), "nnull", Value::Null));
    }

    #[test]
    fn emptiness_only_for_sized_values() {
        assert!(cmp(json!({}), "empty", Value::Null));
        assert!(cmp(json!({ "a": 1 }), "nempty", Value::Null));
        assert!(!cmp(json!(0), "empty", Value::Null));
        assert!(!cmp(json!(0), "nempty", Value::Null));
    }

    #[test]
    fn loose_equality() {
        assert!(cmp(json!(5), "equal", json!("5")));
        assert!(cmp(json!("1"), "equal", json!(true)));
        assert!(cmp(json!(0), "equal", json!(false)));
        assert!(cmp(json!([1, 2]), "equal", json!("1,2")));
        assert!(cmp(json!({ "a": [1] }), "equal", json!({ "a": [1] })));
        assert!(cmp(json!(1.0), "equal", json!(1)));
        assert!(!cmp(Value::Null, "equal", json!(0)));
        assert!(cmp(json!("a"), "nequal", json!("b")));
    }

    #[test]
    fn ordering() {
        assert!(cmp(json!(4), "lt", json!(5)));
        assert!(cmp(json!("10"), "gt", json!(9)));
        assert!(cmp(json!("b"), "gt", json!("a")));
        assert!(cmp(json!("10"), "lt", json!("9")), "strings compare as text");
        assert!(!cmp(json!("abc"), "lt", json!(5)));
        assert!(!cmp(json!("abc"), "gte", json!(5)));
    }

    #[test]
    fn containment() {
        assert!(cmp(json!("sunrise"), "contain", json!("rise")));
        assert!(cmp(json!(12345), "contain", json!(234)));
        assert!(cmp(json!("a,b,c"), "containEvery", json!("a;c")));
        assert!(!cmp(json!("abc"), "containEvery", json!("a|x")));
        assert!(!cmp(json!("abc"), "containSome", json!("x,y")));
    }

    #[test]
    fn truthiness_words() {
        for v in [json!("Yes"), json!("ON"), json!("enabled"), json!(1), json!("+"), json!(0.5)] {
            assert!(is_true(&v), "{v}");
        }
        for v in [json!("no"), json!("Off"), json!("nok"), json!(0), json!(-3), json!("-")] {
            assert!(is_false(&v), "{v}");
        }
        assert!(!is_true(&json!("maybe")));
        assert!(!is_false(&json!("maybe")));
        assert!(is_true(&json!(true)));
        assert!(is_false(&json!(false)));
    }

    #[test]
    fn string_forms() {
        assert_eq!(loose_string(&json!(5.0)), "5");
        assert_eq!(loose_string(&json!(-0.0)), "0");
        assert_eq!(loose_string(&json!(2.5)), "2.5");
        assert_eq!(loose_string(&json!([1, null, "x"])), "1,,x");
        assert_eq!(loose_string(&json!({ "a": 1 })), "[object Object]");
    }

    #[test]
    fn day_of_month_values() {
        let c = stub_config();
        // 2024-05-15 is the third Wednesday of May.
        let third = PropertySource::new("dayOfMonth", "third wednesday");
        assert_eq!(c.resolve_value(&third, &NoContext, may15(10, 0)), Some(json!(true)));
        let first = PropertySource::new("dayOfMonth", "fWed");
        assert_eq!(c.resolve_value(&first, &NoContext, may15(10, 0)), Some(json!(false)));
    }

    #[test]
    fn values_pass_through_unchanged() {
        let c = stub_config();
        let ctx = JsonContext::new(json!({ "payload": { "on": true } }));
        assert_eq!(
            c.resolve_value(&PropertySource::new("msgPayload", ""), &ctx, may15(10, 0)),
            Some(json!({ "on": true }))
        );
        assert_eq!(
            c.resolve_value(&PropertySource::new("num", "7"), &ctx, may15(10, 0)),
            Some(json!(7.0))
        );
        assert_eq!(
            c.resolve_value(&PropertySource::new("jsonata", "$x"), &ctx, may15(10, 0)),
            None
        );
        assert_eq!(c.resolve_value(&PropertySource::none(), &ctx, may15(10, 0)), None);
    }
}
