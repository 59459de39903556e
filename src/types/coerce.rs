//! Loose-typing rules shared by every operator.
//!
//! All functions here are total: a value that cannot be coerced yields `None`
//! (or `false` for predicates) and the calling operator degrades to `null`.

use std::cmp::Ordering;

use super::Value;

/// A coerced numeric operand. Integer arithmetic stays integral until it
/// overflows or meets a float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub(crate) fn into_value(self) -> Value {
        match self {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::from_f64_finite(f),
        }
    }

    fn combine(
        self,
        other: Number,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Number {
        if let (Number::Int(a), Number::Int(b)) = (self, other) {
            if let Some(v) = int_op(a, b) {
                return Number::Int(v);
            }
        }
        Number::Float(float_op(self.as_f64(), other.as_f64()))
    }

    pub(crate) fn add(self, other: Number) -> Number {
        self.combine(other, i64::checked_add, |a, b| a + b)
    }

    pub(crate) fn sub(self, other: Number) -> Number {
        self.combine(other, i64::checked_sub, |a, b| a - b)
    }

    pub(crate) fn mul(self, other: Number) -> Number {
        self.combine(other, i64::checked_mul, |a, b| a * b)
    }

    /// Truncating division. `None` for a zero divisor.
    pub(crate) fn div(self, other: Number) -> Option<Number> {
        if other.as_f64() == 0.0 {
            return None;
        }
        Some(self.combine(other, i64::checked_div, |a, b| a / b))
    }

    /// Truncating remainder (sign follows the dividend). `None` for a zero divisor.
    pub(crate) fn rem(self, other: Number) -> Option<Number> {
        if other.as_f64() == 0.0 {
            return None;
        }
        Some(self.combine(other, i64::checked_rem, |a, b| a % b))
    }

    /// Truncate toward zero, saturating at the `i64` bounds.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn as_i64(self) -> i64 {
        match self {
            Number::Int(i) => i,
            Number::Float(f) => f.trunc() as i64,
        }
    }

    pub(crate) fn neg(self) -> Number {
        match self {
            Number::Int(i) => i
                .checked_neg()
                .map_or_else(|| Number::Float(-self.as_f64()), Number::Int),
            Number::Float(f) => Number::Float(-f),
        }
    }

    pub(crate) fn cmp_numeric(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

/// Canonical truthiness: `null`, `false`, zero, NaN, `""` and `[]` are falsy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0 && !f.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::Int(i));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Number::Float)
}

/// Arithmetic coercion: numbers and numeric strings only.
pub(crate) fn to_number(value: &Value) -> Option<Number> {
    match value {
        Value::Int(i) => Some(Number::Int(*i)),
        Value::Float(f) => Some(Number::Float(*f)),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Relational coercion: like [`to_number`] but `null`, booleans, blank
/// strings and arrays convert too.
fn to_number_loose(value: &Value) -> Option<Number> {
    match value {
        Value::Null => Some(Number::Int(0)),
        Value::Bool(b) => Some(Number::Int(i64::from(*b))),
        Value::String(s) if s.trim().is_empty() => Some(Number::Int(0)),
        Value::Array(_) => to_number_loose(&Value::String(to_string_form(value))),
        Value::Object(_) => None,
        other => to_number(other),
    }
}

/// The string form of a value, as used by `cat` and `in`.
#[must_use]
pub fn to_string_form(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_string_form(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_owned(),
    }
}

/// Equality with identical type tags required. Numbers compare numerically,
/// containers structurally.
#[must_use]
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| strict_equals(p, q))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y)
                    .all(|((kx, vx), (ky, vy))| kx == ky && strict_equals(vx, vy))
        }
        _ => match (a.type_tag(), to_number(a), to_number(b)) {
            (tag, Some(x), Some(y)) if tag == b.type_tag() => {
                x.cmp_numeric(y) == Some(Ordering::Equal)
            }
            _ => false,
        },
    }
}

/// Equality after coercion to a common type.
#[must_use]
pub fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Bool(x), other) => loose_equals(&Value::Int(i64::from(*x)), other),
        (other, Value::Bool(y)) => loose_equals(other, &Value::Int(i64::from(*y))),
        (Value::String(x), Value::String(y)) => x == y,
        (
            Value::Array(_) | Value::Object(_),
            Value::Array(_) | Value::Object(_),
        ) => strict_equals(a, b),
        (Value::Object(_), _) | (_, Value::Object(_)) => false,
        (Value::Array(_), other) => loose_equals(&Value::String(to_string_form(a)), other),
        (other, Value::Array(_)) => loose_equals(other, &Value::String(to_string_form(b))),
        _ => match (to_number_loose(a), to_number_loose(b)) {
            (Some(x), Some(y)) => x.cmp_numeric(y) == Some(Ordering::Equal),
            _ => false,
        },
    }
}

/// Ordering for relational operators. Two strings compare lexicographically,
/// anything else numerically; `None` when the operands are incomparable.
#[must_use]
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        return Some(x.cmp(y));
    }
    to_number_loose(a)?.cmp_numeric(to_number_loose(b)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn truthiness_table() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([])] {
            assert!(!is_truthy(&v(falsy.clone())), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(1), json!(-0.5), json!("0"), json!([0]), json!({})] {
            assert!(is_truthy(&v(truthy.clone())), "{truthy} should be truthy");
        }
        assert!(!is_truthy(&Value::Float(f64::NAN)));
    }

    #[test]
    fn numeric_strings_coerce() {
        assert_eq!(to_number(&v(json!("42"))), Some(Number::Int(42)));
        assert_eq!(to_number(&v(json!(" 2.5 "))), Some(Number::Float(2.5)));
        assert_eq!(to_number(&v(json!("abc"))), None);
        assert_eq!(to_number(&v(json!(""))), None);
        assert_eq!(to_number(&v(json!("NaN"))), None);
        assert_eq!(to_number(&v(json!(true))), None);
        assert_eq!(to_number(&Value::Null), None);
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(Number::Int(2).add(Number::Int(3)), Number::Int(5));
        assert_eq!(Number::Int(7).div(Number::Int(2)), Some(Number::Int(3)));
        assert_eq!(Number::Int(-7).div(Number::Int(2)), Some(Number::Int(-3)));
        assert_eq!(Number::Int(-7).rem(Number::Int(3)), Some(Number::Int(-1)));
        assert_eq!(Number::Int(1).add(Number::Float(0.5)), Number::Float(1.5));
    }

    #[test]
    fn integer_overflow_falls_back_to_float() {
        assert_eq!(
            Number::Int(i64::MAX).add(Number::Int(1)),
            Number::Float(i64::MAX as f64 + 1.0)
        );
        assert_eq!(Number::Int(i64::MIN).neg(), Number::Float(-(i64::MIN as f64)));
    }

    #[test]
    fn zero_divisor_has_no_result() {
        assert_eq!(Number::Int(1).div(Number::Int(0)), None);
        assert_eq!(Number::Float(1.0).rem(Number::Float(0.0)), None);
    }

    #[test]
    fn loose_equality_table() {
        let equal = [
            (json!(0), json!("0")),
            (json!(1), json!(1.0)),
            (json!(1), json!(true)),
            (json!("1"), json!(true)),
            (json!(0), json!(false)),
            (json!(""), json!(0)),
            (json!(null), json!(null)),
            (json!([1, 2]), json!("1,2")),
            (json!([]), json!(false)),
            (json!([1]), json!(1)),
            (json!({"a": 1}), json!({"a": 1})),
        ];
        for (a, b) in equal {
            assert!(loose_equals(&v(a.clone()), &v(b.clone())), "{a} == {b}");
            assert!(loose_equals(&v(b.clone()), &v(a.clone())), "{b} == {a}");
        }

        let unequal = [
            (json!(null), json!(0)),
            (json!(null), json!(false)),
            (json!(null), json!("")),
            (json!(1), json!("one")),
            (json!(2), json!(true)),
            (json!({}), json!("[object Object]")),
            (json!([1]), json!([true])),
        ];
        for (a, b) in unequal {
            assert!(!loose_equals(&v(a.clone()), &v(b.clone())), "{a} != {b}");
            assert!(!loose_equals(&v(b.clone()), &v(a.clone())), "{b} != {a}");
        }
    }

    #[test]
    fn strict_equality_requires_same_tag() {
        assert!(strict_equals(&v(json!(1)), &v(json!(1.0))));
        assert!(!strict_equals(&v(json!(0)), &v(json!("0"))));
        assert!(!strict_equals(&v(json!(1)), &v(json!(true))));
        assert!(strict_equals(&v(json!([1, "a"])), &v(json!([1.0, "a"]))));
        assert!(!strict_equals(&v(json!([1])), &v(json!(["1"]))));
        assert!(!strict_equals(&Value::Float(f64::NAN), &Value::Float(f64::NAN)));
    }

    #[test]
    fn relational_ordering() {
        assert_eq!(compare(&v(json!(1)), &v(json!(2))), Some(Ordering::Less));
        assert_eq!(compare(&v(json!("11")), &v(json!(2))), Some(Ordering::Greater));
        assert_eq!(compare(&v(json!("11")), &v(json!("2"))), Some(Ordering::Less));
        assert_eq!(compare(&v(json!(null)), &v(json!(0))), Some(Ordering::Equal));
        assert_eq!(compare(&v(json!("abc")), &v(json!(1))), None);
        assert_eq!(compare(&v(json!({})), &v(json!(1))), None);
    }

    #[test]
    fn string_forms() {
        assert_eq!(to_string_form(&v(json!(null))), "null");
        assert_eq!(to_string_form(&v(json!(2.5))), "2.5");
        assert_eq!(to_string_form(&Value::Float(3.0)), "3");
        assert_eq!(to_string_form(&v(json!([1, null, "a", [2, 3]]))), "1,,a,2,3");
        assert_eq!(to_string_form(&v(json!({"a": 1}))), "[object Object]");
    }
}
