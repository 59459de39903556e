//! Combining functions for the eager operators.
//!
//! Each function receives its already-evaluated arguments (trimmed to the
//! operator's arity) and the data context. None of them fail: operands that do
//! not coerce produce `null` or `false`.

use std::cmp::Ordering;

use crate::types::coerce::{self, Number};
use crate::types::context::resolve_key;
use crate::types::{Value, NULL};

fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&NULL)
}

fn numbers(args: &[Value]) -> Option<Vec<Number>> {
    args.iter().map(coerce::to_number).collect()
}

pub(crate) fn equals(args: &[Value], _: &Value) -> Value {
    Value::Bool(coerce::loose_equals(arg(args, 0), arg(args, 1)))
}

pub(crate) fn not_equals(args: &[Value], _: &Value) -> Value {
    Value::Bool(!coerce::loose_equals(arg(args, 0), arg(args, 1)))
}

pub(crate) fn strict_equals(args: &[Value], _: &Value) -> Value {
    Value::Bool(coerce::strict_equals(arg(args, 0), arg(args, 1)))
}

pub(crate) fn strict_not_equals(args: &[Value], _: &Value) -> Value {
    Value::Bool(!coerce::strict_equals(arg(args, 0), arg(args, 1)))
}

pub(crate) fn not(args: &[Value], _: &Value) -> Value {
    Value::Bool(!coerce::is_truthy(arg(args, 0)))
}

pub(crate) fn truthy(args: &[Value], _: &Value) -> Value {
    Value::Bool(coerce::is_truthy(arg(args, 0)))
}

/// `a op b`, or `a op b op c` when a third operand is present.
fn chained(args: &[Value], holds: fn(Ordering) -> bool) -> Value {
    if args.len() < 2 {
        return Value::Bool(false);
    }
    let result = args
        .windows(2)
        .all(|pair| coerce::compare(&pair[0], &pair[1]).is_some_and(holds));
    Value::Bool(result)
}

pub(crate) fn less_than(args: &[Value], _: &Value) -> Value {
    chained(args, Ordering::is_lt)
}

pub(crate) fn less_equal(args: &[Value], _: &Value) -> Value {
    chained(args, Ordering::is_le)
}

pub(crate) fn greater_than(args: &[Value], _: &Value) -> Value {
    chained(args, Ordering::is_gt)
}

pub(crate) fn greater_equal(args: &[Value], _: &Value) -> Value {
    chained(args, Ordering::is_ge)
}

pub(crate) fn add(args: &[Value], _: &Value) -> Value {
    numbers(args)
        .map(|ns| ns.into_iter().fold(Number::Int(0), Number::add))
        .map_or(Value::Null, Number::into_value)
}

pub(crate) fn multiply(args: &[Value], _: &Value) -> Value {
    numbers(args)
        .and_then(|ns| ns.into_iter().reduce(Number::mul))
        .map_or(Value::Null, Number::into_value)
}

pub(crate) fn subtract(args: &[Value], _: &Value) -> Value {
    let result = match numbers(args).as_deref() {
        Some([a]) => Some(a.neg()),
        Some([a, b]) => Some(a.sub(*b)),
        _ => None,
    };
    result.map_or(Value::Null, Number::into_value)
}

fn divide_with(args: &[Value], op: fn(Number, Number) -> Option<Number>) -> Value {
    let a = coerce::to_number(arg(args, 0));
    let b = coerce::to_number(arg(args, 1));
    match (a, b) {
        (Some(a), Some(b)) => op(a, b).map_or(Value::Null, Number::into_value),
        _ => Value::Null,
    }
}

pub(crate) fn divide(args: &[Value], _: &Value) -> Value {
    divide_with(args, Number::div)
}

pub(crate) fn remainder(args: &[Value], _: &Value) -> Value {
    divide_with(args, Number::rem)
}

fn extreme(args: &[Value], keep: Ordering) -> Value {
    numbers(args)
        .and_then(|ns| {
            ns.into_iter()
                .reduce(|best, n| if n.cmp_numeric(best) == Some(keep) { n } else { best })
        })
        .map_or(Value::Null, Number::into_value)
}

pub(crate) fn min(args: &[Value], _: &Value) -> Value {
    extreme(args, Ordering::Less)
}

pub(crate) fn max(args: &[Value], _: &Value) -> Value {
    extreme(args, Ordering::Greater)
}

pub(crate) fn cat(args: &[Value], _: &Value) -> Value {
    Value::String(args.iter().map(coerce::to_string_form).collect())
}

/// Character-based substring. A negative start counts from the end; a
/// negative length leaves that many characters off the end.
pub(crate) fn substr(args: &[Value], _: &Value) -> Value {
    let chars: Vec<char> = coerce::to_string_form(arg(args, 0)).chars().collect();
    let len = i64::try_from(chars.len()).unwrap_or(i64::MAX);

    let start = coerce::to_number(arg(args, 1)).map_or(0, Number::as_i64);
    let start = if start < 0 { (len + start).max(0) } else { start.min(len) };

    let end = match coerce::to_number(arg(args, 2)).map(Number::as_i64) {
        None => len,
        Some(count) if count < 0 => (len + count).max(start),
        Some(count) => start.saturating_add(count).min(len),
    };

    let (Ok(start), Ok(end)) = (usize::try_from(start), usize::try_from(end)) else {
        return Value::String(String::new());
    };
    Value::String(chars[start..end.max(start)].iter().collect())
}

pub(crate) fn contains(args: &[Value], _: &Value) -> Value {
    let needle = arg(args, 0);
    let haystack = arg(args, 1);
    let found = if let Some(text) = haystack.as_str() {
        text.contains(&coerce::to_string_form(needle))
    } else if let Some(items) = haystack.as_array() {
        items.iter().any(|item| coerce::strict_equals(item, needle))
    } else {
        false
    };
    Value::Bool(found)
}

pub(crate) fn merge(args: &[Value], _: &Value) -> Value {
    let mut merged = Vec::with_capacity(args.len());
    for value in args {
        match value {
            Value::Array(items) => merged.extend(items.iter().cloned()),
            other => merged.push(other.clone()),
        }
    }
    Value::Array(merged)
}

fn is_missing(data: &Value, key: &Value) -> bool {
    resolve_key(data, key).is_none_or(Value::is_null)
}

fn missing_keys<'k>(keys: &'k [Value], data: &Value) -> Vec<&'k Value> {
    keys.iter().filter(|key| is_missing(data, key)).collect()
}

/// Keys that do not resolve (or resolve to `null`). Takes the keys as its
/// arguments or as a single array argument.
pub(crate) fn missing(args: &[Value], data: &Value) -> Value {
    let keys = args.first().and_then(Value::as_array).unwrap_or(args);
    Value::Array(missing_keys(keys, data).into_iter().cloned().collect())
}

/// `[need, keys]`: `[]` once at least `need` keys resolve, otherwise the
/// missing keys.
pub(crate) fn missing_some(args: &[Value], data: &Value) -> Value {
    let need = coerce::to_number(arg(args, 0)).map_or(0.0, |n| n.as_f64().ceil());
    let keys = match arg(args, 1) {
        Value::Array(keys) => keys.as_slice(),
        Value::Null => &[],
        single => std::slice::from_ref(single),
    };
    let absent = missing_keys(keys, data);
    #[allow(clippy::cast_precision_loss)]
    let found = (keys.len() - absent.len()) as f64;
    if found >= need {
        Value::Array(Vec::new())
    } else {
        Value::Array(absent.into_iter().cloned().collect())
    }
}

pub(crate) fn log(args: &[Value], _: &Value) -> Value {
    let value = arg(args, 0);
    tracing::info!(target: "tessera::log", %value, "log");
    value.clone()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn call(f: fn(&[Value], &Value) -> Value, args: serde_json::Value) -> Value {
        call_with(f, args, json!(null))
    }

    fn call_with(
        f: fn(&[Value], &Value) -> Value,
        args: serde_json::Value,
        data: serde_json::Value,
    ) -> Value {
        let Value::Array(args) = Value::from(args) else {
            panic!("arguments must be an array");
        };
        f(&args, &Value::from(data))
    }

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn arithmetic_keeps_integers() {
        assert_eq!(call(add, json!([1, 2, 3])), Value::Int(6));
        assert_eq!(call(add, json!(["1", 2])), Value::Int(3));
        assert_eq!(call(add, json!([1, 0.5])), Value::Float(1.5));
        assert_eq!(call(multiply, json!([2, "3"])), Value::Int(6));
        assert_eq!(call(subtract, json!([10, 4])), Value::Int(6));
        assert_eq!(call(divide, json!([7, 2])), Value::Int(3));
        assert_eq!(call(divide, json!([7.0, 2])), Value::Float(3.5));
        assert_eq!(call(remainder, json!([15, 4])), Value::Int(3));
    }

    #[test]
    fn arithmetic_edges() {
        assert_eq!(call(add, json!([])), Value::Int(0));
        assert_eq!(call(add, json!(["3.5"])), Value::Float(3.5));
        assert_eq!(call(multiply, json!([])), Value::Null);
        assert_eq!(call(subtract, json!([5])), Value::Int(-5));
        assert_eq!(call(subtract, json!([])), Value::Null);
        assert_eq!(call(add, json!([1, "x"])), Value::Null);
        assert_eq!(call(add, json!([1, null])), Value::Null);
        assert_eq!(call(divide, json!([1, 0])), Value::Null);
        assert_eq!(call(remainder, json!([1, 0])), Value::Null);
        assert_eq!(call(divide, json!([1])), Value::Null);
    }

    #[test]
    fn min_and_max() {
        assert_eq!(call(min, json!([3, 1, 2])), Value::Int(1));
        assert_eq!(call(max, json!([3, 1.5, "7"])), Value::Int(7));
        assert_eq!(call(max, json!([])), Value::Null);
        assert_eq!(call(min, json!([1, "a"])), Value::Null);
    }

    #[test]
    fn relational_and_between() {
        assert_eq!(call(less_than, json!([1, 2])), Value::Bool(true));
        assert_eq!(call(less_than, json!([1, 2, 3])), Value::Bool(true));
        assert_eq!(call(less_than, json!([1, 3, 3])), Value::Bool(false));
        assert_eq!(call(less_equal, json!([1, 3, 3])), Value::Bool(true));
        assert_eq!(call(greater_equal, json!(["b", "a"])), Value::Bool(true));
        assert_eq!(call(greater_than, json!([1])), Value::Bool(false));
        assert_eq!(call(greater_than, json!(["x", 1])), Value::Bool(false));
        assert_eq!(call(less_than, json!([{}, 1])), Value::Bool(false));
    }

    #[test]
    fn equality_operators() {
        assert_eq!(call(equals, json!([0, "0"])), Value::Bool(true));
        assert_eq!(call(strict_equals, json!([0, "0"])), Value::Bool(false));
        assert_eq!(call(not_equals, json!([1, 2])), Value::Bool(true));
        assert_eq!(call(strict_not_equals, json!([1, 1.0])), Value::Bool(false));
        assert_eq!(call(equals, json!([null])), Value::Bool(true));
    }

    #[test]
    fn negation() {
        assert_eq!(call(not, json!([[]])), Value::Bool(true));
        assert_eq!(call(truthy, json!(["0"])), Value::Bool(true));
        assert_eq!(call(truthy, json!([])), Value::Bool(false));
    }

    #[test]
    fn strings() {
        assert_eq!(call(cat, json!(["I love ", "pie", 3.0, null])), v(json!("I love pie3null")));
        assert_eq!(call(substr, json!(["jsonlogic", 4])), v(json!("logic")));
        assert_eq!(call(substr, json!(["jsonlogic", -5])), v(json!("logic")));
        assert_eq!(call(substr, json!(["jsonlogic", 1, 3])), v(json!("son")));
        assert_eq!(call(substr, json!(["jsonlogic", 4, -2])), v(json!("log")));
        assert_eq!(call(substr, json!(["abc", 10])), v(json!("")));
        assert_eq!(call(substr, json!(["abc", 1, -5])), v(json!("")));
        assert_eq!(call(substr, json!(["héllo", 1, 2])), v(json!("él")));
    }

    #[test]
    fn membership() {
        assert_eq!(call(contains, json!(["Spring", "Springfield"])), Value::Bool(true));
        assert_eq!(call(contains, json!(["b", ["a", "b"]])), Value::Bool(true));
        assert_eq!(call(contains, json!([1, ["1"]])), Value::Bool(false));
        assert_eq!(call(contains, json!([1, 1])), Value::Bool(false));
    }

    #[test]
    fn merge_flattens_one_level() {
        assert_eq!(
            call(merge, json!([[1, 2], 3, [[4]]])),
            v(json!([1, 2, 3, [4]]))
        );
        assert_eq!(call(merge, json!([])), v(json!([])));
    }

    #[test]
    fn missing_keys_in_data() {
        let data = json!({"a": 1, "b": null, "c": {"d": 0}});
        assert_eq!(call_with(missing, json!(["a", "b", "x", "c.d"]), data.clone()), v(json!(["b", "x"])));
        assert_eq!(call_with(missing, json!([["x", "a"]]), data.clone()), v(json!(["x"])));
        assert_eq!(call_with(missing, json!([]), data), v(json!([])));
    }

    #[test]
    fn missing_some_threshold() {
        let data = json!({"a": 1, "b": 2});
        assert_eq!(call_with(missing_some, json!([1, ["a", "x"]]), data.clone()), v(json!([])));
        assert_eq!(
            call_with(missing_some, json!([2, ["a", "x", "y"]]), data.clone()),
            v(json!(["x", "y"]))
        );
        assert_eq!(call_with(missing_some, json!([0, ["x"]]), data), v(json!([])));
    }

    #[test]
    fn log_returns_argument() {
        assert_eq!(call(log, json!([[1, "a"]])), v(json!([1, "a"])));
        assert_eq!(call(log, json!([])), Value::Null);
    }
}
