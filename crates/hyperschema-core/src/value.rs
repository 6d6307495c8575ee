//! # JSON Value Helpers
//!
//! Kind names and comparison rules shared by the parser and validator.
//!
//! Numbers compare by mathematical value: integer `1` and float `1.0`
//! are equal for `enum` and `uniqueItems`. Integers are compared exactly
//! (as `i128`); anything involving a float goes through `f64`.

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// The JSON Schema simple-type name of a value. Integral numbers
/// (as decoded, not `1.0`) report `"integer"`, other numbers `"number"`.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if is_integer(n) => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether a number was decoded as an integer.
pub fn is_integer(n: &Number) -> bool {
    n.is_i64() || n.is_u64()
}

fn as_i128(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn as_f64(n: &Number) -> f64 {
    n.as_f64().unwrap_or(f64::NAN)
}

/// Order two numbers by value.
pub fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (as_i128(a), as_i128(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => as_f64(a).partial_cmp(&as_f64(b)),
    }
}

/// Whether `value` is an exact multiple of `divisor`.
///
/// A zero divisor never matches (the parser does not reject it).
pub fn is_multiple_of(value: &Number, divisor: &Number) -> bool {
    if let (Some(v), Some(d)) = (as_i128(value), as_i128(divisor)) {
        return d != 0 && v % d == 0;
    }
    let d = as_f64(divisor);
    if d == 0.0 || !d.is_finite() {
        return false;
    }
    let quotient = as_f64(value) / d;
    if !quotient.is_finite() {
        return false;
    }
    (quotient - quotient.round()).abs() <= f64::EPSILON * quotient.abs().max(1.0)
}

/// Deep equality with numeric comparison by value.
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).is_some_and(|y| json_equal(x, y)))
        }
        _ => a == b,
    }
}
