//! # Field Values
//!
//! Records carry arbitrary JSON, so every comparison dispatches on the
//! runtime type of both operands. Three relations live here:
//!
//! - [`values_equal`]: deep structural equality, numbers compared by value.
//! - [`compare`]: the partial order used by `gt`/`gte`/`lt`/`lte`. Only
//!   mutually ordered pairs compare; everything else is `None`.
//! - [`sort_cmp`]: a total order over all values, used by `order-by`.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::Record;

static MISSING: Value = Value::Null;

/// Resolve `field` in `record`.
///
/// An exact top-level key wins. Otherwise a dotted name walks nested maps,
/// so `http.status` reads `record["http"]["status"]`.
pub fn lookup<'a>(record: &'a Record, field: &str) -> Option<&'a Value> {
    if let Some(value) = record.get(field) {
        return Some(value);
    }
    if !field.contains('.') {
        return None;
    }

    let mut parts = field.split('.');
    let mut current = record.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Deep equality. `1` and `1.0` are equal; everything else follows JSON
/// structure.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => number_cmp(x, y) == Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Ordering between two mutually ordered values.
///
/// Numbers compare with numbers, strings with strings (by code point),
/// booleans with booleans, lists element-wise then by length. Any other
/// pairing is incomparable and yields `None`.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => number_cmp(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Array(xs), Value::Array(ys)) => {
            for (x, y) in xs.iter().zip(ys) {
                match compare(x, y)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(xs.len().cmp(&ys.len()))
        }
        _ => None,
    }
}

/// Total order for sorting. A missing field sorts like `null`.
///
/// Types rank `null < bool < number < string < list < map`; values of the
/// same type use [`compare`].
pub fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    total_cmp(a.unwrap_or(&MISSING), b.unwrap_or(&MISSING))
}

fn total_cmp(a: &Value, b: &Value) -> Ordering {
    let by_rank = rank(a).cmp(&rank(b));
    if by_rank != Ordering::Equal {
        return by_rank;
    }

    match (a, b) {
        (Value::Array(xs), Value::Array(ys)) => xs
            .iter()
            .zip(ys)
            .map(|(x, y)| total_cmp(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| xs.len().cmp(&ys.len())),
        (Value::Object(xm), Value::Object(ym)) => xm
            .iter()
            .zip(ym.iter())
            .map(|((kx, x), (ky, y))| kx.cmp(ky).then_with(|| total_cmp(x, y)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| xm.len().cmp(&ym.len())),
        _ => compare(a, b).unwrap_or(Ordering::Equal),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn number_cmp(a: &Number, b: &Number) -> Option<Ordering> {
    match (exact_integer(a), exact_integer(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        (Some(x), None) => Some(float_int_cmp(b.as_f64()?, x).reverse()),
        (None, Some(y)) => Some(float_int_cmp(a.as_f64()?, y)),
        (None, None) => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

/// -2^63 and 2^64: floats in `[I64_FLOOR, U64_CEIL)` convert to `i128`
/// exactly once truncated.
const I64_FLOOR: f64 = -9_223_372_036_854_775_808.0;
const U64_CEIL: f64 = 18_446_744_073_709_551_616.0;

/// The exact integer a number stands for, if any. Integral floats inside
/// the `i64`/`u64` range count, so `2^53` and `2^53 as f64` agree.
pub fn exact_integer(n: &Number) -> Option<i128> {
    if let Some(i) = n.as_i64() {
        return Some(i.into());
    }
    if let Some(u) = n.as_u64() {
        return Some(u.into());
    }
    let f = n.as_f64()?;
    (f.fract() == 0.0 && (I64_FLOOR..U64_CEIL).contains(&f)).then_some(f as i128)
}

/// Order a float that is not an exact integer against an integer, without
/// rounding the integer to `f64`.
fn float_int_cmp(f: f64, i: i128) -> Ordering {
    if f >= U64_CEIL {
        return Ordering::Greater;
    }
    if f < I64_FLOOR {
        return Ordering::Less;
    }
    let whole = f.trunc();
    (whole as i128).cmp(&i).then(if f > whole {
        Ordering::Greater
    } else {
        Ordering::Less
    })
}

/// Short type label for diagnostics.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
