//! # lq-verify — The "Law" of LOGQ
//!
//! Formal verification proofs using the Kani model checker.
//!
//! Each law is a plain function over concrete inputs that returns whether
//! the law holds. Under `cfg(kani)` the harnesses feed them symbolic
//! inputs, which proves the law for every input of that shape; the unit
//! tests run the same functions over a small fixed grid.
//!
//! # Laws
//!
//! - Ordered operators agree with `eq` and with each other on numbers.
//! - The sort order is antisymmetric and transitive.
//! - Empty `and` is true, empty `or` is false, and De Morgan holds.

use std::cmp::Ordering;

use lq_core::value::{compare, sort_cmp, values_equal};
use lq_core::{Operator, Record, WhereClause};
use serde_json::Value;

/// `gte` is exactly `gt or eq`, and `lt` is exactly `not gte`, for any two
/// integers.
pub fn ordered_operators_agree(field: i64, operand: i64) -> bool {
    let f = Value::from(field);
    let o = Value::from(operand);
    let field = Some(&f);

    let gt = Operator::Gt.apply(field, &o);
    let gte = Operator::Gte.apply(field, &o);
    let lt = Operator::Lt.apply(field, &o);
    let lte = Operator::Lte.apply(field, &o);
    let eq = Operator::Eq.apply(field, &o);

    gte == (gt || eq) && lte == (lt || eq) && lt == !gte && gt == !lte
}

/// Integers compare equal to their float form under both `compare` and
/// `values_equal`.
pub fn integral_floats_match_ints(n: i32) -> bool {
    let int = Value::from(n);
    let float = Value::from(f64::from(n));
    values_equal(&int, &float) && compare(&int, &float) == Some(Ordering::Equal)
}

/// `sort_cmp(a, b)` is the reverse of `sort_cmp(b, a)`.
pub fn sort_is_antisymmetric(a: Option<&Value>, b: Option<&Value>) -> bool {
    sort_cmp(a, b) == sort_cmp(b, a).reverse()
}

/// `a <= b` and `b <= c` imply `a <= c` under `sort_cmp`.
pub fn sort_is_transitive(a: Option<&Value>, b: Option<&Value>, c: Option<&Value>) -> bool {
    let le = |x, y| sort_cmp(x, y) != Ordering::Greater;
    !(le(a, b) && le(b, c)) || le(a, c)
}

/// The identities of the clause algebra for two clauses on one record.
pub fn clause_algebra_holds(a: &WhereClause, b: &WhereClause, record: &Record) -> bool {
    let empty_and = WhereClause::and(vec![]).matches(record);
    let empty_or = WhereClause::or(vec![]).matches(record);

    let not_or = WhereClause::not(WhereClause::or(vec![a.clone(), b.clone()])).matches(record);
    let and_not = WhereClause::and(vec![WhereClause::not(a.clone()), WhereClause::not(b.clone())])
        .matches(record);

    let double_not = WhereClause::not(WhereClause::not(a.clone())).matches(record);

    empty_and && !empty_or && not_or == and_not && double_not == a.matches(record)
}

/// Symbolic value drawn from a small closed set of shapes.
pub fn value_from_tag(tag: u8, n: i64, flag: bool) -> Option<Value> {
    match tag % 5 {
        0 => None,
        1 => Some(Value::Null),
        2 => Some(Value::Bool(flag)),
        3 => Some(Value::from(n)),
        _ => Some(Value::from(if flag { "b" } else { "a" })),
    }
}

#[cfg(kani)]
mod proofs {
    use super::*;

    fn any_value() -> Option<Value> {
        value_from_tag(kani::any(), kani::any(), kani::any())
    }

    #[kani::proof]
    fn verify_ordered_operators() {
        assert!(ordered_operators_agree(kani::any(), kani::any()));
    }

    #[kani::proof]
    fn verify_integral_floats() {
        assert!(integral_floats_match_ints(kani::any()));
    }

    #[kani::proof]
    fn verify_sort_antisymmetry() {
        let a = any_value();
        let b = any_value();
        assert!(sort_is_antisymmetric(a.as_ref(), b.as_ref()));
    }

    #[kani::proof]
    #[kani::unwind(4)]
    fn verify_sort_transitivity() {
        let a = any_value();
        let b = any_value();
        let c = any_value();
        assert!(sort_is_transitive(a.as_ref(), b.as_ref(), c.as_ref()));
    }

    #[kani::proof]
    #[kani::unwind(4)]
    fn verify_clause_algebra() {
        let mut record = Record::new();
        if let Some(v) = any_value() {
            record.insert("n".into(), v);
        }
        let a = WhereClause::condition("n", Operator::Gt, Value::from(kani::any::<i8>()));
        let b = WhereClause::condition("n", Operator::Eq, Value::Null);
        assert!(clause_algebra_holds(&a, &b, &record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GRID: [i64; 7] = [i64::MIN, -3, -1, 0, 1, 3, i64::MAX];

    fn values() -> Vec<Option<Value>> {
        let mut values: Vec<Option<Value>> = (0..5u8)
            .flat_map(|tag| [value_from_tag(tag, -1, false), value_from_tag(tag, 2, true)])
            .collect();
        values.extend([
            Some(json!(1.5)),
            Some(json!([1, 2])),
            Some(json!([1])),
            Some(json!({"a": 1})),
        ]);
        values
    }

    #[test]
    fn test_ordered_operators_agree() {
        for a in GRID {
            for b in GRID {
                assert!(ordered_operators_agree(a, b), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_integral_floats_match_ints() {
        for n in [i32::MIN, -7, 0, 42, i32::MAX] {
            assert!(integral_floats_match_ints(n));
        }
    }

    #[test]
    fn test_sort_order_laws() {
        let values = values();
        for a in &values {
            for b in &values {
                assert!(sort_is_antisymmetric(a.as_ref(), b.as_ref()));
                for c in &values {
                    assert!(sort_is_transitive(a.as_ref(), b.as_ref(), c.as_ref()));
                }
            }
        }
    }

    #[test]
    fn test_clause_algebra() {
        let clauses = [
            WhereClause::condition("n", Operator::Gt, json!(0)),
            WhereClause::condition("n", Operator::Eq, Value::Null),
            WhereClause::condition("n", Operator::Contains, json!("a")),
            WhereClause::and(vec![]),
        ];
        for v in values() {
            let mut record = Record::new();
            if let Some(v) = v {
                record.insert("n".into(), v);
            }
            for a in &clauses {
                for b in &clauses {
                    assert!(clause_algebra_holds(a, b, &record));
                }
            }
        }
    }
}
