//! # Condition Evaluation
//!
//! Decides whether a record satisfies a [`Condition`] or a whole
//! [`WhereClause`] tree. Evaluation is total: a type mismatch between the
//! field value and the operand makes the condition false, it never errors.
//! That includes ordered comparisons between incomparable types
//! (`"5" gt 3` is false, so is `missing lt 10`).

use std::cmp::Ordering;

use serde_json::Value;

use super::{Condition, Operator, WhereClause};
use crate::value::{self, values_equal};
use crate::Record;

impl Condition {
    /// Evaluate this condition against one record.
    pub fn evaluate(&self, record: &Record) -> bool {
        self.operator
            .apply(value::lookup(record, &self.field), &self.value)
    }
}

impl Operator {
    /// Apply the operator to a field value (`None` when the field is
    /// missing) and the condition operand.
    pub fn apply(self, field: Option<&Value>, operand: &Value) -> bool {
        match self {
            Operator::Eq => field_equals(field, operand),
            Operator::Ne => !field_equals(field, operand),
            Operator::Gt => ordering(field, operand).is_some_and(|o| o == Ordering::Greater),
            Operator::Gte => ordering(field, operand).is_some_and(|o| o != Ordering::Less),
            Operator::Lt => ordering(field, operand).is_some_and(|o| o == Ordering::Less),
            Operator::Lte => ordering(field, operand).is_some_and(|o| o != Ordering::Greater),
            Operator::In => match operand {
                Value::Array(members) => members.iter().any(|m| field_equals(field, m)),
                _ => false,
            },
            Operator::Contains => match field {
                Some(Value::String(s)) => operand.as_str().is_some_and(|needle| s.contains(needle)),
                Some(Value::Array(items)) => items.iter().any(|item| values_equal(item, operand)),
                _ => false,
            },
            Operator::StartsWith => match (field, operand) {
                (Some(Value::String(s)), Value::String(prefix)) => s.starts_with(prefix.as_str()),
                _ => false,
            },
            Operator::EndsWith => match (field, operand) {
                (Some(Value::String(s)), Value::String(suffix)) => s.ends_with(suffix.as_str()),
                _ => false,
            },
        }
    }
}

/// A missing field equals only `null`.
fn field_equals(field: Option<&Value>, operand: &Value) -> bool {
    match field {
        Some(v) => values_equal(v, operand),
        None => operand.is_null(),
    }
}

fn ordering(field: Option<&Value>, operand: &Value) -> Option<Ordering> {
    value::compare(field?, operand)
}

impl WhereClause {
    /// Evaluate the clause tree against one record.
    ///
    /// `and` over no clauses is true, `or` over no clauses is false.
    /// Both short-circuit left to right.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            WhereClause::Condition(condition) => condition.evaluate(record),
            WhereClause::And { and } => and.iter().all(|c| c.matches(record)),
            WhereClause::Or { or } => or.iter().any(|c| c.matches(record)),
            WhereClause::Not { not } => !not.matches(record),
        }
    }
}

/// Keep the records matching `clause`. No clause keeps everything.
pub fn filter<'a>(clause: Option<&WhereClause>, records: &'a [Record]) -> Vec<&'a Record> {
    match clause {
        Some(clause) => records.iter().filter(|r| clause.matches(r)).collect(),
        None => records.iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("not a map: {other}"),
        }
    }

    fn eval(field: &str, op: Operator, operand: Value, rec: &Record) -> bool {
        Condition::new(field, op, operand).evaluate(rec)
    }

    #[test]
    fn test_eq_and_ne() {
        let r = record(json!({"level": "error", "code": 500, "tags": ["a", "b"]}));
        assert!(eval("level", Operator::Eq, json!("error"), &r));
        assert!(!eval("level", Operator::Eq, json!("info"), &r));
        assert!(eval("code", Operator::Eq, json!(500.0), &r));
        assert!(eval("tags", Operator::Eq, json!(["a", "b"]), &r));
        assert!(eval("level", Operator::Ne, json!("info"), &r));
        assert!(!eval("code", Operator::Ne, json!(500), &r));
    }

    #[test]
    fn test_missing_field_behaves_like_null() {
        let r = record(json!({"level": "info"}));
        assert!(eval("service", Operator::Eq, json!(null), &r));
        assert!(!eval("service", Operator::Eq, json!("auth"), &r));
        assert!(eval("service", Operator::Ne, json!("auth"), &r));
        assert!(eval("service", Operator::In, json!(["db", null]), &r));
        assert!(!eval("service", Operator::Gt, json!(1), &r));
        assert!(!eval("service", Operator::Contains, json!("a"), &r));
    }

    #[test]
    fn test_ordered_comparisons() {
        let r = record(json!({"latency": 120, "ts": "2024-05-01T10:00:00Z"}));
        assert!(eval("latency", Operator::Gt, json!(100), &r));
        assert!(eval("latency", Operator::Gte, json!(120), &r));
        assert!(!eval("latency", Operator::Lt, json!(120), &r));
        assert!(eval("latency", Operator::Lte, json!(120.5), &r));
        assert!(eval("ts", Operator::Lt, json!("2024-06-01T00:00:00Z"), &r));
    }

    #[test]
    fn test_ordered_comparison_on_incomparable_types_is_false() {
        let r = record(json!({"latency": 120, "level": "error", "ok": true}));
        for op in [Operator::Gt, Operator::Gte, Operator::Lt, Operator::Lte] {
            assert!(!eval("latency", op, json!("100"), &r), "{op} number vs string");
            assert!(!eval("level", op, json!(5), &r), "{op} string vs number");
            assert!(!eval("ok", op, json!(0), &r), "{op} bool vs number");
        }
    }

    #[test]
    fn test_in_membership() {
        let r = record(json!({"level": "warn", "code": 404}));
        assert!(eval("level", Operator::In, json!(["warn", "error"]), &r));
        assert!(!eval("level", Operator::In, json!(["info"]), &r));
        assert!(eval("code", Operator::In, json!([400, 404.0]), &r));
        assert!(!eval("level", Operator::In, json!("warn"), &r));
    }

    #[test]
    fn test_contains_dispatches_on_field_type() {
        let r = record(json!({"msg": "connection refused", "tags": ["db", 7], "n": 42}));
        assert!(eval("msg", Operator::Contains, json!("refused"), &r));
        assert!(!eval("msg", Operator::Contains, json!("accepted"), &r));
        assert!(eval("tags", Operator::Contains, json!("db"), &r));
        assert!(eval("tags", Operator::Contains, json!(7.0), &r));
        assert!(!eval("tags", Operator::Contains, json!("d"), &r));
        assert!(!eval("msg", Operator::Contains, json!(1), &r));
    }

    #[test]
    fn test_contains_on_number_is_false() {
        let r = record(json!({"n": 42}));
        assert!(!eval("n", Operator::Contains, json!(4), &r));
        assert!(!eval("n", Operator::Contains, json!("4"), &r));
    }

    #[test]
    fn test_prefix_and_suffix() {
        let r = record(json!({"path": "/api/logs", "n": 10}));
        assert!(eval("path", Operator::StartsWith, json!("/api"), &r));
        assert!(!eval("path", Operator::StartsWith, json!("logs"), &r));
        assert!(eval("path", Operator::EndsWith, json!("logs"), &r));
        assert!(!eval("n", Operator::StartsWith, json!("1"), &r));
        assert!(!eval("n", Operator::EndsWith, json!("0"), &r));
    }

    #[test]
    fn test_nested_field_path() {
        let r = record(json!({"http": {"status": 503}}));
        assert!(eval("http.status", Operator::Gte, json!(500), &r));
    }

    #[test]
    fn test_empty_and_or() {
        let r = record(json!({"a": 1}));
        assert!(WhereClause::and(vec![]).matches(&r));
        assert!(!WhereClause::or(vec![]).matches(&r));
        assert!(WhereClause::not(WhereClause::or(vec![])).matches(&r));
    }

    #[test]
    fn test_nested_logic() {
        let r = record(json!({"level": "error", "service": "auth"}));
        let clause = WhereClause::and(vec![
            WhereClause::condition("level", Operator::Eq, json!("error")),
            WhereClause::or(vec![
                WhereClause::condition("service", Operator::Eq, json!("db")),
                WhereClause::not(WhereClause::condition(
                    "service",
                    Operator::StartsWith,
                    json!("test"),
                )),
            ]),
        ]);
        assert!(clause.matches(&r));
    }

    #[test]
    fn test_filter_without_clause_is_identity() {
        let records = vec![record(json!({"a": 1})), record(json!({"a": 2}))];
        let kept = filter(None, &records);
        assert_eq!(kept.len(), 2);

        let clause = WhereClause::condition("a", Operator::Gt, json!(1));
        let kept = filter(Some(&clause), &records);
        assert_eq!(kept, vec![&records[1]]);
    }
}
