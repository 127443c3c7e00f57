//! # Result Pipeline
//!
//! Shapes the records of a full scan into a [`QueryResult`]. The stages run
//! in a fixed order and the order is observable:
//!
//! ```text
//! filter -> find (projection) -> group-by -> order-by -> offset/limit
//! ```
//!
//! `total-count` is taken right after the filter, so it counts matching
//! records even when grouping later folds them into fewer entries.

use std::collections::HashMap;

use serde_json::Value;

use super::condition::filter;
use super::{OrderBy, Query, QueryResult};
use crate::value::{self, sort_cmp};
use crate::Record;

/// Key under which a group entry reports its size.
pub const GROUP_COUNT_KEY: &str = "count";
/// Key under which a group entry lists its members.
pub const GROUP_ENTRIES_KEY: &str = "entries";

/// Run `query` over `records`.
pub fn run(query: &Query, records: &[Record]) -> QueryResult {
    let matched = filter(query.filter.as_ref(), records);
    let total_count = matched.len();

    let projected: Vec<Record> = match &query.find {
        Some(fields) => matched.into_iter().map(|r| project(r, fields)).collect(),
        None => matched.into_iter().cloned().collect(),
    };

    let mut entries = match &query.group_by {
        Some(fields) => group(projected, fields),
        None => projected,
    };

    if let Some(order) = &query.order_by {
        sort(&mut entries, order);
    }

    let data: Vec<Value> = entries
        .into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(usize::MAX))
        .map(Value::Object)
        .collect();

    QueryResult {
        count: data.len(),
        data,
        total_count,
    }
}

/// Restrict a record to `fields`, in the order given. Absent fields are
/// left out rather than filled with `null`.
pub fn project(record: &Record, fields: &[String]) -> Record {
    fields
        .iter()
        .filter_map(|field| value::lookup(record, field).map(|v| (field.clone(), v.clone())))
        .collect()
}

/// Partition records by the values at `fields`.
///
/// Groups appear in the order their first member was seen. A missing field
/// contributes `null` to the key. Each entry carries the key fields, then
/// `count`, then `entries`.
pub fn group(records: Vec<Record>, fields: &[String]) -> Vec<Record> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Vec<Value>, Vec<Value>)> = Vec::new();

    for record in records {
        let key: Vec<Value> = fields
            .iter()
            .map(|field| value::lookup(&record, field).cloned().unwrap_or(Value::Null))
            .collect();
        let group_key = fingerprint(&key);

        let slot = *index.entry(group_key).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(Value::Object(record));
    }

    groups
        .into_iter()
        .map(|(key, members)| {
            let mut entry: Record = fields.iter().cloned().zip(key).collect();
            entry.insert(GROUP_COUNT_KEY.to_string(), Value::from(members.len()));
            entry.insert(GROUP_ENTRIES_KEY.to_string(), Value::Array(members));
            entry
        })
        .collect()
}

/// Canonical text of a group key. Integral floats print as the integer
/// they equal under [`value::exact_integer`] and map keys are sorted, so
/// the grouping agrees with `eq` (`1` and `1.0` share a group).
fn fingerprint(key: &[Value]) -> String {
    fn canonical(value: &Value) -> Value {
        match value {
            Value::Number(n) if n.is_f64() => match value::exact_integer(n) {
                Some(i) if i < 0 => Value::from(i as i64),
                Some(i) => Value::from(i as u64),
                None => value.clone(),
            },
            Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
            Value::Object(map) => {
                let mut pairs: Vec<(&String, &Value)> = map.iter().collect();
                pairs.sort_by(|a, b| a.0.cmp(b.0));
                Value::Object(
                    pairs
                        .into_iter()
                        .map(|(k, v)| (k.clone(), canonical(v)))
                        .collect(),
                )
            }
            other => other.clone(),
        }
    }
    Value::Array(key.iter().map(canonical).collect()).to_string()
}

/// Stable multi-key sort. Later keys break ties of earlier ones; full ties
/// keep their incoming order.
pub fn sort(entries: &mut [Record], order: &[OrderBy]) {
    entries.sort_by(|a, b| {
        order
            .iter()
            .map(|key| {
                key.direction.apply(sort_cmp(
                    value::lookup(a, &key.field),
                    value::lookup(b, &key.field),
                ))
            })
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Operator, WhereClause};
    use serde_json::json;

    fn records(values: Value) -> Vec<Record> {
        serde_json::from_value(values).unwrap()
    }

    fn sample() -> Vec<Record> {
        records(json!([
            {"level": "error", "service": "auth"},
            {"level": "info", "service": "auth"},
            {"level": "error", "service": "db"}
        ]))
    }

    fn level_eq(level: &str) -> WhereClause {
        WhereClause::condition("level", Operator::Eq, json!(level))
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let input = sample();
        let result = run(&Query::default(), &input);
        assert_eq!(result.count, 3);
        assert_eq!(result.total_count, 3);
        let expected: Vec<Value> = input.into_iter().map(Value::Object).collect();
        assert_eq!(result.data, expected);
    }

    #[test]
    fn test_filter_by_level() {
        let query = Query {
            filter: Some(level_eq("error")),
            ..Default::default()
        };
        let result = run(&query, &sample());
        assert_eq!(result.count, 2);
        assert_eq!(result.total_count, 2);
        assert!(result.data.iter().all(|r| r["level"] == "error"));
    }

    #[test]
    fn test_filter_with_and() {
        let query = Query {
            filter: Some(WhereClause::and(vec![
                level_eq("error"),
                WhereClause::condition("service", Operator::Eq, json!("auth")),
            ])),
            ..Default::default()
        };
        let result = run(&query, &sample());
        assert_eq!(result.data, vec![json!({"level": "error", "service": "auth"})]);
    }

    #[test]
    fn test_projection_omits_absent_fields() {
        let query = Query {
            find: Some(vec!["a".into(), "b".into()]),
            ..Default::default()
        };
        let result = run(&query, &records(json!([{"a": 1, "c": 3}])));
        assert_eq!(result.data, vec![json!({"a": 1})]);
    }

    #[test]
    fn test_projection_follows_find_order() {
        let projected = project(
            &records(json!([{"a": 1, "b": 2, "c": 3}]))[0],
            &["c".to_string(), "a".to_string()],
        );
        let keys: Vec<&String> = projected.keys().collect();
        assert_eq!(keys, vec!["c", "a"]);
    }

    #[test]
    fn test_order_and_paginate() {
        let query = Query {
            order_by: Some(vec![OrderBy::asc("level")]),
            limit: Some(1),
            offset: Some(1),
            ..Default::default()
        };
        let input = records(json!([
            {"level": "warn"},
            {"level": "error"},
            {"level": "info"}
        ]));
        let result = run(&query, &input);
        assert_eq!(result.data, vec![json!({"level": "info"})]);
        assert_eq!(result.count, 1);
        assert_eq!(result.total_count, 3);
    }

    #[test]
    fn test_multi_key_sort_with_directions() {
        let mut entries = records(json!([
            {"service": "db", "latency": 5},
            {"service": "auth", "latency": 10},
            {"service": "db", "latency": 50},
            {"service": "auth", "latency": 1}
        ]));
        sort(
            &mut entries,
            &[OrderBy::asc("service"), OrderBy::desc("latency")],
        );
        let latencies: Vec<i64> = entries
            .iter()
            .map(|e| e["latency"].as_i64().unwrap())
            .collect();
        assert_eq!(latencies, vec![10, 1, 50, 5]);
    }

    #[test]
    fn test_sort_is_stable_and_puts_missing_first() {
        let mut entries = records(json!([
            {"id": 1, "level": "error"},
            {"id": 2},
            {"id": 3, "level": "error"},
            {"id": 4, "level": "debug"}
        ]));
        sort(&mut entries, &[OrderBy::asc("level")]);
        let ids: Vec<i64> = entries.iter().map(|e| e["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_group_by_service() {
        let query = Query {
            group_by: Some(vec!["service".into()]),
            ..Default::default()
        };
        let result = run(&query, &sample());
        assert_eq!(result.count, 2);
        assert_eq!(result.total_count, 3);
        assert_eq!(
            result.data[0],
            json!({
                "service": "auth",
                "count": 2,
                "entries": [
                    {"level": "error", "service": "auth"},
                    {"level": "info", "service": "auth"}
                ]
            })
        );
        assert_eq!(result.data[1]["service"], "db");
        assert_eq!(result.data[1]["count"], 1);
    }

    #[test]
    fn test_group_then_order_by_count() {
        let query = Query {
            group_by: Some(vec!["level".into()]),
            order_by: Some(vec![OrderBy::desc("count")]),
            limit: Some(1),
            ..Default::default()
        };
        let input = records(json!([
            {"level": "info"},
            {"level": "error"},
            {"level": "error"}
        ]));
        let result = run(&query, &input);
        assert_eq!(result.count, 1);
        assert_eq!(result.total_count, 3);
        assert_eq!(result.data[0]["level"], "error");
        assert_eq!(result.data[0]["count"], 2);
    }

    #[test]
    fn test_group_by_missing_field_uses_null_key() {
        let grouped = group(
            records(json!([{"a": 1}, {"b": 2}, {"a": 1.0}])),
            &["a".to_string()],
        );
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0]["a"], 1);
        assert_eq!(grouped[0]["count"], 2);
        assert_eq!(grouped[1]["a"], Value::Null);
    }

    #[test]
    fn test_large_integral_floats_group_with_their_integer() {
        let grouped = group(
            records(json!([
                {"n": 9_007_199_254_740_992i64},
                {"n": 9_007_199_254_740_992.0f64},
                {"n": 9_007_199_254_740_993i64},
                {"n": 1.0e20}
            ])),
            &["n".to_string()],
        );
        let counts: Vec<i64> = grouped.iter().map(|g| g["count"].as_i64().unwrap()).collect();
        assert_eq!(counts, vec![2, 1, 1]);
    }

    #[test]
    fn test_order_by_mixes_ints_and_floats_past_2_pow_53() {
        let cycle = [
            json!(9_007_199_254_740_993i64),
            json!(9_007_199_254_740_992.0f64),
            json!(9_007_199_254_740_992i64),
        ];
        let input: Vec<Record> = (0..60)
            .map(|i| records(json!([{"n": cycle[i % 3].clone()}])).remove(0))
            .collect();
        let query = Query {
            order_by: Some(vec![OrderBy::asc("n")]),
            ..Default::default()
        };
        let result = run(&query, &input);
        let ns: Vec<&Value> = result.data.iter().map(|e| &e["n"]).collect();
        assert_eq!(ns.iter().filter(|n| **n == &cycle[0]).count(), 20);
        assert!(ns[..40].iter().all(|n| *n != &cycle[0]));
        assert!(ns[40..].iter().all(|n| *n == &cycle[0]));
    }

    #[test]
    fn test_group_key_ignores_map_key_order() {
        let grouped = group(
            records(json!([
                {"ctx": {"region": "eu", "zone": 1}},
                {"ctx": {"zone": 1, "region": "eu"}}
            ])),
            &["ctx".to_string()],
        );
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0]["count"], 2);
    }

    #[test]
    fn test_grouping_sees_projected_records() {
        let query = Query {
            find: Some(vec!["level".into()]),
            group_by: Some(vec!["level".into()]),
            ..Default::default()
        };
        let result = run(&query, &sample());
        assert_eq!(
            result.data[1],
            json!({"level": "info", "count": 1, "entries": [{"level": "info"}]})
        );
    }

    #[test]
    fn test_limit_zero_and_large_offset() {
        let zero = Query {
            limit: Some(0),
            ..Default::default()
        };
        let result = run(&zero, &sample());
        assert_eq!((result.count, result.total_count), (0, 3));

        let past_end = Query {
            offset: Some(10),
            ..Default::default()
        };
        let result = run(&past_end, &sample());
        assert!(result.data.is_empty());
        assert_eq!(result.total_count, 3);
    }
}
