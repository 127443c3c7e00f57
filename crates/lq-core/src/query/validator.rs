//! # Query Validator
//!
//! Structural check of a raw query value before it is parsed into a
//! [`Query`]. The validator walks the JSON as received and reports every
//! problem it finds with a JSON-path-like location. It never looks at
//! records.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::pipeline::{GROUP_COUNT_KEY, GROUP_ENTRIES_KEY};
use super::{Operator, Query};
use crate::error::{ValidationErrors, ValidationIssue};
use crate::value::type_name;

/// Shape of a field identifier.
pub const FIELD_PATTERN: &str = r"^[A-Za-z_@$][A-Za-z0-9_@$.\-/:]*$";

const TOP_LEVEL_KEYS: [&str; 6] = ["find", "where", "group-by", "order-by", "limit", "offset"];
const RESERVED_GROUP_KEYS: [&str; 2] = [GROUP_COUNT_KEY, GROUP_ENTRIES_KEY];
const CONDITION_KEYS: [&str; 3] = ["field", "operator", "value"];

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationIssue>>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self {
            valid: true,
            errors: None,
        }
    }

    fn failed(issues: Vec<ValidationIssue>) -> Self {
        Self {
            valid: false,
            errors: Some(issues),
        }
    }
}

/// Validate a raw query.
pub fn validate(raw: &Value) -> ValidationResult {
    match check(raw) {
        Ok(()) => ValidationResult::ok(),
        Err(ValidationErrors(issues)) => ValidationResult::failed(issues),
    }
}

/// Validate a raw query, returning every issue on failure.
pub fn check(raw: &Value) -> Result<(), ValidationErrors> {
    let mut validator = Validator::default();
    validator.query(raw);
    if validator.issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(validator.issues))
    }
}

/// Validate a raw query and parse it into a [`Query`].
pub fn parse(raw: &Value) -> Result<Query, ValidationErrors> {
    check(raw)?;
    serde_json::from_value(raw.clone()).map_err(|e| ValidationErrors::single("$", e.to_string()))
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(FIELD_PATTERN).expect("field pattern is a valid regex"))
}

#[derive(Default)]
struct Validator {
    issues: Vec<ValidationIssue>,
}

impl Validator {
    fn issue(&mut self, path: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue::new(path, message));
    }

    fn query(&mut self, raw: &Value) {
        let Some(map) = raw.as_object() else {
            self.issue("$", format!("query must be a map, got {}", type_name(raw)));
            return;
        };

        for (key, value) in map {
            let path = format!("$.{}", key);
            match key.as_str() {
                "find" => self.field_list(&path, value),
                "group-by" => {
                    self.field_list(&path, value);
                    self.group_keys(&path, value);
                }
                "where" => self.clause(&path, value),
                "order-by" => self.order_by(&path, value),
                "limit" | "offset" => self.non_negative_int(&path, value),
                other => self.issue(
                    &path,
                    format!(
                        "unknown key '{}', expected one of {}",
                        other,
                        TOP_LEVEL_KEYS.join(", ")
                    ),
                ),
            }
        }
    }

    fn field(&mut self, path: &str, value: &Value) {
        match value {
            Value::String(name) if field_pattern().is_match(name) => {}
            Value::String(name) => self.issue(path, format!("'{}' is not a valid field name", name)),
            other => self.issue(
                path,
                format!("expected a field name, got {}", type_name(other)),
            ),
        }
    }

    /// Group entries carry their own `count` and `entries`; a key field
    /// with either name would be overwritten.
    fn group_keys(&mut self, path: &str, value: &Value) {
        let Some(fields) = value.as_array() else {
            return;
        };
        for (i, field) in fields.iter().enumerate() {
            if let Some(name) = field.as_str().filter(|n| RESERVED_GROUP_KEYS.contains(n)) {
                self.issue(
                    &format!("{}[{}]", path, i),
                    format!("'{}' is reserved in grouped results", name),
                );
            }
        }
    }

    fn field_list(&mut self, path: &str, value: &Value) {
        match value {
            Value::Array(fields) if fields.is_empty() => {
                self.issue(path, "expected a non-empty list of field names")
            }
            Value::Array(fields) => {
                for (i, field) in fields.iter().enumerate() {
                    self.field(&format!("{}[{}]", path, i), field);
                }
            }
            other => self.issue(
                path,
                format!("expected a list of field names, got {}", type_name(other)),
            ),
        }
    }

    fn clause(&mut self, path: &str, value: &Value) {
        let Some(node) = value.as_object() else {
            self.issue(
                path,
                format!("expected a where-clause map, got {}", type_name(value)),
            );
            return;
        };

        let is_condition = CONDITION_KEYS.iter().any(|k| node.contains_key(*k));
        let shapes = [
            ("condition", is_condition),
            ("and", node.contains_key("and")),
            ("or", node.contains_key("or")),
            ("not", node.contains_key("not")),
        ];
        let present: Vec<&str> = shapes
            .iter()
            .filter(|(_, present)| *present)
            .map(|(name, _)| *name)
            .collect();

        match present.as_slice() {
            [] => {
                self.issue(
                    path,
                    "expected a condition {field, operator, value} or one of and/or/not",
                );
                return;
            }
            [_] => {}
            many => {
                self.issue(path, format!("node mixes {}", many.join(" and ")));
                return;
            }
        }

        for key in node.keys() {
            let known = CONDITION_KEYS.contains(&key.as_str()) || ["and", "or", "not"].contains(&key.as_str());
            if !known {
                self.issue(&format!("{}.{}", path, key), "unknown key in where-clause");
            }
        }

        match present[0] {
            "condition" => self.condition(path, node),
            "and" | "or" => {
                let key = present[0];
                let child_path = format!("{}.{}", path, key);
                match &node[key] {
                    Value::Array(children) => {
                        for (i, child) in children.iter().enumerate() {
                            self.clause(&format!("{}[{}]", child_path, i), child);
                        }
                    }
                    other => self.issue(
                        &child_path,
                        format!("expected a list of where-clauses, got {}", type_name(other)),
                    ),
                }
            }
            _ => self.clause(&format!("{}.not", path), &node["not"]),
        }
    }

    fn condition(&mut self, path: &str, node: &Map<String, Value>) {
        for key in CONDITION_KEYS {
            if !node.contains_key(key) {
                self.issue(path, format!("condition is missing '{}'", key));
            }
        }

        if let Some(field) = node.get("field") {
            self.field(&format!("{}.field", path), field);
        }

        let operator_path = format!("{}.operator", path);
        let operator = match node.get("operator") {
            Some(Value::String(name)) => match name.parse::<Operator>() {
                Ok(op) => Some(op),
                Err(e) => {
                    let vocabulary: Vec<&str> = Operator::ALL.iter().map(|op| op.as_str()).collect();
                    self.issue(
                        &operator_path,
                        format!("{}, expected one of {}", e, vocabulary.join(", ")),
                    );
                    None
                }
            },
            Some(other) => {
                self.issue(
                    &operator_path,
                    format!("expected an operator name, got {}", type_name(other)),
                );
                None
            }
            None => None,
        };

        if let (Some(op), Some(value)) = (operator, node.get("value")) {
            let value_path = format!("{}.value", path);
            match op {
                Operator::In if !value.is_array() => self.issue(
                    &value_path,
                    format!("'in' expects a list, got {}", type_name(value)),
                ),
                Operator::StartsWith | Operator::EndsWith if !value.is_string() => self.issue(
                    &value_path,
                    format!("'{}' expects a string, got {}", op, type_name(value)),
                ),
                _ => {}
            }
        }
    }

    fn order_by(&mut self, path: &str, value: &Value) {
        let Some(entries) = value.as_array() else {
            self.issue(
                path,
                format!("expected a list of order keys, got {}", type_name(value)),
            );
            return;
        };

        for (i, entry) in entries.iter().enumerate() {
            let entry_path = format!("{}[{}]", path, i);
            match entry {
                Value::String(_) => self.field(&entry_path, entry),
                Value::Array(pair) if pair.len() == 2 => {
                    self.field(&format!("{}[0]", entry_path), &pair[0]);
                    match &pair[1] {
                        Value::String(dir) if dir == "asc" || dir == "desc" => {}
                        other => self.issue(
                            &format!("{}[1]", entry_path),
                            format!("expected direction \"asc\" or \"desc\", got {}", other),
                        ),
                    }
                }
                _ => self.issue(
                    &entry_path,
                    "expected a field name or a [field, direction] pair",
                ),
            }
        }
    }

    fn non_negative_int(&mut self, path: &str, value: &Value) {
        if value.as_u64().is_none() {
            self.issue(
                path,
                format!("expected a non-negative integer, got {}", value),
            );
        }
    }
}
