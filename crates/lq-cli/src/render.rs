//! Terminal rendering of query results.

use serde::Deserialize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

/// The parts of a query response the CLI prints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QueryOutput {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub total_count: usize,
}

impl From<lq_core::QueryResult> for QueryOutput {
    fn from(result: lq_core::QueryResult) -> Self {
        Self {
            data: result.data,
            count: result.count,
            total_count: result.total_count,
        }
    }
}

/// Render entries as a table. Columns are the union of entry keys in
/// first-seen order.
pub fn table(data: &[Value]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for entry in data {
        if let Value::Object(map) = entry {
            for key in map.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }
    }

    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    for entry in data {
        builder.push_record(
            columns
                .iter()
                .map(|column| entry.get(*column).map(cell).unwrap_or_default()),
        );
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// Full terminal output for a result: the table plus a summary line.
pub fn summary(output: &QueryOutput) -> String {
    if output.data.is_empty() {
        return format!("No entries ({} records matched)", output.total_count);
    }
    format!(
        "{}\n{} entries ({} records matched)",
        table(&output.data),
        output.count,
        output.total_count
    )
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        // Group members.
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
            format!("[{} records]", items.len())
        }
        other => other.to_string(),
    }
}
