//! # Ingest Boundary
//!
//! Turns a POSTed payload into records ready to append. A payload is one
//! record (a map) or a list of them. Records are checked against the
//! configured rules and optionally stamped with a timestamp and an id.
//! Validation is all-or-nothing: one bad record rejects the batch before
//! anything is appended. The append itself follows the store's
//! [`lq_core::RecordStore::append_all`] contract.

use lq_core::value::lookup;
use lq_core::Record;
use serde_json::Value;

use crate::config::IngestConfig;

/// Validate and stamp an ingest payload.
pub fn prepare(payload: Value, config: &IngestConfig) -> Result<Vec<Record>, String> {
    let items = match payload {
        Value::Object(record) => vec![Value::Object(record)],
        Value::Array(items) if items.is_empty() => {
            return Err("Payload contains no records".into());
        }
        Value::Array(items) => items,
        other => {
            return Err(format!(
                "Expected a record or a list of records, got {}",
                lq_core::value::type_name(&other)
            ));
        }
    };

    if items.len() > config.max_batch {
        return Err(format!(
            "Batch of {} records exceeds the limit of {}",
            items.len(),
            config.max_batch
        ));
    }

    let now = chrono::Utc::now().to_rfc3339();
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let Value::Object(mut record) = item else {
                return Err(format!("Record {} is not a map", i));
            };
            if record.is_empty() {
                return Err(format!("Record {} is empty", i));
            }
            if let Some(missing) = config
                .required_fields
                .iter()
                .find(|field| lookup(&record, field).is_none())
            {
                return Err(format!("Record {} is missing required field '{}'", i, missing));
            }

            if config.stamp_timestamp && !record.contains_key("timestamp") {
                record.insert("timestamp".into(), Value::String(now.clone()));
            }
            if config.assign_id && !record.contains_key("id") {
                record.insert(
                    "id".into(),
                    Value::String(uuid::Uuid::new_v4().to_string()),
                );
            }
            Ok(record)
        })
        .collect()
}
