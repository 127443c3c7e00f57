//! # Record Store
//!
//! The seam between the query engine and persistence. A store keeps
//! records in arrival order and hands back the full sequence on every
//! read; the engine performs no indexing and caches nothing.

use std::sync::RwLock;

use crate::error::StoreError;
use crate::Record;

/// Ordered, append-only record storage.
///
/// Implementations must be safe to share between request handlers.
pub trait RecordStore: Send + Sync {
    /// Append one record at the end of the sequence.
    fn append(&self, record: Record) -> Result<(), StoreError>;

    /// Every record, in the order appended.
    fn read_all(&self) -> Result<Vec<Record>, StoreError>;

    /// Append a batch in order. Stops at the first failure; records before
    /// it stay appended.
    fn append_all(&self, records: Vec<Record>) -> Result<usize, StoreError> {
        let mut written = 0;
        for record in records {
            self.append(record)?;
            written += 1;
        }
        Ok(written)
    }
}

/// In-process store. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

impl RecordStore for MemoryStore {
    fn append(&self, record: Record) -> Result<(), StoreError> {
        self.records
            .write()
            .map_err(|_| "memory store lock poisoned")?
            .push(record);
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Record>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| "memory store lock poisoned")?;
        Ok(records.clone())
    }
}
