//! # lq-io — The "Engine" of LOGQ
//!
//! Persistence for log records: a single append-only journal file of
//! checksummed JSON frames, exposed to the query engine as a
//! [`lq_core::RecordStore`].

pub mod journal;

pub use journal::Journal;
