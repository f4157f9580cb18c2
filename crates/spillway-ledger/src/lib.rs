//! # spillway-ledger
//!
//! Persistence for overflow ("backup") categories.
//!
//! This crate provides:
//! - `OverflowRecord` (original category, backup category, index)
//! - JSONL read/write with lock-scoped atomic mutation
//! - the `RecordStore` trait with JSONL and in-memory adapters
//! - `OverflowLedger`, the typed facade the engine talks to
//!
//! It does not talk to the chat platform. Deciding when to allocate or
//! reclaim a backup category is `spillway-engine`'s job.
//!
//! ## Data model
//!
//! ```text
//! overflow.jsonl (on disk, one line per record)
//!     ↕  load / mutate under .lock
//! RecordTable (keyed by backup category id)
//!     ↕
//! RecordStore → OverflowLedger
//! ```

pub mod atomic_store;
pub mod jsonl;
pub mod ledger;
pub mod memory;
pub mod record;
pub mod store;

pub use atomic_store::{AtomicLedgerError, ledger_lock_path, mutate_ledger_jsonl};
pub use jsonl::{JsonlError, read_records_from_path, write_records_to_path};
pub use ledger::{LedgerError, OverflowLedger};
pub use memory::RecordTable;
pub use record::{FIRST_OVERFLOW_INDEX, OverflowRecord};
pub use store::{
    JsonlRecordStore, LedgerStoreError, MemoryRecordStore, RecordOrder, RecordQuery, RecordStore,
};
