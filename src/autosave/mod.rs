//! Debounced auto-save with retries and reconciliation of external updates
//!
//! This module provides:
//! - `AutoSave`: local editable copy of a record, saved after a quiet period
//! - `RecordStore`: the persistence contract the engine writes through
//! - `retry`: bounded async retry combinator with linear/exponential backoff
//! - `SaveState`: observable `idle → saving → success | error` status

mod engine;
pub mod retry;
mod state;
pub mod store;

pub use engine::{AutoSave, AutoSaveConfig, AutoSaveError, Reconciliation, Record};
pub use retry::{retry, Backoff, RetryError, RetryPolicy};
pub use state::{SaveState, SaveStatus};
pub use store::{fn_store, FnStore, MockRecordStore, RecordStore};
