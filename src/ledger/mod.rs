//! Transaction Ledger
//!
//! Immutable debit/credit entries, the source of truth for balances.

pub mod entries;
pub mod models;

pub use entries::{DEFAULT_PAGE_SIZE, EntryLedger};
pub use models::{Entry, EntryDraft, EntryType, TransferLegs, new_entry_id};
