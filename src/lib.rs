//! Ledger Core
//!
//! Account balances, an append-only entry ledger and atomic transfers
//! between accounts, with best-effort realtime notification of every
//! committed write.
//!
//! # Modules
//!
//! - [`account`] - Account model and administrative operations
//! - [`ledger`] - Entry model and the read side of the ledger
//! - [`store`] - Persistence contract with PostgreSQL and file backends
//! - [`transfer`] - Transfer coordinator (every balance mutation)
//! - [`emitter`] - Realtime event delivery with retry and backoff
//! - [`db`] - PostgreSQL pool and migrations
//! - [`import`] - File store to PostgreSQL import
//! - [`config`] / [`logging`] - Process setup
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ledger_core::{FileLedgerStore, NoopSink, TransferCoordinator};
//! use rust_decimal::Decimal;
//!
//! # async fn demo() -> Result<(), ledger_core::LedgerError> {
//! let store = Arc::new(FileLedgerStore::open("data/admin_store.json").await?);
//! let coordinator = TransferCoordinator::new(store, Arc::new(NoopSink));
//! let legs = coordinator
//!     .transfer("acct_a", "acct_b", Decimal::new(2500, 2), Some("rent"))
//!     .await?;
//! assert_eq!(legs.credit.amount, Decimal::new(2500, 2));
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod config;
pub mod db;
pub mod emitter;
pub mod error;
pub mod import;
pub mod ledger;
pub mod logging;
pub mod store;
pub mod transfer;

pub use account::{Account, AccountService, AccountType};
pub use config::{AppConfig, ConfigError, RealtimeConfig, StorageConfig};
pub use db::Database;
pub use emitter::{
    EmitError, EmitterHandle, EventSink, LedgerEvent, NoopSink, RealtimeClient, RetryPolicy,
    spawn_dispatcher,
};
pub use error::LedgerError;
pub use import::{ImportReport, import_file_store};
pub use ledger::{Entry, EntryDraft, EntryLedger, EntryType, TransferLegs};
pub use store::{FileLedgerStore, LedgerStore, LedgerUnit, PgLedgerStore, StoreKind, open_store};
pub use transfer::{DEPOSIT_LOCATIONS, TransferCoordinator, parse_amount};
