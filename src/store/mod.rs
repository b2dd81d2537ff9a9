//! Ledger Storage
//!
//! Persistence contract for accounts and ledger entries, with two
//! interchangeable backends:
//! - [`PgLedgerStore`] - PostgreSQL, row locks inside one SQL transaction
//! - [`FileLedgerStore`] - single JSON document guarded by a store-wide mutex
//!
//! # Units of work
//!
//! Balance mutations go through a [`LedgerUnit`] obtained from
//! [`LedgerStore::begin`]. Everything written through a unit lands on
//! [`LedgerUnit::commit`] or not at all; dropping a unit discards it.

pub mod file;
pub mod postgres;
pub mod schema;

pub use file::FileLedgerStore;
pub use postgres::PgLedgerStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;

use crate::account::Account;
use crate::config::StorageConfig;
use crate::db::Database;
use crate::error::LedgerError;
use crate::ledger::Entry;

/// One page of a ledger listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

impl PageRequest {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }
}

/// Read side and whole-operation writes shared by both backends
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Start an atomic unit of work
    async fn begin(&self) -> Result<Box<dyn LedgerUnit>, LedgerError>;

    /// Look up by id or account number
    async fn find_account(&self, identifier: &str) -> Result<Option<Account>, LedgerError>;

    /// First account owned by a customer
    async fn find_account_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Account>, LedgerError>;

    /// Persist a new account (ignored if the id already exists)
    ///
    /// Returns false when an account with that id was already present.
    async fn insert_account(&self, account: &Account) -> Result<bool, LedgerError>;

    /// Set the frozen flag and return the account as it now stands
    async fn set_frozen(
        &self,
        identifier: &str,
        frozen: bool,
        reason: Option<&str>,
    ) -> Result<Account, LedgerError>;

    /// Entries newest-first, optionally for one account
    async fn list_entries(&self, account_id: Option<&str>) -> Result<Vec<Entry>, LedgerError>;

    /// One page of [`LedgerStore::list_entries`]
    async fn list_entries_page(
        &self,
        account_id: Option<&str>,
        page: PageRequest,
    ) -> Result<Vec<Entry>, LedgerError>;

    /// Sum of all entry amounts for an account
    async fn sum_entries(&self, account_id: &str) -> Result<Decimal, LedgerError>;

    /// Recompute the balance from entries and persist it
    ///
    /// Runs under the account lock so no entry can land between the sum and
    /// the write. Returns the sum even when the account does not exist.
    async fn recalculate_balance(&self, account_id: &str) -> Result<Decimal, LedgerError>;
}

/// Exclusive, all-or-nothing access to a set of accounts
#[async_trait]
pub trait LedgerUnit: Send {
    /// Lock an account for the rest of the unit and read it
    async fn lock_account(&mut self, identifier: &str) -> Result<Option<Account>, LedgerError>;

    /// Replace the stored balance
    async fn update_balance(
        &mut self,
        account_id: &str,
        new_balance: Decimal,
    ) -> Result<(), LedgerError>;

    /// Append one immutable entry
    async fn append_entry(&mut self, entry: &Entry) -> Result<(), LedgerError>;

    /// Make every write of this unit visible atomically
    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;

    /// Discard every write of this unit
    async fn rollback(self: Box<Self>) -> Result<(), LedgerError>;
}

/// Backend selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    Postgres { url: String },
    File { path: PathBuf },
}

impl StoreKind {
    pub fn from_config(config: &StorageConfig) -> Self {
        if config.use_pg {
            StoreKind::Postgres {
                url: config.database_url.clone(),
            }
        } else {
            StoreKind::File {
                path: PathBuf::from(&config.store_path),
            }
        }
    }
}

/// Open the configured backend
pub async fn open_store(kind: &StoreKind) -> Result<Arc<dyn LedgerStore>, LedgerError> {
    match kind {
        StoreKind::Postgres { url } => {
            let db = Database::connect(url).await?;
            db.health_check().await?;
            tracing::info!("Using PostgreSQL ledger store");
            Ok(Arc::new(PgLedgerStore::new(db.pool().clone())))
        }
        StoreKind::File { path } => {
            let store = FileLedgerStore::open(path).await?;
            tracing::info!(path = %path.display(), "Using file ledger store");
            Ok(Arc::new(store))
        }
    }
}
