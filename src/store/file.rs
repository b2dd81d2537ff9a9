//! File Ledger Store
//!
//! Keeps accounts and entries in one JSON document with top-level
//! `accounts` and `transactions` arrays. Every operation loads the document,
//! mutates it and writes it back while holding a store-wide mutex, so two
//! callers can never interleave a read-modify-write and lose an update.
//!
//! Keys other than `accounts` and `transactions` belong to other tools and
//! are written back untouched.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::{LedgerStore, LedgerUnit, PageRequest};
use crate::account::Account;
use crate::error::LedgerError;
use crate::ledger::Entry;

/// On-disk document layout
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<Entry>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl StoreDocument {
    fn account(&self, identifier: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.matches(identifier))
    }

    fn account_mut_by_id(&mut self, account_id: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.id == account_id)
    }

    fn sum_for(&self, account_id: &str) -> Decimal {
        self.transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .map(|t| t.amount)
            .sum()
    }

    /// Entries newest-first; equal timestamps keep reverse append order and
    /// undated rows sort last
    fn entries_newest_first(&self, account_id: Option<&str>) -> Vec<Entry> {
        let mut rows: Vec<Entry> = self
            .transactions
            .iter()
            .rev()
            .filter(|t| account_id.is_none_or(|id| t.account_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

async fn load_document(path: &Path) -> Result<StoreDocument, LedgerError> {
    let raw = tokio::fs::read(path).await?;
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(StoreDocument::default());
    }
    Ok(serde_json::from_slice(&raw)?)
}

/// Write via a sibling temp file so readers never see a torn document
async fn write_document(path: &Path, doc: &StoreDocument) -> Result<(), LedgerError> {
    let bytes = serde_json::to_vec_pretty(doc)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Single-document ledger store
pub struct FileLedgerStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileLedgerStore {
    /// Open the document, creating an empty one (and its directory) if missing
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir).await?;
        }
        if !tokio::fs::try_exists(&path).await? {
            write_document(&path, &StoreDocument::default()).await?;
            debug!(path = %path.display(), "Created empty store document");
        } else {
            // Fail fast on a corrupt document instead of on first use
            load_document(&path).await?;
        }
        Ok(Self {
            path,
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the whole document
    pub async fn snapshot(&self) -> Result<StoreDocument, LedgerError> {
        let _guard = self.lock.lock().await;
        load_document(&self.path).await
    }

    async fn read<T>(&self, f: impl FnOnce(&StoreDocument) -> T) -> Result<T, LedgerError> {
        let _guard = self.lock.lock().await;
        let doc = load_document(&self.path).await?;
        Ok(f(&doc))
    }
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn begin(&self) -> Result<Box<dyn LedgerUnit>, LedgerError> {
        let guard = self.lock.clone().lock_owned().await;
        let doc = load_document(&self.path).await?;
        Ok(Box::new(FileUnit {
            _guard: guard,
            path: self.path.clone(),
            doc,
            dirty: false,
        }))
    }

    async fn find_account(&self, identifier: &str) -> Result<Option<Account>, LedgerError> {
        self.read(|doc| doc.account(identifier).cloned()).await
    }

    async fn find_account_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Account>, LedgerError> {
        self.read(|doc| {
            doc.accounts
                .iter()
                .find(|a| a.customer_id.as_deref() == Some(customer_id))
                .cloned()
        })
        .await
    }

    async fn insert_account(&self, account: &Account) -> Result<bool, LedgerError> {
        let _guard = self.lock.lock().await;
        let mut doc = load_document(&self.path).await?;
        if doc.accounts.iter().any(|a| a.id == account.id) {
            return Ok(false);
        }
        doc.accounts.push(account.clone());
        write_document(&self.path, &doc).await?;
        Ok(true)
    }

    async fn set_frozen(
        &self,
        identifier: &str,
        frozen: bool,
        reason: Option<&str>,
    ) -> Result<Account, LedgerError> {
        let _guard = self.lock.lock().await;
        let mut doc = load_document(&self.path).await?;
        let acct = doc
            .accounts
            .iter_mut()
            .find(|a| a.matches(identifier))
            .ok_or(LedgerError::AccountNotFound)?;
        acct.frozen = frozen;
        acct.freeze_reason = if frozen {
            reason.map(str::to_string)
        } else {
            None
        };
        let updated = acct.clone();
        write_document(&self.path, &doc).await?;
        Ok(updated)
    }

    async fn list_entries(&self, account_id: Option<&str>) -> Result<Vec<Entry>, LedgerError> {
        self.read(|doc| doc.entries_newest_first(account_id)).await
    }

    async fn list_entries_page(
        &self,
        account_id: Option<&str>,
        page: PageRequest,
    ) -> Result<Vec<Entry>, LedgerError> {
        self.read(|doc| {
            doc.entries_newest_first(account_id)
                .into_iter()
                .skip(page.offset)
                .take(page.limit)
                .collect()
        })
        .await
    }

    async fn sum_entries(&self, account_id: &str) -> Result<Decimal, LedgerError> {
        self.read(|doc| doc.sum_for(account_id)).await
    }

    async fn recalculate_balance(&self, account_id: &str) -> Result<Decimal, LedgerError> {
        let _guard = self.lock.lock().await;
        let mut doc = load_document(&self.path).await?;
        let canonical = doc.account(account_id).map(|a| a.id.clone());
        let Some(id) = canonical else {
            return Ok(doc.sum_for(account_id));
        };
        let sum = doc.sum_for(&id);
        if let Some(acct) = doc.account_mut_by_id(&id) {
            acct.balance = sum;
        }
        write_document(&self.path, &doc).await?;
        Ok(sum)
    }
}

/// Unit of work over a private copy of the document
///
/// Holds the store mutex for its whole lifetime.
struct FileUnit {
    _guard: OwnedMutexGuard<()>,
    path: PathBuf,
    doc: StoreDocument,
    dirty: bool,
}

#[async_trait]
impl LedgerUnit for FileUnit {
    async fn lock_account(&mut self, identifier: &str) -> Result<Option<Account>, LedgerError> {
        Ok(self.doc.account(identifier).cloned())
    }

    async fn update_balance(
        &mut self,
        account_id: &str,
        new_balance: Decimal,
    ) -> Result<(), LedgerError> {
        let acct = self
            .doc
            .account_mut_by_id(account_id)
            .ok_or(LedgerError::AccountNotFound)?;
        acct.balance = new_balance;
        self.dirty = true;
        Ok(())
    }

    async fn append_entry(&mut self, entry: &Entry) -> Result<(), LedgerError> {
        self.doc.transactions.push(entry.clone());
        self.dirty = true;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        if self.dirty {
            write_document(&self.path, &self.doc).await?;
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        Ok(())
    }
}
