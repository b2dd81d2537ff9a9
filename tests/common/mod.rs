#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ledger_core::store::PageRequest;
use ledger_core::{
    Account, Entry, EventSink, FileLedgerStore, LedgerError, LedgerEvent, LedgerStore, LedgerUnit,
};
use rust_decimal::Decimal;

/// Sink that keeps every published event
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<LedgerEvent>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: LedgerEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

pub fn account(id: &str, customer: &str, balance: &str) -> Account {
    Account::new(id, customer).with_balance(dec(balance))
}

/// File store in a fresh temp directory, seeded with `accounts`
pub async fn file_store(accounts: &[Account]) -> (tempfile::TempDir, Arc<FileLedgerStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileLedgerStore::open(dir.path().join("admin_store.json"))
        .await
        .unwrap();
    for acct in accounts {
        assert!(store.insert_account(acct).await.unwrap());
    }
    (dir, Arc::new(store))
}

pub async fn balance_of(store: &dyn LedgerStore, id: &str) -> Decimal {
    store.find_account(id).await.unwrap().unwrap().balance
}

/// Store whose units fail the Nth balance update (1-based)
pub struct FailingStore {
    inner: Arc<dyn LedgerStore>,
    fail_on_update: usize,
    pub rollbacks: Arc<AtomicUsize>,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn LedgerStore>, fail_on_update: usize) -> Self {
        Self {
            inner,
            fail_on_update,
            rollbacks: Arc::new(AtomicUsize::new(0)),
        }
    }
}

struct FailingUnit {
    inner: Box<dyn LedgerUnit>,
    updates: usize,
    fail_on_update: usize,
    rollbacks: Arc<AtomicUsize>,
}

#[async_trait]
impl LedgerStore for FailingStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn begin(&self) -> Result<Box<dyn LedgerUnit>, LedgerError> {
        Ok(Box::new(FailingUnit {
            inner: self.inner.begin().await?,
            updates: 0,
            fail_on_update: self.fail_on_update,
            rollbacks: self.rollbacks.clone(),
        }))
    }

    async fn find_account(&self, identifier: &str) -> Result<Option<Account>, LedgerError> {
        self.inner.find_account(identifier).await
    }

    async fn find_account_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Account>, LedgerError> {
        self.inner.find_account_by_customer(customer_id).await
    }

    async fn insert_account(&self, account: &Account) -> Result<bool, LedgerError> {
        self.inner.insert_account(account).await
    }

    async fn set_frozen(
        &self,
        identifier: &str,
        frozen: bool,
        reason: Option<&str>,
    ) -> Result<Account, LedgerError> {
        self.inner.set_frozen(identifier, frozen, reason).await
    }

    async fn list_entries(&self, account_id: Option<&str>) -> Result<Vec<Entry>, LedgerError> {
        self.inner.list_entries(account_id).await
    }

    async fn list_entries_page(
        &self,
        account_id: Option<&str>,
        page: PageRequest,
    ) -> Result<Vec<Entry>, LedgerError> {
        self.inner.list_entries_page(account_id, page).await
    }

    async fn sum_entries(&self, account_id: &str) -> Result<Decimal, LedgerError> {
        self.inner.sum_entries(account_id).await
    }

    async fn recalculate_balance(&self, account_id: &str) -> Result<Decimal, LedgerError> {
        self.inner.recalculate_balance(account_id).await
    }
}

#[async_trait]
impl LedgerUnit for FailingUnit {
    async fn lock_account(&mut self, identifier: &str) -> Result<Option<Account>, LedgerError> {
        self.inner.lock_account(identifier).await
    }

    async fn update_balance(
        &mut self,
        account_id: &str,
        new_balance: Decimal,
    ) -> Result<(), LedgerError> {
        self.updates += 1;
        if self.updates == self.fail_on_update {
            return Err(LedgerError::Storage("injected failure".into()));
        }
        self.inner.update_balance(account_id, new_balance).await
    }

    async fn append_entry(&mut self, entry: &Entry) -> Result<(), LedgerError> {
        self.inner.append_entry(entry).await
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.inner.rollback().await
    }
}
