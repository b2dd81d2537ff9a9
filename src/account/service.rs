//! Account Service
//!
//! Lookups, balance verification against the ledger, and the freeze flag.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use super::models::Account;
use crate::error::LedgerError;
use crate::store::LedgerStore;

/// Read and administrative access to accounts
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn LedgerStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Look up by id or account number
    pub async fn find_account(&self, identifier: &str) -> Result<Option<Account>, LedgerError> {
        self.store.find_account(identifier).await
    }

    /// Stored balance, `None` when no account matches
    pub async fn get_balance(&self, identifier: &str) -> Result<Option<Decimal>, LedgerError> {
        Ok(self
            .store
            .find_account(identifier)
            .await?
            .map(|a| a.balance))
    }

    /// Rebuild the stored balance from the ledger
    ///
    /// Idempotent. Accepts an account number as well as an id.
    pub async fn recalculate_balance(&self, account_id: &str) -> Result<Decimal, LedgerError> {
        let before = self.store.find_account(account_id).await?;
        let sum = self.store.recalculate_balance(account_id).await?;

        match before {
            Some(acct) if acct.balance != sum => {
                warn!(
                    account_id = %acct.id,
                    stored = %acct.balance,
                    recalculated = %sum,
                    "Balance drift repaired"
                );
            }
            Some(acct) => {
                info!(account_id = %acct.id, balance = %sum, "Balance verified");
            }
            None => {
                warn!(account_id, sum = %sum, "Recalculated entries for unknown account");
            }
        }
        Ok(sum)
    }

    pub async fn freeze(
        &self,
        identifier: &str,
        reason: Option<&str>,
    ) -> Result<Account, LedgerError> {
        let acct = self.store.set_frozen(identifier, true, reason).await?;
        info!(account_id = %acct.id, reason = ?reason, "Account frozen");
        Ok(acct)
    }

    pub async fn unfreeze(&self, identifier: &str) -> Result<Account, LedgerError> {
        let acct = self.store.set_frozen(identifier, false, None).await?;
        info!(account_id = %acct.id, "Account unfrozen");
        Ok(acct)
    }
}
