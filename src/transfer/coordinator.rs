use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::amount::DEFAULT_DEPOSIT_SOURCE;
use crate::account::Account;
use crate::emitter::{EventSink, LedgerEvent};
use crate::error::LedgerError;
use crate::ledger::{Entry, EntryDraft, EntryType, TransferLegs, new_entry_id};
use crate::store::{LedgerStore, LedgerUnit};

/// A committed leg and the balance it produced
struct Posted {
    entry: Entry,
    balance: Decimal,
}

/// Orchestrates balance-changing writes over a [`LedgerStore`]
pub struct TransferCoordinator {
    store: Arc<dyn LedgerStore>,
    events: Arc<dyn EventSink>,
}

impl TransferCoordinator {
    pub fn new(store: Arc<dyn LedgerStore>, events: Arc<dyn EventSink>) -> Self {
        Self { store, events }
    }

    /// Single-sided write: one entry and the matching balance change
    ///
    /// The amount is applied as given, sign included.
    pub async fn create_entry(&self, draft: EntryDraft) -> Result<Entry, LedgerError> {
        let mut unit = self.store.begin().await?;

        let result = post_entry(unit.as_mut(), draft).await;
        let posted = match result {
            Ok(posted) => posted,
            Err(e) => {
                abort(unit, &e).await;
                return Err(e);
            }
        };
        unit.commit().await?;

        info!(
            entry_id = %posted.entry.id,
            account_id = %posted.entry.account_id,
            amount = %posted.entry.amount,
            balance = %posted.balance,
            "Entry posted"
        );
        self.publish(&posted);
        Ok(posted.entry)
    }

    /// Move `amount` between two accounts atomically
    ///
    /// Both identifiers may be an id or an account number.
    pub async fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<TransferLegs, LedgerError> {
        // Canonical ids fix the lock order regardless of identifier form
        let from_id = self
            .store
            .find_account(from)
            .await?
            .ok_or(LedgerError::FromAccountNotFound)?
            .id;
        let to_id = self
            .store
            .find_account(to)
            .await?
            .ok_or(LedgerError::ToAccountNotFound)?
            .id;

        let mut unit = self.store.begin().await?;

        let result = post_transfer(unit.as_mut(), &from_id, &to_id, amount, description).await;
        let (debit, credit) = match result {
            Ok(legs) => legs,
            Err(e) => {
                abort(unit, &e).await;
                return Err(e);
            }
        };
        unit.commit().await?;

        info!(
            from = %from_id,
            to = %to_id,
            amount = %amount,
            debit_id = %debit.entry.id,
            credit_id = %credit.entry.id,
            "Transfer committed"
        );
        self.publish(&debit);
        self.publish(&credit);

        Ok(TransferLegs {
            debit: debit.entry,
            credit: credit.entry,
        })
    }

    /// Transfer to whichever account the recipient customer owns
    pub async fn transfer_to_user(
        &self,
        from: &str,
        to_user_id: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<TransferLegs, LedgerError> {
        let sender = self
            .store
            .find_account(from)
            .await?
            .ok_or(LedgerError::FromAccountNotFound)?;
        if sender.frozen {
            return Err(LedgerError::FromAccountFrozen);
        }

        let recipient = self
            .store
            .find_account_by_customer(to_user_id)
            .await?
            .ok_or(LedgerError::RecipientNoAccount)?;

        self.transfer(&sender.id, &recipient.id, amount, description)
            .await
    }

    /// Credit money arriving from outside the ledger
    pub async fn direct_deposit(
        &self,
        account_id: &str,
        amount: Decimal,
        source: Option<&str>,
        location: Option<&str>,
    ) -> Result<Entry, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }

        let source = source
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_DEPOSIT_SOURCE);
        let description = match location.filter(|l| !l.is_empty()) {
            Some(location) => format!("direct_deposit:{}:{}", source, location),
            None => format!("direct_deposit:{}", source),
        };

        self.create_entry(EntryDraft::credit(account_id, amount).with_description(description))
            .await
    }

    fn publish(&self, posted: &Posted) {
        self.events.publish(LedgerEvent::transaction(&posted.entry));
        self.events.publish(LedgerEvent::balance(
            posted.entry.account_id.clone(),
            posted.balance,
        ));
    }
}

async fn post_entry(unit: &mut dyn LedgerUnit, draft: EntryDraft) -> Result<Posted, LedgerError> {
    let account = unit
        .lock_account(&draft.account)
        .await?
        .ok_or(LedgerError::AccountNotFound)?;

    let balance = account.balance + draft.amount;
    let entry = Entry {
        id: new_entry_id(),
        account_id: account.id.clone(),
        user_id: draft.user_id.or_else(|| account.customer_id.clone()),
        amount: draft.amount,
        entry_type: draft.entry_type,
        description: draft.description.unwrap_or_default(),
        related_account_id: draft.related_account_id,
        created_at: Some(Utc::now()),
        extra: Default::default(),
    };

    unit.update_balance(&account.id, balance).await?;
    unit.append_entry(&entry).await?;
    Ok(Posted { entry, balance })
}

async fn post_transfer(
    unit: &mut dyn LedgerUnit,
    from_id: &str,
    to_id: &str,
    amount: Decimal,
    description: Option<&str>,
) -> Result<(Posted, Posted), LedgerError> {
    let (from, to) = lock_pair(unit, from_id, to_id).await?;
    let from = from.ok_or(LedgerError::FromAccountNotFound)?;
    let to = to.ok_or(LedgerError::ToAccountNotFound)?;

    if from.frozen {
        return Err(LedgerError::FromAccountFrozen);
    }
    if to.frozen {
        return Err(LedgerError::ToAccountFrozen);
    }
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount);
    }
    if from.balance < amount {
        return Err(LedgerError::InsufficientFunds);
    }

    let from_balance = from.balance - amount;
    // A self-transfer credits the balance it just debited
    let to_balance = if from.id == to.id {
        from_balance + amount
    } else {
        to.balance + amount
    };

    let now = Utc::now();
    let debit = Entry {
        id: new_entry_id(),
        account_id: from.id.clone(),
        user_id: from.customer_id.clone(),
        amount: -amount,
        entry_type: EntryType::Debit,
        description: description
            .map(str::to_string)
            .unwrap_or_else(|| format!("transfer to {}", to.id)),
        related_account_id: Some(to.id.clone()),
        created_at: Some(now),
        extra: Default::default(),
    };
    let credit = Entry {
        id: new_entry_id(),
        account_id: to.id.clone(),
        user_id: to.customer_id.clone(),
        amount,
        entry_type: EntryType::Credit,
        description: description
            .map(str::to_string)
            .unwrap_or_else(|| format!("transfer from {}", from.id)),
        related_account_id: Some(from.id.clone()),
        created_at: Some(now),
        extra: Default::default(),
    };

    unit.update_balance(&from.id, from_balance).await?;
    unit.append_entry(&debit).await?;
    unit.update_balance(&to.id, to_balance).await?;
    unit.append_entry(&credit).await?;

    Ok((
        Posted {
            entry: debit,
            balance: from_balance,
        },
        Posted {
            entry: credit,
            balance: to_balance,
        },
    ))
}

/// Lock both accounts in ascending id order, returned as (from, to)
async fn lock_pair(
    unit: &mut dyn LedgerUnit,
    from_id: &str,
    to_id: &str,
) -> Result<(Option<Account>, Option<Account>), LedgerError> {
    if from_id == to_id {
        let acct = unit.lock_account(from_id).await?;
        return Ok((acct.clone(), acct));
    }

    let (first, second) = if from_id < to_id {
        (from_id, to_id)
    } else {
        (to_id, from_id)
    };
    let first_acct = unit.lock_account(first).await?;
    let second_acct = unit.lock_account(second).await?;

    if first == from_id {
        Ok((first_acct, second_acct))
    } else {
        Ok((second_acct, first_acct))
    }
}

async fn abort(unit: Box<dyn LedgerUnit>, cause: &LedgerError) {
    if cause.is_validation() {
        debug!(error = %cause, "Ledger write rejected");
    } else {
        warn!(error = %cause, "Ledger write failed, rolling back");
    }
    if let Err(e) = unit.rollback().await {
        error!(error = %e, "Rollback failed");
    }
}
