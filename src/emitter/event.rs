//! Ledger events and the sink seam

use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::Entry;

pub const TRANSACTION_PATH: &str = "/internal/emit/transaction";
pub const BALANCE_PATH: &str = "/internal/emit/balance";

/// Notification produced by a committed ledger write
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    Transaction { user_id: String, transaction: Entry },
    Balance { account_id: String, balance: Decimal },
}

/// Body of `POST /internal/emit/transaction`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload<'a> {
    pub user_id: &'a str,
    pub transaction: &'a Entry,
}

/// Body of `POST /internal/emit/balance`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancePayload<'a> {
    pub account_id: &'a str,
    pub balance: Decimal,
}

impl LedgerEvent {
    /// Transaction event addressed to the entry's acting user
    ///
    /// Entries without a user fall back to the account id.
    pub fn transaction(entry: &Entry) -> Self {
        LedgerEvent::Transaction {
            user_id: entry
                .user_id
                .clone()
                .unwrap_or_else(|| entry.account_id.clone()),
            transaction: entry.clone(),
        }
    }

    pub fn balance(account_id: impl Into<String>, balance: Decimal) -> Self {
        LedgerEvent::Balance {
            account_id: account_id.into(),
            balance,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            LedgerEvent::Transaction { .. } => TRANSACTION_PATH,
            LedgerEvent::Balance { .. } => BALANCE_PATH,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::Transaction { .. } => "transaction",
            LedgerEvent::Balance { .. } => "balance",
        }
    }
}

/// Where committed writes announce themselves
///
/// `publish` must return promptly and never fail the caller; delivery
/// problems are the sink's to log.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: LedgerEvent);
}

/// Sink that drops everything (realtime delivery disabled)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, event: LedgerEvent) {
        tracing::trace!(kind = event.kind(), "Realtime delivery disabled, event dropped");
    }
}
