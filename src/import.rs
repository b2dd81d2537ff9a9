//! File store to PostgreSQL import
//!
//! Copies every account and entry of a file document into the relational
//! backend. Rows already present (by id) are left alone, so the import can
//! be re-run safely. A row that fails to insert is logged and skipped.
//!
//! Parents are inserted before their sub-accounts so the
//! `parent_account_id` foreign key holds, and rows without an account
//! number get their id as the number.

use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::account::Account;
use crate::error::LedgerError;
use crate::store::{FileLedgerStore, LedgerStore, PgLedgerStore};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub accounts_inserted: usize,
    pub accounts_existing: usize,
    pub entries_inserted: usize,
    pub entries_existing: usize,
    pub failed: usize,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.accounts_inserted
            + self.accounts_existing
            + self.entries_inserted
            + self.entries_existing
            + self.failed
    }
}

/// Order accounts so every parent precedes its sub-accounts
///
/// Parents absent from the document, and cycles, keep document order.
fn parents_first(accounts: &[Account]) -> Vec<&Account> {
    let known: HashSet<&str> = accounts.iter().map(|a| a.id.as_str()).collect();
    let mut placed: HashSet<&str> = HashSet::with_capacity(accounts.len());
    let mut ordered = Vec::with_capacity(accounts.len());
    let mut pending: Vec<&Account> = accounts.iter().collect();

    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|a| {
            let acct = *a;
            let ready = match acct.parent_account_id.as_deref() {
                Some(parent) => {
                    parent == acct.id || !known.contains(parent) || placed.contains(parent)
                }
                None => true,
            };
            if ready {
                placed.insert(acct.id.as_str());
                ordered.push(acct);
            }
            !ready
        });
        if pending.len() == before {
            warn!(count = pending.len(), "Cyclic parent links, importing in document order");
            ordered.append(&mut pending);
        }
    }
    ordered
}

fn import_row(account: &Account) -> Account {
    let mut row = account.clone();
    if row.account_number.is_none() {
        row.account_number = Some(row.id.clone());
    }
    row
}

pub async fn import_file_store(
    source: &FileLedgerStore,
    target: &PgLedgerStore,
) -> Result<ImportReport, LedgerError> {
    let doc = source.snapshot().await?;
    let mut report = ImportReport::default();

    info!(
        path = %source.path().display(),
        accounts = doc.accounts.len(),
        entries = doc.transactions.len(),
        "Importing file store"
    );

    for account in parents_first(&doc.accounts) {
        match target.insert_account(&import_row(account)).await {
            Ok(true) => report.accounts_inserted += 1,
            Ok(false) => report.accounts_existing += 1,
            Err(e) => {
                report.failed += 1;
                warn!(account_id = %account.id, error = %e, "Account import failed");
            }
        }
    }

    for entry in &doc.transactions {
        match target.import_entry(entry).await {
            Ok(true) => report.entries_inserted += 1,
            Ok(false) => report.entries_existing += 1,
            Err(e) => {
                report.failed += 1;
                warn!(entry_id = %entry.id, account_id = %entry.account_id, error = %e, "Entry import failed");
            }
        }
    }

    info!(?report, "Import finished");
    Ok(report)
}
