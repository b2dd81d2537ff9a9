//! PostgreSQL backend; skipped unless DATABASE_URL points at a live server

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FailingStore, RecordingSink, dec};
use futures::future::join_all;
use ledger_core::{
    Account, AccountService, AccountType, Database, FileLedgerStore, LedgerError, LedgerStore,
    PgLedgerStore, TransferCoordinator, import_file_store,
};
use rust_decimal::Decimal;

async fn connect() -> Option<Arc<PgLedgerStore>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let db = match tokio::time::timeout(Duration::from_secs(5), Database::connect(&url)).await {
        Ok(Ok(db)) => db,
        _ => {
            eprintln!("PostgreSQL unreachable, skipping");
            return None;
        }
    };
    db.health_check().await.unwrap();
    db.migrate().await.unwrap();
    Some(Arc::new(PgLedgerStore::new(db.pool().clone())))
}

/// Fresh ids per run so tests can share one database
fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, ulid::Ulid::new())
}

async fn seed(store: &PgLedgerStore, balance: &str) -> Account {
    let id = unique("acct");
    let acct = Account::new(id.clone(), unique("cust"))
        .with_number(unique("num"))
        .with_balance(dec(balance));
    assert!(store.insert_account(&acct).await.unwrap());
    acct
}

#[tokio::test]
async fn pg_transfer_and_recalculate() {
    let Some(store) = connect().await else { return };
    let a = seed(&store, "100").await;
    let b = seed(&store, "0").await;
    let t = TransferCoordinator::new(store.clone(), Arc::new(RecordingSink::default()));

    let legs = t
        .transfer(a.number(), &b.id, dec("30"), None)
        .await
        .unwrap();
    assert_eq!(legs.debit.account_id, a.id);

    assert_eq!(store.find_account(&a.id).await.unwrap().unwrap().balance, dec("70"));
    assert_eq!(store.find_account(&b.id).await.unwrap().unwrap().balance, dec("30"));
    assert_eq!(store.sum_entries(&b.id).await.unwrap(), dec("30"));
    assert_eq!(store.list_entries(Some(&a.id)).await.unwrap().len(), 1);

    // Seeded balance had no entries behind it; recalculation trusts the ledger
    let accounts = AccountService::new(store.clone());
    assert_eq!(accounts.recalculate_balance(&a.id).await.unwrap(), dec("-30"));
}

#[tokio::test]
async fn pg_failure_between_legs_rolls_back() {
    let Some(store) = connect().await else { return };
    let a = seed(&store, "100").await;
    let b = seed(&store, "0").await;
    let failing = Arc::new(FailingStore::new(store.clone(), 2));
    let t = TransferCoordinator::new(failing, Arc::new(RecordingSink::default()));

    let err = t.transfer(&a.id, &b.id, dec("30"), None).await.unwrap_err();
    assert!(matches!(err, LedgerError::Storage(_)));

    assert_eq!(store.find_account(&a.id).await.unwrap().unwrap().balance, dec("100"));
    assert_eq!(store.find_account(&b.id).await.unwrap().unwrap().balance, Decimal::ZERO);
    assert!(store.list_entries(Some(&a.id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn pg_concurrent_reversed_transfers_do_not_deadlock() {
    let Some(store) = connect().await else { return };
    let a = seed(&store, "500").await;
    let b = seed(&store, "500").await;
    let t = Arc::new(TransferCoordinator::new(
        store.clone(),
        Arc::new(RecordingSink::default()),
    ));

    let tasks = (0..16).map(|i| {
        let t = t.clone();
        let (from, to) = if i % 2 == 0 {
            (a.id.clone(), b.number().to_string())
        } else {
            (b.id.clone(), a.number().to_string())
        };
        tokio::spawn(async move { t.transfer(&from, &to, dec("5"), None).await })
    });
    let results = tokio::time::timeout(Duration::from_secs(30), join_all(tasks))
        .await
        .expect("transfers deadlocked");
    for r in results {
        r.unwrap().unwrap();
    }

    let total = store.find_account(&a.id).await.unwrap().unwrap().balance
        + store.find_account(&b.id).await.unwrap().unwrap().balance;
    assert_eq!(total, dec("1000"));
}

#[tokio::test]
async fn pg_freeze_round_trip() {
    let Some(store) = connect().await else { return };
    let a = seed(&store, "0").await;
    let accounts = AccountService::new(store.clone());

    let frozen = accounts.freeze(a.number(), Some("kyc")).await.unwrap();
    assert!(frozen.frozen);
    assert_eq!(frozen.freeze_reason.as_deref(), Some("kyc"));
    assert!(!accounts.unfreeze(&a.id).await.unwrap().frozen);
    assert_eq!(
        accounts.freeze(&unique("ghost"), None).await.unwrap_err(),
        LedgerError::AccountNotFound
    );
}

#[tokio::test]
async fn pg_unknown_type_and_missing_timestamp() {
    let Some(store) = connect().await else { return };
    let mut acct = Account::new(unique("acct"), unique("cust"))
        .with_type(AccountType::Other("business".to_string()));
    acct.created_at = None;
    assert!(store.insert_account(&acct).await.unwrap());

    let loaded = store.find_account(&acct.id).await.unwrap().unwrap();
    assert_eq!(loaded.account_type.as_str(), "business");
    assert!(loaded.created_at.is_some());
}

#[tokio::test]
async fn pg_import_places_parents_first() {
    let Some(store) = connect().await else { return };
    let parent = unique("acct");
    let child = unique("acct");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let doc = serde_json::json!({
        "accounts": [
            {"id": child, "customerId": "c_1", "type": "sub", "balance": 5, "parentAccountId": parent},
            {"id": parent, "customerId": "c_1", "type": "checking", "balance": 0},
        ],
        "transactions": [
            {"id": unique("tx"), "accountId": child, "amount": 5, "type": "credit"},
        ],
    });
    std::fs::write(&path, doc.to_string()).unwrap();

    let source = FileLedgerStore::open(&path).await.unwrap();
    let report = import_file_store(&source, &store).await.unwrap();
    assert_eq!(report.accounts_inserted, 2);
    assert_eq!(report.entries_inserted, 1);
    assert_eq!(report.failed, 0);

    let imported = store.find_account(&child).await.unwrap().unwrap();
    assert_eq!(imported.account_number.as_deref(), Some(child.as_str()));
    assert_eq!(imported.parent_account_id.as_deref(), Some(parent.as_str()));
    assert_eq!(store.sum_entries(&child).await.unwrap(), dec("5"));
}
