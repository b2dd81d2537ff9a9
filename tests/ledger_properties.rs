//! Balance invariants under arbitrary operation sequences

mod common;

use std::sync::Arc;

use common::{RecordingSink, account, balance_of, file_store};
use ledger_core::{
    AccountService, EntryDraft, EntryType, LedgerError, LedgerStore, TransferCoordinator,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

const IDS: [&str; 3] = ["A", "B", "C"];

#[derive(Debug, Clone)]
enum Op {
    Transfer { from: usize, to: usize, cents: i64 },
    Deposit { to: usize, cents: i64 },
    Adjust { on: usize, cents: i64 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3usize, 0..3usize, -500i64..20_000).prop_map(|(from, to, cents)| Op::Transfer {
            from,
            to,
            cents
        }),
        (0..3usize, 1i64..50_000).prop_map(|(to, cents)| Op::Deposit { to, cents }),
        (0..3usize, -5_000i64..5_000).prop_map(|(on, cents)| Op::Adjust { on, cents }),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 48,
        ..ProptestConfig::default()
    })]

    /// After any sequence of operations, succeeded or rejected, every stored
    /// balance equals the sum of its entries.
    #[test]
    fn recalculation_agrees_with_stored_balance(ops in prop::collection::vec(op(), 1..25)) {
        runtime().block_on(async {
            let (_dir, store) = file_store(&[
                account("A", "c_a", "0"),
                account("B", "c_b", "0"),
                account("C", "c_c", "0"),
            ])
            .await;
            let t = TransferCoordinator::new(store.clone(), Arc::new(RecordingSink::default()));
            let mut external = Decimal::ZERO;

            for op in ops {
                match op {
                    Op::Transfer { from, to, cents } => {
                        let _ = t.transfer(IDS[from], IDS[to], Decimal::new(cents, 2), None).await;
                    }
                    Op::Deposit { to, cents } => {
                        let amount = Decimal::new(cents, 2);
                        t.direct_deposit(IDS[to], amount, None, None).await.unwrap();
                        external += amount;
                    }
                    Op::Adjust { on, cents } => {
                        let amount = Decimal::new(cents, 2);
                        let entry_type = if cents < 0 { EntryType::Debit } else { EntryType::Credit };
                        t.create_entry(EntryDraft::credit(IDS[on], amount).with_type(entry_type))
                            .await
                            .unwrap();
                        external += amount;
                    }
                }
            }

            let accounts = AccountService::new(store.clone());
            let mut total = Decimal::ZERO;
            for id in IDS {
                let stored = balance_of(store.as_ref(), id).await;
                assert_eq!(accounts.recalculate_balance(id).await.unwrap(), stored);
                total += stored;
            }
            // Transfers only move money around
            assert_eq!(total, external);
        });
    }

    /// Rejected transfers never touch balances or the ledger.
    #[test]
    fn rejected_transfers_leave_no_trace(
        balance_cents in 0i64..100_000,
        amount_cents in -100_000i64..200_000,
        freeze_from in any::<bool>(),
        freeze_to in any::<bool>(),
    ) {
        runtime().block_on(async {
            let balance = Decimal::new(balance_cents, 2);
            let amount = Decimal::new(amount_cents, 2);
            let mut from = account("A", "c_a", "0").with_balance(balance);
            from.frozen = freeze_from;
            let mut to = account("B", "c_b", "0");
            to.frozen = freeze_to;
            let (_dir, store) = file_store(&[from, to]).await;
            let t = TransferCoordinator::new(store.clone(), Arc::new(RecordingSink::default()));

            let expected = if freeze_from {
                Some(LedgerError::FromAccountFrozen)
            } else if freeze_to {
                Some(LedgerError::ToAccountFrozen)
            } else if amount <= Decimal::ZERO {
                Some(LedgerError::InvalidAmount)
            } else if balance < amount {
                Some(LedgerError::InsufficientFunds)
            } else {
                None
            };

            let result = t.transfer("A", "B", amount, None).await;
            match expected {
                Some(err) => {
                    assert_eq!(result.unwrap_err(), err);
                    assert_eq!(balance_of(store.as_ref(), "A").await, balance);
                    assert_eq!(balance_of(store.as_ref(), "B").await, Decimal::ZERO);
                    assert!(store.list_entries(None).await.unwrap().is_empty());
                }
                None => {
                    result.unwrap();
                    assert_eq!(balance_of(store.as_ref(), "A").await, balance - amount);
                    assert_eq!(balance_of(store.as_ref(), "B").await, amount);
                }
            }
        });
    }
}
