//! PostgreSQL Ledger Store
//!
//! A unit of work is one SQL transaction. `lock_account` takes a row lock
//! (`SELECT ... FOR UPDATE`) that is held until commit or rollback, so two
//! transfers touching the same account serialize while disjoint pairs run
//! in parallel.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::{LedgerStore, LedgerUnit, PageRequest};
use crate::account::{Account, AccountType};
use crate::error::LedgerError;
use crate::ledger::{Entry, EntryType};

const ACCOUNT_COLUMNS: &str = "id, account_number, customer_id, type, currency, balance, \
     frozen, freeze_reason, parent_account_id, created_at";

const ENTRY_COLUMNS: &str =
    "id, account_id, user_id, amount, type, description, related_account_id, created_at";

fn row_to_account(row: &PgRow) -> Result<Account, LedgerError> {
    let type_str: String = row.try_get("type")?;
    let account_type = AccountType::from(type_str);

    Ok(Account {
        id: row.try_get("id")?,
        account_number: row.try_get("account_number")?,
        customer_id: row.try_get("customer_id")?,
        account_type,
        currency: row.try_get("currency")?,
        balance: row.try_get("balance")?,
        frozen: row.try_get("frozen")?,
        freeze_reason: row.try_get("freeze_reason")?,
        parent_account_id: row.try_get("parent_account_id")?,
        created_at: row.try_get("created_at")?,
        extra: Default::default(),
    })
}

fn row_to_entry(row: &PgRow) -> Result<Entry, LedgerError> {
    let type_str: String = row.try_get("type")?;
    let entry_type = EntryType::from(type_str);

    Ok(Entry {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        user_id: row.try_get("user_id")?,
        amount: row.try_get("amount")?,
        entry_type,
        description: row.try_get("description")?,
        related_account_id: row.try_get("related_account_id")?,
        created_at: row.try_get("created_at")?,
        extra: Default::default(),
    })
}

/// PostgreSQL-backed ledger store
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert an entry verbatim, keeping its id and timestamp
    ///
    /// Used when importing history. Returns false if the id already exists.
    /// Balances are not touched.
    pub async fn import_entry(&self, entry: &Entry) -> Result<bool, LedgerError> {
        let result = sqlx::query(
            r#"
            INSERT INTO transactions
                (id, account_id, user_id, amount, type, description, related_account_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW()))
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.account_id)
        .bind(&entry.user_id)
        .bind(entry.amount)
        .bind(entry.entry_type.as_str())
        .bind(&entry.description)
        .bind(&entry.related_account_id)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<Box<dyn LedgerUnit>, LedgerError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnit { tx }))
    }

    async fn find_account(&self, identifier: &str) -> Result<Option<Account>, LedgerError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 OR account_number = $1 LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn find_account_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Account>, LedgerError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE customer_id = $1 \
             ORDER BY created_at ASC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn insert_account(&self, account: &Account) -> Result<bool, LedgerError> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts
                (id, account_number, customer_id, type, currency, balance, frozen,
                 freeze_reason, parent_account_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, NOW()))
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&account.id)
        .bind(&account.account_number)
        .bind(&account.customer_id)
        .bind(account.account_type.as_str())
        .bind(&account.currency)
        .bind(account.balance)
        .bind(account.frozen)
        .bind(&account.freeze_reason)
        .bind(&account.parent_account_id)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_frozen(
        &self,
        identifier: &str,
        frozen: bool,
        reason: Option<&str>,
    ) -> Result<Account, LedgerError> {
        let sql = format!(
            "UPDATE accounts SET frozen = $2, freeze_reason = $3 \
             WHERE id = $1 OR account_number = $1 RETURNING {ACCOUNT_COLUMNS}"
        );
        let reason = if frozen { reason } else { None };
        let row = sqlx::query(&sql)
            .bind(identifier)
            .bind(frozen)
            .bind(reason)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::AccountNotFound)?;

        row_to_account(&row)
    }

    async fn list_entries(&self, account_id: Option<&str>) -> Result<Vec<Entry>, LedgerError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM transactions \
             WHERE ($1::TEXT IS NULL OR account_id = $1) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn list_entries_page(
        &self,
        account_id: Option<&str>,
        page: PageRequest,
    ) -> Result<Vec<Entry>, LedgerError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM transactions \
             WHERE ($1::TEXT IS NULL OR account_id = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(account_id)
            .bind(page.limit as i64)
            .bind(page.offset as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn sum_entries(&self, account_id: &str) -> Result<Decimal, LedgerError> {
        let sum: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum)
    }

    async fn recalculate_balance(&self, account_id: &str) -> Result<Decimal, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let canonical: Option<String> = sqlx::query_scalar(
            "SELECT id FROM accounts WHERE id = $1 OR account_number = $1 LIMIT 1 FOR UPDATE",
        )
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?;

        let target = canonical.as_deref().unwrap_or(account_id);
        let sum: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE account_id = $1",
        )
        .bind(target)
        .fetch_one(&mut *tx)
        .await?;

        if canonical.is_some() {
            sqlx::query("UPDATE accounts SET balance = $1 WHERE id = $2")
                .bind(sum)
                .bind(target)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(sum)
    }
}

/// One SQL transaction; dropping it without commit rolls back
struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerUnit for PgUnit {
    async fn lock_account(&mut self, identifier: &str) -> Result<Option<Account>, LedgerError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE id = $1 OR account_number = $1 LIMIT 1 FOR UPDATE"
        );
        let row = sqlx::query(&sql)
            .bind(identifier)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn update_balance(
        &mut self,
        account_id: &str,
        new_balance: Decimal,
    ) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE accounts SET balance = $1 WHERE id = $2")
            .bind(new_balance)
            .bind(account_id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::AccountNotFound);
        }
        Ok(())
    }

    async fn append_entry(&mut self, entry: &Entry) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, account_id, user_id, amount, type, description, related_account_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW()))
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.account_id)
        .bind(&entry.user_id)
        .bind(entry.amount)
        .bind(entry.entry_type.as_str())
        .bind(&entry.description)
        .bind(&entry.related_account_id)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
