//! PostgreSQL schema for the ledger tables

use sqlx::PgPool;

pub const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id                TEXT PRIMARY KEY,
    account_number    TEXT UNIQUE,
    customer_id       TEXT,
    type              TEXT NOT NULL DEFAULT 'checking',
    currency          TEXT NOT NULL DEFAULT 'USD',
    balance           NUMERIC NOT NULL DEFAULT 0,
    frozen            BOOLEAN NOT NULL DEFAULT FALSE,
    freeze_reason     TEXT,
    parent_account_id TEXT REFERENCES accounts(id),
    created_at        TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

pub const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id                 TEXT PRIMARY KEY,
    account_id         TEXT NOT NULL REFERENCES accounts(id),
    user_id            TEXT,
    amount             NUMERIC NOT NULL,
    type               TEXT NOT NULL,
    description        TEXT NOT NULL DEFAULT '',
    related_account_id TEXT,
    created_at         TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

pub const CREATE_TRANSACTIONS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_transactions_account_created
    ON transactions (account_id, created_at DESC)
"#;

pub const CREATE_ACCOUNTS_CUSTOMER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_accounts_customer ON accounts (customer_id)
"#;

/// Serializes concurrent migrations across processes
const MIGRATION_LOCK_KEY: i64 = 0x4c45_4447_4552;

/// Create the ledger tables if they do not exist yet
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Initializing ledger schema...");

    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    for (name, ddl) in [
        ("accounts", CREATE_ACCOUNTS_TABLE),
        ("transactions", CREATE_TRANSACTIONS_TABLE),
        ("idx_transactions_account_created", CREATE_TRANSACTIONS_INDEX),
        ("idx_accounts_customer", CREATE_ACCOUNTS_CUSTOMER_INDEX),
    ] {
        sqlx::query(ddl).execute(&mut *tx).await.inspect_err(|e| {
            tracing::error!(object = name, error = %e, "Schema statement failed");
        })?;
    }
    tx.commit().await?;

    tracing::info!("Ledger schema ready");
    Ok(())
}
