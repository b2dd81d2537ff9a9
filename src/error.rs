//! Ledger Error Types
//!
//! The closed set of failures a ledger operation can produce. Callers switch
//! on the variant (or on [`LedgerError::code`]) instead of matching strings.

use thiserror::Error;

/// Ledger error kinds
///
/// Codes are the stable snake_case discriminants exposed to the HTTP layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // === Lookup Errors ===
    #[error("Account not found")]
    AccountNotFound,

    #[error("Source account not found")]
    FromAccountNotFound,

    #[error("Destination account not found")]
    ToAccountNotFound,

    #[error("Recipient has no account")]
    RecipientNoAccount,

    // === Account State Errors ===
    #[error("Source account is frozen")]
    FromAccountFrozen,

    #[error("Destination account is frozen")]
    ToAccountFrozen,

    // === Amount Errors ===
    #[error("Amount must be a positive number")]
    InvalidAmount,

    #[error("Insufficient funds")]
    InsufficientFunds,

    // === Collaborator Errors ===
    /// Raised by customer onboarding, never by the ledger itself.
    #[error("Customer already exists")]
    CustomerExists,

    /// Raised by the payment-processor integration.
    #[error("Unit API error ({status}): {body}")]
    UnitApi { status: u16, body: String },

    // === System Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::AccountNotFound => "account_not_found",
            LedgerError::FromAccountNotFound => "from_account_not_found",
            LedgerError::ToAccountNotFound => "to_account_not_found",
            LedgerError::RecipientNoAccount => "recipient_no_account",
            LedgerError::FromAccountFrozen => "from_account_frozen",
            LedgerError::ToAccountFrozen => "to_account_frozen",
            LedgerError::InvalidAmount => "invalid_amount",
            LedgerError::InsufficientFunds => "insufficient_funds",
            LedgerError::CustomerExists => "customer_exists",
            LedgerError::UnitApi { .. } => "unit_api_error",
            LedgerError::Database(_) => "database_error",
            LedgerError::Storage(_) => "storage_error",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::InvalidAmount | LedgerError::InsufficientFunds => 400,
            LedgerError::AccountNotFound
            | LedgerError::FromAccountNotFound
            | LedgerError::ToAccountNotFound
            | LedgerError::RecipientNoAccount => 404,
            LedgerError::FromAccountFrozen | LedgerError::ToAccountFrozen => 403,
            LedgerError::CustomerExists => 409,
            LedgerError::UnitApi { status, .. } => *status,
            LedgerError::Database(_) | LedgerError::Storage(_) => 500,
        }
    }

    /// True for failures caused by the request rather than the system
    pub fn is_validation(&self) -> bool {
        !matches!(self, LedgerError::Database(_) | LedgerError::Storage(_))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Database(e.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Storage(format!("invalid store document: {}", e))
    }
}
