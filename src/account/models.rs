//! Account data models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Account kind
///
/// Kinds this crate does not know are carried verbatim in `Other`, so a
/// document written by another tool stays readable and is written back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountType {
    #[default]
    Checking,
    Savings,
    /// Child account hanging off a parent via `parent_account_id`
    Sub,
    Other(String),
}

impl AccountType {
    pub fn as_str(&self) -> &str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::Sub => "sub",
            AccountType::Other(raw) => raw,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for AccountType {
    fn from(raw: String) -> Self {
        match raw.to_lowercase().as_str() {
            "checking" => AccountType::Checking,
            "savings" => AccountType::Savings,
            "sub" => AccountType::Sub,
            _ => AccountType::Other(raw),
        }
    }
}

impl From<&str> for AccountType {
    fn from(raw: &str) -> Self {
        AccountType::from(raw.to_string())
    }
}

impl From<AccountType> for String {
    fn from(kind: AccountType) -> Self {
        match kind {
            AccountType::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

/// A ledger account
///
/// `balance` always equals the sum of the account's entries once
/// recalculated; transfers keep it in step incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    /// Externally presentable number; lookups fall back to `id` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(rename = "type", default)]
    pub account_type: AccountType,
    /// ISO code, informational only
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub balance: Decimal,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeze_reason: Option<String>,
    #[serde(default)]
    pub parent_account_id: Option<String>,
    /// Absent on rows imported without a timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Row fields this crate does not model, kept across rewrites
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Account {
    /// Create an open, empty account
    pub fn new(id: impl Into<String>, customer_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            account_number: None,
            customer_id: Some(customer_id.into()),
            account_type: AccountType::Checking,
            currency: default_currency(),
            balance: Decimal::ZERO,
            frozen: false,
            freeze_reason: None,
            parent_account_id: None,
            created_at: Some(Utc::now()),
            extra: Map::new(),
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.account_number = Some(number.into());
        self
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_type(mut self, account_type: AccountType) -> Self {
        self.account_type = account_type;
        self
    }

    /// Externally presentable identifier
    pub fn number(&self) -> &str {
        self.account_number.as_deref().unwrap_or(&self.id)
    }

    /// True if `identifier` names this account by id or account number
    pub fn matches(&self, identifier: &str) -> bool {
        self.id == identifier || self.account_number.as_deref() == Some(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_id_or_number() {
        let acct = Account::new("a_1", "c_1").with_number("1000000001");
        assert!(acct.matches("a_1"));
        assert!(acct.matches("1000000001"));
        assert!(!acct.matches("a_2"));
        assert_eq!(acct.number(), "1000000001");
    }

    #[test]
    fn test_number_falls_back_to_id() {
        let acct = Account::new("a_1", "c_1");
        assert_eq!(acct.number(), "a_1");
    }

    #[test]
    fn test_deserialize_sparse_document_row() {
        // Rows written by older tools carry float balances and no number
        let raw = r#"{"id":"a_3","customerId":"c_2","type":"checking","balance":75.25,"currency":"USD","frozen":false}"#;
        let acct: Account = serde_json::from_str(raw).unwrap();
        assert_eq!(acct.balance, Decimal::new(7525, 2));
        assert_eq!(acct.account_number, None);
        assert_eq!(acct.account_type, AccountType::Checking);
    }

    #[test]
    fn test_account_type_keeps_unknown_kind() {
        assert_eq!(AccountType::from("Savings"), AccountType::Savings);
        assert_eq!(
            AccountType::from("business"),
            AccountType::Other("business".to_string())
        );

        let raw = r#"{"id":"a_4","type":"business","balance":"10.00"}"#;
        let acct: Account = serde_json::from_str(raw).unwrap();
        assert_eq!(acct.account_type.as_str(), "business");
        let value = serde_json::to_value(&acct).unwrap();
        assert_eq!(value["type"], "business");
    }

    #[test]
    fn test_unmodelled_fields_round_trip() {
        let raw = r#"{"id":"a_5","balance":"1.00","frozenAt":"2024-03-01T00:00:00Z","label":"rainy day"}"#;
        let acct: Account = serde_json::from_str(raw).unwrap();
        assert_eq!(acct.created_at, None);
        assert_eq!(acct.extra["label"], "rainy day");

        let value = serde_json::to_value(&acct).unwrap();
        assert_eq!(value["frozenAt"], "2024-03-01T00:00:00Z");
        assert_eq!(value["label"], "rainy day");
        assert!(value.get("createdAt").is_none());
    }
}
