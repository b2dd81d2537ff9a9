//! Ledger entry models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Direction of an entry
///
/// Unknown directions read from a document are kept in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntryType {
    Debit,
    #[default]
    Credit,
    Other(String),
}

impl EntryType {
    pub fn as_str(&self) -> &str {
        match self {
            EntryType::Debit => "debit",
            EntryType::Credit => "credit",
            EntryType::Other(raw) => raw,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EntryType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "debit" => EntryType::Debit,
            "credit" => EntryType::Credit,
            _ => EntryType::Other(raw),
        }
    }
}

impl From<&str> for EntryType {
    fn from(raw: &str) -> Self {
        EntryType::from(raw.to_string())
    }
}

impl From<EntryType> for String {
    fn from(kind: EntryType) -> Self {
        match kind {
            EntryType::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Generate a fresh entry id
///
/// ULID-based: unique per leg and sortable by creation time.
pub fn new_entry_id() -> String {
    format!("tx_{}", ulid::Ulid::new())
}

/// One immutable debit or credit against a single account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub account_id: String,
    /// Acting party; the account owner unless the caller names someone else
    #[serde(default)]
    pub user_id: Option<String>,
    /// Negative for debits, positive for credits
    pub amount: Decimal,
    #[serde(rename = "type", default)]
    pub entry_type: EntryType,
    #[serde(default)]
    pub description: String,
    /// Account on the other leg of a transfer
    #[serde(default)]
    pub related_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Caller input for a single-sided write
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    /// Account id or account number
    pub account: String,
    pub user_id: Option<String>,
    pub amount: Decimal,
    pub entry_type: EntryType,
    pub description: Option<String>,
    pub related_account_id: Option<String>,
}

impl EntryDraft {
    /// Credit draft with no description or back-link
    pub fn credit(account: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account: account.into(),
            user_id: None,
            amount,
            entry_type: EntryType::Credit,
            description: None,
            related_account_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_type(mut self, entry_type: EntryType) -> Self {
        self.entry_type = entry_type;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_related(mut self, account_id: impl Into<String>) -> Self {
        self.related_account_id = Some(account_id.into());
        self
    }
}

/// Both legs of a committed transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferLegs {
    pub debit: Entry,
    pub credit: Entry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_ids_unique() {
        let a = new_entry_id();
        let b = new_entry_id();
        assert_ne!(a, b);
        assert!(a.starts_with("tx_"));
    }

    #[test]
    fn test_entry_wire_shape() {
        let entry = Entry {
            id: "tx_1".into(),
            account_id: "a_1".into(),
            user_id: Some("c_1".into()),
            amount: Decimal::new(-3000, 2),
            entry_type: EntryType::Debit,
            description: "rent".into(),
            related_account_id: Some("a_2".into()),
            created_at: Some(Utc::now()),
            extra: Map::new(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "debit");
        assert_eq!(value["accountId"], "a_1");
        assert_eq!(value["relatedAccountId"], "a_2");
        assert_eq!(value["amount"], "-30.00");
    }

    #[test]
    fn test_entry_type_keeps_unknown_direction() {
        assert_eq!(EntryType::from("debit"), EntryType::Debit);
        assert_eq!(EntryType::from("refund"), EntryType::Other("refund".to_string()));

        let raw = r#"{"id":"tx_9","accountId":"a_1","amount":"5.00","type":"refund","memo":"x"}"#;
        let entry: Entry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.created_at, None);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "refund");
        assert_eq!(value["memo"], "x");
        assert!(value.get("createdAt").is_none());
    }
}
