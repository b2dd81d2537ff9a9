//! Account Store
//!
//! Accounts and the administrative operations on them. Balance mutations
//! belong to the transfer coordinator; this module only reads balances,
//! repairs them from the ledger and toggles the frozen flag.

pub mod models;
pub mod service;

pub use models::{Account, AccountType};
pub use service::AccountService;
