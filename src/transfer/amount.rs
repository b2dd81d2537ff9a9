//! Amount parsing and deposit metadata

use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

use crate::error::LedgerError;

/// Source recorded when a deposit names none
pub const DEFAULT_DEPOSIT_SOURCE: &str = "external_bank";

/// Retail location that accepts cash deposits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DepositLocation {
    pub id: &'static str,
    pub name: &'static str,
}

pub const DEPOSIT_LOCATIONS: &[DepositLocation] = &[
    DepositLocation {
        id: "walgreens",
        name: "Walgreens",
    },
    DepositLocation {
        id: "publix",
        name: "Publix",
    },
    DepositLocation {
        id: "walmart",
        name: "Walmart",
    },
    DepositLocation {
        id: "cvs",
        name: "CVS",
    },
    DepositLocation {
        id: "7eleven",
        name: "7-Eleven",
    },
];

/// Look up a location by id, ignoring case
pub fn deposit_location(id: &str) -> Option<&'static DepositLocation> {
    DEPOSIT_LOCATIONS
        .iter()
        .find(|l| l.id.eq_ignore_ascii_case(id))
}

/// Parse caller input into a strictly positive amount
///
/// Accepts plain (`"12.50"`) and scientific (`"1.25e1"`) notation.
pub fn parse_amount(text: &str) -> Result<Decimal, LedgerError> {
    let text = text.trim();
    let amount = Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| LedgerError::InvalidAmount)?;
    positive(amount)
}

fn positive(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(amount)
}
