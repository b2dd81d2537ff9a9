//! Transfer Coordinator
//!
//! Every balance mutation in the system goes through here.
//!
//! # Transfer Flow
//!
//! ```text
//! resolve ids ─▶ begin unit ─▶ lock (ascending id) ─▶ validate ─▶ write legs ─▶ commit ─▶ publish
//!                                                          │              │
//!                                                          └── rollback ◀─┘
//! ```
//!
//! # Guarantees
//!
//! 1. **All or nothing**: both balance updates and both entries land in one
//!    unit of work, or none of them do
//! 2. **No deadlock**: accounts are locked in ascending canonical-id order,
//!    whichever direction the transfer runs
//! 3. **Events after commit**: publishing never blocks and can never undo a
//!    committed write

pub mod amount;
pub mod coordinator;

pub use amount::{
    DEFAULT_DEPOSIT_SOURCE, DEPOSIT_LOCATIONS, DepositLocation, deposit_location,
    parse_amount,
};
pub use coordinator::TransferCoordinator;
