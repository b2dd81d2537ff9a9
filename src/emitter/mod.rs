//! Realtime Event Emitter
//!
//! Best-effort delivery of "transaction happened" and "balance changed"
//! notifications to the realtime service.
//!
//! # Flow
//!
//! ```text
//! TransferCoordinator ──publish──▶ EmitterHandle ──mpsc──▶ DispatchWorker ──HTTP──▶ realtime
//!      (after commit)              (never blocks)          (retry/backoff)
//! ```
//!
//! Delivery failures stop at the worker and are only logged; they never
//! reach the ledger operation that produced the event.

pub mod client;
pub mod dispatcher;
pub mod event;
pub mod retry;

pub use client::{Delivery, EmitError, EventTransport, INTERNAL_KEY_HEADER, RealtimeClient};
pub use dispatcher::{DispatchStats, DispatchWorker, EmitterHandle, dispatch_channel, spawn_dispatcher};
pub use event::{BALANCE_PATH, EventSink, LedgerEvent, NoopSink, TRANSACTION_PATH};
pub use retry::{Disposition, RetryPolicy};
