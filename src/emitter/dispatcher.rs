//! Event Dispatcher
//!
//! Decouples ledger writes from realtime delivery. Producers enqueue into a
//! bounded channel through [`EmitterHandle`] without waiting; a single
//! background worker drains it in order and delivers each event through an
//! [`EventTransport`], logging whatever fails.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::client::{EmitError, EventTransport};
use super::event::{EventSink, LedgerEvent};

/// Producer side, cheap to clone
#[derive(Clone)]
pub struct EmitterHandle {
    tx: mpsc::Sender<LedgerEvent>,
}

impl EventSink for EmitterHandle {
    fn publish(&self, event: LedgerEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(kind = event.kind(), "Realtime queue full, event dropped");
            }
            Err(TrySendError::Closed(event)) => {
                error!(kind = event.kind(), "Realtime dispatcher stopped, event dropped");
            }
        }
    }
}

/// Counters reported when the worker exits
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Consumer side
pub struct DispatchWorker {
    rx: mpsc::Receiver<LedgerEvent>,
    transport: Arc<dyn EventTransport>,
    stats: DispatchStats,
}

impl DispatchWorker {
    /// Drain the queue until every handle is dropped
    pub async fn run(mut self) -> DispatchStats {
        info!("Realtime dispatcher started");

        while let Some(event) = self.rx.recv().await {
            match self.transport.deliver(&event).await {
                Ok(delivery) => {
                    self.stats.delivered += 1;
                    debug!(
                        kind = event.kind(),
                        attempts = delivery.attempts,
                        "Event delivered"
                    );
                }
                Err(e) => {
                    self.stats.failed += 1;
                    log_failure(&event, &e);
                }
            }
        }

        info!(
            delivered = self.stats.delivered,
            failed = self.stats.failed,
            "Realtime dispatcher stopped"
        );
        self.stats
    }
}

fn log_failure(event: &LedgerEvent, e: &EmitError) {
    match event {
        LedgerEvent::Transaction {
            user_id,
            transaction,
        } => warn!(
            user_id = %user_id,
            entry_id = %transaction.id,
            error = %e,
            "Transaction event not delivered"
        ),
        LedgerEvent::Balance {
            account_id,
            balance,
        } => warn!(
            account_id = %account_id,
            balance = %balance,
            error = %e,
            "Balance event not delivered"
        ),
    }
}

/// Create a handle/worker pair without spawning
pub fn dispatch_channel(
    transport: Arc<dyn EventTransport>,
    capacity: usize,
) -> (EmitterHandle, DispatchWorker) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EmitterHandle { tx },
        DispatchWorker {
            rx,
            transport,
            stats: DispatchStats::default(),
        },
    )
}

/// Spawn the worker on the current runtime
pub fn spawn_dispatcher(
    transport: Arc<dyn EventTransport>,
    capacity: usize,
) -> (EmitterHandle, JoinHandle<DispatchStats>) {
    let (handle, worker) = dispatch_channel(transport, capacity);
    (handle, tokio::spawn(worker.run()))
}
