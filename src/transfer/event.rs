//! Transfer events
//!
//! Wallets announce transfer changes to a [`TransferListener`]. `Changed` is
//! only emitted when a state update actually replaced a different state, so
//! redelivered statuses from the network never produce duplicate events.

use crossbeam_queue::ArrayQueue;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use crate::core_types::WalletId;

use super::state::TransferState;
use super::types::TransferId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Created,
    Changed {
        old: Arc<TransferState>,
        new: Arc<TransferState>,
    },
    Deleted,
}

impl TransferEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferEvent::Created => "CREATED",
            TransferEvent::Changed { .. } => "CHANGED",
            TransferEvent::Deleted => "DELETED",
        }
    }
}

/// Receiver of transfer events.
///
/// Called synchronously on the thread that made the change; implementations
/// must not block.
pub trait TransferListener: Send + Sync {
    fn handle_transfer_event(&self, wallet: WalletId, transfer: TransferId, event: TransferEvent);
}

/// An event together with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEventRecord {
    pub wallet: WalletId,
    pub transfer: TransferId,
    pub event: TransferEvent,
}

/// Listener that buffers events in a bounded lock-free queue for another
/// thread to drain.
///
/// When the queue is full the oldest event is dropped and counted.
pub struct QueuedListener {
    queue: ArrayQueue<TransferEventRecord>,
    dropped: AtomicU64,
}

impl QueuedListener {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn pop(&self) -> Option<TransferEventRecord> {
        self.queue.pop()
    }

    /// Take every buffered event, oldest first
    pub fn drain(&self) -> Vec<TransferEventRecord> {
        let mut events = Vec::with_capacity(self.queue.len());
        while let Some(record) = self.queue.pop() {
            events.push(record);
        }
        events
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Events discarded because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl TransferListener for QueuedListener {
    fn handle_transfer_event(&self, wallet: WalletId, transfer: TransferId, event: TransferEvent) {
        let record = TransferEventRecord {
            wallet,
            transfer,
            event,
        };
        if let Some(displaced) = self.queue.force_push(record) {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                wallet = displaced.wallet,
                transfer = %displaced.transfer,
                event = displaced.event.as_str(),
                total_dropped = total,
                "Transfer event queue full, dropped oldest event"
            );
        }
    }
}
