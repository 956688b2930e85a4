//! Single-slot state cell
//!
//! Holds the current [`TransferState`] as an `Arc` to an immutable snapshot.
//! Writers replace the handle, readers clone it, so a reader always gets a
//! complete snapshot (tag and payload together) and never a torn value.

use std::sync::{Arc, PoisonError, RwLock};

use super::state::TransferState;

#[derive(Debug)]
pub struct StateSlot {
    current: RwLock<Arc<TransferState>>,
}

impl StateSlot {
    pub fn new(initial: TransferState) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Current snapshot
    pub fn load(&self) -> Arc<TransferState> {
        // A poisoned lock still holds a whole snapshot: the only write is a
        // handle assignment.
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the snapshot unconditionally, returning the previous one.
    ///
    /// Concurrent writers are serialized; the last one wins.
    pub fn swap(&self, next: TransferState) -> Arc<TransferState> {
        let next = Arc::new(next);
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }

    /// Replace the snapshot only if `accept(current, next)` holds.
    ///
    /// The check and the replacement happen under one write lock, so no
    /// other writer can slip in between. Returns `Ok((previous, stored))`
    /// when replaced and `Err(current)` when refused.
    pub fn swap_if<F>(
        &self,
        next: TransferState,
        accept: F,
    ) -> Result<(Arc<TransferState>, Arc<TransferState>), Arc<TransferState>>
    where
        F: FnOnce(&TransferState, &TransferState) -> bool,
    {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let current: &TransferState = &guard;
        if accept(current, &next) {
            let stored = Arc::new(next);
            let previous = std::mem::replace(&mut *guard, stored.clone());
            Ok((previous, stored))
        } else {
            Err(guard.clone())
        }
    }
}
