//! Transfer lifecycle
//!
//! A [`Transfer`] is one value movement seen by a wallet: a send, a receive,
//! or a recovery (a send to the wallet's own address).
//!
//! # State Machine
//!
//! ```text
//! CREATED → SIGNED → SUBMITTED → PENDING → INCLUDED
//!    │         │         │          │    ↘
//!    └─────────┴─────────┴──────────┴───→ FAILED / DELETED
//! ```
//!
//! INCLUDED, FAILED and DELETED are terminal.
//!
//! # Safety Invariants
//!
//! 1. **Single Slot**: the state tag and its payload are swapped as one
//!    immutable snapshot; readers never see a torn value
//! 2. **Immutable Identity**: direction, amount and owner never change
//!    after construction
//! 3. **Policy at the Edge**: `set_state` is last-write-wins; ordering rules
//!    are applied by [`Transfer::apply_state`] with a [`TransitionPolicy`]

pub mod bundle;
pub mod entity;
pub mod error;
pub mod event;
pub mod policy;
pub mod slot;
pub mod state;
pub mod types;

// Re-exports for convenience
pub use bundle::{BundleStatus, TransferBundle};
pub use entity::{Transfer, TransferBuilder};
pub use error::TransferError;
pub use event::{QueuedListener, TransferEvent, TransferEventRecord, TransferListener};
pub use policy::{StateUpdate, TransitionPolicy};
pub use state::{FailureReason, IncludedInfo, SubmitErrorKind, TransferState, TransferStateKind};
pub use types::{TransferDirection, TransferHash, TransferId};
