//! Wallet Transfer Core
//!
//! Transfer lifecycle and directed-amount engine for a multi-currency wallet.
//!
//! # Modules
//!
//! - [`core_types`] - Core type aliases (WalletId, BlockHeight, etc.)
//! - [`money`] - Units and signed amounts
//! - [`transfer`] - Transfer entity, state machine, events and bundles
//! - [`wallet`] - A wallet's transfer set and its inbound update path
//! - [`registry`] - WalletId → Wallet resolution
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup

// Core types - must be first!
pub mod core_types;

pub mod config;
pub mod logging;
pub mod money;
pub mod registry;
pub mod transfer;
pub mod wallet;

// Convenient re-exports at crate root
pub use core_types::{BlockHeight, Timestamp, WalletId};
pub use money::{Amount, MoneyError, Unit};
pub use registry::WalletRegistry;
pub use transfer::{
    BundleStatus, FailureReason, IncludedInfo, QueuedListener, StateUpdate, Transfer,
    TransferBuilder, TransferBundle, TransferDirection, TransferError, TransferEvent,
    TransferHash, TransferId, TransferListener, TransferState, TransferStateKind,
    TransitionPolicy,
};
pub use wallet::{Wallet, WalletUnits};
