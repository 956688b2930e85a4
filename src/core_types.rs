//! Core types used throughout the system
//!
//! Fundamental type aliases shared by the wallet and transfer modules.

/// Wallet ID - assigned by the [`WalletRegistry`](crate::registry::WalletRegistry).
///
/// Transfers hold this instead of a reference to their wallet, so a wallet
/// and its transfer set never form an ownership cycle.
pub type WalletId = u64;

/// Block height on the owning network
pub type BlockHeight = u64;

/// Seconds since the Unix epoch
pub type Timestamp = u64;
