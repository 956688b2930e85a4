//! Wallet registry
//!
//! Transfers refer to their wallet by [`WalletId`]; the registry turns that
//! id back into the wallet. Removing a wallet releases its transfer set.

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::config::TransferConfig;
use crate::core_types::WalletId;
use crate::transfer::{QueuedListener, Transfer, TransferError, TransferListener, TransitionPolicy};
use crate::wallet::{Wallet, WalletUnits};

pub struct WalletRegistry {
    wallets: DashMap<WalletId, Arc<Wallet>>,
    next_id: AtomicU64,
    policy: TransitionPolicy,
    listener: Option<Arc<dyn TransferListener>>,
}

impl WalletRegistry {
    /// Registry whose wallets share `policy` and `listener`
    pub fn new(policy: TransitionPolicy, listener: Option<Arc<dyn TransferListener>>) -> Self {
        Self {
            wallets: DashMap::new(),
            next_id: AtomicU64::new(1),
            policy,
            listener,
        }
    }

    /// Registry wired from config, with a queued listener of the configured
    /// capacity. Returns the listener so a consumer can drain it.
    pub fn from_config(config: &TransferConfig) -> (Self, Arc<QueuedListener>) {
        let listener = Arc::new(QueuedListener::new(config.event_queue_capacity));
        let registry = Self::new(
            config.transition_policy,
            Some(listener.clone() as Arc<dyn TransferListener>),
        );
        (registry, listener)
    }

    pub fn create_wallet(&self, units: WalletUnits) -> Arc<Wallet> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let wallet = Arc::new(Wallet::new(id, units, self.policy, self.listener.clone()));
        self.wallets.insert(id, wallet.clone());
        info!(
            wallet = id,
            currency = %wallet.default_unit().currency,
            policy = self.policy.as_str(),
            "Wallet created"
        );
        wallet
    }

    pub fn wallet(&self, id: WalletId) -> Option<Arc<Wallet>> {
        self.wallets.get(&id).map(|entry| entry.value().clone())
    }

    /// Resolve a transfer's owner
    pub fn owner_of(&self, transfer: &Transfer) -> Result<Arc<Wallet>, TransferError> {
        self.wallet(transfer.wallet_id())
            .ok_or(TransferError::WalletNotFound(transfer.wallet_id()))
    }

    /// Unregister a wallet and release its transfers
    pub fn remove_wallet(&self, id: WalletId) -> Result<Arc<Wallet>, TransferError> {
        let (_, wallet) = self
            .wallets
            .remove(&id)
            .ok_or(TransferError::WalletNotFound(id))?;
        let released = wallet.reset_transfers();
        info!(wallet = id, released, "Wallet removed");
        Ok(wallet)
    }

    pub fn wallet_ids(&self) -> Vec<WalletId> {
        let mut ids: Vec<WalletId> = self.wallets.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{Amount, Unit};
    use crate::transfer::{TransferDirection, TransferStateKind};

    fn units() -> WalletUnits {
        WalletUnits::native(
            Unit::base("btc", "sat", "SAT"),
            Unit::new("btc", "btc", "BTC", 8),
        )
    }

    #[test]
    fn test_owner_resolution() {
        let registry = WalletRegistry::new(TransitionPolicy::TerminalFinal, None);
        let wallet = registry.create_wallet(units());
        let t = wallet
            .add_transfer(
                wallet
                    .transfer_builder()
                    .amount(Amount::from_base_units(10, &units().base))
                    .direction(TransferDirection::Received)
                    .build()
                    .unwrap(),
            )
            .unwrap();

        assert_eq!(registry.owner_of(&t).unwrap().id(), wallet.id());

        registry.remove_wallet(wallet.id()).unwrap();
        assert!(matches!(
            registry.owner_of(&t),
            Err(TransferError::WalletNotFound(_))
        ));
        assert_eq!(t.state().kind(), TransferStateKind::Deleted);
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = WalletRegistry::new(TransitionPolicy::default(), None);
        let a = registry.create_wallet(units());
        let b = registry.create_wallet(units());
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.wallet_ids(), vec![a.id(), b.id()]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_unknown_wallet() {
        let registry = WalletRegistry::new(TransitionPolicy::default(), None);
        assert!(matches!(
            registry.remove_wallet(42),
            Err(TransferError::WalletNotFound(42))
        ));
    }

    #[test]
    fn test_from_config_shares_listener() {
        let config = TransferConfig {
            transition_policy: TransitionPolicy::Monotonic,
            event_queue_capacity: 16,
        };
        let (registry, listener) = WalletRegistry::from_config(&config);
        let wallet = registry.create_wallet(units());
        assert_eq!(wallet.policy(), TransitionPolicy::Monotonic);

        wallet
            .add_transfer(
                wallet
                    .transfer_builder()
                    .amount(Amount::from_base_units(10, &units().base))
                    .direction(TransferDirection::Sent)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        assert_eq!(listener.len(), 1);
    }
}
