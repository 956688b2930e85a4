//! Wallet transfer set
//!
//! A [`Wallet`] owns its transfers, routes inbound state updates from the
//! network collaborator through its [`TransitionPolicy`], and announces
//! actual changes to its [`TransferListener`].
//!
//! Listener callbacks run after the transfer-set lock is released, so a
//! listener may query the wallet.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, trace, warn};

use crate::core_types::WalletId;
use crate::money::{Amount, Unit};
use crate::transfer::{
    StateUpdate, Transfer, TransferBuilder, TransferBundle, TransferDirection, TransferError,
    TransferEvent, TransferHash, TransferId, TransferListener, TransferState, TransitionPolicy,
};

const TARGET_TRACE: &str = "TRANSFER_TRACE";

/// Units a wallet works with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletUnits {
    /// Unit collaborators report amounts in
    pub base: Unit,
    /// Unit for display and zero amounts
    pub default: Unit,
    /// Unit fees are paid in; may belong to another currency (tokens)
    pub fee: Unit,
}

impl WalletUnits {
    /// Units for a currency that pays its own fees
    pub fn native(base: Unit, default: Unit) -> Self {
        Self {
            fee: base.clone(),
            base,
            default,
        }
    }
}

#[derive(Default)]
struct TransferSet {
    transfers: Vec<Arc<Transfer>>,
    by_hash: FxHashMap<TransferHash, Arc<Transfer>>,
}

impl TransferSet {
    fn get(&self, id: TransferId) -> Option<&Arc<Transfer>> {
        self.transfers.iter().find(|t| t.id() == id)
    }

    fn remove(&mut self, id: TransferId) -> Option<Arc<Transfer>> {
        let pos = self.transfers.iter().position(|t| t.id() == id)?;
        let transfer = self.transfers.remove(pos);
        if let Some(hash) = transfer.hash() {
            self.by_hash.remove(&hash);
        }
        Some(transfer)
    }
}

pub struct Wallet {
    id: WalletId,
    units: WalletUnits,
    policy: TransitionPolicy,
    addresses: RwLock<FxHashSet<String>>,
    transfers: RwLock<TransferSet>,
    listener: Option<Arc<dyn TransferListener>>,
}

impl Wallet {
    pub fn new(
        id: WalletId,
        units: WalletUnits,
        policy: TransitionPolicy,
        listener: Option<Arc<dyn TransferListener>>,
    ) -> Self {
        Self {
            id,
            units,
            policy,
            addresses: RwLock::new(FxHashSet::default()),
            transfers: RwLock::new(TransferSet::default()),
            listener,
        }
    }

    #[inline]
    pub fn id(&self) -> WalletId {
        self.id
    }

    pub fn units(&self) -> &WalletUnits {
        &self.units
    }

    pub fn default_unit(&self) -> &Unit {
        &self.units.default
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    // ============================================================
    // ADDRESSES
    // ============================================================

    pub fn add_address(&self, address: impl Into<String>) {
        self.addresses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.into());
    }

    pub fn owns_address(&self, address: &str) -> bool {
        self.addresses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(address)
    }

    // ============================================================
    // TRANSFER SET
    // ============================================================

    /// Builder pre-filled with this wallet as owner and its default unit
    pub fn transfer_builder(&self) -> TransferBuilder {
        Transfer::builder(self.id).default_unit(&self.units.default)
    }

    /// Start tracking `transfer` and announce it
    pub fn add_transfer(&self, transfer: Transfer) -> Result<Arc<Transfer>, TransferError> {
        match self.track(transfer)? {
            (transfer, true) => Ok(transfer),
            (existing, false) => Err(TransferError::Construction(format!(
                "transfer with hash {} already tracked",
                existing.hash().map(|h| h.to_string()).unwrap_or_default()
            ))),
        }
    }

    /// Insert `transfer` unless one with the same hash is already tracked.
    /// Lookup and insert happen under one write lock. Returns the tracked
    /// transfer and whether it is the one passed in.
    fn track(&self, transfer: Transfer) -> Result<(Arc<Transfer>, bool), TransferError> {
        if transfer.wallet_id() != self.id {
            return Err(TransferError::Construction(format!(
                "transfer {} belongs to wallet {}, not {}",
                transfer.id(),
                transfer.wallet_id(),
                self.id
            )));
        }

        let transfer = Arc::new(transfer);
        {
            let mut set = self.write_set();
            if let Some(hash) = transfer.hash() {
                if let Some(existing) = set.by_hash.get(&hash) {
                    return Ok((existing.clone(), false));
                }
                set.by_hash.insert(hash, transfer.clone());
            }
            set.transfers.push(transfer.clone());
        }

        info!(
            wallet = self.id,
            transfer = %transfer.id(),
            direction = %transfer.direction(),
            amount = %transfer.amount(),
            "Transfer added"
        );
        self.emit(transfer.id(), TransferEvent::Created);
        Ok((transfer, true))
    }

    pub fn transfer(&self, id: TransferId) -> Option<Arc<Transfer>> {
        self.read_set().get(id).cloned()
    }

    pub fn transfer_by_hash(&self, hash: &TransferHash) -> Option<Arc<Transfer>> {
        self.read_set().by_hash.get(hash).cloned()
    }

    /// All tracked transfers, in the order they were added
    pub fn transfers(&self) -> Vec<Arc<Transfer>> {
        self.read_set().transfers.clone()
    }

    pub fn transfer_count(&self) -> usize {
        self.read_set().transfers.len()
    }

    /// Record a transfer's hash once signing produced it
    pub fn set_transfer_hash(&self, id: TransferId, hash: TransferHash) -> Result<(), TransferError> {
        let mut set = self.write_set();
        let transfer = set
            .get(id)
            .cloned()
            .ok_or_else(|| TransferError::TransferNotFound(id.to_string()))?;
        if let Some(other) = set.by_hash.get(&hash)
            && other.id() != id
        {
            return Err(TransferError::Construction(format!(
                "transfer with hash {} already tracked",
                hash
            )));
        }
        transfer.set_hash(hash)?;
        set.by_hash.insert(hash, transfer);
        Ok(())
    }

    // ============================================================
    // STATE UPDATES
    // ============================================================

    /// Inbound path for lifecycle updates from the network collaborator.
    ///
    /// Safe to call with redelivered or stale states: those come back as
    /// `Unchanged` or `Rejected` and emit nothing.
    pub fn update_transfer_state(
        &self,
        id: TransferId,
        state: TransferState,
    ) -> Result<StateUpdate, TransferError> {
        let transfer = self
            .transfer(id)
            .ok_or_else(|| TransferError::TransferNotFound(id.to_string()))?;
        Ok(self.apply(&transfer, state))
    }

    fn apply(&self, transfer: &Transfer, state: TransferState) -> StateUpdate {
        let attempted = state.kind();
        let update = transfer.apply_state(state, self.policy);

        match &update {
            StateUpdate::Applied { previous, current } => {
                trace!(
                    target: TARGET_TRACE,
                    wallet = self.id,
                    transfer = %transfer.id(),
                    from = %previous,
                    to = %current,
                    "state applied"
                );
                debug!(
                    transfer = %transfer.id(),
                    "Transfer state {} -> {}",
                    previous.kind(),
                    current.kind()
                );
                self.emit(
                    transfer.id(),
                    TransferEvent::Changed {
                        old: previous.clone(),
                        new: current.clone(),
                    },
                );
            }
            StateUpdate::Unchanged => {
                debug!(transfer = %transfer.id(), state = %attempted, "Redelivered transfer state ignored");
            }
            StateUpdate::Rejected { current } => {
                warn!(
                    wallet = self.id,
                    transfer = %transfer.id(),
                    current = %current.kind(),
                    attempted = %attempted,
                    policy = self.policy.as_str(),
                    "Transfer state update rejected"
                );
            }
        }
        update
    }

    /// Create or update the transfer described by a collaborator bundle
    pub fn recover_transfer(&self, bundle: &TransferBundle) -> Result<Arc<Transfer>, TransferError> {
        let hash = bundle.parse_hash()?;
        let state = bundle.recover_state(&self.units.fee)?;

        if let Some(existing) = self.transfer_by_hash(&hash) {
            self.apply(&existing, state);
            return Ok(existing);
        }

        let direction =
            TransferDirection::from_ownership(self.owns_address(&bundle.from), self.owns_address(&bundle.to))
                .ok_or_else(|| {
                    TransferError::Construction(format!(
                        "transfer {} involves no address of wallet {}",
                        hash, self.id
                    ))
                })?;

        let mut builder = self
            .transfer_builder()
            .amount(bundle.parse_amount(&self.units.base)?)
            .direction(direction)
            .source(bundle.from.clone())
            .target(bundle.to.clone())
            .hash(hash);
        if let Some(fee) = bundle.parse_fee(&self.units.fee)? {
            builder = builder.fee(fee);
        }

        // A concurrent delivery of the same bundle may have won the insert
        let (transfer, created) = self.track(builder.build()?)?;
        self.apply(&transfer, state);

        if created {
            info!(
                wallet = self.id,
                hash = %hash,
                status = %bundle.status,
                state = %transfer.state(),
                "Transfer recovered from bundle"
            );
        }
        Ok(transfer)
    }

    // ============================================================
    // REMOVAL
    // ============================================================

    /// Stop tracking a transfer. A non-terminal transfer is marked DELETED
    /// so holders of the `Arc` see it as gone.
    pub fn remove_transfer(&self, id: TransferId) -> Result<Arc<Transfer>, TransferError> {
        let transfer = self
            .write_set()
            .remove(id)
            .ok_or_else(|| TransferError::TransferNotFound(id.to_string()))?;
        self.release(&transfer);
        Ok(transfer)
    }

    /// Drop the whole transfer set, e.g. before a rescan.
    /// Returns the number of transfers released.
    pub fn reset_transfers(&self) -> usize {
        let released = std::mem::take(&mut *self.write_set());
        for transfer in &released.transfers {
            self.release(transfer);
        }
        info!(
            wallet = self.id,
            released = released.transfers.len(),
            "Wallet transfers reset"
        );
        released.transfers.len()
    }

    fn release(&self, transfer: &Transfer) {
        // Checked and swapped under the slot lock: a concurrent INCLUDED wins
        transfer.apply_state(TransferState::Deleted, TransitionPolicy::TerminalFinal);
        debug!(transfer = %transfer.id(), "Transfer released");
        self.emit(transfer.id(), TransferEvent::Deleted);
    }

    // ============================================================
    // QUERIES
    // ============================================================

    /// Net value of the tracked transfers in the default unit.
    ///
    /// Failed and deleted transfers count for nothing. Fees in the wallet's
    /// currency are charged to SENT and RECOVERED transfers.
    pub fn balance(&self) -> Result<Amount, TransferError> {
        let mut total = Amount::zero(&self.units.default);
        for transfer in self.transfers() {
            if transfer.state().is_void() {
                continue;
            }
            total = total.checked_add(&transfer.amount_directed())?;
            if transfer.direction() != TransferDirection::Received
                && let Some(fee) = transfer.fee()
                && fee.unit().is_compatible(&self.units.default)
            {
                total = total.checked_sub(&fee)?;
            }
        }
        Ok(total)
    }

    // ============================================================
    // INTERNALS
    // ============================================================

    fn emit(&self, transfer: TransferId, event: TransferEvent) {
        if let Some(listener) = &self.listener {
            listener.handle_transfer_event(self.id, transfer, event);
        }
    }

    fn read_set(&self) -> RwLockReadGuard<'_, TransferSet> {
        self.transfers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_set(&self) -> RwLockWriteGuard<'_, TransferSet> {
        self.transfers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{IncludedInfo, QueuedListener, TransferStateKind};

    fn units() -> WalletUnits {
        WalletUnits::native(
            Unit::base("btc", "sat", "SAT"),
            Unit::new("btc", "btc", "BTC", 8),
        )
    }

    fn wallet_with_listener() -> (Wallet, Arc<QueuedListener>) {
        let listener = Arc::new(QueuedListener::new(64));
        let wallet = Wallet::new(
            1,
            units(),
            TransitionPolicy::TerminalFinal,
            Some(listener.clone() as Arc<dyn TransferListener>),
        );
        (wallet, listener)
    }

    fn sats(n: u64) -> Amount {
        Amount::from_base_units(n, &units().base)
    }

    fn add(wallet: &Wallet, direction: TransferDirection, n: u64) -> Arc<Transfer> {
        let t = wallet
            .transfer_builder()
            .amount(sats(n))
            .direction(direction)
            .build()
            .unwrap();
        wallet.add_transfer(t).unwrap()
    }

    fn event_names(listener: &QueuedListener) -> Vec<&'static str> {
        listener.drain().iter().map(|r| r.event.as_str()).collect()
    }

    fn bundle(hash_byte: &str, from: &str, to: &str, status: crate::transfer::BundleStatus) -> TransferBundle {
        TransferBundle {
            hash: hash_byte.repeat(32),
            from: from.into(),
            to: to.into(),
            amount: "1000".into(),
            fee: Some("50".into()),
            status,
            block_number: 0,
            block_timestamp: 0,
            block_transaction_index: None,
        }
    }

    #[test]
    fn test_add_emits_created() {
        let (wallet, listener) = wallet_with_listener();
        let t = add(&wallet, TransferDirection::Received, 100);
        assert_eq!(wallet.transfer(t.id()).unwrap().id(), t.id());
        assert_eq!(event_names(&listener), vec!["CREATED"]);
    }

    #[test]
    fn test_add_foreign_transfer_rejected() {
        let (wallet, _) = wallet_with_listener();
        let t = Transfer::new(99, &units().default, sats(1), TransferDirection::Sent).unwrap();
        assert!(matches!(
            wallet.add_transfer(t),
            Err(TransferError::Construction(_))
        ));
    }

    #[test]
    fn test_changed_only_on_actual_change() {
        let (wallet, listener) = wallet_with_listener();
        let t = add(&wallet, TransferDirection::Sent, 100);
        listener.drain();

        let update = wallet.update_transfer_state(t.id(), TransferState::Submitted).unwrap();
        assert!(update.is_applied());
        let update = wallet.update_transfer_state(t.id(), TransferState::Submitted).unwrap();
        assert_eq!(update, StateUpdate::Unchanged);

        let events = listener.drain();
        assert_eq!(events.len(), 1);
        match &events[0].event {
            TransferEvent::Changed { old, new } => {
                assert_eq!(**old, TransferState::Created);
                assert_eq!(**new, TransferState::Submitted);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_terminal_regression_rejected() {
        let (wallet, listener) = wallet_with_listener();
        let t = add(&wallet, TransferDirection::Sent, 100);
        let included = TransferState::Included(IncludedInfo::new(7, 1_700_000_000, None));
        wallet.update_transfer_state(t.id(), included.clone()).unwrap();
        listener.drain();

        let update = wallet.update_transfer_state(t.id(), TransferState::Pending).unwrap();
        assert!(matches!(update, StateUpdate::Rejected { .. }));
        assert_eq!(*t.state(), included);
        assert!(listener.is_empty());
    }

    #[test]
    fn test_default_policy_rejects_non_terminal_regression() {
        let listener = Arc::new(QueuedListener::new(16));
        let wallet = Wallet::new(
            1,
            units(),
            TransitionPolicy::default(),
            Some(listener.clone() as Arc<dyn TransferListener>),
        );
        let t = add(&wallet, TransferDirection::Sent, 100);
        wallet.update_transfer_state(t.id(), TransferState::Pending).unwrap();
        listener.drain();

        for stale in [TransferState::Created, TransferState::Signed, TransferState::Submitted] {
            let update = wallet.update_transfer_state(t.id(), stale).unwrap();
            assert!(matches!(update, StateUpdate::Rejected { .. }));
        }
        assert_eq!(*t.state(), TransferState::Pending);
        assert!(listener.is_empty());
    }

    #[test]
    fn test_terminal_final_allows_non_terminal_regression() {
        let (wallet, listener) = wallet_with_listener();
        let t = add(&wallet, TransferDirection::Sent, 100);
        wallet.update_transfer_state(t.id(), TransferState::Pending).unwrap();
        listener.drain();

        let update = wallet.update_transfer_state(t.id(), TransferState::Created).unwrap();
        assert!(update.is_applied());
        assert_eq!(event_names(&listener), vec!["CHANGED"]);
    }

    #[test]
    fn test_changed_event_carries_stored_state() {
        let (wallet, listener) = wallet_with_listener();
        let t = add(&wallet, TransferDirection::Sent, 100);
        listener.drain();

        let update = wallet.update_transfer_state(t.id(), TransferState::Pending).unwrap();
        let StateUpdate::Applied { current, .. } = update else {
            panic!("expected applied update");
        };
        match listener.drain().remove(0).event {
            TransferEvent::Changed { new, .. } => assert!(Arc::ptr_eq(&new, &current)),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_add_duplicate_hash_rejected() {
        let (wallet, _) = wallet_with_listener();
        let hash = TransferHash::from_bytes([4; 32]);
        let build = || {
            wallet
                .transfer_builder()
                .amount(sats(1))
                .direction(TransferDirection::Sent)
                .hash(hash)
                .build()
                .unwrap()
        };
        wallet.add_transfer(build()).unwrap();
        assert!(matches!(
            wallet.add_transfer(build()),
            Err(TransferError::Construction(_))
        ));
        assert_eq!(wallet.transfer_count(), 1);
    }

    #[test]
    fn test_unknown_transfer() {
        let (wallet, _) = wallet_with_listener();
        let err = wallet
            .update_transfer_state(TransferId::new(), TransferState::Pending)
            .unwrap_err();
        assert_eq!(err.code(), "TRANSFER_NOT_FOUND");
    }

    #[test]
    fn test_remove_marks_deleted() {
        let (wallet, listener) = wallet_with_listener();
        let t = add(&wallet, TransferDirection::Sent, 100);
        listener.drain();

        let removed = wallet.remove_transfer(t.id()).unwrap();
        assert_eq!(removed.state().kind(), TransferStateKind::Deleted);
        assert!(wallet.transfer(t.id()).is_none());
        assert_eq!(event_names(&listener), vec!["DELETED"]);
        assert!(wallet.remove_transfer(t.id()).is_err());
    }

    #[test]
    fn test_remove_keeps_terminal_state() {
        let (wallet, _) = wallet_with_listener();
        let t = add(&wallet, TransferDirection::Sent, 100);
        let included = TransferState::Included(IncludedInfo::new(7, 1, None));
        wallet.update_transfer_state(t.id(), included.clone()).unwrap();
        wallet.remove_transfer(t.id()).unwrap();
        assert_eq!(*t.state(), included);
    }

    #[test]
    fn test_reset_transfers() {
        let (wallet, listener) = wallet_with_listener();
        add(&wallet, TransferDirection::Sent, 1);
        add(&wallet, TransferDirection::Received, 2);
        listener.drain();

        assert_eq!(wallet.reset_transfers(), 2);
        assert_eq!(wallet.transfer_count(), 0);
        assert_eq!(event_names(&listener), vec!["DELETED", "DELETED"]);
    }

    #[test]
    fn test_set_transfer_hash_indexes() {
        let (wallet, _) = wallet_with_listener();
        let a = add(&wallet, TransferDirection::Sent, 1);
        let b = add(&wallet, TransferDirection::Sent, 2);
        let hash = TransferHash::from_bytes([9; 32]);

        wallet.set_transfer_hash(a.id(), hash).unwrap();
        assert_eq!(wallet.transfer_by_hash(&hash).unwrap().id(), a.id());
        assert!(wallet.set_transfer_hash(b.id(), hash).is_err());
    }

    #[test]
    fn test_recover_directions() {
        use crate::transfer::BundleStatus;
        let (wallet, _) = wallet_with_listener();
        wallet.add_address("mine-1");
        wallet.add_address("mine-2");

        let sent = wallet
            .recover_transfer(&bundle("01", "mine-1", "theirs", BundleStatus::Pending))
            .unwrap();
        let received = wallet
            .recover_transfer(&bundle("02", "theirs", "mine-1", BundleStatus::Pending))
            .unwrap();
        let recovered = wallet
            .recover_transfer(&bundle("03", "mine-1", "mine-2", BundleStatus::Pending))
            .unwrap();

        assert_eq!(sent.direction(), TransferDirection::Sent);
        assert_eq!(sent.amount_directed().value(), -1000);
        assert_eq!(received.direction(), TransferDirection::Received);
        assert_eq!(received.amount_directed().value(), 1000);
        assert_eq!(recovered.direction(), TransferDirection::Recovered);
        assert!(recovered.amount_directed().is_zero());
        assert_eq!(sent.state().kind(), TransferStateKind::Pending);

        let err = wallet
            .recover_transfer(&bundle("04", "x", "y", BundleStatus::Pending))
            .unwrap_err();
        assert!(matches!(err, TransferError::Construction(_)));
    }

    #[test]
    fn test_recover_updates_existing() {
        use crate::transfer::BundleStatus;
        let (wallet, listener) = wallet_with_listener();
        wallet.add_address("mine");

        let first = wallet
            .recover_transfer(&bundle("05", "mine", "theirs", BundleStatus::Pending))
            .unwrap();
        assert_eq!(event_names(&listener), vec!["CREATED", "CHANGED"]);

        let mut included = bundle("05", "mine", "theirs", BundleStatus::Included);
        included.block_number = 800_000;
        included.block_timestamp = 1_700_000_000;
        let second = wallet.recover_transfer(&included).unwrap();

        assert_eq!(first.id(), second.id());
        assert_eq!(wallet.transfer_count(), 1);
        assert_eq!(second.state().kind(), TransferStateKind::Included);
        assert_eq!(event_names(&listener), vec!["CHANGED"]);

        // Same bundle again: nothing new
        wallet.recover_transfer(&included).unwrap();
        assert!(listener.is_empty());
    }

    #[test]
    fn test_balance() {
        use crate::transfer::BundleStatus;
        let (wallet, _) = wallet_with_listener();
        wallet.add_address("mine");
        wallet.add_address("mine-2");

        // +1000
        wallet
            .recover_transfer(&bundle("06", "theirs", "mine", BundleStatus::Pending))
            .unwrap();
        // -1000 - 50 fee
        wallet
            .recover_transfer(&bundle("07", "mine", "theirs", BundleStatus::Pending))
            .unwrap();
        // 0 - 50 fee
        wallet
            .recover_transfer(&bundle("08", "mine", "mine-2", BundleStatus::Pending))
            .unwrap();
        // failed: ignored
        wallet
            .recover_transfer(&bundle("09", "theirs", "mine", BundleStatus::Errored))
            .unwrap();

        let balance = wallet.balance().unwrap();
        assert_eq!(balance.value(), -100);
        assert_eq!(balance.unit(), &units().default);
    }
}
