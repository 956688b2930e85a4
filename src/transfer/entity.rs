//! Transfer entity
//!
//! Everything except the lifecycle state is fixed at construction. The state
//! lives in a [`StateSlot`] and is the only thing that changes afterwards.

use std::sync::{Arc, OnceLock};

use crate::core_types::WalletId;
use crate::money::{Amount, Unit};

use super::error::TransferError;
use super::policy::{StateUpdate, TransitionPolicy};
use super::slot::StateSlot;
use super::state::TransferState;
use super::types::{TransferDirection, TransferHash, TransferId};

/// A single value movement observed or initiated by a wallet
#[derive(Debug)]
pub struct Transfer {
    id: TransferId,
    owner: WalletId,
    default_unit: Unit,
    amount: Amount,
    fee: Option<Amount>,
    direction: TransferDirection,
    source: Option<String>,
    target: Option<String>,
    hash: OnceLock<TransferHash>,
    state: StateSlot,
}

impl Transfer {
    /// Construct with the required fields; state starts at CREATED
    pub fn new(
        owner: WalletId,
        default_unit: &Unit,
        amount: Amount,
        direction: TransferDirection,
    ) -> Result<Self, TransferError> {
        TransferBuilder::new(owner)
            .default_unit(default_unit)
            .amount(amount)
            .direction(direction)
            .build()
    }

    pub fn builder(owner: WalletId) -> TransferBuilder {
        TransferBuilder::new(owner)
    }

    #[inline]
    pub fn id(&self) -> TransferId {
        self.id
    }

    /// The owning wallet, resolved through the registry
    #[inline]
    pub fn wallet_id(&self) -> WalletId {
        self.owner
    }

    pub fn default_unit(&self) -> &Unit {
        &self.default_unit
    }

    /// Unsigned magnitude in the transfer's native unit
    pub fn amount(&self) -> &Amount {
        &self.amount
    }

    /// Estimated fee supplied at construction
    pub fn estimated_fee(&self) -> Option<&Amount> {
        self.fee.as_ref()
    }

    /// Fee actually paid once included, otherwise the estimate
    pub fn fee(&self) -> Option<Amount> {
        let state = self.state();
        match state.included_info().and_then(|info| info.fee.clone()) {
            Some(fee) => Some(fee),
            None => self.fee.clone(),
        }
    }

    #[inline]
    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn hash(&self) -> Option<TransferHash> {
        self.hash.get().copied()
    }

    /// Record the transaction hash once it is known (after signing).
    ///
    /// Setting the same hash again is a no-op; a different hash is an error.
    pub fn set_hash(&self, hash: TransferHash) -> Result<(), TransferError> {
        let stored = self.hash.get_or_init(|| hash);
        if *stored == hash {
            Ok(())
        } else {
            Err(TransferError::HashAlreadySet(stored.to_string()))
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> Arc<TransferState> {
        self.state.load()
    }

    /// Atomically store `state` and return the state it replaced.
    ///
    /// Accepts any state: ordering rules belong to the caller, see
    /// [`Transfer::apply_state`].
    pub fn set_state(&self, state: TransferState) -> Arc<TransferState> {
        self.state.swap(state)
    }

    /// Store `state` if `policy` permits the move from the current state.
    ///
    /// An identical redelivery yields [`StateUpdate::Unchanged`] under every
    /// policy.
    pub fn apply_state(&self, state: TransferState, policy: TransitionPolicy) -> StateUpdate {
        let mut redelivery = false;
        let outcome = self.state.swap_if(state, |current, next| {
            if current == next {
                redelivery = true;
                return false;
            }
            policy.permits(current, next)
        });

        match outcome {
            Ok((previous, current)) => StateUpdate::Applied { previous, current },
            Err(_) if redelivery => StateUpdate::Unchanged,
            Err(current) => StateUpdate::Rejected { current },
        }
    }

    /// Signed amount relative to the owning wallet.
    ///
    /// SENT is negative, RECEIVED positive. RECOVERED is zero in the default
    /// unit: the value came back to the wallet that sent it.
    pub fn amount_directed(&self) -> Amount {
        match self.direction {
            TransferDirection::Recovered => Amount::zero(&self.default_unit),
            // Magnitude is non-negative, so the negation cannot overflow
            TransferDirection::Sent => Amount::new(-self.amount.value(), self.amount.unit()),
            TransferDirection::Received => self.amount.clone(),
        }
    }
}

/// Builder enforcing the construction contract
#[derive(Debug, Clone)]
pub struct TransferBuilder {
    owner: WalletId,
    default_unit: Option<Unit>,
    amount: Option<Amount>,
    fee: Option<Amount>,
    direction: Option<TransferDirection>,
    source: Option<String>,
    target: Option<String>,
    hash: Option<TransferHash>,
    state: Option<TransferState>,
}

impl TransferBuilder {
    pub fn new(owner: WalletId) -> Self {
        Self {
            owner,
            default_unit: None,
            amount: None,
            fee: None,
            direction: None,
            source: None,
            target: None,
            hash: None,
            state: None,
        }
    }

    pub fn default_unit(mut self, unit: &Unit) -> Self {
        self.default_unit = Some(unit.clone());
        self
    }

    pub fn amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn fee(mut self, fee: Amount) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn direction(mut self, direction: TransferDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn source(mut self, address: impl Into<String>) -> Self {
        self.source = Some(address.into());
        self
    }

    pub fn target(mut self, address: impl Into<String>) -> Self {
        self.target = Some(address.into());
        self
    }

    pub fn hash(mut self, hash: TransferHash) -> Self {
        self.hash = Some(hash);
        self
    }

    /// Initial state; CREATED when not given
    pub fn state(mut self, state: TransferState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn build(self) -> Result<Transfer, TransferError> {
        let default_unit = self
            .default_unit
            .ok_or_else(|| TransferError::Construction("default unit is required".into()))?;
        let direction = self
            .direction
            .ok_or_else(|| TransferError::Construction("direction is required".into()))?;

        if let Some(fee) = &self.fee
            && fee.is_negative()
        {
            return Err(TransferError::Construction(format!(
                "fee must not be negative: {}",
                fee
            )));
        }

        // A recovery without an explicit amount takes its magnitude from the fee
        let amount = match (self.amount, direction, &self.fee) {
            (Some(amount), _, _) => amount,
            (None, TransferDirection::Recovered, Some(fee)) => fee.with_unit(&default_unit)?,
            (None, _, _) => {
                return Err(TransferError::Construction("amount is required".into()));
            }
        };

        if amount.is_negative() {
            return Err(TransferError::Construction(format!(
                "amount must be an unsigned magnitude: {}",
                amount
            )));
        }
        if !amount.unit().is_compatible(&default_unit) {
            return Err(TransferError::Construction(format!(
                "amount currency {} does not match default unit currency {}",
                amount.unit().currency,
                default_unit.currency
            )));
        }

        let hash = OnceLock::new();
        if let Some(h) = self.hash {
            let _ = hash.set(h);
        }

        Ok(Transfer {
            id: TransferId::new(),
            owner: self.owner,
            default_unit,
            amount,
            fee: self.fee,
            direction,
            source: self.source,
            target: self.target,
            hash,
            state: StateSlot::new(self.state.unwrap_or(TransferState::Created)),
        })
    }
}
