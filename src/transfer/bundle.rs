//! Transfer bundles
//!
//! A bundle is the network collaborator's view of one transfer as found on
//! chain or in a block explorer. Wallets use it to create or update the
//! matching [`Transfer`](super::Transfer).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core_types::{BlockHeight, Timestamp};
use crate::money::{Amount, MoneyError, Unit, parse_base_units};

use super::error::TransferError;
use super::state::{FailureReason, IncludedInfo, TransferState};
use super::types::TransferHash;

/// Status reported by the collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleStatus {
    Created,
    Signed,
    Submitted,
    Pending,
    Included,
    Errored,
    Deleted,
}

impl fmt::Display for BundleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BundleStatus::Created => "created",
            BundleStatus::Signed => "signed",
            BundleStatus::Submitted => "submitted",
            BundleStatus::Pending => "pending",
            BundleStatus::Included => "included",
            BundleStatus::Errored => "errored",
            BundleStatus::Deleted => "deleted",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferBundle {
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Base units, decimal string
    pub amount: String,
    /// Base units of the fee currency, decimal string
    #[serde(default)]
    pub fee: Option<String>,
    pub status: BundleStatus,
    /// 0 when not yet in a block
    #[serde(default)]
    pub block_number: BlockHeight,
    #[serde(default)]
    pub block_timestamp: Timestamp,
    #[serde(default)]
    pub block_transaction_index: Option<u64>,
}

impl TransferBundle {
    pub fn parse_hash(&self) -> Result<TransferHash, TransferError> {
        self.hash.parse()
    }

    /// Transfer magnitude in base units of `unit`'s currency
    pub fn parse_amount(&self, unit: &Unit) -> Result<Amount, MoneyError> {
        Ok(Amount::from_base_units(parse_base_units(&self.amount)?, unit))
    }

    pub fn parse_fee(&self, fee_unit: &Unit) -> Result<Option<Amount>, MoneyError> {
        self.fee
            .as_deref()
            .map(|fee| Ok(Amount::from_base_units(parse_base_units(fee)?, fee_unit)))
            .transpose()
    }

    /// Whether the transaction made it into a block. An errored status with
    /// block coordinates means it was mined but failed to execute.
    pub fn is_included(&self) -> bool {
        self.status == BundleStatus::Included
            || (self.status == BundleStatus::Errored
                && self.block_number != 0
                && self.block_timestamp != 0)
    }

    /// Lifecycle state described by this bundle
    pub fn recover_state(&self, fee_unit: &Unit) -> Result<TransferState, MoneyError> {
        Ok(match self.status {
            BundleStatus::Created => TransferState::Created,
            BundleStatus::Signed => TransferState::Signed,
            BundleStatus::Submitted => TransferState::Submitted,
            BundleStatus::Pending => TransferState::Pending,
            BundleStatus::Deleted => TransferState::Deleted,
            BundleStatus::Errored if !self.is_included() => {
                TransferState::Failed(FailureReason::unknown())
            }
            BundleStatus::Included | BundleStatus::Errored => {
                let mut info = IncludedInfo::new(
                    self.block_number,
                    self.block_timestamp,
                    self.parse_fee(fee_unit)?,
                );
                if let Some(index) = self.block_transaction_index {
                    info = info.with_transaction_index(index);
                }
                if self.status != BundleStatus::Included {
                    info = info.failed("unknown");
                }
                TransferState::Included(info)
            }
        })
    }
}
