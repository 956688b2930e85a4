//! Transfer State Definitions
//!
//! A [`TransferState`] is an immutable snapshot: the state tag together with
//! any payload that belongs to it (inclusion details, failure reason). The
//! snapshot is always published as one unit, see [`super::slot::StateSlot`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core_types::{BlockHeight, Timestamp};
use crate::money::Amount;

use super::error::TransferError;

/// Transfer state tags
///
/// Terminal states: INCLUDED (40), FAILED (-10), DELETED (-20)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum TransferStateKind {
    /// Initial state - transfer constructed, nothing signed yet
    Created = 0,

    Signed = 10,

    /// Handed to the network collaborator for broadcast
    Submitted = 20,

    /// Seen by the network, awaiting inclusion
    Pending = 30,

    /// Terminal: recorded in a block
    Included = 40,

    /// Terminal: submission or execution failed
    Failed = -10,

    /// Terminal: explicitly removed
    Deleted = -20,
}

impl TransferStateKind {
    pub const ALL: [TransferStateKind; 7] = [
        TransferStateKind::Created,
        TransferStateKind::Signed,
        TransferStateKind::Submitted,
        TransferStateKind::Pending,
        TransferStateKind::Included,
        TransferStateKind::Failed,
        TransferStateKind::Deleted,
    ];

    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStateKind::Included | TransferStateKind::Failed | TransferStateKind::Deleted
        )
    }

    /// Position along CREATED → SIGNED → SUBMITTED → PENDING.
    /// Terminal states have no stage; they sit above every stage.
    #[inline]
    fn stage(&self) -> Option<u8> {
        match self {
            TransferStateKind::Created => Some(0),
            TransferStateKind::Signed => Some(1),
            TransferStateKind::Submitted => Some(2),
            TransferStateKind::Pending => Some(3),
            _ => None,
        }
    }

    /// Whether `next` is strictly later than `self` in the lifecycle order.
    ///
    /// Non-terminal states may move forward (skipping is allowed) or into any
    /// terminal state. Terminal states admit nothing.
    pub fn can_transition_to(&self, next: TransferStateKind) -> bool {
        match (self.stage(), next.stage()) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(cur), Some(nxt)) => nxt > cur,
        }
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TransferStateKind::Created),
            10 => Some(TransferStateKind::Signed),
            20 => Some(TransferStateKind::Submitted),
            30 => Some(TransferStateKind::Pending),
            40 => Some(TransferStateKind::Included),
            -10 => Some(TransferStateKind::Failed),
            -20 => Some(TransferStateKind::Deleted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStateKind::Created => "CREATED",
            TransferStateKind::Signed => "SIGNED",
            TransferStateKind::Submitted => "SUBMITTED",
            TransferStateKind::Pending => "PENDING",
            TransferStateKind::Included => "INCLUDED",
            TransferStateKind::Failed => "FAILED",
            TransferStateKind::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for TransferStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for TransferStateKind {
    type Error = TransferError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        TransferStateKind::from_id(value)
            .ok_or_else(|| TransferError::InvalidState(format!("Invalid transfer state: {}", value)))
    }
}

/// Details recorded when a transfer lands in a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludedInfo {
    pub block_height: BlockHeight,
    /// Index within the block, when the collaborator knows it
    pub transaction_index: Option<u64>,
    pub timestamp: Timestamp,
    /// Fee actually paid
    pub fee: Option<Amount>,
    /// False when the transaction was mined but its execution failed
    pub success: bool,
    pub error: Option<String>,
}

impl IncludedInfo {
    pub fn new(block_height: BlockHeight, timestamp: Timestamp, fee: Option<Amount>) -> Self {
        Self {
            block_height,
            transaction_index: None,
            timestamp,
            fee,
            success: true,
            error: None,
        }
    }

    pub fn with_transaction_index(mut self, index: u64) -> Self {
        self.transaction_index = Some(index);
        self
    }

    /// Mark as included-but-failed with the given error
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    pub fn block_time(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.timestamp).ok()?;
        DateTime::from_timestamp(secs, 0)
    }
}

/// Why a submission failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitErrorKind {
    Unknown,
    /// OS-level error while handing the transaction to the network
    Posix { errno: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReason {
    pub kind: SubmitErrorKind,
    pub message: Option<String>,
}

impl FailureReason {
    pub fn unknown() -> Self {
        Self {
            kind: SubmitErrorKind::Unknown,
            message: None,
        }
    }

    pub fn posix(errno: i32, message: impl Into<String>) -> Self {
        Self {
            kind: SubmitErrorKind::Posix { errno },
            message: Some(message.into()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.message) {
            (SubmitErrorKind::Unknown, None) => write!(f, "unknown"),
            (SubmitErrorKind::Unknown, Some(msg)) => write!(f, "{}", msg),
            (SubmitErrorKind::Posix { errno }, None) => write!(f, "posix error {}", errno),
            (SubmitErrorKind::Posix { errno }, Some(msg)) => {
                write!(f, "posix error {}: {}", errno, msg)
            }
        }
    }
}

/// Lifecycle state snapshot: tag plus per-state payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferState {
    Created,
    Signed,
    Submitted,
    Pending,
    Included(IncludedInfo),
    Failed(FailureReason),
    Deleted,
}

impl TransferState {
    pub fn kind(&self) -> TransferStateKind {
        match self {
            TransferState::Created => TransferStateKind::Created,
            TransferState::Signed => TransferStateKind::Signed,
            TransferState::Submitted => TransferStateKind::Submitted,
            TransferState::Pending => TransferStateKind::Pending,
            TransferState::Included(_) => TransferStateKind::Included,
            TransferState::Failed(_) => TransferStateKind::Failed,
            TransferState::Deleted => TransferStateKind::Deleted,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    pub fn included_info(&self) -> Option<&IncludedInfo> {
        match self {
            TransferState::Included(info) => Some(info),
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            TransferState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Transfers whose value never moved: failed, deleted, or mined with a
    /// failed execution.
    pub fn is_void(&self) -> bool {
        match self {
            TransferState::Failed(_) | TransferState::Deleted => true,
            TransferState::Included(info) => !info.success,
            _ => false,
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferState::Included(info) if info.success => {
                write!(f, "INCLUDED(height={})", info.block_height)
            }
            TransferState::Included(info) => write!(
                f,
                "INCLUDED(height={}, error={})",
                info.block_height,
                info.error.as_deref().unwrap_or("unknown")
            ),
            TransferState::Failed(reason) => write!(f, "FAILED({})", reason),
            other => write!(f, "{}", other.kind()),
        }
    }
}
