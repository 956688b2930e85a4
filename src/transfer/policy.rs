//! Transition policy
//!
//! The state slot itself accepts any state. Policies decide, on the inbound
//! path, which updates from the network collaborator are allowed through.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::state::TransferState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Accept everything; the last writer wins
    LastWriteWins,
    /// INCLUDED, FAILED and DELETED are final; anything else is accepted
    TerminalFinal,
    /// Only forward moves in the lifecycle order
    #[default]
    Monotonic,
}

impl TransitionPolicy {
    /// Whether moving from `current` to `next` is allowed.
    /// Identical redeliveries are handled before this is consulted.
    pub fn permits(&self, current: &TransferState, next: &TransferState) -> bool {
        match self {
            TransitionPolicy::LastWriteWins => true,
            TransitionPolicy::TerminalFinal => !current.is_terminal(),
            TransitionPolicy::Monotonic => current.kind().can_transition_to(next.kind()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionPolicy::LastWriteWins => "last_write_wins",
            TransitionPolicy::TerminalFinal => "terminal_final",
            TransitionPolicy::Monotonic => "monotonic",
        }
    }
}

/// Outcome of a guarded state update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateUpdate {
    /// The new state was stored; holds what it replaced and the stored snapshot
    Applied {
        previous: Arc<TransferState>,
        current: Arc<TransferState>,
    },
    /// The same state was delivered again; nothing changed
    Unchanged,
    /// The policy refused; holds the state that stays in place
    Rejected { current: Arc<TransferState> },
}

impl StateUpdate {
    /// The replaced state when an actual transition happened
    pub fn previous(&self) -> Option<&Arc<TransferState>> {
        match self {
            StateUpdate::Applied { previous, .. } => Some(previous),
            _ => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, StateUpdate::Applied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::state::{FailureReason, IncludedInfo};

    fn included() -> TransferState {
        TransferState::Included(IncludedInfo::new(100, 1_700_000_000, None))
    }

    #[test]
    fn test_last_write_wins_permits_all() {
        let policy = TransitionPolicy::LastWriteWins;
        assert!(policy.permits(&included(), &TransferState::Pending));
        assert!(policy.permits(&TransferState::Deleted, &TransferState::Created));
    }

    #[test]
    fn test_terminal_final() {
        let policy = TransitionPolicy::TerminalFinal;
        assert!(!policy.permits(&included(), &TransferState::Pending));
        assert!(!policy.permits(
            &TransferState::Failed(FailureReason::unknown()),
            &included()
        ));
        // Non-terminal regressions pass
        assert!(policy.permits(&TransferState::Pending, &TransferState::Submitted));
        assert!(policy.permits(&TransferState::Pending, &included()));
    }

    #[test]
    fn test_monotonic() {
        let policy = TransitionPolicy::Monotonic;
        assert!(!policy.permits(&TransferState::Pending, &TransferState::Submitted));
        assert!(policy.permits(&TransferState::Submitted, &TransferState::Pending));
        assert!(policy.permits(&TransferState::Created, &included()));
        assert!(!policy.permits(&included(), &TransferState::Deleted));
    }

    #[test]
    fn test_default_policy() {
        assert_eq!(TransitionPolicy::default(), TransitionPolicy::Monotonic);
        let parsed: TransitionPolicy = serde_yaml::from_str("terminal_final").unwrap();
        assert_eq!(parsed, TransitionPolicy::TerminalFinal);
    }
}
