//! Lifecycle state machines
//!
//! Edit session: `Closed → Open → {Committed, Cancelled}`
//!
//! Association saga:
//! ```text
//! Idle → CreatingTarget → Linking → Committed
//!   └──────────────────────┘   └→ CompensatingDelete → Failed
//! CreatingTarget → Failed, Linking → Failed
//! ```

use crate::error::StateMachineError;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A finite lifecycle with an explicit transition table
pub trait Lifecycle: Copy + Eq + Debug + 'static {
    /// States reachable in one step
    fn allowed_transitions(self) -> &'static [Self];

    /// No outgoing transitions
    fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

/// Validates a state transition
///
/// # Errors
/// `StateMachineError::IllegalTransition` when `to` is not reachable from `from`
pub fn validate_transition<S: Lifecycle>(from: S, to: S) -> Result<(), StateMachineError> {
    if from.allowed_transitions().contains(&to) {
        Ok(())
    } else {
        tracing::warn!(?from, ?to, "illegal state transition");
        Err(StateMachineError::IllegalTransition)
    }
}

/// Edit session state of a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditState {
    /// Display mode
    Closed,
    /// Editor widget shown
    Open,
    /// Value sent to the server
    Committed,
    /// Reverted without a request
    Cancelled,
}

impl Lifecycle for EditState {
    fn allowed_transitions(self) -> &'static [Self] {
        use EditState::*;
        match self {
            Closed => &[Open],
            Open => &[Committed, Cancelled],
            Committed | Cancelled => &[],
        }
    }
}

/// Association saga state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SagaState {
    /// Not started
    Idle,
    /// Creating a new target resource
    CreatingTarget,
    /// Linking source to target
    Linking,
    /// Deleting the target created by this saga
    CompensatingDelete,
    /// Link established
    Committed,
    /// Aborted
    Failed,
}

impl Lifecycle for SagaState {
    fn allowed_transitions(self) -> &'static [Self] {
        use SagaState::*;
        match self {
            Idle => &[CreatingTarget, Linking],
            CreatingTarget => &[Linking, Failed],
            Linking => &[Committed, CompensatingDelete, Failed],
            CompensatingDelete => &[Failed],
            Committed | Failed => &[],
        }
    }
}
