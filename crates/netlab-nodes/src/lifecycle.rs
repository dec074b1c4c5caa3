//! Node lifecycle state machine.
//!
//! This module defines the valid lifecycle transitions for a node driver and
//! the validation helpers every driver calls before doing any work.
//!
//! # State Machine
//!
//! ```text
//!   ┌───────────────┐
//!   │ Uninitialized │
//!   └───────┬───────┘
//!           │ init
//!           ▼
//!   ┌───────────────┐
//!   │  Initialized  │───────────────────────────────┐
//!   └───────┬───────┘                               │
//!           │ pre_deploy                            │
//!           ▼                                       │
//!   ┌───────────────┐◀─┐ pre_deploy (re-render)     │
//!   │  PreDeployed  │──┘                            │
//!   └───────┬───────┘───────────────────────────────┤
//!           │ deploy                                │
//!           ▼                                       │
//!   ┌───────────────┐◀─┐ deploy (surfaces conflict) │ delete
//!   │   Deployed    │──┘                            │
//!   └───────┬───────┘───────────────────────────────┤
//!           │ post_deploy                           │
//!           ▼                                       │
//!   ┌───────────────┐◀─┐ post_deploy                │
//!   │ PostDeployed  │──┘                            │
//!   └───────┬───────┘                               │
//!           │ delete                                ▼
//!           │                               ┌───────────────┐◀─┐
//!           └──────────────────────────────▶│    Deleted    │──┘ delete
//!                                           └───────────────┘
//! ```

use crate::error::{NodeError, Result};

/// Lifecycle state of a node driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeState {
    /// Driver constructed, `init` not yet called.
    #[default]
    Uninitialized,
    /// Configuration finalized.
    Initialized,
    /// Lab directory prepared and startup configuration rendered.
    PreDeployed,
    /// Container created and started.
    Deployed,
    /// Post-deploy actions ran (successfully or not).
    PostDeployed,
    /// Container deleted.
    Deleted,
}

/// Check if a state transition is valid according to the state machine.
#[must_use]
pub const fn is_valid_transition(from: NodeState, to: NodeState) -> bool {
    use NodeState::{Deleted, Deployed, Initialized, PostDeployed, PreDeployed, Uninitialized};

    matches!(
        (from, to),
        (Uninitialized, Initialized)
            // Re-rendering before deploy is allowed
            | (Initialized | PreDeployed, PreDeployed)
            // A repeated deploy reaches the runtime, which reports the conflict
            | (PreDeployed | Deployed, Deployed)
            | (Deployed | PostDeployed, PostDeployed)
            | (Initialized | PreDeployed | Deployed | PostDeployed | Deleted, Deleted)
    )
}

/// Validates a state transition and returns the target state if valid.
///
/// # Errors
///
/// Returns `NodeError::InvalidState` if the transition is not allowed.
pub fn validate_transition(node: &str, from: NodeState, to: NodeState) -> Result<NodeState> {
    if is_valid_transition(from, to) {
        Ok(to)
    } else {
        Err(NodeError::InvalidState {
            node: node.to_string(),
            from,
            to,
        })
    }
}

/// Returns true if the node has a running container.
#[must_use]
pub const fn is_deployed(state: NodeState) -> bool {
    matches!(state, NodeState::Deployed | NodeState::PostDeployed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions() {
        use NodeState::*;

        assert!(is_valid_transition(Uninitialized, Initialized));
        assert!(is_valid_transition(Initialized, PreDeployed));
        assert!(is_valid_transition(PreDeployed, Deployed));
        assert!(is_valid_transition(Deployed, PostDeployed));
        assert!(is_valid_transition(PostDeployed, Deleted));
    }

    #[test]
    fn repeatable_transitions() {
        use NodeState::*;

        assert!(is_valid_transition(PreDeployed, PreDeployed));
        assert!(is_valid_transition(Deployed, Deployed));
        assert!(is_valid_transition(PostDeployed, PostDeployed));
        assert!(is_valid_transition(Deleted, Deleted));
    }

    #[test]
    fn invalid_transitions() {
        use NodeState::*;

        // Can't skip init
        assert!(!is_valid_transition(Uninitialized, PreDeployed));
        assert!(!is_valid_transition(Uninitialized, Deleted));
        // Can't init twice
        assert!(!is_valid_transition(Initialized, Initialized));
        // Can't deploy without pre-deploy
        assert!(!is_valid_transition(Initialized, Deployed));
        // Can't go backwards
        assert!(!is_valid_transition(Deployed, PreDeployed));
        // Can't revive a deleted node
        assert!(!is_valid_transition(Deleted, Deployed));
    }

    #[test]
    fn validate_transition_err() {
        let result = validate_transition("r1", NodeState::Initialized, NodeState::Deployed);

        match result {
            Err(NodeError::InvalidState { node, from, to }) => {
                assert_eq!(node, "r1");
                assert_eq!(from, NodeState::Initialized);
                assert_eq!(to, NodeState::Deployed);
            }
            _ => panic!("expected InvalidState error"),
        }
    }

    #[test]
    fn deployed_states() {
        assert!(is_deployed(NodeState::Deployed));
        assert!(is_deployed(NodeState::PostDeployed));
        assert!(!is_deployed(NodeState::PreDeployed));
        assert!(!is_deployed(NodeState::Deleted));
    }
}
