use serde::{Deserialize, Serialize};

/// Rewrite lifecycle of one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeState {
    /// Not yet dispatched.
    Unscheduled,
    /// One task currently owns this type.
    InFlight,
    /// Committed to the registry; terminal.
    Accepted,
    /// Attempts exhausted; terminal.
    Failed,
}

/// Violation of the type lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// The requested transition is not in the lifecycle.
    #[error("illegal type state transition")]
    IllegalTransition,
}

/// States reachable in one step from `from`.
pub fn allowed_transitions(from: TypeState) -> Vec<TypeState> {
    use TypeState::*;
    match from {
        Unscheduled => vec![InFlight],
        InFlight => vec![Accepted, Failed],
        Accepted => vec![],
        Failed => vec![],
    }
}

/// Validates a type state transition.
///
/// Accepted and failed are terminal: a failed type is never retried
/// automatically, and an accepted registry entry is immutable.
pub fn validate_transition(from: TypeState, to: TypeState) -> Result<(), StateError> {
    if allowed_transitions(from).into_iter().any(|s| s == to) {
        Ok(())
    } else {
        Err(StateError::IllegalTransition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions_allowed() {
        validate_transition(TypeState::Unscheduled, TypeState::InFlight).unwrap();
        validate_transition(TypeState::InFlight, TypeState::Accepted).unwrap();
        validate_transition(TypeState::InFlight, TypeState::Failed).unwrap();
    }

    #[test]
    fn terminal_states_are_terminal() {
        assert!(validate_transition(TypeState::Accepted, TypeState::InFlight).is_err());
        assert!(validate_transition(TypeState::Failed, TypeState::InFlight).is_err());
        assert!(validate_transition(TypeState::Unscheduled, TypeState::Accepted).is_err());
    }
}
