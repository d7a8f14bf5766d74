//! Safety module state transitions.
//!
//! | from \ to | Active        | Triggered     | Paused   |
//! |-----------|---------------|---------------|----------|
//! | Active    | -             | auto (1)      | O, P, M  |
//! | Triggered | auto (0)      | -             | O, P, M  |
//! | Paused    | O, M (0)      | O, M (1)      | -        |
//!
//! - (0) only with no pending slashes
//! - (1) only with at least one pending slash
//! - auto: performed by `trigger` / `slash`, checked with `CallerRole::NoRole`
//! - O = owner, P = pauser, M = manager

use crate::types::{CallerRole, SafetyModuleState};

pub fn is_valid_state_transition(
    role: CallerRole,
    from: SafetyModuleState,
    to: SafetyModuleState,
    num_pending_slashes: u32,
) -> bool {
    use CallerRole::*;
    use SafetyModuleState::*;

    let has_pending = num_pending_slashes > 0;
    match (from, to) {
        (Active, Triggered) => role == NoRole && has_pending,
        (Triggered, Active) => role == NoRole && !has_pending,
        (Active, Paused) | (Triggered, Paused) => matches!(role, Owner | Pauser | Manager),
        (Paused, Active) => matches!(role, Owner | Manager) && !has_pending,
        (Paused, Triggered) => matches!(role, Owner | Manager) && has_pending,
        _ => false,
    }
}

/// State an unpause lands in.
pub fn unpaused_state(num_pending_slashes: u32) -> SafetyModuleState {
    if num_pending_slashes > 0 {
        SafetyModuleState::Triggered
    } else {
        SafetyModuleState::Active
    }
}
