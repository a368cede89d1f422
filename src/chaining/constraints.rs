//! Constraint checking: a state is invalid when some constraint derives
//! `fail()`.

use std::sync::Arc;

use crate::logic::{Action, Proposition, Rule};
use crate::state::State;

/// Whether applying `constraint` to `state` would make `fail()` true.
/// Decided from the action's effects, without copying the state.
fn derives_fail(state: &State, constraint: &Action, fail: &Proposition) -> bool {
    if constraint.added().any(|p| p == fail) {
        return true;
    }
    state.is_fact(fail) && !constraint.removed().any(|p| p == fail)
}

/// `true` if no applicable constraint derives `fail()`.
pub fn check_state(state: &State, constraints: &[Arc<Rule>]) -> bool {
    let fail = Proposition::fail();
    constraints.iter().all(|rule| {
        state
            .all_instantiations(rule)
            .iter()
            .all(|constraint| !derives_fail(state, constraint, &fail))
    })
}

/// Every applicable constraint instance that derives `fail()`.
pub fn failing_constraints(state: &State, constraints: &[Arc<Rule>]) -> Vec<Action> {
    let fail = Proposition::fail();
    state
        .all_applicable_actions(constraints.iter().map(|rule| &**rule))
        .into_iter()
        .filter(|constraint| derives_fail(state, constraint, &fail))
        .collect()
}
