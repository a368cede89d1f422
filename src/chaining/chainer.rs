//! Forward and backward chaining over a tree of states.
//!
//! The search is depth-first over an explicit stack. Expanding a node
//! enumerates every assignment of the rules allowed at its depth, grounds
//! each one (creating variables if allowed), and keeps the actions that pass
//! the navigation filter, the caller's policy, the constraints and the cycle
//! check. Nodes that still have breadth to spare may also backtrack into
//! sibling assignments that were accepted earlier, which starts a parallel
//! subquest from the current state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, trace};

use crate::logic::{Action, Mapping, PartialMapping, Placeholder, Proposition, Rule, Variable};
use crate::state::State;

use super::constraints;
use super::node::{BacktrackSlice, ChainNode, NodeArena, NodeId, PartialAction};
use super::{Chain, ChainingOptions};

/// Name prefix of navigation rules.
pub const NAVIGATION_PREFIX: &str = "go/";

/// Opening a door right before moving makes the move part of the same
/// causal story.
pub const OPEN_DOOR: &str = "open/d";

pub fn is_navigation(action: &Action) -> bool {
    action.name.starts_with(NAVIGATION_PREFIX)
}

/// Whether `cause` makes true one of the `relevant` propositions.
fn enables(cause: &Action, relevant: &HashSet<&Proposition>) -> bool {
    cause.added().any(|p| relevant.contains(p))
}

pub(crate) struct Chainer {
    options: ChainingOptions,
    rng: Option<StdRng>,
}

impl Chainer {
    pub(crate) fn new(options: ChainingOptions) -> Self {
        let rng = options.seed.map(StdRng::seed_from_u64);
        Self { options, rng }
    }

    pub(crate) fn options(&self) -> &ChainingOptions {
        &self.options
    }

    /// Direct forward/backward step from `node`.
    pub(crate) fn chain(&mut self, arena: &NodeArena, node: NodeId) -> Vec<ChainNode> {
        let parent = &arena[node];
        if parent.depth >= self.options.max_depth {
            return Vec::new();
        }
        let Some(state) = parent.state.as_ref() else {
            return Vec::new();
        };

        let rules = self
            .options
            .policy
            .get_rules(&self.options.logic, parent.depth);
        let mut assignments = self.all_assignments(state, &rules);
        if let Some(rng) = self.rng.as_mut() {
            assignments.shuffle(rng);
        }

        let mut partials = Vec::new();
        let mut accepted = Vec::new();
        for partial in &assignments {
            let Some((action, mapping)) = self.try_instantiate(state, partial) else {
                continue;
            };
            if !self.check_action(arena, node, &action) {
                continue;
            }
            let Some(new_state) = self.apply(arena, node, &action) else {
                continue;
            };
            // The completed mapping is kept, so backtracking reuses the
            // variables created here.
            partials.push(PartialAction::new(partial.rule.clone(), mapping));
            accepted.push((action, new_state));
        }

        let partials: Arc<[PartialAction]> = partials.into();
        accepted
            .into_iter()
            .enumerate()
            .map(|(i, (action, new_state))| {
                let mut backtracks = parent.backtracks.clone();
                backtracks.push(BacktrackSlice::new(partials.clone(), i + 1));
                ChainNode {
                    parent: Some(node),
                    state: Some(new_state),
                    action: Some(action),
                    backtracks,
                    depth: parent.depth + 1,
                    breadth: parent.breadth,
                }
            })
            .collect()
    }

    /// Start parallel subquests by taking a not-yet-used sibling assignment of
    /// an earlier depth, applied to the current state.
    pub(crate) fn backtrack(&self, arena: &NodeArena, node: NodeId) -> Vec<ChainNode> {
        let current = &arena[node];
        if current.breadth >= self.options.max_breadth {
            return Vec::new();
        }
        let Some(state) = current.state.as_ref() else {
            return Vec::new();
        };

        let mut children = Vec::new();
        for (i, slice) in current.backtracks.iter().enumerate() {
            for (j, partial) in slice.iter().enumerate() {
                let Some((action, _)) = self.try_instantiate(state, partial) else {
                    continue;
                };
                let Some(new_state) = self.apply(arena, node, &action) else {
                    continue;
                };
                let mut backtracks = current.backtracks[..i].to_vec();
                backtracks.push(slice.after(j));
                children.push(ChainNode {
                    parent: Some(node),
                    state: Some(new_state),
                    action: Some(action),
                    backtracks,
                    depth: i + 1,
                    breadth: current.breadth + 1,
                });
            }
        }
        children
    }

    /// Every assignment of `rules` (inverted when chaining backward), sorted.
    fn all_assignments(&self, state: &State, rules: &[Arc<Rule>]) -> Vec<PartialAction> {
        let mut assignments = Vec::new();
        for rule in rules {
            let rule = if self.options.backward {
                rule.inverse()
            } else {
                rule.clone()
            };
            for mapping in state.all_assignments(
                &rule,
                &self.options.fixed_mapping,
                self.options.create_variables,
            ) {
                assignments.push(PartialAction::new(rule.clone(), mapping));
            }
        }
        assignments.sort_by_cached_key(PartialAction::sort_key);
        assignments
    }

    /// Ground a partial action, creating variables for unbound placeholders.
    /// Returns the action and the completed mapping.
    fn try_instantiate(
        &self,
        state: &State,
        partial: &PartialAction,
    ) -> Option<(Action, PartialMapping)> {
        let rule = &partial.rule;
        let mut mapping = partial.mapping.clone();

        let mut type_counts: HashMap<&str, usize> = HashMap::new();
        if self.options.create_variables {
            for ph in rule.placeholders() {
                type_counts
                    .entry(ph.ty.as_str())
                    .or_insert_with(|| state.variables_of_type(&ph.ty).len());
            }
        }

        let mut complete = Mapping::new();
        for ph in rule.placeholders() {
            let var = match mapping.get(ph).cloned().flatten() {
                Some(var) => var,
                None if self.options.create_variables => {
                    let var = self.create_variable(state, ph, &mut type_counts)?;
                    mapping.insert(ph.clone(), Some(var.clone()));
                    var
                }
                None => return None,
            };
            complete.insert(ph.clone(), var);
        }

        let action = rule.instantiate(&complete)?;
        Some((action, mapping))
    }

    /// Mint a variable named after the placeholder type and a per-type
    /// counter, priming the name until it is unused.
    fn create_variable(
        &self,
        state: &State,
        ph: &Placeholder,
        type_counts: &mut HashMap<&str, usize>,
    ) -> Option<Variable> {
        let count = type_counts.get(ph.ty.as_str()).copied().unwrap_or(0);
        let mut var = Variable::new(format!("{}_{count}", ph.ty), ph.ty.clone());
        while state.has_variable(&var) {
            var.name.push('\'');
        }

        if !self.options.policy.check_new_variable(state, &var) {
            trace!(reason = "new_variable", variable = %var.name, "pruned");
            return None;
        }
        if let Some(count) = type_counts.get_mut(ph.ty.as_str()) {
            *count += 1;
        }
        Some(var)
    }

    /// Navigation filter followed by the policy's own check.
    ///
    /// Walks up past trailing navigation to the last substantive action. A
    /// non-navigation action must then depend on both the most recent action
    /// and that last substantive action, so unrelated chains do not get
    /// glued together by walking around.
    fn check_action(&self, arena: &NodeArena, node: NodeId, action: &Action) -> bool {
        let backward = self.options.backward;

        let mut nav_parent = node;
        while let Some(nav_action) = arena[nav_parent].action.as_ref() {
            if !is_navigation(nav_action) {
                break;
            }
            let Some(parent) = arena[nav_parent].parent else {
                break;
            };
            // Going through a door is navigation unless the door was just opened.
            if arena[parent]
                .action
                .as_ref()
                .is_some_and(|a| a.name == OPEN_DOOR)
            {
                break;
            }
            if backward && action.name == OPEN_DOOR {
                break;
            }
            nav_parent = parent;
        }

        if let Some(nav_action) = arena[nav_parent].action.as_ref() {
            if !is_navigation(action) {
                let related = if backward {
                    let recent = action.inverse();
                    let post_navigation = nav_action.inverse();
                    let relevant: HashSet<&Proposition> =
                        post_navigation.preconditions.iter().collect();
                    enables(&recent, &relevant)
                } else {
                    let relevant: HashSet<&Proposition> = action.preconditions.iter().collect();
                    let recent = arena[node].action.as_ref();
                    recent.is_some_and(|recent| enables(recent, &relevant))
                        && enables(nav_action, &relevant)
                };
                if !related {
                    trace!(reason = "navigation", action = %action, "pruned");
                    return false;
                }
            }
        }

        let Some(state) = arena[node].state.as_ref() else {
            return false;
        };
        if !self.options.policy.check_action(state, action) {
            trace!(reason = "check_action", action = %action, "pruned");
            return false;
        }
        true
    }

    /// Apply `action` on top of `node`'s state, adding its preconditions
    /// first. `None` if a constraint is violated or the result repeats a
    /// state already on the path from the root.
    fn apply(&self, arena: &NodeArena, node: NodeId, action: &Action) -> Option<State> {
        let mut new_state = arena[node].state.as_ref()?.clone();
        new_state.add_facts(action.preconditions.iter().cloned());
        if !self.check_state(&new_state) {
            trace!(reason = "constraint", action = %action, "pruned before applying");
            return None;
        }

        new_state.apply(action);
        if !self.check_state(&new_state) {
            trace!(reason = "constraint", action = %action, "pruned after applying");
            return None;
        }

        let mut replay = new_state.clone();
        replay.apply(&action.inverse());
        if replay == new_state {
            trace!(reason = "cycle", action = %action, "pruned no-op");
            return None;
        }
        for (_, ancestor) in arena.ancestors(node) {
            let Some(previous) = ancestor.action.as_ref() else {
                break;
            };
            replay.apply(&previous.inverse());
            if replay == new_state {
                trace!(reason = "cycle", action = %action, "pruned");
                return None;
            }
        }

        Some(new_state)
    }

    fn check_state(&self, state: &State) -> bool {
        constraints::check_state(state, self.options.logic.constraints())
    }

    /// Build the chain ending at `node`, whose state is `state`.
    pub(crate) fn make_chain(&self, arena: &NodeArena, node: NodeId, state: &State) -> Chain {
        let backward = self.options.backward;
        let mut actions = Vec::new();
        let mut subquest_ids = Vec::new();
        for (_, ancestor) in arena.ancestors(node) {
            let Some(action) = ancestor.action.as_ref() else {
                break;
            };
            actions.push(if backward {
                action.inverse()
            } else {
                action.clone()
            });
            subquest_ids.push(ancestor.breadth);
        }

        let mut initial_state = state.clone();
        if !backward {
            for action in &actions {
                initial_state.apply(&action.inverse());
            }
            actions.reverse();
            subquest_ids.reverse();
        }

        Chain {
            initial_state,
            actions,
            subquest_ids,
        }
    }
}

/// Lazy sequence of chains. Work stops when the caller stops pulling.
pub struct Chains {
    chainer: Chainer,
    arena: NodeArena,
    stack: Vec<NodeId>,
}

impl Chains {
    pub(crate) fn new(state: State, options: ChainingOptions) -> Self {
        let mut arena = NodeArena::new();
        let root = arena.push(ChainNode::root(state));
        Self {
            chainer: Chainer::new(options),
            arena,
            stack: vec![root],
        }
    }

    /// Number of search nodes created so far.
    pub fn nodes_explored(&self) -> usize {
        self.arena.len()
    }
}

impl Iterator for Chains {
    type Item = Chain;

    fn next(&mut self) -> Option<Chain> {
        while let Some(id) = self.stack.pop() {
            let children = self.chainer.chain(&self.arena, id);
            let no_children = children.is_empty();
            for child in children {
                let child = self.arena.push(child);
                self.stack.push(child);
            }
            let candidate = no_children || self.chainer.options().subquests;
            if candidate {
                for child in self.chainer.backtrack(&self.arena, id) {
                    let child = self.arena.push(child);
                    self.stack.push(child);
                }
            }

            // Children hold their own snapshots; this one is only needed to
            // extract the chain.
            let node = &mut self.arena[id];
            node.backtracks = Vec::new();
            let Some(state) = node.state.take() else {
                continue;
            };
            let (depth, breadth) = (node.depth, node.breadth);
            let options = self.chainer.options();
            if candidate && depth >= options.min_depth && breadth >= options.min_breadth {
                let chain = self.chainer.make_chain(&self.arena, id, &state);
                debug!(depth, breadth, actions = chain.actions.len(), "chain found");
                return Some(chain);
            }
        }
        None
    }
}
