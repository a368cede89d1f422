//! Quest generation by chaining actions.
//!
//! [`chain`] lazily enumerates the action sequences that start from a state
//! (forward chaining) or end in it (backward chaining), bounded in depth and
//! in the number of parallel subquests. [`sample_quest`] picks the longest of
//! the first few chains.

pub mod chainer;
pub mod constraints;
pub mod node;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::{ChainError, ChainResult, LogicError, LogicResult};
use crate::logic::{Action, Logic, Mapping, Rule, Variable};
use crate::state::State;

pub use chainer::{is_navigation, Chains, NAVIGATION_PREFIX, OPEN_DOOR};
pub use constraints::{check_state, failing_constraints};

/// Caller-supplied hooks steering the search.
pub trait ChainPolicy: Send + Sync {
    /// Rules that may be used at `depth` (0 for the first action).
    fn get_rules(&self, logic: &Logic, depth: usize) -> Vec<Arc<Rule>> {
        let _ = depth;
        logic.rules().to_vec()
    }

    /// Whether `action` may be taken in `state`.
    fn check_action(&self, state: &State, action: &Action) -> bool {
        default_check_action(state, action)
    }

    /// Whether a fresh variable may be created.
    fn check_new_variable(&self, state: &State, var: &Variable) -> bool {
        let _ = (state, var);
        true
    }
}

/// Rejects actions that would need a new fact about variables that all exist
/// already: such an action adds nothing new to the puzzle.
pub fn default_check_action(state: &State, action: &Action) -> bool {
    action.preconditions.iter().all(|prop| {
        state.is_fact(prop) || !prop.arguments.iter().all(|var| state.has_variable(var))
    })
}

/// Every rule at every depth, default action and variable checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl ChainPolicy for DefaultPolicy {}

/// A fixed list of rules per depth. Deeper levels use every rule.
#[derive(Debug, Clone, Default)]
pub struct RulesPerDepth {
    depths: Vec<Vec<Arc<Rule>>>,
}

impl RulesPerDepth {
    pub fn new(depths: Vec<Vec<Arc<Rule>>>) -> Self {
        Self { depths }
    }

    /// The same rules at every depth up to `max_depth`.
    pub fn uniform(rules: Vec<Arc<Rule>>, max_depth: usize) -> Self {
        Self::new(vec![rules; max_depth])
    }

    /// Select rules per depth with [`Logic::rules_matching`] patterns.
    pub fn from_patterns<S: AsRef<str>>(logic: &Logic, patterns: &[Vec<S>]) -> LogicResult<Self> {
        let depths = patterns
            .iter()
            .map(|depth| logic.rules_matching(depth))
            .collect::<LogicResult<Vec<_>>>()?;
        Ok(Self::new(depths))
    }
}

impl ChainPolicy for RulesPerDepth {
    fn get_rules(&self, logic: &Logic, depth: usize) -> Vec<Arc<Rule>> {
        match self.depths.get(depth) {
            Some(rules) => rules.clone(),
            None => logic.rules().to_vec(),
        }
    }
}

/// Search options.
#[derive(Clone)]
pub struct ChainingOptions {
    /// Produce chains ending at the given state instead of starting from it.
    pub backward: bool,
    /// Bounds on the length of each subquest.
    pub min_depth: usize,
    pub max_depth: usize,
    /// Bounds on the number of parallel subquests.
    pub min_breadth: usize,
    pub max_breadth: usize,
    /// Report every prefix, not only maximal chains.
    pub subquests: bool,
    /// Allow unbound placeholders, filled with new variables.
    pub create_variables: bool,
    /// Placeholders bound ahead of time (the constants by default).
    pub fixed_mapping: Mapping,
    /// Shuffle candidate assignments with this seed.
    pub seed: Option<u64>,
    pub logic: Arc<Logic>,
    pub policy: Arc<dyn ChainPolicy>,
}

impl ChainingOptions {
    /// Forward search of depth 1 and breadth 1 over every rule of `logic`.
    pub fn new(logic: Arc<Logic>) -> Self {
        Self {
            backward: false,
            min_depth: 1,
            max_depth: 1,
            min_breadth: 1,
            max_breadth: 1,
            subquests: false,
            create_variables: false,
            fixed_mapping: logic.constants_mapping(),
            seed: None,
            logic,
            policy: Arc::new(DefaultPolicy),
        }
    }

    pub fn with_policy(mut self, policy: impl ChainPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Check bounds, and that each fixed variable has the placeholder's type
    /// or a subtype of it.
    pub fn validate(&self) -> ChainResult<()> {
        if self.min_depth > self.max_depth {
            return Err(ChainError::InvalidOptions {
                message: format!(
                    "min_depth ({}) exceeds max_depth ({})",
                    self.min_depth, self.max_depth
                ),
            });
        }
        if self.max_breadth == 0 {
            return Err(ChainError::InvalidOptions {
                message: "max_breadth must be at least 1".into(),
            });
        }
        if self.min_breadth > self.max_breadth {
            return Err(ChainError::InvalidOptions {
                message: format!(
                    "min_breadth ({}) exceeds max_breadth ({})",
                    self.min_breadth, self.max_breadth
                ),
            });
        }
        let types = self.logic.types();
        if let Some((ph, var)) = self
            .fixed_mapping
            .iter()
            .find(|(ph, var)| !types.is_subtype(&var.ty, &ph.ty))
        {
            return Err(LogicError::FixedMappingType {
                placeholder: format!("{}: {}", ph.name, ph.ty),
                variable: format!("{}: {}", var.name, var.ty),
            }
            .into());
        }
        Ok(())
    }
}

impl fmt::Debug for ChainingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainingOptions")
            .field("backward", &self.backward)
            .field("min_depth", &self.min_depth)
            .field("max_depth", &self.max_depth)
            .field("min_breadth", &self.min_breadth)
            .field("max_breadth", &self.max_breadth)
            .field("subquests", &self.subquests)
            .field("create_variables", &self.create_variables)
            .field("fixed_mapping", &self.fixed_mapping)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

/// An initial state and the actions of a quest, in play order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chain {
    pub initial_state: State,
    pub actions: Vec<Action>,
    /// Breadth index (subquest) of each action.
    pub subquest_ids: Vec<usize>,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The state after playing every action; `None` if one is not applicable.
    pub fn final_state(&self) -> Option<State> {
        let mut state = self.initial_state.clone();
        for action in &self.actions {
            if !state.apply(action) {
                return None;
            }
        }
        Some(state)
    }

    /// Actions grouped by subquest, each group in play order.
    pub fn subquests(&self) -> BTreeMap<usize, Vec<&Action>> {
        let mut groups: BTreeMap<usize, Vec<&Action>> = BTreeMap::new();
        for (action, id) in self.actions.iter().zip(&self.subquest_ids) {
            groups.entry(*id).or_default().push(action);
        }
        groups
    }

    /// Drop trailing navigation unless the chain is only navigation.
    fn strip_trailing_navigation(&mut self) {
        if self.actions.iter().all(is_navigation) {
            return;
        }
        while self.actions.last().is_some_and(is_navigation) {
            self.actions.pop();
            self.subquest_ids.pop();
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Chain([")?;
        for action in &self.actions {
            writeln!(f, "    {action},")?;
        }
        write!(f, "])")
    }
}

/// Chains starting from (or, backward, ending at) `state`.
///
/// Options are validated up front; an exhausted search is an empty iterator,
/// not an error.
pub fn chain(state: State, options: &ChainingOptions) -> ChainResult<Chains> {
    options.validate()?;
    debug!(?options, facts = state.len(), "chaining started");
    Ok(Chains::new(state, options.clone()))
}

/// The longest of the first `nb_retry` chains, without trailing navigation.
/// Stops early once a chain reaches `max_depth`.
pub fn sample_quest(
    state: State,
    options: &ChainingOptions,
    nb_retry: usize,
) -> ChainResult<Option<Chain>> {
    let mut best: Option<Chain> = None;
    for mut candidate in chain(state, options)?.take(nb_retry) {
        candidate.strip_trailing_navigation();
        if candidate.len() > best.as_ref().map_or(0, Chain::len) {
            best = Some(candidate);
        }
        if best.as_ref().is_some_and(|b| b.len() >= options.max_depth) {
            break;
        }
    }
    debug!(length = best.as_ref().map_or(0, Chain::len), "quest sampled");
    Ok(best)
}
