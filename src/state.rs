//! The relational fact store.
//!
//! A [`State`] is the set of propositions currently true. Facts are indexed
//! by name for pattern matching, and the variables they mention are
//! reference-counted and indexed by type so that rule instantiation can ask
//! "which rooms exist?" without scanning every fact.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::logic::{
    Action, Mapping, PartialMapping, Placeholder, Predicate, Proposition, Rule, TypeHierarchy,
    Variable,
};

/// Total order over (possibly partial) assignments: unbound placeholders
/// first, then the bound pairs, each sorted.
pub(crate) fn mapping_sort_key(
    mapping: &PartialMapping,
) -> (Vec<Placeholder>, Vec<(Placeholder, Variable)>) {
    let mut absent = Vec::new();
    let mut present = Vec::new();
    for (ph, var) in mapping {
        match var {
            Some(var) => present.push((ph.clone(), var.clone())),
            None => absent.push(ph.clone()),
        }
    }
    // BTreeMap iteration is already sorted by placeholder.
    (absent, present)
}

/// A set of true propositions.
#[derive(Debug, Clone, Default)]
pub struct State {
    types: Arc<TypeHierarchy>,
    facts: HashSet<Proposition>,
    facts_by_name: HashMap<String, HashSet<Proposition>>,
    /// Number of argument slots referencing each variable.
    variable_refs: HashMap<Variable, usize>,
    /// Variables by their exact type.
    vars_by_type: HashMap<String, BTreeSet<Variable>>,
}

impl State {
    /// An empty state whose variables are typed by `types`.
    pub fn new(types: Arc<TypeHierarchy>) -> Self {
        Self {
            types,
            ..Self::default()
        }
    }

    pub fn with_facts(
        types: Arc<TypeHierarchy>,
        facts: impl IntoIterator<Item = Proposition>,
    ) -> Self {
        let mut state = Self::new(types);
        state.add_facts(facts);
        state
    }

    pub fn types(&self) -> &Arc<TypeHierarchy> {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn is_fact(&self, prop: &Proposition) -> bool {
        self.facts.contains(prop)
    }

    /// All facts, sorted.
    pub fn facts(&self) -> Vec<&Proposition> {
        let mut facts: Vec<_> = self.facts.iter().collect();
        facts.sort();
        facts
    }

    /// Facts named `name`, sorted.
    pub fn facts_with_name(&self, name: &str) -> Vec<&Proposition> {
        let mut facts: Vec<_> = self
            .facts_by_name
            .get(name)
            .map(|set| set.iter().collect())
            .unwrap_or_default();
        facts.sort();
        facts
    }

    /// Add a fact. Returns `false` if it was already true.
    pub fn add_fact(&mut self, prop: Proposition) -> bool {
        if self.facts.contains(&prop) {
            return false;
        }
        for var in &prop.arguments {
            let refs = self.variable_refs.entry(var.clone()).or_insert(0);
            *refs += 1;
            if *refs == 1 {
                self.vars_by_type
                    .entry(var.ty.clone())
                    .or_default()
                    .insert(var.clone());
            }
        }
        self.facts_by_name
            .entry(prop.name.clone())
            .or_default()
            .insert(prop.clone());
        self.facts.insert(prop);
        true
    }

    pub fn add_facts(&mut self, facts: impl IntoIterator<Item = Proposition>) {
        for fact in facts {
            self.add_fact(fact);
        }
    }

    /// Remove a fact. Removing a fact that is not true is a no-op.
    pub fn remove_fact(&mut self, prop: &Proposition) -> bool {
        if !self.facts.remove(prop) {
            return false;
        }
        if let Some(set) = self.facts_by_name.get_mut(&prop.name) {
            set.remove(prop);
            if set.is_empty() {
                self.facts_by_name.remove(&prop.name);
            }
        }
        for var in &prop.arguments {
            let Some(refs) = self.variable_refs.get_mut(var) else {
                continue;
            };
            *refs -= 1;
            if *refs == 0 {
                self.variable_refs.remove(var);
                if let Some(vars) = self.vars_by_type.get_mut(&var.ty) {
                    vars.remove(var);
                    if vars.is_empty() {
                        self.vars_by_type.remove(&var.ty);
                    }
                }
            }
        }
        true
    }

    pub fn remove_facts<'a>(&mut self, facts: impl IntoIterator<Item = &'a Proposition>) {
        for fact in facts {
            self.remove_fact(fact);
        }
    }

    /// Whether some fact mentions `var`.
    pub fn has_variable(&self, var: &Variable) -> bool {
        self.variable_refs.contains_key(var)
    }

    /// Every variable mentioned by a fact, sorted.
    pub fn variables(&self) -> BTreeSet<&Variable> {
        self.variable_refs.keys().collect()
    }

    /// Variables of type `ty` or any of its subtypes.
    pub fn variables_of_type(&self, ty: &str) -> BTreeSet<&Variable> {
        self.types
            .subtypes(ty)
            .iter()
            .filter_map(|t| self.vars_by_type.get(t))
            .flatten()
            .collect()
    }

    /// Whether every precondition of `action` holds.
    pub fn is_applicable(&self, action: &Action) -> bool {
        action.preconditions.iter().all(|p| self.is_fact(p))
    }

    /// Apply `action`: remove what it removes, add what it adds. Returns
    /// `false` and leaves the state untouched if it is not applicable.
    pub fn apply(&mut self, action: &Action) -> bool {
        if !self.is_applicable(action) {
            return false;
        }
        self.remove_facts(action.removed());
        self.add_facts(action.added().cloned());
        true
    }

    /// Every way to bind the placeholders of `rule` to variables of this
    /// state, respecting `fixed_mapping`. Distinct placeholders bind distinct
    /// variables.
    ///
    /// With `partial == false`, each precondition must match a fact; a
    /// placeholder that only appears in postconditions may bind any existing
    /// variable of its type. With `partial == true`, every free placeholder is
    /// either bound to an existing variable of its type or left unbound
    /// (`None`) for later creation, and a precondition may stay unmatched
    /// only while it mentions something this state does not have yet. A
    /// precondition over known variables alone must be a fact.
    ///
    /// The result is sorted and contains only the rule's placeholders.
    pub fn all_assignments(
        &self,
        rule: &Rule,
        fixed_mapping: &Mapping,
        partial: bool,
    ) -> Vec<PartialMapping> {
        let mut used: HashSet<Variable> = fixed_mapping.values().cloned().collect();
        let mut out = Vec::new();

        if partial {
            let mut mapping: PartialMapping = rule
                .placeholders()
                .iter()
                .filter_map(|ph| {
                    fixed_mapping
                        .get(ph)
                        .map(|var| (ph.clone(), Some(var.clone())))
                })
                .collect();
            let free: Vec<&Placeholder> = rule
                .placeholders()
                .iter()
                .filter(|ph| !fixed_mapping.contains_key(*ph))
                .collect();
            // checks[k] holds the preconditions decided once free[k] is.
            let mut checks: Vec<Vec<&Predicate>> = vec![Vec::new(); free.len()];
            let mut decided = true;
            for pred in &rule.preconditions {
                let last = pred
                    .parameters
                    .iter()
                    .filter_map(|ph| free.iter().position(|candidate| *candidate == ph))
                    .max();
                match last {
                    Some(k) => checks[k].push(pred),
                    None => decided &= self.admits(pred, &mapping),
                }
            }
            if decided {
                self.enumerate_partial(&free, &checks, &mut mapping, &mut used, &mut out);
            }
        } else {
            let mut mapping = fixed_mapping.clone();
            let unmatched: Vec<&Placeholder> = rule
                .placeholders()
                .iter()
                .filter(|ph| {
                    !fixed_mapping.contains_key(*ph)
                        && !rule.preconditions.iter().any(|p| p.parameters.contains(ph))
                })
                .collect();
            let mut complete = Vec::new();
            self.unify(rule, 0, &unmatched, &mut mapping, &mut used, &mut complete);
            out.extend(complete.into_iter().map(|mapping| {
                rule.placeholders()
                    .iter()
                    .map(|ph| (ph.clone(), mapping.get(ph).cloned()))
                    .collect::<PartialMapping>()
            }));
        }

        out.sort_by_cached_key(mapping_sort_key);
        out.dedup();
        out
    }

    /// Match precondition `idx` onward against facts.
    fn unify(
        &self,
        rule: &Rule,
        idx: usize,
        unmatched: &[&Placeholder],
        mapping: &mut Mapping,
        used: &mut HashSet<Variable>,
        out: &mut Vec<Mapping>,
    ) {
        let Some(pred) = rule.preconditions.get(idx) else {
            self.bind_unmatched(unmatched, mapping, used, out);
            return;
        };
        let Some(candidates) = self.facts_by_name.get(&pred.name) else {
            return;
        };
        for fact in candidates {
            if fact.arity() != pred.arity() {
                continue;
            }
            let mut bound: Vec<&Placeholder> = Vec::new();
            let mut matches = true;
            for (ph, var) in pred.parameters.iter().zip(&fact.arguments) {
                match mapping.get(ph) {
                    Some(existing) if existing == var => {}
                    Some(_) => {
                        matches = false;
                        break;
                    }
                    None => {
                        if used.contains(var) || !self.types.is_subtype(&var.ty, &ph.ty) {
                            matches = false;
                            break;
                        }
                        mapping.insert(ph.clone(), var.clone());
                        used.insert(var.clone());
                        bound.push(ph);
                    }
                }
            }
            if matches {
                self.unify(rule, idx + 1, unmatched, mapping, used, out);
            }
            for ph in bound {
                if let Some(var) = mapping.remove(ph) {
                    used.remove(&var);
                }
            }
        }
    }

    /// Bind placeholders no precondition mentions to any fitting variable.
    fn bind_unmatched(
        &self,
        unmatched: &[&Placeholder],
        mapping: &mut Mapping,
        used: &mut HashSet<Variable>,
        out: &mut Vec<Mapping>,
    ) {
        let Some((ph, rest)) = unmatched.split_first() else {
            out.push(mapping.clone());
            return;
        };
        for var in self.variables_of_type(&ph.ty) {
            if used.contains(var) {
                continue;
            }
            mapping.insert((*ph).clone(), var.clone());
            used.insert(var.clone());
            self.bind_unmatched(rest, mapping, used, out);
            used.remove(var);
            mapping.remove(*ph);
        }
    }

    fn enumerate_partial(
        &self,
        free: &[&Placeholder],
        checks: &[Vec<&Predicate>],
        mapping: &mut PartialMapping,
        used: &mut HashSet<Variable>,
        out: &mut Vec<PartialMapping>,
    ) {
        let (Some((ph, rest)), Some((due, later))) = (free.split_first(), checks.split_first())
        else {
            out.push(mapping.clone());
            return;
        };
        let candidates: Vec<Option<Variable>> = self
            .variables_of_type(&ph.ty)
            .into_iter()
            .filter(|var| !used.contains(*var))
            .cloned()
            .map(Some)
            .chain([None])
            .collect();
        for var in candidates {
            if let Some(var) = &var {
                used.insert(var.clone());
            }
            mapping.insert((*ph).clone(), var.clone());
            if due.iter().all(|pred| self.admits(pred, mapping)) {
                self.enumerate_partial(rest, later, mapping, used, out);
            }
            if let Some(var) = &var {
                used.remove(var);
            }
        }
        mapping.remove(*ph);
    }

    /// Whether `pred` may stand as a precondition under `mapping`: it is a
    /// fact, or one of its arguments is unbound or unknown to this state.
    fn admits(&self, pred: &Predicate, mapping: &PartialMapping) -> bool {
        let mut arguments = Vec::with_capacity(pred.arity());
        for ph in &pred.parameters {
            match mapping.get(ph) {
                Some(Some(var)) if self.has_variable(var) => arguments.push(var.clone()),
                _ => return true,
            }
        }
        self.is_fact(&Proposition::new(pred.name.clone(), arguments))
    }

    /// Every grounded action of `rule` whose preconditions hold.
    pub fn all_instantiations(&self, rule: &Rule) -> Vec<Action> {
        self.all_assignments(rule, &Mapping::new(), false)
            .into_iter()
            .filter_map(|partial| {
                let mapping: Mapping = partial
                    .into_iter()
                    .map(|(ph, var)| var.map(|var| (ph, var)))
                    .collect::<Option<_>>()?;
                rule.instantiate(&mapping)
            })
            .collect()
    }

    /// Every applicable action of any of `rules`.
    pub fn all_applicable_actions<'a>(
        &self,
        rules: impl IntoIterator<Item = &'a Rule>,
    ) -> Vec<Action> {
        rules
            .into_iter()
            .flat_map(|rule| self.all_instantiations(rule))
            .collect()
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.facts == other.facts
    }
}

impl Eq for State {}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fact in self.facts() {
            writeln!(f, "{fact}")?;
        }
        Ok(())
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.facts())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::Logic;

    fn prop(text: &str) -> Proposition {
        Proposition::parse(text).unwrap()
    }

    fn kitchen(logic: &Logic) -> State {
        State::with_facts(
            logic.types().clone(),
            [
                "at(P, kitchen: r)",
                "at(chest: c, kitchen: r)",
                "open(chest: c)",
                "in(apple: f, chest: c)",
                "in(robe: o, chest: c)",
                "in(rusty key: k, I)",
            ]
            .map(prop),
        )
    }

    #[test]
    fn facts_add_remove_and_variables() {
        let logic = Logic::builtin().unwrap();
        let mut state = kitchen(&logic);
        assert_eq!(state.len(), 6);
        assert!(!state.add_fact(prop("open(chest: c)")));

        let chest = Variable::new("chest", "c");
        assert!(state.has_variable(&chest));
        assert!(state.remove_fact(&prop("open(chest: c)")));
        assert!(!state.remove_fact(&prop("open(chest: c)")));
        assert!(state.has_variable(&chest));

        state.remove_fact(&prop("at(chest: c, kitchen: r)"));
        state.remove_fact(&prop("in(apple: f, chest: c)"));
        state.remove_fact(&prop("in(robe: o, chest: c)"));
        assert!(!state.has_variable(&chest));
        assert!(state.variables_of_type("c").is_empty());
    }

    #[test]
    fn variables_of_type_includes_subtypes() {
        let logic = Logic::builtin().unwrap();
        let state = kitchen(&logic);
        let objects: Vec<&str> = state
            .variables_of_type("o")
            .into_iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(objects, vec!["apple", "robe", "rusty key"]);
        assert_eq!(state.variables_of_type("t").len(), 4);
        assert_eq!(state.variables_of_type("k").len(), 1);
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let logic = Logic::builtin().unwrap();
        let a = kitchen(&logic);
        let mut facts: Vec<Proposition> = a.facts().into_iter().cloned().collect();
        facts.reverse();
        let b = State::with_facts(logic.types().clone(), facts);
        assert_eq!(a, b);
    }

    #[test]
    fn apply_checks_preconditions() {
        let logic = Logic::builtin().unwrap();
        let mut state = kitchen(&logic);
        let take = logic.rule("take/c").unwrap();
        let actions = state.all_instantiations(take);
        assert_eq!(actions.len(), 2);
        let names: Vec<String> = actions.iter().map(ToString::to_string).collect();
        assert!(names.contains(&"take/c(P, kitchen, chest, apple, I)".to_string()));

        let before = state.clone();
        assert!(state.apply(&actions[0]));
        assert_ne!(state, before);
        assert!(!state.apply(&actions[0]));
        assert!(state.apply(&actions[0].inverse()));
        assert_eq!(state, before);
    }

    #[test]
    fn assignments_bind_distinct_variables() {
        let logic = Logic::builtin().unwrap();
        let state = State::with_facts(
            logic.types().clone(),
            [
                "at(P, kitchen: r)",
                "at(P, bedroom: r)",
            ]
            .map(prop),
        );
        let r1 = logic.constraint("r1").unwrap();
        let assignments = state.all_assignments(r1, &logic.constants_mapping(), false);
        // (kitchen, bedroom) and (bedroom, kitchen); never a room with itself.
        assert_eq!(assignments.len(), 2);
        assert_eq!(state.all_applicable_actions([&**r1]).len(), 2);
    }

    #[test]
    fn partial_assignments_leave_placeholders_unbound() {
        let logic = Logic::builtin().unwrap();
        let state = State::with_facts(logic.types().clone(), [prop("at(P, room: r)")]);
        let rule = logic.rule("take/c").unwrap().inverse();
        let assignments = state.all_assignments(&rule, &logic.constants_mapping(), true);
        // r in {room, None}; c and o have no candidates.
        assert_eq!(assignments.len(), 2);
        let first = &assignments[0];
        assert_eq!(first.len(), 5);
        assert_eq!(
            first.get(&Placeholder::new("P", "P")),
            Some(&Some(Variable::new("P", "P")))
        );
        assert_eq!(
            first.get(&Placeholder::new("r", "r")),
            Some(&Some(Variable::new("room", "r")))
        );
        let unbound = |m: &PartialMapping| m.values().filter(|v| v.is_none()).count();
        assert_eq!(unbound(first), 2);
        assert_eq!(unbound(&assignments[1]), 3);
    }

    #[test]
    fn partial_assignments_match_preconditions_over_known_variables() {
        let logic = Logic::builtin().unwrap();
        let take = logic.rule("take/c").unwrap();
        let chest = Placeholder::new("c", "c");
        let closed = State::with_facts(
            logic.types().clone(),
            ["at(P, hall: r)", "at(chest: c, hall: r)"].map(prop),
        );
        // `open(chest)` is not a fact, so the chest cannot be bound.
        let assignments = closed.all_assignments(take, &logic.constants_mapping(), true);
        assert_eq!(assignments.len(), 2);
        assert!(assignments.iter().all(|m| m[&chest].is_none()));

        let mut open = closed.clone();
        open.add_fact(prop("open(chest: c)"));
        let assignments = open.all_assignments(take, &logic.constants_mapping(), true);
        assert_eq!(assignments.len(), 4);
        assert_eq!(assignments.iter().filter(|m| m[&chest].is_some()).count(), 2);
    }

    #[test]
    fn serializes_sorted_facts() {
        let logic = Logic::builtin().unwrap();
        let state = State::with_facts(logic.types().clone(), [prop("at(P, room: r)")]);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json[0]["name"], "at");
        assert_eq!(json[0]["arguments"][1]["type"], "r");
    }
}
