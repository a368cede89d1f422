//! Rules (parametrized pre/postcondition templates) and actions (rules with
//! every placeholder bound).
//!
//! Text notation: `name :: pre & $kept -> post`. A precondition marked with
//! `$` is also a postcondition, so it survives the rule firing. The
//! postconditions list the kept preconditions first, then the explicit ones.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::error::{LogicError, LogicResult};

use super::proposition::{Predicate, Proposition};
use super::variable::{Mapping, Placeholder, Variable};

/// Items of `of` that are not in `minus`, without duplicates, in order.
fn difference<'a, T: PartialEq>(of: &'a [T], minus: &'a [T]) -> impl Iterator<Item = &'a T> {
    of.iter()
        .enumerate()
        .filter(move |(i, item)| !minus.contains(item) && !of[..*i].contains(item))
        .map(|(_, item)| item)
}

/// A named precondition/postcondition template over placeholders.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub preconditions: Vec<Predicate>,
    pub postconditions: Vec<Predicate>,
    /// Placeholders in order of first appearance (preconditions first).
    placeholders: Vec<Placeholder>,
    inverse: OnceLock<Arc<Rule>>,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        preconditions: Vec<Predicate>,
        postconditions: Vec<Predicate>,
    ) -> Self {
        let mut placeholders: Vec<Placeholder> = Vec::new();
        for pred in preconditions.iter().chain(&postconditions) {
            for ph in &pred.parameters {
                if !placeholders.contains(ph) {
                    placeholders.push(ph.clone());
                }
            }
        }
        Self {
            name: name.into(),
            preconditions,
            postconditions,
            placeholders,
            inverse: OnceLock::new(),
        }
    }

    /// Parse `name :: pre & $kept -> post`.
    pub fn parse(text: &str) -> LogicResult<Self> {
        let (name, body) = text.split_once("::").ok_or_else(|| LogicError::RuleParse {
            text: text.to_string(),
            message: "expected `name :: preconditions -> postconditions`".into(),
        })?;
        Self::parse_body(name.trim(), body)
    }

    /// Parse the `pre & $kept -> post` part of a rule named `name`.
    pub fn parse_body(name: &str, body: &str) -> LogicResult<Self> {
        let rule_error = |message: &str| LogicError::RuleParse {
            text: format!("{name} :: {}", body.trim()),
            message: message.to_string(),
        };
        if name.is_empty() {
            return Err(rule_error("rule has no name"));
        }
        let (lhs, rhs) = body
            .split_once("->")
            .ok_or_else(|| rule_error("missing `->`"))?;

        let mut preconditions = Vec::new();
        let mut kept = Vec::new();
        for term in lhs.split('&').map(str::trim).filter(|t| !t.is_empty()) {
            match term.strip_prefix('$') {
                Some(term) => {
                    let pred = Predicate::parse(term)?;
                    kept.push(pred.clone());
                    preconditions.push(pred);
                }
                None => preconditions.push(Predicate::parse(term)?),
            }
        }
        if preconditions.is_empty() {
            return Err(LogicError::MalformedRule {
                rule: name.to_string(),
            });
        }

        let mut postconditions = kept;
        for term in rhs.split('&').map(str::trim).filter(|t| !t.is_empty()) {
            postconditions.push(Predicate::parse(term)?);
        }
        Ok(Self::new(name, preconditions, postconditions))
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Postconditions that are not preconditions.
    pub fn added(&self) -> impl Iterator<Item = &Predicate> {
        difference(&self.postconditions, &self.preconditions)
    }

    /// Preconditions that are not postconditions.
    pub fn removed(&self) -> impl Iterator<Item = &Predicate> {
        difference(&self.preconditions, &self.postconditions)
    }

    /// The rule with pre- and postconditions swapped. The name is kept, so
    /// backward search still recognises `open/d` or `go/north`.
    pub fn inverse(&self) -> Arc<Rule> {
        self.inverse
            .get_or_init(|| {
                Arc::new(Rule::new(
                    self.name.clone(),
                    self.postconditions.clone(),
                    self.preconditions.clone(),
                ))
            })
            .clone()
    }

    /// Bind every placeholder; `None` if any placeholder is unbound.
    pub fn instantiate(&self, mapping: &Mapping) -> Option<Action> {
        let preconditions = self
            .preconditions
            .iter()
            .map(|p| p.instantiate(mapping))
            .collect::<Option<Vec<_>>>()?;
        let postconditions = self
            .postconditions
            .iter()
            .map(|p| p.instantiate(mapping))
            .collect::<Option<Vec<_>>>()?;
        Some(Action::new(self.name.clone(), preconditions, postconditions))
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.preconditions == other.preconditions
            && self.postconditions == other.postconditions
    }
}

impl Eq for Rule {}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |preds: &[Predicate]| {
            preds
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" & ")
        };
        write!(
            f,
            "{} :: {} -> {}",
            self.name,
            join(&self.preconditions),
            join(&self.postconditions)
        )
    }
}

/// A grounded rule instance, executable against a matching state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Action {
    pub name: String,
    pub preconditions: Vec<Proposition>,
    pub postconditions: Vec<Proposition>,
}

impl Action {
    pub fn new(
        name: impl Into<String>,
        preconditions: Vec<Proposition>,
        postconditions: Vec<Proposition>,
    ) -> Self {
        Self {
            name: name.into(),
            preconditions,
            postconditions,
        }
    }

    /// Propositions made true.
    pub fn added(&self) -> impl Iterator<Item = &Proposition> {
        difference(&self.postconditions, &self.preconditions)
    }

    /// Propositions made false.
    pub fn removed(&self) -> impl Iterator<Item = &Proposition> {
        difference(&self.preconditions, &self.postconditions)
    }

    /// The action undoing this one. Keeps the name.
    pub fn inverse(&self) -> Action {
        Action::new(
            self.name.clone(),
            self.postconditions.clone(),
            self.preconditions.clone(),
        )
    }

    /// Variables in order of first appearance.
    pub fn variables(&self) -> Vec<&Variable> {
        let mut vars: Vec<&Variable> = Vec::new();
        for prop in self.preconditions.iter().chain(&self.postconditions) {
            for var in &prop.arguments {
                if !vars.contains(&var) {
                    vars.push(var);
                }
            }
        }
        vars
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vars: Vec<&str> = self.variables().iter().map(|v| v.name.as_str()).collect();
        write!(f, "{}({})", self.name, vars.join(", "))
    }
}
