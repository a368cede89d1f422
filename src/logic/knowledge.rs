//! Game logic: the type hierarchy, the action rules, the constraints and the
//! table of reverse rules, loaded from TOML.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;

use crate::error::{LogicError, LogicResult};

use super::proposition::Signature;
use super::rule::Rule;
use super::types::TypeHierarchy;
use super::variable::Mapping;

/// The bundled knowledge base.
const BUILTIN: &str = include_str!("../../data/logic/textworld.toml");

/// On-disk layout of a logic file.
#[derive(Debug, Deserialize)]
struct LogicFile {
    #[serde(default)]
    constants: Vec<String>,
    #[serde(default)]
    reverse_rules: Vec<(String, String)>,
    /// `name = "parent"`, or `name = ""` for a root type.
    #[serde(default)]
    types: BTreeMap<String, String>,
    #[serde(default)]
    rules: Vec<RuleEntry>,
    #[serde(default)]
    constraints: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    name: String,
    rule: String,
}

/// Types, rules and constraints of a game.
///
/// Passed explicitly to everything that needs it; [`Logic::builtin`] is a
/// convenience constructor, not a global.
#[derive(Debug, Clone, Default)]
pub struct Logic {
    types: Arc<TypeHierarchy>,
    rules: Vec<Arc<Rule>>,
    constraints: Vec<Arc<Rule>>,
    /// Reverse rule names, both directions.
    reverse_rules: BTreeMap<String, String>,
}

impl Logic {
    /// An empty logic over the given types.
    pub fn new(types: TypeHierarchy) -> Self {
        Self {
            types: Arc::new(types),
            ..Self::default()
        }
    }

    /// The bundled rooms / doors / containers / objects knowledge base.
    pub fn builtin() -> LogicResult<Self> {
        Self::from_toml_str(BUILTIN, "<builtin>")
    }

    /// Parse a logic from TOML text.
    pub fn parse(text: &str) -> LogicResult<Self> {
        Self::from_toml_str(text, "<inline>")
    }

    /// Load a logic file from disk.
    pub fn load(path: impl AsRef<Path>) -> LogicResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LogicError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    fn from_toml_str(text: &str, origin: &str) -> LogicResult<Self> {
        let file: LogicFile = toml::from_str(text).map_err(|e| LogicError::Toml {
            path: origin.to_string(),
            message: e.to_string(),
        })?;

        // Parents may be declared after their children in the table.
        let mut types = TypeHierarchy::new();
        let mut pending: Vec<(String, Option<String>)> = file
            .types
            .into_iter()
            .map(|(name, parent)| {
                let parent = parent.trim().to_string();
                (name, (!parent.is_empty()).then_some(parent))
            })
            .collect();
        while !pending.is_empty() {
            let ready = pending
                .iter()
                .position(|(_, parent)| parent.as_deref().is_none_or(|p| types.contains(p)));
            match ready {
                Some(i) => {
                    let (name, parent) = pending.remove(i);
                    types.add_type(&name, parent.as_deref())?;
                }
                None => {
                    let name = pending[0].1.clone().unwrap_or_default();
                    return Err(LogicError::UnknownType { name });
                }
            }
        }
        for constant in &file.constants {
            types.add_constant(constant)?;
        }

        let mut logic = Logic::new(types);
        for entry in &file.rules {
            logic.add_rule(Rule::parse_body(&entry.name, &entry.rule)?)?;
        }
        for entry in &file.constraints {
            logic.add_constraint(Rule::parse_body(&entry.name, &entry.rule)?)?;
        }
        for (rule, reverse) in &file.reverse_rules {
            logic.add_reverse_rule(rule, reverse)?;
        }

        tracing::debug!(
            origin,
            rules = logic.rules.len(),
            constraints = logic.constraints.len(),
            "logic loaded"
        );
        Ok(logic)
    }

    fn check_rule(&self, rule: &Rule) -> LogicResult<()> {
        if self.rule(&rule.name).is_some() || self.constraint(&rule.name).is_some() {
            return Err(LogicError::DuplicateRule {
                name: rule.name.clone(),
            });
        }
        if let Some(ph) = rule
            .placeholders()
            .iter()
            .find(|ph| !self.types.contains(&ph.ty))
        {
            return Err(LogicError::UnknownType {
                name: ph.ty.clone(),
            });
        }
        Ok(())
    }

    pub fn add_rule(&mut self, rule: Rule) -> LogicResult<()> {
        self.check_rule(&rule)?;
        self.rules.push(Arc::new(rule));
        Ok(())
    }

    pub fn add_constraint(&mut self, constraint: Rule) -> LogicResult<()> {
        self.check_rule(&constraint)?;
        self.constraints.push(Arc::new(constraint));
        Ok(())
    }

    /// Declare `rule` and `reverse` as undoing each other.
    pub fn add_reverse_rule(&mut self, rule: &str, reverse: &str) -> LogicResult<()> {
        if self.rule(rule).is_none() || self.rule(reverse).is_none() {
            return Err(LogicError::UnknownReverseRule {
                rule: rule.to_string(),
                reverse: reverse.to_string(),
            });
        }
        self.reverse_rules
            .insert(rule.to_string(), reverse.to_string());
        self.reverse_rules
            .insert(reverse.to_string(), rule.to_string());
        Ok(())
    }

    pub fn types(&self) -> &Arc<TypeHierarchy> {
        &self.types
    }

    /// Action rules, in declaration order.
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    pub fn constraints(&self) -> &[Arc<Rule>] {
        &self.constraints
    }

    pub fn rule(&self, name: &str) -> Option<&Arc<Rule>> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn constraint(&self, name: &str) -> Option<&Arc<Rule>> {
        self.constraints.iter().find(|r| r.name == name)
    }

    /// Name of the rule undoing `name` (`open/d` -> `close/d`).
    pub fn reverse_of(&self, name: &str) -> Option<&str> {
        self.reverse_rules.get(name).map(String::as_str)
    }

    /// Rules whose name matches any of the patterns. Patterns are anchored at
    /// the start of the name, so `go.*` selects every `go/` rule and
    /// `take/.*` selects `take/c` but not `take`.
    pub fn rules_matching<S: AsRef<str>>(&self, patterns: &[S]) -> LogicResult<Vec<Arc<Rule>>> {
        let regexes = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(&format!("^(?:{p})")).map_err(|e| LogicError::Pattern {
                    pattern: p.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<LogicResult<Vec<_>>>()?;
        Ok(self
            .rules
            .iter()
            .filter(|rule| regexes.iter().any(|re| re.is_match(&rule.name)))
            .cloned()
            .collect())
    }

    /// Every predicate signature mentioned by a rule or constraint.
    pub fn signatures(&self) -> BTreeSet<Signature> {
        self.rules
            .iter()
            .chain(&self.constraints)
            .flat_map(|rule| rule.preconditions.iter().chain(&rule.postconditions))
            .map(|pred| pred.signature())
            .collect()
    }

    /// Bindings of the constants, used as the default fixed mapping.
    pub fn constants_mapping(&self) -> Mapping {
        self.types.constants_mapping()
    }
}
