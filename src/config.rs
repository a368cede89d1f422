//! Chaining configuration and state files.
//!
//! A chaining config is a TOML file whose fields mirror
//! [`ChainingOptions`]; rules are selected per depth with regex patterns.
//!
//! ```toml
//! backward = true
//! max_depth = 3
//! subquests = true
//! create_variables = true
//! rules_per_depth = [["take/c", "take/s"], ["go.*"], ["open/d"]]
//! ```
//!
//! A state file holds one proposition per line in text notation, with `#`
//! starting a comment.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chaining::{ChainingOptions, RulesPerDepth};
use crate::error::{ConfigError, ConfigResult};
use crate::logic::{Logic, Proposition, TypeHierarchy};
use crate::state::State;

/// Search options as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainingConfig {
    /// Chain towards the given state instead of away from it.
    pub backward: bool,
    pub min_depth: usize,
    pub max_depth: usize,
    pub min_breadth: usize,
    pub max_breadth: usize,
    /// Report every prefix of a chain.
    pub subquests: bool,
    /// Allow new variables to be created.
    pub create_variables: bool,
    /// Seed for shuffling candidate actions; `None` keeps the canonical order.
    pub seed: Option<u64>,
    /// Number of chains `sample` draws before picking the longest.
    pub nb_retry: usize,
    /// Rule name patterns per depth. Deeper levels use every rule.
    pub rules_per_depth: Vec<Vec<String>>,
}

impl Default for ChainingConfig {
    fn default() -> Self {
        Self {
            backward: false,
            min_depth: 1,
            max_depth: 1,
            min_breadth: 1,
            max_breadth: 1,
            subquests: false,
            create_variables: false,
            seed: None,
            nb_retry: 200,
            rules_per_depth: Vec::new(),
        }
    }
}

impl ChainingConfig {
    /// Parse from TOML text. `origin` names the source in errors.
    pub fn from_toml_str(text: &str, origin: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Resolve against `logic`. Patterns matching no rule are kept (that
    /// depth then offers nothing) and reported with a warning.
    pub fn to_options(&self, logic: Arc<Logic>) -> ConfigResult<ChainingOptions> {
        let mut options = ChainingOptions::new(logic.clone());
        options.backward = self.backward;
        options.min_depth = self.min_depth;
        options.max_depth = self.max_depth;
        options.min_breadth = self.min_breadth;
        options.max_breadth = self.max_breadth;
        options.subquests = self.subquests;
        options.create_variables = self.create_variables;
        options.seed = self.seed;

        if self.rules_per_depth.is_empty() {
            return Ok(options);
        }
        for (depth, patterns) in self.rules_per_depth.iter().enumerate() {
            for pattern in patterns {
                if logic.rules_matching(&[pattern])?.is_empty() {
                    warn!(depth, pattern = %pattern, "rule pattern matches no rule");
                }
            }
        }
        let policy = RulesPerDepth::from_patterns(&logic, &self.rules_per_depth)?;
        Ok(options.with_policy(policy))
    }
}

/// Parse a state from text, one proposition per line.
pub fn parse_state(text: &str, origin: &str, types: Arc<TypeHierarchy>) -> ConfigResult<State> {
    let mut state = State::new(types);
    for (index, line) in text.lines().enumerate() {
        let line = match line.split_once('#') {
            Some((content, _)) => content,
            None => line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }
        let prop = Proposition::parse(line).map_err(|e| ConfigError::State {
            path: origin.to_string(),
            line: index + 1,
            message: e.to_string(),
        })?;
        state.add_fact(prop);
    }
    Ok(state)
}

/// Read a state file.
pub fn read_state_file(path: impl AsRef<Path>, types: Arc<TypeHierarchy>) -> ConfigResult<State> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_state(&content, &path.display().to_string(), types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chaining::ChainPolicy;

    #[test]
    fn empty_config_is_default() {
        let config = ChainingConfig::from_toml_str("", "inline").unwrap();
        assert_eq!(config, ChainingConfig::default());
        assert_eq!(config.nb_retry, 200);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = ChainingConfig::from_toml_str(
            "backward = true\nmax_depth = 3\nrules_per_depth = [[\"take/.*\"], [\"go.*\"]]\n",
            "inline",
        )
        .unwrap();
        assert!(config.backward);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.min_depth, 1);
        assert_eq!(config.rules_per_depth.len(), 2);
    }

    #[test]
    fn bad_config_reports_origin() {
        let err = ChainingConfig::from_toml_str("max_depth = \"deep\"", "quest.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == "quest.toml"));
    }

    #[test]
    fn config_to_options() {
        let logic = Arc::new(Logic::builtin().unwrap());
        let config = ChainingConfig {
            max_depth: 4,
            seed: Some(7),
            rules_per_depth: vec![vec!["open/.*".into()], vec!["nothing".into()]],
            ..Default::default()
        };
        let options = config.to_options(logic.clone()).unwrap();
        assert_eq!(options.max_depth, 4);
        assert_eq!(options.seed, Some(7));
        assert_eq!(options.policy.get_rules(&logic, 0).len(), 2);
        assert!(options.policy.get_rules(&logic, 1).is_empty());
        assert_eq!(options.policy.get_rules(&logic, 2).len(), logic.rules().len());
    }

    #[test]
    fn state_text_skips_comments_and_blanks() {
        let logic = Logic::builtin().unwrap();
        let text = "# the hall\nat(P, hall: r)\n\nat(coin: o, hall: r)  # shiny\n";
        let state = parse_state(text, "inline", logic.types().clone()).unwrap();
        assert_eq!(state.len(), 2);
        assert!(state.is_fact(&Proposition::parse("at(coin: o, hall: r)").unwrap()));
    }

    #[test]
    fn state_errors_carry_the_line() {
        let logic = Logic::builtin().unwrap();
        let err = parse_state("at(P, hall: r)\nat P hall\n", "s.txt", logic.types().clone())
            .unwrap_err();
        assert!(matches!(err, ConfigError::State { line: 2, .. }));
    }
}
