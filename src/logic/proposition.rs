//! Propositions over variables, predicates over placeholders, and their
//! text notation `name(arg, arg: type)`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{LogicError, LogicResult};

use super::variable::{Mapping, Placeholder, Variable};

/// Name of the reserved proposition derived by violated constraints.
pub const FAIL: &str = "fail";

static RE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_/\-]*)\s*\((.*)\)\s*$").unwrap()
});

/// Split `name(a, b)` into its name and raw argument texts.
fn split_call(text: &str) -> LogicResult<(&str, Vec<&str>)> {
    let caps = RE_CALL
        .captures(text)
        .ok_or_else(|| LogicError::PropositionParse {
            text: text.to_string(),
            message: "expected `name(arguments)`".into(),
        })?;
    let (Some(name), Some(args)) = (caps.get(1), caps.get(2)) else {
        return Err(LogicError::PropositionParse {
            text: text.to_string(),
            message: "expected `name(arguments)`".into(),
        });
    };
    let args = args.as_str();
    let args = if args.trim().is_empty() {
        Vec::new()
    } else {
        args.split(',').collect()
    };
    Ok((name.as_str(), args))
}

/// Name and argument types of a proposition or predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub types: Vec<String>,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.types.join(", "))
    }
}

/// A fact: a named relation over variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Proposition {
    pub name: String,
    pub arguments: Vec<Variable>,
}

impl Proposition {
    pub fn new(name: impl Into<String>, arguments: Vec<Variable>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// The reserved `fail()` proposition.
    pub fn fail() -> Self {
        Self::new(FAIL, Vec::new())
    }

    /// Parse `at(P, kitchen: r)`.
    pub fn parse(text: &str) -> LogicResult<Self> {
        let (name, args) = split_call(text)?;
        let arguments = args
            .into_iter()
            .map(Variable::parse)
            .collect::<LogicResult<Vec<_>>>()?;
        Ok(Self::new(name, arguments))
    }

    pub fn arity(&self) -> usize {
        self.arguments.len()
    }

    pub fn signature(&self) -> Signature {
        Signature {
            name: self.name.clone(),
            types: self.arguments.iter().map(|v| v.ty.clone()).collect(),
        }
    }
}

impl fmt::Display for Proposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", arg.name, arg.ty)?;
        }
        f.write_str(")")
    }
}

/// A relation over placeholders, as it appears inside a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Predicate {
    pub name: String,
    pub parameters: Vec<Placeholder>,
}

impl Predicate {
    pub fn new(name: impl Into<String>, parameters: Vec<Placeholder>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    /// Parse `link(r, d, r')`.
    pub fn parse(text: &str) -> LogicResult<Self> {
        let (name, args) = split_call(text)?;
        let parameters = args
            .into_iter()
            .map(Placeholder::parse)
            .collect::<LogicResult<Vec<_>>>()?;
        Ok(Self::new(name, parameters))
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn signature(&self) -> Signature {
        Signature {
            name: self.name.clone(),
            types: self.parameters.iter().map(|p| p.ty.clone()).collect(),
        }
    }

    /// Substitute every placeholder; `None` if one is unbound.
    pub fn instantiate(&self, mapping: &Mapping) -> Option<Proposition> {
        let arguments = self
            .parameters
            .iter()
            .map(|ph| mapping.get(ph).cloned())
            .collect::<Option<Vec<_>>>()?;
        Some(Proposition::new(self.name.clone(), arguments))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        write!(f, "{}({})", self.name, params.join(", "))
    }
}
