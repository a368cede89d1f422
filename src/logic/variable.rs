//! Variables (entities of a world) and placeholders (typed slots of a rule).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LogicError, LogicResult};

/// A typed entity reference. Identity is the `(name, type)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }

    /// Parse `name: type`, or `name` alone, which is its own type (`P`, `I`).
    pub fn parse(text: &str) -> LogicResult<Self> {
        let (name, ty) = split_typed(text)?;
        Ok(Self::new(name, ty.unwrap_or(name)))
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A typed slot of a rule, bound to a [`Variable`] on instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Placeholder {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Placeholder {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }

    /// Parse `name: type` or `name`. Without an explicit type the name with
    /// its primes stripped is the type, so `r'` and `r''` are rooms.
    pub fn parse(text: &str) -> LogicResult<Self> {
        let (name, ty) = split_typed(text)?;
        let ty = ty.unwrap_or_else(|| name.trim_end_matches('\''));
        if ty.is_empty() {
            return Err(LogicError::PropositionParse {
                text: text.to_string(),
                message: "placeholder has no type".into(),
            });
        }
        Ok(Self::new(name, ty))
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A complete binding of placeholders to variables.
pub type Mapping = BTreeMap<Placeholder, Variable>;

/// A binding where some placeholders may still be unbound (`None`), to be
/// filled with freshly created variables.
pub type PartialMapping = BTreeMap<Placeholder, Option<Variable>>;

fn split_typed(text: &str) -> LogicResult<(&str, Option<&str>)> {
    let (name, ty) = match text.split_once(':') {
        Some((name, ty)) => (name.trim(), Some(ty.trim())),
        None => (text.trim(), None),
    };
    if name.is_empty() || ty.is_some_and(str::is_empty) {
        return Err(LogicError::PropositionParse {
            text: text.to_string(),
            message: "expected `name` or `name: type`".into(),
        });
    }
    Ok((name, ty))
}
