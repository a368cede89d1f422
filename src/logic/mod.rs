//! The relational data model: typed variables, propositions, rules and the
//! game logic that groups them.

pub mod knowledge;
pub mod proposition;
pub mod rule;
pub mod types;
pub mod variable;

pub use knowledge::Logic;
pub use proposition::{Predicate, Proposition, Signature, FAIL};
pub use rule::{Action, Rule};
pub use types::TypeHierarchy;
pub use variable::{Mapping, PartialMapping, Placeholder, Variable};
