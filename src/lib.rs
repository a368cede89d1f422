// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # questloom
//!
//! Quest generation for text adventures by forward and backward chaining of
//! typed, parametrized rules over a relational world state.
//!
//! ## Architecture
//!
//! - **Logic** (`logic`): variables, propositions, rules, type hierarchy and
//!   the TOML-backed knowledge base
//! - **State** (`state`): indexed fact store and rule assignment
//! - **Chaining** (`chaining`): lazy search for action chains, with parallel
//!   subquests, constraint checking and cycle detection
//! - **Queries** (`query`): what is in scope of the player
//! - **Config** (`config`): search options and state files on disk
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use questloom::chaining::{self, ChainingOptions};
//! use questloom::logic::{Logic, Proposition};
//! use questloom::state::State;
//!
//! let logic = Arc::new(Logic::builtin().unwrap());
//! let state = State::with_facts(
//!     logic.types().clone(),
//!     [
//!         Proposition::parse("at(P, hall: r)").unwrap(),
//!         Proposition::parse("at(coin: o, hall: r)").unwrap(),
//!     ],
//! );
//! let options = ChainingOptions::new(logic);
//! for chain in chaining::chain(state, &options).unwrap() {
//!     println!("{chain}");
//! }
//! ```

pub mod chaining;
pub mod config;
pub mod error;
pub mod logic;
pub mod query;
pub mod state;

pub use chaining::{chain, sample_quest, Chain, ChainingOptions};
pub use error::{QuestError, QuestResult};
pub use logic::Logic;
pub use state::State;
