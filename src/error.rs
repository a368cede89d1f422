//! Rich diagnostic error types for questloom.
//!
//! Search pruning is never an error: an action that cannot be grounded, a
//! state that violates a constraint, or a cycle all silently drop a branch.
//! The types here cover what the caller got wrong (malformed logic, bad
//! options, unreadable files) and carry miette codes and help text so the
//! fix is obvious.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for questloom.
#[derive(Debug, Error, Diagnostic)]
pub enum QuestError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Logic(#[from] LogicError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Logic errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LogicError {
    #[error("cannot parse proposition '{text}': {message}")]
    #[diagnostic(
        code(questloom::logic::proposition_parse),
        help(
            "Propositions are written `name(arg, arg: type)`. An argument \
             without `: type` uses its own name as its type (e.g. `P`, `I`)."
        )
    )]
    PropositionParse { text: String, message: String },

    #[error("cannot parse rule '{text}': {message}")]
    #[diagnostic(
        code(questloom::logic::rule_parse),
        help(
            "Rules are written `name :: pre & $kept -> post`. Prefix a \
             precondition with `$` to keep it true after the rule fires."
        )
    )]
    RuleParse { text: String, message: String },

    #[error("cannot parse type declaration '{text}'")]
    #[diagnostic(
        code(questloom::logic::type_parse),
        help("Type declarations are written `name` or `name: parent`.")
    )]
    TypeParse { text: String },

    #[error("unknown type '{name}'")]
    #[diagnostic(
        code(questloom::logic::unknown_type),
        help("Declare the type (and its parent) in the `types` list before using it.")
    )]
    UnknownType { name: String },

    #[error("duplicate type '{name}'")]
    #[diagnostic(
        code(questloom::logic::duplicate_type),
        help("Each type may only be declared once.")
    )]
    DuplicateType { name: String },

    #[error("duplicate rule '{name}'")]
    #[diagnostic(
        code(questloom::logic::duplicate_rule),
        help("Rule and constraint names must be unique within a logic.")
    )]
    DuplicateRule { name: String },

    #[error("reverse rule pair ({rule}, {reverse}) names an unknown rule")]
    #[diagnostic(
        code(questloom::logic::unknown_reverse),
        help("Both rules of a reverse pair must be declared in `rules`.")
    )]
    UnknownReverseRule { rule: String, reverse: String },

    #[error("rule '{rule}' has no preconditions")]
    #[diagnostic(
        code(questloom::logic::malformed_rule),
        help("Every rule needs at least one precondition before `->`.")
    )]
    MalformedRule { rule: String },

    #[error("fixed mapping binds placeholder {placeholder} to {variable} of a different type")]
    #[diagnostic(
        code(questloom::logic::fixed_mapping_type),
        help("Constants must be bound to variables of the placeholder's own type.")
    )]
    FixedMappingType { placeholder: String, variable: String },

    #[error("invalid rule pattern '{pattern}': {message}")]
    #[diagnostic(
        code(questloom::logic::pattern),
        help("Rule patterns are regular expressions anchored at the start of the rule name.")
    )]
    Pattern { pattern: String, message: String },

    #[error("failed to read logic file: {path}")]
    #[diagnostic(code(questloom::logic::io), help("Ensure the file exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse logic file {path}: {message}")]
    #[diagnostic(
        code(questloom::logic::toml),
        help("Check the TOML syntax. See data/logic/textworld.toml for a complete example.")
    )]
    Toml { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Chaining errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ChainError {
    #[error("invalid chaining options: {message}")]
    #[diagnostic(
        code(questloom::chain::invalid_options),
        help("Check the depth and breadth bounds: min must not exceed max, and max_breadth must be at least 1.")
    )]
    InvalidOptions { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Logic(#[from] LogicError),
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("the player cannot be found in the state")]
    #[diagnostic(
        code(questloom::query::no_player),
        help("Add an `at(P, room: r)` fact to the state.")
    )]
    PlayerNotFound,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Logic(#[from] LogicError),
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read file: {path}")]
    #[diagnostic(code(questloom::config::io), help("Ensure the file exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse chaining config {path}: {message}")]
    #[diagnostic(
        code(questloom::config::parse),
        help("Check the TOML syntax. Every field is optional and defaults to a depth-1 forward search.")
    )]
    Parse { path: String, message: String },

    #[error("state file {path}, line {line}: {message}")]
    #[diagnostic(
        code(questloom::config::state),
        help("State files hold one proposition per line; `#` starts a comment.")
    )]
    State {
        path: String,
        line: usize,
        message: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Logic(#[from] LogicError),
}

/// Result type for logic construction and parsing.
pub type LogicResult<T> = std::result::Result<T, LogicError>;

/// Result type for chaining entry points.
pub type ChainResult<T> = std::result::Result<T, ChainError>;

/// Result type for state queries.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Convenience alias for functions returning questloom results.
pub type QuestResult<T> = std::result::Result<T, QuestError>;
