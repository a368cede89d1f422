//! Loading logic, chaining configs and state files from disk.
//!
//! These tests write small files into a temporary directory and run a search
//! from them end to end, as the CLI does.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use questloom::chaining;
use questloom::config::{read_state_file, ChainingConfig};
use questloom::error::{ConfigError, LogicError, QuestError};
use questloom::logic::{Logic, Proposition};

const KEYS_LOGIC: &str = r#"
constants = ["P"]
reverse_rules = [["pick", "toss"]]

[types]
P = ""
r = ""
k = "o"
o = ""

[[rules]]
name = "pick"
rule = "$at(P, r) & at(o, r) -> held(o)"

[[rules]]
name = "toss"
rule = "$at(P, r) & held(o) -> at(o, r)"

[[constraints]]
name = "held_and_placed"
rule = "held(o) & at(o, r) -> fail()"
"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn logic_file_loads_and_declares_subtypes() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write(dir.path(), "keys.toml", KEYS_LOGIC);

    let logic = Logic::load(&path).unwrap();
    assert_eq!(logic.rules().len(), 2);
    assert_eq!(logic.constraints().len(), 1);
    assert_eq!(logic.reverse_of("toss"), Some("pick"));
    // `k` is declared before its parent `o`.
    assert!(logic.types().is_subtype("k", "o"));
    assert!(logic.types().is_constant("P"));
}

#[test]
fn chain_from_files() {
    let dir = tempfile::TempDir::new().unwrap();
    let logic_path = write(dir.path(), "keys.toml", KEYS_LOGIC);
    let state_path = write(
        dir.path(),
        "hall.facts",
        "# the player and a key\nat(P, hall: r)\nat(brass key: k, hall: r)\n",
    );
    let config_path = write(dir.path(), "quest.toml", "max_depth = 2\n");

    let logic = Arc::new(Logic::load(&logic_path).unwrap());
    let state = read_state_file(&state_path, logic.types().clone()).unwrap();
    let config = ChainingConfig::load(&config_path).unwrap();
    let options = config.to_options(logic).unwrap();

    let chains: Vec<_> = chaining::chain(state, &options).unwrap().collect();
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].actions[0].to_string(), "pick(P, hall, brass key)");
    // Tossing the key straight back only undoes the pick.
    assert_eq!(chains[0].len(), 1);
}

#[test]
fn missing_logic_file_is_an_io_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = Logic::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, LogicError::Io { .. }));
}

#[test]
fn malformed_logic_is_reported() {
    let dir = tempfile::TempDir::new().unwrap();

    let path = write(dir.path(), "broken.toml", "[types\n");
    assert!(matches!(Logic::load(&path), Err(LogicError::Toml { .. })));

    let path = write(
        dir.path(),
        "orphan.toml",
        "[types]\nk = \"o\"\n",
    );
    assert!(matches!(
        Logic::load(&path),
        Err(LogicError::UnknownType { ref name }) if name == "o"
    ));

    let path = write(
        dir.path(),
        "dangling.toml",
        "reverse_rules = [[\"a\", \"b\"]]\n[types]\nt = \"\"\n",
    );
    assert!(matches!(
        Logic::load(&path),
        Err(LogicError::UnknownReverseRule { .. })
    ));
}

#[test]
fn state_file_errors_name_the_line() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write(dir.path(), "bad.facts", "at(P, hall: r)\n\nat P\n");
    let logic = Logic::builtin().unwrap();
    let err = read_state_file(&path, logic.types().clone()).unwrap_err();
    assert!(matches!(err, ConfigError::State { line: 3, .. }));
}

#[test]
fn state_file_round_trips_display() {
    let dir = tempfile::TempDir::new().unwrap();
    let logic = Logic::builtin().unwrap();
    let facts = ["at(P, hall: r)", "in(rusty key: k, I)"];
    let state = questloom::State::with_facts(
        logic.types().clone(),
        facts.iter().map(|f| Proposition::parse(f).unwrap()),
    );
    let path = write(dir.path(), "saved.facts", &state.to_string());
    let loaded = read_state_file(&path, logic.types().clone()).unwrap();
    assert_eq!(loaded, state);
}

#[test]
fn invalid_config_surfaces_as_quest_error() {
    let logic = Arc::new(Logic::builtin().unwrap());
    let config = ChainingConfig {
        min_depth: 4,
        max_depth: 2,
        ..Default::default()
    };
    let options = config.to_options(logic).unwrap();
    let err: QuestError = chaining::chain(questloom::State::default(), &options)
        .err()
        .unwrap()
        .into();
    assert!(matches!(err, QuestError::Chain(_)));
}
