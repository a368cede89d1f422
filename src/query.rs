//! Scope queries: what the player can see and reach from where they stand.
//!
//! Each query is a small set of rules whose postcondition is the answer. The
//! rules are matched against the state like any other rule, so subtypes are
//! found through their parents (an `f` is in scope wherever an `o` would be).

use crate::error::{QueryError, QueryResult};
use crate::logic::{Action, Proposition, Rule, Variable};
use crate::state::State;

const PLAYER_LOCATION: &str = "query :: at(P, r) -> result(r)";

const EXITS: [&str; 4] = [
    "query :: at(P, r) & south_of(r, r') -> north()",
    "query :: at(P, r) & north_of(r, r') -> south()",
    "query :: at(P, r) & east_of(r, r') -> west()",
    "query :: at(P, r) & west_of(r, r') -> east()",
];

const ENTITIES: [&str; 7] = [
    "query :: in(o, I) -> result(o)",
    "query :: at(P, r) & at(o, r) -> result(o)",
    "query :: at(P, r) & at(d, r) -> result(d)",
    "query :: at(P, r) & at(s, r) -> result(s)",
    "query :: at(P, r) & at(c, r) -> result(c)",
    "query :: at(P, r) & at(s, r) & on(o, s) -> result(o)",
    "query :: at(P, r) & at(c, r) & open(c) & in(o, c) -> result(o)",
];

const PREDICATES: [&str; 10] = [
    "query :: at(P, r) -> at(P, r)",
    "query :: in(o, I) -> in(o, I)",
    "query :: at(P, r) & at(o, r) -> at(o, r)",
    "query :: at(P, r) & at(d, r) -> at(d, r)",
    "query :: at(P, r) & at(s, r) -> at(s, r)",
    "query :: at(P, r) & at(c, r) -> at(c, r)",
    "query :: at(P, r) & at(s, r) & on(o, s) -> on(o, s)",
    "query :: at(P, r) & at(c, r) & open(c) -> open(c)",
    "query :: at(P, r) & at(c, r) & closed(c) -> closed(c)",
    "query :: at(P, r) & at(c, r) & open(c) & in(o, c) -> in(o, c)",
];

fn answers(state: &State, rules: &[&str]) -> QueryResult<Vec<Action>> {
    let rules = rules
        .iter()
        .map(|text| Rule::parse(text))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(state.all_applicable_actions(&rules))
}

/// First postcondition of each answer.
fn results(actions: Vec<Action>) -> Vec<Proposition> {
    actions
        .into_iter()
        .filter_map(|action| action.postconditions.into_iter().next())
        .collect()
}

/// First argument of the first postcondition of each answer.
fn result_arguments(actions: Vec<Action>) -> Vec<Variable> {
    results(actions)
        .into_iter()
        .filter_map(|prop| prop.arguments.into_iter().next())
        .collect()
}

/// The room holding the player.
pub fn find_player_location(state: &State) -> QueryResult<Variable> {
    result_arguments(answers(state, &[PLAYER_LOCATION])?)
        .into_iter()
        .next()
        .ok_or(QueryError::PlayerNotFound)
}

/// Directions out of the player's room, as `north()`, `south()`, ...
pub fn find_exits_in_scope(state: &State) -> QueryResult<Vec<Proposition>> {
    Ok(results(answers(state, &EXITS)?))
}

/// Entities the player carries or can see.
pub fn find_entities_in_scope(state: &State) -> QueryResult<Vec<Variable>> {
    Ok(result_arguments(answers(state, &ENTITIES)?))
}

/// Facts about the player's surroundings.
pub fn find_predicates_in_scope(state: &State) -> QueryResult<Vec<Proposition>> {
    Ok(results(answers(state, &PREDICATES)?))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::logic::Logic;

    fn kitchen() -> State {
        let logic = Logic::builtin().unwrap();
        let facts = [
            "at(P, kitchen: r)",
            "at(key: o, study: r)",
            "in(knife: o, I)",
            "at(table: s, kitchen: r)",
            "on(book: o, table: s)",
            "at(fridge: c, kitchen: r)",
            "in(egg: f, fridge: c)",
            "in(milk: f, fridge: c)",
            "open(fridge: c)",
            "at(cabinet: c, kitchen: r)",
            "closed(cabinet: c)",
            "in(plate: o, cabinet: c)",
            "north_of(kitchen: r, study: r)",
            "south_of(study: r, kitchen: r)",
            "west_of(kitchen: r, bedroom: r)",
        ];
        State::with_facts(
            logic.types().clone(),
            facts.iter().map(|f| Proposition::parse(f).unwrap()),
        )
    }

    #[test]
    fn player_location() {
        let location = find_player_location(&kitchen()).unwrap();
        assert_eq!(location, Variable::new("kitchen", "r"));

        let empty = State::default();
        assert!(matches!(
            find_player_location(&empty),
            Err(QueryError::PlayerNotFound)
        ));
    }

    #[test]
    fn exits() {
        let exits: BTreeSet<String> = find_exits_in_scope(&kitchen())
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(exits, BTreeSet::from(["south".to_string(), "east".to_string()]));
    }

    #[test]
    fn entities() {
        let names: BTreeSet<String> = find_entities_in_scope(&kitchen())
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        let expected: BTreeSet<String> =
            ["knife", "table", "book", "fridge", "egg", "milk", "cabinet"]
                .into_iter()
                .map(String::from)
                .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn predicates() {
        let found: BTreeSet<Proposition> = find_predicates_in_scope(&kitchen())
            .unwrap()
            .into_iter()
            .collect();
        let expected: BTreeSet<Proposition> = [
            "at(P, kitchen: r)",
            "in(knife: o, I)",
            "at(table: s, kitchen: r)",
            "on(book: o, table: s)",
            "at(fridge: c, kitchen: r)",
            "in(egg: f, fridge: c)",
            "in(milk: f, fridge: c)",
            "open(fridge: c)",
            "at(cabinet: c, kitchen: r)",
            "closed(cabinet: c)",
        ]
        .iter()
        .map(|f| Proposition::parse(f).unwrap())
        .collect();
        assert_eq!(found, expected);
    }
}
