//! Benchmarks for chaining and assignment.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use questloom::chaining::{self, ChainingOptions, RulesPerDepth};
use questloom::logic::{Logic, Proposition};
use questloom::state::State;

fn two_rooms(logic: &Logic) -> State {
    let facts = [
        "at(P, bedroom: r)",
        "south_of(kitchen: r, bedroom: r)",
        "north_of(bedroom: r, kitchen: r)",
        "link(bedroom: r, wooden door: d, kitchen: r)",
        "link(kitchen: r, wooden door: d, bedroom: r)",
        "closed(wooden door: d)",
        "in(rusty key: k, I)",
        "match(rusty key: k, chest: c)",
        "locked(chest: c)",
        "at(chest: c, kitchen: r)",
        "in(small key: k, chest: c)",
        "match(small key: k, cabinet: c)",
        "locked(cabinet: c)",
        "at(cabinet: c, bedroom: r)",
        "in(robe: o, cabinet: c)",
    ];
    State::with_facts(
        logic.types().clone(),
        facts.iter().map(|f| Proposition::parse(f).unwrap()),
    )
}

fn bench_forward_depth_20(c: &mut Criterion) {
    let logic = Arc::new(Logic::builtin().unwrap());
    let state = two_rooms(&logic);
    let mut options = ChainingOptions::new(logic.clone());
    options.max_depth = 20;

    c.bench_function("forward_two_rooms_depth_20", |bench| {
        bench.iter(|| black_box(chaining::chain(state.clone(), &options).unwrap().count()))
    });
}

fn bench_backward_door(c: &mut Criterion) {
    let logic = Arc::new(Logic::builtin().unwrap());
    let state = State::with_facts(
        logic.types().clone(),
        [
            "at(P, room: r)",
            "north_of(kitchen: r, room: r)",
            "south_of(room: r, kitchen: r)",
            "free(kitchen: r, room: r)",
            "free(room: r, kitchen: r)",
        ]
        .iter()
        .map(|f| Proposition::parse(f).unwrap()),
    );
    let policy = RulesPerDepth::from_patterns(
        &logic,
        &[vec!["take/c", "take/s"], vec!["go.*"], vec!["open/d"]],
    )
    .unwrap();
    let mut options = ChainingOptions::new(logic.clone()).with_policy(policy);
    options.backward = true;
    options.max_depth = 3;
    options.subquests = true;
    options.create_variables = true;

    c.bench_function("backward_through_door", |bench| {
        bench.iter(|| black_box(chaining::chain(state.clone(), &options).unwrap().count()))
    });
}

fn bench_all_assignments(c: &mut Criterion) {
    let logic = Logic::builtin().unwrap();
    let state = two_rooms(&logic);
    let rules = logic.rules();

    c.bench_function("applicable_actions_two_rooms", |bench| {
        bench.iter(|| black_box(state.all_applicable_actions(rules.iter().map(|r| &**r)).len()))
    });
}

criterion_group!(
    benches,
    bench_forward_depth_20,
    bench_backward_door,
    bench_all_assignments
);
criterion_main!(benches);
