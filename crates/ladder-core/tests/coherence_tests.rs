// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]
//! Coherence: reduce(expand(t)) = t for the built-in pair.
mod common;

use common::{program, rule_on_symbol};
use ladder_core::{
    make_term_id, Action, CustomActions, RunConfig, Runtime, TermStore,
};
use proptest::prelude::*;

#[test]
fn expand_then_reduce_round_trips_through_the_store() {
    let program = program(
        "s1",
        "A",
        vec![
            rule_on_symbol("up", "A", Action::Expand { fanout: 1 }),
            rule_on_symbol("down", "F(A)", Action::Reduce),
        ],
        10,
    );
    let mut rt = Runtime::new(program, RunConfig::default(), CustomActions::new(), None).unwrap();
    let summary = rt.run().unwrap();

    let rules: Vec<&str> = rt.events().iter().map(|e| e.rule.as_str()).collect();
    assert_eq!(rules, ["up", "down"]);
    assert!(summary.idle);
    assert!(summary.frontier.is_empty());

    // Hash-consing: the reduction target is the original root id.
    let root = rt.root();
    assert_eq!(rt.events()[1].after, [root]);
    assert!(rt.store().contains(&make_term_id("A", 0, &[])));
    assert!(rt.store().contains(&make_term_id("A.0", 1, &[])));
}

#[test]
fn store_size_is_non_decreasing_across_steps() {
    let program = program(
        "monotonic",
        "A",
        vec![
            rule_on_symbol("up", "A", Action::Expand { fanout: 2 }),
            rule_on_symbol("down", "F(A)", Action::Reduce),
        ],
        10,
    );
    let mut rt = Runtime::new(program, RunConfig::default(), CustomActions::new(), None).unwrap();
    let mut last = rt.store().len();
    while let Ok(outcome) = rt.step() {
        assert!(rt.store().len() >= last);
        last = rt.store().len();
        if matches!(outcome, ladder_core::StepOutcome::Halted(_)) {
            break;
        }
    }
}

proptest! {
    #[test]
    fn coherence_identity_holds_for_arbitrary_symbols(
        symbol in "[A-Za-z][A-Za-z0-9_]{0,8}",
        scale in 0u32..64,
        fanout in 1usize..6,
    ) {
        let mut store = TermStore::new();
        let customs = CustomActions::new();
        let original = store.intern(symbol.clone(), scale, vec![]).unwrap();
        let term = store.get(&original).unwrap().clone();

        let expanded = Action::Expand { fanout }
            .apply(&term, &mut store, &customs)
            .unwrap()
            .unwrap();
        prop_assert_eq!(expanded.len(), 1);
        let motif = store.get(&expanded[0]).unwrap().clone();
        prop_assert_eq!(motif.scale, scale + 1);
        prop_assert_eq!(motif.children.len(), fanout);

        let reduced = Action::Reduce
            .apply(&motif, &mut store, &customs)
            .unwrap()
            .unwrap();
        prop_assert_eq!(reduced, vec![original]);
    }
}
