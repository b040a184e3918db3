// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]
//! Snapshot round-trip and resume equivalence.
mod common;

use common::{program, rule_on_scales};
use ladder_core::{
    Action, CustomActions, Program, ResumeOverrides, RunConfig, Runtime, SchedulerKind, Snapshot,
};

fn endless_growth(name: &str, max_steps: u64) -> Program {
    program(
        name,
        "A",
        vec![rule_on_scales("grow", 0..=64, Action::Expand { fanout: 1 })],
        max_steps,
    )
}

fn event_shape(rt: &Runtime) -> Vec<(String, String, u32)> {
    rt.events()
        .iter()
        .map(|e| (e.rule.clone(), e.before.to_string(), e.scale))
        .collect()
}

#[test]
fn interrupted_run_plus_resume_equals_uninterrupted_run() {
    // One step, snapshot, then ten more.
    let mut first = Runtime::new(
        endless_growth("s6", 1),
        RunConfig::default(),
        CustomActions::new(),
        None,
    )
    .unwrap();
    let summary = first.run().unwrap();
    assert!(summary.budget_exhausted);
    let snapshot = first.snapshot();

    let mut resumed = Runtime::resume(
        endless_growth("s6", 10),
        &snapshot,
        &ResumeOverrides::default(),
        CustomActions::new(),
        None,
    )
    .unwrap();
    resumed.run().unwrap();

    // Eleven uninterrupted steps.
    let mut uninterrupted = Runtime::new(
        endless_growth("s6", 11),
        RunConfig::default(),
        CustomActions::new(),
        None,
    )
    .unwrap();
    uninterrupted.run().unwrap();

    let mut combined = event_shape(&first);
    combined.extend(event_shape(&resumed));
    assert_eq!(combined.len(), 11);
    assert_eq!(combined, event_shape(&uninterrupted));

    // Final state is indistinguishable, byte for byte.
    assert_eq!(
        resumed.snapshot().to_json().unwrap(),
        uninterrupted.snapshot().to_json().unwrap()
    );
}

#[test]
fn random_scheduler_resume_continues_the_selection_sequence() {
    let config = RunConfig {
        scheduler: SchedulerKind::Random,
        scheduler_seed: 7,
        walk_children: true,
        ..RunConfig::default()
    };
    let grow2 = |name: &str, steps: u64| {
        program(
            name,
            "A",
            vec![rule_on_scales("grow", 0..=3, Action::Expand { fanout: 2 })],
            steps,
        )
    };

    let mut first = Runtime::new(grow2("rand", 5), config.clone(), CustomActions::new(), None)
        .unwrap();
    first.run().unwrap();
    let snapshot = first.snapshot();

    let mut resumed = Runtime::resume(
        grow2("rand", 20),
        &snapshot,
        &ResumeOverrides::default(),
        CustomActions::new(),
        None,
    )
    .unwrap();
    resumed.run().unwrap();

    let mut uninterrupted =
        Runtime::new(grow2("rand", 25), config, CustomActions::new(), None).unwrap();
    uninterrupted.run().unwrap();

    let mut combined = event_shape(&first);
    combined.extend(event_shape(&resumed));
    assert_eq!(combined, event_shape(&uninterrupted));
}

#[test]
fn snapshot_survives_the_json_surface() {
    let mut rt = Runtime::new(
        endless_growth("json", 3),
        RunConfig::default(),
        CustomActions::new(),
        None,
    )
    .unwrap();
    rt.run().unwrap();
    let snapshot = rt.snapshot();
    let text = snapshot.to_json().unwrap();
    let reloaded = Snapshot::from_json(&text).unwrap();
    assert_eq!(reloaded, snapshot);

    let resumed = Runtime::resume(
        endless_growth("json", 3),
        &reloaded,
        &ResumeOverrides::default(),
        CustomActions::new(),
        None,
    )
    .unwrap();
    assert_eq!(resumed.store().len(), rt.store().len());
    assert_eq!(resumed.root(), rt.root());
}

#[test]
fn corrupted_ids_are_rejected_on_resume() {
    let mut rt = Runtime::new(
        endless_growth("corrupt", 2),
        RunConfig::default(),
        CustomActions::new(),
        None,
    )
    .unwrap();
    rt.run().unwrap();
    let mut snapshot = rt.snapshot();
    snapshot.store[0].sym = "tampered".into();

    let err = Runtime::resume(
        endless_growth("corrupt", 2),
        &snapshot,
        &ResumeOverrides::default(),
        CustomActions::new(),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, ladder_core::ResumeError::Corrupt(_)));
}

#[test]
fn explicit_overrides_replace_stored_walk_flags() {
    let mut rt = Runtime::new(
        endless_growth("override", 2),
        RunConfig::default(),
        CustomActions::new(),
        None,
    )
    .unwrap();
    rt.run().unwrap();
    let snapshot = rt.snapshot();
    assert!(!snapshot.walk_children);

    let overrides = ResumeOverrides {
        walk_children: Some(true),
        walk_depth: Some(Some(2)),
        ..ResumeOverrides::default()
    };
    let resumed = Runtime::resume(
        endless_growth("override", 2),
        &snapshot,
        &overrides,
        CustomActions::new(),
        None,
    )
    .unwrap();
    assert!(resumed.config().walk_children);
    assert_eq!(resumed.config().walk_depth, Some(2));
}
