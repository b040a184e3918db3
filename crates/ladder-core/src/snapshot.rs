// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Snapshot format and resume.
//!
//! Determinism contract
//! - `store` lists terms in insertion order; children always precede their
//!   parents, so a reloaded store re-derives every id identically and the
//!   recorded ids double as a corruption check.
//! - All map-typed fields are `BTreeMap`/`BTreeSet`, so the JSON rendering
//!   of the same state is byte-identical across runs.
//! - Field declaration order below is the stable key order of the document;
//!   reordering fields is a breaking change to the snapshot surface.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::guard::{GuardConfig, GuardState};
use crate::ident::TermId;
use crate::program::{validate, Program, ValidationError};
use crate::rule::CustomActions;
use crate::scheduler::{
    decode_rng_state, encode_rng_state, Scheduler, SchedulerKind, SchedulerState,
};
use crate::sig::SignatureSet;
use crate::store::{StoreError, TermStore};
use crate::runtime::Runtime;

/// One stored term in snapshot form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTerm {
    /// Content-derived id, re-checked on load.
    pub id: TermId,
    /// Symbol.
    pub sym: String,
    /// Scale label.
    pub scale: u32,
    /// Child ids; always already listed earlier in the store.
    pub children: Vec<TermId>,
}

/// Full serialized runtime state, sufficient for resumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Terms in insertion order.
    pub store: Vec<SnapshotTerm>,
    /// Root term id.
    pub root: TermId,
    /// Frontier in pop-relevant order.
    pub frontier: Vec<TermId>,
    /// Processed set (ascending id order).
    pub processed: BTreeSet<TermId>,
    /// Scheduler strategy.
    pub scheduler: SchedulerKind,
    /// Seed the scheduler was created with.
    pub scheduler_seed: u64,
    /// Hex RNG state for the random scheduler; `None` otherwise.
    pub scheduler_state: Option<String>,
    /// Walk-children flag.
    pub walk_children: bool,
    /// Walk depth cap.
    pub walk_depth: Option<u32>,
    /// Strict-matching flag.
    pub strict_matching: bool,
    /// Conflict-detection flag.
    pub detect_conflicts: bool,
    /// Rule allowlist.
    pub include_rules: BTreeSet<String>,
    /// Rule blocklist.
    pub exclude_rules: BTreeSet<String>,
    /// Scale allowlist.
    pub include_scales: BTreeSet<u32>,
    /// Scale blocklist.
    pub exclude_scales: BTreeSet<u32>,
    /// Remaining fires per budgeted rule.
    pub rule_budgets: BTreeMap<String, u64>,
    /// Budgets that ran out, in exhaustion order.
    pub rule_budget_exhausted: Vec<String>,
    /// Term cap, if any.
    pub max_terms: Option<usize>,
    /// Whether the cap has been hit.
    pub term_limit_exhausted: bool,
}

/// Problems reading a snapshot back into a runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResumeError {
    /// The accompanying program failed validation under the restored guards.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A stored term failed signature validation on reload.
    #[error("stored term rejected: {0}")]
    StoreRejected(#[from] StoreError),
    /// The snapshot contradicts itself (bad ids, dangling references).
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}

/// Explicit CLI overrides applied on resume; everything left `None` keeps
/// the snapshot-recorded setting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeOverrides {
    /// Replace the scheduler strategy.
    pub scheduler: Option<SchedulerKind>,
    /// Replace the scheduler seed (resets RNG state).
    pub scheduler_seed: Option<u64>,
    /// Replace the walk-children flag.
    pub walk_children: Option<bool>,
    /// Replace the walk depth cap.
    pub walk_depth: Option<Option<u32>>,
    /// Replace the strict-matching flag.
    pub strict_matching: Option<bool>,
}

impl Snapshot {
    /// Renders the snapshot as a deterministic JSON document.
    ///
    /// # Errors
    ///
    /// Serialization of this type cannot fail in practice; the error is
    /// surfaced for the caller's I/O error path.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a snapshot document.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error on malformed input.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl Runtime {
    /// Captures the complete runtime state.
    ///
    /// Valid after any step; the artifact is immutable and self-contained.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let store: Vec<SnapshotTerm> = self
            .store
            .iter_insertion_order()
            .filter_map(|id| {
                self.store.get(id).map(|term| SnapshotTerm {
                    id: *id,
                    sym: term.symbol.clone(),
                    scale: term.scale,
                    children: term.children.clone(),
                })
            })
            .collect();
        let state = self.scheduler.snapshot_state();
        Snapshot {
            store,
            root: self.root,
            frontier: state.frontier,
            processed: state.processed,
            scheduler: self.scheduler.kind(),
            scheduler_seed: self.scheduler.seed(),
            scheduler_state: state.rng_state.map(encode_rng_state),
            walk_children: self.config.walk_children,
            walk_depth: self.config.walk_depth,
            strict_matching: self.config.strict_matching,
            detect_conflicts: self.config.detect_conflicts,
            include_rules: self.config.guards.include_rules.clone(),
            exclude_rules: self.config.guards.exclude_rules.clone(),
            include_scales: self.config.guards.include_scales.clone(),
            exclude_scales: self.config.guards.exclude_scales.clone(),
            rule_budgets: self.guards.remaining().clone(),
            rule_budget_exhausted: self.guards.exhausted().to_vec(),
            max_terms: self.store.max_terms(),
            term_limit_exhausted: self.store.term_limit_exhausted(),
        }
    }

    /// Rebuilds a runtime from a snapshot plus the program's rules.
    ///
    /// The store is reconstructed in insertion order and every re-derived id
    /// is checked against the recorded one. Stored settings win unless
    /// `overrides` names a replacement. Step and event counters start fresh:
    /// each invocation spends its own `max_steps`.
    ///
    /// # Errors
    ///
    /// [`ResumeError::Corrupt`] for id mismatches and dangling references,
    /// [`ResumeError::StoreRejected`] when a new signature set refuses stored
    /// content, [`ResumeError::Validation`] when the program no longer
    /// validates under the restored guard configuration.
    pub fn resume(
        program: Program,
        snapshot: &Snapshot,
        overrides: &ResumeOverrides,
        customs: CustomActions,
        signatures: Option<SignatureSet>,
    ) -> Result<Self, ResumeError> {
        let guards = GuardConfig {
            max_terms: snapshot.max_terms,
            rule_budgets: snapshot.rule_budgets.clone(),
            include_rules: snapshot.include_rules.clone(),
            exclude_rules: snapshot.exclude_rules.clone(),
            include_scales: snapshot.include_scales.clone(),
            exclude_scales: snapshot.exclude_scales.clone(),
        };
        let config = RunConfig {
            scheduler: overrides.scheduler.unwrap_or(snapshot.scheduler),
            scheduler_seed: overrides.scheduler_seed.unwrap_or(snapshot.scheduler_seed),
            walk_children: overrides.walk_children.unwrap_or(snapshot.walk_children),
            walk_depth: overrides.walk_depth.unwrap_or(snapshot.walk_depth),
            strict_matching: overrides
                .strict_matching
                .unwrap_or(snapshot.strict_matching),
            detect_conflicts: snapshot.detect_conflicts,
            guards,
        };

        // Budgets in a snapshot are *remaining* counts; exhausted rules sit
        // at zero legitimately, so they are excluded from the positivity
        // check that guards fresh programs.
        let mut validation_guards = config.guards.clone();
        validation_guards.rule_budgets.retain(|_, n| *n > 0);
        validate(
            &program,
            &validation_guards,
            &customs,
            config.detect_conflicts,
        )?;

        let mut store = TermStore::new();
        store.set_signatures(signatures);
        for entry in &snapshot.store {
            for child in &entry.children {
                if !store.contains(child) {
                    return Err(ResumeError::Corrupt(format!(
                        "term {} references unknown child {child}",
                        entry.id
                    )));
                }
            }
            let id = store.intern(entry.sym.clone(), entry.scale, entry.children.clone())?;
            if id != entry.id {
                return Err(ResumeError::Corrupt(format!(
                    "recorded id {} does not match content (derived {id})",
                    entry.id
                )));
            }
        }
        store.set_max_terms(snapshot.max_terms);
        store.set_term_limit_exhausted(snapshot.term_limit_exhausted);

        if !store.contains(&snapshot.root) {
            return Err(ResumeError::Corrupt("root id not in store".into()));
        }
        for id in snapshot.frontier.iter().chain(&snapshot.processed) {
            if !store.contains(id) {
                return Err(ResumeError::Corrupt(format!("dangling id {id}")));
            }
        }

        // An explicit scheduler/seed override resets the RNG; otherwise the
        // stored state continues the original selection sequence.
        let rng_state = if overrides.scheduler.is_some() || overrides.scheduler_seed.is_some() {
            None
        } else {
            match &snapshot.scheduler_state {
                Some(text) => Some(decode_rng_state(text).ok_or_else(|| {
                    ResumeError::Corrupt(format!("bad scheduler_state {text:?}"))
                })?),
                None => None,
            }
        };
        let scheduler = Scheduler::restore_state(
            config.scheduler,
            config.scheduler_seed,
            SchedulerState {
                frontier: snapshot.frontier.clone(),
                processed: snapshot.processed.clone(),
                rng_state,
            },
        );

        let guards = GuardState::restore(
            snapshot.rule_budgets.clone(),
            snapshot.rule_budget_exhausted.clone(),
        );

        Ok(Self::from_restored_parts(
            program,
            config,
            store,
            scheduler,
            guards,
            customs,
            snapshot.root,
        ))
    }
}

// Verify the content-derived id helper and the snapshot agree on identity.
#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ident::make_term_id;

    #[test]
    fn snapshot_term_ids_are_content_derived() {
        let id = make_term_id("A", 0, &[]);
        let entry = SnapshotTerm {
            id,
            sym: "A".into(),
            scale: 0,
            children: vec![],
        };
        assert_eq!(make_term_id(&entry.sym, entry.scale, &entry.children), id);
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let snapshot = Snapshot {
            store: vec![SnapshotTerm {
                id: make_term_id("A", 0, &[]),
                sym: "A".into(),
                scale: 0,
                children: vec![],
            }],
            root: make_term_id("A", 0, &[]),
            frontier: vec![make_term_id("A", 0, &[])],
            processed: BTreeSet::new(),
            scheduler: SchedulerKind::Random,
            scheduler_seed: 7,
            scheduler_state: Some(encode_rng_state([1, 2])),
            walk_children: true,
            walk_depth: Some(3),
            strict_matching: false,
            detect_conflicts: true,
            include_rules: BTreeSet::from(["up".to_owned()]),
            exclude_rules: BTreeSet::new(),
            include_scales: BTreeSet::new(),
            exclude_scales: BTreeSet::from([4]),
            rule_budgets: BTreeMap::from([("up".to_owned(), 2)]),
            rule_budget_exhausted: vec![],
            max_terms: Some(100),
            term_limit_exhausted: false,
        };
        let text = snapshot.to_json().unwrap();
        assert_eq!(Snapshot::from_json(&text).unwrap(), snapshot);
        // Re-rendering the same state is byte-identical.
        assert_eq!(
            Snapshot::from_json(&text).unwrap().to_json().unwrap(),
            text
        );
    }
}
