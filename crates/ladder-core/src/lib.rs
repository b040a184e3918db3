// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! ladder-core: deterministic scale-labelled term rewriting runtime.
//!
//! Terms carry an explicit scale label; the built-in expansion/reduction
//! operator pair moves terms between adjacent scales while preserving the
//! coherence identity `reduce(expand(t)) = t`. The runtime couples a
//! content-addressed term store, a rule matcher, and a deterministic
//! scheduler, and serializes its complete state into resumable snapshots.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod config;
mod event;
mod guard;
mod ident;
mod prng;
mod program;
mod rule;
mod runtime;
mod scheduler;
mod sig;
mod snapshot;
mod store;
mod term;
mod trace;

// Re-exports for stable public API
/// Immutable run configuration record.
pub use config::RunConfig;
/// Step event record and timestamp helper.
pub use event::{ts_micros, Event};
/// Guard configuration, state, and filter predicates.
pub use guard::{rule_allowed, scale_allowed, GuardConfig, GuardState};
/// Core identifier types and the content-derived id constructor.
pub use ident::{make_term_id, Hash, IdParseError, TermId};
/// Deterministic PRNG backing the random scheduler.
pub use prng::Prng;
/// Program model, term expressions, and load-time validation.
pub use program::{validate, Program, TermExpr, ValidationError};
/// Rule primitives: patterns, actions, overlap detection, symbol wrapping.
pub use rule::{
    expansion_symbol, find_overlap, reduction_target, Action, CustomActionFn, CustomActions,
    Pattern, Rule, EXPANSION_PREFIX,
};
/// Rewriting runtime, step outcomes, and the summary object.
pub use runtime::{GuardError, HaltReason, RunSummary, Runtime, SkipReason, StepOutcome};
/// Deterministic frontier scheduling.
pub use scheduler::{
    decode_rng_state, encode_rng_state, Scheduler, SchedulerKind, SchedulerState,
};
/// Optional per-symbol arity/scale signatures.
pub use sig::{SignatureSet, SignatureViolation, SymbolSignature};
/// Snapshot artifact and resume surface.
pub use snapshot::{ResumeError, ResumeOverrides, Snapshot, SnapshotTerm};
/// Content-addressed term store.
pub use store::{StoreError, TermStore};
/// Term record type.
pub use term::Term;
/// Tracer sinks for step events.
pub use trace::{JsonlTracer, Tracer};
