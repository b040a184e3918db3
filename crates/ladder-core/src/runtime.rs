// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Single-threaded stepping engine.
//!
//! The runtime couples the scheduler, rule matcher, and store. Each step is
//! atomic with respect to store, frontier, counters, and event log, so a
//! caller may stop between steps at any point and the state stays
//! consistent; a snapshot taken after any step is valid and resumable.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::event::{ts_micros, Event};
use crate::guard::{rule_allowed, scale_allowed, GuardState};
use crate::ident::TermId;
use crate::program::{validate, Program, ValidationError};
use crate::rule::CustomActions;
use crate::scheduler::{encode_rng_state, Scheduler, SchedulerKind};
use crate::sig::{SignatureSet, SignatureViolation};
use crate::store::{StoreError, TermStore};
use crate::trace::Tracer;

/// Why a popped id produced no rewrite. None of these consume a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The term's scale is filtered out.
    ScaleFiltered,
    /// No rule matched after filters and budgets.
    NoMatch,
    /// The chosen rule's action legitimately did not apply.
    ActionNotApplicable,
}

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// Frontier drained.
    Idle,
    /// `max_steps` applied rewrites reached.
    BudgetExhausted,
    /// The store refused an insertion under `max_terms`.
    TermLimit,
}

/// Result of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A rule fired and an event was recorded.
    Applied,
    /// The popped id was passed over.
    Skipped(SkipReason),
    /// The run is over; stepping again returns the same reason.
    Halted(HaltReason),
}

/// Fatal runtime guard failures. Reported, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    /// More than one rule matched under strict matching.
    #[error("ambiguous match on {term}: rules {rules:?}")]
    AmbiguousMatch {
        /// Term the rules matched.
        term: TermId,
        /// Matching rule names in program order.
        rules: Vec<String>,
    },
    /// The term-count cap was hit mid-rewrite.
    #[error("term limit of {0} reached")]
    TermLimit(usize),
    /// A rewrite produced content the signature validator rejects.
    #[error("signature violation: {0}")]
    Signature(#[from] SignatureViolation),
    /// Internal invariant violated (runtime state corruption).
    #[error("internal invariant violated: {0}")]
    Corruption(&'static str),
}

/// Summary object emitted on stdout after a run.
///
/// Field order is the stable key order of the JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Program display name.
    pub program: String,
    /// Root term id.
    pub root: TermId,
    /// Scheduler strategy in effect.
    pub scheduler: SchedulerKind,
    /// Seed the scheduler was created with.
    pub scheduler_seed: u64,
    /// Whether children of inserted terms were enqueued.
    pub walk_children: bool,
    /// Depth bound for the child walk.
    pub walk_depth: Option<u32>,
    /// Whether ambiguity was fatal.
    pub strict_matching: bool,
    /// Number of applied rewrites.
    pub events: u64,
    /// Fires per rule name.
    pub rule_counts: BTreeMap<String, u64>,
    /// Fires per source-term scale.
    pub scale_counts: BTreeMap<u32, u64>,
    /// Budgets that ran out, in exhaustion order.
    pub rule_budget_exhausted: Vec<String>,
    /// Whether the store refused an insertion under `max_terms`.
    pub term_limit_exhausted: bool,
    /// Whether the run drained its frontier.
    pub idle: bool,
    /// Whether the step budget stopped the run.
    pub budget_exhausted: bool,
    /// Ids still awaiting rewrite, in pop-relevant order.
    pub frontier: Vec<TermId>,
    /// Unique terms in the store.
    pub store_size: usize,
}

/// The rewriting runtime: scheduler + matcher + store under guards.
pub struct Runtime {
    pub(crate) program: Program,
    pub(crate) config: RunConfig,
    pub(crate) store: TermStore,
    pub(crate) scheduler: Scheduler,
    pub(crate) guards: GuardState,
    pub(crate) customs: CustomActions,
    pub(crate) root: TermId,
    pub(crate) steps: u64,
    pub(crate) events: Vec<Event>,
    pub(crate) rule_counts: BTreeMap<String, u64>,
    pub(crate) scale_counts: BTreeMap<u32, u64>,
    pub(crate) halted: Option<HaltReason>,
    tracer: Option<Box<dyn Tracer>>,
    tracer_warning: Option<String>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("program", &self.program.name)
            .field("steps", &self.steps)
            .field("store_size", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Validates the program and builds a runtime seeded with the root.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for any load-time problem, including a
    /// root term the signature validator or term cap rejects.
    pub fn new(
        program: Program,
        config: RunConfig,
        customs: CustomActions,
        signatures: Option<SignatureSet>,
    ) -> Result<Self, ValidationError> {
        validate(&program, &config.guards, &customs, config.detect_conflicts)?;

        let mut store = TermStore::new();
        store.set_signatures(signatures);
        store.set_max_terms(config.guards.max_terms);
        let root = program.root.intern(&mut store)?;

        let mut scheduler = Scheduler::new(config.scheduler, config.scheduler_seed);
        scheduler.push(root);

        let guards = GuardState::new(&config.guards);
        Ok(Self {
            program,
            config,
            store,
            scheduler,
            guards,
            customs,
            root,
            steps: 0,
            events: Vec::new(),
            rule_counts: BTreeMap::new(),
            scale_counts: BTreeMap::new(),
            halted: None,
            tracer: None,
            tracer_warning: None,
        })
    }

    /// Assembles a runtime from state restored out of a snapshot.
    ///
    /// Counters start fresh: each invocation spends its own `max_steps` and
    /// accumulates its own events.
    pub(crate) fn from_restored_parts(
        program: Program,
        config: RunConfig,
        store: TermStore,
        scheduler: Scheduler,
        guards: GuardState,
        customs: CustomActions,
        root: TermId,
    ) -> Self {
        Self {
            program,
            config,
            store,
            scheduler,
            guards,
            customs,
            root,
            steps: 0,
            events: Vec::new(),
            rule_counts: BTreeMap::new(),
            scale_counts: BTreeMap::new(),
            halted: None,
            tracer: None,
            tracer_warning: None,
        }
    }

    /// Attaches an event sink. Replaces any previous sink.
    pub fn set_tracer(&mut self, tracer: Box<dyn Tracer>) {
        self.tracer = Some(tracer);
    }

    /// Warning recorded when a trace sink failed and was detached.
    #[must_use]
    pub fn tracer_warning(&self) -> Option<&str> {
        self.tracer_warning.as_deref()
    }

    /// Root term id.
    #[must_use]
    pub fn root(&self) -> TermId {
        self.root
    }

    /// Read access to the store.
    #[must_use]
    pub fn store(&self) -> &TermStore {
        &self.store
    }

    /// Events applied so far, in step order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Configuration the runtime was built with.
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Executes one step: budget check, pop, filter, match, apply, enqueue.
    ///
    /// # Errors
    ///
    /// Returns a [`GuardError`] for ambiguous matches under strict matching,
    /// term-limit exhaustion, and mid-run signature violations. The runtime
    /// state stays consistent; [`Runtime::summary`] remains valid.
    pub fn step(&mut self) -> Result<StepOutcome, GuardError> {
        if let Some(reason) = self.halted {
            return Ok(StepOutcome::Halted(reason));
        }
        if self.steps >= self.program.max_steps {
            self.halted = Some(HaltReason::BudgetExhausted);
            return Ok(StepOutcome::Halted(HaltReason::BudgetExhausted));
        }
        let Some(id) = self.scheduler.pop() else {
            self.halted = Some(HaltReason::Idle);
            return Ok(StepOutcome::Halted(HaltReason::Idle));
        };
        let Some(term) = self.store.get(&id).cloned() else {
            return Err(GuardError::Corruption("frontier id missing from store"));
        };

        if !scale_allowed(&self.config.guards, term.scale) {
            return Ok(StepOutcome::Skipped(SkipReason::ScaleFiltered));
        }

        let matching: Vec<usize> = self
            .program
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| {
                rule_allowed(&self.config.guards, &rule.name)
                    && self.guards.has_budget(&rule.name)
                    && rule.pattern.matches(&term)
            })
            .map(|(i, _)| i)
            .collect();

        if matching.is_empty() {
            return Ok(StepOutcome::Skipped(SkipReason::NoMatch));
        }
        if matching.len() > 1 && self.config.strict_matching {
            return Err(GuardError::AmbiguousMatch {
                term: id,
                rules: matching
                    .iter()
                    .map(|i| self.program.rules[*i].name.clone())
                    .collect(),
            });
        }

        let rule = self.program.rules[matching[0]].clone();
        let scheduler_token = self.scheduler.rng_state().map(encode_rng_state);

        let after = match rule.action.apply(&term, &mut self.store, &self.customs) {
            Ok(Some(after)) => after,
            Ok(None) => return Ok(StepOutcome::Skipped(SkipReason::ActionNotApplicable)),
            Err(StoreError::TermLimit(cap)) => {
                self.halted = Some(HaltReason::TermLimit);
                return Err(GuardError::TermLimit(cap));
            }
            Err(StoreError::Signature(violation)) => {
                return Err(GuardError::Signature(violation));
            }
        };

        self.scheduler.mark_processed(id);
        for replacement in &after {
            self.scheduler.push(*replacement);
        }
        if self.config.walk_children {
            self.walk_enqueue(&after);
        }

        *self.rule_counts.entry(rule.name.clone()).or_insert(0) += 1;
        *self.scale_counts.entry(term.scale).or_insert(0) += 1;
        self.guards.spend(&rule.name);

        let event = Event {
            step: self.steps,
            rule: rule.name,
            before: id,
            after,
            scale: term.scale,
            timestamp_micros: ts_micros(),
            scheduler_token,
        };
        self.steps += 1;
        self.trace(&event);
        self.events.push(event);
        Ok(StepOutcome::Applied)
    }

    /// Drives [`Runtime::step`] until the run halts.
    ///
    /// # Errors
    ///
    /// Propagates the first [`GuardError`]; the caller can still build a
    /// summary from the consistent post-error state.
    pub fn run(&mut self) -> Result<RunSummary, GuardError> {
        loop {
            if let StepOutcome::Halted(_) = self.step()? {
                return Ok(self.summary());
            }
        }
    }

    /// Builds the summary object for the current state.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            program: self.program.name.clone(),
            root: self.root,
            scheduler: self.scheduler.kind(),
            scheduler_seed: self.scheduler.seed(),
            walk_children: self.config.walk_children,
            walk_depth: self.config.walk_depth,
            strict_matching: self.config.strict_matching,
            events: self.steps,
            rule_counts: self.rule_counts.clone(),
            scale_counts: self.scale_counts.clone(),
            rule_budget_exhausted: self.guards.exhausted().to_vec(),
            term_limit_exhausted: self.store.term_limit_exhausted(),
            idle: self.halted == Some(HaltReason::Idle),
            budget_exhausted: self.halted == Some(HaltReason::BudgetExhausted),
            frontier: self.scheduler.frontier(),
            store_size: self.store.len(),
        }
    }

    /// Enqueues children of the replacement set, bounded by `walk_depth`.
    ///
    /// Breadth-first over the replacement ids so frontier insertion order is
    /// independent of subtree shapes.
    fn walk_enqueue(&mut self, replacements: &[TermId]) {
        use std::collections::VecDeque;
        let mut queue: VecDeque<(TermId, u32)> =
            replacements.iter().map(|id| (*id, 0)).collect();
        while let Some((id, depth)) = queue.pop_front() {
            if self.config.walk_depth.is_some_and(|cap| depth >= cap) {
                continue;
            }
            let Some(term) = self.store.get(&id) else {
                continue;
            };
            for child in term.children.clone() {
                self.scheduler.push(child);
                queue.push_back((child, depth + 1));
            }
        }
    }

    fn trace(&mut self, event: &Event) {
        let Some(tracer) = self.tracer.as_mut() else {
            return;
        };
        if let Err(err) = tracer.record(event) {
            // Degrade: drop the sink, remember why, never fail the run.
            self.tracer = None;
            if self.tracer_warning.is_none() {
                self.tracer_warning = Some(format!("trace sink failed and was detached: {err}"));
            }
        }
    }
}
