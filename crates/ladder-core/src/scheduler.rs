// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic frontier scheduling.
//!
//! Ordering invariant:
//! - Within a strategy, the pop sequence is a pure function of the push
//!   history and (for random) the initial seed.
//! - The frontier order, processed set, and RNG state round-trip through
//!   [`SchedulerState`], so a resumed run reproduces subsequent ordering
//!   bit-identically.
use std::collections::{BTreeSet, VecDeque};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::ident::TermId;
use crate::prng::Prng;

/// Frontier strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// Breadth-first: earliest-added id pops first.
    Fifo,
    /// Depth-first: latest-added id pops first.
    Lifo,
    /// Seeded RNG picks a frontier position per pop.
    Random,
}

impl std::fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fifo => "fifo",
            Self::Lifo => "lifo",
            Self::Random => "random",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for SchedulerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fifo" => Ok(Self::Fifo),
            "lifo" => Ok(Self::Lifo),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown scheduler: {other:?}")),
        }
    }
}

/// Hex-encodes raw RNG state (two u64 words, little-endian).
#[must_use]
pub fn encode_rng_state(state: [u64; 2]) -> String {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&state[0].to_le_bytes());
    bytes[8..].copy_from_slice(&state[1].to_le_bytes());
    hex::encode(bytes)
}

/// Decodes state produced by [`encode_rng_state`].
#[must_use]
pub fn decode_rng_state(s: &str) -> Option<[u64; 2]> {
    let bytes = hex::decode(s).ok()?;
    let bytes: [u8; 16] = bytes.try_into().ok()?;
    let lo = u64::from_le_bytes(bytes[..8].try_into().ok()?);
    let hi = u64::from_le_bytes(bytes[8..].try_into().ok()?);
    Some([lo, hi])
}

/// Serializable capture of a scheduler's full ordering state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerState {
    /// Frontier ids in pop-relevant order.
    pub frontier: Vec<TermId>,
    /// Ids already rewritten this run.
    pub processed: BTreeSet<TermId>,
    /// Raw RNG state; `None` for FIFO/LIFO.
    pub rng_state: Option<[u64; 2]>,
}

/// Ordered frontier of term ids awaiting rewrite, plus the processed set.
#[derive(Debug, Clone)]
pub struct Scheduler {
    kind: SchedulerKind,
    seed: u64,
    frontier: VecDeque<TermId>,
    queued: FxHashSet<TermId>,
    processed: BTreeSet<TermId>,
    prng: Prng,
}

impl Scheduler {
    /// Creates an empty scheduler. The seed is only consumed by
    /// [`SchedulerKind::Random`] but is always recorded for snapshots.
    #[must_use]
    pub fn new(kind: SchedulerKind, seed: u64) -> Self {
        Self {
            kind,
            seed,
            frontier: VecDeque::new(),
            queued: FxHashSet::default(),
            processed: BTreeSet::new(),
            prng: Prng::from_seed_u64(seed),
        }
    }

    /// Strategy in effect.
    #[must_use]
    pub fn kind(&self) -> SchedulerKind {
        self.kind
    }

    /// Seed the RNG was initialized with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of ids currently awaiting rewrite.
    #[must_use]
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Schedules an id. Adding an already-processed or already-queued id is
    /// a no-op.
    pub fn push(&mut self, id: TermId) {
        if self.processed.contains(&id) || !self.queued.insert(id) {
            return;
        }
        self.frontier.push_back(id);
    }

    /// Removes and returns the next id per the strategy, or `None` when the
    /// frontier is empty.
    pub fn pop(&mut self) -> Option<TermId> {
        let id = match self.kind {
            SchedulerKind::Fifo => self.frontier.pop_front()?,
            SchedulerKind::Lifo => self.frontier.pop_back()?,
            SchedulerKind::Random => {
                if self.frontier.is_empty() {
                    return None;
                }
                let idx = self.prng.next_index(self.frontier.len());
                self.frontier.remove(idx)?
            }
        };
        self.queued.remove(&id);
        Some(id)
    }

    /// Marks an id as rewritten; it can never be scheduled again this run.
    pub fn mark_processed(&mut self, id: TermId) {
        self.processed.insert(id);
    }

    /// Returns `true` when the id has already been rewritten this run.
    #[must_use]
    pub fn is_processed(&self, id: &TermId) -> bool {
        self.processed.contains(id)
    }

    /// Current frontier contents in pop-relevant order.
    #[must_use]
    pub fn frontier(&self) -> Vec<TermId> {
        self.frontier.iter().copied().collect()
    }

    /// Processed ids in ascending id order.
    #[must_use]
    pub fn processed(&self) -> &BTreeSet<TermId> {
        &self.processed
    }

    /// Current RNG state; `None` for FIFO/LIFO.
    #[must_use]
    pub fn rng_state(&self) -> Option<[u64; 2]> {
        matches!(self.kind, SchedulerKind::Random).then(|| self.prng.state())
    }

    /// Captures the full ordering state for snapshots.
    #[must_use]
    pub fn snapshot_state(&self) -> SchedulerState {
        SchedulerState {
            frontier: self.frontier(),
            processed: self.processed.clone(),
            rng_state: self.rng_state(),
        }
    }

    /// Rebuilds a scheduler from captured state.
    #[must_use]
    pub fn restore_state(kind: SchedulerKind, seed: u64, state: SchedulerState) -> Self {
        let queued = state.frontier.iter().copied().collect();
        let prng = state
            .rng_state
            .map_or_else(|| Prng::from_seed_u64(seed), Prng::from_state);
        Self {
            kind,
            seed,
            frontier: state.frontier.into(),
            queued,
            processed: state.processed,
            prng,
        }
    }
}
