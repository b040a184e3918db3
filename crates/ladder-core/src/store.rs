// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Content-addressed term store with structural sharing.
//!
//! Determinism contract
//! - A term's id is derived from its content ([`crate::ident::make_term_id`]),
//!   so equal content always yields equal ids and equality is an O(1) id
//!   comparison.
//! - Insertion is idempotent and the store grows monotonically within a run;
//!   there is no removal API.
//! - Enumeration is offered in two stable orders: insertion order (used by
//!   snapshots, so a reloaded store re-derives identical ids) and ascending
//!   id order.
use std::collections::BTreeMap;

use crate::ident::{make_term_id, TermId};
use crate::sig::{SignatureSet, SignatureViolation};
use crate::term::Term;

/// Reasons an insertion can be refused.
///
/// Both variants are reported, never retried. Once [`StoreError::TermLimit`]
/// has been returned the store latches `term_limit_exhausted` and refuses all
/// further insertions of unseen content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The signature validator rejected the content.
    #[error("signature violation: {0}")]
    Signature(#[from] SignatureViolation),
    /// Inserting would exceed the configured `max_terms` cap.
    #[error("term limit of {0} reached")]
    TermLimit(usize),
}

/// Content-addressed mapping from [`TermId`] to [`Term`].
#[derive(Debug, Clone, Default)]
pub struct TermStore {
    terms: BTreeMap<TermId, Term>,
    insertion_order: Vec<TermId>,
    max_terms: Option<usize>,
    term_limit_exhausted: bool,
    signatures: Option<SignatureSet>,
}

impl TermStore {
    /// Creates an empty, uncapped, unvalidated store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hard cap on unique entries. `None` means unbounded.
    pub fn set_max_terms(&mut self, cap: Option<usize>) {
        self.max_terms = cap;
    }

    /// Returns the configured cap, if any.
    #[must_use]
    pub fn max_terms(&self) -> Option<usize> {
        self.max_terms
    }

    /// Attaches a signature validator consulted on every insertion.
    pub fn set_signatures(&mut self, signatures: Option<SignatureSet>) {
        self.signatures = signatures;
    }

    /// True once an insertion has been refused by the `max_terms` cap.
    #[must_use]
    pub fn term_limit_exhausted(&self) -> bool {
        self.term_limit_exhausted
    }

    /// Forces the term-limit flag (used by snapshot restore).
    pub(crate) fn set_term_limit_exhausted(&mut self, flag: bool) {
        self.term_limit_exhausted = flag;
    }

    /// Returns the canonical id for the content, inserting on first sight.
    ///
    /// # Errors
    ///
    /// [`StoreError::Signature`] when the attached validator rejects the
    /// content; [`StoreError::TermLimit`] when inserting unseen content would
    /// exceed `max_terms`. Re-interning existing content never fails and
    /// never counts against the cap.
    pub fn intern(
        &mut self,
        symbol: impl Into<String>,
        scale: u32,
        children: Vec<TermId>,
    ) -> Result<TermId, StoreError> {
        let symbol = symbol.into();
        let id = make_term_id(&symbol, scale, &children);
        if self.terms.contains_key(&id) {
            return Ok(id);
        }
        if let Some(sigs) = &self.signatures {
            sigs.validate(&symbol, scale, children.len())?;
        }
        if self.term_limit_exhausted {
            // Latched: refuse everything new once the cap has been hit.
            return Err(StoreError::TermLimit(self.max_terms.unwrap_or(0)));
        }
        if let Some(cap) = self.max_terms {
            if self.terms.len() >= cap {
                self.term_limit_exhausted = true;
                return Err(StoreError::TermLimit(cap));
            }
        }
        self.terms.insert(
            id,
            Term {
                symbol,
                scale,
                children,
            },
        );
        self.insertion_order.push(id);
        Ok(id)
    }

    /// Looks up a term by id.
    #[must_use]
    pub fn get(&self, id: &TermId) -> Option<&Term> {
        self.terms.get(id)
    }

    /// Returns `true` when the id is present.
    #[must_use]
    pub fn contains(&self, id: &TermId) -> bool {
        self.terms.contains_key(id)
    }

    /// Total number of unique terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` when no terms have been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Iterates terms in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (&TermId, &Term)> {
        self.terms.iter()
    }

    /// Iterates term ids in insertion order.
    ///
    /// Children always precede their parents in this order because a parent
    /// cannot be interned without its children's ids.
    pub fn iter_insertion_order(&self) -> impl Iterator<Item = &TermId> {
        self.insertion_order.iter()
    }
}
