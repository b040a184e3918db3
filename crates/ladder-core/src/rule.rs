// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rewrite rule definitions: patterns, actions, and overlap detection.
use std::collections::{BTreeMap, BTreeSet};

use crate::ident::TermId;
use crate::store::{StoreError, TermStore};
use crate::term::Term;

/// Symbol prefix marking the expansion of an inner symbol.
///
/// `expand` wraps symbols as `F(sym)`; `reduce` only applies to symbols of
/// that shape and unwraps them. The pairing gives the coherence identity
/// `reduce(expand(t)) = t`.
pub const EXPANSION_PREFIX: &str = "F(";

/// Wraps a symbol in the expansion marker.
#[must_use]
pub fn expansion_symbol(symbol: &str) -> String {
    format!("{EXPANSION_PREFIX}{symbol})")
}

/// Unwraps `F(sym)` back to `sym`; `None` when the symbol is not an expansion.
#[must_use]
pub fn reduction_target(symbol: &str) -> Option<&str> {
    symbol
        .strip_prefix(EXPANSION_PREFIX)
        .and_then(|rest| rest.strip_suffix(')'))
}

/// Predicate over a term: exact symbol, scale membership, child-count bound.
///
/// At least one of `symbol` / `scales` must be set; program validation
/// enforces this before a pattern ever reaches the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// Exact symbol to match, when set.
    pub symbol: Option<String>,
    /// Scales the term may be at, when set. A singleton set expresses an
    /// exact scale match.
    pub scales: Option<BTreeSet<u32>>,
    /// Upper bound (inclusive) on the term's child count, when set.
    pub max_children: Option<usize>,
}

impl Pattern {
    /// Pattern matching a symbol exactly, at any scale.
    #[must_use]
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            scales: None,
            max_children: None,
        }
    }

    /// Restricts the pattern to a single scale.
    #[must_use]
    pub fn at_scale(mut self, scale: u32) -> Self {
        self.scales = Some(BTreeSet::from([scale]));
        self
    }

    /// Returns `true` when every set constraint holds for `term`.
    #[must_use]
    pub fn matches(&self, term: &Term) -> bool {
        if let Some(symbol) = &self.symbol {
            if *symbol != term.symbol {
                return false;
            }
        }
        if let Some(scales) = &self.scales {
            if !scales.contains(&term.scale) {
                return false;
            }
        }
        if let Some(bound) = self.max_children {
            if term.children.len() > bound {
                return false;
            }
        }
        true
    }

    /// Deterministic overlap: restricted to symbol and scale alone, both
    /// patterns can match the same term. `max_children` is a richer
    /// predicate and deliberately does not disambiguate.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let symbols_agree = match (&self.symbol, &other.symbol) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        if !symbols_agree {
            return false;
        }
        match (&self.scales, &other.scales) {
            (Some(a), Some(b)) => a.intersection(b).next().is_some(),
            _ => true,
        }
    }
}

/// Handler signature for custom actions.
///
/// Receives the matched term and the rule's parameter map, interns whatever
/// replacement terms it produces, and returns their ids in order. Custom
/// actions may emit terms at arbitrary scales; the coherence identity is only
/// guaranteed for the built-in pair.
pub type CustomActionFn =
    fn(&Term, &BTreeMap<String, String>, &mut TermStore) -> Result<Vec<TermId>, StoreError>;

/// Registry resolving custom action names to handlers.
pub type CustomActions = BTreeMap<String, CustomActionFn>;

/// Named operation a rule performs on its matched term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Produce one term at scale `s+1` whose symbol is `F(sym)` and whose
    /// `fanout` children are the self-similar motifs `sym.0 … sym.(N-1)`.
    Expand {
        /// Number of synthesized motif children, at least 1.
        fanout: usize,
    },
    /// Unwrap `F(x)` at scale `s ≥ 1` down to `x` at scale `s-1`. Does not
    /// apply to other symbols or at scale 0.
    Reduce,
    /// Named action resolved through a [`CustomActions`] registry.
    Custom {
        /// Registry key for the handler.
        name: String,
        /// Serializable parameter map handed to the handler.
        params: BTreeMap<String, String>,
    },
}

impl Action {
    /// Applies the action to `term`, interning replacements through `store`.
    ///
    /// Returns `Ok(None)` when the action legitimately does not apply (for
    /// the runtime this is indistinguishable from no rule matching).
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from replacement insertion. Partial inserts
    /// are kept; the store is monotonic.
    pub fn apply(
        &self,
        term: &Term,
        store: &mut TermStore,
        customs: &CustomActions,
    ) -> Result<Option<Vec<TermId>>, StoreError> {
        match self {
            Self::Expand { fanout } => {
                let up = term.scale + 1;
                let mut motifs = Vec::with_capacity(*fanout);
                for i in 0..*fanout {
                    motifs.push(store.intern(format!("{}.{i}", term.symbol), up, vec![])?);
                }
                let parent = store.intern(expansion_symbol(&term.symbol), up, motifs)?;
                Ok(Some(vec![parent]))
            }
            Self::Reduce => {
                let Some(inner) = reduction_target(&term.symbol) else {
                    return Ok(None);
                };
                let Some(down) = term.scale.checked_sub(1) else {
                    return Ok(None);
                };
                let id = store.intern(inner.to_owned(), down, vec![])?;
                Ok(Some(vec![id]))
            }
            Self::Custom { name, params } => match customs.get(name) {
                Some(handler) => handler(term, params, store).map(Some),
                // Unregistered names are rejected at validation; a missing
                // handler at step time is treated as not applicable.
                None => Ok(None),
            },
        }
    }

    /// Stable lowercase name used in summaries and trace output.
    #[must_use]
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Expand { .. } => "expand",
            Self::Reduce => "reduce",
            Self::Custom { name, .. } => name,
        }
    }
}

/// A named rewrite rule: pattern predicate plus action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Unique name within a program.
    pub name: String,
    /// Predicate selecting the terms this rule fires on.
    pub pattern: Pattern,
    /// Operation applied to matched terms.
    pub action: Action,
}

/// Returns the first deterministically overlapping rule pair, if any.
///
/// Used by load-time conflict detection: a program containing two rules whose
/// patterns overlap on symbol and scale alone is rejected before stepping
/// begins. This is a coherence guard distinct from strict matching, which
/// reports ambiguity at runtime.
#[must_use]
pub fn find_overlap(rules: &[Rule]) -> Option<(&Rule, &Rule)> {
    for (i, a) in rules.iter().enumerate() {
        for b in &rules[i + 1..] {
            if a.pattern.overlaps(&b.pattern) {
                return Some((a, b));
            }
        }
    }
    None
}
