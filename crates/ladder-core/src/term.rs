// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Term record type.
use crate::ident::TermId;

/// A scale-labelled term: symbol, non-negative scale, ordered children.
///
/// Terms are immutable once interned; children are referenced by id rather
/// than by direct handle, so no cyclic ownership arises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// Symbol carried by the term (arbitrary string).
    pub symbol: String,
    /// Scale label. Convention: micro(0) / meso(1) / macro(2+).
    pub scale: u32,
    /// Ordered child term ids.
    pub children: Vec<TermId>,
}

impl Term {
    /// Constructs a childless term at the given scale.
    #[must_use]
    pub fn leaf(symbol: impl Into<String>, scale: u32) -> Self {
        Self {
            symbol: symbol.into(),
            scale,
            children: Vec::new(),
        }
    }
}
