// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Optional per-symbol arity and scale signatures.
//!
//! A [`SignatureSet`] declares, per symbol, the allowed child count range and
//! the set of scales the symbol may appear at. When attached to a store it is
//! consulted on every insertion, both during initial program construction and
//! during rewrites. Symbols without a declaration are unconstrained.
use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Constraints declared for a single symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSignature {
    /// Minimum number of children, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_children: Option<usize>,
    /// Maximum number of children, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_children: Option<usize>,
    /// Scales the symbol may appear at. `None` means any scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scales: Option<BTreeSet<u32>>,
}

/// Per-symbol signature declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSet {
    /// Mapping from symbol to its declared constraints.
    pub symbols: BTreeMap<String, SymbolSignature>,
}

/// A term's content violated its symbol's declared signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureViolation {
    /// Child count fell outside the declared `[min_children, max_children]`.
    #[error("symbol {symbol:?} has {actual} children, allowed {min}..={max}")]
    Arity {
        /// Offending symbol.
        symbol: String,
        /// Observed child count.
        actual: usize,
        /// Declared minimum (0 when unset).
        min: usize,
        /// Declared maximum (`usize::MAX` when unset).
        max: usize,
    },
    /// Scale not in the declared scale set.
    #[error("symbol {symbol:?} not allowed at scale {scale}")]
    Scale {
        /// Offending symbol.
        symbol: String,
        /// Observed scale.
        scale: u32,
    },
}

impl SignatureSet {
    /// Parses a signature set from its JSON surface form.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error when the document does not
    /// match the `{"symbols": {...}}` shape.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Checks `(symbol, scale, child_count)` against this set.
    ///
    /// # Errors
    ///
    /// Returns a [`SignatureViolation`] naming the failed constraint.
    pub fn validate(
        &self,
        symbol: &str,
        scale: u32,
        child_count: usize,
    ) -> Result<(), SignatureViolation> {
        let Some(sig) = self.symbols.get(symbol) else {
            return Ok(());
        };
        let min = sig.min_children.unwrap_or(0);
        let max = sig.max_children.unwrap_or(usize::MAX);
        if child_count < min || child_count > max {
            return Err(SignatureViolation::Arity {
                symbol: symbol.to_owned(),
                actual: child_count,
                min,
                max,
            });
        }
        if let Some(scales) = &sig.scales {
            if !scales.contains(&scale) {
                return Err(SignatureViolation::Scale {
                    symbol: symbol.to_owned(),
                    scale,
                });
            }
        }
        Ok(())
    }
}
