// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, dead_code)]
//! Shared program builders for runtime integration tests.
use std::collections::BTreeSet;

use ladder_core::{Action, Pattern, Program, Rule, TermExpr};

/// Rule matching one exact symbol at any scale.
pub fn rule_on_symbol(name: &str, symbol: &str, action: Action) -> Rule {
    Rule {
        name: name.into(),
        pattern: Pattern::for_symbol(symbol),
        action,
    }
}

/// Rule matching every symbol across the given scale range.
pub fn rule_on_scales(name: &str, scales: std::ops::RangeInclusive<u32>, action: Action) -> Rule {
    Rule {
        name: name.into(),
        pattern: Pattern {
            symbol: None,
            scales: Some(scales.collect::<BTreeSet<u32>>()),
            max_children: None,
        },
        action,
    }
}

/// Program with a bare symbol root at scale 0.
pub fn program(name: &str, root: &str, rules: Vec<Rule>, max_steps: u64) -> Program {
    Program {
        name: name.into(),
        root: TermExpr::symbol(root),
        rules,
        max_steps,
    }
}
