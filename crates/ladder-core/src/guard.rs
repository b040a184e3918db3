// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Guard machinery: budgets and include/exclude filters.
use std::collections::{BTreeMap, BTreeSet};

/// Static guard configuration fixed at program load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardConfig {
    /// Optional cap on unique store entries.
    pub max_terms: Option<usize>,
    /// Per-rule fire budgets (rule name to allowed fires).
    pub rule_budgets: BTreeMap<String, u64>,
    /// Allowlist of rule names; empty means all rules allowed.
    pub include_rules: BTreeSet<String>,
    /// Blocklist of rule names.
    pub exclude_rules: BTreeSet<String>,
    /// Allowlist of scales; empty means all scales allowed.
    pub include_scales: BTreeSet<u32>,
    /// Blocklist of scales.
    pub exclude_scales: BTreeSet<u32>,
}

impl GuardConfig {
    /// Rejects include/exclude overlap for both rule and scale filters.
    ///
    /// # Errors
    ///
    /// Returns the offending filter description; callers surface this as a
    /// validation error before stepping begins.
    pub fn check_filter_overlap(&self) -> Result<(), String> {
        if let Some(name) = self.include_rules.intersection(&self.exclude_rules).next() {
            return Err(format!("rule {name:?} is both included and excluded"));
        }
        if let Some(scale) = self
            .include_scales
            .intersection(&self.exclude_scales)
            .next()
        {
            return Err(format!("scale {scale} is both included and excluded"));
        }
        Ok(())
    }
}

/// Mutable guard state advanced by the runtime and carried by snapshots.
#[derive(Debug, Clone, Default)]
pub struct GuardState {
    remaining: BTreeMap<String, u64>,
    exhausted: Vec<String>,
}

impl GuardState {
    /// Initializes remaining budgets from the configuration.
    #[must_use]
    pub fn new(config: &GuardConfig) -> Self {
        Self {
            remaining: config.rule_budgets.clone(),
            exhausted: Vec::new(),
        }
    }

    /// Rebuilds state from snapshot fields.
    #[must_use]
    pub fn restore(remaining: BTreeMap<String, u64>, exhausted: Vec<String>) -> Self {
        Self {
            remaining,
            exhausted,
        }
    }

    /// Remaining fires per budgeted rule.
    #[must_use]
    pub fn remaining(&self) -> &BTreeMap<String, u64> {
        &self.remaining
    }

    /// Rule names whose budget reached zero, in exhaustion order.
    #[must_use]
    pub fn exhausted(&self) -> &[String] {
        &self.exhausted
    }

    /// Returns `true` when the rule still has budget (or has none set).
    #[must_use]
    pub fn has_budget(&self, rule: &str) -> bool {
        self.remaining.get(rule).is_none_or(|n| *n > 0)
    }

    /// Consumes one fire from the rule's budget, recording exhaustion when
    /// the budget reaches zero.
    pub fn spend(&mut self, rule: &str) {
        let Some(n) = self.remaining.get_mut(rule) else {
            return;
        };
        *n = n.saturating_sub(1);
        if *n == 0 {
            self.exhausted.push(rule.to_owned());
        }
    }
}

/// Applies the rule include/exclude filters.
#[must_use]
pub fn rule_allowed(config: &GuardConfig, rule: &str) -> bool {
    if config.exclude_rules.contains(rule) {
        return false;
    }
    config.include_rules.is_empty() || config.include_rules.contains(rule)
}

/// Applies the scale include/exclude filters.
#[must_use]
pub fn scale_allowed(config: &GuardConfig, scale: u32) -> bool {
    if config.exclude_scales.contains(&scale) {
        return false;
    }
    config.include_scales.is_empty() || config.include_scales.contains(&scale)
}
