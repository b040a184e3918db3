// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Program model and load-time validation.
use std::collections::BTreeSet;

use crate::guard::GuardConfig;
use crate::ident::TermId;
use crate::rule::{find_overlap, Action, CustomActions, Rule};
use crate::store::{StoreError, TermStore};

/// Unresolved term tree, as read from program source.
///
/// Interned children-first, so every child id exists before its parent's id
/// is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermExpr {
    /// Symbol for the node.
    pub symbol: String,
    /// Scale label; bare symbols in source inherit 0.
    pub scale: u32,
    /// Child subtrees, in order.
    pub children: Vec<TermExpr>,
}

impl TermExpr {
    /// Childless expression at scale 0.
    #[must_use]
    pub fn symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            scale: 0,
            children: Vec::new(),
        }
    }

    /// Interns the tree bottom-up and returns the root id.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from any insertion.
    pub fn intern(&self, store: &mut TermStore) -> Result<TermId, StoreError> {
        let mut children = Vec::with_capacity(self.children.len());
        for child in &self.children {
            children.push(child.intern(store)?);
        }
        store.intern(self.symbol.clone(), self.scale, children)
    }
}

/// A loaded program: root term, ordered rules, step budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Display name, usually the source file stem.
    pub name: String,
    /// Initial root term.
    pub root: TermExpr,
    /// Rules in program order; names are unique.
    pub rules: Vec<Rule>,
    /// Cap on total applied rewrites; must be positive.
    pub max_steps: u64,
}

/// Problems detected before stepping begins.
///
/// Validation errors always abort the run; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `max_steps` must be positive.
    #[error("max_steps must be positive")]
    NonPositiveMaxSteps,
    /// Two rules share a name.
    #[error("duplicate rule name: {0:?}")]
    DuplicateRuleName(String),
    /// A pattern constrains neither symbol nor scale.
    #[error("rule {0:?} has an empty pattern; set :sym or :scale")]
    EmptyPattern(String),
    /// `expand` requires `fanout >= 1`.
    #[error("rule {0:?} has fanout {1}; expand requires fanout >= 1")]
    BadFanout(String, usize),
    /// A custom action name has no registered handler.
    #[error("rule {0:?} names unregistered action {1:?}")]
    UnknownCustomAction(String, String),
    /// A filter or budget references a rule that does not exist.
    #[error("unknown rule {0:?} referenced by {1}")]
    UnknownRule(String, &'static str),
    /// A rule budget of zero can never fire.
    #[error("rule budget for {0:?} must be positive")]
    NonPositiveBudget(String),
    /// Include and exclude sets intersect.
    #[error("overlapping filters: {0}")]
    FilterOverlap(String),
    /// Conflict detection found two deterministically overlapping rules.
    #[error("rules {0:?} and {1:?} deterministically overlap")]
    RuleConflict(String, String),
    /// The root term could not be interned (signature or cap violation).
    #[error("root rejected: {0}")]
    RootRejected(#[from] StoreError),
}

/// Validates a program against a guard configuration and action registry.
///
/// Covers every load-time check: budget positivity, name uniqueness,
/// pattern well-formedness, filter overlap, referenced-name existence, and
/// (when requested) deterministic-overlap conflict detection.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn validate(
    program: &Program,
    guards: &GuardConfig,
    customs: &CustomActions,
    detect_conflicts: bool,
) -> Result<(), ValidationError> {
    if program.max_steps == 0 {
        return Err(ValidationError::NonPositiveMaxSteps);
    }

    let mut names = BTreeSet::new();
    for rule in &program.rules {
        if !names.insert(rule.name.as_str()) {
            return Err(ValidationError::DuplicateRuleName(rule.name.clone()));
        }
        if rule.pattern.symbol.is_none() && rule.pattern.scales.is_none() {
            return Err(ValidationError::EmptyPattern(rule.name.clone()));
        }
        match &rule.action {
            Action::Expand { fanout } if *fanout == 0 => {
                return Err(ValidationError::BadFanout(rule.name.clone(), *fanout));
            }
            Action::Custom { name, .. } if !customs.contains_key(name) => {
                return Err(ValidationError::UnknownCustomAction(
                    rule.name.clone(),
                    name.clone(),
                ));
            }
            _ => {}
        }
    }

    for (name, budget) in &guards.rule_budgets {
        if *budget == 0 {
            return Err(ValidationError::NonPositiveBudget(name.clone()));
        }
        if !names.contains(name.as_str()) {
            return Err(ValidationError::UnknownRule(name.clone(), "rule budget"));
        }
    }
    for name in guards.include_rules.iter().chain(&guards.exclude_rules) {
        if !names.contains(name.as_str()) {
            return Err(ValidationError::UnknownRule(name.clone(), "rule filter"));
        }
    }
    guards
        .check_filter_overlap()
        .map_err(ValidationError::FilterOverlap)?;

    if detect_conflicts {
        if let Some((a, b)) = find_overlap(&program.rules) {
            return Err(ValidationError::RuleConflict(
                a.name.clone(),
                b.name.clone(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::rule::Pattern;

    fn expand_rule(name: &str, sym: &str) -> Rule {
        Rule {
            name: name.into(),
            pattern: Pattern::for_symbol(sym),
            action: Action::Expand { fanout: 1 },
        }
    }

    fn program(rules: Vec<Rule>) -> Program {
        Program {
            name: "test".into(),
            root: TermExpr::symbol("A"),
            rules,
            max_steps: 8,
        }
    }

    #[test]
    fn duplicate_rule_names_are_rejected() {
        let p = program(vec![expand_rule("up", "A"), expand_rule("up", "B")]);
        assert_eq!(
            validate(&p, &GuardConfig::default(), &CustomActions::new(), false),
            Err(ValidationError::DuplicateRuleName("up".into()))
        );
    }

    #[test]
    fn empty_patterns_are_rejected() {
        let mut rule = expand_rule("up", "A");
        rule.pattern = Pattern {
            symbol: None,
            scales: None,
            max_children: Some(2),
        };
        assert!(matches!(
            validate(
                &program(vec![rule]),
                &GuardConfig::default(),
                &CustomActions::new(),
                false
            ),
            Err(ValidationError::EmptyPattern(_))
        ));
    }

    #[test]
    fn conflict_detection_is_opt_in() {
        let p = program(vec![expand_rule("a", "X"), expand_rule("b", "X")]);
        assert!(validate(&p, &GuardConfig::default(), &CustomActions::new(), false).is_ok());
        assert!(matches!(
            validate(&p, &GuardConfig::default(), &CustomActions::new(), true),
            Err(ValidationError::RuleConflict(_, _))
        ));
    }

    #[test]
    fn budgets_must_reference_known_rules_positively() {
        let p = program(vec![expand_rule("up", "A")]);
        let mut guards = GuardConfig::default();
        guards.rule_budgets.insert("up".into(), 0);
        assert!(matches!(
            validate(&p, &guards, &CustomActions::new(), false),
            Err(ValidationError::NonPositiveBudget(_))
        ));
        let mut guards = GuardConfig::default();
        guards.rule_budgets.insert("ghost".into(), 2);
        assert!(matches!(
            validate(&p, &guards, &CustomActions::new(), false),
            Err(ValidationError::UnknownRule(_, _))
        ));
    }

    #[test]
    fn term_expr_interning_is_bottom_up() {
        let mut store = TermStore::new();
        let expr = TermExpr {
            symbol: "root".into(),
            scale: 1,
            children: vec![TermExpr::symbol("leaf")],
        };
        let id = expr.intern(&mut store).unwrap();
        let root = store.get(&id).unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(store.get(&root.children[0]).unwrap().symbol, "leaf");
    }
}
