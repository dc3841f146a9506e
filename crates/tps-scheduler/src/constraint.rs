//! Precedence rules and their expansion into concrete edges
//!
//! An abstract rule such as `read ≺ compute` holds for every transaction and,
//! where an endpoint is attribute-scoped, for every attribute. Expansion turns
//! each rule into the edges over the 24-step universe.

use crate::error::ScheduleResult;
use crate::operation::{Attribute, OpKind, StepKey, TxId};
use std::collections::HashSet;

/// Abstract precedence rule between two operation kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PrecedenceRule {
    /// Kind that must come first
    pub before: OpKind,
    /// Kind that must come after
    pub after: OpKind,
}

impl PrecedenceRule {
    /// Create a rule
    pub const fn new(before: OpKind, after: OpKind) -> Self {
        Self { before, after }
    }

    /// Create a rule from single-letter operation codes
    pub fn from_codes(before: char, after: char) -> ScheduleResult<Self> {
        Ok(Self::new(OpKind::from_code(before)?, OpKind::from_code(after)?))
    }

    /// Concrete step of `kind` for the given transaction and attribute
    fn endpoint(kind: OpKind, tx: TxId, attr: Attribute) -> StepKey {
        if kind.is_attribute_scoped() {
            StepKey::scoped(kind, tx, attr)
        } else {
            StepKey::unscoped(kind, tx)
        }
    }
}

/// Concrete precedence edge: `from` must appear before `to`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrecedenceEdge {
    /// Source step
    pub from: StepKey,
    /// Target step
    pub to: StepKey,
}

impl PrecedenceEdge {
    /// Create an edge
    pub fn new(from: StepKey, to: StepKey) -> Self {
        Self { from, to }
    }
}

/// The fixed rule set of the trainer
///
/// begin ≺ lock, begin ≺ unlock, begin ≺ read, read ≺ compute,
/// compute ≺ write, write ≺ commit, lock ≺ commit, unlock ≺ commit.
pub fn default_rules() -> Vec<PrecedenceRule> {
    use OpKind::*;
    vec![
        PrecedenceRule::new(Begin, Lock),
        PrecedenceRule::new(Begin, Unlock),
        PrecedenceRule::new(Begin, Read),
        PrecedenceRule::new(Read, Compute),
        PrecedenceRule::new(Compute, Write),
        PrecedenceRule::new(Write, Commit),
        PrecedenceRule::new(Lock, Commit),
        PrecedenceRule::new(Unlock, Commit),
    ]
}

/// Expand abstract rules into concrete edges
///
/// Per rule and transaction, one edge per attribute when either endpoint is
/// attribute-scoped, otherwise a single edge. Output order follows the input
/// rules and is free of duplicates.
pub fn expand(rules: &[PrecedenceRule]) -> Vec<PrecedenceEdge> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for rule in rules {
        let scoped = rule.before.is_attribute_scoped() || rule.after.is_attribute_scoped();
        // unscoped endpoints ignore the attribute, so one pass is enough
        let passes = if scoped { Attribute::ALL.len() } else { 1 };

        for tx in TxId::ALL {
            for attr in Attribute::ALL.into_iter().take(passes) {
                let edge = PrecedenceEdge::new(
                    PrecedenceRule::endpoint(rule.before, tx, attr),
                    PrecedenceRule::endpoint(rule.after, tx, attr),
                );
                if seen.insert(edge) {
                    edges.push(edge);
                }
            }
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScheduleError;
    use crate::operation::step_set;

    #[test]
    fn test_from_codes() {
        let rule = PrecedenceRule::from_codes('r', 'o').unwrap();
        assert_eq!(rule, PrecedenceRule::new(OpKind::Read, OpKind::Compute));

        assert_eq!(
            PrecedenceRule::from_codes('b', 'z'),
            Err(ScheduleError::UnknownOperationKind('z'))
        );
    }

    #[test]
    fn test_both_scoped_rule_emits_per_attribute() {
        let edges = expand(&[PrecedenceRule::new(OpKind::Read, OpKind::Compute)]);
        assert_eq!(edges.len(), 4);
        assert!(edges.contains(&PrecedenceEdge::new(
            StepKey::scoped(OpKind::Read, TxId::T2, Attribute::B),
            StepKey::scoped(OpKind::Compute, TxId::T2, Attribute::B),
        )));
    }

    #[test]
    fn test_half_scoped_rule_emits_per_attribute() {
        let edges = expand(&[PrecedenceRule::new(OpKind::Begin, OpKind::Lock)]);
        assert_eq!(edges.len(), 4);
        for edge in &edges {
            assert_eq!(edge.from.kind, OpKind::Begin);
            assert_eq!(edge.from.attr, None);
            assert_eq!(edge.from.tx, edge.to.tx);
            assert!(edge.to.attr.is_some());
        }

        let edges = expand(&[PrecedenceRule::new(OpKind::Unlock, OpKind::Commit)]);
        assert_eq!(edges.len(), 4);
        assert!(edges.iter().all(|e| e.to.attr.is_none()));
    }

    #[test]
    fn test_unscoped_rule_emits_once_per_transaction() {
        let edges = expand(&[PrecedenceRule::new(OpKind::Begin, OpKind::Commit)]);
        assert_eq!(
            edges,
            vec![
                PrecedenceEdge::new(
                    StepKey::unscoped(OpKind::Begin, TxId::T1),
                    StepKey::unscoped(OpKind::Commit, TxId::T1),
                ),
                PrecedenceEdge::new(
                    StepKey::unscoped(OpKind::Begin, TxId::T2),
                    StepKey::unscoped(OpKind::Commit, TxId::T2),
                ),
            ]
        );
    }

    #[test]
    fn test_default_rules_expansion() {
        let edges = expand(&default_rules());
        // 8 rules, each touching an attribute-scoped kind: 8 * 2 tx * 2 attrs
        assert_eq!(edges.len(), 32);

        let universe: HashSet<_> = step_set().into_iter().collect();
        for edge in &edges {
            assert!(universe.contains(&edge.from));
            assert!(universe.contains(&edge.to));
            assert_eq!(edge.from.tx, edge.to.tx);
        }
    }

    #[test]
    fn test_expansion_is_deterministic() {
        assert_eq!(expand(&default_rules()), expand(&default_rules()));
    }

    #[test]
    fn test_duplicate_rules_collapse() {
        let rule = PrecedenceRule::new(OpKind::Write, OpKind::Commit);
        assert_eq!(expand(&[rule, rule]).len(), 4);
    }
}
