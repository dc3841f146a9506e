//! Schedule classification
//!
//! Four predicates in inclusion order:
//!
//! 1. consistent: every access happens while the accessing transaction holds the lock
//! 2. legal: no attribute is locked by both transactions at once
//! 3. serializable: compute steps yield the same final (A, B) as a serial order
//! 4. conflict serializable: conflicting read/write pairs are ordered as in a serial order
//!
//! A predicate is only evaluated when the weaker ones hold; view and conflict
//! serializability both build on legality.

use crate::error::{ScheduleError, ScheduleResult};
use crate::operation::{step_set, Attribute, OpKind, Schedule, Step, TxId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Initial values of the two attributes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseValues {
    /// Value of A
    pub a: i64,
    /// Value of B
    pub b: i64,
}

impl BaseValues {
    /// Create base values
    pub fn new(a: i64, b: i64) -> Self {
        Self { a, b }
    }

    /// Value of an attribute
    pub fn get(&self, attr: Attribute) -> i64 {
        match attr {
            Attribute::A => self.a,
            Attribute::B => self.b,
        }
    }

    fn get_mut(&mut self, attr: Attribute) -> &mut i64 {
        match attr {
            Attribute::A => &mut self.a,
            Attribute::B => &mut self.b,
        }
    }
}

/// Correctness class, ordered from weakest to strongest
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleClass {
    /// Consistent but not legal
    Consistent,
    /// Legal but not serializable
    Legal,
    /// View serializable but not conflict serializable
    Serializable,
    /// Conflict serializable
    ConflictSerializable,
}

impl ScheduleClass {
    /// All classes in inclusion order
    pub const ALL: [ScheduleClass; 4] = [
        ScheduleClass::Consistent,
        ScheduleClass::Legal,
        ScheduleClass::Serializable,
        ScheduleClass::ConflictSerializable,
    ];

    /// Snake-case name
    pub fn name(self) -> &'static str {
        match self {
            ScheduleClass::Consistent => "consistent",
            ScheduleClass::Legal => "legal",
            ScheduleClass::Serializable => "serializable",
            ScheduleClass::ConflictSerializable => "conflict_serializable",
        }
    }
}

impl fmt::Display for ScheduleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Verdict of every predicate, in inclusion order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification {
    /// Every access is covered by the accessing transaction's lock
    pub consistent: bool,
    /// No attribute is locked by both transactions at once
    pub legal: bool,
    /// View serializable
    pub serializable: bool,
    /// Conflict serializable
    pub conflict_serializable: bool,
}

impl Classification {
    /// Strongest class that holds, or `None` if the schedule is not even consistent
    pub fn class(&self) -> Option<ScheduleClass> {
        if !self.consistent {
            None
        } else if !self.legal {
            Some(ScheduleClass::Consistent)
        } else if self.conflict_serializable {
            Some(ScheduleClass::ConflictSerializable)
        } else if self.serializable {
            Some(ScheduleClass::Serializable)
        } else {
            Some(ScheduleClass::Legal)
        }
    }

    /// Verdicts as `[consistent, legal, serializable, conflict_serializable]`
    pub fn as_array(&self) -> [bool; 4] {
        [
            self.consistent,
            self.legal,
            self.serializable,
            self.conflict_serializable,
        ]
    }
}

/// Classify a schedule
///
/// Fails with `MalformedSchedule` before evaluating anything if the schedule
/// is not a permutation of the 24 steps or a compute step lacks parameters.
pub fn classify(schedule: &Schedule, base: BaseValues) -> ScheduleResult<Classification> {
    validate(schedule)?;

    let mut verdict = Classification {
        consistent: is_consistent(schedule),
        ..Default::default()
    };
    if !verdict.consistent {
        return Ok(verdict);
    }

    verdict.legal = is_legal(schedule);
    if !verdict.legal {
        return Ok(verdict);
    }

    verdict.serializable = is_view_serializable(schedule, base);
    verdict.conflict_serializable = is_conflict_serializable(schedule);

    Ok(verdict)
}

/// Check that a schedule is a permutation of the step set with complete compute steps
pub fn validate(schedule: &Schedule) -> ScheduleResult<()> {
    let universe: HashSet<_> = step_set().into_iter().collect();
    let mut seen = HashSet::with_capacity(universe.len());

    for step in schedule.iter() {
        if !universe.contains(&step.key) {
            return Err(ScheduleError::MalformedSchedule(format!(
                "step {:?} is outside the vocabulary",
                step.key
            )));
        }
        if !seen.insert(step.key) {
            return Err(ScheduleError::MalformedSchedule(format!(
                "step {} appears more than once",
                step.key
            )));
        }
        match (step.kind(), step.compute) {
            (OpKind::Compute, None) => {
                return Err(ScheduleError::MalformedSchedule(format!(
                    "compute step {} has no operator/operand",
                    step.key
                )));
            }
            (kind, Some(_)) if kind != OpKind::Compute => {
                return Err(ScheduleError::MalformedSchedule(format!(
                    "step {} carries compute parameters",
                    step.key
                )));
            }
            _ => {}
        }
    }

    if let Some(missing) = step_set().into_iter().find(|key| !seen.contains(key)) {
        return Err(ScheduleError::MalformedSchedule(format!(
            "step {missing} is missing"
        )));
    }

    Ok(())
}

/// Per-attribute lock holders during a scan
#[derive(Debug, Default)]
struct LockTable {
    holders: HashMap<Attribute, TxId>,
}

impl LockTable {
    /// Record `tx` as holder; returns the other transaction it displaced, if any
    fn lock(&mut self, attr: Attribute, tx: TxId) -> Option<TxId> {
        self.holders.insert(attr, tx).filter(|previous| *previous == tx.other())
    }

    fn unlock(&mut self, attr: Attribute) {
        self.holders.remove(&attr);
    }

    fn is_holder(&self, attr: Attribute, tx: TxId) -> bool {
        self.holders.get(&attr) == Some(&tx)
    }
}

/// Every read, compute and write happens while its transaction holds the lock
pub fn is_consistent(schedule: &Schedule) -> bool {
    let mut locks = LockTable::default();

    for step in schedule.iter() {
        let Some(attr) = step.attr() else { continue };
        match step.kind() {
            OpKind::Lock => {
                locks.lock(attr, step.tx());
            }
            OpKind::Unlock => locks.unlock(attr),
            OpKind::Read | OpKind::Compute | OpKind::Write => {
                if !locks.is_holder(attr, step.tx()) {
                    tracing::trace!("consistency violated at {}", step);
                    return false;
                }
            }
            OpKind::Begin | OpKind::Commit => {}
        }
    }

    true
}

/// No lock is granted while the other transaction holds the attribute
pub fn is_legal(schedule: &Schedule) -> bool {
    let mut locks = LockTable::default();

    for step in schedule.iter() {
        let Some(attr) = step.attr() else { continue };
        match step.kind() {
            OpKind::Lock => {
                if let Some(holder) = locks.lock(attr, step.tx()) {
                    tracing::trace!("legality violated at {}: {} holds {}", step, holder, attr);
                    return false;
                }
            }
            OpKind::Unlock => locks.unlock(attr),
            _ => {}
        }
    }

    true
}

/// Final values of applying compute steps in the given order
fn apply_computes<'a>(steps: impl IntoIterator<Item = &'a Step>, base: BaseValues) -> BaseValues {
    steps.into_iter().fold(base, |mut db, step| {
        if let (Some(attr), Some(compute)) = (step.attr(), step.compute) {
            let value = db.get_mut(attr);
            *value = compute.apply(*value);
        }
        db
    })
}

/// Compute steps in schedule order yield the same final values as T1;T2 or T2;T1
pub fn is_view_serializable(schedule: &Schedule, base: BaseValues) -> bool {
    let computes: Vec<&Step> = schedule
        .iter()
        .filter(|step| step.kind() == OpKind::Compute)
        .collect();
    let of = |tx: TxId| computes.iter().copied().filter(move |step| step.tx() == tx);

    let interleaved = apply_computes(computes.iter().copied(), base);
    let t1_first = apply_computes(of(TxId::T1).chain(of(TxId::T2)), base);
    let t2_first = apply_computes(of(TxId::T2).chain(of(TxId::T1)), base);

    interleaved == t1_first || interleaved == t2_first
}

/// Every conflicting read/write pair is ordered the same way across transactions
///
/// Two steps conflict when they touch the same attribute from different
/// transactions and at least one of them writes. The schedule is conflict
/// equivalent to a serial one iff all conflicting pairs have the same
/// transaction first.
pub fn is_conflict_serializable(schedule: &Schedule) -> bool {
    let accesses: Vec<&Step> = schedule
        .iter()
        .filter(|step| matches!(step.kind(), OpKind::Read | OpKind::Write))
        .collect();

    let mut first_movers = HashSet::new();
    for (i, earlier) in accesses.iter().enumerate() {
        for later in &accesses[i + 1..] {
            let conflicting = earlier.attr() == later.attr()
                && earlier.tx() != later.tx()
                && (earlier.kind() == OpKind::Write || later.kind() == OpKind::Write);
            if conflicting {
                first_movers.insert(earlier.tx());
                if first_movers.len() > 1 {
                    return false;
                }
            }
        }
    }

    true
}
