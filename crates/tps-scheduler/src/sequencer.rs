//! Constrained random sequencing
//!
//! Randomized Kahn's algorithm: at every step one of the steps whose
//! predecessors are all placed is picked uniformly at random. The result is a
//! varied (not provably uniform) sample over the linear extensions.

use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::PrecedenceGraph;
use crate::operation::{Compute, OpKind, Operator, Schedule, Step, StepKey};
use rand::Rng;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Produce a random order of all steps consistent with every edge
pub fn sequence<R: Rng + ?Sized>(
    graph: &PrecedenceGraph,
    rng: &mut R,
) -> ScheduleResult<Vec<StepKey>> {
    let mut in_degree: BTreeMap<StepKey, usize> = graph
        .steps()
        .map(|step| (step, graph.in_degree(step)))
        .collect();

    let mut ready = graph.roots();
    let mut order = Vec::with_capacity(graph.len());

    while order.len() < graph.len() {
        if ready.is_empty() {
            return Err(graph.cycle_error(&in_degree));
        }

        let step = ready.swap_remove(rng.gen_range(0..ready.len()));
        order.push(step);

        for next in graph.successors(step) {
            if let Some(deg) = in_degree.get_mut(next) {
                *deg -= 1;
                if *deg == 0 {
                    ready.push(*next);
                }
            }
        }
    }

    Ok(order)
}

/// Turn an order of step keys into a schedule
///
/// Every compute step gets `+` or `*` with equal probability and an operand
/// drawn uniformly from `operand_range`.
pub fn instantiate<R: Rng + ?Sized>(
    order: &[StepKey],
    operand_range: &RangeInclusive<i64>,
    rng: &mut R,
) -> ScheduleResult<Schedule> {
    if operand_range.is_empty() {
        return Err(ScheduleError::InvalidConfig(format!(
            "empty operand range {}..={}",
            operand_range.start(),
            operand_range.end()
        )));
    }

    let steps = order
        .iter()
        .map(|key| {
            let mut step = Step::new(*key);
            if key.kind == OpKind::Compute {
                let operator = if rng.gen_bool(0.5) {
                    Operator::Add
                } else {
                    Operator::Mul
                };
                let operand = rng.gen_range(operand_range.clone());
                step.compute = Some(Compute::new(operator, operand));
            }
            step
        })
        .collect();

    Ok(Schedule::new(steps))
}
