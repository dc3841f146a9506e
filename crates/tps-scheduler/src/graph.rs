//! Precedence graph over step keys
//!
//! A DAG where an edge `from -> to` means `from` must appear before `to` in
//! every schedule. Valid schedules are exactly the linear extensions of it.

use crate::constraint::PrecedenceEdge;
use crate::error::{ScheduleError, ScheduleResult};
use crate::operation::StepKey;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Precedence graph
///
/// Ordered maps keep iteration deterministic, so a seeded RNG always yields
/// the same schedule.
#[derive(Clone, Debug, Default)]
pub struct PrecedenceGraph {
    /// Forward edges: step -> steps that must follow it
    forward: BTreeMap<StepKey, Vec<StepKey>>,
    /// Backward edges: step -> steps that must precede it
    backward: BTreeMap<StepKey, BTreeSet<StepKey>>,
}

impl PrecedenceGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a step universe and its edges
    ///
    /// Fails if an edge references a step outside the universe.
    pub fn build(steps: &[StepKey], edges: &[PrecedenceEdge]) -> ScheduleResult<Self> {
        let mut graph = Self::new();

        for step in steps {
            graph.add_step(*step);
        }

        for edge in edges {
            for endpoint in [edge.from, edge.to] {
                if !graph.contains(&endpoint) {
                    return Err(ScheduleError::InvalidConfig(format!(
                        "edge {} -> {} references unknown step {}",
                        edge.from, edge.to, endpoint
                    )));
                }
            }
            graph.add_edge(edge.from, edge.to);
        }

        Ok(graph)
    }

    /// Add a step to the graph
    pub fn add_step(&mut self, step: StepKey) {
        self.forward.entry(step).or_default();
        self.backward.entry(step).or_default();
    }

    /// Add an edge: `from` must appear before `to`
    pub fn add_edge(&mut self, from: StepKey, to: StepKey) {
        self.add_step(from);
        self.add_step(to);
        let successors = self.forward.entry(from).or_default();
        if !successors.contains(&to) {
            successors.push(to);
        }
        self.backward.entry(to).or_default().insert(from);
    }

    /// Check whether a step is registered
    pub fn contains(&self, step: &StepKey) -> bool {
        self.forward.contains_key(step)
    }

    /// All steps in key order
    pub fn steps(&self) -> impl Iterator<Item = StepKey> + '_ {
        self.forward.keys().copied()
    }

    /// Steps that must follow the given step
    pub fn successors(&self, step: StepKey) -> &[StepKey] {
        self.forward.get(&step).map(Vec::as_slice).unwrap_or_default()
    }

    /// Steps that must precede the given step
    pub fn predecessors(&self, step: StepKey) -> Vec<StepKey> {
        self.backward
            .get(&step)
            .map(|preds| preds.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of predecessors of a step
    pub fn in_degree(&self, step: StepKey) -> usize {
        self.backward.get(&step).map(BTreeSet::len).unwrap_or(0)
    }

    /// Steps without predecessors
    pub fn roots(&self) -> Vec<StepKey> {
        self.steps().filter(|step| self.in_degree(*step) == 0).collect()
    }

    /// Deterministic topological order (Kahn's algorithm)
    ///
    /// Returns `CyclicConstraintSet` if the edges contain a cycle.
    pub fn topological_sort(&self) -> ScheduleResult<Vec<StepKey>> {
        let mut in_degree: BTreeMap<StepKey, usize> = self
            .steps()
            .map(|step| (step, self.in_degree(step)))
            .collect();

        let mut queue: VecDeque<StepKey> = self.roots().into();
        let mut result = Vec::with_capacity(self.len());

        while let Some(step) = queue.pop_front() {
            result.push(step);
            for next in self.successors(step) {
                if let Some(deg) = in_degree.get_mut(next) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(*next);
                    }
                }
            }
        }

        if result.len() != self.len() {
            return Err(self.cycle_error(&in_degree));
        }

        Ok(result)
    }

    /// Error naming a step whose predecessors were never all placed
    pub(crate) fn cycle_error(&self, in_degree: &BTreeMap<StepKey, usize>) -> ScheduleError {
        let in_cycle = in_degree
            .iter()
            .find(|(_, deg)| **deg > 0)
            .map(|(step, _)| *step)
            .or_else(|| self.steps().next());
        match in_cycle {
            Some(step) => ScheduleError::CyclicConstraintSet(step),
            None => ScheduleError::InvalidConfig("empty precedence graph".to_string()),
        }
    }

    /// Check whether `order` places every step exactly once and respects every edge
    pub fn is_linear_extension(&self, order: &[StepKey]) -> bool {
        if order.len() != self.len() {
            return false;
        }

        let mut position = HashMap::with_capacity(order.len());
        for (idx, step) in order.iter().enumerate() {
            if !self.contains(step) || position.insert(*step, idx).is_some() {
                return false;
            }
        }

        self.forward.iter().all(|(from, successors)| {
            successors
                .iter()
                .all(|to| position[from] < position[to])
        })
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.forward.values().map(Vec::len).sum()
    }
}
