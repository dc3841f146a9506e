//! Schedule search loop
//!
//! Draws random schedules until one matches the requested class and differs
//! from every schedule already shown in the session. The number of candidates
//! is bounded per search and across restarts.

use crate::classifier::{classify, BaseValues, Classification, ScheduleClass};
use crate::constraint::{default_rules, expand, PrecedenceEdge, PrecedenceRule};
use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::PrecedenceGraph;
use crate::operation::{step_set, Schedule, StepKey};
use crate::sequencer::{instantiate, sequence};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::RangeInclusive;

/// Candidates drawn per search before giving up on the target class
pub const DEFAULT_MAX_ATTEMPTS: usize = 500;

/// Restarts allowed when the round count is unbounded
pub const DEFAULT_MAX_RESTARTS: usize = 20;

/// Ascending percentile thresholds selecting the target class
///
/// A percentile below the lowest threshold selects "none of the above";
/// otherwise the class of the highest threshold not above it wins.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassThresholds {
    entries: Vec<(ScheduleClass, f64)>,
}

impl ClassThresholds {
    /// Create a threshold table
    ///
    /// Thresholds must lie in `[0, 100]` and be non-decreasing.
    pub fn new(entries: Vec<(ScheduleClass, f64)>) -> ScheduleResult<Self> {
        for (class, threshold) in &entries {
            if !(0.0..=100.0).contains(threshold) {
                return Err(ScheduleError::InvalidConfig(format!(
                    "threshold {threshold} for {class} is outside 0..=100"
                )));
            }
        }
        if entries.windows(2).any(|pair| pair[0].1 > pair[1].1) {
            return Err(ScheduleError::InvalidConfig(
                "class thresholds must be ascending".to_string(),
            ));
        }
        Ok(Self { entries })
    }

    /// Class selected by a percentile in `[0, 100)`
    pub fn select(&self, percentile: f64) -> Option<ScheduleClass> {
        self.entries
            .iter()
            .take_while(|(_, threshold)| percentile >= *threshold)
            .last()
            .map(|(class, _)| *class)
    }

    /// Draw a uniform percentile and select its class
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<ScheduleClass> {
        self.select(rng.gen_range(0.0..100.0))
    }

    /// Threshold entries in order
    pub fn entries(&self) -> &[(ScheduleClass, f64)] {
        &self.entries
    }
}

impl Default for ClassThresholds {
    fn default() -> Self {
        Self {
            entries: vec![
                (ScheduleClass::Consistent, 20.0),
                (ScheduleClass::Legal, 40.0),
                (ScheduleClass::Serializable, 60.0),
                (ScheduleClass::ConflictSerializable, 80.0),
            ],
        }
    }
}

/// Whether a session has a known number of rounds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundMode {
    /// Fixed number of rounds: an unmatched search accepts its last candidate
    Fixed(usize),
    /// Open-ended session: an unmatched search restarts
    Unbounded,
}

impl RoundMode {
    /// `0` means unbounded
    pub fn from_count(rounds: usize) -> Self {
        if rounds == 0 {
            RoundMode::Unbounded
        } else {
            RoundMode::Fixed(rounds)
        }
    }
}

/// Steps and precedence graph candidates are drawn from
#[derive(Clone, Debug)]
pub struct SearchSpace {
    graph: PrecedenceGraph,
}

impl SearchSpace {
    /// Build from an explicit step universe and edges
    ///
    /// Fails with `CyclicConstraintSet` if the edges are not acyclic.
    pub fn new(steps: &[StepKey], edges: &[PrecedenceEdge]) -> ScheduleResult<Self> {
        let graph = PrecedenceGraph::build(steps, edges)?;
        graph.topological_sort()?;
        Ok(Self { graph })
    }

    /// Build the standard step set constrained by `rules`
    pub fn from_rules(rules: &[PrecedenceRule]) -> ScheduleResult<Self> {
        Self::new(&step_set(), &expand(rules))
    }

    /// The precedence graph
    pub fn graph(&self) -> &PrecedenceGraph {
        &self.graph
    }
}

impl Default for SearchSpace {
    /// Standard step set with the default rules
    fn default() -> Self {
        let mut graph = PrecedenceGraph::new();
        for step in step_set() {
            graph.add_step(step);
        }
        for edge in expand(&default_rules()) {
            graph.add_edge(edge.from, edge.to);
        }
        Self { graph }
    }
}

/// Everything a search needs besides history and randomness
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Candidate universe
    pub space: SearchSpace,
    /// Target class table
    pub thresholds: ClassThresholds,
    /// Inclusive range of the base values of A and B
    pub value_range: RangeInclusive<i64>,
    /// Inclusive range of compute operands
    pub operand_range: RangeInclusive<i64>,
    /// Value of A used instead of a draw from `value_range`
    pub fixed_a: Option<i64>,
    /// Value of B used instead of a draw from `value_range`
    pub fixed_b: Option<i64>,
    /// Round mode of the session
    pub rounds: RoundMode,
    /// Candidates per search
    pub max_attempts: usize,
    /// Restarts in unbounded mode before `SearchExhausted`
    pub max_restarts: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            space: SearchSpace::default(),
            thresholds: ClassThresholds::default(),
            value_range: 1..=9,
            operand_range: 1..=9,
            fixed_a: None,
            fixed_b: None,
            rounds: RoundMode::Fixed(10),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_restarts: DEFAULT_MAX_RESTARTS,
        }
    }
}

impl SearchConfig {
    /// Set the candidate universe
    pub fn with_space(mut self, space: SearchSpace) -> Self {
        self.space = space;
        self
    }

    /// Set the target class table
    pub fn with_thresholds(mut self, thresholds: ClassThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Set the base value range
    pub fn with_value_range(mut self, range: RangeInclusive<i64>) -> Self {
        self.value_range = range;
        self
    }

    /// Set the operand range
    pub fn with_operand_range(mut self, range: RangeInclusive<i64>) -> Self {
        self.operand_range = range;
        self
    }

    /// Pin either base value; `None` keeps the draw from `value_range`
    pub fn with_fixed_base(mut self, a: Option<i64>, b: Option<i64>) -> Self {
        self.fixed_a = a;
        self.fixed_b = b;
        self
    }

    /// Set the round mode
    pub fn with_rounds(mut self, rounds: RoundMode) -> Self {
        self.rounds = rounds;
        self
    }

    /// Set the attempt bound per search
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the restart bound
    pub fn with_max_restarts(mut self, max_restarts: usize) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    /// Check ranges and bounds
    pub fn validate(&self) -> ScheduleResult<()> {
        for (name, range) in [("value", &self.value_range), ("operand", &self.operand_range)] {
            if range.is_empty() {
                return Err(ScheduleError::InvalidConfig(format!(
                    "empty {name} range {}..={}",
                    range.start(),
                    range.end()
                )));
            }
        }
        if self.max_attempts == 0 {
            return Err(ScheduleError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One generated exercise
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Base values of A and B
    #[serde(flatten)]
    pub base: BaseValues,
    /// Class the search aimed for (`None`: not even consistent)
    pub target: Option<ScheduleClass>,
    /// Generated schedule
    pub schedule: Schedule,
    /// Actual verdicts
    pub solution: Classification,
}

impl Section {
    /// Actual class of the schedule
    pub fn class(&self) -> Option<ScheduleClass> {
        self.solution.class()
    }

    /// Whether the schedule landed in its target class
    pub fn matches_target(&self) -> bool {
        self.class() == self.target
    }
}

/// Generate a section whose schedule falls into a randomly drawn target class
///
/// `history` holds earlier sections of the session; a candidate with the same
/// token sequence as any of them is rejected. After `max_attempts` candidates
/// without a match, a fixed-round session accepts the last unseen candidate
/// while an unbounded session restarts with a new target, up to
/// `max_restarts` times. A fixed-round search that saw nothing but repeats
/// restarts as well.
pub fn generate_section<R: Rng + ?Sized>(
    config: &SearchConfig,
    history: &[Section],
    rng: &mut R,
) -> ScheduleResult<Section> {
    config.validate()?;

    let seen: HashSet<Vec<String>> = history.iter().map(|s| s.schedule.tokens()).collect();
    let mut attempts = 0;

    for restart in 0..=config.max_restarts {
        let target = config.thresholds.draw(rng);
        let base = BaseValues::new(
            config
                .fixed_a
                .unwrap_or_else(|| rng.gen_range(config.value_range.clone())),
            config
                .fixed_b
                .unwrap_or_else(|| rng.gen_range(config.value_range.clone())),
        );
        let mut last = None;

        for _ in 0..config.max_attempts {
            attempts += 1;
            let order = sequence(config.space.graph(), rng)?;
            let schedule = instantiate(&order, &config.operand_range, rng)?;

            if seen.contains(&schedule.tokens()) {
                tracing::debug!("candidate {} repeats an earlier section", attempts);
                continue;
            }

            let solution = classify(&schedule, base)?;
            if solution.class() == target {
                tracing::info!(
                    "schedule for target {:?} found after {} attempts",
                    target,
                    attempts
                );
                return Ok(Section {
                    base,
                    target,
                    schedule,
                    solution,
                });
            }
            last = Some(schedule);
        }

        match config.rounds {
            RoundMode::Fixed(_) => {
                let Some(schedule) = last else {
                    tracing::warn!(
                        "every candidate repeated an earlier section, restart {}/{}",
                        restart + 1,
                        config.max_restarts
                    );
                    continue;
                };
                let solution = classify(&schedule, base)?;
                tracing::warn!(
                    "no schedule of class {:?} within {} attempts, accepting {:?}",
                    target,
                    config.max_attempts,
                    solution.class()
                );
                return Ok(Section {
                    base,
                    target,
                    schedule,
                    solution,
                });
            }
            RoundMode::Unbounded => {
                tracing::warn!(
                    "no schedule of class {:?} within {} attempts, restart {}/{}",
                    target,
                    config.max_attempts,
                    restart + 1,
                    config.max_restarts
                );
            }
        }
    }

    Err(ScheduleError::SearchExhausted { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{OpKind, TxId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn always(class: Option<ScheduleClass>) -> ClassThresholds {
        match class {
            None => ClassThresholds::new(vec![]).unwrap(),
            Some(class) => ClassThresholds::new(vec![(class, 0.0)]).unwrap(),
        }
    }

    /// b1 -> b2: exactly one linear extension
    fn toy_space() -> SearchSpace {
        let b1 = StepKey::unscoped(OpKind::Begin, TxId::T1);
        let b2 = StepKey::unscoped(OpKind::Begin, TxId::T2);
        SearchSpace::new(&[b1, b2], &[PrecedenceEdge::new(b1, b2)]).unwrap()
    }

    fn toy_section() -> Section {
        Section {
            base: BaseValues::new(1, 1),
            target: None,
            schedule: "b1 b2".parse().unwrap(),
            solution: Classification::default(),
        }
    }

    #[test]
    fn test_threshold_selection() {
        let thresholds = ClassThresholds::default();
        assert_eq!(thresholds.select(0.0), None);
        assert_eq!(thresholds.select(19.9), None);
        assert_eq!(thresholds.select(20.0), Some(ScheduleClass::Consistent));
        assert_eq!(thresholds.select(45.0), Some(ScheduleClass::Legal));
        assert_eq!(thresholds.select(60.0), Some(ScheduleClass::Serializable));
        assert_eq!(
            thresholds.select(99.9),
            Some(ScheduleClass::ConflictSerializable)
        );
    }

    #[test]
    fn test_thresholds_must_ascend() {
        let result = ClassThresholds::new(vec![
            (ScheduleClass::Legal, 50.0),
            (ScheduleClass::Consistent, 10.0),
        ]);
        assert!(matches!(result, Err(ScheduleError::InvalidConfig(_))));

        let result = ClassThresholds::new(vec![(ScheduleClass::Legal, 120.0)]);
        assert!(matches!(result, Err(ScheduleError::InvalidConfig(_))));
    }

    #[test]
    fn test_draw_covers_classes() {
        let thresholds = ClassThresholds::default();
        let mut rng = StdRng::seed_from_u64(5);
        let drawn: HashSet<_> = (0..500).map(|_| thresholds.draw(&mut rng)).collect();
        assert_eq!(drawn.len(), 5);
    }

    #[test]
    fn test_round_mode_from_count() {
        assert_eq!(RoundMode::from_count(0), RoundMode::Unbounded);
        assert_eq!(RoundMode::from_count(10), RoundMode::Fixed(10));
    }

    #[test]
    fn test_generates_unconstrained_target() {
        let config = SearchConfig::default().with_thresholds(always(None));
        let mut rng = StdRng::seed_from_u64(9);

        let section = generate_section(&config, &[], &mut rng).unwrap();
        assert_eq!(section.target, None);
        assert!(section.matches_target());
        assert!(config.space.graph().is_linear_extension(
            &section.schedule.keys().collect::<Vec<_>>()
        ));
        assert!((1..=9).contains(&section.base.a));
        assert!((1..=9).contains(&section.base.b));
    }

    #[test]
    fn test_generates_consistent_target_with_lock_discipline() {
        // lock before access and unlock after write keep each transaction's
        // accesses inside its own lock; only the interleaving can break it
        let mut rules = default_rules();
        rules.push(PrecedenceRule::new(OpKind::Lock, OpKind::Read));
        rules.push(PrecedenceRule::new(OpKind::Write, OpKind::Unlock));
        let config = SearchConfig::default()
            .with_space(SearchSpace::from_rules(&rules).unwrap())
            .with_thresholds(always(Some(ScheduleClass::Consistent)))
            .with_max_attempts(200_000);

        let mut rng = StdRng::seed_from_u64(21);
        let section = generate_section(&config, &[], &mut rng).unwrap();
        assert_eq!(section.class(), Some(ScheduleClass::Consistent));
        assert!(section.solution.consistent);
        assert!(!section.solution.legal);
    }

    #[test]
    fn test_fixed_rounds_accept_last_candidate() {
        // consistency is out of reach without lock rules; a single attempt forces fallback
        let config = SearchConfig::default()
            .with_thresholds(always(Some(ScheduleClass::ConflictSerializable)))
            .with_max_attempts(1)
            .with_rounds(RoundMode::Fixed(3));
        let mut rng = StdRng::seed_from_u64(4);

        let section = generate_section(&config, &[], &mut rng).unwrap();
        assert_eq!(section.target, Some(ScheduleClass::ConflictSerializable));
        assert_eq!(section.schedule.len(), 24);
        assert_eq!(section.solution, classify(&section.schedule, section.base).unwrap());
    }

    #[test]
    fn test_unbounded_search_exhausts() {
        let config = SearchConfig::default()
            .with_space(toy_space())
            .with_rounds(RoundMode::Unbounded)
            .with_max_restarts(2);
        let mut rng = StdRng::seed_from_u64(0);

        let result = generate_section(&config, &[toy_section()], &mut rng);
        assert_eq!(
            result,
            Err(ScheduleError::SearchExhausted {
                attempts: 3 * DEFAULT_MAX_ATTEMPTS
            })
        );
    }

    #[test]
    fn test_history_is_never_repeated() {
        let config = SearchConfig::default().with_thresholds(always(None));
        let mut rng = StdRng::seed_from_u64(13);
        let mut history = Vec::new();

        for _ in 0..10 {
            let section = generate_section(&config, &history, &mut rng).unwrap();
            assert!(history
                .iter()
                .all(|s: &Section| s.schedule.tokens() != section.schedule.tokens()));
            history.push(section);
        }
    }

    #[test]
    fn test_fixed_rounds_never_fall_back_to_a_repeat() {
        // one order of all 24 steps; with operand 1 only the 4 operators vary
        let steps = step_set();
        let edges: Vec<_> = steps
            .windows(2)
            .map(|pair| PrecedenceEdge::new(pair[0], pair[1]))
            .collect();
        let space = SearchSpace::new(&steps, &edges).unwrap();

        let mut rng = StdRng::seed_from_u64(8);
        let sample = instantiate(&steps, &(1..=1), &mut rng).unwrap();
        let class = classify(&sample, BaseValues::new(1, 1)).unwrap().class();
        // consistency and legality do not depend on operators, so this target is never hit
        let target = match class {
            None => Some(ScheduleClass::ConflictSerializable),
            Some(_) => None,
        };

        let config = SearchConfig::default()
            .with_space(space)
            .with_thresholds(always(target))
            .with_operand_range(1..=1)
            .with_rounds(RoundMode::Fixed(17))
            .with_max_restarts(1);

        let mut history: Vec<Section> = Vec::new();
        for _ in 0..16 {
            let section = generate_section(&config, &history, &mut rng).unwrap();
            assert!(!section.matches_target());
            assert!(history
                .iter()
                .all(|s| s.schedule.tokens() != section.schedule.tokens()));
            history.push(section);
        }

        // all 16 sequences are used up
        assert_eq!(
            generate_section(&config, &history, &mut rng),
            Err(ScheduleError::SearchExhausted {
                attempts: 2 * DEFAULT_MAX_ATTEMPTS
            })
        );
    }

    #[test]
    fn test_fixed_base_values() {
        let config = SearchConfig::default()
            .with_thresholds(always(None))
            .with_fixed_base(Some(42), None);
        let mut rng = StdRng::seed_from_u64(2);

        let section = generate_section(&config, &[], &mut rng).unwrap();
        assert_eq!(section.base.a, 42);
        assert!((1..=9).contains(&section.base.b));
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        #[allow(clippy::reversed_empty_ranges)]
        let config = SearchConfig::default().with_value_range(9..=1);
        let result = generate_section(&config, &[], &mut StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(ScheduleError::InvalidConfig(_))));

        let config = SearchConfig::default().with_max_attempts(0);
        let result = generate_section(&config, &[], &mut StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(ScheduleError::InvalidConfig(_))));
    }

    #[test]
    fn test_cyclic_rules_rejected() {
        let rules = vec![
            PrecedenceRule::new(OpKind::Read, OpKind::Write),
            PrecedenceRule::new(OpKind::Write, OpKind::Read),
        ];
        assert!(matches!(
            SearchSpace::from_rules(&rules),
            Err(ScheduleError::CyclicConstraintSet(_))
        ));
    }

    #[test]
    fn test_section_serializes_flat() {
        let json = serde_json::to_value(toy_section()).unwrap();
        assert_eq!(json["a"], 1);
        assert_eq!(json["schedule"][1], "b2");
        assert_eq!(json["solution"]["consistent"], false);
    }
}
