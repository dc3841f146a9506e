//! Training session and scoring

use crate::error::CliError;
use serde::Serialize;
use tps_scheduler::Section;

/// One exercise and the trainee's answer to it
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Round {
    /// Generated exercise
    pub section: Section,
    /// Answers in inclusion order, once submitted
    pub answer: Option<[bool; 4]>,
    /// Number of answers matching the solution
    pub points: u8,
    /// Whether all four answers match
    pub correct: bool,
}

impl Round {
    fn new(section: Section) -> Self {
        Self {
            section,
            answer: None,
            points: 0,
            correct: false,
        }
    }

    /// Per-predicate match of answer against solution
    pub fn matches(&self) -> Option<[bool; 4]> {
        let solution = self.section.solution.as_array();
        self.answer
            .map(|answer| std::array::from_fn(|i| answer[i] == solution[i]))
    }
}

/// Final tally
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Score {
    /// Rounds with an answer
    pub answered: usize,
    /// Rounds with all four answers right
    pub correct: usize,
    /// Matching answers over all rounds
    pub points: usize,
    /// Points available over answered rounds
    pub max_points: usize,
}

/// Sequence of rounds in one training run
#[derive(Clone, Debug, Default, Serialize)]
pub struct Session {
    rounds: Vec<Round>,
}

impl Session {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a round with a new section
    pub fn push(&mut self, section: Section) -> &Round {
        self.rounds.push(Round::new(section));
        &self.rounds[self.rounds.len() - 1]
    }

    /// Score the answer to the latest round
    pub fn submit(&mut self, answer: [bool; 4]) -> Result<&Round, CliError> {
        let round = self
            .rounds
            .last_mut()
            .ok_or_else(|| CliError::InvalidInput("no round to answer".to_string()))?;
        if round.answer.is_some() {
            return Err(CliError::InvalidInput(
                "round already answered".to_string(),
            ));
        }

        round.answer = Some(answer);
        let matches = round.matches().unwrap_or_default();
        round.points = matches.iter().filter(|m| **m).count() as u8;
        round.correct = matches.iter().all(|m| *m);

        tracing::debug!(
            "round {} scored {}/4",
            self.rounds.len(),
            self.rounds[self.rounds.len() - 1].points
        );
        Ok(&self.rounds[self.rounds.len() - 1])
    }

    /// Sections generated so far
    pub fn history(&self) -> Vec<Section> {
        self.rounds.iter().map(|r| r.section.clone()).collect()
    }

    /// All rounds
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// Tally over answered rounds
    pub fn score(&self) -> Score {
        self.rounds
            .iter()
            .filter(|r| r.answer.is_some())
            .fold(Score::default(), |score, round| Score {
                answered: score.answered + 1,
                correct: score.correct + usize::from(round.correct),
                points: score.points + usize::from(round.points),
                max_points: score.max_points + 4,
            })
    }
}
