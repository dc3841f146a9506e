//! Interactive trainer

use clap::Args;
use rand::Rng;
use std::io::{BufRead, Write};
use tps_scheduler::{RoundMode, ScheduleClass, Section};

use super::{next_section, question, section_text, verdict_text};
use crate::{
    config::Config,
    output::Output,
    session::{Round, Session},
    CliError,
};

/// Arguments of `tps train`
#[derive(Debug, Args)]
pub struct TrainArgs {
    /// Number of rounds, 0 for unbounded (default: exercise list length or configured rounds)
    #[arg(long)]
    pub rounds: Option<usize>,
    /// Hide the solution after each answer
    #[arg(long)]
    pub no_feedback: bool,
}

impl TrainArgs {
    pub fn execute<R: Rng + ?Sized>(
        self,
        config: &Config,
        rng: &mut R,
        json: bool,
    ) -> Result<(), CliError> {
        let rounds = RoundMode::from_count(config.round_count(self.rounds));
        // fail on a bad config before the first prompt
        config.search_config()?;
        let feedback = config.feedback && !self.no_feedback;

        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let session = run(
            |history| next_section(config, rounds, history, &mut *rng),
            rounds,
            feedback,
            stdin.lock(),
            stdout.lock(),
        )?;

        let score = session.score();
        Output::new(json)
            .field_value("score", serde_json::to_value(score)?)
            .field_value("rounds", serde_json::to_value(session.rounds())?)
            .message(&format!(
                "{}/{} rounds correct, {}/{} points",
                score.correct, score.answered, score.points, score.max_points
            ))
            .print();

        Ok(())
    }
}

/// Parse a yes/no answer
pub fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "1" | "true" => Some(true),
        "n" | "no" | "0" | "false" => Some(false),
        _ => None,
    }
}

/// Ask one question until answered; `None` on end of input or quit
fn ask<I: BufRead, O: Write>(
    input: &mut I,
    output: &mut O,
    question: &str,
) -> Result<Option<bool>, CliError> {
    loop {
        write!(output, "{question}? [y/n/q] ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if matches!(line.trim(), "q" | "quit") {
            return Ok(None);
        }
        match parse_answer(&line) {
            Some(answer) => return Ok(Some(answer)),
            None => writeln!(output, "Please answer y or n (q to quit)")?,
        }
    }
}

fn report<O: Write>(output: &mut O, round: &Round, feedback: bool) -> Result<(), CliError> {
    let verdict = if round.correct { "correct" } else { "wrong" };
    writeln!(output, "{verdict}: {}/4 points", round.points)?;
    if feedback {
        writeln!(output, "Solution:\n{}", verdict_text(&round.section.solution))?;
    }
    Ok(())
}

/// Run a training session over `input` and `output`
///
/// `next` produces each round's section from the sections shown so far.
/// Stops after the given number of rounds, or in unbounded mode when input
/// ends or the trainee quits.
pub fn run<F, I, O>(
    mut next: F,
    rounds: RoundMode,
    feedback: bool,
    mut input: I,
    mut output: O,
) -> Result<Session, CliError>
where
    F: FnMut(&[Section]) -> Result<Section, CliError>,
    I: BufRead,
    O: Write,
{
    let mut session = Session::new();

    loop {
        let number = session.rounds().len() + 1;
        if let RoundMode::Fixed(limit) = rounds {
            if number > limit {
                break;
            }
        }

        let section = next(&session.history())?;
        writeln!(output, "\n{}", section_text(number, &section))?;
        session.push(section);

        let mut answer = [false; 4];
        let mut quit = false;
        for (slot, class) in answer.iter_mut().zip(ScheduleClass::ALL) {
            match ask(&mut input, &mut output, question(class))? {
                Some(value) => *slot = value,
                None => {
                    quit = true;
                    break;
                }
            }
        }
        if quit {
            tracing::info!("training stopped after {} rounds", number - 1);
            break;
        }

        let round = session.submit(answer)?;
        report(&mut output, round, feedback)?;
    }

    let score = session.score();
    writeln!(
        output,
        "\nScore: {}/{} rounds correct",
        score.correct, score.answered
    )?;
    Ok(session)
}
