//! Generate exercises with their solutions

use clap::Args;
use rand::Rng;
use tps_scheduler::{RoundMode, Section};

use super::{next_section, section_text, verdict_text};
use crate::{config::Config, output::Output, table::ValueTrace, CliError};

/// Arguments of `tps generate`
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Number of sections (default: exercise list length or configured rounds, 1 if unbounded)
    #[arg(long)]
    pub rounds: Option<usize>,
}

impl GenerateArgs {
    pub fn execute<R: Rng + ?Sized>(
        self,
        config: &Config,
        rng: &mut R,
        json: bool,
    ) -> Result<(), CliError> {
        let count = match config.round_count(self.rounds) {
            0 => 1,
            n => n,
        };
        let sections = generate(config, count, rng)?;

        let traces: Vec<ValueTrace> = sections
            .iter()
            .map(|s| ValueTrace::new(&s.schedule, s.base))
            .collect();
        let message = sections
            .iter()
            .enumerate()
            .map(|(i, section)| {
                format!(
                    "{}\nSolution:\n{}\n",
                    section_text(i + 1, section),
                    verdict_text(&section.solution)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        Output::new(json)
            .field_value("sections", serde_json::to_value(&sections)?)
            .field_value("traces", serde_json::to_value(&traces)?)
            .message(message.trim_end())
            .print();

        Ok(())
    }
}

/// Generate `count` sections, each distinct from the ones before it
pub fn generate<R: Rng + ?Sized>(
    config: &Config,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Section>, CliError> {
    let mut sections = Vec::with_capacity(count);
    for _ in 0..count {
        let section = next_section(config, RoundMode::Fixed(count), &sections, rng)?;
        sections.push(section);
    }
    Ok(sections)
}
