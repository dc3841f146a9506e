//! Classify a given schedule

use clap::Args;
use tps_scheduler::{classify, BaseValues, Schedule};

use super::verdict_text;
use crate::{output::Output, table::ValueTrace, CliError};

/// Arguments of `tps classify`
#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Step tokens, e.g. b1 l1A r1A o1A+3 w1A u1A c1 ...
    #[arg(required = true, num_args = 1..)]
    pub tokens: Vec<String>,
    /// Initial value of A
    #[arg(long)]
    pub a: i64,
    /// Initial value of B
    #[arg(long)]
    pub b: i64,
    /// Also print the value-trace table
    #[arg(long)]
    pub trace: bool,
}

impl ClassifyArgs {
    pub fn execute(self, json: bool) -> Result<(), CliError> {
        let schedule: Schedule = self.tokens.join(" ").parse()?;
        let base = BaseValues::new(self.a, self.b);
        let solution = classify(&schedule, base)?;

        let mut message = verdict_text(&solution);
        if self.trace {
            message = format!("{}\n{}", ValueTrace::new(&schedule, base), message);
        }

        let mut output = Output::new(json)
            .field("schedule", &schedule.to_string())
            .field_value("verdict", serde_json::to_value(solution)?)
            .field_value("class", serde_json::to_value(solution.class())?)
            .message(&message);
        if self.trace {
            output = output.field_value(
                "trace",
                serde_json::to_value(ValueTrace::new(&schedule, base))?,
            );
        }
        output.print();

        Ok(())
    }
}
