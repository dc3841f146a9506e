//! CLI command implementations

pub mod classify;
pub mod generate;
pub mod train;

use crate::{config::Config, table::ValueTrace, CliError};
use rand::Rng;
use tps_scheduler::{
    classify, generate_section, BaseValues, Classification, RoundMode, Schedule, ScheduleClass,
    Section,
};

/// Produce the section of the next round
///
/// Round i uses the i-th configured exercise if there is one: a fixed
/// schedule is classified as given, anything else is generated with the
/// exercise's overrides. Rounds past the list use the top-level settings.
pub(crate) fn next_section<R: Rng + ?Sized>(
    config: &Config,
    rounds: RoundMode,
    history: &[Section],
    rng: &mut R,
) -> Result<Section, CliError> {
    let exercise = config.exercise(history.len());
    let search = config.search_config_for(exercise)?.with_rounds(rounds);

    let Some(steps) = exercise.and_then(|e| e.steps.as_deref()) else {
        return Ok(generate_section(&search, history, rng)?);
    };

    let schedule: Schedule = steps.parse()?;
    let base = BaseValues::new(
        search
            .fixed_a
            .unwrap_or_else(|| rng.gen_range(search.value_range.clone())),
        search
            .fixed_b
            .unwrap_or_else(|| rng.gen_range(search.value_range.clone())),
    );
    let solution = classify(&schedule, base)?;
    tracing::debug!("round {} uses a fixed schedule", history.len() + 1);

    Ok(Section {
        base,
        target: solution.class(),
        schedule,
        solution,
    })
}

/// Question asked for each predicate, in inclusion order
pub(crate) fn question(class: ScheduleClass) -> &'static str {
    match class {
        ScheduleClass::Consistent => "Is the schedule consistent",
        ScheduleClass::Legal => "Is the schedule legal",
        ScheduleClass::Serializable => "Is the schedule serializable",
        ScheduleClass::ConflictSerializable => "Is the schedule conflict serializable",
    }
}

/// One line per predicate plus the resulting class
pub(crate) fn verdict_text(solution: &Classification) -> String {
    let mut lines: Vec<String> = ScheduleClass::ALL
        .into_iter()
        .zip(solution.as_array())
        .map(|(class, holds)| {
            format!("  {:<22} {}", class.name(), if holds { "yes" } else { "no" })
        })
        .collect();
    let class = solution.class().map_or("none", ScheduleClass::name);
    lines.push(format!("  class: {class}"));
    lines.join("\n")
}

/// Header and value-trace table of a section
pub(crate) fn section_text(number: usize, section: &Section) -> String {
    format!(
        "Section {number}: A = {}, B = {}\n\n{}",
        section.base.a,
        section.base.b,
        ValueTrace::new(&section.schedule, section.base)
    )
}
