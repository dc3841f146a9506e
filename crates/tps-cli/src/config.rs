//! Trainer configuration management

use crate::error::CliError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tps_scheduler::{
    ClassThresholds, PrecedenceRule, RoundMode, ScheduleClass, SearchConfig, SearchSpace,
};

/// Percentile at which each target class starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Consistent (below: none of the above)
    pub consistent: f64,
    /// Legal
    pub legal: f64,
    /// View serializable
    pub serializable: f64,
    /// Conflict serializable
    pub conflict_serializable: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            consistent: 20.0,
            legal: 40.0,
            serializable: 60.0,
            conflict_serializable: 80.0,
        }
    }
}

/// Trainer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Rounds per session (0 = unbounded)
    #[serde(default = "default_rounds")]
    pub rounds: usize,
    /// Show the solution after every answer
    #[serde(default = "default_feedback")]
    pub feedback: bool,
    /// Inclusive range of the base values of A and B
    #[serde(default = "default_range")]
    pub value_range: [i64; 2],
    /// Inclusive range of compute operands
    #[serde(default = "default_range")]
    pub operand_range: [i64; 2],
    /// Precedence rules as two-letter operation codes, e.g. "bl" for begin before lock
    #[serde(default = "default_rules")]
    pub rules: Vec<String>,
    /// Target class thresholds
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Fixed exercise list; entry i configures round i
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exercises: Vec<Exercise>,
}

/// One configured round; unset fields fall back to the top-level settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    /// Fixed schedule as step tokens; classified instead of generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<String>,
    /// Initial value of A
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<i64>,
    /// Initial value of B
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<i64>,
    /// Precedence rules for this round
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<String>>,
    /// Target class thresholds for this round
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Thresholds>,
}

fn default_rounds() -> usize {
    10
}

fn default_feedback() -> bool {
    true
}

fn default_range() -> [i64; 2] {
    [1, 9]
}

fn default_rules() -> Vec<String> {
    ["bl", "bu", "br", "ro", "ow", "wc", "lc", "uc"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            feedback: default_feedback(),
            value_range: default_range(),
            operand_range: default_range(),
            rules: default_rules(),
            thresholds: Thresholds::default(),
            exercises: Vec::new(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".tps-trainer"))
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Load config from the default location or return default
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_or_default(&path),
            None => Self::default(),
        }
    }

    /// Load config from `path`, logging and falling back to the default on error
    pub fn load_or_default(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            tracing::warn!("ignoring config {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Load config from an explicit file; a missing file yields the default
    pub fn load_from(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save config to `path`, or to the default location
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, CliError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()
                .ok_or_else(|| CliError::Config("Cannot determine config path".to_string()))?,
        };

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| CliError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Rounds of a run: an explicit count, else the exercise list length, else `rounds`
    pub fn round_count(&self, explicit: Option<usize>) -> usize {
        match explicit {
            Some(count) => count,
            None if !self.exercises.is_empty() => self.exercises.len(),
            None => self.rounds,
        }
    }

    /// Configured exercise of round `index` (0-based)
    pub fn exercise(&self, index: usize) -> Option<&Exercise> {
        self.exercises.get(index)
    }

    /// Build the search configuration for the schedule generator
    pub fn search_config(&self) -> Result<SearchConfig, CliError> {
        self.search_config_for(None)
    }

    /// Build the search configuration with an exercise's overrides applied
    pub fn search_config_for(
        &self,
        exercise: Option<&Exercise>,
    ) -> Result<SearchConfig, CliError> {
        let rules = exercise
            .and_then(|e| e.rules.as_deref())
            .unwrap_or(self.rules.as_slice());
        let thresholds = exercise
            .and_then(|e| e.thresholds)
            .unwrap_or(self.thresholds);

        let space = SearchSpace::from_rules(&parse_rules(rules)?)?;
        let thresholds = ClassThresholds::new(vec![
            (ScheduleClass::Consistent, thresholds.consistent),
            (ScheduleClass::Legal, thresholds.legal),
            (ScheduleClass::Serializable, thresholds.serializable),
            (
                ScheduleClass::ConflictSerializable,
                thresholds.conflict_serializable,
            ),
        ])?;

        let config = SearchConfig::default()
            .with_space(space)
            .with_thresholds(thresholds)
            .with_value_range(self.value_range[0]..=self.value_range[1])
            .with_operand_range(self.operand_range[0]..=self.operand_range[1])
            .with_fixed_base(exercise.and_then(|e| e.a), exercise.and_then(|e| e.b))
            .with_rounds(RoundMode::from_count(self.round_count(None)));
        config.validate()?;
        Ok(config)
    }
}

/// Parse two-letter operation code pairs such as "bl"
fn parse_rules(codes: &[String]) -> Result<Vec<PrecedenceRule>, CliError> {
    codes
        .iter()
        .map(|code| {
            let mut chars = code.chars();
            match (chars.next(), chars.next(), chars.next()) {
                (Some(before), Some(after), None) => {
                    Ok(PrecedenceRule::from_codes(before, after)?)
                }
                _ => Err(CliError::Config(format!(
                    "rule {code:?} must be two operation codes"
                ))),
            }
        })
        .collect()
}
