//! CLI error types

use thiserror::Error;
use tps_scheduler::ScheduleError;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    /// Schedule generation or classification failed
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file could not be parsed
    #[error("Config error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_error_converts() {
        let err: CliError = ScheduleError::SearchExhausted { attempts: 10 }.into();
        assert!(matches!(err, CliError::Schedule(_)));
        assert!(err.to_string().contains("exhausted"));
    }
}
