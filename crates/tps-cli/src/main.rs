//! # tps-cli
//!
//! Command-line trainer for two-phase locking schedules.
//!
//! ## Usage
//!
//! ```bash
//! # Generate exercises with solutions
//! tps generate --rounds 3
//!
//! # Classify a schedule
//! tps classify b1 b2 l1A r1A o1A+3 w1A u1A ... --a 4 --b 5
//!
//! # Interactive training
//! tps train --rounds 5
//!
//! # Configuration
//! tps config --show
//! tps config --set-rounds 0 --set-feedback false
//! ```
//!
//! The default precedence rules do not order locks before accesses, so nearly
//! every generated schedule is inconsistent. Add `"lr"` (lock before read) and
//! `"wu"` (write before unlock) to `rules` in the config file for a mix of
//! classes. A `[[exercises]]` list in the config fixes the schedule, base
//! values, rules or thresholds of individual rounds.

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod error;
mod output;
mod session;
mod table;

pub use config::Config;
pub use error::CliError;
pub use output::Output;

const RULES_HINT: &str = "With the default rules almost every schedule is inconsistent. \
Add \"lr\" and \"wu\" to `rules` in the config file to get consistent, legal and \
serializable exercises as well.";

/// 2PL schedule trainer
#[derive(Parser, Debug)]
#[command(name = "tps")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: ~/.tps-trainer/config.toml)
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// Seed for reproducible exercises
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// CLI commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate exercises and print them with their solutions
    #[command(after_help = RULES_HINT)]
    Generate(commands::generate::GenerateArgs),
    /// Classify a schedule given as step tokens
    Classify(commands::classify::ClassifyArgs),
    /// Answer generated exercises interactively
    #[command(after_help = RULES_HINT)]
    Train(commands::train::TrainArgs),
    /// Show or edit configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Set rounds per session (0 = unbounded)
        #[arg(long)]
        set_rounds: Option<usize>,
        /// Show solutions after answering
        #[arg(long)]
        set_feedback: Option<bool>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli.command, cli.config_file, cli.seed, cli.json) {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({
                    "error": e.to_string(),
                    "success": false
                })
            );
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn run(
    command: Commands,
    config_path: Option<PathBuf>,
    seed: Option<u64>,
    json: bool,
) -> Result<(), CliError> {
    let mut config = match &config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    tracing::debug!("seed: {:?}", seed);

    match command {
        Commands::Generate(args) => args.execute(&config, &mut rng, json),
        Commands::Classify(args) => args.execute(json),
        Commands::Train(args) => args.execute(&config, &mut rng, json),
        Commands::Config {
            show,
            set_rounds,
            set_feedback,
        } => handle_config(
            &mut config,
            config_path.as_deref(),
            show,
            set_rounds,
            set_feedback,
            json,
        ),
    }
}

fn handle_config(
    config: &mut Config,
    path: Option<&std::path::Path>,
    show: bool,
    set_rounds: Option<usize>,
    set_feedback: Option<bool>,
    json: bool,
) -> Result<(), CliError> {
    let mut modified = false;

    if let Some(rounds) = set_rounds {
        config.rounds = rounds;
        modified = true;
    }

    if let Some(feedback) = set_feedback {
        config.feedback = feedback;
        modified = true;
    }

    if modified {
        // Validate before writing
        config.search_config()?;
        let path = config.save(path)?;
        Output::new(json)
            .field("status", "saved")
            .field("path", &path.display().to_string())
            .message(&format!("Configuration saved to {}", path.display()))
            .print();
    } else if show {
        let rendered =
            toml::to_string_pretty(config).map_err(|e| CliError::Config(e.to_string()))?;
        Output::new(json)
            .field_u64("rounds", config.rounds as u64)
            .field_bool("feedback", config.feedback)
            .field_value("config", serde_json::to_value(&*config)?)
            .message(rendered.trim_end())
            .print();
    } else {
        Output::new(json)
            .message("Use --show to display config, or --set-rounds/--set-feedback to modify")
            .print();
    }

    Ok(())
}
