//! # tps-scheduler
//!
//! Schedule generation and classification for two transactions under
//! simplified two-phase locking.
//!
//! Features:
//! - Operation vocabulary and step tokens
//! - Precedence rule expansion and DAG construction
//! - Randomized topological sequencing
//! - Consistency, legality, view and conflict serializability checks
//! - Bounded rejection-sampling search for a target class

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classifier;
pub mod constraint;
pub mod error;
pub mod graph;
pub mod operation;
pub mod search;
pub mod sequencer;

pub use classifier::{classify, BaseValues, Classification, ScheduleClass};
pub use constraint::{default_rules, expand, PrecedenceEdge, PrecedenceRule};
pub use error::{ScheduleError, ScheduleResult};
pub use graph::PrecedenceGraph;
pub use operation::{step_set, Attribute, Compute, OpKind, Operator, Schedule, Step, StepKey, TxId};
pub use search::{
    generate_section, ClassThresholds, RoundMode, SearchConfig, SearchSpace, Section,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_RESTARTS,
};
pub use sequencer::{instantiate, sequence};
