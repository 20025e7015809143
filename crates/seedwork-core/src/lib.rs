//! Core contracts for seedwork.
//!
//! Entity records and their persisted shapes, the generation config, the
//! stage pipeline and graph utilities shared by the generator, the evaluator
//! and the CLI.

pub mod batch;
pub mod config;
pub mod entities;
pub mod error;
pub mod graph;
pub mod record;
pub mod stage;

pub use batch::Batch;
pub use config::{DEFAULT_DAY_WEIGHTS, GenerationConfig, MAX_HISTORY_MONTHS, RateRange};
pub use entities::{
    BoardTemplate, Department, MembershipRole, Organization, Priority, Project, ProjectType, Section, Task,
    TaskDependency, TaskProject, Team, TeamMembership, User, WorkflowType,
};
pub use error::{Error, Result};
pub use graph::{DependencyGraph, find_cycles, toposort};
pub use record::{DATE_FORMAT, Record, Scalar, TIMESTAMP_FORMAT, ToRecord, to_records};
pub use stage::{Stage, stage_order};

/// Contract version recorded in run artifacts.
pub const FORMAT_VERSION: &str = "0.1";
