//! Staging state machine, planners and configuration for the Quartermaster
//! staging agent.
//!
//! The [`StagingTask`] is polled once per tick by an external task engine.
//! It reads the world and inventory through the sensing traits of
//! `quartermaster-world`, keeps its books in a `quartermaster-ledger`
//! ledger, and asks the engine for work by returning sub-tasks.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `quartermaster-config.yaml`
//!   into strongly-typed structs.
//! - [`timer`] -- Tick-based cooldowns.
//! - [`task`] -- The [`Task`] seam and the [`Behaviour`] stack.
//! - [`capacity`] -- How many containers a ledger needs.
//! - [`planner`] -- The basic preparation planner.
//! - [`ladder`] -- The tiered equipment ladder.
//! - [`guard`] -- Danger assessment and retreat.
//! - [`progress`] -- Periodic progress logging.
//! - [`source`] -- Where the bill of materials comes from.
//! - [`staging`] -- The [`StagingTask`] state machine.

pub mod capacity;
pub mod config;
pub mod guard;
pub mod ladder;
pub mod planner;
pub mod progress;
pub mod source;
pub mod staging;
pub mod task;
pub mod timer;

// Re-export primary types at crate root.
pub use config::{ConfigError, StagingConfig};
pub use guard::EnvironmentalGuard;
pub use ladder::{EquipmentLadder, ToolRequirement};
pub use planner::{Preparation, PreparationPlanner};
pub use progress::ProgressReporter;
pub use source::{MaterialListFile, MaterialSource, ReadThrough, SourceError, StaticSource};
pub use staging::{StagingReport, StagingTask};
pub use task::{Behaviour, BehaviourStack, Task, TickContext};
pub use timer::Cooldown;
