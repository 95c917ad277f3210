//! Shared type definitions for the Quartermaster resource-staging agent.
//!
//! This crate is the single source of truth for the vocabulary shared by the
//! ledger, world, core, and engine crates. It has no behavior beyond pure
//! lookups: every type here is plain data.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for staging runs
//! - [`enums`] -- Phases, material categories, tool tiers, sub-task status
//! - [`material`] -- [`MaterialId`] and the static material catalog
//!   (stack limits, categories, tool and armor item names)
//! - [`structs`] -- Block positions, requirements, placement info
//! - [`subtask`] -- The [`SubTask`] request vocabulary handed to the
//!   external task engine

pub mod enums;
pub mod ids;
pub mod material;
pub mod structs;
pub mod subtask;

// Re-export all public types at crate root for convenience.
pub use enums::{AbortReason, ArmorSlot, MaterialCategory, StagePhase, SubTaskStatus, Tier, ToolKind};
pub use ids::StagingRunId;
pub use material::{MaterialId, items};
pub use structs::{BlockPos, ItemCount, MaterialRequirement, PlacementInfo};
pub use subtask::SubTask;
