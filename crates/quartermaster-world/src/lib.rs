//! World sensing, storage site search, and a simulated world for the
//! Quartermaster staging agent.
//!
//! The staging core never touches the game directly. It reads the world and
//! the agent's inventory through the [`WorldView`] and [`InventoryView`]
//! traits and asks for changes by returning sub-tasks. This crate defines
//! those traits, the storage search built on them, and [`SimWorld`] /
//! [`SimInventory`], in-memory implementations used by tests and the demo
//! engine.
//!
//! # Modules
//!
//! - [`error`] -- Error types for region and simulated-world operations.
//! - [`geometry`] -- [`Cuboid`] regions and cardinal offsets.
//! - [`sense`] -- The read-only sensing traits.
//! - [`storage`] -- Container scanning, the active [`StorageSet`], and the
//!   placement-site search.
//! - [`sim`] -- In-memory world and inventory.

pub mod error;
pub mod geometry;
pub mod sense;
pub mod sim;
pub mod storage;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use geometry::Cuboid;
pub use sense::{InventoryView, WorldView};
pub use sim::{SimInventory, SimWorld};
pub use storage::{Rejection, SitePolicy, StorageSet, find_placement_site, scan_nearby};
