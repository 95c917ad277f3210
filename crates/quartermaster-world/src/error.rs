//! Error types for the `quartermaster-world` crate.

use quartermaster_types::{BlockPos, MaterialId};

/// Errors that can occur during region and simulated-world operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorldError {
    /// A region's extent does not fit the coordinate range.
    #[error("region around {center} with radius {radius} overflows the coordinate range")]
    RegionOverflow {
        /// The requested center.
        center: BlockPos,
        /// The requested radius.
        radius: u32,
    },

    /// A block was placed where one already exists.
    #[error("position {0} is occupied")]
    Occupied(BlockPos),

    /// A container operation targeted a position without a container.
    #[error("no container at {0}")]
    NoContainer(BlockPos),

    /// The agent does not carry enough of an item.
    #[error("not enough {material}: wanted {wanted}, have {have}")]
    InsufficientItems {
        /// The item.
        material: MaterialId,
        /// Requested quantity.
        wanted: u64,
        /// Quantity actually held.
        have: u64,
    },
}
