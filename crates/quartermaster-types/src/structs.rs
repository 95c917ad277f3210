//! Core data structs shared across the workspace.

use serde::{Deserialize, Serialize};

use crate::material::MaterialId;

// ---------------------------------------------------------------------------
// BlockPos
// ---------------------------------------------------------------------------

/// An integer block coordinate in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    /// East-west axis.
    pub x: i32,
    /// Vertical axis.
    pub y: i32,
    /// North-south axis.
    pub z: i32,
}

impl BlockPos {
    /// Construct a position from its coordinates.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Offset this position, saturating at the coordinate limits.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }

    /// The position directly below.
    pub const fn down(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// The position directly above.
    pub const fn up(self) -> Self {
        self.offset(0, 1, 0)
    }

    /// Squared Euclidean distance to `other`.
    ///
    /// Computed in `i64` so no pair of `i32` coordinates can overflow.
    pub fn distance_sq(self, other: Self) -> i64 {
        let dx = i64::from(self.x).saturating_sub(i64::from(other.x));
        let dy = i64::from(self.y).saturating_sub(i64::from(other.y));
        let dz = i64::from(self.z).saturating_sub(i64::from(other.z));
        dx.saturating_mul(dx)
            .saturating_add(dy.saturating_mul(dy))
            .saturating_add(dz.saturating_mul(dz))
    }
}

impl core::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}, {}, {}", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Bill of materials
// ---------------------------------------------------------------------------

/// One line of an external bill of materials. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    /// The material type, as supplied by the producer.
    pub material: MaterialId,
    /// Total quantity the structure needs.
    pub total: u64,
    /// Quantity the producer reports as still missing from the build.
    /// Informational only; staging always works from `total`.
    pub missing: u64,
}

impl MaterialRequirement {
    /// A requirement with nothing reported missing.
    pub const fn new(material: MaterialId, total: u64) -> Self {
        Self {
            material,
            total,
            missing: total,
        }
    }
}

impl core::fmt::Display for MaterialRequirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} x{} (missing: {})", self.material, self.total, self.missing)
    }
}

/// The flat data a bill-of-materials producer hands to the staging core:
/// a name, an origin, and the requirement list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementInfo {
    /// Human-readable placement name.
    pub name: String,
    /// Build origin; storage is staged around it.
    pub origin: BlockPos,
    /// Required materials, possibly with duplicates before normalization.
    pub materials: Vec<MaterialRequirement>,
}

impl PlacementInfo {
    /// Number of requirement lines (before normalization).
    pub fn total_unique_items(&self) -> usize {
        self.materials.len()
    }

    /// Sum of all required quantities, saturating.
    pub fn total_item_count(&self) -> u64 {
        self.materials
            .iter()
            .fold(0_u64, |acc, m| acc.saturating_add(m.total))
    }
}

/// A material and a count, used in composite deposit requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemCount {
    /// The material.
    pub material: MaterialId,
    /// How many units.
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_sq_is_symmetric() {
        let a = BlockPos::new(1, 2, 3);
        let b = BlockPos::new(4, 6, 3);
        assert_eq!(a.distance_sq(b), 25);
        assert_eq!(b.distance_sq(a), 25);
    }

    #[test]
    fn distance_sq_survives_extreme_coordinates() {
        let a = BlockPos::new(i32::MIN, i32::MIN, i32::MIN);
        let b = BlockPos::new(i32::MAX, i32::MAX, i32::MAX);
        assert!(a.distance_sq(b) > 0);
    }

    #[test]
    fn offsets_and_neighbors() {
        let p = BlockPos::new(0, 64, 0);
        assert_eq!(p.down(), BlockPos::new(0, 63, 0));
        assert_eq!(p.up(), BlockPos::new(0, 65, 0));
        assert_eq!(p.offset(5, 0, -2), BlockPos::new(5, 64, -2));
    }

    #[test]
    fn placement_totals() {
        let info = PlacementInfo {
            name: "tower".to_owned(),
            origin: BlockPos::default(),
            materials: vec![
                MaterialRequirement::new(MaterialId::new("stone"), 200),
                MaterialRequirement::new(MaterialId::new("glass"), 30),
            ],
        };
        assert_eq!(info.total_unique_items(), 2);
        assert_eq!(info.total_item_count(), 230);
    }
}
