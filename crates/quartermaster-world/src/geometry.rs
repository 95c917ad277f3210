//! Block-space geometry helpers.

use serde::{Deserialize, Serialize};

use quartermaster_types::BlockPos;

use crate::error::WorldError;

/// An axis-aligned box of block positions, inclusive on both corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cuboid {
    /// Minimum corner.
    pub min: BlockPos,
    /// Maximum corner.
    pub max: BlockPos,
}

impl Cuboid {
    /// The cube of half-width `radius` centered on `center`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RegionOverflow`] if either corner leaves the
    /// `i32` coordinate range.
    pub fn around(center: BlockPos, radius: u32) -> Result<Self, WorldError> {
        let overflow = || WorldError::RegionOverflow { center, radius };
        let r = i32::try_from(radius).map_err(|_| overflow())?;
        let corner = |sign: i32| -> Option<BlockPos> {
            let d = r.checked_mul(sign)?;
            Some(BlockPos::new(
                center.x.checked_add(d)?,
                center.y.checked_add(d)?,
                center.z.checked_add(d)?,
            ))
        };
        Ok(Self {
            min: corner(-1).ok_or_else(overflow)?,
            max: corner(1).ok_or_else(overflow)?,
        })
    }

    /// Whether `pos` lies inside the box.
    pub const fn contains(&self, pos: BlockPos) -> bool {
        pos.x >= self.min.x
            && pos.x <= self.max.x
            && pos.y >= self.min.y
            && pos.y <= self.max.y
            && pos.z >= self.min.z
            && pos.z <= self.max.z
    }

    /// Every position in the box, x fastest, then z, then y.
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + '_ {
        (self.min.y..=self.max.y).flat_map(move |y| {
            (self.min.z..=self.max.z)
                .flat_map(move |z| (self.min.x..=self.max.x).map(move |x| BlockPos::new(x, y, z)))
        })
    }
}

/// The four horizontal cardinal offsets at `distance`: east, west, south,
/// north.
pub const fn cardinal_offsets(distance: i32) -> [(i32, i32); 4] {
    [
        (distance, 0),
        (distance.saturating_neg(), 0),
        (0, distance),
        (0, distance.saturating_neg()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_around_origin() {
        let cube = Cuboid::around(BlockPos::new(0, 64, 0), 2).ok();
        let cube = cube.as_ref();
        assert_eq!(cube.map(|c| c.min), Some(BlockPos::new(-2, 62, -2)));
        assert_eq!(cube.map(|c| c.positions().count()), Some(125));
    }

    #[test]
    fn contains_is_inclusive() {
        let Ok(cube) = Cuboid::around(BlockPos::default(), 1) else {
            panic!("small cube must fit");
        };
        assert!(cube.contains(BlockPos::new(1, -1, 1)));
        assert!(!cube.contains(BlockPos::new(2, 0, 0)));
    }

    #[test]
    fn overflowing_region_is_rejected() {
        let err = Cuboid::around(BlockPos::new(i32::MAX, 0, 0), 1);
        assert!(matches!(err, Err(WorldError::RegionOverflow { .. })));
    }

    #[test]
    fn cardinals_cover_four_directions() {
        assert_eq!(cardinal_offsets(3), [(3, 0), (-3, 0), (0, 3), (0, -3)]);
    }
}
