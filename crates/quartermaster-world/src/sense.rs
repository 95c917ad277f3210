//! Read-only sensing interfaces consumed by the staging core.
//!
//! Both traits are object-safe; the core holds them as `&dyn` for the
//! duration of one tick and never caches their answers across ticks.

use std::collections::BTreeMap;

use quartermaster_types::{BlockPos, MaterialId, items};

use crate::geometry::Cuboid;

/// The agent's own state: inventory, equipment, vitals and position.
pub trait InventoryView {
    /// Units of `item` currently carried.
    fn carried_count(&self, item: &MaterialId) -> u64;

    /// Whether at least one `item` is carried.
    fn has_item(&self, item: &MaterialId) -> bool {
        self.carried_count(item) > 0
    }

    /// Whether `item` is worn or held in the off-hand.
    fn is_equipped(&self, item: &MaterialId) -> bool;

    /// Total food value carried.
    fn food_score(&self) -> u32;

    /// Current health, in half-hearts (0 to 20).
    fn health(&self) -> u32;

    /// The agent's block position.
    fn position(&self) -> BlockPos;
}

/// Block and entity queries over the world around the agent.
pub trait WorldView {
    /// The block at `pos`, or `None` for air.
    fn block_at(&self, pos: BlockPos) -> Option<MaterialId>;

    /// Whether the block at `pos` is a storage container.
    fn is_container(&self, pos: BlockPos) -> bool {
        self.block_at(pos).is_some_and(|b| is_storage_block(&b))
    }

    /// Contents of the container at `pos`, or `None` if there is none.
    fn container_contents(&self, pos: BlockPos) -> Option<BTreeMap<MaterialId, u64>>;

    /// Every storage container inside `region`.
    fn containers_in(&self, region: &Cuboid) -> Vec<BlockPos>;

    /// Whether a block could be placed at `pos` (the space is free).
    fn can_place(&self, pos: BlockPos) -> bool;

    /// Whether the block at `pos` can support another block on top.
    fn is_solid(&self, pos: BlockPos) -> bool;

    /// Whether `pos` holds a fluid.
    fn is_liquid(&self, pos: BlockPos) -> bool;

    /// The nearest `block` within `max_distance` of `from`.
    fn nearest_block(&self, from: BlockPos, block: &MaterialId, max_distance: u32)
    -> Option<BlockPos>;

    /// Hostile entities within `radius` of `center`.
    fn hostile_count(&self, center: BlockPos, radius: u32) -> u32;
}

/// Whether `block` counts as a storage container.
pub fn is_storage_block(block: &MaterialId) -> bool {
    let id = block.as_str();
    id == items::CHEST || id == items::TRAPPED_CHEST
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chests_are_storage() {
        assert!(is_storage_block(&MaterialId::new("chest")));
        assert!(is_storage_block(&MaterialId::new("trapped_chest")));
        assert!(!is_storage_block(&MaterialId::new("barrel")));
    }
}
