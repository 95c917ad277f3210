//! In-memory world and inventory.
//!
//! [`SimWorld`] is a flat world: every position at or below `ground_y` is
//! ground unless overridden, everything above is air unless overridden.
//! Containers keep their contents alongside the block map. [`SimInventory`]
//! is a bag of item counts with an equipped set and simple vitals.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use quartermaster_types::{BlockPos, MaterialId, items};

use crate::error::WorldError;
use crate::geometry::Cuboid;
use crate::sense::{InventoryView, WorldView, is_storage_block};

/// Maximum health in half-hearts.
pub const MAX_HEALTH: u32 = 20;

const FLUIDS: &[&str] = &["minecraft:water", "minecraft:lava"];

fn is_fluid(block: &MaterialId) -> bool {
    FLUIDS.contains(&block.as_str())
}

// ---------------------------------------------------------------------------
// SimWorld
// ---------------------------------------------------------------------------

/// A flat in-memory world with block overrides, containers and hostiles.
#[derive(Debug, Clone)]
pub struct SimWorld {
    ground_y: i32,
    ground_block: MaterialId,
    /// `None` marks a dug-out ground position.
    overrides: BTreeMap<BlockPos, Option<MaterialId>>,
    containers: BTreeMap<BlockPos, BTreeMap<MaterialId, u64>>,
    hostiles: Vec<BlockPos>,
}

impl SimWorld {
    /// A world of grass-topped ground up to and including `ground_y`.
    pub fn flat(ground_y: i32) -> Self {
        Self {
            ground_y,
            ground_block: MaterialId::new("grass_block"),
            overrides: BTreeMap::new(),
            containers: BTreeMap::new(),
            hostiles: Vec::new(),
        }
    }

    /// The ground level.
    pub const fn ground_y(&self) -> i32 {
        self.ground_y
    }

    /// Put `block` at `pos`, replacing whatever was there.
    pub fn set_block(&mut self, pos: BlockPos, block: MaterialId) {
        if is_storage_block(&block) {
            self.containers.entry(pos).or_default();
        } else {
            self.containers.remove(&pos);
        }
        self.overrides.insert(pos, Some(block));
    }

    /// Clear `pos` to air and return what was there. Container contents are
    /// lost with the container.
    pub fn remove_block(&mut self, pos: BlockPos) -> Option<MaterialId> {
        let previous = self.block_at(pos);
        self.containers.remove(&pos);
        self.overrides.insert(pos, None);
        previous
    }

    /// Place `block` into free space at `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Occupied`] if `pos` is not free.
    pub fn place_block(&mut self, pos: BlockPos, block: MaterialId) -> Result<(), WorldError> {
        if !self.can_place(pos) {
            return Err(WorldError::Occupied(pos));
        }
        self.set_block(pos, block);
        Ok(())
    }

    /// Place an empty chest at `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Occupied`] if `pos` is not free.
    pub fn place_container(&mut self, pos: BlockPos) -> Result<(), WorldError> {
        self.place_block(pos, MaterialId::new(items::CHEST))
    }

    /// Add `count` of `material` to the container at `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NoContainer`] if there is no container at `pos`.
    pub fn insert_items(
        &mut self,
        pos: BlockPos,
        material: &MaterialId,
        count: u64,
    ) -> Result<(), WorldError> {
        let contents = self
            .containers
            .get_mut(&pos)
            .ok_or(WorldError::NoContainer(pos))?;
        let slot = contents.entry(material.clone()).or_insert(0);
        *slot = slot.saturating_add(count);
        Ok(())
    }

    /// Add a hostile entity at `pos`.
    pub fn spawn_hostile(&mut self, pos: BlockPos) {
        self.hostiles.push(pos);
    }

    /// Remove every hostile within `radius` of `center` and return how many
    /// were removed.
    pub fn despawn_hostiles_near(&mut self, center: BlockPos, radius: u32) -> usize {
        let r = i64::from(radius);
        let before = self.hostiles.len();
        self.hostiles
            .retain(|h| h.distance_sq(center) > r.saturating_mul(r));
        before.saturating_sub(self.hostiles.len())
    }

    /// Remove every hostile.
    pub fn clear_hostiles(&mut self) {
        self.hostiles.clear();
    }

    /// Current hostile positions.
    pub fn hostiles(&self) -> &[BlockPos] {
        &self.hostiles
    }

    /// Every container position, sorted.
    pub fn all_containers(&self) -> Vec<BlockPos> {
        self.containers.keys().copied().collect()
    }
}

impl WorldView for SimWorld {
    fn block_at(&self, pos: BlockPos) -> Option<MaterialId> {
        match self.overrides.get(&pos) {
            Some(block) => block.clone(),
            None if pos.y <= self.ground_y => Some(self.ground_block.clone()),
            None => None,
        }
    }

    fn container_contents(&self, pos: BlockPos) -> Option<BTreeMap<MaterialId, u64>> {
        self.containers.get(&pos).cloned()
    }

    fn containers_in(&self, region: &Cuboid) -> Vec<BlockPos> {
        self.containers
            .keys()
            .copied()
            .filter(|p| region.contains(*p))
            .collect()
    }

    fn can_place(&self, pos: BlockPos) -> bool {
        self.block_at(pos).is_none()
    }

    fn is_solid(&self, pos: BlockPos) -> bool {
        self.block_at(pos).is_some_and(|b| !is_fluid(&b))
    }

    fn is_liquid(&self, pos: BlockPos) -> bool {
        self.block_at(pos).is_some_and(|b| is_fluid(&b))
    }

    /// Only placed blocks are searched; the implicit ground never matches.
    fn nearest_block(
        &self,
        from: BlockPos,
        block: &MaterialId,
        max_distance: u32,
    ) -> Option<BlockPos> {
        let limit = i64::from(max_distance).saturating_mul(i64::from(max_distance));
        self.overrides
            .iter()
            .filter(|(_, b)| b.as_ref() == Some(block))
            .map(|(p, _)| *p)
            .filter(|p| p.distance_sq(from) <= limit)
            .min_by_key(|p| p.distance_sq(from))
    }

    fn hostile_count(&self, center: BlockPos, radius: u32) -> u32 {
        let limit = i64::from(radius).saturating_mul(i64::from(radius));
        let count = self
            .hostiles
            .iter()
            .filter(|h| h.distance_sq(center) <= limit)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

// ---------------------------------------------------------------------------
// SimInventory
// ---------------------------------------------------------------------------

/// The agent's inventory, equipment and vitals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimInventory {
    items: BTreeMap<MaterialId, u64>,
    equipped: BTreeSet<MaterialId>,
    food: u32,
    health: u32,
    position: BlockPos,
}

impl SimInventory {
    /// An empty-handed agent at full health standing at `position`.
    pub const fn new(position: BlockPos) -> Self {
        Self {
            items: BTreeMap::new(),
            equipped: BTreeSet::new(),
            food: 0,
            health: MAX_HEALTH,
            position,
        }
    }

    /// Every carried item and its count.
    pub const fn items(&self) -> &BTreeMap<MaterialId, u64> {
        &self.items
    }

    /// Add `count` of `item`.
    pub fn add(&mut self, item: &MaterialId, count: u64) {
        if count == 0 {
            return;
        }
        let slot = self.items.entry(item.clone()).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    /// Remove `count` of `item`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InsufficientItems`] if fewer are carried; the
    /// inventory is left unchanged.
    pub fn remove(&mut self, item: &MaterialId, count: u64) -> Result<(), WorldError> {
        let have = self.carried_count(item);
        let left = have
            .checked_sub(count)
            .ok_or_else(|| WorldError::InsufficientItems {
                material: item.clone(),
                wanted: count,
                have,
            })?;
        if left == 0 {
            self.items.remove(item);
            self.equipped.remove(item);
        } else {
            self.items.insert(item.clone(), left);
        }
        Ok(())
    }

    /// Remove and return every `item`.
    pub fn take_all(&mut self, item: &MaterialId) -> u64 {
        self.equipped.remove(item);
        self.items.remove(item).unwrap_or(0)
    }

    /// Equip a carried `item`. Returns `false` if none is carried.
    pub fn equip(&mut self, item: &MaterialId) -> bool {
        if !self.has_item(item) {
            return false;
        }
        self.equipped.insert(item.clone());
        true
    }

    /// Add food value.
    pub const fn add_food(&mut self, units: u32) {
        self.food = self.food.saturating_add(units);
    }

    /// Set health, clamped to [`MAX_HEALTH`].
    pub fn set_health(&mut self, health: u32) {
        self.health = health.min(MAX_HEALTH);
    }

    /// Move the agent.
    pub const fn set_position(&mut self, position: BlockPos) {
        self.position = position;
    }
}

impl InventoryView for SimInventory {
    fn carried_count(&self, item: &MaterialId) -> u64 {
        self.items.get(item).copied().unwrap_or(0)
    }

    fn is_equipped(&self, item: &MaterialId) -> bool {
        self.equipped.contains(item)
    }

    fn food_score(&self) -> u32 {
        self.food
    }

    fn health(&self) -> u32 {
        self.health
    }

    fn position(&self) -> BlockPos {
        self.position
    }
}
