//! The demo world: flat ground around a placement origin, a crafting table
//! and an old chest nearby, and hostiles that wander in at random.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use quartermaster_types::{BlockPos, MaterialId, MaterialRequirement, PlacementInfo, items};
use quartermaster_world::{InventoryView, SimInventory, SimWorld, WorldError};

/// Ground level of the demo world.
pub const GROUND_Y: i32 = 64;

/// Name of the built-in demo placement.
pub const DEMO_PLACEMENT_NAME: &str = "Demo Watchtower";

/// Ticks a spawned hostile stays around.
const HOSTILE_LIFETIME_TICKS: u64 = 120;

/// Half-width of the square around the agent hostiles spawn in.
const HOSTILE_SPAWN_SPREAD: i32 = 10;

/// The origin of the demo placement.
pub const fn demo_origin() -> BlockPos {
    BlockPos::new(0, GROUND_Y.saturating_add(1), 0)
}

/// The built-in bill of materials, used when no fresh material list export
/// is available.
pub fn demo_placement() -> PlacementInfo {
    let lines: [(&str, u64); 7] = [
        ("stone", 320),
        ("oak_planks", 128),
        ("glass", 48),
        ("dirt", 40),
        ("podzol", 24),
        ("torch", 16),
        ("water_bucket", 2),
    ];
    PlacementInfo {
        name: DEMO_PLACEMENT_NAME.to_owned(),
        origin: demo_origin(),
        materials: lines
            .iter()
            .map(|(m, n)| MaterialRequirement::new(MaterialId::new(m), *n))
            .collect(),
    }
}

/// The simulated world, the agent, and the hostile spawner.
#[derive(Debug)]
pub struct Scenario {
    /// The world.
    pub world: SimWorld,
    /// The agent.
    pub inventory: SimInventory,
    rng: StdRng,
    spawn_per_mille: u32,
    hostiles: Vec<(BlockPos, u64)>,
    spawned: u64,
}

impl Scenario {
    /// Build the demo world around `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the furniture cannot be placed.
    pub fn build(origin: BlockPos, seed: u64, spawn_per_mille: u32) -> Result<Self, WorldError> {
        let mut world = SimWorld::flat(origin.y.saturating_sub(1));
        world.place_block(
            origin.offset(-6, 0, 4),
            MaterialId::new(items::CRAFTING_TABLE),
        )?;
        world.place_container(origin.offset(6, 0, 6))?;

        Ok(Self {
            world,
            inventory: SimInventory::new(origin.offset(2, 0, 2)),
            rng: StdRng::seed_from_u64(seed),
            spawn_per_mille,
            hostiles: Vec::new(),
            spawned: 0,
        })
    }

    /// Hostiles spawned so far.
    pub const fn hostiles_spawned(&self) -> u64 {
        self.spawned
    }

    /// Expire old hostiles and maybe spawn a new one near the agent.
    pub fn step_hostiles(&mut self, tick: u64) {
        let before = self.hostiles.len();
        self.hostiles
            .retain(|(_, born)| tick.saturating_sub(*born) < HOSTILE_LIFETIME_TICKS);
        let mut changed = self.hostiles.len() != before;

        if self.spawn_per_mille > 0 && self.rng.random_range(0..1000_u32) < self.spawn_per_mille {
            let dx = self.rng.random_range(-HOSTILE_SPAWN_SPREAD..=HOSTILE_SPAWN_SPREAD);
            let dz = self.rng.random_range(-HOSTILE_SPAWN_SPREAD..=HOSTILE_SPAWN_SPREAD);
            let pos = self.inventory.position().offset(dx, 0, dz);
            debug!(tick, hostile = %pos, "Hostile spawned");
            self.hostiles.push((pos, tick));
            self.spawned = self.spawned.saturating_add(1);
            changed = true;
        }

        if changed {
            self.world.clear_hostiles();
            for (pos, _) in &self.hostiles {
                self.world.spawn_hostile(*pos);
            }
        }
    }
}
