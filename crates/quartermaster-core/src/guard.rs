//! Environmental guard: periodic danger assessment and retreat.
//!
//! Every `poll_interval_ticks` the guard looks at the hostile count around
//! the agent and the agent's health. While in danger it preempts the
//! staging machine with a retreat sub-task: equip the shield if one is held
//! but not worn, otherwise move to the first safe spot found by sweeping
//! rings of increasing radius at fixed angular steps, otherwise wander.
//! Between assessments the last verdict stands.
//!
//! The guard owns none of the staging state. Leaving danger simply stops the
//! preemption and the staging machine continues where it was.

use quartermaster_types::{BlockPos, MaterialId, SubTask, items};
use quartermaster_world::{InventoryView, WorldView};

use crate::config::GuardConfig;

/// `cos(k * 30°) * 1000` for `k = 0..12`.
const COS_MILLI: [i64; 12] = [1000, 866, 500, 0, -500, -866, -1000, -866, -500, 0, 500, 866];
/// `sin(k * 30°) * 1000` for `k = 0..12`.
const SIN_MILLI: [i64; 12] = [0, 500, 866, 1000, 866, 500, 0, -500, -866, -1000, -866, -500];

/// Ticks of wandering requested when no safe spot is found.
pub const RETREAT_WANDER_TICKS: u64 = 20;

/// The guard's per-run state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentalGuard {
    config: GuardConfig,
    last_poll: Option<u64>,
    retreat: Option<SubTask>,
}

impl EnvironmentalGuard {
    /// A guard that has never assessed.
    pub const fn new(config: GuardConfig) -> Self {
        Self {
            config,
            last_poll: None,
            retreat: None,
        }
    }

    /// Forget the last assessment.
    pub fn reset(&mut self) {
        self.last_poll = None;
        self.retreat = None;
    }

    /// Whether the last assessment found danger.
    pub const fn in_danger(&self) -> bool {
        self.retreat.is_some()
    }

    /// Whether the agent is in danger right now.
    pub fn is_dangerous(&self, inventory: &dyn InventoryView, world: &dyn WorldView) -> bool {
        let hostiles = world.hostile_count(inventory.position(), self.config.danger_radius);
        hostiles > self.config.hostile_threshold || inventory.health() < self.config.health_threshold
    }

    /// The retreat sub-task that should preempt staging this tick, if any.
    pub fn poll(
        &mut self,
        tick: u64,
        inventory: &dyn InventoryView,
        world: &dyn WorldView,
    ) -> Option<SubTask> {
        if !self.config.enabled {
            return None;
        }
        let due = self
            .last_poll
            .is_none_or(|last| tick.saturating_sub(last) >= self.config.poll_interval_ticks);
        if !due {
            return self.retreat.clone();
        }
        self.last_poll = Some(tick);

        let was_in_danger = self.in_danger();
        if self.is_dangerous(inventory, world) {
            let retreat = self.retreat_task(inventory, world);
            if !was_in_danger {
                tracing::warn!(
                    health = inventory.health(),
                    position = %inventory.position(),
                    retreat = %retreat,
                    "Danger detected, preempting staging"
                );
            }
            self.retreat = Some(retreat);
        } else {
            if was_in_danger {
                tracing::info!(position = %inventory.position(), "Danger cleared, resuming staging");
            }
            self.retreat = None;
        }
        self.retreat.clone()
    }

    fn retreat_task(&self, inventory: &dyn InventoryView, world: &dyn WorldView) -> SubTask {
        let shield = MaterialId::new(items::SHIELD);
        if inventory.has_item(&shield) && !inventory.is_equipped(&shield) {
            return SubTask::Equip { item: shield };
        }
        self.find_safe_spot(inventory.position(), world)
            .map_or(SubTask::Wander { ticks: RETREAT_WANDER_TICKS }, |pos| SubTask::MoveTo { pos })
    }

    /// The first position on the ring sweep whose hostile count within
    /// `safe_radius` is below `safe_hostile_threshold`.
    pub fn find_safe_spot(&self, from: BlockPos, world: &dyn WorldView) -> Option<BlockPos> {
        let step = usize::try_from(self.config.ring_step.max(1)).unwrap_or(1);
        (self.config.ring_min..=self.config.ring_max)
            .step_by(step)
            .flat_map(|radius| {
                COS_MILLI
                    .iter()
                    .zip(SIN_MILLI.iter())
                    .filter_map(move |(cos, sin)| ring_point(from, radius, *cos, *sin))
            })
            .find(|pos| world.hostile_count(*pos, self.config.safe_radius) < self.config.safe_hostile_threshold)
    }
}

/// The point at `radius` from `from` in the direction given by the scaled
/// cosine and sine.
fn ring_point(from: BlockPos, radius: u32, cos_milli: i64, sin_milli: i64) -> Option<BlockPos> {
    let r = i64::from(radius);
    let dx = r.checked_mul(cos_milli)?.checked_div(1000)?;
    let dz = r.checked_mul(sin_milli)?.checked_div(1000)?;
    Some(from.offset(i32::try_from(dx).ok()?, 0, i32::try_from(dz).ok()?))
}
