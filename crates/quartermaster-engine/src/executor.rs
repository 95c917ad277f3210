//! Simulated sub-task executor.
//!
//! Stands in for the external task engine. Each tick it polls the active
//! task, reporting the status of the sub-task returned last time:
//!
//! - a returned sub-task equal to the running one continues it;
//! - a different one replaces it;
//! - `None` stops whatever is running and re-polls at once, up to
//!   [`MAX_REPOLLS`] times per tick.
//!
//! A running sub-task takes a few ticks depending on its kind and size, then
//! its effect is applied to the [`SimWorld`] and [`SimInventory`] in one
//! step. Failed effects are logged and still reported as finished: the
//! staging task only learns about them by re-reading the world.

use serde::Serialize;
use tracing::{debug, warn};

use quartermaster_core::{Behaviour, BehaviourStack, Task, TickContext};
use quartermaster_types::{BlockPos, SubTask, SubTaskStatus};
use quartermaster_world::{InventoryView, SimInventory, SimWorld, WorldError, WorldView};

use crate::error::ExecutionError;

/// Polls allowed within one tick while the task keeps returning nothing.
pub const MAX_REPOLLS: usize = 8;

/// Ticks after which a running sub-task is abandoned.
pub const TIMEOUT_TICKS: u64 = 400;

/// Upper bound on the duration of a single acquire.
const MAX_ACQUIRE_TICKS: u64 = 120;

/// Units acquired per tick.
const ACQUIRE_UNITS_PER_TICK: u64 = 16;

#[derive(Debug, Clone)]
struct Running {
    task: SubTask,
    remaining: u64,
    elapsed: u64,
}

/// Counters over the executor's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    /// Sub-tasks started.
    pub started: u64,
    /// Sub-tasks whose effect was applied.
    pub finished: u64,
    /// Sub-tasks whose effect was refused.
    pub failed: u64,
    /// Sub-tasks abandoned after [`TIMEOUT_TICKS`].
    pub timed_out: u64,
    /// Sub-tasks stopped or replaced before finishing.
    pub cancelled: u64,
}

/// Runs the sub-tasks a [`Task`] asks for against the simulated world.
#[derive(Debug, Default)]
pub struct SimExecutor {
    running: Option<Running>,
    status: SubTaskStatus,
    stats: ExecutorStats,
}

impl SimExecutor {
    /// An idle executor.
    pub const fn new() -> Self {
        Self {
            running: None,
            status: SubTaskStatus::Idle,
            stats: ExecutorStats {
                started: 0,
                finished: 0,
                failed: 0,
                timed_out: 0,
                cancelled: 0,
            },
        }
    }

    /// Lifetime counters.
    pub const fn stats(&self) -> ExecutorStats {
        self.stats
    }

    /// The sub-task currently running.
    #[cfg(test)]
    pub fn current(&self) -> Option<&SubTask> {
        self.running.as_ref().map(|r| &r.task)
    }

    /// The status reported on the next poll.
    #[cfg(test)]
    pub const fn status(&self) -> SubTaskStatus {
        self.status
    }

    /// Poll `task` and advance whatever it asked for by one tick.
    pub fn tick(
        &mut self,
        task: &mut dyn Task,
        tick: u64,
        world: &mut SimWorld,
        inventory: &mut SimInventory,
        behaviour: &mut BehaviourStack,
    ) {
        self.poll(task, tick, world, inventory, behaviour);
        self.advance(world, inventory, behaviour);
    }

    fn poll(
        &mut self,
        task: &mut dyn Task,
        tick: u64,
        world: &SimWorld,
        inventory: &SimInventory,
        behaviour: &mut BehaviourStack,
    ) {
        let mut status = self.status;
        for _ in 0..MAX_REPOLLS {
            let mut ctx = TickContext {
                tick,
                inventory,
                world,
                behaviour: &mut *behaviour,
                status,
            };
            if let Some(next) = task.on_tick(&mut ctx) {
                self.start_or_continue(next, inventory.position());
                return;
            }
            self.stop();
            if task.is_finished() {
                return;
            }
            status = SubTaskStatus::Idle;
        }
        debug!(tick, "Task asked for nothing after re-polling");
    }

    fn start_or_continue(&mut self, next: SubTask, from: BlockPos) {
        if self.running.as_ref().is_some_and(|r| r.task == next) {
            return;
        }
        self.stop();
        debug!(task = %next, "Sub-task started");
        self.stats.started = self.stats.started.saturating_add(1);
        self.running = Some(Running {
            remaining: duration(&next, from),
            elapsed: 0,
            task: next,
        });
    }

    fn stop(&mut self) {
        if let Some(run) = self.running.take() {
            debug!(task = %run.task, elapsed = run.elapsed, "Sub-task stopped");
            self.stats.cancelled = self.stats.cancelled.saturating_add(1);
        }
    }

    fn advance(
        &mut self,
        world: &mut SimWorld,
        inventory: &mut SimInventory,
        behaviour: &BehaviourStack,
    ) {
        let Some(mut run) = self.running.take() else {
            self.status = SubTaskStatus::Idle;
            return;
        };
        run.elapsed = run.elapsed.saturating_add(1);
        run.remaining = run.remaining.saturating_sub(1);

        if run.remaining == 0 {
            match apply(&run.task, world, inventory, behaviour) {
                Ok(()) => {
                    debug!(task = %run.task, ticks = run.elapsed, "Sub-task finished");
                    self.stats.finished = self.stats.finished.saturating_add(1);
                }
                Err(e) => {
                    warn!(task = %run.task, error = %e, "Sub-task failed");
                    self.stats.failed = self.stats.failed.saturating_add(1);
                }
            }
            self.status = SubTaskStatus::Finished;
        } else if run.elapsed >= TIMEOUT_TICKS {
            warn!(task = %run.task, ticks = run.elapsed, "Sub-task timed out");
            self.stats.timed_out = self.stats.timed_out.saturating_add(1);
            self.status = SubTaskStatus::TimedOut;
        } else {
            self.status = SubTaskStatus::Active;
            self.running = Some(run);
        }
    }
}

/// Ticks `task` takes when started with the agent at `from`.
fn duration(task: &SubTask, from: BlockPos) -> u64 {
    match task {
        SubTask::Acquire { count, .. } => count
            .div_ceil(ACQUIRE_UNITS_PER_TICK)
            .clamp(1, MAX_ACQUIRE_TICKS),
        SubTask::Equip { .. } => 1,
        SubTask::CollectFood { units } => u64::from(*units).max(1),
        SubTask::BreakBlock { .. } => 3,
        SubTask::PlaceBlock { .. } => 2,
        SubTask::StoreInContainer { items, .. } => u64::try_from(items.len())
            .unwrap_or(u64::MAX)
            .saturating_add(2),
        SubTask::Smelt { count, .. } => (*count).max(1),
        SubTask::MoveTo { pos } => {
            let dx = i64::from(pos.x).saturating_sub(i64::from(from.x)).unsigned_abs();
            let dz = i64::from(pos.z).saturating_sub(i64::from(from.z)).unsigned_abs();
            dx.saturating_add(dz).div_ceil(4).max(1)
        }
        SubTask::Wander { ticks } => (*ticks).max(1),
    }
}

/// Carry out the effect of `task` in one step.
pub fn apply(
    task: &SubTask,
    world: &mut SimWorld,
    inventory: &mut SimInventory,
    behaviour: &BehaviourStack,
) -> Result<(), ExecutionError> {
    match task {
        SubTask::Acquire { item, count } => {
            let held = inventory.carried_count(item);
            inventory.add(item, count.saturating_sub(held));
        }
        SubTask::Equip { item } => {
            if !inventory.equip(item) {
                return Err(WorldError::InsufficientItems {
                    material: item.clone(),
                    wanted: 1,
                    have: 0,
                }
                .into());
            }
        }
        SubTask::CollectFood { units } => {
            inventory.add_food(units.saturating_sub(inventory.food_score()));
        }
        SubTask::BreakBlock { pos } => {
            if behaviour.is_position_protected(*pos) {
                return Err(ExecutionError::Protected(*pos));
            }
            if let Some(block) = world.remove_block(*pos) {
                inventory.add(&block, 1);
            }
        }
        SubTask::PlaceBlock { pos, block } => {
            inventory.remove(block, 1)?;
            if let Err(e) = world.place_block(*pos, block.clone()) {
                inventory.add(block, 1);
                return Err(e.into());
            }
        }
        SubTask::StoreInContainer { container, items } => {
            if !world.is_container(*container) {
                return Err(WorldError::NoContainer(*container).into());
            }
            for item in items {
                let moved = item.count.min(inventory.carried_count(&item.material));
                inventory.remove(&item.material, moved)?;
                world.insert_items(*container, &item.material, moved)?;
            }
        }
        SubTask::Smelt {
            input,
            output,
            count,
        } => {
            inventory.remove(input, *count)?;
            inventory.add(output, *count);
        }
        SubTask::MoveTo { pos } => inventory.set_position(*pos),
        SubTask::Wander { .. } => {}
    }
    Ok(())
}
