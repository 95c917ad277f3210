//! End-to-end scenarios for the staging state machine.
//!
//! A small harness plays the part of the task engine: it polls the task,
//! applies each returned sub-task instantly to a [`SimWorld`] and
//! [`SimInventory`], and reports the outcome through [`SubTaskStatus`] on
//! the next poll. Tests that need to observe a sub-task before it takes
//! effect poll without applying.

#![allow(clippy::unwrap_used, clippy::panic, clippy::arithmetic_side_effects)]

use quartermaster_core::config::StagingConfig;
use quartermaster_core::{Behaviour, BehaviourStack, StagingTask, StaticSource, Task, TickContext};
use quartermaster_types::{
    AbortReason, BlockPos, MaterialId, MaterialRequirement, PlacementInfo, StagePhase, SubTask,
    SubTaskStatus, items,
};
use quartermaster_world::{InventoryView, SimInventory, SimWorld, WorldView};

const ORIGIN: BlockPos = BlockPos::new(0, 1, 0);

/// Polls allowed before a scenario is considered stuck.
const MAX_POLLS: usize = 2_000;

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    task: StagingTask,
    world: SimWorld,
    inventory: SimInventory,
    behaviour: BehaviourStack,
    tick: u64,
    status: SubTaskStatus,
}

impl Harness {
    fn new(lines: &[(&str, u64)], config: StagingConfig, world: SimWorld) -> Self {
        let placement = PlacementInfo {
            name: "Watchtower".to_owned(),
            origin: ORIGIN,
            materials: lines
                .iter()
                .map(|(m, n)| MaterialRequirement::new(MaterialId::new(m), *n))
                .collect(),
        };
        let task = StagingTask::new(
            config,
            Box::new(StaticSource::new(placement)),
            Some("Watchtower".to_owned()),
        );
        let mut harness = Self {
            task,
            world,
            inventory: prepared_inventory(),
            behaviour: BehaviourStack::new(),
            tick: 0,
            status: SubTaskStatus::Idle,
        };
        harness.task.on_start(&mut harness.behaviour);
        harness
    }

    /// Poll once, reporting `status` for the previous sub-task.
    fn poll(&mut self, status: SubTaskStatus) -> Option<SubTask> {
        let mut ctx = TickContext {
            tick: self.tick,
            inventory: &self.inventory,
            world: &self.world,
            behaviour: &mut self.behaviour,
            status,
        };
        let next = self.task.on_tick(&mut ctx);
        self.tick += 1;
        next
    }

    /// Poll once and apply whatever comes back.
    fn step(&mut self) -> Option<SubTask> {
        let next = self.poll(self.status);
        match &next {
            Some(task) => {
                self.apply(task);
                self.status = SubTaskStatus::Finished;
            }
            None => self.status = SubTaskStatus::Idle,
        }
        next
    }

    /// Step until `phase` is reached.
    fn advance_to(&mut self, phase: StagePhase) {
        for _ in 0..MAX_POLLS {
            if self.task.phase() == phase {
                return;
            }
            self.step();
        }
        panic!("never reached {phase}, stuck in {}", self.task.phase());
    }

    /// Step until a sub-task matching `wanted` is returned, and return it
    /// without applying it.
    fn run_until(&mut self, wanted: impl Fn(&SubTask) -> bool) -> SubTask {
        for _ in 0..MAX_POLLS {
            match self.poll(self.status) {
                Some(task) if wanted(&task) => return task,
                Some(task) => {
                    self.apply(&task);
                    self.status = SubTaskStatus::Finished;
                }
                None => self.status = SubTaskStatus::Idle,
            }
        }
        panic!("wanted sub-task never issued, stuck in {}", self.task.phase());
    }

    fn run_to_completion(&mut self) {
        self.advance_to(StagePhase::Complete);
    }

    fn apply(&mut self, task: &SubTask) {
        match task {
            SubTask::Acquire { item, count } => {
                let held = self.inventory.carried_count(item);
                self.inventory.add(item, count.saturating_sub(held));
            }
            SubTask::Equip { item } => {
                if !self.inventory.has_item(item) {
                    self.inventory.add(item, 1);
                }
                self.inventory.equip(item);
            }
            SubTask::CollectFood { units } => {
                let have = self.inventory.food_score();
                self.inventory.add_food(units.saturating_sub(have));
            }
            SubTask::BreakBlock { pos } => {
                if let Some(block) = self.world.remove_block(*pos) {
                    self.inventory.add(&block, 1);
                }
            }
            SubTask::PlaceBlock { pos, block } => {
                if self.world.place_block(*pos, block.clone()).is_ok() {
                    self.inventory.remove(block, 1).unwrap();
                }
            }
            SubTask::StoreInContainer { container, items } => {
                if !self.world.is_container(*container) {
                    return;
                }
                for item in items {
                    let moved = item.count.min(self.inventory.carried_count(&item.material));
                    self.inventory.remove(&item.material, moved).unwrap();
                    self.world
                        .insert_items(*container, &item.material, moved)
                        .unwrap();
                }
            }
            SubTask::Smelt {
                input,
                output,
                count,
            } => {
                let used = (*count).min(self.inventory.carried_count(input));
                self.inventory.remove(input, used).unwrap();
                self.inventory.add(output, used);
            }
            SubTask::MoveTo { pos } => self.inventory.set_position(*pos),
            SubTask::Wander { .. } => {}
        }
    }

    fn stored_in_world(&self, material: &str) -> u64 {
        let material = MaterialId::new(material);
        self.world
            .all_containers()
            .into_iter()
            .filter_map(|pos| self.world.container_contents(pos))
            .filter_map(|contents| contents.get(&material).copied())
            .sum()
    }
}

/// An agent that already passes every basic preparation step for stone.
fn prepared_inventory() -> SimInventory {
    let mut inv = SimInventory::new(ORIGIN);
    let shield = MaterialId::new(items::SHIELD);
    inv.add(&shield, 1);
    inv.equip(&shield);
    inv.add(&MaterialId::new("stone_sword"), 1);
    inv.add(&MaterialId::new("iron_pickaxe"), 1);
    inv.add(&MaterialId::new(items::CRAFTING_TABLE), 1);
    inv.add_food(20);
    inv
}

fn quiet_config() -> StagingConfig {
    let mut config = StagingConfig::default();
    config.guard.enabled = false;
    config
}

fn is_store(task: &SubTask) -> bool {
    task.is_deposit()
}

fn store_target(task: &SubTask) -> BlockPos {
    match task {
        SubTask::StoreInContainer { container, .. } => *container,
        other => panic!("expected a deposit, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn empty_requirements_complete_in_one_poll() {
    let mut h = Harness::new(&[], quiet_config(), SimWorld::flat(0));
    assert_eq!(h.poll(SubTaskStatus::Idle), None);
    assert_eq!(h.task.phase(), StagePhase::Complete);
    assert_eq!(h.task.abort_reason(), None);
    assert!(h.task.is_finished());
    assert!(h.world.all_containers().is_empty());
}

#[test]
fn full_run_stages_every_material() {
    let mut h = Harness::new(&[("stone", 200), ("glass", 10)], quiet_config(), SimWorld::flat(0));
    h.run_to_completion();

    assert_eq!(h.task.abort_reason(), None);
    assert!(h.task.is_satisfied());
    assert_eq!(h.task.capacity_target(), Some(3));
    assert_eq!(h.task.storage().len(), 3);
    assert_eq!(h.stored_in_world("stone"), 200);
    assert_eq!(h.stored_in_world("glass"), 10);
    assert_eq!(h.inventory.carried_count(&MaterialId::new("stone")), 0);

    // Every placed container respects the clearance around the origin.
    for pos in h.world.all_containers() {
        assert!(pos.distance_sq(ORIGIN) >= 9, "{pos} too close to origin");
    }

    // Terminal: further polls do nothing.
    assert_eq!(h.poll(SubTaskStatus::Idle), None);
}

#[test]
fn existing_containers_are_reused() {
    let mut world = SimWorld::flat(0);
    for pos in [
        BlockPos::new(4, 1, 0),
        BlockPos::new(-4, 1, 0),
        BlockPos::new(0, 1, 4),
    ] {
        world.place_container(pos).unwrap();
    }
    let mut h = Harness::new(&[("stone", 64)], quiet_config(), world);
    h.run_to_completion();

    assert!(h.task.is_satisfied());
    assert_eq!(h.world.all_containers().len(), 3);
    assert_eq!(h.task.placement_attempts(), 0);
}

#[test]
fn deposit_confirms_exactly_what_was_carried() {
    let mut h = Harness::new(&[("stone", 200), ("glass", 10)], quiet_config(), SimWorld::flat(0));
    let store = h.run_until(is_store);
    let SubTask::StoreInContainer { items, .. } = &store else {
        panic!("expected a deposit, got {store}");
    };
    assert_eq!(items.len(), 1);
    let deposited = items.first().unwrap().clone();
    assert!(deposited.count > 0);

    let before = h.task.ledger().get(&deposited.material).unwrap().confirmed_stored;
    h.apply(&store);
    h.poll(SubTaskStatus::Finished);

    let entry = h.task.ledger().get(&deposited.material).unwrap();
    assert_eq!(entry.confirmed_stored, before + deposited.count);
    assert_eq!(entry.pending_deposit, 0);
    assert_eq!(entry.carried, 0);
    assert_eq!(h.task.phase(), StagePhase::Gather);
}

#[test]
fn vanished_container_is_replaced_by_another() {
    let mut h = Harness::new(&[("stone", 200)], quiet_config(), SimWorld::flat(0));
    let first = store_target(&h.run_until(is_store));
    let tracked_before = h.task.storage().len();

    h.world.remove_block(first);
    let retry = h.poll(SubTaskStatus::Active).unwrap();
    let second = store_target(&retry);

    assert_ne!(second, first);
    assert!(!h.task.storage().contains(first));
    assert_eq!(h.task.storage().len(), tracked_before - 1);
    assert_eq!(h.task.phase(), StagePhase::Deposit);

    h.apply(&retry);
    h.status = SubTaskStatus::Finished;
    h.run_to_completion();
    assert!(h.task.is_satisfied());
    assert_eq!(h.stored_in_world("stone"), 200);
}

#[test]
fn losing_every_container_returns_to_placement() {
    let mut h = Harness::new(&[("stone", 200)], quiet_config(), SimWorld::flat(0));
    h.run_until(is_store);

    for pos in h.world.all_containers() {
        h.world.remove_block(pos);
    }
    assert_eq!(h.poll(SubTaskStatus::Active), None);
    assert_eq!(h.task.phase(), StagePhase::FindOrPlaceStorage);
    assert!(h.task.storage().is_empty());

    // The run recovers by placing fresh containers.
    h.status = SubTaskStatus::Idle;
    h.run_to_completion();
    assert!(h.task.is_satisfied());
    assert_eq!(h.stored_in_world("stone"), 200);
}

#[test]
fn repeated_deposit_failures_drop_the_container() {
    let mut h = Harness::new(&[("stone", 200)], quiet_config(), SimWorld::flat(0));
    let store = h.run_until(is_store);
    let first = store_target(&store);
    let max = StagingConfig::default().deposit.max_deposit_attempts;

    // The engine gives up on every deposit; the task retries the same
    // container until the attempt limit is crossed.
    for attempt in 1..=max {
        let retry = h.poll(SubTaskStatus::TimedOut).unwrap();
        assert_eq!(store_target(&retry), first);
        assert_eq!(h.task.deposit_attempts(), attempt);
    }
    assert_eq!(h.poll(SubTaskStatus::TimedOut), None);

    // Waits out the cooldown, then moves on.
    let mut next = None;
    for _ in 0..100 {
        next = h.poll(SubTaskStatus::Idle);
        if next.is_some() {
            break;
        }
    }
    let next = next.unwrap();
    assert_ne!(store_target(&next), first);
    assert!(!h.task.storage().contains(first));
    assert_eq!(h.task.deposit_attempts(), 0);
    assert_eq!(h.task.phase(), StagePhase::Deposit);
}

#[test]
fn hostiles_preempt_gather_without_touching_the_ledger() {
    let mut h = Harness::new(&[("stone", 200)], StagingConfig::default(), SimWorld::flat(0));
    h.advance_to(StagePhase::Gather);
    let gather = h.poll(h.status).unwrap();
    assert!(matches!(gather, SubTask::Acquire { .. }));
    let ledger_before = h.task.ledger().clone();

    for pos in [
        BlockPos::new(2, 1, 0),
        BlockPos::new(0, 1, 2),
        BlockPos::new(-2, 1, 0),
    ] {
        h.world.spawn_hostile(pos);
    }

    let mut retreat = None;
    for _ in 0..20 {
        let task = h.poll(SubTaskStatus::Active).unwrap();
        if task != gather {
            retreat = Some(task);
            break;
        }
    }
    let retreat = retreat.unwrap();
    assert!(
        matches!(retreat, SubTask::MoveTo { .. } | SubTask::Wander { .. }),
        "unexpected retreat {retreat}"
    );
    assert!(h.task.in_danger());
    assert_eq!(h.task.phase(), StagePhase::Gather);
    assert_eq!(h.task.ledger(), &ledger_before);

    h.world.clear_hostiles();
    let mut resumed = None;
    for _ in 0..20 {
        let task = h.poll(SubTaskStatus::Finished).unwrap();
        if task != retreat {
            resumed = Some(task);
            break;
        }
    }
    assert_eq!(resumed, Some(gather));
    assert!(!h.task.in_danger());
    assert_eq!(h.task.phase(), StagePhase::Gather);
    assert_eq!(h.task.ledger(), &ledger_before);
}

#[test]
fn placement_exhaustion_aborts_the_run() {
    let mut config = quiet_config();
    config.storage.max_placement_attempts = 5;
    config.storage.wander_threshold = 2;
    config.storage.placement_cooldown_ticks = 0;

    // Ground far above the origin: nowhere is free to place into.
    let mut h = Harness::new(&[("stone", 200)], config, SimWorld::flat(100));
    h.inventory.add(&MaterialId::new(items::CHEST), 3);
    h.advance_to(StagePhase::FindOrPlaceStorage);

    let mut issued = Vec::new();
    while !h.task.is_finished() && issued.len() < 10 {
        if let Some(task) = h.step() {
            issued.push(task);
        }
    }

    let wander = SubTask::Wander { ticks: 40 };
    let approach = SubTask::MoveTo {
        pos: ORIGIN.offset(5, 0, 0),
    };
    assert_eq!(
        issued,
        vec![
            wander.clone(),
            wander,
            approach.clone(),
            approach.clone(),
            approach
        ]
    );
    assert_eq!(h.task.phase(), StagePhase::Complete);
    assert_eq!(
        h.task.abort_reason(),
        Some(AbortReason::PlacementAttemptsExhausted)
    );
    assert!(!h.task.is_satisfied());
}

#[test]
fn chest_acquisition_failure_aborts_the_run() {
    let mut config = quiet_config();
    config.storage.max_placement_attempts = 5;
    let mut h = Harness::new(&[("stone", 200)], config, SimWorld::flat(0));
    h.advance_to(StagePhase::FindOrPlaceStorage);

    // The engine reports every chest acquisition as done but never hands
    // over a chest.
    let chest = MaterialId::new(items::CHEST);
    let mut acquires = 0;
    for _ in 0..MAX_POLLS {
        if h.task.is_finished() {
            break;
        }
        match h.poll(h.status) {
            Some(SubTask::Acquire { item, .. }) if item == chest => {
                acquires += 1;
                h.status = SubTaskStatus::Finished;
            }
            Some(task) => {
                h.apply(&task);
                h.status = SubTaskStatus::Finished;
            }
            None => h.status = SubTaskStatus::Idle,
        }
    }

    assert!(h.task.is_finished());
    assert_eq!(
        h.task.abort_reason(),
        Some(AbortReason::PlacementAttemptsExhausted)
    );
    assert_eq!(acquires, 5);
    assert_eq!(h.task.placement_attempts(), 5);
    assert!(h.world.all_containers().is_empty());
}

#[test]
fn silent_placement_failure_waits_out_the_cooldown() {
    let cooldown = 30;
    let mut config = quiet_config();
    config.storage.placement_cooldown_ticks = cooldown;
    let mut h = Harness::new(&[("stone", 200)], config, SimWorld::flat(0));
    h.inventory.add(&MaterialId::new(items::CHEST), 3);
    h.advance_to(StagePhase::FindOrPlaceStorage);

    // Placements are acknowledged but nothing appears in the world.
    let mut placements = Vec::new();
    for _ in 0..MAX_POLLS {
        if placements.len() == 2 {
            break;
        }
        let tick = h.tick;
        match h.poll(h.status) {
            Some(SubTask::PlaceBlock { pos, .. }) => {
                placements.push((tick, pos));
                h.status = SubTaskStatus::Finished;
            }
            Some(task) => {
                h.apply(&task);
                h.status = SubTaskStatus::Finished;
            }
            None => h.status = SubTaskStatus::Idle,
        }
    }

    let &[(first_tick, first_pos), (second_tick, second_pos)] = placements.as_slice() else {
        panic!("expected two placements, got {placements:?}");
    };
    assert!(
        second_tick - first_tick >= cooldown,
        "second placement after {} ticks",
        second_tick - first_tick
    );
    assert_ne!(second_pos, first_pos);
    assert_eq!(h.task.placement_attempts(), 2);
    assert_eq!(h.task.phase(), StagePhase::FindOrPlaceStorage);
    assert!(h.world.all_containers().is_empty());
}

#[test]
fn unprepared_agent_is_equipped_before_storage() {
    let mut h = Harness::new(&[("stone", 64)], quiet_config(), SimWorld::flat(0));
    h.inventory = SimInventory::new(ORIGIN);

    let first = h.run_until(|_| true);
    assert_eq!(
        first,
        SubTask::Acquire {
            item: MaterialId::new(items::SHIELD),
            count: 1
        }
    );
    assert_eq!(h.task.phase(), StagePhase::PrepareTools);

    h.apply(&first);
    h.status = SubTaskStatus::Finished;
    h.advance_to(StagePhase::FindOrPlaceStorage);
    assert!(h.inventory.is_equipped(&MaterialId::new(items::SHIELD)));
    assert!(h.inventory.has_item(&MaterialId::new(items::CRAFTING_TABLE)));
    assert!(h.inventory.food_score() >= 20);
}

#[test]
fn stopping_releases_the_behaviour_frame() {
    let mut h = Harness::new(&[("stone", 200)], quiet_config(), SimWorld::flat(0));
    h.advance_to(StagePhase::Gather);
    let tracked = h.task.storage().positions().to_vec();
    assert!(!tracked.is_empty());
    assert!(tracked.iter().all(|p| h.behaviour.is_position_protected(*p)));

    h.task.on_stop(&mut h.behaviour);
    assert_eq!(h.behaviour.depth(), 0);

    // Restarting keeps the ledger and the phase.
    h.task.on_start(&mut h.behaviour);
    assert_eq!(h.behaviour.depth(), 1);
    assert_eq!(h.task.phase(), StagePhase::Gather);
    assert!(tracked.iter().all(|p| h.behaviour.is_position_protected(*p)));
}
