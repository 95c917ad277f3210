//! The staging state machine.
//!
//! ```text
//! INIT -> PREPARE_TOOLS -> FIND_OR_PLACE_STORAGE <-> VALIDATE_STORAGE
//!                                   ^                     |
//!                                   |                     v
//!                                DEPOSIT  <---------->  GATHER  -> COMPLETE
//! ```
//!
//! Every poll first consults the [`EnvironmentalGuard`]; a retreat preempts
//! the phase handler without touching any staging state. Otherwise the
//! handler for the current phase runs once and either returns a sub-task
//! for the engine or changes phase and returns `None` so the engine polls
//! again.
//!
//! `GATHER` and `DEPOSIT` reconcile the ledger against the inventory and
//! the tracked containers before anything else, and finish the run as soon
//! as the ledger is complete.
//!
//! Nothing here returns an error to the engine. Collaborator failures are
//! logged and turned into bounded retries, phase rollbacks or, for a
//! missing bill of materials and exhausted placement attempts, an early
//! `COMPLETE` with an [`AbortReason`].

use std::any::Any;
use std::collections::BTreeSet;

use serde::Serialize;

use quartermaster_ledger::{AuditResult, LedgerSnapshot, Progress, QuantityLedger};
use quartermaster_types::{
    AbortReason, BlockPos, MaterialId, PlacementInfo, StagePhase, StagingRunId, SubTask,
    SubTaskStatus, items,
};
use quartermaster_world::{StorageSet, find_placement_site, scan_nearby};

use crate::capacity::{required_containers, required_slots};
use crate::config::{PreparationMode, StagingConfig};
use crate::guard::EnvironmentalGuard;
use crate::ladder::EquipmentLadder;
use crate::planner::{Preparation, PreparationPlanner};
use crate::progress::ProgressReporter;
use crate::source::MaterialSource;
use crate::task::{Behaviour, Task, TickContext};
use crate::timer::Cooldown;

/// Owner name of the behaviour frame the task pushes.
pub const BEHAVIOUR_OWNER: &str = "staging";

/// What kind of sub-task was returned on the previous poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Issued {
    Preparation,
    Acquire,
    Placement,
    Gather,
    Deposit(BlockPos),
    Retreat,
}

/// The gather handler's decision for one poll.
enum GatherStep {
    /// Gather until this many of the material are held.
    Gather(MaterialId, u64),
    Deposit,
}

/// End-of-run figures, serializable for run summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagingReport {
    /// The run.
    pub run: StagingRunId,
    /// Placement name, once resolved.
    pub placement: Option<String>,
    /// Phase at the time of the report.
    pub phase: StagePhase,
    /// Why the run gave up, if it did.
    pub abort: Option<AbortReason>,
    /// Whether every tracked type is satisfied by storage.
    pub satisfied: bool,
    /// Aggregate completion figures.
    pub progress: Progress,
    /// Containers tracked at the time of the report.
    pub containers: Vec<BlockPos>,
}

/// Stages the materials of one placement into containers near its origin.
pub struct StagingTask {
    run: StagingRunId,
    requested_name: Option<String>,
    config: StagingConfig,
    source: Box<dyn MaterialSource>,

    phase: StagePhase,
    placement_name: Option<String>,
    origin: BlockPos,
    ledger: QuantityLedger,
    abort: Option<AbortReason>,

    // Storage acquisition.
    storage: StorageSet,
    rejected: BTreeSet<BlockPos>,
    capacity_target: Option<u32>,
    attempted: BTreeSet<BlockPos>,
    placement_attempts: u32,
    placement_cooldown: Cooldown,

    // Deposit retries.
    deposit_container: Option<BlockPos>,
    deposit_attempts: u32,
    deposit_cooldown: Cooldown,

    gather_in_flight: Option<SubTask>,
    last: Option<(Issued, SubTask)>,

    ladder: EquipmentLadder,
    guard: EnvironmentalGuard,
    progress: ProgressReporter,
    frame_open: bool,
}

impl StagingTask {
    /// A task staging whatever `source` selects. `requested_name` is the
    /// placement the caller asked for; it only matters for
    /// [`Task::is_equal`].
    pub fn new(
        config: StagingConfig,
        source: Box<dyn MaterialSource>,
        requested_name: Option<String>,
    ) -> Self {
        let placement_cooldown = Cooldown::new(config.storage.placement_cooldown_ticks);
        let deposit_cooldown = Cooldown::new(config.deposit.deposit_cooldown_ticks);
        let guard = EnvironmentalGuard::new(config.guard.clone());
        let progress = ProgressReporter::new(config.progress.report_interval_ticks);
        Self {
            run: StagingRunId::new(),
            requested_name,
            config,
            source,
            phase: StagePhase::Init,
            placement_name: None,
            origin: BlockPos::default(),
            ledger: QuantityLedger::new(),
            abort: None,
            storage: StorageSet::new(),
            rejected: BTreeSet::new(),
            capacity_target: None,
            attempted: BTreeSet::new(),
            placement_attempts: 0,
            placement_cooldown,
            deposit_container: None,
            deposit_attempts: 0,
            deposit_cooldown,
            gather_in_flight: None,
            last: None,
            ladder: EquipmentLadder::new(),
            guard,
            progress,
            frame_open: false,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// This run's identifier.
    pub const fn run_id(&self) -> StagingRunId {
        self.run
    }

    /// The current phase.
    pub const fn phase(&self) -> StagePhase {
        self.phase
    }

    /// The ledger.
    pub const fn ledger(&self) -> &QuantityLedger {
        &self.ledger
    }

    /// The containers deposits go to.
    pub const fn storage(&self) -> &StorageSet {
        &self.storage
    }

    /// The staging origin of the resolved placement.
    pub const fn origin(&self) -> BlockPos {
        self.origin
    }

    /// Why the run gave up, if it did.
    pub const fn abort_reason(&self) -> Option<AbortReason> {
        self.abort
    }

    /// The cached container target, once computed.
    pub const fn capacity_target(&self) -> Option<u32> {
        self.capacity_target
    }

    /// Placement attempts since the last storage success.
    pub const fn placement_attempts(&self) -> u32 {
        self.placement_attempts
    }

    /// Failed deposits into the current container.
    pub const fn deposit_attempts(&self) -> u32 {
        self.deposit_attempts
    }

    /// The container currently being deposited into.
    pub const fn deposit_container(&self) -> Option<BlockPos> {
        self.deposit_container
    }

    /// Whether the guard's last verdict was danger.
    pub const fn in_danger(&self) -> bool {
        self.guard.in_danger()
    }

    /// Whether every tracked type is satisfied by storage.
    pub fn is_satisfied(&self) -> bool {
        self.ledger.is_all_complete()
    }

    /// End-of-run figures.
    pub fn report(&self) -> StagingReport {
        StagingReport {
            run: self.run,
            placement: self.placement_name.clone(),
            phase: self.phase,
            abort: self.abort,
            satisfied: self.is_satisfied(),
            progress: self.ledger.progress(),
            containers: self.storage.positions().to_vec(),
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn transition(&mut self, to: StagePhase) {
        if self.phase != to {
            tracing::info!(run = %self.run, from = %self.phase, to = %to, "Staging phase changed");
            self.phase = to;
        }
    }

    fn finish(&mut self, abort: Option<AbortReason>) {
        self.abort = abort;
        self.transition(StagePhase::Complete);
        let progress = self.ledger.progress();
        tracing::info!(
            run = %self.run,
            satisfied = self.ledger.is_all_complete(),
            abort = ?abort,
            complete = progress.complete_types,
            total = progress.total_types,
            percent = %progress.percent(),
            "Staging finished"
        );
    }

    fn issue(&mut self, kind: Issued, task: SubTask) -> Option<SubTask> {
        tracing::debug!(run = %self.run, phase = %self.phase, task = %task, "Issuing sub-task");
        self.last = Some((kind, task.clone()));
        Some(task)
    }

    /// The previous sub-task of `kind`, if the engine reports it still
    /// running.
    fn still_running(
        previous: Option<&(Issued, SubTask)>,
        status: SubTaskStatus,
        kind: Issued,
    ) -> Option<SubTask> {
        match previous {
            Some((issued, task)) if *issued == kind && status == SubTaskStatus::Active => {
                Some(task.clone())
            }
            _ => None,
        }
    }

    fn reset_run(&mut self) {
        self.placement_name = None;
        self.origin = BlockPos::default();
        self.ledger.clear();
        self.abort = None;
        self.storage.clear();
        self.rejected.clear();
        self.capacity_target = None;
        self.attempted.clear();
        self.placement_attempts = 0;
        self.placement_cooldown.reset();
        self.deposit_container = None;
        self.deposit_attempts = 0;
        self.deposit_cooldown.reset();
        self.gather_in_flight = None;
        self.last = None;
        self.ladder.reset();
        self.guard.reset();
        self.progress.reset();
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    fn reconcile(&mut self, ctx: &TickContext<'_>) {
        self.storage.prune_dead(ctx.world);
        let tally = self.storage.tally(ctx.world);
        let inventory = ctx.inventory;
        self.ledger
            .reconcile(|material| inventory.carried_count(material), &tally);
    }

    /// Scan around the origin, track every container not rejected this run
    /// and return the raw scan.
    fn scan_storage(&mut self, ctx: &mut TickContext<'_>) -> Vec<BlockPos> {
        let found = match scan_nearby(ctx.world, self.origin, self.config.storage.search_radius) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(run = %self.run, error = %e, "Container scan failed");
                Vec::new()
            }
        };
        self.storage.prune_dead(ctx.world);
        let mut added = Vec::new();
        for pos in &found {
            if !self.rejected.contains(pos) && self.storage.insert(*pos) {
                added.push(*pos);
            }
        }
        if !added.is_empty() {
            tracing::debug!(run = %self.run, added = added.len(), tracked = self.storage.len(), "Tracking new containers");
            ctx.behaviour.protect_positions(&added);
        }
        found
    }

    fn target_containers(&mut self) -> u32 {
        if let Some(target) = self.capacity_target {
            return target;
        }
        let target = required_containers(&self.ledger, &self.config.capacity);
        tracing::info!(
            run = %self.run,
            slots = required_slots(&self.ledger),
            containers = target,
            "Planned staging capacity"
        );
        self.capacity_target = Some(target);
        target
    }

    fn tracked_containers(&self) -> u32 {
        u32::try_from(self.storage.len()).unwrap_or(u32::MAX)
    }

    // -----------------------------------------------------------------------
    // Phase handlers
    // -----------------------------------------------------------------------

    fn dispatch(
        &mut self,
        ctx: &mut TickContext<'_>,
        previous: Option<(Issued, SubTask)>,
    ) -> Option<SubTask> {
        if self.phase.checks_completion() {
            self.reconcile(ctx);
            self.progress
                .maybe_report(self.run, ctx.tick, self.phase, &self.ledger);
            if self.ledger.is_all_complete() {
                self.finish(None);
                return None;
            }
        }

        match self.phase {
            StagePhase::Init => self.handle_init(),
            StagePhase::PrepareTools => self.handle_prepare_tools(ctx),
            StagePhase::FindOrPlaceStorage => self.handle_find_or_place(ctx, previous.as_ref()),
            StagePhase::ValidateStorage => self.handle_validate(ctx),
            StagePhase::Gather => self.handle_gather(ctx, previous.as_ref()),
            StagePhase::Deposit => self.handle_deposit(ctx, previous.as_ref()),
            StagePhase::Complete => None,
        }
    }

    fn selected_placement(&self) -> Option<PlacementInfo> {
        if !self.source.is_available() {
            tracing::error!(run = %self.run, "Material source is unavailable");
            return None;
        }
        match self.source.selected_placement() {
            Ok(placement) => placement,
            Err(e) => {
                tracing::error!(run = %self.run, error = %e, "Material source failed");
                None
            }
        }
    }

    fn handle_init(&mut self) -> Option<SubTask> {
        self.reset_run();

        let Some(placement) = self.selected_placement() else {
            tracing::error!(run = %self.run, "No placement selected, nothing to stage");
            self.finish(Some(AbortReason::NoPlacementSelected));
            return None;
        };

        tracing::info!(
            run = %self.run,
            placement = %placement.name,
            origin = %placement.origin,
            unique_items = placement.total_unique_items(),
            item_count = placement.total_item_count(),
            "Staging placement"
        );
        let report = self.ledger.ingest(&placement.materials);
        self.placement_name = Some(placement.name);
        self.origin = placement.origin;

        if self.ledger.is_empty() {
            tracing::info!(run = %self.run, dropped = report.dropped, "No stageable materials");
            self.finish(None);
            return None;
        }
        tracing::info!(
            run = %self.run,
            types = report.entries,
            merged = report.merged,
            dropped = report.dropped,
            "Material requirements ingested"
        );
        self.transition(StagePhase::PrepareTools);
        None
    }

    fn handle_prepare_tools(&mut self, ctx: &TickContext<'_>) -> Option<SubTask> {
        let prep = &self.config.preparation;
        if prep.mode == PreparationMode::Ladder {
            if let Preparation::Next(task) = self.ladder.step(prep, &self.ledger, ctx.inventory) {
                return self.issue(Issued::Preparation, task);
            }
        }
        let planned = PreparationPlanner::new(prep).next(&self.ledger, ctx.inventory, ctx.world);
        match planned {
            Preparation::Next(task) => self.issue(Issued::Preparation, task),
            Preparation::Done => {
                tracing::info!(run = %self.run, "Preparation complete");
                self.transition(StagePhase::FindOrPlaceStorage);
                None
            }
        }
    }

    fn handle_find_or_place(
        &mut self,
        ctx: &mut TickContext<'_>,
        previous: Option<&(Issued, SubTask)>,
    ) -> Option<SubTask> {
        let target = self.target_containers();
        let found = self.scan_storage(ctx);
        let have = self.tracked_containers();

        if have >= target {
            tracing::info!(run = %self.run, containers = have, target, "Staging storage ready");
            self.attempted.clear();
            self.placement_attempts = 0;
            self.placement_cooldown.reset();
            self.transition(StagePhase::ValidateStorage);
            return None;
        }

        if let Some(task) = Self::still_running(previous, ctx.status, Issued::Placement) {
            return self.issue(Issued::Placement, task);
        }

        if self.placement_attempts >= self.config.storage.max_placement_attempts {
            tracing::error!(
                run = %self.run,
                attempts = self.placement_attempts,
                containers = have,
                target,
                "Container placement attempts exhausted, aborting"
            );
            self.finish(Some(AbortReason::PlacementAttemptsExhausted));
            return None;
        }

        let chest = MaterialId::new(items::CHEST);
        let to_place = u64::from(target.saturating_sub(have));
        let carried = ctx.inventory.carried_count(&chest);
        if carried < to_place {
            let acquire_ended = previous.is_some_and(|(kind, _)| *kind == Issued::Acquire)
                && ctx.status.is_done();
            if acquire_ended {
                self.placement_attempts = self.placement_attempts.saturating_add(1);
                tracing::warn!(
                    run = %self.run,
                    carried,
                    wanted = to_place,
                    attempt = self.placement_attempts,
                    "Container acquisition ended short"
                );
                if self.placement_attempts >= self.config.storage.max_placement_attempts {
                    tracing::error!(
                        run = %self.run,
                        attempts = self.placement_attempts,
                        "Container acquisition attempts exhausted, aborting"
                    );
                    self.finish(Some(AbortReason::PlacementAttemptsExhausted));
                    return None;
                }
            }
            return self.issue(
                Issued::Acquire,
                SubTask::Acquire {
                    item: chest,
                    count: to_place,
                },
            );
        }

        if !self.placement_cooldown.elapsed(ctx.tick) {
            tracing::debug!(
                run = %self.run,
                wait = self.placement_cooldown.remaining(ctx.tick),
                "Waiting out placement cooldown"
            );
            return None;
        }

        self.placement_attempts = self.placement_attempts.saturating_add(1);
        self.placement_cooldown.start(ctx.tick);
        let policy = self.config.storage.site_policy();
        match find_placement_site(ctx.world, self.origin, &policy, &self.attempted, &found) {
            Some(pos) => {
                self.attempted.insert(pos);
                tracing::info!(
                    run = %self.run,
                    container = %pos,
                    attempt = self.placement_attempts,
                    "Placing staging container"
                );
                self.issue(Issued::Placement, SubTask::PlaceBlock { pos, block: chest })
            }
            None => {
                tracing::warn!(
                    run = %self.run,
                    attempt = self.placement_attempts,
                    "No placement site found"
                );
                let task = if self.placement_attempts > self.config.storage.wander_threshold {
                    SubTask::MoveTo {
                        pos: self.origin.offset(self.config.storage.approach_offset, 0, 0),
                    }
                } else {
                    SubTask::Wander {
                        ticks: self.config.storage.wander_ticks,
                    }
                };
                self.issue(Issued::Placement, task)
            }
        }
    }

    fn handle_validate(&mut self, ctx: &mut TickContext<'_>) -> Option<SubTask> {
        let target = self.target_containers();
        self.scan_storage(ctx);
        let have = self.tracked_containers();

        if have < target {
            tracing::warn!(
                run = %self.run,
                containers = have,
                target,
                "Storage shortfall on validation, returning to placement"
            );
            self.placement_attempts = 0;
            self.transition(StagePhase::FindOrPlaceStorage);
            return None;
        }
        tracing::info!(run = %self.run, containers = have, "Staging storage validated");
        self.transition(StagePhase::Gather);
        None
    }

    fn handle_gather(
        &mut self,
        ctx: &TickContext<'_>,
        previous: Option<&(Issued, SubTask)>,
    ) -> Option<SubTask> {
        if let Some(task) = self.gather_in_flight.take() {
            let ours = previous.is_some_and(|(kind, _)| *kind == Issued::Gather);
            if !(ours && ctx.status.is_done()) {
                self.gather_in_flight = Some(task.clone());
                return self.issue(Issued::Gather, task);
            }
            tracing::debug!(run = %self.run, status = ?ctx.status, task = %task, "Gather sub-task released");
        }

        let step = if self.ledger.carried_entries().any(|e| !e.needs_gathering()) {
            Some(GatherStep::Deposit)
        } else {
            self.ledger.next_to_gather().map(|e| {
                GatherStep::Gather(
                    e.material.clone(),
                    e.total_required.saturating_sub(e.stored()),
                )
            })
        };

        match step {
            Some(GatherStep::Gather(material, hold)) => {
                if let Err(e) = self.ledger.mark_gathering(&material) {
                    tracing::warn!(run = %self.run, error = %e, "Could not flag gather");
                }
                tracing::debug!(
                    run = %self.run,
                    material = %material,
                    remaining = self.ledger.remaining(&material),
                    "Gathering material"
                );
                let task = SubTask::Acquire {
                    item: material,
                    count: hold,
                };
                self.gather_in_flight = Some(task.clone());
                self.issue(Issued::Gather, task)
            }
            Some(GatherStep::Deposit) => {
                self.transition(StagePhase::Deposit);
                None
            }
            None => {
                tracing::debug!(run = %self.run, "Gather sweep exhausted, restarting it");
                self.ledger.clear_gather_flags();
                None
            }
        }
    }

    fn handle_deposit(
        &mut self,
        ctx: &TickContext<'_>,
        previous: Option<&(Issued, SubTask)>,
    ) -> Option<SubTask> {
        for confirmed in self.ledger.confirm_deposits() {
            tracing::info!(
                run = %self.run,
                material = %confirmed.material,
                count = confirmed.count,
                "Deposit confirmed"
            );
        }

        if !self.ledger.carries_anything() {
            tracing::debug!(run = %self.run, "Deposit cycle complete");
            self.deposit_container = None;
            self.deposit_attempts = 0;
            self.deposit_cooldown.reset();
            self.ledger.clear_gather_flags();
            self.gather_in_flight = None;
            self.transition(StagePhase::Gather);
            return None;
        }

        let current = self
            .deposit_container
            .filter(|pos| self.storage.contains(*pos));
        let Some(container) =
            current.or_else(|| self.storage.best(ctx.world, ctx.inventory.position()))
        else {
            tracing::warn!(run = %self.run, "No staging container available, returning to placement");
            self.deposit_container = None;
            self.deposit_attempts = 0;
            self.transition(StagePhase::FindOrPlaceStorage);
            return None;
        };

        if self.deposit_container != Some(container) {
            tracing::debug!(run = %self.run, container = %container, "Depositing into new container");
            self.deposit_container = Some(container);
            self.deposit_attempts = 0;
            self.deposit_cooldown.start(ctx.tick);
        }

        let kind = Issued::Deposit(container);
        if let Some(task) = Self::still_running(previous, ctx.status, kind) {
            return self.issue(kind, task);
        }
        if previous.is_some_and(|(k, _)| *k == kind) && ctx.status.is_done() {
            self.deposit_attempts = self.deposit_attempts.saturating_add(1);
            tracing::warn!(
                run = %self.run,
                container = %container,
                attempt = self.deposit_attempts,
                status = ?ctx.status,
                "Deposit ended with items still carried"
            );
        }

        if self.deposit_attempts > self.config.deposit.max_deposit_attempts {
            if !self.deposit_cooldown.elapsed(ctx.tick) {
                return None;
            }
            tracing::warn!(
                run = %self.run,
                container = %container,
                attempts = self.deposit_attempts,
                "Dropping container after repeated deposit failures"
            );
            self.storage.remove(container);
            self.rejected.insert(container);
            self.deposit_container = None;
            self.deposit_attempts = 0;
            if self.storage.is_empty() {
                self.transition(StagePhase::FindOrPlaceStorage);
            }
            return None;
        }

        let items = self.ledger.begin_deposit();
        self.issue(kind, SubTask::StoreInContainer { container, items })
    }
}

impl Task for StagingTask {
    fn on_start(&mut self, behaviour: &mut dyn Behaviour) {
        if !self.frame_open {
            behaviour.push(BEHAVIOUR_OWNER);
            self.frame_open = true;
        }
        behaviour.protect_items(&[
            MaterialId::new(items::CHEST),
            MaterialId::new(items::CRAFTING_TABLE),
        ]);
        behaviour.protect_positions(self.storage.positions());
        self.guard.reset();
        self.last = None;
        tracing::info!(run = %self.run, phase = %self.phase, "Staging task started");
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> Option<SubTask> {
        if self.phase.is_terminal() {
            return None;
        }
        if let Some(retreat) = self.guard.poll(ctx.tick, ctx.inventory, ctx.world) {
            return self.issue(Issued::Retreat, retreat);
        }

        let previous = self.last.take();
        let snapshot =
            (self.phase != StagePhase::Init).then(|| LedgerSnapshot::capture(&self.ledger));
        let next = self.dispatch(ctx, previous);
        if let Some(AuditResult::Anomaly(anomaly)) =
            snapshot.map(|s| s.audit(ctx.tick, &self.ledger))
        {
            tracing::error!(run = %self.run, anomaly = %anomaly, "Ledger accounting anomaly");
        }
        next
    }

    fn on_stop(&mut self, behaviour: &mut dyn Behaviour) {
        if self.frame_open {
            behaviour.pop();
            self.frame_open = false;
        }
        tracing::info!(run = %self.run, phase = %self.phase, "Staging task stopped");
    }

    fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| self.requested_name == other.requested_name)
    }

    fn debug_label(&self) -> String {
        match &self.placement_name {
            Some(name) => {
                let progress = self.ledger.progress();
                format!(
                    "Staging schematic: {name} (Phase: {}, Progress: {}/{})",
                    self.phase, progress.complete_types, progress.total_types
                )
            }
            None => format!("Staging schematic resources (Phase: {})", self.phase),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
