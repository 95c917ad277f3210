//! The tick loop.
//!
//! [`run_staging`] drives one [`StagingTask`] until it finishes or the tick
//! budget runs out:
//!
//! 1. Hostiles come and go.
//! 2. The executor polls the task and advances the running sub-task.
//! 3. The loop sleeps `tick_interval_ms`, if configured.
//!
//! The task is started before the first tick and stopped after the last, so
//! its behaviour frame is always released.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use quartermaster_core::config::EngineConfig;
use quartermaster_core::{BehaviourStack, StagingReport, StagingTask, Task};

use crate::executor::{ExecutorStats, SimExecutor};
use crate::scenario::Scenario;

/// Ticks between debug-label log lines.
const LABEL_INTERVAL_TICKS: u64 = 500;

/// Why the tick loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndReason {
    /// The staging task reached its terminal phase.
    TaskFinished,
    /// `max_ticks` elapsed first.
    MaxTicksReached,
}

/// Everything printed at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Why the loop stopped.
    pub end_reason: EndReason,
    /// Ticks executed.
    pub total_ticks: u64,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end.
    pub finished_at: DateTime<Utc>,
    /// Hostiles spawned during the run.
    pub hostiles_spawned: u64,
    /// Sub-task counters.
    pub executor: ExecutorStats,
    /// The staging task's own report.
    pub staging: StagingReport,
}

/// Run `task` against `scenario` until it finishes or `config.max_ticks`
/// ticks have run.
pub async fn run_staging(
    task: &mut StagingTask,
    scenario: &mut Scenario,
    config: &EngineConfig,
) -> RunSummary {
    let started_at = Utc::now();
    let mut executor = SimExecutor::new();
    let mut behaviour = BehaviourStack::new();
    let mut tick: u64 = 0;

    info!(
        max_ticks = config.max_ticks,
        tick_interval_ms = config.tick_interval_ms,
        "Tick loop starting"
    );
    task.on_start(&mut behaviour);

    let end_reason = loop {
        if task.is_finished() {
            break EndReason::TaskFinished;
        }
        if tick >= config.max_ticks {
            warn!(tick, label = %task.debug_label(), "Tick limit reached before staging finished");
            break EndReason::MaxTicksReached;
        }

        scenario.step_hostiles(tick);
        executor.tick(
            task,
            tick,
            &mut scenario.world,
            &mut scenario.inventory,
            &mut behaviour,
        );

        if tick.checked_rem(LABEL_INTERVAL_TICKS) == Some(0) {
            debug!(tick, label = %task.debug_label(), "Staging status");
        }
        tick = tick.saturating_add(1);

        if config.tick_interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(config.tick_interval_ms)).await;
        }
    };

    task.on_stop(&mut behaviour);
    if behaviour.depth() != 0 {
        warn!(depth = behaviour.depth(), "Behaviour frames left open after stop");
    }

    let summary = RunSummary {
        end_reason,
        total_ticks: tick,
        started_at,
        finished_at: Utc::now(),
        hostiles_spawned: scenario.hostiles_spawned(),
        executor: executor.stats(),
        staging: task.report(),
    };
    log_run_end(&summary);
    summary
}

/// Log the outcome of a run.
pub fn log_run_end(summary: &RunSummary) {
    info!(
        reason = ?summary.end_reason,
        total_ticks = summary.total_ticks,
        phase = %summary.staging.phase,
        satisfied = summary.staging.satisfied,
        abort = ?summary.staging.abort,
        percent = %summary.staging.progress.percent(),
        containers = summary.staging.containers.len(),
        "Run ended"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quartermaster_core::StaticSource;
    use quartermaster_core::config::StagingConfig;
    use quartermaster_types::{AbortReason, StagePhase};
    use quartermaster_world::WorldView;

    use crate::scenario::{demo_origin, demo_placement};

    fn demo_task(config: &StagingConfig) -> StagingTask {
        StagingTask::new(
            config.clone(),
            Box::new(StaticSource::new(demo_placement())),
            None,
        )
    }

    #[tokio::test]
    async fn quiet_demo_run_stages_everything() {
        let config = StagingConfig::default();
        let mut scenario = Scenario::build(demo_origin(), 42, 0).unwrap();
        let mut task = demo_task(&config);

        let summary = run_staging(&mut task, &mut scenario, &config.engine).await;

        assert_eq!(summary.end_reason, EndReason::TaskFinished);
        assert!(summary.staging.satisfied);
        assert_eq!(summary.staging.abort, None);
        assert_eq!(summary.staging.phase, StagePhase::Complete);
        assert_eq!(summary.executor.failed, 0);
        assert!(summary.staging.containers.len() >= 3);
        for pos in &summary.staging.containers {
            assert!(scenario.world.is_container(*pos));
        }
    }

    #[tokio::test]
    async fn missing_placement_ends_at_once() {
        let config = StagingConfig::default();
        let mut scenario = Scenario::build(demo_origin(), 42, 0).unwrap();
        let mut task = StagingTask::new(config.clone(), Box::new(StaticSource::empty()), None);

        let summary = run_staging(&mut task, &mut scenario, &config.engine).await;

        assert_eq!(summary.end_reason, EndReason::TaskFinished);
        assert_eq!(summary.total_ticks, 1);
        assert_eq!(summary.staging.abort, Some(AbortReason::NoPlacementSelected));
    }

    #[tokio::test]
    async fn tick_limit_stops_the_loop() {
        let mut config = StagingConfig::default();
        config.engine.max_ticks = 5;
        let mut scenario = Scenario::build(demo_origin(), 42, 0).unwrap();
        let mut task = demo_task(&config);

        let summary = run_staging(&mut task, &mut scenario, &config.engine).await;

        assert_eq!(summary.end_reason, EndReason::MaxTicksReached);
        assert_eq!(summary.total_ticks, 5);
        assert!(!task.is_finished());
    }

    #[tokio::test]
    async fn hostile_run_terminates_and_serializes() {
        let mut config = StagingConfig::default();
        config.engine.hostile_spawn_per_mille = 50;
        let mut scenario = Scenario::build(demo_origin(), 7, 50).unwrap();
        let mut task = demo_task(&config);

        let summary = run_staging(&mut task, &mut scenario, &config.engine).await;

        assert!(summary.total_ticks <= config.engine.max_ticks);
        assert!(summary.hostiles_spawned > 0);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("staging").and_then(|s| s.get("progress")).is_some());
        assert!(json.get("end_reason").is_some());
    }
}
