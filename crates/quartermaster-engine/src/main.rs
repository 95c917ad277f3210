//! Demo engine binary for the Quartermaster staging agent.
//!
//! Wires the staging core to a simulated world and runs one staging task to
//! completion, then prints a JSON run summary on stdout.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `quartermaster-config.yaml` (or the path in
//!    `QUARTERMASTER_CONFIG`), defaults if the file is missing
//! 2. Initialize structured logging (tracing)
//! 3. Resolve the material source: a fresh material list export if one
//!    exists, the built-in demo placement otherwise
//! 4. Build the simulated world around the placement origin
//! 5. Run the tick loop
//! 6. Print the run summary

mod error;
mod executor;
mod runner;
mod scenario;

use std::path::{Path, PathBuf};

use tracing::info;
use tracing_subscriber::EnvFilter;

use quartermaster_core::config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, LoggingConfig};
use quartermaster_core::source::MaterialSource;
use quartermaster_core::{
    MaterialListFile, ReadThrough, StagingConfig, StagingTask, StaticSource,
};

use crate::error::EngineError;
use crate::scenario::{Scenario, demo_placement};

/// Application entry point for the demo engine.
///
/// # Errors
///
/// Returns an error if the configuration is unreadable or invalid, the
/// simulated world cannot be built, or the summary cannot be written.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let config_path = config_path();
    let config = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        config = %config_path.display(),
        preparation = ?config.preparation.mode,
        guard = config.guard.enabled,
        max_ticks = config.engine.max_ticks,
        seed = config.engine.seed,
        "quartermaster-engine starting"
    );

    // 3. Resolve the material source.
    let source = ReadThrough::new(
        MaterialListFile::from_config(&config.material_list),
        StaticSource::new(demo_placement()),
    );
    let placement = source.selected_placement().ok().flatten();
    let origin = placement
        .as_ref()
        .map_or_else(scenario::demo_origin, |p| p.origin);
    if let Some(placement) = &placement {
        info!(
            placement = %placement.name,
            origin = %placement.origin,
            lines = placement.total_unique_items(),
            "Material source resolved"
        );
    }

    // 4. Build the simulated world.
    let mut scenario = Scenario::build(
        origin,
        config.engine.seed,
        config.engine.hostile_spawn_per_mille,
    )
    .map_err(EngineError::from)?;
    info!(origin = %origin, "Simulated world built");

    // 5. Run the tick loop.
    let engine = config.engine.clone();
    let requested = placement.map(|p| p.name);
    let mut task = StagingTask::new(config, Box::new(source), requested);
    info!(run = %task.run_id(), "Staging task created");
    let summary = runner::run_staging(&mut task, &mut scenario, &engine).await;

    // 6. Print the run summary.
    let json = serde_json::to_string_pretty(&summary).map_err(EngineError::from)?;
    println!("{json}");

    info!(
        end_reason = ?summary.end_reason,
        total_ticks = summary.total_ticks,
        "quartermaster-engine shutdown complete"
    );
    Ok(())
}

/// The configuration path: `QUARTERMASTER_CONFIG` if set, otherwise
/// `quartermaster-config.yaml` in the working directory.
fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load and validate the configuration, falling back to defaults when the
/// file does not exist.
fn load_config(path: &Path) -> Result<StagingConfig, EngineError> {
    let config = if path.exists() {
        StagingConfig::from_file(path)?
    } else {
        StagingConfig::parse("")?
    };
    config.validate()?;
    Ok(config)
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
