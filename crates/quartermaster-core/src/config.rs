//! Configuration loading and typed config structures for Quartermaster.
//!
//! The canonical configuration lives in `quartermaster-config.yaml` at the
//! project root. Every field has a default, so an empty file (or no file at
//! all) yields a working configuration. The numbers are tunable; the only
//! guarantee the staging machine relies on is that they are finite and
//! positive, which [`StagingConfig::validate`] enforces.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use quartermaster_world::SitePolicy;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "quartermaster-config.yaml";

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "QUARTERMASTER_CONFIG";

/// Environment variable overriding `material_list.directory`.
pub const MATERIAL_DIR_ENV: &str = "QUARTERMASTER_MATERIAL_DIR";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StagingConfig {
    /// Container count planning.
    #[serde(default)]
    pub capacity: CapacityConfig,

    /// Container search and placement.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Deposit retries.
    #[serde(default)]
    pub deposit: DepositConfig,

    /// Equipment preparation.
    #[serde(default)]
    pub preparation: PreparationConfig,

    /// Environmental danger detection and retreat.
    #[serde(default)]
    pub guard: GuardConfig,

    /// Progress reporting.
    #[serde(default)]
    pub progress: ProgressConfig,

    /// The material list file exchange.
    #[serde(default)]
    pub material_list: MaterialListConfig,

    /// Demo engine loop (binary only).
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StagingConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `QUARTERMASTER_MATERIAL_DIR` overrides `material_list.directory`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.material_list.apply_env_overrides();
        Ok(config)
    }

    /// Reject zero, inverted or otherwise unusable values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });
        if self.capacity.slots_per_container == 0 {
            return invalid("capacity.slots_per_container", "must be positive");
        }
        if self.capacity.min_containers == 0 {
            return invalid("capacity.min_containers", "must be positive");
        }
        if self.capacity.min_containers > self.capacity.max_containers_to_place {
            return invalid("capacity.min_containers", "must not exceed max_containers_to_place");
        }
        if self.storage.search_radius == 0 {
            return invalid("storage.search_radius", "must be positive");
        }
        if self.storage.min_placement_distance > self.storage.max_placement_distance {
            return invalid("storage.min_placement_distance", "must not exceed max_placement_distance");
        }
        if self.storage.max_placement_distance > MAX_PLACEMENT_DISTANCE {
            return invalid("storage.max_placement_distance", "must be at most 64");
        }
        if self.storage.max_placement_attempts == 0 {
            return invalid("storage.max_placement_attempts", "must be positive");
        }
        if self.deposit.max_deposit_attempts == 0 {
            return invalid("deposit.max_deposit_attempts", "must be positive");
        }
        if self.guard.poll_interval_ticks == 0 {
            return invalid("guard.poll_interval_ticks", "must be positive");
        }
        if self.guard.ring_step == 0 {
            return invalid("guard.ring_step", "must be positive");
        }
        if self.guard.ring_min > self.guard.ring_max {
            return invalid("guard.ring_min", "must not exceed ring_max");
        }
        if self.progress.report_interval_ticks == 0 {
            return invalid("progress.report_interval_ticks", "must be positive");
        }
        if self.engine.hostile_spawn_per_mille > 1000 {
            return invalid("engine.hostile_spawn_per_mille", "must be at most 1000");
        }
        Ok(())
    }
}

/// Upper bound on the placement sweep distance.
const MAX_PLACEMENT_DISTANCE: u32 = 64;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Container count planning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CapacityConfig {
    /// Item slots in one container.
    #[serde(default = "default_slots_per_container")]
    pub slots_per_container: u32,

    /// Extra containers added for overflow tolerance.
    #[serde(default = "default_buffer_containers")]
    pub buffer_containers: u32,

    /// Lower clamp of the container target.
    #[serde(default = "default_min_containers")]
    pub min_containers: u32,

    /// Upper clamp of the container target.
    #[serde(default = "default_max_containers_to_place")]
    pub max_containers_to_place: u32,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            slots_per_container: default_slots_per_container(),
            buffer_containers: default_buffer_containers(),
            min_containers: default_min_containers(),
            max_containers_to_place: default_max_containers_to_place(),
        }
    }
}

/// Container search and placement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Half-width of the cube scanned for existing containers.
    #[serde(default = "default_search_radius")]
    pub search_radius: u32,

    /// Nearest cardinal distance tried for a new container.
    #[serde(default = "default_min_placement_distance")]
    pub min_placement_distance: u32,

    /// Farthest cardinal distance tried for a new container.
    #[serde(default = "default_max_placement_distance")]
    pub max_placement_distance: u32,

    /// Vertical offsets tried at each distance, in both directions.
    #[serde(default = "default_vertical_band")]
    pub vertical_band: u32,

    /// Height of the fallback column above the origin.
    #[serde(default = "default_fallback_column_height")]
    pub fallback_column_height: u32,

    /// Candidates at or below this squared distance from a known container
    /// are rejected.
    #[serde(default = "default_min_container_spacing_sq")]
    pub min_container_spacing_sq: u32,

    /// Candidates closer than this to the origin are rejected.
    #[serde(default = "default_origin_clearance")]
    pub origin_clearance: u32,

    /// Placement attempts before the whole run is aborted.
    #[serde(default = "default_max_placement_attempts")]
    pub max_placement_attempts: u32,

    /// Placement attempts after which a failed search moves the agent
    /// toward the origin instead of wandering.
    #[serde(default = "default_wander_threshold")]
    pub wander_threshold: u32,

    /// Minimum ticks between placement attempts.
    #[serde(default = "default_placement_cooldown_ticks")]
    pub placement_cooldown_ticks: u64,

    /// Length of a wander request.
    #[serde(default = "default_wander_ticks")]
    pub wander_ticks: u64,

    /// East offset from the origin used when moving toward the search area.
    #[serde(default = "default_approach_offset")]
    pub approach_offset: i32,
}

impl StorageConfig {
    /// The placement-search geometry.
    pub const fn site_policy(&self) -> SitePolicy {
        SitePolicy {
            min_distance: self.min_placement_distance,
            max_distance: self.max_placement_distance,
            vertical_band: self.vertical_band,
            fallback_column_height: self.fallback_column_height,
            min_container_spacing_sq: self.min_container_spacing_sq,
            origin_clearance: self.origin_clearance,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            search_radius: default_search_radius(),
            min_placement_distance: default_min_placement_distance(),
            max_placement_distance: default_max_placement_distance(),
            vertical_band: default_vertical_band(),
            fallback_column_height: default_fallback_column_height(),
            min_container_spacing_sq: default_min_container_spacing_sq(),
            origin_clearance: default_origin_clearance(),
            max_placement_attempts: default_max_placement_attempts(),
            wander_threshold: default_wander_threshold(),
            placement_cooldown_ticks: default_placement_cooldown_ticks(),
            wander_ticks: default_wander_ticks(),
            approach_offset: default_approach_offset(),
        }
    }
}

/// Deposit retries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DepositConfig {
    /// Failed deposits into one container before it is dropped.
    #[serde(default = "default_max_deposit_attempts")]
    pub max_deposit_attempts: u32,

    /// Minimum ticks on one container before it may be dropped.
    #[serde(default = "default_deposit_cooldown_ticks")]
    pub deposit_cooldown_ticks: u64,
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            max_deposit_attempts: default_max_deposit_attempts(),
            deposit_cooldown_ticks: default_deposit_cooldown_ticks(),
        }
    }
}

/// Which preparation planner runs before storage acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreparationMode {
    /// Shield, weapon, category tools, crafting surface, food.
    #[default]
    Basic,
    /// The full tiered equipment ladder, then the basic planner.
    Ladder,
}

/// Equipment preparation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreparationConfig {
    /// Planner selection.
    #[serde(default)]
    pub mode: PreparationMode,

    /// Food score to reach before bulk gathering.
    #[serde(default = "default_food_units")]
    pub food_units: u32,

    /// Radius searched for an existing crafting table to pick up.
    #[serde(default = "default_crafting_table_pickup_radius")]
    pub crafting_table_pickup_radius: u32,

    /// Projected category volume above which the top tool tier is used.
    #[serde(default = "default_high_volume_threshold")]
    pub high_volume_threshold: u64,

    /// Extra raw ore mined beyond the exact ladder requirement.
    #[serde(default = "default_ore_buffer")]
    pub ore_buffer: u32,

    /// Extra fuel mined beyond the exact ladder requirement.
    #[serde(default = "default_fuel_buffer")]
    pub fuel_buffer: u32,

    /// Extra gems mined beyond the exact ladder requirement.
    #[serde(default)]
    pub gem_buffer: u32,
}

impl Default for PreparationConfig {
    fn default() -> Self {
        Self {
            mode: PreparationMode::default(),
            food_units: default_food_units(),
            crafting_table_pickup_radius: default_crafting_table_pickup_radius(),
            high_volume_threshold: default_high_volume_threshold(),
            ore_buffer: default_ore_buffer(),
            fuel_buffer: default_fuel_buffer(),
            gem_buffer: 0,
        }
    }
}

/// Environmental danger detection and retreat.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuardConfig {
    /// Whether the guard runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Ticks between danger assessments.
    #[serde(default = "default_poll_interval_ticks")]
    pub poll_interval_ticks: u64,

    /// Radius counted for hostiles when assessing danger.
    #[serde(default = "default_danger_radius")]
    pub danger_radius: u32,

    /// Danger when the hostile count exceeds this.
    #[serde(default = "default_hostile_threshold")]
    pub hostile_threshold: u32,

    /// Danger when health is below this (half-hearts).
    #[serde(default = "default_health_threshold")]
    pub health_threshold: u32,

    /// Radius counted for hostiles around a retreat candidate.
    #[serde(default = "default_safe_radius")]
    pub safe_radius: u32,

    /// A retreat candidate is safe when its hostile count is below this.
    #[serde(default = "default_safe_hostile_threshold")]
    pub safe_hostile_threshold: u32,

    /// Innermost retreat ring distance.
    #[serde(default = "default_ring_min")]
    pub ring_min: u32,

    /// Outermost retreat ring distance.
    #[serde(default = "default_ring_max")]
    pub ring_max: u32,

    /// Distance between retreat rings.
    #[serde(default = "default_ring_step")]
    pub ring_step: u32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ticks: default_poll_interval_ticks(),
            danger_radius: default_danger_radius(),
            hostile_threshold: default_hostile_threshold(),
            health_threshold: default_health_threshold(),
            safe_radius: default_safe_radius(),
            safe_hostile_threshold: default_safe_hostile_threshold(),
            ring_min: default_ring_min(),
            ring_max: default_ring_max(),
            ring_step: default_ring_step(),
        }
    }
}

/// Progress reporting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgressConfig {
    /// Ticks between progress log lines.
    #[serde(default = "default_report_interval_ticks")]
    pub report_interval_ticks: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            report_interval_ticks: default_report_interval_ticks(),
        }
    }
}

/// The material list file exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MaterialListConfig {
    /// Directory holding `material_list_*.txt` exports.
    #[serde(default = "default_material_dir")]
    pub directory: PathBuf,

    /// Exports older than this are ignored.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl MaterialListConfig {
    /// Apply `QUARTERMASTER_MATERIAL_DIR` if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(MATERIAL_DIR_ENV) {
            self.directory = PathBuf::from(val);
        }
    }
}

impl Default for MaterialListConfig {
    fn default() -> Self {
        Self {
            directory: default_material_dir(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

/// Demo engine loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Real-time milliseconds slept between ticks; 0 runs flat out.
    #[serde(default)]
    pub tick_interval_ms: u64,

    /// Ticks after which the run is stopped regardless of state.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Seed for simulated hostile spawns.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Chance per tick, in thousandths, that a hostile spawns near the
    /// agent. 0 disables spawning.
    #[serde(default = "default_hostile_spawn_per_mille")]
    pub hostile_spawn_per_mille: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 0,
            max_ticks: default_max_ticks(),
            seed: default_seed(),
            hostile_spawn_per_mille: default_hostile_spawn_per_mille(),
        }
    }
}

/// Logging output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_slots_per_container() -> u32 {
    27
}

const fn default_buffer_containers() -> u32 {
    2
}

const fn default_min_containers() -> u32 {
    1
}

const fn default_max_containers_to_place() -> u32 {
    10
}

const fn default_search_radius() -> u32 {
    15
}

const fn default_min_placement_distance() -> u32 {
    2
}

const fn default_max_placement_distance() -> u32 {
    10
}

const fn default_vertical_band() -> u32 {
    3
}

const fn default_fallback_column_height() -> u32 {
    5
}

const fn default_min_container_spacing_sq() -> u32 {
    2
}

const fn default_origin_clearance() -> u32 {
    3
}

const fn default_max_placement_attempts() -> u32 {
    50
}

const fn default_wander_threshold() -> u32 {
    10
}

const fn default_placement_cooldown_ticks() -> u64 {
    60
}

const fn default_wander_ticks() -> u64 {
    40
}

const fn default_approach_offset() -> i32 {
    5
}

const fn default_max_deposit_attempts() -> u32 {
    3
}

const fn default_deposit_cooldown_ticks() -> u64 {
    40
}

const fn default_food_units() -> u32 {
    20
}

const fn default_crafting_table_pickup_radius() -> u32 {
    50
}

const fn default_high_volume_threshold() -> u64 {
    500
}

const fn default_ore_buffer() -> u32 {
    4
}

const fn default_fuel_buffer() -> u32 {
    2
}

const fn default_true() -> bool {
    true
}

const fn default_poll_interval_ticks() -> u64 {
    10
}

const fn default_danger_radius() -> u32 {
    8
}

const fn default_hostile_threshold() -> u32 {
    2
}

const fn default_health_threshold() -> u32 {
    8
}

const fn default_safe_radius() -> u32 {
    16
}

const fn default_safe_hostile_threshold() -> u32 {
    1
}

const fn default_ring_min() -> u32 {
    8
}

const fn default_ring_max() -> u32 {
    32
}

const fn default_ring_step() -> u32 {
    4
}

const fn default_report_interval_ticks() -> u64 {
    200
}

fn default_material_dir() -> PathBuf {
    PathBuf::from("config/litematica")
}

const fn default_max_age_secs() -> u64 {
    300
}

const fn default_max_ticks() -> u64 {
    20_000
}

const fn default_seed() -> u64 {
    42
}

const fn default_hostile_spawn_per_mille() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_owned()
}
