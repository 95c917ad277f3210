//! Error types for the demo engine binary.
//!
//! [`EngineError`] wraps every failure mode of engine startup and of
//! writing the run summary, so `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: quartermaster_core::ConfigError,
    },

    /// Building the simulated world failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: quartermaster_world::WorldError,
    },

    /// The run summary could not be serialized.
    #[error("summary error: {source}")]
    Summary {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Why the simulated executor could not carry out a sub-task.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// The simulated world or inventory refused the change.
    #[error(transparent)]
    World(#[from] quartermaster_world::WorldError),

    /// A destructive sub-task targeted a protected position.
    #[error("position {0} is protected")]
    Protected(quartermaster_types::BlockPos),
}
