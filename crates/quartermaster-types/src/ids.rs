//! Type-safe identifier wrapper around [`Uuid`].
//!
//! Staging runs get a UUID v7 (time-ordered) so log lines and run summaries
//! from successive runs sort naturally.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one staging run (one task instance lifetime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StagingRunId(pub Uuid);

impl StagingRunId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for StagingRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for StagingRunId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for StagingRunId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_unique() {
        let a = StagingRunId::new();
        let b = StagingRunId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn display_matches_uuid() {
        let id = StagingRunId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
