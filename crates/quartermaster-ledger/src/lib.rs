//! Quantity ledger for the Quartermaster staging agent.
//!
//! Every material type being staged has exactly one [`StagingEntry`] in the
//! ledger. The entry reconciles four views of the same quantity: what the
//! bill of materials requires, what the agent carries, what has been handed
//! to a deposit sub-task but not yet confirmed, and what is stored (both as
//! tracked by confirmed deposits and as observed by the latest container
//! scan).
//!
//! # Modules
//!
//! - [`entry`] -- [`StagingEntry`]: per-type record and its derived quantities.
//! - [`normalize`] -- The fixed normalization policy applied on ingest.
//! - [`ledger`] -- [`QuantityLedger`]: ingest, reconcile, and pure queries.
//! - [`audit`] -- Accounting checks between two ledger snapshots.
//!
//! # Completion rule
//!
//! ```text
//! stored    = max(confirmed_stored, observed_in_storage)
//! remaining = max(0, total_required - stored - carried)
//! complete  = stored >= total_required
//! ```
//!
//! Taking the max of the tracked and the live-scanned value tolerates a
//! deposit that succeeded but was not seen by the scan, and a scan that saw
//! more than was tracked, without ever completing on stale tracking alone.
//!
//! # Usage
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use quartermaster_ledger::QuantityLedger;
//! use quartermaster_types::{MaterialId, MaterialRequirement};
//!
//! let stone = MaterialId::new("stone");
//! let mut ledger = QuantityLedger::new();
//! ledger.ingest(&[MaterialRequirement::new(stone.clone(), 200)]);
//!
//! // The agent carries 50 stone and the containers hold 100.
//! let stored = BTreeMap::from([(stone.clone(), 100)]);
//! ledger.reconcile(|_| 50, &stored);
//!
//! assert_eq!(ledger.remaining(&stone), 50);
//! assert!(!ledger.is_all_complete());
//! ```

pub mod audit;
pub mod entry;
pub mod ledger;
pub mod normalize;

// Re-export primary types at crate root.
pub use audit::{AuditResult, LedgerSnapshot};
pub use entry::StagingEntry;
pub use ledger::{IngestReport, Progress, QuantityLedger};

use std::collections::BTreeMap;

use quartermaster_types::MaterialId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when mutating ledger entries.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The material type has no entry in the ledger.
    #[error("material {0} is not tracked by the ledger")]
    UnknownMaterial(MaterialId),
}

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// An accounting violation detected between two ledger snapshots.
///
/// The state machine never mutates ledger quantities in ways that should
/// trigger this. It is logged rather than raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAnomaly {
    /// The tick at which the violation was detected.
    pub tick: u64,
    /// Offending materials mapped to `(before, after)` confirmed-stored
    /// counts. Types that appeared or vanished map their missing side to 0.
    pub violations: BTreeMap<MaterialId, (u64, u64)>,
    /// Human-readable description of the anomaly.
    pub message: String,
}

impl core::fmt::Display for LedgerAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}
