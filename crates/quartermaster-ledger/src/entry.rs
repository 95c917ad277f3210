//! Per-material staging record.

use serde::{Deserialize, Serialize};

use quartermaster_types::MaterialId;

/// Reconciled quantities for one material type.
///
/// `total_required` is fixed at ingest. `confirmed_stored` only grows, and
/// only through [`StagingEntry::confirm_deposit`]. `carried` and
/// `observed_in_storage` are overwritten on every reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingEntry {
    /// Canonical material identifier, after normalization.
    pub material: MaterialId,
    /// Quantity the build needs.
    pub total_required: u64,
    /// Quantity known to have been deposited by this run.
    pub confirmed_stored: u64,
    /// Quantity seen in live storage containers on the last scan.
    pub observed_in_storage: u64,
    /// Quantity in the agent's inventory on the last reconciliation.
    pub carried: u64,
    /// Quantity handed to a deposit sub-task and not yet confirmed.
    pub pending_deposit: u64,
    /// Whether a gather request for this type is outstanding in the current
    /// gather cycle.
    pub gather_in_progress: bool,
}

impl StagingEntry {
    /// A fresh entry with nothing stored, carried or pending.
    pub const fn new(material: MaterialId, total_required: u64) -> Self {
        Self {
            material,
            total_required,
            confirmed_stored: 0,
            observed_in_storage: 0,
            carried: 0,
            pending_deposit: 0,
            gather_in_progress: false,
        }
    }

    /// The stored quantity used for completion: the larger of tracked and
    /// observed.
    pub const fn stored(&self) -> u64 {
        if self.confirmed_stored > self.observed_in_storage {
            self.confirmed_stored
        } else {
            self.observed_in_storage
        }
    }

    /// Quantity still to gather, never negative.
    pub const fn remaining(&self) -> u64 {
        self.total_required
            .saturating_sub(self.stored())
            .saturating_sub(self.carried)
    }

    /// Whether storage alone satisfies the requirement.
    pub const fn is_complete(&self) -> bool {
        self.stored() >= self.total_required
    }

    /// Whether this type should receive a gather request in the current
    /// sweep.
    pub const fn needs_gathering(&self) -> bool {
        !self.is_complete() && !self.gather_in_progress && self.remaining() > 0
    }

    /// Record that the carried quantity was handed to a deposit sub-task.
    ///
    /// Re-issuing the same deposit never shrinks the pending amount.
    pub const fn begin_deposit(&mut self) {
        if self.carried > self.pending_deposit {
            self.pending_deposit = self.carried;
        }
    }

    /// Fold the pending deposit into `confirmed_stored` once nothing of this
    /// type is carried any more. Returns the amount folded.
    pub const fn confirm_deposit(&mut self) -> u64 {
        if self.carried > 0 || self.pending_deposit == 0 {
            return 0;
        }
        let folded = self.pending_deposit;
        self.confirmed_stored = self.confirmed_stored.saturating_add(folded);
        self.pending_deposit = 0;
        folded
    }
}
