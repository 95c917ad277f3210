//! The quantity ledger: one [`StagingEntry`] per normalized material type.
//!
//! The [`QuantityLedger`] is rebuilt from a bill of materials at the start
//! of every staging run and discarded when the run ends. Entries keep the
//! order in which their type first appeared in the bill, so gather sweeps
//! walk materials in a stable, producer-defined order.
//!
//! # Design
//!
//! - **Merge on ingest**: duplicate post-normalization types sum their totals.
//! - **Observations are overwritten**: `carried` and `observed_in_storage`
//!   come from the latest reconciliation only.
//! - **Confirmation is monotone**: `confirmed_stored` grows only when a
//!   pending deposit is folded in.
//! - **Queries are pure**: `remaining`, `is_complete` and `is_all_complete`
//!   never mutate.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use quartermaster_types::{ItemCount, MaterialId, MaterialRequirement};

use crate::LedgerError;
use crate::entry::StagingEntry;
use crate::normalize::normalize;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What [`QuantityLedger::ingest`] did with its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IngestReport {
    /// Requirement lines read.
    pub lines: usize,
    /// Lines removed by normalization.
    pub dropped: usize,
    /// Lines merged into an entry created by an earlier line.
    pub merged: usize,
    /// Distinct entries after ingest.
    pub entries: usize,
}

/// Aggregate completion figures for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    /// Material types whose requirement is met by storage.
    pub complete_types: usize,
    /// Material types tracked.
    pub total_types: usize,
    /// Sum over types of `min(stored, required)`.
    pub staged_units: u64,
    /// Sum over types of `required`.
    pub required_units: u64,
}

impl Progress {
    /// Staged units as a percentage of required units, two decimal places.
    ///
    /// An empty requirement counts as fully staged.
    pub fn percent(&self) -> Decimal {
        if self.required_units == 0 {
            return Decimal::ONE_HUNDRED;
        }
        Decimal::from(self.staged_units)
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|scaled| scaled.checked_div(Decimal::from(self.required_units)))
            .map_or(Decimal::ZERO, |pct| pct.round_dp(2))
    }
}

// ---------------------------------------------------------------------------
// QuantityLedger
// ---------------------------------------------------------------------------

/// Reconciled required, carried, in-flight and stored quantities for every
/// material type of one staging run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityLedger {
    entries: Vec<StagingEntry>,
}

impl QuantityLedger {
    /// An empty ledger.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Replace the ledger's contents with entries built from `requirements`.
    ///
    /// Each requirement is normalized; dropped materials are skipped and
    /// duplicate types are merged by summing their totals (saturating).
    pub fn ingest(&mut self, requirements: &[MaterialRequirement]) -> IngestReport {
        self.entries.clear();
        let mut report = IngestReport {
            lines: requirements.len(),
            ..IngestReport::default()
        };

        for requirement in requirements {
            let Some(material) = normalize(&requirement.material) else {
                tracing::debug!(material = %requirement.material, "Dropping unstageable material");
                report.dropped = report.dropped.saturating_add(1);
                continue;
            };
            if let Some(existing) = self.entries.iter_mut().find(|e| e.material == material) {
                existing.total_required = existing.total_required.saturating_add(requirement.total);
                report.merged = report.merged.saturating_add(1);
            } else {
                self.entries
                    .push(StagingEntry::new(material, requirement.total));
            }
        }

        report.entries = self.entries.len();
        report
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Refresh `carried` from the inventory and `observed_in_storage` from a
    /// tally of all live storage containers.
    ///
    /// The tally is keyed by raw container item identifiers; they are
    /// normalized before being matched against entries.
    pub fn reconcile<F>(&mut self, carried: F, storage_tally: &BTreeMap<MaterialId, u64>)
    where
        F: Fn(&MaterialId) -> u64,
    {
        let mut observed: BTreeMap<MaterialId, u64> = BTreeMap::new();
        for (material, count) in storage_tally {
            if let Some(key) = normalize(material) {
                let slot = observed.entry(key).or_insert(0);
                *slot = slot.saturating_add(*count);
            }
        }

        for entry in &mut self.entries {
            entry.carried = carried(&entry.material);
            entry.observed_in_storage = observed.get(&entry.material).copied().unwrap_or(0);
        }
    }

    // -----------------------------------------------------------------------
    // Pure queries
    // -----------------------------------------------------------------------

    /// All entries in ingest order.
    pub fn entries(&self) -> &[StagingEntry] {
        &self.entries
    }

    /// The entry for `material`, if tracked.
    pub fn get(&self, material: &MaterialId) -> Option<&StagingEntry> {
        self.entries.iter().find(|e| &e.material == material)
    }

    /// Number of tracked material types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no material types are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Quantity of `material` still to gather; zero for untracked types.
    pub fn remaining(&self, material: &MaterialId) -> u64 {
        self.get(material).map_or(0, StagingEntry::remaining)
    }

    /// Whether `material` is satisfied by storage; untracked types are.
    pub fn is_complete(&self, material: &MaterialId) -> bool {
        self.get(material).is_none_or(StagingEntry::is_complete)
    }

    /// Whether every tracked type is satisfied by storage.
    pub fn is_all_complete(&self) -> bool {
        self.entries.iter().all(StagingEntry::is_complete)
    }

    /// The first entry, in ingest order, that should receive a gather
    /// request in the current sweep.
    pub fn next_to_gather(&self) -> Option<&StagingEntry> {
        self.entries.iter().find(|e| e.needs_gathering())
    }

    /// Entries the agent currently carries any of.
    pub fn carried_entries(&self) -> impl Iterator<Item = &StagingEntry> {
        self.entries.iter().filter(|e| e.carried > 0)
    }

    /// Whether any type is carried.
    pub fn carries_anything(&self) -> bool {
        self.carried_entries().next().is_some()
    }

    /// Snapshot of confirmed-stored quantities, keyed by material.
    pub fn confirmed_by_material(&self) -> BTreeMap<MaterialId, u64> {
        self.entries
            .iter()
            .map(|e| (e.material.clone(), e.confirmed_stored))
            .collect()
    }

    /// Aggregate completion figures.
    pub fn progress(&self) -> Progress {
        self.entries.iter().fold(
            Progress {
                total_types: self.entries.len(),
                ..Progress::default()
            },
            |mut acc, e| {
                if e.is_complete() {
                    acc.complete_types = acc.complete_types.saturating_add(1);
                }
                acc.staged_units = acc
                    .staged_units
                    .saturating_add(e.stored().min(e.total_required));
                acc.required_units = acc.required_units.saturating_add(e.total_required);
                acc
            },
        )
    }

    // -----------------------------------------------------------------------
    // Mutations driven by the state machine
    // -----------------------------------------------------------------------

    /// Flag `material` as having an outstanding gather request.
    pub fn mark_gathering(&mut self, material: &MaterialId) -> Result<(), LedgerError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| &e.material == material)
            .ok_or_else(|| LedgerError::UnknownMaterial(material.clone()))?;
        entry.gather_in_progress = true;
        Ok(())
    }

    /// Clear every `gather_in_progress` flag.
    pub fn clear_gather_flags(&mut self) {
        for entry in &mut self.entries {
            entry.gather_in_progress = false;
        }
    }

    /// Record a deposit of everything carried and return the composite
    /// request contents, one [`ItemCount`] per carried type.
    pub fn begin_deposit(&mut self) -> Vec<ItemCount> {
        self.entries
            .iter_mut()
            .filter(|e| e.carried > 0)
            .map(|e| {
                e.begin_deposit();
                ItemCount {
                    material: e.material.clone(),
                    count: e.carried,
                }
            })
            .collect()
    }

    /// Fold every pending deposit whose type is no longer carried into
    /// `confirmed_stored`. Returns what was confirmed.
    pub fn confirm_deposits(&mut self) -> Vec<ItemCount> {
        self.entries
            .iter_mut()
            .filter_map(|e| {
                let folded = e.confirm_deposit();
                (folded > 0).then(|| ItemCount {
                    material: e.material.clone(),
                    count: folded,
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn req(raw: &str, total: u64) -> MaterialRequirement {
        MaterialRequirement::new(MaterialId::new(raw), total)
    }

    fn id(raw: &str) -> MaterialId {
        MaterialId::new(raw)
    }

    #[test]
    fn ingest_merges_and_drops() {
        let mut ledger = QuantityLedger::new();
        let report = ledger.ingest(&[
            req("dirt", 10),
            req("grass_block", 5),
            req("water_bucket", 3),
            req("stone", 64),
            req("podzol", 1),
        ]);
        assert_eq!(report.lines, 5);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.merged, 2);
        assert_eq!(report.entries, 2);
        assert_eq!(ledger.get(&id("dirt")).unwrap().total_required, 16);
        assert!(ledger.get(&id("water_bucket")).is_none());
    }

    #[test]
    fn ingest_preserves_total_minus_dropped() {
        let input = [
            req("stone", 200),
            req("oak_planks", 33),
            req("lava_bucket", 2),
            req("coarse_dirt", 7),
            req("stone", 1),
        ];
        let mut ledger = QuantityLedger::new();
        ledger.ingest(&input);
        let merged: u64 = ledger.entries().iter().map(|e| e.total_required).sum();
        assert_eq!(merged, 200 + 33 + 7 + 1);
    }

    #[test]
    fn ingest_replaces_previous_contents() {
        let mut ledger = QuantityLedger::new();
        ledger.ingest(&[req("stone", 5)]);
        ledger.ingest(&[req("glass", 5)]);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.get(&id("stone")).is_none());
    }

    #[test]
    fn empty_after_normalization_is_complete() {
        let mut ledger = QuantityLedger::new();
        ledger.ingest(&[req("water_bucket", 1)]);
        assert!(ledger.is_empty());
        assert!(ledger.is_all_complete());
    }

    #[test]
    fn reconcile_normalizes_the_storage_tally() {
        let mut ledger = QuantityLedger::new();
        ledger.ingest(&[req("dirt", 20)]);
        let tally = BTreeMap::from([(id("dirt"), 4), (id("grass_block"), 6)]);
        ledger.reconcile(|_| 3, &tally);
        let dirt = ledger.get(&id("dirt")).unwrap();
        assert_eq!(dirt.observed_in_storage, 10);
        assert_eq!(dirt.carried, 3);
        assert_eq!(ledger.remaining(&id("dirt")), 7);
    }

    #[test]
    fn completion_iff_every_entry_is_stored() {
        let mut ledger = QuantityLedger::new();
        ledger.ingest(&[req("stone", 10), req("glass", 5)]);
        let tally = BTreeMap::from([(id("stone"), 10)]);
        ledger.reconcile(|_| 0, &tally);
        assert!(ledger.is_complete(&id("stone")));
        assert!(!ledger.is_all_complete());

        let tally = BTreeMap::from([(id("stone"), 10), (id("glass"), 5)]);
        ledger.reconcile(|_| 0, &tally);
        assert!(ledger.is_all_complete());
    }

    #[test]
    fn next_to_gather_skips_flagged_and_complete() {
        let mut ledger = QuantityLedger::new();
        ledger.ingest(&[req("stone", 10), req("glass", 5), req("sand", 3)]);
        ledger.reconcile(|_| 0, &BTreeMap::from([(id("stone"), 10)]));
        assert_eq!(ledger.next_to_gather().unwrap().material, id("glass"));

        ledger.mark_gathering(&id("glass")).unwrap();
        assert_eq!(ledger.next_to_gather().unwrap().material, id("sand"));

        ledger.mark_gathering(&id("sand")).unwrap();
        assert!(ledger.next_to_gather().is_none());

        ledger.clear_gather_flags();
        assert_eq!(ledger.next_to_gather().unwrap().material, id("glass"));
    }

    #[test]
    fn mark_gathering_rejects_unknown_material() {
        let mut ledger = QuantityLedger::new();
        assert_eq!(
            ledger.mark_gathering(&id("stone")),
            Err(LedgerError::UnknownMaterial(id("stone")))
        );
    }

    #[test]
    fn deposit_round_trip_confirms_exactly_what_was_carried() {
        let mut ledger = QuantityLedger::new();
        ledger.ingest(&[req("stone", 200), req("glass", 20)]);
        ledger.reconcile(|m| if m == &id("stone") { 64 } else { 7 }, &BTreeMap::new());

        let items = ledger.begin_deposit();
        assert_eq!(items.len(), 2);
        assert_eq!(ledger.get(&id("stone")).unwrap().pending_deposit, 64);

        ledger.reconcile(|_| 0, &BTreeMap::new());
        let confirmed = ledger.confirm_deposits();
        assert_eq!(confirmed, items);
        assert_eq!(ledger.get(&id("stone")).unwrap().confirmed_stored, 64);
        assert_eq!(ledger.get(&id("glass")).unwrap().confirmed_stored, 7);
        assert!(ledger.entries().iter().all(|e| e.pending_deposit == 0));
    }

    #[test]
    fn progress_serializes_as_plain_counts() {
        let mut ledger = QuantityLedger::new();
        ledger.ingest(&[req("stone", 100), req("glass", 50)]);
        let tally = BTreeMap::from([(id("glass"), 50)]);
        ledger.reconcile(|_| 0, &tally);

        let json = serde_json::to_value(ledger.progress()).unwrap();
        assert_eq!(json.get("complete_types"), Some(&serde_json::json!(1)));
        assert_eq!(json.get("total_types"), Some(&serde_json::json!(2)));
        assert_eq!(json.get("staged_units"), Some(&serde_json::json!(50)));
        assert_eq!(json.get("required_units"), Some(&serde_json::json!(150)));
    }

    #[test]
    fn progress_caps_overfilled_types() {
        let mut ledger = QuantityLedger::new();
        ledger.ingest(&[req("stone", 100), req("glass", 100)]);
        let tally = BTreeMap::from([(id("stone"), 150), (id("glass"), 25)]);
        ledger.reconcile(|_| 0, &tally);
        let progress = ledger.progress();
        assert_eq!(progress.complete_types, 1);
        assert_eq!(progress.total_types, 2);
        assert_eq!(progress.staged_units, 125);
        assert_eq!(progress.percent(), Decimal::new(6250, 2));
    }

    #[test]
    fn progress_of_empty_ledger_is_full() {
        assert_eq!(QuantityLedger::new().progress().percent(), Decimal::ONE_HUNDRED);
    }
}
