//! Accounting audit between two ledger states.
//!
//! Within one staging run the set of tracked types never changes after
//! ingest, and `confirmed_stored` never decreases. The state machine takes
//! a [`LedgerSnapshot`] before each tick and audits the ledger after it:
//!
//! ```text
//! for each type T: confirmed_after(T) >= confirmed_before(T)
//! types_after == types_before
//! ```
//!
//! Both hold by construction. A violation produces a [`LedgerAnomaly`].

use std::collections::{BTreeMap, BTreeSet};

use quartermaster_types::MaterialId;

use crate::LedgerAnomaly;
use crate::ledger::QuantityLedger;

/// The result of auditing a ledger against an earlier snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditResult {
    /// Accounting is consistent.
    Consistent,
    /// One or more types broke an accounting rule.
    Anomaly(LedgerAnomaly),
}

/// Confirmed-stored quantities captured at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    confirmed: BTreeMap<MaterialId, u64>,
}

impl LedgerSnapshot {
    /// Capture the current confirmed-stored quantities of `ledger`.
    pub fn capture(ledger: &QuantityLedger) -> Self {
        Self {
            confirmed: ledger.confirmed_by_material(),
        }
    }

    /// Audit `ledger` against this snapshot.
    pub fn audit(&self, tick: u64, ledger: &QuantityLedger) -> AuditResult {
        let after = ledger.confirmed_by_material();
        let keys: BTreeSet<&MaterialId> = self.confirmed.keys().chain(after.keys()).collect();

        let mut violations = BTreeMap::new();
        for key in keys {
            match (self.confirmed.get(key), after.get(key)) {
                (Some(before), Some(now)) if now < before => {
                    violations.insert(key.clone(), (*before, *now));
                }
                (Some(before), None) => {
                    violations.insert(key.clone(), (*before, 0));
                }
                (None, Some(now)) => {
                    violations.insert(key.clone(), (0, *now));
                }
                _ => {}
            }
        }

        if violations.is_empty() {
            AuditResult::Consistent
        } else {
            let count = violations.len();
            AuditResult::Anomaly(LedgerAnomaly {
                tick,
                violations,
                message: format!(
                    "LEDGER_ANOMALY at tick {tick}: confirmed-stored accounting broke for {count} material(s)"
                ),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quartermaster_types::MaterialRequirement;

    fn ledger_with(raw: &[(&str, u64)]) -> QuantityLedger {
        let reqs: Vec<_> = raw
            .iter()
            .map(|(m, n)| MaterialRequirement::new(MaterialId::new(m), *n))
            .collect();
        let mut ledger = QuantityLedger::new();
        ledger.ingest(&reqs);
        ledger
    }

    #[test]
    fn deposit_cycle_is_consistent() {
        let mut ledger = ledger_with(&[("stone", 100)]);
        let snapshot = LedgerSnapshot::capture(&ledger);

        ledger.reconcile(|_| 20, &BTreeMap::new());
        ledger.begin_deposit();
        ledger.reconcile(|_| 0, &BTreeMap::new());
        ledger.confirm_deposits();

        assert_eq!(snapshot.audit(5, &ledger), AuditResult::Consistent);
    }

    #[test]
    fn reingest_is_flagged() {
        let mut ledger = ledger_with(&[("stone", 100)]);
        ledger.reconcile(|_| 20, &BTreeMap::new());
        ledger.begin_deposit();
        ledger.reconcile(|_| 0, &BTreeMap::new());
        ledger.confirm_deposits();
        let snapshot = LedgerSnapshot::capture(&ledger);

        ledger.ingest(&[MaterialRequirement::new(MaterialId::new("stone"), 100)]);

        let AuditResult::Anomaly(anomaly) = snapshot.audit(9, &ledger) else {
            panic!("expected anomaly");
        };
        assert_eq!(anomaly.tick, 9);
        assert_eq!(
            anomaly.violations.get(&MaterialId::new("stone")).copied(),
            Some((20, 0))
        );
    }

    #[test]
    fn type_set_change_is_flagged() {
        let ledger = ledger_with(&[("stone", 1)]);
        let snapshot = LedgerSnapshot::capture(&ledger);
        let other = ledger_with(&[("glass", 1)]);
        assert!(matches!(snapshot.audit(0, &other), AuditResult::Anomaly(a) if a.violations.len() == 2));
    }
}
