//! Storage capacity planning.
//!
//! ```text
//! slots      = sum over types of ceil(total_required / stack_limit)
//! containers = ceil(slots / slots_per_container) + buffer_containers
//! target     = clamp(containers, min_containers, max_containers_to_place)
//! ```
//!
//! A pure function of the ledger snapshot. The staging machine computes it
//! once per run and caches the result.

use quartermaster_ledger::QuantityLedger;

use crate::config::CapacityConfig;

/// Container slots needed to hold every required unit.
pub fn required_slots(ledger: &QuantityLedger) -> u64 {
    ledger.entries().iter().fold(0_u64, |acc, e| {
        let per_slot = u64::from(e.material.stack_limit().max(1));
        acc.saturating_add(e.total_required.div_ceil(per_slot))
    })
}

/// Number of containers the run should secure before gathering.
pub fn required_containers(ledger: &QuantityLedger, config: &CapacityConfig) -> u32 {
    let slots = required_slots(ledger);
    let per_container = u64::from(config.slots_per_container.max(1));
    let containers = slots
        .div_ceil(per_container)
        .saturating_add(u64::from(config.buffer_containers));
    let containers = u32::try_from(containers).unwrap_or(u32::MAX);
    containers.clamp(
        config.min_containers,
        config.max_containers_to_place.max(config.min_containers),
    )
}
