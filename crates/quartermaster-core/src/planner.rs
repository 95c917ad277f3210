//! Preparation planner: equipment the agent needs before bulk gathering.
//!
//! A fixed priority list, each step gated by a predicate over the current
//! inventory. The first unmet step produces a sub-task; when every step is
//! met the planner reports [`Preparation::Done`]. Nothing is remembered
//! between polls, so re-entering after an interruption simply re-checks.
//!
//! 1. Defensive off-hand item, acquired then equipped.
//! 2. A melee weapon of any tier.
//! 3. Gathering tools sized to the materials still to gather.
//! 4. A portable crafting surface, picked up nearby when one exists.
//! 5. Food reserves, last, so the tools above make hunting efficient.

use std::collections::BTreeMap;

use quartermaster_ledger::QuantityLedger;
use quartermaster_types::{
    MaterialCategory, MaterialId, SubTask, Tier, ToolKind, items, material::tool_item,
};
use quartermaster_world::{InventoryView, WorldView};

use crate::config::PreparationConfig;

/// Outcome of one planner poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preparation {
    /// Execute this sub-task next.
    Next(SubTask),
    /// Every preparation step is satisfied.
    Done,
}

/// Tier used for any category whose projected volume crosses the
/// high-volume threshold.
pub const TOP_TIER: Tier = Tier::Diamond;

/// A tool the agent must hold for one gathering category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolNeed {
    /// A tool of `kind` at `tier` or better.
    Tiered(ToolKind, Tier),
    /// Shears; they have no tiers.
    Shears,
}

impl ToolNeed {
    /// The item requested when the need is unmet.
    pub fn item(self) -> MaterialId {
        match self {
            Self::Tiered(kind, tier) => tool_item(kind, tier),
            Self::Shears => MaterialId::new(items::SHEARS),
        }
    }

    /// Whether the inventory already satisfies the need.
    pub fn is_met(self, inventory: &dyn InventoryView) -> bool {
        match self {
            Self::Tiered(kind, tier) => held_tier(inventory, kind).is_some_and(|held| held >= tier),
            Self::Shears => inventory.has_item(&MaterialId::new(items::SHEARS)),
        }
    }
}

/// The highest tier of `kind` the agent holds.
pub fn held_tier(inventory: &dyn InventoryView, kind: ToolKind) -> Option<Tier> {
    Tier::ALL
        .iter()
        .rev()
        .copied()
        .find(|tier| inventory.has_item(&tool_item(kind, *tier)))
}

/// The tool a category needs, given how much of it is still to gather.
pub fn tool_for(category: MaterialCategory, volume: u64, high_volume_threshold: u64) -> ToolNeed {
    let base = match category {
        MaterialCategory::StoneLike => ToolNeed::Tiered(ToolKind::Pickaxe, Tier::Iron),
        MaterialCategory::WoodLike => ToolNeed::Tiered(ToolKind::Axe, Tier::Iron),
        MaterialCategory::OreLike => ToolNeed::Tiered(ToolKind::Pickaxe, Tier::Diamond),
        MaterialCategory::SoilLike => ToolNeed::Tiered(ToolKind::Shovel, Tier::Stone),
        MaterialCategory::Shearable => ToolNeed::Shears,
    };
    match base {
        ToolNeed::Tiered(kind, _) if volume > high_volume_threshold => {
            ToolNeed::Tiered(kind, TOP_TIER)
        }
        other => other,
    }
}

/// Remaining volume per gathering category, over every ledger entry.
pub fn category_volumes(ledger: &QuantityLedger) -> BTreeMap<MaterialCategory, u64> {
    let mut volumes: BTreeMap<MaterialCategory, u64> = BTreeMap::new();
    for entry in ledger.entries() {
        let remaining = entry.remaining();
        if remaining == 0 {
            continue;
        }
        if let Some(category) = entry.material.category() {
            let slot = volumes.entry(category).or_insert(0);
            *slot = slot.saturating_add(remaining);
        }
    }
    volumes
}

/// The basic preparation planner.
#[derive(Debug, Clone, Copy)]
pub struct PreparationPlanner<'a> {
    config: &'a PreparationConfig,
}

impl<'a> PreparationPlanner<'a> {
    /// A planner using `config`.
    pub const fn new(config: &'a PreparationConfig) -> Self {
        Self { config }
    }

    /// The next preparation sub-task, or [`Preparation::Done`].
    pub fn next(
        &self,
        ledger: &QuantityLedger,
        inventory: &dyn InventoryView,
        world: &dyn WorldView,
    ) -> Preparation {
        Self::shield(inventory)
            .or_else(|| Self::weapon(inventory))
            .or_else(|| self.gathering_tools(ledger, inventory))
            .or_else(|| self.crafting_surface(inventory, world))
            .or_else(|| self.food(inventory))
            .map_or(Preparation::Done, Preparation::Next)
    }

    fn shield(inventory: &dyn InventoryView) -> Option<SubTask> {
        let shield = MaterialId::new(items::SHIELD);
        if !inventory.has_item(&shield) {
            tracing::debug!("Getting shield for defense");
            Some(SubTask::Acquire {
                item: shield,
                count: 1,
            })
        } else if !inventory.is_equipped(&shield) {
            tracing::debug!("Equipping shield to off-hand");
            Some(SubTask::Equip { item: shield })
        } else {
            None
        }
    }

    fn weapon(inventory: &dyn InventoryView) -> Option<SubTask> {
        held_tier(inventory, ToolKind::Sword).is_none().then(|| {
            tracing::debug!("Getting sword for hunting");
            SubTask::Acquire {
                item: tool_item(ToolKind::Sword, Tier::Stone),
                count: 1,
            }
        })
    }

    fn gathering_tools(
        &self,
        ledger: &QuantityLedger,
        inventory: &dyn InventoryView,
    ) -> Option<SubTask> {
        category_volumes(ledger)
            .into_iter()
            .map(|(category, volume)| {
                (
                    category,
                    volume,
                    tool_for(category, volume, self.config.high_volume_threshold),
                )
            })
            .find(|(_, _, need)| !need.is_met(inventory))
            .map(|(category, volume, need)| {
                let item = need.item();
                tracing::debug!(?category, volume, tool = %item, "Getting gathering tool");
                SubTask::Acquire { item, count: 1 }
            })
    }

    fn crafting_surface(
        &self,
        inventory: &dyn InventoryView,
        world: &dyn WorldView,
    ) -> Option<SubTask> {
        let table = MaterialId::new(items::CRAFTING_TABLE);
        if inventory.has_item(&table) {
            return None;
        }
        let nearby = world.nearest_block(
            inventory.position(),
            &table,
            self.config.crafting_table_pickup_radius,
        );
        Some(match nearby {
            Some(pos) => {
                tracing::debug!(table = %pos, "Picking up nearby crafting table");
                SubTask::BreakBlock { pos }
            }
            None => SubTask::Acquire {
                item: table,
                count: 1,
            },
        })
    }

    fn food(&self, inventory: &dyn InventoryView) -> Option<SubTask> {
        (inventory.food_score() < self.config.food_units).then(|| {
            tracing::debug!(have = inventory.food_score(), "Getting food");
            SubTask::CollectFood {
                units: self.config.food_units,
            }
        })
    }
}
