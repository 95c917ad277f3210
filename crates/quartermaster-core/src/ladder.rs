//! The equipment ladder: wood, stone, iron and diamond tiers in order.
//!
//! The ladder runs before the basic planner when preparation mode is
//! `ladder`. It computes the raw materials the agent's current equipment
//! gaps still need ([`ToolRequirement`]) and walks a fixed sequence of
//! sub-phases, each of which requests only the delta still missing. A
//! sub-phase with nothing left to do advances immediately, so a
//! well-equipped agent passes through the whole ladder in one poll.

use quartermaster_types::{
    ArmorSlot, MaterialCategory, MaterialId, SubTask, Tier, ToolKind, items,
    material::{armor_item, tool_item},
};
use quartermaster_ledger::QuantityLedger;
use quartermaster_world::InventoryView;

use crate::config::PreparationConfig;
use crate::planner::{Preparation, held_tier};

/// Planks per log.
const PLANKS_PER_LOG: u64 = 4;
/// Sticks produced by one stick recipe.
const STICKS_PER_RECIPE: u64 = 4;
/// Planks consumed by one stick recipe.
const PLANKS_PER_STICK_RECIPE: u64 = 2;
/// Planks in a crafting table.
const CRAFTING_TABLE_PLANKS: u64 = 4;
/// Cobblestone in a furnace.
const FURNACE_COBBLESTONE: u64 = 8;
/// Iron ingots in a pair of shears.
const SHEARS_INGOTS: u64 = 2;
/// Items smelted per unit of coal.
const SMELTS_PER_FUEL: u64 = 8;

/// Raw materials needed to close the agent's equipment gaps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolRequirement {
    /// Logs, for planks and sticks.
    pub structural_units: u64,
    /// Cobblestone, for stone tools and a furnace.
    pub stone_units: u64,
    /// Raw iron still to mine, buffer included.
    pub ore_units: u64,
    /// Coal still to mine, buffer included.
    pub fuel_units: u64,
    /// Diamonds still to mine, buffer included.
    pub gem_units: u64,
    /// Iron ingots the iron rung consumes in total.
    pub ingots_needed: u64,
    /// Diamonds the diamond rung consumes in total.
    pub gems_needed: u64,
}

fn missing_tools(inventory: &dyn InventoryView, tier: Tier) -> impl Iterator<Item = ToolKind> + '_ {
    ToolKind::ALL
        .into_iter()
        .filter(move |kind| held_tier(inventory, *kind).is_none_or(|held| held < tier))
}

fn missing_armor(inventory: &dyn InventoryView, tier: Tier) -> impl Iterator<Item = ArmorSlot> + '_ {
    ArmorSlot::ALL.into_iter().filter(move |slot| {
        !Tier::ALL
            .iter()
            .filter(|t| **t >= tier)
            .filter_map(|t| armor_item(*slot, *t))
            .any(|item| inventory.has_item(&item))
    })
}

fn sum_units<I: Iterator<Item = u32>>(units: I) -> u64 {
    units.fold(0_u64, |acc, u| acc.saturating_add(u64::from(u)))
}

/// A non-zero requirement plus its buffer; zero stays zero.
fn with_buffer(units: u64, buffer: u32) -> u64 {
    if units == 0 {
        0
    } else {
        units.saturating_add(u64::from(buffer))
    }
}

impl ToolRequirement {
    /// Compute the raw-material gaps for the current inventory.
    ///
    /// `needs_shears` adds a pair of shears to the iron rung.
    pub fn compute(
        inventory: &dyn InventoryView,
        config: &PreparationConfig,
        needs_shears: bool,
    ) -> Self {
        let count = |raw: &str| inventory.carried_count(&MaterialId::new(raw));

        // Wooden rung: head planks for kinds with no tool at all.
        let wooden_planks = sum_units(missing_tools(inventory, Tier::Wooden).map(ToolKind::head_units));

        // Sticks for every tool still to craft at any tier.
        let sticks = [Tier::Wooden, Tier::Stone, Tier::Iron, Tier::Diamond]
            .into_iter()
            .map(|tier| sum_units(missing_tools(inventory, tier).map(ToolKind::sticks)))
            .fold(0_u64, u64::saturating_add);
        let stick_planks = sticks
            .div_ceil(STICKS_PER_RECIPE)
            .saturating_mul(PLANKS_PER_STICK_RECIPE);

        let table_planks = if inventory.has_item(&MaterialId::new(items::CRAFTING_TABLE)) {
            0
        } else {
            CRAFTING_TABLE_PLANKS
        };
        let planks = wooden_planks
            .saturating_add(stick_planks)
            .saturating_add(table_planks);
        let structural_units = planks
            .div_ceil(PLANKS_PER_LOG)
            .saturating_sub(count(items::OAK_LOG));

        // Stone rung plus a furnace for smelting.
        let furnace = if inventory.has_item(&MaterialId::new(items::FURNACE)) {
            0
        } else {
            FURNACE_COBBLESTONE
        };
        let stone_units = sum_units(missing_tools(inventory, Tier::Stone).map(ToolKind::head_units))
            .saturating_add(furnace)
            .saturating_sub(count(items::COBBLESTONE));

        // Iron rung: tools, armor, optional shears.
        let shears = if needs_shears && !inventory.has_item(&MaterialId::new(items::SHEARS)) {
            SHEARS_INGOTS
        } else {
            0
        };
        let ingots_needed = sum_units(missing_tools(inventory, Tier::Iron).map(ToolKind::head_units))
            .saturating_add(sum_units(missing_armor(inventory, Tier::Iron).map(ArmorSlot::units)))
            .saturating_add(shears);
        let ore_gap = ingots_needed
            .saturating_sub(count(items::IRON_INGOT))
            .saturating_sub(count(items::RAW_IRON));
        let ore_units = with_buffer(ore_gap, config.ore_buffer);
        let fuel_gap = ore_units
            .div_ceil(SMELTS_PER_FUEL)
            .saturating_sub(count(items::COAL));
        let fuel_units = with_buffer(fuel_gap, config.fuel_buffer);

        // Diamond rung.
        let gems_needed = sum_units(missing_tools(inventory, Tier::Diamond).map(ToolKind::head_units))
            .saturating_add(sum_units(missing_armor(inventory, Tier::Diamond).map(ArmorSlot::units)));
        let gem_units = with_buffer(
            gems_needed.saturating_sub(count(items::DIAMOND)),
            config.gem_buffer,
        );

        Self {
            structural_units,
            stone_units,
            ore_units,
            fuel_units,
            gem_units,
            ingots_needed,
            gems_needed,
        }
    }
}

/// Sub-phases of the ladder, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LadderPhase {
    /// Chop logs for planks and sticks.
    #[default]
    GatherStructural,
    /// Mine cobblestone for stone tools and a furnace.
    GatherStone,
    /// Mine raw iron and coal.
    MineOreAndFuel,
    /// Smelt raw iron into ingots.
    Smelt,
    /// Craft and equip the iron set.
    CraftIronSet,
    /// Mine diamonds.
    MineGems,
    /// Craft and equip the diamond set.
    CraftGemSet,
    /// The ladder is complete.
    Done,
}

impl LadderPhase {
    const fn next(self) -> Self {
        match self {
            Self::GatherStructural => Self::GatherStone,
            Self::GatherStone => Self::MineOreAndFuel,
            Self::MineOreAndFuel => Self::Smelt,
            Self::Smelt => Self::CraftIronSet,
            Self::CraftIronSet => Self::MineGems,
            Self::MineGems => Self::CraftGemSet,
            Self::CraftGemSet | Self::Done => Self::Done,
        }
    }
}

/// Progress through the ladder for one staging run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EquipmentLadder {
    phase: LadderPhase,
}

impl EquipmentLadder {
    /// A ladder at its first sub-phase.
    pub const fn new() -> Self {
        Self {
            phase: LadderPhase::GatherStructural,
        }
    }

    /// The current sub-phase.
    pub const fn phase(&self) -> LadderPhase {
        self.phase
    }

    /// Restart from the first sub-phase.
    pub const fn reset(&mut self) {
        self.phase = LadderPhase::GatherStructural;
    }

    /// The next ladder sub-task, advancing past satisfied sub-phases.
    pub fn step(
        &mut self,
        config: &PreparationConfig,
        ledger: &QuantityLedger,
        inventory: &dyn InventoryView,
    ) -> Preparation {
        let needs_shears = ledger.entries().iter().any(|e| {
            e.remaining() > 0 && e.material.category() == Some(MaterialCategory::Shearable)
        });
        let req = ToolRequirement::compute(inventory, config, needs_shears);

        while self.phase != LadderPhase::Done {
            if let Some(task) = self.phase_task(&req, inventory, needs_shears) {
                return Preparation::Next(task);
            }
            let next = self.phase.next();
            tracing::debug!(from = ?self.phase, to = ?next, "Equipment ladder advanced");
            self.phase = next;
        }
        Preparation::Done
    }

    fn phase_task(
        &self,
        req: &ToolRequirement,
        inventory: &dyn InventoryView,
        needs_shears: bool,
    ) -> Option<SubTask> {
        let held = |raw: &str| inventory.carried_count(&MaterialId::new(raw));
        let acquire = |raw: &str, count: u64| SubTask::Acquire {
            item: MaterialId::new(raw),
            count,
        };
        match self.phase {
            LadderPhase::GatherStructural => (req.structural_units > 0)
                .then(|| acquire(items::OAK_LOG, held(items::OAK_LOG).saturating_add(req.structural_units))),
            LadderPhase::GatherStone => (req.stone_units > 0)
                .then(|| acquire(items::COBBLESTONE, held(items::COBBLESTONE).saturating_add(req.stone_units))),
            LadderPhase::MineOreAndFuel => {
                if req.ore_units > 0 {
                    Some(acquire(items::RAW_IRON, held(items::RAW_IRON).saturating_add(req.ore_units)))
                } else if req.fuel_units > 0 {
                    Some(acquire(items::COAL, held(items::COAL).saturating_add(req.fuel_units)))
                } else {
                    None
                }
            }
            LadderPhase::Smelt => {
                let raw = held(items::RAW_IRON);
                let short = req.ingots_needed.saturating_sub(held(items::IRON_INGOT));
                (raw > 0 && short > 0).then(|| SubTask::Smelt {
                    input: MaterialId::new(items::RAW_IRON),
                    output: MaterialId::new(items::IRON_INGOT),
                    count: raw.min(short),
                })
            }
            LadderPhase::CraftIronSet => {
                let shears = (needs_shears && !inventory.has_item(&MaterialId::new(items::SHEARS)))
                    .then(|| MaterialId::new(items::SHEARS));
                craft_set(inventory, Tier::Iron, shears)
            }
            LadderPhase::MineGems => {
                (req.gem_units > 0).then(|| acquire(items::DIAMOND, held(items::DIAMOND).saturating_add(req.gem_units)))
            }
            LadderPhase::CraftGemSet => craft_set(inventory, Tier::Diamond, None),
            LadderPhase::Done => None,
        }
    }
}

/// Acquire the first missing piece of the `tier` set, or equip the first
/// held but unworn armor piece.
fn craft_set(inventory: &dyn InventoryView, tier: Tier, extra: Option<MaterialId>) -> Option<SubTask> {
    let tool = missing_tools(inventory, tier).next().map(|kind| tool_item(kind, tier));
    let armor = missing_armor(inventory, tier)
        .next()
        .and_then(|slot| armor_item(slot, tier));
    if let Some(item) = tool.or(armor).or(extra) {
        return Some(SubTask::Acquire { item, count: 1 });
    }
    ArmorSlot::ALL
        .into_iter()
        .filter_map(|slot| armor_item(slot, tier))
        .find(|item| inventory.has_item(item) && !inventory.is_equipped(item))
        .map(|item| SubTask::Equip { item })
}
