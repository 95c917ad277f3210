//! Enumeration types for the Quartermaster staging agent.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Staging phases
// ---------------------------------------------------------------------------

/// A named state of the top-level staging state machine.
///
/// `Complete` is terminal. Every other phase is re-entered on each poll
/// until its handler advances the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StagePhase {
    /// Ingest the bill of materials into the ledger.
    Init,
    /// Acquire equipment before bulk gathering.
    PrepareTools,
    /// Find existing containers or place new ones near the origin.
    FindOrPlaceStorage,
    /// Rescan and confirm the container target is still met.
    ValidateStorage,
    /// Gather outstanding materials.
    Gather,
    /// Move carried materials into a staging container.
    Deposit,
    /// Terminal: the run succeeded or gave up.
    Complete,
}

impl StagePhase {
    /// Whether the global completion check runs at the top of this phase.
    pub const fn checks_completion(self) -> bool {
        matches!(self, Self::Gather | Self::Deposit)
    }

    /// Whether this phase is terminal.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl core::fmt::Display for StagePhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::PrepareTools => "PREPARE_TOOLS",
            Self::FindOrPlaceStorage => "FIND_OR_PLACE_STORAGE",
            Self::ValidateStorage => "VALIDATE_STORAGE",
            Self::Gather => "GATHER",
            Self::Deposit => "DEPOSIT",
            Self::Complete => "COMPLETE",
        };
        f.write_str(name)
    }
}

/// Why a staging run terminated without satisfying the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbortReason {
    /// No bill of materials was available when the run started.
    NoPlacementSelected,
    /// Container placement exceeded its hard attempt ceiling.
    PlacementAttemptsExhausted,
}

// ---------------------------------------------------------------------------
// Sub-task status
// ---------------------------------------------------------------------------

/// Status of the sub-task returned on the previous poll, as reported by
/// the external task engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SubTaskStatus {
    /// No sub-task was returned on the previous poll.
    #[default]
    Idle,
    /// The sub-task is still executing.
    Active,
    /// The sub-task reported itself finished.
    Finished,
    /// The engine gave up on the sub-task.
    TimedOut,
}

impl SubTaskStatus {
    /// Whether the previous sub-task has stopped running, for any reason.
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Finished | Self::TimedOut)
    }
}

// ---------------------------------------------------------------------------
// Materials and equipment
// ---------------------------------------------------------------------------

/// Gathering category of a material, used to pick the tool for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MaterialCategory {
    /// Stone and its cut/variant blocks (pickaxe).
    StoneLike,
    /// Logs, planks and other wood (axe).
    WoodLike,
    /// Ores and their refined products (good pickaxe).
    OreLike,
    /// Dirt, sand, gravel and friends (shovel).
    SoilLike,
    /// Wool, leaves, cobweb (shears).
    Shearable,
}

/// Equipment material tier, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Wooden tools.
    Wooden,
    /// Stone tools.
    Stone,
    /// Iron tools and armor.
    Iron,
    /// Diamond tools and armor.
    Diamond,
    /// Netherite tools and armor.
    Netherite,
}

impl Tier {
    /// All tiers, weakest first.
    pub const ALL: [Self; 5] = [
        Self::Wooden,
        Self::Stone,
        Self::Iron,
        Self::Diamond,
        Self::Netherite,
    ];

    /// The item-name prefix used by the game for this tier.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Wooden => "wooden",
            Self::Stone => "stone",
            Self::Iron => "iron",
            Self::Diamond => "diamond",
            Self::Netherite => "netherite",
        }
    }

    /// Whether armor exists at this tier in the staging ladder.
    pub const fn has_armor(self) -> bool {
        matches!(self, Self::Iron | Self::Diamond | Self::Netherite)
    }
}

/// A hand tool or weapon kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    /// Mines stone and ore.
    Pickaxe,
    /// Chops wood.
    Axe,
    /// Digs soil.
    Shovel,
    /// Melee weapon.
    Sword,
}

impl ToolKind {
    /// All tool kinds in crafting order.
    pub const ALL: [Self; 4] = [Self::Pickaxe, Self::Axe, Self::Shovel, Self::Sword];

    /// The item-name suffix used by the game for this kind.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Pickaxe => "pickaxe",
            Self::Axe => "axe",
            Self::Shovel => "shovel",
            Self::Sword => "sword",
        }
    }

    /// Head material units (planks, cobblestone, ingots, gems) per tool.
    pub const fn head_units(self) -> u32 {
        match self {
            Self::Pickaxe | Self::Axe => 3,
            Self::Sword => 2,
            Self::Shovel => 1,
        }
    }

    /// Sticks per tool.
    pub const fn sticks(self) -> u32 {
        match self {
            Self::Pickaxe | Self::Axe | Self::Shovel => 2,
            Self::Sword => 1,
        }
    }
}

/// An armor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArmorSlot {
    /// Head.
    Helmet,
    /// Torso.
    Chestplate,
    /// Legs.
    Leggings,
    /// Feet.
    Boots,
}

impl ArmorSlot {
    /// All armor slots, head first.
    pub const ALL: [Self; 4] = [Self::Helmet, Self::Chestplate, Self::Leggings, Self::Boots];

    /// The item-name suffix used by the game for this slot.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Helmet => "helmet",
            Self::Chestplate => "chestplate",
            Self::Leggings => "leggings",
            Self::Boots => "boots",
        }
    }

    /// Material units (ingots or gems) per piece.
    pub const fn units(self) -> u32 {
        match self {
            Self::Helmet => 5,
            Self::Chestplate => 8,
            Self::Leggings => 7,
            Self::Boots => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_gather_and_deposit_check_completion() {
        assert!(StagePhase::Gather.checks_completion());
        assert!(StagePhase::Deposit.checks_completion());
        assert!(!StagePhase::Init.checks_completion());
        assert!(!StagePhase::ValidateStorage.checks_completion());
        assert!(!StagePhase::Complete.checks_completion());
    }

    #[test]
    fn tiers_order_weakest_first() {
        assert!(Tier::Wooden < Tier::Stone);
        assert!(Tier::Iron < Tier::Diamond);
        assert!(Tier::Diamond < Tier::Netherite);
    }

    #[test]
    fn full_armor_set_costs_24_units() {
        let total: u32 = ArmorSlot::ALL.iter().map(|s| s.units()).sum();
        assert_eq!(total, 24);
    }

    #[test]
    fn phase_display_uses_upper_snake_case() {
        assert_eq!(StagePhase::FindOrPlaceStorage.to_string(), "FIND_OR_PLACE_STORAGE");
    }

    #[test]
    fn status_done_covers_finished_and_timed_out() {
        assert!(SubTaskStatus::Finished.is_done());
        assert!(SubTaskStatus::TimedOut.is_done());
        assert!(!SubTaskStatus::Active.is_done());
        assert!(!SubTaskStatus::Idle.is_done());
    }
}
