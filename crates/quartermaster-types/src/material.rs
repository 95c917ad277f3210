//! Material identifiers and the static material catalog.
//!
//! A material is identified by a namespaced game identifier such as
//! `minecraft:stone`. [`MaterialId::new`] canonicalizes raw input (case,
//! missing namespace) so two spellings of the same item compare equal.
//!
//! The catalog answers the handful of questions the staging core needs
//! about a material without consulting the game: how many fit in one
//! container slot, which gathering category it falls in, and the item
//! names of tools and armor per tier.

use serde::{Deserialize, Serialize};

use crate::enums::{ArmorSlot, MaterialCategory, Tier, ToolKind};

/// Namespace applied to identifiers that omit one.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Default maximum stack size for ordinary items.
pub const DEFAULT_STACK_LIMIT: u32 = 64;

/// A canonical material-type identifier (`namespace:path`, lowercase).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(String);

impl MaterialId {
    /// Build a canonical identifier from raw input.
    ///
    /// Surrounding whitespace is trimmed, the identifier is lowercased, and
    /// the `minecraft:` namespace is added when none is present.
    pub fn new(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        if lowered.contains(':') {
            Self(lowered)
        } else {
            Self(format!("{DEFAULT_NAMESPACE}:{lowered}"))
        }
    }

    /// The full identifier, including namespace.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier without its namespace.
    pub fn path(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(_, path)| path)
    }

    /// Per-type stack limit: how many units fit in one container slot.
    pub fn stack_limit(&self) -> u32 {
        let path = self.path();
        if is_unstackable(path) {
            1
        } else if SIXTEEN_STACKS.contains(&path) || path.ends_with("_sign") || path.ends_with("_banner")
        {
            16
        } else {
            DEFAULT_STACK_LIMIT
        }
    }

    /// Gathering category, if the material belongs to one.
    pub fn category(&self) -> Option<MaterialCategory> {
        let path = self.path();
        if STONE_LIKE.contains(&path) {
            Some(MaterialCategory::StoneLike)
        } else if ORE_LIKE.contains(&path) {
            Some(MaterialCategory::OreLike)
        } else if SOIL_LIKE.contains(&path) {
            Some(MaterialCategory::SoilLike)
        } else if path == "cobweb" || path.ends_with("_wool") || path.ends_with("_leaves") {
            Some(MaterialCategory::Shearable)
        } else if path.contains("planks") || path.contains("log") || path.contains("wood") {
            Some(MaterialCategory::WoodLike)
        } else {
            None
        }
    }
}

impl core::fmt::Display for MaterialId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MaterialId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

// ---------------------------------------------------------------------------
// Catalog tables
// ---------------------------------------------------------------------------

const STONE_LIKE: &[&str] = &[
    "stone",
    "cobblestone",
    "stone_bricks",
    "smooth_stone",
    "andesite",
    "diorite",
    "granite",
    "deepslate",
    "cobbled_deepslate",
];

const ORE_LIKE: &[&str] = &[
    "iron_ingot",
    "gold_ingot",
    "copper_ingot",
    "diamond",
    "emerald",
    "coal",
    "redstone",
    "lapis_lazuli",
];

const SOIL_LIKE: &[&str] = &[
    "dirt",
    "grass_block",
    "sand",
    "red_sand",
    "gravel",
    "clay",
    "soul_sand",
    "soul_soil",
    "podzol",
    "mycelium",
    "coarse_dirt",
];

const SIXTEEN_STACKS: &[&str] = &[
    "ender_pearl",
    "snowball",
    "egg",
    "bucket",
    "honey_bottle",
    "armor_stand",
];

const UNSTACKABLE_SUFFIXES: &[&str] = &[
    "_pickaxe",
    "_axe",
    "_shovel",
    "_hoe",
    "_sword",
    "_helmet",
    "_chestplate",
    "_leggings",
    "_boots",
    "_bucket",
    "_boat",
    "_bed",
    "_shulker_box",
];

const UNSTACKABLE: &[&str] = &[
    "shield",
    "shears",
    "bow",
    "crossbow",
    "trident",
    "flint_and_steel",
    "fishing_rod",
    "saddle",
    "elytra",
    "totem_of_undying",
    "shulker_box",
];

fn is_unstackable(path: &str) -> bool {
    UNSTACKABLE.contains(&path) || UNSTACKABLE_SUFFIXES.iter().any(|s| path.ends_with(s))
}

// ---------------------------------------------------------------------------
// Equipment names
// ---------------------------------------------------------------------------

/// Item identifier of a tool of the given kind and tier.
pub fn tool_item(kind: ToolKind, tier: Tier) -> MaterialId {
    MaterialId(format!(
        "{DEFAULT_NAMESPACE}:{}_{}",
        tier.prefix(),
        kind.suffix()
    ))
}

/// Item identifier of an armor piece, or `None` below iron tier.
pub fn armor_item(slot: ArmorSlot, tier: Tier) -> Option<MaterialId> {
    tier.has_armor().then(|| {
        MaterialId(format!(
            "{DEFAULT_NAMESPACE}:{}_{}",
            tier.prefix(),
            slot.suffix()
        ))
    })
}

/// Well-known item identifiers used by the planners.
pub mod items {
    /// Defensive off-hand item.
    pub const SHIELD: &str = "minecraft:shield";
    /// Portable crafting surface.
    pub const CRAFTING_TABLE: &str = "minecraft:crafting_table";
    /// Storage container block and item.
    pub const CHEST: &str = "minecraft:chest";
    /// Trapped variant, counted as a storage container when scanning.
    pub const TRAPPED_CHEST: &str = "minecraft:trapped_chest";
    /// Shearing tool.
    pub const SHEARS: &str = "minecraft:shears";
    /// Structural material for the wooden ladder rung.
    pub const OAK_LOG: &str = "minecraft:oak_log";
    /// Stone-tier head material.
    pub const COBBLESTONE: &str = "minecraft:cobblestone";
    /// Ore mined for the iron rung.
    pub const RAW_IRON: &str = "minecraft:raw_iron";
    /// Refined ore.
    pub const IRON_INGOT: &str = "minecraft:iron_ingot";
    /// Smelting fuel.
    pub const COAL: &str = "minecraft:coal";
    /// Highest-tier gem.
    pub const DIAMOND: &str = "minecraft:diamond";
    /// Smelting station.
    pub const FURNACE: &str = "minecraft:furnace";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_path_gets_default_namespace() {
        assert_eq!(MaterialId::new("Stone").as_str(), "minecraft:stone");
        assert_eq!(MaterialId::new("  minecraft:DIRT ").as_str(), "minecraft:dirt");
    }

    #[test]
    fn foreign_namespace_is_preserved() {
        let id = MaterialId::new("create:andesite_alloy");
        assert_eq!(id.as_str(), "create:andesite_alloy");
        assert_eq!(id.path(), "andesite_alloy");
    }

    #[test]
    fn stack_limits_follow_catalog() {
        assert_eq!(MaterialId::new("stone").stack_limit(), 64);
        assert_eq!(MaterialId::new("ender_pearl").stack_limit(), 16);
        assert_eq!(MaterialId::new("oak_sign").stack_limit(), 16);
        assert_eq!(MaterialId::new("iron_pickaxe").stack_limit(), 1);
        assert_eq!(MaterialId::new("water_bucket").stack_limit(), 1);
        assert_eq!(MaterialId::new("shield").stack_limit(), 1);
    }

    #[test]
    fn categories_follow_catalog() {
        assert_eq!(
            MaterialId::new("cobbled_deepslate").category(),
            Some(MaterialCategory::StoneLike)
        );
        assert_eq!(
            MaterialId::new("spruce_planks").category(),
            Some(MaterialCategory::WoodLike)
        );
        assert_eq!(MaterialId::new("coal").category(), Some(MaterialCategory::OreLike));
        assert_eq!(MaterialId::new("podzol").category(), Some(MaterialCategory::SoilLike));
        assert_eq!(
            MaterialId::new("mangrove_leaves").category(),
            Some(MaterialCategory::Shearable)
        );
        assert_eq!(MaterialId::new("red_wool").category(), Some(MaterialCategory::Shearable));
        assert_eq!(MaterialId::new("glass").category(), None);
    }

    #[test]
    fn equipment_names() {
        assert_eq!(
            tool_item(ToolKind::Pickaxe, Tier::Wooden).as_str(),
            "minecraft:wooden_pickaxe"
        );
        assert_eq!(
            armor_item(ArmorSlot::Boots, Tier::Diamond).map(|m| m.to_string()),
            Some("minecraft:diamond_boots".to_owned())
        );
        assert!(armor_item(ArmorSlot::Helmet, Tier::Stone).is_none());
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&MaterialId::new("sand"));
        assert_eq!(json.ok().as_deref(), Some("\"minecraft:sand\""));
    }
}
