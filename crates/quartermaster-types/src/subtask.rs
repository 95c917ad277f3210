//! Sub-task requests handed to the external task-execution engine.
//!
//! The staging core never performs world interaction itself. Each poll it
//! either returns one of these opaque requests or nothing. The engine
//! de-duplicates by equality: returning a request equal to the one already
//! running does not restart it, so every variant derives [`PartialEq`] over
//! all of its arguments.

use serde::{Deserialize, Serialize};

use crate::material::MaterialId;
use crate::structs::{BlockPos, ItemCount};

/// A unit of work delegated to the external task engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubTask {
    /// Obtain `count` of `item` by whatever means the engine knows
    /// (mining, crafting, smelting chains).
    Acquire {
        /// The item to obtain.
        item: MaterialId,
        /// Target quantity held.
        count: u64,
    },
    /// Equip an already-held item (armor slot or off-hand).
    Equip {
        /// The item to equip.
        item: MaterialId,
    },
    /// Collect food until the inventory food score reaches `units`.
    CollectFood {
        /// Target food score.
        units: u32,
    },
    /// Break the block at `pos` and pick up its drop.
    BreakBlock {
        /// The block to break.
        pos: BlockPos,
    },
    /// Place `block` at `pos`.
    PlaceBlock {
        /// Where to place.
        pos: BlockPos,
        /// What to place.
        block: MaterialId,
    },
    /// Move every listed item into the container at `container`.
    StoreInContainer {
        /// The target container.
        container: BlockPos,
        /// What to store, one entry per material type.
        items: Vec<ItemCount>,
    },
    /// Smelt `count` of `input` into `output`.
    Smelt {
        /// The raw material.
        input: MaterialId,
        /// The refined product.
        output: MaterialId,
        /// How many to produce.
        count: u64,
    },
    /// Path to `pos`.
    MoveTo {
        /// The destination.
        pos: BlockPos,
    },
    /// Wander randomly for a bounded number of ticks.
    Wander {
        /// How long to wander.
        ticks: u64,
    },
}

impl SubTask {
    /// Whether this request is a container deposit.
    pub const fn is_deposit(&self) -> bool {
        matches!(self, Self::StoreInContainer { .. })
    }
}

impl core::fmt::Display for SubTask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Acquire { item, count } => write!(f, "acquire {count} {item}"),
            Self::Equip { item } => write!(f, "equip {item}"),
            Self::CollectFood { units } => write!(f, "collect {units} food"),
            Self::BreakBlock { pos } => write!(f, "break block at {pos}"),
            Self::PlaceBlock { pos, block } => write!(f, "place {block} at {pos}"),
            Self::StoreInContainer { container, items } => {
                write!(f, "store {} type(s) in container at {container}", items.len())
            }
            Self::Smelt {
                input,
                output,
                count,
            } => write!(f, "smelt {count} {input} into {output}"),
            Self::MoveTo { pos } => write!(f, "move to {pos}"),
            Self::Wander { ticks } => write!(f, "wander for {ticks} ticks"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_covers_arguments() {
        let a = SubTask::Acquire {
            item: MaterialId::new("stone"),
            count: 64,
        };
        let b = SubTask::Acquire {
            item: MaterialId::new("stone"),
            count: 64,
        };
        let c = SubTask::Acquire {
            item: MaterialId::new("stone"),
            count: 65,
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let task = SubTask::MoveTo {
            pos: BlockPos::new(1, 2, 3),
        };
        let json = serde_json::to_value(&task).ok();
        let kind = json
            .as_ref()
            .and_then(|v| v.get("kind"))
            .and_then(serde_json::Value::as_str);
        assert_eq!(kind, Some("move_to"));
    }

    #[test]
    fn deposit_detection() {
        let store = SubTask::StoreInContainer {
            container: BlockPos::default(),
            items: Vec::new(),
        };
        assert!(store.is_deposit());
        assert!(!SubTask::Wander { ticks: 10 }.is_deposit());
    }
}
