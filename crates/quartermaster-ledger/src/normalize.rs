//! Fixed normalization policy applied to requirements on ingest.
//!
//! Two rules, neither configurable:
//!
//! - Bucketed fluids are dropped. They cannot be staged as discrete
//!   inventory items.
//! - Decorative topsoil variants fold into plain dirt. They are texture-only
//!   variants and interchangeable for construction.

use quartermaster_types::MaterialId;

/// Materials removed from the ledger entirely.
const DROPPED: &[&str] = &["minecraft:water_bucket", "minecraft:lava_bucket"];

/// Topsoil variants folded into [`SOIL_BASE`].
const SOIL_VARIANTS: &[&str] = &[
    "minecraft:grass_block",
    "minecraft:podzol",
    "minecraft:mycelium",
    "minecraft:coarse_dirt",
];

/// The base soil type variants fold into.
const SOIL_BASE: &str = "minecraft:dirt";

/// Canonical ledger identifier for `material`, or `None` if the material is
/// dropped.
pub fn normalize(material: &MaterialId) -> Option<MaterialId> {
    let id = material.as_str();
    if DROPPED.contains(&id) {
        None
    } else if SOIL_VARIANTS.contains(&id) {
        Some(MaterialId::new(SOIL_BASE))
    } else {
        Some(material.clone())
    }
}

/// Whether `material` is removed by normalization.
pub fn is_dropped(material: &MaterialId) -> bool {
    normalize(material).is_none()
}
