//! Bill-of-materials sources.
//!
//! [`MaterialSource`] is the one interface through which the staging machine
//! learns what to stage. How the list was produced is not its concern.
//!
//! # Sources
//!
//! - [`StaticSource`] -- an in-memory placement.
//! - [`MaterialListFile`] -- the newest `material_list_*.txt` export in a
//!   directory, ignored once older than a staleness window.
//! - [`ReadThrough`] -- a fresh export when there is one, otherwise a live
//!   source. The live source also supplies the name and origin for exports,
//!   which carry neither.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use quartermaster_types::{BlockPos, MaterialId, MaterialRequirement, PlacementInfo};

use crate::config::MaterialListConfig;

/// File name prefix of material list exports.
pub const MATERIAL_LIST_PREFIX: &str = "material_list_";
/// File name suffix of material list exports.
pub const MATERIAL_LIST_SUFFIX: &str = ".txt";
/// Name used for file-sourced placements when no live source can name them.
pub const UNKNOWN_PLACEMENT_NAME: &str = "Unknown Schematic";

/// Errors raised while reading a bill of materials.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A directory or file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// A provider of the placement to stage.
pub trait MaterialSource {
    /// Whether the source can currently provide anything at all.
    fn is_available(&self) -> bool;

    /// The currently selected placement, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the underlying data could not be read.
    fn selected_placement(&self) -> Result<Option<PlacementInfo>, SourceError>;
}

// ---------------------------------------------------------------------------
// StaticSource
// ---------------------------------------------------------------------------

/// A fixed placement held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticSource {
    placement: Option<PlacementInfo>,
}

impl StaticSource {
    /// A source that always returns `placement`.
    pub const fn new(placement: PlacementInfo) -> Self {
        Self {
            placement: Some(placement),
        }
    }

    /// A source with nothing selected.
    pub const fn empty() -> Self {
        Self { placement: None }
    }
}

impl MaterialSource for StaticSource {
    fn is_available(&self) -> bool {
        self.placement.is_some()
    }

    fn selected_placement(&self) -> Result<Option<PlacementInfo>, SourceError> {
        Ok(self.placement.clone())
    }
}

// ---------------------------------------------------------------------------
// Material list export
// ---------------------------------------------------------------------------

/// Convert an export's display name to a material identifier.
///
/// `"Oak Planks"` becomes `minecraft:oak_planks`; `"Jack o'Lantern"` becomes
/// `minecraft:jack_olantern`.
pub fn display_name_to_id(display_name: &str) -> MaterialId {
    let id: String = display_name
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\'' | '(' | ')'))
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();
    MaterialId::new(&id)
}

/// Parse the table format of a material list export.
///
/// Border lines and the title line are skipped. The header row containing
/// `Item`, `Total` and `Missing` opens the data section; data rows are
/// `| name | total | missing |`. Rows with non-numeric counts are skipped.
pub fn parse_material_list(contents: &str) -> Vec<MaterialRequirement> {
    let mut materials = Vec::new();
    let mut in_data = false;

    for line in contents.lines() {
        if line.starts_with('+') || line.starts_with("| Material List") {
            continue;
        }
        if line.contains("| Item") && line.contains("Total") && line.contains("Missing") {
            in_data = true;
            continue;
        }
        if line.trim().is_empty() || !in_data || !line.starts_with('|') {
            continue;
        }

        let mut cells = line.split('|').skip(1).map(str::trim);
        let (Some(name), Some(total), Some(missing)) = (cells.next(), cells.next(), cells.next())
        else {
            continue;
        };
        if name.is_empty() || name == "Item" {
            continue;
        }
        let (Ok(total), Ok(missing)) = (total.parse::<u64>(), missing.parse::<u64>()) else {
            tracing::debug!(line = line.trim(), "Skipping material list row with non-numeric count");
            continue;
        };

        let material = display_name_to_id(name);
        tracing::debug!(name, %material, total, missing, "Parsed material list row");
        materials.push(MaterialRequirement {
            material,
            total,
            missing,
        });
    }
    materials
}

/// A material list export found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialListExport {
    /// Where it was read from.
    pub path: PathBuf,
    /// When it was last written.
    pub modified: DateTime<Utc>,
    /// Its parsed rows.
    pub materials: Vec<MaterialRequirement>,
}

/// The newest material list export in a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialListFile {
    directory: PathBuf,
    max_age_secs: u64,
}

impl MaterialListFile {
    /// A reader over `directory` accepting exports up to `max_age_secs` old.
    pub const fn new(directory: PathBuf, max_age_secs: u64) -> Self {
        Self {
            directory,
            max_age_secs,
        }
    }

    /// A reader configured from the `material_list` section.
    pub fn from_config(config: &MaterialListConfig) -> Self {
        Self::new(config.directory.clone(), config.max_age_secs)
    }

    /// The directory searched.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The newest export and its modification time. `None` if the directory
    /// is missing or holds no exports.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if an existing directory cannot be listed.
    pub fn newest(&self) -> Result<Option<(PathBuf, DateTime<Utc>)>, SourceError> {
        if !self.directory.is_dir() {
            tracing::debug!(directory = %self.directory.display(), "Material list directory not found");
            return Ok(None);
        }
        let io_err = |source| SourceError::Io {
            path: self.directory.clone(),
            source,
        };

        let mut newest: Option<(PathBuf, DateTime<Utc>)> = None;
        for dir_entry in std::fs::read_dir(&self.directory).map_err(io_err)? {
            let dir_entry = dir_entry.map_err(io_err)?;
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.starts_with(MATERIAL_LIST_PREFIX) || !name.ends_with(MATERIAL_LIST_SUFFIX) {
                continue;
            }
            let modified: DateTime<Utc> = dir_entry
                .metadata()
                .and_then(|m| m.modified())
                .map_err(io_err)?
                .into();
            if newest.as_ref().is_none_or(|(_, best)| modified > *best) {
                newest = Some((dir_entry.path(), modified));
            }
        }
        Ok(newest)
    }

    /// Read the newest export if it is fresh relative to `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if the directory or the export cannot be
    /// read.
    pub fn load_fresh_at(&self, now: DateTime<Utc>) -> Result<Option<MaterialListExport>, SourceError> {
        let Some((path, modified)) = self.newest()? else {
            return Ok(None);
        };
        let age_secs = now.signed_duration_since(modified).num_seconds();
        let max_age = i64::try_from(self.max_age_secs).unwrap_or(i64::MAX);
        if age_secs >= max_age {
            tracing::info!(
                path = %path.display(),
                age_secs,
                max_age_secs = self.max_age_secs,
                "Material list export is stale, regenerate it"
            );
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;
        let materials = parse_material_list(&contents);
        tracing::info!(
            path = %path.display(),
            age_secs,
            rows = materials.len(),
            "Read material list export"
        );
        Ok(Some(MaterialListExport {
            path,
            modified,
            materials,
        }))
    }

    /// Read the newest export if it is fresh now.
    ///
    /// # Errors
    ///
    /// See [`MaterialListFile::load_fresh_at`].
    pub fn load_fresh(&self) -> Result<Option<MaterialListExport>, SourceError> {
        self.load_fresh_at(Utc::now())
    }
}

impl MaterialSource for MaterialListFile {
    fn is_available(&self) -> bool {
        self.directory.is_dir()
    }

    fn selected_placement(&self) -> Result<Option<PlacementInfo>, SourceError> {
        Ok(self
            .load_fresh()?
            .filter(|export| !export.materials.is_empty())
            .map(|export| PlacementInfo {
                name: UNKNOWN_PLACEMENT_NAME.to_owned(),
                origin: BlockPos::default(),
                materials: export.materials,
            }))
    }
}

// ---------------------------------------------------------------------------
// ReadThrough
// ---------------------------------------------------------------------------

/// A fresh export first, the live source otherwise.
#[derive(Debug, Clone)]
pub struct ReadThrough<L> {
    file: MaterialListFile,
    live: L,
}

impl<L: MaterialSource> ReadThrough<L> {
    /// Layer `file` over `live`.
    pub const fn new(file: MaterialListFile, live: L) -> Self {
        Self { file, live }
    }

    /// The live source.
    pub const fn live(&self) -> &L {
        &self.live
    }

    fn live_placement(&self) -> Option<PlacementInfo> {
        if !self.live.is_available() {
            return None;
        }
        match self.live.selected_placement() {
            Ok(placement) => placement,
            Err(e) => {
                tracing::warn!(error = %e, "Live material source failed");
                None
            }
        }
    }
}

impl<L: MaterialSource> MaterialSource for ReadThrough<L> {
    fn is_available(&self) -> bool {
        self.file.is_available() || self.live.is_available()
    }

    fn selected_placement(&self) -> Result<Option<PlacementInfo>, SourceError> {
        let export = match self.file.load_fresh() {
            Ok(export) => export.filter(|e| !e.materials.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Material list export unreadable, using live source");
                None
            }
        };
        let live = self.live_placement();

        Ok(match (export, live) {
            (Some(export), Some(live)) => Some(PlacementInfo {
                name: live.name,
                origin: live.origin,
                materials: export.materials,
            }),
            (Some(export), None) => Some(PlacementInfo {
                name: UNKNOWN_PLACEMENT_NAME.to_owned(),
                origin: BlockPos::default(),
                materials: export.materials,
            }),
            (None, live) => live,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
+-------------------------------+
| Material List for placement 'Tower' |
+-------------------------------+
| Item            | Total | Missing | Available |
+-------------------------------+
| Stone Bricks    |   512 |     400 |       112 |
| Oak Planks      |    64 |      64 |         0 |
| Jack o'Lantern  |     4 |       4 |         0 |
| Glass Pane      |  many |       1 |         0 |

| Red Sandstone (Smooth) | 8 | 8 | 0 |
+-------------------------------+
";

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("quartermaster-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn tower() -> PlacementInfo {
        PlacementInfo {
            name: "Tower".to_owned(),
            origin: BlockPos::new(100, 64, -20),
            materials: vec![MaterialRequirement::new(MaterialId::new("stone"), 1)],
        }
    }

    #[test]
    fn display_names_become_ids() {
        assert_eq!(display_name_to_id("Grass Block").as_str(), "minecraft:grass_block");
        assert_eq!(display_name_to_id("Jack o'Lantern").as_str(), "minecraft:jack_olantern");
        assert_eq!(display_name_to_id("Light-Blue Wool").as_str(), "minecraft:light_blue_wool");
        assert_eq!(display_name_to_id("create:Shaft").as_str(), "create:shaft");
    }

    #[test]
    fn parse_skips_borders_headers_and_bad_rows() {
        let rows = parse_material_list(EXPORT);
        let ids: Vec<_> = rows.iter().map(|r| r.material.as_str()).collect();
        assert_eq!(
            ids,
            [
                "minecraft:stone_bricks",
                "minecraft:oak_planks",
                "minecraft:jack_olantern",
                "minecraft:red_sandstone_smooth",
            ]
        );
        assert_eq!(rows.first().unwrap().total, 512);
        assert_eq!(rows.first().unwrap().missing, 400);
    }

    #[test]
    fn rows_before_header_are_ignored() {
        assert!(parse_material_list("| Stone | 5 | 5 |\n").is_empty());
    }

    #[test]
    fn newest_export_wins_and_stale_is_ignored() {
        let dir = scratch_dir();
        std::fs::write(dir.join("material_list_old.txt"), "").unwrap();
        std::fs::write(dir.join("notes.txt"), EXPORT).unwrap();
        let newest = dir.join("material_list_new.txt");
        std::fs::write(&newest, EXPORT).unwrap();
        let old = std::fs::File::options()
            .write(true)
            .open(dir.join("material_list_old.txt"))
            .unwrap();
        old.set_modified(std::time::SystemTime::UNIX_EPOCH).unwrap();

        let reader = MaterialListFile::new(dir.clone(), 300);
        let (path, modified) = reader.newest().unwrap().unwrap();
        assert_eq!(path, newest);

        let fresh = reader.load_fresh_at(modified).unwrap().unwrap();
        assert_eq!(fresh.materials.len(), 4);

        let later = modified.checked_add_signed(chrono::TimeDelta::seconds(300)).unwrap();
        assert!(reader.load_fresh_at(later).unwrap().is_none());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_directory_is_not_an_error() {
        let reader = MaterialListFile::new(PathBuf::from("/nonexistent/litematica"), 300);
        assert!(!reader.is_available());
        assert!(reader.selected_placement().unwrap().is_none());
    }

    #[test]
    fn read_through_prefers_fresh_export_with_live_name() {
        let dir = scratch_dir();
        std::fs::write(dir.join("material_list_tower.txt"), EXPORT).unwrap();
        let source = ReadThrough::new(MaterialListFile::new(dir.clone(), 300), StaticSource::new(tower()));

        let placement = source.selected_placement().unwrap().unwrap();
        assert_eq!(placement.name, "Tower");
        assert_eq!(placement.origin, BlockPos::new(100, 64, -20));
        assert_eq!(placement.materials.len(), 4);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn read_through_without_live_uses_fallback_name() {
        let dir = scratch_dir();
        std::fs::write(dir.join("material_list_tower.txt"), EXPORT).unwrap();
        let source = ReadThrough::new(MaterialListFile::new(dir.clone(), 300), StaticSource::empty());

        let placement = source.selected_placement().unwrap().unwrap();
        assert_eq!(placement.name, UNKNOWN_PLACEMENT_NAME);
        assert_eq!(placement.origin, BlockPos::default());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn read_through_falls_back_to_live() {
        let source = ReadThrough::new(
            MaterialListFile::new(PathBuf::from("/nonexistent/litematica"), 300),
            StaticSource::new(tower()),
        );
        assert!(source.is_available());
        assert_eq!(source.selected_placement().unwrap(), Some(tower()));
    }

    #[test]
    fn empty_static_source_is_unavailable() {
        let source = StaticSource::empty();
        assert!(!source.is_available());
        assert!(source.selected_placement().unwrap().is_none());
    }
}
