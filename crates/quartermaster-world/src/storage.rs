//! Storage containers: scanning, the active set, and placement search.
//!
//! A scan is the only source of truth for which containers exist. A
//! placement request is never trusted until a later scan finds the
//! container, and a tracked container is dropped from the [`StorageSet`] the
//! moment a scan finds its position no longer holds one.
//!
//! # Placement search
//!
//! Candidates are visited at increasing cardinal distance from the origin,
//! and for each distance through a vertical band from top to bottom. If the
//! sweep finds nothing, a column directly above the origin is tried. Every
//! candidate passes through the same validator:
//!
//! 1. Not already attempted this run.
//! 2. Outside the clearance radius around the origin.
//! 3. Not within the minimum spacing of a known container.
//! 4. Free to place into.
//! 5. Not in or over a fluid.
//! 6. Resting on a solid block.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use quartermaster_types::{BlockPos, MaterialId};

use crate::error::WorldError;
use crate::geometry::{Cuboid, cardinal_offsets};
use crate::sense::WorldView;

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// Every container within the cube of half-width `radius` around `origin`,
/// sorted by position.
///
/// # Errors
///
/// Returns [`WorldError::RegionOverflow`] if the region leaves the
/// coordinate range.
pub fn scan_nearby(
    world: &dyn WorldView,
    origin: BlockPos,
    radius: u32,
) -> Result<Vec<BlockPos>, WorldError> {
    let region = Cuboid::around(origin, radius)?;
    let mut found = world.containers_in(&region);
    found.sort_unstable();
    found.dedup();
    Ok(found)
}

// ---------------------------------------------------------------------------
// StorageSet
// ---------------------------------------------------------------------------

/// The containers the current staging run deposits into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSet {
    sites: Vec<BlockPos>,
}

impl StorageSet {
    /// An empty set.
    pub const fn new() -> Self {
        Self { sites: Vec::new() }
    }

    /// Tracked positions, in insertion order.
    pub fn positions(&self) -> &[BlockPos] {
        &self.sites
    }

    /// Number of tracked containers.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Whether no containers are tracked.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Whether `pos` is tracked.
    pub fn contains(&self, pos: BlockPos) -> bool {
        self.sites.contains(&pos)
    }

    /// Track `pos`. Returns `false` if it already was.
    pub fn insert(&mut self, pos: BlockPos) -> bool {
        if self.contains(pos) {
            return false;
        }
        self.sites.push(pos);
        true
    }

    /// Stop tracking `pos`. Returns `false` if it was not tracked.
    pub fn remove(&mut self, pos: BlockPos) -> bool {
        let before = self.sites.len();
        self.sites.retain(|p| *p != pos);
        self.sites.len() != before
    }

    /// Stop tracking everything.
    pub fn clear(&mut self) {
        self.sites.clear();
    }

    /// Drop every tracked position that no longer holds a container and
    /// return the dropped positions.
    pub fn prune_dead(&mut self, world: &dyn WorldView) -> Vec<BlockPos> {
        let (live, dead): (Vec<BlockPos>, Vec<BlockPos>) =
            self.sites.iter().partition(|p| world.is_container(**p));
        for pos in &dead {
            tracing::warn!(container = %pos, "Staging container vanished, dropping it");
        }
        self.sites = live;
        dead
    }

    /// The nearest live container to `from` by squared distance, pruning
    /// dead containers as a side effect. Ties go to the earlier-tracked one.
    pub fn best(&mut self, world: &dyn WorldView, from: BlockPos) -> Option<BlockPos> {
        self.prune_dead(world);
        self.sites
            .iter()
            .copied()
            .min_by_key(|p| p.distance_sq(from))
    }

    /// Sum of the contents of every tracked container that still exists.
    pub fn tally(&self, world: &dyn WorldView) -> BTreeMap<MaterialId, u64> {
        let mut totals: BTreeMap<MaterialId, u64> = BTreeMap::new();
        for contents in self.sites.iter().filter_map(|p| world.container_contents(*p)) {
            for (material, count) in contents {
                let slot = totals.entry(material).or_insert(0);
                *slot = slot.saturating_add(count);
            }
        }
        totals
    }
}

// ---------------------------------------------------------------------------
// Placement search
// ---------------------------------------------------------------------------

/// Geometry limits of the placement search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitePolicy {
    /// Nearest cardinal distance from the origin to try.
    pub min_distance: u32,
    /// Farthest cardinal distance from the origin to try.
    pub max_distance: u32,
    /// Vertical offsets `-band..=band` are tried at each distance.
    pub vertical_band: u32,
    /// Height of the fallback column above the origin.
    pub fallback_column_height: u32,
    /// Candidates at squared distance at or below this from a known
    /// container are rejected.
    pub min_container_spacing_sq: u32,
    /// Candidates strictly closer than this to the origin are rejected.
    pub origin_clearance: u32,
}

impl Default for SitePolicy {
    fn default() -> Self {
        Self {
            min_distance: 2,
            max_distance: 10,
            vertical_band: 3,
            fallback_column_height: 5,
            min_container_spacing_sq: 2,
            origin_clearance: 3,
        }
    }
}

/// Why a placement candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Already attempted this run.
    AlreadyAttempted,
    /// Inside the clearance radius around the origin.
    InsideOriginClearance,
    /// Too close to an existing container.
    TooCloseToContainer,
    /// The space is occupied.
    NotPlaceable,
    /// In or over a fluid.
    OverLiquid,
    /// Nothing solid underneath.
    NoSupport,
}

/// Validate one placement candidate.
///
/// # Errors
///
/// Returns the first [`Rejection`] the candidate hits, in the order listed
/// in the module documentation.
pub fn check_candidate(
    world: &dyn WorldView,
    candidate: BlockPos,
    origin: BlockPos,
    policy: &SitePolicy,
    attempted: &BTreeSet<BlockPos>,
    known: &[BlockPos],
) -> Result<(), Rejection> {
    let clearance = i64::from(policy.origin_clearance);
    let spacing = i64::from(policy.min_container_spacing_sq);
    let below = candidate.down();

    if attempted.contains(&candidate) {
        Err(Rejection::AlreadyAttempted)
    } else if candidate.distance_sq(origin) < clearance.saturating_mul(clearance) {
        Err(Rejection::InsideOriginClearance)
    } else if known.iter().any(|c| c.distance_sq(candidate) <= spacing) {
        Err(Rejection::TooCloseToContainer)
    } else if !world.can_place(candidate) {
        Err(Rejection::NotPlaceable)
    } else if world.is_liquid(candidate) || world.is_liquid(below) {
        Err(Rejection::OverLiquid)
    } else if !world.is_solid(below) {
        Err(Rejection::NoSupport)
    } else {
        Ok(())
    }
}

/// Candidate positions in search order: the cardinal sweep, then the
/// fallback column.
fn candidates(origin: BlockPos, policy: &SitePolicy) -> Vec<BlockPos> {
    let (Ok(min), Ok(max), Ok(band), Ok(column)) = (
        i32::try_from(policy.min_distance),
        i32::try_from(policy.max_distance),
        i32::try_from(policy.vertical_band),
        i32::try_from(policy.fallback_column_height),
    ) else {
        return Vec::new();
    };

    let sweep = (min..=max).flat_map(move |distance| {
        cardinal_offsets(distance).into_iter().flat_map(move |(dx, dz)| {
            (band.saturating_neg()..=band)
                .rev()
                .map(move |dy| origin.offset(dx, dy, dz))
        })
    });
    let column = (1..=column).map(move |dy| origin.offset(0, dy, 0));
    sweep.chain(column).collect()
}

/// The first acceptable container position around `origin`, or `None`.
pub fn find_placement_site(
    world: &dyn WorldView,
    origin: BlockPos,
    policy: &SitePolicy,
    attempted: &BTreeSet<BlockPos>,
    known: &[BlockPos],
) -> Option<BlockPos> {
    let found = candidates(origin, policy)
        .into_iter()
        .find(|c| check_candidate(world, *c, origin, policy, attempted, known).is_ok());
    match found {
        Some(pos) => tracing::debug!(site = %pos, origin = %origin, "Found placement site"),
        None => tracing::debug!(origin = %origin, "No placement site around origin"),
    }
    found
}
