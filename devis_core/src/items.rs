//! # Quote Items
//!
//! The material quantities a quote is priced from, whichever way they were
//! entered. A [`Takeoff`] is what the progiciel extractor produces and what
//! the manual-entry form normalizes to; the pricing engine consumes it and
//! never modifies it.
//!
//! Items that fail validation (non-positive length or count) are dropped
//! where they are built. The engine applies the same check again so that a
//! deserialized takeoff cannot slip an invalid item through.

use serde::{Deserialize, Serialize};

/// One beam schedule line: `count` beams of the same profile and length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamItem {
    /// Catalog profile code (e.g. "157"). Unknown codes are kept and priced at 0.
    pub profile_code: String,

    /// Length of one beam in meters
    pub length_m: f64,

    /// Stirrups declared per beam
    pub stirrup_count: u32,

    /// Number of beams on this line
    pub count: u32,
}

impl BeamItem {
    /// Build a beam line from already-typed values.
    ///
    /// Returns `None` when the length is not a positive finite number or the
    /// count is zero.
    pub fn new(profile_code: impl Into<String>, length_m: f64, stirrup_count: u32, count: u32) -> Option<Self> {
        let item = BeamItem {
            profile_code: profile_code.into().trim().to_string(),
            length_m,
            stirrup_count,
            count,
        };
        item.is_valid().then_some(item)
    }

    /// Build a beam line from raw numeric cells.
    ///
    /// Counts are rounded to the nearest whole unit; a count that rounds to 0
    /// discards the line. Negative or non-finite stirrup counts become 0.
    pub fn from_raw(profile_code: &str, length_m: f64, stirrup_count: f64, count: f64) -> Option<Self> {
        if !count.is_finite() || count <= 0.0 {
            return None;
        }
        let stirrups = if stirrup_count.is_finite() && stirrup_count > 0.0 {
            stirrup_count.round() as u32
        } else {
            0
        };
        Self::new(profile_code, length_m, stirrups, count.round() as u32)
    }

    pub fn is_valid(&self) -> bool {
        !self.profile_code.is_empty() && self.length_m.is_finite() && self.length_m > 0.0 && self.count > 0
    }

    /// Total linear meters on this line (length × count)
    pub fn line_meters(&self) -> f64 {
        self.length_m * self.count as f64
    }
}

/// One slab block line: `count` blocks of the same profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabBlockItem {
    /// Upper-case catalog profile code (e.g. "H16")
    pub profile_code: String,

    /// Number of blocks
    pub count: u32,
}

impl SlabBlockItem {
    /// Build a slab line. The code is trimmed and upper-cased.
    ///
    /// Returns `None` for a zero count or empty code.
    pub fn new(profile_code: &str, count: u32) -> Option<Self> {
        let item = SlabBlockItem {
            profile_code: profile_code.trim().to_uppercase(),
            count,
        };
        item.is_valid().then_some(item)
    }

    /// Build a slab line from a raw numeric quantity (rounded to whole units).
    pub fn from_raw(profile_code: &str, count: f64) -> Option<Self> {
        if !count.is_finite() || count <= 0.0 {
            return None;
        }
        Self::new(profile_code, count.round() as u32)
    }

    pub fn is_valid(&self) -> bool {
        !self.profile_code.is_empty() && self.count > 0
    }
}

/// Quantity takeoff for one quote.
///
/// ## JSON Example
///
/// ```json
/// {
///   "beams": [
///     { "profile_code": "157", "length_m": 6.9, "stirrup_count": 12, "count": 9 }
///   ],
///   "slabs": [
///     { "profile_code": "H16", "count": 113 }
///   ],
///   "inspection_surface_m2": 85.5,
///   "mesh_surface_m2": 85.5
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Takeoff {
    /// Beam lines in schedule order
    pub beams: Vec<BeamItem>,

    /// Slab block lines in schedule order
    pub slabs: Vec<SlabBlockItem>,

    /// Floor area subject to technical inspection (m²)
    pub inspection_surface_m2: f64,

    /// Floor area to cover with welded mesh (m²)
    pub mesh_surface_m2: f64,
}

impl Takeoff {
    /// True when nothing on the takeoff would produce a quote line
    pub fn is_empty(&self) -> bool {
        self.beams.is_empty()
            && self.slabs.is_empty()
            && self.inspection_surface_m2 <= 0.0
            && self.mesh_surface_m2 <= 0.0
    }
}
