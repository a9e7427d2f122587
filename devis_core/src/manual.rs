//! # Manual Entry
//!
//! Quantities typed in by the operator when no progiciel export is
//! available. Rows arrive as the form sends them and are normalized into a
//! [`Takeoff`]: blank codes, unusable numbers and empty quantities are
//! dropped silently.
//!
//! Welded mesh is entered as a number of sheets, not a surface. It is turned
//! back into the equivalent surface so the pricing engine sees one input
//! shape whichever way the quote was entered.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::items::{BeamItem, SlabBlockItem, Takeoff};
use crate::pricing::MESH_SHEET_COVERAGE_M2;

/// Beam row as entered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualBeamRow {
    pub profile: String,
    pub length_m: f64,
    /// Stirrups per beam
    pub stirrup_count: f64,
    /// Number of beams
    pub count: f64,
}

/// Slab block row as entered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualSlabRow {
    pub profile: String,
    pub count: f64,
}

/// The manual-entry form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualEntry {
    pub beams: Vec<ManualBeamRow>,
    pub slabs: Vec<ManualSlabRow>,
    pub inspection_surface_m2: f64,
    /// Number of welded mesh sheets
    pub mesh_sheet_count: f64,
}

impl ManualEntry {
    /// Normalize the form into a takeoff.
    pub fn into_takeoff(&self) -> Takeoff {
        let beams: Vec<BeamItem> = self
            .beams
            .iter()
            .filter(|row| row.length_m.is_finite() && row.stirrup_count.is_finite())
            .filter_map(|row| BeamItem::from_raw(&row.profile, row.length_m, row.stirrup_count, row.count))
            .collect();

        let slabs: Vec<SlabBlockItem> = self
            .slabs
            .iter()
            .filter_map(|row| SlabBlockItem::from_raw(&row.profile, row.count))
            .collect();

        let dropped = self.beams.len() - beams.len() + self.slabs.len() - slabs.len();
        if dropped > 0 {
            debug!(dropped, "manual rows dropped during normalization");
        }

        Takeoff {
            beams,
            slabs,
            inspection_surface_m2: non_negative(self.inspection_surface_m2),
            mesh_surface_m2: non_negative(self.mesh_sheet_count) * MESH_SHEET_COVERAGE_M2,
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
