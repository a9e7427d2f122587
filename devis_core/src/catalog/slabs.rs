//! Slab Block (Hourdis) Profiles
//!
//! Concrete infill blocks laid between beams, sold by the unit. The number
//! in the code is the block height in centimeters.

use serde::{Deserialize, Serialize};

/// Slab block profile designation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SlabProfile {
    H8,
    H12,
    H16,
    H20,
    H25,
    H30,
}

impl SlabProfile {
    /// All catalog profiles, shallowest first
    pub const ALL: [SlabProfile; 6] = [
        SlabProfile::H8,
        SlabProfile::H12,
        SlabProfile::H16,
        SlabProfile::H20,
        SlabProfile::H25,
        SlabProfile::H30,
    ];

    /// Upper-case code (e.g. "H16")
    pub fn code(&self) -> &'static str {
        match self {
            SlabProfile::H8 => "H8",
            SlabProfile::H12 => "H12",
            SlabProfile::H16 => "H16",
            SlabProfile::H20 => "H20",
            SlabProfile::H25 => "H25",
            SlabProfile::H30 => "H30",
        }
    }

    /// List price per unit, before discount
    pub fn price_per_unit(&self) -> f64 {
        match self {
            SlabProfile::H8 => 4.00,
            SlabProfile::H12 => 4.11,
            SlabProfile::H16 => 5.47,
            SlabProfile::H20 => 6.40,
            SlabProfile::H25 => 7.73,
            SlabProfile::H30 => 9.07,
        }
    }

    /// Unit weight in kg
    pub fn weight_kg_per_unit(&self) -> f64 {
        match self {
            SlabProfile::H8 => 10.0,
            SlabProfile::H12 => 12.0,
            SlabProfile::H16 => 14.0,
            SlabProfile::H20 => 15.0,
            SlabProfile::H25 => 20.0,
            SlabProfile::H30 => 25.0,
        }
    }
}

impl std::fmt::Display for SlabProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
