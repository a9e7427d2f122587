//! Beam (Poutrelle) Profiles
//!
//! Precast prestressed floor joists, sold by the linear meter. Each profile
//! carries a list price before discount and a linear weight used to size
//! deliveries.
//!
//! | Profile | Price / m | Weight / m |
//! |---------|-----------|------------|
//! | 113     | 28.89     | 18 kg      |
//! | 114     | 33.33     | 18 kg      |
//! | 115     | 38.89     | 19 kg      |
//! | 135     | 51.11     | 22 kg      |
//! | 157     | 64.44     | 32 kg      |

use serde::{Deserialize, Serialize};

/// Beam profile designation from the producer catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeamProfile {
    #[serde(rename = "113")]
    P113,
    #[serde(rename = "114")]
    P114,
    #[serde(rename = "115")]
    P115,
    #[serde(rename = "135")]
    P135,
    #[serde(rename = "157")]
    P157,
}

impl BeamProfile {
    /// All catalog profiles, lightest first
    pub const ALL: [BeamProfile; 5] = [
        BeamProfile::P113,
        BeamProfile::P114,
        BeamProfile::P115,
        BeamProfile::P135,
        BeamProfile::P157,
    ];

    /// Code as printed on the progiciel export (e.g. "157")
    pub fn code(&self) -> &'static str {
        match self {
            BeamProfile::P113 => "113",
            BeamProfile::P114 => "114",
            BeamProfile::P115 => "115",
            BeamProfile::P135 => "135",
            BeamProfile::P157 => "157",
        }
    }

    /// List price per linear meter, before discount
    pub fn price_per_meter(&self) -> f64 {
        match self {
            BeamProfile::P113 => 28.89,
            BeamProfile::P114 => 33.33,
            BeamProfile::P115 => 38.89,
            BeamProfile::P135 => 51.11,
            BeamProfile::P157 => 64.44,
        }
    }

    /// Linear weight in kg/m
    pub fn weight_kg_per_meter(&self) -> f64 {
        match self {
            BeamProfile::P113 => 18.0,
            BeamProfile::P114 => 18.0,
            BeamProfile::P115 => 19.0,
            BeamProfile::P135 => 22.0,
            BeamProfile::P157 => 32.0,
        }
    }
}

impl std::fmt::Display for BeamProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
