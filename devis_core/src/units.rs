//! # Unit Types
//!
//! Type-safe wrappers for the quantities a quote deals with. These are plain
//! f64 newtypes that serialize as bare numbers.
//!
//! ## Metric Units
//!
//! Everything is metric, as on the progiciel export:
//! - Length: meters (m), kilometers (km)
//! - Area: square meters (m²)
//! - Mass: kilograms (kg), tonnes (t = 1000 kg)
//!
//! Money is not wrapped. Amounts are plain f64 in the quote currency and are
//! rounded only when written to a quote line (see [`round_to`]).
//!
//! ## Example
//!
//! ```rust
//! use devis_core::units::{Kilograms, Tonnes, Kilometers};
//!
//! let load = Kilograms(17_000.0);
//! let t: Tonnes = load.into();
//! assert_eq!(t.0, 17.0);
//!
//! let distance = Kilometers(35.0);
//! assert_eq!(distance.round_trip().0, 70.0);
//! ```

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Sub};

// ============================================================================
// Length Units
// ============================================================================

/// Length in meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meters(pub f64);

/// Distance in kilometers
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kilometers(pub f64);

impl Kilometers {
    /// Out-and-back distance for a delivery run
    pub fn round_trip(self) -> Kilometers {
        Kilometers(self.0 * 2.0)
    }
}

// ============================================================================
// Area Units
// ============================================================================

/// Area in square meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SquareMeters(pub f64);

impl SquareMeters {
    /// Number of whole sheets needed to cover this area, each covering `coverage`.
    ///
    /// Returns 0 for a non-positive area or coverage.
    pub fn sheets_needed(self, coverage: SquareMeters) -> u32 {
        if self.0 <= 0.0 || coverage.0 <= 0.0 {
            return 0;
        }
        (self.0 / coverage.0).ceil() as u32
    }
}

// ============================================================================
// Mass Units
// ============================================================================

/// Mass in kilograms
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kilograms(pub f64);

/// Mass in tonnes (1 t = 1000 kg)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tonnes(pub f64);

impl From<Kilograms> for Tonnes {
    fn from(kg: Kilograms) -> Self {
        Tonnes(kg.0 / 1000.0)
    }
}

impl Kilograms {
    /// Number of loads of `capacity` needed to carry this mass.
    ///
    /// Returns 0 for a non-positive mass or capacity.
    pub fn loads_needed(self, capacity: Kilograms) -> u32 {
        if self.0 <= 0.0 || capacity.0 <= 0.0 {
            return 0;
        }
        (self.0 / capacity.0).ceil() as u32
    }
}

// ============================================================================
// Rounding
// ============================================================================

/// Round `value` to `decimals` places, half away from zero.
///
/// Used only when a figure leaves the engine; accumulation stays at full
/// precision.
///
/// Legacy quotes rounded half to even, so an exact tie can differ by one
/// cent from them (0.125 gives 0.13 here, 0.12 there).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

// ============================================================================
// Arithmetic Implementations (macro to reduce boilerplate)
// ============================================================================

macro_rules! impl_arithmetic {
    ($type:ty) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|v| v.0).sum())
            }
        }

        impl $type {
            /// Get the raw f64 value
            pub fn value(self) -> f64 {
                self.0
            }

            /// Create from raw f64 value
            pub fn new(value: f64) -> Self {
                Self(value)
            }
        }
    };
}

impl_arithmetic!(Meters);
impl_arithmetic!(Kilometers);
impl_arithmetic!(SquareMeters);
impl_arithmetic!(Kilograms);
impl_arithmetic!(Tonnes);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kilograms_to_tonnes() {
        let kg = Kilograms(2500.0);
        let t: Tonnes = kg.into();
        assert_eq!(t.0, 2.5);
    }

    #[test]
    fn test_loads_needed_boundary() {
        let truck = Kilograms(17_000.0);
        assert_eq!(Kilograms(17_000.0).loads_needed(truck), 1);
        assert_eq!(Kilograms(17_001.0).loads_needed(truck), 2);
        assert_eq!(Kilograms(0.0).loads_needed(truck), 0);
    }

    #[test]
    fn test_sheets_needed() {
        let sheet = SquareMeters(10.0);
        assert_eq!(SquareMeters(10.1).sheets_needed(sheet), 2);
        assert_eq!(SquareMeters(20.0).sheets_needed(sheet), 2);
        assert_eq!(SquareMeters(-3.0).sheets_needed(sheet), 0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.3456, 2), 12.35);
        assert_eq!(round_to(12.3456, 4), 12.3456);
        assert_eq!(round_to(-1.005_01, 2), -1.01);
        // Ties go away from zero
        assert_eq!(round_to(0.125, 2), 0.13);
        assert_eq!(round_to(-0.125, 2), -0.13);
    }

    #[test]
    fn test_arithmetic() {
        let a = Meters(10.0);
        let b = Meters(5.0);
        assert_eq!((a + b).0, 15.0);
        assert_eq!((a - b).0, 5.0);
        assert_eq!((a * 2.0).0, 20.0);
        assert_eq!((a / 2.0).0, 5.0);
        let total: Kilograms = [Kilograms(1.0), Kilograms(2.5)].into_iter().sum();
        assert_eq!(total.0, 3.5);
    }

    #[test]
    fn test_serialization() {
        let m = Meters(6.9);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "6.9");

        let roundtrip: Meters = serde_json::from_str(&json).unwrap();
        assert_eq!(m, roundtrip);
    }
}
