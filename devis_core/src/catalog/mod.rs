//! # Product Catalog
//!
//! List prices and shipping weights for everything a quote can contain.
//! The catalog is a fixed table built once per process and shared read-only
//! by every quote computation.
//!
//! ## Lookup Policy
//!
//! Quote input arrives as free-text profile codes. A code outside the catalog
//! is not an error: it resolves to `None` here and the pricing and transport
//! code treat it as price 0 and weight 0, logging a warning.
//!
//! ## Example
//!
//! ```rust
//! use devis_core::catalog::catalog;
//!
//! let tables = catalog();
//! assert_eq!(tables.beam_price_per_meter("157"), Some(64.44));
//! assert_eq!(tables.slab_weight_per_unit("h16"), Some(14.0));
//! assert_eq!(tables.beam_price_per_meter("999"), None);
//! ```

pub mod beams;
pub mod slabs;

pub use beams::BeamProfile;
pub use slabs::SlabProfile;

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Stirrup (étrier) list price per unit, before the beam discount
pub const STIRRUP_UNIT_PRICE: f64 = 0.89;

static CATALOG: Lazy<CatalogTables> = Lazy::new(CatalogTables::build);

/// Access the process-wide catalog.
pub fn catalog() -> &'static CatalogTables {
    &CATALOG
}

/// Immutable lookup tables keyed by profile code.
///
/// Construct through [`catalog()`]; the fields are private so the tables
/// cannot change after the first access.
#[derive(Debug)]
pub struct CatalogTables {
    beams: HashMap<&'static str, BeamProfile>,
    /// Keyed by upper-case code
    slabs: HashMap<&'static str, SlabProfile>,
    stirrup_unit_price: f64,
}

impl CatalogTables {
    fn build() -> Self {
        CatalogTables {
            beams: BeamProfile::ALL.iter().map(|p| (p.code(), *p)).collect(),
            slabs: SlabProfile::ALL.iter().map(|p| (p.code(), *p)).collect(),
            stirrup_unit_price: STIRRUP_UNIT_PRICE,
        }
    }

    /// Resolve a beam profile code (exact match after trimming)
    pub fn beam(&self, code: &str) -> Option<BeamProfile> {
        self.beams.get(code.trim()).copied()
    }

    /// Resolve a slab profile code (case-insensitive)
    pub fn slab(&self, code: &str) -> Option<SlabProfile> {
        self.slabs.get(code.trim().to_uppercase().as_str()).copied()
    }

    /// List price per linear meter for a beam code
    pub fn beam_price_per_meter(&self, code: &str) -> Option<f64> {
        self.beam(code).map(|p| p.price_per_meter())
    }

    /// Weight per linear meter (kg) for a beam code
    pub fn beam_weight_per_meter(&self, code: &str) -> Option<f64> {
        self.beam(code).map(|p| p.weight_kg_per_meter())
    }

    /// List price per unit for a slab code
    pub fn slab_price_per_unit(&self, code: &str) -> Option<f64> {
        self.slab(code).map(|p| p.price_per_unit())
    }

    /// Weight per unit (kg) for a slab code
    pub fn slab_weight_per_unit(&self, code: &str) -> Option<f64> {
        self.slab(code).map(|p| p.weight_kg_per_unit())
    }

    /// Stirrup list price per unit
    pub fn stirrup_unit_price(&self) -> f64 {
        self.stirrup_unit_price
    }

    /// Number of beam profiles in the catalog
    pub fn beam_count(&self) -> usize {
        self.beams.len()
    }

    /// Number of slab profiles in the catalog
    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }
}
