//! # Quote Pricing
//!
//! Turns a quantity takeoff into priced quote lines and totals.
//!
//! ## Pricing Rules
//!
//! - **Beams**: list price per meter less the beam discount, plus the
//!   transport rate per meter. Line price is for one beam (× length), line
//!   total for all of them (× count).
//! - **Stirrups**: every beam carries twice its declared stirrup count. All
//!   stirrups go on one line at the list price less the beam discount, with
//!   no transport.
//! - **Slab blocks**: list price per unit less the slab discount, plus the
//!   transport rate per unit.
//! - **Technical inspection**: surface × price per m².
//! - **Welded mesh**: one sheet per 10 m² started, × price per sheet.
//!
//! Lines come out in that order: beams, stirrups, slabs, inspection, mesh.
//! Amounts accumulate at full precision and are rounded only on output
//! (unit prices to 4 places, totals to 2).
//!
//! ## Example
//!
//! ```rust
//! use devis_core::items::{BeamItem, SlabBlockItem};
//! use devis_core::pricing::{compute_quote, PricingConfig};
//!
//! let beams = vec![BeamItem::new("157", 6.9, 12, 9).unwrap()];
//! let slabs = vec![SlabBlockItem::new("H16", 113).unwrap()];
//! let config = PricingConfig {
//!     beam_discount_pct: 30.0,
//!     slab_discount_pct: 25.0,
//!     ..Default::default()
//! };
//!
//! let quote = compute_quote(&beams, &slabs, 85.5, 120.0, &config);
//!
//! println!("Total HT:  {:.2}", quote.subtotal_pretax);
//! println!("TVA:       {:.2}", quote.tax_amount);
//! println!("Total TTC: {:.2}", quote.total_with_tax);
//! assert_eq!(quote.lines.len(), 5);
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::catalog;
use crate::errors::{DevisError, DevisResult};
use crate::items::{BeamItem, SlabBlockItem, Takeoff};
use crate::transport::{allocate_transport, TransportConfig};
use crate::units::{round_to, SquareMeters};

/// Every beam carries this many stirrups per declared stirrup
pub const STIRRUPS_PER_DECLARED: u64 = 2;

/// Area covered by one welded mesh sheet
pub const MESH_SHEET_COVERAGE_M2: f64 = 10.0;

/// Default VAT rate
pub const DEFAULT_TAX_RATE: f64 = 0.20;

const LABEL_STIRRUPS: &str = "ETRIERS";
const LABEL_INSPECTION: &str = "CONTROLE TECHNIQUE";
const LABEL_MESH: &str = "TREILLES SOUDEES";

/// Commercial parameters for one quote.
///
/// ## JSON Example
///
/// ```json
/// {
///   "beam_discount_pct": 30.0,
///   "slab_discount_pct": 25.0,
///   "inspection_unit_price": 3.0,
///   "mesh_unit_price": 160.0,
///   "tax_rate": 0.2,
///   "transport": {
///     "delivery_mode": "site_delivery",
///     "calc_mode": "automatic",
///     "distance_km": 35.0
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Discount on beams and stirrups, in percent (0-100)
    pub beam_discount_pct: f64,

    /// Discount on slab blocks, in percent (0-100)
    pub slab_discount_pct: f64,

    /// Technical inspection price per m²
    pub inspection_unit_price: f64,

    /// Welded mesh price per sheet
    pub mesh_unit_price: f64,

    /// VAT rate as a fraction (0.20 = 20 %)
    pub tax_rate: f64,

    pub transport: TransportConfig,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            beam_discount_pct: 0.0,
            slab_discount_pct: 0.0,
            inspection_unit_price: 3.0,
            mesh_unit_price: 160.0,
            tax_rate: DEFAULT_TAX_RATE,
            transport: TransportConfig::default(),
        }
    }
}

impl PricingConfig {
    /// Validate commercial parameters.
    ///
    /// The engine prices any configuration; this check is for the places
    /// where configuration enters the system (config files, request bodies).
    pub fn validate(&self) -> DevisResult<()> {
        check_percent("beam_discount_pct", self.beam_discount_pct)?;
        check_percent("slab_discount_pct", self.slab_discount_pct)?;
        check_non_negative("inspection_unit_price", self.inspection_unit_price)?;
        check_non_negative("mesh_unit_price", self.mesh_unit_price)?;
        check_non_negative("transport.distance_km", self.transport.distance_km)?;
        check_non_negative("transport.manual_beam_rate", self.transport.manual_beam_rate)?;
        check_non_negative("transport.manual_slab_rate", self.transport.manual_slab_rate)?;
        if !self.tax_rate.is_finite() || !(0.0..=1.0).contains(&self.tax_rate) {
            return Err(DevisError::invalid_input(
                "tax_rate",
                self.tax_rate.to_string(),
                "Tax rate must be a fraction between 0 and 1",
            ));
        }
        Ok(())
    }

    fn beam_factor(&self) -> f64 {
        1.0 - self.beam_discount_pct / 100.0
    }

    fn slab_factor(&self) -> f64 {
        1.0 - self.slab_discount_pct / 100.0
    }
}

fn check_percent(field: &str, value: f64) -> DevisResult<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(DevisError::invalid_input(
            field,
            value.to_string(),
            "Discount must be between 0 and 100",
        ));
    }
    Ok(())
}

fn check_non_negative(field: &str, value: f64) -> DevisResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(DevisError::invalid_input(
            field,
            value.to_string(),
            "Value must be a non-negative number",
        ));
    }
    Ok(())
}

/// What a quote line is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    Beam,
    Stirrups,
    Slab,
    Inspection,
    Mesh,
}

/// One priced line of the quote.
///
/// The meaning of `display_quantity` depends on `kind`: beam length in
/// meters for beams, stirrup units for stirrups, block count for slabs,
/// surface in m² for inspection, sheet count for mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteLine {
    /// Designation shown on the quote (profile code or service name)
    pub label: String,
    pub kind: LineKind,
    pub display_quantity: f64,
    /// Stirrups per beam, beam lines only and only when non-zero
    pub stirrup_count: Option<u32>,
    /// Number of beams (beam lines), 0 otherwise
    pub unit_count: u32,
    /// Price per meter (beams) or per unit
    pub unit_price: f64,
    /// Price of one beam, or the unit price for other lines
    pub line_price: f64,
    pub line_total: f64,
}

/// Priced quote with totals and transport diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub lines: Vec<QuoteLine>,

    /// Total HT
    pub subtotal_pretax: f64,
    /// TVA
    pub tax_amount: f64,
    /// Total TTC
    pub total_with_tax: f64,

    pub total_weight_kg: f64,
    pub beam_weight_kg: f64,
    pub slab_weight_kg: f64,
    pub truck_count: u32,
    /// Transport cost computed from weight and distance
    pub auto_transport_total: f64,
    /// Transport cost actually folded into the prices
    pub chosen_transport_total: f64,
    /// Transport rate per beam meter
    pub beam_transport_rate: f64,
    /// Transport rate per slab unit
    pub slab_transport_rate: f64,
}

impl QuoteTotals {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines of one kind, in quote order
    pub fn lines_of(&self, kind: LineKind) -> impl Iterator<Item = &QuoteLine> {
        self.lines.iter().filter(move |l| l.kind == kind)
    }
}

/// Running subtotal at full precision
#[derive(Debug, Default)]
struct Accumulator {
    lines: Vec<QuoteLine>,
    subtotal: f64,
}

impl Accumulator {
    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        label: impl Into<String>,
        kind: LineKind,
        display_quantity: f64,
        stirrup_count: Option<u32>,
        unit_count: u32,
        unit_price: f64,
        line_price: f64,
        line_total: f64,
    ) {
        self.subtotal += line_total;
        self.lines.push(QuoteLine {
            label: label.into(),
            kind,
            display_quantity: round_to(display_quantity, 2),
            stirrup_count,
            unit_count,
            unit_price: round_to(unit_price, 4),
            line_price: round_to(line_price, 4),
            line_total: round_to(line_total, 2),
        });
    }
}

/// Price a quote.
///
/// Always returns a result. Items with non-positive length or count are left
/// out entirely; profile codes outside the catalog are priced at 0 (plus
/// transport) and logged as warnings.
pub fn compute_quote(
    beams: &[BeamItem],
    slabs: &[SlabBlockItem],
    inspection_surface_m2: f64,
    mesh_surface_m2: f64,
    config: &PricingConfig,
) -> QuoteTotals {
    let tables = catalog();
    let transport = allocate_transport(beams, slabs, &config.transport);
    let mut acc = Accumulator::default();

    // Beams
    let mut stirrup_units: u64 = 0;
    for beam in beams.iter().filter(|b| b.is_valid()) {
        let list_price = tables.beam_price_per_meter(&beam.profile_code).unwrap_or_else(|| {
            warn!(profile = %beam.profile_code, "unknown beam profile, priced at 0");
            0.0
        });
        let unit_price = list_price * config.beam_factor() + transport.beam_rate;
        let line_price = unit_price * beam.length_m;
        let line_total = line_price * beam.count as f64;

        acc.push(
            beam.profile_code.clone(),
            LineKind::Beam,
            beam.length_m,
            (beam.stirrup_count > 0).then_some(beam.stirrup_count),
            beam.count,
            unit_price,
            line_price,
            line_total,
        );

        stirrup_units += beam.count as u64 * beam.stirrup_count as u64 * STIRRUPS_PER_DECLARED;
    }

    // Stirrups
    if stirrup_units > 0 {
        let unit_price = tables.stirrup_unit_price() * config.beam_factor();
        let line_total = stirrup_units as f64 * unit_price;
        acc.push(
            LABEL_STIRRUPS,
            LineKind::Stirrups,
            stirrup_units as f64,
            None,
            0,
            unit_price,
            unit_price,
            line_total,
        );
    }

    // Slab blocks
    for slab in slabs.iter().filter(|s| s.is_valid()) {
        let list_price = tables.slab_price_per_unit(&slab.profile_code).unwrap_or_else(|| {
            warn!(profile = %slab.profile_code, "unknown slab profile, priced at 0");
            0.0
        });
        let unit_price = list_price * config.slab_factor() + transport.slab_rate;
        let line_total = unit_price * slab.count as f64;
        acc.push(
            slab.profile_code.to_uppercase(),
            LineKind::Slab,
            slab.count as f64,
            None,
            0,
            unit_price,
            unit_price,
            line_total,
        );
    }

    // Technical inspection
    if inspection_surface_m2 > 0.0 && config.inspection_unit_price > 0.0 {
        let line_total = inspection_surface_m2 * config.inspection_unit_price;
        acc.push(
            LABEL_INSPECTION,
            LineKind::Inspection,
            inspection_surface_m2,
            None,
            0,
            config.inspection_unit_price,
            config.inspection_unit_price,
            line_total,
        );
    }

    // Welded mesh
    if mesh_surface_m2 > 0.0 && config.mesh_unit_price > 0.0 {
        let sheets = SquareMeters(mesh_surface_m2).sheets_needed(SquareMeters(MESH_SHEET_COVERAGE_M2));
        let line_total = sheets as f64 * config.mesh_unit_price;
        acc.push(
            LABEL_MESH,
            LineKind::Mesh,
            sheets as f64,
            None,
            0,
            config.mesh_unit_price,
            config.mesh_unit_price,
            line_total,
        );
    }

    let tax_amount = round_to(acc.subtotal * config.tax_rate, 2);
    let total_with_tax = round_to(acc.subtotal + tax_amount, 2);

    QuoteTotals {
        lines: acc.lines,
        subtotal_pretax: round_to(acc.subtotal, 2),
        tax_amount,
        total_with_tax,
        total_weight_kg: round_to(transport.total_weight_kg, 2),
        beam_weight_kg: round_to(transport.beam_weight_kg, 2),
        slab_weight_kg: round_to(transport.slab_weight_kg, 2),
        truck_count: transport.truck_count,
        auto_transport_total: round_to(transport.auto_total, 2),
        chosen_transport_total: round_to(transport.chosen_total, 2),
        beam_transport_rate: round_to(transport.beam_rate, 4),
        slab_transport_rate: round_to(transport.slab_rate, 4),
    }
}

/// Price a whole takeoff.
pub fn price_takeoff(takeoff: &Takeoff, config: &PricingConfig) -> QuoteTotals {
    compute_quote(
        &takeoff.beams,
        &takeoff.slabs,
        takeoff.inspection_surface_m2,
        takeoff.mesh_surface_m2,
        config,
    )
}
