//! # Transport Allocation
//!
//! Works out what delivering a quote to site costs and spreads that cost over
//! the beams (per linear meter) and slab blocks (per unit), so that transport
//! is folded into unit prices rather than shown as its own line.
//!
//! ## Method
//!
//! 1. Weigh the load: beam meters × kg/m plus slab units × kg/unit.
//! 2. Trucks needed: `ceil(total_kg / 17 000)`.
//! 3. Price of one truck: `(distance_km × 2 × 0.4 × 11 + 200) × 1.05`.
//! 4. Automatic total: trucks × truck price.
//! 5. Each category carries the share of the total matching its share of the
//!    weight, divided by its own quantity (meters or units).
//!
//! Factory pickup, an empty load or a zero distance costs nothing.
//!
//! ## Fixed Business Parameters
//!
//! The truck capacity, the per-km factors, the fixed fee and the margin below
//! are commercial agreements carried as-is from the pricing sheet. They are
//! not derived from anything physical and are not configurable.
//!
//! ## Example
//!
//! ```rust
//! use devis_core::items::BeamItem;
//! use devis_core::transport::{allocate_transport, DeliveryMode, TransportConfig};
//!
//! let beams = vec![BeamItem::new("157", 6.0, 0, 10).unwrap()];
//! let config = TransportConfig {
//!     delivery_mode: DeliveryMode::SiteDelivery,
//!     distance_km: 25.0,
//!     ..Default::default()
//! };
//!
//! let result = allocate_transport(&beams, &[], &config);
//! assert_eq!(result.truck_count, 1);
//! assert!(result.beam_rate > 0.0);
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::catalog;
use crate::items::{BeamItem, SlabBlockItem};
use crate::units::{Kilograms, Kilometers, Meters};

/// Payload of one truck
pub const TRUCK_CAPACITY_KG: f64 = 17_000.0;

/// Cost factor per km driven (fuel consumption share)
pub const FUEL_FACTOR_PER_KM: f64 = 0.4;

/// Cost multiplier applied to the per-km factor
pub const KM_RATE_MULTIPLIER: f64 = 11.0;

/// Flat fee per truck
pub const TRUCK_FIXED_FEE: f64 = 200.0;

/// Margin applied on top of each truck's cost
pub const TRANSPORT_MARGIN: f64 = 1.05;

/// Who moves the goods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Customer collects at the factory ("départ"); no transport charged
    #[default]
    FactoryPickup,
    /// Delivered to site ("rendu"); transport is charged
    SiteDelivery,
}

impl DeliveryMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            DeliveryMode::FactoryPickup => "Départ usine",
            DeliveryMode::SiteDelivery => "Rendu chantier",
        }
    }
}

/// How the per-unit transport rates are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportCalcMode {
    /// Derived from weight and distance
    #[default]
    Automatic,
    /// Entered by the operator
    Manual,
}

/// Transport settings for one quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub delivery_mode: DeliveryMode,

    pub calc_mode: TransportCalcMode,

    /// One-way distance from the factory to the site
    pub distance_km: f64,

    /// Operator beam rate per linear meter (manual mode only)
    pub manual_beam_rate: f64,

    /// Operator slab rate per unit (manual mode only)
    pub manual_slab_rate: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            delivery_mode: DeliveryMode::FactoryPickup,
            calc_mode: TransportCalcMode::Automatic,
            distance_km: 0.0,
            manual_beam_rate: 0.0,
            manual_slab_rate: 0.0,
        }
    }
}

/// Outcome of a transport allocation, automatic and effective figures side by side.
///
/// Values are unrounded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportResult {
    /// Linear meters of beams on the quote
    pub total_beam_meters: f64,
    pub beam_weight_kg: f64,
    /// Slab blocks on the quote
    pub total_slab_units: f64,
    pub slab_weight_kg: f64,
    pub total_weight_kg: f64,

    pub truck_count: u32,
    /// Price of a single truck run
    pub truck_price: f64,
    /// Trucks × truck price
    pub auto_total: f64,
    /// Automatic rate per beam meter
    pub beam_rate_auto: f64,
    /// Automatic rate per slab unit
    pub slab_rate_auto: f64,

    /// Rate per beam meter applied to the quote
    pub beam_rate: f64,
    /// Rate per slab unit applied to the quote
    pub slab_rate: f64,
    /// Transport actually charged: rates × quantities
    pub chosen_total: f64,
}

impl TransportResult {
    /// True when the quote carries no transport charge
    pub fn is_free(&self) -> bool {
        self.chosen_total <= 0.0
    }
}

/// Price of one truck run for a one-way distance.
pub fn truck_price(distance: Kilometers) -> f64 {
    (distance.round_trip().0 * FUEL_FACTOR_PER_KM * KM_RATE_MULTIPLIER + TRUCK_FIXED_FEE) * TRANSPORT_MARGIN
}

/// Weight totals for a load
#[derive(Debug, Clone, Copy, Default)]
struct Load {
    beam_meters: Meters,
    beam_weight: Kilograms,
    slab_units: f64,
    slab_weight: Kilograms,
}

impl Load {
    fn weigh(beams: &[BeamItem], slabs: &[SlabBlockItem]) -> Self {
        let tables = catalog();
        let mut load = Load::default();

        for beam in beams.iter().filter(|b| b.is_valid()) {
            let meters = Meters(beam.line_meters());
            let kg_per_m = tables.beam_weight_per_meter(&beam.profile_code).unwrap_or_else(|| {
                warn!(profile = %beam.profile_code, "unknown beam profile, weighed as 0 kg");
                0.0
            });
            load.beam_meters = load.beam_meters + meters;
            load.beam_weight = load.beam_weight + Kilograms(meters.0 * kg_per_m);
        }

        for slab in slabs.iter().filter(|s| s.is_valid()) {
            let units = slab.count as f64;
            let kg_per_unit = tables.slab_weight_per_unit(&slab.profile_code).unwrap_or_else(|| {
                warn!(profile = %slab.profile_code, "unknown slab profile, weighed as 0 kg");
                0.0
            });
            load.slab_units += units;
            load.slab_weight = load.slab_weight + Kilograms(units * kg_per_unit);
        }

        load
    }

    fn total_weight(&self) -> Kilograms {
        self.beam_weight + self.slab_weight
    }
}

/// Share of `total_cost` carried by a category, per unit of that category.
fn allocated_rate(category_weight: Kilograms, total_weight: Kilograms, quantity: f64, total_cost: f64) -> f64 {
    if quantity > 0.0 && category_weight.0 > 0.0 {
        category_weight.0 * total_cost / (total_weight.0 * quantity)
    } else {
        0.0
    }
}

/// Compute the transport charge for a set of beams and slabs.
///
/// Invalid items (non-positive length or count) are ignored. Unknown profile
/// codes weigh nothing. In manual mode negative operator rates are clamped to
/// 0. The result is zeroed, manual rates included, for factory pickup, an
/// empty load, or a non-positive distance.
pub fn allocate_transport(beams: &[BeamItem], slabs: &[SlabBlockItem], config: &TransportConfig) -> TransportResult {
    let load = Load::weigh(beams, slabs);
    let total_weight = load.total_weight();

    let mut result = TransportResult {
        total_beam_meters: load.beam_meters.0,
        beam_weight_kg: load.beam_weight.0,
        total_slab_units: load.slab_units,
        slab_weight_kg: load.slab_weight.0,
        total_weight_kg: total_weight.0,
        ..Default::default()
    };

    let distance_km = if config.distance_km.is_finite() { config.distance_km } else { 0.0 };
    if config.delivery_mode != DeliveryMode::SiteDelivery || total_weight.0 <= 0.0 || distance_km <= 0.0 {
        return result;
    }

    result.truck_count = total_weight.loads_needed(Kilograms(TRUCK_CAPACITY_KG));
    result.truck_price = truck_price(Kilometers(distance_km));
    result.auto_total = result.truck_count as f64 * result.truck_price;

    result.beam_rate_auto = allocated_rate(load.beam_weight, total_weight, load.beam_meters.0, result.auto_total);
    result.slab_rate_auto = allocated_rate(load.slab_weight, total_weight, load.slab_units, result.auto_total);

    let (beam_rate, slab_rate) = match config.calc_mode {
        TransportCalcMode::Automatic => (result.beam_rate_auto, result.slab_rate_auto),
        TransportCalcMode::Manual => (non_negative(config.manual_beam_rate), non_negative(config.manual_slab_rate)),
    };
    result.beam_rate = beam_rate;
    result.slab_rate = slab_rate;
    result.chosen_total = beam_rate * load.beam_meters.0 + slab_rate * load.slab_units;

    result
}

fn non_negative(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(distance_km: f64) -> TransportConfig {
        TransportConfig {
            delivery_mode: DeliveryMode::SiteDelivery,
            distance_km,
            ..Default::default()
        }
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_truck_price_formula() {
        // (50 * 2 * 0.4 * 11 + 200) * 1.05 = (440 + 200) * 1.05
        assert_close(truck_price(Kilometers(50.0)), 672.0);
        assert_close(truck_price(Kilometers(0.0)), 210.0);
    }

    #[test]
    fn test_truck_count_boundary() {
        // H8 weighs 10 kg per unit
        let exactly_one = vec![SlabBlockItem::new("H8", 1700).unwrap()];
        let result = allocate_transport(&[], &exactly_one, &site(10.0));
        assert_close(result.total_weight_kg, 17_000.0);
        assert_eq!(result.truck_count, 1);

        // One extra H12 block (12 kg) tips it over
        let over = vec![
            SlabBlockItem::new("H8", 1700).unwrap(),
            SlabBlockItem::new("H12", 1).unwrap(),
        ];
        let result = allocate_transport(&[], &over, &site(10.0));
        assert!(result.total_weight_kg > 17_000.0);
        assert_eq!(result.truck_count, 2);
    }

    #[test]
    fn test_factory_pickup_is_free() {
        let beams = vec![BeamItem::new("157", 6.9, 12, 9).unwrap()];
        let config = TransportConfig {
            delivery_mode: DeliveryMode::FactoryPickup,
            calc_mode: TransportCalcMode::Manual,
            distance_km: 300.0,
            manual_beam_rate: 5.0,
            manual_slab_rate: 1.0,
        };
        let result = allocate_transport(&beams, &[], &config);
        assert_eq!(result.chosen_total, 0.0);
        assert_eq!(result.truck_count, 0);
        assert!(result.is_free());
        // Weights are still reported
        assert_close(result.beam_weight_kg, 6.9 * 9.0 * 32.0);
    }

    #[test]
    fn test_zero_distance_or_weight_is_free() {
        let beams = vec![BeamItem::new("157", 6.0, 0, 1).unwrap()];
        assert!(allocate_transport(&beams, &[], &site(0.0)).is_free());
        assert!(allocate_transport(&[], &[], &site(40.0)).is_free());

        let unknown = vec![BeamItem::new("999", 6.0, 0, 1).unwrap()];
        let result = allocate_transport(&unknown, &[], &site(40.0));
        assert_eq!(result.total_weight_kg, 0.0);
        assert!(result.is_free());
    }

    #[test]
    fn test_automatic_allocation_recovers_total() {
        let beams = vec![
            BeamItem::new("157", 6.9, 12, 9).unwrap(),
            BeamItem::new("113", 4.0, 0, 10).unwrap(),
        ];
        let slabs = vec![SlabBlockItem::new("H16", 400).unwrap()];
        let result = allocate_transport(&beams, &slabs, &site(35.0));

        assert_eq!(result.truck_count, 1);
        assert_close(result.auto_total, truck_price(Kilometers(35.0)));
        assert_close(result.chosen_total, result.auto_total);
        assert_eq!(result.beam_rate, result.beam_rate_auto);
        assert_eq!(result.slab_rate, result.slab_rate_auto);

        // Beam share of the cost matches beam share of the weight
        let beam_share = result.beam_rate * result.total_beam_meters / result.auto_total;
        assert_close(beam_share, result.beam_weight_kg / result.total_weight_kg);
    }

    #[test]
    fn test_manual_rates_clamped() {
        let beams = vec![BeamItem::new("135", 5.0, 0, 2).unwrap()];
        let slabs = vec![SlabBlockItem::new("H20", 10).unwrap()];
        let config = TransportConfig {
            delivery_mode: DeliveryMode::SiteDelivery,
            calc_mode: TransportCalcMode::Manual,
            distance_km: 20.0,
            manual_beam_rate: -4.0,
            manual_slab_rate: 0.5,
        };
        let result = allocate_transport(&beams, &slabs, &config);
        assert_eq!(result.beam_rate, 0.0);
        assert_eq!(result.slab_rate, 0.5);
        assert_close(result.chosen_total, 0.5 * 10.0);
        assert!(result.beam_rate_auto > 0.0);
    }

    #[test]
    fn test_invalid_items_ignored() {
        let beams = vec![BeamItem {
            profile_code: "157".to_string(),
            length_m: -2.0,
            stirrup_count: 0,
            count: 3,
        }];
        let result = allocate_transport(&beams, &[], &site(10.0));
        assert_eq!(result.total_beam_meters, 0.0);
    }

    #[test]
    fn test_config_serialization() {
        let config = site(12.5);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"site_delivery\""));
        assert!(json.contains("\"automatic\""));
        let parsed: TransportConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
