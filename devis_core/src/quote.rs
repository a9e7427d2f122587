//! # Quote Generation
//!
//! One call from a filled-in quote form to a priced quote and its ledger
//! record. Nothing is remembered between calls: the caller keeps the
//! [`Takeoff`] from [`GeneratedQuote`] and hands it back to
//! [`simulate_transport`] to try other transport settings on the same
//! quantities.
//!
//! ## Example
//!
//! ```rust
//! use devis_core::quote::{generate_quote, QuantitySource, QuoteRequest};
//! use devis_core::record::{QuoteHeader, Roster};
//!
//! let request = QuoteRequest {
//!     header: QuoteHeader::new("SARL BATI OUEST", "Rennes"),
//!     source: QuantitySource::Progiciel {
//!         text: "REPERE;SOUS TYPE;LONGUEUR/PAS ETRIERS;X;NOMBRE;LONGUEUR\n\
//!                D;157;12;0;9;6,9\n"
//!             .to_string(),
//!     },
//!     pricing: Default::default(),
//! };
//!
//! let quote = generate_quote(&request, &Roster::default(), None)?;
//! assert_eq!(quote.takeoff.beams.len(), 1);
//! assert_eq!(quote.record.reference.as_str(), "D00001");
//! # Ok::<(), devis_core::errors::DevisError>(())
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::DevisResult;
use crate::extractor;
use crate::items::Takeoff;
use crate::manual::ManualEntry;
use crate::pricing::{price_takeoff, PricingConfig, QuoteTotals};
use crate::record::{EntryMode, QuoteHeader, QuoteRecord, QuoteReference, Roster};
use crate::transport::{allocate_transport, TransportConfig, TransportResult};

/// Where a quote's quantities come from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QuantitySource {
    /// Progiciel export already in memory
    Progiciel { text: String },
    /// Progiciel export on disk
    ProgicielFile { path: PathBuf },
    /// Quantities typed in by the operator
    Manual(ManualEntry),
    /// Progiciel mode without an export: an empty quote
    #[default]
    None,
}

impl QuantitySource {
    pub fn entry_mode(&self) -> EntryMode {
        match self {
            QuantitySource::Manual(_) => EntryMode::Manual,
            _ => EntryMode::Progiciel,
        }
    }
}

/// Everything the quote form sends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteRequest {
    pub header: QuoteHeader,
    pub source: QuantitySource,
    pub pricing: PricingConfig,
}

/// A priced quote with the inputs it was priced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuote {
    pub header: QuoteHeader,
    pub takeoff: Takeoff,
    pub totals: QuoteTotals,
    pub record: QuoteRecord,
}

impl GeneratedQuote {
    pub fn reference(&self) -> &QuoteReference {
        &self.record.reference
    }
}

/// Turn a quantity source into a takeoff.
pub fn resolve_takeoff(source: &QuantitySource) -> DevisResult<Takeoff> {
    match source {
        QuantitySource::Progiciel { text } => Ok(extractor::parse(text)),
        QuantitySource::ProgicielFile { path } => extractor::parse_file(path),
        QuantitySource::Manual(entry) => Ok(entry.into_takeoff()),
        QuantitySource::None => {
            debug!("no progiciel export supplied, quoting an empty takeoff");
            Ok(Takeoff::default())
        }
    }
}

/// Price a quote request and build its ledger record.
///
/// `previous_reference` numbers the quote when the header carries no
/// reference; pass the ledger's last reference. The ledger itself is not
/// touched.
pub fn generate_quote(
    request: &QuoteRequest,
    roster: &Roster,
    previous_reference: Option<&QuoteReference>,
) -> DevisResult<GeneratedQuote> {
    let takeoff = resolve_takeoff(&request.source)?;
    let totals = price_takeoff(&takeoff, &request.pricing);
    let reference = request.header.effective_reference(previous_reference);

    let record = QuoteRecord::new(
        &request.header,
        reference,
        roster,
        &totals,
        request.source.entry_mode(),
        request.pricing.transport.delivery_mode,
        request.pricing.transport.calc_mode,
    );

    info!(
        reference = %record.reference,
        client = %record.client,
        lines = totals.lines.len(),
        total_pretax = totals.subtotal_pretax,
        total_with_tax = totals.total_with_tax,
        "quote generated"
    );

    Ok(GeneratedQuote {
        header: request.header.clone(),
        takeoff,
        totals,
        record,
    })
}

/// Transport figures for a takeoff under the given settings.
pub fn simulate_transport(takeoff: &Takeoff, config: &TransportConfig) -> TransportResult {
    allocate_transport(&takeoff.beams, &takeoff.slabs, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manual::{ManualBeamRow, ManualSlabRow};
    use crate::pricing::LineKind;
    use crate::transport::{DeliveryMode, TransportCalcMode};
    use std::env::temp_dir;

    const EXPORT: &str = "REPERE;SOUS TYPE;LONGUEUR/PAS ETRIERS;X;NOMBRE;LONGUEUR\n\
                          D;157;12;0;9;6,9\n\
                          \n\
                          FAMILLE;DESIGNATION;LARGEUR;HAUTEUR;LONGUEUR;POIDS;NOMBRE\n\
                          HOURDIS;H16;;;;;113\n\
                          \n\
                          SURFACE;85,5\n\
                          SURFACE TS;120\n";

    fn request(source: QuantitySource) -> QuoteRequest {
        QuoteRequest {
            header: QuoteHeader::new("SARL BATI OUEST", "Rennes"),
            source,
            pricing: PricingConfig {
                beam_discount_pct: 30.0,
                slab_discount_pct: 25.0,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_progiciel_quote() {
        let req = request(QuantitySource::Progiciel { text: EXPORT.to_string() });
        let quote = generate_quote(&req, &Roster::default(), None).unwrap();

        assert_eq!(quote.takeoff.beams.len(), 1);
        assert_eq!(quote.takeoff.slabs.len(), 1);
        assert_eq!(quote.totals.lines.len(), 5);
        assert!((quote.totals.subtotal_pretax - 5575.86).abs() < 0.01);
        assert_eq!(quote.record.reference.as_str(), "D00001");
        assert_eq!(quote.record.entry_mode, EntryMode::Progiciel);
        assert_eq!(quote.record.total_with_tax, quote.totals.total_with_tax);
        assert_eq!(quote.record.salesperson_name, "GENERAL");
    }

    #[test]
    fn test_manual_quote_matches_progiciel() {
        let entry = ManualEntry {
            beams: vec![ManualBeamRow {
                profile: "157".to_string(),
                length_m: 6.9,
                stirrup_count: 12.0,
                count: 9.0,
            }],
            slabs: vec![ManualSlabRow {
                profile: "h16".to_string(),
                count: 113.0,
            }],
            inspection_surface_m2: 85.5,
            mesh_sheet_count: 12.0,
        };
        let manual = generate_quote(&request(QuantitySource::Manual(entry)), &Roster::default(), None).unwrap();
        let progiciel = generate_quote(
            &request(QuantitySource::Progiciel { text: EXPORT.to_string() }),
            &Roster::default(),
            None,
        )
        .unwrap();

        assert_eq!(manual.record.entry_mode, EntryMode::Manual);
        assert_eq!(manual.totals.subtotal_pretax, progiciel.totals.subtotal_pretax);
    }

    #[test]
    fn test_missing_export_is_empty_quote() {
        let quote = generate_quote(&request(QuantitySource::None), &Roster::default(), None).unwrap();
        assert!(quote.takeoff.is_empty());
        assert!(quote.totals.is_empty());
        assert_eq!(quote.totals.total_with_tax, 0.0);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = temp_dir().join("devis_test_quote_missing.csv");
        let _ = std::fs::remove_file(&path);
        let err = generate_quote(
            &request(QuantitySource::ProgicielFile { path }),
            &Roster::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "SOURCE_NOT_FOUND");
    }

    #[test]
    fn test_export_from_disk() {
        let path = temp_dir().join("devis_test_quote_export.csv");
        std::fs::write(&path, EXPORT).unwrap();
        let quote = generate_quote(
            &request(QuantitySource::ProgicielFile { path: path.clone() }),
            &Roster::default(),
            None,
        )
        .unwrap();
        assert_eq!(quote.takeoff.inspection_surface_m2, 85.5);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_reference_follows_previous() {
        let mut req = request(QuantitySource::None);
        let previous = QuoteReference::new("D00041");
        let quote = generate_quote(&req, &Roster::default(), Some(&previous)).unwrap();
        assert_eq!(quote.reference().as_str(), "D00042");

        req.header.reference = Some(QuoteReference::new("D00007"));
        let quote = generate_quote(&req, &Roster::default(), Some(&previous)).unwrap();
        assert_eq!(quote.reference().as_str(), "D00007");
    }

    #[test]
    fn test_simulate_transport_uses_given_takeoff() {
        let req = request(QuantitySource::Progiciel { text: EXPORT.to_string() });
        let quote = generate_quote(&req, &Roster::default(), None).unwrap();

        let pickup = simulate_transport(&quote.takeoff, &TransportConfig::default());
        assert!(pickup.is_free());

        let delivery = TransportConfig {
            delivery_mode: DeliveryMode::SiteDelivery,
            calc_mode: TransportCalcMode::Automatic,
            distance_km: 35.0,
            ..Default::default()
        };
        let result = simulate_transport(&quote.takeoff, &delivery);
        assert_eq!(result.truck_count, 1);
        assert!((result.total_weight_kg - (6.9 * 9.0 * 32.0 + 113.0 * 14.0)).abs() < 1e-9);
        assert!((result.chosen_total - result.auto_total).abs() < 1e-6);

        let mut priced = req.clone();
        priced.pricing.transport = delivery;
        let with_transport = generate_quote(&priced, &Roster::default(), None).unwrap();
        let beam = with_transport.totals.lines_of(LineKind::Beam).next().unwrap();
        assert!(beam.unit_price > quote.totals.lines_of(LineKind::Beam).next().unwrap().unit_price);
    }

    #[test]
    fn test_request_json() {
        let req: QuoteRequest = serde_json::from_str(
            r#"{
                "header": {"client_name": "SARL BATI OUEST", "salesperson_code": "jd"},
                "source": {"mode": "manual", "mesh_sheet_count": 2},
                "pricing": {"beam_discount_pct": 10}
            }"#,
        )
        .unwrap();
        assert_eq!(req.source.entry_mode(), EntryMode::Manual);
        assert_eq!(req.pricing.mesh_unit_price, 160.0);

        let none: QuoteRequest = serde_json::from_str(r#"{"source": {"mode": "none"}}"#).unwrap();
        assert_eq!(none.source, QuantitySource::None);
    }
}
