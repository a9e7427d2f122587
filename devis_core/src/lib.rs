//! # devis_core - Precast Floor Quote Engine
//!
//! `devis_core` prices quotes ("devis") for precast concrete floors: beams,
//! stirrups, slab blocks, technical inspection and welded mesh, with
//! delivery cost folded into the unit prices. Quantities come from the
//! estimating software's CSV export or from manual entry. All inputs and
//! outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: pricing and transport are pure functions of their input
//! - **Lenient input**: a messy export yields a partial takeoff, never a panic
//! - **Rich Errors**: structured error types for the few operations that can fail
//!
//! ## Quick Start
//!
//! ```rust
//! use devis_core::extractor::parse;
//! use devis_core::pricing::{price_takeoff, PricingConfig};
//!
//! let takeoff = parse("REPERE;SOUS TYPE;LONGUEUR/PAS ETRIERS;X;NOMBRE;LONGUEUR\nD;113;0;0;2;4\n");
//! let quote = price_takeoff(&takeoff, &PricingConfig::default());
//! assert_eq!(quote.subtotal_pretax, 231.12);
//! ```
//!
//! ## Modules
//!
//! - [`extractor`] - Progiciel CSV export parsing
//! - [`manual`] - Manual-entry normalization
//! - [`catalog`] - Product prices and weights
//! - [`pricing`] - Quote lines and totals
//! - [`transport`] - Truck count and transport rates
//! - [`quote`] - Request to priced quote and record
//! - [`record`] / [`ledger`] - Quote history with atomic saves and locking
//! - [`config`] - TOML application configuration
//! - [`units`] - Type-safe unit wrappers
//! - [`errors`] - Structured error types

pub mod catalog;
pub mod config;
pub mod errors;
pub mod extractor;
pub mod items;
pub mod ledger;
pub mod manual;
pub mod pricing;
pub mod quote;
pub mod record;
pub mod transport;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use config::AppConfig;
pub use errors::{DevisError, DevisResult};
pub use items::{BeamItem, SlabBlockItem, Takeoff};
pub use ledger::{load_ledger, load_ledger_or_default, save_ledger, FileLock, QuoteLedger};
pub use pricing::{compute_quote, PricingConfig, QuoteTotals};
pub use quote::{generate_quote, resolve_takeoff, simulate_transport, GeneratedQuote, QuantitySource, QuoteRequest};
pub use transport::{allocate_transport, TransportConfig, TransportResult};
