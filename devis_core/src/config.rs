//! # Application Configuration
//!
//! Commercial defaults, the salesperson roster and the ledger location, read
//! from a TOML file.
//!
//! ## Example
//!
//! ```toml
//! ledger_path = "devis_ledger.json"
//!
//! [pricing]
//! beam_discount_pct = 30.0
//! slab_discount_pct = 25.0
//!
//! [pricing.transport]
//! delivery_mode = "site_delivery"
//! distance_km = 35.0
//!
//! [salespeople]
//! GA = "GENERAL"
//! JD = "J. DUPONT"
//! ```
//!
//! Every section is optional. Missing values take the same defaults as the
//! quote form.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{DevisError, DevisResult};
use crate::pricing::PricingConfig;
use crate::record::Roster;

/// Ledger file used when the configuration names none
pub const DEFAULT_LEDGER_FILE: &str = "devis_ledger.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default commercial parameters for new quotes
    pub pricing: PricingConfig,

    /// Salesperson code → display name
    pub salespeople: Roster,

    /// Where quote records are kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_path: Option<PathBuf>,
}

impl AppConfig {
    /// Parse and validate a TOML document.
    ///
    /// `origin` only labels errors.
    pub fn from_toml_str(text: &str, origin: &str) -> DevisResult<Self> {
        let config: AppConfig =
            toml::from_str(text).map_err(|e| DevisError::config_error(origin, e.to_string()))?;
        config
            .pricing
            .validate()
            .map_err(|e| DevisError::config_error(origin, e.to_string()))?;
        Ok(config)
    }

    /// Load the configuration file at `path`.
    pub fn load(path: &Path) -> DevisResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| DevisError::config_error(path.display().to_string(), e.to_string()))?;
        let config = Self::from_toml_str(&text, &path.display().to_string())?;
        debug!(path = %path.display(), salespeople = config.salespeople.len(), "configuration loaded");
        Ok(config)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> DevisResult<String> {
        toml::to_string_pretty(self).map_err(|e| DevisError::SerializationError { reason: e.to_string() })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_FILE))
    }
}
