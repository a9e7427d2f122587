//! # Quote Records
//!
//! What gets written down about a quote once it has been generated: the
//! header the operator filled in, the reference number and a summary of the
//! totals. Records are collected in the [`crate::ledger::QuoteLedger`].
//!
//! ## Structure
//!
//! ```text
//! QuoteRecord
//! ├── id: Uuid
//! ├── reference: QuoteReference (D00001, D00002, ...)
//! ├── header fields (date, client, site, salesperson)
//! ├── totals (pre-tax, with tax)
//! └── how it was produced (entry mode, delivery mode, calc mode)
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pricing::QuoteTotals;
use crate::transport::{DeliveryMode, TransportCalcMode};

/// Current schema version for ledger files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Salesperson used when the header names none
pub const DEFAULT_SALESPERSON_CODE: &str = "GA";

const DEFAULT_SALESPERSON_NAME: &str = "GENERAL";

/// Sequential quote reference: `D` followed by five digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct QuoteReference(String);

impl QuoteReference {
    pub const FIRST: &'static str = "D00001";

    /// Wrap an operator-supplied reference, trimmed.
    pub fn new(reference: impl Into<String>) -> Self {
        QuoteReference(reference.into().trim().to_string())
    }

    /// Sequence number of this reference, if it has one.
    ///
    /// The leading letter is not checked.
    pub fn number(&self) -> Option<u32> {
        let mut chars = self.0.chars();
        chars.next()?;
        chars.as_str().parse().ok()
    }

    /// The reference that follows `last`.
    ///
    /// Numbering restarts at `D00001` when there is no previous reference or
    /// it carries no number.
    pub fn next_after(last: Option<&QuoteReference>) -> QuoteReference {
        match last.and_then(QuoteReference::number) {
            Some(n) => QuoteReference(format!("D{:05}", n.saturating_add(1))),
            None => QuoteReference(Self::FIRST.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for QuoteReference {
    fn from(reference: String) -> Self {
        QuoteReference::new(reference)
    }
}

impl From<QuoteReference> for String {
    fn from(reference: QuoteReference) -> Self {
        reference.0
    }
}

impl fmt::Display for QuoteReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Salesperson roster: code → display name.
///
/// Codes are stored upper-case. The default salesperson is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Roster {
    names: BTreeMap<String, String>,
}

impl Default for Roster {
    fn default() -> Self {
        Roster::from(BTreeMap::new())
    }
}

impl From<BTreeMap<String, String>> for Roster {
    fn from(entries: BTreeMap<String, String>) -> Self {
        let mut names: BTreeMap<String, String> = entries
            .into_iter()
            .map(|(code, name)| (normalize_code(&code), name.trim().to_string()))
            .filter(|(code, _)| !code.is_empty())
            .collect();
        names
            .entry(DEFAULT_SALESPERSON_CODE.to_string())
            .or_insert_with(|| DEFAULT_SALESPERSON_NAME.to_string());
        Roster { names }
    }
}

impl From<Roster> for BTreeMap<String, String> {
    fn from(roster: Roster) -> Self {
        roster.names
    }
}

impl Roster {
    /// Display name for a code, case-insensitive.
    pub fn name_of(&self, code: &str) -> Option<&str> {
        self.names.get(&normalize_code(code)).map(String::as_str)
    }

    /// Normalized code and display name for a header's salesperson.
    ///
    /// A blank code falls back to the default salesperson; an unknown code
    /// keeps an empty name.
    pub fn resolve(&self, code: &str) -> (String, String) {
        let mut code = normalize_code(code);
        if code.is_empty() {
            code = DEFAULT_SALESPERSON_CODE.to_string();
        }
        let name = self.name_of(&code).unwrap_or_default().to_string();
        (code, name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(code, name)| (code.as_str(), name.as_str()))
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// How the quantities were entered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    #[default]
    Progiciel,
    Manual,
}

impl EntryMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            EntryMode::Progiciel => "Progiciel",
            EntryMode::Manual => "Saisie manuelle",
        }
    }
}

/// Header fields typed in by the operator.
///
/// ## JSON Example
///
/// ```json
/// {
///   "client_code": "C0412",
///   "client_name": "SARL BATI OUEST",
///   "site": "12 rue des Lilas, Rennes",
///   "level": "R+1",
///   "case_number": "A-2291",
///   "date": "2025-03-14",
///   "reference": null,
///   "salesperson_code": "ga",
///   "validity": "30 jours",
///   "vehicle": "SOLO"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteHeader {
    pub client_code: String,
    pub client_name: String,
    /// Site address
    pub site: String,
    /// Floor level served by the quote
    pub level: String,
    pub case_number: String,
    /// Quote date, today when absent
    pub date: Option<NaiveDate>,
    /// Operator-chosen reference; the next free one when absent or blank
    pub reference: Option<QuoteReference>,
    pub salesperson_code: String,
    pub validity: String,
    /// Delivery vehicle
    pub vehicle: String,
}

impl Default for QuoteHeader {
    fn default() -> Self {
        QuoteHeader {
            client_code: String::new(),
            client_name: String::new(),
            site: String::new(),
            level: String::new(),
            case_number: String::new(),
            date: None,
            reference: None,
            salesperson_code: DEFAULT_SALESPERSON_CODE.to_string(),
            validity: "30 jours".to_string(),
            vehicle: "SOLO".to_string(),
        }
    }
}

impl QuoteHeader {
    pub fn new(client_name: impl Into<String>, site: impl Into<String>) -> Self {
        QuoteHeader {
            client_name: client_name.into(),
            site: site.into(),
            ..Default::default()
        }
    }

    /// The header date, or today's local date.
    pub fn effective_date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }

    /// The header reference when one was given, otherwise the one after `previous`.
    pub fn effective_reference(&self, previous: Option<&QuoteReference>) -> QuoteReference {
        match &self.reference {
            Some(reference) if !reference.is_empty() => reference.clone(),
            _ => QuoteReference::next_after(previous),
        }
    }
}

/// Persisted summary of one generated quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub id: Uuid,
    pub reference: QuoteReference,
    pub date: NaiveDate,
    pub client: String,
    pub site: String,
    pub client_code: String,
    pub salesperson_code: String,
    pub salesperson_name: String,
    pub total_pretax: f64,
    pub total_with_tax: f64,
    pub entry_mode: EntryMode,
    pub delivery_mode: DeliveryMode,
    pub calc_mode: TransportCalcMode,
    pub created: DateTime<Utc>,
}

impl QuoteRecord {
    /// Summarize a priced quote.
    ///
    /// `reference` must already be resolved (see [`QuoteHeader::effective_reference`]).
    pub fn new(
        header: &QuoteHeader,
        reference: QuoteReference,
        roster: &Roster,
        totals: &QuoteTotals,
        entry_mode: EntryMode,
        delivery_mode: DeliveryMode,
        calc_mode: TransportCalcMode,
    ) -> Self {
        let (salesperson_code, salesperson_name) = roster.resolve(&header.salesperson_code);
        QuoteRecord {
            id: Uuid::new_v4(),
            reference,
            date: header.effective_date(),
            client: header.client_name.clone(),
            site: header.site.clone(),
            client_code: header.client_code.clone(),
            salesperson_code,
            salesperson_name,
            total_pretax: totals.subtotal_pretax,
            total_with_tax: totals.total_with_tax,
            entry_mode,
            delivery_mode,
            calc_mode,
            created: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(s: &str) -> QuoteReference {
        QuoteReference::new(s)
    }

    #[test]
    fn test_reference_numbering() {
        assert_eq!(QuoteReference::next_after(None).as_str(), "D00001");
        assert_eq!(QuoteReference::next_after(Some(&reference("D00041"))).as_str(), "D00042");
        assert_eq!(QuoteReference::next_after(Some(&reference("D99999"))).as_str(), "D100000");
        assert_eq!(QuoteReference::next_after(Some(&reference("DEVIS-7"))).as_str(), "D00001");
        assert_eq!(QuoteReference::next_after(Some(&reference(""))).as_str(), "D00001");
    }

    #[test]
    fn test_reference_number_ignores_prefix_letter() {
        assert_eq!(reference("X00012").number(), Some(12));
        assert_eq!(reference("D").number(), None);
    }

    #[test]
    fn test_roster_always_has_default() {
        let roster = Roster::default();
        assert_eq!(roster.name_of("ga"), Some("GENERAL"));
        assert_eq!(roster.len(), 1);

        let mut entries = BTreeMap::new();
        entries.insert(" jd ".to_string(), "J. DUPONT".to_string());
        entries.insert("GA".to_string(), "AGENCE".to_string());
        let roster = Roster::from(entries);
        assert_eq!(roster.name_of("JD"), Some("J. DUPONT"));
        assert_eq!(roster.name_of("GA"), Some("AGENCE"));
    }

    #[test]
    fn test_roster_resolve() {
        let roster = Roster::default();
        assert_eq!(roster.resolve(""), ("GA".to_string(), "GENERAL".to_string()));
        assert_eq!(roster.resolve(" ga"), ("GA".to_string(), "GENERAL".to_string()));
        assert_eq!(roster.resolve("zz"), ("ZZ".to_string(), String::new()));
    }

    #[test]
    fn test_header_defaults() {
        let header: QuoteHeader = serde_json::from_str(r#"{"client_name": "SARL BATI OUEST"}"#).unwrap();
        assert_eq!(header.salesperson_code, "GA");
        assert_eq!(header.validity, "30 jours");
        assert_eq!(header.vehicle, "SOLO");
        assert!(header.date.is_none());
        assert_eq!(header.effective_date(), Local::now().date_naive());
    }

    #[test]
    fn test_header_reference() {
        let mut header = QuoteHeader::new("Client", "Site");
        let last = reference("D00007");
        assert_eq!(header.effective_reference(Some(&last)).as_str(), "D00008");

        header.reference = Some(reference("   "));
        assert_eq!(header.effective_reference(Some(&last)).as_str(), "D00008");

        header.reference = Some(reference("D00003"));
        assert_eq!(header.effective_reference(Some(&last)).as_str(), "D00003");
    }

    #[test]
    fn test_header_reference_from_json_is_trimmed() {
        let last = reference("D00007");

        let blank: QuoteHeader = serde_json::from_str(r#"{"reference": "   "}"#).unwrap();
        assert_eq!(blank.reference.as_ref().map(QuoteReference::as_str), Some(""));
        assert_eq!(blank.effective_reference(Some(&last)).as_str(), "D00008");

        let padded: QuoteHeader = serde_json::from_str(r#"{"reference": " D00003 "}"#).unwrap();
        assert_eq!(padded.effective_reference(Some(&last)).as_str(), "D00003");
        assert_eq!(serde_json::to_string(&padded.reference).unwrap(), r#""D00003""#);
    }

    #[test]
    fn test_record_from_totals() {
        let header = QuoteHeader {
            client_code: "C0412".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 14),
            salesperson_code: "ga".to_string(),
            ..QuoteHeader::new("SARL BATI OUEST", "Rennes")
        };
        let totals = QuoteTotals {
            subtotal_pretax: 100.0,
            tax_amount: 20.0,
            total_with_tax: 120.0,
            ..Default::default()
        };

        let record = QuoteRecord::new(
            &header,
            reference("D00010"),
            &Roster::default(),
            &totals,
            EntryMode::Manual,
            DeliveryMode::SiteDelivery,
            TransportCalcMode::Automatic,
        );
        assert_eq!(record.id.get_version_num(), 4);
        assert_eq!(record.salesperson_code, "GA");
        assert_eq!(record.salesperson_name, "GENERAL");
        assert_eq!(record.total_with_tax, 120.0);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"entry_mode\":\"manual\""));
        assert!(json.contains("\"reference\":\"D00010\""));
        let parsed: QuoteRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
