//! # Devis CLI Application
//!
//! Terminal front end for the quote engine.
//!
//! ```text
//! devis_cli quote <export.csv> [config.toml]      price a progiciel export
//! devis_cli manual <entry.json> [config.toml]     price a manual-entry form
//! devis_cli transport <export.csv> <km> [config.toml]
//! devis_cli history [config.toml]
//! ```
//!
//! Quotes are appended to the ledger named in the configuration.

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use devis_core::config::AppConfig;
use devis_core::errors::{DevisError, DevisResult};
use devis_core::ledger::{load_ledger_or_default, save_ledger, FileLock, DEFAULT_HISTORY_LIMIT};
use devis_core::manual::ManualEntry;
use devis_core::pricing::QuoteTotals;
use devis_core::quote::{generate_quote, resolve_takeoff, simulate_transport, GeneratedQuote, QuantitySource, QuoteRequest};
use devis_core::record::QuoteHeader;
use devis_core::transport::{DeliveryMode, TransportResult};
use devis_core::units::{Kilograms, Tonnes};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "\
Usage:
  devis_cli quote <export.csv> [config.toml]
  devis_cli manual <entry.json> [config.toml]
  devis_cli transport <export.csv> <distance_km> [config.toml]
  devis_cli history [config.toml]";

fn prompt_string(prompt: &str, default: &str) -> String {
    print!("{}", prompt);
    if io::stdout().flush().is_err() {
        return default.to_string();
    }

    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input).is_err() {
        return default.to_string();
    }

    let input = input.trim();
    if input.is_empty() {
        default.to_string()
    } else {
        input.to_string()
    }
}

fn prompt_f64(prompt: &str, default: f64) -> f64 {
    prompt_string(prompt, "").replace(',', ".").parse().unwrap_or(default)
}

fn load_config(path: Option<&String>) -> DevisResult<AppConfig> {
    match path {
        Some(path) => AppConfig::load(Path::new(path)),
        None => Ok(AppConfig::default()),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devis_core=info,devis_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let outcome = match args.first().map(String::as_str) {
        Some("quote") if args.len() >= 2 => {
            let source = QuantitySource::ProgicielFile {
                path: PathBuf::from(&args[1]),
            };
            run_quote(source, args.get(2))
        }
        Some("manual") if args.len() >= 2 => read_manual_entry(Path::new(&args[1]))
            .and_then(|entry| run_quote(QuantitySource::Manual(entry), args.get(2))),
        Some("transport") if args.len() >= 3 => run_transport(&args[1], &args[2], args.get(3)),
        Some("history") => run_history(args.get(1)),
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!();
                eprintln!("Error JSON:");
                eprintln!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}

fn read_manual_entry(path: &Path) -> DevisResult<ManualEntry> {
    let text = fs::read_to_string(path)
        .map_err(|e| DevisError::file_error("read", path.display().to_string(), e.to_string()))?;
    Ok(serde_json::from_str(&text)?)
}

fn run_quote(source: QuantitySource, config_path: Option<&String>) -> DevisResult<()> {
    let config = load_config(config_path)?;
    let ledger_path = config.ledger_path();

    println!("Devis - Precast Floor Quote");
    println!("===========================");
    println!();

    let mut header = QuoteHeader::new(
        prompt_string("Client name: ", ""),
        prompt_string("Site address: ", ""),
    );
    header.client_code = prompt_string("Client code []: ", "");
    header.salesperson_code = prompt_string("Salesperson code [GA]: ", "GA");

    let mut pricing = config.pricing.clone();
    let distance = prompt_f64(
        &format!("Delivery distance in km, 0 for factory pickup [{}]: ", pricing.transport.distance_km),
        pricing.transport.distance_km,
    );
    if distance > 0.0 {
        pricing.transport.delivery_mode = DeliveryMode::SiteDelivery;
        pricing.transport.distance_km = distance;
    } else {
        pricing.transport.delivery_mode = DeliveryMode::FactoryPickup;
    }
    pricing.validate()?;

    let request = QuoteRequest { header, source, pricing };

    let lock = FileLock::acquire(&ledger_path, whoami())?;
    let mut ledger = load_ledger_or_default(&ledger_path)?;
    let quote = generate_quote(&request, &config.salespeople, ledger.last_reference())?;
    ledger.upsert(quote.record.clone());
    save_ledger(&ledger, &ledger_path)?;
    drop(lock);

    print_quote(&quote);

    println!();
    println!("JSON Output:");
    println!("{}", serde_json::to_string_pretty(&quote.totals)?);
    Ok(())
}

fn run_transport(export: &str, distance: &str, config_path: Option<&String>) -> DevisResult<()> {
    let config = load_config(config_path)?;
    let distance_km: f64 = distance
        .replace(',', ".")
        .parse()
        .map_err(|_| DevisError::invalid_input("distance_km", distance, "Distance must be a number"))?;

    let takeoff = resolve_takeoff(&QuantitySource::ProgicielFile {
        path: PathBuf::from(export),
    })?;

    let mut transport = config.pricing.transport.clone();
    transport.delivery_mode = DeliveryMode::SiteDelivery;
    transport.distance_km = distance_km;
    let result = simulate_transport(&takeoff, &transport);

    print_transport(&result, distance_km);
    println!();
    println!("JSON Output:");
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_history(config_path: Option<&String>) -> DevisResult<()> {
    let config = load_config(config_path)?;
    let ledger_path = config.ledger_path();
    let ledger = load_ledger_or_default(&ledger_path)?;
    debug!(path = %ledger_path.display(), records = ledger.len(), "ledger loaded");

    if ledger.is_empty() {
        println!("No quotes in {}", ledger_path.display());
        return Ok(());
    }

    println!("{:<8} {:<10} {:<28} {:>12} {:>12}  {}", "REF", "DATE", "CLIENT", "TOTAL HT", "TOTAL TTC", "SALES");
    for record in ledger.recent(DEFAULT_HISTORY_LIMIT) {
        println!(
            "{:<8} {:<10} {:<28} {:>12.2} {:>12.2}  {}",
            record.reference.as_str(),
            record.date.format("%d/%m/%Y").to_string(),
            truncate(&record.client, 28),
            record.total_pretax,
            record.total_with_tax,
            record.salesperson_code,
        );
    }
    Ok(())
}

fn print_quote(quote: &GeneratedQuote) {
    let record = &quote.record;
    let totals: &QuoteTotals = &quote.totals;

    println!();
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  QUOTE {}  -  {}", record.reference, record.date.format("%d/%m/%Y"));
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  Client:   {} {}", record.client, record.client_code);
    println!("  Site:     {}", record.site);
    println!("  Sales:    {} {}", record.salesperson_code, record.salesperson_name);
    println!("  Delivery: {}", record.delivery_mode.display_name());
    println!("  Entry:    {}", record.entry_mode.display_name());
    println!();

    if totals.is_empty() {
        println!("  (no quote lines)");
    }
    for line in &totals.lines {
        let stirrups = line.stirrup_count.map(|n| n.to_string()).unwrap_or_default();
        let count = if line.unit_count > 0 { line.unit_count.to_string() } else { String::new() };
        println!(
            "  {:<20} {:>10.2} {:>4} {:>5} {:>10.4} {:>12.2}",
            line.label, line.display_quantity, stirrups, count, line.unit_price, line.line_total
        );
    }

    println!();
    println!("  Weight:    {:>10.2} kg ({} truck(s))", totals.total_weight_kg, totals.truck_count);
    println!("  Transport: {:>10.2}", totals.chosen_transport_total);
    println!("  Total HT:  {:>10.2}", totals.subtotal_pretax);
    println!("  TVA:       {:>10.2}", totals.tax_amount);
    println!("  Total TTC: {:>10.2}", totals.total_with_tax);
    println!("═══════════════════════════════════════════════════════════════════");
}

fn print_transport(result: &TransportResult, distance_km: f64) {
    println!("═══════════════════════════════════════");
    println!("  TRANSPORT SIMULATION ({:.0} km)", distance_km);
    println!("═══════════════════════════════════════");
    println!("  Beams:  {:>10.2} m   {:>10.2} kg", result.total_beam_meters, result.beam_weight_kg);
    println!("  Slabs:  {:>10.0} u   {:>10.2} kg", result.total_slab_units, result.slab_weight_kg);
    let tonnes = Tonnes::from(Kilograms(result.total_weight_kg));
    println!("  Total weight:  {:.2} kg ({:.2} t)", result.total_weight_kg, tonnes.value());
    println!("  Trucks:        {} x {:.2}", result.truck_count, result.truck_price);
    println!("  Auto total:    {:.2}", result.auto_total);
    println!("  Beam rate:     {:.4} /m", result.beam_rate);
    println!("  Slab rate:     {:.4} /u", result.slab_rate);
    println!("  Charged:       {:.2}", result.chosen_total);
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max.saturating_sub(1)).chain(std::iter::once('…')).collect()
    }
}

fn whoami() -> String {
    env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| "devis_cli".to_string())
}
