//! # Progiciel Export Extractor
//!
//! Reads the semicolon-separated export of the estimating software
//! ("progiciel") and pulls out the quantities a quote needs.
//!
//! ## Export Layout
//!
//! The export has no fixed schema. It is a sequence of loosely placed blocks
//! separated by blank lines. Two of them are tables, recognized by their
//! header row only:
//!
//! ```text
//! REPERE;SOUS TYPE;LONGUEUR/PAS ETRIERS;X;NOMBRE;LONGUEUR      <- beam schedule
//! D;157;12;0;9;6,9
//!
//! FAMILLE;DESIGNATION;...;...;...;...;NOMBRE                   <- slab schedule
//! BETON;H16;;;;;113
//! ```
//!
//! and two scalar values may appear on any row: the cell after a `SURFACE`
//! cell is the inspection surface, the cell after a `SURFACE TS` cell is the
//! welded-mesh surface.
//!
//! ## Leniency
//!
//! Rows that match nothing are skipped, short rows never index out of
//! bounds, and numeric cells that do not parse read as 0. The only failure
//! is an export file that cannot be opened.
//!
//! ## Example
//!
//! ```rust
//! use devis_core::extractor::parse;
//!
//! let export = "REPERE;SOUS TYPE;LONGUEUR/PAS ETRIERS;X;NOMBRE;LONGUEUR\n\
//!               D;157;12;0;9;6,9\n";
//! let takeoff = parse(export);
//! assert_eq!(takeoff.beams.len(), 1);
//! assert_eq!(takeoff.beams[0].length_m, 6.9);
//! ```

use std::borrow::Cow;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use encoding_rs::WINDOWS_1252;
use tracing::{debug, trace};

use crate::errors::{DevisError, DevisResult};
use crate::items::{BeamItem, SlabBlockItem, Takeoff};

const FIELD_SEPARATOR: char = ';';
const MESH_SURFACE_MARKER: &str = "SURFACE TS";
const INSPECTION_SURFACE_MARKER: &str = "SURFACE";

// Beam schedule columns
const BEAM_PROFILE_COL: usize = 1;
const BEAM_STIRRUP_COL: usize = 2;
const BEAM_COUNT_COL: usize = 4;
const BEAM_LENGTH_COL: usize = 5;

// Slab schedule columns
const SLAB_FAMILY_COL: usize = 0;
const SLAB_PROFILE_COL: usize = 1;
const SLAB_COUNT_COL: usize = 6;

/// Which table the current row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableMode {
    None,
    Beams,
    Slabs,
}

/// One export row with trimmed cells and bounds-checked access.
#[derive(Debug)]
struct Row {
    cells: Vec<String>,
}

impl Row {
    fn from_line(line: &str) -> Self {
        Row {
            cells: split_record(line)
                .into_iter()
                .map(|c| c.trim().to_string())
                .collect(),
        }
    }

    fn cell(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).map(String::as_str)
    }

    fn len(&self) -> usize {
        self.cells.len()
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    fn joined_upper(&self) -> String {
        self.cells.join(";").to_uppercase()
    }

    /// First non-empty cell strictly after `idx`
    fn next_value_after(&self, idx: usize) -> Option<&str> {
        self.cells
            .iter()
            .skip(idx + 1)
            .map(String::as_str)
            .find(|c| !c.is_empty())
    }

    fn is_beam_header(&self) -> bool {
        self.len() >= 6
            && self.cells[0].eq_ignore_ascii_case("REPERE")
            && self.cells[1].to_uppercase().starts_with("SOUS")
            && self.cells[4].eq_ignore_ascii_case("NOMBRE")
    }

    fn is_slab_header(&self) -> bool {
        self.len() >= 7
            && self.cells[0].eq_ignore_ascii_case("FAMILLE")
            && self.cells[1].eq_ignore_ascii_case("DESIGNATION")
            && self.cells[6].eq_ignore_ascii_case("NOMBRE")
    }
}

/// Surface values captured while scanning
#[derive(Debug, Default)]
struct Surfaces {
    inspection_m2: f64,
    mesh_m2: f64,
}

impl Surfaces {
    fn scan(&mut self, row: &Row) {
        let joined = row.joined_upper();

        if joined.contains(MESH_SURFACE_MARKER) {
            let marker = row
                .cells
                .iter()
                .position(|c| c.to_uppercase().contains(MESH_SURFACE_MARKER));
            if let Some(value) = marker.and_then(|idx| row.next_value_after(idx)) {
                self.mesh_m2 = parse_number(value);
            }
        } else if joined.contains(INSPECTION_SURFACE_MARKER) {
            let marker = row
                .cells
                .iter()
                .position(|c| c.eq_ignore_ascii_case(INSPECTION_SURFACE_MARKER));
            if let Some(value) = marker.and_then(|idx| row.next_value_after(idx)) {
                self.inspection_m2 = parse_number(value);
            }
        }
    }
}

/// Parse a numeric cell the way the export writes them.
///
/// Spaces and non-breaking spaces are removed (thousands separators), a comma
/// is read as the decimal point. Anything that still fails to parse, or
/// parses to a non-finite value, reads as 0.
pub fn parse_number(cell: &str) -> f64 {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Split one line into fields, honoring double-quoted fields.
///
/// A quoted field may contain the separator; `""` inside quotes is a literal
/// quote.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            FIELD_SEPARATOR if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn parse_beam_row(row: &Row) -> Option<BeamItem> {
    let profile = row.cell(BEAM_PROFILE_COL)?;
    if profile.is_empty() || !profile.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let stirrups = parse_number(row.cell(BEAM_STIRRUP_COL)?);
    let count = parse_number(row.cell(BEAM_COUNT_COL)?);
    let length = parse_number(row.cell(BEAM_LENGTH_COL)?);
    BeamItem::from_raw(profile, length, stirrups, count)
}

fn parse_slab_row(row: &Row) -> Option<SlabBlockItem> {
    if row.cell(SLAB_FAMILY_COL)?.is_empty() {
        return None;
    }
    let profile = row.cell(SLAB_PROFILE_COL)?.to_uppercase();
    if !profile.starts_with('H') {
        return None;
    }
    let count = parse_number(row.cell(SLAB_COUNT_COL)?);
    SlabBlockItem::from_raw(&profile, count)
}

/// Extract a takeoff from the raw text of a progiciel export.
///
/// Never fails: unrecognized content is skipped.
pub fn parse(raw: &str) -> Takeoff {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let mut takeoff = Takeoff::default();
    let mut surfaces = Surfaces::default();
    let mut mode = TableMode::None;

    for (line_num, line) in raw.lines().enumerate() {
        let row = Row::from_line(line);

        if row.is_blank() {
            mode = TableMode::None;
            continue;
        }

        // Surface markers can sit anywhere, including inside a table
        surfaces.scan(&row);

        if row.is_beam_header() {
            mode = TableMode::Beams;
            continue;
        }
        if row.is_slab_header() {
            mode = TableMode::Slabs;
            continue;
        }

        match mode {
            TableMode::Beams => match parse_beam_row(&row) {
                Some(beam) => takeoff.beams.push(beam),
                None => trace!(line = line_num + 1, "skipped beam schedule row"),
            },
            TableMode::Slabs => match parse_slab_row(&row) {
                Some(slab) => takeoff.slabs.push(slab),
                None => trace!(line = line_num + 1, "skipped slab schedule row"),
            },
            TableMode::None => {}
        }
    }

    takeoff.inspection_surface_m2 = surfaces.inspection_m2;
    takeoff.mesh_surface_m2 = surfaces.mesh_m2;

    debug!(
        beams = takeoff.beams.len(),
        slabs = takeoff.slabs.len(),
        inspection_surface_m2 = takeoff.inspection_surface_m2,
        mesh_surface_m2 = takeoff.mesh_surface_m2,
        "progiciel export parsed"
    );

    takeoff
}

/// Read and extract a progiciel export file.
///
/// The file is read as UTF-8 when it is valid UTF-8 and as Windows-1252
/// otherwise, so accented labels and non-breaking spaces in numbers survive.
///
/// # Returns
///
/// * `Ok(Takeoff)` - The extracted quantities (possibly empty)
/// * `Err(DevisError::SourceNotFound)` - The file does not exist or cannot be opened
/// * `Err(DevisError::FileError)` - The file opened but could not be read
pub fn parse_file(path: &Path) -> DevisResult<Takeoff> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => {
            DevisError::source_not_found(path.display().to_string())
        }
        _ if path.is_dir() => DevisError::source_not_found(path.display().to_string()),
        _ => DevisError::file_error("read", path.display().to_string(), e.to_string()),
    })?;

    Ok(parse(&decode_export(&bytes)))
}

fn decode_export(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            debug!("export is not UTF-8, decoding as Windows-1252");
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    const BEAM_HEADER: &str = "REPERE;SOUS TYPE;LONGUEUR/PAS ETRIERS;X;NOMBRE;LONGUEUR";
    const SLAB_HEADER: &str = "FAMILLE;DESIGNATION;LARGEUR;HAUTEUR;LONGUEUR;POIDS;NOMBRE";

    fn sample_export() -> String {
        [
            "CHANTIER;VILLA R+1;;;;",
            "",
            BEAM_HEADER,
            "D;157;12;0;9;6,9",
            "E;113;0;0;4;3,20",
            "F;115;8;0;0;4,1",
            "G;XX;8;0;2;4,1",
            "",
            SLAB_HEADER,
            "BETON;H16;;;;;113",
            "BETON;h12;;;;;1\u{a0}020",
            ";H20;;;;;50",
            "BETON;ENTREVOUS;;;;;10",
            "",
            "SURFACE;;85,5",
            "SURFACE TS;;;120",
        ]
        .join("\n")
    }

    #[test]
    fn test_beam_header_scenario() {
        let export = format!("{}\nD;157;12;0;9;6,9\n", BEAM_HEADER);
        let takeoff = parse(&export);
        assert_eq!(takeoff.beams.len(), 1);
        let beam = &takeoff.beams[0];
        assert_eq!(beam.profile_code, "157");
        assert_eq!(beam.length_m, 6.9);
        assert_eq!(beam.stirrup_count, 12);
        assert_eq!(beam.count, 9);
    }

    #[test]
    fn test_full_export() {
        let takeoff = parse(&sample_export());

        // Zero-count and non-numeric profile rows are dropped
        assert_eq!(takeoff.beams.len(), 2);
        assert_eq!(takeoff.beams[1].profile_code, "113");
        assert_eq!(takeoff.beams[1].length_m, 3.2);

        // Empty family and non-H designation rows are dropped
        assert_eq!(takeoff.slabs.len(), 2);
        assert_eq!(takeoff.slabs[0].profile_code, "H16");
        assert_eq!(takeoff.slabs[0].count, 113);
        assert_eq!(takeoff.slabs[1].profile_code, "H12");
        assert_eq!(takeoff.slabs[1].count, 1020);

        assert_eq!(takeoff.inspection_surface_m2, 85.5);
        assert_eq!(takeoff.mesh_surface_m2, 120.0);
    }

    #[test]
    fn test_blank_row_ends_table() {
        let export = format!("{}\nD;157;12;0;9;6,9\n;;;;;\nD;135;12;0;9;6,9\n", BEAM_HEADER);
        let takeoff = parse(&export);
        assert_eq!(takeoff.beams.len(), 1);
        assert_eq!(takeoff.beams[0].profile_code, "157");
    }

    #[test]
    fn test_slab_header_switches_table_without_blank_row() {
        let export = format!("{}\nD;157;12;0;9;6,9\n{}\nBETON;H16;;;;;40\n", BEAM_HEADER, SLAB_HEADER);
        let takeoff = parse(&export);
        assert_eq!(takeoff.beams.len(), 1);
        assert_eq!(takeoff.slabs.len(), 1);
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let export = format!("{}\nD;157;12\nD;114\n{}\nBETON;H16;;\n", BEAM_HEADER, SLAB_HEADER);
        let takeoff = parse(&export);
        assert!(takeoff.beams.is_empty());
        assert!(takeoff.slabs.is_empty());
    }

    #[test]
    fn test_header_too_short_is_not_a_header() {
        let takeoff = parse("REPERE;SOUS TYPE;X;Y;NOMBRE\nD;157;12;0;9;6,9\n");
        assert!(takeoff.beams.is_empty());
    }

    #[test]
    fn test_surface_inside_table() {
        let export = format!("{}\nD;157;12;0;9;6,9\nSURFACE;;;42,25;;\nD;113;0;0;1;2\n", BEAM_HEADER);
        let takeoff = parse(&export);
        assert_eq!(takeoff.inspection_surface_m2, 42.25);
        assert_eq!(takeoff.beams.len(), 2);
    }

    #[test]
    fn test_surface_ts_not_taken_as_inspection() {
        let takeoff = parse("SURFACE TS : ;;30\n");
        assert_eq!(takeoff.mesh_surface_m2, 30.0);
        assert_eq!(takeoff.inspection_surface_m2, 0.0);
    }

    #[test]
    fn test_surface_without_value_keeps_previous() {
        let takeoff = parse("SURFACE;12\nSURFACE;;;\n");
        assert_eq!(takeoff.inspection_surface_m2, 12.0);
    }

    #[test]
    fn test_quoted_cells() {
        let export = format!("{}\n\"D\";\"157\";\"12\";0;9;\"6,9\"\n", BEAM_HEADER);
        let takeoff = parse(&export);
        assert_eq!(takeoff.beams.len(), 1);
        assert_eq!(takeoff.beams[0].length_m, 6.9);
    }

    #[test]
    fn test_split_record() {
        assert_eq!(split_record("a;b;;c"), vec!["a", "b", "", "c"]);
        assert_eq!(split_record("\"a;b\";c"), vec!["a;b", "c"]);
        assert_eq!(split_record("\"say \"\"hi\"\"\";x"), vec!["say \"hi\"", "x"]);
        assert_eq!(split_record(""), vec![""]);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("6,9"), 6.9);
        assert_eq!(parse_number(" 1 020,5 "), 1020.5);
        assert_eq!(parse_number("1\u{a0}200"), 1200.0);
        assert_eq!(parse_number(""), 0.0);
        assert_eq!(parse_number("abc"), 0.0);
        assert_eq!(parse_number("inf"), 0.0);
        assert_eq!(parse_number("NaN"), 0.0);
    }

    #[test]
    fn test_bom_and_crlf() {
        let export = format!("\u{feff}{}\r\nD;157;12;0;9;6,9\r\n", BEAM_HEADER);
        let takeoff = parse(&export);
        assert_eq!(takeoff.beams.len(), 1);
    }

    #[test]
    fn test_parse_file_missing() {
        let path = temp_dir().join("devis_test_missing_export.csv");
        let _ = fs::remove_file(&path);
        let err = parse_file(&path).unwrap_err();
        assert_eq!(err.error_code(), "SOURCE_NOT_FOUND");
    }

    #[test]
    fn test_parse_file_roundtrip() {
        let path = temp_dir().join("devis_test_export.csv");
        fs::write(&path, sample_export()).unwrap();
        let takeoff = parse_file(&path).unwrap();
        assert_eq!(takeoff.beams.len(), 2);
        assert_eq!(takeoff.slabs.len(), 2);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_parse_file_windows_1252() {
        let path = temp_dir().join("devis_test_cp1252_export.csv");
        let mut bytes = format!("{}\n", SLAB_HEADER).into_bytes();
        bytes.extend_from_slice(b"B\xC9TON;H16;;;;;1\xA0020\n\nSURFACE;1\xA0250,5\n");
        fs::write(&path, &bytes).unwrap();

        let takeoff = parse_file(&path).unwrap();
        assert_eq!(takeoff.slabs.len(), 1);
        assert_eq!(takeoff.slabs[0].count, 1020);
        assert_eq!(takeoff.inspection_surface_m2, 1250.5);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_decode_export() {
        assert_eq!(decode_export("B\u{e9}ton".as_bytes()), "B\u{e9}ton");
        assert_eq!(decode_export(b"B\xE9ton 1\xA0020"), "B\u{e9}ton 1\u{a0}020");
    }
}
