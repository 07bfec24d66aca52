//! Rotation-curve ingest and normalization.
//!
//! Turns a SPARC mass-model table (or an equivalent CSV) into validated
//! `GalaxyCurve`s.
//!
//! - **Row-level validation**: malformed rows are skipped and reported with
//!   their line number
//! - **Quality cuts**: `V_obs > 1 km/s`, `e_V_obs > 0`, `r > 0`
//! - **Galaxy-level validation**: rows are sorted by radius, then each galaxy
//!   is validated as a whole; invalid galaxies are reported as rejected
//! - **Deterministic**: galaxies come out in name order
//!
//! No fitting logic lives here.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use clap::ValueEnum;
use csv::StringRecord;
use serde::{Deserialize, Serialize};

use crate::bench::DensitySample;
use crate::data::hubble_type;
use crate::domain::{CurvePoint, GalaxyCurve, GalaxyMeta};
use crate::error::{AppError, ModelError};

/// Minimum observed velocity (km/s) for a row to be used.
pub const V_OBS_MIN: f64 = 1.0;

/// Minimum whitespace-separated tokens in a SPARC data line.
const SPARC_MIN_TOKENS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// `csv` for a `.csv` extension, `sparc` otherwise.
    Auto,
    /// Whitespace-separated SPARC mass-model table.
    Sparc,
    /// CSV with a header row.
    Csv,
}

impl InputFormat {
    pub fn resolve(self, path: &Path) -> InputFormat {
        match self {
            InputFormat::Auto => {
                let is_csv = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
                if is_csv { InputFormat::Csv } else { InputFormat::Sparc }
            }
            other => other,
        }
    }
}

/// Summary stats about the points actually used.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_galaxies: usize,
    pub n_points: usize,
    pub r_min: f64,
    pub r_max: f64,
    pub v_max: f64,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// A galaxy whose rows parsed but which failed curve validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedGalaxy {
    pub name: String,
    pub error: ModelError,
}

/// Ingest output: validated curves + stats + diagnostics.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub galaxies: Vec<GalaxyCurve>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rejected: Vec<RejectedGalaxy>,
    pub rows_read: usize,
    pub rows_used: usize,
}

impl IngestedData {
    pub fn galaxy(&self, name: &str) -> Option<&GalaxyCurve> {
        self.galaxies.iter().find(|g| g.name() == name)
    }
}

/// One parsed data row, before quality cuts.
#[derive(Debug, Clone, PartialEq)]
struct RawRow {
    galaxy: String,
    distance_mpc: Option<f64>,
    hubble_type: Option<u8>,
    point: CurvePoint,
}

#[derive(Debug, Default)]
struct ParsedRows {
    rows: Vec<RawRow>,
    row_errors: Vec<RowError>,
    rows_read: usize,
}

/// Load all galaxies from `path`.
pub fn load_galaxies(path: &Path, format: InputFormat) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open '{}': {e}", path.display())))?;

    match format.resolve(path) {
        InputFormat::Csv => parse_csv_reader(file),
        _ => parse_sparc_reader(BufReader::new(file)),
    }
}

/// Parse a whitespace-separated SPARC table.
///
/// Columns: galaxy, distance (Mpc), r (kpc), V_obs, e_V_obs, V_gas, V_disk,
/// V_bul, SB_disk, SB_bul (optional). Comment (`#`), blank and short lines are
/// skipped silently. A line with enough tokens and a numeric radius is
/// treated as data; if any other numeric field fails to parse it becomes a
/// row error.
pub fn parse_sparc_reader<R: BufRead>(reader: R) -> Result<IngestedData, AppError> {
    let mut parsed = ParsedRows::default();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| AppError::new(2, format!("Failed to read line {line_no}: {e}")))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() < SPARC_MIN_TOKENS || tokens[2].parse::<f64>().is_err() {
            continue;
        }
        parsed.rows_read += 1;

        match parse_sparc_tokens(&tokens) {
            Ok(row) => parsed.rows.push(row),
            Err(message) => parsed.row_errors.push(RowError {
                line: line_no,
                id: Some(tokens[0].to_string()),
                message,
            }),
        }
    }

    assemble(parsed)
}

fn parse_sparc_tokens(tokens: &[&str]) -> Result<RawRow, String> {
    let num = |i: usize, name: &str| parse_f64(tokens[i], name);
    let galaxy = tokens[0].to_string();
    Ok(RawRow {
        hubble_type: hubble_type(&galaxy),
        distance_mpc: Some(num(1, "dist")?),
        point: CurvePoint {
            radius: num(2, "r")?,
            v_obs: num(3, "v_obs")?,
            v_obs_err: num(4, "e_vobs")?,
            v_gas: num(5, "v_gas")?,
            v_disk: num(6, "v_disk")?,
            v_bul: num(7, "v_bul")?,
        },
        galaxy,
    })
}

/// Parse a CSV with a header row.
///
/// Required columns: `galaxy`, `r`, `v_obs`, `e_vobs` (or `ev`), `v_gas`,
/// `v_disk`. Optional: `dist`, `v_bul` (default 0), `sb_disk`, `sb_bul`, `t`
/// (Hubble type; falls back to the SPARC table).
pub fn parse_csv_reader<R: Read>(reader: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let mut parsed = ParsedRows::default();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; lines are 1-based.
        let line = result
            .as_ref()
            .ok()
            .and_then(|r| r.position())
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        parsed.rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                parsed.row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_csv_row(&record, &header_map) {
            Ok(row) => parsed.rows.push(row),
            Err(message) => parsed.row_errors.push(RowError {
                line,
                id: get_optional(&record, &header_map, "galaxy").map(str::to_string),
                message,
            }),
        }
    }

    assemble(parsed)
}

fn parse_csv_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<RawRow, String> {
    let galaxy = get_required(record, header_map, "galaxy")?.to_string();
    let err = get_optional(record, header_map, "e_vobs")
        .or_else(|| get_optional(record, header_map, "ev"))
        .ok_or_else(|| "Missing required value: `e_vobs`".to_string())?;

    let hubble = match get_optional(record, header_map, "t") {
        Some(s) => parse_hubble_type(s)?,
        None => hubble_type(&galaxy),
    };

    Ok(RawRow {
        distance_mpc: get_optional(record, header_map, "dist")
            .map(|s| parse_f64(s, "dist"))
            .transpose()?,
        hubble_type: hubble,
        point: CurvePoint {
            radius: parse_f64(get_required(record, header_map, "r")?, "r")?,
            v_obs: parse_f64(get_required(record, header_map, "v_obs")?, "v_obs")?,
            v_obs_err: parse_f64(err, "e_vobs")?,
            v_gas: parse_f64(get_required(record, header_map, "v_gas")?, "v_gas")?,
            v_disk: parse_f64(get_required(record, header_map, "v_disk")?, "v_disk")?,
            v_bul: get_optional(record, header_map, "v_bul")
                .map(|s| parse_f64(s, "v_bul"))
                .transpose()?
                .unwrap_or(0.0),
        },
        galaxy,
    })
}

/// Apply quality cuts, group by galaxy, sort by radius and validate.
fn assemble(parsed: ParsedRows) -> Result<IngestedData, AppError> {
    let ParsedRows {
        rows,
        row_errors,
        rows_read,
    } = parsed;

    let mut groups: BTreeMap<String, Vec<RawRow>> = BTreeMap::new();
    let mut rows_used = 0usize;
    for row in rows {
        if !passes_quality_cuts(&row.point) {
            continue;
        }
        rows_used += 1;
        groups.entry(row.galaxy.clone()).or_default().push(row);
    }

    let mut galaxies = Vec::with_capacity(groups.len());
    let mut rejected = Vec::new();
    for (name, mut rows) in groups {
        rows.sort_by(|a, b| a.point.radius.total_cmp(&b.point.radius));
        let meta = GalaxyMeta {
            distance_mpc: rows.iter().find_map(|r| r.distance_mpc),
            hubble_type: rows.iter().find_map(|r| r.hubble_type),
        };
        let points: Vec<CurvePoint> = rows.iter().map(|r| r.point).collect();
        match GalaxyCurve::from_points(name.clone(), &points, meta) {
            Ok(curve) => galaxies.push(curve),
            Err(error) => rejected.push(RejectedGalaxy { name, error }),
        }
    }

    let stats = compute_stats(&galaxies).ok_or_else(|| {
        AppError::new(3, "No valid galaxies remain after quality cuts and validation.")
    })?;

    Ok(IngestedData {
        galaxies,
        stats,
        row_errors,
        rejected,
        rows_read,
        rows_used,
    })
}

fn passes_quality_cuts(p: &CurvePoint) -> bool {
    p.v_obs > V_OBS_MIN && p.v_obs_err > 0.0 && p.radius > 0.0
}

fn compute_stats(galaxies: &[GalaxyCurve]) -> Option<DatasetStats> {
    if galaxies.is_empty() {
        return None;
    }
    let mut r_min = f64::INFINITY;
    let mut r_max = f64::NEG_INFINITY;
    let mut v_max = f64::NEG_INFINITY;
    let mut n_points = 0;
    for g in galaxies {
        n_points += g.len();
        r_min = r_min.min(g.radii()[0]);
        r_max = r_max.max(g.r_max());
        v_max = g.v_obs().iter().copied().fold(v_max, f64::max);
    }
    Some(DatasetStats {
        n_galaxies: galaxies.len(),
        n_points,
        r_min,
        r_max,
        v_max,
    })
}

/// Parsed `(M_bar, R_max, α)` table plus row diagnostics.
#[derive(Debug, Clone)]
pub struct DensityTable {
    pub samples: Vec<DensitySample>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a fitted-exponent table for `gbridge density`.
pub fn load_density_samples(path: &Path) -> Result<DensityTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open '{}': {e}", path.display())))?;
    parse_density_reader(file)
}

/// Parse a CSV with columns `galaxy`, `m_bar` (M_sun), `r_max` (kpc) and
/// `alpha`. Headers are case-insensitive. Rows that fail to parse are
/// recorded and skipped; value validation happens in `validate_alpha`.
pub fn parse_density_reader<R: Read>(reader: R) -> Result<DensityTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    for col in ["galaxy", "m_bar", "r_max", "alpha"] {
        if !header_map.contains_key(col) {
            return Err(AppError::new(2, format!("Missing required column: `{col}`")));
        }
    }

    let mut table = DensityTable {
        samples: Vec::new(),
        row_errors: Vec::new(),
        rows_read: 0,
    };
    for (idx, result) in reader.records().enumerate() {
        let line = result
            .as_ref()
            .ok()
            .and_then(|r| r.position())
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        table.rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                table.row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_density_row(&record, &header_map) {
            Ok(sample) => table.samples.push(sample),
            Err(message) => table.row_errors.push(RowError {
                line,
                id: get_optional(&record, &header_map, "galaxy").map(str::to_string),
                message,
            }),
        }
    }

    if table.samples.is_empty() {
        return Err(AppError::new(3, "No usable rows in density table."));
    }
    Ok(table)
}

fn parse_density_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<DensitySample, String> {
    Ok(DensitySample {
        name: get_required(record, header_map, "galaxy")?.to_string(),
        m_bar: parse_f64(get_required(record, header_map, "m_bar")?, "m_bar")?,
        r_max: parse_f64(get_required(record, header_map, "r_max")?, "r_max")?,
        alpha_fitted: parse_f64(get_required(record, header_map, "alpha")?, "alpha")?,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for col in ["galaxy", "r", "v_obs", "v_gas", "v_disk"] {
        if !header_map.contains_key(col) {
            return Err(AppError::new(2, format!("Missing required column: `{col}`")));
        }
    }
    if !header_map.contains_key("e_vobs") && !header_map.contains_key("ev") {
        return Err(AppError::new(2, "Missing required column: `e_vobs`"));
    }
    Ok(())
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid number for `{name}`: '{s}'")),
    }
}

/// Hubble type column: `-1` (or any value outside 0..=11) means unknown.
fn parse_hubble_type(s: &str) -> Result<Option<u8>, String> {
    let t = parse_f64(s, "t")?;
    if t.fract() == 0.0 && (0.0..=11.0).contains(&t) {
        Ok(Some(t as u8))
    } else {
        Ok(None)
    }
}
