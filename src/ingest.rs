// 📥 Ingestion Pipeline
// Source files → raw tables → normalized records → one RecordSet
//
// A file that cannot be read or parsed is reported and skipped. Only when
// no file at all could be parsed does ingestion fail.

use crate::error::{DashboardError, DashboardResult};
use crate::normalize::{date_from_excel_serial, finite_amount, normalize_amount, normalize_bank, normalize_date};
use crate::record::{Field, Record, RecordSet};
use crate::source::{RecordSource, SourceHandle, TableFormat};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Cursor;

// ============================================================================
// OUTCOME
// ============================================================================

/// A source that was left out of the RecordSet, and why
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub records: RecordSet,

    /// Number of sources that parsed (possibly with zero rows)
    pub parsed_sources: usize,

    /// Per-file warnings, in enumeration order
    pub skipped: Vec<SourceFailure>,
}

/// Read every source of the store into one RecordSet.
///
/// Errors:
/// - `StoreUnavailable` if the store cannot be listed
/// - `NoDataAvailable` if no source parsed successfully
pub fn ingest(source: &dyn RecordSource) -> DashboardResult<IngestOutcome> {
    let handles = source.list_sources()?;
    let mut outcome = IngestOutcome::default();

    for handle in &handles {
        match load_source(source, handle) {
            Ok(mut records) => {
                log::debug!("{}: {} rows", handle.name, records.len());
                outcome.parsed_sources += 1;
                outcome.records.append(&mut records);
            }
            Err(e) => {
                log::warn!("Error reading {}: {}", handle.name, e);
                outcome.skipped.push(SourceFailure {
                    source: handle.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if outcome.parsed_sources == 0 {
        return Err(DashboardError::NoDataAvailable {
            location: source.location(),
        });
    }

    log::info!(
        "Ingested {} records from {} of {} files in {}",
        outcome.records.len(),
        outcome.parsed_sources,
        handles.len(),
        source.location()
    );

    Ok(outcome)
}

fn load_source(source: &dyn RecordSource, handle: &SourceHandle) -> DashboardResult<RecordSet> {
    let bytes = source.read(handle)?;

    parse_source(handle, bytes).map_err(|e| DashboardError::SourceUnreadable {
        name: handle.name.clone(),
        reason: format!("{:#}", e),
    })
}

/// Parse the raw bytes of one source into normalized records tagged with
/// the source name.
pub fn parse_source(handle: &SourceHandle, bytes: Vec<u8>) -> Result<RecordSet> {
    let rows = match handle.format {
        TableFormat::Workbook => read_workbook(bytes),
        TableFormat::Csv => read_csv(&bytes),
    }
    .with_context(|| format!("Failed to parse {}", handle.name))?;

    Ok(rows_to_records(&handle.name, rows))
}

// ============================================================================
// RAW TABLES
// ============================================================================

/// A spreadsheet cell before normalization
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    fn text(value: &str) -> Cell {
        if value.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// String rendering used for pass-through columns and text parsing.
    /// Whole numbers lose the ".0" spreadsheets add to numeric codes.
    fn render(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// First worksheet of an Excel/ODS workbook; first row is the header
fn read_workbook(bytes: Vec<u8>) -> Result<Vec<Vec<Cell>>> {
    use calamine::{Data, Reader};

    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .context("Failed to open workbook")?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("Workbook has no worksheets"))?
        .context("Failed to read first worksheet")?;

    let rows = range
        .rows()
        .map(|row| {
            row.iter()
                .map(|data| match data {
                    Data::Empty | Data::Error(_) => Cell::Empty,
                    Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s),
                    Data::Float(f) => Cell::Number(*f),
                    Data::Int(i) => Cell::Number(*i as f64),
                    Data::Bool(b) => Cell::Text(b.to_string()),
                    Data::DateTime(dt) => date_from_excel_serial(dt.as_f64())
                        .map(Cell::Date)
                        .unwrap_or(Cell::Empty),
                })
                .collect()
        })
        .collect();

    Ok(rows)
}

fn read_csv(bytes: &[u8]) -> Result<Vec<Vec<Cell>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (line_num, result) in reader.byte_records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV line {}", line_num + 1))?;
        rows.push(record.iter().map(|field| Cell::text(&decode_field(field))).collect());
    }

    Ok(rows)
}

/// UTF-8 when valid, otherwise Latin-1 (what Spanish-locale Excel writes)
fn decode_field(field: &[u8]) -> String {
    match std::str::from_utf8(field) {
        Ok(text) => text.to_string(),
        Err(_) => field.iter().map(|&b| b as char).collect(),
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn rows_to_records(source_name: &str, rows: Vec<Vec<Cell>>) -> RecordSet {
    let mut rows = rows.into_iter();

    let header = match rows.next() {
        Some(header) => header,
        None => return Vec::new(),
    };

    let columns = map_columns(&header);

    rows.filter(|row| !row.iter().all(Cell::is_empty))
        .map(|row| row_to_record(source_name, &columns, &row))
        .collect()
}

/// Lower-case and trim every header, then resolve it to a field. A repeated
/// header only counts the first time.
fn map_columns(header: &[Cell]) -> Vec<Option<Field>> {
    let mut seen = Vec::new();

    header
        .iter()
        .map(|cell| {
            let name = cell.render().unwrap_or_default();
            let name = name.trim_start_matches('\u{feff}').trim().to_lowercase();
            let field = Field::from_header(&name).filter(|f| !seen.contains(f))?;
            seen.push(field);
            Some(field)
        })
        .collect()
}

fn row_to_record(source_name: &str, columns: &[Option<Field>], row: &[Cell]) -> Record {
    let mut record = Record::new(source_name);

    for (idx, field) in columns.iter().enumerate() {
        let Some(field) = field else { continue };
        let cell = row.get(idx).unwrap_or(&Cell::Empty);

        match field {
            Field::Date => {
                record.date = match cell {
                    Cell::Date(d) => Some(*d),
                    other => other.render().and_then(|text| normalize_date(&text)),
                };
            }
            Field::Amount => {
                record.amount = match cell {
                    Cell::Number(n) => finite_amount(*n),
                    Cell::Text(text) => normalize_amount(text),
                    Cell::Empty | Cell::Date(_) => 0.0,
                };
            }
            Field::Bank => {
                record.bank = cell.render().map(|text| normalize_bank(&text)).unwrap_or_default();
            }
            Field::Code => record.code = cell.render(),
            Field::Name => record.name = cell.render(),
            Field::LoanId => record.loan_id = cell.render(),
            Field::Officer => record.officer = cell.render(),
            Field::SourceFile => {}
        }
    }

    record
}
