// 🧹 Normalization Rules - best-effort coercion of spreadsheet cells
//
// None of these functions fail. A cell that cannot be understood becomes
// `None` (dates), `0.0` (amounts) or `Bank::Unknown` (banks), so one bad
// cell never aborts a report.

use crate::record::Bank;
use chrono::NaiveDate;

// ============================================================================
// DATES
// ============================================================================

/// Spanish month names and their two-digit codes.
/// Names are mutually exclusive substrings, so replacement order is irrelevant.
const MONTHS: [(&str, &str); 13] = [
    ("enero", "01"),
    ("febrero", "02"),
    ("marzo", "03"),
    ("abril", "04"),
    ("mayo", "05"),
    ("junio", "06"),
    ("julio", "07"),
    ("agosto", "08"),
    ("septiembre", "09"),
    ("setiembre", "09"),
    ("octubre", "10"),
    ("noviembre", "11"),
    ("diciembre", "12"),
];

/// Connector words dropped between day, month and year ("5 de enero de 2024")
const CONNECTORS: [&str; 2] = ["de", "del"];

/// Parse a loosely formatted date such as `"5 de Enero de 2024"`,
/// `"05/01/2024"` or `"2024-01-05 00:00:00"`.
///
/// Day-first unless the first token has four digits (ISO year-first).
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let mut text = raw.to_uppercase().to_lowercase();
    for (name, number) in MONTHS {
        // padded so "5enero2024" still splits into three tokens
        text = text.replace(name, &format!(" {} ", number));
    }

    let tokens: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || matches!(c, '/' | '-' | '.' | ',' | ':' | 't'))
        .filter(|t| !t.is_empty() && !CONNECTORS.contains(t))
        .collect();

    if tokens.len() < 3 || !tokens.iter().all(|t| t.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }

    // Anything after the date must look like a time of day (hh mm ss [fraction])
    if tokens.len() > 7 {
        return None;
    }

    let (year, month, day) = if tokens[0].len() == 4 {
        (tokens[0], tokens[1], tokens[2])
    } else {
        (tokens[2], tokens[1], tokens[0])
    };

    let year: i32 = match year.len() {
        // 69-99 → 19xx, 00-68 → 20xx
        2 => match year.parse::<i32>().ok()? {
            short if short >= 69 => 1900 + short,
            short => 2000 + short,
        },
        4 => year.parse().ok()?,
        _ => return None,
    };
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Excel stores dates as days since 1899-12-30.
pub fn date_from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(chrono::Days::new(serial.trunc() as u64))
}

// ============================================================================
// AMOUNTS
// ============================================================================

/// Strip currency symbols and thousands separators, then parse.
/// Unparsable or non-finite input yields `0.0`.
///
/// `"$1,234.50"` → `1234.5`, `"RD$ 500"` → `500.0`, `"abc"` → `0.0`
pub fn normalize_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();

    let upper = cleaned.to_uppercase();
    let number = upper
        .strip_prefix("RD")
        .or_else(|| upper.strip_prefix("US"))
        .unwrap_or(&upper);

    match number.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Clamp an already-numeric cell to the finite-amount invariant.
pub fn finite_amount(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

// ============================================================================
// BANKS
// ============================================================================

/// Map free-text bank names onto the canonical codes.
///
/// Substring match in priority order, because source files spell the same
/// bank as "Reserva", "RESERVAS", "Ban Reservas", "BanReservas"...
pub fn normalize_bank(raw: &str) -> Bank {
    let folded = fold(raw);

    if folded.contains("popular") {
        Bank::Popular
    } else if folded.contains("reserva") {
        Bank::Banreservas
    } else {
        Bank::Unknown
    }
}

/// Lower-case, drop diacritics, keep only letters, digits and spaces.
fn fold(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect()
}
