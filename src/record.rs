// Payment records - the unified table every view is built from

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// BANK
// ============================================================================

/// Canonical bank code. Raw vendor text never survives normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bank {
    #[serde(rename = "BANRESERVAS")]
    Banreservas,
    #[serde(rename = "POPULAR")]
    Popular,
    /// Empty / unrecognized bank name
    #[serde(rename = "")]
    Unknown,
}

impl Bank {
    /// Short code used for display, filtering and grouping
    pub fn code(&self) -> &'static str {
        match self {
            Bank::Banreservas => "BANRESERVAS",
            Bank::Popular => "POPULAR",
            Bank::Unknown => "",
        }
    }

    pub fn from_code(code: &str) -> Option<Bank> {
        match code {
            "BANRESERVAS" => Some(Bank::Banreservas),
            "POPULAR" => Some(Bank::Popular),
            "" => Some(Bank::Unknown),
            _ => None,
        }
    }
}

impl Default for Bank {
    fn default() -> Self {
        Bank::Unknown
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// One payment entry, already normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Originating file name (provenance only)
    pub source_file: String,

    /// `None` when the source text could not be parsed into a calendar date
    pub date: Option<NaiveDate>,

    /// Always finite; unparsable input is stored as 0
    pub amount: f64,

    pub bank: Bank,

    // Pass-through columns, never normalized
    pub code: Option<String>,
    pub name: Option<String>,
    pub loan_id: Option<String>,
    pub officer: Option<String>,
}

impl Record {
    pub fn new(source_file: impl Into<String>) -> Self {
        Record {
            source_file: source_file.into(),
            date: None,
            amount: 0.0,
            bank: Bank::Unknown,
            code: None,
            name: None,
            loan_id: None,
            officer: None,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_bank(mut self, bank: Bank) -> Self {
        self.bank = bank;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_loan_id(mut self, loan_id: impl Into<String>) -> Self {
        self.loan_id = Some(loan_id.into());
        self
    }

    pub fn with_officer(mut self, officer: impl Into<String>) -> Self {
        self.officer = Some(officer.into());
        self
    }

    /// Value of a field, or `None` when the record has nothing there.
    ///
    /// The bank field is always present (unknown banks report `""`), so a
    /// set-membership filter can select the unknown bucket explicitly.
    pub fn value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::SourceFile => Some(FieldValue::Text(self.source_file.clone())),
            Field::Date => self.date.map(FieldValue::Date),
            Field::Amount => Some(FieldValue::Amount(self.amount)),
            Field::Bank => Some(FieldValue::Text(self.bank.code().to_string())),
            Field::Code => self.code.clone().map(FieldValue::Text),
            Field::Name => self.name.clone().map(FieldValue::Text),
            Field::LoanId => self.loan_id.clone().map(FieldValue::Text),
            Field::Officer => self.officer.clone().map(FieldValue::Text),
        }
    }
}

/// Ordered sequence of records: file enumeration order, then row order.
/// Duplicates across files are kept.
pub type RecordSet = Vec<Record>;

// ============================================================================
// FIELDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    SourceFile,
    Date,
    Amount,
    Bank,
    Code,
    Name,
    LoanId,
    Officer,
}

impl Field {
    /// Column header used in the source spreadsheets
    pub fn column(&self) -> &'static str {
        match self {
            Field::SourceFile => "archivo",
            Field::Date => "fecha",
            Field::Amount => "monto",
            Field::Bank => "banco",
            Field::Code => "codigo",
            Field::Name => "nombre",
            Field::LoanId => "prestamo",
            Field::Officer => "oficial",
        }
    }

    /// Map a lower-cased, trimmed header to a field. Accented spellings are
    /// accepted since spreadsheets are typed by hand.
    pub fn from_header(header: &str) -> Option<Field> {
        match header {
            "fecha" => Some(Field::Date),
            "monto" => Some(Field::Amount),
            "banco" => Some(Field::Bank),
            "codigo" | "código" => Some(Field::Code),
            "nombre" => Some(Field::Name),
            "prestamo" | "préstamo" => Some(Field::LoanId),
            "oficial" => Some(Field::Officer),
            _ => None,
        }
    }
}

/// Typed value of one record field
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum FieldValue {
    Date(NaiveDate),
    Amount(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Amount(a) => write!(f, "{}", a),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_pass_through_fields_are_absent() {
        let record = Record::new("pagos.xlsx").with_amount(10.0);

        assert_eq!(record.value(Field::Name), None);
        assert_eq!(record.value(Field::Date), None);
        assert_eq!(record.value(Field::Amount), Some(FieldValue::Amount(10.0)));
        assert_eq!(
            record.value(Field::Bank),
            Some(FieldValue::Text(String::new())),
            "unknown bank reports the empty code"
        );
    }

    #[test]
    fn test_header_aliases() {
        assert_eq!(Field::from_header("código"), Some(Field::Code));
        assert_eq!(Field::from_header("prestamo"), Some(Field::LoanId));
        assert_eq!(Field::from_header("comentario"), None);
    }

    #[test]
    fn test_bank_codes_roundtrip_through_serde() {
        let json = serde_json::to_string(&Bank::Banreservas).unwrap();
        assert_eq!(json, "\"BANRESERVAS\"");
        assert_eq!(Bank::from_code("POPULAR"), Some(Bank::Popular));
        assert_eq!(Bank::from_code("SCOTIA"), None);
    }
}
