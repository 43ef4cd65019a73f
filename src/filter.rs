// 🔎 Filter Engine
//
// Independent criteria over single fields, combined with AND.
// A criterion with nothing selected (empty set, empty query) is skipped.

use crate::record::{Field, FieldValue, Record, RecordSet};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// CRITERIA
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Inclusive `[low, high]`; both bounds must be the same kind of value
    Range { low: FieldValue, high: FieldValue },

    /// Value rendered as text must be in the set. Empty set = no restriction.
    OneOf(BTreeSet<String>),

    /// Case-insensitive substring. Empty query = no restriction.
    Contains(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub field: Field,
    pub condition: Condition,

    /// Let records without a value for `field` through. Off by default:
    /// absence is not vacuously true.
    pub pass_missing: bool,
}

impl Criterion {
    pub fn new(field: Field, condition: Condition) -> Self {
        Criterion {
            field,
            condition,
            pass_missing: false,
        }
    }

    pub fn date_range(from: NaiveDate, to: NaiveDate) -> Self {
        Criterion::new(
            Field::Date,
            Condition::Range {
                low: FieldValue::Date(from),
                high: FieldValue::Date(to),
            },
        )
    }

    pub fn amount_range(min: f64, max: f64) -> Self {
        Criterion::new(
            Field::Amount,
            Condition::Range {
                low: FieldValue::Amount(min),
                high: FieldValue::Amount(max),
            },
        )
    }

    pub fn one_of<I, S>(field: Field, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Criterion::new(field, Condition::OneOf(values.into_iter().map(Into::into).collect()))
    }

    pub fn contains(field: Field, query: impl Into<String>) -> Self {
        Criterion::new(field, Condition::Contains(query.into()))
    }

    pub fn keep_missing(mut self) -> Self {
        self.pass_missing = true;
        self
    }

    /// False for "no restriction" configurations, which are never evaluated
    pub fn is_active(&self) -> bool {
        match &self.condition {
            Condition::Range { .. } => true,
            Condition::OneOf(values) => !values.is_empty(),
            Condition::Contains(query) => !query.is_empty(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let value = match record.value(self.field) {
            Some(value) => value,
            None => return self.pass_missing,
        };

        match &self.condition {
            Condition::Range { low, high } => in_range(&value, low, high),
            Condition::OneOf(values) => values.contains(&value.to_string()),
            Condition::Contains(query) => value
                .to_string()
                .to_lowercase()
                .contains(&query.to_lowercase()),
        }
    }
}

fn in_range(value: &FieldValue, low: &FieldValue, high: &FieldValue) -> bool {
    match (value, low, high) {
        (FieldValue::Date(v), FieldValue::Date(lo), FieldValue::Date(hi)) => lo <= v && v <= hi,
        (FieldValue::Amount(v), FieldValue::Amount(lo), FieldValue::Amount(hi)) => lo <= v && v <= hi,
        (FieldValue::Text(v), FieldValue::Text(lo), FieldValue::Text(hi)) => lo <= v && v <= hi,
        _ => false,
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Records passing every active criterion, in their original order.
/// The input is left untouched.
pub fn apply(records: &[Record], criteria: &[Criterion]) -> RecordSet {
    let active: Vec<&Criterion> = criteria.iter().filter(|c| c.is_active()).collect();

    records
        .iter()
        .filter(|record| active.iter().all(|c| c.matches(record)))
        .cloned()
        .collect()
}

/// Sorted distinct values of a field, for multi-select options.
/// Records without the field contribute nothing.
pub fn distinct_values(records: &[Record], field: Field) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| record.value(field))
        .map(|value| value.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ============================================================================
// FILTER SET
// ============================================================================

/// The dashboard's filter panel: one optional date range, two
/// multi-selects and three text searches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default)]
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    #[serde(default)]
    pub banks: BTreeSet<String>,
    #[serde(default)]
    pub officers: BTreeSet<String>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub loan_id: String,
}

impl FilterSet {
    pub fn criteria(&self) -> Vec<Criterion> {
        let mut criteria = Vec::new();

        if let Some((from, to)) = self.date_range {
            criteria.push(Criterion::date_range(from, to));
        }
        criteria.push(Criterion::one_of(Field::Bank, self.banks.iter().cloned()));
        criteria.push(Criterion::one_of(Field::Officer, self.officers.iter().cloned()));
        criteria.push(Criterion::contains(Field::Code, self.code.clone()));
        criteria.push(Criterion::contains(Field::Name, self.name.clone()));
        criteria.push(Criterion::contains(Field::LoanId, self.loan_id.clone()));

        criteria
    }

    pub fn apply(&self, records: &[Record]) -> RecordSet {
        apply(records, &self.criteria())
    }

    pub fn is_empty(&self) -> bool {
        self.criteria().iter().all(|c| !c.is_active())
    }
}
