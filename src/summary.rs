// 📊 Aggregation & Summary

use crate::record::{Bank, Record};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_amount: f64,
    pub record_count: usize,

    /// Sum of amounts per canonical bank, including the unknown bucket.
    /// Unordered; see `bank_totals_desc` for chart order.
    pub per_bank_totals: HashMap<Bank, f64>,
}

impl Summary {
    pub fn bank_total(&self, bank: Bank) -> f64 {
        self.per_bank_totals.get(&bank).copied().unwrap_or(0.0)
    }

    /// Largest total first; ties broken by bank code
    pub fn bank_totals_desc(&self) -> Vec<(Bank, f64)> {
        let mut totals: Vec<(Bank, f64)> = self.per_bank_totals.iter().map(|(b, t)| (*b, *t)).collect();
        totals.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        totals
    }
}

pub fn summarize(records: &[Record]) -> Summary {
    let mut summary = Summary::default();

    for record in records {
        summary.total_amount += record.amount;
        summary.record_count += 1;
        *summary.per_bank_totals.entry(record.bank).or_insert(0.0) += record.amount;
    }

    summary
}

// ============================================================================
// DISPLAY FORMATS
// ============================================================================

/// `1234.5` → `"$1,234.50"`, `-50.0` → `"-$50.00"`
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// Day-first display date; absent dates render empty
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_default()
}

/// Shorten text to `max_len` characters for fixed-width columns
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[]);

        assert_eq!(summary.total_amount, 0.0);
        assert_eq!(summary.record_count, 0);
        assert!(summary.per_bank_totals.is_empty());
    }

    #[test]
    fn test_groups_by_bank_including_unknown() {
        let records = vec![
            Record::new("a").with_amount(100.0).with_bank(Bank::Popular),
            Record::new("a").with_amount(20.0),
            Record::new("b").with_amount(50.0).with_bank(Bank::Banreservas),
            Record::new("b").with_amount(30.0).with_bank(Bank::Popular),
        ];

        let summary = summarize(&records);
        assert_eq!(summary.total_amount, 200.0);
        assert_eq!(summary.record_count, 4);
        assert_eq!(summary.bank_total(Bank::Popular), 130.0);
        assert_eq!(summary.bank_total(Bank::Banreservas), 50.0);
        assert_eq!(summary.bank_total(Bank::Unknown), 20.0);

        assert_eq!(
            summary.bank_totals_desc(),
            vec![(Bank::Popular, 130.0), (Bank::Banreservas, 50.0), (Bank::Unknown, 20.0)]
        );
    }

    #[test]
    fn test_summary_serializes_bank_codes() {
        let records = vec![Record::new("a").with_amount(1.0).with_bank(Bank::Popular)];
        let json = serde_json::to_value(summarize(&records)).unwrap();

        assert_eq!(json["per_bank_totals"]["POPULAR"], 1.0);
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(1234567.0), "$1,234,567.00");
        assert_eq!(format_currency(-50.0), "-$50.00");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(NaiveDate::from_ymd_opt(2024, 1, 5)), "05/01/2024");
        assert_eq!(format_date(None), "");
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("Ana", 10), "Ana");
        assert_eq!(truncate("José Ramírez Núñez", 10), "José Ra...");
        assert_eq!(truncate("abcdef", 2), "...");
    }
}
