// 🖥️ Dashboard - one render cycle: cached ingest → filter → summarize

use crate::cache::IngestCache;
use crate::error::DashboardResult;
use crate::filter::{distinct_values, FilterSet};
use crate::ingest::SourceFailure;
use crate::record::{Field, RecordSet};
use crate::summary::{summarize, Summary};
use serde::Serialize;

/// Everything the presentation layer needs for one screen
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub rows: RecordSet,
    pub summary: Summary,

    /// Rows before filtering
    pub total_records: usize,

    /// Files that were skipped during ingestion
    pub warnings: Vec<SourceFailure>,

    /// Choices for the multi-select filters, taken from the unfiltered data
    pub options: FilterOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub banks: Vec<String>,
    pub officers: Vec<String>,
}

pub struct Dashboard {
    cache: IngestCache,
}

impl Dashboard {
    pub fn new(cache: IngestCache) -> Self {
        Dashboard { cache }
    }

    /// Re-evaluate the whole pipeline for the given filters.
    /// `NoDataAvailable` / `StoreUnavailable` end the render cycle.
    pub fn render(&mut self, filters: &FilterSet) -> DashboardResult<DashboardView> {
        let outcome = self.cache.load()?;
        let rows = filters.apply(&outcome.records);
        let summary = summarize(&rows);

        Ok(DashboardView {
            summary,
            total_records: outcome.records.len(),
            warnings: outcome.skipped.clone(),
            options: FilterOptions {
                banks: distinct_values(&outcome.records, Field::Bank),
                officers: distinct_values(&outcome.records, Field::Officer),
            },
            rows,
        })
    }

    /// Manual refresh: the next render reads the store again
    pub fn refresh(&mut self) {
        self.cache.invalidate();
    }

    pub fn location(&self) -> String {
        self.cache.source().location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Bank;
    use crate::source::LocalFolder;
    use std::fs;
    use std::time::Duration;

    #[test]
    fn test_render_and_refresh() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("enero.csv"),
            "fecha,monto,banco,oficial\n1 de enero de 2024,$100.00,POPULAR,Luis\n",
        )
        .unwrap();

        let cache = IngestCache::new(Box::new(LocalFolder::new(dir.path())), Duration::from_secs(3600));
        let mut dashboard = Dashboard::new(cache);

        let view = dashboard.render(&FilterSet::default()).unwrap();
        assert_eq!(view.summary.record_count, 1);
        assert_eq!(view.options.banks, vec!["POPULAR"]);
        assert_eq!(view.options.officers, vec!["Luis"]);

        fs::write(
            dir.path().join("febrero.csv"),
            "fecha,monto,banco\n2 de febrero de 2024,$50,Reservas\n",
        )
        .unwrap();

        let cached = dashboard.render(&FilterSet::default()).unwrap();
        assert_eq!(cached.total_records, 1, "still inside the freshness window");

        dashboard.refresh();
        let view = dashboard.render(&FilterSet::default()).unwrap();
        assert_eq!(view.total_records, 2);
        assert_eq!(view.summary.bank_total(Bank::Banreservas), 50.0);

        let mut filters = FilterSet::default();
        filters.banks.insert("BANRESERVAS".to_string());
        let filtered = dashboard.render(&filters).unwrap();
        assert_eq!(filtered.rows.len(), 1);
        assert_eq!(filtered.total_records, 2);
        assert_eq!(filtered.summary.total_amount, 50.0);
    }
}
