use crate::error::DashboardResult;
use crate::record::Record;
use crate::summary::format_date;
use serde::Serialize;
use std::path::Path;

/// Column layout of exported files. Uses the input header names so an
/// export can be dropped back into the records folder.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    fecha: String,
    nombre: &'a str,
    codigo: &'a str,
    prestamo: &'a str,
    banco: &'a str,
    oficial: &'a str,
    monto: f64,
    archivo: &'a str,
}

impl<'a> From<&'a Record> for ExportRow<'a> {
    fn from(record: &'a Record) -> Self {
        ExportRow {
            fecha: format_date(record.date),
            nombre: record.name.as_deref().unwrap_or(""),
            codigo: record.code.as_deref().unwrap_or(""),
            prestamo: record.loan_id.as_deref().unwrap_or(""),
            banco: record.bank.code(),
            oficial: record.officer.as_deref().unwrap_or(""),
            monto: record.amount,
            archivo: &record.source_file,
        }
    }
}

/// Write records to a CSV file, replacing it if present.
pub fn export_csv(records: &[Record], path: &Path) -> DashboardResult<usize> {
    let mut writer = csv::Writer::from_path(path)?;

    for record in records {
        writer.serialize(ExportRow::from(record))?;
    }
    writer.flush()?;

    log::info!("Exported {} records to {}", records.len(), path.display());
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ingest;
    use crate::record::Bank;
    use crate::source::LocalFolder;
    use chrono::NaiveDate;

    #[test]
    fn test_exported_file_can_be_ingested_again() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            Record::new("enero.xlsx")
                .with_date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
                .with_amount(1234.5)
                .with_bank(Bank::Popular)
                .with_name("Ana, hija")
                .with_code("0042"),
            Record::new("enero.xlsx").with_amount(10.0),
        ];

        let written = export_csv(&records, &dir.path().join("Conciliacion_Pagos_Actualizado.csv")).unwrap();
        assert_eq!(written, 2);

        let back = ingest(&LocalFolder::new(dir.path())).unwrap().records;
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].date, records[0].date);
        assert_eq!(back[0].amount, 1234.5);
        assert_eq!(back[0].bank, Bank::Popular);
        assert_eq!(back[0].name.as_deref(), Some("Ana, hija"));
        assert_eq!(back[0].code.as_deref(), Some("0042"));
        assert_eq!(back[1].date, None);
        assert_eq!(back[1].name, None);
        assert_eq!(back[1].source_file, "Conciliacion_Pagos_Actualizado.csv");
    }
}
