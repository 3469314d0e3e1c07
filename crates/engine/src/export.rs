//! CSV export of the detail view.

use std::io::Write;

use serde::Serialize;

use crate::{ExpenseRecord, report};

/// Spreadsheet tools need the byte-order mark to read the file as UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Period")]
    period: String,
    #[serde(rename = "Department")]
    department: &'a str,
    #[serde(rename = "Parent_Description")]
    parent_description: &'a str,
    #[serde(rename = "Type_of_expense")]
    type_of_expense: &'a str,
    #[serde(rename = "DistributionBase")]
    distribution_base: &'static str,
    /// Missing amounts are written as zero, as the report counts them.
    #[serde(rename = "Sum")]
    sum: f64,
}

impl<'a> From<&'a ExpenseRecord> for ExportRow<'a> {
    fn from(record: &'a ExpenseRecord) -> Self {
        Self {
            period: record
                .period
                .map(|p| p.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            department: &record.department,
            parent_description: &record.parent_description,
            type_of_expense: &record.type_of_expense,
            distribution_base: record.distribution_base.label(),
            sum: record.amount(),
        }
    }
}

/// Writes `records` newest first, with a header row. Empty periods stay
/// empty cells.
pub fn write_csv<W: Write>(records: &[ExpenseRecord], mut writer: W) -> Result<(), csv::Error> {
    writer.write_all(UTF8_BOM)?;

    let mut csv = csv::Writer::from_writer(writer);
    if records.is_empty() {
        csv.write_record([
            "Period",
            "Department",
            "Parent_Description",
            "Type_of_expense",
            "DistributionBase",
            "Sum",
        ])?;
    }
    for record in &report::detail(records) {
        csv.serialize(ExportRow::from(record))?;
    }
    csv.flush()?;
    Ok(())
}

/// [`write_csv`] into memory.
pub fn to_csv_bytes(records: &[ExpenseRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut buffer = Vec::new();
    write_csv(records, &mut buffer)?;
    Ok(buffer)
}
