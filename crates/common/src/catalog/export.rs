//! Spreadsheet export of diff partitions and item sets
//!
//! Each export is written to a transient CSV artifact whose filename is
//! prefixed with the partition (or report) name. The caller transmits the
//! file and drops the handle, which deletes it.

use super::diff::PartitionTable;
use crate::crawl::ItemRecord;
use crate::errors::{AppError, Result};
use std::io::Write;
use tempfile::NamedTempFile;

/// Write one partition's display table to a transient CSV file
pub fn export_partition(table: &PartitionTable) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(table.partition().file_prefix())
        .suffix(".csv")
        .tempfile()?;

    {
        let mut writer = csv::Writer::from_writer(&mut file);
        writer
            .write_record(["name", "url", "search_url", "category_type"])
            .map_err(export_error)?;
        for row in table.unique() {
            writer
                .write_record([
                    row.name.as_str(),
                    row.url.as_str(),
                    row.search_url.as_str(),
                    row.category_type.label(),
                ])
                .map_err(export_error)?;
        }
        writer.flush()?;
    }
    file.flush()?;

    Ok(file)
}

/// Write a finished crawl's item set to a transient CSV report
pub fn export_items(items: &[ItemRecord]) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("category_report_")
        .suffix(".csv")
        .tempfile()?;

    {
        let mut writer = csv::Writer::from_writer(&mut file);
        writer
            .write_record([
                "name",
                "url",
                "category_name",
                "category_url",
                "price",
                "purchases",
                "turnover",
            ])
            .map_err(export_error)?;
        for item in items {
            let row = [
                item.name.clone(),
                item.url.clone(),
                item.category_name.clone(),
                item.category_url.clone(),
                item.price.to_string(),
                item.purchases.to_string(),
                item.turnover().to_string(),
            ];
            writer.write_record(&row).map_err(export_error)?;
        }
        writer.flush()?;
    }
    file.flush()?;

    Ok(file)
}

fn export_error(err: csv::Error) -> AppError {
    AppError::Internal {
        message: format!("CSV export failed: {}", err),
    }
}
