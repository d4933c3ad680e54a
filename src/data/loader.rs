//! Delimited-text table loading
//!
//! Reads CSV/TSV exports of an option chain spreadsheet into a [`RawTable`]
//! without interpreting any row as a header; header detection belongs to the
//! normalizer.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::core::{Cell, GammaError, GammaResult, RawTable};

const UTF8_BOM: char = '\u{feff}';

/// Pick a delimiter from the file extension (`.tsv`/`.tab` -> tab, else comma)
pub fn delimiter_for_path(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("tab") => b'\t',
        _ => b',',
    }
}

/// Read a delimited text file into a raw table
pub fn read_table_from_path(path: impl AsRef<Path>, delimiter: Option<u8>) -> GammaResult<RawTable> {
    let path = path.as_ref();

    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if matches!(ext.to_ascii_lowercase().as_str(), "xlsx" | "xls" | "xlsm" | "ods") {
            return Err(GammaError::invalid_input(format!(
                "{} is a binary workbook; export the sheet as CSV first",
                path.display()
            )));
        }
    }

    let delimiter = delimiter.unwrap_or_else(|| delimiter_for_path(path));
    let file = std::fs::File::open(path)?;
    let table = read_table_from_reader(file, delimiter)?;

    debug!(
        path = %path.display(),
        rows = table.len(),
        width = table.width(),
        "loaded option chain table"
    );

    Ok(table)
}

/// Read delimited text from any reader; rows may be ragged
pub fn read_table_from_reader<R: Read>(reader: R, delimiter: u8) -> GammaResult<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row: Vec<Cell> = record
            .iter()
            .enumerate()
            .map(|(i, field)| {
                if rows.is_empty() && i == 0 {
                    Cell::from_text(field.trim_start_matches(UTF8_BOM))
                } else {
                    Cell::from_text(field)
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(RawTable::new(rows))
}
