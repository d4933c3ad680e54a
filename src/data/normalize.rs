//! Stage 1: Column Normalization
//!
//! Locates the header row and binds raw columns to the canonical vocabulary.
//! A field may bind to several columns when calls and puts sit side by side
//! around a shared Strike column.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::HeaderRow;
use crate::core::{CanonicalField, Cell, GammaError, GammaResult, RawTable};

/// One raw column matched to a canonical field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub field: CanonicalField,
    /// Physical column index
    pub column: usize,
    pub raw_header: String,
}

/// Diagnostics returned to the caller for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeReport {
    /// Row index the headers were read from
    pub header_row: usize,
    /// Header text of every column, in order
    pub detected_headers: Vec<String>,
    pub bindings: Vec<ColumnBinding>,
    /// Non-empty headers that matched no alias
    pub unmatched_headers: Vec<String>,
    /// Optional fields with no matching column
    pub missing_optional: Vec<CanonicalField>,
    /// Fully blank data rows that were skipped
    pub skipped_blank_rows: usize,
}

/// Canonical field -> physical column indices (ascending)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    columns: BTreeMap<CanonicalField, Vec<usize>>,
}

impl ColumnMap {
    pub fn from_bindings(bindings: &[ColumnBinding]) -> Self {
        let mut columns: BTreeMap<CanonicalField, Vec<usize>> = BTreeMap::new();
        for binding in bindings {
            columns.entry(binding.field).or_default().push(binding.column);
        }
        for indices in columns.values_mut() {
            indices.sort_unstable();
        }
        Self { columns }
    }

    /// All columns bound to a field
    pub fn columns(&self, field: CanonicalField) -> &[usize] {
        self.columns.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: CanonicalField) -> bool {
        !self.columns(field).is_empty()
    }

    /// Leftmost column bound to a field
    pub fn first(&self, field: CanonicalField) -> Option<usize> {
        self.columns(field).first().copied()
    }

    /// Closest column for `field` strictly left of `anchor`
    pub fn nearest_left(&self, field: CanonicalField, anchor: usize) -> Option<usize> {
        self.columns(field).iter().rev().copied().find(|&c| c < anchor)
    }

    /// Closest column for `field` strictly right of `anchor`
    pub fn nearest_right(&self, field: CanonicalField, anchor: usize) -> Option<usize> {
        self.columns(field).iter().copied().find(|&c| c > anchor)
    }

    /// The Strike column every layout shares
    pub fn strike_column(&self) -> Option<usize> {
        self.first(CanonicalField::Strike)
    }

    /// Wide layout: Gamma columns on both sides of the Strike column
    pub fn is_wide(&self) -> bool {
        match self.strike_column() {
            Some(strike) => {
                self.nearest_left(CanonicalField::Gamma, strike).is_some()
                    && self.nearest_right(CanonicalField::Gamma, strike).is_some()
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &[usize])> {
        self.columns.iter().map(|(f, c)| (*f, c.as_slice()))
    }
}

/// Table keyed by canonical fields, data rows only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTable {
    pub report: NormalizeReport,
    pub columns: ColumnMap,
    /// Data rows below the header row, blank rows removed
    pub rows: Vec<Vec<Cell>>,
}

static EMPTY_CELL: Cell = Cell::Empty;

impl NormalizedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Every cell of one physical column, top to bottom
    pub fn column_cells(&self, col: usize) -> Vec<&Cell> {
        (0..self.rows.len()).map(|row| self.cell(row, col)).collect()
    }
}

/// Normalize a raw table using the given header row convention
pub fn normalize(table: &RawTable, header_row: HeaderRow) -> GammaResult<NormalizedTable> {
    match header_row {
        HeaderRow::Index(idx) => normalize_at(table, idx),
        HeaderRow::Auto => {
            if table.len() > 1 {
                match normalize_at(table, 1) {
                    Ok(normalized) => return Ok(normalized),
                    Err(GammaError::Schema { field }) => {
                        debug!(%field, "header row 1 rejected, falling back to row 0");
                    }
                    Err(e) => return Err(e),
                }
            }
            normalize_at(table, 0)
        }
    }
}

fn normalize_at(table: &RawTable, header_idx: usize) -> GammaResult<NormalizedTable> {
    if header_idx >= table.len() {
        return Err(GammaError::invalid_input(format!(
            "Header row {} is beyond the table ({} rows)",
            header_idx,
            table.len()
        )));
    }

    let width = table.width();
    let detected_headers: Vec<String> = (0..width)
        .map(|col| table.cell(header_idx, col).as_text().trim().to_string())
        .collect();

    let mut bindings = Vec::new();
    let mut unmatched_headers = Vec::new();

    for (column, header) in detected_headers.iter().enumerate() {
        if header.is_empty() {
            continue;
        }
        match CanonicalField::from_header(header) {
            Some(field) => bindings.push(ColumnBinding {
                field,
                column,
                raw_header: header.clone(),
            }),
            None => unmatched_headers.push(header.clone()),
        }
    }

    let columns = ColumnMap::from_bindings(&bindings);

    for field in CanonicalField::REQUIRED {
        if !columns.has(field) {
            return Err(GammaError::schema(field));
        }
    }

    let missing_optional: Vec<CanonicalField> = CanonicalField::ALL
        .into_iter()
        .filter(|f| !f.is_required() && !columns.has(*f))
        .collect();

    let mut skipped_blank_rows = 0;
    let rows: Vec<Vec<Cell>> = table.rows[header_idx + 1..]
        .iter()
        .filter(|row| {
            let blank = row.iter().all(Cell::is_blank);
            if blank {
                skipped_blank_rows += 1;
            }
            !blank
        })
        .cloned()
        .collect();

    debug!(
        header_row = header_idx,
        bound = bindings.len(),
        unmatched = unmatched_headers.len(),
        rows = rows.len(),
        wide = columns.is_wide(),
        "normalized option chain table"
    );

    Ok(NormalizedTable {
        report: NormalizeReport {
            header_row: header_idx,
            detected_headers,
            bindings,
            unmatched_headers,
            missing_optional,
            skipped_blank_rows,
        },
        columns,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_column(header: &str) -> RawTable {
        RawTable::from_strings(vec![
            vec!["Strike", "Gamma", header],
            vec!["100", "0.01", "1"],
        ])
    }

    #[test]
    fn test_alias_robustness() {
        let cases = [
            ("Impl Vol", CanonicalField::ImpliedVol),
            ("impl vol.", CanonicalField::ImpliedVol),
            ("IMPLIEDVOL", CanonicalField::ImpliedVol),
            ("Open.Int", CanonicalField::OpenInterest),
            ("open.int.", CanonicalField::OpenInterest),
            (" OI ", CanonicalField::OpenInterest),
            ("Open Int", CanonicalField::OpenInterest),
            ("BID", CanonicalField::Bid),
            ("ask", CanonicalField::Ask),
            ("Exp", CanonicalField::Expiration),
            ("EXPIRATION", CanonicalField::Expiration),
        ];

        for (header, field) in cases {
            let normalized = normalize(&single_column(header), HeaderRow::Index(0)).unwrap();
            assert_eq!(normalized.columns.columns(field), &[2], "{header}");
            assert!(normalized.report.unmatched_headers.is_empty());
        }
    }

    #[test]
    fn test_missing_required_field() {
        let table = RawTable::from_strings(vec![vec!["Strike", "Delta"], vec!["100", "0.5"]]);
        let err = normalize(&table, HeaderRow::Index(0)).unwrap_err();
        assert!(matches!(
            err,
            GammaError::Schema {
                field: CanonicalField::Gamma
            }
        ));

        let table = RawTable::from_strings(vec![vec!["Gamma"], vec!["0.1"]]);
        let err = normalize(&table, HeaderRow::Index(0)).unwrap_err();
        assert!(matches!(
            err,
            GammaError::Schema {
                field: CanonicalField::Strike
            }
        ));
    }

    #[test]
    fn test_missing_optional_fields_reported() {
        let table = RawTable::from_strings(vec![vec!["Strike", "Gamma"], vec!["100", "0.1"]]);
        let normalized = normalize(&table, HeaderRow::Index(0)).unwrap();
        let missing = &normalized.report.missing_optional;
        assert!(missing.contains(&CanonicalField::Volume));
        assert!(missing.contains(&CanonicalField::Expiration));
        assert!(!missing.contains(&CanonicalField::Strike));
    }

    #[test]
    fn test_auto_prefers_second_row() {
        let table = RawTable::from_strings(vec![
            vec!["Calls", "", "Puts"],
            vec!["Gamma", "Strike", "Gamma"],
            vec!["0.02", "100", "0.03"],
        ]);
        let normalized = normalize(&table, HeaderRow::Auto).unwrap();
        assert_eq!(normalized.report.header_row, 1);
        assert_eq!(normalized.row_count(), 1);
        assert!(normalized.columns.is_wide());
    }

    #[test]
    fn test_auto_falls_back_to_first_row() {
        let table = RawTable::from_strings(vec![
            vec!["Strike", "Gamma"],
            vec!["100", "0.1"],
            vec!["105", "0.2"],
        ]);
        let normalized = normalize(&table, HeaderRow::Auto).unwrap();
        assert_eq!(normalized.report.header_row, 0);
        assert_eq!(normalized.row_count(), 2);
    }

    #[test]
    fn test_blank_rows_skipped_and_unmatched_listed() {
        let table = RawTable::from_strings(vec![
            vec!["Strike", "Gamma", "Last"],
            vec!["", "", ""],
            vec!["100", "0.1", "2.5"],
        ]);
        let normalized = normalize(&table, HeaderRow::Index(0)).unwrap();
        assert_eq!(normalized.report.skipped_blank_rows, 1);
        assert_eq!(normalized.report.unmatched_headers, vec!["Last".to_string()]);
        assert_eq!(normalized.row_count(), 1);
    }

    #[test]
    fn test_header_row_out_of_range() {
        let table = RawTable::from_strings(vec![vec!["Strike", "Gamma"]]);
        assert!(matches!(
            normalize(&table, HeaderRow::Index(3)),
            Err(GammaError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_column_map_neighbors() {
        let table = RawTable::from_strings(vec![vec![
            "Gamma", "OI", "Strike", "Gamma", "OI", "Volume",
        ]]);
        let normalized = normalize(&table, HeaderRow::Index(0)).unwrap();
        let map = &normalized.columns;

        assert_eq!(map.strike_column(), Some(2));
        assert_eq!(map.nearest_left(CanonicalField::OpenInterest, 2), Some(1));
        assert_eq!(map.nearest_right(CanonicalField::OpenInterest, 2), Some(4));
        assert_eq!(map.nearest_left(CanonicalField::Volume, 2), None);
        assert!(map.is_wide());
    }
}
