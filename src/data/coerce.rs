//! Stage 2: Field Coercion
//!
//! Converts text cells to typed values. A cell that cannot be read becomes
//! `None`, never 0.0, so a true zero (e.g. zero open interest) stays
//! distinguishable from "could not parse".

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median};
use tracing::warn;

use super::normalize::{ColumnMap, NormalizedTable};
use crate::config::CoerceConfig;
use crate::core::{CanonicalField, Cell, OptionSide};

/// Tokens read as "no value"
const MISSING_TOKENS: [&str; 6] = ["n/a", "na", "-", "--", "null", "none"];

/// Date formats tried in order for text expiration cells
///
/// `%y` precedes `%Y`: chrono reads "25" as year 0025 under `%Y`.
const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%Y%m%d",
];

/// Outcome of reading one cell as a number
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellParse {
    /// Empty or an explicit "N/A" style token
    Missing,
    /// Text that is not a number
    Invalid,
    Number { value: f64, percent: bool },
}

impl CellParse {
    pub fn value(&self) -> Option<f64> {
        match self {
            CellParse::Number { value, .. } => Some(*value),
            _ => None,
        }
    }
}

/// Read one cell as a number
///
/// Strips surrounding whitespace, a trailing `%`, currency symbols and
/// thousands separators; `(1.5)` reads as -1.5.
pub fn parse_cell(cell: &Cell) -> CellParse {
    match cell {
        Cell::Empty => CellParse::Missing,
        Cell::Number(v) if v.is_finite() => CellParse::Number {
            value: *v,
            percent: false,
        },
        Cell::Number(_) => CellParse::Invalid,
        Cell::Text(text) => parse_text(text),
    }
}

fn parse_text(text: &str) -> CellParse {
    let mut body = text.trim();
    if body.is_empty() || MISSING_TOKENS.contains(&body.to_ascii_lowercase().as_str()) {
        return CellParse::Missing;
    }

    let mut negative = false;
    if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        negative = true;
        body = inner.trim();
    }

    let mut percent = false;
    if let Some(stripped) = body.strip_suffix('%') {
        percent = true;
        body = stripped.trim_end();
    }

    if let Some(rest) = body.strip_prefix('-').or_else(|| body.strip_prefix('\u{2212}')) {
        negative = !negative;
        body = rest;
    } else if let Some(rest) = body.strip_prefix('+') {
        body = rest;
    }

    let digits: String = body
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    match digits.parse::<f64>() {
        Ok(v) if v.is_finite() => CellParse::Number {
            value: if negative { -v } else { v },
            percent,
        },
        _ => CellParse::Invalid,
    }
}

/// One coerced numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoercedColumn {
    pub field: CanonicalField,
    pub values: Vec<Option<f64>>,
    /// Empty / N/A cells
    pub missing: usize,
    /// Unparseable or out-of-domain cells
    pub invalid: usize,
    /// Column was read as percent points and scaled by 1/100
    pub percent: bool,
}

impl CoercedColumn {
    pub fn get(&self, row: usize) -> Option<f64> {
        self.values.get(row).copied().flatten()
    }
}

/// Coerce the cells of one numeric column
pub fn coerce_column(field: CanonicalField, cells: &[&Cell], config: &CoerceConfig) -> CoercedColumn {
    let parsed: Vec<CellParse> = cells.iter().map(|c| parse_cell(c)).collect();

    let percent = field == CanonicalField::ImpliedVol && {
        let any_percent = parsed
            .iter()
            .any(|p| matches!(p, CellParse::Number { percent: true, .. }));
        let plain: Vec<f64> = parsed
            .iter()
            .filter_map(|p| match p {
                CellParse::Number {
                    value,
                    percent: false,
                } => Some(value.abs()),
                _ => None,
            })
            .collect();
        // Median of plain magnitudes, not the maximum
        let plain_median = if plain.is_empty() {
            0.0
        } else {
            Data::new(plain).median()
        };
        any_percent || plain_median > config.percent_threshold
    };

    let mut missing = 0;
    let mut invalid = 0;
    let values = parsed
        .into_iter()
        .map(|p| match p {
            CellParse::Missing => {
                missing += 1;
                None
            }
            CellParse::Invalid => {
                invalid += 1;
                None
            }
            CellParse::Number { value, .. } => {
                let value = if percent { value / 100.0 } else { value };
                if in_domain(field, value) {
                    Some(value)
                } else {
                    invalid += 1;
                    None
                }
            }
        })
        .collect();

    CoercedColumn {
        field,
        values,
        missing,
        invalid,
        percent,
    }
}

fn in_domain(field: CanonicalField, value: f64) -> bool {
    match field {
        CanonicalField::OpenInterest | CanonicalField::Volume => value >= 0.0,
        CanonicalField::Delta => (-1.0..=1.0).contains(&value),
        _ => true,
    }
}

/// Read an expiration cell
///
/// Numeric cells are spreadsheet serial dates (days since 1899-12-30).
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Empty => None,
        Cell::Number(serial) => from_serial(*serial),
        Cell::Text(text) => {
            let text = text.trim();
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .or_else(|| text.parse::<f64>().ok().and_then(from_serial))
        }
    }
}

fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// One coerced expiration column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateColumn {
    pub values: Vec<Option<NaiveDate>>,
    pub missing: usize,
    pub invalid: usize,
}

pub fn coerce_date_column(cells: &[&Cell]) -> DateColumn {
    let mut missing = 0;
    let mut invalid = 0;
    let values = cells
        .iter()
        .map(|cell| {
            if cell.is_blank() {
                missing += 1;
                return None;
            }
            let date = parse_date(cell);
            if date.is_none() {
                invalid += 1;
            }
            date
        })
        .collect();

    DateColumn {
        values,
        missing,
        invalid,
    }
}

/// Non-fatal summary of cells that could not be read in one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoercionWarning {
    pub field: CanonicalField,
    pub column: usize,
    pub raw_header: String,
    pub missing: usize,
    pub invalid: usize,
}

impl CoercionWarning {
    pub fn message(&self) -> String {
        format!(
            "{} (column {} '{}'): {} invalid, {} missing",
            self.field, self.column, self.raw_header, self.invalid, self.missing
        )
    }
}

/// Typed view of a normalized table, addressed by physical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoercedTable {
    pub columns: ColumnMap,
    pub row_count: usize,
    pub numeric: BTreeMap<usize, CoercedColumn>,
    pub dates: BTreeMap<usize, DateColumn>,
    pub sides: BTreeMap<usize, Vec<Option<OptionSide>>>,
    pub warnings: Vec<CoercionWarning>,
}

impl CoercedTable {
    pub fn number(&self, col: usize, row: usize) -> Option<f64> {
        self.numeric.get(&col).and_then(|c| c.get(row))
    }

    pub fn date(&self, col: usize, row: usize) -> Option<NaiveDate> {
        self.dates
            .get(&col)
            .and_then(|c| c.values.get(row).copied().flatten())
    }

    pub fn side(&self, col: usize, row: usize) -> Option<OptionSide> {
        self.sides
            .get(&col)
            .and_then(|c| c.get(row).copied().flatten())
    }

    /// Total unreadable cells across all columns
    pub fn invalid_cells(&self) -> usize {
        self.warnings.iter().map(|w| w.invalid).sum()
    }
}

/// Coerce every bound column of a normalized table
pub fn coerce_table(table: &NormalizedTable, config: &CoerceConfig) -> CoercedTable {
    let mut numeric = BTreeMap::new();
    let mut dates = BTreeMap::new();
    let mut sides = BTreeMap::new();
    let mut warnings = Vec::new();

    for binding in &table.report.bindings {
        let cells = table.column_cells(binding.column);

        let (missing, invalid) = match binding.field {
            CanonicalField::Expiration => {
                let column = coerce_date_column(&cells);
                let counts = (column.missing, column.invalid);
                dates.insert(binding.column, column);
                counts
            }
            CanonicalField::Side => {
                let column: Vec<Option<OptionSide>> = cells
                    .iter()
                    .map(|c| OptionSide::from_indicator(&c.as_text()))
                    .collect();
                let unread = column.iter().filter(|s| s.is_none()).count();
                sides.insert(binding.column, column);
                (unread, 0)
            }
            field => {
                let column = coerce_column(field, &cells, config);
                let counts = (column.missing, column.invalid);
                numeric.insert(binding.column, column);
                counts
            }
        };

        if invalid > 0 {
            warn!(
                field = %binding.field,
                column = binding.column,
                invalid,
                "cells could not be coerced"
            );
        }
        if missing > 0 || invalid > 0 {
            warnings.push(CoercionWarning {
                field: binding.field,
                column: binding.column,
                raw_header: binding.raw_header.clone(),
                missing,
                invalid,
            });
        }
    }

    CoercedTable {
        columns: table.columns.clone(),
        row_count: table.row_count(),
        numeric,
        dates,
        sides,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeaderRow;
    use crate::core::RawTable;
    use crate::data::normalize;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn coerce_one(field: CanonicalField, cell: Cell) -> Option<f64> {
        coerce_column(field, &[&cell], &CoerceConfig::default()).values[0]
    }

    #[test]
    fn test_parse_cell_variants() {
        assert_eq!(parse_cell(&text(" 12.5 ")).value(), Some(12.5));
        assert_eq!(parse_cell(&text("$1,234.50")).value(), Some(1234.5));
        assert_eq!(parse_cell(&text("(2.5)")).value(), Some(-2.5));
        assert_eq!(parse_cell(&text("-$3")).value(), Some(-3.0));
        assert_eq!(parse_cell(&text("\u{2212}0.4")).value(), Some(-0.4));
        assert_eq!(parse_cell(&text("+7")).value(), Some(7.0));
        assert_eq!(
            parse_cell(&text("23%")),
            CellParse::Number {
                value: 23.0,
                percent: true
            }
        );
        assert_eq!(parse_cell(&Cell::Number(4.0)).value(), Some(4.0));
    }

    #[test]
    fn test_missing_and_invalid_tokens() {
        assert_eq!(parse_cell(&text("N/A")), CellParse::Missing);
        assert_eq!(parse_cell(&text("n/a")), CellParse::Missing);
        assert_eq!(parse_cell(&text("  ")), CellParse::Missing);
        assert_eq!(parse_cell(&Cell::Empty), CellParse::Missing);
        assert_eq!(parse_cell(&text("abc")), CellParse::Invalid);
        assert_eq!(parse_cell(&text("NaN")), CellParse::Invalid);
        assert_eq!(parse_cell(&text("inf")), CellParse::Invalid);
    }

    #[test]
    fn test_percent_round_trip() {
        let from_percent = coerce_one(CanonicalField::ImpliedVol, text("23%")).unwrap();
        let from_points = coerce_one(CanonicalField::ImpliedVol, text("23")).unwrap();
        let from_number = coerce_one(CanonicalField::ImpliedVol, Cell::Number(23.0)).unwrap();

        assert!((from_percent - 0.23).abs() < 1e-12);
        assert_eq!(from_percent, from_points);
        assert_eq!(from_points, from_number);
    }

    #[test]
    fn test_decimal_implied_vol_untouched() {
        let cells = [text("0.23"), text("0.41")];
        let refs: Vec<&Cell> = cells.iter().collect();
        let column = coerce_column(CanonicalField::ImpliedVol, &refs, &CoerceConfig::default());
        assert!(!column.percent);
        assert_eq!(column.values, vec![Some(0.23), Some(0.41)]);
    }

    #[test]
    fn test_decimal_column_with_deep_wing_stays_decimal() {
        let cells = [text("0.25"), text("0.31"), text("3.5")];
        let refs: Vec<&Cell> = cells.iter().collect();
        let column = coerce_column(CanonicalField::ImpliedVol, &refs, &CoerceConfig::default());

        assert!(!column.percent);
        assert_eq!(column.values, vec![Some(0.25), Some(0.31), Some(3.5)]);

        let cells = [text("0.25"), text("3.5")];
        let refs: Vec<&Cell> = cells.iter().collect();
        let column = coerce_column(CanonicalField::ImpliedVol, &refs, &CoerceConfig::default());
        assert_eq!(column.get(0), Some(0.25));
    }

    #[test]
    fn test_points_column_with_low_wing_scaled() {
        let cells = [text("1.5"), text("22"), text("35")];
        let refs: Vec<&Cell> = cells.iter().collect();
        let column = coerce_column(CanonicalField::ImpliedVol, &refs, &CoerceConfig::default());

        assert!(column.percent);
        assert!((column.get(0).unwrap() - 0.015).abs() < 1e-12);
        assert!((column.get(1).unwrap() - 0.22).abs() < 1e-12);
    }

    #[test]
    fn test_mixed_percent_column_scales_plain_cells() {
        let cells = [text("25%"), text("30")];
        let refs: Vec<&Cell> = cells.iter().collect();
        let column = coerce_column(CanonicalField::ImpliedVol, &refs, &CoerceConfig::default());
        assert!(column.percent);
        assert!((column.get(0).unwrap() - 0.25).abs() < 1e-12);
        assert!((column.get(1).unwrap() - 0.30).abs() < 1e-12);
    }

    #[test]
    fn test_percent_only_scales_implied_vol() {
        assert_eq!(coerce_one(CanonicalField::Gamma, text("5%")), Some(5.0));
    }

    #[test]
    fn test_missing_vs_zero_distinction() {
        let cells = [text("N/A"), text("0"), text("junk")];
        let refs: Vec<&Cell> = cells.iter().collect();
        let column = coerce_column(CanonicalField::OpenInterest, &refs, &CoerceConfig::default());

        assert_eq!(column.values, vec![None, Some(0.0), None]);
        assert_eq!(column.missing, 1);
        assert_eq!(column.invalid, 1);
    }

    #[test]
    fn test_out_of_domain_values_are_invalid() {
        assert_eq!(coerce_one(CanonicalField::OpenInterest, text("-5")), None);
        assert_eq!(coerce_one(CanonicalField::Volume, text("-1")), None);
        assert_eq!(coerce_one(CanonicalField::Delta, text("1.5")), None);
        assert_eq!(coerce_one(CanonicalField::Delta, text("-0.45")), Some(-0.45));
        assert_eq!(coerce_one(CanonicalField::Gamma, text("-0.01")), Some(-0.01));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 21).unwrap();
        for raw in ["2025-03-21", "03/21/2025", "3/21/25", "21-Mar-2025", "Mar 21, 2025", "20250321"] {
            assert_eq!(parse_date(&text(raw)), Some(expected), "{raw}");
        }
        // 45737 is 2025-03-21 as a spreadsheet serial
        assert_eq!(parse_date(&Cell::Number(45737.0)), Some(expected));
        assert_eq!(parse_date(&text("someday")), None);
    }

    #[test]
    fn test_coerce_table_collects_warnings() {
        let table = RawTable::from_strings(vec![
            vec!["Strike", "Gamma", "Exp", "Type"],
            vec!["100", "0.01", "2025-03-21", "C"],
            vec!["105", "bad", "soon", "P"],
            vec!["110", "N/A", "", "?"],
        ]);
        let normalized = normalize(&table, HeaderRow::Index(0)).unwrap();
        let coerced = coerce_table(&normalized, &CoerceConfig::default());

        assert_eq!(coerced.row_count, 3);
        assert_eq!(coerced.number(1, 0), Some(0.01));
        assert_eq!(coerced.number(1, 1), None);
        assert_eq!(coerced.side(3, 1), Some(OptionSide::Put));
        assert_eq!(coerced.side(3, 2), None);
        assert!(coerced.date(2, 0).is_some());
        assert_eq!(coerced.date(2, 1), None);

        let gamma = coerced
            .warnings
            .iter()
            .find(|w| w.field == CanonicalField::Gamma)
            .unwrap();
        assert_eq!((gamma.invalid, gamma.missing), (1, 1));
        assert_eq!(coerced.invalid_cells(), 2);
        assert!(gamma.message().contains("Gamma"));
    }
}
