//! Call/Put Chain Splitting
//!
//! Turns a coerced table into call and put [`ContractRecord`] collections.
//! Positional and side-column splits read the true side from the data;
//! strike-based splits are a heuristic and are flagged approximate.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median};
use tracing::{debug, warn};

use crate::config::{SplitConfig, SplitPolicy};
use crate::core::{CanonicalField, ContractRecord, GammaError, GammaResult, OptionSide};
use crate::data::CoercedTable;

/// Rule actually applied to a dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SplitMethod {
    Positional,
    SideColumn,
    MedianStrike { median: f64 },
    StrikeThreshold { threshold: f64 },
}

impl SplitMethod {
    /// Strike-based rules only approximate the true call/put classification
    pub fn is_approximate(&self) -> bool {
        matches!(
            self,
            SplitMethod::MedianStrike { .. } | SplitMethod::StrikeThreshold { .. }
        )
    }
}

/// Calls and puts after splitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSplit {
    pub calls: Vec<ContractRecord>,
    pub puts: Vec<ContractRecord>,
    pub method: SplitMethod,
    pub approximate: bool,
    /// Rows dropped because the strike was absent or not finite
    pub dropped_rows: usize,
    /// Rows whose side indicator could not be classified
    pub unclassified_rows: usize,
}

impl ChainSplit {
    /// Every record, calls first
    pub fn all(&self) -> impl Iterator<Item = &ContractRecord> {
        self.calls.iter().chain(self.puts.iter())
    }

    pub fn len(&self) -> usize {
        self.calls.len() + self.puts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }
}

/// Column chosen for each field on one side of the chain
#[derive(Debug, Clone, Default)]
struct SideView {
    gamma: Option<usize>,
    implied_vol: Option<usize>,
    open_interest: Option<usize>,
    volume: Option<usize>,
    delta: Option<usize>,
    theta: Option<usize>,
    vega: Option<usize>,
    bid: Option<usize>,
    ask: Option<usize>,
    expiration: Option<usize>,
}

impl SideView {
    fn build(mut pick: impl FnMut(CanonicalField) -> Option<usize>) -> Self {
        Self {
            gamma: pick(CanonicalField::Gamma),
            implied_vol: pick(CanonicalField::ImpliedVol),
            open_interest: pick(CanonicalField::OpenInterest),
            volume: pick(CanonicalField::Volume),
            delta: pick(CanonicalField::Delta),
            theta: pick(CanonicalField::Theta),
            vega: pick(CanonicalField::Vega),
            bid: pick(CanonicalField::Bid),
            ask: pick(CanonicalField::Ask),
            expiration: pick(CanonicalField::Expiration),
        }
    }

    fn record(&self, table: &CoercedTable, row: usize, strike: f64, side: OptionSide) -> ContractRecord {
        let num = |col: Option<usize>| col.and_then(|c| table.number(c, row));
        ContractRecord {
            strike,
            side,
            gamma: num(self.gamma),
            implied_vol: num(self.implied_vol),
            open_interest: num(self.open_interest),
            volume: num(self.volume),
            delta: num(self.delta),
            theta: num(self.theta),
            vega: num(self.vega),
            bid: num(self.bid),
            ask: num(self.ask),
            expiration: self.expiration.and_then(|c| table.date(c, row)),
        }
    }
}

/// Policy with `Auto` resolved
#[derive(Debug, Clone, Copy)]
enum SplitRule {
    Positional,
    SideColumn,
    MedianStrike,
    StrikeThreshold(f64),
}

/// Resolve `Auto` against the table layout
fn resolve_rule(table: &CoercedTable, policy: SplitPolicy) -> SplitRule {
    match policy {
        SplitPolicy::Positional => SplitRule::Positional,
        SplitPolicy::SideColumn => SplitRule::SideColumn,
        SplitPolicy::MedianStrike => SplitRule::MedianStrike,
        SplitPolicy::StrikeThreshold(t) => SplitRule::StrikeThreshold(t),
        SplitPolicy::Auto if table.columns.is_wide() => SplitRule::Positional,
        SplitPolicy::Auto if table.columns.has(CanonicalField::Side) => SplitRule::SideColumn,
        SplitPolicy::Auto => SplitRule::MedianStrike,
    }
}

/// Partition a coerced table into calls and puts
pub fn split_chain(table: &CoercedTable, config: &SplitConfig) -> GammaResult<ChainSplit> {
    let strike_col = table
        .columns
        .strike_column()
        .ok_or_else(|| GammaError::schema(CanonicalField::Strike))?;

    let strikes: Vec<Option<f64>> = (0..table.row_count)
        .map(|row| table.number(strike_col, row).filter(|s| s.is_finite()))
        .collect();
    let dropped_rows = strikes.iter().filter(|s| s.is_none()).count();
    if dropped_rows > 0 {
        warn!(dropped_rows, "rows without a usable strike were dropped");
    }

    let split = match resolve_rule(table, config.policy) {
        SplitRule::Positional => split_positional(table, strike_col, &strikes, dropped_rows)?,
        SplitRule::SideColumn => split_by_side_column(table, &strikes, dropped_rows)?,
        SplitRule::MedianStrike => {
            let known: Vec<f64> = strikes.iter().flatten().copied().collect();
            let median = if known.is_empty() {
                f64::NAN
            } else {
                Data::new(known).median()
            };
            split_by_strike(
                table,
                &strikes,
                dropped_rows,
                median,
                SplitMethod::MedianStrike { median },
            )
        }
        SplitRule::StrikeThreshold(threshold) => split_by_strike(
            table,
            &strikes,
            dropped_rows,
            threshold,
            SplitMethod::StrikeThreshold { threshold },
        ),
    };

    if split.approximate {
        warn!(
            method = ?split.method,
            "no call/put indicator in the data; split by strike is approximate"
        );
    }
    debug!(
        calls = split.calls.len(),
        puts = split.puts.len(),
        method = ?split.method,
        "split option chain"
    );

    Ok(split)
}

fn split_positional(
    table: &CoercedTable,
    strike_col: usize,
    strikes: &[Option<f64>],
    dropped_rows: usize,
) -> GammaResult<ChainSplit> {
    if !table.columns.is_wide() {
        return Err(GammaError::invalid_input(
            "positional split needs Gamma columns on both sides of the Strike column",
        ));
    }

    let call_view = SideView::build(|f| table.columns.nearest_left(f, strike_col));
    let put_view = SideView::build(|f| table.columns.nearest_right(f, strike_col));

    let mut calls = Vec::new();
    let mut puts = Vec::new();

    for (row, strike) in strikes.iter().enumerate() {
        let Some(strike) = *strike else { continue };

        let call = call_view.record(table, row, strike, OptionSide::Call);
        if !call.is_hollow() {
            calls.push(call);
        }
        let put = put_view.record(table, row, strike, OptionSide::Put);
        if !put.is_hollow() {
            puts.push(put);
        }
    }

    Ok(ChainSplit {
        calls,
        puts,
        method: SplitMethod::Positional,
        approximate: false,
        dropped_rows,
        unclassified_rows: 0,
    })
}

fn split_by_side_column(
    table: &CoercedTable,
    strikes: &[Option<f64>],
    dropped_rows: usize,
) -> GammaResult<ChainSplit> {
    let side_col = table.columns.first(CanonicalField::Side).ok_or_else(|| {
        GammaError::invalid_input("side-column split needs a call/put indicator column")
    })?;
    let view = SideView::build(|f| table.columns.first(f));

    let mut calls = Vec::new();
    let mut puts = Vec::new();
    let mut unclassified_rows = 0;

    for (row, strike) in strikes.iter().enumerate() {
        let Some(strike) = *strike else { continue };

        match table.side(side_col, row) {
            Some(OptionSide::Call) => calls.push(view.record(table, row, strike, OptionSide::Call)),
            Some(OptionSide::Put) => puts.push(view.record(table, row, strike, OptionSide::Put)),
            _ => unclassified_rows += 1,
        }
    }

    if unclassified_rows > 0 {
        warn!(unclassified_rows, "rows with an unreadable call/put indicator were dropped");
    }

    Ok(ChainSplit {
        calls,
        puts,
        method: SplitMethod::SideColumn,
        approximate: false,
        dropped_rows,
        unclassified_rows,
    })
}

fn split_by_strike(
    table: &CoercedTable,
    strikes: &[Option<f64>],
    dropped_rows: usize,
    pivot: f64,
    method: SplitMethod,
) -> ChainSplit {
    let view = SideView::build(|f| table.columns.first(f));

    let mut calls = Vec::new();
    let mut puts = Vec::new();

    for (row, strike) in strikes.iter().enumerate() {
        let Some(strike) = *strike else { continue };

        if strike <= pivot {
            calls.push(view.record(table, row, strike, OptionSide::Call));
        } else {
            puts.push(view.record(table, row, strike, OptionSide::Put));
        }
    }

    ChainSplit {
        calls,
        puts,
        method,
        approximate: method.is_approximate(),
        dropped_rows,
        unclassified_rows: 0,
    }
}
