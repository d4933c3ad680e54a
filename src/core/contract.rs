//! Canonical option contract records
//!
//! A [`ContractRecord`] is one contract observation after normalization and
//! coercion. Absent values stay `None`; zero-filling is the explicit
//! [`ContractRecord::zero_filled`] step.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which side of the chain a contract belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionSide {
    Call,
    Put,
    Unknown,
}

impl OptionSide {
    /// +1 for call, -1 for put, 0 when unknown
    pub fn phi(&self) -> f64 {
        match self {
            OptionSide::Call => 1.0,
            OptionSide::Put => -1.0,
            OptionSide::Unknown => 0.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OptionSide::Call => "Call",
            OptionSide::Put => "Put",
            OptionSide::Unknown => "Unknown",
        }
    }

    /// Classify a side indicator cell ("C", "Call", "PUTS", ...)
    pub fn from_indicator(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "c" | "call" | "calls" => Some(OptionSide::Call),
            "p" | "put" | "puts" => Some(OptionSide::Put),
            _ => None,
        }
    }
}

/// One option contract after normalization/coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Strike price (always finite)
    pub strike: f64,
    pub side: OptionSide,
    pub gamma: Option<f64>,
    /// Implied volatility as a decimal fraction (0.23, not 23)
    pub implied_vol: Option<f64>,
    pub open_interest: Option<f64>,
    pub volume: Option<f64>,
    pub delta: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub expiration: Option<NaiveDate>,
}

impl ContractRecord {
    /// Record with only a strike and side; every other field absent
    pub fn new(strike: f64, side: OptionSide) -> Self {
        Self {
            strike,
            side,
            gamma: None,
            implied_vol: None,
            open_interest: None,
            volume: None,
            delta: None,
            theta: None,
            vega: None,
            bid: None,
            ask: None,
            expiration: None,
        }
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    pub fn with_open_interest(mut self, open_interest: f64) -> Self {
        self.open_interest = Some(open_interest);
        self
    }

    /// True when no numeric field other than strike carries a value
    pub fn is_hollow(&self) -> bool {
        [
            self.gamma,
            self.implied_vol,
            self.open_interest,
            self.volume,
            self.delta,
            self.theta,
            self.vega,
            self.bid,
            self.ask,
        ]
        .iter()
        .all(Option::is_none)
    }

    /// Zero-fill absent numeric fields for plotting and display
    pub fn zero_filled(&self) -> FilledRecord {
        FilledRecord {
            strike: self.strike,
            side: self.side,
            gamma: self.gamma.unwrap_or(0.0),
            implied_vol: self.implied_vol.unwrap_or(0.0),
            open_interest: self.open_interest.unwrap_or(0.0),
            volume: self.volume.unwrap_or(0.0),
            delta: self.delta.unwrap_or(0.0),
            expiration: self.expiration,
        }
    }
}

/// Display-ready record with absent values rendered as 0.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilledRecord {
    pub strike: f64,
    pub side: OptionSide,
    pub gamma: f64,
    pub implied_vol: f64,
    pub open_interest: f64,
    pub volume: f64,
    pub delta: f64,
    pub expiration: Option<NaiveDate>,
}

/// Zero-fill a record collection, keeping order
pub fn zero_fill(records: &[ContractRecord]) -> Vec<FilledRecord> {
    records.iter().map(ContractRecord::zero_filled).collect()
}
