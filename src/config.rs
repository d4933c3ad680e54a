//! Configuration for the gamma level pipeline

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::GammaResult;

/// Configuration for the full pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GammaConfig {
    /// Stage 1: Column normalization
    pub normalize: NormalizeConfig,
    /// Stage 2: Field coercion
    pub coerce: CoerceConfig,
    /// Stage 3: Call/put split
    pub split: SplitConfig,
    /// Stage 4: Gamma profile aggregation
    pub profile: ProfileConfig,
    /// Stage 5: Flip detection
    pub flip: FlipConfig,
}

impl GammaConfig {
    /// Dealer convention: calls positive, puts negative, plain gamma sum
    pub fn dealer_standard() -> Self {
        Self {
            profile: ProfileConfig {
                sign: GammaSign::NegatePuts,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Input gammas already carry dealer sign; preserve them
    pub fn as_reported() -> Self {
        Self {
            profile: ProfileConfig {
                sign: GammaSign::AsReported,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Gamma x open interest x contract multiplier (GEX profile)
    pub fn open_interest_weighted() -> Self {
        Self {
            profile: ProfileConfig {
                weight: ExposureWeight::OpenInterest { multiplier: 100.0 },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Load from a JSON file; missing sections take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> GammaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> GammaResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_string(&self) -> GammaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Which physical row holds the headers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderRow {
    /// Header at the given row index (0 or 1 in practice)
    Index(usize),
    /// Try row 1, fall back to row 0
    #[default]
    Auto,
}

/// Stage 1: Column normalization configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub header_row: HeaderRow,
}

/// Stage 2: Field coercion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoerceConfig {
    /// An implied vol column without `%` signs is read as percent points
    /// when the median of its magnitudes exceeds this
    /// Default: 3.0
    pub percent_threshold: f64,
}

impl Default for CoerceConfig {
    fn default() -> Self {
        Self {
            percent_threshold: 3.0,
        }
    }
}

/// Rule used to partition rows into calls and puts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SplitPolicy {
    /// Wide layout: columns left of Strike are calls, right are puts
    Positional,
    /// Explicit side indicator column
    SideColumn,
    /// Strike <= chain median is a call (approximate)
    MedianStrike,
    /// Strike <= threshold is a call (approximate)
    StrikeThreshold(f64),
    /// Positional if wide, else side column, else median strike
    Auto,
}

/// Stage 3: Split configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub policy: SplitPolicy,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            policy: SplitPolicy::Auto,
        }
    }
}

/// Sign convention applied to per-contract gamma before summing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GammaSign {
    /// Keep the sign found in the data
    AsReported,
    /// Calls positive, puts negative
    NegatePuts,
    /// Puts positive, calls negative
    NegateCalls,
    /// `AsReported` if any input gamma is negative, else `NegatePuts`
    Auto,
}

/// What each contract contributes to its strike bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ExposureWeight {
    /// Raw gamma
    Gamma,
    /// gamma * open interest * multiplier
    OpenInterest { multiplier: f64 },
}

/// Which contracts feed the profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisMode {
    Net,
    CallsOnly,
    PutsOnly,
}

/// Stage 4: Gamma profile configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub sign: GammaSign,
    pub weight: ExposureWeight,
    pub mode: AnalysisMode,
    /// Strikes are bucketed after rounding to this many decimals
    /// Default: 2
    pub strike_decimals: u32,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            sign: GammaSign::Auto,
            weight: ExposureWeight::Gamma,
            mode: AnalysisMode::Net,
            strike_decimals: 2,
        }
    }
}

/// Stage 5: Flip detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlipConfig {
    /// |net gamma| <= epsilon counts as exactly zero
    /// Default: 1e-9
    pub zero_epsilon: f64,
}

impl Default for FlipConfig {
    fn default() -> Self {
        Self { zero_epsilon: 1e-9 }
    }
}
