//! Gamma Levels from an Option Chain
//!
//! Derives three levels from per-contract gamma:
//! - **Gamma flip**: strike where net dealer gamma changes sign
//! - **Put wall**: strike of most negative net gamma
//! - **Call wall**: strike of most positive net gamma
//!
//! Pipeline after cleaning:
//! 1. **Split**: partition contracts into calls and puts
//! 2. **Profile**: signed gamma summed per strike
//! 3. **Locate**: first sign change (flip) and extremes (walls)

mod flip;
mod pipeline;
mod profile;
mod split;
mod walls;

pub use flip::*;
pub use pipeline::*;
pub use profile::*;
pub use split::*;
pub use walls::*;

use serde::{Deserialize, Serialize};

use crate::core::{GammaError, GammaResult};

/// One point of a strike-indexed series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikePoint {
    pub strike: f64,
    pub net_gamma: f64,
}

/// Net gamma per strike, strictly increasing by strike
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetGammaByStrike {
    points: Vec<StrikePoint>,
}

impl NetGammaByStrike {
    /// Build from points; strikes must be finite and strictly increasing
    pub fn new(points: Vec<StrikePoint>) -> GammaResult<Self> {
        if let Some(bad) = points
            .iter()
            .find(|p| !p.strike.is_finite() || !p.net_gamma.is_finite())
        {
            return Err(GammaError::invalid_input(format!(
                "Non-finite point in gamma series at strike {}",
                bad.strike
            )));
        }
        if let Some(w) = points.windows(2).find(|w| w[1].strike <= w[0].strike) {
            return Err(GammaError::invalid_input(format!(
                "Gamma series not strictly increasing: {} then {}",
                w[0].strike, w[1].strike
            )));
        }
        Ok(Self { points })
    }

    /// Build from `(strike, net_gamma)` pairs
    pub fn from_pairs(pairs: &[(f64, f64)]) -> GammaResult<Self> {
        Self::new(
            pairs
                .iter()
                .map(|&(strike, net_gamma)| StrikePoint { strike, net_gamma })
                .collect(),
        )
    }

    pub fn points(&self) -> &[StrikePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn strikes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.strike).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.net_gamma).collect()
    }

    /// Net gamma at an exact strike
    pub fn value_at(&self, strike: f64) -> Option<f64> {
        self.points
            .binary_search_by(|p| p.strike.total_cmp(&strike))
            .ok()
            .map(|i| self.points[i].net_gamma)
    }

    /// New series restricted to `lo <= strike <= hi`
    pub fn filter_range(&self, lo: f64, hi: f64) -> Self {
        Self {
            points: self
                .points
                .iter()
                .filter(|p| p.strike >= lo && p.strike <= hi)
                .copied()
                .collect(),
        }
    }

    /// Sum of net gamma across all strikes
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.net_gamma).sum()
    }
}

/// Derived levels for one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GammaLevels {
    /// Absent when net gamma never changes sign
    pub gamma_flip: Option<f64>,
    pub put_wall: f64,
    pub call_wall: f64,
}

impl GammaLevels {
    /// Short text for display, "no flip detected" when absent
    pub fn describe_flip(&self) -> String {
        match self.gamma_flip {
            Some(flip) => format!("{:.2}", flip),
            None => "no flip detected".to_string(),
        }
    }
}
