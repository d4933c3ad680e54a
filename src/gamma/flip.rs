//! Gamma Flip Location
//!
//! Scans net gamma in strike order for the first sign change.

use serde::{Deserialize, Serialize};

use super::NetGammaByStrike;

/// How the flip strike was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlipKind {
    /// Linear interpolation between two opposite-signed strikes
    Interpolated,
    /// Net gamma is zero at a sampled strike between opposite signs
    AtStrike,
}

/// Located flip with its bracketing strikes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlipPoint {
    pub strike: f64,
    /// Last strike before the change
    pub lower: f64,
    /// First strike after the change
    pub upper: f64,
    pub kind: FlipKind,
}

fn sign(value: f64, epsilon: f64) -> i8 {
    if value.abs() <= epsilon {
        0
    } else if value > 0.0 {
        1
    } else {
        -1
    }
}

/// Locate the lowest-strike gamma flip
///
/// Values within `epsilon` of zero count as exactly zero. Returns `None` for
/// fewer than two points or when net gamma never changes sign.
pub fn locate_flip(series: &NetGammaByStrike, epsilon: f64) -> Option<FlipPoint> {
    let points = series.points();
    if points.len() < 2 {
        return None;
    }

    let mut last_nonzero: Option<usize> = None;

    for (i, point) in points.iter().enumerate() {
        let s = sign(point.net_gamma, epsilon);
        if s == 0 {
            continue;
        }

        if let Some(j) = last_nonzero {
            let prev = &points[j];
            if sign(prev.net_gamma, epsilon) != s {
                if j + 1 == i {
                    // s0 - g0 * (s1 - s0) / (g1 - g0)
                    let strike = prev.strike
                        - prev.net_gamma * (point.strike - prev.strike)
                            / (point.net_gamma - prev.net_gamma);
                    return Some(FlipPoint {
                        strike,
                        lower: prev.strike,
                        upper: point.strike,
                        kind: FlipKind::Interpolated,
                    });
                }

                return Some(FlipPoint {
                    strike: points[j + 1].strike,
                    lower: prev.strike,
                    upper: point.strike,
                    kind: FlipKind::AtStrike,
                });
            }
        }

        last_nonzero = Some(i);
    }

    None
}

/// Flip strike only
pub fn locate_gamma_flip(series: &NetGammaByStrike, epsilon: f64) -> Option<f64> {
    locate_flip(series, epsilon).map(|f| f.strike)
}
