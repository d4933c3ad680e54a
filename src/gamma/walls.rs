//! Put/Call Wall Location

use serde::{Deserialize, Serialize};

use super::NetGammaByStrike;
use crate::core::{GammaError, GammaResult};

/// Strikes of extreme net gamma
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Walls {
    /// Strike of minimum net gamma
    pub put_wall: f64,
    pub put_wall_gamma: f64,
    /// Strike of maximum net gamma
    pub call_wall: f64,
    pub call_wall_gamma: f64,
}

/// Locate put and call walls; ties go to the lowest strike
pub fn locate_walls(series: &NetGammaByStrike) -> GammaResult<Walls> {
    let points = series.points();
    let first = points
        .first()
        .ok_or_else(|| GammaError::empty_series("cannot locate walls on zero strikes"))?;

    let mut min = first;
    let mut max = first;

    // Strict comparisons keep the earliest (lowest) strike on ties
    for point in &points[1..] {
        if point.net_gamma < min.net_gamma {
            min = point;
        }
        if point.net_gamma > max.net_gamma {
            max = point;
        }
    }

    Ok(Walls {
        put_wall: min.strike,
        put_wall_gamma: min.net_gamma,
        call_wall: max.strike,
        call_wall_gamma: max.net_gamma,
    })
}
