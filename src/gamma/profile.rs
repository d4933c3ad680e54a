//! Gamma Profile Aggregation
//!
//! Reduces per-contract gamma to one signed value per strike.
//!
//! Sign convention: with [`GammaSign::NegatePuts`] dealers are taken to be long
//! call gamma and short put gamma, so put contributions are negated before
//! summing. `Auto` keeps reported signs only when negative gamma sits on one
//! side of the chain; unsigned input is never summed as-is.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use super::{NetGammaByStrike, StrikePoint};
use crate::config::{AnalysisMode, ExposureWeight, GammaSign, ProfileConfig};
use crate::core::{ContractRecord, GammaResult, OptionSide};

/// Aggregated profile with the convention that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GammaProfile {
    pub series: NetGammaByStrike,
    /// Resolved convention (never `Auto`)
    pub sign: GammaSign,
    pub weight: ExposureWeight,
    /// Records skipped for lacking a required field
    pub excluded: usize,
    /// Records dropped because the strike has no exact bucket key
    pub unbucketed: usize,
    /// Records with unknown side, summed with their reported sign
    pub unknown_side: usize,
}

/// Sign tally per side
#[derive(Debug, Default)]
struct SignCensus {
    calls_negative: usize,
    calls_positive: usize,
    puts_negative: usize,
    puts_positive: usize,
    negative: usize,
}

impl SignCensus {
    fn record(&mut self, side: OptionSide, gamma: f64) {
        if gamma < 0.0 {
            self.negative += 1;
        }
        match side {
            OptionSide::Call if gamma < 0.0 => self.calls_negative += 1,
            OptionSide::Call if gamma > 0.0 => self.calls_positive += 1,
            OptionSide::Put if gamma < 0.0 => self.puts_negative += 1,
            OptionSide::Put if gamma > 0.0 => self.puts_positive += 1,
            _ => {}
        }
    }

    /// Calls and puts carry opposite signs, in either orientation
    fn follows_sides(&self) -> bool {
        let calls_long = self.calls_negative == 0 && self.puts_positive == 0;
        let puts_long = self.calls_positive == 0 && self.puts_negative == 0;
        calls_long || puts_long
    }
}

/// Resolve `Auto` against the records
///
/// Gamma counts as already signed only when negative values line up with one
/// side of the chain. Stray negative cells in otherwise unsigned data fall
/// back to `NegatePuts`.
pub fn resolve_sign<'a>(
    records: impl IntoIterator<Item = &'a ContractRecord>,
    sign: GammaSign,
) -> GammaSign {
    if sign != GammaSign::Auto {
        return sign;
    }

    let mut census = SignCensus::default();
    for record in records {
        if let Some(gamma) = record.gamma {
            census.record(record.side, gamma);
        }
    }

    if census.negative == 0 {
        GammaSign::NegatePuts
    } else if census.follows_sides() {
        GammaSign::AsReported
    } else {
        warn!(
            negative_cells = census.negative,
            "negative gamma does not follow call/put sides; treating gamma as unsigned"
        );
        GammaSign::NegatePuts
    }
}

fn in_mode(record: &ContractRecord, mode: AnalysisMode) -> bool {
    match mode {
        AnalysisMode::Net => true,
        AnalysisMode::CallsOnly => record.side == OptionSide::Call,
        AnalysisMode::PutsOnly => record.side == OptionSide::Put,
    }
}

/// Unsigned exposure of one contract, `None` when a required field is absent
fn exposure(record: &ContractRecord, weight: ExposureWeight) -> Option<f64> {
    let gamma = record.gamma?;
    match weight {
        ExposureWeight::Gamma => Some(gamma),
        ExposureWeight::OpenInterest { multiplier } => {
            Some(gamma * record.open_interest? * multiplier)
        }
    }
}

fn signed(value: f64, side: OptionSide, sign: GammaSign) -> f64 {
    match (sign, side) {
        (_, OptionSide::Unknown) => value,
        (GammaSign::NegatePuts, _) => value * side.phi(),
        (GammaSign::NegateCalls, _) => -value * side.phi(),
        _ => value,
    }
}

/// Largest bucket key that converts back to `f64` exactly
const MAX_STRIKE_KEY: f64 = 9_007_199_254_740_992.0;

/// Integer bucket for a strike at the given decimal precision
///
/// `None` when the scaled strike does not fit an exact integer key.
pub fn strike_key(strike: f64, decimals: u32) -> Option<i64> {
    let scaled = (strike * 10f64.powi(decimals as i32)).round();
    if scaled.is_finite() && scaled.abs() <= MAX_STRIKE_KEY {
        Some(scaled as i64)
    } else {
        None
    }
}

/// Aggregate records into a net gamma series
pub fn aggregate(records: &[ContractRecord], config: &ProfileConfig) -> GammaResult<GammaProfile> {
    let in_scope: Vec<&ContractRecord> = records
        .iter()
        .filter(|r| in_mode(r, config.mode))
        .collect();
    let sign = resolve_sign(in_scope.iter().copied(), config.sign);

    let mut buckets: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    let mut excluded = 0;
    let mut unknown_side = 0;
    let mut unbucketed = 0;

    for record in &in_scope {
        let Some(value) = exposure(record, config.weight) else {
            excluded += 1;
            continue;
        };
        let Some(key) = strike_key(record.strike, config.strike_decimals) else {
            unbucketed += 1;
            continue;
        };
        if record.side == OptionSide::Unknown {
            unknown_side += 1;
        }
        buckets
            .entry(key)
            .or_default()
            .push(signed(value, record.side, sign));
    }

    if unbucketed > 0 {
        warn!(
            unbucketed,
            decimals = config.strike_decimals,
            "strikes too large to bucket were dropped"
        );
    }

    let scale = 10f64.powi(config.strike_decimals as i32);
    let points = buckets
        .into_iter()
        .map(|(key, mut values)| {
            // Fixed summation order keeps the result independent of row order
            values.sort_by(f64::total_cmp);
            StrikePoint {
                strike: key as f64 / scale,
                net_gamma: values.iter().sum(),
            }
        })
        .collect();

    let series = NetGammaByStrike::new(points)?;

    debug!(
        strikes = series.len(),
        excluded,
        unbucketed,
        unknown_side,
        sign = ?sign,
        "aggregated gamma profile"
    );

    Ok(GammaProfile {
        series,
        sign,
        weight: config.weight,
        excluded,
        unbucketed,
        unknown_side,
    })
}

/// Unsigned per-side profile, for charting calls or puts alone
pub fn side_profile(
    records: &[ContractRecord],
    side: OptionSide,
    config: &ProfileConfig,
) -> GammaResult<NetGammaByStrike> {
    let mode = match side {
        OptionSide::Call => AnalysisMode::CallsOnly,
        OptionSide::Put => AnalysisMode::PutsOnly,
        OptionSide::Unknown => AnalysisMode::Net,
    };
    let config = ProfileConfig {
        sign: GammaSign::AsReported,
        mode,
        ..config.clone()
    };
    Ok(aggregate(records, &config)?.series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(strike: f64, gamma: f64) -> ContractRecord {
        ContractRecord::new(strike, OptionSide::Call).with_gamma(gamma)
    }

    fn put(strike: f64, gamma: f64) -> ContractRecord {
        ContractRecord::new(strike, OptionSide::Put).with_gamma(gamma)
    }

    #[test]
    fn test_negate_puts_by_default_for_unsigned_data() {
        let records = vec![call(100.0, 0.05), put(100.0, 0.02), put(95.0, 0.03)];
        let profile = aggregate(&records, &ProfileConfig::default()).unwrap();

        assert_eq!(profile.sign, GammaSign::NegatePuts);
        assert_eq!(profile.series.strikes(), vec![95.0, 100.0]);
        assert!((profile.series.value_at(95.0).unwrap() + 0.03).abs() < 1e-12);
        assert!((profile.series.value_at(100.0).unwrap() - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_signed_data_preserved_under_auto() {
        let records = vec![call(100.0, 0.05), put(100.0, -0.02)];
        let profile = aggregate(&records, &ProfileConfig::default()).unwrap();

        assert_eq!(profile.sign, GammaSign::AsReported);
        assert!((profile.series.value_at(100.0).unwrap() - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_negate_calls_convention() {
        let records = vec![call(100.0, 0.05), put(100.0, 0.02)];
        let config = ProfileConfig {
            sign: GammaSign::NegateCalls,
            ..Default::default()
        };
        let profile = aggregate(&records, &config).unwrap();
        assert!((profile.series.value_at(100.0).unwrap() + 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_strike_rounding_merges_representation_error() {
        let records = vec![call(100.0, 1.0), call(100.000_000_1, 2.0), call(99.999_999_9, 3.0)];
        let profile = aggregate(&records, &ProfileConfig::default()).unwrap();

        assert_eq!(profile.series.len(), 1);
        assert_eq!(profile.series.points()[0].strike, 100.0);
        assert!((profile.series.points()[0].net_gamma - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_gamma_excluded_not_zeroed() {
        let records = vec![
            call(100.0, 0.05),
            ContractRecord::new(105.0, OptionSide::Call),
        ];
        let profile = aggregate(&records, &ProfileConfig::default()).unwrap();

        assert_eq!(profile.excluded, 1);
        assert_eq!(profile.series.strikes(), vec![100.0]);
    }

    #[test]
    fn test_open_interest_weighting() {
        let records = vec![
            call(100.0, 0.05).with_open_interest(1000.0),
            put(100.0, 0.02).with_open_interest(500.0),
            call(105.0, 0.04),
        ];
        let config = ProfileConfig {
            weight: ExposureWeight::OpenInterest { multiplier: 100.0 },
            ..Default::default()
        };
        let profile = aggregate(&records, &config).unwrap();

        // 0.05*1000*100 - 0.02*500*100
        assert!((profile.series.value_at(100.0).unwrap() - 4000.0).abs() < 1e-9);
        assert_eq!(profile.excluded, 1);
    }

    #[test]
    fn test_analysis_modes() {
        let records = vec![call(100.0, 0.05), put(100.0, 0.02), put(95.0, 0.01)];

        let calls = side_profile(&records, OptionSide::Call, &ProfileConfig::default()).unwrap();
        assert_eq!(calls.strikes(), vec![100.0]);

        let puts = side_profile(&records, OptionSide::Put, &ProfileConfig::default()).unwrap();
        assert_eq!(puts.strikes(), vec![95.0, 100.0]);
        assert!(puts.values().iter().all(|v| *v > 0.0));
    }

    #[test]
    fn test_unknown_side_counted() {
        let records = vec![
            ContractRecord::new(100.0, OptionSide::Unknown).with_gamma(0.05),
            put(100.0, 0.02),
        ];
        let profile = aggregate(&records, &ProfileConfig::default()).unwrap();
        assert_eq!(profile.unknown_side, 1);
        assert!((profile.series.value_at(100.0).unwrap() - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_sum_independent_of_row_order() {
        let mut records = vec![
            call(100.0, 0.1),
            call(100.0, 0.2),
            put(100.0, 0.3),
            call(100.0, 1e-17),
        ];
        let forward = aggregate(&records, &ProfileConfig::default()).unwrap();
        records.reverse();
        let backward = aggregate(&records, &ProfileConfig::default()).unwrap();

        assert_eq!(
            forward.series.points()[0].net_gamma.to_bits(),
            backward.series.points()[0].net_gamma.to_bits()
        );
    }

    #[test]
    fn test_strike_key() {
        assert_eq!(strike_key(100.006, 2), Some(10001));
        assert_eq!(strike_key(99.994, 2), Some(9999));
        assert_eq!(strike_key(100.0, 0), Some(100));
        assert_eq!(strike_key(1e300, 2), None);
        assert_eq!(strike_key(100.0, 400), None);
    }

    #[test]
    fn test_unrepresentable_strikes_are_dropped_not_merged() {
        let records = vec![call(100.0, 0.05), call(1e300, 0.02), call(2e300, 0.03)];
        let profile = aggregate(&records, &ProfileConfig::default()).unwrap();

        assert_eq!(profile.unbucketed, 2);
        assert_eq!(profile.series.strikes(), vec![100.0]);

        let config = ProfileConfig {
            strike_decimals: 400,
            ..Default::default()
        };
        let profile = aggregate(&records, &config).unwrap();
        assert!(profile.series.is_empty());
        assert_eq!(profile.unbucketed, 3);
    }

    #[test]
    fn test_stray_negative_in_unsigned_data_keeps_negate_puts() {
        let records = vec![
            call(95.0, 0.02),
            call(100.0, 0.05),
            put(95.0, 0.03),
            put(100.0, -0.0001),
        ];
        assert_eq!(
            resolve_sign(&records, GammaSign::Auto),
            GammaSign::NegatePuts
        );

        let calls_negative = vec![call(100.0, -0.05), put(100.0, 0.02)];
        assert_eq!(
            resolve_sign(&calls_negative, GammaSign::Auto),
            GammaSign::AsReported
        );

        let unsigned = vec![call(100.0, 0.05), put(100.0, 0.02)];
        assert_eq!(
            resolve_sign(&unsigned, GammaSign::Auto),
            GammaSign::NegatePuts
        );
        assert_eq!(
            resolve_sign(&unsigned, GammaSign::NegateCalls),
            GammaSign::NegateCalls
        );
    }
}
