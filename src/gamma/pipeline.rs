//! GammaPipeline - Main facade for the gamma level pipeline
//!
//! Runs normalization, coercion, split, aggregation and level location on one
//! raw table. Each call is independent; nothing is shared between uploads.

use serde::Serialize;
use tracing::{debug, warn};

use super::{
    aggregate, locate_flip, locate_walls, side_profile, split_chain, ChainSplit, FlipPoint,
    GammaLevels, GammaProfile, NetGammaByStrike, SplitMethod, Walls,
};
use crate::config::{GammaConfig, GammaSign, HeaderRow};
use crate::core::{
    zero_fill, ContractRecord, FilledRecord, GammaError, GammaResult, OptionSide, RawTable,
};
use crate::data::{coerce_table, normalize, CoercionWarning, NormalizeReport};

/// Everything derived from one raw table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainAnalysis {
    pub report: NormalizeReport,
    pub warnings: Vec<CoercionWarning>,
    pub split: ChainSplit,
    /// Signed profile used for levels
    pub profile: GammaProfile,
    /// Unsigned call gamma per strike
    pub call_profile: NetGammaByStrike,
    /// Unsigned put gamma per strike
    pub put_profile: NetGammaByStrike,
    pub flip: Option<FlipPoint>,
    pub walls: Option<Walls>,
    /// Absent when the profile has no strikes
    pub levels: Option<GammaLevels>,
    pub config: GammaConfig,
}

impl ChainAnalysis {
    /// Derived levels, or `EmptySeries` when no strike survived cleaning
    pub fn levels(&self) -> GammaResult<&GammaLevels> {
        self.levels.as_ref().ok_or_else(|| {
            GammaError::empty_series("no usable strikes in the net gamma profile")
        })
    }

    pub fn net_series(&self) -> &NetGammaByStrike {
        &self.profile.series
    }

    pub fn calls(&self) -> &[ContractRecord] {
        &self.split.calls
    }

    pub fn puts(&self) -> &[ContractRecord] {
        &self.split.puts
    }

    /// Zero-filled calls for plotting
    pub fn filled_calls(&self) -> Vec<FilledRecord> {
        zero_fill(&self.split.calls)
    }

    /// Zero-filled puts for plotting
    pub fn filled_puts(&self) -> Vec<FilledRecord> {
        zero_fill(&self.split.puts)
    }

    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            header_row: self.report.header_row,
            calls: self.split.calls.len(),
            puts: self.split.puts.len(),
            strikes: self.profile.series.len(),
            split_method: self.split.method,
            approximate_split: self.split.approximate,
            dropped_rows: self.split.dropped_rows,
            invalid_cells: self.warnings.iter().map(|w| w.invalid).sum(),
            sign: self.profile.sign,
            net_gamma_total: self.profile.series.total(),
            levels: self.levels.clone(),
        }
    }
}

/// Compact, serializable overview of an analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub header_row: usize,
    pub calls: usize,
    pub puts: usize,
    pub strikes: usize,
    pub split_method: SplitMethod,
    pub approximate_split: bool,
    pub dropped_rows: usize,
    pub invalid_cells: usize,
    pub sign: GammaSign,
    /// Net gamma summed over all strikes
    pub net_gamma_total: f64,
    pub levels: Option<GammaLevels>,
}

/// Main pipeline that runs every stage on a raw table
pub struct GammaPipeline {
    config: GammaConfig,
}

impl GammaPipeline {
    /// Create a new pipeline with default configuration
    pub fn new() -> Self {
        Self {
            config: GammaConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(config: GammaConfig) -> Self {
        Self { config }
    }

    /// Get current configuration
    pub fn config(&self) -> &GammaConfig {
        &self.config
    }

    /// Update configuration
    pub fn set_config(&mut self, config: GammaConfig) {
        self.config = config;
    }

    /// Run the full pipeline
    ///
    /// Fails only when the dataset itself is unusable (missing required
    /// column, invalid split request). An empty profile still yields an
    /// analysis whose `levels` is absent.
    pub fn analyze(&self, table: &RawTable) -> GammaResult<ChainAnalysis> {
        // Stage 1: Normalize headers
        let normalized = normalize(table, self.config.normalize.header_row)?;

        // Stage 2: Coerce cells
        let coerced = coerce_table(&normalized, &self.config.coerce);

        // Stage 3: Split calls and puts
        let split = split_chain(&coerced, &self.config.split)?;

        // Stage 4: Aggregate net gamma
        let records: Vec<ContractRecord> = split.all().cloned().collect();
        let profile = aggregate(&records, &self.config.profile)?;
        let call_profile = side_profile(&split.calls, OptionSide::Call, &self.config.profile)?;
        let put_profile = side_profile(&split.puts, OptionSide::Put, &self.config.profile)?;

        // Stage 5: Locate flip and walls
        let flip = locate_flip(&profile.series, self.config.flip.zero_epsilon);
        let walls = match locate_walls(&profile.series) {
            Ok(walls) => Some(walls),
            Err(GammaError::EmptySeries(reason)) => {
                warn!(%reason, "gamma levels unavailable");
                None
            }
            Err(e) => return Err(e),
        };
        let levels = walls.map(|w| GammaLevels {
            gamma_flip: flip.map(|f| f.strike),
            put_wall: w.put_wall,
            call_wall: w.call_wall,
        });

        debug!(
            strikes = profile.series.len(),
            flip = ?levels.as_ref().and_then(|l| l.gamma_flip),
            "gamma analysis complete"
        );

        Ok(ChainAnalysis {
            report: normalized.report,
            warnings: coerced.warnings,
            split,
            profile,
            call_profile,
            put_profile,
            flip,
            walls,
            levels,
            config: self.config.clone(),
        })
    }

    /// Run the pipeline and return only the levels
    pub fn levels(&self, table: &RawTable) -> GammaResult<GammaLevels> {
        self.analyze(table)?.levels().cloned()
    }
}

impl Default for GammaPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function: default configuration with an explicit header row
pub fn compute_gamma_levels(table: &RawTable, header_row: HeaderRow) -> GammaResult<GammaLevels> {
    let mut config = GammaConfig::default();
    config.normalize.header_row = header_row;
    GammaPipeline::with_config(config).levels(table)
}

/// Convenience function with custom config
pub fn analyze_chain(table: &RawTable, config: GammaConfig) -> GammaResult<ChainAnalysis> {
    GammaPipeline::with_config(config).analyze(table)
}
