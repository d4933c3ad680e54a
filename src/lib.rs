//! # Gamma Levels - Option Chain Gamma Analysis
//!
//! Derives gamma flip, put wall and call wall strikes from a raw spreadsheet
//! export of an options chain.
//!
//! ## Overview
//!
//! Exports from trading platforms are inconsistent: the header may sit on the
//! first or second row, column names vary ("Open.Int", "OI", "Impl Vol."), and
//! numbers arrive as "1,200", "23%" or "N/A". The pipeline:
//!
//! - **Normalize**: find the header row and bind columns to canonical fields
//! - **Coerce**: parse cells to numbers and dates, keeping missing distinct from zero
//! - **Split**: separate calls and puts by layout, side column or strike
//! - **Aggregate**: sum signed gamma per strike
//! - **Locate**: gamma flip by interpolation, walls by extremes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gamma_levels::prelude::*;
//!
//! let table = read_table_from_path("chain.csv", None).unwrap();
//! let levels = compute_gamma_levels(&table, HeaderRow::Auto).unwrap();
//!
//! println!("{}", levels.describe_flip());
//! println!("{}", render_overlay(&levels, &OverlayConfig::default()));
//! ```
//!
//! ## Sign Convention
//!
//! Unsigned gamma is treated as dealer exposure: long calls, short puts, so
//! put gamma is negated. Data whose negative gamma lines up with one side
//! (calls or puts) is summed as reported; stray negatives keep the dealer
//! convention and log a warning. Configurable through [`config::GammaSign`].
//!
//! ## What This Does NOT Do
//!
//! - Price options or compute greeks
//! - Read binary workbooks (export the sheet to CSV/TSV)
//! - Render charts

pub mod config;
pub mod core;
pub mod data;
pub mod export;
pub mod gamma;

/// Prelude with commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{
        AnalysisMode, CoerceConfig, ExposureWeight, FlipConfig, GammaConfig, GammaSign,
        HeaderRow, NormalizeConfig, ProfileConfig, SplitConfig, SplitPolicy,
    };

    // Core types
    pub use crate::core::{
        CanonicalField, Cell, ContractRecord, FilledRecord, GammaError, GammaResult,
        OptionSide, RawTable,
    };

    // Data ingestion
    pub use crate::data::{
        coerce_table, normalize, read_table_from_path, read_table_from_reader, AnalysisCache,
        CacheConfig, CoercedTable, CoercionWarning, NormalizeReport, NormalizedTable, UploadId,
    };

    // Gamma analysis
    pub use crate::gamma::{
        aggregate, analyze_chain, compute_gamma_levels, locate_flip, locate_gamma_flip,
        locate_walls, split_chain, ChainAnalysis, ChainSplit, FlipKind, FlipPoint,
        GammaLevels, GammaPipeline, GammaProfile, NetGammaByStrike, SplitMethod, StrikePoint,
        Walls,
    };

    // Export
    pub use crate::export::{
        level_rows, level_table_string, render_overlay, write_level_table,
        write_level_table_file, LevelName, LevelRow, OverlayConfig,
    };
}

// Re-export main types at crate root
pub use crate::core::{GammaError, GammaResult};
pub use crate::gamma::{compute_gamma_levels, GammaLevels, GammaPipeline};
