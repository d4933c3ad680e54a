//! Data ingestion and cleaning
//!
//! Handles:
//! - Delimited-text loading of spreadsheet exports
//! - Header detection and canonical column binding
//! - Numeric/date coercion with explicit missing values
//! - Caching of the last analysis per upload

pub mod cache;
pub mod coerce;
pub mod loader;
pub mod normalize;

pub use cache::*;
pub use coerce::*;
pub use loader::*;
pub use normalize::*;
