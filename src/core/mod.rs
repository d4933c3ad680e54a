//! Core data types for gamma level analysis
//!
//! Defines fundamental types:
//! - RawTable / Cell: untyped spreadsheet input
//! - CanonicalField: fixed column vocabulary and header aliases
//! - ContractRecord: one contract after normalization and coercion
//! - GammaError: error taxonomy

pub mod contract;
pub mod error;
pub mod schema;
pub mod table;

pub use contract::*;
pub use error::*;
pub use schema::*;
pub use table::*;
