//! Export of derived levels
//!
//! - Overlay: chart script assignments
//! - Table: `Level,Strike` delimited text

pub mod overlay;
pub mod table;

pub use overlay::*;
pub use table::*;
