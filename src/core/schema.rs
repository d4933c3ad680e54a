//! Canonical column vocabulary
//!
//! Every downstream stage addresses columns through [`CanonicalField`] rather
//! than raw header text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical field of an option chain row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalField {
    Strike,
    Gamma,
    ImpliedVol,
    OpenInterest,
    Volume,
    Delta,
    Theta,
    Vega,
    Bid,
    Ask,
    Expiration,
    /// Call/put indicator column
    Side,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 12] = [
        CanonicalField::Strike,
        CanonicalField::Gamma,
        CanonicalField::ImpliedVol,
        CanonicalField::OpenInterest,
        CanonicalField::Volume,
        CanonicalField::Delta,
        CanonicalField::Theta,
        CanonicalField::Vega,
        CanonicalField::Bid,
        CanonicalField::Ask,
        CanonicalField::Expiration,
        CanonicalField::Side,
    ];

    /// Fields whose absence fails normalization
    pub const REQUIRED: [CanonicalField; 2] = [CanonicalField::Strike, CanonicalField::Gamma];

    /// Canonical column name
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::Strike => "Strike",
            CanonicalField::Gamma => "Gamma",
            CanonicalField::ImpliedVol => "ImpliedVol",
            CanonicalField::OpenInterest => "OpenInterest",
            CanonicalField::Volume => "Volume",
            CanonicalField::Delta => "Delta",
            CanonicalField::Theta => "Theta",
            CanonicalField::Vega => "Vega",
            CanonicalField::Bid => "Bid",
            CanonicalField::Ask => "Ask",
            CanonicalField::Expiration => "Expiration",
            CanonicalField::Side => "Side",
        }
    }

    /// Raw header variants accepted for this field (compared after folding)
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::Strike => &["Strike"],
            CanonicalField::Gamma => &["Gamma"],
            CanonicalField::ImpliedVol => &[
                "Impl Vol",
                "Impl Vol.",
                "ImpliedVol",
                "Implied Volatility",
                "IV",
            ],
            CanonicalField::OpenInterest => {
                &["Open.Int", "Open.Int.", "OI", "Open Int", "Open Interest"]
            }
            CanonicalField::Volume => &["Volume", "Vol"],
            CanonicalField::Delta => &["Delta"],
            CanonicalField::Theta => &["Theta"],
            CanonicalField::Vega => &["Vega"],
            CanonicalField::Bid => &["BID", "Bid"],
            CanonicalField::Ask => &["ASK", "Ask"],
            CanonicalField::Expiration => &["Exp", "Expiration", "Expiry", "Exp Date"],
            CanonicalField::Side => &[
                "Side",
                "Type",
                "Option Type",
                "Call/Put",
                "Put/Call",
                "CP",
            ],
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }

    /// Resolve a raw header to its canonical field
    ///
    /// Case, whitespace and punctuation are ignored: `"open.int."`, `"Open Int"`
    /// and `"OPEN_INT"` all resolve to [`CanonicalField::OpenInterest`].
    pub fn from_header(header: &str) -> Option<Self> {
        let folded = fold_header(header);
        if folded.is_empty() {
            return None;
        }
        Self::ALL.into_iter().find(|field| {
            field
                .aliases()
                .iter()
                .any(|alias| fold_header(alias) == folded)
        })
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lowercase and drop every non-alphanumeric character
pub fn fold_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
