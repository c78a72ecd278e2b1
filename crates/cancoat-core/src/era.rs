//! Coarse historical bucketing of patents for trend analysis.
//!
//! Three buckets, keyed on publication year and the assigned coating:
//!
//! - `pre-BPA`: published before 1991, whatever the coating
//! - `BPA-era`: a bisphenol epoxy published 1991 through 2015
//! - `modern`: everything else with a known year

use serde::{Deserialize, Serialize};

use crate::coating::BISPHENOL_EPOXIES;

/// First year that is no longer `pre-BPA`.
pub const PRE_BPA_BEFORE: i32 = 1991;

/// Last year a bisphenol epoxy still counts as `BPA-era`.
pub const BPA_ERA_LAST_YEAR: i32 = 2015;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Era {
    #[serde(rename = "pre-BPA")]
    PreBpa,
    #[serde(rename = "BPA-era")]
    BpaEra,
    #[serde(rename = "modern")]
    Modern,
}

impl Era {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreBpa => "pre-BPA",
            Self::BpaEra => "BPA-era",
            Self::Modern => "modern",
        }
    }
}

impl std::fmt::Display for Era {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the era bucket for a publication year and coating label.
///
/// Total over its inputs: an absent year yields `None`, every present year
/// yields a bucket.
pub fn determine_era(publication_year: Option<i32>, coating_type: Option<&str>) -> Option<Era> {
    let year = publication_year?;

    if year < PRE_BPA_BEFORE {
        return Some(Era::PreBpa);
    }

    let bisphenol = coating_type.is_some_and(|c| BISPHENOL_EPOXIES.contains(&c));
    if bisphenol && year <= BPA_ERA_LAST_YEAR {
        return Some(Era::BpaEra);
    }

    Some(Era::Modern)
}
