//! Relevance filters for candidate patents: CPC prefixes, keyword phrases,
//! and the publication-year window.

use chrono::Datelike;
use thiserror::Error;

/// CPC code prefixes. A patent qualifies if any of its codes, lower-cased
/// with spaces removed, starts with one of these.
pub const CPC_PREFIXES: &[&str] = &["b65d25/14", "c09d7/65", "c09d163", "c09d167"];

/// Phrases matched case-insensitively against title, abstract or description.
pub const KEYWORD_PHRASES: &[&str] = &[
    "food can",
    "beverage can",
    "food container",
    "beverage container",
    "metal can",
    "metal container",
    "can liner",
    "can coating",
];

/// Earliest start year accepted.
pub const MIN_START_YEAR: i32 = 1900;

/// Default window length, in years before the current one.
pub const DEFAULT_YEAR_SPAN: i32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("year bounds {start}..={end} fall outside 1900..={max}")]
    YearsOutOfRange { start: i32, end: i32, max: i32 },

    #[error("start year {start} must not exceed end year {end}")]
    YearsInverted { start: i32, end: i32 },
}

/// Build the keyword alternation regex: `(phrase|phrase|...)`.
///
/// Phrases are lower-cased; backslashes and slashes are escaped.
pub fn keyword_pattern<S: AsRef<str>>(phrases: &[S]) -> String {
    let escaped: Vec<String> = phrases
        .iter()
        .map(|p| {
            p.as_ref()
                .to_lowercase()
                .replace('\\', "\\\\")
                .replace('/', "\\/")
        })
        .collect();
    format!("({})", escaped.join("|"))
}

/// Build the SQL predicate matching any CPC prefix against `c.code`.
pub fn cpc_condition<S: AsRef<str>>(prefixes: &[S]) -> String {
    prefixes
        .iter()
        .map(|p| {
            let prefix = p.as_ref().to_lowercase().replace('\'', "''");
            format!("LOWER(REPLACE(c.code, ' ', '')) LIKE '{prefix}%'")
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Inclusive publication-year window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    /// Validate bounds against `current_year`.
    pub fn new(start: i32, end: i32, current_year: i32) -> Result<Self, CoreError> {
        let max = current_year + 1;
        if start < MIN_START_YEAR || end > max {
            return Err(CoreError::YearsOutOfRange { start, end, max });
        }
        if start > end {
            return Err(CoreError::YearsInverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Validate against the current UTC year, filling absent bounds with the
    /// default window ending this year.
    pub fn resolve(start: Option<i32>, end: Option<i32>) -> Result<Self, CoreError> {
        let current = current_year();
        Self::new(
            start.unwrap_or(current - DEFAULT_YEAR_SPAN),
            end.unwrap_or(current),
            current,
        )
    }

    /// `start_date` query parameter: `YYYY0101` as an integer.
    pub fn start_date(&self) -> i64 {
        i64::from(self.start) * 10_000 + 101
    }

    /// `end_date` query parameter: `YYYY1231` as an integer.
    pub fn end_date(&self) -> i64 {
        i64::from(self.end) * 10_000 + 1231
    }
}

pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}
