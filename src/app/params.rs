// LogSift - app/params.rs
//
// Boundary normalisation of raw query parameters.
//
// Callers (JSON request bodies, repeated CLI flags) may hand over a file
// name as a string, null, an arbitrarily nested list, or some other JSON
// value entirely. That shape is collapsed here so the core only ever sees
// a single optional scalar.

use crate::core::filter::parse_time_bound;
use crate::core::model::{FilterCriteria, TrafficInterval};
use crate::util::error::FilterError;
use serde::de::IgnoredAny;
use serde::Deserialize;

/// A file name as supplied by a loosely-typed caller.
///
/// Variants are tried in order; anything that is not null, a string or a
/// list lands in `Other` and never names a file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub enum FilenameInput {
    #[default]
    Absent,
    One(String),
    Many(Vec<FilenameInput>),
    Other(IgnoredAny),
}

impl FilenameInput {
    /// Build from repeated values; the first usable one wins.
    pub fn from_values(values: Vec<String>) -> Self {
        FilenameInput::Many(values.into_iter().map(FilenameInput::One).collect())
    }

    /// First non-blank scalar, searching nested lists depth-first.
    pub fn first(&self) -> Option<&str> {
        match self {
            FilenameInput::Absent | FilenameInput::Other(_) => None,
            FilenameInput::One(name) => Some(name.trim()).filter(|n| !n.is_empty()),
            FilenameInput::Many(items) => items.iter().find_map(FilenameInput::first),
        }
    }
}

/// Raw, unvalidated query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    pub filename: FilenameInput,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub domain: Option<String>,
    pub time_interval: Option<String>,
}

impl QueryParams {
    /// Validate and collapse into core filter criteria.
    ///
    /// Blank values count as absent. Time bounds that cannot be read are
    /// an error.
    pub fn to_criteria(&self) -> Result<FilterCriteria, FilterError> {
        Ok(FilterCriteria {
            filename: self.filename.first().map(str::to_string),
            start_time: parse_optional_bound(self.start_time.as_deref())?,
            end_time: parse_optional_bound(self.end_time.as_deref())?,
            domain: non_blank(self.domain.as_deref()).map(str::to_string),
        })
    }

    /// Requested trend interval; unrecognised or absent means daily.
    pub fn interval(&self) -> TrafficInterval {
        self.time_interval
            .as_deref()
            .map(TrafficInterval::parse_or_default)
            .unwrap_or_default()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_optional_bound(
    value: Option<&str>,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, FilterError> {
    non_blank(value).map(parse_time_bound).transpose()
}
