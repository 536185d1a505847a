// LogSift - core/model.rs
//
// Core data model types. Pure data definitions with no I/O.
//
// These types are the shared vocabulary across all layers and are what
// the presentation layer receives: every result type serialises to JSON.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Log records (normalised output of parsing)
// =============================================================================

/// A single parsed log line.
///
/// A record is either fully access-shaped or error-shaped, never a mix.
/// Consumers match on the variant; fields that do not apply to a variant
/// simply do not exist on it (an error record has no status code, rather
/// than a status code of 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LogRecord {
    Access(AccessRecord),
    Error(ErrorRecord),
}

/// One served HTTP request from a combined-format access log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub source_address: String,

    /// Timestamp text exactly as written in the log (`10/Oct/2023:13:55:36 -0700`).
    /// Parsed on demand via [`LogRecord::parsed_timestamp`].
    pub timestamp: String,

    pub method: String,
    pub url: String,
    pub protocol: String,
    pub status_code: u16,

    /// Response body size in bytes.
    pub response_size: u64,

    pub referer: String,
    pub user_agent: String,
}

impl AccessRecord {
    /// Render the record back into combined log format.
    pub fn to_log_line(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} {}\" {} {} \"{}\" \"{}\"",
            self.source_address,
            self.timestamp,
            self.method,
            self.url,
            self.protocol,
            self.status_code,
            self.response_size,
            self.referer,
            self.user_agent,
        )
    }
}

/// Which server family produced an error line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorOrigin {
    Nginx,
    Apache,
}

/// A server-emitted diagnostic line from an Nginx or Apache error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub origin: ErrorOrigin,

    /// Timestamp text exactly as written in the log.
    pub timestamp: String,

    /// Level tag as written (`error`, `warn`, `crit`, ...).
    pub level: String,

    /// Free-text message. Always populated; falls back to the whole line.
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_address: Option<String>,

    /// Request method, when the line embeds the offending request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Apache module name (`core`, `php7`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<u64>,

    /// Nginx connection serial number (the `*N` marker).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

/// Record variant discriminator, used for listing type filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Access,
    Error,
}

impl RecordKind {
    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Access => "access",
            RecordKind::Error => "error",
        }
    }
}

impl LogRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            LogRecord::Access(_) => RecordKind::Access,
            LogRecord::Error(_) => RecordKind::Error,
        }
    }

    /// Raw timestamp text as it appeared in the source line.
    pub fn timestamp_text(&self) -> &str {
        match self {
            LogRecord::Access(a) => &a.timestamp,
            LogRecord::Error(e) => &e.timestamp,
        }
    }

    /// Parse the timestamp, keeping the offset written in the log.
    /// `None` when no supported format matches.
    pub fn parsed_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        crate::core::parser::parse_timestamp(self.timestamp_text())
    }

    pub fn source_address(&self) -> Option<&str> {
        match self {
            LogRecord::Access(a) => Some(&a.source_address),
            LogRecord::Error(e) => e.source_address.as_deref(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            LogRecord::Access(a) => Some(&a.url),
            LogRecord::Error(e) => e.url.as_deref(),
        }
    }

    pub fn as_access(&self) -> Option<&AccessRecord> {
        match self {
            LogRecord::Access(a) => Some(a),
            LogRecord::Error(_) => None,
        }
    }
}

// =============================================================================
// Filter criteria
// =============================================================================

/// Record selection applied before any aggregation.
///
/// Holds a single optional scalar filename. List-shaped caller input is
/// collapsed at the boundary (`app::params`) before it reaches the core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// File under the log directory to load. `None` = every recognised file.
    pub filename: Option<String>,

    /// Inclusive lower bound.
    pub start_time: Option<DateTime<Utc>>,

    /// Inclusive upper bound.
    pub end_time: Option<DateTime<Utc>>,

    /// Case-insensitive substring matched against URL and referer.
    pub domain: Option<String>,
}

impl FilterCriteria {
    pub fn has_time_range(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }

    /// True if loading with these criteria keeps every record.
    pub fn is_empty(&self) -> bool {
        self.filename.is_none() && !self.has_time_range() && self.domain.is_none()
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// A key from a histogram together with its count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopEntry {
    pub key: String,
    pub count: usize,
}

/// Earliest and latest successfully parsed timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Basic statistics over a record set.
///
/// Request-oriented fields are computed over access records only;
/// `error_log_entries` counts the error records seen alongside them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_requests: usize,
    pub unique_source_addresses: usize,
    pub status_codes: BTreeMap<u16, usize>,
    pub top_source_addresses: Vec<TopEntry>,
    pub top_urls: Vec<TopEntry>,
    pub methods: BTreeMap<String, usize>,

    /// Absent when no timestamp in the set could be parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,

    pub total_bytes: u64,

    /// `total_bytes / total_requests`, truncated to an integer.
    pub average_response_size: u64,

    pub error_log_entries: usize,
}

impl StatsSummary {
    /// True when the summary was built from no access records at all.
    pub fn is_empty(&self) -> bool {
        self.total_requests == 0
    }
}

/// Request count and byte total for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficBucket {
    pub requests: usize,
    pub bytes: u64,
}

/// Traffic grouped by hour of day (0-23), dates discarded.
pub type HourlyTraffic = BTreeMap<u32, TrafficBucket>;

/// Calendar granularity for the traffic trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficInterval {
    Hourly,
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl TrafficInterval {
    /// Parse an interval name; anything unrecognised falls back to daily.
    pub fn parse_or_default(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "hourly" => TrafficInterval::Hourly,
            "weekly" => TrafficInterval::Weekly,
            "monthly" => TrafficInterval::Monthly,
            _ => TrafficInterval::Daily,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficInterval::Hourly => "hourly",
            TrafficInterval::Daily => "daily",
            TrafficInterval::Weekly => "weekly",
            TrafficInterval::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for TrafficInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One point of the traffic trend series.
///
/// `bucket_start` is wall-clock time in the offset the log was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficPoint {
    pub bucket_start: NaiveDateTime,
    pub requests: usize,
    pub bytes: u64,
}

// =============================================================================
// Anomalies
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighFrequencyAddress {
    pub address: String,
    pub count: usize,
    pub reason: String,
}

/// Per-record detail for a response with status >= 400.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRequest {
    pub address: String,
    pub url: String,
    pub status_code: u16,
    pub timestamp: String,
}

/// Per-record detail for a response above the size percentile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargeRequest {
    pub address: String,
    pub url: String,
    pub size: u64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub high_frequency_addresses: Vec<HighFrequencyAddress>,
    pub error_requests: Vec<ErrorRequest>,
    pub large_requests: Vec<LargeRequest>,
}

impl AnomalyReport {
    pub fn is_empty(&self) -> bool {
        self.high_frequency_addresses.is_empty()
            && self.error_requests.is_empty()
            && self.large_requests.is_empty()
    }
}

// =============================================================================
// Log files and listings
// =============================================================================

/// Log file classification by file name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFileKind {
    Access,
    Error,
}

/// Metadata about a recognised file in the log directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFileInfo {
    pub filename: String,
    pub size_bytes: u64,

    #[serde(rename = "type")]
    pub kind: LogFileKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// One page of a filtered, searched record listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPage {
    pub records: Vec<LogRecord>,
    pub total: usize,
    pub total_pages: usize,

    /// 1-based page number that was requested.
    pub current_page: usize,
    pub page_size: usize,
}
