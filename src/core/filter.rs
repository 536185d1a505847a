// LogSift - core/filter.rs
//
// Composable record filters. All active filters are AND-combined:
// time range first, then domain substring.
// Core layer: pure logic, no I/O.

use crate::core::model::{FilterCriteria, LogRecord, RecordKind};
use crate::util::error::FilterError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Apply `criteria` to `records`, preserving order.
///
/// The filename component of the criteria is not consulted here; it
/// selects what the store loads, not which loaded records survive.
pub fn apply_filters(records: Vec<LogRecord>, criteria: &FilterCriteria) -> Vec<LogRecord> {
    let domain_lower = criteria
        .domain
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_lowercase);

    if !criteria.has_time_range() && domain_lower.is_none() {
        return records;
    }

    records
        .into_iter()
        .filter(|r| in_time_range(r, criteria))
        .filter(|r| domain_lower.as_deref().map_or(true, |d| matches_domain(r, d)))
        .collect()
}

/// Check a record against the inclusive `[start_time, end_time]` window.
///
/// With no bound set every record passes. With any bound set, a record
/// whose timestamp cannot be parsed is excluded.
pub fn in_time_range(record: &LogRecord, criteria: &FilterCriteria) -> bool {
    if !criteria.has_time_range() {
        return true;
    }
    let Some(ts) = record.parsed_timestamp().map(|t| t.with_timezone(&Utc)) else {
        return false;
    };
    if let Some(start) = criteria.start_time {
        if ts < start {
            return false;
        }
    }
    if let Some(end) = criteria.end_time {
        if ts > end {
            return false;
        }
    }
    true
}

/// Case-insensitive substring match on URL or referer.
///
/// `domain_lower` must already be lower-cased. Error records never match.
pub fn matches_domain(record: &LogRecord, domain_lower: &str) -> bool {
    match record {
        LogRecord::Access(a) => {
            a.url.to_lowercase().contains(domain_lower)
                || a.referer.to_lowercase().contains(domain_lower)
        }
        LogRecord::Error(_) => false,
    }
}

/// Free-text listing search (case-insensitive, any field may match).
///
/// Searched fields: source address, URL, method, status code text,
/// user agent, and error message. An empty needle matches everything.
pub fn matches_search(record: &LogRecord, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    let hit = |text: &str| text.to_lowercase().contains(needle_lower);
    match record {
        LogRecord::Access(a) => {
            hit(&a.source_address)
                || hit(&a.url)
                || hit(&a.method)
                || a.status_code.to_string().contains(needle_lower)
                || hit(&a.user_agent)
        }
        LogRecord::Error(e) => {
            e.source_address.as_deref().is_some_and(hit)
                || e.url.as_deref().is_some_and(hit)
                || e.method.as_deref().is_some_and(hit)
                || hit(&e.message)
        }
    }
}

/// Keep records matching the search text and optional record kind.
pub fn search_records(
    records: Vec<LogRecord>,
    search: &str,
    kind: Option<RecordKind>,
) -> Vec<LogRecord> {
    let needle = search.trim().to_lowercase();
    records
        .into_iter()
        .filter(|r| kind.map_or(true, |k| r.kind() == k))
        .filter(|r| matches_search(r, &needle))
        .collect()
}

/// Parse user-supplied time bound text into a UTC instant.
///
/// Accepted forms: RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (HTML datetime-local),
/// `YYYY-MM-DD HH:MM[:SS]`, and `YYYY-MM-DD` (midnight). Zone-less input
/// is read as UTC.
pub fn parse_time_bound(input: &str) -> Result<DateTime<Utc>, FilterError> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    if let Some(ndt) = FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
    {
        return Ok(ndt.and_utc());
    }

    if let Some(ndt) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(ndt.and_utc());
    }

    Err(FilterError::InvalidTimeBound {
        input: input.to_string(),
    })
}
