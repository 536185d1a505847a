// LogSift - core/stats.rs
//
// Aggregate statistics over parsed records: counts, histograms, top-N
// rankings, byte totals, and time-bucketed traffic.
// Core layer: pure logic, no I/O.
//
// Request-oriented figures are computed from access records only. Error
// records are counted separately and otherwise ignored here.

use crate::core::model::{
    AccessRecord, HourlyTraffic, LogRecord, StatsSummary, TimeRange, TopEntry, TrafficBucket,
    TrafficInterval, TrafficPoint,
};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use std::collections::{BTreeMap, HashMap};

// =============================================================================
// First-seen ordered counting
// =============================================================================

/// Counts distinct keys while remembering the order they first appeared.
///
/// Ranking sorts by descending count with a stable sort, so keys with equal
/// counts keep their first-seen order.
#[derive(Debug, Default)]
pub(crate) struct FirstSeenCounter<'a> {
    index: HashMap<&'a str, usize>,
    counts: Vec<(&'a str, usize)>,
}

impl<'a> FirstSeenCounter<'a> {
    pub(crate) fn add(&mut self, key: &'a str) {
        match self.index.get(key) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(key, self.counts.len());
                self.counts.push((key, 1));
            }
        }
    }

    pub(crate) fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Counts in first-seen order.
    pub(crate) fn counts(&self) -> &[(&'a str, usize)] {
        &self.counts
    }

    /// All keys, highest count first, ties in first-seen order.
    pub(crate) fn ranked(&self) -> Vec<(&'a str, usize)> {
        let mut ranked = self.counts.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    pub(crate) fn top(&self, n: usize) -> Vec<TopEntry> {
        self.ranked()
            .into_iter()
            .take(n)
            .map(|(key, count)| TopEntry {
                key: key.to_string(),
                count,
            })
            .collect()
    }
}

/// Iterate only the access records of a set.
pub(crate) fn access_records(records: &[LogRecord]) -> impl Iterator<Item = &AccessRecord> {
    records.iter().filter_map(LogRecord::as_access)
}

// =============================================================================
// Basic statistics
// =============================================================================

/// Compute the basic statistics summary.
///
/// An input with no access records yields a summary whose request fields
/// are all zero/empty (see [`StatsSummary::is_empty`]); that is not an error.
pub fn basic_stats(records: &[LogRecord], top_n: usize) -> StatsSummary {
    let mut summary = StatsSummary {
        error_log_entries: records
            .iter()
            .filter(|r| matches!(r, LogRecord::Error(_)))
            .count(),
        ..Default::default()
    };

    let mut addresses = FirstSeenCounter::default();
    let mut urls = FirstSeenCounter::default();
    let mut earliest: Option<DateTime<FixedOffset>> = None;
    let mut latest: Option<DateTime<FixedOffset>> = None;

    for a in access_records(records) {
        summary.total_requests += 1;
        summary.total_bytes = summary.total_bytes.saturating_add(a.response_size);
        addresses.add(&a.source_address);
        urls.add(&a.url);
        *summary.status_codes.entry(a.status_code).or_insert(0) += 1;
        *summary.methods.entry(a.method.clone()).or_insert(0) += 1;

        if let Some(ts) = crate::core::parser::parse_timestamp(&a.timestamp) {
            if earliest.map_or(true, |e| ts < e) {
                earliest = Some(ts);
            }
            if latest.map_or(true, |l| ts > l) {
                latest = Some(ts);
            }
        }
    }

    if summary.total_requests == 0 {
        return summary;
    }

    summary.unique_source_addresses = addresses.distinct();
    summary.top_source_addresses = addresses.top(top_n);
    summary.top_urls = urls.top(top_n);
    summary.average_response_size = summary.total_bytes / summary.total_requests as u64;
    summary.time_range = earliest
        .zip(latest)
        .map(|(start, end)| TimeRange { start, end });

    tracing::debug!(
        requests = summary.total_requests,
        unique_addresses = summary.unique_source_addresses,
        error_entries = summary.error_log_entries,
        "Basic statistics computed"
    );

    summary
}

// =============================================================================
// Traffic
// =============================================================================

/// Group access traffic by hour of day (0-23), discarding the date.
///
/// Hours are read in the offset each line was written in. Records with an
/// unparseable timestamp are skipped.
pub fn hourly_traffic(records: &[LogRecord]) -> HourlyTraffic {
    let mut buckets = HourlyTraffic::new();
    for a in access_records(records) {
        let Some(ts) = crate::core::parser::parse_timestamp(&a.timestamp) else {
            continue;
        };
        let bucket = buckets.entry(ts.hour()).or_default();
        bucket.requests += 1;
        bucket.bytes = bucket.bytes.saturating_add(a.response_size);
    }
    buckets
}

/// Build the calendar traffic series for the given interval, oldest first.
///
/// Unlike [`hourly_traffic`] this keeps the date: hourly buckets are hour
/// floors, daily buckets calendar days, weekly buckets start on Monday and
/// monthly buckets on the first of the month.
pub fn traffic_by_interval(records: &[LogRecord], interval: TrafficInterval) -> Vec<TrafficPoint> {
    let mut buckets: BTreeMap<NaiveDateTime, TrafficBucket> = BTreeMap::new();
    for a in access_records(records) {
        let Some(ts) = crate::core::parser::parse_timestamp(&a.timestamp) else {
            continue;
        };
        let Some(start) = bucket_start(ts.naive_local(), interval) else {
            continue;
        };
        let bucket = buckets.entry(start).or_default();
        bucket.requests += 1;
        bucket.bytes = bucket.bytes.saturating_add(a.response_size);
    }

    buckets
        .into_iter()
        .map(|(bucket_start, b)| TrafficPoint {
            bucket_start,
            requests: b.requests,
            bytes: b.bytes,
        })
        .collect()
}

/// Truncate a wall-clock time to the start of its bucket.
pub fn bucket_start(ts: NaiveDateTime, interval: TrafficInterval) -> Option<NaiveDateTime> {
    let date = ts.date();
    match interval {
        TrafficInterval::Hourly => date.and_hms_opt(ts.hour(), 0, 0),
        TrafficInterval::Daily => date.and_hms_opt(0, 0, 0),
        TrafficInterval::Weekly => {
            let back = Duration::days(i64::from(date.weekday().num_days_from_monday()));
            (date - back).and_hms_opt(0, 0, 0)
        }
        TrafficInterval::Monthly => {
            NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?.and_hms_opt(0, 0, 0)
        }
    }
}
