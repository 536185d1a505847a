// LogSift - core/anomaly.rs
//
// Statistical anomaly detection over access records:
//   - source addresses requesting far more often than their peers
//   - responses with status >= 400
//   - responses larger than a size percentile
// Core layer: pure logic, no I/O.

use crate::core::model::{
    AnomalyReport, ErrorRequest, HighFrequencyAddress, LargeRequest, LogRecord,
};
use crate::core::stats::{access_records, FirstSeenCounter};
use crate::util::constants::HIGH_FREQUENCY_REASON;
use std::collections::BTreeMap;

/// Thresholds used by [`detect`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyThresholds {
    /// Standard deviations above the mean per-address count.
    pub high_frequency_sigma: f64,

    /// Size percentile (0 < p < 1) a response must strictly exceed.
    pub large_request_percentile: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            high_frequency_sigma: crate::util::constants::DEFAULT_HIGH_FREQUENCY_SIGMA,
            large_request_percentile: crate::util::constants::DEFAULT_LARGE_REQUEST_PERCENTILE,
        }
    }
}

/// Run all three detectors. Empty input yields an empty report.
pub fn detect(records: &[LogRecord], thresholds: &AnomalyThresholds) -> AnomalyReport {
    let report = AnomalyReport {
        high_frequency_addresses: high_frequency_addresses(
            records,
            thresholds.high_frequency_sigma,
        ),
        error_requests: error_requests(records),
        large_requests: large_requests(records, thresholds.large_request_percentile),
    };
    tracing::debug!(
        high_frequency = report.high_frequency_addresses.len(),
        errors = report.error_requests.len(),
        large = report.large_requests.len(),
        "Anomaly detection complete"
    );
    report
}

// =============================================================================
// High request frequency
// =============================================================================

/// Flag addresses whose request count exceeds `mean + sigma * stddev`.
///
/// Uses the sample standard deviation (n - 1). With fewer than two distinct
/// addresses there is no spread to measure and nothing is flagged.
/// Flagged addresses are ordered by descending count.
pub fn high_frequency_addresses(records: &[LogRecord], sigma: f64) -> Vec<HighFrequencyAddress> {
    let mut counter = FirstSeenCounter::default();
    for a in access_records(records) {
        counter.add(&a.source_address);
    }

    let counts: Vec<f64> = counter.counts().iter().map(|(_, c)| *c as f64).collect();
    let Some(threshold) = frequency_threshold(&counts, sigma) else {
        return Vec::new();
    };

    counter
        .ranked()
        .into_iter()
        .filter(|(_, count)| *count as f64 > threshold)
        .map(|(address, count)| HighFrequencyAddress {
            address: address.to_string(),
            count,
            reason: HIGH_FREQUENCY_REASON.to_string(),
        })
        .collect()
}

/// `mean + sigma * sample_stddev`, or `None` with fewer than two samples.
fn frequency_threshold(counts: &[f64], sigma: f64) -> Option<f64> {
    if counts.len() < 2 {
        return None;
    }
    let n = counts.len() as f64;
    let mean = counts.iter().sum::<f64>() / n;
    let variance = counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(mean + sigma * variance.sqrt())
}

// =============================================================================
// Error responses
// =============================================================================

/// Count access records with status >= 400, grouped by status code.
pub fn error_counts_by_status(records: &[LogRecord]) -> BTreeMap<u16, usize> {
    let mut counts = BTreeMap::new();
    for a in access_records(records).filter(|a| a.status_code >= 400) {
        *counts.entry(a.status_code).or_insert(0) += 1;
    }
    counts
}

/// Per-record detail for every access record with status >= 400, in input order.
pub fn error_requests(records: &[LogRecord]) -> Vec<ErrorRequest> {
    access_records(records)
        .filter(|a| a.status_code >= 400)
        .map(|a| ErrorRequest {
            address: a.source_address.clone(),
            url: a.url.clone(),
            status_code: a.status_code,
            timestamp: a.timestamp.clone(),
        })
        .collect()
}

// =============================================================================
// Large responses
// =============================================================================

/// Records whose response size strictly exceeds the `p` size percentile.
pub fn large_requests(records: &[LogRecord], p: f64) -> Vec<LargeRequest> {
    let mut sizes: Vec<f64> = access_records(records)
        .map(|a| a.response_size as f64)
        .collect();
    sizes.sort_by(f64::total_cmp);
    let Some(cutoff) = percentile(&sizes, p) else {
        return Vec::new();
    };

    access_records(records)
        .filter(|a| a.response_size as f64 > cutoff)
        .map(|a| LargeRequest {
            address: a.source_address.clone(),
            url: a.url.clone(),
            size: a.response_size,
            timestamp: a.timestamp.clone(),
        })
        .collect()
}

/// Linear-interpolation percentile of an ascending slice.
///
/// The rank is `p * (n - 1)`; the result interpolates between the two
/// neighbouring order statistics. `None` for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = p.clamp(0.0, 1.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}
