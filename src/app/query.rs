// LogSift - app/query.rs
//
// Query facade: the single entry point a presentation layer talks to.
//
// Every operation runs load -> filter -> compute from scratch. The only
// write-side operation is `run_full_analysis`, which also persists the
// snapshot and any chart artifacts.

use crate::app::charts::{ChartInput, ChartRenderer};
use crate::app::snapshot;
use crate::app::store::LogStore;
use crate::core::anomaly::{self, AnomalyThresholds};
use crate::core::export::{self, Snapshot};
use crate::core::filter;
use crate::core::model::{
    AnomalyReport, ErrorRequest, FilterCriteria, HourlyTraffic, LogFileInfo, LogRecord,
    RecordKind, RecordPage, StatsSummary, TrafficInterval, TrafficPoint,
};
use crate::core::stats;
use crate::platform::config::AppConfig;
use crate::util::constants;
use crate::util::error::{QueryError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

// =============================================================================
// Configuration
// =============================================================================

/// Everything the facade needs, injected at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Read-only source of log files.
    pub log_dir: PathBuf,

    /// Destination for the snapshot and chart artifacts.
    pub output_dir: PathBuf,

    /// Length of the top address / URL lists.
    pub top_n: usize,

    pub thresholds: AnomalyThresholds,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from(constants::DEFAULT_LOG_DIR),
            output_dir: PathBuf::from(constants::DEFAULT_OUTPUT_DIR),
            top_n: constants::DEFAULT_TOP_N,
            thresholds: AnomalyThresholds::default(),
        }
    }
}

impl From<&AppConfig> for AnalyzerConfig {
    fn from(app: &AppConfig) -> Self {
        Self {
            log_dir: app.log_dir.clone(),
            output_dir: app.output_dir.clone(),
            top_n: app.top_n,
            thresholds: AnomalyThresholds {
                high_frequency_sigma: app.high_frequency_sigma,
                large_request_percentile: app.large_request_percentile,
            },
        }
    }
}

// =============================================================================
// Request / response shapes
// =============================================================================

/// Paginated listing request. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Case-insensitive free text; empty matches everything.
    pub search: String,
    pub page: usize,
    pub page_size: usize,
    pub kind: Option<RecordKind>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            search: String::new(),
            page: 1,
            page_size: constants::DEFAULT_PAGE_SIZE,
            kind: None,
        }
    }
}

/// The filters a full analysis ran with, echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFilters {
    pub filename: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub domain: Option<String>,
    pub time_interval: TrafficInterval,
}

impl AppliedFilters {
    fn new(criteria: &FilterCriteria, interval: TrafficInterval) -> Self {
        Self {
            filename: criteria.filename.clone(),
            start_time: criteria.start_time,
            end_time: criteria.end_time,
            domain: criteria.domain.clone(),
            time_interval: interval,
        }
    }
}

/// Everything produced by one full analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullAnalysis {
    pub stats: StatsSummary,
    pub hourly_traffic: HourlyTraffic,
    pub anomalies: AnomalyReport,
    pub trend: Vec<TrafficPoint>,
    pub chart_paths: Vec<PathBuf>,
    pub snapshot_path: PathBuf,
    pub generated_at: String,
    pub filters: AppliedFilters,
}

// =============================================================================
// Analyzer
// =============================================================================

/// Query facade over a log directory.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
    store: LogStore,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let store = LogStore::new(config.log_dir.clone());
        Self { config, store }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Recognised files in the log directory with size, type and mtime.
    pub fn list_log_files(&self) -> Result<Vec<LogFileInfo>> {
        Ok(self.store.list_log_files()?)
    }

    /// Load the selected file(s) and apply the time and domain filters.
    pub fn load_filtered(&self, criteria: &FilterCriteria) -> Result<Vec<LogRecord>> {
        let loaded = self.store.load(criteria.filename.as_deref())?;
        let loaded_count = loaded.len();
        let records = filter::apply_filters(loaded, criteria);
        tracing::debug!(
            file = criteria.filename.as_deref().unwrap_or("*"),
            loaded = loaded_count,
            kept = records.len(),
            "Records loaded and filtered"
        );
        Ok(records)
    }

    pub fn stats(&self, criteria: &FilterCriteria) -> Result<StatsSummary> {
        let records = self.load_filtered(criteria)?;
        Ok(stats::basic_stats(&records, self.config.top_n))
    }

    /// Traffic by hour of day (0-23), dates collapsed.
    pub fn hourly(&self, criteria: &FilterCriteria) -> Result<HourlyTraffic> {
        let records = self.load_filtered(criteria)?;
        Ok(stats::hourly_traffic(&records))
    }

    /// Calendar traffic series at the given granularity.
    pub fn trend(
        &self,
        criteria: &FilterCriteria,
        interval: TrafficInterval,
    ) -> Result<Vec<TrafficPoint>> {
        let records = self.load_filtered(criteria)?;
        Ok(stats::traffic_by_interval(&records, interval))
    }

    pub fn anomalies(&self, criteria: &FilterCriteria) -> Result<AnomalyReport> {
        let records = self.load_filtered(criteria)?;
        Ok(anomaly::detect(&records, &self.config.thresholds))
    }

    /// Error responses (status >= 400) grouped by status code.
    pub fn error_counts(&self, criteria: &FilterCriteria) -> Result<BTreeMap<u16, usize>> {
        let records = self.load_filtered(criteria)?;
        Ok(anomaly::error_counts_by_status(&records))
    }

    /// Error responses (status >= 400) with per-record detail.
    pub fn error_details(&self, criteria: &FilterCriteria) -> Result<Vec<ErrorRequest>> {
        let records = self.load_filtered(criteria)?;
        Ok(anomaly::error_requests(&records))
    }

    /// One page of the filtered, searched listing.
    ///
    /// A page past the end is empty, not an error. A page size of zero is.
    pub fn page(&self, criteria: &FilterCriteria, request: &PageRequest) -> Result<RecordPage> {
        if request.page_size == 0 {
            return Err(QueryError::InvalidPageSize { size: 0 }.into());
        }
        let records = self.load_filtered(criteria)?;
        let matched = filter::search_records(records, &request.search, request.kind);
        Ok(paginate(matched, request.page, request.page_size))
    }

    /// Write the filtered, searched listing as CSV. Returns rows written.
    pub fn export_csv<W: Write>(
        &self,
        criteria: &FilterCriteria,
        search: &str,
        kind: Option<RecordKind>,
        writer: W,
        path: &Path,
    ) -> Result<usize> {
        let records = self.load_filtered(criteria)?;
        let matched = filter::search_records(records, search, kind);
        let rows = export::export_records_csv(&matched, writer, path)?;
        tracing::info!(path = %path.display(), rows, "CSV export complete");
        Ok(rows)
    }

    /// Load, compute everything, render charts, and persist the snapshot.
    ///
    /// Returns `Ok(None)` when no records survive loading and filtering;
    /// in that case nothing is written and any previous snapshot is kept.
    pub fn run_full_analysis(
        &self,
        criteria: &FilterCriteria,
        interval: TrafficInterval,
        renderer: &dyn ChartRenderer,
    ) -> Result<Option<FullAnalysis>> {
        let records = self.load_filtered(criteria)?;
        if records.is_empty() {
            tracing::info!("No records matched; full analysis skipped");
            return Ok(None);
        }

        let summary = stats::basic_stats(&records, self.config.top_n);
        let hourly = stats::hourly_traffic(&records);
        let anomalies = anomaly::detect(&records, &self.config.thresholds);
        let trend = stats::traffic_by_interval(&records, interval);

        let chart_paths = renderer.render(
            &ChartInput {
                interval,
                trend: &trend,
                top_source_addresses: &summary.top_source_addresses,
                top_urls: &summary.top_urls,
            },
            &self.config.output_dir,
        )?;

        let snapshot = Snapshot::new(summary, hourly, anomalies, Utc::now());
        let snapshot_path = self.snapshot_path();
        snapshot::save(&snapshot, &snapshot_path)?;

        tracing::info!(
            records = records.len(),
            interval = %interval,
            charts = chart_paths.len(),
            snapshot = %snapshot_path.display(),
            "Full analysis complete"
        );

        let Snapshot {
            basic_stats,
            hourly_traffic,
            anomalies,
            generated_at,
        } = snapshot;

        Ok(Some(FullAnalysis {
            stats: basic_stats,
            hourly_traffic,
            anomalies,
            trend,
            chart_paths,
            snapshot_path,
            generated_at,
            filters: AppliedFilters::new(criteria, interval),
        }))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        snapshot::snapshot_path(&self.config.output_dir)
    }

    /// The last persisted full analysis, if any.
    pub fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        Ok(snapshot::load(&self.snapshot_path())?)
    }
}

/// Slice `records` into a 1-based page. `page_size` must be non-zero.
fn paginate(records: Vec<LogRecord>, page: usize, page_size: usize) -> RecordPage {
    let total = records.len();
    let total_pages = total.div_ceil(page_size);
    let start = page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(page_size))
        .unwrap_or(usize::MAX);

    let records = if start < total {
        records.into_iter().skip(start).take(page_size).collect()
    } else {
        Vec::new()
    };

    RecordPage {
        records,
        total,
        total_pages,
        current_page: page,
        page_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::charts::{CsvChartData, NoCharts};
    use crate::util::error::LogSiftError;
    use std::fs;

    fn access_line(addr: &str, ts: &str, url: &str, status: u16, size: u64) -> String {
        format!(r#"{addr} - - [{ts}] "GET {url} HTTP/1.1" {status} {size} "-" "Mozilla/5.0""#)
    }

    fn analyzer_with(lines: &[String]) -> (tempfile::TempDir, Analyzer) {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        fs::create_dir(&log_dir).unwrap();
        fs::write(log_dir.join("access.log"), lines.join("\n")).unwrap();
        let analyzer = Analyzer::new(AnalyzerConfig {
            log_dir,
            output_dir: dir.path().join("output"),
            ..Default::default()
        });
        (dir, analyzer)
    }

    fn scenario() -> Vec<String> {
        vec![
            access_line("10.0.0.1", "15/Jan/2024:10:00:00 +0000", "/a", 200, 500),
            access_line("10.0.0.1", "15/Jan/2024:11:00:00 +0000", "/b", 404, 200),
            access_line("10.0.0.2", "15/Jan/2024:12:00:00 +0000", "/a", 200, 9000),
        ]
    }

    #[test]
    fn test_stats_and_anomalies_scenario() {
        let (_dir, analyzer) = analyzer_with(&scenario());
        let criteria = FilterCriteria::default();

        let s = analyzer.stats(&criteria).unwrap();
        assert_eq!(s.total_requests, 3);
        assert_eq!(s.total_bytes, 9700);

        let report = analyzer.anomalies(&criteria).unwrap();
        assert_eq!(report.large_requests.len(), 1);
        assert_eq!(report.large_requests[0].size, 9000);
        assert_eq!(report.error_requests.len(), 1);
        assert_eq!(
            analyzer.error_counts(&criteria).unwrap(),
            BTreeMap::from([(404, 1)])
        );
        assert_eq!(analyzer.error_details(&criteria).unwrap()[0].url, "/b");
    }

    #[test]
    fn test_filename_selects_single_file() {
        let (dir, analyzer) = analyzer_with(&scenario());
        fs::write(
            dir.path().join("logs").join("other.log"),
            access_line("10.9.9.9", "15/Jan/2024:10:00:00 +0000", "/z", 200, 1),
        )
        .unwrap();

        let all = analyzer.stats(&FilterCriteria::default()).unwrap();
        assert_eq!(all.total_requests, 4);

        let one = analyzer
            .stats(&FilterCriteria {
                filename: Some("other.log".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(one.total_requests, 1);
    }

    #[test]
    fn test_pages_reconstruct_full_listing() {
        let lines: Vec<String> = (0..23)
            .map(|i| access_line(&format!("10.0.0.{i}"), "15/Jan/2024:10:00:00 +0000", "/", 200, i))
            .collect();
        let (_dir, analyzer) = analyzer_with(&lines);
        let criteria = FilterCriteria::default();
        let everything = analyzer.load_filtered(&criteria).unwrap();
        let total = everything.len();
        assert_eq!(total, 23);

        for page_size in 1..=total {
            let first = analyzer
                .page(&criteria, &PageRequest { page_size, ..Default::default() })
                .unwrap();
            assert_eq!(first.total, total);
            assert_eq!(first.total_pages, total.div_ceil(page_size));

            let mut rebuilt = Vec::new();
            for page in 1..=first.total_pages {
                let p = analyzer
                    .page(
                        &criteria,
                        &PageRequest {
                            page,
                            page_size,
                            ..Default::default()
                        },
                    )
                    .unwrap();
                assert!(!p.records.is_empty());
                rebuilt.extend(p.records);
            }
            assert_eq!(rebuilt, everything, "page size {page_size}");
        }
    }

    #[test]
    fn test_page_out_of_range_and_zero_size() {
        let (_dir, analyzer) = analyzer_with(&scenario());
        let criteria = FilterCriteria::default();

        let past_end = analyzer
            .page(&criteria, &PageRequest { page: 9, ..Default::default() })
            .unwrap();
        assert!(past_end.records.is_empty());
        assert_eq!(past_end.total, 3);
        assert_eq!(past_end.total_pages, 1);

        let page_zero = analyzer
            .page(&criteria, &PageRequest { page: 0, ..Default::default() })
            .unwrap();
        assert!(page_zero.records.is_empty());

        let err = analyzer
            .page(&criteria, &PageRequest { page_size: 0, ..Default::default() })
            .unwrap_err();
        assert!(matches!(
            err,
            LogSiftError::Query(QueryError::InvalidPageSize { size: 0 })
        ));
    }

    #[test]
    fn test_page_search_and_kind() {
        let (_dir, analyzer) = analyzer_with(&scenario());
        let criteria = FilterCriteria::default();
        let hits = analyzer
            .page(
                &criteria,
                &PageRequest {
                    search: "404".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(hits.total, 1);

        let errors_only = analyzer
            .page(
                &criteria,
                &PageRequest {
                    kind: Some(RecordKind::Error),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(errors_only.total, 0);
        assert_eq!(errors_only.total_pages, 0);
    }

    #[test]
    fn test_full_analysis_writes_snapshot_and_charts() {
        let (_dir, analyzer) = analyzer_with(&scenario());
        let criteria = FilterCriteria {
            domain: Some("/".to_string()),
            ..Default::default()
        };

        let result = analyzer
            .run_full_analysis(&criteria, TrafficInterval::Hourly, &CsvChartData)
            .unwrap()
            .expect("records exist");
        assert_eq!(result.stats.total_requests, 3);
        assert_eq!(result.trend.len(), 3);
        assert_eq!(result.chart_paths.len(), 3);
        assert!(result.chart_paths.iter().all(|p| p.exists()));
        assert_eq!(result.filters.domain.as_deref(), Some("/"));
        assert_eq!(result.filters.time_interval, TrafficInterval::Hourly);

        let snapshot = analyzer.load_snapshot().unwrap().expect("snapshot written");
        assert_eq!(snapshot.basic_stats, result.stats);
        assert_eq!(snapshot.hourly_traffic, result.hourly_traffic);
        assert_eq!(snapshot.generated_at, result.generated_at);
    }

    #[test]
    fn test_full_analysis_with_no_records_writes_nothing() {
        let (_dir, analyzer) = analyzer_with(&scenario());
        let criteria = FilterCriteria {
            filename: Some("missing.log".to_string()),
            ..Default::default()
        };
        let result = analyzer
            .run_full_analysis(&criteria, TrafficInterval::Daily, &NoCharts)
            .unwrap();
        assert!(result.is_none());
        assert!(!analyzer.snapshot_path().exists());
        assert!(analyzer.load_snapshot().unwrap().is_none());
    }

    #[test]
    fn test_export_csv_rows() {
        let (_dir, analyzer) = analyzer_with(&scenario());
        let mut buf = Vec::new();
        let rows = analyzer
            .export_csv(
                &FilterCriteria::default(),
                "10.0.0.1",
                None,
                &mut buf,
                Path::new("out.csv"),
            )
            .unwrap();
        assert_eq!(rows, 2);
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_config_from_app_config() {
        let app = AppConfig {
            top_n: 3,
            high_frequency_sigma: 1.5,
            ..Default::default()
        };
        let config = AnalyzerConfig::from(&app);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.thresholds.high_frequency_sigma, 1.5);
        assert_eq!(config.log_dir, app.log_dir);
    }
}
