// LogSift - tests/e2e_analysis.rs
//
// End-to-end tests for the load -> filter -> analyse pipeline.
//
// These tests run against real log files under tests/fixtures/ through the
// public `Analyzer` facade and the `logsift` binary: real walkdir listing,
// real line reading, real chrono timestamp parsing. Output goes to a
// throwaway temp directory.

use logsift::app::charts::{CsvChartData, NoCharts};
use logsift::app::params::QueryParams;
use logsift::app::query::{Analyzer, AnalyzerConfig, PageRequest};
use logsift::core::model::{FilterCriteria, LogFileKind, RecordKind, TrafficInterval};
use logsift::util::constants::{SNAPSHOT_FILE_NAME, TOP_IPS_FILE_NAME};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Analyzer over the fixtures with output in a fresh temp directory.
fn fixture_analyzer() -> (TempDir, Analyzer) {
    let out = tempfile::tempdir().expect("tempdir");
    let analyzer = Analyzer::new(AnalyzerConfig {
        log_dir: fixtures_dir(),
        output_dir: out.path().join("output"),
        ..Default::default()
    });
    (out, analyzer)
}

fn criteria(json: &str) -> FilterCriteria {
    serde_json::from_str::<QueryParams>(json)
        .expect("valid params json")
        .to_criteria()
        .expect("valid criteria")
}

// =============================================================================
// Listing
// =============================================================================

#[test]
fn e2e_lists_fixture_files_sorted_and_classified() {
    let (_out, analyzer) = fixture_analyzer();
    let files = analyzer.list_log_files().unwrap();

    let listed: Vec<_> = files
        .iter()
        .map(|f| (f.filename.as_str(), f.kind))
        .collect();
    assert_eq!(
        listed,
        [
            ("access.log", LogFileKind::Access),
            ("apache.error", LogFileKind::Error),
            ("error.log", LogFileKind::Error),
        ]
    );
    assert!(files.iter().all(|f| f.size_bytes > 0 && f.modified.is_some()));
}

// =============================================================================
// Statistics
// =============================================================================

#[test]
fn e2e_basic_stats_over_all_files() {
    let (_out, analyzer) = fixture_analyzer();
    let s = analyzer.stats(&FilterCriteria::default()).unwrap();

    // Two access lines in the fixture are malformed and dropped.
    assert_eq!(s.total_requests, 8);
    assert_eq!(s.error_log_entries, 4);
    assert_eq!(s.unique_source_addresses, 5);
    assert_eq!(
        s.status_codes,
        BTreeMap::from([(200, 5), (302, 1), (404, 1), (500, 1)])
    );
    assert_eq!(
        s.methods,
        BTreeMap::from([("GET".to_string(), 7), ("POST".to_string(), 1)])
    );
    assert_eq!(s.total_bytes, 104_871_680);
    assert_eq!(s.average_response_size, 13_108_960);

    let top: Vec<_> = s
        .top_source_addresses
        .iter()
        .map(|t| (t.key.as_str(), t.count))
        .collect();
    assert_eq!(
        top,
        [
            ("192.168.1.10", 3),
            ("10.0.0.5", 2),
            ("192.168.1.11", 1),
            ("192.168.1.12", 1),
            ("203.0.113.9", 1),
        ]
    );
    assert_eq!(s.top_urls[0].key, "/index.html");
    assert_eq!(s.top_urls[1].key, "/api/items");

    let range = s.time_range.expect("timestamps parse");
    assert_eq!(range.start.to_rfc3339(), "2024-01-15T08:15:02+00:00");
    assert_eq!(range.end.to_rfc3339(), "2024-01-22T23:59:59+00:00");
}

#[test]
fn e2e_hourly_and_trend() {
    let (_out, analyzer) = fixture_analyzer();
    let all = FilterCriteria::default();

    let hourly = analyzer.hourly(&all).unwrap();
    let requests: Vec<_> = hourly.iter().map(|(h, b)| (*h, b.requests)).collect();
    assert_eq!(requests, [(8, 2), (9, 2), (10, 1), (14, 2), (23, 1)]);

    let daily = analyzer.trend(&all, TrafficInterval::Daily).unwrap();
    let per_day: Vec<_> = daily
        .iter()
        .map(|p| (p.bucket_start.format("%Y-%m-%d").to_string(), p.requests))
        .collect();
    assert_eq!(
        per_day,
        [
            ("2024-01-15".to_string(), 4),
            ("2024-01-16".to_string(), 2),
            ("2024-01-17".to_string(), 1),
            ("2024-01-22".to_string(), 1),
        ]
    );

    let weekly = analyzer.trend(&all, TrafficInterval::Weekly).unwrap();
    assert_eq!(weekly.len(), 2);
    assert_eq!(weekly[0].requests, 7);
    assert_eq!(weekly[1].bucket_start.format("%Y-%m-%d").to_string(), "2024-01-22");
}

// =============================================================================
// Filtering
// =============================================================================

#[test]
fn e2e_time_range_includes_error_records() {
    let (_out, analyzer) = fixture_analyzer();
    let c = criteria(r#"{"start_time": "2024-01-16", "end_time": "2024-01-17T23:59:59"}"#);

    let records = analyzer.load_filtered(&c).unwrap();
    let access = records.iter().filter(|r| r.kind() == RecordKind::Access).count();
    let errors = records.iter().filter(|r| r.kind() == RecordKind::Error).count();
    assert_eq!(access, 3);
    assert_eq!(errors, 3);
}

#[test]
fn e2e_domain_filter_matches_referer_and_drops_error_records() {
    let (_out, analyzer) = fixture_analyzer();
    let c = criteria(r#"{"domain": "EXAMPLE.COM"}"#);

    let records = analyzer.load_filtered(&c).unwrap();
    let addrs: Vec<_> = records.iter().filter_map(|r| r.source_address()).collect();
    assert_eq!(addrs, ["192.168.1.10", "192.168.1.11"]);
}

#[test]
fn e2e_nested_filename_selects_one_file() {
    let (_out, analyzer) = fixture_analyzer();
    let c = criteria(r#"{"filename": [["error.log"], "access.log"]}"#);

    let s = analyzer.stats(&c).unwrap();
    assert!(s.is_empty());
    assert_eq!(s.error_log_entries, 2);
}

#[test]
fn e2e_traversal_filename_loads_nothing() {
    let (_out, analyzer) = fixture_analyzer();
    let c = criteria(r#"{"filename": "../fixtures/access.log"}"#);
    assert!(analyzer.load_filtered(&c).unwrap().is_empty());
}

// =============================================================================
// Anomalies
// =============================================================================

#[test]
fn e2e_anomalies_over_fixtures() {
    let (_out, analyzer) = fixture_analyzer();
    let all = FilterCriteria::default();
    let report = analyzer.anomalies(&all).unwrap();

    // Per-address counts are too even for the 2-sigma rule.
    assert!(report.high_frequency_addresses.is_empty());

    let statuses: Vec<_> = report.error_requests.iter().map(|e| e.status_code).collect();
    assert_eq!(statuses, [404, 500]);

    assert_eq!(report.large_requests.len(), 1);
    assert_eq!(report.large_requests[0].url, "/download/big.iso");

    assert_eq!(
        analyzer.error_counts(&all).unwrap(),
        BTreeMap::from([(404, 1), (500, 1)])
    );
}

// =============================================================================
// Listing pages
// =============================================================================

#[test]
fn e2e_paged_search() {
    let (_out, analyzer) = fixture_analyzer();
    let all = FilterCriteria::default();

    let firefox = analyzer
        .page(
            &all,
            &PageRequest {
                search: "firefox".to_string(),
                page_size: 2,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(firefox.total, 3);
    assert_eq!(firefox.total_pages, 2);
    assert_eq!(firefox.records.len(), 2);

    let errors = analyzer
        .page(
            &all,
            &PageRequest {
                kind: Some(RecordKind::Error),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(errors.total, 4);
}

// =============================================================================
// Full analysis and snapshot
// =============================================================================

#[test]
fn e2e_full_analysis_round_trip() {
    let (out, analyzer) = fixture_analyzer();
    let c = criteria(r#"{"filename": "access.log"}"#);

    let result = analyzer
        .run_full_analysis(&c, TrafficInterval::Daily, &CsvChartData)
        .unwrap()
        .expect("fixture has records");

    let output_dir = out.path().join("output");
    assert_eq!(result.snapshot_path, output_dir.join(SNAPSHOT_FILE_NAME));
    assert!(result.chart_paths.contains(&output_dir.join(TOP_IPS_FILE_NAME)));
    assert_eq!(result.filters.filename.as_deref(), Some("access.log"));

    let snapshot = analyzer.load_snapshot().unwrap().expect("snapshot written");
    assert_eq!(snapshot.basic_stats.total_requests, 8);
    assert_eq!(snapshot.anomalies, result.anomalies);

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&result.snapshot_path).unwrap()).unwrap();
    assert!(raw["hourly_traffic"]["8"].is_object());
}

#[test]
fn e2e_full_analysis_without_records_keeps_previous_snapshot() {
    let (_out, analyzer) = fixture_analyzer();
    analyzer
        .run_full_analysis(&FilterCriteria::default(), TrafficInterval::Daily, &NoCharts)
        .unwrap()
        .expect("fixture has records");

    let empty = criteria(r#"{"start_time": "2030-01-01"}"#);
    let result = analyzer
        .run_full_analysis(&empty, TrafficInterval::Daily, &NoCharts)
        .unwrap();
    assert!(result.is_none());

    let snapshot = analyzer.load_snapshot().unwrap().expect("previous snapshot kept");
    assert_eq!(snapshot.basic_stats.total_requests, 8);
}

// =============================================================================
// CLI
// =============================================================================

#[test]
fn e2e_cli_stats_prints_json() {
    let tmp = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_logsift"))
        .arg("--config")
        .arg(tmp.path().join("absent.toml"))
        .arg("--log-dir")
        .arg(fixtures_dir())
        .arg("--output-dir")
        .arg(tmp.path())
        .args(["stats", "--file", "access.log"])
        .env_remove("RUST_LOG")
        .output()
        .expect("run logsift");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["total_requests"], 8);
    assert_eq!(value["status_codes"]["404"], 1);
}

#[test]
fn e2e_cli_rejects_zero_page_size() {
    let tmp = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_logsift"))
        .arg("--config")
        .arg(tmp.path().join("absent.toml"))
        .arg("--log-dir")
        .arg(fixtures_dir())
        .args(["page", "--page-size", "0"])
        .output()
        .expect("run logsift");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Page size must be at least 1"));
}

#[test]
fn e2e_cli_analyze_request_conflicts_with_filter_flags() {
    let tmp = tempfile::tempdir().unwrap();
    let request = tmp.path().join("request.json");
    std::fs::write(&request, r#"{"filename": "access.log"}"#).unwrap();

    for extra in [["--interval", "weekly"], ["--file", "error.log"]] {
        let output = Command::new(env!("CARGO_BIN_EXE_logsift"))
            .arg("--config")
            .arg(tmp.path().join("absent.toml"))
            .arg("--log-dir")
            .arg(fixtures_dir())
            .arg("--output-dir")
            .arg(tmp.path().join("output"))
            .arg("analyze")
            .arg("--request")
            .arg(&request)
            .args(extra)
            .output()
            .expect("run logsift");

        assert!(!output.status.success(), "{extra:?} should be rejected");
        assert!(
            String::from_utf8_lossy(&output.stderr).contains("cannot be used with"),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        assert!(!tmp.path().join("output").exists());
    }
}
