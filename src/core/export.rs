// LogSift - core/export.rs
//
// CSV and JSON serialisation of records, analysis snapshots, and chart data.
// Core layer: writes to any Write trait object. File placement and atomic
// replacement are owned by the app layer.

use crate::core::model::{AnomalyReport, HourlyTraffic, LogRecord, StatsSummary, TopEntry, TrafficPoint};
use crate::util::error::ExportError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

// =============================================================================
// Snapshot
// =============================================================================

/// Durable result of a full analysis run, read back on next startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub basic_stats: StatsSummary,

    /// Hour-of-day traffic, keyed 0-23.
    pub hourly_traffic: HourlyTraffic,

    pub anomalies: AnomalyReport,

    /// RFC 3339 generation time.
    pub generated_at: String,
}

impl Snapshot {
    pub fn new(
        basic_stats: StatsSummary,
        hourly_traffic: HourlyTraffic,
        anomalies: AnomalyReport,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            basic_stats,
            hourly_traffic,
            anomalies,
            generated_at: generated_at.to_rfc3339(),
        }
    }
}

/// Serialise a snapshot as pretty-printed JSON.
pub fn write_snapshot_json<W: Write>(
    snapshot: &Snapshot,
    writer: W,
    path: &Path,
) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, snapshot).map_err(|e| ExportError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Parse a snapshot document previously written by [`write_snapshot_json`].
pub fn read_snapshot_json(bytes: &[u8], path: &Path) -> Result<Snapshot, ExportError> {
    serde_json::from_slice(bytes).map_err(|e| ExportError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

// =============================================================================
// Record CSV
// =============================================================================

/// Column order of the record CSV export.
pub const RECORD_CSV_HEADER: [&str; 12] = [
    "kind",
    "timestamp",
    "address",
    "method",
    "url",
    "protocol",
    "status",
    "size",
    "referer",
    "user_agent",
    "level",
    "message",
];

/// Export records to CSV, one row per record.
///
/// Cells that do not apply to a record's variant are left empty rather
/// than zero-filled. Returns the number of rows written.
pub fn export_records_csv<W: Write>(
    records: &[LogRecord],
    writer: W,
    path: &Path,
) -> Result<usize, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let csv_err = |e| ExportError::Csv {
        path: path.to_path_buf(),
        source: e,
    };

    csv_writer.write_record(RECORD_CSV_HEADER).map_err(csv_err)?;

    for record in records {
        let kind = record.kind().label().to_string();
        let url = record.url().unwrap_or_default().to_string();
        let row: [String; 12] = match record {
            LogRecord::Access(a) => [
                kind,
                a.timestamp.clone(),
                a.source_address.clone(),
                a.method.clone(),
                url,
                a.protocol.clone(),
                a.status_code.to_string(),
                a.response_size.to_string(),
                a.referer.clone(),
                a.user_agent.clone(),
                String::new(),
                String::new(),
            ],
            LogRecord::Error(e) => [
                kind,
                e.timestamp.clone(),
                e.source_address.clone().unwrap_or_default(),
                e.method.clone().unwrap_or_default(),
                url,
                String::new(),
                String::new(),
                String::new(),
                e.referrer.clone().unwrap_or_default(),
                String::new(),
                e.level.clone(),
                e.message.clone(),
            ],
        };
        csv_writer.write_record(&row).map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(records.len())
}

// =============================================================================
// Chart data CSV
// =============================================================================

/// Write a traffic trend series as `bucket_start,requests,bytes`.
pub fn write_trend_csv<W: Write>(
    points: &[TrafficPoint],
    writer: W,
    path: &Path,
) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let csv_err = |e| ExportError::Csv {
        path: path.to_path_buf(),
        source: e,
    };
    csv_writer
        .write_record(["bucket_start", "requests", "bytes"])
        .map_err(csv_err)?;
    for p in points {
        csv_writer
            .write_record([
                p.bucket_start.format("%Y-%m-%d %H:%M:%S").to_string(),
                p.requests.to_string(),
                p.bytes.to_string(),
            ])
            .map_err(csv_err)?;
    }
    csv_writer.flush().map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write a ranked top-N list as `key_column,count`.
pub fn write_top_entries_csv<W: Write>(
    entries: &[TopEntry],
    key_column: &str,
    writer: W,
    path: &Path,
) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let csv_err = |e| ExportError::Csv {
        path: path.to_path_buf(),
        source: e,
    };
    csv_writer
        .write_record([key_column, "count"])
        .map_err(csv_err)?;
    for entry in entries {
        csv_writer
            .write_record([entry.key.as_str(), &entry.count.to_string()])
            .map_err(csv_err)?;
    }
    csv_writer.flush().map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{AccessRecord, ErrorOrigin, ErrorRecord, TrafficBucket};
    use chrono::{NaiveDate, TimeZone};

    fn records() -> Vec<LogRecord> {
        vec![
            LogRecord::Access(AccessRecord {
                source_address: "10.0.0.1".to_string(),
                timestamp: "15/Jan/2024:10:00:00 +0000".to_string(),
                method: "GET".to_string(),
                url: "/search?q=a,b".to_string(),
                protocol: "HTTP/1.1".to_string(),
                status_code: 200,
                response_size: 512,
                referer: "-".to_string(),
                user_agent: "curl/8.0".to_string(),
            }),
            LogRecord::Error(ErrorRecord {
                origin: ErrorOrigin::Nginx,
                timestamp: "2024/01/15 10:00:01".to_string(),
                level: "error".to_string(),
                message: "upstream timed out".to_string(),
                source_address: Some("10.0.0.2".to_string()),
                method: None,
                url: None,
                module: None,
                pid: Some(10),
                tid: Some(10),
                connection_id: Some(3),
                server: None,
                upstream: None,
                host: None,
                referrer: None,
            }),
        ]
    }

    #[test]
    fn test_record_csv_export() {
        let mut buf = Vec::new();
        let count = export_records_csv(&records(), &mut buf, Path::new("out.csv")).unwrap();
        assert_eq!(count, 2);

        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(
            lines[0],
            "kind,timestamp,address,method,url,protocol,status,size,referer,user_agent,level,message"
        );
        assert!(lines[1].contains("\"/search?q=a,b\""), "comma must be quoted: {}", lines[1]);
        assert_eq!(
            lines[2],
            "error,2024/01/15 10:00:01,10.0.0.2,,,,,,,,error,upstream timed out"
        );
    }

    #[test]
    fn test_record_csv_error_row_keeps_request_url() {
        let record = LogRecord::Error(ErrorRecord {
            origin: ErrorOrigin::Nginx,
            timestamp: "2024/01/15 10:00:02".to_string(),
            level: "error".to_string(),
            message: "open() failed".to_string(),
            source_address: Some("10.0.0.3".to_string()),
            method: Some("GET".to_string()),
            url: Some("/missing.png".to_string()),
            module: None,
            pid: None,
            tid: None,
            connection_id: None,
            server: None,
            upstream: None,
            host: None,
            referrer: None,
        });
        let mut buf = Vec::new();
        export_records_csv(&[record], &mut buf, Path::new("out.csv")).unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert_eq!(
            output.lines().nth(1),
            Some("error,2024/01/15 10:00:02,10.0.0.3,GET,/missing.png,,,,,,error,open() failed")
        );
    }

    #[test]
    fn test_snapshot_json_layout() {
        let snapshot = Snapshot::new(
            StatsSummary::default(),
            HourlyTraffic::from([(10, TrafficBucket { requests: 2, bytes: 9 })]),
            AnomalyReport::default(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
        );
        let mut buf = Vec::new();
        write_snapshot_json(&snapshot, &mut buf, Path::new("snap.json")).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        for key in ["basic_stats", "hourly_traffic", "anomalies", "generated_at"] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["hourly_traffic"]["10"]["requests"], 2);
        assert_eq!(value["generated_at"], "2024-01-15T10:00:00+00:00");

        let back = read_snapshot_json(&buf, Path::new("snap.json")).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_corrupt_snapshot_is_json_error() {
        let err = read_snapshot_json(b"{\"basic_stats\":", Path::new("snap.json")).unwrap_err();
        assert!(matches!(err, ExportError::Json { .. }));
    }

    #[test]
    fn test_chart_data_csv() {
        let points = vec![TrafficPoint {
            bucket_start: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            requests: 3,
            bytes: 9700,
        }];
        let mut buf = Vec::new();
        write_trend_csv(&points, &mut buf, Path::new("trend.csv")).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "bucket_start,requests,bytes\n2024-01-15 00:00:00,3,9700\n"
        );

        let top = vec![TopEntry { key: "10.0.0.1".to_string(), count: 2 }];
        let mut buf = Vec::new();
        write_top_entries_csv(&top, "address", &mut buf, Path::new("top.csv")).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "address,count\n10.0.0.1,2\n");
    }
}
