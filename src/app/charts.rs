// LogSift - app/charts.rs
//
// Chart artifact collaborator for full analysis runs.
//
// Rendering images is a presentation concern. The analysis core hands a
// `ChartInput` to a `ChartRenderer` and records whatever paths it produced.

use crate::core::export::{write_top_entries_csv, write_trend_csv};
use crate::core::model::{TopEntry, TrafficInterval, TrafficPoint};
use crate::util::constants::{TOP_IPS_FILE_NAME, TOP_URLS_FILE_NAME, TRAFFIC_TREND_FILE_NAME};
use crate::util::error::{ExportError, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Data a renderer may draw from.
#[derive(Debug, Clone)]
pub struct ChartInput<'a> {
    pub interval: TrafficInterval,
    pub trend: &'a [TrafficPoint],
    pub top_source_addresses: &'a [TopEntry],
    pub top_urls: &'a [TopEntry],
}

/// Produces chart artifacts into an output directory.
pub trait ChartRenderer {
    /// Render into `dir`, returning the paths written.
    fn render(&self, input: &ChartInput<'_>, dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Renders nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCharts;

impl ChartRenderer for NoCharts {
    fn render(&self, _input: &ChartInput<'_>, _dir: &Path) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

/// Writes the chart series as CSV data files for an external plotter.
///
/// Files: the interval trend, the top source addresses, the top URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvChartData;

impl ChartRenderer for CsvChartData {
    fn render(&self, input: &ChartInput<'_>, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir).map_err(|e| ExportError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let trend_path = dir.join(TRAFFIC_TREND_FILE_NAME);
        write_trend_csv(input.trend, create(&trend_path)?, &trend_path)?;

        let ips_path = dir.join(TOP_IPS_FILE_NAME);
        write_top_entries_csv(
            input.top_source_addresses,
            "address",
            create(&ips_path)?,
            &ips_path,
        )?;

        let urls_path = dir.join(TOP_URLS_FILE_NAME);
        write_top_entries_csv(input.top_urls, "url", create(&urls_path)?, &urls_path)?;

        tracing::debug!(
            dir = %dir.display(),
            interval = %input.interval,
            trend_points = input.trend.len(),
            "Chart data written"
        );
        Ok(vec![trend_path, ips_path, urls_path])
    }
}

fn create(path: &Path) -> std::result::Result<BufWriter<File>, ExportError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| ExportError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}
