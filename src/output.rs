//! Output formatting and persistence for analytics reports.
//!
//! Supports pretty-printing, JSON report files, a flagged-trip CSV, and a
//! per-run totals CSV that is appended to.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing::{debug, info};

use crate::analytics::anomaly::AnomalyFlag;
use crate::analytics::types::{AnalyticsReport, Totals};

/// Logs the report using Rust's debug pretty-print format.
pub fn print_pretty(report: &AnalyticsReport) {
    debug!("{:#?}", report);
}

/// Logs the report as pretty-printed JSON.
pub fn print_json(report: &AnalyticsReport) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Logs a short human-readable summary of the headline figures.
pub fn print_summary(report: &AnalyticsReport) {
    let totals = &report.totals;
    let not_applicable = || "n/a".to_string();
    info!(
        trips = totals.trip_count,
        distance_km = %format!("{:.2}", totals.total_distance_km),
        avg_duration = %totals.avg_duration_min.map(fmt_duration).unwrap_or_else(not_applicable),
        revenue = %fmt_currency(totals.total_revenue),
        arpu = %totals.arpu.map(fmt_currency).unwrap_or_else(not_applicable),
        "Totals"
    );

    if let Some(hour) = &report.peak_usage.busiest_hour {
        info!(hour = %hour.key, trips = hour.count, "Busiest hour");
    }
    if let Some(day) = &report.peak_usage.busiest_weekday {
        info!(weekday = %day.key, trips = day.count, "Busiest weekday");
    }
    for (rank, route) in report.rankings.top_routes.iter().enumerate() {
        info!(rank = rank + 1, route = %route.key, trips = route.count, "Top route");
    }
    for bike in &report.anomalies.flagged_bikes {
        info!(
            bike_id = %bike.bike_id,
            flagged_trips = bike.flagged_trips,
            "Bike with outlier trips"
        );
    }
}

/// Writes the full report as pretty JSON, creating parent directories.
pub fn write_report(path: &str, report: &AnalyticsReport) -> Result<()> {
    ensure_parent(path)?;
    let body = serde_json::to_vec_pretty(report)?;
    fs::write(path, body).with_context(|| format!("writing report to {path}"))?;
    info!(path, "Report written");
    Ok(())
}

/// Writes flagged trips as CSV, replacing any existing file.
pub fn write_flagged_trips<'a, I>(path: &str, flags: I) -> Result<()>
where
    I: IntoIterator<Item = &'a AnomalyFlag>,
{
    ensure_parent(path)?;
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("creating {path}"))?;

    let mut rows = 0usize;
    for flag in flags {
        writer.serialize(flag)?;
        rows += 1;
    }
    writer.flush()?;

    debug!(path, rows, "Flagged trips written");
    Ok(())
}

/// Appends a [`Totals`] record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_totals(path: &str, totals: &Totals) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    ensure_parent(path)?;
    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(totals)?;
    writer.flush()?;

    Ok(())
}

/// Formats minutes as `1h 5m`.
pub fn fmt_duration(minutes: f64) -> String {
    let whole = minutes.max(0.0) as u64;
    format!("{}h {}m", whole / 60, whole % 60)
}

/// Formats an amount in euros with two decimals.
pub fn fmt_currency(amount: f64) -> String {
    format!("€{amount:.2}")
}

fn ensure_parent(path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::report::analyze;
    use crate::config::AnalyticsConfig;
    use crate::model::fixtures::scenario;
    use std::env;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn sample_report() -> AnalyticsReport {
        let config = AnalyticsConfig {
            anomaly_threshold: 1.4,
            ..AnalyticsConfig::default()
        };
        analyze(&scenario(), &config).unwrap()
    }

    #[test]
    fn test_fmt_helpers() {
        assert_eq!(fmt_duration(65.0), "1h 5m");
        assert_eq!(fmt_duration(12.9), "0h 12m");
        assert_eq!(fmt_currency(3.456), "€3.46");
    }

    #[test]
    fn test_print_does_not_panic() {
        let report = sample_report();
        print_pretty(&report);
        print_json(&report).unwrap();
        print_summary(&report);
    }

    #[test]
    fn test_write_report_is_valid_json() {
        let path = temp_path("bikeshare_analytics_test_report.json");
        let _ = fs::remove_file(&path); // clean up any prior run

        write_report(&path, &sample_report()).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["totals"]["trip_count"], 3);
        assert_eq!(value["anomalies"]["flagged_bikes"][0]["bike_id"], "b3");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_flagged_trips() {
        let path = temp_path("bikeshare_analytics_test_flagged.csv");
        let _ = fs::remove_file(&path);

        let report = sample_report();
        write_flagged_trips(&path, &report.anomalies.flagged_trips).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("trip_id,bike_id"));
        assert!(lines[1].starts_with("t3,b3"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_totals_writes_header_once() {
        let path = temp_path("bikeshare_analytics_test_totals.csv");
        let _ = fs::remove_file(&path);

        let report = sample_report();
        append_totals(&path, &report.totals).unwrap();
        append_totals(&path, &report.totals).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("trip_count")).count();
        assert_eq!(header_count, 1);
        // 1 header + 2 data rows
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }
}
