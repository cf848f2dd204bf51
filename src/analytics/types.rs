//! The report handed to visualization and report-writing consumers.
//!
//! Every collection is a `Vec` in a defined order so that serializing the
//! same input twice yields identical bytes.

use serde::Serialize;

use crate::analytics::anomaly::{AnomalyFlag, MeasureStats};
use crate::analytics::pricing::{BikeTypeMaintenance, UserTypeRevenue};

/// Whole-dataset totals. Also appended as one CSV row per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub trip_count: usize,
    pub total_distance_km: f64,
    pub avg_duration_min: Option<f64>,
    pub avg_distance_km: Option<f64>,
    pub distinct_users: usize,
    pub total_revenue: f64,
    pub arpu: Option<f64>,
}

/// One row of a ranked list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub key: String,
    pub label: Option<String>,
    pub count: usize,
}

/// Trip count for one hour, weekday or month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeEntry {
    pub key: String,
    pub trips: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakUsage {
    pub busiest_hour: Option<RankedEntry>,
    pub busiest_weekday: Option<RankedEntry>,
    /// Ascending by hour.
    pub hourly_volume: Vec<VolumeEntry>,
    /// Monday first.
    pub weekday_volume: Vec<VolumeEntry>,
    /// Ascending by month.
    pub monthly_volume: Vec<VolumeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rankings {
    pub top_k: usize,
    pub top_start_stations: Vec<RankedEntry>,
    pub top_routes: Vec<RankedEntry>,
    pub top_bikes: Vec<RankedEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Financials {
    pub revenue_by_user_type: Vec<UserTypeRevenue>,
    pub maintenance_by_bike_type: Vec<BikeTypeMaintenance>,
    pub total_maintenance_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedBike {
    pub bike_id: String,
    pub flagged_trips: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalySummary {
    pub threshold: f64,
    /// `None` when there are no trips.
    pub duration: Option<MeasureStats>,
    pub distance: Option<MeasureStats>,
    pub flagged_trip_count: usize,
    /// Most flagged trips first.
    pub flagged_bikes: Vec<FlaggedBike>,
    pub flagged_trips: Vec<AnomalyFlag>,
}

/// Complete result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub schema_version: u8,
    pub totals: Totals,
    pub peak_usage: PeakUsage,
    pub rankings: Rankings,
    pub financials: Financials,
    pub anomalies: AnomalySummary,
}
