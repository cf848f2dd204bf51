use tracing::{debug, info};

use crate::analytics::aggregate::{Dimension, GroupKey, GroupStat, Measure, group_by};
use crate::analytics::anomaly::AnomalyDetector;
use crate::analytics::pricing::{accrue_maintenance, compute_revenue, maintenance_by_bike_type};
use crate::analytics::rank::{OrderBy, rank, top_k};
use crate::analytics::types::{
    AnalyticsReport, AnomalySummary, Financials, FlaggedBike, PeakUsage, RankedEntry, Rankings,
    Totals, VolumeEntry,
};
use crate::analytics::utility::ratio;
use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::model::Dataset;

pub const SCHEMA_VERSION: u8 = 1;

/// Runs aggregation, ranking, anomaly detection and pricing over `dataset`
/// and assembles the report.
///
/// A pure function of its inputs: the same dataset and config always produce
/// an identical report.
#[tracing::instrument(skip_all, fields(trips = dataset.trips().len(), top_k = config.top_k))]
pub fn analyze(dataset: &Dataset, config: &AnalyticsConfig) -> Result<AnalyticsReport> {
    config.validate()?;
    let trips = dataset.trips();

    let revenue = compute_revenue(trips, config)?;
    let ledger = accrue_maintenance(dataset, config)?;
    debug!(bikes = ledger.bikes().len(), "Maintenance accrued");

    let stations = group_by(trips, Dimension::StartStation, Measure::Duration);
    let routes = group_by(trips, Dimension::Route, Measure::Duration);
    let bikes = group_by(trips, Dimension::Bike, Measure::Duration);
    let hours = group_by(trips, Dimension::Hour, Measure::Duration);
    let weekdays = group_by(trips, Dimension::Weekday, Measure::Duration);
    let months = group_by(trips, Dimension::Month, Measure::Duration);
    debug!(
        stations = stations.len(),
        routes = routes.len(),
        hours = hours.len(),
        "Trips grouped"
    );

    let total_duration: f64 = trips.iter().map(|t| t.duration_min()).sum();
    let total_distance_km: f64 = trips.iter().map(|t| t.distance_km()).sum();

    let totals = Totals {
        trip_count: trips.len(),
        total_distance_km,
        avg_duration_min: ratio(total_duration, trips.len()),
        avg_distance_km: ratio(total_distance_km, trips.len()),
        distinct_users: revenue.distinct_users,
        total_revenue: revenue.total_revenue,
        arpu: revenue.arpu,
    };

    let peak_usage = PeakUsage {
        busiest_hour: first_entry(&hours, dataset),
        busiest_weekday: first_entry(&weekdays, dataset),
        hourly_volume: volume(&hours),
        weekday_volume: volume(&weekdays),
        monthly_volume: volume(&months),
    };

    let rankings = Rankings {
        top_k: config.top_k,
        top_start_stations: entries(&top_k(&stations, config.top_k, OrderBy::CountDesc), dataset),
        top_routes: entries(&top_k(&routes, config.top_k, OrderBy::CountDesc), dataset),
        top_bikes: entries(&top_k(&bikes, config.top_k, OrderBy::CountDesc), dataset),
    };

    let maintenance = maintenance_by_bike_type(&ledger);
    let financials = Financials {
        total_maintenance_cost: maintenance.iter().map(|m| m.total_cost).sum(),
        revenue_by_user_type: revenue.by_user_type,
        maintenance_by_bike_type: maintenance,
    };

    let outcome = AnomalyDetector::new(config.anomaly_threshold).detect(trips);
    let flagged_trips: Vec<_> = outcome.flagged().cloned().collect();
    let anomalies = AnomalySummary {
        threshold: outcome.threshold,
        duration: outcome.duration,
        distance: outcome.distance,
        flagged_trip_count: flagged_trips.len(),
        flagged_bikes: outcome
            .flagged_bikes
            .iter()
            .map(|g| FlaggedBike {
                bike_id: g.key.to_string(),
                flagged_trips: g.count,
            })
            .collect(),
        flagged_trips,
    };

    info!(
        trips = totals.trip_count,
        revenue = totals.total_revenue,
        flagged = anomalies.flagged_trip_count,
        "Analysis complete"
    );

    Ok(AnalyticsReport {
        schema_version: SCHEMA_VERSION,
        totals,
        peak_usage,
        rankings,
        financials,
        anomalies,
    })
}

fn first_entry(groups: &[GroupStat], dataset: &Dataset) -> Option<RankedEntry> {
    top_k(groups, 1, OrderBy::CountDesc)
        .first()
        .map(|g| entry(g, dataset))
}

fn entries(groups: &[GroupStat], dataset: &Dataset) -> Vec<RankedEntry> {
    groups.iter().map(|g| entry(g, dataset)).collect()
}

fn entry(group: &GroupStat, dataset: &Dataset) -> RankedEntry {
    RankedEntry {
        key: group.key.to_string(),
        label: label(&group.key, dataset),
        count: group.count,
    }
}

fn label(key: &GroupKey, dataset: &Dataset) -> Option<String> {
    let station_name = |id: &str| dataset.station(id).map(|s| s.name.clone());
    match key {
        GroupKey::Station(id) => station_name(id),
        GroupKey::Route { start, end } => {
            Some(format!("{} → {}", station_name(start)?, station_name(end)?))
        }
        GroupKey::Bike(id) => dataset.bike(id).map(|b| b.bike_type.to_string()),
        _ => None,
    }
}

fn volume(groups: &[GroupStat]) -> Vec<VolumeEntry> {
    rank(groups, OrderBy::KeyAsc)
        .into_iter()
        .map(|g| VolumeEntry {
            key: g.key.to_string(),
            trips: g.count,
        })
        .collect()
}
