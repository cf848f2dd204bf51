//! CSV ingestion for a dataset directory.
//!
//! Expects `stations.csv`, `bikes.csv`, `users.csv` and `trips.csv`, plus an
//! optional `maintenance.csv`. Every column is read as text first so that a
//! missing or blank value is reported as malformed input naming the record
//! and field, instead of a generic deserialization failure.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::AnalyticsError;
use crate::model::{Bike, Dataset, MaintenanceRecord, Station, TripRecord, User};

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct StationRow {
    station_id: Option<String>,
    station_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BikeRow {
    bike_id: Option<String>,
    bike_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserRow {
    user_id: Option<String>,
    user_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TripRow {
    trip_id: Option<String>,
    user_id: Option<String>,
    bike_id: Option<String>,
    start_station_id: Option<String>,
    end_station_id: Option<String>,
    start_time: Option<String>,
    duration_minutes: Option<String>,
    distance_km: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MaintenanceRow {
    record_id: Option<String>,
    bike_id: Option<String>,
    maintenance_date: Option<String>,
    maintenance_type: Option<String>,
    cost: Option<String>,
}

/// Reads and validates every table under `dir`.
///
/// # Errors
///
/// Fails on unreadable files, CSV syntax errors, and any
/// [`AnalyticsError::MalformedInput`] raised while building the dataset.
#[tracing::instrument(skip(dir), fields(dir = %dir.display()))]
pub fn load_dataset(dir: &Path) -> Result<Dataset> {
    let stations = read_rows::<StationRow>(&dir.join("stations.csv"))?
        .into_iter()
        .enumerate()
        .map(|(n, row)| -> Result<Station, AnalyticsError> {
            let id = required("station", &row_label(n), "station_id", row.station_id)?;
            let name = required("station", &id, "station_name", row.station_name)?;
            Ok(Station { id, name })
        })
        .collect::<Result<Vec<_>, AnalyticsError>>()?;

    let bikes = read_rows::<BikeRow>(&dir.join("bikes.csv"))?
        .into_iter()
        .enumerate()
        .map(|(n, row)| -> Result<Bike, AnalyticsError> {
            let id = required("bike", &row_label(n), "bike_id", row.bike_id)?;
            let bike_type = parsed("bike", &id, "bike_type", row.bike_type)?;
            Ok(Bike { id, bike_type })
        })
        .collect::<Result<Vec<_>, AnalyticsError>>()?;

    let users = read_rows::<UserRow>(&dir.join("users.csv"))?
        .into_iter()
        .enumerate()
        .map(|(n, row)| -> Result<User, AnalyticsError> {
            let id = required("user", &row_label(n), "user_id", row.user_id)?;
            let user_type = parsed("user", &id, "user_type", row.user_type)?;
            Ok(User { id, user_type })
        })
        .collect::<Result<Vec<_>, AnalyticsError>>()?;

    let trips = read_rows::<TripRow>(&dir.join("trips.csv"))?
        .into_iter()
        .enumerate()
        .map(|(n, row)| trip_record(n, row))
        .collect::<Result<Vec<_>, AnalyticsError>>()?;

    let maintenance_path = dir.join("maintenance.csv");
    let maintenance = if maintenance_path.exists() {
        read_rows::<MaintenanceRow>(&maintenance_path)?
            .into_iter()
            .enumerate()
            .map(|(n, row)| maintenance_record(n, row))
            .collect::<Result<Vec<_>, AnalyticsError>>()?
    } else {
        debug!("No maintenance.csv, skipping logged maintenance");
        Vec::new()
    };

    let dataset = Dataset::new(stations, bikes, users, trips, maintenance)?;

    info!(
        stations = dataset.stations().len(),
        bikes = dataset.bikes().len(),
        users = dataset.users().len(),
        trips = dataset.trips().len(),
        maintenance = dataset.maintenance().len(),
        "Dataset loaded"
    );

    Ok(dataset)
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut rows = Vec::new();

    for result in rdr.deserialize() {
        let record: T = result.with_context(|| format!("reading {}", path.display()))?;
        rows.push(record);
    }

    debug!(path = %path.display(), rows = rows.len(), "Read CSV table");
    Ok(rows)
}

fn trip_record(n: usize, row: TripRow) -> Result<TripRecord, AnalyticsError> {
    let id = required("trip", &row_label(n), "trip_id", row.trip_id)?;
    let start_time = required("trip", &id, "start_time", row.start_time)?;
    let start_time = parse_datetime(&start_time).ok_or_else(|| {
        let reason = format!("invalid start_time '{start_time}'");
        AnalyticsError::malformed("trip", &id, reason)
    })?;

    Ok(TripRecord {
        user_id: required("trip", &id, "user_id", row.user_id)?,
        bike_id: required("trip", &id, "bike_id", row.bike_id)?,
        start_station_id: required("trip", &id, "start_station_id", row.start_station_id)?,
        end_station_id: required("trip", &id, "end_station_id", row.end_station_id)?,
        start_time,
        duration_min: parsed("trip", &id, "duration_minutes", row.duration_minutes)?,
        distance_km: parsed("trip", &id, "distance_km", row.distance_km)?,
        id,
    })
}

fn maintenance_record(n: usize, row: MaintenanceRow) -> Result<MaintenanceRecord, AnalyticsError> {
    const ENTITY: &str = "maintenance record";
    let id = required(ENTITY, &row_label(n), "record_id", row.record_id)?;
    let date = required(ENTITY, &id, "maintenance_date", row.maintenance_date)?;
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|_| {
        let reason = format!("invalid maintenance_date '{date}'");
        AnalyticsError::malformed(ENTITY, &id, reason)
    })?;

    Ok(MaintenanceRecord {
        bike_id: required(ENTITY, &id, "bike_id", row.bike_id)?,
        date,
        maintenance_type: parsed(ENTITY, &id, "maintenance_type", row.maintenance_type)?,
        cost: parsed(ENTITY, &id, "cost", row.cost)?,
        id,
    })
}

/// Rows are numbered from 1 in errors raised before an id is known.
fn row_label(n: usize) -> String {
    format!("row {}", n + 1)
}

/// Accepts `YYYY-MM-DD HH:MM:SS` and the ISO `T`-separated form.
fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn required(
    entity: &'static str,
    id: &str,
    field: &str,
    value: Option<String>,
) -> Result<String, AnalyticsError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AnalyticsError::malformed(entity, id, format!("missing {field}"))),
    }
}

fn parsed<T>(
    entity: &'static str,
    id: &str,
    field: &str,
    value: Option<String>,
) -> Result<T, AnalyticsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let text = required(entity, id, field, value)?;
    text.parse::<T>().map_err(|e| {
        AnalyticsError::malformed(entity, id, format!("invalid {field} '{text}': {e}"))
    })
}
