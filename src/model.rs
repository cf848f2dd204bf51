//! Domain records and the validated dataset a run operates on.
//!
//! A [`Dataset`] is built once from raw records, rejects anything malformed,
//! and is immutable afterwards. Every analytics stage borrows it.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::algorithms::{binary_search_by, merge_sort_by};
use crate::error::{AnalyticsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Casual,
    Member,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Casual => "casual",
            UserType::Member => "member",
        }
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "casual" => Ok(UserType::Casual),
            "member" => Ok(UserType::Member),
            other => Err(format!("unknown user type '{other}'")),
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BikeType {
    Classic,
    Electric,
}

impl BikeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BikeType::Classic => "classic",
            BikeType::Electric => "electric",
        }
    }
}

impl FromStr for BikeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "classic" => Ok(BikeType::Classic),
            "electric" => Ok(BikeType::Electric),
            other => Err(format!("unknown bike type '{other}'")),
        }
    }
}

impl fmt::Display for BikeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceType {
    TireRepair,
    BrakeAdjustment,
    BatteryReplacement,
    ChainLubrication,
    GeneralInspection,
}

impl FromStr for MaintenanceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tire_repair" => Ok(MaintenanceType::TireRepair),
            "brake_adjustment" => Ok(MaintenanceType::BrakeAdjustment),
            "battery_replacement" => Ok(MaintenanceType::BatteryReplacement),
            "chain_lubrication" => Ok(MaintenanceType::ChainLubrication),
            "general_inspection" => Ok(MaintenanceType::GeneralInspection),
            other => Err(format!("unknown maintenance type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bike {
    pub id: String,
    pub bike_type: BikeType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub user_type: UserType,
}

/// A logged repair or inspection with its cost.
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceRecord {
    pub id: String,
    pub bike_id: String,
    pub date: NaiveDate,
    pub maintenance_type: MaintenanceType,
    pub cost: f64,
}

/// A trip as handed over by ingestion, before reference checks.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    pub id: String,
    pub user_id: String,
    pub bike_id: String,
    pub start_station_id: String,
    pub end_station_id: String,
    pub start_time: NaiveDateTime,
    pub duration_min: f64,
    pub distance_km: f64,
}

/// A validated trip. Only [`Dataset::new`] can build one.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    id: String,
    user_id: String,
    bike_id: String,
    start_station_id: String,
    end_station_id: String,
    start_time: NaiveDateTime,
    duration_min: f64,
    distance_km: f64,
    user_type: UserType,
    bike_type: BikeType,
}

impl Trip {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn bike_id(&self) -> &str {
        &self.bike_id
    }

    pub fn start_station_id(&self) -> &str {
        &self.start_station_id
    }

    pub fn end_station_id(&self) -> &str {
        &self.end_station_id
    }

    pub fn duration_min(&self) -> f64 {
        self.duration_min
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub fn user_type(&self) -> UserType {
        self.user_type
    }

    pub fn bike_type(&self) -> BikeType {
        self.bike_type
    }

    /// Hour of day (0..=23) the trip started.
    pub fn hour(&self) -> u32 {
        self.start_time.hour()
    }

    pub fn weekday(&self) -> Weekday {
        self.start_time.weekday()
    }

    /// Calendar month the trip started in, as `YYYY-MM`.
    pub fn month(&self) -> String {
        self.start_time.format("%Y-%m").to_string()
    }
}

/// Immutable context for a single analysis run.
///
/// Reference tables are held sorted by id so lookups can binary search.
/// Trips and maintenance records keep their input order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    stations: Vec<Station>,
    bikes: Vec<Bike>,
    users: Vec<User>,
    trips: Vec<Trip>,
    maintenance: Vec<MaintenanceRecord>,
}

impl Dataset {
    /// Validates every record and reference, failing on the first problem.
    pub fn new(
        stations: Vec<Station>,
        bikes: Vec<Bike>,
        users: Vec<User>,
        trips: Vec<TripRecord>,
        maintenance: Vec<MaintenanceRecord>,
    ) -> Result<Self> {
        let stations = sorted_unique("station", &stations, |s| &s.id)?;
        let bikes = sorted_unique("bike", &bikes, |b| &b.id)?;
        let users = sorted_unique("user", &users, |u| &u.id)?;

        let mut dataset = Dataset {
            stations,
            bikes,
            users,
            trips: Vec::with_capacity(trips.len()),
            maintenance: Vec::with_capacity(maintenance.len()),
        };

        let mut seen_trips = HashSet::new();
        for record in trips {
            if !seen_trips.insert(record.id.clone()) {
                let reason = "duplicate trip id";
                return Err(AnalyticsError::malformed("trip", &record.id, reason));
            }
            let trip = dataset.validate_trip(record)?;
            dataset.trips.push(trip);
        }

        let mut seen_records = HashSet::new();
        for record in maintenance {
            if !seen_records.insert(record.id.clone()) {
                return Err(AnalyticsError::malformed(
                    "maintenance record",
                    &record.id,
                    "duplicate record id",
                ));
            }
            if dataset.bike(&record.bike_id).is_none() {
                return Err(AnalyticsError::malformed(
                    "maintenance record",
                    &record.id,
                    format!("unknown bike '{}'", record.bike_id),
                ));
            }
            if !record.cost.is_finite() || record.cost < 0.0 {
                return Err(AnalyticsError::malformed(
                    "maintenance record",
                    &record.id,
                    format!("invalid cost {}", record.cost),
                ));
            }
            dataset.maintenance.push(record);
        }

        Ok(dataset)
    }

    fn validate_trip(&self, record: TripRecord) -> Result<Trip> {
        if record.id.trim().is_empty() {
            return Err(AnalyticsError::malformed("trip", "", "empty trip id"));
        }
        check_measure(&record.id, "duration_minutes", record.duration_min)?;
        check_measure(&record.id, "distance_km", record.distance_km)?;

        for station_id in [&record.start_station_id, &record.end_station_id] {
            if self.station(station_id).is_none() {
                return Err(AnalyticsError::malformed(
                    "trip",
                    &record.id,
                    format!("unknown station '{station_id}'"),
                ));
            }
        }

        let bike_type = self
            .bike(&record.bike_id)
            .map(|b| b.bike_type)
            .ok_or_else(|| {
                let reason = format!("unknown bike '{}'", record.bike_id);
                AnalyticsError::malformed("trip", &record.id, reason)
            })?;

        let user_type = self
            .user(&record.user_id)
            .map(|u| u.user_type)
            .ok_or_else(|| {
                let reason = format!("unknown user '{}'", record.user_id);
                AnalyticsError::malformed("trip", &record.id, reason)
            })?;

        Ok(Trip {
            id: record.id,
            user_id: record.user_id,
            bike_id: record.bike_id,
            start_station_id: record.start_station_id,
            end_station_id: record.end_station_id,
            start_time: record.start_time,
            duration_min: record.duration_min,
            distance_km: record.distance_km,
            user_type,
            bike_type,
        })
    }

    pub fn station(&self, id: &str) -> Option<&Station> {
        binary_search_by(&self.stations, |s| s.id.as_str().cmp(id)).map(|i| &self.stations[i])
    }

    pub fn bike(&self, id: &str) -> Option<&Bike> {
        binary_search_by(&self.bikes, |b| b.id.as_str().cmp(id)).map(|i| &self.bikes[i])
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        binary_search_by(&self.users, |u| u.id.as_str().cmp(id)).map(|i| &self.users[i])
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn bikes(&self) -> &[Bike] {
        &self.bikes
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn maintenance(&self) -> &[MaintenanceRecord] {
        &self.maintenance
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }
}

fn check_measure(trip_id: &str, field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AnalyticsError::malformed(
            "trip",
            trip_id,
            format!("{field} must be a non-negative number, got {value}"),
        ));
    }
    Ok(())
}

/// Sorts a reference table by id and rejects empty or repeated ids.
fn sorted_unique<T, F>(entity: &'static str, rows: &[T], id: F) -> Result<Vec<T>>
where
    T: Clone,
    F: Fn(&T) -> &String,
{
    let sorted = merge_sort_by(rows, |a, b| id(a).cmp(id(b)));

    for row in &sorted {
        if id(row).trim().is_empty() {
            return Err(AnalyticsError::malformed(entity, "", "empty id"));
        }
    }
    for pair in sorted.windows(2) {
        if id(&pair[0]) == id(&pair[1]) {
            return Err(AnalyticsError::malformed(entity, id(&pair[0]).as_str(), "duplicate id"));
        }
    }

    Ok(sorted)
}
