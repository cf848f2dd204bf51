//! Single-pass grouping of trips by one dimension.
//!
//! Groups come back in the order their key was first seen. The ranker relies
//! on that order to break ties.

use std::collections::HashMap;
use std::fmt;

use crate::model::{BikeType, Trip, UserType};

/// What trips are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    StartStation,
    EndStation,
    Route,
    Hour,
    Weekday,
    Month,
    UserType,
    BikeType,
    Bike,
}

/// The numeric trip field summed and averaged per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Duration,
    Distance,
}

impl Measure {
    pub fn of(&self, trip: &Trip) -> f64 {
        match self {
            Measure::Duration => trip.duration_min(),
            Measure::Distance => trip.distance_km(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Measure::Duration => "duration",
            Measure::Distance => "distance",
        }
    }
}

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Station(String),
    Route { start: String, end: String },
    Hour(u32),
    /// Days from Monday, 0..=6.
    Weekday(u32),
    Month(String),
    UserType(UserType),
    BikeType(BikeType),
    Bike(String),
}

impl GroupKey {
    pub fn for_trip(dimension: Dimension, trip: &Trip) -> Self {
        match dimension {
            Dimension::StartStation => GroupKey::Station(trip.start_station_id().to_string()),
            Dimension::EndStation => GroupKey::Station(trip.end_station_id().to_string()),
            Dimension::Route => GroupKey::Route {
                start: trip.start_station_id().to_string(),
                end: trip.end_station_id().to_string(),
            },
            Dimension::Hour => GroupKey::Hour(trip.hour()),
            Dimension::Weekday => GroupKey::Weekday(trip.weekday().num_days_from_monday()),
            Dimension::Month => GroupKey::Month(trip.month()),
            Dimension::UserType => GroupKey::UserType(trip.user_type()),
            Dimension::BikeType => GroupKey::BikeType(trip.bike_type()),
            Dimension::Bike => GroupKey::Bike(trip.bike_id().to_string()),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Station(id) | GroupKey::Bike(id) | GroupKey::Month(id) => f.write_str(id),
            GroupKey::Route { start, end } => write!(f, "{start} -> {end}"),
            GroupKey::Hour(h) => write!(f, "{h:02}:00"),
            GroupKey::Weekday(d) => {
                f.write_str(WEEKDAY_NAMES.get(*d as usize).copied().unwrap_or("?"))
            }
            GroupKey::UserType(t) => write!(f, "{t}"),
            GroupKey::BikeType(t) => write!(f, "{t}"),
        }
    }
}

/// Summary of one group. `members` holds indices into the trip slice the
/// group was built from, for stages that need per-trip access.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStat {
    pub key: GroupKey,
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub members: Vec<usize>,
}

/// Groups every trip in `trips` by `dimension`, summing `measure`.
pub fn group_by(trips: &[Trip], dimension: Dimension, measure: Measure) -> Vec<GroupStat> {
    group_indices(trips, 0..trips.len(), dimension, measure)
}

/// Groups the trips at `indices` only. Member indices refer to `trips`.
pub fn group_indices<I>(
    trips: &[Trip],
    indices: I,
    dimension: Dimension,
    measure: Measure,
) -> Vec<GroupStat>
where
    I: IntoIterator<Item = usize>,
{
    let mut position: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<GroupStat> = Vec::new();

    for index in indices {
        let trip = &trips[index];
        let key = GroupKey::for_trip(dimension, trip);

        let slot = match position.get(&key) {
            Some(&slot) => slot,
            None => {
                position.insert(key.clone(), groups.len());
                groups.push(GroupStat {
                    key,
                    count: 0,
                    sum: 0.0,
                    mean: 0.0,
                    members: Vec::new(),
                });
                groups.len() - 1
            }
        };

        let group = &mut groups[slot];
        group.count += 1;
        group.sum += measure.of(trip);
        group.members.push(index);
    }

    for group in &mut groups {
        group.mean = group.sum / group.count as f64;
    }

    groups
}
