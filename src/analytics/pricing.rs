//! Fares, revenue and maintenance accrual.
//!
//! Fare: `(base_fee + per_minute * duration + per_km * distance)`, multiplied
//! by the peak surcharge when the trip starts in a configured peak hour.
//! Maintenance per bike: `per_trip * trips + per_km * distance` from usage,
//! plus the cost of any logged maintenance records for that bike.

use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::algorithms::{binary_search_by, linear_search_by};
use crate::analytics::aggregate::{Dimension, GroupKey, Measure, group_by};
use crate::analytics::utility::ratio;
use crate::config::{AnalyticsConfig, MaintenanceRule, PeakSurcharge, PricingRule};
use crate::error::{AnalyticsError, Result};
use crate::model::{BikeType, Dataset, Trip, UserType};

/// Looks up the pricing rule for `user_type`. A missing rule is fatal.
pub fn pricing_rule(config: &AnalyticsConfig, user_type: UserType) -> Result<&PricingRule> {
    linear_search_by(&config.pricing, |r| r.user_type == user_type)
        .map(|i| &config.pricing[i])
        .ok_or_else(|| {
            let reason = format!("no pricing rule for user type '{user_type}'");
            AnalyticsError::configuration(reason)
        })
}

/// Looks up the maintenance rule for `bike_type`. A missing rule is fatal.
pub fn maintenance_rule(
    config: &AnalyticsConfig,
    bike_type: BikeType,
) -> Result<&MaintenanceRule> {
    linear_search_by(&config.maintenance, |r| r.bike_type == bike_type)
        .map(|i| &config.maintenance[i])
        .ok_or_else(|| {
            let reason = format!("no maintenance rule for bike type '{bike_type}'");
            AnalyticsError::configuration(reason)
        })
}

pub fn fare(rule: &PricingRule, peak: Option<&PeakSurcharge>, trip: &Trip) -> f64 {
    let base = rule.base_fee
        + rule.per_minute * trip.duration_min()
        + rule.per_km * trip.distance_km();
    match peak {
        Some(p) if p.hours.contains(&trip.hour()) => base * p.multiplier,
        _ => base,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTypeRevenue {
    pub user_type: UserType,
    pub trips: usize,
    pub revenue: f64,
    pub avg_distance_km: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevenueSummary {
    /// Fare per trip, in trip order.
    pub fares: Vec<f64>,
    pub total_revenue: f64,
    pub distinct_users: usize,
    /// `None` when no user took a trip.
    pub arpu: Option<f64>,
    /// In first-seen order of user type.
    pub by_user_type: Vec<UserTypeRevenue>,
}

/// Prices every trip. Fails before computing any fare if a user type present
/// in `trips` has no pricing rule.
pub fn compute_revenue(trips: &[Trip], config: &AnalyticsConfig) -> Result<RevenueSummary> {
    let groups = group_by(trips, Dimension::UserType, Measure::Distance);

    let mut rules = Vec::with_capacity(groups.len());
    for group in &groups {
        if let GroupKey::UserType(user_type) = group.key {
            rules.push(pricing_rule(config, user_type)?);
        }
    }

    let peak = config.peak_surcharge.as_ref();
    let mut fares = vec![0.0; trips.len()];
    let mut by_user_type = Vec::with_capacity(groups.len());

    for (group, rule) in groups.iter().zip(&rules) {
        let mut revenue = 0.0;
        for &index in &group.members {
            let amount = fare(rule, peak, &trips[index]);
            fares[index] = amount;
            revenue += amount;
        }
        by_user_type.push(UserTypeRevenue {
            user_type: rule.user_type,
            trips: group.count,
            revenue,
            avg_distance_km: group.mean,
        });
    }

    let total_revenue: f64 = fares.iter().sum();
    let distinct_users = trips.iter().map(|t| t.user_id()).collect::<HashSet<_>>().len();
    let arpu = ratio(total_revenue, distinct_users);

    debug!(
        trips = trips.len(),
        total_revenue,
        distinct_users,
        "Revenue computed"
    );

    Ok(RevenueSummary {
        fares,
        total_revenue,
        distinct_users,
        arpu,
        by_user_type,
    })
}

/// Accumulated maintenance for one bike.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BikeMaintenance {
    pub bike_id: String,
    pub bike_type: BikeType,
    pub trips: usize,
    pub distance_km: f64,
    pub usage_cost: f64,
    pub recorded_cost: f64,
}

impl BikeMaintenance {
    pub fn total_cost(&self) -> f64 {
        self.usage_cost + self.recorded_cost
    }
}

/// Per-bike maintenance totals for one run, sorted by bike id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaintenanceLedger {
    bikes: Vec<BikeMaintenance>,
}

impl MaintenanceLedger {
    pub fn bikes(&self) -> &[BikeMaintenance] {
        &self.bikes
    }

    pub fn get(&self, bike_id: &str) -> Option<&BikeMaintenance> {
        binary_search_by(&self.bikes, |b| b.bike_id.as_str().cmp(bike_id)).map(|i| &self.bikes[i])
    }

    fn get_mut(&mut self, bike_id: &str) -> Option<&mut BikeMaintenance> {
        let index = binary_search_by(&self.bikes, |b| b.bike_id.as_str().cmp(bike_id))?;
        Some(&mut self.bikes[index])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BikeTypeMaintenance {
    pub bike_type: BikeType,
    pub bikes: usize,
    pub usage_cost: f64,
    pub recorded_cost: f64,
    pub total_cost: f64,
}

/// Folds every trip and maintenance record into a fresh ledger, one pass each.
pub fn accrue_maintenance(
    dataset: &Dataset,
    config: &AnalyticsConfig,
) -> Result<MaintenanceLedger> {
    let mut ledger = MaintenanceLedger {
        bikes: dataset
            .bikes()
            .iter()
            .map(|b| BikeMaintenance {
                bike_id: b.id.clone(),
                bike_type: b.bike_type,
                trips: 0,
                distance_km: 0.0,
                usage_cost: 0.0,
                recorded_cost: 0.0,
            })
            .collect(),
    };

    for trip in dataset.trips() {
        let rule = maintenance_rule(config, trip.bike_type())?;
        let entry = ledger.get_mut(trip.bike_id()).ok_or_else(|| {
            let reason = format!("unknown bike '{}'", trip.bike_id());
            AnalyticsError::malformed("trip", trip.id(), reason)
        })?;
        entry.trips += 1;
        entry.distance_km += trip.distance_km();
        entry.usage_cost += rule.per_trip + rule.per_km * trip.distance_km();
    }

    for record in dataset.maintenance() {
        let entry = ledger.get_mut(&record.bike_id).ok_or_else(|| {
            AnalyticsError::malformed(
                "maintenance record",
                record.id.as_str(),
                format!("unknown bike '{}'", record.bike_id),
            )
        })?;
        entry.recorded_cost += record.cost;
    }

    Ok(ledger)
}

/// Sums the ledger per bike type, in bike type order, skipping types with no bikes.
pub fn maintenance_by_bike_type(ledger: &MaintenanceLedger) -> Vec<BikeTypeMaintenance> {
    [BikeType::Classic, BikeType::Electric]
        .into_iter()
        .filter_map(|bike_type| {
            let bikes: Vec<&BikeMaintenance> =
                ledger.bikes().iter().filter(|b| b.bike_type == bike_type).collect();
            if bikes.is_empty() {
                return None;
            }
            let usage_cost: f64 = bikes.iter().map(|b| b.usage_cost).sum();
            let recorded_cost: f64 = bikes.iter().map(|b| b.recorded_cost).sum();
            Some(BikeTypeMaintenance {
                bike_type,
                bikes: bikes.len(),
                usage_cost,
                recorded_cost,
                total_cost: usage_cost + recorded_cost,
            })
        })
        .collect()
}
