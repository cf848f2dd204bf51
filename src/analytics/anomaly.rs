//! Outlier detection over trip duration and distance.
//!
//! Each trip is scored per measure as `|value - mean| / stddev`, using the
//! population standard deviation over all trips. A trip is flagged when any
//! enabled measure's score exceeds the threshold. A measure whose values are
//! all equal has zero deviation, scores every trip 0 and flags nothing.

use serde::Serialize;
use tracing::debug;

use crate::analytics::aggregate::{Dimension, Measure, group_indices};
use crate::analytics::rank::{OrderBy, RankedList, rank};
use crate::analytics::utility::{mean, stddev};
use crate::model::Trip;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasureStats {
    pub mean: f64,
    pub stddev: f64,
}

impl MeasureStats {
    /// `None` for an empty trip set, where the statistics are undefined.
    pub fn of(trips: &[Trip], measure: Measure) -> Option<Self> {
        let values: Vec<f64> = trips.iter().map(|t| measure.of(t)).collect();
        let mean = mean(&values)?;
        // Identical values that are not exact in binary (0.1, 2.1) leave a
        // rounding residue in the mean, so the spread is pinned to zero here.
        let stddev = if values.iter().all(|v| *v == values[0]) {
            0.0
        } else {
            stddev(&values, mean)?
        };
        debug!(measure = measure.name(), mean, stddev, "Measure statistics");
        Some(MeasureStats { mean, stddev })
    }

    /// Spread at or below this is treated as no spread at all.
    fn spread_floor(&self) -> f64 {
        f64::EPSILON * self.mean.abs().max(1.0)
    }

    pub fn score(&self, value: f64) -> f64 {
        if self.stddev <= self.spread_floor() {
            0.0
        } else {
            (value - self.mean).abs() / self.stddev
        }
    }
}

/// Outcome for one trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyFlag {
    #[serde(skip)]
    pub trip_index: usize,
    pub trip_id: String,
    pub bike_id: String,
    pub duration_score: Option<f64>,
    pub distance_score: Option<f64>,
    /// Highest score across the enabled measures.
    pub score: f64,
    pub exceeded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyOutcome {
    pub threshold: f64,
    pub duration: Option<MeasureStats>,
    pub distance: Option<MeasureStats>,
    /// One entry per trip, in trip order.
    pub flags: Vec<AnomalyFlag>,
    /// Bikes with at least one flagged trip, most flagged first.
    pub flagged_bikes: RankedList,
}

impl AnomalyOutcome {
    pub fn flagged(&self) -> impl Iterator<Item = &AnomalyFlag> {
        self.flags.iter().filter(|f| f.exceeded)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyDetector {
    threshold: f64,
    measures: Vec<Measure>,
}

impl AnomalyDetector {
    /// Detector scoring both duration and distance.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            measures: vec![Measure::Duration, Measure::Distance],
        }
    }

    /// Restricts scoring to `measures`.
    pub fn with_measures(mut self, measures: &[Measure]) -> Self {
        self.measures = measures.to_vec();
        self
    }

    pub fn detect(&self, trips: &[Trip]) -> AnomalyOutcome {
        let duration = self.stats_for(trips, Measure::Duration);
        let distance = self.stats_for(trips, Measure::Distance);

        let flags: Vec<AnomalyFlag> = trips
            .iter()
            .enumerate()
            .map(|(index, trip)| {
                let duration_score = duration.map(|s| s.score(trip.duration_min()));
                let distance_score = distance.map(|s| s.score(trip.distance_km()));
                let score = duration_score
                    .into_iter()
                    .chain(distance_score)
                    .fold(0.0, f64::max);

                AnomalyFlag {
                    trip_index: index,
                    trip_id: trip.id().to_string(),
                    bike_id: trip.bike_id().to_string(),
                    duration_score,
                    distance_score,
                    score,
                    exceeded: score > self.threshold,
                }
            })
            .collect();

        let flagged_indices = flags.iter().filter(|f| f.exceeded).map(|f| f.trip_index);
        let bikes = group_indices(trips, flagged_indices, Dimension::Bike, Measure::Duration);
        let flagged_bikes = rank(&bikes, OrderBy::CountDesc);

        debug!(
            trips = trips.len(),
            flagged = flagged_bikes.iter().map(|b| b.count).sum::<usize>(),
            bikes = flagged_bikes.len(),
            threshold = self.threshold,
            "Anomaly detection complete"
        );

        AnomalyOutcome {
            threshold: self.threshold,
            duration,
            distance,
            flags,
            flagged_bikes,
        }
    }

    fn stats_for(&self, trips: &[Trip], measure: Measure) -> Option<MeasureStats> {
        if self.measures.contains(&measure) {
            MeasureStats::of(trips, measure)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{dataset, scenario, trip};

    fn flagged_ids(outcome: &AnomalyOutcome) -> Vec<&str> {
        outcome.flagged().map(|f| f.trip_id.as_str()).collect()
    }

    #[test]
    fn test_scenario_flags_only_long_trip() {
        let ds = scenario();
        let outcome = AnomalyDetector::new(1.4)
            .with_measures(&[Measure::Duration])
            .detect(ds.trips());

        assert_eq!(flagged_ids(&outcome), vec!["t3"]);
        assert_eq!(outcome.flagged_bikes.len(), 1);
        assert_eq!(outcome.flagged_bikes[0].key.to_string(), "b3");
        assert!(outcome.flags[2].distance_score.is_none());
    }

    #[test]
    fn test_three_trip_scores_are_bounded() {
        // With n = 3 no population z-score can exceed sqrt(2).
        let ds = scenario();
        let outcome = AnomalyDetector::new(1.5).detect(ds.trips());

        assert!(flagged_ids(&outcome).is_empty());
        assert!(outcome.flags.iter().all(|f| f.score <= 2f64.sqrt() + 1e-12));
        assert!(outcome.flags[2].score > 1.41);
    }

    #[test]
    fn test_larger_baseline_flags_outlier_at_one_and_a_half_sigma() {
        let ds = dataset(vec![
            trip(
                "t1",
                ("A", "B"),
                "u1",
                "b1",
                "2024-03-04 08:15:00",
                10.0,
                2.0,
            ),
            trip(
                "t2",
                ("A", "B"),
                "u1",
                "b1",
                "2024-03-04 08:45:00",
                12.0,
                2.1,
            ),
            trip(
                "t3",
                ("A", "B"),
                "u3",
                "b2",
                "2024-03-04 09:10:00",
                11.0,
                2.0,
            ),
            trip(
                "t4",
                ("B", "A"),
                "u3",
                "b2",
                "2024-03-04 09:40:00",
                10.0,
                1.9,
            ),
            trip(
                "t5",
                ("B", "A"),
                "u1",
                "b1",
                "2024-03-04 10:05:00",
                12.0,
                2.2,
            ),
            trip(
                "t6",
                ("C", "D"),
                "u2",
                "b3",
                "2024-03-05 17:30:00",
                400.0,
                50.0,
            ),
        ]);
        let outcome = AnomalyDetector::new(1.5).detect(ds.trips());

        assert_eq!(flagged_ids(&outcome), vec!["t6"]);
    }

    #[test]
    fn test_zero_variance_flags_nothing() {
        let ds = dataset(vec![
            trip(
                "t1",
                ("A", "B"),
                "u1",
                "b1",
                "2024-03-04 08:00:00",
                15.0,
                3.0,
            ),
            trip(
                "t2",
                ("B", "C"),
                "u2",
                "b2",
                "2024-03-04 09:00:00",
                15.0,
                3.0,
            ),
            trip(
                "t3",
                ("C", "D"),
                "u3",
                "b3",
                "2024-03-04 10:00:00",
                15.0,
                3.0,
            ),
        ]);

        for threshold in [0.0001, 1.0, 3.0] {
            let outcome = AnomalyDetector::new(threshold).detect(ds.trips());
            assert!(flagged_ids(&outcome).is_empty());
            assert_eq!(outcome.duration.map(|s| s.stddev), Some(0.0));
            assert!(outcome.flagged_bikes.is_empty());
        }
    }

    #[test]
    fn test_identical_inexact_values_flag_nothing() {
        let rows = (0..10)
            .map(|i| {
                let id = format!("t{i}");
                trip(
                    &id,
                    ("A", "B"),
                    "u1",
                    "b1",
                    "2024-03-04 08:00:00",
                    0.1,
                    0.1,
                )
            })
            .collect();
        let ds = dataset(rows);

        for threshold in [0.0001, 0.5, 0.99] {
            let outcome = AnomalyDetector::new(threshold).detect(ds.trips());
            assert!(flagged_ids(&outcome).is_empty());
            assert_eq!(outcome.duration.map(|s| s.stddev), Some(0.0));
            assert_eq!(outcome.distance.map(|s| s.stddev), Some(0.0));
            assert!(outcome.flags.iter().all(|f| f.score == 0.0));
        }
    }

    #[test]
    fn test_rounding_residue_spread_scores_zero() {
        let stats = MeasureStats {
            mean: 2.1,
            stddev: 1e-17,
        };
        assert_eq!(stats.score(2.1), 0.0);
        assert_eq!(stats.score(2.1000000000000005), 0.0);
    }

    #[test]
    fn test_empty_trips_have_no_statistics() {
        let ds = dataset(vec![]);
        let outcome = AnomalyDetector::new(3.0).detect(ds.trips());

        assert!(outcome.duration.is_none());
        assert!(outcome.distance.is_none());
        assert!(outcome.flags.is_empty());
    }

    #[test]
    fn test_bikes_ranked_by_flag_count() {
        let mut rows = Vec::new();
        for i in 0..20 {
            let id = format!("n{i}");
            rows.push(trip(
                &id,
                ("A", "B"),
                "u1",
                "b1",
                "2024-03-04 08:00:00",
                10.0,
                2.0,
            ));
        }
        rows.push(trip(
            "x1",
            ("A", "B"),
            "u2",
            "b2",
            "2024-03-04 08:00:00",
            300.0,
            2.0,
        ));
        rows.push(trip(
            "x2",
            ("A", "B"),
            "u2",
            "b3",
            "2024-03-04 08:00:00",
            320.0,
            2.0,
        ));
        rows.push(trip(
            "x3",
            ("A", "B"),
            "u2",
            "b3",
            "2024-03-04 08:00:00",
            2.0,
            90.0,
        ));
        let ds = dataset(rows);

        let outcome = AnomalyDetector::new(2.0).detect(ds.trips());
        let bikes: Vec<_> = outcome
            .flagged_bikes
            .iter()
            .map(|g| (g.key.to_string(), g.count))
            .collect();

        assert_eq!(bikes, vec![("b3".to_string(), 2), ("b2".to_string(), 1)]);
    }
}
