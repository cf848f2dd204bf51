//! Trip analytics: grouping, ranking, outlier detection and pricing.
//!
//! Each stage is a pure function over the trips of a [`crate::model::Dataset`].
//! [`report::analyze`] runs them all and assembles an [`types::AnalyticsReport`].

pub mod aggregate;
pub mod anomaly;
pub mod pricing;
pub mod rank;
pub mod report;
pub mod types;
pub mod utility;
