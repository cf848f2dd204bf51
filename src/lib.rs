pub mod algorithms;
pub mod analytics;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod output;
