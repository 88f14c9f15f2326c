//! Tour Processor Library
//!
//! A Rust library for turning the stage-by-stage classification data of a
//! stage race (general, sprint, mountain and youth classifications) into
//! per-rider time series aligned by stage.
//!
//! This library provides tools for:
//! - Parsing `H:MM:SS` durations and the API's comma-joined classification fields
//! - Cleaning raw rider records into structured, reproducible snapshots
//! - Folding ordered stage results into stage-aligned rider series
//! - Detecting rest days and stages that have not been run yet
//! - Exporting one CSV table per classification metric
//! - Writing canonical JSON snapshots with sorted keys

pub mod aggregator;
pub mod cleaner;
pub mod cli;
pub mod config;
pub mod constants;
pub mod duration;
pub mod error;
pub mod export;
pub mod models;
pub mod processor;

// Re-export commonly used types
pub use aggregator::{RiderAggregator, Roster, aggregate};
pub use config::RaceConfig;
pub use duration::parse_duration;
pub use error::{RaceError, Result};
pub use export::to_rows;
pub use models::{
    ClassificationBlock, ClassificationKind, Metric, ProcessingStats, Rider, RiderMap,
    RiderProfile, StageDescriptor, StageDetail, StageOutcome, Standing,
};
pub use processor::RaceProcessor;
pub use processor::client::{HttpRaceApi, RaceApi};
