//! Core water-extent processing modules

pub mod aggregate;
pub mod classify;
pub mod pipeline;
pub mod speckle_filter;

// Re-export main types
pub use aggregate::{AggregationParams, TemporalAggregator};
pub use classify::{WaterClassifier, WaterClassifierParams, WATER_BAND};
pub use pipeline::{FloodAnalysis, Pipeline, PipelineConfig};
pub use speckle_filter::{filtered_band_name, SpeckleFilter, SpeckleFilterParams};
