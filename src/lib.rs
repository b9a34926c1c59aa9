//! floodline: a Sentinel-1 SAR water-extent time series processor
//!
//! Turns a chronologically ordered stack of backscatter scenes over a
//! fixed region into an interactive inundated-pixel time series:
//! speckle filtering, fixed-threshold water classification, per-date
//! regional aggregation, and chart-click resolution back to the source
//! scene and its classification mask.

pub mod chart;
pub mod core;
pub mod io;
pub mod region;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    AcquisitionMetadata, AcquisitionMode, BackscatterBand, BoundingBox, FloodError, FloodResult,
    GeoTransform, MaskedBand, Polarization, RasterImage, SelectionEvent, SeriesPoint,
};

pub use region::Region;

pub use io::{ImageSource, MemoryCatalog, SceneQuery};

pub use core::{
    AggregationParams, FloodAnalysis, Pipeline, PipelineConfig, SpeckleFilter, SpeckleFilterParams,
    TemporalAggregator, WaterClassifier, WaterClassifierParams, WATER_BAND,
};

pub use chart::{
    ChartConfig, ChartSpec, LayerData, LayerStyle, MapLayer, SelectionState, SeriesController,
};
