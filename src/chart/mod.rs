//! Chart-facing surface: the aggregated series payload for the external
//! chart widget and the controller that resolves chart clicks back to
//! scenes.

pub mod controller;
pub mod series;

pub use controller::{LayerData, LayerStyle, MapLayer, SelectionState, SeriesController};
pub use series::{ChartConfig, ChartSpec};
