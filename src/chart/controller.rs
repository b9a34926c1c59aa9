use chrono::{DateTime, Utc};
use ndarray::Array2;

use crate::core::classify::WATER_BAND;
use crate::region::Region;
use crate::types::{
    BackscatterBand, FloodResult, MaskedBand, Polarization, RasterImage, SelectionEvent,
};

/// Prompt shown before the first selection
const INITIAL_LABEL: &str = "Click a point on the chart to show the image for that date.";

/// Rendering range and optional palette for one display layer
#[derive(Debug, Clone)]
pub struct LayerStyle {
    pub min: f32,
    pub max: f32,
    pub palette: Option<Vec<String>>,
}

impl LayerStyle {
    /// Grayscale stretch for raw backscatter display
    pub fn backscatter() -> Self {
        Self {
            min: -20.0,
            max: 0.0,
            palette: None,
        }
    }

    /// White-to-blue ramp for the water overlay
    pub fn water_overlay() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            palette: Some(vec!["#FFFFFF".to_string(), "#0000FF".to_string()]),
        }
    }
}

/// Pixel payload of a display layer
#[derive(Debug, Clone)]
pub enum LayerData {
    Backscatter(BackscatterBand),
    Mask(MaskedBand),
}

/// One entry of the display layer set
#[derive(Debug, Clone)]
pub struct MapLayer {
    pub name: String,
    pub data: LayerData,
    pub style: LayerStyle,
}

/// Controller selection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    Selected(DateTime<Utc>),
}

/// Bridges the aggregated series to the interactive display: resolves a
/// clicked timestamp back to its classified scene and swaps the
/// displayed layer set.
///
/// Single-threaded and synchronous; each event is fully handled before
/// the next is accepted. The layer set and label are exclusively owned
/// here and replaced wholesale on every valid selection.
pub struct SeriesController {
    scenes: Vec<RasterImage>,
    region: Region,
    polarization: Polarization,
    layers: Vec<MapLayer>,
    label: String,
    state: SelectionState,
}

impl SeriesController {
    /// Takes ownership of the classified scene collection, in the same
    /// order the pipeline produced it.
    pub fn new(scenes: Vec<RasterImage>, region: Region, polarization: Polarization) -> Self {
        Self {
            scenes,
            region,
            polarization,
            layers: Vec::new(),
            label: INITIAL_LABEL.to_string(),
            state: SelectionState::Idle,
        }
    }

    /// Currently displayed layer set
    pub fn layers(&self) -> &[MapLayer] {
        &self.layers
    }

    /// Human-readable date label for the current selection
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Handle a chart interaction.
    ///
    /// A cleared event (no timestamp) returns the controller to idle
    /// without touching the displayed layers or label. A timestamp that
    /// matches no scene is a logged no-op; the chart was built from this
    /// same series, but that provenance is not assumed here. Otherwise
    /// the layer set is replaced with exactly two layers: the raw
    /// polarization band and the region-clipped water overlay. Scenes
    /// sharing a timestamp resolve to the first in collection order.
    pub fn on_select(&mut self, event: &SelectionEvent) {
        let Some(timestamp) = event.timestamp else {
            self.state = SelectionState::Idle;
            return;
        };

        let Some(scene) = self
            .scenes
            .iter()
            .find(|s| s.metadata.start_time == timestamp)
        else {
            log::warn!("selection {} matches no classified scene", timestamp);
            return;
        };

        match Self::build_layers(scene, &self.region, self.polarization) {
            Ok(layers) => {
                self.layers = layers;
                self.label = timestamp.to_rfc2822();
                self.state = SelectionState::Selected(timestamp);
            }
            Err(e) => {
                log::warn!("selection {} could not be displayed: {}", timestamp, e);
            }
        }
    }

    fn build_layers(
        scene: &RasterImage,
        region: &Region,
        polarization: Polarization,
    ) -> FloodResult<Vec<MapLayer>> {
        let raw = scene.band(&polarization.to_string())?.clone();
        let mask = scene.mask_band(WATER_BAND)?;
        let clipped = mask.restrict(&region_mask(scene, region))?;

        Ok(vec![
            MapLayer {
                name: scene.metadata.scene_id.clone(),
                data: LayerData::Backscatter(raw),
                style: LayerStyle::backscatter(),
            },
            MapLayer {
                name: "Water".to_string(),
                data: LayerData::Mask(clipped),
                style: LayerStyle::water_overlay(),
            },
        ])
    }
}

/// Per-pixel region membership, tested at pixel centers
fn region_mask(scene: &RasterImage, region: &Region) -> Array2<bool> {
    let (height, width) = scene.dims();
    Array2::from_shape_fn((height, width), |(i, j)| {
        let (lon, lat) = scene.pixel_center(i, j);
        region.contains_lonlat(lon, lat)
    })
}
