use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Real-valued backscatter data (decibels)
pub type BackscatterBand = Array2<f32>;

/// Polarization modes for Sentinel-1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    VV,
    VH,
    HV,
    HH,
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::VV => write!(f, "VV"),
            Polarization::VH => write!(f, "VH"),
            Polarization::HV => write!(f, "HV"),
            Polarization::HH => write!(f, "HH"),
        }
    }
}

impl FromStr for Polarization {
    type Err = FloodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "VV" => Ok(Polarization::VV),
            "VH" => Ok(Polarization::VH),
            "HV" => Ok(Polarization::HV),
            "HH" => Ok(Polarization::HH),
            _ => Err(FloodError::InvalidConfig(format!(
                "unrecognized polarization tag: {}",
                s
            ))),
        }
    }
}

/// Sentinel-1 acquisition mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionMode {
    IW, // Interferometric Wide swath
    EW, // Extra Wide swath
    SM, // StripMap
    WV, // Wave
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
            && self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
    }
}

/// Geospatial transformation parameters (pixel <-> geographic)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform without rotation terms. `pixel_height` is
    /// negative for the usual top-left origin.
    pub fn north_up(top_left_x: f64, top_left_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            top_left_x,
            pixel_width,
            rotation_x: 0.0,
            top_left_y,
            rotation_y: 0.0,
            pixel_height,
        }
    }

    /// Map a (row, col) pixel position to geographic (lon, lat).
    pub fn pixel_to_geo(&self, row: f64, col: f64) -> (f64, f64) {
        let lon = self.top_left_x + col * self.pixel_width + row * self.rotation_x;
        let lat = self.top_left_y + col * self.rotation_y + row * self.pixel_height;
        (lon, lat)
    }

    /// Map geographic (lon, lat) to a fractional (row, col) pixel
    /// position. Returns `None` for a degenerate transform.
    pub fn geo_to_pixel(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.rotation_x * self.rotation_y;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let dx = lon - self.top_left_x;
        let dy = lat - self.top_left_y;
        let col = (dx * self.pixel_height - self.rotation_x * dy) / det;
        let row = (self.pixel_width * dy - self.rotation_y * dx) / det;
        Some((row, col))
    }
}

/// Per-scene acquisition metadata. `start_time` is the unique time key
/// within a filtered series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionMetadata {
    pub scene_id: String,
    pub start_time: DateTime<Utc>,
    pub acquisition_mode: AcquisitionMode,
    pub polarizations: Vec<Polarization>,
}

/// A band with a parallel validity mask. Invalid pixels are absent from
/// every reduction, which is distinct from carrying a zero.
#[derive(Debug, Clone)]
pub struct MaskedBand {
    values: Array2<f32>,
    valid: Array2<bool>,
}

impl MaskedBand {
    pub fn new(values: Array2<f32>, valid: Array2<bool>) -> FloodResult<Self> {
        if values.dim() != valid.dim() {
            return Err(FloodError::Processing(format!(
                "mask dimensions {:?} do not match value dimensions {:?}",
                valid.dim(),
                values.dim()
            )));
        }
        Ok(Self { values, valid })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Value at (row, col), or `None` if absent or out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        match self.valid.get((row, col)) {
            Some(true) => self.values.get((row, col)).copied(),
            _ => None,
        }
    }

    pub fn count_present(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }

    pub fn sum_present(&self) -> f64 {
        self.values
            .iter()
            .zip(self.valid.iter())
            .filter(|(_, valid)| **valid)
            .map(|(v, _)| *v as f64)
            .sum()
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    pub fn validity(&self) -> &Array2<bool> {
        &self.valid
    }

    /// Intersect the validity mask with `keep`, leaving values untouched.
    pub fn restrict(&self, keep: &Array2<bool>) -> FloodResult<Self> {
        if keep.dim() != self.valid.dim() {
            return Err(FloodError::Processing(format!(
                "clip mask dimensions {:?} do not match band dimensions {:?}",
                keep.dim(),
                self.valid.dim()
            )));
        }
        let mut valid = self.valid.clone();
        valid.zip_mut_with(keep, |v, k| *v = *v && *k);
        Ok(Self {
            values: self.values.clone(),
            valid,
        })
    }
}

/// A georeferenced scene: acquisition metadata plus named raster bands.
/// Derived bands are appended non-destructively; all bands of one scene
/// share dimensions.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub metadata: AcquisitionMetadata,
    pub geo_transform: GeoTransform,
    /// Ground sample distance in meters (x, y)
    pub pixel_spacing: (f64, f64),
    dims: (usize, usize),
    bands: HashMap<String, BackscatterBand>,
    masks: HashMap<String, MaskedBand>,
}

impl RasterImage {
    /// Create a scene from its raw polarization band.
    pub fn new(
        metadata: AcquisitionMetadata,
        geo_transform: GeoTransform,
        pixel_spacing: (f64, f64),
        polarization: Polarization,
        band: BackscatterBand,
    ) -> FloodResult<Self> {
        let dims = band.dim();
        if dims.0 == 0 || dims.1 == 0 {
            return Err(FloodError::Processing(format!(
                "scene {} has an empty raster",
                metadata.scene_id
            )));
        }
        if !(pixel_spacing.0 > 0.0 && pixel_spacing.1 > 0.0)
            || !pixel_spacing.0.is_finite()
            || !pixel_spacing.1.is_finite()
        {
            return Err(FloodError::Processing(format!(
                "scene {} has invalid pixel spacing {:?}",
                metadata.scene_id, pixel_spacing
            )));
        }
        let mut bands = HashMap::new();
        bands.insert(polarization.to_string(), band);
        Ok(Self {
            metadata,
            geo_transform,
            pixel_spacing,
            dims,
            bands,
            masks: HashMap::new(),
        })
    }

    /// (rows, cols) shared by every band of this scene
    pub fn dims(&self) -> (usize, usize) {
        self.dims
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.contains_key(name)
    }

    pub fn band(&self, name: &str) -> FloodResult<&BackscatterBand> {
        self.bands.get(name).ok_or_else(|| {
            FloodError::MissingBand(format!(
                "scene {} has no band '{}'",
                self.metadata.scene_id, name
            ))
        })
    }

    pub fn add_band(&mut self, name: &str, band: BackscatterBand) -> FloodResult<()> {
        if self.bands.contains_key(name) || self.masks.contains_key(name) {
            return Err(FloodError::Processing(format!(
                "scene {} already has a band '{}'",
                self.metadata.scene_id, name
            )));
        }
        if band.dim() != self.dims {
            return Err(FloodError::Processing(format!(
                "band '{}' dimensions {:?} do not match scene dimensions {:?}",
                name,
                band.dim(),
                self.dims
            )));
        }
        self.bands.insert(name.to_string(), band);
        Ok(())
    }

    pub fn has_mask_band(&self, name: &str) -> bool {
        self.masks.contains_key(name)
    }

    pub fn mask_band(&self, name: &str) -> FloodResult<&MaskedBand> {
        self.masks.get(name).ok_or_else(|| {
            FloodError::MissingBand(format!(
                "scene {} has no mask band '{}'",
                self.metadata.scene_id, name
            ))
        })
    }

    pub fn add_mask_band(&mut self, name: &str, band: MaskedBand) -> FloodResult<()> {
        if self.bands.contains_key(name) || self.masks.contains_key(name) {
            return Err(FloodError::Processing(format!(
                "scene {} already has a band '{}'",
                self.metadata.scene_id, name
            )));
        }
        if band.dim() != self.dims {
            return Err(FloodError::Processing(format!(
                "mask band '{}' dimensions {:?} do not match scene dimensions {:?}",
                name,
                band.dim(),
                self.dims
            )));
        }
        self.masks.insert(name.to_string(), band);
        Ok(())
    }

    /// Geographic extent of the raster grid
    pub fn footprint(&self) -> BoundingBox {
        let (rows, cols) = self.dims;
        let corners = [
            self.geo_transform.pixel_to_geo(0.0, 0.0),
            self.geo_transform.pixel_to_geo(0.0, cols as f64),
            self.geo_transform.pixel_to_geo(rows as f64, 0.0),
            self.geo_transform.pixel_to_geo(rows as f64, cols as f64),
        ];
        let mut bbox = BoundingBox {
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
        };
        for (lon, lat) in corners {
            bbox.min_lon = bbox.min_lon.min(lon);
            bbox.max_lon = bbox.max_lon.max(lon);
            bbox.min_lat = bbox.min_lat.min(lat);
            bbox.max_lat = bbox.max_lat.max(lat);
        }
        bbox
    }

    /// Pixel index containing a geographic point, or `None` when the
    /// point falls outside the raster.
    pub fn geo_to_index(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        let (row, col) = self.geo_transform.geo_to_pixel(lon, lat)?;
        let (rows, cols) = self.dims;
        if row < 0.0 || col < 0.0 {
            return None;
        }
        let (row, col) = (row.floor() as usize, col.floor() as usize);
        if row >= rows || col >= cols {
            return None;
        }
        Some((row, col))
    }

    /// Geographic coordinates of a pixel's center
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.geo_transform
            .pixel_to_geo(row as f64 + 0.5, col as f64 + 0.5)
    }
}

/// One aggregated chart sample: acquisition time and the number of
/// water-classified pixels within the region at the processing scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub water_pixels: f64,
}

/// Chart interaction event. `timestamp` is `None` when the selection
/// was cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionEvent {
    pub timestamp: Option<DateTime<Utc>>,
    pub value: Option<f64>,
    pub series: Option<String>,
}

impl SelectionEvent {
    pub fn cleared() -> Self {
        Self {
            timestamp: None,
            value: None,
            series: None,
        }
    }

    pub fn point(timestamp: DateTime<Utc>, value: f64, series: impl Into<String>) -> Self {
        Self {
            timestamp: Some(timestamp),
            value: Some(value),
            series: Some(series.into()),
        }
    }
}

/// Error types for water-extent processing
#[derive(Debug, thiserror::Error)]
pub enum FloodError {
    #[error("malformed region: {0}")]
    MalformedRegion(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("missing band: {0}")]
    MissingBand(String),

    #[error("processing error: {0}")]
    Processing(String),
}

/// Result type for water-extent processing
pub type FloodResult<T> = Result<T, FloodError>;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use ndarray::Array2;

    fn test_metadata() -> AcquisitionMetadata {
        AcquisitionMetadata {
            scene_id: "S1A_TEST".to_string(),
            start_time: Utc.with_ymd_and_hms(2021, 6, 1, 5, 30, 0).unwrap(),
            acquisition_mode: AcquisitionMode::IW,
            polarizations: vec![Polarization::VV],
        }
    }

    #[test]
    fn test_geo_transform_roundtrip() {
        let gt = GeoTransform::north_up(126.77, 38.42, 0.001, -0.001);
        let (lon, lat) = gt.pixel_to_geo(3.5, 7.5);
        let (row, col) = gt.geo_to_pixel(lon, lat).unwrap();
        assert_relative_eq!(row, 3.5, epsilon = 1e-9);
        assert_relative_eq!(col, 7.5, epsilon = 1e-9);
    }

    #[test]
    fn test_polarization_tag_parsing() {
        assert_eq!("vv".parse::<Polarization>().unwrap(), Polarization::VV);
        assert!("XX".parse::<Polarization>().is_err());
    }

    #[test]
    fn test_masked_band_reductions_skip_absent_pixels() {
        let values = Array2::from_elem((2, 2), 1.0f32);
        let mut valid = Array2::from_elem((2, 2), true);
        valid[[0, 1]] = false;
        let mask = MaskedBand::new(values, valid).unwrap();

        assert_eq!(mask.count_present(), 3);
        assert_eq!(mask.sum_present(), 3.0);
        assert_eq!(mask.get(0, 1), None);
        assert_eq!(mask.get(0, 0), Some(1.0));
    }

    #[test]
    fn test_duplicate_band_rejected() {
        let band = Array2::from_elem((4, 4), -10.0f32);
        let gt = GeoTransform::north_up(0.0, 0.004, 0.001, -0.001);
        let mut image =
            RasterImage::new(test_metadata(), gt, (100.0, 100.0), Polarization::VV, band).unwrap();

        let duplicate = Array2::from_elem((4, 4), -12.0f32);
        assert!(image.add_band("VV", duplicate).is_err());
        assert!(image.band("VH").is_err());
    }

    #[test]
    fn test_geo_to_index_outside_raster() {
        let band = Array2::from_elem((4, 4), -10.0f32);
        let gt = GeoTransform::north_up(0.0, 0.004, 0.001, -0.001);
        let image =
            RasterImage::new(test_metadata(), gt, (100.0, 100.0), Polarization::VV, band).unwrap();

        assert_eq!(image.geo_to_index(0.0005, 0.0035), Some((0, 0)));
        assert_eq!(image.geo_to_index(-0.5, 0.0035), None);
        assert_eq!(image.geo_to_index(0.0005, 0.5), None);
    }
}
