use crate::core::speckle_filter::filtered_band_name;
use crate::types::{FloodError, FloodResult, MaskedBand, Polarization, RasterImage};
use ndarray::Array2;

/// Classification band name
pub const WATER_BAND: &str = "water";

/// Water classification parameters
#[derive(Debug, Clone, Copy)]
pub struct WaterClassifierParams {
    /// Backscatter threshold in dB; pixels below it are water. The
    /// default is an approximation and will misclassify some pixels
    /// near the boundary.
    pub threshold_db: f32,
}

impl Default for WaterClassifierParams {
    fn default() -> Self {
        Self { threshold_db: -16.0 }
    }
}

/// Fixed-threshold water classifier.
///
/// Calm water reflects the radar pulse away from the sensor, so water
/// pixels sit well below land backscatter in the denoised band. The
/// output mask marks water pixels with value 1 and leaves every other
/// pixel absent, so a sum over the mask counts water pixels directly.
pub struct WaterClassifier {
    params: WaterClassifierParams,
}

impl WaterClassifier {
    pub fn new() -> Self {
        Self {
            params: WaterClassifierParams::default(),
        }
    }

    pub fn with_params(params: WaterClassifierParams) -> Self {
        Self { params }
    }

    /// Threshold the scene's denoised band and append the result as the
    /// `"water"` mask band. Raw and denoised bands are left untouched.
    /// Non-finite denoised pixels are absent from the mask.
    pub fn classify_scene(
        &self,
        image: &mut RasterImage,
        polarization: Polarization,
    ) -> FloodResult<()> {
        let threshold = self.params.threshold_db;
        if !threshold.is_finite() {
            return Err(FloodError::InvalidConfig(format!(
                "classification threshold must be finite, got {}",
                threshold
            )));
        }

        let denoised = image.band(&filtered_band_name(polarization))?;
        let (height, width) = denoised.dim();

        let mut values = Array2::zeros((height, width));
        let mut valid = Array2::from_elem((height, width), false);
        let mut water_pixels = 0usize;

        for i in 0..height {
            for j in 0..width {
                let v = denoised[[i, j]];
                if v.is_finite() && v < threshold {
                    values[[i, j]] = 1.0;
                    valid[[i, j]] = true;
                    water_pixels += 1;
                }
            }
        }

        log::debug!(
            "scene {}: {} of {} pixels below {} dB",
            image.metadata.scene_id,
            water_pixels,
            height * width,
            threshold
        );

        let mask = MaskedBand::new(values, valid)?;
        image.add_mask_band(WATER_BAND, mask)
    }
}

impl Default for WaterClassifier {
    fn default() -> Self {
        Self::new()
    }
}
