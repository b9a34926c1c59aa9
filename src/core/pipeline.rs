use crate::core::aggregate::{AggregationParams, TemporalAggregator};
use crate::core::classify::{WaterClassifier, WaterClassifierParams};
use crate::core::speckle_filter::{SpeckleFilter, SpeckleFilterParams};
use crate::io::{ImageSource, SceneQuery};
use crate::types::{FloodError, FloodResult, RasterImage, SeriesPoint};

/// Everything the operator tunes: the scene query plus the three stage
/// parameter sets.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub query: SceneQuery,
    pub filter: SpeckleFilterParams,
    pub classifier: WaterClassifierParams,
    pub aggregation: AggregationParams,
}

impl PipelineConfig {
    /// Default stage parameters around a validated query.
    pub fn with_query(query: SceneQuery) -> Self {
        Self {
            query,
            filter: SpeckleFilterParams::default(),
            classifier: WaterClassifierParams::default(),
            aggregation: AggregationParams::default(),
        }
    }
}

/// Result of one pipeline run: the classified scenes (raw, denoised and
/// water bands) and the aggregated series, both in acquisition order.
#[derive(Debug)]
pub struct FloodAnalysis {
    pub scenes: Vec<RasterImage>,
    pub series: Vec<SeriesPoint>,
}

impl FloodAnalysis {
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

/// The batch computation: query -> speckle filter -> classify ->
/// aggregate. Configuration errors abort construction; scene-local
/// failures only drop that scene.
pub struct Pipeline {
    config: PipelineConfig,
    filter: SpeckleFilter,
    classifier: WaterClassifier,
    aggregator: TemporalAggregator,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> FloodResult<Self> {
        let radius = config.filter.radius_meters;
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(FloodError::InvalidConfig(format!(
                "speckle filter radius must be positive, got {}",
                radius
            )));
        }
        if !config.classifier.threshold_db.is_finite() {
            return Err(FloodError::InvalidConfig(format!(
                "classification threshold must be finite, got {}",
                config.classifier.threshold_db
            )));
        }
        let scale = config.aggregation.scale_meters;
        if !(scale > 0.0) || !scale.is_finite() {
            return Err(FloodError::InvalidConfig(format!(
                "aggregation scale must be positive, got {}",
                scale
            )));
        }

        Ok(Self {
            filter: SpeckleFilter::with_params(config.filter),
            classifier: WaterClassifier::with_params(config.classifier),
            aggregator: TemporalAggregator::with_params(config.aggregation),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the batch over every scene the source returns. An empty
    /// query result yields an empty analysis; a scene that fails to
    /// filter or classify is logged and dropped, keeping the rest of
    /// the series intact.
    pub fn run(&self, source: &dyn ImageSource) -> FloodResult<FloodAnalysis> {
        let scenes = source.query(&self.config.query)?;
        if scenes.is_empty() {
            log::info!("no scenes matched the query; series is empty");
            return Ok(FloodAnalysis {
                scenes: Vec::new(),
                series: Vec::new(),
            });
        }
        log::info!("processing {} scenes", scenes.len());

        let polarization = self.config.query.polarization;
        let process = |mut scene: RasterImage| -> Option<RasterImage> {
            let result = self
                .filter
                .filter_scene(&mut scene, polarization)
                .and_then(|_| self.classifier.classify_scene(&mut scene, polarization));
            match result {
                Ok(()) => Some(scene),
                Err(e) => {
                    log::warn!("skipping scene {}: {}", scene.metadata.scene_id, e);
                    None
                }
            }
        };

        // Scenes are independent; only the aggregation order matters,
        // and collect preserves it.
        #[cfg(feature = "parallel")]
        let classified: Vec<RasterImage> = {
            use rayon::prelude::*;
            scenes.into_par_iter().filter_map(process).collect()
        };

        #[cfg(not(feature = "parallel"))]
        let classified: Vec<RasterImage> = scenes.into_iter().filter_map(process).collect();

        let series = self
            .aggregator
            .aggregate(&classified, &self.config.query.region);

        Ok(FloodAnalysis {
            scenes: classified,
            series,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;
    use crate::types::{BoundingBox, Polarization};
    use chrono::{TimeZone, Utc};

    fn query() -> SceneQuery {
        let region = Region::rect(&BoundingBox {
            min_lon: 0.0,
            max_lon: 0.01,
            min_lat: 0.0,
            max_lat: 0.01,
        })
        .unwrap();
        SceneQuery::new(
            region,
            Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap(),
            Polarization::VV,
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_stage_parameters_rejected() {
        let mut config = PipelineConfig::with_query(query());
        config.filter.radius_meters = -5.0;
        assert!(matches!(
            Pipeline::new(config),
            Err(FloodError::InvalidConfig(_))
        ));

        let mut config = PipelineConfig::with_query(query());
        config.classifier.threshold_db = f32::NAN;
        assert!(matches!(
            Pipeline::new(config),
            Err(FloodError::InvalidConfig(_))
        ));

        let mut config = PipelineConfig::with_query(query());
        config.aggregation.scale_meters = 0.0;
        assert!(matches!(
            Pipeline::new(config),
            Err(FloodError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Pipeline::new(PipelineConfig::with_query(query())).is_ok());
    }
}
