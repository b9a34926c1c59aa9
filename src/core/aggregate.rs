use crate::core::classify::WATER_BAND;
use crate::region::Region;
use crate::types::{FloodResult, RasterImage, SeriesPoint};

/// Temporal aggregation parameters
#[derive(Debug, Clone, Copy)]
pub struct AggregationParams {
    /// Ground sample distance of the reduction grid, in meters. Affects
    /// the magnitude of the counts, not the shape of the trend; compare
    /// magnitudes across runs only at a fixed scale.
    pub scale_meters: f64,
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self { scale_meters: 100.0 }
    }
}

/// Collapses each classified scene's water mask into one chart sample.
pub struct TemporalAggregator {
    params: AggregationParams,
}

impl TemporalAggregator {
    pub fn new() -> Self {
        Self {
            params: AggregationParams::default(),
        }
    }

    pub fn with_params(params: AggregationParams) -> Self {
        Self { params }
    }

    /// Sum the `"water"` mask over the region at the processing scale.
    /// Pure: the same scene, region and scale always produce the same
    /// count. Grid cells outside the raster footprint contribute
    /// nothing.
    pub fn reduce_scene(&self, image: &RasterImage, region: &Region) -> FloodResult<SeriesPoint> {
        let mask = image.mask_band(WATER_BAND)?;

        let mut total = 0.0f64;
        for (lon, lat) in region.grid_cells(self.params.scale_meters) {
            if let Some((row, col)) = image.geo_to_index(lon, lat) {
                if let Some(v) = mask.get(row, col) {
                    total += v as f64;
                }
            }
        }

        Ok(SeriesPoint {
            timestamp: image.metadata.start_time,
            water_pixels: total,
        })
    }

    /// One series point per scene, in collection order. The source
    /// already orders scenes by acquisition time; nothing is reordered
    /// or deduplicated here, so duplicate timestamps stay as separate
    /// points. A scene that fails to reduce is skipped, not fatal.
    pub fn aggregate(&self, scenes: &[RasterImage], region: &Region) -> Vec<SeriesPoint> {
        let points: Vec<SeriesPoint> = scenes
            .iter()
            .filter_map(|scene| match self.reduce_scene(scene, region) {
                Ok(point) => Some(point),
                Err(e) => {
                    log::warn!(
                        "skipping scene {} during aggregation: {}",
                        scene.metadata.scene_id,
                        e
                    );
                    None
                }
            })
            .collect();

        log::info!(
            "aggregated {} of {} scenes at {} m scale",
            points.len(),
            scenes.len(),
            self.params.scale_meters
        );
        points
    }
}

impl Default for TemporalAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classify::{WaterClassifier, WaterClassifierParams};
    use crate::types::{
        AcquisitionMetadata, AcquisitionMode, BoundingBox, GeoTransform, Polarization,
    };
    use chrono::{DateTime, TimeZone, Utc};
    use ndarray::Array2;

    // 10x10 scene over lon [0, 0.01], lat [0, 0.01]; one pixel per
    // 111.32 m aggregation cell.
    const SCALE: f64 = 111.32;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, d, 5, 30, 0).unwrap()
    }

    fn classified_scene(id: &str, time: DateTime<Utc>, water_pixels: &[(usize, usize)]) -> RasterImage {
        let metadata = AcquisitionMetadata {
            scene_id: id.to_string(),
            start_time: time,
            acquisition_mode: AcquisitionMode::IW,
            polarizations: vec![Polarization::VV],
        };
        let gt = GeoTransform::north_up(0.0, 0.01, 0.001, -0.001);
        let mut band = Array2::from_elem((10, 10), -10.0f32);
        for &(i, j) in water_pixels {
            band[[i, j]] = -22.0;
        }
        let mut image =
            RasterImage::new(metadata, gt, (111.32, 111.32), Polarization::VV, band.clone())
                .unwrap();
        image.add_band("VV_filtered", band).unwrap();
        WaterClassifier::with_params(WaterClassifierParams { threshold_db: -16.0 })
            .classify_scene(&mut image, Polarization::VV)
            .unwrap();
        image
    }

    fn full_region() -> Region {
        Region::rect(&BoundingBox {
            min_lon: 0.0,
            max_lon: 0.01,
            min_lat: 0.0,
            max_lat: 0.01,
        })
        .unwrap()
    }

    fn aggregator() -> TemporalAggregator {
        TemporalAggregator::with_params(AggregationParams {
            scale_meters: SCALE,
        })
    }

    #[test]
    fn test_count_matches_water_pixels() {
        let scene = classified_scene("a", day(1), &[(0, 0), (3, 4), (9, 9)]);
        let point = aggregator().reduce_scene(&scene, &full_region()).unwrap();
        assert_eq!(point.water_pixels, 3.0);
        assert_eq!(point.timestamp, day(1));
    }

    #[test]
    fn test_reduction_is_idempotent() {
        let scene = classified_scene("a", day(1), &[(2, 2), (5, 5)]);
        let region = full_region();
        let agg = aggregator();
        let first = agg.reduce_scene(&scene, &region).unwrap();
        let second = agg.reduce_scene(&scene, &region).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_region_clips_the_count() {
        // Water everywhere, but the region only covers the north-west
        // quarter of the footprint.
        let all: Vec<(usize, usize)> =
            (0..10).flat_map(|i| (0..10).map(move |j| (i, j))).collect();
        let scene = classified_scene("a", day(1), &all);

        let quarter = Region::rect(&BoundingBox {
            min_lon: 0.0,
            max_lon: 0.005,
            min_lat: 0.005,
            max_lat: 0.01,
        })
        .unwrap();
        let point = aggregator().reduce_scene(&scene, &quarter).unwrap();
        assert_eq!(point.water_pixels, quarter.grid_cells(SCALE).len() as f64);
    }

    #[test]
    fn test_collection_order_preserved() {
        let scenes = vec![
            classified_scene("a", day(1), &[(0, 0)]),
            classified_scene("b", day(5), &[]),
            classified_scene("b2", day(5), &[(1, 1), (2, 2)]), // duplicate timestamp
            classified_scene("c", day(9), &[(0, 1), (0, 2), (0, 3)]),
        ];
        let points = aggregator().aggregate(&scenes, &full_region());

        let counts: Vec<f64> = points.iter().map(|p| p.water_pixels).collect();
        assert_eq!(counts, vec![1.0, 0.0, 2.0, 3.0]);
        assert!(points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_unclassified_scene_skipped() {
        let metadata = AcquisitionMetadata {
            scene_id: "raw-only".to_string(),
            start_time: day(3),
            acquisition_mode: AcquisitionMode::IW,
            polarizations: vec![Polarization::VV],
        };
        let gt = GeoTransform::north_up(0.0, 0.01, 0.001, -0.001);
        let raw_only = RasterImage::new(
            metadata,
            gt,
            (111.32, 111.32),
            Polarization::VV,
            Array2::from_elem((10, 10), -10.0f32),
        )
        .unwrap();

        let scenes = vec![classified_scene("a", day(1), &[(0, 0)]), raw_only];
        let points = aggregator().aggregate(&scenes, &full_region());
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].water_pixels, 1.0);
    }

    #[test]
    fn test_empty_scene_list_yields_empty_series() {
        let points = aggregator().aggregate(&[], &full_region());
        assert!(points.is_empty());
    }
}
