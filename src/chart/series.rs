use serde::{Deserialize, Serialize};

use crate::types::SeriesPoint;

/// Chart styling passed through to the external chart widget. Not part
/// of the processing contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    pub title: String,
    pub h_axis: String,
    pub v_axis: String,
    pub line_width: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: "Inundated Pixels".to_string(),
            h_axis: "Date".to_string(),
            v_axis: "Number of Inundated Pixels".to_string(),
            line_width: 2,
        }
    }
}

/// The chart's data source: the aggregated series in ascending
/// acquisition order plus its styling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSpec {
    pub config: ChartConfig,
    pub points: Vec<SeriesPoint>,
}

impl ChartSpec {
    pub fn new(points: Vec<SeriesPoint>, config: ChartConfig) -> Self {
        Self { config, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_default_styling() {
        let config = ChartConfig::default();
        assert_eq!(config.title, "Inundated Pixels");
        assert_eq!(config.v_axis, "Number of Inundated Pixels");
        assert_eq!(config.line_width, 2);
    }

    #[test]
    fn test_spec_wraps_points_in_order() {
        let points = vec![
            SeriesPoint {
                timestamp: Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap(),
                water_pixels: 5.0,
            },
            SeriesPoint {
                timestamp: Utc.with_ymd_and_hms(2021, 6, 13, 0, 0, 0).unwrap(),
                water_pixels: 12.0,
            },
        ];
        let spec = ChartSpec::new(points.clone(), ChartConfig::default());
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.points, points);
    }
}
