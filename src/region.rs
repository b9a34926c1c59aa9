//! Region-of-interest polygon.
//!
//! The region is validated once at construction; a malformed ring would
//! silently corrupt the aggregation counts downstream, so an open or
//! self-intersecting ring is a configuration error, not a warning.

use geo::algorithm::line_intersection::line_intersection;
use geo::{Contains, Coord, Line, LineString, Point, Polygon, Rect};

use crate::types::{BoundingBox, FloodError, FloodResult};

/// Meters per degree of latitude (equirectangular approximation)
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// An immutable, validated polygon over (longitude, latitude).
#[derive(Debug, Clone)]
pub struct Region {
    exterior: Vec<(f64, f64)>,
}

impl Region {
    /// Build a region from a closed exterior ring. The first vertex must
    /// equal the last, the ring must contain at least three distinct
    /// vertices, and no two non-adjacent edges may intersect.
    pub fn new(vertices: Vec<(f64, f64)>) -> FloodResult<Self> {
        if vertices.len() < 4 {
            return Err(FloodError::MalformedRegion(format!(
                "ring needs at least 3 distinct vertices, got {}",
                vertices.len().saturating_sub(1)
            )));
        }
        if vertices.first() != vertices.last() {
            return Err(FloodError::MalformedRegion(
                "ring is not closed (first vertex != last vertex)".to_string(),
            ));
        }
        for (lon, lat) in &vertices {
            if !lon.is_finite() || !lat.is_finite() {
                return Err(FloodError::MalformedRegion(
                    "ring contains non-finite coordinates".to_string(),
                ));
            }
        }
        for pair in vertices.windows(2) {
            if pair[0] == pair[1] {
                return Err(FloodError::MalformedRegion(format!(
                    "ring repeats consecutive vertex ({}, {})",
                    pair[0].0, pair[0].1
                )));
            }
        }

        let region = Self { exterior: vertices };
        region.check_simple()?;
        Ok(region)
    }

    /// Axis-aligned rectangular region from a bounding box.
    pub fn rect(bbox: &BoundingBox) -> FloodResult<Self> {
        if !(bbox.min_lon < bbox.max_lon && bbox.min_lat < bbox.max_lat) {
            return Err(FloodError::MalformedRegion(format!(
                "degenerate bounding box: lon [{}, {}], lat [{}, {}]",
                bbox.min_lon, bbox.max_lon, bbox.min_lat, bbox.max_lat
            )));
        }
        Self::new(vec![
            (bbox.min_lon, bbox.min_lat),
            (bbox.max_lon, bbox.min_lat),
            (bbox.max_lon, bbox.max_lat),
            (bbox.min_lon, bbox.max_lat),
            (bbox.min_lon, bbox.min_lat),
        ])
    }

    /// Closed exterior ring, as supplied
    pub fn exterior(&self) -> &[(f64, f64)] {
        &self.exterior
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox {
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
        };
        for (lon, lat) in &self.exterior {
            bbox.min_lon = bbox.min_lon.min(*lon);
            bbox.max_lon = bbox.max_lon.max(*lon);
            bbox.min_lat = bbox.min_lat.min(*lat);
            bbox.max_lat = bbox.max_lat.max(*lat);
        }
        bbox
    }

    /// Whether the point lies strictly inside the polygon.
    pub fn contains_lonlat(&self, lon: f64, lat: f64) -> bool {
        self.to_polygon().contains(&Point::new(lon, lat))
    }

    /// Whether the polygon intersects an axis-aligned bounding box
    /// (scene footprint test).
    pub fn intersects_bbox(&self, bbox: &BoundingBox) -> bool {
        use geo::Intersects;
        let rect = Rect::new(
            Coord {
                x: bbox.min_lon,
                y: bbox.min_lat,
            },
            Coord {
                x: bbox.max_lon,
                y: bbox.max_lat,
            },
        );
        self.to_polygon().intersects(&rect.to_polygon())
    }

    /// Centers of a `scale_meters`-spaced sampling grid covering the
    /// region, restricted to cells whose center lies inside the polygon.
    /// Degrees are converted with a local equirectangular approximation,
    /// which is adequate at the kilometer extents this tool targets.
    pub fn grid_cells(&self, scale_meters: f64) -> Vec<(f64, f64)> {
        if !(scale_meters > 0.0) || !scale_meters.is_finite() {
            return Vec::new();
        }
        let bbox = self.bounding_box();
        let mid_lat = 0.5 * (bbox.min_lat + bbox.max_lat);
        let step_lat = scale_meters / METERS_PER_DEGREE;
        let cos_lat = mid_lat.to_radians().cos();
        if cos_lat <= 0.0 {
            return Vec::new();
        }
        let step_lon = scale_meters / (METERS_PER_DEGREE * cos_lat);

        let n_lat = ((bbox.max_lat - bbox.min_lat) / step_lat).ceil() as usize;
        let n_lon = ((bbox.max_lon - bbox.min_lon) / step_lon).ceil() as usize;

        let polygon = self.to_polygon();
        let mut cells = Vec::new();
        for i in 0..n_lat {
            let lat = bbox.min_lat + (i as f64 + 0.5) * step_lat;
            for j in 0..n_lon {
                let lon = bbox.min_lon + (j as f64 + 0.5) * step_lon;
                if polygon.contains(&Point::new(lon, lat)) {
                    cells.push((lon, lat));
                }
            }
        }
        cells
    }

    fn to_polygon(&self) -> Polygon<f64> {
        let coords: Vec<(f64, f64)> = self.exterior.clone();
        Polygon::new(LineString::from(coords), vec![])
    }

    /// Reject rings where two non-adjacent edges intersect. Adjacent
    /// edges always share a vertex and are skipped.
    fn check_simple(&self) -> FloodResult<()> {
        let segments: Vec<Line<f64>> = self
            .exterior
            .windows(2)
            .map(|pair| {
                Line::new(
                    Coord {
                        x: pair[0].0,
                        y: pair[0].1,
                    },
                    Coord {
                        x: pair[1].0,
                        y: pair[1].1,
                    },
                )
            })
            .collect();
        let n = segments.len();

        for i in 0..n {
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                if adjacent {
                    continue;
                }
                if line_intersection(segments[i], segments[j]).is_some() {
                    return Err(FloodError::MalformedRegion(format!(
                        "ring is self-intersecting (edges {} and {})",
                        i, j
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Region {
        Region::new(vec![
            (0.0, 0.0),
            (0.01, 0.0),
            (0.01, 0.01),
            (0.0, 0.01),
            (0.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_open_ring_rejected() {
        let result = Region::new(vec![(0.0, 0.0), (0.01, 0.0), (0.01, 0.01), (0.0, 0.01)]);
        assert!(matches!(result, Err(FloodError::MalformedRegion(_))));
    }

    #[test]
    fn test_self_intersecting_ring_rejected() {
        // Bow-tie: the first and third edges cross at the center
        let result = Region::new(vec![
            (0.0, 0.0),
            (1.0, 1.0),
            (1.0, 0.0),
            (0.0, 1.0),
            (0.0, 0.0),
        ]);
        assert!(matches!(result, Err(FloodError::MalformedRegion(_))));
    }

    #[test]
    fn test_containment() {
        let region = square();
        assert!(region.contains_lonlat(0.005, 0.005));
        assert!(!region.contains_lonlat(0.02, 0.005));
    }

    #[test]
    fn test_footprint_intersection() {
        let region = square();
        let overlapping = BoundingBox {
            min_lon: 0.005,
            max_lon: 0.02,
            min_lat: 0.005,
            max_lat: 0.02,
        };
        let disjoint = BoundingBox {
            min_lon: 0.05,
            max_lon: 0.06,
            min_lat: 0.05,
            max_lat: 0.06,
        };
        assert!(region.intersects_bbox(&overlapping));
        assert!(!region.intersects_bbox(&disjoint));
    }

    #[test]
    fn test_grid_cells_cover_square() {
        let region = square();
        // ~1.113 km square sampled at 111.32 m: a 10x10 grid of centers,
        // all inside the polygon.
        let cells = region.grid_cells(0.001 * METERS_PER_DEGREE);
        assert_eq!(cells.len(), 100);
        for (lon, lat) in cells {
            assert!(region.contains_lonlat(lon, lat));
        }
    }

    #[test]
    fn test_grid_cells_bad_scale_is_empty() {
        assert!(square().grid_cells(0.0).is_empty());
        assert!(square().grid_cells(f64::NAN).is_empty());
    }
}
