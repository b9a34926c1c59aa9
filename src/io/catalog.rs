use chrono::{DateTime, Utc};

use crate::region::Region;
use crate::types::{FloodError, FloodResult, Polarization, RasterImage};

/// Filter over an image archive: spatial extent, half-open acquisition
/// window `[start, end)`, and a required polarization.
#[derive(Debug, Clone)]
pub struct SceneQuery {
    pub region: Region,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub polarization: Polarization,
}

impl SceneQuery {
    /// The region arrives already validated by `Region::new`; the date
    /// range ordering is checked here.
    pub fn new(
        region: Region,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        polarization: Polarization,
    ) -> FloodResult<Self> {
        if start >= end {
            return Err(FloodError::InvalidConfig(format!(
                "date range start {} is not before end {}",
                start, end
            )));
        }
        Ok(Self {
            region,
            start,
            end,
            polarization,
        })
    }
}

/// A chronologically ordered view over an external scene archive.
///
/// An empty result is a valid answer, not an error; downstream stages
/// must tolerate an empty series.
pub trait ImageSource {
    fn query(&self, query: &SceneQuery) -> FloodResult<Vec<RasterImage>>;
}

/// In-memory scene catalog. Stands in for the external archive and
/// doubles as the test fixture.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    scenes: Vec<RasterImage>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scenes(scenes: Vec<RasterImage>) -> Self {
        Self { scenes }
    }

    pub fn push(&mut self, scene: RasterImage) {
        self.scenes.push(scene);
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

impl ImageSource for MemoryCatalog {
    fn query(&self, query: &SceneQuery) -> FloodResult<Vec<RasterImage>> {
        let mut matches: Vec<RasterImage> = self
            .scenes
            .iter()
            .filter(|scene| {
                let t = scene.metadata.start_time;
                t >= query.start
                    && t < query.end
                    && scene.metadata.polarizations.contains(&query.polarization)
                    && scene.has_band(&query.polarization.to_string())
                    && query.region.intersects_bbox(&scene.footprint())
            })
            .cloned()
            .collect();

        // Stable sort: scenes sharing a timestamp keep archive order
        matches.sort_by_key(|scene| scene.metadata.start_time);

        log::info!(
            "catalog query matched {} of {} scenes ({} {} to {})",
            matches.len(),
            self.scenes.len(),
            query.polarization,
            query.start,
            query.end
        );
        Ok(matches)
    }
}
