// Sector classification and live best-split timing.
// Boxed regions first, nearest-marker fallback within the acceptance
// radius, otherwise no sector.

use crate::config::EngineConfig;
use crate::model::SectorBest;
use crate::track::{haversine_m, GeoPoint, Sector, SectorBox, SectorMarker};

pub struct SectorSegmenter {
    boxes: Vec<SectorBox>,
    markers: Vec<SectorMarker>,
    fallback_m: f64,
    current: Option<Sector>,
    entered_at: Option<f64>,
    best: [Option<(f64, u32)>; 3],
    dirty: bool,
}

impl SectorSegmenter {
    pub fn new(config: &EngineConfig, boxes: Vec<SectorBox>, markers: Vec<SectorMarker>) -> Self {
        Self {
            boxes,
            markers,
            fallback_m: config.sector_fallback_m,
            current: None,
            entered_at: None,
            best: [None; 3],
            dirty: false,
        }
    }

    /// Pure classification of a position. Same input, same sector.
    pub fn classify(&self, position: GeoPoint) -> Option<Sector> {
        for sector_box in &self.boxes {
            if sector_box.contains(position) {
                return Some(sector_box.sector);
            }
        }

        let mut nearest: Option<(Sector, f64)> = None;
        for marker in &self.markers {
            let distance = haversine_m(position, marker.point);
            match nearest {
                Some((_, best)) if distance >= best => {}
                _ => nearest = Some((marker.sector, distance)),
            }
        }
        match nearest {
            Some((sector, distance)) if distance <= self.fallback_m => Some(sector),
            _ => None,
        }
    }

    /// Advance occupancy timing for one tick. On a label change the sector
    /// just left is closed and compared against its session best.
    pub fn update(&mut self, position: GeoPoint, now_s: f64, lap: u32) {
        let sector = self.classify(position);
        if sector == self.current {
            return;
        }

        if let (Some(previous), Some(entered)) = (self.current, self.entered_at) {
            self.close_sector(previous, now_s - entered, lap);
        }

        self.current = sector;
        self.entered_at = sector.map(|_| now_s);
    }

    /// Clear current-lap occupancy at a lap boundary. Session bests persist.
    pub fn reset_current(&mut self) {
        self.current = None;
        self.entered_at = None;
    }

    pub fn current_sector(&self) -> Option<Sector> {
        self.current
    }

    pub fn best_splits(&self) -> Vec<SectorBest> {
        Sector::ALL
            .iter()
            .filter_map(|sector| {
                self.best[sector.index()].map(|(duration_s, lap)| SectorBest {
                    sector: *sector,
                    duration_s,
                    lap,
                })
            })
            .collect()
    }

    /// Best splits, only when they changed since the last call. Keeps
    /// downstream snapshot emission quiet.
    pub fn take_best_if_changed(&mut self) -> Option<Vec<SectorBest>> {
        if self.dirty {
            self.dirty = false;
            Some(self.best_splits())
        } else {
            None
        }
    }

    fn close_sector(&mut self, sector: Sector, elapsed_s: f64, lap: u32) {
        if elapsed_s <= 0.0 {
            return;
        }
        let slot = &mut self.best[sector.index()];
        let improved = match slot {
            Some((best, _)) => elapsed_s < *best,
            None => true,
        };
        if improved {
            *slot = Some((elapsed_s, lap));
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{GpsBounds, TrackConfig};

    fn segmenter() -> SectorSegmenter {
        let bounds = GpsBounds {
            min_lat: 33.50,
            max_lat: 33.56,
            min_long: -86.66,
            max_long: -86.60,
        };
        let (boxes, markers) = TrackConfig::derive_sectors(bounds);
        SectorSegmenter::new(&EngineConfig::default(), boxes, markers)
    }

    #[test]
    fn classification_is_deterministic() {
        let segmenter = segmenter();
        let p = GeoPoint::new(33.53, -86.65);
        let first = segmenter.classify(p);
        assert_eq!(first, Some(Sector::S1));
        for _ in 0..10 {
            assert_eq!(segmenter.classify(p), first);
        }
    }

    #[test]
    fn boxes_partition_by_longitude() {
        let segmenter = segmenter();
        assert_eq!(segmenter.classify(GeoPoint::new(33.53, -86.65)), Some(Sector::S1));
        assert_eq!(segmenter.classify(GeoPoint::new(33.53, -86.63)), Some(Sector::S2));
        assert_eq!(segmenter.classify(GeoPoint::new(33.53, -86.605)), Some(Sector::S3));
    }

    fn marker_only_segmenter() -> SectorSegmenter {
        let markers = vec![
            SectorMarker {
                sector: Sector::S1,
                point: GeoPoint::new(33.530, -86.650),
            },
            SectorMarker {
                sector: Sector::S2,
                point: GeoPoint::new(33.530, -86.630),
            },
            SectorMarker {
                sector: Sector::S3,
                point: GeoPoint::new(33.530, -86.610),
            },
        ];
        SectorSegmenter::new(&EngineConfig::default(), Vec::new(), markers)
    }

    #[test]
    fn marker_fallback_accepts_within_radius() {
        let segmenter = marker_only_segmenter();
        // ~220 m north of the S2 marker, in no box
        let near = GeoPoint::new(33.532, -86.630);
        assert_eq!(segmenter.classify(near), Some(Sector::S2));
    }

    #[test]
    fn far_positions_have_no_sector() {
        let segmenter = marker_only_segmenter();
        // ~1.1 km north of the nearest marker
        let far = GeoPoint::new(33.540, -86.630);
        assert_eq!(segmenter.classify(far), None);
    }

    #[test]
    fn transition_records_best_split() {
        let mut sectors = segmenter();
        sectors.update(GeoPoint::new(33.53, -86.65), 10.0, 3);
        sectors.update(GeoPoint::new(33.53, -86.63), 38.5, 3);
        let best = sectors.take_best_if_changed().expect("first split");
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].sector, Sector::S1);
        assert!((best[0].duration_s - 28.5).abs() < 1e-9);
        assert_eq!(best[0].lap, 3);
    }

    #[test]
    fn slower_split_does_not_replace_best() {
        let mut sectors = segmenter();
        sectors.update(GeoPoint::new(33.53, -86.65), 0.0, 3);
        sectors.update(GeoPoint::new(33.53, -86.63), 20.0, 3);
        assert!(sectors.take_best_if_changed().is_some());

        // next lap runs the first sector 10 s slower
        sectors.reset_current();
        sectors.update(GeoPoint::new(33.53, -86.65), 40.0, 4);
        sectors.update(GeoPoint::new(33.53, -86.63), 70.0, 4);
        assert!(sectors.take_best_if_changed().is_none());
        assert!((sectors.best_splits()[0].duration_s - 20.0).abs() < 1e-9);
    }

    #[test]
    fn lap_boundary_clears_occupancy_but_keeps_bests() {
        let mut sectors = segmenter();
        sectors.update(GeoPoint::new(33.53, -86.65), 0.0, 3);
        sectors.update(GeoPoint::new(33.53, -86.63), 25.0, 3);
        sectors.take_best_if_changed();

        sectors.reset_current();
        assert_eq!(sectors.current_sector(), None);
        assert_eq!(sectors.best_splits().len(), 1);
    }
}
