// Course geometry: start/finish point, sector regions, and the static map.

use serde::Serialize;

/// Fallback position used when the dataset carries no GPS channels.
pub const FALLBACK_LAT: f64 = 33.532;
pub const FALLBACK_LONG: f64 = -86.619;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub long: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }
}

/// Great-circle distance in meters.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let p1 = a.lat.to_radians();
    let p2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.long - a.long).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sector {
    S1,
    S2,
    S3,
}

impl Sector {
    pub const ALL: [Sector; 3] = [Sector::S1, Sector::S2, Sector::S3];

    pub fn index(&self) -> usize {
        match self {
            Sector::S1 => 0,
            Sector::S2 => 1,
            Sector::S3 => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::S1 => "s1",
            Sector::S2 => "s2",
            Sector::S3 => "s3",
        }
    }
}

/// Axis-aligned lat/long region for one sector.
#[derive(Clone, Copy, Debug)]
pub struct SectorBox {
    pub sector: Sector,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_long: f64,
    pub max_long: f64,
}

impl SectorBox {
    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lat >= self.min_lat
            && p.lat <= self.max_lat
            && p.long >= self.min_long
            && p.long <= self.max_long
    }
}

/// Named fallback point for positions outside every box.
#[derive(Clone, Copy, Debug)]
pub struct SectorMarker {
    pub sector: Sector,
    pub point: GeoPoint,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct GpsBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_long: f64,
    pub max_long: f64,
}

/// Precomputed course configuration supplied to the engine.
#[derive(Clone, Debug)]
pub struct TrackConfig {
    pub start: GeoPoint,
    pub boxes: Vec<SectorBox>,
    pub markers: Vec<SectorMarker>,
    pub shape: Vec<GeoPoint>,
    pub bounds: GpsBounds,
}

impl TrackConfig {
    /// Minimal configuration for synthetic mode: the fallback point and no
    /// sector geometry.
    pub fn fallback() -> Self {
        let start = GeoPoint::new(FALLBACK_LAT, FALLBACK_LONG);
        Self {
            start,
            boxes: Vec::new(),
            markers: Vec::new(),
            shape: vec![start],
            bounds: GpsBounds {
                min_lat: start.lat,
                max_lat: start.lat,
                min_long: start.long,
                max_long: start.long,
            },
        }
    }

    /// Derive three sector boxes as longitude thirds of the bounding box,
    /// with markers at the box centers.
    pub fn derive_sectors(bounds: GpsBounds) -> (Vec<SectorBox>, Vec<SectorMarker>) {
        let span = bounds.max_long - bounds.min_long;
        if span <= 0.0 {
            return (Vec::new(), Vec::new());
        }
        let third = span / 3.0;
        let mut boxes = Vec::with_capacity(3);
        let mut markers = Vec::with_capacity(3);
        for sector in Sector::ALL {
            let min_long = bounds.min_long + third * sector.index() as f64;
            let max_long = if sector == Sector::S3 {
                bounds.max_long
            } else {
                min_long + third
            };
            boxes.push(SectorBox {
                sector,
                min_lat: bounds.min_lat,
                max_lat: bounds.max_lat,
                min_long,
                max_long,
            });
            markers.push(SectorMarker {
                sector,
                point: GeoPoint::new(
                    (bounds.min_lat + bounds.max_lat) / 2.0,
                    (min_long + max_long) / 2.0,
                ),
            });
        }
        (boxes, markers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_for_same_point() {
        let p = GeoPoint::new(33.532, -86.619);
        assert!(haversine_m(p, p) < 1e-6);
    }

    #[test]
    fn haversine_one_degree_latitude() {
        let a = GeoPoint::new(33.0, -86.619);
        let b = GeoPoint::new(34.0, -86.619);
        let d = haversine_m(a, b);
        // one degree of latitude is roughly 111 km
        assert!((d - 111_195.0).abs() < 300.0);
    }

    #[test]
    fn derived_sectors_cover_the_bounds() {
        let bounds = GpsBounds {
            min_lat: 33.5,
            max_lat: 33.6,
            min_long: -86.7,
            max_long: -86.4,
        };
        let (boxes, markers) = TrackConfig::derive_sectors(bounds);
        assert_eq!(boxes.len(), 3);
        assert_eq!(markers.len(), 3);
        assert_eq!(boxes[2].max_long, bounds.max_long);
        for (b, m) in boxes.iter().zip(&markers) {
            assert_eq!(b.sector, m.sector);
            assert!(b.contains(m.point));
        }
    }

    #[test]
    fn degenerate_bounds_produce_no_sectors() {
        let (boxes, markers) = TrackConfig::derive_sectors(GpsBounds::default());
        assert!(boxes.is_empty());
        assert!(markers.is_empty());
    }
}
