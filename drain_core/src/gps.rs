//! GPS string handling.
//!
//! Canonical wire format is `"lat,lon"` in decimal degrees, whitespace
//! allowed around either number. The rig sends `"No GPS lock"` while it has
//! no fix. Anything that does not parse to an in-range coordinate degrades to
//! the configured fallback; it never fails.
use serde::Serialize;

/// Sentinel the rig sends while it has no fix.
pub const NO_LOCK: &str = "No GPS lock";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Installation site of the rig.
    pub const FALLBACK: GeoPoint = GeoPoint {
        lat: drain_config::DEFAULT_LAT,
        lon: drain_config::DEFAULT_LON,
    };

    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let p = Self { lat, lon };
        p.is_valid().then_some(p)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lat: {:.6}, Lon: {:.6}", self.lat, self.lon)
    }
}

/// Resolved position for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsFix {
    pub point: GeoPoint,
    /// False when `point` is the fallback.
    pub locked: bool,
}

impl GpsFix {
    pub fn fallback(point: GeoPoint) -> Self {
        Self {
            point,
            locked: false,
        }
    }

    /// Display line, e.g. `Lat: 23.811855, Lon: 90.357140`.
    pub fn display(&self) -> String {
        if self.locked {
            self.point.to_string()
        } else {
            format!("{} (no lock)", self.point)
        }
    }
}

fn is_no_lock(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.is_empty() || lower == "no lock" || lower.contains("no gps lock")
}

/// Parse a `"lat,lon"` string. `None` for the no-lock sentinel and garbage.
pub fn parse_coordinates(s: &str) -> Option<GeoPoint> {
    if is_no_lock(s) {
        return None;
    }
    let (lat, lon) = s.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    GeoPoint::new(lat, lon)
}

/// Resolve an optional raw GPS string against `fallback`.
pub fn resolve(raw: Option<&str>, fallback: GeoPoint) -> GpsFix {
    match raw.and_then(parse_coordinates) {
        Some(point) => GpsFix {
            point,
            locked: true,
        },
        None => GpsFix::fallback(fallback),
    }
}

/// `geo:` URI understood by map applications.
pub fn geo_uri(p: GeoPoint) -> String {
    format!(
        "geo:{lat:.6},{lon:.6}?q={lat:.6},{lon:.6}",
        lat = p.lat,
        lon = p.lon
    )
}
