//! Geographic coordinate type and spatial utilities.
//!
//! `GeoPoint` uses `f32` (single-precision) latitude/longitude.  At the
//! equator this gives ~1 m precision — more than sufficient for snapping and
//! prefiltering at state scale while halving memory against `f64`.

/// Metres per degree of latitude (and of longitude at the equator).
pub const M_PER_DEG: f64 = 111_000.0;

/// A WGS-84 geographic coordinate stored as single-precision floats.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    pub lat: f32,
    pub lon: f32,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f32, lon: f32) -> Self {
        Self { lat, lon }
    }

    /// Haversine great-circle distance in metres.
    ///
    /// Accuracy: ±0.5 % (f32 rounding); suitable for edge lengths and snap
    /// distances at state scale.
    pub fn distance_m(self, other: GeoPoint) -> f32 {
        const R: f32 = 6_371_000.0; // mean Earth radius, metres

        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        R * c
    }

    /// Project to planar metres with an equirectangular approximation.
    ///
    /// `cos_lat0` is the cosine of a reference latitude (radians) shared by
    /// every point in the projection; distances between projected points are
    /// accurate to within a few percent across a state-sized extent, which
    /// is all snapping and radius prefilters need.
    #[inline]
    pub fn to_planar(self, cos_lat0: f64) -> [f64; 2] {
        [
            self.lon as f64 * cos_lat0 * M_PER_DEG,
            self.lat as f64 * M_PER_DEG,
        ]
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}
