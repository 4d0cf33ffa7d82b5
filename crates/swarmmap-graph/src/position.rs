//! Geographic positions and the distance rules links are built from.
//!
//! Surface distance is the haversine great-circle distance on a spherical
//! Earth of radius 6371 km, in metres. Altitude is combined with it as an
//! orthogonal component to give the 3-D separation used as link weight.

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Absolute latitude bound in degrees.
pub const MAX_LATITUDE: f64 = 90.0;

/// Absolute longitude bound in degrees.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Absolute altitude bound in metres, checked after unit scaling.
pub const MAX_ALTITUDE: f64 = 11_265.4;

/// A position report as delivered by the telemetry decoder.
///
/// Altitude is in the decoder's native unit (fathoms) until the graph
/// scales it on insert.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Degrees north
    pub latitude: f64,
    /// Degrees east
    pub longitude: f64,
    pub altitude: f32,
    pub bearing: f32,
    pub speed: f32,
    pub accuracy: f32,
}

impl Position {
    /// A position with zeroed motion fields.
    pub const fn new(latitude: f64, longitude: f64, altitude: f32) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            bearing: 0.0,
            speed: 0.0,
            accuracy: 0.0,
        }
    }
}

/// A position accepted by the graph: bounds-checked, altitude in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    /// Metres
    pub altitude: f64,
    /// The report this fix was derived from
    pub raw: Position,
}

impl Fix {
    /// Scale and bounds-check a raw report.
    ///
    /// On failure returns the name and value of the first offending field.
    pub fn from_report(raw: Position, altitude_scale: f64) -> Result<Self, (&'static str, f64)> {
        let altitude = f64::from(raw.altitude) * altitude_scale;

        if !within(raw.latitude, MAX_LATITUDE) {
            return Err(("latitude", raw.latitude));
        }
        if !within(raw.longitude, MAX_LONGITUDE) {
            return Err(("longitude", raw.longitude));
        }
        if !within(altitude, MAX_ALTITUDE) {
            return Err(("altitude", altitude));
        }

        Ok(Self {
            latitude: raw.latitude,
            longitude: raw.longitude,
            altitude,
            raw,
        })
    }

    /// Great-circle distance along the surface, in metres.
    pub fn surface_distance(&self, other: &Self) -> f64 {
        haversine(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// Absolute altitude difference, in metres.
    pub fn altitude_delta(&self, other: &Self) -> f64 {
        (self.altitude - other.altitude).abs()
    }

    /// Combined surface and altitude separation, in metres.
    pub fn distance_3d(&self, other: &Self) -> f64 {
        self.surface_distance(other).hypot(self.altitude_delta(other))
    }
}

/// NaN fails every comparison, so it is rejected here too.
fn within(value: f64, bound: f64) -> bool {
    (-bound..=bound).contains(&value)
}

/// Haversine distance between two (lat, lon) points in degrees, in metres.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}
