//! Physical link rules and analysis tuning.

use crate::error::{Error, Result};

/// Link radius in metres.
pub const MAX_RANGE: f64 = 15.0;

/// Pairs at or below this separation (metres) are too close to relay.
pub const MIN_SEPARATION: f64 = 1.143;

/// Largest altitude difference (metres) a link can span.
pub const MAX_ALTITUDE_DELTA: f64 = 15.0;

/// Weight given to links between two busy relays.
pub const HEAVY_WEIGHT: f64 = 1000.0;

/// Telemetry reports altitude in fathoms; the graph works in metres.
pub const ALTITUDE_SCALE: f64 = 1.8288;

/// Configuration for edge construction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphConfig {
    /// Maximum 3-D distance for a link
    pub max_range: f64,
    /// Minimum 3-D distance for a link (inclusive bound for "too close")
    pub min_separation: f64,
    /// Maximum altitude difference for a link
    pub max_altitude_delta: f64,
    /// Weight substituted on links between nodes of degree > 2
    pub heavy_weight: f64,
    /// Multiplier applied to raw altitude at insert time
    pub altitude_scale: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_range: MAX_RANGE,
            min_separation: MIN_SEPARATION,
            max_altitude_delta: MAX_ALTITUDE_DELTA,
            heavy_weight: HEAVY_WEIGHT,
            altitude_scale: ALTITUDE_SCALE,
        }
    }
}

impl GraphConfig {
    /// Defaults, overridden by any `SWARMMAP_*` environment variables that are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &'static str, default: f64| -> Result<f64> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => {
                    let parsed = raw.trim().parse::<f64>();
                    match parsed {
                        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
                        _ => Err(Error::Config { key, value: raw }),
                    }
                }
            }
        };

        Ok(Self {
            max_range: read("SWARMMAP_MAX_RANGE", defaults.max_range)?,
            min_separation: read("SWARMMAP_MIN_SEPARATION", defaults.min_separation)?,
            max_altitude_delta: read("SWARMMAP_MAX_ALTITUDE_DELTA", defaults.max_altitude_delta)?,
            heavy_weight: read("SWARMMAP_HEAVY_WEIGHT", defaults.heavy_weight)?,
            altitude_scale: read("SWARMMAP_ALTITUDE_SCALE", defaults.altitude_scale)?,
        })
    }
}
