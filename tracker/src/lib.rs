//! Reconciles noisy, periodically-polled vehicle GPS fixes against static
//! route geometry and produces a smoothly animated on-map position and
//! heading for each vehicle.
//!
//! The pipeline: a route-geometry document is split into outbound/inbound
//! polylines ([`geometry`]), each fix's travel direction is resolved from the
//! route's stop sequence ([`direction`]), the fix is snapped onto the right
//! polyline ([`snap`]), and a per-vehicle controller animates the marker
//! towards each new snapped target along the polyline ([`animate`]). The
//! [`registry`] owns the controllers and applies each poll's fix list
//! wholesale.
//!
//! Everything is single-threaded and driven by the host's per-frame callback;
//! time is injected as a [`geom::Duration`] since engine start, so tests can
//! advance it deterministically.

#[macro_use]
extern crate log;

pub mod animate;
pub mod direction;
pub mod geometry;
pub mod logger;
pub mod registry;
pub mod snap;

use serde::{Deserialize, Serialize};

use geom::{Distance, Duration, LonLat};

use crate::direction::Direction;

/// One reported GPS sample for a vehicle. The whole fix list is replaced
/// wholesale each poll; nothing in here is patched incrementally.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VehicleFix {
    pub vehicle_id: String,
    pub pos: LonLat,
    /// The stop the vehicle most recently passed or is approaching.
    pub stop_id: String,
    pub stop_order: u32,
    /// The route variant the feed claims this vehicle is running, if any.
    pub route_variant: Option<String>,
}

/// Tunable knobs for snapping and animation. The distance thresholds are
/// empirical and depend on polling cadence and road density, so they're
/// configuration rather than constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// A snap candidate farther than this from the raw fix is rejected.
    pub max_snap_distance: Distance,
    /// Backward movement within this distance is GPS jitter; ignore it.
    pub jitter_tolerance: Distance,
    /// How long a marker takes to reach a new target. Roughly the polling
    /// interval: longer is smoother but lags the feed.
    pub animation_duration: Duration,
    /// Direction to report when the resolver can't tell.
    pub default_direction: Direction,
    /// How many segments on either side of a stop's coordinate index to
    /// search when a stop-to-coordinate map is available.
    pub stop_window_slack: usize,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            max_snap_distance: Distance::const_meters(50.0),
            jitter_tolerance: Distance::const_meters(12.0),
            animation_duration: Duration::const_seconds(4.0),
            default_direction: Direction::Inbound,
            stop_window_slack: 40,
        }
    }
}
