//! Snaps raw GPS fixes onto route geometry. A fix is projected onto both
//! directional polylines, candidates farther than the configured limit are
//! rejected, and the reported travel direction is trusted whenever its
//! candidate survives, so a vehicle near the turn point doesn't flicker
//! between the two halves of the route.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use geom::{Angle, Distance, LonLat, PolyLine, Projection};

use crate::direction::Direction;
use crate::{EngineConfig, VehicleFix};

/// A fix after snapping. `place` is `None` when the fix was too far from the
/// route and passed through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapped {
    pub pos: LonLat,
    pub heading: Angle,
    pub direction: Direction,
    pub place: Option<Place>,
}

/// Where along a directional polyline a snapped fix sits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Place {
    pub segment_idx: usize,
    /// Fraction along that segment, in [0, 1].
    pub t: f64,
}

/// Per-direction map from stop order to the segment index nearest that stop,
/// used to restrict the projection scan around the vehicle's last stop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopWindows {
    pub outbound: HashMap<u32, usize>,
    pub inbound: HashMap<u32, usize>,
}

impl StopWindows {
    /// The segment range to scan for a vehicle at `stop_order`, or `None` to
    /// scan the whole polyline.
    pub fn window_for(
        &self,
        dir: Direction,
        stop_order: u32,
        slack: usize,
    ) -> Option<RangeInclusive<usize>> {
        let by_ord = match dir {
            Direction::Outbound => &self.outbound,
            Direction::Inbound => &self.inbound,
        };
        let center = *by_ord.get(&stop_order)?;
        Some(center.saturating_sub(slack)..=center + slack)
    }
}

/// Snaps one fix. Never fails; a fix that can't be placed on either polyline
/// comes back at its raw position with a neutral heading.
pub fn snap(
    fix: &VehicleFix,
    resolved: Option<Direction>,
    outbound: &PolyLine,
    inbound: &PolyLine,
    windows: &StopWindows,
    config: &EngineConfig,
) -> Snapped {
    let out_cand = candidate(fix, Direction::Outbound, outbound, windows, config);
    let in_cand = candidate(fix, Direction::Inbound, inbound, windows, config);

    // The feed's own direction wins whenever its projection is acceptable,
    // even if the opposite one is closer.
    if let Some(dir) = resolved {
        let preferred = match dir {
            Direction::Outbound => &out_cand,
            Direction::Inbound => &in_cand,
        };
        if let Some((proj, _)) = preferred {
            return placed(proj, dir);
        }
    }

    match (out_cand, in_cand) {
        (Some((out, d_out)), Some((inb, d_in))) => {
            if d_out <= d_in {
                placed(&out, Direction::Outbound)
            } else {
                placed(&inb, Direction::Inbound)
            }
        }
        (Some((out, _)), None) => placed(&out, Direction::Outbound),
        (None, Some((inb, _))) => placed(&inb, Direction::Inbound),
        (None, None) => {
            debug!(
                "vehicle {} is off-route at {:?}, rendering raw",
                fix.vehicle_id, fix.pos
            );
            Snapped {
                pos: fix.pos,
                heading: Angle::ZERO,
                direction: resolved.unwrap_or(config.default_direction),
                place: None,
            }
        }
    }
}

/// Projects the fix onto one directional polyline and keeps the result only
/// if it's within the snap limit. Returns the projection and its ground
/// distance.
fn candidate(
    fix: &VehicleFix,
    dir: Direction,
    pl: &PolyLine,
    windows: &StopWindows,
    config: &EngineConfig,
) -> Option<(Projection, Distance)> {
    if pl.is_degenerate() {
        return None;
    }
    let proj = match windows.window_for(dir, fix.stop_order, config.stop_window_slack) {
        Some(range) => pl.project_pt_within(fix.pos, range),
        None => pl.project_pt(fix.pos),
    }?;
    let dist = fix.pos.gps_dist_meters(proj.pt);
    if dist <= config.max_snap_distance {
        Some((proj, dist))
    } else {
        None
    }
}

fn placed(proj: &Projection, direction: Direction) -> Snapped {
    Snapped {
        pos: proj.pt,
        heading: proj.heading,
        direction,
        place: Some(Place {
            segment_idx: proj.segment_idx,
            t: proj.t,
        }),
    }
}
