//! Per-vehicle marker animation. Each controller is a small state machine
//! driven by two inputs: a new snapped target whenever a poll lands, and a
//! per-frame tick. Time is always passed in as a [`Duration`] since engine
//! start, never read from a clock, so the whole machine is deterministic.
//!
//! Movement policy: forward motion animates along the route polyline with an
//! ease-out curve, a small backward move is GPS jitter and the marker holds
//! in place, and a large backward move is a real relocation and teleports
//! instantly. Every new fix is judged against where the marker is currently
//! drawn; one arriving mid-animation abandons the in-flight target and
//! restarts from that spot, so the newest fix always wins.

use geom::{walk_along, Angle, Duration, LonLat, PolyLine, Projection};

use crate::direction::Direction;
use crate::snap::{Place, Snapped};
use crate::EngineConfig;

/// Two equal `t` values within this are the same spot on a segment.
const SAME_SPOT_EPSILON: f64 = 1e-3;

/// What to draw for one vehicle on one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub pos: LonLat,
    pub heading: Angle,
    pub direction: Direction,
}

#[derive(Debug, Clone)]
enum State {
    /// No fix seen yet; nothing to draw.
    Idle,
    /// At rest at the last target.
    Settled { pos: LonLat, heading: Angle },
    Animating(Animation),
}

#[derive(Debug, Clone)]
struct Animation {
    /// Vertex path from where the marker was drawn to the new target.
    path: Vec<LonLat>,
    start_time: Duration,
    duration: Duration,
    start_heading: Angle,
    end_pos: LonLat,
    end_heading: Angle,
}

impl Animation {
    /// The interpolated position and heading at `now`, and whether the
    /// animation has finished.
    fn frame_at(&self, now: Duration) -> (LonLat, Angle, bool) {
        let raw = if self.duration <= Duration::ZERO {
            1.0
        } else {
            ((now - self.start_time) / self.duration).clamp(0.0, 1.0)
        };
        if raw >= 1.0 {
            // Land exactly on the target, not on the interpolation's last
            // floating-point step.
            return (self.end_pos, self.end_heading, true);
        }
        let progress = ease_out_cubic(raw);
        match walk_along(&self.path, progress) {
            Some((pos, bearing)) => {
                (pos, self.start_heading.blend_towards(bearing, progress), false)
            }
            None => (self.end_pos, self.end_heading, true),
        }
    }
}

/// Eases quickly out of the gate and coasts into the target, hiding the
/// stop-start rhythm of a polled feed.
fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

/// Owns the rendered position of one vehicle marker.
#[derive(Debug)]
pub struct MarkerController {
    state: State,
    last_target: Option<Snapped>,
}

impl Default for MarkerController {
    fn default() -> MarkerController {
        MarkerController::new()
    }
}

impl MarkerController {
    pub fn new() -> MarkerController {
        MarkerController {
            state: State::Idle,
            last_target: None,
        }
    }

    /// Accepts a new snapped fix. `polyline` is the directional polyline the
    /// fix snapped to (possibly degenerate for off-route fixes); `now` is
    /// time since engine start.
    pub fn apply_target(
        &mut self,
        target: &Snapped,
        polyline: &PolyLine,
        now: Duration,
        config: &EngineConfig,
    ) {
        // First fix ever: appear in place, no animation.
        if matches!(self.state, State::Idle) {
            self.state = State::Settled {
                pos: target.pos,
                heading: target.heading,
            };
            self.last_target = Some(target.clone());
            return;
        }

        if let Some(prev) = &self.last_target {
            // An unchanged fix refreshes the heading at most.
            if prev.pos == target.pos && prev.place == target.place {
                if let State::Settled { heading, .. } = &mut self.state {
                    *heading = target.heading;
                }
                self.last_target = Some(target.clone());
                return;
            }
        }

        // Everything below restarts from wherever the marker is currently
        // drawn; a target applied mid-animation abandons the in-flight one.
        let (from_pos, from_heading) = self.displayed(now);

        let same_direction = self
            .last_target
            .as_ref()
            .map(|prev| prev.direction == target.direction)
            .unwrap_or(false);
        if same_direction {
            // The backward comparison is against the displayed position, not
            // the last target. Mid-animation those differ: a correction
            // behind the abandoned target but ahead of the marker is still
            // forward motion.
            let start = place_on(from_pos, polyline, config);
            if let (Some(start), Some(end)) = (start, target.place) {
                if is_backward(start, end) {
                    let dist = from_pos.gps_dist_meters(target.pos);
                    if dist <= config.jitter_tolerance {
                        // Jitter. Hold the marker where it's drawn and keep
                        // comparing future fixes against this spot.
                        self.state = State::Settled {
                            pos: from_pos,
                            heading: from_heading,
                        };
                        return;
                    }
                    debug!("marker jumped {} backward, teleporting", dist);
                    self.state = State::Settled {
                        pos: target.pos,
                        heading: target.heading,
                    };
                    self.last_target = Some(target.clone());
                    return;
                }
            }
        }

        let path = build_path(from_pos, target, polyline, config);
        if path.len() < 2 {
            self.state = State::Settled {
                pos: target.pos,
                heading: target.heading,
            };
        } else {
            self.state = State::Animating(Animation {
                path,
                start_time: now,
                duration: config.animation_duration,
                start_heading: from_heading,
                end_pos: target.pos,
                end_heading: target.heading,
            });
        }
        self.last_target = Some(target.clone());
    }

    /// Advances the animation and returns what to draw, or `None` before the
    /// first fix. Ticking a settled marker is idempotent.
    pub fn tick(&mut self, now: Duration) -> Option<Frame> {
        let direction = self.last_target.as_ref()?.direction;
        match &self.state {
            State::Idle => None,
            State::Settled { pos, heading } => Some(Frame {
                pos: *pos,
                heading: *heading,
                direction,
            }),
            State::Animating(anim) => {
                let (pos, heading, done) = anim.frame_at(now);
                if done {
                    self.state = State::Settled { pos, heading };
                }
                Some(Frame {
                    pos,
                    heading,
                    direction,
                })
            }
        }
    }

    /// Where the marker is currently drawn, without advancing state.
    fn displayed(&self, now: Duration) -> (LonLat, Angle) {
        match &self.state {
            State::Idle => (LonLat::new(0.0, 0.0), Angle::ZERO),
            State::Settled { pos, heading } => (*pos, *heading),
            State::Animating(anim) => {
                let (pos, heading, _) = anim.frame_at(now);
                (pos, heading)
            }
        }
    }
}

/// True when `end` sits earlier along the polyline than `start`.
fn is_backward(start: Place, end: Place) -> bool {
    end.segment_idx < start.segment_idx
        || (end.segment_idx == start.segment_idx && end.t + SAME_SPOT_EPSILON < start.t)
}

/// Where a point sits along the polyline, if it's close enough to count as
/// on-route.
fn place_on(pos: LonLat, polyline: &PolyLine, config: &EngineConfig) -> Option<Place> {
    let proj = polyline.project_pt(pos)?;
    if pos.gps_dist_meters(proj.pt) <= config.max_snap_distance {
        Some(Place {
            segment_idx: proj.segment_idx,
            t: proj.t,
        })
    } else {
        None
    }
}

/// The vertex path to animate along: the route path between the marker's
/// current projection and the target when both are on the polyline, a
/// straight line otherwise.
fn build_path(
    from_pos: LonLat,
    target: &Snapped,
    polyline: &PolyLine,
    config: &EngineConfig,
) -> Vec<LonLat> {
    if let Some(place) = target.place {
        if let Some(from_proj) = polyline.project_pt(from_pos) {
            if from_pos.gps_dist_meters(from_proj.pt) <= config.max_snap_distance {
                let end = Projection {
                    pt: target.pos,
                    segment_idx: place.segment_idx,
                    t: place.t,
                    heading: target.heading,
                };
                let path = polyline.path_between(&from_proj, &end);
                if path.len() >= 2 {
                    return path;
                }
                return Vec::new();
            }
        }
    }
    if from_pos == target.pos {
        Vec::new()
    } else {
        vec![from_pos, target.pos]
    }
}
