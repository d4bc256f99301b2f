use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::{Angle, Distance, LonLat};

/// An ordered sequence of GPS vertices for one travel direction of a route.
///
/// Unlike a strict geometric polyline, this may hold fewer than 2 points;
/// route geometry arrives from the outside world and degenerate inputs have
/// to degrade instead of panicking. Everything that needs at least one
/// segment returns `Option`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolyLine {
    pts: Vec<LonLat>,
}

/// The nearest point on a polyline to some query point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub pt: LonLat,
    /// Index of the segment containing the projection; segment `i` spans
    /// vertices `i` and `i + 1`.
    pub segment_idx: usize,
    /// Position within that segment, clamped to [0, 1].
    pub t: f64,
    /// Bearing of the winning segment.
    pub heading: Angle,
}

impl PolyLine {
    pub fn new(pts: Vec<LonLat>) -> PolyLine {
        PolyLine { pts }
    }

    /// Flattens several coordinate sequences into one polyline, dropping
    /// consecutive duplicate vertices.
    pub fn merged(sequences: &[Vec<LonLat>]) -> PolyLine {
        let mut pts: Vec<LonLat> = Vec::new();
        for seq in sequences {
            for pt in seq {
                if pts.last() != Some(pt) {
                    pts.push(*pt);
                }
            }
        }
        PolyLine::new(pts)
    }

    pub fn empty() -> PolyLine {
        PolyLine { pts: Vec::new() }
    }

    pub fn points(&self) -> &[LonLat] {
        &self.pts
    }

    pub fn len(&self) -> usize {
        self.pts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pts.is_empty()
    }

    /// True when there's no segment to project onto or walk along.
    pub fn is_degenerate(&self) -> bool {
        self.pts.len() < 2
    }

    fn num_segments(&self) -> usize {
        self.pts.len().saturating_sub(1)
    }

    /// Projects a point onto the nearest segment, scanning every segment.
    /// `None` for degenerate polylines.
    pub fn project_pt(&self, pt: LonLat) -> Option<Projection> {
        if self.is_degenerate() {
            return None;
        }
        self.project_pt_within(pt, 0..=self.num_segments() - 1)
    }

    /// Projects a point onto the nearest segment among the given inclusive
    /// segment-index range. Indices out of bounds are clamped. `None` for
    /// degenerate polylines.
    pub fn project_pt_within(
        &self,
        pt: LonLat,
        window: RangeInclusive<usize>,
    ) -> Option<Projection> {
        if self.is_degenerate() {
            return None;
        }
        let last_seg = self.num_segments() - 1;
        let first = (*window.start()).min(last_seg);
        let last = (*window.end()).min(last_seg);

        // Work in a locally-flat frame: longitude scaled by cos(latitude).
        // Curvature over a road segment is far below GPS noise.
        let scale = pt.latitude.to_radians().cos();

        let mut best: Option<(f64, Projection)> = None;
        for i in first..=last {
            let a = self.pts[i];
            let b = self.pts[i + 1];

            let ap_x = (pt.longitude - a.longitude) * scale;
            let ap_y = pt.latitude - a.latitude;
            let ab_x = (b.longitude - a.longitude) * scale;
            let ab_y = b.latitude - a.latitude;

            let ab_sq = ab_x * ab_x + ab_y * ab_y;
            let t = if ab_sq > 0.0 {
                ((ap_x * ab_x + ap_y * ab_y) / ab_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let proj = LonLat::new(
                a.longitude + (b.longitude - a.longitude) * t,
                a.latitude + (b.latitude - a.latitude) * t,
            );
            let d_x = (pt.longitude - proj.longitude) * scale;
            let d_y = pt.latitude - proj.latitude;
            let dist_sq = d_x * d_x + d_y * d_y;

            if best.map(|(d, _)| dist_sq < d).unwrap_or(true) {
                best = Some((
                    dist_sq,
                    Projection {
                        pt: proj,
                        segment_idx: i,
                        t,
                        heading: a.bearing_to(b),
                    },
                ));
            }
        }
        best.map(|(_, proj)| proj)
    }

    /// The vertex path from one projection to another: the start point, every
    /// vertex strictly between the two segments (in travel order), and the
    /// end point. Consecutive duplicates are dropped so the result never
    /// contains a zero-length segment.
    pub fn path_between(&self, start: &Projection, end: &Projection) -> Vec<LonLat> {
        let mut path = vec![start.pt];
        if end.segment_idx > start.segment_idx {
            for i in (start.segment_idx + 1)..=end.segment_idx {
                push_dedup(&mut path, self.pts[i]);
            }
        } else if end.segment_idx < start.segment_idx {
            for i in ((end.segment_idx + 1)..=start.segment_idx).rev() {
                push_dedup(&mut path, self.pts[i]);
            }
        }
        push_dedup(&mut path, end.pt);
        path
    }
}

fn push_dedup(path: &mut Vec<LonLat>, pt: LonLat) {
    if path.last() != Some(&pt) {
        path.push(pt);
    }
}

/// Walks `fraction` (in [0, 1]) of the total length along a vertex path,
/// measuring by cumulative great-circle segment length. Returns the
/// interpolated point and the bearing of the segment containing it, or `None`
/// when the path has no length at all.
pub fn walk_along(path: &[LonLat], fraction: f64) -> Option<(LonLat, Angle)> {
    if path.len() < 2 {
        return None;
    }

    let mut cumulative = vec![Distance::ZERO];
    for pair in path.windows(2) {
        let so_far = *cumulative.last().unwrap();
        cumulative.push(so_far + pair[0].gps_dist_meters(pair[1]));
    }
    let total = *cumulative.last().unwrap();
    if total == Distance::ZERO {
        return None;
    }

    let target = total * fraction.clamp(0.0, 1.0);
    let mut idx = 0;
    for i in 1..cumulative.len() {
        idx = i - 1;
        if cumulative[i] >= target {
            break;
        }
    }

    let seg_len = cumulative[idx + 1] - cumulative[idx];
    let t = (target - cumulative[idx]).safe_percent(seg_len);
    let p1 = path[idx];
    let p2 = path[idx + 1];
    let pt = LonLat::new(
        p1.longitude + (p2.longitude - p1.longitude) * t,
        p1.latitude + (p2.latitude - p1.latitude) * t,
    );
    Some((pt, p1.bearing_to(p2)))
}

impl fmt::Display for PolyLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "PolyLine::new(vec![")?;
        for pt in &self.pts {
            writeln!(f, "  LonLat::new({}, {}),", pt.longitude, pt.latitude)?;
        }
        write!(f, "])")
    }
}
