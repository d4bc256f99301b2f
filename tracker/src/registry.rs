//! Owns every marker on the map, keyed by route and vehicle. Each poll's fix
//! list replaces the previous one wholesale: vehicles that vanished from the
//! feed are dropped, new ones appear, and survivors animate towards their
//! fresh targets.

use std::collections::{BTreeMap, HashSet};

use anyhow::Result;

use geom::{Duration, PolyLine};

use crate::animate::{Frame, MarkerController};
use crate::direction::{Direction, DirectionResolver};
use crate::geometry;
use crate::snap::{self, Snapped, StopWindows};
use crate::{EngineConfig, VehicleFix};

/// Identifies one marker: (route name, vehicle id).
pub type MarkerKey = (String, String);

/// Everything static about one route: its directional polylines, the
/// direction resolver built from its stop sequences, and the stop search
/// windows when the geometry document carries them.
pub struct RouteData {
    outbound: PolyLine,
    inbound: PolyLine,
    resolver: DirectionResolver,
    windows: StopWindows,
}

impl RouteData {
    /// Parses a raw route-geometry document and pairs it with a prebuilt
    /// resolver. Fails only on malformed JSON; an unusable-but-valid
    /// document yields degenerate polylines and every fix renders raw.
    pub fn from_document(raw: &str, resolver: DirectionResolver) -> Result<RouteData> {
        let doc = geometry::parse_document(raw)?;
        let split = geometry::transform(&doc);
        let windows = geometry::stop_windows(&doc).unwrap_or_default();
        Ok(RouteData {
            outbound: PolyLine::merged(&split.outbound),
            inbound: PolyLine::merged(&split.inbound),
            resolver,
            windows,
        })
    }

    pub fn polyline(&self, dir: Direction) -> &PolyLine {
        match dir {
            Direction::Outbound => &self.outbound,
            Direction::Inbound => &self.inbound,
        }
    }

    /// Resolves a fix's direction and snaps it onto the route.
    pub fn snap_fix(&self, fix: &VehicleFix, config: &EngineConfig) -> Snapped {
        let resolved = self.resolver.resolve(
            &fix.stop_id,
            fix.stop_order,
            fix.route_variant.as_deref(),
        );
        snap::snap(
            fix,
            resolved,
            &self.outbound,
            &self.inbound,
            &self.windows,
            config,
        )
    }
}

/// The set of live marker controllers.
pub struct MarkerRegistry {
    config: EngineConfig,
    markers: BTreeMap<MarkerKey, MarkerController>,
}

impl MarkerRegistry {
    pub fn new(config: EngineConfig) -> MarkerRegistry {
        MarkerRegistry {
            config,
            markers: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Applies one poll's complete fix list for one route. Controllers for
    /// vehicles absent from `fixes` are removed; everything else gets a new
    /// snapped target.
    pub fn apply_fixes(
        &mut self,
        route_name: &str,
        route: &RouteData,
        fixes: &[VehicleFix],
        now: Duration,
    ) {
        let mut seen: HashSet<&str> = HashSet::new();
        for fix in fixes {
            seen.insert(&fix.vehicle_id);
            let snapped = route.snap_fix(fix, &self.config);
            let polyline = route.polyline(snapped.direction);
            let key = (route_name.to_string(), fix.vehicle_id.clone());
            self.markers
                .entry(key)
                .or_default()
                .apply_target(&snapped, polyline, now, &self.config);
        }

        let before = self.markers.len();
        self.markers
            .retain(|(r, v), _| r != route_name || seen.contains(v.as_str()));
        let dropped = before - self.markers.len();
        if dropped > 0 {
            info!("route {}: {} vehicle(s) left the feed", route_name, dropped);
        }
    }

    /// Advances every marker and collects the frames to draw.
    pub fn frames(&mut self, now: Duration) -> Vec<(MarkerKey, Frame)> {
        let mut result = Vec::with_capacity(self.markers.len());
        for (key, ctl) in &mut self.markers {
            if let Some(frame) = ctl.tick(now) {
                result.push((key.clone(), frame));
            }
        }
        result
    }

    /// Drops every marker belonging to one route, for when the user switches
    /// the route they're watching.
    pub fn clear_route(&mut self, route_name: &str) {
        self.markers.retain(|(r, _), _| r != route_name);
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }
}
