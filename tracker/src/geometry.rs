//! Parses route-geometry documents into outbound/inbound coordinate
//! sequences. Several generations of the upstream data pipeline are still in
//! the wild, so the document's schema is detected first, then handed to one
//! pure splitting function per schema. Anything unusable degrades to empty
//! output; this module never panics on hostile input.

use anyhow::Result;
use serde::Deserialize;

use geom::LonLat;

use crate::direction::Direction;
use crate::snap::StopWindows;

/// A route-geometry document, GeoJSON-shaped. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct GeometryDoc {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub struct Feature {
    pub geometry: LineGeometry,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Deserialize)]
pub struct LineGeometry {
    /// GeoJSON order: `[longitude, latitude]`.
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Properties {
    pub indices: Option<Indices>,
    pub derived: Option<Derived>,
    /// Legacy multi-feature schema: "1" for outbound, "0" for inbound.
    pub updn_dir: Option<String>,
    /// Legacy multi-feature schema: where this piece starts in stop order.
    pub start_node_ord: Option<i64>,
    pub stops: Option<Vec<StopRef>>,
}

#[derive(Debug, Deserialize)]
pub struct Indices {
    /// Index of the vertex where outbound turns into inbound.
    pub turn_idx: Option<f64>,
    /// Per-stop index into the full coordinate array, aligned with
    /// `properties.stops`.
    pub stop_to_coord: Option<Vec<usize>>,
}

#[derive(Debug, Deserialize)]
pub struct Derived {
    pub geometry_index: Option<GeometryIndex>,
}

#[derive(Debug, Deserialize)]
pub struct GeometryIndex {
    pub segments: Option<Vec<RangeTag>>,
}

/// An explicit inclusive vertex range carrying its direction.
#[derive(Debug, Clone, Deserialize)]
pub struct RangeTag {
    pub dir: Direction,
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Deserialize)]
pub struct StopRef {
    pub id: String,
    pub ord: u32,
    /// 1 for outbound, 0 for inbound.
    pub up_down: u8,
}

/// The recognized document shapes, in the priority order they're probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometrySchema {
    /// One coordinate array with a turn-point index.
    TurnIndex,
    /// One coordinate array with explicit direction-tagged vertex ranges.
    DirectionRanges,
    /// Several features, each flagged 0/1 with a start order.
    LegacySegments,
    /// No metadata at all; split at the point farthest from the start.
    Unsplit,
}

/// The two directional coordinate-sequence sets of one route variant.
/// Either side may be empty when that direction is absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitPolylines {
    pub outbound: Vec<Vec<LonLat>>,
    pub inbound: Vec<Vec<LonLat>>,
}

/// Parses raw JSON into a document. This is the only fallible step; a
/// structurally valid document with unusable contents degrades downstream
/// instead of erroring.
pub fn parse_document(raw: &str) -> Result<GeometryDoc> {
    Ok(serde_json::from_str(raw)?)
}

pub fn classify(doc: &GeometryDoc) -> GeometrySchema {
    if let Some(first) = doc.features.first() {
        if first
            .properties
            .indices
            .as_ref()
            .and_then(|x| x.turn_idx)
            .is_some()
        {
            return GeometrySchema::TurnIndex;
        }
        if first
            .properties
            .derived
            .as_ref()
            .and_then(|d| d.geometry_index.as_ref())
            .and_then(|g| g.segments.as_ref())
            .map(|s| !s.is_empty())
            .unwrap_or(false)
        {
            return GeometrySchema::DirectionRanges;
        }
    }
    if doc.features.iter().any(|f| f.properties.updn_dir.is_some()) {
        return GeometrySchema::LegacySegments;
    }
    GeometrySchema::Unsplit
}

/// Splits a document into directional coordinate sets. Degenerate or
/// malformed input yields two empty sets.
pub fn transform(doc: &GeometryDoc) -> SplitPolylines {
    let first = match doc.features.first() {
        Some(f) => f,
        None => {
            warn!("route geometry document has no features");
            return SplitPolylines::default();
        }
    };
    match classify(doc) {
        GeometrySchema::TurnIndex => {
            let turn_idx = first
                .properties
                .indices
                .as_ref()
                .and_then(|x| x.turn_idx)
                .unwrap_or(0.0);
            split_at_turn(&coords_of(first), clamp_turn_idx(turn_idx, first))
        }
        GeometrySchema::DirectionRanges => {
            let ranges = first
                .properties
                .derived
                .as_ref()
                .and_then(|d| d.geometry_index.as_ref())
                .and_then(|g| g.segments.clone())
                .unwrap_or_default();
            split_ranges(&coords_of(first), ranges)
        }
        GeometrySchema::LegacySegments => split_legacy(&doc.features),
        GeometrySchema::Unsplit => {
            let coords = coords_of(first);
            split_at_turn(&coords, farthest_point_idx(&coords))
        }
    }
}

fn coords_of(feature: &Feature) -> Vec<LonLat> {
    feature
        .geometry
        .coordinates
        .iter()
        .map(|[lon, lat]| LonLat::new(*lon, *lat))
        .collect()
}

fn clamp_turn_idx(raw: f64, feature: &Feature) -> usize {
    let len = feature.geometry.coordinates.len();
    if len == 0 {
        return 0;
    }
    (raw.round() as i64).clamp(0, (len - 1) as i64) as usize
}

/// Outbound runs from the start to the turn vertex, inbound from the turn
/// vertex to the end; the turn vertex belongs to both halves. Halves with
/// fewer than 2 points are dropped.
fn split_at_turn(coords: &[LonLat], turn_idx: usize) -> SplitPolylines {
    if coords.len() < 2 {
        return SplitPolylines::default();
    }
    let idx = turn_idx.min(coords.len() - 1);
    let outbound = coords[..=idx].to_vec();
    let inbound = coords[idx..].to_vec();
    SplitPolylines {
        outbound: keep_if_line(outbound),
        inbound: keep_if_line(inbound),
    }
}

fn keep_if_line(seq: Vec<LonLat>) -> Vec<Vec<LonLat>> {
    if seq.len() >= 2 {
        vec![seq]
    } else {
        Vec::new()
    }
}

fn split_ranges(coords: &[LonLat], mut ranges: Vec<RangeTag>) -> SplitPolylines {
    if coords.len() < 2 {
        return SplitPolylines::default();
    }
    ranges.sort_by_key(|r| r.from);

    let mut result = SplitPolylines::default();
    let last = coords.len() - 1;
    for range in ranges {
        let from = range.from.min(last);
        let to = range.to.min(last);
        if to <= from {
            // A degenerate range can't hold a segment.
            continue;
        }
        let slice = coords[from..=to].to_vec();
        match range.dir {
            Direction::Outbound => result.outbound.push(slice),
            Direction::Inbound => result.inbound.push(slice),
        }
    }
    result
}

fn split_legacy(features: &[Feature]) -> SplitPolylines {
    let mut outbound: Vec<(i64, Vec<LonLat>)> = Vec::new();
    let mut inbound: Vec<(i64, Vec<LonLat>)> = Vec::new();

    for feature in features {
        let dir = match feature.properties.updn_dir.as_deref() {
            Some("1") => Direction::Outbound,
            Some("0") => Direction::Inbound,
            Some(other) => {
                warn!("skipping geometry piece with unknown direction flag {:?}", other);
                continue;
            }
            None => continue,
        };
        let order = feature.properties.start_node_ord.unwrap_or(0);
        let coords = coords_of(feature);
        if coords.len() < 2 {
            continue;
        }
        match dir {
            Direction::Outbound => outbound.push((order, coords)),
            Direction::Inbound => inbound.push((order, coords)),
        }
    }

    outbound.sort_by_key(|(order, _)| *order);
    inbound.sort_by_key(|(order, _)| *order);
    SplitPolylines {
        outbound: outbound.into_iter().map(|(_, c)| c).collect(),
        inbound: inbound.into_iter().map(|(_, c)| c).collect(),
    }
}

/// With no metadata, guess the turn point: where the vehicle is farthest from
/// where it started.
fn farthest_point_idx(coords: &[LonLat]) -> usize {
    let start = match coords.first() {
        Some(pt) => *pt,
        None => return 0,
    };
    let mut best = (0, 0.0);
    for (i, pt) in coords.iter().enumerate() {
        let d = start.planar_dist_sq(*pt);
        if d > best.1 {
            best = (i, d);
        }
    }
    best.0
}

/// Builds per-direction stop search windows from the turn-index schema's
/// stop-to-coordinate map, so the snapper can restrict its segment scan.
/// `None` when the document doesn't carry the needed indices.
pub fn stop_windows(doc: &GeometryDoc) -> Option<StopWindows> {
    if classify(doc) != GeometrySchema::TurnIndex {
        return None;
    }
    let first = doc.features.first()?;
    let indices = first.properties.indices.as_ref()?;
    let stops = first.properties.stops.as_ref()?;
    let stop_to_coord = indices.stop_to_coord.as_ref()?;
    let turn = clamp_turn_idx(indices.turn_idx?, first);
    let len = first.geometry.coordinates.len();
    if len < 2 {
        return None;
    }

    let mut windows = StopWindows::default();
    for (stop, coord) in stops.iter().zip(stop_to_coord.iter()) {
        let coord = (*coord).min(len - 1);
        if stop.up_down == 1 {
            // Outbound half spans vertices [0, turn]; its last segment index
            // is turn - 1.
            if turn >= 1 {
                windows
                    .outbound
                    .insert(stop.ord, coord.min(turn.saturating_sub(1)));
            }
        } else {
            // Inbound half spans vertices [turn, len - 1], reindexed from 0.
            if len - turn >= 2 {
                let center = coord.saturating_sub(turn).min(len - turn - 2);
                windows.inbound.insert(stop.ord, center);
            }
        }
    }
    Some(windows)
}
