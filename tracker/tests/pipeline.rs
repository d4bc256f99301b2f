//! End-to-end run of the whole pipeline with a deterministic clock: parse a
//! route document, resolve and snap a sequence of fixes, and step the
//! animation frame by frame.

use std::collections::HashSet;

use geom::{Duration, LonLat};

use tracker::direction::{Direction, DirectionResolver, StopSequenceEntry};
use tracker::registry::{MarkerRegistry, RouteData};
use tracker::{EngineConfig, VehicleFix};

// Around lat 37.3, one degree of latitude is about 111,195 m.
const LAT_PER_METER: f64 = 1.0 / 111_195.0;

/// An out-and-back route: east along lat 37.300, turning at vertex 4, back
/// west along lat 37.301. Vertices are about 88 m apart.
fn route_document() -> String {
    let mut coords: Vec<[f64; 2]> = (0..5)
        .map(|i| [127.90 + 0.001 * i as f64, 37.300])
        .collect();
    coords.extend((0..4).map(|i| [127.903 - 0.001 * i as f64, 37.301]));
    serde_json::json!({
        "features": [{
            "geometry": { "coordinates": coords },
            "properties": {
                "indices": { "turn_idx": 4, "stop_to_coord": [0, 2, 6] },
                "stops": [
                    { "id": "S1", "ord": 1, "up_down": 1 },
                    { "id": "S2", "ord": 2, "up_down": 1 },
                    { "id": "S3", "ord": 3, "up_down": 0 }
                ]
            }
        }]
    })
    .to_string()
}

fn resolver() -> DirectionResolver {
    let entries = vec![
        entry("S1", 1, Direction::Outbound),
        entry("S2", 2, Direction::Outbound),
        entry("S3", 3, Direction::Inbound),
    ];
    let mut variants = HashSet::new();
    variants.insert("V1".to_string());
    DirectionResolver::new(entries, HashSet::new(), variants)
}

fn entry(stop: &str, order: u32, direction: Direction) -> StopSequenceEntry {
    StopSequenceEntry {
        route_variant: "V1".to_string(),
        stop_id: stop.to_string(),
        order,
        direction,
    }
}

fn fix(pos: LonLat, stop: &str, order: u32) -> VehicleFix {
    VehicleFix {
        vehicle_id: "1001".to_string(),
        pos,
        stop_id: stop.to_string(),
        stop_order: order,
        route_variant: Some("V1".to_string()),
    }
}

#[test]
fn fixes_flow_from_document_to_animated_frames() {
    let route = RouteData::from_document(&route_document(), resolver()).unwrap();
    let config = EngineConfig::default();
    let mut registry = MarkerRegistry::new(config);

    // First fix: 20 m south of the outbound line. It appears in place,
    // snapped onto the line.
    let raw = LonLat::new(127.9015, 37.300 - 20.0 * LAT_PER_METER);
    registry.apply_fixes("7", &route, &[fix(raw, "S1", 1)], Duration::ZERO);

    let frames = registry.frames(Duration::ZERO);
    assert_eq!(frames.len(), 1);
    let first = frames[0].1;
    assert_eq!(first.direction, Direction::Outbound);
    assert_eq!(first.pos.latitude, 37.300);
    assert!(raw.gps_dist_meters(first.pos) <= geom::Distance::meters(21.0));

    // Second fix, two segments farther along: the marker animates there.
    let ahead = LonLat::new(127.9035, 37.300);
    registry.apply_fixes("7", &route, &[fix(ahead, "S2", 2)], Duration::seconds(5.0));

    let mid = registry.frames(Duration::seconds(7.0))[0].1;
    assert!(mid.pos.longitude > first.pos.longitude);
    assert!(mid.pos.longitude < ahead.longitude);
    assert_eq!(mid.pos.latitude, 37.300);

    let done = registry.frames(Duration::seconds(9.0))[0].1;
    assert!(done.pos.gps_dist_meters(ahead) < geom::Distance::meters(0.01));

    // Third fix is past the turn, on the inbound side.
    let returning = LonLat::new(127.9025, 37.301 + 10.0 * LAT_PER_METER);
    registry.apply_fixes("7", &route, &[fix(returning, "S3", 3)], Duration::seconds(10.0));

    let back = registry.frames(Duration::seconds(14.0))[0].1;
    assert_eq!(back.direction, Direction::Inbound);
    assert_eq!(back.pos.latitude, 37.301);

    // The vehicle drops out of the feed; the marker goes with it.
    registry.apply_fixes("7", &route, &[], Duration::seconds(15.0));
    assert!(registry.is_empty());
    assert!(registry.frames(Duration::seconds(15.0)).is_empty());
}

#[test]
fn far_off_route_vehicles_render_raw() {
    let route = RouteData::from_document(&route_document(), resolver()).unwrap();
    let mut registry = MarkerRegistry::new(EngineConfig::default());

    // 500 m south of everything.
    let lost = LonLat::new(127.9015, 37.300 - 500.0 * LAT_PER_METER);
    registry.apply_fixes("7", &route, &[fix(lost, "S1", 1)], Duration::ZERO);

    let frame = registry.frames(Duration::ZERO)[0].1;
    assert_eq!(frame.pos, lost);
}

#[test]
fn malformed_documents_are_rejected_up_front() {
    assert!(RouteData::from_document("{broken", resolver()).is_err());
}
