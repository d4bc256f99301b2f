//! Typed geometric primitives for working with GPS tracks and route
//! geometry: distances, durations, compass headings, and polylines in
//! lat/lng space.

use serde::{Deserialize, Deserializer, Serializer};

mod angle;
mod distance;
mod duration;
mod gps;
mod polyline;

pub use crate::angle::Angle;
pub use crate::distance::Distance;
pub use crate::duration::Duration;
pub use crate::gps::LonLat;
pub use crate::polyline::{walk_along, PolyLine, Projection};

// Only for quantities measured in meters or seconds. Never round lat/lng
// values -- at that scale, the 4th decimal place is tens of meters.
pub(crate) fn trim_f64(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

pub(crate) fn serialize_f64<S: Serializer>(x: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(*x)
}

pub(crate) fn deserialize_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    f64::deserialize(d)
}
