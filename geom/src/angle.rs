use std::fmt;

use serde::{Deserialize, Serialize};

/// A compass heading, stored in degrees. North is 0, east is 90.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    pub fn degrees(degs: f64) -> Angle {
        Angle(degs)
    }

    /// Returns the heading in `[0, 360)`.
    pub fn normalized_degrees(self) -> f64 {
        let d = self.0 % 360.0;
        if d < 0.0 {
            d + 360.0
        } else {
            d
        }
    }

    /// The signed rotation from this heading to the other, always taking the
    /// shorter way around the compass. The result is in `(-180, 180]`.
    pub fn shortest_rotation_towards(self, other: Angle) -> f64 {
        let mut diff = other.normalized_degrees() - self.normalized_degrees();
        if diff > 180.0 {
            diff -= 360.0;
        }
        if diff <= -180.0 {
            diff += 360.0;
        }
        diff
    }

    /// Partially rotates this heading towards the other along the shorter
    /// arc. `progress` is in [0, 1]; 0 stays here, 1 lands on the other
    /// heading. Blending 10 towards 350 halfway yields 0, never 180.
    pub fn blend_towards(self, other: Angle, progress: f64) -> Angle {
        let rotated = self.normalized_degrees() + progress * self.shortest_rotation_towards(other);
        Angle::degrees(rotated).normalized()
    }

    /// The same heading, stored in `[0, 360)`.
    pub fn normalized(self) -> Angle {
        Angle(self.normalized_degrees())
    }

    /// True when the two headings are within `epsilon_degrees` of each other,
    /// accounting for wraparound.
    pub fn approx_eq(self, other: Angle, epsilon_degrees: f64) -> bool {
        self.shortest_rotation_towards(other).abs() <= epsilon_degrees
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Angle({} degrees)", self.normalized_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_wraps_negatives() {
        assert_eq!(Angle::degrees(-90.0).normalized_degrees(), 270.0);
        assert_eq!(Angle::degrees(720.0).normalized_degrees(), 0.0);
        assert_eq!(Angle::degrees(359.5).normalized_degrees(), 359.5);
    }

    #[test]
    fn blend_takes_the_shortest_arc() {
        // Crossing north: halfway between 10 and 350 is 0, not 180.
        let mid = Angle::degrees(10.0).blend_towards(Angle::degrees(350.0), 0.5);
        assert!(mid.approx_eq(Angle::ZERO, 1e-9), "got {}", mid);

        let mid = Angle::degrees(350.0).blend_towards(Angle::degrees(10.0), 0.5);
        assert!(mid.approx_eq(Angle::ZERO, 1e-9), "got {}", mid);

        // No wraparound involved.
        let mid = Angle::degrees(40.0).blend_towards(Angle::degrees(60.0), 0.25);
        assert!(mid.approx_eq(Angle::degrees(45.0), 1e-9), "got {}", mid);
    }

    #[test]
    fn blend_endpoints_are_exact() {
        let from = Angle::degrees(123.4);
        let to = Angle::degrees(321.0);
        assert!(from.blend_towards(to, 0.0).approx_eq(from, 1e-9));
        assert!(from.blend_towards(to, 1.0).approx_eq(to, 1e-9));
    }
}
