//! Disambiguates which travel direction a vehicle is running, using the
//! route's stop sequence. A fix tells us the stop the vehicle is at and that
//! stop's order in the schedule; the same physical stop can appear in both
//! directions (and in several route variants), so picking the right entry
//! takes a little care.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two canonical travel directions of a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outbound,
    Inbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Outbound => write!(f, "outbound"),
            Direction::Inbound => write!(f, "inbound"),
        }
    }
}

/// One stop's place in one route variant's schedule. Built once per route
/// and reused for every fix.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StopSequenceEntry {
    pub route_variant: String,
    pub stop_id: String,
    pub order: u32,
    pub direction: Direction,
}

/// Answers "which direction is a vehicle at this stop headed?" by a pure
/// lookup over a prebuilt map. Nothing here mutates after construction, so
/// repeated calls with the same inputs always agree.
pub struct DirectionResolver {
    by_stop: HashMap<String, Vec<StopSequenceEntry>>,
    /// Stops that are always on the outbound leg, no matter what the
    /// sequence data claims. Overrides everything.
    always_outbound: HashSet<String>,
    /// Variants currently scheduled for this route; used to narrow
    /// candidates when the fix's claimed variant doesn't match anything.
    active_variants: HashSet<String>,
}

impl DirectionResolver {
    pub fn new(
        entries: Vec<StopSequenceEntry>,
        always_outbound: HashSet<String>,
        active_variants: HashSet<String>,
    ) -> DirectionResolver {
        let mut by_stop: HashMap<String, Vec<StopSequenceEntry>> = HashMap::new();
        for entry in entries {
            by_stop.entry(entry.stop_id.clone()).or_default().push(entry);
        }
        DirectionResolver {
            by_stop,
            always_outbound,
            active_variants,
        }
    }

    /// Resolves the direction for a vehicle reported at `stop_id` with
    /// schedule order `order`, optionally hinted with the variant the feed
    /// claims. `None` when the stop is unknown or the id is blank.
    pub fn resolve(
        &self,
        stop_id: &str,
        order: u32,
        variant_hint: Option<&str>,
    ) -> Option<Direction> {
        let stop_id = stop_id.trim();
        if stop_id.is_empty() {
            debug!("can't resolve direction for a blank stop id");
            return None;
        }

        if self.always_outbound.contains(stop_id) {
            return Some(Direction::Outbound);
        }

        let all = match self.by_stop.get(stop_id) {
            Some(entries) => entries,
            None => {
                debug!("stop {} isn't in the sequence data", stop_id);
                return None;
            }
        };

        // Narrow to the claimed variant when possible, else to variants
        // actually running today, else consider everything.
        let matching_hint: Vec<&StopSequenceEntry> = match variant_hint {
            Some(hint) => all.iter().filter(|e| e.route_variant == hint).collect(),
            None => Vec::new(),
        };
        let candidates: Vec<&StopSequenceEntry> = if !matching_hint.is_empty() {
            matching_hint
        } else {
            let active: Vec<&StopSequenceEntry> = all
                .iter()
                .filter(|e| self.active_variants.contains(&e.route_variant))
                .collect();
            if !active.is_empty() {
                active
            } else {
                all.iter().collect()
            }
        };

        // An exact order match has diff 0 and wins; otherwise the nearest
        // order wins, ties going to the earlier stop in the route.
        candidates
            .into_iter()
            .min_by_key(|e| {
                let diff = (i64::from(e.order) - i64::from(order)).abs();
                (diff, e.order)
            })
            .map(|e| e.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(variant: &str, stop: &str, order: u32, direction: Direction) -> StopSequenceEntry {
        StopSequenceEntry {
            route_variant: variant.to_string(),
            stop_id: stop.to_string(),
            order,
            direction,
        }
    }

    fn resolver(entries: Vec<StopSequenceEntry>) -> DirectionResolver {
        DirectionResolver::new(entries, HashSet::new(), HashSet::new())
    }

    #[test]
    fn variant_hint_beats_other_variants() {
        // The same stop at the same order exists in two variants with
        // opposite directions; the hint settles it.
        let r = resolver(vec![
            entry("V1", "A", 5, Direction::Outbound),
            entry("V2", "A", 5, Direction::Inbound),
        ]);
        assert_eq!(r.resolve("A", 5, Some("V1")), Some(Direction::Outbound));
        assert_eq!(r.resolve("A", 5, Some("V2")), Some(Direction::Inbound));
    }

    #[test]
    fn falls_back_to_active_variants_then_everything() {
        let r = DirectionResolver::new(
            vec![
                entry("V1", "A", 3, Direction::Outbound),
                entry("V2", "A", 3, Direction::Inbound),
            ],
            HashSet::new(),
            ["V2".to_string()].into_iter().collect(),
        );
        // Unknown hint: restrict to the active variant V2.
        assert_eq!(r.resolve("A", 3, Some("V9")), Some(Direction::Inbound));
        // No active variants at all: the unrestricted set decides by order.
        let r = resolver(vec![
            entry("V1", "A", 2, Direction::Outbound),
            entry("V2", "A", 9, Direction::Inbound),
        ]);
        assert_eq!(r.resolve("A", 3, None), Some(Direction::Outbound));
    }

    #[test]
    fn nearest_order_wins_with_ties_to_earlier_stop() {
        let r = resolver(vec![
            entry("V1", "A", 4, Direction::Outbound),
            entry("V1", "A", 8, Direction::Inbound),
        ]);
        // 6 is equidistant from 4 and 8; the earlier order wins.
        assert_eq!(r.resolve("A", 6, None), Some(Direction::Outbound));
        assert_eq!(r.resolve("A", 7, None), Some(Direction::Inbound));
        // Exact match always wins.
        assert_eq!(r.resolve("A", 8, None), Some(Direction::Inbound));
    }

    #[test]
    fn override_set_takes_precedence() {
        let r = DirectionResolver::new(
            vec![entry("V1", "A", 1, Direction::Inbound)],
            ["A".to_string()].into_iter().collect(),
            HashSet::new(),
        );
        assert_eq!(r.resolve("A", 1, None), Some(Direction::Outbound));
    }

    #[test]
    fn invalid_or_unknown_stops_resolve_to_none() {
        let r = resolver(vec![entry("V1", "A", 1, Direction::Outbound)]);
        assert_eq!(r.resolve("", 1, None), None);
        assert_eq!(r.resolve("   ", 1, None), None);
        assert_eq!(r.resolve("B", 1, None), None);
    }

    #[test]
    fn resolution_is_a_pure_read() {
        let r = resolver(vec![
            entry("V1", "A", 5, Direction::Outbound),
            entry("V2", "A", 5, Direction::Inbound),
        ]);
        let first = r.resolve("A", 5, Some("V1"));
        for _ in 0..10 {
            assert_eq!(r.resolve("A", 5, Some("V1")), first);
        }
    }
}
