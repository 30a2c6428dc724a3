//! Station-to-station riding distances.

use std::collections::HashMap;

/// Distance reported for pairs the routing engine could not resolve.
pub const UNREACHABLE: i32 = -1;

/// Symmetric riding distance in meters between station ids.
///
/// Distances come from an external road router and are persisted by station
/// id, so the table is keyed by id rather than by arena index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationDistanceMatrix {
    distances: HashMap<String, HashMap<String, i32>>,
}

impl StationDistanceMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a distance for both orderings of the pair.
    pub fn add(&mut self, a: &str, b: &str, distance: i32) {
        self.distances
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string(), distance);
        self.distances
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string(), distance);
    }

    /// Distance in meters, or [`UNREACHABLE`] if unknown.
    ///
    /// # Examples
    ///
    /// ```
    /// use journey_router::bikes::{StationDistanceMatrix, UNREACHABLE};
    ///
    /// let mut m = StationDistanceMatrix::new();
    /// m.add("S1", "S2", 1200);
    /// assert_eq!(m.get("S2", "S1"), 1200);
    /// assert_eq!(m.get("S1", "S3"), UNREACHABLE);
    /// ```
    pub fn get(&self, a: &str, b: &str) -> i32 {
        self.distances
            .get(a)
            .and_then(|row| row.get(b))
            .copied()
            .unwrap_or(UNREACHABLE)
    }

    /// Whether the pair has an entry, even an unreachable one.
    pub fn has(&self, a: &str, b: &str) -> bool {
        self.distances.get(a).is_some_and(|row| row.contains_key(b))
    }

    /// Every recorded distance out of station `a`.
    pub fn from_station<'a>(&'a self, a: &str) -> impl Iterator<Item = (&'a str, i32)> + 'a {
        self.distances
            .get(a)
            .into_iter()
            .flat_map(|row| row.iter().map(|(b, d)| (b.as_str(), *d)))
    }

    /// Take over every entry of `other`, overwriting shared pairs.
    pub fn merge(&mut self, other: StationDistanceMatrix) {
        for (a, row) in other.distances {
            for (b, d) in row {
                self.add(&a, &b, d);
            }
        }
    }

    /// Number of unordered pairs.
    pub fn len(&self) -> usize {
        let directed: usize = self.distances.values().map(HashMap::len).sum();
        directed.div_ceil(2)
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}
