use crate::distance::{great_circle_distance, Coordinate};
use crate::geocode::{GeocodeError, Geocoder};
use crate::year_index::YearIndex;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub const MAX_CANDIDATES: usize = 10;
pub const MAX_DISTANCE_M: f64 = 1_000_000.0;

/// A resolved filming location within range of the reference point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub distance_m: f64,
    pub title: String,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPolicy {
    /// Stop once this many in-range candidates are collected.
    pub max_candidates: usize,
    /// Exclusive upper bound on distance, in meters.
    pub max_distance_m: f64,
    /// Geocoder calls allowed per region. `1` means no retry.
    pub attempts_per_region: u32,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            max_candidates: MAX_CANDIDATES,
            max_distance_m: MAX_DISTANCE_M,
            attempts_per_region: 1,
        }
    }
}

/// Walks `index` in order and keeps the first in-range hits.
///
/// This is not a nearest-k search: the result holds the first
/// `max_candidates` regions (in iteration order) that resolve to a point
/// strictly closer than `max_distance_m`. Regions the geocoder cannot
/// resolve are skipped.
pub fn select_closest<G: Geocoder>(
    index: &YearIndex,
    reference: Coordinate,
    geocoder: &mut G,
    policy: &SelectionPolicy,
) -> Vec<Candidate> {
    let mut result = Vec::new();
    if policy.max_candidates == 0 {
        return result;
    }

    let mut visited = 0usize;
    let mut skipped = 0usize;

    for (region, title) in index {
        if result.len() >= policy.max_candidates {
            break;
        }
        visited += 1;

        let coordinate = match resolve_with_policy(geocoder, region, policy.attempts_per_region) {
            Ok(c) => c,
            Err(e) => {
                debug!("Skipping region — region={:?} reason={}", region, e);
                skipped += 1;
                continue;
            }
        };

        let distance_m = great_circle_distance(reference, coordinate);
        if distance_m < policy.max_distance_m {
            debug!(
                "Accepted candidate — title={:?} region={:?} distance_m={:.0}",
                title, region, distance_m
            );
            result.push(Candidate {
                distance_m,
                title: title.clone(),
                coordinate,
            });
        } else {
            debug!(
                "Out of range — region={:?} distance_m={:.0}",
                region, distance_m
            );
        }
    }

    info!(
        "Candidate selection finished — regions={} visited={} skipped={} selected={}",
        index.len(),
        visited,
        skipped,
        result.len()
    );
    result
}

fn resolve_with_policy<G: Geocoder>(
    geocoder: &mut G,
    region: &str,
    attempts: u32,
) -> Result<Coordinate, GeocodeError> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match geocoder.resolve(region) {
            Err(e) if e.is_retryable() && attempt < attempts => {
                debug!(
                    "Retrying region — region={:?} attempt={} error={}",
                    region, attempt, e
                );
                attempt += 1;
            }
            Err(e) => {
                if attempts > 1 && e.is_retryable() {
                    warn!(
                        "Giving up on region — region={:?} attempts={} error={}",
                        region, attempts, e
                    );
                }
                return Err(e);
            }
            ok => return ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Answers from a table; anything not listed is `NoMatch`.
    struct TableGeocoder {
        table: HashMap<String, Result<Coordinate, GeocodeError>>,
        calls: Vec<String>,
    }

    impl TableGeocoder {
        fn new(entries: &[(&str, Result<Coordinate, GeocodeError>)]) -> Self {
            Self {
                table: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                calls: Vec::new(),
            }
        }
    }

    impl Geocoder for TableGeocoder {
        fn resolve(&mut self, name: &str) -> Result<Coordinate, GeocodeError> {
            self.calls.push(name.to_string());
            self.table
                .get(name)
                .cloned()
                .unwrap_or_else(|| Err(GeocodeError::NoMatch(name.to_string())))
        }
    }

    /// Fails with `Unavailable` a fixed number of times, then succeeds.
    struct Flaky {
        failures_left: u32,
        calls: u32,
    }

    impl Geocoder for Flaky {
        fn resolve(&mut self, _name: &str) -> Result<Coordinate, GeocodeError> {
            self.calls += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                Err(GeocodeError::Unavailable("503".into()))
            } else {
                Ok(Coordinate::new(0.0, 0.0))
            }
        }
    }

    fn index(entries: &[(&str, &str)]) -> YearIndex {
        entries
            .iter()
            .map(|(r, t)| (r.to_string(), t.to_string()))
            .collect()
    }

    const HOME: Coordinate = Coordinate { lat: 0.0, lon: 0.0 };

    #[test]
    fn test_out_of_range_is_dropped() {
        let idx = index(&[("a", "Near (2000)"), ("b", "Far (2000)")]);
        let mut geo = TableGeocoder::new(&[
            ("a", Ok(Coordinate::new(1.0, 1.0))),
            ("b", Ok(Coordinate::new(45.0, 45.0))),
        ]);
        let result = select_closest(&idx, HOME, &mut geo, &SelectionPolicy::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Near (2000)");
        assert!(result[0].distance_m < MAX_DISTANCE_M);
    }

    #[test]
    fn test_bound_is_exclusive() {
        // 1,000,000 m exactly along the equator.
        let lon = (MAX_DISTANCE_M / crate::distance::EARTH_RADIUS_M).to_degrees();
        let edge = Coordinate::new(0.0, lon);
        let d = great_circle_distance(HOME, edge);

        let idx = index(&[("edge", "Edge (2000)")]);
        let mut geo = TableGeocoder::new(&[("edge", Ok(edge))]);
        let policy = SelectionPolicy {
            max_distance_m: d,
            ..SelectionPolicy::default()
        };
        assert!(select_closest(&idx, HOME, &mut geo, &policy).is_empty());
    }

    #[test]
    fn test_stops_after_limit() {
        let names: Vec<String> = (0..25).map(|i| format!("region {:02}", i)).collect();
        let entries: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), "Film (2000)")).collect();
        let idx = index(&entries);
        let table: Vec<(&str, Result<Coordinate, GeocodeError>)> = names
            .iter()
            .map(|n| (n.as_str(), Ok(Coordinate::new(0.5, 0.5))))
            .collect();
        let mut geo = TableGeocoder::new(&table);

        let result = select_closest(&idx, HOME, &mut geo, &SelectionPolicy::default());
        assert_eq!(result.len(), MAX_CANDIDATES);
        assert_eq!(geo.calls.len(), MAX_CANDIDATES, "remaining regions must not be geocoded");
        assert_eq!(geo.calls[0], "region 00");
    }

    #[test]
    fn test_keeps_iteration_order_not_distance_order() {
        let idx = index(&[("a", "Farther (2000)"), ("b", "Closer (2000)")]);
        let mut geo = TableGeocoder::new(&[
            ("a", Ok(Coordinate::new(5.0, 0.0))),
            ("b", Ok(Coordinate::new(1.0, 0.0))),
        ]);
        let result = select_closest(&idx, HOME, &mut geo, &SelectionPolicy::default());
        let titles: Vec<&str> = result.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Farther (2000)", "Closer (2000)"]);
    }

    #[test]
    fn test_failures_are_skipped_once_each() {
        let idx = index(&[("down", "X (2000)"), ("junk", "Y (2000)"), ("ok", "Z (2000)")]);
        let mut geo = TableGeocoder::new(&[
            ("down", Err(GeocodeError::Unavailable("timeout".into()))),
            ("junk", Err(GeocodeError::Malformed("bad json".into()))),
            ("ok", Ok(Coordinate::new(0.0, 0.1))),
        ]);
        let result = select_closest(&idx, HOME, &mut geo, &SelectionPolicy::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Z (2000)");
        assert_eq!(geo.calls, vec!["down", "junk", "ok"]);
    }

    #[test]
    fn test_retry_policy() {
        let idx = index(&[("r", "Retry (2000)")]);

        let mut once = Flaky {
            failures_left: 2,
            calls: 0,
        };
        assert!(select_closest(&idx, HOME, &mut once, &SelectionPolicy::default()).is_empty());
        assert_eq!(once.calls, 1);

        let mut thrice = Flaky {
            failures_left: 2,
            calls: 0,
        };
        let policy = SelectionPolicy {
            attempts_per_region: 3,
            ..SelectionPolicy::default()
        };
        assert_eq!(select_closest(&idx, HOME, &mut thrice, &policy).len(), 1);
        assert_eq!(thrice.calls, 3);
    }

    #[test]
    fn test_no_match_is_never_retried() {
        let idx = index(&[("nowhere", "Lost (2000)")]);
        let mut geo = TableGeocoder::new(&[]);
        let policy = SelectionPolicy {
            attempts_per_region: 5,
            ..SelectionPolicy::default()
        };
        assert!(select_closest(&idx, HOME, &mut geo, &policy).is_empty());
        assert_eq!(geo.calls.len(), 1);
    }
}
