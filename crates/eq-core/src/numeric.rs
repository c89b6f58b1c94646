//! Numeric predicates shared by the hull and tie-point stages.
//!
//! The engine compares coordinates in two fixed ways: candidate hull points
//! are deduplicated by near-exact coordinate equality, and tie-line lengths
//! are Euclidean distances over internal coordinates. The deduplication
//! tolerance is part of the behavioral contract (facet vertices recovered
//! from different subdivision cells may coincide), so it lives here rather
//! than at the call sites.

/// Two candidate points closer than this in every coordinate are the same
/// point.
pub const POINT_EQUALITY_TOLERANCE: f64 = 1e-20;

/// Coordinate-wise near-exact equality: the point-deduplication predicate.
/// Slices of different lengths are never the same point.
pub fn same_point(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| (x - y).abs() <= POINT_EQUALITY_TOLERANCE)
}

/// Euclidean distance between two coordinate slices of equal length. Used
/// for the critical-edge-length test on internal coordinates.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
