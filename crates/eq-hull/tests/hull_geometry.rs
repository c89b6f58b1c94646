//! Hull geometry against analytically known point sets.

use eq_hull::{
    drop_dependent_dimensions, lower_convex_hull, restore_dependent_dimensions,
};
use nalgebra::DVector;
use std::collections::BTreeSet;

#[test]
fn paraboloid_grid_lower_hull_is_complete() {
    // Energy = (x-0.5)^2 + (y-0.5)^2 over a coarse grid: strictly convex,
    // so every grid point appears on the lower hull.
    let mut points = Vec::new();
    for i in 0..=4 {
        for j in 0..=4 {
            let x = i as f64 / 4.0;
            let y = j as f64 / 4.0;
            points.push(vec![x, y, (x - 0.5) * (x - 0.5) + (y - 0.5) * (y - 0.5)]);
        }
    }
    let facets = lower_convex_hull(&points, &BTreeSet::new()).unwrap();
    assert!(!facets.is_empty());
    let mut touched = BTreeSet::new();
    for f in &facets {
        assert_eq!(f.vertices.len(), 3);
        assert!(f.normal[2] < 0.0);
        touched.extend(f.vertices.iter().copied());
    }
    assert_eq!(touched.len(), points.len());
}

#[test]
fn hump_above_a_chord_never_reaches_the_hull() {
    let dependent: BTreeSet<usize> = [1].into_iter().collect();
    let mut points = Vec::new();
    for i in 0..=20 {
        let x = i as f64 / 20.0;
        // double well with a central hump
        let energy = (x - 0.2) * (x - 0.2) * (x - 0.8) * (x - 0.8) - 0.01;
        points.push(vec![x, 1.0 - x, energy]);
    }
    let facets = lower_convex_hull(&points, &dependent).unwrap();
    let mut touched = BTreeSet::new();
    for f in &facets {
        touched.extend(f.vertices.iter().copied());
    }
    // Hump region between the wells is strictly above the connecting chord
    for id in 7..=13 {
        assert!(!touched.contains(&id), "hump sample {id} leaked onto the hull");
    }
    // Well bottoms survive
    assert!(touched.contains(&4));
    assert!(touched.contains(&16));
}

#[test]
fn facet_basis_matrix_supports_containment() {
    let dependent: BTreeSet<usize> = [1].into_iter().collect();
    let points = vec![
        vec![0.0, 1.0, 0.5],
        vec![0.4, 0.6, -1.0],
        vec![0.6, 0.4, -1.0],
        vec![1.0, 0.0, 0.5],
    ];
    let facets = lower_convex_hull(&points, &dependent).unwrap();
    // The middle edge spans x in [0.4, 0.6]
    let middle = facets
        .iter()
        .find(|f| f.vertices == vec![1, 2])
        .expect("middle edge on the hull");
    assert!(middle.contains(&DVector::from_vec(vec![0.5, 1.0])));
    assert!(!middle.contains(&DVector::from_vec(vec![0.3, 1.0])));
    let bary = middle
        .barycentric(&DVector::from_vec(vec![0.5, 1.0]))
        .unwrap();
    assert!((bary.sum() - 1.0).abs() < 1e-9);
}

#[test]
fn dependent_round_trip_is_exact() {
    let dependent: BTreeSet<usize> = [1, 4].into_iter().collect();
    let point = [0.125, 0.875, 0.25, 0.25, 0.5];
    let dropped = drop_dependent_dimensions(&point, &dependent);
    let restored = restore_dependent_dimensions(&dropped, &dependent);
    assert_eq!(restored, point.to_vec());
}
