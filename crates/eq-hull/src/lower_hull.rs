//! Incremental lower convex hull in general dimension.
//!
//! Beneath-beyond construction: seed an initial simplex from affinely
//! independent points, then insert remaining points one at a time, replacing
//! every facet visible from the new point with a fan over its horizon
//! ridges. Facets whose outward normal points down in the energy coordinate
//! (always the last reduced coordinate) form the lower hull.
//!
//! Reference: N. Perevoshchikova et al., Computational Materials Science 66
//! (2013): a convex hull grid minimization of Gibbs energy as the initial
//! step in equilibrium calculations.

use crate::error::{HullError, HullResult};
use crate::facet::Facet;
use nalgebra::{DMatrix, DVector};
use std::collections::{BTreeSet, HashMap};

struct WorkingFacet {
    vertices: Vec<usize>,
    normal: DVector<f64>,
    offset: f64,
    alive: bool,
}

/// Compute the facets of the lower convex hull.
///
/// `points` are full-dimensional with the energy as the last coordinate;
/// `dependent_dimensions` lists coordinates to drop from geometric
/// consideration (they stay in place for the basis matrix). Degenerate
/// inputs yield a single degenerate facet: one point, or at most as many
/// points as reduced dimensions.
pub fn lower_convex_hull(
    points: &[Vec<f64>],
    dependent_dimensions: &BTreeSet<usize>,
) -> HullResult<Vec<Facet>> {
    if points.is_empty() {
        return Err(HullError::EmptyInput);
    }
    let full_dim = points[0].len();
    for p in points {
        if p.len() != full_dim {
            return Err(HullError::DimensionMismatch {
                expected: full_dim,
                got: p.len(),
            });
        }
    }
    let keep: Vec<usize> = (0..full_dim)
        .filter(|i| !dependent_dimensions.contains(i))
        .collect();
    let dim = keep.len();
    let n_points = points.len();

    if n_points == 1 {
        return Ok(vec![Facet::degenerate(vec![0])]);
    }
    if n_points <= dim || dim < 2 {
        return Ok(vec![Facet::degenerate((0..n_points).collect())]);
    }

    let reduced: Vec<DVector<f64>> = points
        .iter()
        .map(|p| DVector::from_iterator(dim, keep.iter().map(|&i| p[i])))
        .collect();
    let scale = reduced
        .iter()
        .flat_map(|p| p.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let tol = 1e-9 * scale.max(1.0);

    let Some(simplex) = initial_simplex(&reduced, dim, tol) else {
        // Affinely degenerate cloud: the lower envelope collapses onto the
        // minimum-energy point.
        let argmin = (0..n_points)
            .min_by(|&a, &b| {
                reduced[a][dim - 1]
                    .partial_cmp(&reduced[b][dim - 1])
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(0);
        return Ok(vec![Facet::degenerate(vec![argmin])]);
    };

    // Interior reference: the simplex centroid stays interior as the hull grows.
    let mut interior = DVector::<f64>::zeros(dim);
    for &v in &simplex {
        interior += &reduced[v];
    }
    interior /= simplex.len() as f64;

    let mut facets: Vec<WorkingFacet> = Vec::new();
    for exclude in 0..simplex.len() {
        let vertices: Vec<usize> = simplex
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != exclude)
            .map(|(_, &v)| v)
            .collect();
        if let Some(facet) = oriented_facet(&reduced, vertices, &interior, dim) {
            facets.push(facet);
        }
    }

    let in_simplex: BTreeSet<usize> = simplex.iter().copied().collect();
    for p in 0..n_points {
        if in_simplex.contains(&p) {
            continue;
        }
        let visible: Vec<usize> = facets
            .iter()
            .enumerate()
            .filter(|(_, f)| f.alive && f.normal.dot(&reduced[p]) - f.offset > tol)
            .map(|(i, _)| i)
            .collect();
        if visible.is_empty() {
            continue; // beneath every facet
        }

        // Horizon ridges are shared by exactly one visible facet.
        let mut ridge_count: HashMap<Vec<usize>, usize> = HashMap::new();
        for &fi in &visible {
            for skip in 0..facets[fi].vertices.len() {
                let mut ridge: Vec<usize> = facets[fi]
                    .vertices
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != skip)
                    .map(|(_, &v)| v)
                    .collect();
                ridge.sort_unstable();
                *ridge_count.entry(ridge).or_insert(0) += 1;
            }
        }
        for &fi in &visible {
            facets[fi].alive = false;
        }
        for (ridge, count) in ridge_count {
            if count != 1 {
                continue;
            }
            let mut vertices = ridge;
            vertices.push(p);
            if let Some(facet) = oriented_facet(&reduced, vertices, &interior, dim) {
                facets.push(facet);
            }
        }
    }

    // Keep the lower hull: outward normal with negative energy component.
    let mut lower = Vec::new();
    for f in facets.into_iter().filter(|f| f.alive) {
        if f.normal[dim - 1] >= 0.0 {
            continue;
        }
        let mut vertices = f.vertices;
        vertices.sort_unstable();
        let mut normal: Vec<f64> = f.normal.iter().copied().collect();
        normal.push(f.offset);
        let area = facet_area(&reduced, &vertices, dim);
        let basis_matrix = basis_matrix(points, &vertices, full_dim);
        lower.push(Facet {
            vertices,
            normal,
            area,
            basis_matrix,
        });
    }
    Ok(lower)
}

/// Greedily pick dim+1 affinely independent points, tracking an orthonormal
/// basis of the spanned directions.
fn initial_simplex(points: &[DVector<f64>], dim: usize, tol: f64) -> Option<Vec<usize>> {
    let mut chosen = vec![0usize];
    let mut basis: Vec<DVector<f64>> = Vec::new();
    while chosen.len() < dim + 1 {
        let origin = &points[chosen[0]];
        let mut best: Option<(usize, f64, DVector<f64>)> = None;
        for (i, point) in points.iter().enumerate() {
            if chosen.contains(&i) {
                continue;
            }
            let mut residual = point - origin;
            for b in &basis {
                let projection = b.dot(&residual);
                residual -= b * projection;
            }
            let norm = residual.norm();
            if best.as_ref().map_or(true, |(_, n, _)| norm > *n) {
                best = Some((i, norm, residual));
            }
        }
        match best {
            Some((i, norm, residual)) if norm > tol => {
                chosen.push(i);
                basis.push(residual / norm);
            }
            _ => return None,
        }
    }
    Some(chosen)
}

/// Hyperplane through the facet's vertices, oriented away from the interior
/// point. Returns None for numerically degenerate vertex sets.
fn oriented_facet(
    points: &[DVector<f64>],
    vertices: Vec<usize>,
    interior: &DVector<f64>,
    dim: usize,
) -> Option<WorkingFacet> {
    let (mut normal, mut offset) = facet_hyperplane(points, &vertices, dim)?;
    if normal.dot(interior) - offset > 0.0 {
        normal = -normal;
        offset = -offset;
    }
    Some(WorkingFacet {
        vertices,
        normal,
        offset,
        alive: true,
    })
}

/// Solve for the unit normal of the hyperplane spanned by the facet's edge
/// vectors: the edge rows annihilate the normal, and one trial unit row pins
/// the scale. Trial rows are attempted until the system is invertible.
fn facet_hyperplane(
    points: &[DVector<f64>],
    vertices: &[usize],
    dim: usize,
) -> Option<(DVector<f64>, f64)> {
    debug_assert_eq!(vertices.len(), dim);
    let origin = &points[vertices[0]];
    let mut system = DMatrix::<f64>::zeros(dim, dim);
    for (row, &v) in vertices[1..].iter().enumerate() {
        let edge = &points[v] - origin;
        for col in 0..dim {
            system[(row, col)] = edge[col];
        }
    }
    let mut rhs = DVector::<f64>::zeros(dim);
    rhs[dim - 1] = 1.0;
    // The trial row pins the normal's k-th component to 1; the
    // smallest-norm solution across k is the best conditioned one.
    let mut best: Option<DVector<f64>> = None;
    for k in 0..dim {
        let mut trial = system.clone();
        for col in 0..dim {
            trial[(dim - 1, col)] = 0.0;
        }
        trial[(dim - 1, k)] = 1.0;
        if let Some(solution) = trial.lu().solve(&rhs) {
            let norm = solution.norm();
            if norm > 1e-12 && solution.iter().all(|v| v.is_finite())
                && best.as_ref().map_or(true, |b| norm < b.norm())
            {
                best = Some(solution);
            }
        }
    }
    best.map(|solution| {
        let normal = solution.normalize();
        let offset = normal.dot(origin);
        (normal, offset)
    })
}

/// (dim-1)-dimensional simplex content via the Gram determinant.
fn facet_area(points: &[DVector<f64>], vertices: &[usize], dim: usize) -> f64 {
    let k = vertices.len().saturating_sub(1);
    if k == 0 {
        return 0.0;
    }
    let origin = &points[vertices[0]];
    let mut edges = DMatrix::<f64>::zeros(k, dim);
    for (row, &v) in vertices[1..].iter().enumerate() {
        let edge = &points[v] - origin;
        for col in 0..dim {
            edges[(row, col)] = edge[col];
        }
    }
    let gram = &edges * edges.transpose();
    let det = gram.determinant().max(0.0);
    let mut factorial = 1.0;
    for i in 2..=k {
        factorial *= i as f64;
    }
    det.sqrt() / factorial
}

/// Inverse of the augmented vertex matrix: columns are [all non-energy
/// coordinates of a vertex; last row ones]. Only built when the system is
/// square (vertex count == full dimension - 1) and invertible.
fn basis_matrix(points: &[Vec<f64>], vertices: &[usize], full_dim: usize) -> DMatrix<f64> {
    let size = full_dim - 1;
    if vertices.len() != size || size == 0 {
        return DMatrix::zeros(0, 0);
    }
    let mut augmented = DMatrix::<f64>::zeros(size, size);
    for (col, &v) in vertices.iter().enumerate() {
        for row in 0..size.saturating_sub(1) {
            augmented[(row, col)] = points[v][row];
        }
        augmented[(size - 1, col)] = 1.0;
    }
    augmented.try_inverse().unwrap_or_else(|| DMatrix::zeros(0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_deps() -> BTreeSet<usize> {
        BTreeSet::new()
    }

    #[test]
    fn single_point_is_degenerate() {
        let facets = lower_convex_hull(&[vec![0.5, -100.0]], &no_deps()).unwrap();
        assert_eq!(facets.len(), 1);
        assert!(facets[0].is_degenerate());
        assert_eq!(facets[0].vertices, vec![0]);
    }

    #[test]
    fn too_few_points_return_all() {
        let facets =
            lower_convex_hull(&[vec![0.0, -1.0], vec![1.0, -2.0]], &no_deps()).unwrap();
        assert_eq!(facets.len(), 1);
        assert!(facets[0].is_degenerate());
        assert_eq!(facets[0].vertices, vec![0, 1]);
    }

    #[test]
    fn convex_curve_keeps_every_edge() {
        // Energy = (x - 0.5)^2: strictly convex, so every consecutive pair
        // of samples is a lower-hull edge and no sample is discarded.
        let points: Vec<Vec<f64>> = (0..=10)
            .map(|i| {
                let x = i as f64 / 10.0;
                vec![x, (x - 0.5) * (x - 0.5)]
            })
            .collect();
        let facets = lower_convex_hull(&points, &no_deps()).unwrap();
        assert_eq!(facets.len(), 10);
        let mut touched = BTreeSet::new();
        for f in &facets {
            assert_eq!(f.vertices.len(), 2);
            touched.extend(f.vertices.iter().copied());
            // lower orientation: energy component of the normal is negative
            assert!(f.normal[1] < 0.0);
        }
        assert_eq!(touched.len(), 11);
    }

    #[test]
    fn non_convex_dip_is_excluded() {
        // W-shaped energy: the middle bump (index 2) is above the chord
        // between the two minima and must not survive on the lower hull.
        let points = vec![
            vec![0.0, 0.0],
            vec![0.25, -1.0],
            vec![0.5, -0.4],
            vec![0.75, -1.0],
            vec![1.0, 0.0],
        ];
        let facets = lower_convex_hull(&points, &no_deps()).unwrap();
        let mut touched = BTreeSet::new();
        for f in &facets {
            touched.extend(f.vertices.iter().copied());
        }
        assert!(touched.contains(&1));
        assert!(touched.contains(&3));
        assert!(!touched.contains(&2), "bump must be beneath the hull");
    }

    #[test]
    fn tetrahedron_lower_facets_touch_the_apex() {
        let points = vec![
            vec![0.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.3, 0.3, -1.0],
        ];
        let facets = lower_convex_hull(&points, &no_deps()).unwrap();
        assert_eq!(facets.len(), 3);
        for f in &facets {
            assert!(f.vertices.contains(&3), "lower facets hang from the apex");
            assert!(f.normal[2] < 0.0);
            assert!(f.area > 0.0);
        }
    }

    #[test]
    fn dependent_dimension_is_ignored_geometrically() {
        // Binary global points (x_A, x_B, energy) with x_B dependent: the
        // hull must behave exactly like the 2-D (x_A, energy) problem.
        let dependent: BTreeSet<usize> = [1].into_iter().collect();
        let points = vec![
            vec![0.0, 1.0, 0.0],
            vec![0.25, 0.75, -1.0],
            vec![0.5, 0.5, -0.4],
            vec![0.75, 0.25, -1.0],
            vec![1.0, 0.0, 0.0],
        ];
        let facets = lower_convex_hull(&points, &dependent).unwrap();
        let mut touched = BTreeSet::new();
        for f in &facets {
            touched.extend(f.vertices.iter().copied());
            // basis matrix is square (2x2) here and invertible
            assert_eq!(f.basis_matrix.shape(), (2, 2));
        }
        assert!(!touched.contains(&2));
    }

    #[test]
    fn affinely_degenerate_cloud_collapses_to_minimum_energy() {
        // All points share x: no simplex exists; the envelope is the min.
        let points = vec![
            vec![0.5, -10.0],
            vec![0.5, -30.0],
            vec![0.5, -20.0],
        ];
        let facets = lower_convex_hull(&points, &no_deps()).unwrap();
        assert_eq!(facets.len(), 1);
        assert!(facets[0].is_degenerate());
        assert_eq!(facets[0].vertices, vec![1]);
    }
}
