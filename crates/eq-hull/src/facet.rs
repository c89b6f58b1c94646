//! Hull facets and dependent-dimension bookkeeping.

use nalgebra::{DMatrix, DVector};
use std::collections::BTreeSet;

/// One facet of the lower convex hull.
///
/// `vertices` index into the input point list. `normal` holds the unit
/// outward normal in the reduced (dependent-dimensions-dropped) space with
/// the hyperplane offset appended; it is empty for degenerate facets.
/// `basis_matrix` is the inverse of the augmented vertex matrix (columns =
/// [independent coordinates; 1]): multiplying it by an augmented trial point
/// yields barycentric coordinates whose sign pattern decides containment. It
/// is empty whenever the augmented system is not square or not invertible,
/// and an empty matrix containment-tests as trivially inside.
#[derive(Debug, Clone)]
pub struct Facet {
    pub vertices: Vec<usize>,
    pub normal: Vec<f64>,
    pub area: f64,
    pub basis_matrix: DMatrix<f64>,
}

impl Facet {
    /// Degenerate facet over the given vertices (single point, or too few
    /// points to span the space).
    pub fn degenerate(vertices: Vec<usize>) -> Self {
        Facet {
            vertices,
            normal: Vec::new(),
            area: 0.0,
            basis_matrix: DMatrix::zeros(0, 0),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.normal.is_empty()
    }

    /// Barycentric containment of an augmented trial point [x; 1].
    ///
    /// Components are rejected exactly at zero (no tolerance): facets share
    /// boundaries and duplicate admission is tolerable.
    pub fn contains(&self, trial: &DVector<f64>) -> bool {
        if self.basis_matrix.nrows() == 0 {
            return true;
        }
        if self.basis_matrix.ncols() != trial.len() {
            return false;
        }
        let barycentric = &self.basis_matrix * trial;
        barycentric.iter().all(|&c| c >= 0.0)
    }

    /// Barycentric coordinates of an augmented trial point, one per vertex.
    pub fn barycentric(&self, trial: &DVector<f64>) -> Option<DVector<f64>> {
        if self.basis_matrix.nrows() == 0 || self.basis_matrix.ncols() != trial.len() {
            return None;
        }
        Some(&self.basis_matrix * trial)
    }
}

/// Remove the listed dimensions from a point.
pub fn drop_dependent_dimensions(point: &[f64], dependent: &BTreeSet<usize>) -> Vec<f64> {
    point
        .iter()
        .enumerate()
        .filter(|(i, _)| !dependent.contains(i))
        .map(|(_, &v)| v)
        .collect()
}

/// Re-insert the dependent site fraction of each sublattice as one minus the
/// sum of that sublattice's independent fractions. The input carries only
/// independent coordinates; trailing coordinates beyond the last dependent
/// dimension (e.g. an appended energy) are not restored.
pub fn restore_dependent_dimensions(point: &[f64], dependent: &BTreeSet<usize>) -> Vec<f64> {
    let mut restored = Vec::with_capacity(point.len() + dependent.len());
    let mut iter = point.iter();
    let mut sublattice_offset = 0;
    for &dim in dependent {
        let mut sum = 0.0;
        for _ in sublattice_offset..dim {
            let &value = iter.next().unwrap_or(&0.0);
            sum += value;
            restored.push(value);
        }
        restored.push(1.0 - sum);
        sublattice_offset = dim + 1;
    }
    restored
}
