//! Adaptive simplex subdivision sampling of a phase's internal space.
//!
//! The feasible polytope is a product of unit simplices, one per sublattice.
//! A first pass discretizes each simplex with `initial_subdivisions_per_axis`
//! steps; optionally, points whose Hessian projected onto the constraint
//! null space is not positive semi-definite are discarded; a second pass
//! subdivides each survivor's grid cell by `refinement_subdivisions_per_axis`.
//!
//! A single-species sublattice contributes no free axis. Site fractions are
//! kept away from exact zero so the entropy terms stay evaluable.

use crate::error::MinimizeResult;
use eq_core::EvalConditions;
use eq_phase::{CompositionSet, SublatticeSet};

/// Lower bound on sampled site fractions.
pub const MIN_SITE_FRACTION: f64 = 1e-12;

/// Sampler configuration.
#[derive(Clone, Copy, Debug)]
pub struct SamplerSettings {
    /// Initial discretization per axis, used to locate spinodal regions.
    pub initial_subdivisions_per_axis: usize,
    /// Subdivision of each surviving cell during refinement.
    pub refinement_subdivisions_per_axis: usize,
    /// Discard points that are not locally stable before refinement.
    pub discard_unstable: bool,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            initial_subdivisions_per_axis: 20,
            refinement_subdivisions_per_axis: 2,
            discard_unstable: true,
        }
    }
}

/// Sample a phase's internal composition space.
///
/// Returns points in the phase's canonical variable order with the phase
/// energy appended as the last coordinate.
pub fn point_sample(
    cset: &CompositionSet,
    sublset: &SublatticeSet,
    conditions: &EvalConditions,
    settings: &SamplerSettings,
) -> MinimizeResult<Vec<Vec<f64>>> {
    debug_assert!(settings.initial_subdivisions_per_axis > 0);
    debug_assert!(settings.refinement_subdivisions_per_axis > 0);
    let phase = cset.name();
    let sublattice_sizes: Vec<usize> = (0..sublset.sublattice_count(phase))
        .map(|s| sublset.sublattice_entries(phase, s).len())
        .collect();

    // First pass: product of per-sublattice simplex grids
    let grids: Vec<Vec<Vec<f64>>> = sublattice_sizes
        .iter()
        .map(|&k| simplex_grid(k, settings.initial_subdivisions_per_axis))
        .collect();
    let mut points: Vec<Vec<f64>> = vec![Vec::new()];
    for grid in &grids {
        let mut next = Vec::with_capacity(points.len() * grid.len());
        for point in &points {
            for cell in grid {
                let mut combined = point.clone();
                combined.extend_from_slice(cell);
                next.push(combined);
            }
        }
        points = next;
    }

    if settings.discard_unstable && cset.null_space().ncols() > 0 {
        let mut stable = Vec::with_capacity(points.len());
        for point in points {
            if is_stable(cset, conditions, &point)? {
                stable.push(point);
            }
        }
        points = stable;
    }

    // Second pass: subdivide each survivor's cell
    let step = 1.0 / settings.initial_subdivisions_per_axis as f64;
    let mut refined = Vec::new();
    for point in &points {
        refine_cell(
            point,
            &sublattice_sizes,
            step,
            settings.refinement_subdivisions_per_axis,
            &mut refined,
        );
    }
    points.extend(refined);

    // Append energies
    let mut sampled = Vec::with_capacity(points.len());
    for mut point in points {
        let energy = cset.evaluate_objective(conditions, cset.variable_map(), &point)?;
        point.push(energy);
        sampled.push(point);
    }
    tracing::debug!(phase = %phase, count = sampled.len(), "sampled internal points");
    Ok(sampled)
}

/// Grid over the (k-1)-simplex: all k-tuples of counts summing to n, scaled
/// to fractions and kept away from exact zero.
fn simplex_grid(k: usize, n: usize) -> Vec<Vec<f64>> {
    if k == 1 {
        return vec![vec![1.0]];
    }
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(k);
    fill_counts(k, n, &mut current, &mut out);
    out
}

fn fill_counts(k: usize, remaining: usize, current: &mut Vec<f64>, out: &mut Vec<Vec<f64>>) {
    let n_total: f64 = current.iter().sum::<f64>() + remaining as f64;
    if k == 1 {
        let mut point: Vec<f64> = current.iter().map(|&c| c / n_total).collect();
        point.push(remaining as f64 / n_total);
        for y in &mut point {
            if *y <= 0.0 {
                *y = MIN_SITE_FRACTION;
            }
        }
        out.push(point);
        return;
    }
    for c in 0..=remaining {
        current.push(c as f64);
        fill_counts(k - 1, remaining - c, current, out);
        current.pop();
    }
}

/// Positive semi-definiteness of the Hessian projected onto the constraint
/// null space.
fn is_stable(
    cset: &CompositionSet,
    conditions: &EvalConditions,
    point: &[f64],
) -> MinimizeResult<bool> {
    let hessian = cset.evaluate_objective_hessian_matrix(conditions, cset.variable_map(), point)?;
    let z = cset.null_space();
    let projected = z.transpose() * hessian * z;
    let scale = projected
        .iter()
        .fold(1.0_f64, |acc, v| acc.max(v.abs()));
    let eigenvalues = projected.symmetric_eigen().eigenvalues;
    Ok(eigenvalues.iter().all(|&e| e >= -1e-8 * scale))
}

/// Refined samples around one surviving point: offsets on every independent
/// axis (all species but the last of each sublattice), with each sublattice's
/// dependent fraction re-derived from the balance. Offsets that leave the
/// simplex are skipped.
fn refine_cell(
    point: &[f64],
    sublattice_sizes: &[usize],
    step: f64,
    refinement: usize,
    out: &mut Vec<Vec<f64>>,
) {
    // Independent axis positions into the flat point
    let mut axes = Vec::new();
    let mut offset = 0;
    for &k in sublattice_sizes {
        for i in 0..k.saturating_sub(1) {
            axes.push(offset + i);
        }
        offset += k;
    }
    if axes.is_empty() {
        return;
    }
    let offsets: Vec<f64> = (0..=refinement)
        .map(|t| -step / 2.0 + step * t as f64 / refinement as f64)
        .collect();

    let mut choice = vec![0usize; axes.len()];
    loop {
        if choice.iter().any(|&c| offsets[c] != 0.0) {
            let mut candidate = point.to_vec();
            for (axis_pos, &c) in axes.iter().zip(choice.iter()) {
                candidate[*axis_pos] += offsets[c];
            }
            if rebalance(&mut candidate, sublattice_sizes) {
                out.push(candidate);
            }
        }
        // advance odometer
        let mut pos = choice.len();
        loop {
            if pos == 0 {
                return;
            }
            pos -= 1;
            choice[pos] += 1;
            if choice[pos] < offsets.len() {
                break;
            }
            choice[pos] = 0;
        }
    }
}

/// Recompute each sublattice's dependent fraction; false when the candidate
/// leaves the feasible simplex.
fn rebalance(candidate: &mut [f64], sublattice_sizes: &[usize]) -> bool {
    let mut offset = 0;
    for &k in sublattice_sizes {
        let mut sum = 0.0;
        for i in 0..k - 1 {
            let y = candidate[offset + i];
            if y < 0.0 || y > 1.0 {
                return false;
            }
            sum += y;
        }
        let dependent = 1.0 - sum;
        if dependent < 0.0 {
            return false;
        }
        candidate[offset + k - 1] = dependent.max(MIN_SITE_FRACTION);
        for i in 0..k - 1 {
            if candidate[offset + i] <= 0.0 {
                candidate[offset + i] = MIN_SITE_FRACTION;
            }
        }
        offset += k;
    }
    true
}
