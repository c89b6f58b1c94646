//! Global minimizer: energy manifolds, global hull, tie-point extraction.
//!
//! `run` samples every active phase, keeps each phase's internal lower hull,
//! re-expresses the survivors as (mole fractions, energy) points, and takes
//! the global lower hull. `find_tie_points` then filters the facets against
//! the user composition and extracts the equilibrium tie points.

use crate::error::{MinimizeError, MinimizeResult};
use crate::hull_map::{HullEntry, HullMap};
use crate::sample::{point_sample, SamplerSettings};
use eq_core::{euclidean_distance, same_point, EvalConditions};
use eq_hull::{lower_convex_hull, Facet};
use eq_phase::{site_fractions_to_mole_fractions, CompositionSet, SublatticeSet};
use nalgebra::DVector;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Minimizer configuration.
#[derive(Clone, Copy, Debug)]
pub struct MinimizerSettings {
    /// Minimum internal-coordinate length of a same-phase tie line.
    pub critical_edge_length: f64,
    /// Relative energy allowance below which a same-phase edge is considered
    /// coplanar with the tie plane rather than a true tie line.
    pub coplanarity_allowance: f64,
    pub sampler: SamplerSettings,
}

impl Default for MinimizerSettings {
    fn default() -> Self {
        Self {
            critical_edge_length: 0.05,
            coplanarity_allowance: 0.001,
            sampler: SamplerSettings::default(),
        }
    }
}

/// One equilibrium tie point with its lever-rule phase fraction.
#[derive(Debug, Clone, Serialize)]
pub struct TiePoint {
    pub id: usize,
    pub phase_name: String,
    pub internal_coordinates: Vec<f64>,
    pub global_coordinates: BTreeMap<String, f64>,
    pub energy: f64,
    pub phase_fraction: f64,
}

/// Global minimization driver. Owns the hull map and candidate facets of the
/// most recent `run`.
#[derive(Debug, Default)]
pub struct GlobalMinimizer {
    settings: MinimizerSettings,
    hull_map: HullMap,
    candidate_facets: Vec<Facet>,
}

impl GlobalMinimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: MinimizerSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Calculate energy manifolds for all active phases and the global lower
    /// convex hull across them.
    pub fn run(
        &mut self,
        phase_list: &BTreeMap<String, CompositionSet>,
        sublset: &SublatticeSet,
        conditions: &EvalConditions,
    ) -> MinimizeResult<()> {
        conditions.validate()?;
        self.hull_map = HullMap::new();
        self.candidate_facets.clear();
        let mut global_points: Vec<Vec<f64>> = Vec::new();

        for (name, cset) in phase_list {
            if !conditions.is_active(name) {
                continue;
            }
            let dependent = sublset.dependent_dimensions(name);
            let samples = point_sample(cset, sublset, conditions, &self.settings.sampler)?;
            let survivors = internal_hull(&samples, &dependent)?;
            tracing::debug!(
                phase = %name,
                sampled = samples.len(),
                survivors = survivors.len(),
                "internal hull"
            );
            for index in survivors {
                let point = &samples[index];
                let (site_fractions, energy) = point.split_at(point.len() - 1);
                let global = site_fractions_to_mole_fractions(name, sublset, site_fractions);
                let mut ordered: Vec<f64> = conditions
                    .elements
                    .iter()
                    .map(|e| global.get(e).copied().unwrap_or(0.0))
                    .collect();
                self.hull_map
                    .insert_point(name.clone(), energy[0], site_fractions.to_vec(), global);
                ordered.push(energy[0]);
                global_points.push(ordered);
            }
        }

        if global_points.is_empty() {
            return Err(MinimizeError::NoActivePhases);
        }

        // The last mole fraction is the dependent global coordinate.
        let mut dependent = BTreeSet::new();
        if !conditions.elements.is_empty() {
            dependent.insert(conditions.elements.len() - 1);
        }
        self.candidate_facets = lower_convex_hull(&global_points, &dependent)?;
        tracing::debug!(facets = self.candidate_facets.len(), "global hull");

        for facet in &self.candidate_facets {
            for &vertex in &facet.vertices {
                self.hull_map.set_global_hull_status(vertex, true);
            }
        }
        Ok(())
    }

    /// All candidate points inserted by the last `run`.
    pub fn hull_entries(&self) -> &[HullEntry] {
        self.hull_map.entries()
    }

    /// Facets of the global lower hull from the last `run`.
    pub fn facets(&self) -> &[Facet] {
        &self.candidate_facets
    }

    /// Midpoint true-energy oracle. Between different phases the true energy
    /// is infinite (always a true tie line); within one phase the phase's
    /// models evaluate the averaged internal coordinates.
    fn midpoint_true_energy(
        &self,
        point1: usize,
        point2: usize,
        phase_list: &BTreeMap<String, CompositionSet>,
        conditions: &EvalConditions,
    ) -> MinimizeResult<f64> {
        let entry1 = self
            .hull_map
            .get(point1)
            .ok_or(MinimizeError::InvalidPointId { id: point1 })?;
        let entry2 = self
            .hull_map
            .get(point2)
            .ok_or(MinimizeError::InvalidPointId { id: point2 })?;
        if point1 == point2 {
            return Ok(entry1.energy);
        }
        if entry1.phase_name != entry2.phase_name {
            return Ok(f64::INFINITY);
        }
        let cset = phase_list
            .get(&entry1.phase_name)
            .ok_or_else(|| MinimizeError::UnknownPhase {
                name: entry1.phase_name.clone(),
            })?;
        let midpoint: Vec<f64> = entry1
            .internal_coordinates
            .iter()
            .zip(entry2.internal_coordinates.iter())
            .map(|(a, b)| (a + b) / 2.0)
            .collect();
        Ok(cset.evaluate_objective(conditions, cset.variable_map(), &midpoint)?)
    }

    /// Whether the edge between two hull points is a true tie line rather
    /// than a coplanar same-phase edge.
    fn is_true_tie_line(
        &self,
        point1: usize,
        point2: usize,
        phase_list: &BTreeMap<String, CompositionSet>,
        conditions: &EvalConditions,
    ) -> MinimizeResult<bool> {
        let true_energy = self.midpoint_true_energy(point1, point2, phase_list, conditions)?;
        if true_energy.is_infinite() {
            return Ok(true);
        }
        let entry1 = self.hull_map.get(point1).expect("checked by oracle");
        let entry2 = self.hull_map.get(point2).expect("checked by oracle");
        let lever_rule_energy = (entry1.energy + entry2.energy) / 2.0;
        let relative = (true_energy - lever_rule_energy) / lever_rule_energy.abs();
        Ok(relative >= self.settings.coplanarity_allowance)
    }

    /// Extract the tie points for the user-specified overall composition.
    ///
    /// Returns an empty list when no facet contains the trial point (the
    /// condition is infeasible on the computed hull).
    pub fn find_tie_points(
        &self,
        conditions: &EvalConditions,
        phase_list: &BTreeMap<String, CompositionSet>,
    ) -> MinimizeResult<Vec<TiePoint>> {
        let critical_edge_length = self.settings.critical_edge_length;

        // Augmented trial point over the independent components
        let mut trial = Vec::with_capacity(conditions.elements.len());
        for element in conditions.independent_elements() {
            let value = conditions.xfrac.get(element).copied().ok_or_else(|| {
                MinimizeError::MissingComposition {
                    element: element.clone(),
                }
            })?;
            trial.push(value);
        }
        trial.push(1.0);
        let trial = DVector::from_vec(trial);

        let mut pre_candidate_facets: Vec<&Facet> = self
            .candidate_facets
            .iter()
            .filter(|f| f.contains(&trial))
            .collect();
        tracing::debug!(
            candidates = self.candidate_facets.len(),
            containing = pre_candidate_facets.len(),
            "facet containment"
        );
        if pre_candidate_facets.is_empty() {
            // No facet contains the condition; return empty-handed.
            return Ok(Vec::new());
        }
        // Smallest area wins; stable sort keeps the first encountered on ties.
        pre_candidate_facets.sort_by(|a, b| {
            a.area
                .partial_cmp(&b.area)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let final_facet = pre_candidate_facets[0];

        // Pairwise admission over the facet's vertices
        let mut candidate_ids: BTreeSet<usize> = BTreeSet::new();
        let vertices = &final_facet.vertices;
        for (i, &point1) in vertices.iter().enumerate() {
            for &point2 in &vertices[i + 1..] {
                let entry1 = self
                    .hull_map
                    .get(point1)
                    .ok_or(MinimizeError::InvalidPointId { id: point1 })?;
                let entry2 = self
                    .hull_map
                    .get(point2)
                    .ok_or(MinimizeError::InvalidPointId { id: point2 })?;
                if entry1.phase_name != entry2.phase_name {
                    // Phases differ: definitely a tie line
                    candidate_ids.insert(point1);
                    candidate_ids.insert(point2);
                } else {
                    // Same phase: does the edge span a miscibility gap?
                    let distance = euclidean_distance(
                        &entry1.internal_coordinates,
                        &entry2.internal_coordinates,
                    );
                    if distance > critical_edge_length
                        && self.is_true_tie_line(point1, point2, phase_list, conditions)?
                    {
                        candidate_ids.insert(point1);
                        candidate_ids.insert(point2);
                    }
                }
            }
        }

        // Merge: same-phase points too close together collapse to one
        let mut admitted: Vec<usize> = candidate_ids.into_iter().collect();
        merge_close_points(&mut admitted, &self.hull_map, critical_edge_length);

        // Single-phase region: admit the first facet vertex
        if admitted.is_empty() {
            if let Some(&first) = vertices.first() {
                admitted.push(first);
            }
        }

        // Lever-rule fractions from the facet's barycentric coordinates
        let barycentric = final_facet.barycentric(&trial);
        let mut weights: Vec<f64> = admitted
            .iter()
            .map(|id| {
                let weight = barycentric.as_ref().and_then(|b| {
                    vertices
                        .iter()
                        .position(|v| v == id)
                        .and_then(|pos| b.get(pos).copied())
                });
                weight.unwrap_or(1.0).max(0.0)
            })
            .collect();
        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            for w in &mut weights {
                *w /= total;
            }
        }

        let tie_points = admitted
            .iter()
            .zip(weights)
            .map(|(&id, phase_fraction)| {
                let entry = self.hull_map.get(id).expect("admitted ids are valid");
                TiePoint {
                    id,
                    phase_name: entry.phase_name.clone(),
                    internal_coordinates: entry.internal_coordinates.clone(),
                    global_coordinates: entry.global_coordinates.clone(),
                    energy: entry.energy,
                    phase_fraction,
                }
            })
            .collect();
        Ok(tie_points)
    }
}

/// Internal lower hull of one phase's samples: ids of the points on the
/// lower hull, deduplicated by coordinates.
fn internal_hull(samples: &[Vec<f64>], dependent: &BTreeSet<usize>) -> MinimizeResult<Vec<usize>> {
    let facets = lower_convex_hull(samples, dependent)?;
    let mut ids: Vec<usize> = facets
        .iter()
        .flat_map(|f| f.vertices.iter().copied())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    // Coordinate-level deduplication
    let mut unique: Vec<usize> = Vec::with_capacity(ids.len());
    for &id in &ids {
        let duplicate = unique
            .iter()
            .any(|&kept| same_point(&samples[kept], &samples[id]));
        if !duplicate {
            unique.push(id);
        }
    }
    Ok(unique)
}

/// Drop one of any two same-phase points within the critical edge length.
/// Removal restarts the pairwise scan, since mutation invalidates it.
fn merge_close_points(ids: &mut Vec<usize>, hull_map: &HullMap, critical_edge_length: f64) {
    'restart: loop {
        for a in 0..ids.len() {
            for b in (a + 1)..ids.len() {
                let (Some(entry_a), Some(entry_b)) = (hull_map.get(ids[a]), hull_map.get(ids[b]))
                else {
                    continue;
                };
                if entry_a.phase_name != entry_b.phase_name {
                    continue;
                }
                let distance = euclidean_distance(
                    &entry_a.internal_coordinates,
                    &entry_b.internal_coordinates,
                );
                if distance <= critical_edge_length {
                    ids.remove(b);
                    continue 'restart;
                }
            }
        }
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(map: &mut HullMap, phase: &str, y: f64, energy: f64) -> usize {
        map.insert_point(phase, energy, vec![y, 1.0 - y], BTreeMap::new())
    }

    #[test]
    fn merge_drops_one_of_two_close_points() {
        let mut map = HullMap::new();
        let a = entry_at(&mut map, "LIQ", 0.50, -100.0);
        let b = entry_at(&mut map, "LIQ", 0.505, -101.0); // distance ~0.007
        let c = entry_at(&mut map, "LIQ", 0.90, -50.0);
        let mut ids = vec![a, b, c];
        merge_close_points(&mut ids, &map, 0.05);
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn merge_keeps_different_phases() {
        let mut map = HullMap::new();
        let a = entry_at(&mut map, "ALPHA", 0.50, -100.0);
        let b = entry_at(&mut map, "BETA", 0.505, -101.0);
        let mut ids = vec![a, b];
        merge_close_points(&mut ids, &map, 0.05);
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn merge_restart_handles_chains() {
        // Three points each within the edge length of the next: the scan
        // must restart after every removal and leave exactly one.
        let mut map = HullMap::new();
        let a = entry_at(&mut map, "LIQ", 0.500, -100.0);
        let b = entry_at(&mut map, "LIQ", 0.530, -100.0);
        let c = entry_at(&mut map, "LIQ", 0.560, -100.0);
        let mut ids = vec![a, b, c];
        merge_close_points(&mut ids, &map, 0.05);
        assert_eq!(ids, vec![a]);
    }

    #[test]
    fn dedup_inside_internal_hull() {
        // Two identical minima plus a distinct one; dedup keeps two points.
        let samples = vec![
            vec![0.2, 0.8, -1.0],
            vec![0.2, 0.8, -1.0],
            vec![0.8, 0.2, -1.0],
            vec![0.5, 0.5, 0.5],
        ];
        let dependent: BTreeSet<usize> = [1].into_iter().collect();
        let ids = internal_hull(&samples, &dependent).unwrap();
        let distinct: Vec<&Vec<f64>> = ids.iter().map(|&i| &samples[i]).collect();
        assert!(distinct.len() >= 2);
        for pair in distinct.windows(2) {
            assert!(pair[0] != pair[1]);
        }
    }
}
