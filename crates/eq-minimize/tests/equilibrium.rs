//! End-to-end equilibrium scenarios: sample, hull, tie-point extraction.

use eq_core::{EvalConditions, PhaseStatus, GAS_CONSTANT};
use eq_expr::{Expr, VariableMap};
use eq_minimize::GlobalMinimizer;
use eq_phase::{
    CompositionSet, Parameter, ParameterKind, ParameterSet, Phase, Species, SublatticeSet,
};
use std::collections::BTreeMap;

struct Binary {
    phases: BTreeMap<String, CompositionSet>,
    sublset: SublatticeSet,
}

/// Build a set of binary (A, B) solution phases, each defined by its two
/// endmember energies and a regular-solution interaction.
fn binary_system(specs: &[(&str, f64, f64, f64)]) -> Binary {
    let mut sublset = SublatticeSet::new();
    let mut params = ParameterSet::new();
    let mut names = Vec::new();
    for (name, g_a, g_b, l0) in specs {
        sublset
            .add_sublattice(name, 0, 1.0, &[Species::new("A"), Species::new("B")])
            .unwrap();
        if *g_a != 0.0 {
            params.add(Parameter::new(
                *name,
                ParameterKind::G,
                vec![vec![Species::new("A")]],
                0,
                Expr::num(*g_a),
            ));
        }
        if *g_b != 0.0 {
            params.add(Parameter::new(
                *name,
                ParameterKind::G,
                vec![vec![Species::new("B")]],
                0,
                Expr::num(*g_b),
            ));
        }
        if *l0 != 0.0 {
            params.add(Parameter::new(
                *name,
                ParameterKind::L,
                vec![vec![Species::new("A"), Species::new("B")]],
                0,
                Expr::num(*l0),
            ));
        }
        names.extend([
            format!("{name}_0_A"),
            format!("{name}_0_B"),
            format!("{name}_FRAC"),
        ]);
    }
    let main = VariableMap::from_names(names);
    let mut phases = BTreeMap::new();
    for (name, ..) in specs {
        let phase = Phase::new(*name);
        let cset = CompositionSet::new(&phase, &params, &sublset, &main).unwrap();
        phases.insert(name.to_string(), cset);
    }
    Binary { phases, sublset }
}

fn binary_conditions(t: f64, x_b: f64, phases: &[&str]) -> EvalConditions {
    let mut cond = EvalConditions::default();
    cond.statevars.insert('T', t);
    cond.statevars.insert('P', 101_325.0);
    cond.elements = vec!["A".to_string(), "B".to_string()];
    for p in phases {
        cond.phases.insert(p.to_string(), PhaseStatus::Entered);
    }
    cond.xfrac.insert("A".to_string(), 1.0 - x_b);
    cond.xfrac.insert("B".to_string(), x_b);
    cond
}

#[test]
fn pure_substance_single_point() {
    // One phase, one species per sublattice: no composition dependence.
    let mut sublset = SublatticeSet::new();
    sublset
        .add_sublattice("SOLID", 0, 1.0, &[Species::new("A")])
        .unwrap();
    let mut params = ParameterSet::new();
    params.add(Parameter::new(
        "SOLID",
        ParameterKind::G,
        vec![vec![Species::new("A")]],
        0,
        Expr::add(vec![
            Expr::num(-5000.0),
            Expr::mul(vec![Expr::num(-2.0), Expr::sym("T")]),
        ]),
    ));
    let main = VariableMap::from_names(["SOLID_0_A", "SOLID_FRAC"]);
    let phase = Phase::new("SOLID");
    let cset = CompositionSet::new(&phase, &params, &sublset, &main).unwrap();
    let mut phases = BTreeMap::new();
    phases.insert("SOLID".to_string(), cset);

    let mut cond = EvalConditions::default();
    cond.statevars.insert('T', 1000.0);
    cond.elements = vec!["A".to_string()];
    cond.phases.insert("SOLID".to_string(), PhaseStatus::Entered);
    cond.xfrac.insert("A".to_string(), 1.0);

    let mut minimizer = GlobalMinimizer::new();
    minimizer.run(&phases, &sublset, &cond).unwrap();
    assert_eq!(minimizer.hull_entries().len(), 1);
    assert_eq!(minimizer.facets().len(), 1);
    assert_eq!(minimizer.facets()[0].area, 0.0);

    let tie_points = minimizer.find_tie_points(&cond, &phases).unwrap();
    assert_eq!(tie_points.len(), 1);
    assert_eq!(tie_points[0].phase_name, "SOLID");
    assert_eq!(tie_points[0].phase_fraction, 1.0);
    // G = -5000 - 2*T at T=1000
    assert!((tie_points[0].energy + 7000.0).abs() < 1e-9);
}

#[test]
fn ideal_binary_solution_at_equimolar() {
    let system = binary_system(&[("LIQ", 0.0, 0.0, 0.0)]);
    let cond = binary_conditions(1000.0, 0.5, &["LIQ"]);
    let mut minimizer = GlobalMinimizer::new();
    minimizer.run(&system.phases, &system.sublset, &cond).unwrap();

    let tie_points = minimizer.find_tie_points(&cond, &system.phases).unwrap();
    assert_eq!(tie_points.len(), 1, "single-phase region has one tie point");
    let tp = &tie_points[0];
    assert_eq!(tp.phase_name, "LIQ");
    assert!((tp.phase_fraction - 1.0).abs() < 1e-12);
    // Site fractions stay near the condition on the sampling grid
    assert!((tp.internal_coordinates[1] - 0.5).abs() < 0.03);
    // G = R T ln(1/2) at y = 1/2, slightly shallower next to it
    let expected = GAS_CONSTANT * 1000.0 * 0.5_f64.ln();
    assert!((expected + 5763.17).abs() < 0.1);
    assert!((tp.energy - expected).abs() < 15.0);
}

#[test]
fn hull_points_satisfy_sublattice_balance() {
    let system = binary_system(&[("LIQ", 0.0, 0.0, 0.0)]);
    let cond = binary_conditions(1000.0, 0.5, &["LIQ"]);
    let mut minimizer = GlobalMinimizer::new();
    minimizer.run(&system.phases, &system.sublset, &cond).unwrap();
    assert!(!minimizer.hull_entries().is_empty());
    for entry in minimizer.hull_entries() {
        let sum: f64 = entry.internal_coordinates.iter().sum();
        assert!((sum - 1.0).abs() < 1e-10);
        for &y in &entry.internal_coordinates {
            assert!((0.0..=1.0).contains(&y) || y < 1e-10);
        }
        let x_sum: f64 = entry.global_coordinates.values().sum();
        assert!((x_sum - 1.0).abs() < 1e-10);
    }
}

#[test]
fn miscibility_gap_yields_two_tie_points_of_one_phase() {
    // Symmetric regular solution above the entropy scale: two minima near
    // the composition edges, tie line across the gap.
    let system = binary_system(&[("LIQ", 0.0, 0.0, 30_000.0)]);
    let cond = binary_conditions(1000.0, 0.5, &["LIQ"]);
    let mut minimizer = GlobalMinimizer::new();
    minimizer.run(&system.phases, &system.sublset, &cond).unwrap();

    let tie_points = minimizer.find_tie_points(&cond, &system.phases).unwrap();
    assert_eq!(tie_points.len(), 2, "gap produces two tie points");
    assert_eq!(tie_points[0].phase_name, "LIQ");
    assert_eq!(tie_points[1].phase_name, "LIQ");
    let mut y_b: Vec<f64> = tie_points
        .iter()
        .map(|tp| tp.internal_coordinates[1])
        .collect();
    y_b.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert!(y_b[0] < 0.10, "left minimum near the A edge, got {}", y_b[0]);
    assert!(y_b[1] > 0.90, "right minimum near the B edge, got {}", y_b[1]);
    // Symmetric gap at the equimolar condition: lever rule gives half each
    let fractions: Vec<f64> = tie_points.iter().map(|tp| tp.phase_fraction).collect();
    assert!((fractions.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    for f in fractions {
        assert!((f - 0.5).abs() < 0.05);
    }
}

#[test]
fn two_phase_region_ties_distinct_phases() {
    // Two mirrored solution phases whose Gibbs curves cross at x_B = 0.5;
    // the common tangent spans roughly [0.29, 0.71] at this temperature.
    let system = binary_system(&[
        ("ALPHA", -1000.0, 5000.0, 0.0),
        ("BETA", 5000.0, -1000.0, 0.0),
    ]);
    let cond = binary_conditions(800.0, 0.4, &["ALPHA", "BETA"]);
    let mut minimizer = GlobalMinimizer::new();
    minimizer.run(&system.phases, &system.sublset, &cond).unwrap();

    let tie_points = minimizer.find_tie_points(&cond, &system.phases).unwrap();
    assert_eq!(tie_points.len(), 2);
    let alpha = tie_points
        .iter()
        .find(|tp| tp.phase_name == "ALPHA")
        .expect("alpha tie point");
    let beta = tie_points
        .iter()
        .find(|tp| tp.phase_name == "BETA")
        .expect("beta tie point");
    // Tie-line endpoints bracket the condition
    let x_alpha = alpha.global_coordinates["B"];
    let x_beta = beta.global_coordinates["B"];
    assert!(x_alpha > 0.2 && x_alpha < 0.35, "x_alpha = {x_alpha}");
    assert!(x_beta > 0.65 && x_beta < 0.8, "x_beta = {x_beta}");
    // Lever rule: fractions sum to one and reconstruct the condition
    let total = alpha.phase_fraction + beta.phase_fraction;
    assert!((total - 1.0).abs() < 1e-9);
    let reconstructed = alpha.phase_fraction * x_alpha + beta.phase_fraction * x_beta;
    assert!((reconstructed - 0.4).abs() < 1e-6);
    assert!(alpha.phase_fraction > beta.phase_fraction);
}

#[test]
fn condition_outside_all_facets_is_empty() {
    let system = binary_system(&[("LIQ", 0.0, 0.0, 0.0)]);
    // Nonphysical overall composition: outside every facet projection
    let cond = binary_conditions(1000.0, 1.5, &["LIQ"]);
    let mut minimizer = GlobalMinimizer::new();
    minimizer.run(&system.phases, &system.sublset, &cond).unwrap();
    let tie_points = minimizer.find_tie_points(&cond, &system.phases).unwrap();
    assert!(tie_points.is_empty());
}

#[test]
fn suspended_phase_is_excluded_from_the_grid() {
    let system = binary_system(&[
        ("ALPHA", -1000.0, 5000.0, 0.0),
        ("BETA", 5000.0, -1000.0, 0.0),
    ]);
    let mut cond = binary_conditions(800.0, 0.4, &["ALPHA"]);
    cond.phases
        .insert("BETA".to_string(), PhaseStatus::Suspended);
    let mut minimizer = GlobalMinimizer::new();
    minimizer.run(&system.phases, &system.sublset, &cond).unwrap();
    for entry in minimizer.hull_entries() {
        assert_eq!(entry.phase_name, "ALPHA");
    }
    let tie_points = minimizer.find_tie_points(&cond, &system.phases).unwrap();
    assert_eq!(tie_points.len(), 1);
    assert_eq!(tie_points[0].phase_name, "ALPHA");
}

#[test]
fn global_hull_marks_entries() {
    let system = binary_system(&[("LIQ", 0.0, 0.0, 0.0)]);
    let cond = binary_conditions(1000.0, 0.5, &["LIQ"]);
    let mut minimizer = GlobalMinimizer::new();
    minimizer.run(&system.phases, &system.sublset, &cond).unwrap();
    // Every facet vertex is flagged; at least one entry is on the hull.
    let flagged = minimizer
        .hull_entries()
        .iter()
        .filter(|e| e.on_global_hull)
        .count();
    assert!(flagged > 0);
    for facet in minimizer.facets() {
        for &v in &facet.vertices {
            assert!(minimizer.hull_entries()[v].on_global_hull);
        }
    }
}
