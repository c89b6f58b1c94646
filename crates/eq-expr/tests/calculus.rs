//! Calculus invariants checked numerically: symbolic derivatives against
//! central finite differences, and composability of simplify/differentiate.

use eq_core::EvalConditions;
use eq_expr::{differentiate, evaluate, simplify, Expr, SymbolTable, VariableMap};

fn conditions_at(t: f64) -> EvalConditions {
    let mut cond = EvalConditions::default();
    cond.statevars.insert('T', t);
    cond
}

/// Central finite difference of `expr` with respect to variable index `idx`.
fn finite_difference(
    expr: &Expr,
    cond: &EvalConditions,
    vars: &VariableMap,
    x: &[f64],
    idx: usize,
) -> f64 {
    let h = 1e-6;
    let symbols = SymbolTable::new();
    let mut xp = x.to_vec();
    let mut xm = x.to_vec();
    xp[idx] += h;
    xm[idx] -= h;
    let up = evaluate(expr, cond, vars, &symbols, &xp).unwrap();
    let um = evaluate(expr, cond, vars, &symbols, &xm).unwrap();
    (up - um) / (2.0 * h)
}

fn check_derivative(expr: &Expr, var: &str, vars: &VariableMap, x: &[f64]) {
    let cond = conditions_at(700.0);
    let symbols = SymbolTable::new();
    let idx = vars.index_of(var).unwrap();
    let d = simplify(&differentiate(expr, var));
    let analytic = evaluate(&d, &cond, vars, &symbols, x).unwrap();
    let numeric = finite_difference(expr, &cond, vars, x, idx);
    let scale = analytic.abs().max(numeric.abs()).max(1.0);
    assert!(
        (analytic - numeric).abs() / scale < 1e-5,
        "derivative mismatch for {expr}: analytic={analytic}, numeric={numeric}"
    );
}

#[test]
fn derivative_matches_finite_difference_polynomial() {
    let vars = VariableMap::from_names(["y"]);
    // 3 y^4 - 2 y^2 + 7
    let e = Expr::add(vec![
        Expr::mul(vec![Expr::num(3.0), Expr::pow(Expr::sym("y"), Expr::num(4.0))]),
        Expr::mul(vec![Expr::num(-2.0), Expr::pow(Expr::sym("y"), Expr::num(2.0))]),
        Expr::num(7.0),
    ]);
    check_derivative(&e, "y", &vars, &[0.37]);
}

#[test]
fn derivative_matches_finite_difference_entropy_term() {
    // The ideal-mixing building block y ln y
    let vars = VariableMap::from_names(["y"]);
    let e = Expr::mul(vec![Expr::sym("y"), Expr::ln(Expr::sym("y"))]);
    check_derivative(&e, "y", &vars, &[0.42]);
}

#[test]
fn derivative_matches_finite_difference_quotient_and_exp() {
    let vars = VariableMap::from_names(["y", "z"]);
    // exp(y) / (y + z)
    let e = Expr::div(
        Expr::exp(Expr::sym("y")),
        Expr::add(vec![Expr::sym("y"), Expr::sym("z")]),
    );
    check_derivative(&e, "y", &vars, &[0.6, 0.9]);
    check_derivative(&e, "z", &vars, &[0.6, 0.9]);
}

#[test]
fn derivative_matches_finite_difference_redlich_kister_shape() {
    // y1 * y2 * (L0 + L1*(y1 - y2)) with numeric L0, L1
    let vars = VariableMap::from_names(["y1", "y2"]);
    let e = Expr::mul(vec![
        Expr::sym("y1"),
        Expr::sym("y2"),
        Expr::add(vec![
            Expr::num(30_000.0),
            Expr::mul(vec![
                Expr::num(-5_000.0),
                Expr::sub(Expr::sym("y1"), Expr::sym("y2")),
            ]),
        ]),
    ]);
    check_derivative(&e, "y1", &vars, &[0.3, 0.7]);
    check_derivative(&e, "y2", &vars, &[0.3, 0.7]);
}

#[test]
fn simplify_and_differentiate_commute_numerically() {
    let vars = VariableMap::from_names(["y"]);
    let cond = conditions_at(450.0);
    let symbols = SymbolTable::new();
    // Deliberately un-simplified input tree
    let e = Expr::add(vec![
        Expr::mul(vec![Expr::sym("y"), Expr::num(1.0), Expr::sym("y")]),
        Expr::mul(vec![Expr::num(0.0), Expr::sym("y")]),
        Expr::pow(Expr::sym("y"), Expr::num(1.0)),
    ]);
    let x = [0.81];
    let d_then_s = simplify(&differentiate(&e, "y"));
    let s_then_d = differentiate(&simplify(&e), "y");
    let a = evaluate(&d_then_s, &cond, &vars, &symbols, &x).unwrap();
    let b = evaluate(&s_then_d, &cond, &vars, &symbols, &x).unwrap();
    assert!((a - b).abs() < 1e-12);
}

#[test]
fn piecewise_derivative_keeps_bounds() {
    let vars = VariableMap::from_names(["y"]);
    let symbols = SymbolTable::new();
    let e = Expr::piecewise(vec![
        (0.0, 1000.0, Expr::pow(Expr::sym("y"), Expr::num(2.0))),
        (1000.0, 6000.0, Expr::mul(vec![Expr::num(5.0), Expr::sym("y")])),
    ]);
    let d = simplify(&differentiate(&e, "y"));
    // Below the split: d/dy y^2 = 2y
    let low = evaluate(&d, &conditions_at(500.0), &vars, &symbols, &[3.0]).unwrap();
    assert!((low - 6.0).abs() < 1e-12);
    // Above the split: d/dy 5y = 5
    let high = evaluate(&d, &conditions_at(1500.0), &vars, &symbols, &[3.0]).unwrap();
    assert!((high - 5.0).abs() < 1e-12);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn simplify_is_idempotent(c1 in -10.0_f64..10.0, c2 in -10.0_f64..10.0) {
            let e = Expr::add(vec![
                Expr::mul(vec![Expr::num(c1), Expr::sym("y"), Expr::num(c2)]),
                Expr::num(c1 + c2),
                Expr::mul(vec![Expr::sym("y"), Expr::num(0.0)]),
            ]);
            let once = simplify(&e);
            let twice = simplify(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn simplify_preserves_value(c in -5.0_f64..5.0, y in 0.05_f64..0.95) {
            let cond = conditions_at(600.0);
            let vars = VariableMap::from_names(["y"]);
            let symbols = SymbolTable::new();
            let e = Expr::add(vec![
                Expr::mul(vec![Expr::num(c), Expr::sym("y")]),
                Expr::mul(vec![Expr::sym("y"), Expr::ln(Expr::sym("y")), Expr::num(1.0)]),
                Expr::num(0.0),
            ]);
            let raw = evaluate(&e, &cond, &vars, &symbols, &[y]).unwrap();
            let simplified = evaluate(&simplify(&e), &cond, &vars, &symbols, &[y]).unwrap();
            prop_assert!((raw - simplified).abs() < 1e-12);
        }

        #[test]
        fn polynomial_derivative_matches_finite_difference(
            a in -3.0_f64..3.0,
            b in -3.0_f64..3.0,
            y in 0.1_f64..0.9,
        ) {
            let vars = VariableMap::from_names(["y"]);
            let e = Expr::add(vec![
                Expr::mul(vec![Expr::num(a), Expr::pow(Expr::sym("y"), Expr::num(3.0))]),
                Expr::mul(vec![Expr::num(b), Expr::sym("y")]),
            ]);
            let cond = conditions_at(500.0);
            let symbols = SymbolTable::new();
            let d = simplify(&differentiate(&e, "y"));
            let analytic = evaluate(&d, &cond, &vars, &symbols, &[y]).unwrap();
            let numeric = finite_difference(&e, &cond, &vars, &[y], 0);
            let scale = analytic.abs().max(numeric.abs()).max(1.0);
            prop_assert!((analytic - numeric).abs() / scale < 1e-5);
        }
    }
}
