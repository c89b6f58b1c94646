//! Sublattice-balance constraints and their orthonormal null-space basis.
//!
//! Each sublattice contributes one equality constraint: its site fractions
//! sum to 1. The linearized constraint matrix A (one row per balance) is
//! factored through a full QR decomposition of A^T; splitting Q = [Y | Z]
//! yields Z, whose columns span ker A. Projected-gradient moves on the
//! feasible manifold use Z and the projector P = Z Z^T.
//!
//! Reference: Nocedal and Wright, 2006, ch. 15.2.

use crate::error::{PhaseError, PhaseResult};
use eq_expr::Expr;
use nalgebra::{DMatrix, DVector};

/// One equality constraint, kept symbolically as lhs = rhs.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Constraint {
    /// Sublattice balance: the given site-fraction variables sum to 1.
    pub fn sublattice_balance(phase: &str, sublattice_index: usize, variables: &[String]) -> Self {
        Constraint {
            name: format!("{phase}_{sublattice_index}_BALANCE"),
            lhs: Expr::add(variables.iter().map(Expr::sym).collect()),
            rhs: Expr::num(1.0),
        }
    }
}

/// The factored constraint system of one composition set.
#[derive(Debug, Clone)]
pub struct ConstraintBasis {
    /// Linearized constraint matrix, one row per balance.
    pub a: DMatrix<f64>,
    /// Orthonormal null-space basis: columns span ker A.
    pub null_space: DMatrix<f64>,
    /// Range-space block Y of Q = [Y | Z].
    pub range_space: DMatrix<f64>,
    /// Projector onto ker A: Z Z^T.
    pub projector: DMatrix<f64>,
}

/// Full QR decomposition via Householder reflections.
///
/// Returns (Q, R) with Q square m x m; nalgebra's built-in QR keeps only the
/// thin factor, and the null space lives precisely in the columns the thin
/// factor drops.
fn householder_qr(a: &DMatrix<f64>) -> (DMatrix<f64>, DMatrix<f64>) {
    let (m, n) = a.shape();
    let mut r = a.clone();
    let mut q = DMatrix::<f64>::identity(m, m);

    for k in 0..n.min(m) {
        // Householder vector for column k below the diagonal
        let mut v = DVector::<f64>::zeros(m - k);
        for i in k..m {
            v[i - k] = r[(i, k)];
        }
        let norm = v.norm();
        if norm <= f64::EPSILON {
            continue;
        }
        let alpha = if v[0] >= 0.0 { -norm } else { norm };
        v[0] -= alpha;
        let vnorm = v.norm();
        if vnorm <= f64::EPSILON {
            continue;
        }
        v /= vnorm;

        // R <- H R on the trailing block
        for j in k..n {
            let mut dot = 0.0;
            for i in k..m {
                dot += v[i - k] * r[(i, j)];
            }
            for i in k..m {
                r[(i, j)] -= 2.0 * v[i - k] * dot;
            }
        }
        // Q <- Q H (accumulate reflections on the right)
        for i in 0..m {
            let mut dot = 0.0;
            for j in k..m {
                dot += q[(i, j)] * v[j - k];
            }
            for j in k..m {
                q[(i, j)] -= 2.0 * dot * v[j - k];
            }
        }
    }
    (q, r)
}

/// Build the constraint basis for the given constraint matrix A
/// (n_constraints x n_variables).
pub fn constraint_null_space(a: DMatrix<f64>) -> PhaseResult<ConstraintBasis> {
    let n_constraints = a.nrows();
    let n_variables = a.ncols();
    if n_constraints == 0 || n_variables == 0 {
        return Err(PhaseError::ConstraintBasis {
            what: "empty constraint system".to_string(),
        });
    }
    if n_constraints > n_variables {
        return Err(PhaseError::ConstraintBasis {
            what: format!("{n_constraints} constraints exceed {n_variables} variables"),
        });
    }

    let a_t = a.transpose();
    let (q, r) = householder_qr(&a_t);

    // A^T must have full column rank: every diagonal of R nonzero.
    for k in 0..n_constraints {
        if r[(k, k)].abs() < 1e-12 {
            return Err(PhaseError::ConstraintBasis {
                what: format!("rank-deficient constraint matrix (R[{k},{k}] ~ 0)"),
            });
        }
    }

    let null_space = q.columns(n_constraints, n_variables - n_constraints).into_owned();
    let range_space = q.columns(0, n_constraints).into_owned();
    let projector = &null_space * null_space.transpose();

    // A Z = 0 to floating-point tolerance
    let residual = &a * &null_space;
    let worst = residual.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if worst > 1e-10 {
        return Err(PhaseError::ConstraintBasis {
            what: format!("null-space residual {worst:e} exceeds tolerance"),
        });
    }

    tracing::debug!(
        constraints = n_constraints,
        variables = n_variables,
        null_dim = n_variables - n_constraints,
        "constraint basis built"
    );

    Ok(ConstraintBasis {
        a,
        null_space,
        range_space,
        projector,
    })
}
