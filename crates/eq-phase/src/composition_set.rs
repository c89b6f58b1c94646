//! Per-phase composition set.
//!
//! Owns the phase's energy model ASTs, their first and second partial
//! derivative ASTs, the sublattice-balance constraints with their Jacobian
//! ASTs, and the orthonormal null-space basis of the linearized constraints.
//!
//! Derivative bookkeeping follows two special rules for the phase-fraction
//! variable `{phase}_FRAC`:
//! - the first derivative with respect to it is the phase energy itself
//!   (energy scales linearly with phase amount)
//! - the second derivative with respect to it twice is zero, and a mixed
//!   partial with any site fraction is that site fraction's single-phase
//!   first derivative
//!
//! Variables not owned by this phase trivially differentiate to zero and are
//! omitted from storage.

use crate::constraints::{constraint_null_space, Constraint, ConstraintBasis};
use crate::error::{PhaseError, PhaseResult};
use crate::models::{
    EnergyModel, IdealMixing, IhjMagnetic, PureCompoundEnergy, RedlichKisterExcess,
};
use crate::parameters::ParameterSet;
use crate::sublattice::{Phase, SublatticeSet};
use eq_core::EvalConditions;
use eq_expr::{
    differentiate, differentiate_with_symbols, evaluate, simplify, Expr, SymbolTable, VariableMap,
};
use nalgebra::{DMatrix, DVector};
use std::collections::{BTreeMap, BTreeSet};

fn find_derivative<'a>(derivatives: &'a [(String, Expr)], variable: &str) -> Option<&'a Expr> {
    derivatives
        .iter()
        .find(|(name, _)| name == variable)
        .map(|(_, derivative)| derivative)
}

/// A phase's symbolic machinery for one equilibrium calculation.
#[derive(Debug)]
pub struct CompositionSet {
    name: String,
    frac_variable: String,
    models: Vec<Box<dyn EnergyModel>>,
    symbols: SymbolTable,
    /// Simplified nonzero first derivatives, keyed by differentiating variable.
    first_derivatives: Vec<(String, Expr)>,
    /// Simplified nonzero second derivatives, keyed by the ordered variable
    /// pair (main-index of the first <= main-index of the second).
    second_derivatives: Vec<((String, String), Expr)>,
    constraints: Vec<Constraint>,
    /// (constraint index, phase-variable index, derivative AST)
    constraint_jacobian: Vec<(usize, usize, Expr)>,
    /// Name <-> index map over this phase's own site-fraction variables, in
    /// canonical sublattice-major order.
    phase_indices: VariableMap,
    basis: ConstraintBasis,
}

impl CompositionSet {
    /// Build a composition set: models, derivative triangle, constraints,
    /// and the constraint null-space basis.
    ///
    /// `main_indices` is the global variable map of the whole calculation; it
    /// must contain every variable of this phase, including `{phase}_FRAC`.
    pub fn new(
        phase: &Phase,
        params: &ParameterSet,
        sublset: &SublatticeSet,
        main_indices: &VariableMap,
    ) -> PhaseResult<Self> {
        let name = phase.name.clone();
        let frac_variable = phase.frac_variable();

        let models: Vec<Box<dyn EnergyModel>> = vec![
            Box::new(PureCompoundEnergy::new(&name, sublset, params)),
            Box::new(IdealMixing::new(&name, sublset)),
            Box::new(RedlichKisterExcess::new(&name, sublset, params)),
            Box::new(IhjMagnetic::new(phase, sublset, params)),
        ];

        let mut symbols = SymbolTable::new();
        for model in &models {
            // Models police their own namespaces; later tables win on collision.
            symbols.extend(model.symbol_table().clone());
        }

        let owned = |var: &str| {
            var == frac_variable
                || var
                    .strip_prefix(name.as_str())
                    .is_some_and(|rest| rest.starts_with('_'))
        };

        // Ordered list of owned variables by main index
        let mut owned_vars: Vec<(String, usize)> = main_indices
            .iter()
            .filter(|(n, _)| owned(n))
            .map(|(n, i)| (n.to_string(), i))
            .collect();
        owned_vars.sort_by_key(|(_, i)| *i);

        // First derivatives
        let mut first_derivatives: Vec<(String, Expr)> = Vec::new();
        for (var, _) in &owned_vars {
            let derivative = if *var == frac_variable {
                // d m / d FRAC = m
                simplify(&Expr::add(models.iter().map(|m| m.ast().clone()).collect()))
            } else {
                let mut parts = Vec::with_capacity(models.len());
                for model in &models {
                    parts.push(differentiate_with_symbols(model.ast(), var, &symbols)?);
                }
                simplify(&Expr::add(parts))
            };
            if !derivative.is_literal_zero() {
                first_derivatives.push((var.clone(), derivative));
            }
        }
        // Second derivatives, upper triangle skipped
        let mut second_derivatives: Vec<((String, String), Expr)> = Vec::new();
        for (vi, (var_i, idx_i)) in owned_vars.iter().enumerate() {
            for (var_j, idx_j) in owned_vars.iter().skip(vi) {
                debug_assert!(idx_i <= idx_j);
                let is_frac_i = *var_i == frac_variable;
                let is_frac_j = *var_j == frac_variable;
                let derivative = if is_frac_i && is_frac_j {
                    // d^2 m / d FRAC^2 = 0
                    continue;
                } else if is_frac_i {
                    match find_derivative(&first_derivatives, var_j) {
                        Some(d) => d.clone(),
                        None => continue,
                    }
                } else if is_frac_j {
                    match find_derivative(&first_derivatives, var_i) {
                        Some(d) => d.clone(),
                        None => continue,
                    }
                } else {
                    let Some(base) = find_derivative(&first_derivatives, var_i) else {
                        continue;
                    };
                    simplify(&differentiate_with_symbols(base, var_j, &symbols)?)
                };
                if !derivative.is_literal_zero() {
                    second_derivatives.push(((var_i.clone(), var_j.clone()), derivative));
                }
            }
        }

        // Site-fraction balance constraints and phase-variable map
        let phase_indices = VariableMap::from_names(sublset.phase_variable_names(&name));
        let mut constraints = Vec::new();
        for s in 0..sublset.sublattice_count(&name) {
            let variables: Vec<String> = sublset
                .sublattice_entries(&name, s)
                .iter()
                .map(|e| e.variable_name())
                .collect();
            if !variables.is_empty() {
                constraints.push(Constraint::sublattice_balance(&name, s, &variables));
            }
        }

        // Constraint Jacobian ASTs
        let mut constraint_jacobian = Vec::new();
        for (var, _) in phase_indices.iter().map(|(n, i)| (n.to_string(), i)).collect::<Vec<_>>() {
            for (ci, constraint) in constraints.iter().enumerate() {
                let lhs = simplify(&differentiate(&constraint.lhs, &var));
                let rhs = simplify(&differentiate(&constraint.rhs, &var));
                if let (Some(l), Some(r)) = (lhs.as_num(), rhs.as_num()) {
                    if l == r {
                        continue; // zero entry, keep the Jacobian sparse
                    }
                }
                let var_index = phase_indices
                    .index_of(&var)
                    .expect("variable came from phase_indices");
                constraint_jacobian.push((ci, var_index, simplify(&Expr::sub(lhs, rhs))));
            }
        }

        // Linearized constraint matrix and its null space
        let mut a = DMatrix::<f64>::zeros(constraints.len(), phase_indices.len());
        for s in 0..sublset.sublattice_count(&name) {
            for entry in sublset.sublattice_entries(&name, s) {
                let var_index = phase_indices
                    .index_of(&entry.variable_name())
                    .ok_or_else(|| PhaseError::UnknownVariable {
                        name: entry.variable_name(),
                    })?;
                a[(s, var_index)] = 1.0;
            }
        }
        let basis = constraint_null_space(a)?;

        tracing::debug!(
            phase = %name,
            first = first_derivatives.len(),
            second = second_derivatives.len(),
            constraints = constraints.len(),
            "composition set built"
        );

        Ok(CompositionSet {
            name,
            frac_variable,
            models,
            symbols,
            first_derivatives,
            second_derivatives,
            constraints,
            constraint_jacobian,
            phase_indices,
            basis,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frac_variable(&self) -> &str {
        &self.frac_variable
    }

    pub fn models(&self) -> &[Box<dyn EnergyModel>] {
        &self.models
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    /// This phase's own site-fraction variables in canonical order.
    pub fn variable_map(&self) -> &VariableMap {
        &self.phase_indices
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Sparse constraint Jacobian entries: (constraint, variable, AST).
    pub fn constraint_jacobian(&self) -> &[(usize, usize, Expr)] {
        &self.constraint_jacobian
    }

    /// Orthonormal basis of the constraint null space (columns span ker A).
    pub fn null_space(&self) -> &DMatrix<f64> {
        &self.basis.null_space
    }

    /// Projector onto the constraint null space: Z Z^T.
    pub fn projector(&self) -> &DMatrix<f64> {
        &self.basis.projector
    }

    /// Total Gibbs energy of this phase: the sum over all model ASTs.
    pub fn evaluate_objective(
        &self,
        conditions: &EvalConditions,
        variables: &VariableMap,
        x: &[f64],
    ) -> PhaseResult<f64> {
        let mut objective = 0.0;
        for model in &self.models {
            objective += evaluate(model.ast(), conditions, variables, &self.symbols, x)?;
        }
        Ok(objective)
    }

    /// Convenience overload taking named variables; builds the fictitious
    /// index map internally.
    pub fn evaluate_objective_named(
        &self,
        conditions: &EvalConditions,
        variables: &BTreeMap<String, f64>,
    ) -> PhaseResult<f64> {
        let map = VariableMap::from_names(variables.keys().cloned());
        let values: Vec<f64> = variables.values().copied().collect();
        self.evaluate_objective(conditions, &map, &values)
    }

    /// Gradient of the phase contribution to total energy. Every entry is
    /// scaled by the phase fraction except the derivative with respect to
    /// the phase fraction itself.
    pub fn evaluate_objective_gradient(
        &self,
        conditions: &EvalConditions,
        variables: &VariableMap,
        x: &[f64],
    ) -> PhaseResult<DVector<f64>> {
        let frac_index = variables
            .index_of(&self.frac_variable)
            .ok_or_else(|| PhaseError::UnknownVariable {
                name: self.frac_variable.clone(),
            })?;
        let mut gradient = DVector::<f64>::zeros(variables.len());
        for (var, ast) in &self.first_derivatives {
            let index = variables
                .index_of(var)
                .ok_or_else(|| PhaseError::UnknownVariable { name: var.clone() })?;
            let value = evaluate(ast, conditions, variables, &self.symbols, x)?;
            if var == &self.frac_variable {
                gradient[index] += value;
            } else {
                gradient[index] += x[frac_index] * value;
            }
        }
        Ok(gradient)
    }

    /// Gradient without phase-fraction scaling, for single-phase contexts
    /// where the phase amount is 1. A phase-fraction entry is skipped when
    /// the variable map does not carry it.
    pub fn evaluate_single_phase_objective_gradient(
        &self,
        conditions: &EvalConditions,
        variables: &VariableMap,
        x: &[f64],
    ) -> PhaseResult<DVector<f64>> {
        let mut gradient = DVector::<f64>::zeros(variables.len());
        for (var, ast) in &self.first_derivatives {
            let index = match variables.index_of(var) {
                Some(i) => i,
                None if var == &self.frac_variable => continue,
                None => {
                    return Err(PhaseError::UnknownVariable { name: var.clone() });
                }
            };
            gradient[index] += evaluate(ast, conditions, variables, &self.symbols, x)?;
        }
        Ok(gradient)
    }

    /// Centered finite-difference gradient over this phase's own variables,
    /// provided for cross-validation of the symbolic derivatives.
    pub fn evaluate_internal_objective_gradient(
        &self,
        conditions: &EvalConditions,
        x: &[f64],
    ) -> PhaseResult<Vec<f64>> {
        const PERTURBATION: f64 = 1e-7;
        let n = self.phase_indices.len();
        let mut gradient = vec![0.0; n];
        let mut x_copy = x.to_vec();
        for i in 0..n {
            x_copy[i] = x[i] - PERTURBATION;
            let lower = self.evaluate_objective(conditions, &self.phase_indices, &x_copy)?;
            x_copy[i] = x[i] + PERTURBATION;
            let upper = self.evaluate_objective(conditions, &self.phase_indices, &x_copy)?;
            x_copy[i] = x[i];
            gradient[i] = (upper - lower) / (2.0 * PERTURBATION);
        }
        Ok(gradient)
    }

    /// Sparse Hessian of the phase contribution, keyed by the ordered index
    /// pair (i <= j). Entries are scaled by the phase fraction unless one of
    /// the differentiating variables is the phase fraction itself.
    pub fn evaluate_objective_hessian(
        &self,
        conditions: &EvalConditions,
        variables: &VariableMap,
        x: &[f64],
    ) -> PhaseResult<BTreeMap<(usize, usize), f64>> {
        let frac_index = variables
            .index_of(&self.frac_variable)
            .ok_or_else(|| PhaseError::UnknownVariable {
                name: self.frac_variable.clone(),
            })?;
        let mut hessian = BTreeMap::new();
        for ((var_i, var_j), ast) in &self.second_derivatives {
            let i = variables
                .index_of(var_i)
                .ok_or_else(|| PhaseError::UnknownVariable { name: var_i.clone() })?;
            let j = variables
                .index_of(var_j)
                .ok_or_else(|| PhaseError::UnknownVariable { name: var_j.clone() })?;
            let key = if i <= j { (i, j) } else { (j, i) };
            let value = evaluate(ast, conditions, variables, &self.symbols, x)?;
            let scaled = if var_i == &self.frac_variable || var_j == &self.frac_variable {
                value
            } else {
                x[frac_index] * value
            };
            *hessian.entry(key).or_insert(0.0) += scaled;
        }
        Ok(hessian)
    }

    /// Dense single-phase Hessian over the given variables; phase-fraction
    /// rows are skipped. Symmetric fill from the stored lower triangle.
    pub fn evaluate_objective_hessian_matrix(
        &self,
        conditions: &EvalConditions,
        variables: &VariableMap,
        x: &[f64],
    ) -> PhaseResult<DMatrix<f64>> {
        let n = variables.len();
        let mut matrix = DMatrix::<f64>::zeros(n, n);
        for ((var_i, var_j), ast) in &self.second_derivatives {
            if var_i == &self.frac_variable || var_j == &self.frac_variable {
                continue;
            }
            let i = variables
                .index_of(var_i)
                .ok_or_else(|| PhaseError::UnknownVariable { name: var_i.clone() })?;
            let j = variables
                .index_of(var_j)
                .ok_or_else(|| PhaseError::UnknownVariable { name: var_j.clone() })?;
            let value = evaluate(ast, conditions, variables, &self.symbols, x)?;
            matrix[(i, j)] += value;
            if i != j {
                matrix[(j, i)] += value;
            }
        }
        Ok(matrix)
    }

    /// Structurally nonzero Hessian entries {(i, j) : i <= j}.
    pub fn hessian_sparsity_structure(
        &self,
        variables: &VariableMap,
    ) -> PhaseResult<BTreeSet<(usize, usize)>> {
        let mut structure = BTreeSet::new();
        for ((var_i, var_j), _) in &self.second_derivatives {
            let i = variables
                .index_of(var_i)
                .ok_or_else(|| PhaseError::UnknownVariable { name: var_i.clone() })?;
            let j = variables
                .index_of(var_j)
                .ok_or_else(|| PhaseError::UnknownVariable { name: var_j.clone() })?;
            structure.insert(if i <= j { (i, j) } else { (j, i) });
        }
        Ok(structure)
    }

    /// Deep copy with every occurrence of the phase name rewritten, for
    /// miscibility-gap duplication. The constraint basis is structural and
    /// carries over unchanged.
    pub fn clone_with_renamed_phase(&self, new_name: &str) -> CompositionSet {
        let old = self.name.as_str();
        CompositionSet {
            name: new_name.to_string(),
            frac_variable: format!("{new_name}_FRAC"),
            models: self
                .models
                .iter()
                .map(|m| m.clone_with_renamed_phase(old, new_name))
                .collect(),
            symbols: self
                .symbols
                .iter()
                .map(|(k, v)| {
                    (
                        eq_expr::tree::rename_variable(k, old, new_name),
                        v.rename_phase(old, new_name),
                    )
                })
                .collect(),
            first_derivatives: self
                .first_derivatives
                .iter()
                .map(|(v, d)| {
                    (
                        eq_expr::tree::rename_variable(v, old, new_name),
                        d.rename_phase(old, new_name),
                    )
                })
                .collect(),
            second_derivatives: self
                .second_derivatives
                .iter()
                .map(|((a, b), d)| {
                    (
                        (
                            eq_expr::tree::rename_variable(a, old, new_name),
                            eq_expr::tree::rename_variable(b, old, new_name),
                        ),
                        d.rename_phase(old, new_name),
                    )
                })
                .collect(),
            constraints: self
                .constraints
                .iter()
                .map(|c| Constraint {
                    name: eq_expr::tree::rename_variable(&c.name, old, new_name),
                    lhs: c.lhs.rename_phase(old, new_name),
                    rhs: c.rhs.rename_phase(old, new_name),
                })
                .collect(),
            constraint_jacobian: self
                .constraint_jacobian
                .iter()
                .map(|(c, v, ast)| (*c, *v, ast.rename_phase(old, new_name)))
                .collect(),
            phase_indices: self.phase_indices.rename_phase(old, new_name),
            basis: self.basis.clone(),
        }
    }
}
