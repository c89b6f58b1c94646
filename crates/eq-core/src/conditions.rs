//! Thermodynamic evaluation conditions.
//!
//! An equilibrium calculation is posed against a fixed set of state variables
//! (temperature, pressure, ...), an ordered component list, per-phase
//! statuses, and the system-wide mole fractions. The ordering of `elements`
//! matters: the last element is the dependent mole-fraction coordinate and is
//! dropped from geometric consideration by the hull stages.

use crate::error::{EqError, EqResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Molar gas constant [J/(mol K)], Thermo-Calc value.
pub const GAS_CONSTANT: f64 = 8.3145;

/// How far the overall mole fractions may stray from summing to 1.
const COMPOSITION_SUM_TOLERANCE: f64 = 1e-10;

/// Status of a phase in the current calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseStatus {
    /// Phase participates in minimization.
    Entered,
    /// Phase is excluded from the calculation entirely.
    Suspended,
    /// Phase amount is fixed by the caller; it still contributes energy.
    Fixed,
}

/// Conditions under which Gibbs energy expressions are evaluated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalConditions {
    /// State variable values keyed by single-character name ('T', 'P', ...).
    pub statevars: BTreeMap<char, f64>,
    /// Components under consideration; the last one is the dependent
    /// mole-fraction coordinate.
    pub elements: Vec<String>,
    /// Phases under consideration.
    pub phases: BTreeMap<String, PhaseStatus>,
    /// System mole fractions, one entry per element, summing to 1.
    pub xfrac: BTreeMap<String, f64>,
}

impl EvalConditions {
    /// Look up a state variable by its single-character name.
    pub fn statevar(&self, name: char) -> Option<f64> {
        self.statevars.get(&name).copied()
    }

    /// Temperature [K], if set.
    pub fn temperature(&self) -> Option<f64> {
        self.statevar('T')
    }

    /// Whether a phase takes part in the minimization grid.
    ///
    /// Suspended phases are skipped; entered and fixed phases both
    /// contribute candidate points.
    pub fn is_active(&self, phase: &str) -> bool {
        !matches!(self.phases.get(phase), Some(PhaseStatus::Suspended))
    }

    /// Independent elements: all but the last (dependent) component.
    pub fn independent_elements(&self) -> &[String] {
        let n = self.elements.len();
        if n == 0 {
            &[]
        } else {
            &self.elements[..n - 1]
        }
    }

    /// Check that the conditions pose a well-formed problem: components are
    /// listed, the temperature is set and finite, every component has an
    /// overall mole fraction, and the fractions balance. Pressure is not
    /// required here; models that reference 'P' fail at evaluation time.
    ///
    /// Individual fractions are deliberately not range-checked: probing a
    /// nonphysical overall composition is allowed and simply finds no
    /// containing facet.
    pub fn validate(&self) -> EqResult<()> {
        if self.elements.is_empty() {
            return Err(EqError::NoElements);
        }
        let t = self
            .temperature()
            .ok_or(EqError::MissingStateVariable { name: 'T' })?;
        if !t.is_finite() {
            return Err(EqError::NonFiniteStateVariable { name: 'T', value: t });
        }
        for element in &self.elements {
            if !self.xfrac.contains_key(element) {
                return Err(EqError::MissingComposition {
                    element: element.clone(),
                });
            }
        }
        let sum: f64 = self.xfrac.values().sum();
        if !((sum - 1.0).abs() <= COMPOSITION_SUM_TOLERANCE) {
            return Err(EqError::UnbalancedComposition { sum });
        }
        Ok(())
    }
}
