//! Thermodynamic parameter storage and pattern matching.
//!
//! A parameter is keyed by (phase, kind) and by its interacting
//! sublattice-species pattern: one multiset of species per sublattice. An
//! endmember parameter has a single species in every position; interaction
//! parameters carry two or three species on one sublattice. Patterns are
//! stored sorted so matching is multiset equality per sublattice.

use crate::sublattice::Species;
use eq_expr::{Expr, SymbolTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameter type, mirroring the database parameter keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Reference / endmember Gibbs energy
    G,
    /// Excess interaction energy
    L,
    /// Curie / Neel temperature
    Tc,
    /// Bohr magneton number
    Bmagn,
}

/// One parameter: temperature-dependent AST plus its matching key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub phase: String,
    pub kind: ParameterKind,
    /// One species multiset per sublattice (kept sorted).
    pub pattern: Vec<Vec<Species>>,
    /// Redlich-Kister polynomial order.
    pub order: i32,
    pub ast: Expr,
}

impl Parameter {
    pub fn new(
        phase: impl Into<String>,
        kind: ParameterKind,
        pattern: Vec<Vec<Species>>,
        order: i32,
        ast: Expr,
    ) -> Self {
        let mut pattern = pattern;
        for slot in &mut pattern {
            slot.sort();
        }
        Parameter {
            phase: phase.into(),
            kind,
            pattern,
            order,
            ast,
        }
    }
}

/// Set of parameters indexed by (phase, kind), plus the named symbols
/// (temperature functions) their ASTs may reference.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    params: Vec<Parameter>,
    by_phase_kind: BTreeMap<(String, ParameterKind), Vec<usize>>,
    symbols: SymbolTable,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a named symbol (e.g. a GHSER reference function).
    pub fn add_symbol(&mut self, name: impl Into<String>, body: Expr) {
        self.symbols.insert(name.into(), body);
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn add(&mut self, param: Parameter) {
        let key = (param.phase.clone(), param.kind);
        self.by_phase_kind
            .entry(key)
            .or_default()
            .push(self.params.len());
        self.params.push(param);
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// All parameters of the given phase and kind.
    pub fn of_kind(&self, phase: &str, kind: ParameterKind) -> Vec<&Parameter> {
        self.by_phase_kind
            .get(&(phase.to_string(), kind))
            .map(|ids| ids.iter().map(|&i| &self.params[i]).collect())
            .unwrap_or_default()
    }

    /// Parameters of any of the given kinds whose pattern matches the species
    /// selection (one multiset per sublattice), sorted by order. A missing
    /// pattern simply yields no matches; callers treat that as zero.
    pub fn matching(
        &self,
        phase: &str,
        kinds: &[ParameterKind],
        selection: &[Vec<Species>],
    ) -> Vec<&Parameter> {
        let mut sorted_selection: Vec<Vec<Species>> = selection.to_vec();
        for slot in &mut sorted_selection {
            slot.sort();
        }
        let mut found: Vec<&Parameter> = Vec::new();
        for kind in kinds {
            for param in self.of_kind(phase, *kind) {
                if param.pattern == sorted_selection {
                    found.push(param);
                }
            }
        }
        found.sort_by_key(|p| p.order);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn species(names: &[&str]) -> Vec<Species> {
        names.iter().map(|n| Species::new(*n)).collect()
    }

    #[test]
    fn endmember_lookup() {
        let mut set = ParameterSet::new();
        set.add(Parameter::new(
            "LIQUID",
            ParameterKind::G,
            vec![species(&["A"])],
            0,
            Expr::num(-1000.0),
        ));
        let found = set.matching("LIQUID", &[ParameterKind::G], &[species(&["A"])]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].order, 0);
        let missing = set.matching("LIQUID", &[ParameterKind::G], &[species(&["B"])]);
        assert!(missing.is_empty());
    }

    #[test]
    fn interaction_matching_is_order_sorted_and_multiset() {
        let mut set = ParameterSet::new();
        set.add(Parameter::new(
            "LIQUID",
            ParameterKind::L,
            vec![species(&["B", "A"])],
            1,
            Expr::num(500.0),
        ));
        set.add(Parameter::new(
            "LIQUID",
            ParameterKind::L,
            vec![species(&["A", "B"])],
            0,
            Expr::num(30_000.0),
        ));
        // Selection order must not matter
        let found = set.matching("LIQUID", &[ParameterKind::L], &[species(&["B", "A"])]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].order, 0);
        assert_eq!(found[1].order, 1);
    }

    #[test]
    fn kinds_are_isolated() {
        let mut set = ParameterSet::new();
        set.add(Parameter::new(
            "BCC",
            ParameterKind::Tc,
            vec![species(&["FE"])],
            0,
            Expr::num(1043.0),
        ));
        assert!(set
            .matching("BCC", &[ParameterKind::G], &[species(&["FE"])])
            .is_empty());
        assert_eq!(
            set.matching("BCC", &[ParameterKind::Tc], &[species(&["FE"])])
                .len(),
            1
        );
    }
}
