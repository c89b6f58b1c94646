//! Sublattice/species data model.
//!
//! A phase is a collection of sublattices; each sublattice carries a site
//! multiplicity and a set of distinct species. Every (phase, sublattice,
//! species) triple owns one site-fraction variable named
//! `"{phase}_{sublattice}_{species}"`, and each phase additionally carries a
//! phase-fraction variable `"{phase}_FRAC"`.
//!
//! Entries live in an arena `Vec`; two maps index the same records, one by
//! (phase, sublattice index) and one by variable name.

use crate::error::{PhaseError, PhaseResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// A named atomic or pseudo-atomic constituent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Species(String);

impl Species {
    pub fn new(name: impl Into<String>) -> Self {
        Species(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One (phase, sublattice, species) record with its site multiplicity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SublatticeEntry {
    pub phase: String,
    pub sublattice_index: usize,
    pub species: Species,
    pub site_count: f64,
}

impl SublatticeEntry {
    /// The site-fraction variable this entry owns.
    pub fn variable_name(&self) -> String {
        format!(
            "{}_{}_{}",
            self.phase,
            self.sublattice_index,
            self.species.name()
        )
    }
}

/// Named phase with its scalar magnetic attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    /// Antiferromagnetic factor (divides negative Curie temperatures and
    /// Bohr magneton numbers in the IHJ model).
    pub magnetic_afm_factor: f64,
    /// Short-range-order enthalpy fraction p of the IHJ model.
    pub magnetic_sro_fraction: f64,
}

impl Phase {
    pub fn new(name: impl Into<String>) -> Self {
        Phase {
            name: name.into(),
            magnetic_afm_factor: -1.0,
            magnetic_sro_fraction: 0.4,
        }
    }

    pub fn with_magnetics(mut self, afm_factor: f64, sro_fraction: f64) -> Self {
        self.magnetic_afm_factor = afm_factor;
        self.magnetic_sro_fraction = sro_fraction;
        self
    }

    /// The phase-fraction variable, in [0, 1]; sums to 1 over active phases.
    pub fn frac_variable(&self) -> String {
        format!("{}_FRAC", self.name)
    }
}

/// Arena of sublattice entries for every phase in the system.
#[derive(Debug, Clone, Default)]
pub struct SublatticeSet {
    entries: Vec<SublatticeEntry>,
    by_phase_sublattice: BTreeMap<(String, usize), Vec<usize>>,
    by_variable: HashMap<String, usize>,
}

impl SublatticeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one (phase, sublattice, species) record. Species must be distinct
    /// within a sublattice and the site count positive.
    pub fn add_entry(&mut self, entry: SublatticeEntry) -> PhaseResult<usize> {
        if !entry.site_count.is_finite() || entry.site_count <= 0.0 {
            return Err(PhaseError::InvalidSublattice {
                what: format!(
                    "non-positive site count {} for {}",
                    entry.site_count,
                    entry.variable_name()
                ),
            });
        }
        let var = entry.variable_name();
        if self.by_variable.contains_key(&var) {
            return Err(PhaseError::InvalidSublattice {
                what: format!("duplicate species {var} within a sublattice"),
            });
        }
        let idx = self.entries.len();
        self.by_phase_sublattice
            .entry((entry.phase.clone(), entry.sublattice_index))
            .or_default()
            .push(idx);
        self.by_variable.insert(var, idx);
        self.entries.push(entry);
        Ok(idx)
    }

    /// Convenience: add a whole sublattice at once.
    pub fn add_sublattice(
        &mut self,
        phase: &str,
        sublattice_index: usize,
        site_count: f64,
        species: &[Species],
    ) -> PhaseResult<()> {
        for sp in species {
            self.add_entry(SublatticeEntry {
                phase: phase.to_string(),
                sublattice_index,
                species: sp.clone(),
                site_count,
            })?;
        }
        Ok(())
    }

    pub fn entry(&self, index: usize) -> Option<&SublatticeEntry> {
        self.entries.get(index)
    }

    pub fn entry_by_variable(&self, name: &str) -> Option<&SublatticeEntry> {
        self.by_variable.get(name).map(|&i| &self.entries[i])
    }

    /// Entries of one sublattice, in insertion order.
    pub fn sublattice_entries(&self, phase: &str, sublattice_index: usize) -> Vec<&SublatticeEntry> {
        self.by_phase_sublattice
            .get(&(phase.to_string(), sublattice_index))
            .map(|ids| ids.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Number of sublattices of a phase (consecutive indices from 0).
    pub fn sublattice_count(&self, phase: &str) -> usize {
        let mut count = 0;
        while self
            .by_phase_sublattice
            .contains_key(&(phase.to_string(), count))
        {
            count += 1;
        }
        count
    }

    /// All site-fraction variable names of a phase, sublattice-major, in
    /// insertion order. This is the canonical internal-coordinate ordering.
    pub fn phase_variable_names(&self, phase: &str) -> Vec<String> {
        let mut names = Vec::new();
        for s in 0..self.sublattice_count(phase) {
            for entry in self.sublattice_entries(phase, s) {
                names.push(entry.variable_name());
            }
        }
        names
    }

    /// Total site count of a phase: each sublattice's multiplicity counted
    /// once. Used to normalize the energy models per mole of sites.
    pub fn total_sites(&self, phase: &str) -> f64 {
        let mut total = 0.0;
        for s in 0..self.sublattice_count(phase) {
            if let Some(entry) = self.sublattice_entries(phase, s).first() {
                total += entry.site_count;
            }
        }
        total
    }

    /// Indices (into the canonical internal-coordinate ordering) of the
    /// dependent site fraction of each sublattice: the last species.
    pub fn dependent_dimensions(&self, phase: &str) -> BTreeSet<usize> {
        let mut deps = BTreeSet::new();
        let mut offset = 0;
        for s in 0..self.sublattice_count(phase) {
            let n = self.sublattice_entries(phase, s).len();
            if n > 0 {
                deps.insert(offset + n - 1);
                offset += n;
            }
        }
        deps
    }

    /// Species lists per sublattice, in canonical order.
    pub fn species_per_sublattice(&self, phase: &str) -> Vec<Vec<Species>> {
        (0..self.sublattice_count(phase))
            .map(|s| {
                self.sublattice_entries(phase, s)
                    .iter()
                    .map(|e| e.species.clone())
                    .collect()
            })
            .collect()
    }
}
