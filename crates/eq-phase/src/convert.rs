//! Site-fraction to mole-fraction conversion.
//!
//! Internal coordinates are site fractions in the canonical sublattice-major
//! ordering; the shared global coordinate system is mole fractions. The
//! conversion weights each site fraction by its sublattice's site
//! multiplicity and renormalizes so the result sums to 1.

use crate::sublattice::SublatticeSet;
use std::collections::BTreeMap;

/// Convert one internal point of a phase into mole fractions keyed by
/// species name. `point` is indexed by the phase's canonical variable order.
pub fn site_fractions_to_mole_fractions(
    phase: &str,
    sublset: &SublatticeSet,
    point: &[f64],
) -> BTreeMap<String, f64> {
    let mut moles: BTreeMap<String, f64> = BTreeMap::new();
    let mut offset = 0;
    for s in 0..sublset.sublattice_count(phase) {
        for entry in sublset.sublattice_entries(phase, s) {
            let y = point.get(offset).copied().unwrap_or(0.0);
            *moles.entry(entry.species.name().to_string()).or_insert(0.0) +=
                entry.site_count * y;
            offset += 1;
        }
    }
    let total: f64 = moles.values().sum();
    if total > 0.0 {
        for value in moles.values_mut() {
            *value /= total;
        }
    }
    moles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sublattice::Species;

    #[test]
    fn endmember_maps_to_basis_vector() {
        let mut set = SublatticeSet::new();
        set.add_sublattice("LIQ", 0, 1.0, &[Species::new("A"), Species::new("B")])
            .unwrap();
        // Pure A
        let x = site_fractions_to_mole_fractions("LIQ", &set, &[1.0, 0.0]);
        assert_eq!(x.get("A"), Some(&1.0));
        assert_eq!(x.get("B"), Some(&0.0));
    }

    #[test]
    fn multiplicities_weight_the_sum() {
        // (A,B)_3 (B)_1: y_A = y_B = 0.5 on the first sublattice
        let mut set = SublatticeSet::new();
        set.add_sublattice("SIG", 0, 3.0, &[Species::new("A"), Species::new("B")])
            .unwrap();
        set.add_sublattice("SIG", 1, 1.0, &[Species::new("B")]).unwrap();
        let x = site_fractions_to_mole_fractions("SIG", &set, &[0.5, 0.5, 1.0]);
        // moles: A = 1.5, B = 1.5 + 1 = 2.5, total 4
        assert!((x["A"] - 0.375).abs() < 1e-12);
        assert!((x["B"] - 0.625).abs() < 1e-12);
    }

    #[test]
    fn result_sums_to_one() {
        let mut set = SublatticeSet::new();
        set.add_sublattice(
            "FCC",
            0,
            1.0,
            &[Species::new("AL"), Species::new("CR"), Species::new("NI")],
        )
        .unwrap();
        let x = site_fractions_to_mole_fractions("FCC", &set, &[0.2, 0.3, 0.5]);
        let sum: f64 = x.values().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }
}
