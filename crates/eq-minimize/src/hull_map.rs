//! Append-only store of candidate hull points.

use serde::Serialize;
use std::collections::BTreeMap;

/// One candidate point: internal coordinates, shared global coordinates,
/// energy, and whether it survived onto the global hull.
#[derive(Debug, Clone, Serialize)]
pub struct HullEntry {
    pub phase_name: String,
    /// Site fractions in the phase's canonical variable order.
    pub internal_coordinates: Vec<f64>,
    /// Mole fractions keyed by element.
    pub global_coordinates: BTreeMap<String, f64>,
    pub energy: f64,
    pub on_global_hull: bool,
}

/// Append-only point store indexed by integer id.
#[derive(Debug, Clone, Default)]
pub struct HullMap {
    entries: Vec<HullEntry>,
}

impl HullMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a point, returning its id.
    pub fn insert_point(
        &mut self,
        phase_name: impl Into<String>,
        energy: f64,
        internal_coordinates: Vec<f64>,
        global_coordinates: BTreeMap<String, f64>,
    ) -> usize {
        let id = self.entries.len();
        self.entries.push(HullEntry {
            phase_name: phase_name.into(),
            internal_coordinates,
            global_coordinates,
            energy,
            on_global_hull: false,
        });
        id
    }

    pub fn get(&self, id: usize) -> Option<&HullEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_global_hull_status(&mut self, id: usize, on_hull: bool) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.on_global_hull = on_hull;
        }
    }

    /// All stored points in insertion (id) order.
    pub fn entries(&self) -> &[HullEntry] {
        &self.entries
    }
}
