//! eq-hull: lower convex hull of points in (composition, energy) space.
//!
//! The minimizer poses two hull problems: one per phase over internal
//! coordinates, and one global over mole fractions. Both want only the
//! *lower* hull (facets whose outward normal points down in energy) and both
//! carry dependent coordinates that must be ignored geometrically (the last
//! species of each sublattice, or the last mole fraction).
//!
//! Degenerate inputs are handled locally rather than surfaced: a single
//! point, or too few points to span the reduced space, produce one
//! degenerate facet over all inputs.

pub mod error;
pub mod facet;
pub mod lower_hull;

pub use error::{HullError, HullResult};
pub use facet::{drop_dependent_dimensions, restore_dependent_dimensions, Facet};
pub use lower_hull::lower_convex_hull;
