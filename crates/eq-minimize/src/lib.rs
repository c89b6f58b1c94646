//! eq-minimize: global minimization of the total Gibbs energy.
//!
//! The pipeline, leaves first: sample each active phase's internal
//! composition space, take each phase's lower convex hull over internal
//! coordinates, re-express the survivors in shared mole-fraction space,
//! take the global lower hull, and extract the facet containing the
//! user-specified overall composition. Its vertices are the tie points.
//!
//! Everything is single-threaded and synchronous; hull points and facets
//! live only for the duration of one [`GlobalMinimizer::run`].

pub mod error;
pub mod hull_map;
pub mod minimizer;
pub mod sample;

pub use error::{MinimizeError, MinimizeResult};
pub use hull_map::{HullEntry, HullMap};
pub use minimizer::{GlobalMinimizer, MinimizerSettings, TiePoint};
pub use sample::{point_sample, SamplerSettings, MIN_SITE_FRACTION};
