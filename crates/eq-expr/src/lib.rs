//! eq-expr: symbolic expression layer for Gibbs-energy models.
//!
//! Energy models produce expression trees once, at composition-set
//! construction; the minimizer then evaluates them (and their symbolic
//! derivatives) many thousands of times per run. The split between the
//! operations reflects that:
//!
//! - [`simplify`] is a single bottom-up pass and is idempotent
//! - [`differentiate`] performs no simplification of its own, so the two
//!   phases compose: callers simplify afterwards
//! - [`evaluate`] resolves state variables, indexed variables, and named
//!   symbols (with cycle detection), failing loudly on anything undefined

pub mod diff;
pub mod error;
pub mod eval;
pub mod simplify;
pub mod tree;

pub use diff::{differentiate, differentiate_with_symbols};
pub use error::{ExprError, ExprResult};
pub use eval::evaluate;
pub use simplify::{is_zero, simplify};
pub use tree::{Expr, Head, SymbolTable, VariableMap};
