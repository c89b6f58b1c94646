//! Expression tree representation.
//!
//! A tagged recursive node: literal number, symbol name, or function
//! application with a head and arguments. `Add` and `Mul` are n-ary so that
//! model builders can accumulate terms without deep right-leaning chains.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Function heads recognized by the evaluator and the calculus passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Head {
    /// n-ary sum
    Add,
    /// binary subtraction
    Sub,
    /// n-ary product
    Mul,
    /// binary quotient
    Div,
    /// binary power
    Pow,
    /// natural logarithm
    Ln,
    /// exponential
    Exp,
    /// Temperature-bounded piecewise: flat `[lo, hi, branch]` triples with
    /// numeric bounds, ordered so that `lo <= T < hi` selects one branch.
    Piecewise,
    /// Guarded conditional `if a < b { then } else { otherwise }`, with args
    /// `[a, b, then, otherwise]`. Used where a branch split depends on a
    /// derived quantity (e.g. the magnetic tau = T/Tc), which the
    /// temperature-bounded `Piecewise` cannot express.
    IfLess,
}

/// A symbolic expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal number.
    Num(f64),
    /// Symbol reference: a state variable ('T', 'P'), an indexed variable
    /// (site fraction, phase fraction), or a named symbol-table entry.
    Sym(String),
    /// Function application.
    Op { head: Head, args: Vec<Expr> },
}

/// Mapping from symbol name to a pre-computed expression, resolved on demand
/// during evaluation. Symbols may reference other symbols; cycles are
/// malformed input and detected at evaluation time.
pub type SymbolTable = BTreeMap<String, Expr>;

impl Expr {
    pub fn num(v: f64) -> Self {
        Expr::Num(v)
    }

    pub fn sym(name: impl Into<String>) -> Self {
        Expr::Sym(name.into())
    }

    pub fn op(head: Head, args: Vec<Expr>) -> Self {
        Expr::Op { head, args }
    }

    pub fn add(args: Vec<Expr>) -> Self {
        Expr::Op {
            head: Head::Add,
            args,
        }
    }

    pub fn sub(a: Expr, b: Expr) -> Self {
        Expr::Op {
            head: Head::Sub,
            args: vec![a, b],
        }
    }

    pub fn mul(args: Vec<Expr>) -> Self {
        Expr::Op {
            head: Head::Mul,
            args,
        }
    }

    pub fn div(a: Expr, b: Expr) -> Self {
        Expr::Op {
            head: Head::Div,
            args: vec![a, b],
        }
    }

    pub fn pow(base: Expr, exponent: Expr) -> Self {
        Expr::Op {
            head: Head::Pow,
            args: vec![base, exponent],
        }
    }

    pub fn ln(a: Expr) -> Self {
        Expr::Op {
            head: Head::Ln,
            args: vec![a],
        }
    }

    pub fn exp(a: Expr) -> Self {
        Expr::Op {
            head: Head::Exp,
            args: vec![a],
        }
    }

    /// Build a temperature-bounded piecewise expression from ordered
    /// `(lo, hi, branch)` triples.
    pub fn piecewise(branches: Vec<(f64, f64, Expr)>) -> Self {
        let mut args = Vec::with_capacity(branches.len() * 3);
        for (lo, hi, branch) in branches {
            args.push(Expr::Num(lo));
            args.push(Expr::Num(hi));
            args.push(branch);
        }
        Expr::Op {
            head: Head::Piecewise,
            args,
        }
    }

    pub fn if_less(a: Expr, b: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Op {
            head: Head::IfLess,
            args: vec![a, b, then, otherwise],
        }
    }

    /// Structural test for a literal numeric zero (no simplification).
    pub fn is_literal_zero(&self) -> bool {
        matches!(self, Expr::Num(v) if *v == 0.0)
    }

    /// Structural test for a literal numeric one.
    pub fn is_literal_one(&self) -> bool {
        matches!(self, Expr::Num(v) if *v == 1.0)
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Expr::Num(v) => Some(*v),
            _ => None,
        }
    }

    /// Rewrite every symbol whose name is `old` or starts with `old + "_"`,
    /// substituting `new` for the `old` prefix. Pure functional rewrite, used
    /// when a composition set is duplicated for a miscibility gap.
    pub fn rename_phase(&self, old: &str, new: &str) -> Expr {
        match self {
            Expr::Num(v) => Expr::Num(*v),
            Expr::Sym(name) => Expr::Sym(rename_variable(name, old, new)),
            Expr::Op { head, args } => Expr::Op {
                head: *head,
                args: args.iter().map(|a| a.rename_phase(old, new)).collect(),
            },
        }
    }
}

/// Apply the phase-prefix rename rule to a single variable name.
pub fn rename_variable(name: &str, old: &str, new: &str) -> String {
    if name == old {
        new.to_string()
    } else if let Some(rest) = name.strip_prefix(old) {
        if rest.starts_with('_') {
            format!("{new}{rest}")
        } else {
            name.to_string()
        }
    } else {
        name.to_string()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(v) => write!(f, "{v}"),
            Expr::Sym(s) => write!(f, "{s}"),
            Expr::Op { head, args } => {
                write!(f, "({head:?}")?;
                for a in args {
                    write!(f, " {a}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Bidirectional name <-> index map for a set of variables.
///
/// Insertion order assigns indices; both directions are O(1). Replaces the
/// string/int bimap the evaluation contract is written against.
#[derive(Debug, Clone, Default)]
pub struct VariableMap {
    names: Vec<String>,
    indices: HashMap<String, usize>,
}

impl VariableMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::new();
        for name in names {
            map.insert(name);
        }
        map
    }

    /// Insert a variable, returning its index. Re-inserting an existing name
    /// returns the original index.
    pub fn insert(&mut self, name: impl Into<String>) -> usize {
        let name = name.into();
        if let Some(&idx) = self.indices.get(&name) {
            return idx;
        }
        let idx = self.names.len();
        self.indices.insert(name.clone(), idx);
        self.names.push(name);
        idx
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over `(name, index)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.names.iter().enumerate().map(|(i, n)| (n.as_str(), i))
    }

    /// Clone with every variable name passed through the phase-rename rule.
    /// Indices are preserved.
    pub fn rename_phase(&self, old: &str, new: &str) -> Self {
        Self::from_names(self.names.iter().map(|n| rename_variable(n, old, new)))
    }
}
