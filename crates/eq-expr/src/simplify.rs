//! Single-pass bottom-up simplification.
//!
//! Constant-folds pure-numeric subtrees, collapses arithmetic identities
//! (`x+0`, `x*1`, `x*0`, `x/1`, `x^1`, `x^0`), and flattens nested `Add`/`Mul`
//! with the same head. The pass is idempotent: `simplify(simplify(t)) ==
//! simplify(t)`. Differentiation never simplifies internally, so the two
//! passes compose in either order up to algebraic equivalence.

use crate::tree::{Expr, Head};

/// Simplify an expression in one bottom-up pass.
pub fn simplify(expr: &Expr) -> Expr {
    match expr {
        Expr::Num(v) => Expr::Num(*v),
        Expr::Sym(s) => Expr::Sym(s.clone()),
        Expr::Op { head, args } => {
            let args: Vec<Expr> = args.iter().map(simplify).collect();
            simplify_node(*head, args)
        }
    }
}

/// True iff the expression simplifies to a literal numeric zero.
pub fn is_zero(expr: &Expr) -> bool {
    simplify(expr).is_literal_zero()
}

fn simplify_node(head: Head, args: Vec<Expr>) -> Expr {
    match head {
        Head::Add => simplify_add(args),
        Head::Mul => simplify_mul(args),
        Head::Sub => simplify_sub(args),
        Head::Div => simplify_div(args),
        Head::Pow => simplify_pow(args),
        Head::Ln => {
            if let Some(v) = args.first().and_then(Expr::as_num) {
                let r = v.ln();
                if r.is_finite() {
                    return Expr::Num(r);
                }
            }
            Expr::Op { head, args }
        }
        Head::Exp => {
            if let Some(v) = args.first().and_then(Expr::as_num) {
                let r = v.exp();
                if r.is_finite() {
                    return Expr::Num(r);
                }
            }
            Expr::Op { head, args }
        }
        // Branch bodies were already simplified bottom-up; bounds stay put.
        Head::Piecewise => Expr::Op { head, args },
        Head::IfLess => {
            // A decidable guard selects its branch outright.
            if args.len() == 4 {
                if let (Some(a), Some(b)) = (args[0].as_num(), args[1].as_num()) {
                    let chosen = if a < b { args[2].clone() } else { args[3].clone() };
                    return chosen;
                }
            }
            Expr::Op { head, args }
        }
    }
}

fn simplify_add(args: Vec<Expr>) -> Expr {
    let mut terms: Vec<Expr> = Vec::with_capacity(args.len());
    let mut constant = 0.0;
    for arg in args {
        match arg {
            Expr::Num(v) => constant += v,
            // Flatten nested sums
            Expr::Op {
                head: Head::Add,
                args: inner,
            } => {
                for t in inner {
                    match t {
                        Expr::Num(v) => constant += v,
                        other => terms.push(other),
                    }
                }
            }
            other => terms.push(other),
        }
    }
    if constant != 0.0 {
        terms.push(Expr::Num(constant));
    }
    match terms.len() {
        0 => Expr::Num(0.0),
        1 => terms.pop().expect("len checked"),
        _ => Expr::Op {
            head: Head::Add,
            args: terms,
        },
    }
}

fn simplify_mul(args: Vec<Expr>) -> Expr {
    let mut factors: Vec<Expr> = Vec::with_capacity(args.len());
    let mut constant = 1.0;
    for arg in args {
        match arg {
            Expr::Num(v) => {
                if v == 0.0 {
                    return Expr::Num(0.0);
                }
                constant *= v;
            }
            // Flatten nested products
            Expr::Op {
                head: Head::Mul,
                args: inner,
            } => {
                for fct in inner {
                    match fct {
                        Expr::Num(v) => {
                            if v == 0.0 {
                                return Expr::Num(0.0);
                            }
                            constant *= v;
                        }
                        other => factors.push(other),
                    }
                }
            }
            other => factors.push(other),
        }
    }
    if constant != 1.0 {
        factors.push(Expr::Num(constant));
    }
    match factors.len() {
        0 => Expr::Num(1.0),
        1 => factors.pop().expect("len checked"),
        _ => Expr::Op {
            head: Head::Mul,
            args: factors,
        },
    }
}

fn simplify_sub(mut args: Vec<Expr>) -> Expr {
    if args.len() != 2 {
        return Expr::Op {
            head: Head::Sub,
            args,
        };
    }
    let b = args.pop().expect("len checked");
    let a = args.pop().expect("len checked");
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => Expr::Num(x - y),
        (_, Some(y)) if y == 0.0 => a,
        (Some(x), _) if x == 0.0 => {
            // 0 - b == (-1) * b
            Expr::Op {
                head: Head::Mul,
                args: vec![b, Expr::Num(-1.0)],
            }
        }
        _ => Expr::Op {
            head: Head::Sub,
            args: vec![a, b],
        },
    }
}

fn simplify_div(mut args: Vec<Expr>) -> Expr {
    if args.len() != 2 {
        return Expr::Op {
            head: Head::Div,
            args,
        };
    }
    let b = args.pop().expect("len checked");
    let a = args.pop().expect("len checked");
    if a.is_literal_zero() {
        return Expr::Num(0.0);
    }
    if b.is_literal_one() {
        return a;
    }
    if let (Some(x), Some(y)) = (a.as_num(), b.as_num()) {
        if y != 0.0 {
            return Expr::Num(x / y);
        }
    }
    Expr::Op {
        head: Head::Div,
        args: vec![a, b],
    }
}

fn simplify_pow(mut args: Vec<Expr>) -> Expr {
    if args.len() != 2 {
        return Expr::Op {
            head: Head::Pow,
            args,
        };
    }
    let e = args.pop().expect("len checked");
    let b = args.pop().expect("len checked");
    if e.is_literal_zero() {
        return Expr::Num(1.0);
    }
    if e.is_literal_one() {
        return b;
    }
    if let (Some(base), Some(exponent)) = (b.as_num(), e.as_num()) {
        let r = base.powf(exponent);
        if r.is_finite() {
            return Expr::Num(r);
        }
    }
    Expr::Op {
        head: Head::Pow,
        args: vec![b, e],
    }
}
