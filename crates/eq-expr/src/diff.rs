//! Symbolic differentiation.
//!
//! `differentiate` applies the calculus rules and nothing else: no
//! simplification happens here. The returned trees are large but correct;
//! callers run [`crate::simplify`] afterwards, keeping the two passes
//! composable and independently testable.

use crate::error::{ExprError, ExprResult};
use crate::tree::{Expr, Head, SymbolTable};

/// Differentiate with respect to `var`, treating every other symbol as
/// constant.
pub fn differentiate(expr: &Expr, var: &str) -> Expr {
    // Without a symbol table there is nothing to resolve, so no cycle can
    // occur and the fallible path is unreachable.
    differentiate_with_symbols(expr, var, &SymbolTable::new())
        .unwrap_or(Expr::Num(0.0))
}

/// Differentiate with respect to `var`, resolving named symbols through the
/// table and differentiating through their definitions.
pub fn differentiate_with_symbols(
    expr: &Expr,
    var: &str,
    symbols: &SymbolTable,
) -> ExprResult<Expr> {
    let mut visited = Vec::new();
    diff_inner(expr, var, symbols, &mut visited)
}

fn diff_inner(
    expr: &Expr,
    var: &str,
    symbols: &SymbolTable,
    visited: &mut Vec<String>,
) -> ExprResult<Expr> {
    match expr {
        Expr::Num(_) => Ok(Expr::Num(0.0)),
        Expr::Sym(name) => {
            if name == var {
                return Ok(Expr::Num(1.0));
            }
            if let Some(body) = symbols.get(name) {
                if visited.iter().any(|v| v == name) {
                    return Err(ExprError::CyclicSymbol { name: name.clone() });
                }
                visited.push(name.clone());
                let d = diff_inner(body, var, symbols, visited)?;
                visited.pop();
                return Ok(d);
            }
            // State variables and foreign variables are constants here.
            Ok(Expr::Num(0.0))
        }
        Expr::Op { head, args } => diff_op(*head, args, var, symbols, visited),
    }
}

fn diff_op(
    head: Head,
    args: &[Expr],
    var: &str,
    symbols: &SymbolTable,
    visited: &mut Vec<String>,
) -> ExprResult<Expr> {
    let expect_arity = |n: usize| {
        if args.len() == n {
            Ok(())
        } else {
            Err(ExprError::Malformed {
                what: "wrong argument count for head",
            })
        }
    };
    match head {
        Head::Add => {
            let terms = args
                .iter()
                .map(|a| diff_inner(a, var, symbols, visited))
                .collect::<ExprResult<Vec<_>>>()?;
            Ok(Expr::add(terms))
        }
        Head::Sub => {
            expect_arity(2)?;
            let a = diff_inner(&args[0], var, symbols, visited)?;
            let b = diff_inner(&args[1], var, symbols, visited)?;
            Ok(Expr::sub(a, b))
        }
        Head::Mul => {
            // Product rule over n factors: sum over i of (f1 .. fi' .. fn)
            let mut terms = Vec::with_capacity(args.len());
            for i in 0..args.len() {
                let mut factors = Vec::with_capacity(args.len());
                for (j, factor) in args.iter().enumerate() {
                    if i == j {
                        factors.push(diff_inner(factor, var, symbols, visited)?);
                    } else {
                        factors.push(factor.clone());
                    }
                }
                terms.push(Expr::mul(factors));
            }
            Ok(Expr::add(terms))
        }
        Head::Div => {
            // (u/v)' = (u'v - uv') / v^2
            expect_arity(2)?;
            let u = &args[0];
            let v = &args[1];
            let du = diff_inner(u, var, symbols, visited)?;
            let dv = diff_inner(v, var, symbols, visited)?;
            Ok(Expr::div(
                Expr::sub(
                    Expr::mul(vec![du, v.clone()]),
                    Expr::mul(vec![u.clone(), dv]),
                ),
                Expr::pow(v.clone(), Expr::Num(2.0)),
            ))
        }
        Head::Pow => {
            expect_arity(2)?;
            let u = &args[0];
            let e = &args[1];
            let du = diff_inner(u, var, symbols, visited)?;
            if let Some(c) = e.as_num() {
                // (u^c)' = c * u^(c-1) * u'
                return Ok(Expr::mul(vec![
                    Expr::Num(c),
                    Expr::pow(u.clone(), Expr::Num(c - 1.0)),
                    du,
                ]));
            }
            // General case via u^e = exp(e ln u):
            // (u^e)' = u^e * (e' ln u + e u'/u)
            let de = diff_inner(e, var, symbols, visited)?;
            Ok(Expr::mul(vec![
                Expr::pow(u.clone(), e.clone()),
                Expr::add(vec![
                    Expr::mul(vec![de, Expr::ln(u.clone())]),
                    Expr::mul(vec![e.clone(), Expr::div(du, u.clone())]),
                ]),
            ]))
        }
        Head::Ln => {
            expect_arity(1)?;
            let u = &args[0];
            let du = diff_inner(u, var, symbols, visited)?;
            Ok(Expr::div(du, u.clone()))
        }
        Head::Exp => {
            expect_arity(1)?;
            let u = &args[0];
            let du = diff_inner(u, var, symbols, visited)?;
            Ok(Expr::mul(vec![du, Expr::exp(u.clone())]))
        }
        Head::Piecewise => {
            // Differentiate each branch; bounds are preserved untouched.
            if args.len() % 3 != 0 {
                return Err(ExprError::Malformed {
                    what: "piecewise arity is not a multiple of 3",
                });
            }
            let mut out = Vec::with_capacity(args.len());
            for triple in args.chunks(3) {
                out.push(triple[0].clone());
                out.push(triple[1].clone());
                out.push(diff_inner(&triple[2], var, symbols, visited)?);
            }
            Ok(Expr::op(Head::Piecewise, out))
        }
        Head::IfLess => {
            if args.len() != 4 {
                return Err(ExprError::Malformed {
                    what: "if_less expects 4 arguments",
                });
            }
            // The guard is preserved; both branches are differentiated.
            Ok(Expr::if_less(
                args[0].clone(),
                args[1].clone(),
                diff_inner(&args[2], var, symbols, visited)?,
                diff_inner(&args[3], var, symbols, visited)?,
            ))
        }
    }
}
