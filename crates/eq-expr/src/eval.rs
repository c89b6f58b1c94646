//! Expression evaluation against conditions, indexed variables, and symbols.
//!
//! Resolution order for a symbol reference:
//! 1. single-character state variables from `EvalConditions::statevars`
//! 2. indexed variables through the [`VariableMap`] into the values slice
//! 3. named symbol-table entries, evaluated recursively with cycle detection
//!
//! Anything else is an `UndefinedReference` and fails the whole evaluation.

use crate::error::{ExprError, ExprResult};
use crate::tree::{Expr, Head, SymbolTable, VariableMap};
use eq_core::EvalConditions;

/// Evaluate an expression to a number.
pub fn evaluate(
    expr: &Expr,
    conditions: &EvalConditions,
    variables: &VariableMap,
    symbols: &SymbolTable,
    values: &[f64],
) -> ExprResult<f64> {
    let mut visited = Vec::new();
    eval_inner(expr, conditions, variables, symbols, values, &mut visited)
}

fn eval_inner(
    expr: &Expr,
    conditions: &EvalConditions,
    variables: &VariableMap,
    symbols: &SymbolTable,
    values: &[f64],
    visited: &mut Vec<String>,
) -> ExprResult<f64> {
    match expr {
        Expr::Num(v) => Ok(*v),
        Expr::Sym(name) => {
            let mut chars = name.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                if let Some(v) = conditions.statevar(c) {
                    return Ok(v);
                }
            }
            if let Some(idx) = variables.index_of(name) {
                return values.get(idx).copied().ok_or(ExprError::Malformed {
                    what: "values slice shorter than variable map",
                });
            }
            if let Some(body) = symbols.get(name) {
                if visited.iter().any(|v| v == name) {
                    return Err(ExprError::CyclicSymbol { name: name.clone() });
                }
                visited.push(name.clone());
                let v = eval_inner(body, conditions, variables, symbols, values, visited)?;
                visited.pop();
                return Ok(v);
            }
            Err(ExprError::UndefinedReference { name: name.clone() })
        }
        Expr::Op { head, args } => {
            eval_op(*head, args, conditions, variables, symbols, values, visited)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn eval_op(
    head: Head,
    args: &[Expr],
    conditions: &EvalConditions,
    variables: &VariableMap,
    symbols: &SymbolTable,
    values: &[f64],
    visited: &mut Vec<String>,
) -> ExprResult<f64> {
    let eval_arg = |e: &Expr, visited: &mut Vec<String>| {
        eval_inner(e, conditions, variables, symbols, values, visited)
    };
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
            let mut sum = 0.0;
            for a in args {
                sum += eval_arg(a, visited)?;
            }
            Ok(sum)
        }
        Head::Sub => {
            expect_arity(2)?;
            Ok(eval_arg(&args[0], visited)? - eval_arg(&args[1], visited)?)
        }
        Head::Mul => {
            let mut product = 1.0;
            for a in args {
                product *= eval_arg(a, visited)?;
            }
            Ok(product)
        }
        Head::Div => {
            expect_arity(2)?;
            Ok(eval_arg(&args[0], visited)? / eval_arg(&args[1], visited)?)
        }
        Head::Pow => {
            expect_arity(2)?;
            let base = eval_arg(&args[0], visited)?;
            let exponent = eval_arg(&args[1], visited)?;
            Ok(base.powf(exponent))
        }
        Head::Ln => {
            expect_arity(1)?;
            Ok(eval_arg(&args[0], visited)?.ln())
        }
        Head::Exp => {
            expect_arity(1)?;
            Ok(eval_arg(&args[0], visited)?.exp())
        }
        Head::Piecewise => {
            if args.len() % 3 != 0 {
                return Err(ExprError::Malformed {
                    what: "piecewise arity is not a multiple of 3",
                });
            }
            let t = conditions
                .temperature()
                .ok_or_else(|| ExprError::UndefinedReference {
                    name: "T".to_string(),
                })?;
            for triple in args.chunks(3) {
                let lo = eval_arg(&triple[0], visited)?;
                let hi = eval_arg(&triple[1], visited)?;
                if lo <= t && t < hi {
                    return eval_arg(&triple[2], visited);
                }
            }
            Err(ExprError::OutOfRange { value: t })
        }
        Head::IfLess => {
            if args.len() != 4 {
                return Err(ExprError::Malformed {
                    what: "if_less expects 4 arguments",
                });
            }
            let a = eval_arg(&args[0], visited)?;
            let b = eval_arg(&args[1], visited)?;
            if a < b {
                eval_arg(&args[2], visited)
            } else {
                eval_arg(&args[3], visited)
            }
        }
    }
}
