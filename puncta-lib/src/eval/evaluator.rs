use crate::core::{truncate_f64, FLOAT_TOLERANCE};

use super::lexer::Op;
use super::parser::{Ast, Node, NodeKind};
use super::{Bank, ErrorKind, EvalError, NodeId, Result};

fn truthy(x: f64) -> bool {
    x != 0.0
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Walks the tree. `&`, `|` and `?:` only evaluate the operands they need
pub fn eval_ast(ast: &Ast, bank: &Bank, expr: &str) -> Result<f64> {
    Evaluator { ast, bank, expr }.eval(ast.root)
}

struct Evaluator<'a> {
    ast: &'a Ast,
    bank: &'a Bank,
    expr: &'a str,
}

impl<'a> Evaluator<'a> {
    fn error(&self, node: &Node, kind: ErrorKind) -> EvalError {
        EvalError::new(self.expr, node.pos, kind)
    }

    fn eval(&self, id: NodeId) -> Result<f64> {
        let node = &self.ast.arena[id];
        match node.kind {
            NodeKind::Num(n) => Ok(n as f64),
            NodeKind::Var(slot) => Ok(self.bank[slot]),
            NodeKind::Unary { op, arg } => {
                let a = self.eval(arg)?;
                Ok(if op == Op::Not { flag(!truthy(a)) } else { -a })
            }
            NodeKind::Ternary { cond, then, other } => {
                if truthy(self.eval(cond)?) {
                    self.eval(then)
                } else {
                    self.eval(other)
                }
            }
            NodeKind::Binary { op: Op::And, lhs, rhs } => {
                Ok(flag(truthy(self.eval(lhs)?) && truthy(self.eval(rhs)?)))
            }
            NodeKind::Binary { op: Op::Or, lhs, rhs } => {
                Ok(flag(truthy(self.eval(lhs)?) || truthy(self.eval(rhs)?)))
            }
            NodeKind::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs)?;
                let r = self.eval(rhs)?;
                self.binary(node, op, l, r)
            }
        }
    }

    fn binary(&self, node: &Node, op: Op, l: f64, r: f64) -> Result<f64> {
        Ok(match op {
            Op::Add => l + r,
            Op::Sub => l - r,
            Op::Mul => l * r,
            Op::Div => {
                if r == 0.0 {
                    return Err(self.error(node, ErrorKind::DivisionByZero));
                }
                l / r
            }
            Op::Mod => {
                if !l.is_finite() || !r.is_finite() {
                    return Err(self.error(node, ErrorKind::ModNotFinite));
                }
                let (a, b) = match (truncate_f64(l), truncate_f64(r)) {
                    (Ok(a), Ok(b)) => (a, b),
                    _ => return Err(self.error(node, ErrorKind::ModOutOfRange)),
                };
                if b == 0 {
                    return Err(self.error(node, ErrorKind::ModByZero));
                }
                a.wrapping_rem(b) as f64
            }
            Op::Pow => {
                if !l.is_finite() || !r.is_finite() {
                    return Err(self.error(node, ErrorKind::PowNotFinite));
                }
                if !(l > 0.0 && r > 0.0) {
                    return Err(self.error(node, ErrorKind::PowNotPositive));
                }
                if r == 0.5 {
                    return Ok(l.sqrt());
                }
                let res = l.powf(r);
                if !res.is_finite() {
                    return Err(self.error(node, ErrorKind::PowOverflow { base: l, exp: r }));
                }
                res
            }
            Op::Gt => flag(l > r),
            Op::Lt => flag(l < r),
            Op::Eq => flag((l - r).abs() < FLOAT_TOLERANCE),
            Op::Ne => flag((l - r).abs() >= FLOAT_TOLERANCE || (l - r).is_nan()),
            Op::Not | Op::And | Op::Or | Op::Question | Op::Colon => {
                return Err(self.error(node, ErrorKind::ExpectedAtom))
            }
        })
    }
}
