//! The formula language behind the `eval` action.
//!
//! Formulas work on `f64` only. An atom is a single letter, which reads a slot of a 52 entry
//! [`Bank`], or a single digit. Operators, from lowest to highest precedence:
//!
//! ```text
//! ?:          ternary, the branches can't be ternaries themselves
//! |           or, short circuits
//! &           and, short circuits
//! > < = #     comparison, at most one per level
//! + -
//! * / %
//! ! -         unary, applies to a power
//! ^           right associative
//! ```
//!
//! Comparisons and logic operators yield 1.0 or 0.0, everything that is not 0.0 is true.

mod arena;
mod evaluator;
mod lexer;
mod parser;

pub use arena::{Arena, NodeId};
pub use evaluator::eval_ast;
pub use lexer::{tokenize, Op, Token, TokenKind};
pub use parser::{parse, Ast, Node, NodeKind};

use thiserror::Error;

/// one slot per letter, `A`-`Z` first, then `a`-`z`
pub const BANK_SIZE: usize = 52;
pub type Bank = [f64; BANK_SIZE];

pub fn bank_slot(c: char) -> Option<usize> {
    match c {
        'A'..='Z' => Some(c as usize - 'A' as usize),
        'a'..='z' => Some(c as usize - 'a' as usize + 26),
        _ => None,
    }
}

/// The fixed amount of space a formula may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_tokens: usize,
    pub max_nodes: usize,
}

impl Limits {
    /// limits for formulas of up to `len` characters
    pub fn for_len(len: usize) -> Self {
        Self {
            max_tokens: len + 8,
            max_nodes: 2 * len + 8,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("too many tokens")]
    TooManyTokens,
    #[error("expression too complex")]
    TooComplex,
    #[error("chained comparisons are not supported; use '&' to combine (e.g., A<B & B<C)")]
    ChainedComparison,
    #[error("expected ':'")]
    ExpectedColon,
    #[error("expected variable (A-Z, a-z) or digit (0-9)")]
    ExpectedAtom,
    #[error("trailing garbage")]
    TrailingGarbage,
    #[error("division by zero")]
    DivisionByZero,
    #[error("mod by zero")]
    ModByZero,
    #[error("mod expects finite numbers")]
    ModNotFinite,
    #[error("mod operands must fit into 64 bit integers")]
    ModOutOfRange,
    #[error("pow requires finite numbers")]
    PowNotFinite,
    #[error("pow base and exponent must be > 0")]
    PowNotPositive,
    #[error("{base}^{exp} overflow")]
    PowOverflow { base: f64, exp: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("eval error at pos {pos} in \"{expr}\": {kind}")]
pub struct EvalError {
    pub expr: String,
    pub pos: usize,
    pub kind: ErrorKind,
}

impl EvalError {
    pub fn new(expr: &str, pos: usize, kind: ErrorKind) -> Self {
        Self {
            expr: expr.to_string(),
            pos,
            kind,
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;

/// evaluates `expr` with limits sized for its own length
pub fn evaluate(expr: &str, bank: &Bank) -> Result<f64> {
    evaluate_with(expr, bank, Limits::for_len(expr.chars().count()))
}

pub fn evaluate_with(expr: &str, bank: &Bank, limits: Limits) -> Result<f64> {
    let tokens = tokenize(expr, limits.max_tokens)?;
    let ast = parse(expr, &tokens, Arena::with_capacity(limits.max_nodes))?;
    eval_ast(&ast, bank, expr)
}
