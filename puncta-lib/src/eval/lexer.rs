use derive_more::Display;

use super::{bank_slot, ErrorKind, EvalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Op {
    #[display(fmt = "+")]
    Add,
    #[display(fmt = "-")]
    Sub,
    #[display(fmt = "*")]
    Mul,
    #[display(fmt = "/")]
    Div,
    #[display(fmt = "%")]
    Mod,
    #[display(fmt = "^")]
    Pow,
    #[display(fmt = ">")]
    Gt,
    #[display(fmt = "<")]
    Lt,
    #[display(fmt = "=")]
    Eq,
    #[display(fmt = "#")]
    Ne,
    #[display(fmt = "!")]
    Not,
    #[display(fmt = "&")]
    And,
    #[display(fmt = "|")]
    Or,
    #[display(fmt = "?")]
    Question,
    #[display(fmt = ":")]
    Colon,
}

impl Op {
    pub fn from_char(c: char) -> Option<Op> {
        Some(match c {
            '+' => Op::Add,
            '-' => Op::Sub,
            '*' => Op::Mul,
            '/' => Op::Div,
            '%' => Op::Mod,
            '^' => Op::Pow,
            '>' => Op::Gt,
            '<' => Op::Lt,
            '=' => Op::Eq,
            '#' => Op::Ne,
            '!' => Op::Not,
            '&' => Op::And,
            '|' => Op::Or,
            '?' => Op::Question,
            ':' => Op::Colon,
            _ => return None,
        })
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, Op::Gt | Op::Lt | Op::Eq | Op::Ne)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    /// a bank slot
    Var(usize),
    Num(u8),
    Op(Op),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// byte offset into the formula
    pub pos: usize,
}

impl Token {
    pub fn op(&self) -> Option<Op> {
        match self.kind {
            TokenKind::Op(op) => Some(op),
            _ => None,
        }
    }
}

/// Splits a formula into tokens, the last one is always `Eof`
pub fn tokenize(expr: &str, max_tokens: usize) -> Result<Vec<Token>> {
    let mut tokens = vec![];
    let push = |tokens: &mut Vec<Token>, token: Token| {
        if tokens.len() >= max_tokens {
            return Err(EvalError::new(expr, token.pos, ErrorKind::TooManyTokens));
        }
        tokens.push(token);
        Ok(())
    };
    for (pos, c) in expr.char_indices() {
        if c.is_whitespace() {
            continue;
        }
        let kind = if let Some(slot) = bank_slot(c) {
            TokenKind::Var(slot)
        } else if let Some(d) = c.to_digit(10) {
            TokenKind::Num(d as u8)
        } else if let Some(op) = Op::from_char(c) {
            TokenKind::Op(op)
        } else {
            return Err(EvalError::new(expr, pos, ErrorKind::UnexpectedChar(c)));
        };
        push(&mut tokens, Token { kind, pos })?;
    }
    push(
        &mut tokens,
        Token {
            kind: TokenKind::Eof,
            pos: expr.len(),
        },
    )?;
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokens = tokenize(" a+ 7", 16).unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Var(26),
                TokenKind::Op(Op::Add),
                TokenKind::Num(7),
                TokenKind::Eof
            ]
        );
        assert_eq!(tokens[2].pos, 4);
        assert_eq!(tokens[3].pos, 5);
    }

    #[test]
    fn test_unexpected_char() {
        let err = tokenize("a ä", 16).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedChar('ä'));
        assert_eq!(err.pos, 2);
    }
}
