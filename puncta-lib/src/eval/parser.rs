use super::lexer::{Op, Token, TokenKind};
use super::{Arena, ErrorKind, EvalError, NodeId, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Var(usize),
    Num(u8),
    Unary { op: Op, arg: NodeId },
    Binary { op: Op, lhs: NodeId, rhs: NodeId },
    Ternary { cond: NodeId, then: NodeId, other: NodeId },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// where errors about this node are reported
    pub pos: usize,
}

#[derive(Debug, Clone)]
pub struct Ast {
    pub arena: Arena<Node>,
    pub root: NodeId,
}

/// Parses a whole formula. `tokens` must end with `Eof`, as returned by
/// [`tokenize`](super::tokenize)
pub fn parse(expr: &str, tokens: &[Token], arena: Arena<Node>) -> Result<Ast> {
    let mut parser = Parser {
        expr,
        tokens,
        cur: 0,
        arena,
    };
    let root = parser.ternary()?;
    let rest = parser.peek();
    if rest.kind != TokenKind::Eof {
        return Err(parser.error(rest.pos, ErrorKind::TrailingGarbage));
    }
    Ok(Ast {
        arena: parser.arena,
        root,
    })
}

struct Parser<'a> {
    expr: &'a str,
    tokens: &'a [Token],
    cur: usize,
    arena: Arena<Node>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Token {
        let eof = Token {
            kind: TokenKind::Eof,
            pos: self.expr.len(),
        };
        self.tokens.get(self.cur).copied().unwrap_or(eof)
    }

    fn take(&mut self) -> Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.cur += 1;
        }
        token
    }

    /// takes the next token if it is one of `ops`
    fn take_op(&mut self, ops: &[Op]) -> Option<Token> {
        let token = self.peek();
        match token.op() {
            Some(op) if ops.contains(&op) => Some(self.take()),
            _ => None,
        }
    }

    fn error(&self, pos: usize, kind: ErrorKind) -> EvalError {
        EvalError::new(self.expr, pos, kind)
    }

    fn node(&mut self, kind: NodeKind, pos: usize) -> Result<NodeId> {
        self.arena
            .alloc(Node { kind, pos })
            .ok_or_else(|| self.error(pos, ErrorKind::TooComplex))
    }

    fn binary(&mut self, op: Token, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        let kind = match op.op() {
            Some(op) => NodeKind::Binary { op, lhs, rhs },
            None => return Err(self.error(op.pos, ErrorKind::ExpectedAtom)),
        };
        self.node(kind, op.pos)
    }

    fn ternary(&mut self) -> Result<NodeId> {
        let cond = self.or()?;
        let Some(q) = self.take_op(&[Op::Question]) else {
            return Ok(cond);
        };
        let then = self.or()?;
        if self.take_op(&[Op::Colon]).is_none() {
            return Err(self.error(self.peek().pos, ErrorKind::ExpectedColon));
        }
        let other = self.or()?;
        self.node(NodeKind::Ternary { cond, then, other }, q.pos)
    }

    fn or(&mut self) -> Result<NodeId> {
        let mut lhs = self.and()?;
        while let Some(op) = self.take_op(&[Op::Or]) {
            let rhs = self.and()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<NodeId> {
        let mut lhs = self.cmp()?;
        while let Some(op) = self.take_op(&[Op::And]) {
            let rhs = self.cmp()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    /// a single comparison, a second one right after it is an error
    fn cmp(&mut self) -> Result<NodeId> {
        const CMP: [Op; 4] = [Op::Gt, Op::Lt, Op::Eq, Op::Ne];
        let lhs = self.add()?;
        let Some(op) = self.take_op(&CMP) else {
            return Ok(lhs);
        };
        let rhs = self.add()?;
        let node = self.binary(op, lhs, rhs)?;
        let next = self.peek();
        if next.op().map_or(false, Op::is_comparison) {
            return Err(self.error(next.pos, ErrorKind::ChainedComparison));
        }
        Ok(node)
    }

    fn add(&mut self) -> Result<NodeId> {
        let mut lhs = self.mul()?;
        while let Some(op) = self.take_op(&[Op::Add, Op::Sub]) {
            let rhs = self.mul()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn mul(&mut self) -> Result<NodeId> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.take_op(&[Op::Mul, Op::Div, Op::Mod]) {
            let rhs = self.unary()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    /// not recursive, `--a` is an error
    fn unary(&mut self) -> Result<NodeId> {
        let Some(token) = self.take_op(&[Op::Not, Op::Sub]) else {
            return self.pow();
        };
        let arg = self.pow()?;
        let op = token.op().unwrap_or(Op::Sub);
        self.node(NodeKind::Unary { op, arg }, token.pos)
    }

    fn pow(&mut self) -> Result<NodeId> {
        let base = self.factor()?;
        match self.take_op(&[Op::Pow]) {
            Some(op) => {
                let exp = self.pow()?;
                self.binary(op, base, exp)
            }
            None => Ok(base),
        }
    }

    fn factor(&mut self) -> Result<NodeId> {
        let token = self.peek();
        let kind = match token.kind {
            TokenKind::Var(slot) => NodeKind::Var(slot),
            TokenKind::Num(n) => NodeKind::Num(n),
            TokenKind::Op(_) | TokenKind::Eof => {
                return Err(self.error(token.pos, ErrorKind::ExpectedAtom))
            }
        };
        self.take();
        self.node(kind, token.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tokenize;
    use super::*;

    fn parse_str(expr: &str) -> Ast {
        let tokens = tokenize(expr, 64).unwrap();
        parse(expr, &tokens, Arena::with_capacity(64)).unwrap()
    }

    #[test]
    fn test_pow_is_right_associative() {
        let ast = parse_str("1^2^3");
        let NodeKind::Binary { op, lhs, rhs } = ast.arena[ast.root].kind else {
            panic!("expected a binary node");
        };
        assert_eq!(op, Op::Pow);
        assert_eq!(ast.arena[lhs].kind, NodeKind::Num(1));
        assert!(matches!(
            ast.arena[rhs].kind,
            NodeKind::Binary { op: Op::Pow, .. }
        ));
    }

    #[test]
    fn test_node_count() {
        let ast = parse_str("a ? -b : c");
        assert_eq!(ast.arena.len(), 5);
        assert_eq!(ast.arena[ast.root].pos, 2);
    }
}
