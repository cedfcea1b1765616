//! The tokens produced by the [`Lexer`](crate::lexer::Lexer)

use derive_more::Display;
use std::fmt;

use crate::core::Value;

/// The fixed set of single character punctuators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Punct {
    #[display(fmt = ",")]
    Comma,
    #[display(fmt = ".")]
    Dot,
    #[display(fmt = "!")]
    Bang,
    #[display(fmt = "?")]
    Question,
    #[display(fmt = ":")]
    Colon,
    #[display(fmt = ";")]
    Semicolon,
    #[display(fmt = "@")]
    At,
    #[display(fmt = "#")]
    Hash,
}

impl Punct {
    pub fn from_byte(b: u8) -> Option<Punct> {
        use Punct::*;
        Some(match b {
            b',' => Comma,
            b'.' => Dot,
            b'!' => Bang,
            b'?' => Question,
            b':' => Colon,
            b';' => Semicolon,
            b'@' => At,
            b'#' => Hash,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Eof,
    Ident(String),
    /// numeric and string literals alike
    Number(Value),
    Punct(Punct),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    pub fn punct(&self) -> Option<Punct> {
        match self.kind {
            TokenKind::Punct(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::Ident(name) => write!(f, "identifier '{}'", name),
            TokenKind::Number(Value::Str(s)) => write!(f, "string {:?}", s),
            TokenKind::Number(v) => write!(f, "number {}", v),
            TokenKind::Punct(p) => write!(f, "'{}'", p),
        }
    }
}
