//! Turns source text into [`Token`]s.
//!
//! The lexer is lazy: the compiler pulls one token at a time. Its state is just a byte offset
//! and a line number, so it can be restarted anywhere via [`Lexer::position`] and
//! [`Lexer::seek`].

use thiserror::Error;

use crate::core::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("line {line}: unterminated comment")]
    UnterminatedComment { line: usize },

    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    #[error("line {line}: newline in string literal")]
    NewlineInString { line: usize },

    #[error("line {line}: unknown escape sequence '\\{escape}'")]
    UnknownEscape { escape: char, line: usize },

    #[error("line {line}: invalid character '{found}' after literal")]
    InvalidCharAfterLiteral { found: char, line: usize },

    #[error("line {line}: malformed number literal '{text}'")]
    MalformedNumber { text: String, line: usize },

    #[error("line {line}: invalid string literal: {source}")]
    InvalidString {
        line: usize,
        #[source]
        source: ValueError,
    },
}

impl LexError {
    pub fn line(&self) -> usize {
        use LexError::*;
        match self {
            UnterminatedComment { line }
            | UnterminatedString { line }
            | NewlineInString { line }
            | UnknownEscape { line, .. }
            | InvalidCharAfterLiteral { line, .. }
            | MalformedNumber { line, .. }
            | InvalidString { line, .. } => *line,
        }
    }
}

pub type Result<T> = std::result::Result<T, LexError>;

/// a point in the source the lexer can be restarted from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    /// set once Eof or an error was yielded by the iterator
    done: bool,
}

/// the characters C's isspace accepts
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            pos: 0,
            line: 1,
            done: false,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            offset: self.pos,
            line: self.line,
        }
    }

    /// continues lexing from `pos`, which must come from [`Lexer::position`]
    pub fn seek(&mut self, pos: Position) {
        self.pos = pos.offset;
        self.line = pos.line;
        self.done = false;
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia()?;
        let line = self.line;
        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                line,
            });
        };

        let kind = match c {
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.lex_ident(),
            b'0'..=b'9' => self.lex_number()?,
            b'+' | b'-' if self.peek_at(1).map_or(false, |d| d.is_ascii_digit()) => {
                self.lex_number()?
            }
            b'"' => self.lex_string()?,
            _ => match Punct::from_byte(c) {
                Some(p) => {
                    self.pos += 1;
                    TokenKind::Punct(p)
                }
                None => self.lex_symbol(),
            },
        };
        Ok(Token { kind, line })
    }

    fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + n).copied()
    }

    fn current_char(&self) -> char {
        self.src[self.pos..].chars().next().unwrap_or('\0')
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(b) if is_space(b) => {
                    self.bump();
                }
                Some(b'(') => self.skip_comment()?,
                _ => return Ok(()),
            }
        }
    }

    /// skips a comment, comments nest
    fn skip_comment(&mut self) -> Result<()> {
        let line = self.line;
        let mut depth = 0usize;
        loop {
            match self.bump() {
                Some(b'(') => depth += 1,
                Some(b')') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(_) => {}
                None => return Err(LexError::UnterminatedComment { line }),
            }
        }
    }

    fn lex_ident(&mut self) -> TokenKind {
        let start = self.pos;
        while self
            .peek()
            .map_or(false, |b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        TokenKind::Ident(self.src[start..self.pos].to_string())
    }

    /// any other character is a name of its own
    fn lex_symbol(&mut self) -> TokenKind {
        let len = self.current_char().len_utf8();
        let name = self.src[self.pos..self.pos + len].to_string();
        self.pos += len;
        TokenKind::Ident(name)
    }

    fn eat_digits(&mut self, hex: bool) {
        while self.peek().map_or(false, |b| {
            if hex {
                b.is_ascii_hexdigit()
            } else {
                b.is_ascii_digit()
            }
        }) {
            self.pos += 1;
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind> {
        let line = self.line;
        let start = self.pos;
        let negative = match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                true
            }
            Some(b'+') => {
                self.pos += 1;
                false
            }
            _ => false,
        };

        let value = if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.pos += 2;
            let digits_start = self.pos;
            self.eat_digits(true);
            let digits = &self.src[digits_start..self.pos];
            let bits = if digits.is_empty() || digits.len() > 16 {
                None
            } else {
                u64::from_str_radix(digits, 16).ok()
            };
            let Some(bits) = bits else {
                return Err(self.malformed(start, line));
            };
            // hex literals are bit patterns, 0xFFFFFFFFFFFFFFFF is -1
            let n = bits as i64;
            Value::Int(if negative { n.wrapping_neg() } else { n })
        } else {
            self.eat_digits(false);
            if self.peek() == Some(b'.') && self.peek_at(1).map_or(false, |b| b.is_ascii_digit()) {
                self.pos += 1;
                self.eat_digits(false);
                let x = self.src[start..self.pos]
                    .parse::<f64>()
                    .map_err(|_| self.malformed(start, line))?;
                Value::Float(x)
            } else {
                let n = self.src[start..self.pos]
                    .parse::<i64>()
                    .map_err(|_| self.malformed(start, line))?;
                Value::Int(n)
            }
        };

        self.check_after_literal(line)?;
        Ok(TokenKind::Number(value))
    }

    fn malformed(&self, start: usize, line: usize) -> LexError {
        LexError::MalformedNumber {
            text: self.src[start..self.pos].to_string(),
            line,
        }
    }

    fn lex_string(&mut self) -> Result<TokenKind> {
        let line = self.line;
        self.pos += 1;
        let mut bytes = vec![];
        loop {
            match self.peek() {
                None => return Err(LexError::UnterminatedString { line }),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\n') => return Err(LexError::NewlineInString { line }),
                Some(b'\\') => {
                    self.pos += 1;
                    let escaped = match self.peek() {
                        None => return Err(LexError::UnterminatedString { line }),
                        Some(b'a') => 0x07,
                        Some(b'b') => 0x08,
                        Some(b't') => b'\t',
                        Some(b'n') => b'\n',
                        Some(b'v') => 0x0b,
                        Some(b'f') => 0x0c,
                        Some(b'r') => b'\r',
                        Some(b'"') => b'"',
                        Some(b'\\') => b'\\',
                        Some(_) => {
                            return Err(LexError::UnknownEscape {
                                escape: self.current_char(),
                                line,
                            })
                        }
                    };
                    self.pos += 1;
                    bytes.push(escaped);
                }
                Some(b) => {
                    self.pos += 1;
                    bytes.push(b);
                }
            }
        }

        let packed = pack_bytes(&bytes).map_err(|source| LexError::InvalidString { line, source })?;
        self.check_after_literal(line)?;
        Ok(TokenKind::Number(Value::Str(packed)))
    }

    /// rejects things like `12abc`
    fn check_after_literal(&self, line: usize) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(b) if is_space(b) || b == b'(' || Punct::from_byte(b).is_some() => Ok(()),
            Some(_) => Err(LexError::InvalidCharAfterLiteral {
                found: self.current_char(),
                line,
            }),
        }
    }
}

/// yields every token including the final Eof, or stops after the first error
impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let res = self.next_token();
        match &res {
            Ok(token) if !token.is_eof() => {}
            _ => self.done = true,
        }
        Some(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).map(|t| t.unwrap().kind).collect()
    }

    fn ident(s: &str) -> TokenKind {
        TokenKind::Ident(s.into())
    }

    fn punct(p: Punct) -> TokenKind {
        TokenKind::Punct(p)
    }

    fn num(v: Value) -> TokenKind {
        TokenKind::Number(v)
    }

    #[test]
    fn test_statement() {
        assert_eq!(
            kinds("a, 5."),
            vec![
                ident("a"),
                punct(Punct::Comma),
                num(Value::Int(5)),
                punct(Punct::Dot),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("-12 +3 2.5 0x1F 0XfF -0x10 7.a"),
            vec![
                num(Value::Int(-12)),
                num(Value::Int(3)),
                num(Value::Float(2.5)),
                num(Value::Int(31)),
                num(Value::Int(255)),
                num(Value::Int(-16)),
                num(Value::Int(7)),
                punct(Punct::Dot),
                ident("a"),
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("0xFFFFFFFFFFFFFFFF")[0], num(Value::Int(-1)));
    }

    #[test]
    fn test_sign_needs_digit() {
        assert_eq!(kinds("- 1"), vec![ident("-"), num(Value::Int(1)), TokenKind::Eof]);
    }

    #[test]
    fn test_symbols_are_identifiers() {
        assert_eq!(kinds("+ * ä"), vec![ident("+"), ident("*"), ident("ä"), TokenKind::Eof]);
    }

    #[test]
    fn test_nested_comments_and_lines() {
        let tokens: Vec<Token> = Lexer::new("(a (nested\n) comment)\nx (\n) y")
            .map(|t| t.unwrap())
            .collect();
        assert_eq!(tokens[0], Token { kind: ident("x"), line: 3 });
        assert_eq!(tokens[1], Token { kind: ident("y"), line: 4 });
    }

    #[test]
    fn test_unterminated_comment() {
        let err = Lexer::new("a\n(b (c)\n").nth(1).unwrap().unwrap_err();
        assert_eq!(err, LexError::UnterminatedComment { line: 2 });
    }

    #[test]
    fn test_invalid_after_literal() {
        let err = Lexer::new("12abc").next().unwrap().unwrap_err();
        assert_eq!(err, LexError::InvalidCharAfterLiteral { found: 'a', line: 1 });
        assert!(Lexer::new("12(c)").next().unwrap().is_ok());
    }

    #[test]
    fn test_malformed_numbers() {
        assert!(matches!(
            Lexer::new("0x").next(),
            Some(Err(LexError::MalformedNumber { .. }))
        ));
        assert!(matches!(
            Lexer::new("99999999999999999999").next(),
            Some(Err(LexError::MalformedNumber { .. }))
        ));
        assert!(matches!(
            Lexer::new("0x10000000000000000").next(),
            Some(Err(LexError::MalformedNumber { .. }))
        ));
    }

    #[test]
    fn test_strings() {
        let tok = Lexer::new(r#""a\tb\"""#).next().unwrap().unwrap();
        assert_eq!(
            tok.kind,
            TokenKind::Number(Value::Str(pack_bytes(b"a\tb\"").unwrap()))
        );
    }

    #[test]
    fn test_string_errors() {
        let first_err = |src: &str| Lexer::new(src).find_map(|t| t.err()).unwrap();
        assert_eq!(first_err("\"abc"), LexError::UnterminatedString { line: 1 });
        assert_eq!(first_err("\"ab\nc\""), LexError::NewlineInString { line: 1 });
        assert_eq!(first_err("\"a\\q\""), LexError::UnknownEscape { escape: 'q', line: 1 });
        assert_eq!(first_err("\"abc\\"), LexError::UnterminatedString { line: 1 });
        assert!(matches!(
            first_err("\"abcdefghijklmno\""),
            LexError::InvalidString { line: 1, .. }
        ));
    }

    #[test]
    fn test_seek() {
        let mut lexer = Lexer::new("a\nb c");
        lexer.next_token().unwrap();
        let pos = lexer.position();
        let b = lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        lexer.seek(pos);
        assert_eq!(lexer.next_token().unwrap(), b);
        assert_eq!(b.line, 2);
    }
}
