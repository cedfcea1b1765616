//! A single pass compiler: parses statements and emits instructions directly, there is no AST.
//!
//! ```text
//! statement := IDENT ':'                                  define label
//!            | IDENT ';'                                  jump
//!            | IDENT '#' ':'                              jump to IDENT+"End", define label IDENT
//!            | IDENT '#' ';'                              define label IDENT+"End"
//!            | IDENT ',' operand '.'                      assign
//!            | IDENT ',' operand '?' IDENT ';'            jump if equal
//!            | IDENT ',' IDENT '!' [ '@' operand '.' ]    act, optionally assign first
//! operand   := IDENT | NUMBER
//! ```

use thiserror::Error;
use tracing::debug;

use crate::core::*;
use crate::lexer::{LexError, Lexer};

/// appended to a loop label by the `#` sugar
pub const LOOP_END_SUFFIX: &str = "End";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("line {line}: syntax error: expected {expected}, found {found}")]
    Expected {
        expected: &'static str,
        found: String,
        line: usize,
    },
}

impl CompileError {
    pub fn line(&self) -> usize {
        match self {
            CompileError::Lex(e) => e.line(),
            CompileError::Expected { line, .. } => *line,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

macro_rules! expected {
    ($token:expr, $what:literal) => {
        CompileError::Expected {
            expected: $what,
            found: $token.kind.to_string(),
            line: $token.line,
        }
    };
}

/// compiles a whole source file
pub fn compile(src: &str) -> Result<Program> {
    Compiler::new(src)?.compile()
}

pub struct Compiler<'a> {
    lexer: Lexer<'a>,
    current: Token,
    builder: ProgramBuilder,
}

impl<'a> Compiler<'a> {
    pub fn new(src: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(src);
        let current = lexer.next_token()?;
        Ok(Compiler {
            lexer,
            current,
            builder: ProgramBuilder::default(),
        })
    }

    pub fn compile(mut self) -> Result<Program> {
        while !self.current.is_eof() {
            self.statement()?;
        }
        let program = self.builder.build(self.current.line);
        debug!(
            instructions = program.len(),
            labels = program.labels.len(),
            "compilation finished"
        );
        Ok(program)
    }

    /// moves to the next token and returns the previous one
    fn advance(&mut self) -> Result<Token> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn accept(&mut self, p: Punct) -> Result<bool> {
        if self.current.punct() == Some(p) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_ident(&mut self, err: CompileError) -> Result<String> {
        if let TokenKind::Ident(_) = self.current.kind {
            if let TokenKind::Ident(name) = self.advance()?.kind {
                return Ok(name);
            }
        }
        Err(err)
    }

    fn expect_operand(&mut self, err: CompileError) -> Result<Operand> {
        match self.current.kind {
            TokenKind::Ident(_) | TokenKind::Number(_) => {}
            _ => return Err(err),
        }
        Ok(match self.advance()?.kind {
            TokenKind::Number(v) => Operand::Lit(v),
            TokenKind::Ident(name) => Operand::Var(name),
            _ => return Err(err),
        })
    }

    fn statement(&mut self) -> Result<()> {
        let line = self.current.line;
        let name = self.expect_ident(expected!(self.current, "an identifier"))?;
        match self.current.punct() {
            Some(Punct::Colon) => {
                self.advance()?;
                self.builder.define_label(name, line);
            }
            Some(Punct::Semicolon) => {
                self.advance()?;
                self.builder.push(OpCode::Jump { label: name }, line);
            }
            Some(Punct::Hash) => {
                self.advance()?;
                self.loop_sugar(name, line)?;
            }
            Some(Punct::Comma) => {
                self.advance()?;
                self.after_comma(name, line)?;
            }
            _ => {
                return Err(expected!(
                    self.current,
                    "':', ';', '#' or ',' after the first identifier"
                ))
            }
        }
        Ok(())
    }

    /// `name#:` opens a loop, `name#;` marks its end
    fn loop_sugar(&mut self, name: String, line: usize) -> Result<()> {
        let end_label = format!("{}{}", name, LOOP_END_SUFFIX);
        if self.accept(Punct::Colon)? {
            self.builder.push(OpCode::Jump { label: end_label }, line);
            self.builder.define_label(name, line);
        } else if self.accept(Punct::Semicolon)? {
            self.builder.define_label(end_label, line);
        } else {
            return Err(expected!(self.current, "':' or ';' after '#'"));
        }
        Ok(())
    }

    fn after_comma(&mut self, var: String, line: usize) -> Result<()> {
        let operand = self.expect_operand(expected!(
            self.current,
            "a variable or a literal after ','"
        ))?;
        match self.current.punct() {
            Some(Punct::Dot) => {
                self.advance()?;
                self.builder.push(
                    OpCode::Assign {
                        dest: var,
                        src: operand,
                    },
                    line,
                );
            }
            Some(Punct::Question) => {
                self.advance()?;
                let label = self.expect_ident(expected!(self.current, "a label after '?'"))?;
                if !self.accept(Punct::Semicolon)? {
                    return Err(expected!(self.current, "';' after the label"));
                }
                self.builder.push(
                    OpCode::JumpIfEqual {
                        left: Operand::Var(var),
                        right: operand,
                        label,
                    },
                    line,
                );
            }
            Some(Punct::Bang) => {
                let action = match operand {
                    Operand::Var(action) => action,
                    Operand::Lit(v) => {
                        return Err(CompileError::Expected {
                            expected: "an action name before '!'",
                            found: TokenKind::Number(v).to_string(),
                            line,
                        })
                    }
                };
                self.advance()?;
                if self.accept(Punct::At)? {
                    let src = self.expect_operand(expected!(
                        self.current,
                        "a variable or a literal after '@'"
                    ))?;
                    if !self.accept(Punct::Dot)? {
                        return Err(expected!(self.current, "'.' after the '@' operand"));
                    }
                    self.builder.push(
                        OpCode::Assign {
                            dest: var.clone(),
                            src,
                        },
                        line,
                    );
                }
                self.builder.push(OpCode::Act { var, action }, line);
            }
            _ => {
                return Err(expected!(
                    self.current,
                    "'.', '?' or '!' after the operand"
                ))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opcodes(program: &Program) -> Vec<OpCode> {
        program.text.iter().map(|i| i.opcode.clone()).collect()
    }

    fn var(s: &str) -> Operand {
        Operand::Var(s.into())
    }

    #[test]
    fn test_assign_and_jump_if_equal() {
        let program = compile("a,5.\nb,3.\na,b?done;\ndone:\n").unwrap();
        assert_eq!(
            opcodes(&program),
            vec![
                OpCode::Assign {
                    dest: "a".into(),
                    src: Operand::Lit(Value::Int(5))
                },
                OpCode::Assign {
                    dest: "b".into(),
                    src: Operand::Lit(Value::Int(3))
                },
                OpCode::JumpIfEqual {
                    left: var("a"),
                    right: var("b"),
                    label: "done".into()
                },
                OpCode::End,
            ]
        );
        assert_eq!(program.label("done"), Some(3));
        let lines: Vec<_> = program.text.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_loop_sugar() {
        let program = compile("loop#:\n x, inc!\nloop#;\n").unwrap();
        assert_eq!(
            opcodes(&program),
            vec![
                OpCode::Jump {
                    label: "loopEnd".into()
                },
                OpCode::Act {
                    var: "x".into(),
                    action: "inc".into()
                },
                OpCode::End,
            ]
        );
        assert_eq!(program.sorted_labels(), vec![("loop", 1), ("loopEnd", 2)]);
    }

    #[test]
    fn test_act_with_pre_assign() {
        let program = compile("x, print! @ 7.").unwrap();
        assert_eq!(
            opcodes(&program),
            vec![
                OpCode::Assign {
                    dest: "x".into(),
                    src: Operand::Lit(Value::Int(7))
                },
                OpCode::Act {
                    var: "x".into(),
                    action: "print".into()
                },
                OpCode::End,
            ]
        );
    }

    #[test]
    fn test_plain_jump_and_symbolic_names() {
        let program = compile("top: + , * ! top;").unwrap();
        assert_eq!(
            opcodes(&program),
            vec![
                OpCode::Act {
                    var: "+".into(),
                    action: "*".into()
                },
                OpCode::Jump { label: "top".into() },
                OpCode::End,
            ]
        );
    }

    #[test]
    fn test_redefined_label_last_wins() {
        let program = compile("l: a, 1. l: a, 2.").unwrap();
        assert_eq!(program.label("l"), Some(1));
    }

    #[test]
    fn test_syntax_errors() {
        let err = compile("a, 5.\nb ,").unwrap_err();
        assert_eq!(
            err,
            CompileError::Expected {
                expected: "a variable or a literal after ','",
                found: "end of input".into(),
                line: 2
            }
        );
        assert!(matches!(
            compile("5, a."),
            Err(CompileError::Expected { expected: "an identifier", line: 1, .. })
        ));
        assert!(matches!(
            compile("a, 5!"),
            Err(CompileError::Expected { expected: "an action name before '!'", .. })
        ));
        assert!(matches!(
            compile("a, b ? c ."),
            Err(CompileError::Expected { expected: "';' after the label", .. })
        ));
        assert!(matches!(
            compile("a # ,"),
            Err(CompileError::Expected { expected: "':' or ';' after '#'", .. })
        ));
        assert!(matches!(compile("a, 12b."), Err(CompileError::Lex(_))));
    }
}
