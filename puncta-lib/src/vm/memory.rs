use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use crate::core::*;

/// the one global namespace of a program
pub type Variables = HashMap<String, Value>;

/// Where `input`, `getc`, `gets` read from and the printing actions write to
pub struct Io {
    pub input: Box<dyn BufRead>,
    pub output: Box<dyn Write>,
}

impl Io {
    pub fn new(input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
        }
    }

    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stdout())
    }

    /// Reads one line including its terminator. Returns `None` at end of input
    pub fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = vec![];
        if self.input.read_until(b'\n', &mut buf)? == 0 {
            Ok(None)
        } else {
            Ok(Some(buf))
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

/// Everything an action may touch besides its own operand
pub struct Context<'a> {
    pub(crate) vars: &'a mut Variables,
    pub(crate) io: &'a mut Io,
    pub(crate) line: usize,
}

impl<'a> Context<'a> {
    pub fn new(vars: &'a mut Variables, io: &'a mut Io, line: usize) -> Self {
        Self { vars, io, line }
    }

    /// line of the instruction that invoked the action
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.vars.get(name).copied()
    }

    /// Creates or overwrites a variable. A write to the operand of the running action
    /// is replaced by the operand's final value once the action returns.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// flushes pending output first, so prompts are visible
    pub fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        self.io.flush()?;
        self.io.read_line()
    }

    pub fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.io.output.write_all(bytes)
    }

    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.io.output
    }
}
