//! This file defines the instructions the compiler emits and the executor runs.
//! There are only five of them, the sugar of the language is expanded by the
//! compiler, and labels are not instructions but entries in the label table.

use std::fmt;
use strum_macros::IntoStaticStr;

use crate::core::Value;

/// Either the name of a variable, or a literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Var(String),
    Lit(Value),
}

#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
pub enum OpCode {
    /// copies `src` into the variable `dest`, creating it if necessary
    Assign { dest: String, src: Operand },
    /// calls the action `action` on the variable `var`
    Act { var: String, action: String },
    /// jumps to `label` if `left` and `right` are equal
    JumpIfEqual {
        left: Operand,
        right: Operand,
        label: String,
    },
    Jump { label: String },
    /// stops the program, the compiler appends one to every program
    End,
}

/// An opcode together with the source line it was compiled from
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub line: usize,
}

impl OpCode {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// the label this opcode may jump to
    pub fn jump_target(&self) -> Option<&str> {
        match self {
            OpCode::JumpIfEqual { label, .. } | OpCode::Jump { label } => Some(label),
            OpCode::Assign { .. } | OpCode::Act { .. } | OpCode::End => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Var(name) => write!(f, "{}", name),
            Operand::Lit(Value::Str(s)) => write!(f, "{:?}", s),
            Operand::Lit(v) => write!(f, "{}", v),
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        match self {
            OpCode::Assign { dest, src } => write!(f, " {} <- {}", dest, src),
            OpCode::Act { var, action } => write!(f, " {}({})", action, var),
            OpCode::JumpIfEqual { left, right, label } => {
                write!(f, " {} == {} -> {}", left, right, label)
            }
            OpCode::Jump { label } => write!(f, " -> {}", label),
            OpCode::End => Ok(()),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>4}| {}", self.line, self.opcode)
    }
}
