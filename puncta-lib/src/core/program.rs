use std::collections::HashMap;
use tracing::warn;

use crate::core::*;

/// maps label names to instruction indices
pub type Labels = HashMap<String, usize>;

/// A compiled program, ready to be handed to the [`Executor`](crate::vm::Executor)
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Basically the program
    pub text: Vec<Instruction>,
    /// Complete before execution starts, so forward references always resolve
    pub labels: Labels,
}

impl Program {
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn get(&self, pc: usize) -> Option<&Instruction> {
        self.text.get(pc)
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    /// labels sorted by their index, then by name
    pub fn sorted_labels(&self) -> Vec<(&str, usize)> {
        let mut labels: Vec<_> = self
            .labels
            .iter()
            .map(|(name, idx)| (name.as_str(), *idx))
            .collect();
        labels.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(b.0)));
        labels
    }
}

/// represents a program while it's being built
///
/// Instructions are only ever appended. A label always points at the index the next
/// instruction will occupy.
#[derive(Debug, Clone, Default)]
pub struct ProgramBuilder {
    text: Vec<Instruction>,
    labels: Labels,
    /// line on which each label was defined, for the redefinition warning
    label_lines: HashMap<String, usize>,
}

impl ProgramBuilder {
    pub fn push(&mut self, opcode: OpCode, line: usize) {
        self.text.push(Instruction { opcode, line });
    }

    pub fn next_index(&self) -> usize {
        self.text.len()
    }

    /// Points `name` at the next instruction. A redefinition replaces the old entry.
    pub fn define_label(&mut self, name: String, line: usize) {
        if let Some(old_line) = self.label_lines.insert(name.clone(), line) {
            warn!(
                label = %name,
                "label redefined on line {}, the definition on line {} is ignored",
                line,
                old_line
            );
        }
        self.labels.insert(name, self.next_index());
    }

    /// appends the final End instruction
    pub fn build(mut self, end_line: usize) -> Program {
        self.push(OpCode::End, end_line);
        Program {
            text: self.text,
            labels: self.labels,
        }
    }
}
