//! contains the [`Executor`], which runs the [OpCode](crate::core::OpCode)s of a [`Program`]

use std::io;
use thiserror::Error;
use tracing::{debug, trace};

use crate::core::*;
use crate::Config;

pub mod actions;
pub mod built_ins;
pub mod memory;

pub use actions::{Action, ActionError, ActionResult, ActionTable};
pub use memory::{Context, Io, Variables};

#[derive(Error, Debug)]
pub enum Error {
    #[error("line {line}: variable not found: {name}")]
    VariableNotFound { name: String, line: usize },

    #[error("line {line}: action not found: {name}")]
    ActionNotFound { name: String, line: usize },

    #[error("line {line}: label not found: {name}")]
    LabelNotFound { name: String, line: usize },

    #[error("line {line}: {action}: {source}")]
    Action {
        action: String,
        line: usize,
        #[source]
        source: ActionError,
    },

    #[error("line {line}: step limit exceeded ({limit} instructions)")]
    StepLimitExceeded { limit: u64, line: usize },

    #[error("could not flush the output: {0}")]
    Flush(#[from] io::Error),
}

impl Error {
    /// the source line the error is reported at, if it belongs to one
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::VariableNotFound { line, .. }
            | Error::ActionNotFound { line, .. }
            | Error::LabelNotFound { line, .. }
            | Error::Action { line, .. }
            | Error::StepLimitExceeded { line, .. } => Some(*line),
            Error::Flush(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

macro_rules! bail {
    ($($err:tt)*) => {
        return Err(Error::$($err)*)
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Halted,
}

/// Runs a program. Owns the variables, the action table and the io handles
pub struct Executor {
    program: Program,
    vars: Variables,
    actions: ActionTable,
    io: Io,
    config: Config,
    pc: usize,
    steps: u64,
}

impl Executor {
    pub fn new(program: Program, config: Config) -> Self {
        Self {
            program,
            vars: Variables::new(),
            actions: ActionTable::with_builtins(),
            io: Io::stdio(),
            config,
            pc: 0,
            steps: 0,
        }
    }

    pub fn set_io(&mut self, io: Io) {
        self.io = io;
    }

    /// adds or replaces an action
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut Context<'_>, &mut Value) -> ActionResult + 'static,
    {
        let name = name.into();
        debug!(action = %name, "registered action");
        self.actions.register(name, f);
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    /// Makes sure every jump target exists, reported at the first offending jump
    pub fn check_labels(&self) -> Result<()> {
        for instr in &self.program.text {
            if let Some(label) = instr.opcode.jump_target() {
                if self.program.label(label).is_none() {
                    bail!(LabelNotFound {
                        name: label.to_string(),
                        line: instr.line
                    });
                }
            }
        }
        Ok(())
    }

    /// Checks the labels and runs until the program halts or fails. Output is flushed either way
    pub fn run(&mut self) -> Result<()> {
        let res = self.check_labels().and_then(|_| {
            while self.step()? == StepOutcome::Continue {}
            Ok(())
        });
        let flushed = self.io.flush();
        res?;
        flushed?;
        debug!(steps = self.steps, "program halted");
        Ok(())
    }

    /// executes a single instruction
    pub fn step(&mut self) -> Result<StepOutcome> {
        let Executor {
            program,
            vars,
            actions,
            io,
            config,
            pc,
            steps,
        } = self;
        let Some(instr) = program.get(*pc) else {
            return Ok(StepOutcome::Halted);
        };
        let line = instr.line;
        if let Some(limit) = config.max_steps {
            if *steps >= limit {
                bail!(StepLimitExceeded { limit, line });
            }
        }
        *steps += 1;
        trace!(pc = *pc, "{}", instr);

        *pc = match &instr.opcode {
            OpCode::Assign { dest, src } => {
                let value = resolve(vars, src, line)?;
                vars.insert(dest.clone(), value);
                *pc + 1
            }
            OpCode::Act { var, action } => {
                let mut value = lookup(vars, var, line)?;
                let Some(f) = actions.get(action) else {
                    bail!(ActionNotFound {
                        name: action.clone(),
                        line
                    });
                };
                let mut ctx = Context::new(vars, io, line);
                let res = f.call(&mut ctx, &mut value);
                // written back even if the action failed
                vars.insert(var.clone(), value);
                res.map_err(|source| Error::Action {
                    action: action.clone(),
                    line,
                    source,
                })?;
                *pc + 1
            }
            OpCode::JumpIfEqual { left, right, label } => {
                let l = resolve(vars, left, line)?;
                let r = resolve(vars, right, line)?;
                if l.loosely_eq(&r) {
                    jump(program, label, line)?
                } else {
                    *pc + 1
                }
            }
            OpCode::Jump { label } => jump(program, label, line)?,
            OpCode::End => program.len(),
        };

        Ok(if *pc >= program.len() {
            StepOutcome::Halted
        } else {
            StepOutcome::Continue
        })
    }

    pub fn is_halted(&self) -> bool {
        self.pc >= self.program.len()
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// number of instructions executed so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn variables(&self) -> &Variables {
        &self.vars
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.vars.get(name).copied()
    }

    /// line of the instruction that runs next
    pub fn current_line(&self) -> Option<usize> {
        self.program.get(self.pc).map(|i| i.line)
    }
}

fn lookup(vars: &Variables, name: &str, line: usize) -> Result<Value> {
    match vars.get(name) {
        Some(v) => Ok(*v),
        None => bail!(VariableNotFound {
            name: name.to_string(),
            line
        }),
    }
}

fn resolve(vars: &Variables, operand: &Operand, line: usize) -> Result<Value> {
    match operand {
        Operand::Var(name) => lookup(vars, name, line),
        Operand::Lit(v) => Ok(*v),
    }
}

fn jump(program: &Program, label: &str, line: usize) -> Result<usize> {
    match program.label(label) {
        Some(idx) => Ok(idx),
        None => bail!(LabelNotFound {
            name: label.to_string(),
            line
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::memory::tests::{test_io, SharedBuf};
    use super::*;
    use crate::compiler::compile;

    fn executor(src: &str, input: &str) -> (Executor, SharedBuf) {
        let mut exec = Executor::new(compile(src).unwrap(), Config::default());
        let (io, out) = test_io(input);
        exec.set_io(io);
        (exec, out)
    }

    #[test]
    fn test_assign_and_jump() {
        let (mut exec, _) = executor("a,5.\nb,3.\na,b?done;\nc,1.\ndone:\n", "");
        exec.run().unwrap();
        assert_eq!(exec.get("a"), Some(Value::Int(5)));
        assert_eq!(exec.get("b"), Some(Value::Int(3)));
        assert_eq!(exec.get("c"), Some(Value::Int(1)));
        assert!(exec.is_halted());
    }

    #[test]
    fn test_forward_label() {
        let (mut exec, out) = executor("skip;\nx,1.\nx,print!\nskip:\ny,2.\n", "");
        exec.run().unwrap();
        assert_eq!(exec.get("x"), None);
        assert_eq!(exec.get("y"), Some(Value::Int(2)));
        assert_eq!(out.contents(), "");
    }

    #[test]
    fn test_loop() {
        let src = "i,0.\nloop#:\ni,print!\ni,inc!\nloop#;\ni,3?end;\nloop;\nend:\n";
        let (mut exec, out) = executor(src, "");
        exec.run().unwrap();
        assert_eq!(out.contents(), "0\n1\n2\n");
    }

    #[test]
    fn test_missing_label_fails_before_running() {
        let (mut exec, out) = executor("x,1.\nx,print!\nx,1?nowhere;\n", "");
        let err = exec.run().unwrap_err();
        assert!(matches!(err, Error::LabelNotFound { line: 3, .. }));
        assert_eq!(out.contents(), "");
        assert_eq!(exec.steps(), 0);
    }

    #[test]
    fn test_runtime_errors() {
        let (mut exec, _) = executor("a,b.", "");
        assert!(matches!(
            exec.run(),
            Err(Error::VariableNotFound { line: 1, .. })
        ));
        let (mut exec, _) = executor("a,1.\n\na,frob!", "");
        assert!(matches!(
            exec.run(),
            Err(Error::ActionNotFound { line: 3, .. })
        ));
        let (mut exec, _) = executor("a,1.\na,input!", "");
        let err = exec.run().unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert!(matches!(
            err,
            Error::Action {
                source: ActionError::EndOfInput,
                ..
            }
        ));
    }

    #[test]
    fn test_host_action_and_context() {
        let (mut exec, _) = executor("x,0.\nx,bump!\n", "");
        exec.register("bump", |ctx: &mut Context<'_>, v: &mut Value| {
            ctx.set("seen", Value::Int(ctx.line() as i64));
            ctx.set("x", Value::Int(100));
            *v = Value::Int(7);
            Ok(())
        });
        assert!(exec.actions().contains("bump"));
        exec.run().unwrap();
        assert_eq!(exec.get("seen"), Some(Value::Int(2)));
        assert_eq!(exec.get("x"), Some(Value::Int(7)));
    }

    #[test]
    fn test_failing_action_keeps_its_writes() {
        let (mut exec, _) = executor("x,1.\nx,boom!\n", "");
        exec.register("boom", |ctx: &mut Context<'_>, v: &mut Value| {
            ctx.set("y", Value::Int(99));
            *v = Value::Int(42);
            Err(ActionError::Custom("boom".into()))
        });
        let err = exec.run().unwrap_err();
        assert!(matches!(err, Error::Action { line: 2, .. }));
        assert_eq!(exec.get("y"), Some(Value::Int(99)));
        assert_eq!(exec.get("x"), Some(Value::Int(42)));
    }

    #[test]
    fn test_step_limit() {
        let mut exec = Executor::new(
            compile("top:\ntop;\n").unwrap(),
            Config {
                max_steps: Some(10),
            },
        );
        let err = exec.run().unwrap_err();
        assert!(matches!(err, Error::StepLimitExceeded { limit: 10, line: 2 }));
        assert_eq!(exec.steps(), 10);
    }

    #[test]
    fn test_step() {
        let (mut exec, _) = executor("a,1.\nb,a.\n", "");
        assert_eq!(exec.current_line(), Some(1));
        assert_eq!(exec.step().unwrap(), StepOutcome::Continue);
        assert_eq!(exec.step().unwrap(), StepOutcome::Continue);
        assert_eq!(exec.get("b"), Some(Value::Int(1)));
        assert_eq!(exec.step().unwrap(), StepOutcome::Halted);
        assert_eq!(exec.step().unwrap(), StepOutcome::Halted);
    }
}
