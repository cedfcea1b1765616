//! The registry of callable actions. Builtins and host actions live in the same table.

use std::collections::HashMap;
use std::io;
use thiserror::Error;

use super::built_ins::BUILTINS;
use super::memory::Context;
use crate::core::*;
use crate::eval::EvalError;

#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("unexpected end of input")]
    EndOfInput,

    #[error("invalid input: {0:?}")]
    InvalidInput(String),

    #[error("buffer too small: {len} bytes, but only {cap} fit")]
    BufferTooSmall { len: usize, cap: usize },

    #[error("{0} is not a valid character")]
    InvalidChar(i64),

    #[error("variable not found: {0}")]
    VariableNotFound(String),

    #[error("{0}")]
    Custom(String),
}

pub type ActionResult = Result<(), ActionError>;

/// Something that can be invoked with `var, name!`
///
/// The action receives a copy of the variable, which is written back once it returns
/// successfully. Any closure with the right signature is an action.
pub trait Action {
    fn call(&self, ctx: &mut Context<'_>, value: &mut Value) -> ActionResult;
}

impl<F> Action for F
where
    F: Fn(&mut Context<'_>, &mut Value) -> ActionResult,
{
    fn call(&self, ctx: &mut Context<'_>, value: &mut Value) -> ActionResult {
        self(ctx, value)
    }
}

#[derive(Default)]
pub struct ActionTable {
    entries: HashMap<String, Box<dyn Action>>,
}

impl ActionTable {
    pub fn with_builtins() -> Self {
        let mut table = Self::default();
        for (name, f) in BUILTINS.iter() {
            table.entries.insert(name.to_string(), Box::new(*f));
        }
        table
    }

    /// adds or replaces an action, the last registration wins
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut Context<'_>, &mut Value) -> ActionResult + 'static,
    {
        self.register_action(name, Box::new(f));
    }

    pub fn register_action(&mut self, name: impl Into<String>, action: Box<dyn Action>) {
        self.entries.insert(name.into(), action);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Action> {
        self.entries.get(name).map(|a| a.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
