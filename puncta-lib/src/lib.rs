//! Puncta is a tiny language built from punctuation. A program is a flat list of statements
//! over one global namespace of variables, and everything interesting happens in actions.
//!
//! What happens when a script is executed:
//! 1. the source is split into tokens by the [`lexer::Lexer`]
//! 1. [`compiler::compile`] parses the tokens and emits the instructions of a
//!    [`core::Program`] directly, there is no syntax tree
//! 1. an [`vm::Executor`] is created, which registers the builtin actions. The host may
//!    register its own actions or swap the io handles at this point
//! 1. [`vm::Executor::run`] checks that every jump target exists, and then executes one
//!    instruction after another until the program ends or an error occurs
//!
//! [`run`] and [`run_file`] do all of that:
//!
//! ```no_run
//! let exec = puncta_lib::run("x, print! @ 42.", Default::default(), |_| {}).unwrap();
//! assert_eq!(exec.get("x"), Some(puncta_lib::core::Value::Int(42)));
//! ```
pub mod compiler;
pub mod core;
pub mod eval;
pub mod lexer;
pub mod vm;

use std::path::{Path, PathBuf};
use thiserror::Error;

use compiler::CompileError;
use vm::Executor;

/// Settings for a single run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// fail with "step limit exceeded" after this many instructions
    pub max_steps: Option<u64>,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] vm::Error),
}

/// Compiles and runs `src`. `hook` is called with the fresh executor before anything runs
pub fn run(
    src: &str,
    config: Config,
    hook: impl FnOnce(&mut Executor),
) -> Result<Executor, Error> {
    let program = compiler::compile(src)?;
    let mut exec = Executor::new(program, config);
    hook(&mut exec);
    exec.run()?;
    Ok(exec)
}

pub fn run_file(
    path: impl AsRef<Path>,
    config: Config,
    hook: impl FnOnce(&mut Executor),
) -> Result<Executor, Error> {
    let path = path.as_ref();
    let src = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    run(&src, config, hook)
}
