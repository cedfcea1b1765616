//! contains all important data structures

pub mod value;
pub use value::*;

pub mod token;
pub use token::*;

pub mod opcode;
pub use opcode::*;

pub mod program;
pub use program::*;
