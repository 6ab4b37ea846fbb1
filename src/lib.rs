#[cfg(test)]
#[macro_use]
mod edsl;

#[cfg(test)]
mod strategies;

pub mod boundary;
pub mod channel;
pub mod compiler;
pub mod error;
pub mod grid;
pub mod harness;
pub mod labels;
pub mod language;
pub mod lexer;
pub mod optimizer;
pub mod scheduler;
pub mod semaphore;
pub mod unit;

pub use crate::compiler::{compile, Compilation};
pub use crate::error::{CompileError, GridError};
pub use crate::grid::{Grid, GridBuilder};
pub use crate::harness::{evaluate, Evaluation, Harness, Statistics, TestSuite};
pub use crate::language::{decompile, Instruction, Port, Program, Register};
pub use crate::optimizer::optimize;
pub use crate::scheduler::Discipline;
pub use crate::unit::{ComputingUnit, Ports, Status};
