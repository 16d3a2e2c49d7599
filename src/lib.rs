//! A tiny line-oriented shell core.
//!
//! One line of input becomes either a variable assignment or a pipeline of
//! commands (arguments, redirections, `|` wiring), which then runs as a
//! chain of OS processes. The crate exposes the two halves separately:
//! [`parse_line`] turns a line into a [`Pipeline`] (or nothing, for blank,
//! comment, and assignment lines) and [`execute_pipeline`] runs one to
//! completion. [`Interpreter`] is a session object that owns the variable
//! table and composes the two.
//!
//! The search path is never read from the process environment by the core:
//! bind `PATH` into the [`VarTable`] first (or start from
//! [`Interpreter::from_host_env`], which does exactly that).

mod builtin;
pub mod command;
pub mod env;
mod external;
mod interpreter;
mod parser;

pub use builtin::Builtin;
pub use command::{CommandStage, Exec, ExitCode, Pipeline};
pub use env::{VarTable, Variable};
pub use external::resolve_executable;
pub use interpreter::{ExecError, Interpreter, ShellError, execute_pipeline};
pub use parser::{ParseError, parse_line};
