//! An interactive shell that runs pipelines of external programs.
//!
//! A line goes through [`parser::parse`] into a chain of [`Command`] stages. The
//! [`Interpreter`] hands the chain to the [`Executor`], which either runs a built-in such
//! as `cd` or `exit` in-process or spawns one child per stage, wiring stages together with
//! pipes and applying `<`, `>` and `>>` redirections. Lines come from a [`LineSource`];
//! the binary uses the rustyline-backed [`Terminal`].

mod builtin;
pub mod command;
pub mod completion;
pub mod config;
pub mod env;
pub mod executor;
mod interpreter;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod terminal;

pub use builtin::{Builtins, CommandFactory, ExecutableCommand};
pub use command::{Command, ExitCode, Flow, RedirectSlot};
pub use config::{Config, Options};
pub use executor::{ExecError, Executor};
pub use interpreter::Interpreter;
pub use resolver::{PathResolver, ResolveError};
pub use terminal::{LineSource, ReadOutcome, Terminal};
