//! Vesper interpreter library
//!
//! A small dynamically-typed language where every operation is a message
//! send: values carry types, types carry methods, and the evaluator walks
//! the AST dispatching through them.

pub mod ast;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod stdlib;

pub use ast::Span;
pub use error::{CompileError, Result};
pub use interp::{boot, Interp, InterpResult, RuntimeError, Value};
