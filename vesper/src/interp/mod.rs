//! The interpreter: values, types, scopes and the evaluator

pub mod bootstrap;
pub mod error;
pub mod eval;
pub mod module;
pub mod natives;
pub mod pattern;
pub mod scope;
pub mod structs;
pub mod symbol;
pub mod types;
pub mod value;

pub use bootstrap::boot;
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::{structural_eq, Flow, Interp};
pub use scope::{child_scope, Scope, ScopeRef};
pub use symbol::{Interner, Symbol};
pub use value::Value;
