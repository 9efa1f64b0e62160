//! Abstract syntax tree
//!
//! The immutable output of the parsing collaborator, consumed by the
//! evaluator. Node kinds and the pattern grammar are the whole contract
//! between front end and core.

mod expr;
mod pattern;
mod span;

pub use expr::{BinOp, Body, Expr, FnClause, ListItem, Program, UnOp};
pub use pattern::{FieldPattern, Pattern};
pub use span::{Span, Spanned};
