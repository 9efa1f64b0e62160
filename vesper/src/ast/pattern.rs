//! Destructuring patterns
//!
//! Patterns appear in `let`, plain assignment, function/method parameters,
//! `for` loop headers and `case` arms. Names are carried as source text;
//! the interpreter interns them at match time.

use super::{Expr, Spanned};
use serde::{Deserialize, Serialize};

/// A structural pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Pattern {
    /// `_`: matches anything, binds nothing
    Wildcard,
    /// `name` or `$name`: binds the matched value
    Bind { name: String, dynamic: bool },
    /// Integer literal, matches by value equality
    IntLit(i64),
    /// String literal, matches by value equality
    StrLit(String),
    /// Symbol literal (`:name`, `true`, `false`), matches by identity
    SymLit(String),
    /// `[p, q, *rest]`: fixed element patterns plus optional trailing spread
    List {
        items: Vec<Pattern>,
        rest: Option<Box<Pattern>>,
    },
    /// `{x, y: p, z: p = default, *rest}` with optional `!` exhaustive marker
    Map {
        fields: Vec<FieldPattern>,
        rest: Option<Box<Pattern>>,
        exhaustive: bool,
    },
}

/// One named field of a map pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldPattern {
    pub name: String,
    pub pattern: Pattern,
    /// Evaluated lazily, only when the key is truly absent
    pub default: Option<Spanned<Expr>>,
}

impl Pattern {
    /// Whether this pattern may appear on the left of a plain assignment.
    ///
    /// Assignment must only ever bind or ignore, never test, so literal
    /// patterns are rejected.
    pub fn is_assignable(&self) -> bool {
        match self {
            Pattern::Wildcard | Pattern::Bind { .. } => true,
            Pattern::IntLit(_) | Pattern::StrLit(_) | Pattern::SymLit(_) => false,
            Pattern::List { items, rest } => {
                items.iter().all(Pattern::is_assignable)
                    && rest.as_deref().is_none_or(Pattern::is_assignable)
            }
            Pattern::Map { fields, rest, .. } => {
                fields.iter().all(|f| f.pattern.is_assignable())
                    && rest.as_deref().is_none_or(Pattern::is_assignable)
            }
        }
    }

    /// Whether matching this pattern can introduce a dynamic binding
    pub fn introduces_dynamic(&self) -> bool {
        match self {
            Pattern::Bind { dynamic, .. } => *dynamic,
            Pattern::Wildcard
            | Pattern::IntLit(_)
            | Pattern::StrLit(_)
            | Pattern::SymLit(_) => false,
            Pattern::List { items, rest } => {
                items.iter().any(Pattern::introduces_dynamic)
                    || rest.as_deref().is_some_and(Pattern::introduces_dynamic)
            }
            Pattern::Map { fields, rest, .. } => {
                fields.iter().any(|f| f.pattern.introduces_dynamic())
                    || rest.as_deref().is_some_and(Pattern::introduces_dynamic)
            }
        }
    }
}
