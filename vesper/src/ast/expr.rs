//! Expression AST nodes
//!
//! The parser hands the evaluator exactly these nodes. Identifier and field
//! names stay as source text here; the interpreter interns them into
//! symbols on first use.

use super::{Pattern, Spanned};
use serde::{Deserialize, Serialize};

/// A statement list (function body, control-form body, toplevel)
pub type Body = Vec<Spanned<Expr>>;

/// Expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Integer literal
    Int(i64),
    /// String literal
    Str(String),
    /// Symbol literal (`:name`; `true` and `false` parse to symbols)
    Sym(String),

    /// Lexical identifier
    Var(String),
    /// Dynamic identifier (`$name`)
    DynVar(String),

    /// List literal with optional spread elements
    ListLit(Vec<ListItem>),
    /// Map literal: named entries (shorthand `{x}` has no value expression)
    /// plus an optional spread source
    MapLit {
        entries: Vec<(String, Option<Spanned<Expr>>)>,
        spread: Option<Box<Spanned<Expr>>>,
    },
    /// `start..end` (exclusive) or `start..=end` (inclusive)
    Range {
        start: Box<Spanned<Expr>>,
        end: Box<Spanned<Expr>>,
        inclusive: bool,
    },

    /// `object.name`: sugar for a `get_member` dispatch
    Member {
        object: Box<Spanned<Expr>>,
        name: String,
    },
    /// `object[index]`: sugar for a `get_item` dispatch
    Index {
        object: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
    /// `object.name(args)`: single-dispatch method call
    MethodCall {
        object: Box<Spanned<Expr>>,
        name: String,
        args: Vec<Spanned<Expr>>,
    },
    /// `callee(args)`: call of a function or bound method value
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },

    /// Binary operator (message send, except the short-circuiting forms)
    Binary {
        op: BinOp,
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },
    /// Unary operator
    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },

    /// `let pat = value`: introduces bindings, widening the scope for the
    /// statements after it in the same block
    Let {
        pattern: Pattern,
        value: Box<Spanned<Expr>>,
    },
    /// `pat = value`: reassigns existing bindings, never defines
    Assign {
        pattern: Pattern,
        value: Box<Spanned<Expr>>,
    },
    /// `object.name = value`: sugar for a `set_member` dispatch
    AssignMember {
        object: Box<Spanned<Expr>>,
        name: String,
        value: Box<Spanned<Expr>>,
    },
    /// `object[index] = value`: sugar for a `set_item` dispatch
    AssignIndex {
        object: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },

    /// `if c { } else if c2 { } else { }`
    If {
        branches: Vec<(Spanned<Expr>, Body)>,
        else_body: Option<Body>,
    },
    /// `while c { }`
    While {
        cond: Box<Spanned<Expr>>,
        body: Body,
    },
    /// `for pat in e { }`: drives the `make_iter`/`next` protocol
    For {
        pattern: Pattern,
        iterable: Box<Spanned<Expr>>,
        body: Body,
    },
    /// `case e { pat => { } ... }`: first matching arm wins
    Case {
        subject: Box<Spanned<Expr>>,
        arms: Vec<(Pattern, Body)>,
    },
    /// `do { }` block expression
    Block(Body),

    /// `fn name(..) { }`: clauses are contiguous same-name definitions
    /// desugared by the parser into one dispatching function
    FnDef {
        name: String,
        clauses: Vec<FnClause>,
    },
    /// `fn(..) { }` anonymous function
    Lambda(FnClause),
    /// `def Type.name(..) { }`: installs an instance method on a type
    MethodDef {
        target: Box<Spanned<Expr>>,
        name: String,
        params: Vec<Pattern>,
        body: Body,
    },
    /// `struct Name { field, ... }`
    StructDef {
        name: String,
        fields: Vec<String>,
    },
    /// `proto Name { fn m(..) { } ... }`
    ProtoDef {
        name: String,
        methods: Vec<(String, FnClause)>,
    },
    /// `mix Proto into Target`
    MixInto {
        proto: Box<Spanned<Expr>>,
        target: Box<Spanned<Expr>>,
    },

    /// `use "path"` / `use "path" as alias`
    Use {
        path: String,
        alias: Option<String>,
    },
    /// `use "path" { name, other as o }`
    UseNames {
        path: String,
        names: Vec<(String, Option<String>)>,
    },

    /// `return` / `return e`: unwinds to the nearest call boundary
    Return(Option<Box<Spanned<Expr>>>),
}

/// Element of a list literal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ListItem {
    Elem(Spanned<Expr>),
    Spread(Spanned<Expr>),
}

/// One parameter-pattern/body clause of a function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FnClause {
    pub params: Vec<Pattern>,
    pub body: Body,
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Structural equality: never dispatched to user code
    Eq,
    Ne,
    /// Short-circuits on the false sentinel, no dispatch
    And,
    Or,
}

impl BinOp {
    /// The well-known method name a dispatching operator desugars to
    pub fn method_name(self) -> Option<&'static str> {
        match self {
            BinOp::Add => Some("add"),
            BinOp::Sub => Some("sub"),
            BinOp::Mul => Some("mul"),
            BinOp::Div => Some("div"),
            BinOp::Mod => Some("mod"),
            BinOp::Lt => Some("lt"),
            BinOp::Lte => Some("lte"),
            BinOp::Gt => Some("gt"),
            BinOp::Gte => Some("gte"),
            BinOp::Eq | BinOp::Ne | BinOp::And | BinOp::Or => None,
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Sentinel comparison, no dispatch
    Not,
    /// Dispatches `neg`
    Neg,
}

/// A parsed program: a toplevel statement list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub stmts: Body,
}
