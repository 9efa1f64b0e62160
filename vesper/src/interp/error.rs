//! Runtime errors for the interpreter
//!
//! Every failure crosses the host boundary as one generic error carrying a
//! kind tag and a human-readable message. There is no in-language
//! catch/recover construct; the REPL reports and continues.

use std::fmt;

/// Runtime error during evaluation
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lexical lookup miss
    UnboundSymbol,
    /// Dynamic lookup miss
    UnboundDynamic,
    /// Call/method/struct-new argument count mismatch
    ArityMismatch,
    /// let/assign/for/case/call pattern failure
    PatternMatch,
    /// No method of that name on the receiver's type
    DispatchMiss,
    /// Reassigning a dynamic variable that no enclosing lexical scope
    /// introduced
    DynamicScopeViolation,
    /// Setting an undeclared struct field
    StructFieldViolation,
    /// Module path not found on the search path
    ModuleNotFound,
    /// Calling a value that is neither a function nor a bound method
    NotCallable,
    /// Operand of the wrong kind for a native method
    TypeError,
    /// Integer division or modulo by zero
    DivisionByZero,
    /// List index out of range, or map key absent
    IndexOutOfBounds,
    /// `case` fell through every arm
    CaseExhausted,
    /// Evaluation depth guard tripped
    StackOverflow,
    /// Front-end failure surfaced while loading a module
    Compile,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            message: message.into(),
        }
    }

    pub fn unbound_symbol(name: &str) -> Self {
        Self::new(ErrorKind::UnboundSymbol, format!("unbound symbol: {name}"))
    }

    pub fn unbound_dynamic(name: &str) -> Self {
        Self::new(
            ErrorKind::UnboundDynamic,
            format!("unbound dynamic variable: ${name}"),
        )
    }

    pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> Self {
        Self::new(
            ErrorKind::ArityMismatch,
            format!("{name} expects {expected} argument(s), got {got}"),
        )
    }

    pub fn pattern_match(context: &str) -> Self {
        Self::new(
            ErrorKind::PatternMatch,
            format!("pattern did not match in {context}"),
        )
    }

    pub fn dispatch_miss(type_name: &str, method: &str) -> Self {
        Self::new(
            ErrorKind::DispatchMiss,
            format!("no method `{method}` on type `{type_name}`"),
        )
    }

    pub fn dynamic_scope_violation(name: &str) -> Self {
        Self::new(
            ErrorKind::DynamicScopeViolation,
            format!("dynamic variable ${name} was never introduced with `let ${name} = ...`"),
        )
    }

    pub fn struct_field_violation(type_name: &str, field: &str) -> Self {
        Self::new(
            ErrorKind::StructFieldViolation,
            format!("struct `{type_name}` has no field `{field}`"),
        )
    }

    pub fn module_not_found(path: &str) -> Self {
        Self::new(
            ErrorKind::ModuleNotFound,
            format!("module not found: {path}"),
        )
    }

    pub fn not_callable(kind: &str) -> Self {
        Self::new(
            ErrorKind::NotCallable,
            format!("value of kind {kind} is not callable"),
        )
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        Self::new(
            ErrorKind::TypeError,
            format!("type error: expected {expected}, got {got}"),
        )
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "division by zero")
    }

    pub fn index_out_of_bounds(index: i64, len: usize) -> Self {
        Self::new(
            ErrorKind::IndexOutOfBounds,
            format!("index {index} out of bounds for length {len}"),
        )
    }

    pub fn key_missing(key: &str) -> Self {
        Self::new(ErrorKind::IndexOutOfBounds, format!("key not found: {key}"))
    }

    pub fn case_exhausted() -> Self {
        Self::new(ErrorKind::CaseExhausted, "no case arm matched")
    }

    pub fn stack_overflow() -> Self {
        Self::new(ErrorKind::StackOverflow, "evaluation too deeply nested")
    }

    pub fn compile(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Compile, message.to_string())
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runtime error: {}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;
