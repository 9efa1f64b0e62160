//! Runtime values
//!
//! Every runtime object, including every type object, is a `Value`.
//! Compound values share their innards through `Rc`, so clones are cheap
//! handles and in-place mutation (the `!`-suffixed operations) is visible
//! through every handle. There is exactly one logical thread of
//! execution, so `RefCell` is all the interior mutability needed.

use super::scope::ScopeRef;
use super::symbol::Symbol;
use super::types::{BoundMethod, FuncVal, TypeRef, UnboundMethod};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    /// Signed integer
    Int(i64),
    /// Text
    Str(Rc<String>),
    /// Interned symbol; `true` and `false` are the boolean sentinels
    Sym(Symbol),
    /// Ordered sequence, resizable at both ends
    List(Rc<RefCell<VecDeque<Value>>>),
    /// Symbol-keyed mapping, insertion order irrelevant
    Map(Rc<RefCell<HashMap<Symbol, Value>>>),
    /// Integer range
    Range(Rc<RangeVal>),
    /// A first-class scope
    Scope(ScopeRef),
    /// Function (closure), possibly multi-clause
    Func(Rc<FuncVal>),
    /// Method defined on a type, no receiver yet
    Unbound(Rc<UnboundMethod>),
    /// Unbound method paired with a receiver instance
    Bound(Rc<BoundMethod>),
    /// Loaded module
    Module(Rc<ModuleVal>),
    /// A type object (types are values too)
    Type(TypeRef),
    /// Instance of a user-declared struct type
    Instance(Rc<RefCell<Instance>>),
    /// In-flight iterator state for the `for` protocol
    Iter(Rc<RefCell<IterState>>),
}

/// `start..end` / `start..=end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeVal {
    pub start: i64,
    pub end: i64,
    pub inclusive: bool,
}

impl RangeVal {
    pub fn len(&self) -> i64 {
        let raw = self.end - self.start + i64::from(self.inclusive);
        raw.max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A struct instance: its declared type plus a field map
#[derive(Debug)]
pub struct Instance {
    pub ty: TypeRef,
    pub fields: HashMap<Symbol, Value>,
}

/// Built-in iterator state behind the `make_iter`/`next` protocol
#[derive(Debug)]
pub enum IterState {
    /// Snapshot of a list's or map's items, consumed front to back
    Items(VecDeque<Value>),
    /// Numeric cursor over a range
    Span { next: i64, end: i64, inclusive: bool },
}

impl IterState {
    pub fn next(&mut self) -> Option<Value> {
        match self {
            IterState::Items(items) => items.pop_front(),
            IterState::Span {
                next,
                end,
                inclusive,
            } => {
                let done = if *inclusive { *next > *end } else { *next >= *end };
                if done {
                    None
                } else {
                    let v = Value::Int(*next);
                    *next += 1;
                    Some(v)
                }
            }
        }
    }
}

/// A loaded module: its interned path and its toplevel scope
#[derive(Debug)]
pub struct ModuleVal {
    pub name: Symbol,
    pub scope: ScopeRef,
}

impl Value {
    pub fn str(text: impl Into<String>) -> Value {
        Value::Str(Rc::new(text.into()))
    }

    pub fn list(items: impl Into<VecDeque<Value>>) -> Value {
        Value::List(Rc::new(RefCell::new(items.into())))
    }

    pub fn map(entries: HashMap<Symbol, Value>) -> Value {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn range(start: i64, end: i64, inclusive: bool) -> Value {
        Value::Range(Rc::new(RangeVal {
            start,
            end,
            inclusive,
        }))
    }

    /// Kind name for error messages; the type object's name is the
    /// authoritative one where an interner is at hand.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Sym(_) => "symbol",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Range(_) => "range",
            Value::Scope(_) => "scope",
            Value::Func(_) => "function",
            Value::Unbound(_) => "unbound_method",
            Value::Bound(_) => "bound_method",
            Value::Module(_) => "module",
            Value::Type(_) => "type",
            Value::Instance(_) => "instance",
            Value::Iter(_) => "iter",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_sym(&self) -> Option<Symbol> {
        match self {
            Value::Sym(s) => Some(*s),
            _ => None,
        }
    }

    /// Identity comparison: the relation used for bound-method equality
    /// and the false sentinel, never structural.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Sym(a), Value::Sym(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Range(a), Value::Range(b)) => Rc::ptr_eq(a, b),
            (Value::Scope(a), Value::Scope(b)) => Rc::ptr_eq(a, b),
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            (Value::Unbound(a), Value::Unbound(b)) => Rc::ptr_eq(a, b),
            (Value::Bound(a), Value::Bound(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Iter(a), Value::Iter(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// Shallow equality: by value for scalars, by handle identity for shared
// compounds. The interpreter's structural equality lives in the evaluator.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Range(a), Value::Range(b)) => a == b,
            _ => self.identical(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_scalars() {
        assert!(Value::Int(3).identical(&Value::Int(3)));
        assert!(!Value::Int(3).identical(&Value::Int(4)));
    }

    #[test]
    fn test_identity_lists_by_handle() {
        let a = Value::list(vec![Value::Int(1)]);
        let b = Value::list(vec![Value::Int(1)]);
        assert!(!a.identical(&b));
        assert!(a.identical(&a.clone()));
    }

    #[test]
    fn test_strings_identity_is_not_textual() {
        let a = Value::str("x");
        let b = Value::str("x");
        assert!(!a.identical(&b));
    }

    #[test]
    fn test_range_len() {
        let exclusive = RangeVal {
            start: 1,
            end: 5,
            inclusive: false,
        };
        let inclusive = RangeVal {
            start: 1,
            end: 5,
            inclusive: true,
        };
        assert_eq!(exclusive.len(), 4);
        assert_eq!(inclusive.len(), 5);
        assert!(RangeVal {
            start: 5,
            end: 1,
            inclusive: false
        }
        .is_empty());
    }

    #[test]
    fn test_iter_state_span() {
        let mut iter = IterState::Span {
            next: 1,
            end: 3,
            inclusive: true,
        };
        assert_eq!(iter.next(), Some(Value::Int(1)));
        assert_eq!(iter.next(), Some(Value::Int(2)));
        assert_eq!(iter.next(), Some(Value::Int(3)));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_iter_state_items() {
        let mut iter = IterState::Items(VecDeque::from(vec![Value::Int(9)]));
        assert_eq!(iter.next(), Some(Value::Int(9)));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_list_mutation_shared_through_handles() {
        let a = Value::list(vec![Value::Int(1)]);
        let b = a.clone();
        if let Value::List(items) = &a {
            items.borrow_mut().push_back(Value::Int(2));
        }
        if let Value::List(items) = &b {
            assert_eq!(items.borrow().len(), 2);
        } else {
            panic!("expected list");
        }
    }
}
