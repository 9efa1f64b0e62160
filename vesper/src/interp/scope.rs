//! Binding environments
//!
//! Scopes form a parent-linked chain shared through `Rc<RefCell<_>>`:
//! closures keep the scope active at their definition alive, and several
//! closures may share one ancestor, so ownership is shared rather than a
//! strict tree. Lexical scopes follow static nesting; the one global
//! dynamic chain (owned by the interpreter) uses the same structure.
//!
//! Each lexical scope also carries a ledger of dynamic variables it
//! introduced via `let $x = ...`; reassignment of a dynamic variable is
//! only authorized when some scope in the lexical chain holds that entry.

use super::symbol::Symbol;
use super::value::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Shared reference to a scope
pub type ScopeRef = Rc<RefCell<Scope>>;

/// A binding environment
#[derive(Debug, Default)]
pub struct Scope {
    /// Bindings owned by this scope
    bindings: HashMap<Symbol, Value>,
    /// Parent scope for the chain
    parent: Option<ScopeRef>,
    /// Dynamic variables introduced by a `let $x = ...` in this scope
    dynamic_intros: HashSet<Symbol>,
}

impl Scope {
    /// Create a new root scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new scope with a parent
    pub fn with_parent(parent: ScopeRef) -> Self {
        Scope {
            bindings: HashMap::new(),
            parent: Some(parent),
            dynamic_intros: HashSet::new(),
        }
    }

    /// Wrap in Rc<RefCell<>>
    pub fn into_ref(self) -> ScopeRef {
        Rc::new(RefCell::new(self))
    }

    /// Define a binding in this scope, shadowing any ancestor binding.
    /// Never touches the parent chain.
    pub fn define(&mut self, sym: Symbol, value: Value) {
        self.bindings.insert(sym, value);
    }

    /// Look a symbol up through the chain
    pub fn get(&self, sym: Symbol) -> Option<Value> {
        if let Some(value) = self.bindings.get(&sym) {
            Some(value.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().get(sym)
        } else {
            None
        }
    }

    /// Mutate the existing owning scope in place. Returns false when the
    /// symbol is bound nowhere in the chain; it never defines.
    pub fn set(&mut self, sym: Symbol, value: Value) -> bool {
        if self.bindings.contains_key(&sym) {
            self.bindings.insert(sym, value);
            true
        } else if let Some(parent) = &self.parent {
            parent.borrow_mut().set(sym, value)
        } else {
            false
        }
    }

    /// Whether the symbol is bound anywhere in the chain
    pub fn contains(&self, sym: Symbol) -> bool {
        if self.bindings.contains_key(&sym) {
            true
        } else if let Some(parent) = &self.parent {
            parent.borrow().contains(sym)
        } else {
            false
        }
    }

    /// Record that this scope introduced a dynamic variable
    pub fn mark_dynamic(&mut self, sym: Symbol) {
        self.dynamic_intros.insert(sym);
    }

    /// Whether this scope or any lexical ancestor introduced `sym`
    pub fn authorizes_dynamic(&self, sym: Symbol) -> bool {
        if self.dynamic_intros.contains(&sym) {
            true
        } else if let Some(parent) = &self.parent {
            parent.borrow().authorizes_dynamic(sym)
        } else {
            false
        }
    }

    /// Bindings owned by this scope only
    pub fn bindings(&self) -> &HashMap<Symbol, Value> {
        &self.bindings
    }

    /// Every binding visible from this scope, innermost shadow winning.
    /// Used to seed a fresh module scope with the kernel prelude.
    pub fn visible_bindings(&self) -> HashMap<Symbol, Value> {
        let mut out = match &self.parent {
            Some(parent) => parent.borrow().visible_bindings(),
            None => HashMap::new(),
        };
        for (sym, value) in &self.bindings {
            out.insert(*sym, value.clone());
        }
        out
    }

    /// Every dynamic introduction visible from this scope
    pub fn visible_dynamic_intros(&self) -> HashSet<Symbol> {
        let mut out = match &self.parent {
            Some(parent) => parent.borrow().visible_dynamic_intros(),
            None => HashSet::new(),
        };
        out.extend(self.dynamic_intros.iter().copied());
        out
    }
}

/// Create a child scope from a parent reference
pub fn child_scope(parent: &ScopeRef) -> ScopeRef {
    Scope::with_parent(Rc::clone(parent)).into_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::symbol::Interner;

    fn syms() -> (Interner, Symbol, Symbol) {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let y = interner.intern("y");
        (interner, x, y)
    }

    #[test]
    fn test_define_and_get() {
        let (_, x, y) = syms();
        let mut scope = Scope::new();
        scope.define(x, Value::Int(42));
        assert_eq!(scope.get(x), Some(Value::Int(42)));
        assert_eq!(scope.get(y), None);
    }

    #[test]
    fn test_child_sees_parent() {
        let (_, x, y) = syms();
        let parent = Scope::new().into_ref();
        parent.borrow_mut().define(x, Value::Int(1));

        let child = child_scope(&parent);
        child.borrow_mut().define(y, Value::Int(2));

        assert_eq!(child.borrow().get(x), Some(Value::Int(1)));
        assert_eq!(child.borrow().get(y), Some(Value::Int(2)));
        assert_eq!(parent.borrow().get(y), None);
    }

    #[test]
    fn test_define_in_child_never_mutates_parent() {
        let (_, x, _) = syms();
        let parent = Scope::new().into_ref();
        parent.borrow_mut().define(x, Value::Int(1));

        let child = child_scope(&parent);
        child.borrow_mut().define(x, Value::Int(2));

        assert_eq!(child.borrow().get(x), Some(Value::Int(2)));
        assert_eq!(parent.borrow().get(x), Some(Value::Int(1)));
    }

    #[test]
    fn test_set_mutates_owning_scope() {
        let (_, x, _) = syms();
        let parent = Scope::new().into_ref();
        parent.borrow_mut().define(x, Value::Int(1));

        let child = child_scope(&parent);
        assert!(child.borrow_mut().set(x, Value::Int(99)));

        // Visible through every shared reference to the owning scope
        assert_eq!(parent.borrow().get(x), Some(Value::Int(99)));

        let sibling = child_scope(&parent);
        assert_eq!(sibling.borrow().get(x), Some(Value::Int(99)));
    }

    #[test]
    fn test_set_never_defines() {
        let (_, x, _) = syms();
        let scope = Scope::new().into_ref();
        assert!(!scope.borrow_mut().set(x, Value::Int(1)));
        assert_eq!(scope.borrow().get(x), None);
    }

    #[test]
    fn test_set_updates_nearest_shadow() {
        let (_, x, _) = syms();
        let parent = Scope::new().into_ref();
        parent.borrow_mut().define(x, Value::Int(1));
        let child = child_scope(&parent);
        child.borrow_mut().define(x, Value::Int(2));

        assert!(child.borrow_mut().set(x, Value::Int(99)));
        assert_eq!(child.borrow().get(x), Some(Value::Int(99)));
        assert_eq!(parent.borrow().get(x), Some(Value::Int(1)));
    }

    #[test]
    fn test_dynamic_intro_walks_chain() {
        let (_, x, y) = syms();
        let parent = Scope::new().into_ref();
        parent.borrow_mut().mark_dynamic(x);

        let child = child_scope(&parent);
        assert!(child.borrow().authorizes_dynamic(x));
        assert!(!child.borrow().authorizes_dynamic(y));
    }

    #[test]
    fn test_visible_bindings_shadowing() {
        let (_, x, y) = syms();
        let parent = Scope::new().into_ref();
        parent.borrow_mut().define(x, Value::Int(1));
        parent.borrow_mut().define(y, Value::Int(2));

        let child = child_scope(&parent);
        child.borrow_mut().define(x, Value::Int(10));

        let visible = child.borrow().visible_bindings();
        assert_eq!(visible.get(&x), Some(&Value::Int(10)));
        assert_eq!(visible.get(&y), Some(&Value::Int(2)));
    }

    #[test]
    fn test_scope_shared_through_closures() {
        // Two holders of the same scope both observe a set()
        let (_, x, _) = syms();
        let shared = Scope::new().into_ref();
        shared.borrow_mut().define(x, Value::Int(0));

        let holder_a = Rc::clone(&shared);
        let holder_b = Rc::clone(&shared);
        holder_a.borrow_mut().set(x, Value::Int(7));
        assert_eq!(holder_b.borrow().get(x), Some(Value::Int(7)));
    }
}
