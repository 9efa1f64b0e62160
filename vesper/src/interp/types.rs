//! Type objects and the method model
//!
//! A type object carries an instance method map (dispatched by symbol
//! identity, no ancestor chain) and an own-method map whose entries are
//! pre-bound to the type object itself. Every value points at exactly one
//! type object, and every type object's own `ty` field resolves, through
//! zero or one indirection, to the root type, whose `ty` is itself, the
//! one deliberate cycle in the graph. The root's self-reference and the
//! retroactive naming in the bootstrap are why `name` and `ty` are
//! lazily-completed cells rather than plain fields.

use super::eval::Interp;
use super::scope::ScopeRef;
use super::symbol::Symbol;
use super::value::Value;
use crate::ast::{Body, FnClause, Pattern};
use crate::interp::error::InterpResult;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Shared reference to a type object
pub type TypeRef = Rc<TypeObj>;

/// Arity sentinel for natives that check their own argument count, such
/// as a struct constructor whose arity is the field count of its type.
pub const ANY_ARITY: usize = usize::MAX;

/// Host function backing a native method: `(interp, receiver, args)`
pub type NativeMethod = fn(&mut Interp, Value, &[Value]) -> InterpResult<Value>;

/// Host function backing a native free function: `(interp, args)`
pub type NativeFunc = fn(&mut Interp, &[Value]) -> InterpResult<Value>;

/// Which built-in or user-declared family a type object belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Root,
    Symbol,
    Int,
    Str,
    List,
    Map,
    Range,
    Scope,
    Module,
    Function,
    Unbound,
    Bound,
    Iter,
    /// Meta-type of user struct types
    Struct,
    /// A user-declared struct type
    NamedStruct,
    /// Meta-type of user prototypes
    Proto,
    /// A user-declared prototype (instance-less method bag)
    NamedProto,
}

/// A runtime type object
#[derive(Debug)]
pub struct TypeObj {
    pub kind: TypeKind,
    /// Patched retroactively once the interner can name it
    name: Cell<Option<Symbol>>,
    /// The type of this type; the root closes the cycle on itself
    ty: RefCell<Option<TypeRef>>,
    /// Instance protocol
    methods: RefCell<HashMap<Symbol, Rc<UnboundMethod>>>,
    /// Type-level protocol, pre-bound to this type object as receiver
    own_methods: RefCell<HashMap<Symbol, Rc<BoundMethod>>>,
    /// Declared field order for NamedStruct types, empty otherwise
    pub fields: Vec<Symbol>,
}

impl TypeObj {
    pub fn new(kind: TypeKind) -> TypeRef {
        Rc::new(TypeObj {
            kind,
            name: Cell::new(None),
            ty: RefCell::new(None),
            methods: RefCell::new(HashMap::new()),
            own_methods: RefCell::new(HashMap::new()),
            fields: Vec::new(),
        })
    }

    pub fn with_fields(kind: TypeKind, fields: Vec<Symbol>) -> TypeRef {
        Rc::new(TypeObj {
            kind,
            name: Cell::new(None),
            ty: RefCell::new(None),
            methods: RefCell::new(HashMap::new()),
            own_methods: RefCell::new(HashMap::new()),
            fields,
        })
    }

    pub fn name(&self) -> Option<Symbol> {
        self.name.get()
    }

    pub fn set_name(&self, sym: Symbol) {
        self.name.set(Some(sym));
    }

    /// Complete the `ty` cell. The bootstrap sequencer calls this exactly
    /// once per type; for the root the argument is the root itself.
    pub fn set_type(&self, ty: TypeRef) {
        *self.ty.borrow_mut() = Some(ty);
    }

    /// The type of this type object. Panics only if the bootstrap
    /// invariant (every type gets wired before use) is broken.
    pub fn type_of(&self) -> TypeRef {
        self.ty
            .borrow()
            .clone()
            .expect("type object used before the bootstrap wired its type")
    }

    pub fn get_method(&self, name: Symbol) -> Option<Rc<UnboundMethod>> {
        self.methods.borrow().get(&name).cloned()
    }

    pub fn has_method(&self, name: Symbol) -> bool {
        self.methods.borrow().contains_key(&name)
    }

    pub fn add_method(&self, method: Rc<UnboundMethod>) {
        self.methods.borrow_mut().insert(method.name, method);
    }

    /// Insert only when the name is not yet taken; reports whether it
    /// installed. This is the mixin rule: first definition wins.
    pub fn add_method_if_absent(&self, method: Rc<UnboundMethod>) -> bool {
        let mut methods = self.methods.borrow_mut();
        if methods.contains_key(&method.name) {
            false
        } else {
            methods.insert(method.name, method);
            true
        }
    }

    pub fn get_own(&self, name: Symbol) -> Option<Rc<BoundMethod>> {
        self.own_methods.borrow().get(&name).cloned()
    }

    pub fn add_own(&self, name: Symbol, method: Rc<BoundMethod>) {
        self.own_methods.borrow_mut().insert(name, method);
    }

    /// Method names in stable (id) order
    pub fn method_names(&self) -> Vec<Symbol> {
        let mut names: Vec<Symbol> = self.methods.borrow().keys().copied().collect();
        names.sort();
        names
    }

    /// Snapshot of the instance method map, for mixin copying
    pub fn methods_snapshot(&self) -> Vec<Rc<UnboundMethod>> {
        self.methods.borrow().values().cloned().collect()
    }
}

/// The two method bodies a method can carry
pub enum MethodImpl {
    Native { arity: usize, func: NativeMethod },
    Interpreted { params: Rc<Vec<Pattern>>, body: Rc<Body> },
}

impl std::fmt::Debug for MethodImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MethodImpl::Native { arity, .. } => {
                f.debug_struct("Native").field("arity", arity).finish()
            }
            MethodImpl::Interpreted { params, .. } => f
                .debug_struct("Interpreted")
                .field("params", &params.len())
                .finish(),
        }
    }
}

/// A method attached to a type, not yet paired with a receiver
#[derive(Debug)]
pub struct UnboundMethod {
    /// The type this method was defined on
    pub owner: TypeRef,
    pub name: Symbol,
    /// Scope captured at definition; kept alive for the method's lifetime
    pub closure: ScopeRef,
    pub imp: MethodImpl,
}

impl UnboundMethod {
    /// Representation-preserving: the bound method shares every field of
    /// the unbound one and adds the receiver.
    pub fn bind(self: &Rc<Self>, receiver: Value) -> BoundMethod {
        BoundMethod {
            method: Rc::clone(self),
            receiver,
        }
    }
}

/// An unbound method plus a receiver instance
#[derive(Debug)]
pub struct BoundMethod {
    pub method: Rc<UnboundMethod>,
    pub receiver: Value,
}

impl BoundMethod {
    /// Equality for bound methods: same name, same owning type identity,
    /// same receiver identity.
    pub fn same_binding(&self, other: &BoundMethod) -> bool {
        self.method.name == other.method.name
            && Rc::ptr_eq(&self.method.owner, &other.method.owner)
            && self.receiver.identical(&other.receiver)
    }
}

/// How a function value runs
pub enum FuncImpl {
    /// One or more parameter-pattern clauses, tried in definition order
    Clauses(Rc<Vec<FnClause>>),
    Native { arity: usize, func: NativeFunc },
}

impl std::fmt::Debug for FuncImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FuncImpl::Clauses(clauses) => {
                f.debug_tuple("Clauses").field(&clauses.len()).finish()
            }
            FuncImpl::Native { arity, .. } => {
                f.debug_struct("Native").field("arity", arity).finish()
            }
        }
    }
}

/// A function value: a closure over its defining scope
#[derive(Debug)]
pub struct FuncVal {
    pub name: Symbol,
    pub closure: ScopeRef,
    pub imp: FuncImpl,
}
