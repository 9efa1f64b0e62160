//! Bootstrap sequencing
//!
//! The object graph is circular at its base: the root type's type is
//! itself, the symbol type exists before the symbols that name it, and
//! the kernel scope holds the types whose methods close over that very
//! scope. `boot` builds the graph in an order where every forward
//! reference is a cell completed a step later, and hands back a fully
//! wired interpreter.

use super::eval::Interp;
use super::scope::Scope;
use super::symbol::{Interner, Symbol};
use super::types::{TypeKind, TypeObj, TypeRef};
use super::value::{ModuleVal, Value};
use std::rc::Rc;

/// The built-in type objects
pub struct CoreTypes {
    pub root: TypeRef,
    pub symbol: TypeRef,
    pub int: TypeRef,
    pub str_: TypeRef,
    pub list: TypeRef,
    pub map: TypeRef,
    pub range: TypeRef,
    pub scope: TypeRef,
    pub module: TypeRef,
    pub function: TypeRef,
    pub unbound: TypeRef,
    pub bound: TypeRef,
    pub iter: TypeRef,
    /// Meta-type of `struct` declarations
    pub struct_meta: TypeRef,
    /// Meta-type of `proto` declarations
    pub proto_meta: TypeRef,
}

impl CoreTypes {
    /// Every core type, for the universal pass
    pub fn members(&self) -> Vec<TypeRef> {
        [
            &self.root,
            &self.symbol,
            &self.int,
            &self.str_,
            &self.list,
            &self.map,
            &self.range,
            &self.scope,
            &self.module,
            &self.function,
            &self.unbound,
            &self.bound,
            &self.iter,
            &self.struct_meta,
            &self.proto_meta,
        ]
        .into_iter()
        .cloned()
        .collect()
    }
}

/// Symbols the evaluator consults on hot paths, interned once at boot
pub struct WellKnown {
    pub this: Symbol,
    pub true_: Symbol,
    pub false_: Symbol,
    pub add: Symbol,
    pub sub: Symbol,
    pub mul: Symbol,
    pub div: Symbol,
    pub mod_: Symbol,
    pub neg: Symbol,
    pub lt: Symbol,
    pub lte: Symbol,
    pub gt: Symbol,
    pub gte: Symbol,
    pub eq: Symbol,
    pub get_member: Symbol,
    pub set_member: Symbol,
    pub get_item: Symbol,
    pub set_item: Symbol,
    pub make_iter: Symbol,
    pub next: Symbol,
    pub value: Symbol,
    pub done: Symbol,
    pub type_: Symbol,
    pub methods: Symbol,
    pub show: Symbol,
    pub new: Symbol,
    pub mix_into: Symbol,
    pub name: Symbol,
    pub len: Symbol,
    pub module_path: Symbol,
}

impl WellKnown {
    fn intern_all(interner: &mut Interner) -> Self {
        WellKnown {
            this: interner.intern("this"),
            true_: interner.intern("true"),
            false_: interner.intern("false"),
            add: interner.intern("add"),
            sub: interner.intern("sub"),
            mul: interner.intern("mul"),
            div: interner.intern("div"),
            mod_: interner.intern("mod"),
            neg: interner.intern("neg"),
            lt: interner.intern("lt"),
            lte: interner.intern("lte"),
            gt: interner.intern("gt"),
            gte: interner.intern("gte"),
            eq: interner.intern("eq"),
            get_member: interner.intern("get_member"),
            set_member: interner.intern("set_member"),
            get_item: interner.intern("get_item"),
            set_item: interner.intern("set_item"),
            make_iter: interner.intern("make_iter"),
            next: interner.intern("next"),
            value: interner.intern("value"),
            done: interner.intern("done"),
            type_: interner.intern("type"),
            methods: interner.intern("methods"),
            show: interner.intern("show"),
            new: interner.intern("new"),
            mix_into: interner.intern("mix_into"),
            name: interner.intern("name"),
            len: interner.intern("len"),
            module_path: interner.intern("module_path"),
        }
    }
}

/// Build a fully wired interpreter
pub fn boot() -> Interp {
    let mut interner = Interner::new();

    // The root closes the type graph on itself; this is the only cycle
    // created on purpose and it is immortal.
    let root = TypeObj::new(TypeKind::Root);
    root.set_type(Rc::clone(&root));

    // The symbol type must exist before any symbol can be interned as a
    // value; it is wired to the root like every other type.
    let symbol = TypeObj::new(TypeKind::Symbol);
    symbol.set_type(Rc::clone(&root));

    // Retroactive naming: only now is the interner consulted, so the two
    // primordial types get their names after the fact.
    root.set_name(interner.intern("type"));
    symbol.set_name(interner.intern("symbol"));

    let make = |kind: TypeKind, name: &str, interner: &mut Interner| {
        let ty = TypeObj::new(kind);
        ty.set_type(Rc::clone(&root));
        ty.set_name(interner.intern(name));
        ty
    };

    let types = CoreTypes {
        int: make(TypeKind::Int, "int", &mut interner),
        str_: make(TypeKind::Str, "string", &mut interner),
        list: make(TypeKind::List, "list", &mut interner),
        map: make(TypeKind::Map, "map", &mut interner),
        range: make(TypeKind::Range, "range", &mut interner),
        scope: make(TypeKind::Scope, "scope", &mut interner),
        module: make(TypeKind::Module, "module", &mut interner),
        function: make(TypeKind::Function, "function", &mut interner),
        unbound: make(TypeKind::Unbound, "unbound_method", &mut interner),
        bound: make(TypeKind::Bound, "bound_method", &mut interner),
        iter: make(TypeKind::Iter, "iter", &mut interner),
        struct_meta: make(TypeKind::Struct, "struct", &mut interner),
        proto_meta: make(TypeKind::Proto, "proto", &mut interner),
        root,
        symbol,
    };

    // The kernel scope binds every type under its name; every script,
    // REPL session and module scope descends from it.
    let kernel_scope = Scope::new().into_ref();
    {
        let mut scope = kernel_scope.borrow_mut();
        for ty in types.members() {
            let name = ty.name().expect("core types are named during boot");
            scope.define(name, Value::Type(ty));
        }
    }

    let syms = WellKnown::intern_all(&mut interner);

    // The dynamic chain starts with the module search path; the kernel
    // scope carries its introduction so any descendant may rebind it.
    let dynamic = Scope::new().into_ref();
    dynamic
        .borrow_mut()
        .define(syms.module_path, Value::list(vec![Value::str(".")]));
    kernel_scope.borrow_mut().mark_dynamic(syms.module_path);

    let kernel = Rc::new(ModuleVal {
        name: interner.intern("kernel"),
        scope: kernel_scope,
    });

    let mut interp = Interp::with_parts(interner, types, syms, kernel, dynamic);
    interp.install_prelude();
    interp.install_universals();
    interp
}
