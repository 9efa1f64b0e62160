//! User-declared struct types and prototypes
//!
//! `struct Name { a, b }` creates a new type object with a fixed field
//! set, a constructor on the type itself, and member access that checks
//! fields before methods. `proto Name { ... }` creates an instance-less
//! method bag; its method map is kept free of machinery so `mix P into T`
//! copies exactly what the prototype declares, and never overwrites a
//! method the target already has.

use super::error::{InterpResult, RuntimeError};
use super::eval::{structural_eq, Interp};
use super::symbol::Symbol;
use super::types::{MethodImpl, TypeKind, TypeObj, TypeRef, UnboundMethod, ANY_ARITY};
use super::value::{Instance, Value};
use crate::ast::FnClause;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

impl Interp {
    /// Create a struct type: fields in declaration order, instance
    /// protocol, and a pre-bound `new` on the type object.
    pub fn define_struct(&mut self, name: &str, fields: &[String]) -> TypeRef {
        let name_sym = self.interner.intern(name);
        let field_syms = fields.iter().map(|f| self.interner.intern(f)).collect();
        let ty = TypeObj::with_fields(TypeKind::NamedStruct, field_syms);
        ty.set_name(name_sym);
        ty.set_type(Rc::clone(&self.types.struct_meta));

        self.register_own_native(&ty, "new", ANY_ARITY, struct_new);
        self.register_native(&ty, "get_member", 1, struct_get_member);
        self.register_native(&ty, "set_member", 2, struct_set_member);
        self.register_native(&ty, "show", 0, struct_show);
        self.register_native(&ty, "eq", 1, universal_eq);
        self.register_native(&ty, "type", 0, universal_type);
        self.register_native(&ty, "methods", 0, universal_methods);
        ty
    }

    /// Create a prototype: its methods close over the defining scope.
    /// Nothing else goes into the bag.
    pub fn define_proto(
        &mut self,
        name: &str,
        methods: &[(String, FnClause)],
        scope: &super::scope::ScopeRef,
    ) -> TypeRef {
        let name_sym = self.interner.intern(name);
        let ty = TypeObj::new(TypeKind::NamedProto);
        ty.set_name(name_sym);
        ty.set_type(Rc::clone(&self.types.proto_meta));

        for (method_name, clause) in methods {
            let method_sym = self.interner.intern(method_name);
            ty.add_method(Rc::new(UnboundMethod {
                owner: Rc::clone(&ty),
                name: method_sym,
                closure: Rc::clone(scope),
                imp: MethodImpl::Interpreted {
                    params: Rc::new(clause.params.clone()),
                    body: Rc::new(clause.body.clone()),
                },
            }));
        }
        self.register_own_native(&ty, "mix_into", 1, proto_mix_into);
        ty
    }

    /// Copy every prototype method the target lacks. First definition
    /// wins: existing methods on the target are never replaced.
    pub fn mix_methods(&mut self, proto: &TypeRef, target: &TypeRef) -> InterpResult<()> {
        if proto.kind != TypeKind::NamedProto {
            let name = self.type_display(proto);
            return Err(RuntimeError::type_error("prototype", &name));
        }
        for method in proto.methods_snapshot() {
            target.add_method_if_absent(method);
        }
        Ok(())
    }
}

/// `new` on a struct type: receiver is the type object, arity is checked
/// against its declared fields here since it varies per struct.
fn struct_new(interp: &mut Interp, receiver: Value, args: &[Value]) -> InterpResult<Value> {
    let Value::Type(ty) = receiver else {
        return Err(RuntimeError::type_error("struct type", receiver.kind_name()));
    };
    if args.len() != ty.fields.len() {
        let name = interp.type_display(&ty);
        return Err(RuntimeError::arity_mismatch(&name, ty.fields.len(), args.len()));
    }
    let fields: HashMap<_, _> = ty
        .fields
        .iter()
        .copied()
        .zip(args.iter().cloned())
        .collect();
    Ok(Value::Instance(Rc::new(RefCell::new(Instance {
        ty: Rc::clone(&ty),
        fields,
    }))))
}

/// Member access on an instance: declared fields first, then methods
fn struct_get_member(
    interp: &mut Interp,
    receiver: Value,
    args: &[Value],
) -> InterpResult<Value> {
    let name = expect_sym(&args[0])?;
    let Value::Instance(inst) = &receiver else {
        return Err(RuntimeError::type_error("instance", receiver.kind_name()));
    };
    let (field, ty) = {
        let inst = inst.borrow();
        (inst.fields.get(&name).cloned(), Rc::clone(&inst.ty))
    };
    if let Some(value) = field {
        return Ok(value);
    }
    if let Some(method) = ty.get_method(name) {
        return Ok(Value::Bound(Rc::new(method.bind(receiver))));
    }
    let type_name = interp.type_display(&ty);
    let member = interp.interner.name(name).to_string();
    Err(RuntimeError::dispatch_miss(&type_name, &member))
}

/// Field assignment; only declared fields may be set
fn struct_set_member(
    interp: &mut Interp,
    receiver: Value,
    args: &[Value],
) -> InterpResult<Value> {
    let name = expect_sym(&args[0])?;
    let value = args[1].clone();
    let Value::Instance(inst) = &receiver else {
        return Err(RuntimeError::type_error("instance", receiver.kind_name()));
    };
    let mut inst = inst.borrow_mut();
    if !inst.ty.fields.contains(&name) {
        let type_name = interp.type_display(&inst.ty);
        let field = interp.interner.name(name).to_string();
        return Err(RuntimeError::struct_field_violation(&type_name, &field));
    }
    inst.fields.insert(name, value.clone());
    Ok(value)
}

/// `Point(x: 1, y: 2)` rendering, fields in declaration order
fn struct_show(interp: &mut Interp, receiver: Value, _args: &[Value]) -> InterpResult<Value> {
    let Value::Instance(inst) = &receiver else {
        return Err(RuntimeError::type_error("instance", receiver.kind_name()));
    };
    let (ty, fields) = {
        let inst = inst.borrow();
        (Rc::clone(&inst.ty), inst.fields.clone())
    };
    let mut out = interp.type_display(&ty);
    out.push('(');
    for (i, field) in ty.fields.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let value = fields.get(field).cloned().unwrap_or(Value::Int(0));
        let shown = interp.show(&value)?;
        let name = interp.interner.name(*field);
        out.push_str(name);
        out.push_str(": ");
        out.push_str(&shown);
    }
    out.push(')');
    Ok(Value::str(out))
}

/// `mix_into` on a prototype type object
fn proto_mix_into(
    interp: &mut Interp,
    receiver: Value,
    args: &[Value],
) -> InterpResult<Value> {
    let Value::Type(proto) = receiver else {
        return Err(RuntimeError::type_error("prototype", receiver.kind_name()));
    };
    let Value::Type(target) = &args[0] else {
        return Err(RuntimeError::type_error("type", args[0].kind_name()));
    };
    interp.mix_methods(&proto, target)?;
    Ok(Value::Type(Rc::clone(target)))
}

// Universal natives shared with the bootstrap pass; they live here and in
// natives.rs callers so struct types get the same machinery as builtins.

pub(crate) fn universal_type(
    interp: &mut Interp,
    receiver: Value,
    _args: &[Value],
) -> InterpResult<Value> {
    Ok(Value::Type(interp.type_of_value(&receiver)))
}

pub(crate) fn universal_methods(
    interp: &mut Interp,
    receiver: Value,
    _args: &[Value],
) -> InterpResult<Value> {
    // On a type object this reports the protocol its instances answer
    // to; on anything else, the protocol of the value's type.
    let ty = match &receiver {
        Value::Type(ty) => Rc::clone(ty),
        other => interp.type_of_value(other),
    };
    let names = ty
        .method_names()
        .into_iter()
        .map(Value::Sym)
        .collect::<Vec<_>>();
    Ok(Value::list(names))
}

pub(crate) fn universal_eq(
    interp: &mut Interp,
    receiver: Value,
    args: &[Value],
) -> InterpResult<Value> {
    Ok(interp.bool_value(structural_eq(&receiver, &args[0])))
}

/// Fallback member access: methods of the receiver's type, bound. A type
/// receiver answers its own methods and its meta-type's protocol bound to
/// the type object itself, and exposes remaining instance methods unbound.
pub(crate) fn universal_get_member(
    interp: &mut Interp,
    receiver: Value,
    args: &[Value],
) -> InterpResult<Value> {
    let name = expect_sym(&args[0])?;
    if let Value::Type(ty) = &receiver {
        if let Some(own) = ty.get_own(name) {
            return Ok(Value::Bound(own));
        }
    }
    let ty = interp.type_of_value(&receiver);
    if let Some(method) = ty.get_method(name) {
        return Ok(Value::Bound(Rc::new(method.bind(receiver))));
    }
    if let Value::Type(ty) = &receiver {
        if let Some(method) = ty.get_method(name) {
            return Ok(Value::Unbound(method));
        }
    }
    let type_name = interp.type_display(&ty);
    let member = interp.interner.name(name).to_string();
    Err(RuntimeError::dispatch_miss(&type_name, &member))
}

pub(crate) fn expect_sym(value: &Value) -> InterpResult<Symbol> {
    value
        .as_sym()
        .ok_or_else(|| RuntimeError::type_error("symbol", value.kind_name()))
}
