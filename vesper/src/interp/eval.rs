//! Tree-walking evaluator
//!
//! Evaluation threads two pieces of context: the lexical scope, which
//! widens at `let` and definition statements (each returns the scope the
//! next statement should run in), and the interpreter's single dynamic
//! chain, which grows at `let $x = ...` and snaps back at block, case-arm
//! and call boundaries. `return` is not an error: it travels outward as a
//! `Flow::Ret` outcome until a call boundary unwraps it.

use super::bootstrap::{CoreTypes, WellKnown};
use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::pattern::MatchBinding;
use super::scope::{child_scope, Scope, ScopeRef};
use super::symbol::{Interner, Symbol};
use super::types::{
    FuncImpl, FuncVal, MethodImpl, NativeFunc, NativeMethod, TypeRef, UnboundMethod,
};
use super::value::{IterState, ModuleVal, Value};
use crate::ast::{BinOp, Body, Expr, ListItem, Spanned, UnOp};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// Depth guard; `stacker` grows the machine stack, this bounds runaway
/// recursion in the interpreted program itself.
const MAX_DEPTH: usize = 10_000;

/// Outcome of evaluating one expression: either a value, or a `return`
/// travelling to the nearest call boundary.
#[derive(Debug)]
pub enum Flow {
    Val(Value),
    Ret(Value),
}

impl Flow {
    /// The carried value, whichever way it is travelling
    pub fn into_value(self) -> Value {
        match self {
            Flow::Val(v) | Flow::Ret(v) => v,
        }
    }
}

/// Extract a plain value from a sub-expression, or propagate a travelling
/// `return` out of the current node.
macro_rules! val {
    ($self:expr, $expr:expr, $scope:expr) => {
        match $self.eval($expr, $scope)?.0 {
            Flow::Val(v) => v,
            ret @ Flow::Ret(_) => return Ok((ret, Rc::clone($scope))),
        }
    };
}

/// The interpreter state
pub struct Interp {
    pub interner: Interner,
    pub types: CoreTypes,
    pub syms: WellKnown,
    /// The kernel module: prelude bindings every module scope is seeded from
    pub kernel: Rc<ModuleVal>,
    /// Head of the one global dynamic chain
    pub dynamic: ScopeRef,
    /// Loaded-module registry, keyed by interned source path
    pub modules: HashMap<Symbol, Rc<ModuleVal>>,
    depth: usize,
}

impl Interp {
    pub(crate) fn with_parts(
        interner: Interner,
        types: CoreTypes,
        syms: WellKnown,
        kernel: Rc<ModuleVal>,
        dynamic: ScopeRef,
    ) -> Self {
        Interp {
            interner,
            types,
            syms,
            kernel,
            dynamic,
            modules: HashMap::new(),
            depth: 0,
        }
    }

    /// A fresh scope under the kernel prelude, for a script or REPL session
    pub fn toplevel_scope(&self) -> ScopeRef {
        child_scope(&self.kernel.scope)
    }

    /// Run a statement list, threading the scope so `let` and definitions
    /// widen it for the statements after them. A `return` at this level
    /// stops the list and yields its value.
    pub fn run_stmts(
        &mut self,
        stmts: &[Spanned<Expr>],
        scope: ScopeRef,
    ) -> InterpResult<(Value, ScopeRef)> {
        let mut current = scope;
        let mut last = Value::Int(0);
        for stmt in stmts {
            let (flow, next) = self.eval(stmt, &current)?;
            current = next;
            match flow {
                Flow::Val(v) => last = v,
                Flow::Ret(v) => return Ok((v, current)),
            }
        }
        Ok((last, current))
    }

    /// Evaluate one expression for its value, treating a travelling
    /// `return` as that value. Used where no call boundary exists to
    /// unwrap it, such as map-pattern defaults.
    pub fn eval_value(
        &mut self,
        expr: &Spanned<Expr>,
        scope: &ScopeRef,
    ) -> InterpResult<Value> {
        Ok(self.eval(expr, scope)?.0.into_value())
    }

    /// Evaluate one expression. Returns the outcome and the scope the
    /// next statement in the same sequence should use.
    pub fn eval(
        &mut self,
        expr: &Spanned<Expr>,
        scope: &ScopeRef,
    ) -> InterpResult<(Flow, ScopeRef)> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            self.depth -= 1;
            return Err(RuntimeError::stack_overflow());
        }
        let result = stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
            self.eval_inner(&expr.node, scope)
        });
        self.depth -= 1;
        result
    }

    fn eval_inner(
        &mut self,
        expr: &Expr,
        scope: &ScopeRef,
    ) -> InterpResult<(Flow, ScopeRef)> {
        let same = |v: Value, scope: &ScopeRef| (Flow::Val(v), Rc::clone(scope));
        match expr {
            Expr::Int(n) => Ok(same(Value::Int(*n), scope)),
            Expr::Str(s) => Ok(same(Value::str(s.clone()), scope)),
            Expr::Sym(name) => {
                let sym = self.interner.intern(name);
                Ok(same(Value::Sym(sym), scope))
            }

            Expr::Var(name) => {
                let sym = self.interner.intern(name);
                match scope.borrow().get(sym) {
                    Some(v) => Ok(same(v, scope)),
                    None => Err(RuntimeError::unbound_symbol(name)),
                }
            }
            Expr::DynVar(name) => {
                let sym = self.interner.intern(name);
                match self.dynamic.borrow().get(sym) {
                    Some(v) => Ok(same(v, scope)),
                    None => Err(RuntimeError::unbound_dynamic(name)),
                }
            }

            Expr::ListLit(items) => {
                let mut elems = VecDeque::new();
                for item in items {
                    match item {
                        ListItem::Elem(e) => elems.push_back(val!(self, e, scope)),
                        ListItem::Spread(e) => {
                            let source = val!(self, e, scope);
                            self.spread_into(&source, &mut elems)?;
                        }
                    }
                }
                Ok(same(Value::list(elems), scope))
            }

            Expr::MapLit { entries, spread } => {
                let mut map = HashMap::new();
                if let Some(source) = spread {
                    let source = val!(self, source, scope);
                    let Value::Map(m) = source else {
                        return Err(RuntimeError::type_error("map", source.kind_name()));
                    };
                    map.extend(m.borrow().iter().map(|(k, v)| (*k, v.clone())));
                }
                for (name, value) in entries {
                    let key = self.interner.intern(name);
                    let value = match value {
                        Some(e) => val!(self, e, scope),
                        // `{x}` shorthand reads the like-named binding
                        None => match scope.borrow().get(key) {
                            Some(v) => v,
                            None => return Err(RuntimeError::unbound_symbol(name)),
                        },
                    };
                    map.insert(key, value);
                }
                Ok(same(Value::map(map), scope))
            }

            Expr::Range {
                start,
                end,
                inclusive,
            } => {
                let start = val!(self, start, scope);
                let end = val!(self, end, scope);
                let (Some(start), Some(end)) = (start.as_int(), end.as_int()) else {
                    return Err(RuntimeError::type_error("int range bounds", "other"));
                };
                Ok(same(Value::range(start, end, *inclusive), scope))
            }

            Expr::Member { object, name } => {
                let object = val!(self, object, scope);
                let name_sym = self.interner.intern(name);
                let result =
                    self.dispatch(&object, self.syms.get_member, &[Value::Sym(name_sym)])?;
                Ok(same(result, scope))
            }
            Expr::Index { object, index } => {
                let object = val!(self, object, scope);
                let index = val!(self, index, scope);
                let result = self.dispatch(&object, self.syms.get_item, &[index])?;
                Ok(same(result, scope))
            }
            Expr::MethodCall { object, name, args } => {
                let object = val!(self, object, scope);
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(val!(self, arg, scope));
                }
                let name_sym = self.interner.intern(name);
                // Uniform member-then-call: fields holding functions and
                // real methods go through the same door.
                let member =
                    self.dispatch(&object, self.syms.get_member, &[Value::Sym(name_sym)])?;
                let result = self.call_value(&member, &arg_values)?;
                Ok(same(result, scope))
            }
            Expr::Call { callee, args } => {
                let callee = val!(self, callee, scope);
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(val!(self, arg, scope));
                }
                let result = self.call_value(&callee, &arg_values)?;
                Ok(same(result, scope))
            }

            Expr::Binary { op, left, right } => match op {
                BinOp::And => {
                    let left = val!(self, left, scope);
                    if self.is_falsy(&left) {
                        Ok(same(left, scope))
                    } else {
                        let right = val!(self, right, scope);
                        Ok(same(right, scope))
                    }
                }
                BinOp::Or => {
                    let left = val!(self, left, scope);
                    if self.is_falsy(&left) {
                        let right = val!(self, right, scope);
                        Ok(same(right, scope))
                    } else {
                        Ok(same(left, scope))
                    }
                }
                BinOp::Eq | BinOp::Ne => {
                    let left = val!(self, left, scope);
                    let right = val!(self, right, scope);
                    let equal = structural_eq(&left, &right);
                    let truth = if *op == BinOp::Eq { equal } else { !equal };
                    Ok(same(self.bool_value(truth), scope))
                }
                _ => {
                    let left = val!(self, left, scope);
                    let right = val!(self, right, scope);
                    let name = op
                        .method_name()
                        .expect("dispatching operator has a method name");
                    let name_sym = self.interner.intern(name);
                    let result = self.dispatch(&left, name_sym, &[right])?;
                    Ok(same(result, scope))
                }
            },
            Expr::Unary { op, expr } => {
                let operand = val!(self, expr, scope);
                match op {
                    UnOp::Not => {
                        let falsy = self.is_falsy(&operand);
                        Ok(same(self.bool_value(falsy), scope))
                    }
                    UnOp::Neg => {
                        let result = self.dispatch(&operand, self.syms.neg, &[])?;
                        Ok(same(result, scope))
                    }
                }
            }

            Expr::Let { pattern, value } => {
                let value = val!(self, value, scope);
                let bindings = self.match_or_err(pattern, &value, scope, "let")?;
                let widened = child_scope(scope);
                self.apply_bindings(bindings, &widened);
                Ok((Flow::Val(value), widened))
            }
            Expr::Assign { pattern, value } => {
                let value = val!(self, value, scope);
                let bindings = self.match_or_err(pattern, &value, scope, "assignment")?;
                for binding in bindings {
                    self.assign_binding(binding, scope)?;
                }
                Ok((Flow::Val(value), Rc::clone(scope)))
            }
            Expr::AssignMember {
                object,
                name,
                value,
            } => {
                let object = val!(self, object, scope);
                let value = val!(self, value, scope);
                let name_sym = self.interner.intern(name);
                self.dispatch(
                    &object,
                    self.syms.set_member,
                    &[Value::Sym(name_sym), value.clone()],
                )?;
                Ok(same(value, scope))
            }
            Expr::AssignIndex {
                object,
                index,
                value,
            } => {
                let object = val!(self, object, scope);
                let index = val!(self, index, scope);
                let value = val!(self, value, scope);
                self.dispatch(&object, self.syms.set_item, &[index, value.clone()])?;
                Ok(same(value, scope))
            }

            Expr::If {
                branches,
                else_body,
            } => {
                for (cond, body) in branches {
                    let cond = val!(self, cond, scope);
                    if !self.is_falsy(&cond) {
                        let flow = self.eval_body(body, scope)?;
                        return Ok((flow, Rc::clone(scope)));
                    }
                }
                match else_body {
                    Some(body) => {
                        let flow = self.eval_body(body, scope)?;
                        Ok((flow, Rc::clone(scope)))
                    }
                    None => Ok(same(Value::Int(0), scope)),
                }
            }
            Expr::While { cond, body } => {
                loop {
                    let cond = val!(self, cond, scope);
                    if self.is_falsy(&cond) {
                        break;
                    }
                    match self.eval_body(body, scope)? {
                        Flow::Val(_) => {}
                        ret @ Flow::Ret(_) => return Ok((ret, Rc::clone(scope))),
                    }
                }
                Ok(same(Value::Int(0), scope))
            }
            Expr::For {
                pattern,
                iterable,
                body,
            } => {
                let iterable = val!(self, iterable, scope);
                let iter = self.dispatch(&iterable, self.syms.make_iter, &[])?;
                loop {
                    let step = self.dispatch(&iter, self.syms.next, &[])?;
                    let Some(item) = self.decode_iter_step(&step)? else {
                        break;
                    };
                    let bindings =
                        self.match_or_err(pattern, &item, scope, "for loop")?;
                    match self.eval_body_binding(body, scope, bindings)? {
                        Flow::Val(_) => {}
                        ret @ Flow::Ret(_) => return Ok((ret, Rc::clone(scope))),
                    }
                }
                Ok(same(Value::Int(0), scope))
            }
            Expr::Case { subject, arms } => {
                let subject = val!(self, subject, scope);
                for (pattern, body) in arms {
                    let mut bindings = Vec::new();
                    if self.match_pattern(pattern, &subject, scope, &mut bindings)? {
                        let flow = self.eval_body_binding(body, scope, bindings)?;
                        return Ok((flow, Rc::clone(scope)));
                    }
                }
                Err(RuntimeError::case_exhausted())
            }
            Expr::Block(body) => {
                let flow = self.eval_body(body, scope)?;
                Ok((flow, Rc::clone(scope)))
            }

            Expr::FnDef { name, clauses } => {
                let name_sym = self.interner.intern(name);
                let widened = child_scope(scope);
                // Closing over the scope that holds the function itself
                // is what makes recursion work; the resulting cycle is
                // accepted and lives as long as the function does.
                let func = Rc::new(FuncVal {
                    name: name_sym,
                    closure: Rc::clone(&widened),
                    imp: FuncImpl::Clauses(Rc::new(clauses.clone())),
                });
                widened
                    .borrow_mut()
                    .define(name_sym, Value::Func(Rc::clone(&func)));
                Ok((Flow::Val(Value::Func(func)), widened))
            }
            Expr::Lambda(clause) => {
                let name_sym = self.interner.intern("<lambda>");
                let func = Rc::new(FuncVal {
                    name: name_sym,
                    closure: Rc::clone(scope),
                    imp: FuncImpl::Clauses(Rc::new(vec![clause.clone()])),
                });
                Ok(same(Value::Func(func), scope))
            }
            Expr::MethodDef {
                target,
                name,
                params,
                body,
            } => {
                let target = val!(self, target, scope);
                let Value::Type(ty) = target else {
                    return Err(RuntimeError::type_error("type", target.kind_name()));
                };
                let name_sym = self.interner.intern(name);
                let method = Rc::new(UnboundMethod {
                    owner: Rc::clone(&ty),
                    name: name_sym,
                    closure: Rc::clone(scope),
                    imp: MethodImpl::Interpreted {
                        params: Rc::new(params.clone()),
                        body: Rc::new(body.clone()),
                    },
                });
                ty.add_method(Rc::clone(&method));
                Ok(same(Value::Unbound(method), scope))
            }
            Expr::StructDef { name, fields } => {
                let ty = self.define_struct(name, fields);
                let name_sym = self.interner.intern(name);
                let widened = child_scope(scope);
                widened
                    .borrow_mut()
                    .define(name_sym, Value::Type(Rc::clone(&ty)));
                Ok((Flow::Val(Value::Type(ty)), widened))
            }
            Expr::ProtoDef { name, methods } => {
                let ty = self.define_proto(name, methods, scope);
                let name_sym = self.interner.intern(name);
                let widened = child_scope(scope);
                widened
                    .borrow_mut()
                    .define(name_sym, Value::Type(Rc::clone(&ty)));
                Ok((Flow::Val(Value::Type(ty)), widened))
            }
            Expr::MixInto { proto, target } => {
                let proto = val!(self, proto, scope);
                let target = val!(self, target, scope);
                let (Value::Type(proto), Value::Type(target)) = (&proto, &target) else {
                    return Err(RuntimeError::type_error(
                        "prototype and type",
                        "other values",
                    ));
                };
                self.mix_methods(proto, target)?;
                Ok(same(Value::Type(Rc::clone(target)), scope))
            }

            Expr::Use { path, alias } => {
                let module = self.load_module(path)?;
                let binding = match alias {
                    Some(alias) => alias.as_str(),
                    None => path.rsplit('/').next().unwrap_or(path),
                };
                let sym = self.interner.intern(binding);
                let widened = child_scope(scope);
                widened
                    .borrow_mut()
                    .define(sym, Value::Module(Rc::clone(&module)));
                Ok((Flow::Val(Value::Module(module)), widened))
            }
            Expr::UseNames { path, names } => {
                let module = self.load_module(path)?;
                let widened = child_scope(scope);
                for (name, alias) in names {
                    let source = self.interner.intern(name);
                    let Some(value) = module.scope.borrow().get(source) else {
                        let module_name = self.interner.name(module.name).to_string();
                        return Err(RuntimeError::new(
                            ErrorKind::UnboundSymbol,
                            format!("module `{module_name}` does not define `{name}`"),
                        ));
                    };
                    let target = self.interner.intern(alias.as_deref().unwrap_or(name));
                    widened.borrow_mut().define(target, value);
                }
                Ok((Flow::Val(Value::Module(module)), widened))
            }

            Expr::Return(value) => {
                let value = match value {
                    Some(e) => val!(self, e, scope),
                    None => Value::Int(0),
                };
                Ok((Flow::Ret(value), Rc::clone(scope)))
            }
        }
    }

    /// Evaluate a body in a fresh child scope; the dynamic chain snaps
    /// back to its entry state when the body finishes, even on error.
    pub(crate) fn eval_body(&mut self, body: &Body, parent: &ScopeRef) -> InterpResult<Flow> {
        self.eval_body_binding(body, parent, Vec::new())
    }

    /// Like `eval_body`, with pre-matched bindings installed first
    pub(crate) fn eval_body_binding(
        &mut self,
        body: &Body,
        parent: &ScopeRef,
        bindings: Vec<MatchBinding>,
    ) -> InterpResult<Flow> {
        let saved = Rc::clone(&self.dynamic);
        let scope = child_scope(parent);
        self.apply_bindings(bindings, &scope);
        let result = self.run_body_stmts(body, scope);
        self.dynamic = saved;
        result
    }

    fn run_body_stmts(&mut self, body: &Body, scope: ScopeRef) -> InterpResult<Flow> {
        let mut current = scope;
        let mut last = Value::Int(0);
        for stmt in body {
            let (flow, next) = self.eval(stmt, &current)?;
            current = next;
            match flow {
                Flow::Val(v) => last = v,
                ret @ Flow::Ret(_) => return Ok(ret),
            }
        }
        Ok(Flow::Val(last))
    }

    /// Install match bindings: lexical ones define in `scope`, dynamic
    /// ones record their introduction there and push a new dynamic frame.
    pub(crate) fn apply_bindings(&mut self, bindings: Vec<MatchBinding>, scope: &ScopeRef) {
        for binding in bindings {
            if binding.dynamic {
                scope.borrow_mut().mark_dynamic(binding.name);
                let frame = child_scope(&self.dynamic);
                frame.borrow_mut().define(binding.name, binding.value);
                self.dynamic = frame;
            } else {
                scope.borrow_mut().define(binding.name, binding.value);
            }
        }
    }

    fn assign_binding(
        &mut self,
        binding: MatchBinding,
        scope: &ScopeRef,
    ) -> InterpResult<()> {
        let name = self.interner.name(binding.name).to_string();
        if binding.dynamic {
            if !scope.borrow().authorizes_dynamic(binding.name) {
                return Err(RuntimeError::dynamic_scope_violation(&name));
            }
            if !self.dynamic.borrow_mut().set(binding.name, binding.value.clone()) {
                self.dynamic.borrow_mut().define(binding.name, binding.value);
            }
            Ok(())
        } else if scope.borrow_mut().set(binding.name, binding.value) {
            Ok(())
        } else {
            Err(RuntimeError::unbound_symbol(&name))
        }
    }

    fn spread_into(
        &mut self,
        source: &Value,
        out: &mut VecDeque<Value>,
    ) -> InterpResult<()> {
        match source {
            Value::List(items) => {
                out.extend(items.borrow().iter().cloned());
                Ok(())
            }
            Value::Range(range) => {
                let mut cursor = IterState::Span {
                    next: range.start,
                    end: range.end,
                    inclusive: range.inclusive,
                };
                while let Some(v) = cursor.next() {
                    out.push_back(v);
                }
                Ok(())
            }
            other => Err(RuntimeError::type_error("list or range", other.kind_name())),
        }
    }

    /// Decode one step of the `next` protocol: a `[:value, v]` or
    /// `[:done, false]` pair.
    fn decode_iter_step(&mut self, step: &Value) -> InterpResult<Option<Value>> {
        let Value::List(pair) = step else {
            return Err(RuntimeError::type_error("[tag, value] pair", step.kind_name()));
        };
        let pair = pair.borrow();
        let (Some(Value::Sym(tag)), Some(payload)) = (pair.front(), pair.get(1)) else {
            return Err(RuntimeError::type_error("[tag, value] pair", "malformed step"));
        };
        if *tag == self.syms.done {
            Ok(None)
        } else if *tag == self.syms.value {
            Ok(Some(payload.clone()))
        } else {
            let tag = self.interner.name(*tag).to_string();
            Err(RuntimeError::type_error(":value or :done tag", &tag))
        }
    }

    // ---- dispatch and calls ----

    /// The type object governing a value's instance protocol
    pub fn type_of_value(&self, value: &Value) -> TypeRef {
        let t = &self.types;
        match value {
            Value::Int(_) => Rc::clone(&t.int),
            Value::Str(_) => Rc::clone(&t.str_),
            Value::Sym(_) => Rc::clone(&t.symbol),
            Value::List(_) => Rc::clone(&t.list),
            Value::Map(_) => Rc::clone(&t.map),
            Value::Range(_) => Rc::clone(&t.range),
            Value::Scope(_) => Rc::clone(&t.scope),
            Value::Func(_) => Rc::clone(&t.function),
            Value::Unbound(_) => Rc::clone(&t.unbound),
            Value::Bound(_) => Rc::clone(&t.bound),
            Value::Module(_) => Rc::clone(&t.module),
            Value::Iter(_) => Rc::clone(&t.iter),
            Value::Instance(inst) => Rc::clone(&inst.borrow().ty),
            Value::Type(ty) => ty.type_of(),
        }
    }

    /// Single dispatch: type-level (own) methods first for type
    /// receivers, then the receiver's type's instance protocol. There is
    /// no ancestor chain to climb.
    pub fn dispatch(
        &mut self,
        receiver: &Value,
        name: Symbol,
        args: &[Value],
    ) -> InterpResult<Value> {
        if let Value::Type(ty) = receiver {
            if let Some(own) = ty.get_own(name) {
                let receiver = own.receiver.clone();
                let method = Rc::clone(&own.method);
                return self.call_unbound(&method, receiver, args);
            }
        }
        let ty = self.type_of_value(receiver);
        match ty.get_method(name) {
            Some(method) => self.call_unbound(&method, receiver.clone(), args),
            None => {
                let type_name = self.type_display(&ty);
                let method_name = self.interner.name(name).to_string();
                Err(RuntimeError::dispatch_miss(&type_name, &method_name))
            }
        }
    }

    /// Host-facing dispatch by method name
    pub fn call_method(
        &mut self,
        receiver: &Value,
        name: &str,
        args: &[Value],
    ) -> InterpResult<Value> {
        let sym = self.interner.intern(name);
        self.dispatch(receiver, sym, args)
    }

    /// Call any callable value
    pub fn call_value(&mut self, callee: &Value, args: &[Value]) -> InterpResult<Value> {
        match callee {
            Value::Func(func) => {
                let func = Rc::clone(func);
                self.call_function(&func, args)
            }
            Value::Bound(bound) => {
                let method = Rc::clone(&bound.method);
                let receiver = bound.receiver.clone();
                self.call_unbound(&method, receiver, args)
            }
            // `Point(1, 2)` construction goes through the type's own `new`
            Value::Type(ty) => {
                if ty.get_own(self.syms.new).is_some() {
                    let ty = Value::Type(Rc::clone(ty));
                    self.dispatch(&ty, self.syms.new, args)
                } else {
                    Err(RuntimeError::not_callable(callee.kind_name()))
                }
            }
            other => Err(RuntimeError::not_callable(other.kind_name())),
        }
    }

    pub fn call_function(
        &mut self,
        func: &Rc<FuncVal>,
        args: &[Value],
    ) -> InterpResult<Value> {
        match &func.imp {
            FuncImpl::Native { arity, func: f } => {
                if *arity != super::types::ANY_ARITY && args.len() != *arity {
                    let name = self.interner.name(func.name).to_string();
                    return Err(RuntimeError::arity_mismatch(&name, *arity, args.len()));
                }
                f(self, args)
            }
            FuncImpl::Clauses(clauses) => {
                let clauses = Rc::clone(clauses);
                for clause in clauses.iter() {
                    if clause.params.len() != args.len() {
                        continue;
                    }
                    let Some(bindings) =
                        self.match_params(&clause.params, args, &func.closure)?
                    else {
                        continue;
                    };
                    let flow =
                        self.eval_body_binding(&clause.body, &func.closure, bindings)?;
                    return Ok(flow.into_value());
                }
                let name = self.interner.name(func.name).to_string();
                Err(RuntimeError::pattern_match(&format!(
                    "call of `{name}`: no clause accepts the arguments"
                )))
            }
        }
    }

    pub fn call_unbound(
        &mut self,
        method: &Rc<UnboundMethod>,
        receiver: Value,
        args: &[Value],
    ) -> InterpResult<Value> {
        match &method.imp {
            MethodImpl::Native { arity, func } => {
                if *arity != super::types::ANY_ARITY && args.len() != *arity {
                    let name = self.interner.name(method.name).to_string();
                    return Err(RuntimeError::arity_mismatch(&name, *arity, args.len()));
                }
                func(self, receiver, args)
            }
            MethodImpl::Interpreted { params, body } => {
                let params = Rc::clone(params);
                let body = Rc::clone(body);
                if params.len() != args.len() {
                    let name = self.interner.name(method.name).to_string();
                    return Err(RuntimeError::arity_mismatch(
                        &name,
                        params.len(),
                        args.len(),
                    ));
                }
                let Some(mut bindings) =
                    self.match_params(&params, args, &method.closure)?
                else {
                    let name = self.interner.name(method.name).to_string();
                    return Err(RuntimeError::pattern_match(&format!(
                        "call of method `{name}`"
                    )));
                };
                bindings.push(MatchBinding {
                    name: self.syms.this,
                    dynamic: false,
                    value: receiver,
                });
                let flow = self.eval_body_binding(&body, &method.closure, bindings)?;
                Ok(flow.into_value())
            }
        }
    }

    /// Match a parameter list against arguments; `None` on mismatch
    fn match_params(
        &mut self,
        params: &[crate::ast::Pattern],
        args: &[Value],
        scope: &ScopeRef,
    ) -> InterpResult<Option<Vec<MatchBinding>>> {
        let mut bindings = Vec::new();
        for (param, arg) in params.iter().zip(args) {
            if !self.match_pattern(param, arg, scope, &mut bindings)? {
                return Ok(None);
            }
        }
        Ok(Some(bindings))
    }

    // ---- helpers shared with the natives ----

    /// The false sentinel is the one falsy value; everything else,
    /// including 0 and the empty list, counts as true.
    pub fn is_falsy(&self, value: &Value) -> bool {
        matches!(value, Value::Sym(s) if *s == self.syms.false_)
    }

    pub fn bool_value(&self, truth: bool) -> Value {
        Value::Sym(if truth { self.syms.true_ } else { self.syms.false_ })
    }

    /// Render a value through its `show` method; values whose type has no
    /// `show` render as an angle-bracketed kind placeholder.
    pub fn show(&mut self, value: &Value) -> InterpResult<String> {
        match self.dispatch(value, self.syms.show, &[]) {
            Ok(Value::Str(text)) => Ok(text.as_str().to_string()),
            Ok(other) => Ok(format!("<{}>", other.kind_name())),
            Err(err) if err.kind == ErrorKind::DispatchMiss => {
                Ok(format!("<{}>", value.kind_name()))
            }
            Err(err) => Err(err),
        }
    }

    pub fn type_display(&self, ty: &TypeRef) -> String {
        match ty.name() {
            Some(sym) => self.interner.name(sym).to_string(),
            None => "<anonymous type>".to_string(),
        }
    }

    // ---- native registration ----

    pub fn register_native(
        &mut self,
        ty: &TypeRef,
        name: &str,
        arity: usize,
        func: NativeMethod,
    ) {
        let method = self.make_native(ty, name, arity, func);
        ty.add_method(method);
    }

    /// Universal-pass variant: never replaces an existing method
    pub fn register_native_if_absent(
        &mut self,
        ty: &TypeRef,
        name: &str,
        arity: usize,
        func: NativeMethod,
    ) {
        let method = self.make_native(ty, name, arity, func);
        ty.add_method_if_absent(method);
    }

    /// Install a type-level method, pre-bound to the type object
    pub fn register_own_native(
        &mut self,
        ty: &TypeRef,
        name: &str,
        arity: usize,
        func: NativeMethod,
    ) {
        let method = self.make_native(ty, name, arity, func);
        let bound = method.bind(Value::Type(Rc::clone(ty)));
        ty.add_own(method.name, Rc::new(bound));
    }

    fn make_native(
        &mut self,
        ty: &TypeRef,
        name: &str,
        arity: usize,
        func: NativeMethod,
    ) -> Rc<UnboundMethod> {
        let sym = self.interner.intern(name);
        Rc::new(UnboundMethod {
            owner: Rc::clone(ty),
            name: sym,
            closure: Rc::clone(&self.kernel.scope),
            imp: MethodImpl::Native { arity, func },
        })
    }

    /// Bind a native free function in a scope
    pub fn register_native_fn(
        &mut self,
        scope: &ScopeRef,
        name: &str,
        arity: usize,
        func: NativeFunc,
    ) {
        let sym = self.interner.intern(name);
        let value = Value::Func(Rc::new(FuncVal {
            name: sym,
            closure: Rc::clone(&self.kernel.scope),
            imp: FuncImpl::Native { arity, func },
        }));
        scope.borrow_mut().define(sym, value);
    }

    /// A fresh scope for a loaded module, seeded with everything visible
    /// from the kernel prelude.
    pub(crate) fn seeded_module_scope(&self) -> ScopeRef {
        let scope = Scope::new().into_ref();
        {
            let kernel = self.kernel.scope.borrow();
            let mut fresh = scope.borrow_mut();
            for (sym, value) in kernel.visible_bindings() {
                fresh.define(sym, value);
            }
            for sym in kernel.visible_dynamic_intros() {
                fresh.mark_dynamic(sym);
            }
        }
        scope
    }
}

/// Structural equality: deep for the data shapes, identity for behaviour
/// carriers. Never runs user code, so `==` cannot diverge from itself.
pub fn structural_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Sym(a), Value::Sym(b)) => a == b,
        (Value::Range(a), Value::Range(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            if Rc::ptr_eq(a, b) {
                return true;
            }
            let (a, b) = (a.borrow(), b.borrow());
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| structural_eq(x, y))
        }
        (Value::Map(a), Value::Map(b)) => {
            if Rc::ptr_eq(a, b) {
                return true;
            }
            let (a, b) = (a.borrow(), b.borrow());
            a.len() == b.len()
                && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| structural_eq(v, w)))
        }
        (Value::Instance(a), Value::Instance(b)) => {
            if Rc::ptr_eq(a, b) {
                return true;
            }
            let (a, b) = (a.borrow(), b.borrow());
            Rc::ptr_eq(&a.ty, &b.ty)
                && a.fields.len() == b.fields.len()
                && a.fields
                    .iter()
                    .all(|(k, v)| b.fields.get(k).is_some_and(|w| structural_eq(v, w)))
        }
        (Value::Bound(a), Value::Bound(b)) => a.same_binding(b),
        _ => a.identical(b),
    }
}
