//! Native methods of the built-in types
//!
//! Everything a script can do to an int, string, list, map or range is a
//! method on its type object, installed here during bootstrap. The final
//! universal pass then fills `type`, `methods`, `eq` and `get_member`
//! onto every core type that did not claim its own version.

use super::error::{InterpResult, RuntimeError};
use super::eval::Interp;
use super::structs::{
    expect_sym, universal_eq, universal_get_member, universal_methods, universal_type,
};
use super::symbol::Symbol;
use super::value::{IterState, Value};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

impl Interp {
    /// Install the instance protocols of every built-in type
    pub(crate) fn install_prelude(&mut self) {
        let t = &self.types;
        let (int, str_, sym, list, map, range, iter, module) = (
            Rc::clone(&t.int),
            Rc::clone(&t.str_),
            Rc::clone(&t.symbol),
            Rc::clone(&t.list),
            Rc::clone(&t.map),
            Rc::clone(&t.range),
            Rc::clone(&t.iter),
            Rc::clone(&t.module),
        );
        let (root, struct_meta, proto_meta, function, unbound, bound, scope) = (
            Rc::clone(&t.root),
            Rc::clone(&t.struct_meta),
            Rc::clone(&t.proto_meta),
            Rc::clone(&t.function),
            Rc::clone(&t.unbound),
            Rc::clone(&t.bound),
            Rc::clone(&t.scope),
        );

        self.register_native(&int, "add", 1, int_add);
        self.register_native(&int, "sub", 1, int_sub);
        self.register_native(&int, "mul", 1, int_mul);
        self.register_native(&int, "div", 1, int_div);
        self.register_native(&int, "mod", 1, int_mod);
        self.register_native(&int, "neg", 0, int_neg);
        self.register_native(&int, "lt", 1, int_lt);
        self.register_native(&int, "lte", 1, int_lte);
        self.register_native(&int, "gt", 1, int_gt);
        self.register_native(&int, "gte", 1, int_gte);
        self.register_native(&int, "show", 0, int_show);

        self.register_native(&str_, "add", 1, str_add);
        self.register_native(&str_, "len", 0, str_len);
        self.register_native(&str_, "show", 0, str_show);

        self.register_native(&sym, "show", 0, sym_show);
        self.register_native(&sym, "name", 0, sym_name);

        self.register_native(&list, "show", 0, list_show);
        self.register_native(&list, "len", 0, list_len);
        self.register_native(&list, "push!", 1, list_push);
        self.register_native(&list, "pop!", 0, list_pop);
        self.register_native(&list, "push_front!", 1, list_push_front);
        self.register_native(&list, "pop_front!", 0, list_pop_front);
        self.register_native(&list, "get_item", 1, list_get_item);
        self.register_native(&list, "set_item", 2, list_set_item);
        self.register_native(&list, "make_iter", 0, list_make_iter);

        self.register_native(&map, "show", 0, map_show);
        self.register_native(&map, "len", 0, map_len);
        self.register_native(&map, "get_item", 1, map_get_item);
        self.register_native(&map, "set_item", 2, map_set_item);
        self.register_native(&map, "keys", 0, map_keys);
        self.register_native(&map, "has?", 1, map_has);
        self.register_native(&map, "make_iter", 0, map_make_iter);

        self.register_native(&range, "show", 0, range_show);
        self.register_native(&range, "len", 0, range_len);
        self.register_native(&range, "start", 0, range_start);
        self.register_native(&range, "end", 0, range_end);
        self.register_native(&range, "make_iter", 0, range_make_iter);

        self.register_native(&iter, "next", 0, iter_next);

        // `m.name` resolves in the module's scope, nothing else.
        self.register_native(&module, "get_member", 1, module_get_member);
        self.register_native(&module, "show", 0, module_show);

        // Built-in type objects have type `root`; user types have type
        // `struct`/`proto`. `show` on those meta-types renders the name.
        self.register_native(&root, "show", 0, type_show);
        self.register_native(&struct_meta, "show", 0, type_show);
        self.register_native(&proto_meta, "show", 0, type_show);

        self.register_native(&function, "show", 0, callable_show);
        self.register_native(&unbound, "show", 0, callable_show);
        self.register_native(&bound, "show", 0, callable_show);
        self.register_native(&scope, "show", 0, scope_show);
    }

    /// The universal pass: every core type answers `type`, `methods`,
    /// `eq` and `get_member`, unless it already installed its own.
    pub(crate) fn install_universals(&mut self) {
        for ty in self.types.members() {
            self.register_native_if_absent(&ty, "type", 0, universal_type);
            self.register_native_if_absent(&ty, "methods", 0, universal_methods);
            self.register_native_if_absent(&ty, "eq", 1, universal_eq);
            self.register_native_if_absent(&ty, "get_member", 1, universal_get_member);
        }
    }

    /// Build one step of the `next` protocol
    pub(crate) fn iter_step(&self, item: Option<Value>) -> Value {
        match item {
            Some(v) => Value::list(vec![Value::Sym(self.syms.value), v]),
            None => Value::list(vec![
                Value::Sym(self.syms.done),
                Value::Sym(self.syms.false_),
            ]),
        }
    }
}

fn expect_int(value: &Value) -> InterpResult<i64> {
    value
        .as_int()
        .ok_or_else(|| RuntimeError::type_error("int", value.kind_name()))
}

// ---- int ----

macro_rules! int_binop {
    ($name:ident, |$a:ident, $b:ident| $body:expr) => {
        fn $name(_interp: &mut Interp, recv: Value, args: &[Value]) -> InterpResult<Value> {
            let $a = expect_int(&recv)?;
            let $b = expect_int(&args[0])?;
            $body
        }
    };
}

int_binop!(int_add, |a, b| Ok(Value::Int(a.wrapping_add(b))));
int_binop!(int_sub, |a, b| Ok(Value::Int(a.wrapping_sub(b))));
int_binop!(int_mul, |a, b| Ok(Value::Int(a.wrapping_mul(b))));

fn int_div(_interp: &mut Interp, recv: Value, args: &[Value]) -> InterpResult<Value> {
    let a = expect_int(&recv)?;
    let b = expect_int(&args[0])?;
    if b == 0 {
        return Err(RuntimeError::division_by_zero());
    }
    Ok(Value::Int(a.wrapping_div(b)))
}

fn int_mod(_interp: &mut Interp, recv: Value, args: &[Value]) -> InterpResult<Value> {
    let a = expect_int(&recv)?;
    let b = expect_int(&args[0])?;
    if b == 0 {
        return Err(RuntimeError::division_by_zero());
    }
    Ok(Value::Int(a.wrapping_rem(b)))
}

fn int_neg(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    Ok(Value::Int(expect_int(&recv)?.wrapping_neg()))
}

macro_rules! int_cmp {
    ($name:ident, $op:tt) => {
        fn $name(interp: &mut Interp, recv: Value, args: &[Value]) -> InterpResult<Value> {
            let a = expect_int(&recv)?;
            let b = expect_int(&args[0])?;
            Ok(interp.bool_value(a $op b))
        }
    };
}

int_cmp!(int_lt, <);
int_cmp!(int_lte, <=);
int_cmp!(int_gt, >);
int_cmp!(int_gte, >=);

fn int_show(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    Ok(Value::str(expect_int(&recv)?.to_string()))
}

// ---- str ----

fn str_add(_interp: &mut Interp, recv: Value, args: &[Value]) -> InterpResult<Value> {
    let (Value::Str(a), Value::Str(b)) = (&recv, &args[0]) else {
        return Err(RuntimeError::type_error("string", args[0].kind_name()));
    };
    Ok(Value::str(format!("{a}{b}")))
}

fn str_len(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    let Value::Str(s) = &recv else {
        return Err(RuntimeError::type_error("string", recv.kind_name()));
    };
    Ok(Value::Int(s.chars().count() as i64))
}

/// Strings show as their raw contents, no quoting
fn str_show(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    match recv {
        Value::Str(_) => Ok(recv),
        other => Err(RuntimeError::type_error("string", other.kind_name())),
    }
}

// ---- symbol ----

/// `:name`, except the boolean sentinels render bare
fn sym_show(interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    let sym = expect_sym(&recv)?;
    let text = if sym == interp.syms.true_ || sym == interp.syms.false_ {
        interp.interner.name(sym).to_string()
    } else {
        format!(":{}", interp.interner.name(sym))
    };
    Ok(Value::str(text))
}

fn sym_name(interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    let sym = expect_sym(&recv)?;
    Ok(Value::str(interp.interner.name(sym).to_string()))
}

// ---- list ----

fn expect_list(value: &Value) -> InterpResult<&Rc<RefCell<VecDeque<Value>>>> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(RuntimeError::type_error("list", other.kind_name())),
    }
}

fn list_show(interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    let items: Vec<Value> = expect_list(&recv)?.borrow().iter().cloned().collect();
    let mut out = String::from("[");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&interp.show(item)?);
    }
    out.push(']');
    Ok(Value::str(out))
}

fn list_len(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    Ok(Value::Int(expect_list(&recv)?.borrow().len() as i64))
}

fn list_push(_interp: &mut Interp, recv: Value, args: &[Value]) -> InterpResult<Value> {
    expect_list(&recv)?.borrow_mut().push_back(args[0].clone());
    Ok(recv)
}

fn list_pop(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    expect_list(&recv)?
        .borrow_mut()
        .pop_back()
        .ok_or_else(|| RuntimeError::index_out_of_bounds(-1, 0))
}

fn list_push_front(_interp: &mut Interp, recv: Value, args: &[Value]) -> InterpResult<Value> {
    expect_list(&recv)?.borrow_mut().push_front(args[0].clone());
    Ok(recv)
}

fn list_pop_front(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    expect_list(&recv)?
        .borrow_mut()
        .pop_front()
        .ok_or_else(|| RuntimeError::index_out_of_bounds(0, 0))
}

fn list_get_item(_interp: &mut Interp, recv: Value, args: &[Value]) -> InterpResult<Value> {
    let items = expect_list(&recv)?.borrow();
    let index = expect_int(&args[0])?;
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i).cloned())
        .ok_or_else(|| RuntimeError::index_out_of_bounds(index, items.len()))
}

fn list_set_item(_interp: &mut Interp, recv: Value, args: &[Value]) -> InterpResult<Value> {
    let items = expect_list(&recv)?;
    let index = expect_int(&args[0])?;
    let mut items = items.borrow_mut();
    let len = items.len();
    let slot = usize::try_from(index)
        .ok()
        .and_then(|i| items.get_mut(i))
        .ok_or_else(|| RuntimeError::index_out_of_bounds(index, len))?;
    *slot = args[1].clone();
    Ok(args[1].clone())
}

/// Iteration walks a snapshot: mutating the list mid-loop does not
/// disturb the traversal.
fn list_make_iter(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    let snapshot = expect_list(&recv)?.borrow().clone();
    Ok(Value::Iter(Rc::new(RefCell::new(IterState::Items(snapshot)))))
}

// ---- map ----

fn expect_map(
    value: &Value,
) -> InterpResult<&Rc<RefCell<std::collections::HashMap<Symbol, Value>>>> {
    match value {
        Value::Map(entries) => Ok(entries),
        other => Err(RuntimeError::type_error("map", other.kind_name())),
    }
}

fn sorted_entries(map: &Value) -> InterpResult<Vec<(Symbol, Value)>> {
    let mut entries: Vec<(Symbol, Value)> = expect_map(map)?
        .borrow()
        .iter()
        .map(|(k, v)| (*k, v.clone()))
        .collect();
    entries.sort_by_key(|(k, _)| *k);
    Ok(entries)
}

fn map_show(interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    let entries = sorted_entries(&recv)?;
    let mut out = String::from("{");
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let shown = interp.show(value)?;
        out.push_str(interp.interner.name(*key));
        out.push_str(": ");
        out.push_str(&shown);
    }
    out.push('}');
    Ok(Value::str(out))
}

fn map_len(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    Ok(Value::Int(expect_map(&recv)?.borrow().len() as i64))
}

fn map_get_item(interp: &mut Interp, recv: Value, args: &[Value]) -> InterpResult<Value> {
    let key = expect_sym(&args[0])?;
    match expect_map(&recv)?.borrow().get(&key) {
        Some(value) => Ok(value.clone()),
        None => Err(RuntimeError::key_missing(interp.interner.name(key))),
    }
}

fn map_set_item(_interp: &mut Interp, recv: Value, args: &[Value]) -> InterpResult<Value> {
    let key = expect_sym(&args[0])?;
    expect_map(&recv)?.borrow_mut().insert(key, args[1].clone());
    Ok(args[1].clone())
}

fn map_keys(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    let keys: Vec<Value> = sorted_entries(&recv)?
        .into_iter()
        .map(|(k, _)| Value::Sym(k))
        .collect();
    Ok(Value::list(keys))
}

fn map_has(interp: &mut Interp, recv: Value, args: &[Value]) -> InterpResult<Value> {
    let key = expect_sym(&args[0])?;
    let present = expect_map(&recv)?.borrow().contains_key(&key);
    Ok(interp.bool_value(present))
}

/// Maps iterate as `[key, value]` pairs in key id order
fn map_make_iter(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    let pairs: VecDeque<Value> = sorted_entries(&recv)?
        .into_iter()
        .map(|(k, v)| Value::list(vec![Value::Sym(k), v]))
        .collect();
    Ok(Value::Iter(Rc::new(RefCell::new(IterState::Items(pairs)))))
}

// ---- range ----

fn expect_range(value: &Value) -> InterpResult<&Rc<super::value::RangeVal>> {
    match value {
        Value::Range(range) => Ok(range),
        other => Err(RuntimeError::type_error("range", other.kind_name())),
    }
}

fn range_show(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    let range = expect_range(&recv)?;
    let dots = if range.inclusive { "..=" } else { ".." };
    Ok(Value::str(format!("{}{dots}{}", range.start, range.end)))
}

fn range_len(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    Ok(Value::Int(expect_range(&recv)?.len()))
}

fn range_start(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    Ok(Value::Int(expect_range(&recv)?.start))
}

fn range_end(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    Ok(Value::Int(expect_range(&recv)?.end))
}

fn range_make_iter(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    let range = expect_range(&recv)?;
    Ok(Value::Iter(Rc::new(RefCell::new(IterState::Span {
        next: range.start,
        end: range.end,
        inclusive: range.inclusive,
    }))))
}

// ---- iter ----

fn iter_next(interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    let Value::Iter(state) = &recv else {
        return Err(RuntimeError::type_error("iter", recv.kind_name()));
    };
    let item = state.borrow_mut().next();
    Ok(interp.iter_step(item))
}

// ---- module ----

fn module_get_member(interp: &mut Interp, recv: Value, args: &[Value]) -> InterpResult<Value> {
    let name = expect_sym(&args[0])?;
    let Value::Module(module) = &recv else {
        return Err(RuntimeError::type_error("module", recv.kind_name()));
    };
    match module.scope.borrow().get(name) {
        Some(value) => Ok(value),
        None => {
            let module_name = interp.interner.name(module.name).to_string();
            let member = interp.interner.name(name).to_string();
            Err(RuntimeError::new(
                super::error::ErrorKind::UnboundSymbol,
                format!("module `{module_name}` does not define `{member}`"),
            ))
        }
    }
}

fn module_show(interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    let Value::Module(module) = &recv else {
        return Err(RuntimeError::type_error("module", recv.kind_name()));
    };
    Ok(Value::str(format!(
        "<module {}>",
        interp.interner.name(module.name)
    )))
}

// ---- types and callables ----

fn type_show(interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    let Value::Type(ty) = &recv else {
        return Err(RuntimeError::type_error("type", recv.kind_name()));
    };
    Ok(Value::str(interp.type_display(ty)))
}

fn callable_show(interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    let text = match &recv {
        Value::Func(f) => format!("<fn {}>", interp.interner.name(f.name)),
        Value::Unbound(m) => format!("<unbound {}>", interp.interner.name(m.name)),
        Value::Bound(b) => format!("<bound {}>", interp.interner.name(b.method.name)),
        other => return Err(RuntimeError::type_error("callable", other.kind_name())),
    };
    Ok(Value::str(text))
}

fn scope_show(_interp: &mut Interp, recv: Value, _args: &[Value]) -> InterpResult<Value> {
    match recv {
        Value::Scope(_) => Ok(Value::str("<scope>")),
        other => Err(RuntimeError::type_error("scope", other.kind_name())),
    }
}
