//! Host-facing builtins
//!
//! The evaluator core stays free of I/O; the CLI and REPL call
//! [`install`] to bind the printing functions into the kernel scope,
//! where scripts and loaded modules pick them up.

use crate::interp::types::ANY_ARITY;
use crate::interp::{Interp, InterpResult, Value};
use std::rc::Rc;

/// Bind the standard free functions into the kernel scope
pub fn install(interp: &mut Interp) {
    let kernel = Rc::clone(&interp.kernel.scope);
    interp.register_native_fn(&kernel, "print", ANY_ARITY, native_print);
    interp.register_native_fn(&kernel, "println", ANY_ARITY, native_println);
    interp.register_native_fn(&kernel, "show", 1, native_show);
}

fn render_args(interp: &mut Interp, args: &[Value]) -> InterpResult<String> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(interp.show(arg)?);
    }
    Ok(parts.join(" "))
}

fn native_print(interp: &mut Interp, args: &[Value]) -> InterpResult<Value> {
    let text = render_args(interp, args)?;
    print!("{text}");
    Ok(Value::Int(0))
}

fn native_println(interp: &mut Interp, args: &[Value]) -> InterpResult<Value> {
    let text = render_args(interp, args)?;
    println!("{text}");
    Ok(Value::Int(0))
}

fn native_show(interp: &mut Interp, args: &[Value]) -> InterpResult<Value> {
    let text = interp.show(&args[0])?;
    Ok(Value::str(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::boot;

    #[test]
    fn test_show_function_renders_values() {
        let mut interp = boot();
        install(&mut interp);
        let shown = native_show(&mut interp, &[Value::list(vec![Value::Int(1)])])
            .expect("show succeeds");
        match shown {
            Value::Str(s) => assert_eq!(s.as_str(), "[1]"),
            other => panic!("expected Str, got {other:?}"),
        }
    }

    #[test]
    fn test_install_binds_into_kernel() {
        let mut interp = boot();
        install(&mut interp);
        let sym = interp.interner.intern("println");
        assert!(interp.kernel.scope.borrow().get(sym).is_some());
    }
}
