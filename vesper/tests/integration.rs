//! End-to-end tests: source text through the lexer, parser and evaluator

use std::rc::Rc;
use vesper::interp::{boot, ErrorKind, Interp, InterpResult, Value};
use vesper::parser::parse;

/// Evaluate a program in a fresh interpreter; yields the last statement's value
fn eval_src(source: &str) -> InterpResult<Value> {
    let mut interp = boot();
    eval_in(&mut interp, source)
}

fn eval_in(interp: &mut Interp, source: &str) -> InterpResult<Value> {
    let program = parse(source).expect("program should parse");
    let toplevel = interp.toplevel_scope();
    let (value, _) = interp.run_stmts(&program.stmts, toplevel)?;
    Ok(value)
}

fn eval_int(source: &str) -> i64 {
    match eval_src(source).expect("program should run") {
        Value::Int(n) => n,
        other => panic!("expected Int, got {other:?}"),
    }
}

fn eval_shown(source: &str) -> String {
    let mut interp = boot();
    let value = eval_in(&mut interp, source).expect("program should run");
    interp.show(&value).expect("value should render")
}

fn eval_kind(source: &str) -> ErrorKind {
    match eval_src(source) {
        Err(err) => err.kind,
        Ok(value) => panic!("expected an error, got {value:?}"),
    }
}

// ============================================
// Expressions and bindings
// ============================================

#[test]
fn arithmetic_dispatches_through_int_methods() {
    assert_eq!(eval_int("2 + 3 * 4"), 14);
    assert_eq!(eval_int("(2 + 3) * 4"), 20);
    assert_eq!(eval_int("-7 % 3"), -1);
}

#[test]
fn let_bindings_widen_the_statement_list() {
    assert_eq!(eval_int("let x = 2\nlet y = x + 3\nx * y"), 10);
}

#[test]
fn destructuring_let_with_rest() {
    assert_eq!(eval_int("let [a, b, *rest] = [1, 2, 3, 4]\na + b + rest.len()"), 5);
}

#[test]
fn map_pattern_defaults_fill_missing_keys() {
    assert_eq!(eval_int("let {x, y = 10} = {x: 1}\nx + y"), 11);
}

#[test]
fn assignment_reaches_enclosing_scope() {
    let src = r#"
        let total = 0
        for n in 1..=4 {
            total = total + n
        }
        total
    "#;
    assert_eq!(eval_int(src), 10);
}

#[test]
fn unbound_name_is_an_error() {
    assert!(matches!(eval_kind("ghost + 1"), ErrorKind::UnboundSymbol));
}

// ============================================
// Functions and dispatch
// ============================================

#[test]
fn multi_clause_function_picks_first_match() {
    let src = r#"
        fn fib(0) { 0 }
        fn fib(1) { 1 }
        fn fib(n) { fib(n - 1) + fib(n - 2) }
        fib(10)
    "#;
    assert_eq!(eval_int(src), 55);
}

#[test]
fn clause_match_on_structure() {
    let src = r#"
        fn area([:rect, w, h]) { w * h }
        fn area([:square, s]) { s * s }
        area([:rect, 3, 4]) + area([:square, 5])
    "#;
    assert_eq!(eval_int(src), 37);
}

#[test]
fn lambda_closes_over_definition_scope() {
    let src = r#"
        let base = 100
        let add_base = fn(n) { n + base }
        add_base(7)
    "#;
    assert_eq!(eval_int(src), 107);
}

#[test]
fn return_unwinds_to_the_call_boundary() {
    let src = r#"
        fn find(xs, wanted) {
            for x in xs {
                if x == wanted { return 1 }
            }
            0
        }
        find([4, 5, 6], 5)
    "#;
    assert_eq!(eval_int(src), 1);
}

#[test]
fn no_matching_clause_is_a_pattern_error() {
    let src = "fn only_zero(0) { 1 }\nonly_zero(9)";
    assert!(matches!(eval_kind(src), ErrorKind::PatternMatch));
}

// ============================================
// Control forms
// ============================================

#[test]
fn if_without_else_yields_zero() {
    assert_eq!(eval_int("if false { 99 }"), 0);
}

#[test]
fn only_the_false_symbol_is_falsy() {
    assert_eq!(eval_int("if 0 { 1 } else { 2 }"), 1);
    assert_eq!(eval_int("if [] { 1 } else { 2 }"), 1);
    assert_eq!(eval_int("if false { 1 } else { 2 }"), 2);
}

#[test]
fn while_loops_until_false() {
    let src = r#"
        let n = 0
        while n < 5 { n = n + 1 }
        n
    "#;
    assert_eq!(eval_int(src), 5);
}

#[test]
fn case_takes_the_first_matching_arm() {
    let src = r#"
        fn classify(msg) {
            case msg {
                [:add, x, y] => x + y
                [:neg, x] => -x
                _ => 0
            }
        }
        classify([:add, 2, 3]) + classify([:neg, 4]) + classify(:noise)
    "#;
    assert_eq!(eval_int(src), 1);
}

#[test]
fn exhausted_case_is_an_error() {
    assert!(matches!(eval_kind("case 3 { 1 => 10 }"), ErrorKind::CaseExhausted));
}

#[test]
fn for_drives_the_iterator_protocol() {
    let src = r#"
        let seen = []
        for [k, v] in {b: 2, a: 1} {
            seen.push!(v)
        }
        seen.len()
    "#;
    assert_eq!(eval_int(src), 2);
}

// ============================================
// Equality and identity
// ============================================

#[test]
fn equality_is_structural() {
    assert_eq!(eval_int("if [1, [2]] == [1, [2]] { 1 } else { 0 }"), 1);
    assert_eq!(eval_int("if {a: 1} == {a: 2} { 1 } else { 0 }"), 0);
    assert_eq!(eval_int("if 1..5 == 1..5 { 1 } else { 0 }"), 1);
}

#[test]
fn distinct_struct_types_never_compare_equal() {
    let src = r#"
        struct Point { x, y }
        struct Size { x, y }
        if Point(1, 2) == Size(1, 2) { 1 } else { 0 }
    "#;
    assert_eq!(eval_int(src), 0);
}

#[test]
fn struct_instances_compare_by_field_values() {
    let src = r#"
        struct Point { x, y }
        if Point(1, 2) == Point(1, 2) { 1 } else { 0 }
    "#;
    assert_eq!(eval_int(src), 1);
}

// ============================================
// Structs, methods, prototypes
// ============================================

#[test]
fn struct_fields_read_and_update() {
    let src = r#"
        struct Point { x, y }
        let p = Point(3, 4)
        p.x = p.x + 10
        p.x + p.y
    "#;
    assert_eq!(eval_int(src), 17);
}

#[test]
fn undeclared_struct_field_is_rejected() {
    let src = r#"
        struct Point { x, y }
        let p = Point(1, 2)
        p.z = 3
    "#;
    assert!(matches!(eval_kind(src), ErrorKind::StructFieldViolation));
}

#[test]
fn def_installs_a_method_on_the_type() {
    let src = r#"
        struct Point { x, y }
        def Point.norm2() { this.x * this.x + this.y * this.y }
        Point(3, 4).norm2()
    "#;
    assert_eq!(eval_int(src), 25);
}

#[test]
fn mixins_never_override_existing_methods() {
    let src = r#"
        struct Point { x, y }
        def Point.tag() { 1 }
        proto Tagged {
            fn tag() { 2 }
            fn extra() { 3 }
        }
        mix Tagged into Point
        let p = Point(0, 0)
        p.tag() * 10 + p.extra()
    "#;
    assert_eq!(eval_int(src), 13);
}

#[test]
fn bound_methods_are_first_class() {
    let src = r#"
        struct Counter { n }
        def Counter.bump() { this.n = this.n + 1 }
        let c = Counter(0)
        let bump = c.bump
        bump()
        bump()
        c.n
    "#;
    assert_eq!(eval_int(src), 2);
}

#[test]
fn builtin_types_answer_type_and_methods() {
    let src = "if 3.type() == int { 1 } else { 0 }";
    assert_eq!(eval_int(src), 1);
    assert_eq!(eval_int("int.type().type() == type and 1 or 0"), 1);
}

#[test]
fn universal_methods_are_callable_on_type_objects() {
    assert_eq!(eval_int("if int.methods().len() > 0 { 1 } else { 0 }"), 1);
    assert_eq!(eval_int("if list.eq(list) { 1 } else { 0 }"), 1);
}

#[test]
fn host_can_dispatch_by_name() {
    let mut interp = boot();
    let shown = interp
        .call_method(&Value::Int(7), "show", &[])
        .expect("int answers show");
    assert!(matches!(shown, Value::Str(s) if s.as_str() == "7"));
}

// ============================================
// Dynamic scope
// ============================================

#[test]
fn dynamic_rebinding_needs_an_introduction() {
    let src = r#"
        fn f() { $depth = 1 }
        f()
    "#;
    assert!(matches!(eval_kind(src), ErrorKind::DynamicScopeViolation));
}

#[test]
fn dynamic_binding_flows_down_the_call_chain() {
    let src = r#"
        fn leaf() { $depth }
        fn mid() { leaf() }
        let $depth = 7
        mid()
    "#;
    assert_eq!(eval_int(src), 7);
}

#[test]
fn authorized_dynamic_reassignment_is_observable_after_the_call() {
    let src = r#"
        let $count = 0
        fn tick() { $count = $count + 1 }
        tick()
        tick()
        $count
    "#;
    assert_eq!(eval_int(src), 2);
}

#[test]
fn block_scoped_dynamic_binding_is_discarded() {
    let src = r#"
        fn read() { $mode }
        let $mode = 1
        do {
            let $mode = 2
        }
        read()
    "#;
    assert_eq!(eval_int(src), 1);
}

// ============================================
// Modules
// ============================================

fn write_module(dir: &std::path::Path, name: &str, body: &str) {
    std::fs::write(dir.join(format!("{name}.vsp")), body).expect("write module");
}

fn temp_module_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("vesper-it-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create module dir");
    dir
}

#[test]
fn use_binds_the_module_and_members_resolve() {
    let dir = temp_module_dir("use");
    write_module(&dir, "geometry", "let origin = 0\nfn double(n) { n * 2 }\n");

    let mut interp = boot();
    interp.add_search_path(&dir.display().to_string());
    let src = r#"
        use "geometry" as g
        g.double(20) + g.origin
    "#;
    assert!(matches!(eval_in(&mut interp, src), Ok(Value::Int(40))));
}

#[test]
fn use_names_imports_selected_bindings() {
    let dir = temp_module_dir("names");
    write_module(&dir, "mathy", "fn triple(n) { n * 3 }\nfn unused() { 0 }\n");

    let mut interp = boot();
    interp.add_search_path(&dir.display().to_string());
    let src = r#"
        use "mathy" { triple as t }
        t(5)
    "#;
    assert!(matches!(eval_in(&mut interp, src), Ok(Value::Int(15))));
}

#[test]
fn modules_load_once_and_are_cached() {
    let dir = temp_module_dir("cache");
    write_module(&dir, "counted", "let marker = []\n");

    let mut interp = boot();
    interp.add_search_path(&dir.display().to_string());
    let first = interp.load_module("counted").expect("first load");
    let second = interp.load_module("counted").expect("second load");
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn missing_module_is_an_error() {
    let mut interp = boot();
    let err = eval_in(&mut interp, r#"use "no/such/module""#).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ModuleNotFound));
}

// ============================================
// Rendering
// ============================================

#[test]
fn show_renders_collections_readably() {
    insta::assert_snapshot!(eval_shown("[1, :two, \"three\"]"), @"[1, :two, three]");
    insta::assert_snapshot!(eval_shown("{b: 2, a: 1}"), @"{b: 2, a: 1}");
    insta::assert_snapshot!(eval_shown("1..=5"), @"1..=5");
}

#[test]
fn show_renders_structs_with_field_names() {
    let src = r#"
        struct Point { x, y }
        Point(1, 2)
    "#;
    insta::assert_snapshot!(eval_shown(src), @"Point(x: 1, y: 2)");
}

#[test]
fn booleans_render_bare() {
    insta::assert_snapshot!(eval_shown("1 < 2"), @"true");
    insta::assert_snapshot!(eval_shown("2 < 1"), @"false");
}
