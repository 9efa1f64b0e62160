//! Parser tests

use crate::ast::{BinOp, Expr, ListItem, Pattern, Program, UnOp};
use crate::parser::parse;

fn parse_ok(source: &str) -> Program {
    parse(source).expect("parse should succeed")
}

fn parse_fails(source: &str) -> bool {
    parse(source).is_err()
}

fn single(source: &str) -> Expr {
    let mut prog = parse_ok(source);
    assert_eq!(prog.stmts.len(), 1, "expected a single statement");
    prog.stmts.pop().expect("one statement").node
}

// ============================================
// Literals and simple expressions
// ============================================

#[test]
fn test_parse_int_literal() {
    match single("42") {
        Expr::Int(n) => assert_eq!(n, 42),
        other => panic!("expected Int, got {other:?}"),
    }
}

#[test]
fn test_parse_booleans_as_symbols() {
    match single("true") {
        Expr::Sym(s) => assert_eq!(s, "true"),
        other => panic!("expected Sym, got {other:?}"),
    }
    match single("false") {
        Expr::Sym(s) => assert_eq!(s, "false"),
        other => panic!("expected Sym, got {other:?}"),
    }
}

#[test]
fn test_parse_symbol_literal() {
    match single(":north") {
        Expr::Sym(s) => assert_eq!(s, "north"),
        other => panic!("expected Sym, got {other:?}"),
    }
}

#[test]
fn test_parse_dynamic_identifier() {
    match single("$module_path") {
        Expr::DynVar(name) => assert_eq!(name, "module_path"),
        other => panic!("expected DynVar, got {other:?}"),
    }
}

#[test]
fn test_parse_list_with_spread() {
    match single("[1, 2, *rest]") {
        Expr::ListLit(items) => {
            assert_eq!(items.len(), 3);
            assert!(matches!(items[0], ListItem::Elem(_)));
            assert!(matches!(items[2], ListItem::Spread(_)));
        }
        other => panic!("expected ListLit, got {other:?}"),
    }
}

#[test]
fn test_parse_map_literal_shorthand() {
    match single("{x: 1, y}") {
        Expr::MapLit { entries, spread } => {
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].0, "x");
            assert!(entries[0].1.is_some());
            assert_eq!(entries[1].0, "y");
            assert!(entries[1].1.is_none());
            assert!(spread.is_none());
        }
        other => panic!("expected MapLit, got {other:?}"),
    }
}

#[test]
fn test_parse_range_forms() {
    match single("1..5") {
        Expr::Range { inclusive, .. } => assert!(!inclusive),
        other => panic!("expected Range, got {other:?}"),
    }
    match single("1..=5") {
        Expr::Range { inclusive, .. } => assert!(inclusive),
        other => panic!("expected Range, got {other:?}"),
    }
}

// ============================================
// Precedence and operators
// ============================================

#[test]
fn test_mul_binds_tighter_than_add() {
    match single("1 + 2 * 3") {
        Expr::Binary { op, right, .. } => {
            assert_eq!(op, BinOp::Add);
            assert!(matches!(
                right.node,
                Expr::Binary { op: BinOp::Mul, .. }
            ));
        }
        other => panic!("expected Binary, got {other:?}"),
    }
}

#[test]
fn test_comparison_binds_tighter_than_and() {
    match single("a < b and c") {
        Expr::Binary { op, left, .. } => {
            assert_eq!(op, BinOp::And);
            assert!(matches!(left.node, Expr::Binary { op: BinOp::Lt, .. }));
        }
        other => panic!("expected Binary, got {other:?}"),
    }
}

#[test]
fn test_unary_neg_and_not() {
    match single("-x") {
        Expr::Unary { op, .. } => assert_eq!(op, UnOp::Neg),
        other => panic!("expected Unary, got {other:?}"),
    }
    match single("not done") {
        Expr::Unary { op, .. } => assert_eq!(op, UnOp::Not),
        other => panic!("expected Unary, got {other:?}"),
    }
}

#[test]
fn test_parens_override_precedence() {
    match single("(1 + 2) * 3") {
        Expr::Binary { op, left, .. } => {
            assert_eq!(op, BinOp::Mul);
            assert!(matches!(left.node, Expr::Binary { op: BinOp::Add, .. }));
        }
        other => panic!("expected Binary, got {other:?}"),
    }
}

// ============================================
// Postfix chains
// ============================================

#[test]
fn test_member_and_method_call() {
    match single("p.x") {
        Expr::Member { name, .. } => assert_eq!(name, "x"),
        other => panic!("expected Member, got {other:?}"),
    }
    match single("list.push!(3)") {
        Expr::MethodCall { name, args, .. } => {
            assert_eq!(name, "push!");
            assert_eq!(args.len(), 1);
        }
        other => panic!("expected MethodCall, got {other:?}"),
    }
}

#[test]
fn test_chained_postfix() {
    match single("grid[0].row(1)") {
        Expr::MethodCall { object, name, .. } => {
            assert_eq!(name, "row");
            assert!(matches!(object.node, Expr::Index { .. }));
        }
        other => panic!("expected MethodCall, got {other:?}"),
    }
}

// ============================================
// Assignment forms
// ============================================

#[test]
fn test_assignment_variants() {
    assert!(matches!(single("x = 1"), Expr::Assign { .. }));
    assert!(matches!(single("p.x = 1"), Expr::AssignMember { .. }));
    assert!(matches!(single("xs[0] = 1"), Expr::AssignIndex { .. }));
}

#[test]
fn test_destructuring_assignment() {
    match single("[a, b] = pair") {
        Expr::Assign { pattern, .. } => match pattern {
            Pattern::List { items, rest } => {
                assert_eq!(items.len(), 2);
                assert!(rest.is_none());
            }
            other => panic!("expected list pattern, got {other:?}"),
        },
        other => panic!("expected Assign, got {other:?}"),
    }
}

#[test]
fn test_literal_assignment_target_rejected() {
    assert!(parse_fails("3 = x"));
}

#[test]
fn test_let_with_map_pattern_default() {
    match single("let {x = 0, y} = point") {
        Expr::Let { pattern, .. } => match pattern {
            Pattern::Map { fields, .. } => {
                assert_eq!(fields.len(), 2);
                assert!(fields[0].default.is_some());
                assert!(fields[1].default.is_none());
            }
            other => panic!("expected map pattern, got {other:?}"),
        },
        other => panic!("expected Let, got {other:?}"),
    }
}

#[test]
fn test_exhaustive_map_pattern() {
    match single("let {x, y}! = point") {
        Expr::Let { pattern, .. } => match pattern {
            Pattern::Map { exhaustive, .. } => assert!(exhaustive),
            other => panic!("expected map pattern, got {other:?}"),
        },
        other => panic!("expected Let, got {other:?}"),
    }
}

// ============================================
// Functions and clauses
// ============================================

#[test]
fn test_contiguous_clauses_fold() {
    match single("fn fib(0) { 0 }\nfn fib(1) { 1 }\nfn fib(n) { fib(n - 1) + fib(n - 2) }") {
        Expr::FnDef { name, clauses } => {
            assert_eq!(name, "fib");
            assert_eq!(clauses.len(), 3);
        }
        other => panic!("expected FnDef, got {other:?}"),
    }
}

#[test]
fn test_non_contiguous_clauses_rejected() {
    let err = parse("fn f(0) { 0 }\nlet x = 1\nfn f(n) { n }").unwrap_err();
    assert!(err.message().contains("contiguous"), "got: {}", err.message());
}

#[test]
fn test_clauses_with_scattered_arities_rejected() {
    let err = parse("fn f(a) { 1 }\nfn f(a, b) { 2 }\nfn f(c) { 3 }").unwrap_err();
    assert!(
        err.message().contains("grouped by arity"),
        "got: {}",
        err.message()
    );
}

#[test]
fn test_clauses_grouped_by_arity_fold() {
    match single("fn f(0) { 0 }\nfn f(n) { n }\nfn f(a, b) { a + b }") {
        Expr::FnDef { name, clauses } => {
            assert_eq!(name, "f");
            assert_eq!(clauses.len(), 3);
        }
        other => panic!("expected FnDef, got {other:?}"),
    }
}

#[test]
fn test_lambda() {
    match single("fn(x) { x + 1 }") {
        Expr::Lambda(clause) => assert_eq!(clause.params.len(), 1),
        other => panic!("expected Lambda, got {other:?}"),
    }
}

#[test]
fn test_method_def_dotted_target() {
    match single("def Point.dist(other) { 0 }") {
        Expr::MethodDef { target, name, params, .. } => {
            assert_eq!(name, "dist");
            assert_eq!(params.len(), 1);
            assert!(matches!(target.node, Expr::Var(ref v) if v == "Point"));
        }
        other => panic!("expected MethodDef, got {other:?}"),
    }
}

#[test]
fn test_method_def_needs_dot() {
    assert!(parse_fails("def show() { 0 }"));
}

// ============================================
// Control forms
// ============================================

#[test]
fn test_if_else_if_chain() {
    match single("if a { 1 } else if b { 2 } else { 3 }") {
        Expr::If { branches, else_body } => {
            assert_eq!(branches.len(), 2);
            assert!(else_body.is_some());
        }
        other => panic!("expected If, got {other:?}"),
    }
}

#[test]
fn test_case_arms() {
    let src = r#"
        case msg {
            [:add, x, y] => x + y
            :quit => { 0 }
            _ => -1
        }
    "#;
    match single(src) {
        Expr::Case { arms, .. } => {
            assert_eq!(arms.len(), 3);
            assert!(matches!(arms[0].0, Pattern::List { .. }));
            assert!(matches!(arms[2].0, Pattern::Wildcard));
        }
        other => panic!("expected Case, got {other:?}"),
    }
}

#[test]
fn test_case_arm_after_expression_body_starting_with_bracket() {
    let src = r#"
        case msg {
            [:add, x, y] => x + y
            [:neg, x] => -x
            _ => 0
        }
    "#;
    match single(src) {
        Expr::Case { arms, .. } => {
            assert_eq!(arms.len(), 3);
            assert!(matches!(arms[0].0, Pattern::List { .. }));
            assert!(matches!(arms[1].0, Pattern::List { .. }));
        }
        other => panic!("expected Case, got {other:?}"),
    }
}

#[test]
fn test_index_must_open_on_the_same_line() {
    let prog = parse_ok("xs\n[1, 2]");
    assert_eq!(prog.stmts.len(), 2);
    assert!(matches!(prog.stmts[0].node, Expr::Var(_)));
    assert!(matches!(prog.stmts[1].node, Expr::ListLit(_)));

    match single("xs[0]") {
        Expr::Index { .. } => {}
        other => panic!("expected Index, got {other:?}"),
    }
}

#[test]
fn test_for_and_while() {
    assert!(matches!(single("for x in 1..10 { x }"), Expr::For { .. }));
    assert!(matches!(single("while ok { step() }"), Expr::While { .. }));
}

#[test]
fn test_do_block() {
    match single("do { let x = 1\n x }") {
        Expr::Block(body) => assert_eq!(body.len(), 2),
        other => panic!("expected Block, got {other:?}"),
    }
}

#[test]
fn test_return_with_and_without_value() {
    let prog = parse_ok("fn f(x) { if x { return 1 }\n return }");
    assert_eq!(prog.stmts.len(), 1);
}

// ============================================
// Declarations
// ============================================

#[test]
fn test_struct_def() {
    match single("struct Point { x, y }") {
        Expr::StructDef { name, fields } => {
            assert_eq!(name, "Point");
            assert_eq!(fields, vec!["x", "y"]);
        }
        other => panic!("expected StructDef, got {other:?}"),
    }
}

#[test]
fn test_proto_def_and_mix() {
    match single("proto Greets { fn greet() { \"hi\" } }") {
        Expr::ProtoDef { name, methods } => {
            assert_eq!(name, "Greets");
            assert_eq!(methods.len(), 1);
            assert_eq!(methods[0].0, "greet");
        }
        other => panic!("expected ProtoDef, got {other:?}"),
    }
    assert!(matches!(single("mix Greets into Point"), Expr::MixInto { .. }));
}

#[test]
fn test_use_forms() {
    match single(r#"use "lib/math""#) {
        Expr::Use { path, alias } => {
            assert_eq!(path, "lib/math");
            assert!(alias.is_none());
        }
        other => panic!("expected Use, got {other:?}"),
    }
    match single(r#"use "lib/math" as m"#) {
        Expr::Use { alias, .. } => assert_eq!(alias.as_deref(), Some("m")),
        other => panic!("expected Use, got {other:?}"),
    }
    match single(r#"use "lib/math" { sqrt, pow as p }"#) {
        Expr::UseNames { names, .. } => {
            assert_eq!(names.len(), 2);
            assert_eq!(names[1].1.as_deref(), Some("p"));
        }
        other => panic!("expected UseNames, got {other:?}"),
    }
}

// ============================================
// Errors
// ============================================

#[test]
fn test_unclosed_brace() {
    assert!(parse_fails("fn f() { 1"));
}

#[test]
fn test_error_carries_span() {
    let err = parse("let = 3").unwrap_err();
    assert!(err.span().is_some());
}

#[test]
fn test_spread_must_be_last_in_pattern() {
    // the spread in a list pattern closes the element list
    match single("let [a, *rest] = xs") {
        Expr::Let { pattern, .. } => {
            assert!(matches!(pattern, Pattern::List { rest: Some(_), .. }));
        }
        other => panic!("expected Let, got {other:?}"),
    }
}
