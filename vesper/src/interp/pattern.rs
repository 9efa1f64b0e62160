//! Structural pattern matching
//!
//! Matching never writes to a scope directly: it accumulates the bindings
//! a successful match would produce and reports success or failure. On
//! failure the caller discards the accumulator, so a half-matched `let`
//! or `case` arm leaves no trace. Map-field defaults are the one place a
//! match can run user code, and only when the key is truly absent.

use super::error::{InterpResult, RuntimeError};
use super::eval::Interp;
use super::scope::ScopeRef;
use super::symbol::Symbol;
use super::value::Value;
use crate::ast::Pattern;
use std::collections::{HashMap, VecDeque};

/// One binding produced by a successful match
#[derive(Debug, Clone)]
pub struct MatchBinding {
    pub name: Symbol,
    pub dynamic: bool,
    pub value: Value,
}

impl Interp {
    /// Match `value` against `pattern`, appending bindings to `out`.
    ///
    /// Returns `Ok(false)` on a plain mismatch; `out` may then hold
    /// partial bindings and must be discarded. `scope` is only consulted
    /// for map-field default expressions.
    pub(crate) fn match_pattern(
        &mut self,
        pattern: &Pattern,
        value: &Value,
        scope: &ScopeRef,
        out: &mut Vec<MatchBinding>,
    ) -> InterpResult<bool> {
        match pattern {
            Pattern::Wildcard => Ok(true),

            Pattern::Bind { name, dynamic } => {
                let sym = self.interner.intern(name);
                out.push(MatchBinding {
                    name: sym,
                    dynamic: *dynamic,
                    value: value.clone(),
                });
                Ok(true)
            }

            Pattern::IntLit(n) => Ok(matches!(value, Value::Int(v) if v == n)),

            Pattern::StrLit(s) => {
                Ok(matches!(value, Value::Str(v) if v.as_str() == s))
            }

            Pattern::SymLit(name) => {
                let sym = self.interner.intern(name);
                Ok(matches!(value, Value::Sym(v) if *v == sym))
            }

            Pattern::List { items, rest } => {
                let Value::List(list) = value else {
                    return Ok(false);
                };
                // Snapshot so a default expression in a nested map
                // pattern cannot shift elements mid-match.
                let elems: VecDeque<Value> = list.borrow().clone();
                match rest {
                    None if elems.len() != items.len() => return Ok(false),
                    Some(_) if elems.len() < items.len() => return Ok(false),
                    _ => {}
                }
                for (item, elem) in items.iter().zip(elems.iter()) {
                    if !self.match_pattern(item, elem, scope, out)? {
                        return Ok(false);
                    }
                }
                if let Some(rest) = rest {
                    let remainder: VecDeque<Value> =
                        elems.iter().skip(items.len()).cloned().collect();
                    if !self.match_pattern(rest, &Value::list(remainder), scope, out)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            Pattern::Map {
                fields,
                rest,
                exhaustive,
            } => {
                let Value::Map(map) = value else {
                    return Ok(false);
                };
                let entries: HashMap<Symbol, Value> = map.borrow().clone();
                let mut named: Vec<Symbol> = Vec::with_capacity(fields.len());
                for field in fields {
                    let key = self.interner.intern(&field.name);
                    named.push(key);
                    let field_value = match entries.get(&key) {
                        Some(v) => v.clone(),
                        None => match &field.default {
                            Some(default) => self.eval_value(default, scope)?,
                            None => return Ok(false),
                        },
                    };
                    if !self.match_pattern(&field.pattern, &field_value, scope, out)? {
                        return Ok(false);
                    }
                }
                let mut extra: HashMap<Symbol, Value> = entries;
                for key in &named {
                    extra.remove(key);
                }
                if let Some(rest) = rest {
                    if !self.match_pattern(rest, &Value::map(extra), scope, out)? {
                        return Ok(false);
                    }
                } else if *exhaustive && !extra.is_empty() {
                    return Ok(false);
                }
                Ok(true)
            }
        }
    }

    /// Match or fail with a pattern error; `context` names the construct
    /// for the message.
    pub(crate) fn match_or_err(
        &mut self,
        pattern: &Pattern,
        value: &Value,
        scope: &ScopeRef,
        context: &str,
    ) -> InterpResult<Vec<MatchBinding>> {
        let mut out = Vec::new();
        if self.match_pattern(pattern, value, scope, &mut out)? {
            Ok(out)
        } else {
            Err(RuntimeError::pattern_match(context))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FieldPattern;
    use crate::interp::bootstrap::boot;
    use crate::interp::scope::child_scope;

    fn bind(name: &str) -> Pattern {
        Pattern::Bind {
            name: name.into(),
            dynamic: false,
        }
    }

    #[test]
    fn test_wildcard_binds_nothing() {
        let mut interp = boot();
        let scope = child_scope(&interp.kernel.scope);
        let mut out = Vec::new();
        let ok = interp
            .match_pattern(&Pattern::Wildcard, &Value::Int(7), &scope, &mut out)
            .unwrap();
        assert!(ok);
        assert!(out.is_empty());
    }

    #[test]
    fn test_literal_patterns_test_value() {
        let mut interp = boot();
        let scope = child_scope(&interp.kernel.scope);
        let mut out = Vec::new();
        assert!(interp
            .match_pattern(&Pattern::IntLit(3), &Value::Int(3), &scope, &mut out)
            .unwrap());
        assert!(!interp
            .match_pattern(&Pattern::IntLit(3), &Value::Int(4), &scope, &mut out)
            .unwrap());
        assert!(!interp
            .match_pattern(&Pattern::IntLit(3), &Value::str("3"), &scope, &mut out)
            .unwrap());
    }

    #[test]
    fn test_symbol_literal_matches_by_identity() {
        let mut interp = boot();
        let scope = child_scope(&interp.kernel.scope);
        let ok_sym = interp.interner.intern("ok");
        let mut out = Vec::new();
        assert!(interp
            .match_pattern(
                &Pattern::SymLit("ok".into()),
                &Value::Sym(ok_sym),
                &scope,
                &mut out
            )
            .unwrap());
        assert!(!interp
            .match_pattern(
                &Pattern::SymLit("err".into()),
                &Value::Sym(ok_sym),
                &scope,
                &mut out
            )
            .unwrap());
    }

    #[test]
    fn test_list_rest_collects_remainder() {
        let mut interp = boot();
        let scope = child_scope(&interp.kernel.scope);
        let pattern = Pattern::List {
            items: vec![bind("head")],
            rest: Some(Box::new(bind("tail"))),
        };
        let value = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let mut out = Vec::new();
        assert!(interp
            .match_pattern(&pattern, &value, &scope, &mut out)
            .unwrap());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].value, Value::Int(1));
        let Value::List(tail) = &out[1].value else {
            panic!("tail should be a list");
        };
        assert_eq!(tail.borrow().len(), 2);
    }

    #[test]
    fn test_list_arity_is_exact_without_rest() {
        let mut interp = boot();
        let scope = child_scope(&interp.kernel.scope);
        let pattern = Pattern::List {
            items: vec![bind("a"), bind("b")],
            rest: None,
        };
        let short = Value::list(vec![Value::Int(1)]);
        let mut out = Vec::new();
        assert!(!interp
            .match_pattern(&pattern, &short, &scope, &mut out)
            .unwrap());
    }

    #[test]
    fn test_exhaustive_map_rejects_extras() {
        let mut interp = boot();
        let scope = child_scope(&interp.kernel.scope);
        let x = interp.interner.intern("x");
        let y = interp.interner.intern("y");
        let mut entries = HashMap::new();
        entries.insert(x, Value::Int(1));
        entries.insert(y, Value::Int(2));
        let value = Value::map(entries);

        let loose = Pattern::Map {
            fields: vec![FieldPattern {
                name: "x".into(),
                pattern: bind("x"),
                default: None,
            }],
            rest: None,
            exhaustive: false,
        };
        let strict = Pattern::Map {
            fields: vec![FieldPattern {
                name: "x".into(),
                pattern: bind("x"),
                default: None,
            }],
            rest: None,
            exhaustive: true,
        };

        let mut out = Vec::new();
        assert!(interp
            .match_pattern(&loose, &value, &scope, &mut out)
            .unwrap());
        out.clear();
        assert!(!interp
            .match_pattern(&strict, &value, &scope, &mut out)
            .unwrap());
    }

    #[test]
    fn test_map_rest_collects_unnamed_entries() {
        let mut interp = boot();
        let scope = child_scope(&interp.kernel.scope);
        let x = interp.interner.intern("x");
        let y = interp.interner.intern("y");
        let mut entries = HashMap::new();
        entries.insert(x, Value::Int(1));
        entries.insert(y, Value::Int(2));
        let value = Value::map(entries);

        let pattern = Pattern::Map {
            fields: vec![FieldPattern {
                name: "x".into(),
                pattern: bind("x"),
                default: None,
            }],
            rest: Some(Box::new(bind("others"))),
            exhaustive: false,
        };
        let mut out = Vec::new();
        assert!(interp
            .match_pattern(&pattern, &value, &scope, &mut out)
            .unwrap());
        let others = out.iter().find(|b| b.name == interp.interner.intern("others"));
        let Value::Map(rest) = &others.unwrap().value else {
            panic!("rest should be a map");
        };
        let rest = rest.borrow();
        assert_eq!(rest.len(), 1);
        assert!(rest.contains_key(&y));
    }

    #[test]
    fn test_match_or_err_reports_pattern_kind() {
        let mut interp = boot();
        let scope = child_scope(&interp.kernel.scope);
        let err = interp
            .match_or_err(&Pattern::IntLit(0), &Value::Int(1), &scope, "let")
            .unwrap_err();
        assert_eq!(err.kind, crate::interp::error::ErrorKind::PatternMatch);
    }
}
