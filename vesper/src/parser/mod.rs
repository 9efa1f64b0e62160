//! Recursive descent parser
//!
//! The grammar is statement-oriented: a program or block body is a list
//! of statements, and `let`, `fn`, `struct`, `proto` and `use` widen the
//! scope for the statements after them. Contiguous `fn` definitions with
//! the same name are folded here into a single multi-clause function; a
//! non-contiguous repeat of the name in the same list is a clause error,
//! not a silent redefinition.

#[cfg(test)]
mod tests;

use crate::ast::{
    BinOp, Body, Expr, FieldPattern, FnClause, ListItem, Pattern, Program, Span, Spanned,
    UnOp,
};
use crate::error::{CompileError, Result};
use crate::lexer::{tokenize, Token};
use std::collections::HashMap;

/// Parse source into a program
pub fn parse(source: &str) -> Result<Program> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens, source);
    let stmts = parser.parse_stmt_list(None)?;
    Ok(Program { stmts })
}

struct Parser<'src> {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    source: &'src str,
}

impl<'src> Parser<'src> {
    fn new(tokens: Vec<(Token, Span)>, source: &'src str) -> Self {
        Parser {
            tokens,
            pos: 0,
            source,
        }
    }

    // ---- cursor ----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(t, _)| t)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, s)| *s)
            .unwrap_or(Span::new(0, 0))
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<Span> {
        if self.check(&token) {
            let span = self.current_span();
            self.pos += 1;
            Ok(span)
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Span)> {
        match self.peek() {
            Some(Token::Ident(_)) => {
                let Some((Token::Ident(name), span)) = self.advance() else {
                    unreachable!()
                };
                Ok((name, span))
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, what: &str) -> CompileError {
        let found = match self.peek() {
            Some(token) => format!("{token:?}"),
            None => "end of input".to_string(),
        };
        CompileError::parser(format!("expected {what}, found {found}"), self.current_span())
    }

    fn newline_before(&self, prev_end: usize, next_start: usize) -> bool {
        self.source
            .get(prev_end..next_start)
            .is_some_and(|gap| gap.contains('\n'))
    }

    // ---- statements ----

    /// Parse statements until `end` (or end of input), folding contiguous
    /// same-name `fn` definitions into one multi-clause function. Clauses
    /// of the same arity must stay adjacent within the definition.
    fn parse_stmt_list(&mut self, end: Option<&Token>) -> Result<Body> {
        let mut stmts: Vec<Spanned<Expr>> = Vec::new();
        let mut fn_names: HashMap<String, Span> = HashMap::new();

        loop {
            while self.eat(&Token::Semicolon) {}
            match (end, self.peek()) {
                (_, None) => break,
                (Some(end), Some(tok)) if tok == end => break,
                _ => {}
            }
            let stmt = self.parse_stmt()?;

            if let Expr::FnDef { name, clauses } = &stmt.node {
                let fold = matches!(
                    stmts.last(),
                    Some(Spanned { node: Expr::FnDef { name: prev, .. }, .. })
                        if prev == name
                );
                if fold {
                    let Some(Spanned {
                        node: Expr::FnDef { clauses: prev, .. },
                        span,
                    }) = stmts.last_mut()
                    else {
                        unreachable!()
                    };
                    for clause in clauses {
                        let arity = clause.params.len();
                        let grouped = prev
                            .last()
                            .is_some_and(|last| last.params.len() == arity)
                            || prev.iter().all(|c| c.params.len() != arity);
                        if !grouped {
                            return Err(CompileError::clause(
                                format!(
                                    "clauses of `{name}` must be grouped by arity; \
                                     a {arity}-parameter clause appeared earlier"
                                ),
                                stmt.span,
                            ));
                        }
                        prev.push(clause.clone());
                    }
                    *span = span.merge(stmt.span);
                    continue;
                }
                if let Some(first) = fn_names.get(name) {
                    return Err(CompileError::clause(
                        format!(
                            "clauses of `{name}` must be contiguous; first defined at {first}"
                        ),
                        stmt.span,
                    ));
                }
                fn_names.insert(name.clone(), stmt.span);
            }
            stmts.push(stmt);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Spanned<Expr>> {
        match self.peek() {
            Some(Token::Let) => self.parse_let(),
            Some(Token::Fn) if matches!(self.peek_ahead(1), Some(Token::Ident(_))) => {
                self.parse_fn_def()
            }
            Some(Token::Def) => self.parse_method_def(),
            Some(Token::Struct) => self.parse_struct_def(),
            Some(Token::Proto) => self.parse_proto_def(),
            Some(Token::Mix) => self.parse_mix(),
            Some(Token::Use) => self.parse_use(),
            Some(Token::Return) => self.parse_return(),
            _ => {
                let expr = self.parse_expr()?;
                if self.eat(&Token::Assign) {
                    let value = self.parse_expr()?;
                    self.make_assignment(expr, value)
                } else {
                    Ok(expr)
                }
            }
        }
    }

    fn parse_let(&mut self) -> Result<Spanned<Expr>> {
        let start = self.expect(Token::Let, "`let`")?;
        let pattern = self.parse_pattern()?;
        self.expect(Token::Assign, "`=` after the pattern of `let`")?;
        let value = self.parse_expr()?;
        let span = start.merge(value.span);
        Ok(Spanned::new(
            Expr::Let {
                pattern,
                value: Box::new(value),
            },
            span,
        ))
    }

    fn parse_fn_def(&mut self) -> Result<Spanned<Expr>> {
        let start = self.expect(Token::Fn, "`fn`")?;
        let (name, _) = self.expect_ident("function name")?;
        let params = self.parse_params()?;
        let (body, end) = self.parse_brace_body()?;
        Ok(Spanned::new(
            Expr::FnDef {
                name,
                clauses: vec![FnClause { params, body }],
            },
            start.merge(end),
        ))
    }

    /// `def Type.name(params) { body }`; the dotted chain before the last
    /// segment is the target expression.
    fn parse_method_def(&mut self) -> Result<Spanned<Expr>> {
        let start = self.expect(Token::Def, "`def`")?;
        let (first, first_span) = self.expect_ident("type name")?;
        let mut segments = vec![(first, first_span)];
        while self.eat(&Token::Dot) {
            segments.push(self.expect_ident("member name after `.`")?);
        }
        if segments.len() < 2 {
            return Err(CompileError::parser(
                "`def` needs a dotted target, as in `def Point.show()`",
                first_span,
            ));
        }
        let (name, _) = segments.pop().expect("at least two segments");
        let mut target = {
            let (head, span) = segments.remove(0);
            Spanned::new(Expr::Var(head), span)
        };
        for (segment, span) in segments {
            let merged = target.span.merge(span);
            target = Spanned::new(
                Expr::Member {
                    object: Box::new(target),
                    name: segment,
                },
                merged,
            );
        }
        let params = self.parse_params()?;
        let (body, end) = self.parse_brace_body()?;
        Ok(Spanned::new(
            Expr::MethodDef {
                target: Box::new(target),
                name,
                params,
                body,
            },
            start.merge(end),
        ))
    }

    fn parse_struct_def(&mut self) -> Result<Spanned<Expr>> {
        let start = self.expect(Token::Struct, "`struct`")?;
        let (name, _) = self.expect_ident("struct name")?;
        self.expect(Token::LBrace, "`{` after the struct name")?;
        let mut fields = Vec::new();
        while !self.check(&Token::RBrace) {
            let (field, _) = self.expect_ident("field name")?;
            fields.push(field);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let end = self.expect(Token::RBrace, "`}` closing the struct body")?;
        Ok(Spanned::new(Expr::StructDef { name, fields }, start.merge(end)))
    }

    fn parse_proto_def(&mut self) -> Result<Spanned<Expr>> {
        let start = self.expect(Token::Proto, "`proto`")?;
        let (name, _) = self.expect_ident("prototype name")?;
        self.expect(Token::LBrace, "`{` after the prototype name")?;
        let mut methods = Vec::new();
        while self.check(&Token::Fn) {
            self.expect(Token::Fn, "`fn`")?;
            let (method_name, _) = self.expect_ident("method name")?;
            let params = self.parse_params()?;
            let (body, _) = self.parse_brace_body()?;
            methods.push((method_name, FnClause { params, body }));
        }
        let end = self.expect(Token::RBrace, "`}` closing the prototype body")?;
        Ok(Spanned::new(Expr::ProtoDef { name, methods }, start.merge(end)))
    }

    fn parse_mix(&mut self) -> Result<Spanned<Expr>> {
        let start = self.expect(Token::Mix, "`mix`")?;
        let proto = self.parse_expr()?;
        self.expect(Token::Into, "`into` after the prototype")?;
        let target = self.parse_expr()?;
        let span = start.merge(target.span);
        Ok(Spanned::new(
            Expr::MixInto {
                proto: Box::new(proto),
                target: Box::new(target),
            },
            span,
        ))
    }

    fn parse_use(&mut self) -> Result<Spanned<Expr>> {
        let start = self.expect(Token::Use, "`use`")?;
        let (path, mut end) = match self.advance() {
            Some((Token::StrLit(path), span)) => (path, span),
            _ => return Err(self.unexpected("a module path string after `use`")),
        };
        if self.eat(&Token::LBrace) {
            let mut names = Vec::new();
            while !self.check(&Token::RBrace) {
                let (name, _) = self.expect_ident("imported name")?;
                let alias = if self.eat(&Token::As) {
                    Some(self.expect_ident("alias after `as`")?.0)
                } else {
                    None
                };
                names.push((name, alias));
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            end = self.expect(Token::RBrace, "`}` closing the import list")?;
            return Ok(Spanned::new(Expr::UseNames { path, names }, start.merge(end)));
        }
        let alias = if self.eat(&Token::As) {
            let (alias, alias_span) = self.expect_ident("alias after `as`")?;
            end = alias_span;
            Some(alias)
        } else {
            None
        };
        Ok(Spanned::new(Expr::Use { path, alias }, start.merge(end)))
    }

    fn parse_return(&mut self) -> Result<Spanned<Expr>> {
        let start = self.expect(Token::Return, "`return`")?;
        let stops_here = matches!(
            self.peek(),
            None | Some(Token::RBrace) | Some(Token::Semicolon)
        );
        if stops_here {
            return Ok(Spanned::new(Expr::Return(None), start));
        }
        let value = self.parse_expr()?;
        let span = start.merge(value.span);
        Ok(Spanned::new(Expr::Return(Some(Box::new(value))), span))
    }

    /// Rewrite a parsed left-hand side into the matching assignment form
    fn make_assignment(
        &mut self,
        target: Spanned<Expr>,
        value: Spanned<Expr>,
    ) -> Result<Spanned<Expr>> {
        let span = target.span.merge(value.span);
        let node = match target.node {
            Expr::Member { object, name } => Expr::AssignMember {
                object,
                name,
                value: Box::new(value),
            },
            Expr::Index { object, index } => Expr::AssignIndex {
                object,
                index,
                value: Box::new(value),
            },
            other => {
                let pattern = self.expr_to_pattern(other, target.span)?;
                if !pattern.is_assignable() {
                    return Err(CompileError::parser(
                        "assignment targets may bind or ignore, not test literals",
                        target.span,
                    ));
                }
                Expr::Assign {
                    pattern,
                    value: Box::new(value),
                }
            }
        };
        Ok(Spanned::new(node, span))
    }

    /// Reinterpret an expression as a destructuring pattern, for
    /// assignment targets parsed as expressions first.
    fn expr_to_pattern(&self, expr: Expr, span: Span) -> Result<Pattern> {
        match expr {
            Expr::Var(name) if name == "_" => Ok(Pattern::Wildcard),
            Expr::Var(name) => Ok(Pattern::Bind {
                name,
                dynamic: false,
            }),
            Expr::DynVar(name) => Ok(Pattern::Bind {
                name,
                dynamic: true,
            }),
            Expr::Int(n) => Ok(Pattern::IntLit(n)),
            Expr::Str(s) => Ok(Pattern::StrLit(s)),
            Expr::Sym(s) => Ok(Pattern::SymLit(s)),
            Expr::ListLit(items) => {
                let mut patterns = Vec::new();
                let mut rest = None;
                let count = items.len();
                for (i, item) in items.into_iter().enumerate() {
                    match item {
                        ListItem::Elem(e) => {
                            patterns.push(self.expr_to_pattern(e.node, e.span)?);
                        }
                        ListItem::Spread(e) => {
                            if i + 1 != count {
                                return Err(CompileError::parser(
                                    "a spread target must come last",
                                    e.span,
                                ));
                            }
                            rest = Some(Box::new(self.expr_to_pattern(e.node, e.span)?));
                        }
                    }
                }
                Ok(Pattern::List {
                    items: patterns,
                    rest,
                })
            }
            Expr::MapLit { entries, spread } => {
                let mut fields = Vec::new();
                for (name, value) in entries {
                    let pattern = match value {
                        Some(e) => self.expr_to_pattern(e.node, e.span)?,
                        None => Pattern::Bind {
                            name: name.clone(),
                            dynamic: false,
                        },
                    };
                    fields.push(FieldPattern {
                        name,
                        pattern,
                        default: None,
                    });
                }
                let rest = match spread {
                    Some(e) => Some(Box::new(self.expr_to_pattern(e.node, e.span)?)),
                    None => None,
                };
                Ok(Pattern::Map {
                    fields,
                    rest,
                    exhaustive: false,
                })
            }
            _ => Err(CompileError::parser("invalid assignment target", span)),
        }
    }

    // ---- patterns ----

    fn parse_pattern(&mut self) -> Result<Pattern> {
        match self.advance() {
            Some((Token::Ident(name), _)) if name == "_" => Ok(Pattern::Wildcard),
            Some((Token::Ident(name), _)) => Ok(Pattern::Bind {
                name,
                dynamic: false,
            }),
            Some((Token::DynIdent(name), _)) => Ok(Pattern::Bind {
                name,
                dynamic: true,
            }),
            Some((Token::IntLit(n), _)) => Ok(Pattern::IntLit(n)),
            Some((Token::Minus, _)) => match self.advance() {
                Some((Token::IntLit(n), _)) => Ok(Pattern::IntLit(-n)),
                _ => Err(self.unexpected("an integer after `-` in a pattern")),
            },
            Some((Token::StrLit(s), _)) => Ok(Pattern::StrLit(s)),
            Some((Token::SymbolLit(s), _)) => Ok(Pattern::SymLit(s)),
            Some((Token::True, _)) => Ok(Pattern::SymLit("true".into())),
            Some((Token::False, _)) => Ok(Pattern::SymLit("false".into())),
            Some((Token::LBracket, _)) => self.parse_list_pattern(),
            Some((Token::LBrace, _)) => self.parse_map_pattern(),
            Some(_) => {
                self.pos -= 1;
                Err(self.unexpected("a pattern"))
            }
            None => Err(self.unexpected("a pattern")),
        }
    }

    fn parse_list_pattern(&mut self) -> Result<Pattern> {
        let mut items = Vec::new();
        let mut rest = None;
        while !self.check(&Token::RBracket) {
            if self.eat(&Token::Star) {
                rest = Some(Box::new(self.parse_pattern()?));
                break;
            }
            items.push(self.parse_pattern()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBracket, "`]` closing the list pattern")?;
        Ok(Pattern::List { items, rest })
    }

    fn parse_map_pattern(&mut self) -> Result<Pattern> {
        let mut fields = Vec::new();
        let mut rest = None;
        while !self.check(&Token::RBrace) {
            if self.eat(&Token::Star) {
                rest = Some(Box::new(self.parse_pattern()?));
                break;
            }
            let (name, _) = self.expect_ident("field name in a map pattern")?;
            let pattern = if self.eat(&Token::Colon) {
                self.parse_pattern()?
            } else {
                Pattern::Bind {
                    name: name.clone(),
                    dynamic: false,
                }
            };
            let default = if self.eat(&Token::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            fields.push(FieldPattern {
                name,
                pattern,
                default,
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace, "`}` closing the map pattern")?;
        let exhaustive = self.eat(&Token::Bang);
        Ok(Pattern::Map {
            fields,
            rest,
            exhaustive,
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Pattern>> {
        self.expect(Token::LParen, "`(` opening the parameter list")?;
        let mut params = Vec::new();
        while !self.check(&Token::RParen) {
            params.push(self.parse_pattern()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen, "`)` closing the parameter list")?;
        Ok(params)
    }

    fn parse_brace_body(&mut self) -> Result<(Body, Span)> {
        self.expect(Token::LBrace, "`{` opening a body")?;
        let body = self.parse_stmt_list(Some(&Token::RBrace))?;
        let end = self.expect(Token::RBrace, "`}` closing a body")?;
        Ok((body, end))
    }

    // ---- expressions ----

    fn parse_expr(&mut self) -> Result<Spanned<Expr>> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Spanned<Expr>> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Spanned<Expr>> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::And) {
            let right = self.parse_equality()?;
            left = binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Spanned<Expr>> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinOp::Eq,
                Some(Token::NotEq) => BinOp::Ne,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Spanned<Expr>> {
        let mut left = self.parse_range_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Lte) => BinOp::Lte,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::Gte) => BinOp::Gte,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_range_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_range_expr(&mut self) -> Result<Spanned<Expr>> {
        let start = self.parse_additive()?;
        let inclusive = match self.peek() {
            Some(Token::DotDot) => false,
            Some(Token::DotDotEq) => true,
            _ => return Ok(start),
        };
        self.pos += 1;
        let end = self.parse_additive()?;
        let span = start.span.merge(end.span);
        Ok(Spanned::new(
            Expr::Range {
                start: Box::new(start),
                end: Box::new(end),
                inclusive,
            },
            span,
        ))
    }

    fn parse_additive(&mut self) -> Result<Spanned<Expr>> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Spanned<Expr>> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Spanned<Expr>> {
        let op = match self.peek() {
            Some(Token::Not) => UnOp::Not,
            Some(Token::Minus) => UnOp::Neg,
            _ => return self.parse_postfix(),
        };
        let start = self.current_span();
        self.pos += 1;
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span);
        Ok(Spanned::new(
            Expr::Unary {
                op,
                expr: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self) -> Result<Spanned<Expr>> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let (name, name_span) = self.expect_ident("member name after `.`")?;
                    if self.check(&Token::LParen) {
                        let (args, end) = self.parse_args()?;
                        let span = expr.span.merge(end);
                        expr = Spanned::new(
                            Expr::MethodCall {
                                object: Box::new(expr),
                                name,
                                args,
                            },
                            span,
                        );
                    } else {
                        let span = expr.span.merge(name_span);
                        expr = Spanned::new(
                            Expr::Member {
                                object: Box::new(expr),
                                name,
                            },
                            span,
                        );
                    }
                }
                Some(Token::LBracket) => {
                    // An index bracket must open on the same line as the
                    // expression it indexes; a `[` on a new line starts a
                    // list literal or pattern instead.
                    if self.newline_before(expr.span.end, self.current_span().start) {
                        break;
                    }
                    self.pos += 1;
                    let index = self.parse_expr()?;
                    let end = self.expect(Token::RBracket, "`]` closing the index")?;
                    let span = expr.span.merge(end);
                    expr = Spanned::new(
                        Expr::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                Some(Token::LParen) => {
                    let (args, end) = self.parse_args()?;
                    let span = expr.span.merge(end);
                    expr = Spanned::new(
                        Expr::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<(Vec<Spanned<Expr>>, Span)> {
        self.expect(Token::LParen, "`(` opening the argument list")?;
        let mut args = Vec::new();
        while !self.check(&Token::RParen) {
            args.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let end = self.expect(Token::RParen, "`)` closing the argument list")?;
        Ok((args, end))
    }

    fn parse_primary(&mut self) -> Result<Spanned<Expr>> {
        match self.peek() {
            Some(Token::IntLit(_)) => {
                let Some((Token::IntLit(n), span)) = self.advance() else {
                    unreachable!()
                };
                Ok(Spanned::new(Expr::Int(n), span))
            }
            Some(Token::StrLit(_)) => {
                let Some((Token::StrLit(s), span)) = self.advance() else {
                    unreachable!()
                };
                Ok(Spanned::new(Expr::Str(s), span))
            }
            Some(Token::SymbolLit(_)) => {
                let Some((Token::SymbolLit(s), span)) = self.advance() else {
                    unreachable!()
                };
                Ok(Spanned::new(Expr::Sym(s), span))
            }
            Some(Token::True) => {
                let span = self.current_span();
                self.pos += 1;
                Ok(Spanned::new(Expr::Sym("true".into()), span))
            }
            Some(Token::False) => {
                let span = self.current_span();
                self.pos += 1;
                Ok(Spanned::new(Expr::Sym("false".into()), span))
            }
            Some(Token::Ident(_)) => {
                let Some((Token::Ident(name), span)) = self.advance() else {
                    unreachable!()
                };
                Ok(Spanned::new(Expr::Var(name), span))
            }
            Some(Token::DynIdent(_)) => {
                let Some((Token::DynIdent(name), span)) = self.advance() else {
                    unreachable!()
                };
                Ok(Spanned::new(Expr::DynVar(name), span))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.parse_expr()?;
                self.expect(Token::RParen, "`)` closing the parenthesized expression")?;
                Ok(expr)
            }
            Some(Token::LBracket) => self.parse_list_literal(),
            Some(Token::LBrace) => self.parse_map_literal(),
            Some(Token::Fn) => self.parse_fn_expr(),
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => self.parse_while(),
            Some(Token::For) => self.parse_for(),
            Some(Token::Case) => self.parse_case(),
            Some(Token::Do) => {
                let start = self.current_span();
                self.pos += 1;
                let (body, end) = self.parse_brace_body()?;
                Ok(Spanned::new(Expr::Block(body), start.merge(end)))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_list_literal(&mut self) -> Result<Spanned<Expr>> {
        let start = self.expect(Token::LBracket, "`[`")?;
        let mut items = Vec::new();
        while !self.check(&Token::RBracket) {
            if self.eat(&Token::Star) {
                items.push(ListItem::Spread(self.parse_expr()?));
            } else {
                items.push(ListItem::Elem(self.parse_expr()?));
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let end = self.expect(Token::RBracket, "`]` closing the list")?;
        Ok(Spanned::new(Expr::ListLit(items), start.merge(end)))
    }

    fn parse_map_literal(&mut self) -> Result<Spanned<Expr>> {
        let start = self.expect(Token::LBrace, "`{`")?;
        let mut entries = Vec::new();
        let mut spread = None;
        while !self.check(&Token::RBrace) {
            if self.eat(&Token::Star) {
                spread = Some(Box::new(self.parse_expr()?));
                if !self.eat(&Token::Comma) {
                    break;
                }
                continue;
            }
            let (name, _) = self.expect_ident("key in a map literal")?;
            let value = if self.eat(&Token::Colon) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            entries.push((name, value));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let end = self.expect(Token::RBrace, "`}` closing the map")?;
        Ok(Spanned::new(
            Expr::MapLit { entries, spread },
            start.merge(end),
        ))
    }

    /// `fn name(..) { }` as an expression, or `fn(..) { }` lambda
    fn parse_fn_expr(&mut self) -> Result<Spanned<Expr>> {
        if matches!(self.peek_ahead(1), Some(Token::Ident(_))) {
            return self.parse_fn_def();
        }
        let start = self.expect(Token::Fn, "`fn`")?;
        let params = self.parse_params()?;
        let (body, end) = self.parse_brace_body()?;
        Ok(Spanned::new(
            Expr::Lambda(FnClause { params, body }),
            start.merge(end),
        ))
    }

    fn parse_if(&mut self) -> Result<Spanned<Expr>> {
        let start = self.expect(Token::If, "`if`")?;
        let mut branches = Vec::new();
        let mut else_body = None;

        let cond = self.parse_expr()?;
        let (body, mut end) = self.parse_brace_body()?;
        branches.push((cond, body));

        while self.eat(&Token::Else) {
            if self.eat(&Token::If) {
                let cond = self.parse_expr()?;
                let (body, body_end) = self.parse_brace_body()?;
                end = body_end;
                branches.push((cond, body));
            } else {
                let (body, body_end) = self.parse_brace_body()?;
                end = body_end;
                else_body = Some(body);
                break;
            }
        }
        Ok(Spanned::new(
            Expr::If {
                branches,
                else_body,
            },
            start.merge(end),
        ))
    }

    fn parse_while(&mut self) -> Result<Spanned<Expr>> {
        let start = self.expect(Token::While, "`while`")?;
        let cond = self.parse_expr()?;
        let (body, end) = self.parse_brace_body()?;
        Ok(Spanned::new(
            Expr::While {
                cond: Box::new(cond),
                body,
            },
            start.merge(end),
        ))
    }

    fn parse_for(&mut self) -> Result<Spanned<Expr>> {
        let start = self.expect(Token::For, "`for`")?;
        let pattern = self.parse_pattern()?;
        self.expect(Token::In, "`in` after the loop pattern")?;
        let iterable = self.parse_expr()?;
        let (body, end) = self.parse_brace_body()?;
        Ok(Spanned::new(
            Expr::For {
                pattern,
                iterable: Box::new(iterable),
                body,
            },
            start.merge(end),
        ))
    }

    fn parse_case(&mut self) -> Result<Spanned<Expr>> {
        let start = self.expect(Token::Case, "`case`")?;
        let subject = self.parse_expr()?;
        self.expect(Token::LBrace, "`{` opening the case arms")?;
        let mut arms = Vec::new();
        while !self.check(&Token::RBrace) {
            let pattern = self.parse_pattern()?;
            self.expect(Token::FatArrow, "`=>` after the arm pattern")?;
            let body = if self.check(&Token::LBrace) {
                self.parse_brace_body()?.0
            } else {
                vec![self.parse_expr()?]
            };
            arms.push((pattern, body));
            while self.eat(&Token::Comma) || self.eat(&Token::Semicolon) {}
        }
        let end = self.expect(Token::RBrace, "`}` closing the case arms")?;
        Ok(Spanned::new(
            Expr::Case {
                subject: Box::new(subject),
                arms,
            },
            start.merge(end),
        ))
    }
}

fn binary(op: BinOp, left: Spanned<Expr>, right: Spanned<Expr>) -> Spanned<Expr> {
    let span = left.span.merge(right.span);
    Spanned::new(
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}
