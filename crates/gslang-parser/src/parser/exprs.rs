//! Annotation, argument-expression and type-expression parsing.

use gslang_common::diagnostics::DiagnosticKind;
use gslang_common::position::Span;
use gslang_common::token::TokenKind;

use crate::ast::{BinOp, BuiltinKind, NodeId};

use super::{Aborted, PResult, Parser};

impl<'src, 'a> Parser<'src, 'a> {
    /// Parse a dotted qualified name, returning the segments and the span
    /// covering all of them.
    pub(crate) fn expect_name_path(&mut self, what: &str) -> PResult<(Vec<String>, Span)> {
        let first = self.expect(TokenKind::Ident, what)?;
        let mut path = vec![first.text().to_string()];
        let mut span = first.span;
        while self.peek()?.kind == TokenKind::Dot {
            self.next()?;
            let segment = self.expect(TokenKind::Ident, what)?;
            path.push(segment.text().to_string());
            span = span.merge(segment.span);
        }
        Ok((path, span))
    }

    /// Parse one `@Name(args)` annotation onto the pending list. Returns
    /// false when the next token does not start an annotation.
    pub(crate) fn parse_annotation(&mut self) -> PResult<bool> {
        self.skip_comments()?;
        if self.peek()?.kind != TokenKind::At {
            return Ok(false);
        }
        let at = self.next()?;
        let (path, path_span) = self.expect_name_path("expected an annotation name")?;
        let ty = self.module.new_typeref(path);
        self.module.extras_mut(ty).span = Some(path_span);

        let args = if self.peek()?.kind == TokenKind::LParen {
            Some(self.parse_args()?)
        } else {
            None
        };

        let annotation = self.module.new_annotation(ty, args);
        let end = match args {
            Some(args) => self.module.extras(args).span.unwrap_or(path_span),
            None => path_span,
        };
        self.module.extras_mut(annotation).span = Some(at.span.merge(end));
        self.attach_comment(annotation);
        self.push_pending_annotation(annotation);
        Ok(true)
    }

    /// Parse a parenthesized argument table, positional or named.
    pub(crate) fn parse_args(&mut self) -> PResult<NodeId> {
        let open = self.expect(TokenKind::LParen, "expected '('")?;

        if self.peek()?.kind == TokenKind::RParen {
            let close = self.next()?;
            let args = self.module.new_args(Vec::new());
            self.module.extras_mut(args).span = Some(open.span.merge(close.span));
            return Ok(args);
        }

        let args = if self.peek()?.kind == TokenKind::Label {
            let mut items: Vec<(String, NodeId)> = Vec::new();
            loop {
                let label = self.expect(TokenKind::Label, "expected a named argument")?;
                let name = label.text().to_string();
                let value = self.parse_arg()?;
                if items.iter().any(|(existing, _)| existing == &name) {
                    self.error(
                        label.span,
                        DiagnosticKind::NameConflict,
                        format!("named argument '{name}' given more than once"),
                    );
                } else {
                    items.push((name, value));
                }
                if !self.eat(TokenKind::Comma)? {
                    break;
                }
            }
            self.module.new_named_args(items)
        } else {
            let mut items = Vec::new();
            loop {
                items.push(self.parse_arg()?);
                if !self.eat(TokenKind::Comma)? {
                    break;
                }
            }
            self.module.new_args(items)
        };

        let close = self.expect(TokenKind::RParen, "argument table must end with ')'")?;
        self.module.extras_mut(args).span = Some(open.span.merge(close.span));
        Ok(args)
    }

    /// Parse one argument expression: a primary optionally folded through
    /// `|` / `&` from the left.
    pub(crate) fn parse_arg(&mut self) -> PResult<NodeId> {
        let mut left = self.parse_primary_arg()?;
        loop {
            let op = match self.peek()?.kind {
                TokenKind::Pipe => BinOp::Or,
                TokenKind::Amp => BinOp::And,
                _ => break,
            };
            self.next()?;
            let right = self.parse_primary_arg()?;
            let span = match (
                self.module.extras(left).span,
                self.module.extras(right).span,
            ) {
                (Some(a), Some(b)) => Some(a.merge(b)),
                _ => None,
            };
            left = self.module.new_binary_op(op, left, right);
            self.module.extras_mut(left).span = span;
        }
        Ok(left)
    }

    fn parse_primary_arg(&mut self) -> PResult<NodeId> {
        let token = self.peek()?;
        let node = match token.kind {
            TokenKind::StringLiteral => {
                let token = self.next()?;
                self.literal(token.span, |m| m.new_str(token.text().to_string()))
            }
            TokenKind::IntLiteral => {
                let token = self.next()?;
                self.literal(token.span, |m| m.new_int(token.int_value()))
            }
            TokenKind::FloatLiteral => {
                let token = self.next()?;
                self.literal(token.span, |m| m.new_float(token.float_value()))
            }
            TokenKind::True => {
                let token = self.next()?;
                self.literal(token.span, |m| m.new_bool(true))
            }
            TokenKind::False => {
                let token = self.next()?;
                self.literal(token.span, |m| m.new_bool(false))
            }
            TokenKind::Plus | TokenKind::Minus => {
                let sign = self.next()?;
                let negative = sign.kind == TokenKind::Minus;
                let value = self.next()?;
                match value.kind {
                    TokenKind::IntLiteral => {
                        let v = if negative {
                            -value.int_value()
                        } else {
                            value.int_value()
                        };
                        self.literal(sign.span.merge(value.span), |m| m.new_int(v))
                    }
                    TokenKind::FloatLiteral => {
                        let v = if negative {
                            -value.float_value()
                        } else {
                            value.float_value()
                        };
                        self.literal(sign.span.merge(value.span), |m| m.new_float(v))
                    }
                    _ => {
                        self.error(
                            value.span,
                            DiagnosticKind::UnexpectedToken,
                            format!("unary sign must precede a number, found {}", value.kind),
                        );
                        self.literal(sign.span, |m| m.new_int(0))
                    }
                }
            }
            TokenKind::Ident => {
                let (path, span) = self.expect_name_path("expected an argument")?;
                if self.peek()?.kind == TokenKind::LParen {
                    let ty = self.module.new_typeref(path);
                    self.module.extras_mut(ty).span = Some(span);
                    let args = self.parse_args()?;
                    let obj = self.module.new_new_obj(ty, args);
                    let end = self.module.extras(args).span.unwrap_or(span);
                    self.module.extras_mut(obj).span = Some(span.merge(end));
                    obj
                } else {
                    let constant = self.module.new_constant_ref(path.join("."));
                    self.module.extras_mut(constant).span = Some(span);
                    constant
                }
            }
            _ => {
                // Not consumed: the enclosing list's delimiter handling
                // makes progress instead.
                self.error(
                    token.span,
                    DiagnosticKind::UnexpectedToken,
                    format!("expected an argument, found {}", token.kind),
                );
                self.literal(token.span, |m| m.new_int(0))
            }
        };
        Ok(node)
    }

    fn literal(
        &mut self,
        span: Span,
        build: impl FnOnce(&mut crate::ast::Module) -> NodeId,
    ) -> NodeId {
        let node = build(self.module);
        self.module.extras_mut(node).span = Some(span);
        node
    }

    /// Parse a type expression: sequence prefixes wrapping a builtin or a
    /// type reference from the outside in.
    pub(crate) fn parse_type_expr(&mut self) -> PResult<NodeId> {
        // (size, span); a negative size encodes an unbounded list.
        let mut prefixes: Vec<(i64, Span)> = Vec::new();
        while self.peek()?.kind == TokenKind::LBracket {
            let open = self.next()?;
            if self.peek()?.kind == TokenKind::IntLiteral {
                let size_token = self.next()?;
                let close = self.expect(TokenKind::RBracket, "array size must end with ']'")?;
                prefixes.push((size_token.int_value(), open.span.merge(close.span)));
            } else {
                let close = self.expect(TokenKind::RBracket, "list prefix must end with ']'")?;
                prefixes.push((-1, open.span.merge(close.span)));
            }
        }

        // Lists do not compose recursively: an unbounded list directly
        // inside another unbounded list is rejected.
        for pair in prefixes.windows(2) {
            if pair[0].0 < 0 && pair[1].0 < 0 {
                self.error(
                    pair[1].1,
                    DiagnosticKind::UnexpectedToken,
                    "a list cannot be nested directly in another list",
                );
            }
        }

        let component = loop {
            let token = self.peek()?;
            if let Some(builtin) = BuiltinKind::from_token(token.kind) {
                let token = self.next()?;
                let node = self.module.new_builtin(builtin);
                self.module.extras_mut(node).span = Some(token.span);
                break node;
            }
            if token.kind == TokenKind::Ident {
                let (path, span) = self.expect_name_path("expected a type name")?;
                let node = self.module.new_typeref(path);
                self.module.extras_mut(node).span = Some(span);
                break node;
            }
            self.error(
                token.span,
                DiagnosticKind::UnexpectedToken,
                format!("expected a type, found {}", token.kind),
            );
            if token.kind == TokenKind::Eof {
                return Err(Aborted);
            }
            self.next()?;
        };

        // The first prefix written is the outermost sequence.
        let component_span = self.module.extras(component).span;
        let mut node = component;
        for &(size, span) in prefixes.iter().rev() {
            node = self.module.new_seq(node, size);
            let full = match component_span {
                Some(c) => span.merge(c),
                None => span,
            };
            self.module.extras_mut(node).span = Some(full);
        }
        Ok(node)
    }
}
