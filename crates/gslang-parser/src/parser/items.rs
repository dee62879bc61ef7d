//! Type-declaration parsing: enums, tables, structs, contracts.

use gslang_common::diagnostics::DiagnosticKind;
use gslang_common::token::TokenKind;

use crate::ast::{EnumBase, Method, NodeId, NodeKind};

use super::{PResult, Parser};

/// Which side of a method signature a parameter list fills.
#[derive(Clone, Copy, PartialEq)]
enum ParamSide {
    Inputs,
    Returns,
}

impl<'src, 'a> Parser<'src, 'a> {
    /// Parse `table Name { field* }`. A `struct` declaration is the same
    /// production plus the synthesized `@gslang.Struct` marker annotation.
    pub(crate) fn parse_table(&mut self, script: NodeId, is_struct: bool) -> PResult<()> {
        let keyword = self.next()?;
        let name = self.expect(TokenKind::Ident, "expected a table name")?;
        let table = self.module.new_table(script, name.text());
        self.flush_annotations(table);
        self.module.extras_mut(table).span = Some(keyword.span.merge(name.span));
        self.attach_comment(table);

        if is_struct {
            let ty = self
                .module
                .new_typeref(vec!["gslang".to_string(), "Struct".to_string()]);
            self.module.extras_mut(ty).span = Some(keyword.span);
            let marker = self.module.new_annotation(ty, None);
            self.module.extras_mut(marker).span = Some(keyword.span);
            self.module.extras_mut(table).annotations.push(marker);
        }

        self.expect(TokenKind::LBrace, "table body must start with '{'")?;
        let close = loop {
            self.skip_comments()?;
            while self.parse_annotation()? {}
            self.skip_comments()?;
            if self.peek()?.kind == TokenKind::RBrace {
                break self.next()?;
            }
            self.parse_field(table)?;
        };

        self.module.extras_mut(table).span = Some(keyword.span.merge(close.span));
        self.attach_comment(table);
        Ok(())
    }

    /// Parse one `type-expr IDENT ;` field of a table.
    fn parse_field(&mut self, table: NodeId) -> PResult<()> {
        let start = self.peek()?.span;
        let ty = self.parse_type_expr()?;
        let name = self.expect(TokenKind::Ident, "expected a field name")?;
        let semi = self.expect(TokenKind::Semicolon, "field must end with ';'")?;

        match self.module.new_field(table, name.text(), ty) {
            Ok(field) => {
                self.module.extras_mut(field).span = Some(start.merge(semi.span));
                self.flush_annotations(field);
                self.attach_comment(field);
            }
            Err(existing) => {
                let related = self.module.extras(existing).span;
                self.error_with_related(
                    name.span,
                    DiagnosticKind::DuplicateField,
                    format!("field '{}' is already declared", name.text()),
                    related,
                );
                self.discard_annotations();
            }
        }
        Ok(())
    }

    /// Parse `enum Name (base)? { constants }`.
    pub(crate) fn parse_enum(&mut self, script: NodeId) -> PResult<()> {
        let keyword = self.next()?;
        let name = self.expect(TokenKind::Ident, "expected an enum name")?;

        let base = if self.eat(TokenKind::LParen)? {
            let base_token = self.next()?;
            let base = match EnumBase::from_token(base_token.kind) {
                Some(base) => base,
                None => {
                    self.error(
                        base_token.span,
                        DiagnosticKind::UnexpectedToken,
                        format!(
                            "enum base must be an integer type of at most 32 bits, found {}",
                            base_token.kind
                        ),
                    );
                    EnumBase::default()
                }
            };
            self.expect(TokenKind::RParen, "enum base must end with ')'")?;
            base
        } else {
            EnumBase::default()
        };

        let owner = self.module.new_enum(script, name.text(), base);
        self.flush_annotations(owner);
        self.module.extras_mut(owner).span = Some(keyword.span.merge(name.span));
        self.attach_comment(owner);

        self.expect(TokenKind::LBrace, "enum body must start with '{'")?;
        let close = loop {
            self.skip_comments()?;
            while self.parse_annotation()? {}
            self.skip_comments()?;
            if self.peek()?.kind == TokenKind::RBrace {
                break self.next()?;
            }
            self.parse_enum_constant(owner)?;
            if !self.eat(TokenKind::Comma)? {
                break self.expect(TokenKind::RBrace, "enum body must end with '}'")?;
            }
        };

        self.module.extras_mut(owner).span = Some(keyword.span.merge(close.span));
        self.attach_comment(owner);
        Ok(())
    }

    /// Parse one enum constant with its optional `( SIGNED-INT )` value.
    fn parse_enum_constant(&mut self, owner: NodeId) -> PResult<()> {
        let name = self.expect(TokenKind::Ident, "expected an enum constant name")?;
        let mut end = name.span;

        let value = if self.eat(TokenKind::LParen)? {
            let mut negative = false;
            let sign = self.peek()?;
            if sign.kind == TokenKind::Minus || sign.kind == TokenKind::Plus {
                negative = sign.kind == TokenKind::Minus;
                self.next()?;
            }
            let number = self.expect(TokenKind::IntLiteral, "expected an enum constant value")?;
            let close = self.expect(TokenKind::RParen, "enum constant value must end with ')'")?;
            end = close.span;
            if negative {
                -number.int_value()
            } else {
                number.int_value()
            }
        } else {
            self.module.next_enum_value(owner)
        };

        match self.module.new_enum_constant(owner, name.text(), value) {
            Ok(constant) => {
                self.module.extras_mut(constant).span = Some(name.span.merge(end));
                self.flush_annotations(constant);
                self.attach_comment(constant);
            }
            Err(existing) => {
                let related = self.module.extras(existing).span;
                self.error_with_related(
                    name.span,
                    DiagnosticKind::DuplicateEnumConstant,
                    format!("enum constant '{}' is already declared", name.text()),
                    related,
                );
                self.discard_annotations();
            }
        }
        Ok(())
    }

    /// Parse `contract Name (bases)? { method* }`.
    pub(crate) fn parse_contract(&mut self, script: NodeId) -> PResult<()> {
        let keyword = self.next()?;
        let name = self.expect(TokenKind::Ident, "expected a contract name")?;
        let contract = self.module.new_contract(script, name.text());
        self.flush_annotations(contract);
        self.module.extras_mut(contract).span = Some(keyword.span.merge(name.span));
        self.attach_comment(contract);

        if self.eat(TokenKind::LParen)? {
            loop {
                let (path, span) = self.expect_name_path("expected a base contract name")?;
                let base = self.module.new_typeref(path);
                self.module.extras_mut(base).span = Some(span);
                self.module.add_contract_base(contract, base);
                if !self.eat(TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "base contract list must end with ')'")?;
        }

        self.expect(TokenKind::LBrace, "contract body must start with '{'")?;
        let close = loop {
            self.skip_comments()?;
            while self.parse_annotation()? {}
            self.skip_comments()?;
            if self.peek()?.kind == TokenKind::RBrace {
                break self.next()?;
            }
            self.parse_method(contract)?;
        };

        self.module.extras_mut(contract).span = Some(keyword.span.merge(close.span));
        self.attach_comment(contract);
        Ok(())
    }

    /// Parse one method declaration.
    fn parse_method(&mut self, contract: NodeId) -> PResult<()> {
        let start = self.peek()?.span;
        let return_ty = self.parse_type_expr()?;
        let name = self.expect(TokenKind::Ident, "expected a method name")?;

        let method = match self.module.new_method(contract, name.text()) {
            Ok(method) => method,
            Err(existing) => {
                let related = self.module.extras(existing).span;
                self.error_with_related(
                    name.span,
                    DiagnosticKind::DuplicateMethod,
                    format!("method '{}' is already declared", name.text()),
                    related,
                );
                // Parse into a detached node so the rest of the signature
                // is still consumed and checked.
                self.module.alloc(
                    name.text(),
                    NodeKind::Method(Method {
                        id: 0,
                        returns: Vec::new(),
                        params: Vec::new(),
                        exceptions: Vec::new(),
                    }),
                )
            }
        };
        self.flush_annotations(method);

        // The leading type is return slot 0 unless it is void.
        if !matches!(
            self.module.node(return_ty).kind,
            NodeKind::Builtin(crate::ast::BuiltinKind::Void)
        ) {
            self.module.new_return(method, "return_arg(0)", return_ty);
        }

        self.expect(TokenKind::LParen, "expected the method's parameter list")?;
        self.parse_params(method, ParamSide::Inputs)?;

        if self.eat(TokenKind::Arrow)? {
            self.expect(TokenKind::LParen, "expected a return value list after '->'")?;
            self.parse_params(method, ParamSide::Returns)?;
        }

        if self.eat(TokenKind::Throws)? {
            self.expect(TokenKind::LParen, "expected a throws list")?;
            loop {
                let (path, span) = self.expect_name_path("expected an exception type name")?;
                let ty = self.module.new_typeref(path);
                self.module.extras_mut(ty).span = Some(span);
                let exception = self.module.new_exception(method, ty);
                self.module.extras_mut(exception).span = Some(span);
                if !self.eat(TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "throws list must end with ')'")?;
        }

        let semi = self.expect(TokenKind::Semicolon, "method must end with ';'")?;
        self.module.extras_mut(method).span = Some(start.merge(semi.span));
        self.attach_comment(method);
        Ok(())
    }

    /// Parse a parameter list up to and including the closing parenthesis.
    fn parse_params(&mut self, method: NodeId, side: ParamSide) -> PResult<()> {
        if self.eat(TokenKind::RParen)? {
            return Ok(());
        }
        loop {
            self.skip_comments()?;
            while self.parse_annotation()? {}
            let start = self.peek()?.span;
            let ty = self.parse_type_expr()?;

            let (name, name_span) = if self.peek()?.kind == TokenKind::Ident {
                let token = self.next()?;
                (token.text().to_string(), Some(token.span))
            } else {
                let count = match (side, self.module.as_method(method)) {
                    (ParamSide::Inputs, Some(m)) => m.params.len(),
                    (ParamSide::Returns, Some(m)) => m.returns.len(),
                    _ => 0,
                };
                let tag = match side {
                    ParamSide::Inputs => format!("arg({count})"),
                    ParamSide::Returns => format!("return_arg({count})"),
                };
                (tag, None)
            };

            let param = match side {
                ParamSide::Inputs => match self.module.new_param(method, &name, ty) {
                    Ok(param) => Some(param),
                    Err(existing) => {
                        let related = self.module.extras(existing).span;
                        self.error_with_related(
                            name_span.unwrap_or(start),
                            DiagnosticKind::DuplicateParam,
                            format!("parameter '{name}' is already declared"),
                            related,
                        );
                        self.discard_annotations();
                        None
                    }
                },
                ParamSide::Returns => {
                    let duplicate = self
                        .module
                        .as_method(method)
                        .map(|m| m.returns.clone())
                        .unwrap_or_default()
                        .iter()
                        .copied()
                        .find(|&r| self.module.name_of(r) == name);
                    match duplicate {
                        Some(existing) => {
                            let related = self.module.extras(existing).span;
                            self.error_with_related(
                                name_span.unwrap_or(start),
                                DiagnosticKind::DuplicateParam,
                                format!("return value '{name}' is already declared"),
                                related,
                            );
                            self.discard_annotations();
                            None
                        }
                        None => Some(self.module.new_return(method, &name, ty)),
                    }
                }
            };

            if let Some(param) = param {
                let end = name_span.unwrap_or(start);
                self.module.extras_mut(param).span = Some(start.merge(end));
                self.flush_annotations(param);
            }

            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen, "parameter list must end with ')'")?;
        Ok(())
    }
}
