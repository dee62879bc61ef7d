//! Recursive-descent parser for gslang scripts.
//!
//! The parser consumes the lexer's one-token lookahead and builds a script
//! node in the module arena. It reports rather than recovers: on a
//! mismatched expectation it records the error and advances one token
//! before retrying the enclosing rule, and it never invents tree structure.
//! Fatal conditions (a lexer error, an expectation that runs into end of
//! file) unwind through [`Aborted`], the `Result`-shaped replacement for
//! exception-style unwinding out of deep recursion.
//!
//! Comments encountered between tokens are pushed onto a stack; when a node
//! is finished, the stack top transfers to the node's extras if it is
//! adjacent to the node (same line, the line above, or trailing on the
//! node's last line). Annotations accumulate in a pending list that is
//! flushed onto the next declaration; leftovers at end of file attach to
//! the script node itself.

mod exprs;
mod items;

use gslang_common::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Stage};
use gslang_common::position::Span;
use gslang_common::token::{Token, TokenKind};
use gslang_lexer::Lexer;

use crate::ast::{Comment, Module, NodeId};

/// The file could not be parsed any further.
pub(crate) struct Aborted;

pub(crate) type PResult<T> = Result<T, Aborted>;

/// Parse one source file into a script node of `module`.
///
/// Errors are delivered through `sink`. Returns `None` when the file had to
/// be abandoned before its package declaration was read; a partially
/// parsed script is still returned so callers can inspect what was built.
pub fn parse_script(
    module: &mut Module,
    file: &str,
    source: &str,
    sink: &mut dyn DiagnosticSink,
) -> Option<NodeId> {
    let mut parser = Parser {
        lexer: Lexer::new(file, source),
        module,
        sink,
        file: file.to_string(),
        script: None,
        comments: Vec::new(),
        pending: Vec::new(),
    };
    let _ = parser.run();
    parser.script
}

pub(crate) struct Parser<'src, 'a> {
    lexer: Lexer<'src>,
    pub(crate) module: &'a mut Module,
    sink: &'a mut dyn DiagnosticSink,
    file: String,
    pub(crate) script: Option<NodeId>,
    comments: Vec<Comment>,
    /// Annotations waiting for their host declaration.
    pending: Vec<NodeId>,
}

impl<'src, 'a> Parser<'src, 'a> {
    fn run(&mut self) -> PResult<()> {
        self.skip_comments()?;
        let package_token = self.expect(
            TokenKind::Package,
            "script must start with the package keyword",
        )?;
        let (path, _) = self.expect_name_path("expected the script's package name")?;
        self.expect(TokenKind::Semicolon, "package name must end with ';'")?;

        let package = self.module.ensure_package(&path.join("."));
        let script = self.module.new_script(package, &self.file);
        self.script = Some(script);
        self.module.extras_mut(script).file_path = Some(self.file.clone());

        while self.parse_using(script)? {}

        loop {
            self.skip_comments()?;
            while self.parse_annotation()? {}
            self.skip_comments()?;
            let token = self.peek()?;
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Enum => self.parse_enum(script)?,
                TokenKind::Table => self.parse_table(script, false)?,
                TokenKind::Struct => self.parse_table(script, true)?,
                TokenKind::Contract => self.parse_contract(script)?,
                _ => {
                    self.error(
                        token.span,
                        DiagnosticKind::UnexpectedToken,
                        format!("expected a type declaration, found {}", token.kind),
                    );
                    self.next()?;
                }
            }
        }

        // Unconsumed annotations belong to the script itself.
        let leftovers: Vec<NodeId> = self.pending.drain(..).collect();
        self.module
            .extras_mut(script)
            .annotations
            .extend(leftovers);

        let end = self.peek()?.span;
        self.module.extras_mut(script).span = Some(package_token.span.merge(end));
        Ok(())
    }

    /// Parse one `using a.b.c;` import. Returns false when the next token
    /// does not start one.
    fn parse_using(&mut self, script: NodeId) -> PResult<bool> {
        self.skip_comments()?;
        if self.peek()?.kind != TokenKind::Using {
            return Ok(false);
        }
        let keyword = self.next()?;
        let (path, path_span) = self.expect_name_path("expected a using name path")?;
        let path = path.join(".");

        let using = match self.module.new_using(script, &path) {
            Ok(using) => Some(using),
            Err(existing) => {
                let related = self.module.extras(existing).span;
                let mut diag = Diagnostic::new(
                    Stage::Parsing,
                    DiagnosticKind::NameConflict,
                    self.file.clone(),
                    Some(path_span),
                    format!("using alias '{}' is already defined", self.module.name_of(existing)),
                );
                if let Some(span) = related {
                    diag = diag.with_related(self.file.clone(), span);
                }
                self.sink.report(diag);
                None
            }
        };

        let semi = self.expect(TokenKind::Semicolon, "using name path must end with ';'")?;

        if let Some(using) = using {
            self.module.extras_mut(using).span = Some(keyword.span.merge(semi.span));
            self.attach_comment(using);
            // A trailing comment on the same line also belongs to the using.
            self.skip_comments()?;
            self.attach_comment(using);
        }
        Ok(true)
    }

    // ── Token access ───────────────────────────────────────────────────

    pub(crate) fn peek(&mut self) -> PResult<Token> {
        match self.lexer.peek() {
            Ok(token) => Ok(token),
            Err(diagnostic) => {
                self.sink.report(diagnostic);
                Err(Aborted)
            }
        }
    }

    pub(crate) fn next(&mut self) -> PResult<Token> {
        match self.lexer.next() {
            Ok(token) => Ok(token),
            Err(diagnostic) => {
                self.sink.report(diagnostic);
                Err(Aborted)
            }
        }
    }

    /// Consume tokens until one of the expected kind appears. Every skipped
    /// token is reported; running into end of file aborts the script.
    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        loop {
            let token = self.next()?;
            if token.kind == kind {
                return Ok(token);
            }
            self.error(
                token.span,
                DiagnosticKind::UnexpectedToken,
                format!("{what}, found {}", token.kind),
            );
            if token.kind == TokenKind::Eof {
                return Err(Aborted);
            }
        }
    }

    /// Consume the next token if it matches, without reporting otherwise.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> PResult<bool> {
        if self.peek()?.kind == kind {
            self.next()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub(crate) fn error(&mut self, span: Span, kind: DiagnosticKind, message: impl Into<String>) {
        self.sink.report(Diagnostic::new(
            Stage::Parsing,
            kind,
            self.file.clone(),
            Some(span),
            message,
        ));
    }

    pub(crate) fn error_with_related(
        &mut self,
        span: Span,
        kind: DiagnosticKind,
        message: impl Into<String>,
        related: Option<Span>,
    ) {
        let mut diag = Diagnostic::new(
            Stage::Parsing,
            kind,
            self.file.clone(),
            Some(span),
            message,
        );
        if let Some(related) = related {
            diag = diag.with_related(self.file.clone(), related);
        }
        self.sink.report(diag);
    }

    // ── Comments ───────────────────────────────────────────────────────

    /// Drain comment tokens onto the comment stack, chaining adjacent
    /// comments into one.
    pub(crate) fn skip_comments(&mut self) -> PResult<()> {
        while self.peek()?.kind == TokenKind::Comment {
            let token = self.next()?;
            let text = token.text().to_string();
            if let Some(top) = self.comments.last_mut() {
                if top.span.end.line + 1 == token.span.start.line {
                    top.append(&text, token.span);
                    continue;
                }
            }
            self.comments.push(Comment::new(text, token.span));
        }
        Ok(())
    }

    /// Transfer the stack-top comment to a node if it is adjacent to it.
    pub(crate) fn attach_comment(&mut self, node: NodeId) {
        let Some(node_span) = self.module.extras(node).span else {
            return;
        };
        let Some(comment) = self.comments.last() else {
            return;
        };
        let adjacent = node_span.start.line == comment.span.end.line
            || node_span.start.line == comment.span.end.line + 1
            || node_span.end.line == comment.span.start.line;
        if adjacent && self.module.extras(node).comment.is_none() {
            let comment = self.comments.pop().unwrap();
            self.module.extras_mut(node).comment = Some(comment);
        }
    }

    // ── Annotations ────────────────────────────────────────────────────

    pub(crate) fn push_pending_annotation(&mut self, annotation: NodeId) {
        self.pending.push(annotation);
    }

    /// Flush pending annotations onto a freshly created declaration. A
    /// leading comment that attached to the first annotation follows it to
    /// the declaration itself.
    pub(crate) fn flush_annotations(&mut self, node: NodeId) {
        let pending: Vec<NodeId> = self.pending.drain(..).collect();
        if self.module.extras(node).comment.is_none() {
            if let Some(&first) = pending.first() {
                if let Some(comment) = self.module.extras_mut(first).comment.take() {
                    self.module.extras_mut(node).comment = Some(comment);
                }
            }
        }
        self.module.extras_mut(node).annotations.extend(pending);
    }

    /// Drop pending annotations, used when their host declaration turned
    /// out to be a duplicate.
    pub(crate) fn discard_annotations(&mut self) {
        self.pending.clear();
    }
}
