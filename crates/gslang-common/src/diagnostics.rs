//! Diagnostic taxonomy and reporting interfaces.
//!
//! Every error the front end can produce is a [`Diagnostic`] delivered to a
//! [`DiagnosticSink`]. Recoverable conditions are reported and compilation
//! continues; fatal conditions additionally unwind via `Result` returns in
//! the crate that detected them. The sink decides whether to accumulate,
//! print, or abort -- the compiler never prints on its own.

use std::fmt;

use serde::Serialize;

use crate::position::Span;

/// The pipeline stage a diagnostic originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Lexing,
    Parsing,
    SemanticAnalysis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Lexing => f.write_str("lexing"),
            Stage::Parsing => f.write_str("parsing"),
            Stage::SemanticAnalysis => f.write_str("semantic analysis"),
        }
    }
}

/// The specific condition a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    // ── Lexing (fatal for the current file) ────────────────────────────
    UnterminatedString,
    UnterminatedComment,
    IllegalEscape,
    IllegalHex,
    IllegalUtf8,
    NumberOutOfRange,
    UnexpectedCharacter,

    // ── Parsing ────────────────────────────────────────────────────────
    UnexpectedToken,
    DuplicateField,
    DuplicateMethod,
    DuplicateEnumConstant,
    DuplicateParam,

    // ── Linking ────────────────────────────────────────────────────────
    DuplicateType,
    TypeNotFound,
    NameConflict,
    UnknownEnumConstant,
    FieldNameMismatch,
    NewObjArity,
    InvalidAnnotationType,
    AnnotationTargetMismatch,
    InvalidContractBase,
    CircularInheritance,
    EnumValueOutOfRange,
    EvalError,

    // ── Driver ─────────────────────────────────────────────────────────
    PackageNotFound,
    AmbiguousPackage,
    CircularImport,
}

impl DiagnosticKind {
    /// Whether the condition aborts the surrounding unit of work instead of
    /// letting compilation continue.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            DiagnosticKind::UnterminatedString
                | DiagnosticKind::UnterminatedComment
                | DiagnosticKind::IllegalEscape
                | DiagnosticKind::IllegalHex
                | DiagnosticKind::IllegalUtf8
                | DiagnosticKind::NumberOutOfRange
                | DiagnosticKind::UnexpectedCharacter
                | DiagnosticKind::CircularImport
                | DiagnosticKind::CircularInheritance
                | DiagnosticKind::PackageNotFound
                | DiagnosticKind::AmbiguousPackage
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::UnterminatedString => "unterminated string literal",
            DiagnosticKind::UnterminatedComment => "unterminated block comment",
            DiagnosticKind::IllegalEscape => "illegal character escape",
            DiagnosticKind::IllegalHex => "illegal hexadecimal number",
            DiagnosticKind::IllegalUtf8 => "illegal utf-8 sequence",
            DiagnosticKind::NumberOutOfRange => "number out of range",
            DiagnosticKind::UnexpectedCharacter => "unexpected character",
            DiagnosticKind::UnexpectedToken => "unexpected token",
            DiagnosticKind::DuplicateField => "duplicate field",
            DiagnosticKind::DuplicateMethod => "duplicate method",
            DiagnosticKind::DuplicateEnumConstant => "duplicate enum constant",
            DiagnosticKind::DuplicateParam => "duplicate parameter",
            DiagnosticKind::DuplicateType => "duplicate type",
            DiagnosticKind::TypeNotFound => "type not found",
            DiagnosticKind::NameConflict => "name conflict",
            DiagnosticKind::UnknownEnumConstant => "unknown enum constant",
            DiagnosticKind::FieldNameMismatch => "no such field",
            DiagnosticKind::NewObjArity => "argument count mismatch",
            DiagnosticKind::InvalidAnnotationType => "invalid annotation type",
            DiagnosticKind::AnnotationTargetMismatch => "annotation target mismatch",
            DiagnosticKind::InvalidContractBase => "invalid contract base",
            DiagnosticKind::CircularInheritance => "circular contract inheritance",
            DiagnosticKind::EnumValueOutOfRange => "enum value out of range",
            DiagnosticKind::EvalError => "constant evaluation error",
            DiagnosticKind::PackageNotFound => "package not found",
            DiagnosticKind::AmbiguousPackage => "ambiguous package",
            DiagnosticKind::CircularImport => "circular package import",
        };
        f.write_str(name)
    }
}

/// One reported condition, with enough context to render a labelled source
/// snippet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub kind: DiagnosticKind,
    /// Name of the file the primary span points into. Empty for conditions
    /// without a source location (e.g. a missing package directory).
    pub file: String,
    pub span: Option<Span>,
    pub message: String,
    /// A secondary location, e.g. the earlier declaration of a duplicate.
    pub related: Option<(String, Span)>,
}

impl Diagnostic {
    pub fn new(
        stage: Stage,
        kind: DiagnosticKind,
        file: impl Into<String>,
        span: Option<Span>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            kind,
            file: file.into(),
            span,
            message: message.into(),
            related: None,
        }
    }

    pub fn with_related(mut self, file: impl Into<String>, span: Span) -> Self {
        self.related = Some((file.into(), span));
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(
                f,
                "{}: {}: {} at {}{}",
                self.stage, self.kind, self.message, self.file, span.start
            ),
            None => write!(f, "{}: {}: {}", self.stage, self.kind, self.message),
        }
    }
}

/// Receiver for diagnostics, the callback surface exposed to embedders.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// The standard sink: accumulates diagnostics in order of arrival.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Whether any diagnostic of the given kind was reported.
    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl DiagnosticSink for DiagnosticBag {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
