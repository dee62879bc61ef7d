//! The gslang linker.
//!
//! Runs the semantic passes over a parsed module, in fixed order:
//!
//! 1. Symbol-table assembly ([`symbols`]): every declared type is indexed
//!    under its fully qualified name and every `using` is resolved.
//! 2. Reference resolution ([`resolve`]): every type reference, constant
//!    reference and object literal is linked to its declaration.
//! 3. Annotation validation and migration ([`annotations`]): every
//!    annotation's usage bitmask is checked against its host, moving the
//!    annotation to the script or module when that is the legal host.
//!
//! After the passes, the contract inheritance unwinder ([`unwind`])
//! linearizes every contract's base chain. All passes are idempotent on a
//! clean module.

mod annotations;
pub mod eval;
mod resolve;
mod symbols;
mod unwind;

use gslang_common::diagnostics::DiagnosticSink;
use gslang_parser::ast::Module;

/// The fully qualified name of the annotation-usage marker table.
pub const USAGE_TABLE: &str = "gslang.annotations.Usage";

/// The fully qualified name of the annotation target flag enum.
pub const TARGET_ENUM: &str = "gslang.annotations.Target";

/// The fully qualified name of the exception marker table.
pub const EXCEPTION_TABLE: &str = "gslang.Exception";

/// Run all linker passes and the inheritance unwinder over a module.
pub fn link(module: &mut Module, sink: &mut dyn DiagnosticSink) {
    symbols::run(module, sink);
    resolve::run(module, sink);
    annotations::run(module, sink);
    unwind::run(module, sink);
}
