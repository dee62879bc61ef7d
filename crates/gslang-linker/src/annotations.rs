//! Pass 3 -- annotation validation and migration.
//!
//! Every annotation must be backed by a table that itself carries
//! `gslang.annotations.Usage(target-bitmask)`. The bitmask is evaluated
//! with the constant evaluator and the host node's kind is checked against
//! it, with flag values read from the loaded `gslang.annotations.Target`
//! enum. When the bitmask permits `Script` or `Module` but not the host
//! kind, the annotation is moved to the script's or module's extras -- the
//! single licensed post-parse AST mutation. Anything else is a target
//! mismatch, reported with the annotation left in place.

use gslang_common::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Stage};
use gslang_parser::ast::visit;
use gslang_parser::ast::{Module, NodeId};

use crate::eval;
use crate::{TARGET_ENUM, USAGE_TABLE};

pub(crate) fn run(module: &mut Module, sink: &mut dyn DiagnosticSink) {
    let script_flag = eval::enum_constant_value(module, TARGET_ENUM, "Script");
    let module_flag = eval::enum_constant_value(module, TARGET_ENUM, "Module");

    let packages: Vec<NodeId> = module.packages().to_vec();
    for package in packages {
        let scripts = module.package(package).scripts.clone();
        for script in scripts {
            let file = module.script(script).file.clone();
            let mut checker = Checker {
                module: &mut *module,
                sink: &mut *sink,
                script,
                file,
                script_flag,
                module_flag,
            };
            checker.check_tree(script);
        }
    }

    check_module_annotations(module, sink, module_flag);
}

struct Checker<'a> {
    module: &'a mut Module,
    sink: &'a mut dyn DiagnosticSink,
    script: NodeId,
    file: String,
    script_flag: Option<i64>,
    module_flag: Option<i64>,
}

impl<'a> Checker<'a> {
    fn check_tree(&mut self, node: NodeId) {
        let annotations = self.module.extras(node).annotations.clone();
        for annotation in annotations {
            self.check_annotation(node, annotation);
        }
        for child in visit::children(self.module, node) {
            self.check_tree(child);
        }
    }

    fn check_annotation(&mut self, host: NodeId, annotation: NodeId) {
        let Some(a) = self.module.as_annotation(annotation) else {
            return;
        };
        let ty = a.ty;
        let span = self.module.extras(annotation).span;
        let Some(backing) = self.module.typeref_target(ty) else {
            // The unresolved reference was already reported in pass 2.
            return;
        };

        if self.module.as_table(backing).is_none() {
            let name = self.module.name_of(backing).to_string();
            self.error(
                span,
                DiagnosticKind::InvalidAnnotationType,
                format!("only a table can back an annotation, '{name}' is not one"),
            );
            return;
        }

        let mask = match usage_bitmask(self.module, backing) {
            Ok(Some(mask)) => mask,
            Ok(None) => {
                let name = self.module.name_of(backing).to_string();
                self.error(
                    span,
                    DiagnosticKind::InvalidAnnotationType,
                    format!(
                        "table '{name}' is not declared as an annotation (no {USAGE_TABLE} marker)"
                    ),
                );
                return;
            }
            Err(message) => {
                self.error(span, DiagnosticKind::EvalError, message);
                return;
            }
        };

        // Permitted on the host directly?
        let host_flag = self.module.node(host).kind.target_flag_name();
        let host_bit =
            host_flag.and_then(|name| eval::enum_constant_value(self.module, TARGET_ENUM, name));
        if let Some(bit) = host_bit {
            if mask & bit != 0 {
                return;
            }
        }

        // Migrate to the most specific legal host, script before module.
        if host != self.script {
            if let Some(bit) = self.script_flag {
                if mask & bit != 0 {
                    self.module.extras_mut(host).remove_annotation(annotation);
                    self.module
                        .extras_mut(self.script)
                        .annotations
                        .push(annotation);
                    return;
                }
            }
        }
        if let Some(bit) = self.module_flag {
            if mask & bit != 0 {
                self.module.extras_mut(host).remove_annotation(annotation);
                self.module.extras.annotations.push(annotation);
                return;
            }
        }

        let annotation_name = self.module.name_of(annotation).to_string();
        let host_kind = self.module.node(host).kind.kind_name();
        self.error(
            span,
            DiagnosticKind::AnnotationTargetMismatch,
            format!("annotation '{annotation_name}' cannot be applied to a {host_kind}"),
        );
    }

    fn error(
        &mut self,
        span: Option<gslang_common::position::Span>,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) {
        self.sink.report(Diagnostic::new(
            Stage::SemanticAnalysis,
            kind,
            self.file.clone(),
            span,
            message,
        ));
    }
}

/// Annotations already migrated to the module only need the `Module` flag.
fn check_module_annotations(
    module: &mut Module,
    sink: &mut dyn DiagnosticSink,
    module_flag: Option<i64>,
) {
    let annotations = module.extras.annotations.clone();
    for annotation in annotations {
        let Some(a) = module.as_annotation(annotation) else {
            continue;
        };
        let Some(backing) = module.typeref_target(a.ty) else {
            continue;
        };
        let permitted = match (usage_bitmask(module, backing), module_flag) {
            (Ok(Some(mask)), Some(bit)) => mask & bit != 0,
            _ => false,
        };
        if !permitted {
            let name = module.name_of(annotation).to_string();
            let span = module.extras(annotation).span;
            sink.report(Diagnostic::new(
                Stage::SemanticAnalysis,
                DiagnosticKind::AnnotationTargetMismatch,
                String::new(),
                span,
                format!("annotation '{name}' cannot be applied to the module"),
            ));
        }
    }
}

/// Extract the usage bitmask of an annotation's backing table.
///
/// `Ok(None)` means the table carries no `gslang.annotations.Usage`
/// marker; `Err` carries an evaluation failure.
fn usage_bitmask(module: &Module, backing: NodeId) -> Result<Option<i64>, String> {
    let Some(usage_annotation) = module.find_annotation(backing, USAGE_TABLE) else {
        return Ok(None);
    };
    let Some(usage) = module.as_annotation(usage_annotation) else {
        return Ok(None);
    };
    let Some(usage_table) = module.typeref_target(usage.ty) else {
        return Ok(None);
    };
    let args = usage
        .args
        .ok_or_else(|| "usage marker needs a target argument".to_string())?;
    let field = module
        .find_field(usage_table, "Target")
        .ok_or_else(|| format!("{USAGE_TABLE} must declare a Target field"))?;
    let arg = eval::field_init_arg(module, args, field)
        .ok_or_else(|| "usage marker needs a Target value".to_string())?;
    eval::eval_int(module, arg).map(Some)
}
