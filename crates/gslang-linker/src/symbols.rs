//! Pass 1 -- symbol-table assembly.
//!
//! Inserts every declared type into its package's and the module's type
//! index under `package.Name`, then resolves every using-import to a
//! loaded package or a single type. Re-running the pass on an already
//! indexed module is a no-op.

use gslang_common::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Stage};
use gslang_parser::ast::{Module, NodeId, NodeKind, UsingTarget};

pub(crate) fn run(module: &mut Module, sink: &mut dyn DiagnosticSink) {
    index_types(module, sink);
    resolve_usings(module, sink);
}

fn index_types(module: &mut Module, sink: &mut dyn DiagnosticSink) {
    let packages: Vec<NodeId> = module.packages().to_vec();
    for package in packages {
        let package_path = module.package(package).path.clone();
        let scripts = module.package(package).scripts.clone();
        for script in scripts {
            let file = module.script(script).file.clone();
            let types = module.script(script).types.clone();
            for ty in types {
                let name = module.name_of(ty).to_string();
                match module.package(package).types.get(&name).copied() {
                    // Already indexed under this name: re-linking is a no-op.
                    Some(existing) if existing == ty => {}
                    Some(existing) => {
                        let span = module.extras(ty).span;
                        let mut diag = Diagnostic::new(
                            Stage::SemanticAnalysis,
                            DiagnosticKind::DuplicateType,
                            file.clone(),
                            span,
                            format!("type '{package_path}.{name}' is already declared"),
                        );
                        if let Some(related) = module.extras(existing).span {
                            let related_file = file_of_type(module, package, existing)
                                .unwrap_or_else(|| file.clone());
                            diag = diag.with_related(related_file, related);
                        }
                        sink.report(diag);
                    }
                    None => {
                        let full = format!("{package_path}.{name}");
                        if let NodeKind::Package(p) = &mut module.node_mut(package).kind {
                            p.types.insert(name, ty);
                        }
                        module.types.insert(full, ty);
                    }
                }
            }
        }
    }
}

/// Find the file that declared a type, by scanning the package's scripts.
fn file_of_type(module: &Module, package: NodeId, ty: NodeId) -> Option<String> {
    for &script in &module.package(package).scripts {
        let script = module.script(script);
        if script.types.contains(&ty) {
            return Some(script.file.clone());
        }
    }
    None
}

fn resolve_usings(module: &mut Module, sink: &mut dyn DiagnosticSink) {
    let packages: Vec<NodeId> = module.packages().to_vec();
    for package in packages {
        let scripts = module.package(package).scripts.clone();
        for script in scripts {
            let file = module.script(script).file.clone();
            let usings = module.script(script).usings.clone();
            for using in usings {
                let Some(u) = module.as_using(using) else {
                    continue;
                };
                if u.target.is_some() {
                    continue;
                }
                let path = u.path.clone();

                if let Some(target) = module.package_by_path(&path) {
                    module.set_using_target(using, UsingTarget::Package(target));
                    continue;
                }
                // `using a.b.Type;` imports a single type.
                if let Some(&ty) = module.types.get(&path) {
                    module.set_using_target(using, UsingTarget::Type(ty));
                    continue;
                }
                let span = module.extras(using).span;
                sink.report(Diagnostic::new(
                    Stage::SemanticAnalysis,
                    DiagnosticKind::TypeNotFound,
                    file.clone(),
                    span,
                    format!("using '{path}' does not name a loaded package or type"),
                ));
            }
        }
    }
}
