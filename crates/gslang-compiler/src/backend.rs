//! Code-generation back-end delivery.
//!
//! Back ends receive the linked module through a begin/end-script pair plus
//! one hook per type kind. Using-imports that point into the `gslang`
//! standard namespace are filtered out before delivery, and tables are
//! dispatched to the exception / annotation hooks when the matching marker
//! is attached to their extras.

use gslang_linker::{EXCEPTION_TABLE, USAGE_TABLE};
use gslang_parser::ast::{Module, NodeId, NodeKind};

/// Hook set implemented by code-generation back ends. Every hook defaults
/// to a no-op.
#[allow(unused_variables)]
pub trait Backend {
    fn begin_script(&mut self, module: &Module, script: NodeId) {}
    fn using(&mut self, module: &Module, using: NodeId) {}
    fn table(&mut self, module: &Module, table: NodeId) {}
    fn exception(&mut self, module: &Module, table: NodeId) {}
    fn annotation_table(&mut self, module: &Module, table: NodeId) {}
    fn enum_type(&mut self, module: &Module, owner: NodeId) {}
    fn contract(&mut self, module: &Module, contract: NodeId) {}
    fn end_script(&mut self, module: &Module, script: NodeId) {}
}

/// Whether a using path points into the `gslang` standard namespace.
fn is_std_using(path: &str) -> bool {
    path == "gslang" || path.starts_with("gslang.")
}

/// Deliver a linked module to a back end, script by script in
/// deterministic order.
pub fn deliver(module: &Module, backend: &mut dyn Backend) {
    for &package in module.packages() {
        for &script in &module.package(package).scripts {
            backend.begin_script(module, script);

            for &using in &module.script(script).usings {
                let Some(u) = module.as_using(using) else {
                    continue;
                };
                if !is_std_using(&u.path) {
                    backend.using(module, using);
                }
            }

            for &ty in &module.script(script).types {
                match &module.node(ty).kind {
                    NodeKind::Table(_) => {
                        if module.find_annotation(ty, EXCEPTION_TABLE).is_some() {
                            backend.exception(module, ty);
                        } else if module.find_annotation(ty, USAGE_TABLE).is_some() {
                            backend.annotation_table(module, ty);
                        } else {
                            backend.table(module, ty);
                        }
                    }
                    NodeKind::Enum(_) => backend.enum_type(module, ty),
                    NodeKind::Contract(_) => backend.contract(module, ty),
                    _ => {}
                }
            }

            backend.end_script(module, script);
        }
    }
}
