//! Contract inheritance unwinding.
//!
//! Linearizes every contract's base chain: for `contract C(B1, ..., Bn)`
//! the flattened method table is `methods(B1) ++ ... ++ methods(Bn) ++ own
//! methods`, with ids rewritten to stay dense and unique. Bases are
//! unwound first (memoized through the `unwound` extras flag); cycles are
//! detected with an in-progress stack and abort the contracts involved.

use gslang_common::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Stage};
use gslang_parser::ast::{Module, NodeId, NodeKind};
use rustc_hash::FxHashSet;

pub(crate) fn run(module: &mut Module, sink: &mut dyn DiagnosticSink) {
    let mut contracts: Vec<(NodeId, String)> = Vec::new();
    for &package in module.packages() {
        for &script in &module.package(package).scripts {
            let file = module.script(script).file.clone();
            for &ty in &module.script(script).types {
                if module.as_contract(ty).is_some() {
                    contracts.push((ty, file.clone()));
                }
            }
        }
    }

    let mut unwinder = Unwinder {
        module,
        sink,
        failed: FxHashSet::default(),
    };
    for (contract, file) in contracts {
        unwinder.unwind(contract, &file, &mut Vec::new());
    }
}

struct Unwinder<'a> {
    module: &'a mut Module,
    sink: &'a mut dyn DiagnosticSink,
    /// Contracts abandoned because of an inheritance cycle.
    failed: FxHashSet<NodeId>,
}

impl<'a> Unwinder<'a> {
    fn unwind(&mut self, contract: NodeId, file: &str, stack: &mut Vec<NodeId>) -> bool {
        if self.module.extras(contract).unwound {
            return true;
        }
        if self.failed.contains(&contract) {
            return false;
        }
        if let Some(position) = stack.iter().position(|&c| c == contract) {
            let mut chain: Vec<&str> =
                stack[position..].iter().map(|&c| self.module.name_of(c)).collect();
            chain.push(self.module.name_of(contract));
            let chain = chain.join(" -> ");
            let span = self.module.extras(contract).span;
            self.sink.report(Diagnostic::new(
                Stage::SemanticAnalysis,
                DiagnosticKind::CircularInheritance,
                file.to_string(),
                span,
                format!("circular contract inheritance: {chain}"),
            ));
            for &c in &stack[position..] {
                self.failed.insert(c);
            }
            self.failed.insert(contract);
            return false;
        }

        stack.push(contract);
        let base_refs = self
            .module
            .as_contract(contract)
            .map(|c| c.bases.clone())
            .unwrap_or_default();

        let mut bases: Vec<NodeId> = Vec::new();
        for base_ref in base_refs {
            let Some(target) = self.module.typeref_target(base_ref) else {
                // Unresolved bases were reported in pass 2.
                continue;
            };
            if self.module.as_contract(target).is_none() {
                let span = self.module.extras(base_ref).span;
                let name = self.module.name_of(target).to_string();
                let kind = self.module.node(target).kind.kind_name();
                self.sink.report(Diagnostic::new(
                    Stage::SemanticAnalysis,
                    DiagnosticKind::InvalidContractBase,
                    file.to_string(),
                    span,
                    format!("base '{name}' is a {kind}, a contract can only extend contracts"),
                ));
                continue;
            }
            if self.unwind(target, file, stack) {
                bases.push(target);
            }
        }
        stack.pop();

        // The cycle report above may have marked this contract.
        if self.failed.contains(&contract) {
            return false;
        }

        let offset: usize = bases
            .iter()
            .map(|&b| self.module.as_contract(b).map(|c| c.methods.len()).unwrap_or(0))
            .sum();

        let own: Vec<NodeId> = self
            .module
            .as_contract(contract)
            .map(|c| c.methods.clone())
            .unwrap_or_default();

        let mut seen: Vec<String> = Vec::new();
        let mut methods: Vec<NodeId> = Vec::new();
        let mut running = 0u16;

        for base in bases {
            let inherited = self
                .module
                .as_contract(base)
                .map(|c| c.methods.clone())
                .unwrap_or_default();
            let count = inherited.len() as u16;
            for method in inherited {
                let name = self.module.name_of(method).to_string();
                if seen.contains(&name) {
                    self.report_duplicate(contract, &name, file);
                    continue;
                }
                let clone = self.module.clone_node(method);
                if let NodeKind::Method(m) = &mut self.module.node_mut(clone).kind {
                    m.id += running;
                }
                seen.push(name);
                methods.push(clone);
            }
            running += count;
        }

        for method in own {
            let name = self.module.name_of(method).to_string();
            if seen.contains(&name) {
                self.report_duplicate(contract, &name, file);
                continue;
            }
            if let NodeKind::Method(m) = &mut self.module.node_mut(method).kind {
                m.id += offset as u16;
            }
            seen.push(name);
            methods.push(method);
        }

        if let NodeKind::Contract(c) = &mut self.module.node_mut(contract).kind {
            c.methods = methods;
        }
        self.module.extras_mut(contract).unwound = true;
        true
    }

    fn report_duplicate(&mut self, contract: NodeId, method: &str, file: &str) {
        let span = self.module.extras(contract).span;
        let contract_name = self.module.name_of(contract).to_string();
        self.sink.report(Diagnostic::new(
            Stage::SemanticAnalysis,
            DiagnosticKind::DuplicateMethod,
            file.to_string(),
            span,
            format!("method '{method}' appears more than once in the flattened contract '{contract_name}'"),
        ));
    }
}
