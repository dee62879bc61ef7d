//! Pass 2 -- reference resolution.
//!
//! Walks every script and links type references, constant references and
//! object literals to their declarations. The name-path length selects the
//! lookup rule: one segment resolves in the package-local index (a package
//! alias with the same name is a conflict, a type-import alias resolves),
//! two segments resolve as `(package-alias, type)` and fall back to
//! `(local enum, constant)`, three segments resolve as `(package-alias,
//! enum, constant)`. The pass also range-checks enum constant values
//! against the declared base profile.

use gslang_common::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Stage};
use gslang_common::position::Span;
use gslang_parser::ast::visit;
use gslang_parser::ast::{Module, NodeId, NodeKind, UsingTarget};

pub(crate) fn run(module: &mut Module, sink: &mut dyn DiagnosticSink) {
    let packages: Vec<NodeId> = module.packages().to_vec();
    for package in packages {
        let scripts = module.package(package).scripts.clone();
        for script in scripts {
            let file = module.script(script).file.clone();
            let mut resolver = Resolver {
                module: &mut *module,
                sink: &mut *sink,
                package,
                script,
                file,
            };
            resolver.resolve_node(script);
        }
    }
}

struct Resolver<'a> {
    module: &'a mut Module,
    sink: &'a mut dyn DiagnosticSink,
    package: NodeId,
    script: NodeId,
    file: String,
}

impl<'a> Resolver<'a> {
    /// Resolve a node's annotations, its children, then the node itself.
    fn resolve_node(&mut self, id: NodeId) {
        let annotations = self.module.extras(id).annotations.clone();
        for annotation in annotations {
            self.resolve_node(annotation);
        }
        for child in visit::children(self.module, id) {
            self.resolve_node(child);
        }
        let is_typeref = matches!(self.module.node(id).kind, NodeKind::TypeRef(_));
        let is_constant_ref = matches!(self.module.node(id).kind, NodeKind::ConstantRef(_));
        let is_new_obj = matches!(self.module.node(id).kind, NodeKind::NewObj(_));
        let is_enum = matches!(self.module.node(id).kind, NodeKind::Enum(_));
        if is_typeref {
            self.resolve_typeref(id);
        } else if is_constant_ref {
            self.resolve_constant_ref(id);
        } else if is_new_obj {
            self.check_new_obj(id);
        } else if is_enum {
            self.check_enum_ranges(id);
        }
    }

    // ── Type references ────────────────────────────────────────────────

    fn resolve_typeref(&mut self, id: NodeId) {
        let r = match self.module.as_typeref(id) {
            Some(r) if r.target.is_none() => r,
            _ => return,
        };
        let path = r.name_path.clone();
        let span = self.module.extras(id).span;

        let target = match path.len() {
            1 => self.lookup_single(&path[0], span),
            2 => self.lookup_pair(&path[0], &path[1], span),
            3 => self.lookup_triple(&path[0], &path[1], &path[2], span),
            _ => None,
        };

        match target {
            Some(target) => self.module.set_typeref_target(id, target),
            None => self.error(
                span,
                DiagnosticKind::TypeNotFound,
                format!("unknown type '{}'", path.join(".")),
            ),
        }
    }

    /// Length-1 rule: a package alias with the same name is a conflict, a
    /// type-import alias resolves, otherwise the package-local index.
    fn lookup_single(&mut self, name: &str, span: Option<Span>) -> Option<NodeId> {
        if let Some(using) = self.alias(name) {
            match self.module.as_using(using).and_then(|u| u.target) {
                Some(UsingTarget::Type(ty)) => return Some(ty),
                _ => {
                    let related = self.module.extras(using).span;
                    let mut diag = Diagnostic::new(
                        Stage::SemanticAnalysis,
                        DiagnosticKind::NameConflict,
                        self.file.clone(),
                        span,
                        format!("type name '{name}' conflicts with an import alias"),
                    );
                    if let Some(related) = related {
                        diag = diag.with_related(self.file.clone(), related);
                    }
                    self.sink.report(diag);
                    return None;
                }
            }
        }
        self.local_type(name)
    }

    /// Length-2 rule: `(package-alias, type)`, else `(local enum,
    /// constant)`. The alias shadows a local type of the same name.
    fn lookup_pair(&mut self, first: &str, second: &str, span: Option<Span>) -> Option<NodeId> {
        if let Some(using) = self.alias(first) {
            if let Some(UsingTarget::Package(pkg)) =
                self.module.as_using(using).and_then(|u| u.target)
            {
                return self.module.package(pkg).types.get(second).copied();
            }
            return None;
        }
        let owner = self.local_type(first)?;
        if self.module.as_enum(owner).is_some() {
            match self.module.find_enum_constant(owner, second) {
                Some(constant) => Some(constant),
                None => {
                    self.error(
                        span,
                        DiagnosticKind::UnknownEnumConstant,
                        format!("enum '{first}' has no constant '{second}'"),
                    );
                    None
                }
            }
        } else {
            None
        }
    }

    /// Length-3 rule: `(package-alias, enum, constant)`.
    fn lookup_triple(
        &mut self,
        first: &str,
        second: &str,
        third: &str,
        span: Option<Span>,
    ) -> Option<NodeId> {
        let using = self.alias(first)?;
        let Some(UsingTarget::Package(pkg)) = self.module.as_using(using).and_then(|u| u.target)
        else {
            return None;
        };
        let owner = self.module.package(pkg).types.get(second).copied()?;
        if self.module.as_enum(owner).is_none() {
            return None;
        }
        match self.module.find_enum_constant(owner, third) {
            Some(constant) => Some(constant),
            None => {
                self.error(
                    span,
                    DiagnosticKind::UnknownEnumConstant,
                    format!("enum '{first}.{second}' has no constant '{third}'"),
                );
                None
            }
        }
    }

    fn alias(&self, name: &str) -> Option<NodeId> {
        self.module
            .script(self.script)
            .using_index
            .get(name)
            .copied()
    }

    fn local_type(&self, name: &str) -> Option<NodeId> {
        self.module
            .package(self.package)
            .types
            .get(name)
            .copied()
    }

    // ── Constant references ────────────────────────────────────────────

    /// A constant reference splits on its last dot into a type path and a
    /// constant name.
    fn resolve_constant_ref(&mut self, id: NodeId) {
        let (name, resolved) = match &self.module.node(id).kind {
            NodeKind::ConstantRef(r) => (r.name.clone(), r.target.is_some()),
            _ => return,
        };
        if resolved {
            return;
        }
        let span = self.module.extras(id).span;

        let Some((type_path, constant)) = name.rsplit_once('.') else {
            self.error(
                span,
                DiagnosticKind::UnknownEnumConstant,
                format!("constant reference '{name}' must name an enum constant"),
            );
            return;
        };

        let segments: Vec<&str> = type_path.split('.').collect();
        let owner = match segments.as_slice() {
            [single] => {
                if let Some(using) = self.alias(single) {
                    match self.module.as_using(using).and_then(|u| u.target) {
                        Some(UsingTarget::Type(ty)) => Some(ty),
                        _ => None,
                    }
                } else {
                    self.local_type(single)
                }
            }
            [alias, ty] => {
                let using = self.alias(alias);
                match using.and_then(|u| self.module.as_using(u).and_then(|u| u.target)) {
                    Some(UsingTarget::Package(pkg)) => {
                        self.module.package(pkg).types.get(*ty).copied()
                    }
                    _ => None,
                }
            }
            _ => None,
        };

        let Some(owner) = owner.filter(|&owner| self.module.as_enum(owner).is_some()) else {
            self.error(
                span,
                DiagnosticKind::TypeNotFound,
                format!("unknown enum '{type_path}'"),
            );
            return;
        };

        match self.module.find_enum_constant(owner, constant) {
            Some(target) => self.module.set_constant_ref_target(id, target),
            None => self.error(
                span,
                DiagnosticKind::UnknownEnumConstant,
                format!("enum '{type_path}' has no constant '{constant}'"),
            ),
        }
    }

    // ── Object literals ────────────────────────────────────────────────

    /// Validate a `Name(args)` table-instance literal: the positional
    /// argument count must match the field count, named arguments must
    /// name existing fields.
    fn check_new_obj(&mut self, id: NodeId) {
        let (ty, args) = match &self.module.node(id).kind {
            NodeKind::NewObj(obj) => (obj.ty, obj.args),
            _ => return,
        };
        let span = self.module.extras(id).span;
        let Some(target) = self.module.typeref_target(ty) else {
            // The unresolved reference was already reported.
            return;
        };
        let field_count = self.module.as_table(target).map(|t| t.fields.len());
        let table_name = self.module.name_of(target).to_string();
        let Some(field_count) = field_count else {
            self.error(
                span,
                DiagnosticKind::EvalError,
                format!("object literal type '{table_name}' is not a table"),
            );
            return;
        };

        enum Shape {
            Positional(usize),
            Named(Vec<String>),
        }
        let shape = match &self.module.node(args).kind {
            NodeKind::Args(positional) => Shape::Positional(positional.items.len()),
            NodeKind::NamedArgs(named) => {
                Shape::Named(named.items.iter().map(|(name, _)| name.clone()).collect())
            }
            _ => return,
        };

        match shape {
            Shape::Positional(given) => {
                if given != field_count {
                    self.error(
                        span,
                        DiagnosticKind::NewObjArity,
                        format!(
                            "table '{table_name}' has {field_count} fields, {given} arguments given"
                        ),
                    );
                }
            }
            Shape::Named(names) => {
                for name in names {
                    if self.module.find_field(target, &name).is_none() {
                        self.error(
                            span,
                            DiagnosticKind::FieldNameMismatch,
                            format!("table '{table_name}' has no field '{name}'"),
                        );
                    }
                }
            }
        }
    }

    // ── Enum ranges ────────────────────────────────────────────────────

    fn check_enum_ranges(&mut self, id: NodeId) {
        let (base, constants) = match self.module.as_enum(id) {
            Some(e) => (e.base, e.constants.clone()),
            None => return,
        };
        let (min, max) = base.range();
        for constant in constants {
            let value = match &self.module.node(constant).kind {
                NodeKind::EnumConstant(c) => c.value,
                _ => continue,
            };
            if value < min || value > max {
                let span = self.module.extras(constant).span;
                let name = self.module.name_of(constant).to_string();
                self.error(
                    span,
                    DiagnosticKind::EnumValueOutOfRange,
                    format!("constant '{name}' value {value} does not fit the range {min}..={max}"),
                );
            }
        }
    }

    fn error(&mut self, span: Option<Span>, kind: DiagnosticKind, message: impl Into<String>) {
        self.sink.report(Diagnostic::new(
            Stage::SemanticAnalysis,
            kind,
            self.file.clone(),
            span,
            message,
        ));
    }
}
