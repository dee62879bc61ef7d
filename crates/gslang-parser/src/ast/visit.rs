//! Traversal protocol over the AST arena.
//!
//! [`Visitor`] has one hook per node kind, every hook defaulting to a
//! no-op, so passes override only the kinds they care about and traversal
//! stays total. Dispatch is a `match` on the node's tagged payload
//! ([`accept`]); [`walk`] recurses through a node's annotations and
//! structural children in declaration order. Resolved reference targets are
//! deliberately not walked -- they are back-edges, not children.

use super::{Module, NodeId, NodeKind};

/// One hook per node kind. All hooks default to doing nothing.
#[allow(unused_variables)]
pub trait Visitor {
    fn visit_package(&mut self, module: &Module, id: NodeId) {}
    fn visit_script(&mut self, module: &Module, id: NodeId) {}
    fn visit_using(&mut self, module: &Module, id: NodeId) {}
    fn visit_table(&mut self, module: &Module, id: NodeId) {}
    fn visit_field(&mut self, module: &Module, id: NodeId) {}
    fn visit_enum(&mut self, module: &Module, id: NodeId) {}
    fn visit_enum_constant(&mut self, module: &Module, id: NodeId) {}
    fn visit_contract(&mut self, module: &Module, id: NodeId) {}
    fn visit_method(&mut self, module: &Module, id: NodeId) {}
    fn visit_param(&mut self, module: &Module, id: NodeId) {}
    fn visit_exception(&mut self, module: &Module, id: NodeId) {}
    fn visit_type_ref(&mut self, module: &Module, id: NodeId) {}
    fn visit_builtin(&mut self, module: &Module, id: NodeId) {}
    fn visit_seq(&mut self, module: &Module, id: NodeId) {}
    fn visit_annotation(&mut self, module: &Module, id: NodeId) {}
    fn visit_args(&mut self, module: &Module, id: NodeId) {}
    fn visit_named_args(&mut self, module: &Module, id: NodeId) {}
    fn visit_int(&mut self, module: &Module, id: NodeId) {}
    fn visit_float(&mut self, module: &Module, id: NodeId) {}
    fn visit_str(&mut self, module: &Module, id: NodeId) {}
    fn visit_bool(&mut self, module: &Module, id: NodeId) {}
    fn visit_constant_ref(&mut self, module: &Module, id: NodeId) {}
    fn visit_binary_op(&mut self, module: &Module, id: NodeId) {}
    fn visit_new_obj(&mut self, module: &Module, id: NodeId) {}
}

/// Dispatch a single node to the visitor hook matching its kind.
pub fn accept(module: &Module, id: NodeId, visitor: &mut dyn Visitor) {
    match &module.node(id).kind {
        NodeKind::Package(_) => visitor.visit_package(module, id),
        NodeKind::Script(_) => visitor.visit_script(module, id),
        NodeKind::Using(_) => visitor.visit_using(module, id),
        NodeKind::Table(_) => visitor.visit_table(module, id),
        NodeKind::Field(_) => visitor.visit_field(module, id),
        NodeKind::Enum(_) => visitor.visit_enum(module, id),
        NodeKind::EnumConstant(_) => visitor.visit_enum_constant(module, id),
        NodeKind::Contract(_) => visitor.visit_contract(module, id),
        NodeKind::Method(_) => visitor.visit_method(module, id),
        NodeKind::Param(_) => visitor.visit_param(module, id),
        NodeKind::Exception(_) => visitor.visit_exception(module, id),
        NodeKind::TypeRef(_) => visitor.visit_type_ref(module, id),
        NodeKind::Builtin(_) => visitor.visit_builtin(module, id),
        NodeKind::Seq(_) => visitor.visit_seq(module, id),
        NodeKind::Annotation(_) => visitor.visit_annotation(module, id),
        NodeKind::Args(_) => visitor.visit_args(module, id),
        NodeKind::NamedArgs(_) => visitor.visit_named_args(module, id),
        NodeKind::Int(_) => visitor.visit_int(module, id),
        NodeKind::Float(_) => visitor.visit_float(module, id),
        NodeKind::Str(_) => visitor.visit_str(module, id),
        NodeKind::Bool(_) => visitor.visit_bool(module, id),
        NodeKind::ConstantRef(_) => visitor.visit_constant_ref(module, id),
        NodeKind::BinaryOp(_) => visitor.visit_binary_op(module, id),
        NodeKind::NewObj(_) => visitor.visit_new_obj(module, id),
    }
}

/// Structural children of a node, annotations excluded, in declaration
/// order.
pub fn children(module: &Module, id: NodeId) -> Vec<NodeId> {
    match &module.node(id).kind {
        NodeKind::Package(p) => p.scripts.clone(),
        NodeKind::Script(s) => {
            let mut out = s.usings.clone();
            out.extend(&s.types);
            out
        }
        NodeKind::Table(t) => t.fields.clone(),
        NodeKind::Field(f) => vec![f.ty],
        NodeKind::Enum(e) => e.constants.clone(),
        NodeKind::Contract(c) => {
            let mut out = c.bases.clone();
            out.extend(&c.methods);
            out
        }
        NodeKind::Method(m) => {
            let mut out = m.returns.clone();
            out.extend(&m.params);
            out.extend(&m.exceptions);
            out
        }
        NodeKind::Param(p) => vec![p.ty],
        NodeKind::Exception(e) => vec![e.ty],
        NodeKind::Seq(s) => vec![s.component],
        NodeKind::Annotation(a) => match a.args {
            Some(args) => vec![a.ty, args],
            None => vec![a.ty],
        },
        NodeKind::Args(a) => a.items.clone(),
        NodeKind::NamedArgs(a) => a.items.iter().map(|(_, id)| *id).collect(),
        NodeKind::BinaryOp(b) => vec![b.left, b.right],
        NodeKind::NewObj(n) => vec![n.ty, n.args],
        NodeKind::Using(_)
        | NodeKind::EnumConstant(_)
        | NodeKind::TypeRef(_)
        | NodeKind::Builtin(_)
        | NodeKind::Int(_)
        | NodeKind::Float(_)
        | NodeKind::Str(_)
        | NodeKind::Bool(_)
        | NodeKind::ConstantRef(_) => Vec::new(),
    }
}

/// Visit a node, its annotations, then its structural children, depth
/// first.
pub fn walk(module: &Module, id: NodeId, visitor: &mut dyn Visitor) {
    accept(module, id, visitor);
    let annotations = module.extras(id).annotations.clone();
    for annotation in annotations {
        walk(module, annotation, visitor);
    }
    for child in children(module, id) {
        walk(module, child, visitor);
    }
}

/// Walk every package of the module, in package creation order.
pub fn walk_module(module: &Module, visitor: &mut dyn Visitor) {
    for &package in module.packages() {
        walk(module, package, visitor);
    }
}
