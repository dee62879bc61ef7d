//! Compile-time constant evaluation.
//!
//! Folds the restricted expression dialect allowed inside annotation
//! arguments. Integer folding accepts constant references, enum constants
//! (reached through resolved references) and bitwise `|` / `&`; anything
//! else is an evaluation error, which callers report as `EvalError` and
//! recover from with the value 0. String folding accepts string literals
//! only.

use gslang_parser::ast::{Module, NodeId, NodeKind};

/// Fold an argument expression to an integer.
pub fn eval_int(module: &Module, expr: NodeId) -> Result<i64, String> {
    match &module.node(expr).kind {
        NodeKind::EnumConstant(constant) => Ok(constant.value),
        NodeKind::ConstantRef(r) => match r.target {
            Some(target) => eval_int(module, target),
            None => Err(format!("constant reference '{}' is unresolved", r.name)),
        },
        NodeKind::TypeRef(r) => match r.target {
            Some(target) => eval_int(module, target),
            None => Err(format!(
                "type reference '{}' is unresolved",
                module.name_of(expr)
            )),
        },
        NodeKind::BinaryOp(op) => {
            let left = eval_int(module, op.left)?;
            let right = eval_int(module, op.right)?;
            Ok(match op.op {
                gslang_parser::ast::BinOp::Or => left | right,
                gslang_parser::ast::BinOp::And => left & right,
            })
        }
        other => Err(format!(
            "{} is not a constant integer expression",
            other.kind_name()
        )),
    }
}

/// Fold an argument expression to a string.
pub fn eval_str(module: &Module, expr: NodeId) -> Result<String, String> {
    match &module.node(expr).kind {
        NodeKind::Str(value) => Ok(value.clone()),
        other => Err(format!(
            "{} is not a constant string expression",
            other.kind_name()
        )),
    }
}

/// Look up an enum constant by the enum's fully qualified name.
pub fn lookup_enum_constant(module: &Module, enum_name: &str, constant: &str) -> Option<NodeId> {
    let owner = module.types.get(enum_name).copied()?;
    module.find_enum_constant(owner, constant)
}

/// Value of an enum constant found via [`lookup_enum_constant`].
pub fn enum_constant_value(module: &Module, enum_name: &str, constant: &str) -> Option<i64> {
    let id = lookup_enum_constant(module, enum_name, constant)?;
    match &module.node(id).kind {
        NodeKind::EnumConstant(c) => Some(c.value),
        _ => None,
    }
}

/// The argument that initializes a given table field inside an annotation's
/// argument table: positional tables match by the field's declaration
/// index, named tables by the field's name.
pub fn field_init_arg(module: &Module, args: NodeId, field: NodeId) -> Option<NodeId> {
    let (field_id, field_name) = match &module.node(field).kind {
        NodeKind::Field(f) => (f.id as usize, module.name_of(field)),
        _ => return None,
    };
    match &module.node(args).kind {
        NodeKind::Args(positional) => positional.items.get(field_id).copied(),
        NodeKind::NamedArgs(named) => named
            .items
            .iter()
            .find(|(name, _)| name == field_name)
            .map(|&(_, id)| id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gslang_parser::ast::{BinOp, EnumBase, Module};

    fn module_with_enum() -> (Module, NodeId, NodeId) {
        let mut module = Module::new("test");
        let pkg = module.ensure_package("demo");
        let script = module.new_script(pkg, "demo.gs");
        let owner = module.new_enum(script, "Flags", EnumBase::default());
        let a = module.new_enum_constant(owner, "A", 1).unwrap();
        let b = module.new_enum_constant(owner, "B", 2).unwrap();
        module.types.insert("demo.Flags".into(), owner);
        let _ = b;
        (module, owner, a)
    }

    #[test]
    fn eval_enum_constant() {
        let (module, _, a) = module_with_enum();
        assert_eq!(eval_int(&module, a), Ok(1));
    }

    #[test]
    fn eval_binary_fold() {
        let (mut module, owner, _) = module_with_enum();
        let a = module.find_enum_constant(owner, "A").unwrap();
        let b = module.find_enum_constant(owner, "B").unwrap();
        let left = module.new_constant_ref("demo.Flags.A".into());
        module.set_constant_ref_target(left, a);
        let right = module.new_constant_ref("demo.Flags.B".into());
        module.set_constant_ref_target(right, b);
        let or = module.new_binary_op(BinOp::Or, left, right);
        assert_eq!(eval_int(&module, or), Ok(3));

        let and = module.new_binary_op(BinOp::And, left, right);
        assert_eq!(eval_int(&module, and), Ok(0));
    }

    #[test]
    fn eval_rejects_literals_and_unresolved() {
        let (mut module, _, _) = module_with_enum();
        let int = module.new_int(5);
        assert!(eval_int(&module, int).is_err());

        let unresolved = module.new_constant_ref("demo.Flags.C".into());
        assert!(eval_int(&module, unresolved).is_err());

        let string = module.new_str("x".into());
        assert!(eval_int(&module, string).is_err());
        assert_eq!(eval_str(&module, string), Ok("x".into()));
        assert!(eval_str(&module, int).is_err());
    }

    #[test]
    fn enum_constant_lookup_by_full_name() {
        let (module, _, _) = module_with_enum();
        assert_eq!(enum_constant_value(&module, "demo.Flags", "B"), Some(2));
        assert_eq!(enum_constant_value(&module, "demo.Flags", "C"), None);
        assert_eq!(enum_constant_value(&module, "demo.Other", "A"), None);
    }

    #[test]
    fn field_init_arg_positional_and_named() {
        let (mut module, _, _) = module_with_enum();
        let pkg = module.ensure_package("demo");
        let script = module.new_script(pkg, "x.gs");
        let table = module.new_table(script, "Usage");
        let ty = module.new_builtin(gslang_parser::ast::BuiltinKind::UInt32);
        let field = module.new_field(table, "Target", ty).unwrap();

        let value = module.new_int(4);
        let positional = module.new_args(vec![value]);
        assert_eq!(field_init_arg(&module, positional, field), Some(value));

        let named = module.new_named_args(vec![("Target".into(), value)]);
        assert_eq!(field_init_arg(&module, named, field), Some(value));

        let other = module.new_named_args(vec![("Other".into(), value)]);
        assert_eq!(field_init_arg(&module, other, field), None);
    }
}
