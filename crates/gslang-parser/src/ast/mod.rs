//! The gslang abstract syntax tree.
//!
//! The tree is arena-shaped: a [`Module`] owns a flat vector of nodes and
//! every reference between nodes -- child, base, resolved type -- is a
//! [`NodeId`] index into that vector. Parent pointers are not stored;
//! traversal passes carry their own context. Nodes are created by the
//! parser and never destroyed; the linker mutates resolved references and
//! extras but never restructures the tree, except for moving annotations
//! between extras lists.

mod extras;
pub mod visit;

pub use extras::{Comment, Extras};

use gslang_common::token::TokenKind;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Index of a node within its module's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One AST node: display name, tagged payload, and the extras side-table.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub extras: Extras,
}

/// The tagged payload of a node.
#[derive(Debug, Clone, Serialize)]
pub enum NodeKind {
    Package(Package),
    Script(Script),
    Using(Using),
    Table(Table),
    Field(Field),
    Enum(Enum),
    EnumConstant(EnumConstant),
    Contract(Contract),
    Method(Method),
    Param(Param),
    Exception(Exception),
    TypeRef(TypeRef),
    Builtin(BuiltinKind),
    Seq(Seq),
    Annotation(Annotation),
    Args(Args),
    NamedArgs(NamedArgs),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    ConstantRef(ConstantRef),
    BinaryOp(BinaryOp),
    NewObj(NewObj),
}

impl NodeKind {
    /// Lower-case kind name for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Package(_) => "package",
            NodeKind::Script(_) => "script",
            NodeKind::Using(_) => "using",
            NodeKind::Table(_) => "table",
            NodeKind::Field(_) => "field",
            NodeKind::Enum(_) => "enum",
            NodeKind::EnumConstant(_) => "enum constant",
            NodeKind::Contract(_) => "contract",
            NodeKind::Method(_) => "method",
            NodeKind::Param(_) => "param",
            NodeKind::Exception(_) => "exception",
            NodeKind::TypeRef(_) => "type reference",
            NodeKind::Builtin(_) => "builtin type",
            NodeKind::Seq(_) => "sequence",
            NodeKind::Annotation(_) => "annotation",
            NodeKind::Args(_) => "argument table",
            NodeKind::NamedArgs(_) => "named argument table",
            NodeKind::Int(_) => "integer literal",
            NodeKind::Float(_) => "float literal",
            NodeKind::Str(_) => "string literal",
            NodeKind::Bool(_) => "boolean literal",
            NodeKind::ConstantRef(_) => "constant reference",
            NodeKind::BinaryOp(_) => "binary operation",
            NodeKind::NewObj(_) => "object literal",
        }
    }

    /// Name of the `gslang.annotations.Target` constant that licenses an
    /// annotation on this node kind. `None` for kinds annotations cannot
    /// legally host.
    pub fn target_flag_name(&self) -> Option<&'static str> {
        match self {
            NodeKind::Script(_) => Some("Script"),
            NodeKind::Using(_) => Some("Using"),
            NodeKind::Table(_) => Some("Table"),
            NodeKind::Field(_) => Some("Field"),
            NodeKind::Enum(_) => Some("Enum"),
            NodeKind::EnumConstant(_) => Some("EnumConstant"),
            NodeKind::Contract(_) => Some("Contract"),
            NodeKind::Method(_) => Some("Method"),
            NodeKind::Param(_) => Some("Param"),
            _ => None,
        }
    }
}

// ── Node payloads ──────────────────────────────────────────────────────

/// A logical grouping of scripts keyed by dotted package path. Every
/// package-scoped type name is unique within its package.
#[derive(Debug, Clone, Serialize)]
pub struct Package {
    pub path: String,
    pub scripts: Vec<NodeId>,
    /// Package-scoped type index, `Name` -> type node. Filled by the
    /// linker's symbol pass.
    pub types: FxHashMap<String, NodeId>,
}

/// One source file: its declared package path, using-imports, and the
/// ordered type declarations it introduced.
#[derive(Debug, Clone, Serialize)]
pub struct Script {
    pub package: String,
    pub file: String,
    pub usings: Vec<NodeId>,
    /// Alias (last path segment) -> using node.
    pub using_index: FxHashMap<String, NodeId>,
    pub types: Vec<NodeId>,
}

/// What a using-import resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum UsingTarget {
    /// A loaded package node.
    Package(NodeId),
    /// A single imported type.
    Type(NodeId),
}

/// A `using a.b.c;` import. The alias it introduces is the node name
/// (the path's last segment).
#[derive(Debug, Clone, Serialize)]
pub struct Using {
    pub path: String,
    pub target: Option<UsingTarget>,
}

/// A record type with ordered fields.
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub fields: Vec<NodeId>,
}

/// A table field. `id` is the stable declaration index.
#[derive(Debug, Clone, Serialize)]
pub struct Field {
    pub id: u16,
    pub ty: NodeId,
}

/// Signedness and byte width an enum's constants must fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnumBase {
    pub signed: bool,
    pub width: u8,
}

impl EnumBase {
    /// Profile of an explicit `enum Name(base)` clause.
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        let (signed, width) = match kind {
            TokenKind::Byte => (false, 1),
            TokenKind::SByte => (true, 1),
            TokenKind::Int16 => (true, 2),
            TokenKind::UInt16 => (false, 2),
            TokenKind::Int32 => (true, 4),
            TokenKind::UInt32 => (false, 4),
            _ => return None,
        };
        Some(Self { signed, width })
    }

    /// Inclusive value range of the profile.
    pub fn range(self) -> (i64, i64) {
        let bits = u32::from(self.width) * 8;
        if self.signed {
            (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
        } else {
            (0, (1i64 << bits) - 1)
        }
    }
}

impl Default for EnumBase {
    /// Enums without a base clause default to `int32`.
    fn default() -> Self {
        Self {
            signed: true,
            width: 4,
        }
    }
}

/// An enumeration: ordered constants plus the base profile.
#[derive(Debug, Clone, Serialize)]
pub struct Enum {
    pub base: EnumBase,
    pub constants: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumConstant {
    pub value: i64,
}

/// An RPC interface: ordered methods plus ordered base contract references.
#[derive(Debug, Clone, Serialize)]
pub struct Contract {
    pub bases: Vec<NodeId>,
    pub methods: Vec<NodeId>,
}

/// A contract method. `id` is rewritten by the inheritance unwinder so ids
/// are dense and unique across the flattened contract.
#[derive(Debug, Clone, Serialize)]
pub struct Method {
    pub id: u16,
    pub returns: Vec<NodeId>,
    pub params: Vec<NodeId>,
    pub exceptions: Vec<NodeId>,
}

/// A method parameter or return value.
#[derive(Debug, Clone, Serialize)]
pub struct Param {
    pub index: u16,
    pub ty: NodeId,
}

/// One `throws` declaration of a method.
#[derive(Debug, Clone, Serialize)]
pub struct Exception {
    pub id: u8,
    pub ty: NodeId,
}

/// An unresolved or resolved dotted type reference.
#[derive(Debug, Clone, Serialize)]
pub struct TypeRef {
    pub name_path: Vec<String>,
    pub target: Option<NodeId>,
}

/// Primitive scalar types plus `string`, `bool` and `void`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuiltinKind {
    Byte,
    SByte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    String,
    Bool,
    Void,
}

impl BuiltinKind {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Byte => Some(BuiltinKind::Byte),
            TokenKind::SByte => Some(BuiltinKind::SByte),
            TokenKind::Int16 => Some(BuiltinKind::Int16),
            TokenKind::UInt16 => Some(BuiltinKind::UInt16),
            TokenKind::Int32 => Some(BuiltinKind::Int32),
            TokenKind::UInt32 => Some(BuiltinKind::UInt32),
            TokenKind::Int64 => Some(BuiltinKind::Int64),
            TokenKind::UInt64 => Some(BuiltinKind::UInt64),
            TokenKind::Float32 => Some(BuiltinKind::Float32),
            TokenKind::Float64 => Some(BuiltinKind::Float64),
            TokenKind::StringKw => Some(BuiltinKind::String),
            TokenKind::Bool => Some(BuiltinKind::Bool),
            TokenKind::Void => Some(BuiltinKind::Void),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinKind::Byte => "byte",
            BuiltinKind::SByte => "sbyte",
            BuiltinKind::Int16 => "int16",
            BuiltinKind::UInt16 => "uint16",
            BuiltinKind::Int32 => "int32",
            BuiltinKind::UInt32 => "uint32",
            BuiltinKind::Int64 => "int64",
            BuiltinKind::UInt64 => "uint64",
            BuiltinKind::Float32 => "float32",
            BuiltinKind::Float64 => "float64",
            BuiltinKind::String => "string",
            BuiltinKind::Bool => "bool",
            BuiltinKind::Void => "void",
        }
    }
}

/// List (`size < 0`) or fixed array (`size > 0`) of a component type.
#[derive(Debug, Clone, Serialize)]
pub struct Seq {
    pub component: NodeId,
    pub size: i64,
}

/// `@Name(args)` metadata. `ty` is a type reference to the annotation's
/// backing table.
#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub ty: NodeId,
    pub args: Option<NodeId>,
}

/// Positional argument table.
#[derive(Debug, Clone, Serialize)]
pub struct Args {
    pub items: Vec<NodeId>,
}

/// Named argument table, ordered as written.
#[derive(Debug, Clone, Serialize)]
pub struct NamedArgs {
    pub items: Vec<(String, NodeId)>,
}

/// A dotted reference to an enum constant inside an argument expression.
#[derive(Debug, Clone, Serialize)]
pub struct ConstantRef {
    pub name: String,
    pub target: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    Or,
    And,
}

#[derive(Debug, Clone, Serialize)]
pub struct BinaryOp {
    pub op: BinOp,
    pub left: NodeId,
    pub right: NodeId,
}

/// A table-instance literal `Name(args)` inside an argument expression.
#[derive(Debug, Clone, Serialize)]
pub struct NewObj {
    pub ty: NodeId,
    pub args: NodeId,
}

// ── Module ─────────────────────────────────────────────────────────────

/// A named collection of packages and scripts compiled together, owning the
/// node arena and the fully-qualified type index.
#[derive(Debug, Serialize)]
pub struct Module {
    pub name: String,
    nodes: Vec<Node>,
    packages: Vec<NodeId>,
    package_index: FxHashMap<String, NodeId>,
    /// Fully-qualified name (`package.Name`) -> type node. Filled by the
    /// linker's symbol pass.
    pub types: FxHashMap<String, NodeId>,
    pub extras: Extras,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            packages: Vec::new(),
            package_index: FxHashMap::default(),
            types: FxHashMap::default(),
            extras: Extras::default(),
        }
    }

    // ── Arena access ───────────────────────────────────────────────────

    pub fn alloc(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name: name.into(),
            kind,
            extras: Extras::default(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn name_of(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].name
    }

    pub fn extras(&self, id: NodeId) -> &Extras {
        &self.nodes[id.index()].extras
    }

    pub fn extras_mut(&mut self, id: NodeId) -> &mut Extras {
        &mut self.nodes[id.index()].extras
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Clone a node (payload and extras) into a fresh arena slot. Children
    /// are shared; the inheritance unwinder uses this to copy inherited
    /// methods.
    pub fn clone_node(&mut self, id: NodeId) -> NodeId {
        let node = self.nodes[id.index()].clone();
        let new_id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        new_id
    }

    // ── Packages and scripts ───────────────────────────────────────────

    /// Get or create the package node for a dotted path.
    pub fn ensure_package(&mut self, path: &str) -> NodeId {
        if let Some(&id) = self.package_index.get(path) {
            return id;
        }
        let name = path.rsplit('.').next().unwrap_or(path).to_string();
        let id = self.alloc(
            name,
            NodeKind::Package(Package {
                path: path.to_string(),
                scripts: Vec::new(),
                types: FxHashMap::default(),
            }),
        );
        self.packages.push(id);
        self.package_index.insert(path.to_string(), id);
        id
    }

    /// Package nodes in creation order.
    pub fn packages(&self) -> &[NodeId] {
        &self.packages
    }

    pub fn package_by_path(&self, path: &str) -> Option<NodeId> {
        self.package_index.get(path).copied()
    }

    /// Create a script bound to a package.
    pub fn new_script(&mut self, package: NodeId, file: &str) -> NodeId {
        let package_path = self.package(package).path.clone();
        let id = self.alloc(
            file.to_string(),
            NodeKind::Script(Script {
                package: package_path,
                file: file.to_string(),
                usings: Vec::new(),
                using_index: FxHashMap::default(),
                types: Vec::new(),
            }),
        );
        if let NodeKind::Package(pkg) = &mut self.nodes[package.index()].kind {
            pkg.scripts.push(id);
        }
        id
    }

    /// Add a using-import to a script. Returns the existing node when the
    /// alias is already taken.
    pub fn new_using(&mut self, script: NodeId, path: &str) -> Result<NodeId, NodeId> {
        let alias = path.rsplit('.').next().unwrap_or(path).to_string();
        if let NodeKind::Script(s) = &self.nodes[script.index()].kind {
            if let Some(&existing) = s.using_index.get(&alias) {
                return Err(existing);
            }
        }
        let id = self.alloc(
            alias.clone(),
            NodeKind::Using(Using {
                path: path.to_string(),
                target: None,
            }),
        );
        if let NodeKind::Script(s) = &mut self.nodes[script.index()].kind {
            s.usings.push(id);
            s.using_index.insert(alias, id);
        }
        id_ok(id)
    }

    /// Prepend a using-import, used by the driver's auto-import. Does
    /// nothing when the alias is already present.
    pub fn prepend_using(&mut self, script: NodeId, path: &str) -> Option<NodeId> {
        let alias = path.rsplit('.').next().unwrap_or(path).to_string();
        if let NodeKind::Script(s) = &self.nodes[script.index()].kind {
            if s.using_index.contains_key(&alias) {
                return None;
            }
        }
        let id = self.alloc(
            alias.clone(),
            NodeKind::Using(Using {
                path: path.to_string(),
                target: None,
            }),
        );
        if let NodeKind::Script(s) = &mut self.nodes[script.index()].kind {
            s.usings.insert(0, id);
            s.using_index.insert(alias, id);
        }
        Some(id)
    }

    // ── Type declarations ──────────────────────────────────────────────

    pub fn new_table(&mut self, script: NodeId, name: &str) -> NodeId {
        let id = self.alloc(name, NodeKind::Table(Table { fields: Vec::new() }));
        self.push_script_type(script, id);
        id
    }

    /// Add a field to a table. Returns the earlier field when the name is
    /// already taken (the first declaration wins).
    pub fn new_field(&mut self, table: NodeId, name: &str, ty: NodeId) -> Result<NodeId, NodeId> {
        if let Some(existing) = self.find_field(table, name) {
            return Err(existing);
        }
        let index = match &self.nodes[table.index()].kind {
            NodeKind::Table(t) => t.fields.len() as u16,
            _ => 0,
        };
        let id = self.alloc(name, NodeKind::Field(Field { id: index, ty }));
        if let NodeKind::Table(t) = &mut self.nodes[table.index()].kind {
            t.fields.push(id);
        }
        id_ok(id)
    }

    pub fn find_field(&self, table: NodeId, name: &str) -> Option<NodeId> {
        match &self.nodes[table.index()].kind {
            NodeKind::Table(t) => t
                .fields
                .iter()
                .copied()
                .find(|&f| self.name_of(f) == name),
            _ => None,
        }
    }

    pub fn new_enum(&mut self, script: NodeId, name: &str, base: EnumBase) -> NodeId {
        let id = self.alloc(
            name,
            NodeKind::Enum(Enum {
                base,
                constants: Vec::new(),
            }),
        );
        self.push_script_type(script, id);
        id
    }

    /// Add a constant to an enum. Returns the earlier constant when the
    /// name is already taken.
    pub fn new_enum_constant(
        &mut self,
        owner: NodeId,
        name: &str,
        value: i64,
    ) -> Result<NodeId, NodeId> {
        if let Some(existing) = self.find_enum_constant(owner, name) {
            return Err(existing);
        }
        let id = self.alloc(name, NodeKind::EnumConstant(EnumConstant { value }));
        if let NodeKind::Enum(e) = &mut self.nodes[owner.index()].kind {
            e.constants.push(id);
        }
        id_ok(id)
    }

    pub fn find_enum_constant(&self, owner: NodeId, name: &str) -> Option<NodeId> {
        match &self.nodes[owner.index()].kind {
            NodeKind::Enum(e) => e
                .constants
                .iter()
                .copied()
                .find(|&c| self.name_of(c) == name),
            _ => None,
        }
    }

    /// Value the next unassigned constant of an enum takes.
    pub fn next_enum_value(&self, owner: NodeId) -> i64 {
        match &self.nodes[owner.index()].kind {
            NodeKind::Enum(e) => match e.constants.last() {
                Some(&last) => match &self.nodes[last.index()].kind {
                    NodeKind::EnumConstant(c) => c.value + 1,
                    _ => 0,
                },
                None => 0,
            },
            _ => 0,
        }
    }

    pub fn new_contract(&mut self, script: NodeId, name: &str) -> NodeId {
        let id = self.alloc(
            name,
            NodeKind::Contract(Contract {
                bases: Vec::new(),
                methods: Vec::new(),
            }),
        );
        self.push_script_type(script, id);
        id
    }

    pub fn add_contract_base(&mut self, contract: NodeId, base: NodeId) {
        if let NodeKind::Contract(c) = &mut self.nodes[contract.index()].kind {
            c.bases.push(base);
        }
    }

    /// Create a method and append it to a contract. Returns the earlier
    /// method when the name is already taken.
    pub fn new_method(&mut self, contract: NodeId, name: &str) -> Result<NodeId, NodeId> {
        if let Some(existing) = self.find_method(contract, name) {
            return Err(existing);
        }
        let index = match &self.nodes[contract.index()].kind {
            NodeKind::Contract(c) => c.methods.len() as u16,
            _ => 0,
        };
        let id = self.alloc(
            name,
            NodeKind::Method(Method {
                id: index,
                returns: Vec::new(),
                params: Vec::new(),
                exceptions: Vec::new(),
            }),
        );
        if let NodeKind::Contract(c) = &mut self.nodes[contract.index()].kind {
            c.methods.push(id);
        }
        id_ok(id)
    }

    pub fn find_method(&self, contract: NodeId, name: &str) -> Option<NodeId> {
        match &self.nodes[contract.index()].kind {
            NodeKind::Contract(c) => c
                .methods
                .iter()
                .copied()
                .find(|&m| self.name_of(m) == name),
            _ => None,
        }
    }

    /// Add an input parameter to a method. Returns the earlier parameter on
    /// a name collision.
    pub fn new_param(&mut self, method: NodeId, name: &str, ty: NodeId) -> Result<NodeId, NodeId> {
        let existing = match &self.nodes[method.index()].kind {
            NodeKind::Method(m) => m
                .params
                .iter()
                .copied()
                .find(|&p| self.name_of(p) == name),
            _ => None,
        };
        if let Some(existing) = existing {
            return Err(existing);
        }
        let index = match &self.nodes[method.index()].kind {
            NodeKind::Method(m) => m.params.len() as u16,
            _ => 0,
        };
        let id = self.alloc(name, NodeKind::Param(Param { index, ty }));
        if let NodeKind::Method(m) = &mut self.nodes[method.index()].kind {
            m.params.push(id);
        }
        id_ok(id)
    }

    /// Add a return value to a method.
    pub fn new_return(&mut self, method: NodeId, name: &str, ty: NodeId) -> NodeId {
        let index = match &self.nodes[method.index()].kind {
            NodeKind::Method(m) => m.returns.len() as u16,
            _ => 0,
        };
        let id = self.alloc(name, NodeKind::Param(Param { index, ty }));
        if let NodeKind::Method(m) = &mut self.nodes[method.index()].kind {
            m.returns.push(id);
        }
        id
    }

    /// Add a throws declaration to a method.
    pub fn new_exception(&mut self, method: NodeId, ty: NodeId) -> NodeId {
        let index = match &self.nodes[method.index()].kind {
            NodeKind::Method(m) => m.exceptions.len() as u8,
            _ => 0,
        };
        let name = self.name_of(ty).to_string();
        let id = self.alloc(name, NodeKind::Exception(Exception { id: index, ty }));
        if let NodeKind::Method(m) = &mut self.nodes[method.index()].kind {
            m.exceptions.push(id);
        }
        id
    }

    // ── Type expressions and argument expressions ──────────────────────

    pub fn new_typeref(&mut self, name_path: Vec<String>) -> NodeId {
        let name = name_path.join(".");
        self.alloc(
            name,
            NodeKind::TypeRef(TypeRef {
                name_path,
                target: None,
            }),
        )
    }

    pub fn new_builtin(&mut self, kind: BuiltinKind) -> NodeId {
        self.alloc(kind.name(), NodeKind::Builtin(kind))
    }

    pub fn new_seq(&mut self, component: NodeId, size: i64) -> NodeId {
        let name = if size < 0 {
            format!("{}[]", self.name_of(component))
        } else {
            format!("{}[{}]", self.name_of(component), size)
        };
        self.alloc(name, NodeKind::Seq(Seq { component, size }))
    }

    pub fn new_annotation(&mut self, ty: NodeId, args: Option<NodeId>) -> NodeId {
        let name = self.name_of(ty).to_string();
        self.alloc(name, NodeKind::Annotation(Annotation { ty, args }))
    }

    pub fn new_args(&mut self, items: Vec<NodeId>) -> NodeId {
        self.alloc("args", NodeKind::Args(Args { items }))
    }

    pub fn new_named_args(&mut self, items: Vec<(String, NodeId)>) -> NodeId {
        self.alloc("args", NodeKind::NamedArgs(NamedArgs { items }))
    }

    pub fn new_int(&mut self, value: i64) -> NodeId {
        self.alloc("int", NodeKind::Int(value))
    }

    pub fn new_float(&mut self, value: f64) -> NodeId {
        self.alloc("float", NodeKind::Float(value))
    }

    pub fn new_str(&mut self, value: String) -> NodeId {
        self.alloc("string", NodeKind::Str(value))
    }

    pub fn new_bool(&mut self, value: bool) -> NodeId {
        self.alloc("bool", NodeKind::Bool(value))
    }

    pub fn new_constant_ref(&mut self, name: String) -> NodeId {
        self.alloc(
            name.clone(),
            NodeKind::ConstantRef(ConstantRef { name, target: None }),
        )
    }

    pub fn new_binary_op(&mut self, op: BinOp, left: NodeId, right: NodeId) -> NodeId {
        let name = match op {
            BinOp::Or => "|",
            BinOp::And => "&",
        };
        self.alloc(name, NodeKind::BinaryOp(BinaryOp { op, left, right }))
    }

    pub fn new_new_obj(&mut self, ty: NodeId, args: NodeId) -> NodeId {
        let name = self.name_of(ty).to_string();
        self.alloc(name, NodeKind::NewObj(NewObj { ty, args }))
    }

    // ── Typed payload accessors ────────────────────────────────────────

    pub fn package(&self, id: NodeId) -> &Package {
        match &self.nodes[id.index()].kind {
            NodeKind::Package(p) => p,
            other => unreachable!("node is a {}, not a package", other.kind_name()),
        }
    }

    pub fn script(&self, id: NodeId) -> &Script {
        match &self.nodes[id.index()].kind {
            NodeKind::Script(s) => s,
            other => unreachable!("node is a {}, not a script", other.kind_name()),
        }
    }

    pub fn as_using(&self, id: NodeId) -> Option<&Using> {
        match &self.nodes[id.index()].kind {
            NodeKind::Using(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_table(&self, id: NodeId) -> Option<&Table> {
        match &self.nodes[id.index()].kind {
            NodeKind::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_enum(&self, id: NodeId) -> Option<&Enum> {
        match &self.nodes[id.index()].kind {
            NodeKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_contract(&self, id: NodeId) -> Option<&Contract> {
        match &self.nodes[id.index()].kind {
            NodeKind::Contract(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_method(&self, id: NodeId) -> Option<&Method> {
        match &self.nodes[id.index()].kind {
            NodeKind::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_typeref(&self, id: NodeId) -> Option<&TypeRef> {
        match &self.nodes[id.index()].kind {
            NodeKind::TypeRef(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_annotation(&self, id: NodeId) -> Option<&Annotation> {
        match &self.nodes[id.index()].kind {
            NodeKind::Annotation(a) => Some(a),
            _ => None,
        }
    }

    /// The resolved target of a type reference, `None` while unlinked.
    pub fn typeref_target(&self, id: NodeId) -> Option<NodeId> {
        self.as_typeref(id).and_then(|r| r.target)
    }

    pub fn set_typeref_target(&mut self, id: NodeId, target: NodeId) {
        if let NodeKind::TypeRef(r) = &mut self.nodes[id.index()].kind {
            r.target = Some(target);
        }
    }

    pub fn set_constant_ref_target(&mut self, id: NodeId, target: NodeId) {
        if let NodeKind::ConstantRef(r) = &mut self.nodes[id.index()].kind {
            r.target = Some(target);
        }
    }

    pub fn set_using_target(&mut self, id: NodeId, target: UsingTarget) {
        if let NodeKind::Using(u) = &mut self.nodes[id.index()].kind {
            u.target = Some(target);
        }
    }

    /// Fully-qualified name of a type declaration node.
    pub fn full_name(&self, package_path: &str, id: NodeId) -> String {
        format!("{}.{}", package_path, self.name_of(id))
    }

    /// Look up an annotation on a node by the full name of the annotation's
    /// resolved backing table.
    pub fn find_annotation(&self, host: NodeId, full_name: &str) -> Option<NodeId> {
        self.find_annotation_in(&self.extras(host).annotations, full_name)
    }

    /// Look up an annotation in an explicit annotation list, e.g. the
    /// module-level extras.
    pub fn find_annotation_in(&self, annotations: &[NodeId], full_name: &str) -> Option<NodeId> {
        annotations.iter().copied().find(|&ann| {
            let Some(annotation) = self.as_annotation(ann) else {
                return false;
            };
            let Some(target) = self.typeref_target(annotation.ty) else {
                return false;
            };
            self.resolved_full_name(target).as_deref() == Some(full_name)
        })
    }

    /// Fully-qualified name of a resolved type node, found by scanning the
    /// package indices.
    pub fn resolved_full_name(&self, id: NodeId) -> Option<String> {
        for (full, &ty) in &self.types {
            if ty == id {
                return Some(full.clone());
            }
        }
        None
    }
}

fn id_ok(id: NodeId) -> Result<NodeId, NodeId> {
    Ok(id)
}

impl Module {
    fn push_script_type(&mut self, script: NodeId, ty: NodeId) {
        if let NodeKind::Script(s) = &mut self.nodes[script.index()].kind {
            s.types.push(ty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_with_script() -> (Module, NodeId) {
        let mut module = Module::new("test");
        let pkg = module.ensure_package("demo.api");
        let script = module.new_script(pkg, "api.gs");
        (module, script)
    }

    #[test]
    fn ensure_package_is_idempotent() {
        let mut module = Module::new("test");
        let a = module.ensure_package("demo.api");
        let b = module.ensure_package("demo.api");
        assert_eq!(a, b);
        assert_eq!(module.packages().len(), 1);
        assert_eq!(module.package(a).path, "demo.api");
        assert_eq!(module.name_of(a), "api");
    }

    #[test]
    fn script_binds_to_package() {
        let (module, script) = module_with_script();
        let pkg = module.package_by_path("demo.api").unwrap();
        assert_eq!(module.package(pkg).scripts, vec![script]);
        assert_eq!(module.script(script).package, "demo.api");
    }

    #[test]
    fn field_ids_follow_declaration_order() {
        let (mut module, script) = module_with_script();
        let table = module.new_table(script, "User");
        let ty1 = module.new_builtin(BuiltinKind::Int32);
        let ty2 = module.new_builtin(BuiltinKind::String);
        let a = module.new_field(table, "id", ty1).unwrap();
        let b = module.new_field(table, "name", ty2).unwrap();

        let fields = &module.as_table(table).unwrap().fields;
        assert_eq!(fields, &vec![a, b]);
        match (&module.node(a).kind, &module.node(b).kind) {
            (NodeKind::Field(fa), NodeKind::Field(fb)) => {
                assert_eq!(fa.id, 0);
                assert_eq!(fb.id, 1);
            }
            _ => panic!("expected fields"),
        }
    }

    #[test]
    fn duplicate_field_returns_earlier() {
        let (mut module, script) = module_with_script();
        let table = module.new_table(script, "User");
        let ty = module.new_builtin(BuiltinKind::Int32);
        let first = module.new_field(table, "id", ty).unwrap();
        let err = module.new_field(table, "id", ty).unwrap_err();
        assert_eq!(err, first);
        assert_eq!(module.as_table(table).unwrap().fields.len(), 1);
    }

    #[test]
    fn enum_auto_increment() {
        let (mut module, script) = module_with_script();
        let color = module.new_enum(script, "Color", EnumBase::default());
        assert_eq!(module.next_enum_value(color), 0);
        module.new_enum_constant(color, "Red", 0).unwrap();
        assert_eq!(module.next_enum_value(color), 1);
        module.new_enum_constant(color, "Blue", 5).unwrap();
        assert_eq!(module.next_enum_value(color), 6);
    }

    #[test]
    fn enum_base_ranges() {
        assert_eq!(EnumBase::from_token(TokenKind::Byte).unwrap().range(), (0, 255));
        assert_eq!(
            EnumBase::from_token(TokenKind::SByte).unwrap().range(),
            (-128, 127)
        );
        assert_eq!(
            EnumBase::from_token(TokenKind::Int16).unwrap().range(),
            (-32768, 32767)
        );
        assert_eq!(
            EnumBase::from_token(TokenKind::UInt32).unwrap().range(),
            (0, u32::MAX as i64)
        );
        assert_eq!(EnumBase::from_token(TokenKind::Int64), None);
    }

    #[test]
    fn using_alias_is_last_segment() {
        let (mut module, script) = module_with_script();
        let using = module.new_using(script, "gslang.annotations").unwrap();
        assert_eq!(module.name_of(using), "annotations");
        assert!(module.new_using(script, "other.annotations").is_err());
    }

    #[test]
    fn prepend_using_goes_first() {
        let (mut module, script) = module_with_script();
        let explicit = module.new_using(script, "net.rpc").unwrap();
        let auto = module.prepend_using(script, "gslang").unwrap();
        assert_eq!(module.script(script).usings, vec![auto, explicit]);
        assert_eq!(module.prepend_using(script, "gslang"), None);
    }

    #[test]
    fn clone_node_copies_payload() {
        let (mut module, script) = module_with_script();
        let contract = module.new_contract(script, "Api");
        let method = module.new_method(contract, "ping").unwrap();
        let clone = module.clone_node(method);
        assert_ne!(method, clone);
        assert_eq!(module.name_of(clone), "ping");
        assert!(module.as_method(clone).is_some());
    }

    #[test]
    fn seq_names_encode_size() {
        let (mut module, _) = module_with_script();
        let int32 = module.new_builtin(BuiltinKind::Int32);
        let list = module.new_seq(int32, -1);
        let array = module.new_seq(int32, 10);
        assert_eq!(module.name_of(list), "int32[]");
        assert_eq!(module.name_of(array), "int32[10]");
    }
}
