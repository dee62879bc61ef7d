use gslang_common::diagnostics::{DiagnosticBag, DiagnosticKind};
use gslang_parser::ast::{BinOp, Module, NodeId, NodeKind, UsingTarget};
use gslang_parser::parse_script;

fn parse(source: &str) -> (Module, NodeId, DiagnosticBag) {
    let mut module = Module::new("test");
    let mut bag = DiagnosticBag::new();
    let script = parse_script(&mut module, "test.gs", source, &mut bag)
        .expect("script should parse");
    (module, script, bag)
}

fn parse_clean(source: &str) -> (Module, NodeId) {
    let (module, script, bag) = parse(source);
    assert!(
        bag.is_empty(),
        "expected a clean parse, got: {:?}",
        bag.into_vec()
    );
    (module, script)
}

#[test]
fn package_and_usings() {
    let (module, script) = parse_clean(
        "package com.example.api;\n\
         using gslang.annotations;\n\
         using net.rpc;\n",
    );
    let script = module.script(script);
    assert_eq!(script.package, "com.example.api");
    assert_eq!(script.usings.len(), 2);

    let first = script.usings[0];
    assert_eq!(module.name_of(first), "annotations");
    let using = module.as_using(first).unwrap();
    assert_eq!(using.path, "gslang.annotations");
    assert_eq!(using.target, None::<UsingTarget>);

    assert_eq!(module.name_of(script.usings[1]), "rpc");
    assert!(module.package_by_path("com.example.api").is_some());
}

#[test]
fn enum_auto_values() {
    let (module, script) = parse_clean(
        "package demo;\n\
         enum Color { Red, Green, Blue(5), Alpha }\n",
    );
    let owner = module.script(script).types[0];
    let constants = &module.as_enum(owner).unwrap().constants;
    let values: Vec<i64> = constants
        .iter()
        .map(|&c| match &module.node(c).kind {
            NodeKind::EnumConstant(k) => k.value,
            _ => panic!("expected a constant"),
        })
        .collect();
    assert_eq!(values, vec![0, 1, 5, 6]);
    let names: Vec<&str> = constants.iter().map(|&c| module.name_of(c)).collect();
    assert_eq!(names, vec!["Red", "Green", "Blue", "Alpha"]);
}

#[test]
fn enum_negative_value_and_base() {
    let (module, script) = parse_clean(
        "package demo;\n\
         enum Level(sbyte) { Low(-1), Mid, High(+3) }\n",
    );
    let owner = module.script(script).types[0];
    let e = module.as_enum(owner).unwrap();
    assert!(e.base.signed);
    assert_eq!(e.base.width, 1);
    let values: Vec<i64> = e
        .constants
        .iter()
        .map(|&c| match &module.node(c).kind {
            NodeKind::EnumConstant(k) => k.value,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(values, vec![-1, 0, 3]);
}

#[test]
fn table_fields_have_declaration_ids() {
    let (module, script) = parse_clean(
        "package demo;\n\
         table User {\n\
             int32 id;\n\
             string name;\n\
             [10]byte digest;\n\
             []string tags;\n\
         }\n",
    );
    let table = module.script(script).types[0];
    let fields = &module.as_table(table).unwrap().fields;
    assert_eq!(fields.len(), 4);

    for (index, &field) in fields.iter().enumerate() {
        match &module.node(field).kind {
            NodeKind::Field(f) => assert_eq!(f.id as usize, index),
            _ => panic!("expected a field"),
        }
    }

    let digest = fields[2];
    let NodeKind::Field(f) = &module.node(digest).kind else {
        panic!()
    };
    let NodeKind::Seq(seq) = &module.node(f.ty).kind else {
        panic!("digest should be a sequence")
    };
    assert_eq!(seq.size, 10);

    let tags = fields[3];
    let NodeKind::Field(f) = &module.node(tags).kind else {
        panic!()
    };
    let NodeKind::Seq(seq) = &module.node(f.ty).kind else {
        panic!("tags should be a sequence")
    };
    assert_eq!(seq.size, -1);
}

#[test]
fn duplicate_field_keeps_first() {
    let (module, script, bag) = parse(
        "package demo;\n\
         table T { int32 a; int32 a; }\n",
    );
    assert!(bag.has(DiagnosticKind::DuplicateField));
    let table = module.script(script).types[0];
    assert_eq!(module.as_table(table).unwrap().fields.len(), 1);
    let diag = bag
        .iter()
        .find(|d| d.kind == DiagnosticKind::DuplicateField)
        .unwrap();
    assert!(diag.related.is_some(), "should point at the first field");
}

#[test]
fn struct_gets_marker_annotation() {
    let (module, script) = parse_clean(
        "package demo;\n\
         struct Vec3 { float32 x; float32 y; float32 z; }\n",
    );
    let table = module.script(script).types[0];
    assert!(module.as_table(table).is_some());
    let annotations = &module.extras(table).annotations;
    assert_eq!(annotations.len(), 1);
    let annotation = module.as_annotation(annotations[0]).unwrap();
    let ty = module.as_typeref(annotation.ty).unwrap();
    assert_eq!(ty.name_path, vec!["gslang".to_string(), "Struct".to_string()]);
}

#[test]
fn contract_signature_shapes() {
    let (module, script) = parse_clean(
        "package demo;\n\
         table Fault { string reason; }\n\
         contract Calc(Base, util.Extra) {\n\
             void reset();\n\
             int32 add(int32 a, int32 b);\n\
             int32 div(int32 a, int32 b) -> (int32 remainder) throws (Fault);\n\
         }\n",
    );
    let contract = module.script(script).types[1];
    let c = module.as_contract(contract).unwrap();
    assert_eq!(c.bases.len(), 2);
    assert_eq!(
        module.as_typeref(c.bases[1]).unwrap().name_path,
        vec!["util".to_string(), "Extra".to_string()]
    );
    assert_eq!(c.methods.len(), 3);

    let reset = module.as_method(c.methods[0]).unwrap();
    assert!(reset.returns.is_empty(), "void return adds no return slot");
    assert!(reset.params.is_empty());

    let add = module.as_method(c.methods[1]).unwrap();
    assert_eq!(add.returns.len(), 1);
    assert_eq!(module.name_of(add.returns[0]), "return_arg(0)");
    assert_eq!(add.params.len(), 2);
    assert_eq!(module.name_of(add.params[0]), "a");

    let div = module.as_method(c.methods[2]).unwrap();
    assert_eq!(div.returns.len(), 2);
    assert_eq!(module.name_of(div.returns[1]), "remainder");
    assert_eq!(div.exceptions.len(), 1);
    match &module.node(div.exceptions[0]).kind {
        NodeKind::Exception(e) => assert_eq!(e.id, 0),
        _ => panic!("expected an exception"),
    }
}

#[test]
fn method_ids_follow_declaration_order() {
    let (module, script) = parse_clean(
        "package demo;\n\
         contract C { void a(); void b(); void c(); }\n",
    );
    let contract = module.script(script).types[0];
    let methods = &module.as_contract(contract).unwrap().methods;
    let ids: Vec<u16> = methods
        .iter()
        .map(|&m| module.as_method(m).unwrap().id)
        .collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[test]
fn annotations_flush_onto_next_declaration() {
    let (module, script) = parse_clean(
        "package demo;\n\
         @gslang.Exception\n\
         table Broken { string reason; }\n",
    );
    let table = module.script(script).types[0];
    let annotations = &module.extras(table).annotations;
    assert_eq!(annotations.len(), 1);
    let annotation = module.as_annotation(annotations[0]).unwrap();
    assert_eq!(
        module.as_typeref(annotation.ty).unwrap().name_path,
        vec!["gslang".to_string(), "Exception".to_string()]
    );
}

#[test]
fn dangling_annotations_attach_to_script() {
    let (module, script) = parse_clean(
        "package demo;\n\
         table T { int32 a; }\n\
         @gslang.Marker\n",
    );
    let annotations = &module.extras(script).annotations;
    assert_eq!(annotations.len(), 1);
    assert_eq!(module.name_of(annotations[0]), "gslang.Marker");
}

#[test]
fn annotation_arguments() {
    let (module, script) = parse_clean(
        "package demo;\n\
         @Usage(Target.Table | Target.Script)\n\
         @Retry(count: 3, backoff: 1.5, fatal: false)\n\
         @Tag(\"stable\", -1)\n\
         table T { int32 a; }\n",
    );
    let table = module.script(script).types[0];
    let annotations = &module.extras(table).annotations;
    assert_eq!(annotations.len(), 3);

    // Positional with a binary-op fold.
    let usage = module.as_annotation(annotations[0]).unwrap();
    let NodeKind::Args(args) = &module.node(usage.args.unwrap()).kind else {
        panic!("expected positional args")
    };
    let NodeKind::BinaryOp(op) = &module.node(args.items[0]).kind else {
        panic!("expected a binary op")
    };
    assert_eq!(op.op, BinOp::Or);
    match &module.node(op.left).kind {
        NodeKind::ConstantRef(r) => assert_eq!(r.name, "Target.Table"),
        _ => panic!("expected a constant ref"),
    }

    // Named arguments keep declaration order.
    let retry = module.as_annotation(annotations[1]).unwrap();
    let NodeKind::NamedArgs(named) = &module.node(retry.args.unwrap()).kind else {
        panic!("expected named args")
    };
    let names: Vec<&str> = named.items.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["count", "backoff", "fatal"]);
    match &module.node(named.items[0].1).kind {
        NodeKind::Int(v) => assert_eq!(*v, 3),
        _ => panic!("expected an int"),
    }
    match &module.node(named.items[2].1).kind {
        NodeKind::Bool(v) => assert!(!v),
        _ => panic!("expected a bool"),
    }

    // Literals including a signed number.
    let tag = module.as_annotation(annotations[2]).unwrap();
    let NodeKind::Args(args) = &module.node(tag.args.unwrap()).kind else {
        panic!("expected positional args")
    };
    match &module.node(args.items[0]).kind {
        NodeKind::Str(s) => assert_eq!(s, "stable"),
        _ => panic!("expected a string"),
    }
    match &module.node(args.items[1]).kind {
        NodeKind::Int(v) => assert_eq!(*v, -1),
        _ => panic!("expected an int"),
    }
}

#[test]
fn new_obj_argument() {
    let (module, script) = parse_clean(
        "package demo;\n\
         @Route(Endpoint(\"127.0.0.1\", 8080))\n\
         table T { int32 a; }\n",
    );
    let table = module.script(script).types[0];
    let route = module.as_annotation(module.extras(table).annotations[0]).unwrap();
    let NodeKind::Args(args) = &module.node(route.args.unwrap()).kind else {
        panic!()
    };
    let NodeKind::NewObj(obj) = &module.node(args.items[0]).kind else {
        panic!("expected an object literal")
    };
    assert_eq!(
        module.as_typeref(obj.ty).unwrap().name_path,
        vec!["Endpoint".to_string()]
    );
    let NodeKind::Args(inner) = &module.node(obj.args).kind else {
        panic!()
    };
    assert_eq!(inner.items.len(), 2);
}

#[test]
fn nested_unbounded_lists_are_rejected() {
    let (_, _, bag) = parse(
        "package demo;\n\
         table T { [][]int32 grid; }\n",
    );
    assert!(bag.has(DiagnosticKind::UnexpectedToken));
}

#[test]
fn array_of_list_is_allowed() {
    let (module, script) = parse_clean(
        "package demo;\n\
         table T { [4][]int32 rows; }\n",
    );
    let table = module.script(script).types[0];
    let field = module.as_table(table).unwrap().fields[0];
    let NodeKind::Field(f) = &module.node(field).kind else {
        panic!()
    };
    // Outermost wrapper comes from the first prefix.
    let NodeKind::Seq(outer) = &module.node(f.ty).kind else {
        panic!()
    };
    assert_eq!(outer.size, 4);
    let NodeKind::Seq(inner) = &module.node(outer.component).kind else {
        panic!()
    };
    assert_eq!(inner.size, -1);
}

#[test]
fn array_size_is_not_bounded() {
    let (module, script) = parse_clean(
        "package demo;\n\
         table T { [100000]byte blob; [4294967296]byte wide; }\n",
    );
    let table = module.script(script).types[0];
    let fields = &module.as_table(table).unwrap().fields;

    let NodeKind::Field(f) = &module.node(fields[0]).kind else {
        panic!()
    };
    let NodeKind::Seq(seq) = &module.node(f.ty).kind else {
        panic!("blob should be a sequence")
    };
    assert_eq!(seq.size, 100_000);

    let NodeKind::Field(f) = &module.node(fields[1]).kind else {
        panic!()
    };
    let NodeKind::Seq(seq) = &module.node(f.ty).kind else {
        panic!("wide should be a sequence")
    };
    assert_eq!(seq.size, 4_294_967_296);
}

#[test]
fn comment_attaches_to_adjacent_declaration() {
    let (module, script) = parse_clean(
        "package demo;\n\
         // the user record\n\
         // with two lines of docs\n\
         table User { int32 id; }\n\
         table Free { int32 id; }\n",
    );
    let types = &module.script(script).types;
    let user_comment = module.extras(types[0]).comment.as_ref().unwrap();
    assert_eq!(user_comment.text, " the user record\n with two lines of docs");
    assert!(module.extras(types[1]).comment.is_none());
}

#[test]
fn distant_comment_does_not_attach() {
    let (module, script) = parse_clean(
        "package demo;\n\
         // far away\n\
         \n\
         \n\
         table User { int32 id; }\n",
    );
    let table = module.script(script).types[0];
    assert!(module.extras(table).comment.is_none());
}

#[test]
fn spans_round_trip_to_source() {
    let source = "package demo;\n\
                  table User { int32 id; }\n\
                  enum Color { Red }\n";
    let (module, script) = parse_clean(source);
    let types = &module.script(script).types;

    let table_span = module.extras(types[0]).span.unwrap();
    assert!(source[table_span.byte_range()].starts_with("table"));
    assert!(source[table_span.byte_range()].ends_with('}'));
    assert_eq!(table_span.start.line, 2);

    let enum_span = module.extras(types[1]).span.unwrap();
    assert!(source[enum_span.byte_range()].starts_with("enum"));
}

#[test]
fn unexpected_token_is_reported_and_skipped() {
    let (module, script, bag) = parse(
        "package demo;\n\
         ; table T { int32 a; }\n",
    );
    assert!(bag.has(DiagnosticKind::UnexpectedToken));
    // The declaration after the stray token still parses.
    assert_eq!(module.script(script).types.len(), 1);
}

#[test]
fn duplicate_method_and_param_report() {
    let (module, script, bag) = parse(
        "package demo;\n\
         contract C {\n\
             void a();\n\
             void a(int32 x);\n\
             void b(int32 x, string x);\n\
         }\n",
    );
    assert!(bag.has(DiagnosticKind::DuplicateMethod));
    assert!(bag.has(DiagnosticKind::DuplicateParam));
    let contract = module.script(script).types[0];
    assert_eq!(module.as_contract(contract).unwrap().methods.len(), 2);
}

#[test]
fn duplicate_using_alias_reports_name_conflict() {
    let (_, _, bag) = parse(
        "package demo;\n\
         using a.core;\n\
         using b.core;\n",
    );
    assert!(bag.has(DiagnosticKind::NameConflict));
}
