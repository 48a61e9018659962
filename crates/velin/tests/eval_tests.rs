//! End-to-end evaluation scenarios.

use pretty_assertions::assert_eq;
use velin::{
    ArgItem, BinOp, Engine, Eval, Expr, Markup, Param, Pattern, Scopes, SourceResult,
    TestWorld, Value, Vm, World,
};

/// Evaluates a single expression against the default standard library.
fn run(expr: Expr) -> SourceResult<Value> {
    let world = TestWorld::new(Markup::default());
    let mut engine = Engine::new(&world);
    let scopes = Scopes::new(Some(world.library()));
    let mut vm = Vm::new(&mut engine, None, scopes);
    expr.eval(&mut vm)
}

/// Evaluates a sequence of statements as a code block.
fn run_block(exprs: Vec<Expr>) -> SourceResult<Value> {
    run(Expr::code(exprs))
}

#[test]
fn arithmetic_with_bindings() {
    // let x = 1 + 2; x * 10  =>  30
    let value = run_block(vec![
        Expr::let_bind("x", Expr::binary(BinOp::Add, Expr::int(1), Expr::int(2))),
        Expr::binary(BinOp::Mul, Expr::ident("x"), Expr::int(10)),
    ])
    .unwrap();
    assert_eq!(value, Value::Int(30));
}

#[test]
fn negative_index_counts_from_the_end() {
    // ("a", "b", "c").at(-1)  =>  "c"
    let array = Expr::array_pos(vec![Expr::str("a"), Expr::str("b"), Expr::str("c")]);
    let value = run(Expr::method(array, "at", vec![Expr::int(-1)])).unwrap();
    assert_eq!(value, Value::Str("c".into()));
}

#[test]
fn dict_insert_updates_in_place() {
    // let d = (:); d.insert("k", 1); d.insert("k", 2); d
    let value = run_block(vec![
        Expr::let_bind("d", Expr::dict(vec![])),
        Expr::method(Expr::ident("d"), "insert", vec![Expr::str("k"), Expr::int(1)]),
        Expr::method(Expr::ident("d"), "insert", vec![Expr::str("k"), Expr::int(2)]),
        Expr::ident("d"),
    ])
    .unwrap();

    let Value::Dict(dict) = value else { panic!("expected dictionary") };
    assert_eq!(dict.len(), 1);
    assert_eq!(dict.get("k"), Value::Int(2));
}

#[test]
fn while_loop_counts_down() {
    // let v = 5; while v > 0 { v = v - 1 }; v  =>  0
    let value = run_block(vec![
        Expr::let_bind("v", Expr::int(5)),
        Expr::while_loop(
            Expr::binary(BinOp::Gt, Expr::ident("v"), Expr::int(0)),
            Expr::code(vec![Expr::binary(
                BinOp::Assign,
                Expr::ident("v"),
                Expr::binary(BinOp::Sub, Expr::ident("v"), Expr::int(1)),
            )]),
        ),
        Expr::ident("v"),
    ])
    .unwrap();
    assert_eq!(value, Value::Int(0));
}

#[test]
fn recursive_closure_calls() {
    // let f(x) = x + 1; f(f(f(10)))  =>  13
    let value = run_block(vec![
        Expr::let_closure(
            "f",
            vec![Param::Pos(Pattern::ident("x"))],
            Expr::binary(BinOp::Add, Expr::ident("x"), Expr::int(1)),
        ),
        Expr::call_pos(
            Expr::ident("f"),
            vec![Expr::call_pos(
                Expr::ident("f"),
                vec![Expr::call_pos(Expr::ident("f"), vec![Expr::int(10)])],
            )],
        ),
    ])
    .unwrap();
    assert_eq!(value, Value::Int(13));
}

#[test]
fn conditional_return_in_closure() {
    // let f(x) = { if x < 0 { return -1 }; x }; (f(-5), f(0), f(3))
    let body = Expr::code(vec![
        Expr::conditional(
            Expr::binary(BinOp::Lt, Expr::ident("x"), Expr::int(0)),
            Expr::code(vec![Expr::return_stmt(Some(Expr::int(-1)))]),
            None,
        ),
        Expr::ident("x"),
    ]);
    let value = run_block(vec![
        Expr::let_closure("f", vec![Param::Pos(Pattern::ident("x"))], body),
        Expr::array_pos(vec![
            Expr::call_pos(Expr::ident("f"), vec![Expr::int(-5)]),
            Expr::call_pos(Expr::ident("f"), vec![Expr::int(0)]),
            Expr::call_pos(Expr::ident("f"), vec![Expr::int(3)]),
        ]),
    ])
    .unwrap();

    let Value::Array(array) = value else { panic!("expected array") };
    assert_eq!(array.as_slice(), &[Value::Int(-1), Value::Int(0), Value::Int(3)]);
}

#[test]
fn filter_then_sum() {
    // (1, 2, 3, 4).filter(x => x > 2).sum()  =>  7
    let array = Expr::array_pos(vec![
        Expr::int(1),
        Expr::int(2),
        Expr::int(3),
        Expr::int(4),
    ]);
    let predicate = Expr::closure(
        vec![Param::Pos(Pattern::ident("x"))],
        Expr::binary(BinOp::Gt, Expr::ident("x"), Expr::int(2)),
    );
    let value = run(Expr::method(
        Expr::method(array, "filter", vec![predicate]),
        "sum",
        vec![],
    ))
    .unwrap();
    assert_eq!(value, Value::Int(7));
}

#[test]
fn zip_pairs_elements() {
    // ("a", "b", "c").zip((1, 2, 3))
    let letters = Expr::array_pos(vec![Expr::str("a"), Expr::str("b"), Expr::str("c")]);
    let numbers = Expr::array_pos(vec![Expr::int(1), Expr::int(2), Expr::int(3)]);
    let value = run(Expr::method(letters, "zip", vec![numbers])).unwrap();

    let Value::Array(zipped) = value else { panic!("expected array") };
    assert_eq!(zipped.len(), 3);
    let Value::Array(first) = zipped.first().unwrap() else { panic!("expected pair") };
    assert_eq!(first.as_slice(), &[Value::Str("a".into()), Value::Int(1)]);
}

#[test]
fn destructuring_round_trips() {
    // let (a, b, c) = (1, "x", true); (a, b, c) recombines to the original.
    let value = run_block(vec![
        Expr::let_pattern(
            Pattern::names(&["a", "b", "c"]),
            Some(Expr::array_pos(vec![
                Expr::int(1),
                Expr::str("x"),
                Expr::bool(true),
            ])),
        ),
        Expr::array_pos(vec![Expr::ident("a"), Expr::ident("b"), Expr::ident("c")]),
    ])
    .unwrap();
    assert_eq!(
        value,
        run(Expr::array_pos(vec![Expr::int(1), Expr::str("x"), Expr::bool(true)])).unwrap()
    );
}

#[test]
fn dict_destructuring_with_sink() {
    // let (a, ..rest) = (a: 1, b: 2, c: 3)
    let dict = Expr::dict(vec![
        velin::DictItem::Named(velin::Ident::new("a"), Expr::int(1)),
        velin::DictItem::Named(velin::Ident::new("b"), Expr::int(2)),
        velin::DictItem::Named(velin::Ident::new("c"), Expr::int(3)),
    ]);
    let pattern = Pattern::Destructuring(velin::Destructuring {
        span: velin::Span::detached(),
        items: vec![
            velin::DestructuringItem::Pattern(Pattern::ident("a")),
            velin::DestructuringItem::Spread(
                velin::Span::detached(),
                Some(velin::Ident::new("rest")),
            ),
        ],
    });
    let value = run_block(vec![
        Expr::let_pattern(pattern, Some(dict)),
        Expr::array_pos(vec![Expr::ident("a"), Expr::ident("rest")]),
    ])
    .unwrap();

    let Value::Array(parts) = value else { panic!("expected array") };
    assert_eq!(parts.first().unwrap(), Value::Int(1));
    let Value::Dict(rest) = parts.last().unwrap() else { panic!("expected dictionary") };
    assert_eq!(rest.len(), 2);
    assert!(rest.contains("b") && rest.contains("c"));
}

#[test]
fn compound_assignment() {
    let value = run_block(vec![
        Expr::let_bind("x", Expr::int(10)),
        Expr::binary(BinOp::AddAssign, Expr::ident("x"), Expr::int(5)),
        Expr::ident("x"),
    ])
    .unwrap();
    assert_eq!(value, Value::Int(15));
}

#[test]
fn accessor_lvalue_assignment() {
    // let a = (1, 2, 3); a.at(1) = 9; a.first() = 0; a
    let value = run_block(vec![
        Expr::let_bind(
            "a",
            Expr::array_pos(vec![Expr::int(1), Expr::int(2), Expr::int(3)]),
        ),
        Expr::binary(
            BinOp::Assign,
            Expr::method(Expr::ident("a"), "at", vec![Expr::int(1)]),
            Expr::int(9),
        ),
        Expr::binary(
            BinOp::Assign,
            Expr::method(Expr::ident("a"), "first", vec![]),
            Expr::int(0),
        ),
        Expr::ident("a"),
    ])
    .unwrap();

    let Value::Array(array) = value else { panic!("expected array") };
    assert_eq!(array.as_slice(), &[Value::Int(0), Value::Int(9), Value::Int(3)]);
}

#[test]
fn field_access_on_dicts_and_errors() {
    let dict = Expr::dict(vec![velin::DictItem::Named(
        velin::Ident::new("size"),
        Expr::int(12),
    )]);
    assert_eq!(run(Expr::field(dict, "size")).unwrap(), Value::Int(12));

    let err = run(Expr::field(Expr::int(1), "size")).unwrap_err();
    assert_eq!(err.message, "cannot access fields on type integer");
}

#[test]
fn unknown_variable_includes_name() {
    let err = run(Expr::ident("nope")).unwrap_err();
    assert_eq!(err.message, "unknown variable: nope");
}

#[test]
fn captured_variables_are_read_only() {
    // let x = 1; let f() = { x = 2 }; f()
    let err = run_block(vec![
        Expr::let_bind("x", Expr::int(1)),
        Expr::let_closure(
            "f",
            vec![],
            Expr::code(vec![Expr::binary(
                BinOp::Assign,
                Expr::ident("x"),
                Expr::int(2),
            )]),
        ),
        Expr::call_pos(Expr::ident("f"), vec![]),
    ])
    .unwrap_err();
    assert_eq!(
        err.message,
        "variables from outside the function are read-only and cannot be modified"
    );
}

#[test]
fn spread_into_call_and_array() {
    // let args = (2, 3); (1, ..args)
    let value = run_block(vec![
        Expr::let_bind("xs", Expr::array_pos(vec![Expr::int(2), Expr::int(3)])),
        Expr::array(vec![
            velin::ArrayItem::Pos(Expr::int(1)),
            velin::ArrayItem::Spread(Expr::ident("xs")),
        ]),
    ])
    .unwrap();
    let Value::Array(array) = value else { panic!("expected array") };
    assert_eq!(array.len(), 3);
}

#[test]
fn string_repeat_and_containment() {
    let value = run(Expr::binary(BinOp::Mul, Expr::int(3), Expr::str("ab"))).unwrap();
    assert_eq!(value, Value::Str("ababab".into()));

    let contained = run(Expr::binary(BinOp::In, Expr::str("ell"), Expr::str("hello"))).unwrap();
    assert_eq!(contained, Value::Bool(true));
}

#[test]
fn named_parameters_use_defaults() {
    // let f(x, step: 10) = x + step; (f(1), f(1, step: 2))
    let value = run_block(vec![
        Expr::let_closure(
            "f",
            vec![
                Param::Pos(Pattern::ident("x")),
                Param::Named(velin::Ident::new("step"), Expr::int(10)),
            ],
            Expr::binary(BinOp::Add, Expr::ident("x"), Expr::ident("step")),
        ),
        Expr::array_pos(vec![
            Expr::call_pos(Expr::ident("f"), vec![Expr::int(1)]),
            Expr::call(
                Expr::ident("f"),
                vec![
                    ArgItem::Pos(Expr::int(1)),
                    ArgItem::Named(velin::Ident::new("step"), Expr::int(2)),
                ],
            ),
        ]),
    ])
    .unwrap();
    let Value::Array(array) = value else { panic!("expected array") };
    assert_eq!(array.as_slice(), &[Value::Int(11), Value::Int(3)]);
}

#[test]
fn sink_collects_extra_arguments() {
    // let f(first, ..rest) = rest.pos().len(); f(1, 2, 3)
    let value = run_block(vec![
        Expr::let_closure(
            "f",
            vec![
                Param::Pos(Pattern::ident("first")),
                Param::Sink(velin::Span::detached(), Some(velin::Ident::new("rest"))),
            ],
            Expr::method(
                Expr::method(Expr::ident("rest"), "pos", vec![]),
                "len",
                vec![],
            ),
        ),
        Expr::call_pos(
            Expr::ident("f"),
            vec![Expr::int(1), Expr::int(2), Expr::int(3)],
        ),
    ])
    .unwrap();
    assert_eq!(value, Value::Int(2));
}

#[test]
fn partial_application_with() {
    // let add(x, y) = x + y; add.with(1)(2)  =>  3
    let value = run_block(vec![
        Expr::let_closure(
            "add",
            vec![
                Param::Pos(Pattern::ident("x")),
                Param::Pos(Pattern::ident("y")),
            ],
            Expr::binary(BinOp::Add, Expr::ident("x"), Expr::ident("y")),
        ),
        Expr::call_pos(
            Expr::method(Expr::ident("add"), "with", vec![Expr::int(1)]),
            vec![Expr::int(2)],
        ),
    ])
    .unwrap();
    assert_eq!(value, Value::Int(3));
}

#[test]
fn for_loop_over_dict_yields_pairs() {
    // let out = (); for (k, v) in (a: 1, b: 2) { out.push(k); out.push(v) }; out
    let dict = Expr::dict(vec![
        velin::DictItem::Named(velin::Ident::new("a"), Expr::int(1)),
        velin::DictItem::Named(velin::Ident::new("b"), Expr::int(2)),
    ]);
    let value = run_block(vec![
        Expr::let_bind("out", Expr::array_pos(vec![])),
        Expr::for_loop(
            Pattern::names(&["k", "v"]),
            dict,
            Expr::code(vec![
                Expr::method(Expr::ident("out"), "push", vec![Expr::ident("k")]),
                Expr::method(Expr::ident("out"), "push", vec![Expr::ident("v")]),
            ]),
        ),
        Expr::ident("out"),
    ])
    .unwrap();

    let Value::Array(array) = value else { panic!("expected array") };
    assert_eq!(
        array.as_slice(),
        &[
            Value::Str("a".into()),
            Value::Int(1),
            Value::Str("b".into()),
            Value::Int(2),
        ]
    );
}

#[test]
fn for_loop_over_string_rejects_destructuring() {
    let err = run(Expr::for_loop(
        Pattern::names(&["a", "b"]),
        Expr::str("hi"),
        Expr::code(vec![]),
    ))
    .unwrap_err();
    assert_eq!(err.message, "cannot destructure values of string");
}
