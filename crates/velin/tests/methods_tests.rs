//! Tests for the built-in method families on arrays, dictionaries, and
//! strings.

use pretty_assertions::assert_eq;
use velin::{
    BinOp, Engine, Eval, Expr, Markup, Param, Pattern, Scopes, SourceResult, TestWorld,
    Value, Vm, World,
};

fn run(expr: Expr) -> SourceResult<Value> {
    let world = TestWorld::new(Markup::default());
    let mut engine = Engine::new(&world);
    let scopes = Scopes::new(Some(world.library()));
    let mut vm = Vm::new(&mut engine, None, scopes);
    expr.eval(&mut vm)
}

fn run_block(exprs: Vec<Expr>) -> SourceResult<Value> {
    run(Expr::code(exprs))
}

fn ints(values: &[i64]) -> Expr {
    Expr::array_pos(values.iter().map(|&v| Expr::int(v)).collect())
}

#[test]
fn array_slice_and_repeat_laws() {
    // arr.slice(0, arr.len()) == arr
    let value = run_block(vec![
        Expr::let_bind("a", ints(&[1, 2, 3])),
        Expr::binary(
            BinOp::Eq,
            Expr::method(
                Expr::ident("a"),
                "slice",
                vec![Expr::int(0), Expr::method(Expr::ident("a"), "len", vec![])],
            ),
            Expr::ident("a"),
        ),
    ])
    .unwrap();
    assert_eq!(value, Value::Bool(true));

    // (arr * n).len() == arr.len() * n
    let value = run(Expr::method(
        Expr::binary(BinOp::Mul, ints(&[1, 2]), Expr::int(4)),
        "len",
        vec![],
    ))
    .unwrap();
    assert_eq!(value, Value::Int(8));
}

#[test]
fn array_mutating_methods() {
    let value = run_block(vec![
        Expr::let_bind("a", ints(&[1, 2])),
        Expr::method(Expr::ident("a"), "push", vec![Expr::int(3)]),
        Expr::method(Expr::ident("a"), "insert", vec![Expr::int(0), Expr::int(0)]),
        Expr::let_bind(
            "removed",
            Expr::method(Expr::ident("a"), "remove", vec![Expr::int(1)]),
        ),
        Expr::let_bind("popped", Expr::method(Expr::ident("a"), "pop", vec![])),
        Expr::array_pos(vec![
            Expr::ident("a"),
            Expr::ident("removed"),
            Expr::ident("popped"),
        ]),
    ])
    .unwrap();

    let Value::Array(result) = value else { panic!("expected array") };
    let Value::Array(a) = result.first().unwrap() else { panic!("expected array") };
    assert_eq!(a.as_slice(), &[Value::Int(0), Value::Int(2)]);
    assert_eq!(result.at(1, None).unwrap(), Value::Int(1));
    assert_eq!(result.at(2, None).unwrap(), Value::Int(3));
}

#[test]
fn pop_on_empty_array_fails() {
    let err = run_block(vec![
        Expr::let_bind("a", ints(&[])),
        Expr::method(Expr::ident("a"), "pop", vec![]),
    ])
    .unwrap_err();
    assert_eq!(err.message, "array is empty");
}

#[test]
fn at_with_default_recovers_out_of_range() {
    let value = run(Expr::call(
        Expr::field(ints(&[1, 2]), "at"),
        vec![
            velin::ArgItem::Pos(Expr::int(7)),
            velin::ArgItem::Named(velin::Ident::new("default"), Expr::int(0)),
        ],
    ))
    .unwrap();
    assert_eq!(value, Value::Int(0));

    let err = run(Expr::method(ints(&[1, 2]), "at", vec![Expr::int(7)])).unwrap_err();
    assert_eq!(
        err.message,
        "array index out of bounds (index: 7, len: 2) and no default value was specified"
    );
}

#[test]
fn sorted_is_stable_and_supports_keys() {
    // Sort pairs by their first component; equal keys keep their order.
    let pairs = Expr::array_pos(vec![
        Expr::array_pos(vec![Expr::int(2), Expr::str("a")]),
        Expr::array_pos(vec![Expr::int(1), Expr::str("b")]),
        Expr::array_pos(vec![Expr::int(2), Expr::str("c")]),
    ]);
    let key = Expr::closure(
        vec![Param::Pos(Pattern::ident("p"))],
        Expr::method(Expr::ident("p"), "first", vec![]),
    );
    let value = run(Expr::call(
        Expr::field(pairs, "sorted"),
        vec![velin::ArgItem::Named(velin::Ident::new("key"), key)],
    ))
    .unwrap();

    let Value::Array(sorted) = value else { panic!("expected array") };
    let seconds: Vec<Value> = sorted
        .iter()
        .map(|pair| {
            let Value::Array(pair) = pair else { panic!("expected pair") };
            pair.last().unwrap()
        })
        .collect();
    assert_eq!(
        seconds,
        vec![
            Value::Str("b".into()),
            Value::Str("a".into()),
            Value::Str("c".into())
        ]
    );
}

#[test]
fn sorted_aborts_on_incomparable_elements() {
    let mixed = Expr::array_pos(vec![Expr::int(1), Expr::str("a")]);
    let err = run(Expr::method(mixed, "sorted", vec![])).unwrap_err();
    assert_eq!(err.message, "cannot compare integer and string");
}

#[test]
fn array_iteration_helpers() {
    let value = run(Expr::method(
        Expr::array_pos(vec![ints(&[1, 2]), ints(&[3]), Expr::int(4)]),
        "flatten",
        vec![],
    ))
    .unwrap();
    let Value::Array(flat) = value else { panic!("expected array") };
    assert_eq!(
        flat.as_slice(),
        &[Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]
    );

    let value = run(Expr::method(ints(&[1, 2, 3]), "rev", vec![])).unwrap();
    let Value::Array(reversed) = value else { panic!("expected array") };
    assert_eq!(reversed.as_slice(), &[Value::Int(3), Value::Int(2), Value::Int(1)]);

    // fold: (1, 2, 3).fold(10, (acc, x) => acc + x)  =>  16
    let folder = Expr::closure(
        vec![
            Param::Pos(Pattern::ident("acc")),
            Param::Pos(Pattern::ident("x")),
        ],
        Expr::binary(BinOp::Add, Expr::ident("acc"), Expr::ident("x")),
    );
    let value = run(Expr::method(ints(&[1, 2, 3]), "fold", vec![Expr::int(10), folder])).unwrap();
    assert_eq!(value, Value::Int(16));
}

#[test]
fn dict_immutable_methods() {
    let dict = || {
        Expr::dict(vec![
            velin::DictItem::Named(velin::Ident::new("a"), Expr::int(1)),
            velin::DictItem::Named(velin::Ident::new("b"), Expr::int(2)),
        ])
    };

    let value = run(Expr::method(dict(), "keys", vec![])).unwrap();
    let Value::Array(keys) = value else { panic!("expected array") };
    assert_eq!(keys.as_slice(), &[Value::Str("a".into()), Value::Str("b".into())]);

    let value = run(Expr::method(dict(), "get", vec![Expr::str("missing")])).unwrap();
    assert_eq!(value, Value::None);

    let err = run(Expr::method(dict(), "at", vec![Expr::str("missing")])).unwrap_err();
    assert_eq!(err.message, "dictionary does not contain key \"missing\"");
}

#[test]
fn dict_remove_and_clear() {
    let value = run_block(vec![
        Expr::let_bind(
            "d",
            Expr::dict(vec![
                velin::DictItem::Named(velin::Ident::new("a"), Expr::int(1)),
                velin::DictItem::Named(velin::Ident::new("b"), Expr::int(2)),
            ]),
        ),
        Expr::let_bind(
            "removed",
            Expr::method(Expr::ident("d"), "remove", vec![Expr::str("a")]),
        ),
        Expr::array_pos(vec![
            Expr::ident("removed"),
            Expr::method(Expr::ident("d"), "len", vec![]),
        ]),
    ])
    .unwrap();
    let Value::Array(result) = value else { panic!("expected array") };
    assert_eq!(result.as_slice(), &[Value::Int(1), Value::Int(1)]);
}

#[test]
fn string_methods() {
    let value = run(Expr::method(Expr::str("hello world"), "split", vec![])).unwrap();
    let Value::Array(words) = value else { panic!("expected array") };
    assert_eq!(words.len(), 2);

    let value = run(Expr::method(
        Expr::str("hello"),
        "replace",
        vec![Expr::str("l"), Expr::str("L")],
    ))
    .unwrap();
    assert_eq!(value, Value::Str("heLLo".into()));

    let value = run(Expr::method(Expr::str("héllo"), "len", vec![])).unwrap();
    assert_eq!(value, Value::Int(6));

    let value = run(Expr::method(Expr::str("abc"), "rev", vec![])).unwrap();
    assert_eq!(value, Value::Str("cba".into()));

    let value = run(Expr::method(Expr::str("  x "), "trim", vec![])).unwrap();
    assert_eq!(value, Value::Str("x".into()));
}

#[test]
fn unknown_method_reports_type() {
    let err = run_block(vec![
        Expr::let_bind("x", Expr::int(3)),
        Expr::method(Expr::ident("x"), "push", vec![Expr::int(1)]),
    ])
    .unwrap_err();
    assert_eq!(err.message, "type integer has no method `push`");

    // A mutating method on a temporary value cannot even be accessed.
    let err = run(Expr::method(Expr::int(3), "push", vec![Expr::int(1)])).unwrap_err();
    assert_eq!(err.message, "cannot mutate a temporary value");
}

#[test]
fn dict_function_field_call_needs_parens() {
    // (f: () => 1).f() hints at parenthesizing the field access.
    let dict = Expr::dict(vec![velin::DictItem::Named(
        velin::Ident::new("f"),
        Expr::closure(vec![], Expr::int(1)),
    )]);
    let err = run(Expr::method(dict, "f", vec![])).unwrap_err();
    assert_eq!(err.message, "type dictionary has no method `f`");
    assert!(err.hints[0].contains("surround the field access with parentheses"));
}

#[test]
fn extra_arguments_are_rejected() {
    let err = run(Expr::method(ints(&[1]), "len", vec![Expr::int(5)])).unwrap_err();
    assert_eq!(err.message, "unexpected argument");
}
