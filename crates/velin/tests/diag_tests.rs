//! Tests for diagnostics: tracepoints, warnings, and the tracer hook.

use pretty_assertions::assert_eq;
use velin::{
    BinOp, Engine, Eval, Expr, FileId, Markup, MarkupNode, Param, Pattern, RecordingTracer,
    Scopes, SourceResult, Span, TestWorld, Tracepoint, Value, Vm, World, eval_main,
};

fn run(expr: Expr) -> SourceResult<Value> {
    let world = TestWorld::new(Markup::default());
    let mut engine = Engine::new(&world);
    let scopes = Scopes::new(Some(world.library()));
    let mut vm = Vm::new(&mut engine, None, scopes);
    expr.eval(&mut vm)
}

/// An error inside a function call gains a call tracepoint as it propagates.
#[test]
fn errors_accumulate_call_tracepoints() {
    // let f() = 1 + "x"; f()  at a real span so the trace frame sticks.
    let file = FileId::new(None, "trace.typ");
    let call_span = Span::new(file, 0, 3);
    let err = run(Expr::code(vec![
        Expr::let_closure(
            "f",
            vec![],
            Expr::binary(BinOp::Add, Expr::int(1), Expr::str("x")),
        ),
        Expr::call_pos(Expr::ident("f"), vec![]).spanned(call_span),
    ]))
    .unwrap_err();

    assert_eq!(err.message, "cannot add integer and string");
    assert_eq!(err.trace.len(), 1);
    assert_eq!(err.trace[0].v, Tracepoint::Call(Some("f".into())));
    assert_eq!(err.trace[0].span, call_span);
}

/// Errors inside imported modules gain an import tracepoint.
#[test]
fn errors_accumulate_import_tracepoints() {
    let file = FileId::new(None, "main.typ");
    let import_span = Span::new(file, 0, 10);
    let main = Markup::new(vec![MarkupNode::Expr(
        Expr::import(Expr::str("bad.typ"), None, None).spanned(import_span),
    )]);
    let world = TestWorld::new(main);
    world.add_source(
        "bad.typ",
        Markup::new(vec![MarkupNode::Expr(Expr::ident("missing"))]),
    );

    let mut engine = Engine::new(&world);
    let err = eval_main(&mut engine).unwrap_err();
    assert_eq!(err.message, "unknown variable: missing");
    assert!(err.trace.iter().any(|point| point.v == Tracepoint::Import));
}

/// An unconditional return that discards joined content warns.
#[test]
fn discarded_content_warns() {
    // let f() = { [*bold*]; return 1 }; f()
    let body = Expr::code(vec![
        Expr::content(Markup::new(vec![MarkupNode::strong(Markup::new(vec![
            MarkupNode::text("bold"),
        ]))])),
        Expr::return_stmt(Some(Expr::int(1))),
    ]);
    let markup = Markup::new(vec![MarkupNode::Expr(Expr::code(vec![
        Expr::let_closure("f", vec![], body),
        Expr::call_pos(Expr::ident("f"), vec![]),
    ]))]);

    let world = TestWorld::new(markup);
    let mut engine = Engine::new(&world);
    eval_main(&mut engine).unwrap();

    let warnings = engine.sink.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].message,
        "this return unconditionally discards the content before it"
    );
    assert_eq!(
        warnings[0].hints[0],
        "try omitting the `return` to automatically join all values"
    );
}

/// A conditional return does not warn.
#[test]
fn conditional_return_does_not_warn() {
    // let f(x) = { [*b*]; if x { return 1 }; 2 }; f(true)
    let body = Expr::code(vec![
        Expr::content(Markup::new(vec![MarkupNode::strong(Markup::new(vec![
            MarkupNode::text("b"),
        ]))])),
        Expr::conditional(
            Expr::ident("x"),
            Expr::code(vec![Expr::return_stmt(Some(Expr::int(1)))]),
            None,
        ),
        Expr::int(2),
    ]);
    let markup = Markup::new(vec![MarkupNode::Expr(Expr::code(vec![
        Expr::let_closure("f", vec![Param::Pos(Pattern::ident("x"))], body),
        Expr::call_pos(Expr::ident("f"), vec![Expr::bool(true)]),
    ]))]);

    let world = TestWorld::new(markup);
    let mut engine = Engine::new(&world);
    eval_main(&mut engine).unwrap();
    assert!(engine.sink.warnings().is_empty());
}

/// The tracer observes the value of the inspected expression.
#[test]
fn tracer_records_inspected_values() {
    let file = FileId::new(None, "inspect.typ");
    let inspected = Span::new(file, 4, 9);

    let world = TestWorld::new(Markup::default());
    let (tracer, handle) = RecordingTracer::new();
    let mut engine = Engine::new(&world).with_tracer(Box::new(tracer));
    let scopes = Scopes::new(Some(world.library()));
    let mut vm = Vm::new(&mut engine, None, scopes);
    vm.inspected = Some(inspected);

    let expr = Expr::code(vec![
        Expr::let_bind("x", Expr::binary(BinOp::Add, Expr::int(2), Expr::int(3)).spanned(inspected)),
        Expr::ident("x"),
    ]);
    assert_eq!(expr.eval(&mut vm).unwrap(), Value::Int(5));

    let events = handle.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].span, inspected);
    assert_eq!(events[0].value, Value::Int(5));
}

/// Shadowing a standard library function is hinted when the shadow is not
/// callable.
#[test]
fn shadowed_std_function_is_hinted() {
    // let range = 3; range(1)
    let err = run(Expr::code(vec![
        Expr::let_bind("range", Expr::int(3)),
        Expr::call_pos(Expr::ident("range"), vec![Expr::int(1)]),
    ]))
    .unwrap_err();
    assert_eq!(err.message, "expected function, got integer");
    assert!(err.hints[0].contains("shadowed by a local definition"));
}

/// Constants from the standard library cannot be mutated.
#[test]
fn std_constants_are_immutable() {
    let err = run(Expr::binary(BinOp::Assign, Expr::ident("range"), Expr::int(1))).unwrap_err();
    assert_eq!(err.message, "cannot mutate a constant: range");
}
