//! Tests for control flow events, the infinite-loop guard, and the call
//! depth limit.

use pretty_assertions::assert_eq;
use velin::{
    BinOp, Engine, Eval, Expr, Markup, MarkupNode, Param, Pattern, Scopes, SourceResult,
    TestWorld, Value, Vm, World, eval_main,
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

/// `while true { }` is rejected before the first iteration.
#[test]
fn invariant_true_condition_is_rejected() {
    let err = run(Expr::while_loop(Expr::bool(true), Expr::code(vec![]))).unwrap_err();
    assert_eq!(err.message, "loop seems to be infinite: condition is always true");
}

/// A condition reading a variable the body never assigns is invariant too.
#[test]
fn invariant_variable_condition_is_rejected() {
    let err = run_block(vec![
        Expr::let_bind("x", Expr::bool(true)),
        Expr::while_loop(Expr::ident("x"), Expr::code(vec![])),
    ])
    .unwrap_err();
    assert_eq!(err.message, "loop seems to be infinite: condition is always true");
}

/// A body containing `break` disarms the static check.
#[test]
fn break_in_body_disarms_static_check() {
    let value = run(Expr::while_loop(
        Expr::bool(true),
        Expr::code(vec![Expr::break_stmt()]),
    ))
    .unwrap();
    assert_eq!(value, Value::None);
}

/// A dynamically endless loop hits the iteration cap.
#[test]
fn iteration_cap_catches_runaway_loops() {
    // let x = 0; while x >= 0 { x += 1 }
    let err = run_block(vec![
        Expr::let_bind("x", Expr::int(0)),
        Expr::while_loop(
            Expr::binary(BinOp::Geq, Expr::ident("x"), Expr::int(0)),
            Expr::code(vec![Expr::binary(
                BinOp::AddAssign,
                Expr::ident("x"),
                Expr::int(1),
            )]),
        ),
    ])
    .unwrap_err();
    assert_eq!(err.message, "loop seems to be infinite");
}

/// `for i in range(0, 20001) { }` exceeds the iteration cap.
#[test]
fn for_loop_over_huge_range_is_rejected() {
    let err = run(Expr::for_loop(
        Pattern::ident("i"),
        Expr::call_pos(Expr::ident("range"), vec![Expr::int(0), Expr::int(20001)]),
        Expr::code(vec![]),
    ))
    .unwrap_err();
    assert_eq!(err.message, "loop seems to be infinite");
}

/// An unconditionally self-calling closure exhausts the call depth.
#[test]
fn unbounded_recursion_exceeds_call_depth() {
    let err = run_block(vec![
        Expr::let_closure("f", vec![], Expr::call_pos(Expr::ident("f"), vec![])),
        Expr::call_pos(Expr::ident("f"), vec![]),
    ])
    .unwrap_err();
    assert_eq!(err.message, "maximum call depth exceeded");
}

/// Deep but bounded recursion stays within the limit.
#[test]
fn bounded_recursion_succeeds() {
    // let f(n) = { if n > 0 { f(n - 1) } else { 0 } }; f(200)
    let body = Expr::conditional(
        Expr::binary(BinOp::Gt, Expr::ident("n"), Expr::int(0)),
        Expr::call_pos(
            Expr::ident("f"),
            vec![Expr::binary(BinOp::Sub, Expr::ident("n"), Expr::int(1))],
        ),
        Some(Expr::int(0)),
    );
    let value = run_block(vec![
        Expr::let_closure("f", vec![Param::Pos(Pattern::ident("n"))], body),
        Expr::call_pos(Expr::ident("f"), vec![Expr::int(200)]),
    ])
    .unwrap();
    assert_eq!(value, Value::Int(0));
}

/// `break` stops the loop and keeps the joined output so far.
#[test]
fn break_stops_loop() {
    // let n = 0; for i in range(10) { if i == 3 { break }; n += 1 }; n
    let value = run_block(vec![
        Expr::let_bind("n", Expr::int(0)),
        Expr::for_loop(
            Pattern::ident("i"),
            Expr::call_pos(Expr::ident("range"), vec![Expr::int(10)]),
            Expr::code(vec![
                Expr::conditional(
                    Expr::binary(BinOp::Eq, Expr::ident("i"), Expr::int(3)),
                    Expr::code(vec![Expr::break_stmt()]),
                    None,
                ),
                Expr::binary(BinOp::AddAssign, Expr::ident("n"), Expr::int(1)),
            ]),
        ),
        Expr::ident("n"),
    ])
    .unwrap();
    assert_eq!(value, Value::Int(3));
}

/// `continue` skips the rest of the body.
#[test]
fn continue_skips_iteration() {
    // let n = 0; for i in range(6) { if i < 3 { continue }; n += 1 }; n
    let value = run_block(vec![
        Expr::let_bind("n", Expr::int(0)),
        Expr::for_loop(
            Pattern::ident("i"),
            Expr::call_pos(Expr::ident("range"), vec![Expr::int(6)]),
            Expr::code(vec![
                Expr::conditional(
                    Expr::binary(BinOp::Lt, Expr::ident("i"), Expr::int(3)),
                    Expr::code(vec![Expr::continue_stmt()]),
                    None,
                ),
                Expr::binary(BinOp::AddAssign, Expr::ident("n"), Expr::int(1)),
            ]),
        ),
        Expr::ident("n"),
    ])
    .unwrap();
    assert_eq!(value, Value::Int(3));
}

/// A return event travels through loops up to the enclosing call.
#[test]
fn return_travels_through_loop() {
    // let f() = { for i in range(10) { if i == 2 { return i } }; 99 }; f()
    let body = Expr::code(vec![
        Expr::for_loop(
            Pattern::ident("i"),
            Expr::call_pos(Expr::ident("range"), vec![Expr::int(10)]),
            Expr::code(vec![Expr::conditional(
                Expr::binary(BinOp::Eq, Expr::ident("i"), Expr::int(2)),
                Expr::code(vec![Expr::return_stmt(Some(Expr::ident("i")))]),
                None,
            )]),
        ),
        Expr::int(99),
    ]);
    let value = run_block(vec![
        Expr::let_closure("f", vec![], body),
        Expr::call_pos(Expr::ident("f"), vec![]),
    ])
    .unwrap();
    assert_eq!(value, Value::Int(2));
}

/// Flow events may not escape a module's top level.
#[test]
fn top_level_flow_is_forbidden() {
    for (node, message) in [
        (Expr::break_stmt(), "break is not allowed here"),
        (Expr::continue_stmt(), "continue is not allowed here"),
        (Expr::return_stmt(None), "return is not allowed here"),
    ] {
        let world = TestWorld::new(Markup::new(vec![MarkupNode::Expr(node)]));
        let mut engine = Engine::new(&world);
        let err = eval_main(&mut engine).unwrap_err();
        assert_eq!(err.message, message);
    }
}

/// `break` and `continue` may not escape a function body.
#[test]
fn break_may_not_escape_closure() {
    let err = run_block(vec![
        Expr::let_closure("f", vec![], Expr::code(vec![Expr::break_stmt()])),
        Expr::call_pos(Expr::ident("f"), vec![]),
    ])
    .unwrap_err();
    assert_eq!(err.message, "break is not allowed here");
}

/// Emitting a second flow event while one is pending is a no-op.
#[test]
fn flow_events_do_not_stack() {
    // for i in range(3) { break; continue }  completes without error.
    let value = run(Expr::for_loop(
        Pattern::ident("i"),
        Expr::call_pos(Expr::ident("range"), vec![Expr::int(3)]),
        Expr::code(vec![Expr::break_stmt(), Expr::continue_stmt()]),
    ))
    .unwrap();
    assert_eq!(value, Value::None);
}

/// The call-depth counter unwinds correctly after an error, so later calls
/// still work.
#[test]
fn call_depth_unwinds_after_error() {
    let world = TestWorld::new(Markup::default());
    let mut engine = Engine::new(&world);

    let scopes = Scopes::new(Some(world.library()));
    let mut vm = Vm::new(&mut engine, None, scopes);
    let failing = Expr::code(vec![
        Expr::let_closure("f", vec![], Expr::call_pos(Expr::ident("f"), vec![])),
        Expr::call_pos(Expr::ident("f"), vec![]),
    ]);
    assert!(failing.eval(&mut vm).is_err());

    let fine = Expr::call_pos(Expr::ident("range"), vec![Expr::int(3)]);
    assert!(fine.eval(&mut vm).is_ok());
}
