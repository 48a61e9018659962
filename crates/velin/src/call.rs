//! Function calls and closures.

use std::sync::Arc;

use crate::{
    access::Access,
    ast::{
        ArgItem, ClosureExpr, Destructuring, DestructuringItem, Expr, ExprKind, Imports, Markup,
        MarkupNode, Param, Pattern,
    },
    bail, binding,
    diag::{At, Error, HintedString, SourceResult, Trace, Tracepoint},
    engine::{Engine, MAX_CALL_DEPTH},
    expressions::Eval,
    methods,
    scopes::{Capturer, Scope, Scopes},
    span::Span,
    types::{Args, Closure, Func, func::Repr},
    value::Value,
    vm::{FlowEvent, Vm, check_forbidden_flow},
};

impl Func {
    /// Calls the function with the given arguments.
    ///
    /// This enforces the maximum call depth and dispatches to the native
    /// handler, the closure protocol, or the partially applied inner
    /// function.
    pub fn call(&self, engine: &mut Engine, mut args: Args) -> SourceResult<Value> {
        if !engine.route.within(MAX_CALL_DEPTH) {
            bail!(args.span.or(self.span()), "maximum call depth exceeded");
        }

        engine.route.enter_call();
        let result = match self.repr() {
            Repr::Native(data) => (data.func)(engine, &mut args),
            Repr::Closure(closure) => call_closure(self, closure, engine, args),
            Repr::With(inner, pre) => inner.call(engine, args.chain(pre)),
        };
        engine.route.exit_call();
        result
    }

    /// Calls the function with positional arguments only.
    pub fn call_positional(
        &self,
        engine: &mut Engine,
        values: Vec<Value>,
        span: Span,
    ) -> SourceResult<Value> {
        self.call(engine, Args::new(span, values))
    }
}

/// Evaluates a function call expression.
pub(crate) fn eval_call(vm: &mut Vm<'_, '_>, expr: &Expr) -> SourceResult<Value> {
    let ExprKind::FuncCall { callee, args: arg_items } = &expr.kind else {
        unreachable!("eval_call expects a call expression");
    };
    let span = expr.span;

    // A call on a field access is a method call until proven otherwise.
    let (callee_value, args) = if let ExprKind::FieldAccess { target, field } = &callee.kind {
        let method = field.name.as_str();
        let args = eval_args(vm, span, arg_items)?;

        if methods::is_mutating_method(method) {
            // Mutating methods take their receiver as an lvalue.
            let target_value = {
                let slot = target.access(vm)?;
                if matches!(slot, Value::Array(_) | Value::Dict(_)) {
                    let point = || Tracepoint::Call(Some(field.name.clone()));
                    return methods::call_mut(slot, method, args, span).trace(point, span);
                }
                slot.clone()
            };
            resolve_field_callee(target_value, field, args)?
        } else {
            let target_value = target.eval(vm)?;
            if let Value::Func(func) = &target_value {
                if method == "with" {
                    return Ok(Value::Func(func.clone().with(args)));
                }
            }
            if methods::has_method(&target_value, method) {
                let point = || Tracepoint::Call(Some(field.name.clone()));
                return methods::call(vm.engine, target_value, method, args, span)
                    .trace(point, span);
            }
            resolve_field_callee(target_value, field, args)?
        }
    } else {
        (callee.eval(vm)?, eval_args(vm, span, arg_items)?)
    };

    let func = callee_value
        .cast::<Func>()
        .map_err(|err| hint_if_shadowed(vm, callee, err))
        .at(callee.span)?;

    let point = || Tracepoint::Call(func.name().map(Into::into));
    func.call(vm.engine, args).trace(point, span)
}

/// Resolves a call on a field of a function, type, module, or symbol, which
/// are the values whose fields may themselves be callable.
fn resolve_field_callee(
    target: Value,
    field: &crate::ast::Ident,
    args: Args,
) -> SourceResult<(Value, Args)> {
    match &target {
        Value::Func(_) | Value::Type(_) | Value::Module(_) | Value::Symbol(_) => {
            let callee = target.field(&field.name).at(field.span)?;
            Ok((callee, args))
        }
        _ => {
            let mut err = Error::new(
                field.span,
                format!("type {} has no method `{}`", target.ty(), field.name),
            );
            if let Value::Dict(dict) = &target {
                if matches!(dict.at(&field.name, None), Ok(Value::Func(_))) {
                    err.hint(format!(
                        "to call the function stored in the dictionary, surround \
                         the field access with parentheses, e.g. `(dict.{})(..)`",
                        field.name,
                    ));
                }
            } else if target.field(&field.name).is_ok() {
                err.hint(format!("did you mean to access the field `{}`?", field.name));
            }
            Err(Box::new(err))
        }
    }
}

/// Adds a hint when a failed callee lookup hit a shadowed standard library
/// function.
pub(crate) fn hint_if_shadowed(
    vm: &Vm<'_, '_>,
    callee: &Expr,
    mut err: HintedString,
) -> HintedString {
    if let ExprKind::Ident(name) = &callee.kind {
        if vm.scopes.check_std_shadowed(name) {
            err.hint(format!(
                "the standard library function `{name}` is shadowed by a local definition"
            ));
        }
    }
    err
}

/// Evaluates the items of an argument list into packed arguments.
pub(crate) fn eval_args(
    vm: &mut Vm<'_, '_>,
    span: Span,
    items: &[ArgItem],
) -> SourceResult<Args> {
    let mut args = Args { span, items: vec![] };

    for item in items {
        match item {
            ArgItem::Pos(expr) => {
                let value = expr.eval(vm)?;
                args.items.push(crate::types::Arg {
                    span: expr.span,
                    name: None,
                    value: crate::span::Spanned::new(value, expr.span),
                });
            }
            ArgItem::Named(name, expr) => {
                let value = expr.eval(vm)?;
                args.items.push(crate::types::Arg {
                    span: name.span.or(expr.span),
                    name: Some(name.name.as_str().into()),
                    value: crate::span::Spanned::new(value, expr.span),
                });
            }
            ArgItem::Spread(expr) => match expr.eval(vm)? {
                Value::None => {}
                Value::Array(array) => {
                    for value in array {
                        args.push(expr.span, value);
                    }
                }
                Value::Dict(dict) => {
                    for (key, value) in dict {
                        args.push_named(expr.span, key, value);
                    }
                }
                Value::Args(spread) => args.items.extend(spread.items),
                v => bail!(expr.span, "cannot spread {}", v.ty()),
            },
        }
    }

    Ok(args)
}

/// Evaluates a closure expression into a function value.
pub(crate) fn eval_closure_expr(
    vm: &mut Vm<'_, '_>,
    closure: &Arc<ClosureExpr>,
    span: Span,
) -> SourceResult<Value> {
    // Evaluate default values of named parameters in the defining scope.
    let mut defaults = Vec::new();
    for param in &closure.params {
        if let Param::Named(_, expr) = param {
            defaults.push(expr.eval(vm)?);
        }
    }

    // Collect captured variables as a flattened snapshot.
    let captured = {
        let mut visitor = CapturesVisitor::new(Some(&vm.scopes), Capturer::Function);
        visitor.visit_closure(closure);
        visitor.finish()
    };

    let num_pos_params = closure
        .params
        .iter()
        .filter(|param| matches!(param, Param::Pos(_)))
        .count();

    Ok(Value::Func(
        Func::closure(Closure {
            node: Arc::clone(closure),
            name: closure.name.as_ref().map(|ident| ident.name.as_str().into()),
            captured,
            defaults,
            num_pos_params,
        })
        .spanned(span),
    ))
}

/// Evaluates a contextual expression into its deferred body function.
///
/// The body is not executed; it is packed as a zero-parameter closure that
/// captures the current scope.
pub(crate) fn eval_contextual(
    vm: &mut Vm<'_, '_>,
    body: &Expr,
    span: Span,
) -> SourceResult<Func> {
    let captured = {
        let mut visitor = CapturesVisitor::new(Some(&vm.scopes), Capturer::Context);
        visitor.visit_expr(body);
        visitor.finish()
    };

    let node = Arc::new(ClosureExpr {
        name: None,
        params: vec![],
        body: body.clone(),
        span,
    });

    Ok(Func::closure(Closure {
        node,
        name: None,
        captured,
        defaults: vec![],
        num_pos_params: 0,
    })
    .spanned(span))
}

/// Calls a closure with the given arguments.
fn call_closure(
    func: &Func,
    closure: &Closure,
    engine: &mut Engine,
    mut args: Args,
) -> SourceResult<Value> {
    let node = &closure.node;

    // Don't leak the scopes from the call site: the closure sees only its
    // captured snapshot.
    let mut scopes = Scopes::new(None);
    scopes.top = closure.captured.clone();

    let mut vm = Vm::new(engine, node.span.file(), scopes);

    // Provide the closure itself for recursive calls.
    if let Some(name) = &closure.name {
        vm.scopes.top.define(name.clone(), Value::Func(func.clone()));
    }

    let num_pos_args = args.to_pos().len();
    let sink_size = num_pos_args.checked_sub(closure.num_pos_params);

    let mut sink = None;
    let mut sink_pos_args = None;
    let mut defaults = closure.defaults.iter();
    for param in &node.params {
        match param {
            Param::Pos(pattern) => match pattern {
                Pattern::Normal(expr) if matches!(expr.kind, ExprKind::Ident(_)) => {
                    let ExprKind::Ident(name) = &expr.kind else { unreachable!() };
                    let value: Value = args.expect(name)?;
                    vm.scopes.top.define_spanned(name.as_str(), value, expr.span);
                }
                pattern => {
                    let value: Value = args.expect("pattern parameter")?;
                    binding::destructure(&mut vm, pattern, value)?;
                }
            },
            Param::Sink(_, ident) => {
                sink = Some(ident.clone());
                if let Some(size) = sink_size {
                    sink_pos_args = Some(args.consume(size)?);
                }
            }
            Param::Named(ident, _) => {
                let default = defaults.next().expect("named parameter without default");
                let value = args
                    .find::<Value>(&ident.name)?
                    .unwrap_or_else(|| default.clone());
                vm.scopes.top.define_spanned(ident.name.as_str(), value, ident.span);
            }
        }
    }

    if let Some(sink_ident) = sink {
        // Remaining arguments are consumed regardless of whether the sink is
        // named.
        let mut remaining = args.take();
        if let Some(pos) = sink_pos_args {
            remaining.items.extend(pos);
        }
        if let Some(ident) = sink_ident {
            vm.scopes
                .top
                .define_spanned(ident.name.as_str(), Value::Args(remaining), ident.span);
        }
    }

    // Ensure all arguments have been used.
    args.finish()?;

    let output = node.body.eval(&mut vm)?;

    // A return event ends the call; break and continue may not escape it.
    match vm.flow.take() {
        Some(FlowEvent::Return(_, Some(explicit), _)) => return Ok(explicit),
        Some(FlowEvent::Return(_, None, _)) => {}
        other => check_forbidden_flow(other.as_ref(), false, false, true)?,
    }

    Ok(output)
}

/// A visitor that determines which variables a closure or context expression
/// captures.
///
/// Identifiers that bind new names (parameters, let bindings, loop patterns,
/// imports) shadow outer variables and are tracked in an internal scope
/// hierarchy; everything else that resolves in the external scopes is
/// captured by value.
pub struct CapturesVisitor<'a> {
    external: Option<&'a Scopes<'a>>,
    internal: Scopes<'a>,
    captures: Scope,
    capturer: Capturer,
}

impl<'a> CapturesVisitor<'a> {
    /// Creates a new visitor for the given external scopes.
    pub fn new(external: Option<&'a Scopes<'a>>, capturer: Capturer) -> Self {
        Self {
            external,
            internal: Scopes::new(None),
            captures: Scope::new(),
            capturer,
        }
    }

    /// Returns the scope of captured variables.
    pub fn finish(self) -> Scope {
        self.captures
    }

    /// Visits a closure node, binding its name and parameters before the
    /// body.
    pub fn visit_closure(&mut self, closure: &ClosureExpr) {
        // Default values of named parameters cannot access parameter
        // bindings.
        for param in &closure.params {
            if let Param::Named(_, default) = param {
                self.visit_expr(default);
            }
        }

        self.internal.enter();
        if let Some(name) = &closure.name {
            self.bind(&name.name);
        }
        for param in &closure.params {
            match param {
                Param::Pos(pattern) => self.bind_pattern(pattern),
                Param::Named(name, _) => self.bind(&name.name),
                Param::Sink(_, ident) => {
                    if let Some(ident) = ident {
                        self.bind(&ident.name);
                    }
                }
            }
        }
        self.visit_expr(&closure.body);
        self.internal.exit();
    }

    /// Visits any expression and collects its captures.
    pub fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(name) => self.capture(name),

            // Code and content blocks create a scope.
            ExprKind::Code(exprs) => {
                self.internal.enter();
                for expr in exprs {
                    self.visit_expr(expr);
                }
                self.internal.exit();
            }
            ExprKind::Content(markup) => {
                self.internal.enter();
                self.visit_markup(markup);
                self.internal.exit();
            }

            // Don't capture the field name of a field access.
            ExprKind::FieldAccess { target, .. } => self.visit_expr(target),

            ExprKind::Closure(closure) => self.visit_closure(closure),

            // A let binding is active only after its initializer.
            ExprKind::Let { pattern, init } => {
                if let Some(init) = init {
                    self.visit_expr(init);
                }
                self.bind_pattern(pattern);
            }

            ExprKind::DestructAssign { pattern, value } => {
                self.visit_expr(value);
                self.visit_pattern_targets(pattern);
            }

            // Loop patterns are active between the iterable and the body.
            ExprKind::For { pattern, iterable, body } => {
                self.visit_expr(iterable);
                self.internal.enter();
                self.bind_pattern(pattern);
                self.visit_expr(body);
                self.internal.exit();
            }

            // Import items are active only after the source.
            ExprKind::Import { source, imports, .. } => {
                self.visit_expr(source);
                if let Some(Imports::Items(items)) = imports {
                    for item in items {
                        let bound = item
                            .rename
                            .as_ref()
                            .or_else(|| item.path.last());
                        if let Some(ident) = bound {
                            self.bind(&ident.name);
                        }
                    }
                }
            }

            _ => crate::expressions::walk_expr_children(expr, &mut |child| {
                self.visit_expr(child);
            }),
        }
    }

    /// Visits all expressions embedded in markup.
    pub fn visit_markup(&mut self, markup: &Markup) {
        for node in &markup.nodes {
            match node {
                MarkupNode::Strong(body) | MarkupNode::Emph(body) => {
                    self.visit_markup(&body.v);
                }
                MarkupNode::Heading { body, .. }
                | MarkupNode::ListItem { body, .. }
                | MarkupNode::EnumItem { body, .. }
                | MarkupNode::Equation { body, .. } => self.visit_markup(body),
                MarkupNode::TermItem { term, description, .. } => {
                    self.visit_markup(term);
                    self.visit_markup(description);
                }
                MarkupNode::Expr(expr) => self.visit_expr(expr),
                _ => {}
            }
        }
    }

    /// Binds all names of a pattern internally.
    fn bind_pattern(&mut self, pattern: &Pattern) {
        for name in pattern.bindings() {
            self.internal.top.define(name.to_owned(), Value::None);
        }
    }

    /// Visits the assignable targets of a destructuring assignment, which
    /// read (and therefore capture) existing variables.
    fn visit_pattern_targets(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Normal(expr) => self.visit_expr(expr),
            Pattern::Placeholder(_) => {}
            Pattern::Parenthesized(inner) => self.visit_pattern_targets(inner),
            Pattern::Destructuring(Destructuring { items, .. }) => {
                for item in items {
                    match item {
                        DestructuringItem::Pattern(pattern)
                        | DestructuringItem::Named(_, pattern) => {
                            self.visit_pattern_targets(pattern);
                        }
                        DestructuringItem::Spread(_, Some(ident)) => {
                            self.capture(&ident.name);
                        }
                        DestructuringItem::Spread(_, None) => {}
                    }
                }
            }
        }
    }

    /// Binds a new internal variable.
    fn bind(&mut self, name: &str) {
        self.internal.top.define(name.to_owned(), Value::None);
    }

    /// Captures a variable if it isn't bound internally.
    fn capture(&mut self, name: &str) {
        if self.internal.get(name).is_ok() {
            return;
        }
        match self.external {
            Some(external) => {
                if let Ok(value) = external.get(name) {
                    self.captures.define_captured(name.to_owned(), value.clone(), self.capturer);
                }
            }
            None => {
                self.captures
                    .define_captured(name.to_owned(), Value::None, self.capturer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOp;

    #[track_caller]
    fn test_captures(build: impl FnOnce() -> Expr, expected: &[&str]) {
        let mut base = Scope::new();
        for name in ["f", "x", "y", "z"] {
            base.define(name, Value::Int(0));
        }
        let scopes = Scopes {
            top: base,
            scopes: vec![],
            base: None,
        };

        let mut visitor = CapturesVisitor::new(Some(&scopes), Capturer::Function);
        visitor.visit_expr(&build());

        let captures = visitor.finish();
        let mut names: Vec<_> = captures.iter().map(|(name, _)| name.as_str().to_owned()).collect();
        names.sort();
        assert_eq!(names, expected);
    }

    #[test]
    fn closure_params_shadow_captures() {
        // (x, y) => x + z  captures only z.
        test_captures(
            || {
                Expr::closure(
                    vec![
                        Param::Pos(Pattern::ident("x")),
                        Param::Pos(Pattern::ident("y")),
                    ],
                    Expr::binary(BinOp::Add, Expr::ident("x"), Expr::ident("z")),
                )
            },
            &["z"],
        );
    }

    #[test]
    fn named_default_is_visited_outside() {
        // (x: y, z) => x + z  captures y.
        test_captures(
            || {
                Expr::closure(
                    vec![
                        Param::Named(crate::ast::Ident::new("x"), Expr::ident("y")),
                        Param::Pos(Pattern::ident("z")),
                    ],
                    Expr::binary(BinOp::Add, Expr::ident("x"), Expr::ident("z")),
                )
            },
            &["y"],
        );
    }

    #[test]
    fn let_shadows_after_init() {
        // { let x = x; x } captures the outer x once.
        test_captures(
            || {
                Expr::code(vec![
                    Expr::let_bind("x", Expr::ident("x")),
                    Expr::ident("x"),
                ])
            },
            &["x"],
        );
    }

    #[test]
    fn for_loop_binds_pattern() {
        // for x in y { x + z } captures y and z.
        test_captures(
            || {
                Expr::for_loop(
                    Pattern::ident("x"),
                    Expr::ident("y"),
                    Expr::code(vec![Expr::binary(
                        BinOp::Add,
                        Expr::ident("x"),
                        Expr::ident("z"),
                    )]),
                )
            },
            &["y", "z"],
        );
    }
}
