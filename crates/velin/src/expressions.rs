//! Evaluation of expressions.

use crate::{
    ast::{
        ArrayItem, BinOp, DictItem, Expr, ExprKind, Markup, MarkupNode, Param, Pattern, UnOp,
    },
    bail,
    binding,
    call,
    diag::{At, SourceResult, StrResult},
    engine::MAX_LOOP_ITERATIONS,
    error,
    eval::{eval_code, eval_markup},
    import, ops,
    span::Span,
    types::{Array, Content, Dict, Elem, ElemKind, Str},
    value::Value,
    vm::{FlowEvent, Vm},
};

/// Evaluation of a syntax node into a value.
pub trait Eval {
    /// The output of evaluating the node.
    type Output;

    /// Evaluates the node to the output value.
    fn eval(&self, vm: &mut Vm<'_, '_>) -> SourceResult<Self::Output>;
}

impl Eval for Expr {
    type Output = Value;

    fn eval(&self, vm: &mut Vm<'_, '_>) -> SourceResult<Self::Output> {
        // A pending flow event short-circuits all further work.
        if vm.flow.is_some() {
            return Ok(Value::None);
        }

        let span = self.span;
        let forbidden = |name: &str| {
            error!(span, "{name} is only allowed directly in code and content blocks")
        };

        let v = match &self.kind {
            ExprKind::None => Value::None,
            ExprKind::Auto => Value::Auto,
            ExprKind::Bool(v) => Value::Bool(*v),
            ExprKind::Int(v) => Value::Int(*v),
            ExprKind::Float(v) => Value::Float(*v),
            ExprKind::Numeric(v, unit) => Value::numeric(*v, *unit),
            ExprKind::Str(raw) => Value::Str(unescape(raw).at(span)?),
            ExprKind::Ident(name) => vm.scopes.get(name).cloned().at(span)?,
            ExprKind::Code(exprs) => {
                vm.scopes.enter();
                let output = eval_code(vm, &mut exprs.iter());
                vm.scopes.exit();
                output?
            }
            ExprKind::Content(markup) => {
                vm.scopes.enter();
                let content = eval_markup(vm, &mut markup.nodes.iter());
                vm.scopes.exit();
                Value::Content(content?)
            }
            ExprKind::Array(items) => Value::Array(eval_array(vm, items)?),
            ExprKind::Dict(items) => Value::Dict(eval_dict(vm, items)?),
            ExprKind::Parenthesized(inner) => inner.eval(vm)?,
            ExprKind::FieldAccess { target, field } => {
                let value = target.eval(vm)?;
                value.field(&field.name).at(field.span)?
            }
            ExprKind::FuncCall { .. } => call::eval_call(vm, self)?,
            ExprKind::Closure(closure) => call::eval_closure_expr(vm, closure, span)?,
            ExprKind::Unary { op, expr } => {
                let value = expr.eval(vm)?;
                match op {
                    UnOp::Pos => ops::pos(value),
                    UnOp::Neg => ops::neg(value),
                    UnOp::Not => ops::not(value),
                }
                .at(span)?
            }
            ExprKind::Binary { op, lhs, rhs } => eval_binary(vm, span, *op, lhs, rhs)?,
            ExprKind::Let { pattern, init } => {
                let value = match init {
                    Some(expr) => expr.eval(vm)?,
                    None => Value::None,
                };
                binding::destructure(vm, pattern, value)?;
                Value::None
            }
            ExprKind::DestructAssign { pattern, value } => {
                let value = value.eval(vm)?;
                binding::destructure_assign(vm, pattern, value)?;
                Value::None
            }
            ExprKind::Set(_) => bail!(forbidden("set")),
            ExprKind::Show(_) => bail!(forbidden("show")),
            ExprKind::Contextual(body) => {
                let func = call::eval_contextual(vm, body, span)?;
                Value::Content(Content::elem(Elem::new(ElemKind::Context(func), span)))
            }
            ExprKind::Conditional { condition, if_body, else_body } => {
                eval_conditional(vm, condition, if_body, else_body.as_deref())?
            }
            ExprKind::While { condition, body } => eval_while(vm, span, condition, body)?,
            ExprKind::For { pattern, iterable, body } => {
                eval_for(vm, span, pattern, iterable, body)?
            }
            ExprKind::Import { .. } => import::eval_import(vm, self)?,
            ExprKind::Include { source } => {
                Value::Content(import::eval_include(vm, source)?)
            }
            ExprKind::Break => {
                if vm.flow.is_none() {
                    vm.flow = Some(FlowEvent::Break(span));
                }
                Value::None
            }
            ExprKind::Continue => {
                if vm.flow.is_none() {
                    vm.flow = Some(FlowEvent::Continue(span));
                }
                Value::None
            }
            ExprKind::Return(body) => {
                let value = body.as_ref().map(|expr| expr.eval(vm)).transpose()?;
                if vm.flow.is_none() {
                    vm.flow = Some(FlowEvent::Return(span, value, false));
                }
                Value::None
            }
        };

        vm.trace(span, &v);
        Ok(v)
    }
}

/// Processes the escape sequences of a string literal.
///
/// Supported sequences are `\n`, `\r`, `\t`, `\\`, `\"`, and `\u{HEX}`.
fn unescape(raw: &str) -> StrResult<Str> {
    if !raw.contains('\\') {
        return Ok(raw.into());
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('u') => {
                let rest = chars.as_str();
                let hex = rest
                    .strip_prefix('{')
                    .and_then(|inner| inner.split_once('}'))
                    .ok_or("invalid escape sequence: \\u")?;
                let (digits, tail) = hex;
                let codepoint = u32::from_str_radix(digits, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("invalid escape sequence: \\u{{{digits}}}"))?;
                out.push(codepoint);
                chars = tail.chars();
            }
            other => {
                let tail = other.map(String::from).unwrap_or_default();
                return Err(format!("invalid escape sequence: \\{tail}"));
            }
        }
    }
    Ok(out.into())
}

/// Evaluates an array literal.
fn eval_array(vm: &mut Vm<'_, '_>, items: &[ArrayItem]) -> SourceResult<Array> {
    let mut vec = Vec::with_capacity(items.len());
    for item in items {
        match item {
            ArrayItem::Pos(expr) => vec.push(expr.eval(vm)?),
            ArrayItem::Spread(expr) => match expr.eval(vm)? {
                Value::None => {}
                Value::Array(array) => vec.extend(array.into_iter()),
                v => bail!(expr.span, "cannot spread {} into array", v.ty()),
            },
        }
    }
    Ok(Array::from_vec(vec))
}

/// Evaluates a dictionary literal.
fn eval_dict(vm: &mut Vm<'_, '_>, items: &[DictItem]) -> SourceResult<Dict> {
    let mut dict = Dict::new();
    for item in items {
        match item {
            DictItem::Named(name, expr) => {
                dict.insert(name.name.as_str().into(), expr.eval(vm)?);
            }
            DictItem::Keyed(key, expr) => {
                let key = key.eval(vm)?.cast::<Str>().at(key.span)?;
                dict.insert(key, expr.eval(vm)?);
            }
            DictItem::Spread(expr) => match expr.eval(vm)? {
                Value::None => {}
                Value::Dict(other) => {
                    for (key, value) in other {
                        dict.insert(key, value);
                    }
                }
                v => bail!(expr.span, "cannot spread {} into dictionary", v.ty()),
            },
        }
    }
    Ok(dict)
}

/// Evaluates a binary operation.
fn eval_binary(
    vm: &mut Vm<'_, '_>,
    span: Span,
    op: BinOp,
    lhs: &Expr,
    rhs: &Expr,
) -> SourceResult<Value> {
    match op {
        BinOp::Add => apply(vm, span, lhs, rhs, ops::add),
        BinOp::Sub => apply(vm, span, lhs, rhs, ops::sub),
        BinOp::Mul => apply(vm, span, lhs, rhs, ops::mul),
        BinOp::Div => apply(vm, span, lhs, rhs, ops::div),
        BinOp::And => short_circuit(vm, span, lhs, rhs, false),
        BinOp::Or => short_circuit(vm, span, lhs, rhs, true),
        BinOp::Eq => apply(vm, span, lhs, rhs, ops::eq),
        BinOp::Neq => apply(vm, span, lhs, rhs, ops::neq),
        BinOp::Lt => apply(vm, span, lhs, rhs, ops::lt),
        BinOp::Leq => apply(vm, span, lhs, rhs, ops::leq),
        BinOp::Gt => apply(vm, span, lhs, rhs, ops::gt),
        BinOp::Geq => apply(vm, span, lhs, rhs, ops::geq),
        BinOp::In => apply(vm, span, lhs, rhs, ops::in_),
        BinOp::NotIn => apply(vm, span, lhs, rhs, ops::not_in),
        BinOp::Assign => assign(vm, span, lhs, rhs, |_, b| Ok(b)),
        BinOp::AddAssign => assign(vm, span, lhs, rhs, ops::add),
        BinOp::SubAssign => assign(vm, span, lhs, rhs, ops::sub),
        BinOp::MulAssign => assign(vm, span, lhs, rhs, ops::mul),
        BinOp::DivAssign => assign(vm, span, lhs, rhs, ops::div),
    }
}

/// Applies a plain binary operation.
fn apply(
    vm: &mut Vm<'_, '_>,
    span: Span,
    lhs: &Expr,
    rhs: &Expr,
    op: fn(Value, Value) -> StrResult<Value>,
) -> SourceResult<Value> {
    let lhs = lhs.eval(vm)?;
    let rhs = rhs.eval(vm)?;
    op(lhs, rhs).at(span)
}

/// Applies `and` or `or`, evaluating the right operand only when needed.
fn short_circuit(
    vm: &mut Vm<'_, '_>,
    span: Span,
    lhs: &Expr,
    rhs: &Expr,
    is_or: bool,
) -> SourceResult<Value> {
    let left = lhs.eval(vm)?;
    if left == Value::Bool(is_or) {
        return Ok(left);
    }
    let right = rhs.eval(vm)?;
    if is_or {
        ops::or(left, right).at(span)
    } else {
        ops::and(left, right).at(span)
    }
}

/// Applies an assignment operation.
///
/// The right side is evaluated first, then the left side is re-walked as an
/// access path.
fn assign(
    vm: &mut Vm<'_, '_>,
    span: Span,
    lhs: &Expr,
    rhs: &Expr,
    op: fn(Value, Value) -> StrResult<Value>,
) -> SourceResult<Value> {
    use crate::access::Access;
    let rhs = rhs.eval(vm)?;
    let location = lhs.access(vm)?;
    let lhs = std::mem::take(location);
    *location = op(lhs, rhs).at(span)?;
    Ok(Value::None)
}

/// Evaluates an if-else expression.
///
/// Return events emitted inside either branch are marked conditional.
fn eval_conditional(
    vm: &mut Vm<'_, '_>,
    condition: &Expr,
    if_body: &Expr,
    else_body: Option<&Expr>,
) -> SourceResult<Value> {
    let output = if condition.eval(vm)?.cast::<bool>().at(condition.span)? {
        if_body.eval(vm)?
    } else if let Some(else_body) = else_body {
        else_body.eval(vm)?
    } else {
        Value::None
    };

    if let Some(flow) = &mut vm.flow {
        flow.make_conditional();
    }

    Ok(output)
}

/// Evaluates a while loop.
fn eval_while(
    vm: &mut Vm<'_, '_>,
    span: Span,
    condition: &Expr,
    body: &Expr,
) -> SourceResult<Value> {
    let flow = vm.flow.take();
    let mut output = Value::None;
    let mut i = 0usize;

    while condition.eval(vm)?.cast::<bool>().at(condition.span)? {
        if i == 0 && is_invariant(condition, body) && !can_diverge(body) {
            bail!(
                condition.span,
                "loop seems to be infinite: condition is always true"
            );
        } else if i >= MAX_LOOP_ITERATIONS {
            bail!(span, "loop seems to be infinite");
        }
        i += 1;

        let value = body.eval(vm)?;
        output = ops::join(output, value).at(body.span)?;

        if let Some(event) = &mut vm.flow {
            event.make_conditional();
        }
        match vm.flow {
            Some(FlowEvent::Break(_)) => {
                vm.flow = None;
                break;
            }
            Some(FlowEvent::Continue(_)) => vm.flow = None,
            Some(FlowEvent::Return(..)) => break,
            None => {}
        }
    }

    if flow.is_some() {
        vm.flow = flow;
    }

    Ok(output)
}

/// Evaluates a for loop.
fn eval_for(
    vm: &mut Vm<'_, '_>,
    span: Span,
    pattern: &Pattern,
    iterable: &Expr,
    body: &Expr,
) -> SourceResult<Value> {
    let flow = vm.flow.take();
    // Pattern bindings live in one loop-wide scope entered once.
    vm.scopes.enter();
    let result = eval_for_inner(vm, span, pattern, iterable, body);
    vm.scopes.exit();
    if flow.is_some() {
        vm.flow = flow;
    }
    result
}

fn eval_for_inner(
    vm: &mut Vm<'_, '_>,
    span: Span,
    pattern: &Pattern,
    iterable: &Expr,
    body: &Expr,
) -> SourceResult<Value> {
    let iterated = iterable.eval(vm)?;

    let items: Vec<Value> = match iterated {
        Value::Array(array) => array.into_iter().collect(),
        Value::Dict(dict) => dict
            .into_iter()
            .map(|(key, value)| {
                Value::Array(Array::from_vec(vec![Value::Str(key), value]))
            })
            .collect(),
        Value::Str(string) => {
            reject_destructuring(pattern, "string")?;
            string.clusters().into_iter().map(Value::Str).collect()
        }
        Value::Bytes(bytes) => {
            reject_destructuring(pattern, "bytes")?;
            bytes.iter().map(|&byte| Value::Int(i64::from(byte))).collect()
        }
        Value::Args(args) => args
            .items
            .into_iter()
            .filter(|arg| arg.name.is_none())
            .map(|arg| arg.value.v)
            .collect(),
        other => bail!(iterable.span, "cannot loop over {}", other.ty()),
    };

    let mut output = Value::None;
    for (i, item) in items.into_iter().enumerate() {
        if i >= MAX_LOOP_ITERATIONS {
            bail!(span, "loop seems to be infinite");
        }
        binding::destructure(vm, pattern, item)?;

        let value = body.eval(vm)?;
        output = ops::join(output, value).at(body.span)?;

        if let Some(event) = &mut vm.flow {
            event.make_conditional();
        }
        match vm.flow {
            Some(FlowEvent::Break(_)) => {
                vm.flow = None;
                break;
            }
            Some(FlowEvent::Continue(_)) => vm.flow = None,
            Some(FlowEvent::Return(..)) => break,
            None => {}
        }
    }

    Ok(output)
}

/// Rejects destructuring patterns for iterables whose items are scalar.
fn reject_destructuring(pattern: &Pattern, ty: &str) -> SourceResult<()> {
    let mut inner = pattern;
    while let Pattern::Parenthesized(nested) = inner {
        inner = nested;
    }
    if let Pattern::Destructuring(destructuring) = inner {
        bail!(destructuring.span, "cannot destructure values of {ty}");
    }
    Ok(())
}

/// Whether the expression always evaluates to the same value while the given
/// loop body runs.
///
/// Literals are invariant; identifiers are invariant when the body never
/// assigns to them. Calls and everything else are conservatively variant.
fn is_invariant(expr: &Expr, body: &Expr) -> bool {
    match &expr.kind {
        ExprKind::None
        | ExprKind::Auto
        | ExprKind::Bool(_)
        | ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Numeric(..)
        | ExprKind::Str(_) => true,
        ExprKind::Ident(name) => !assigns_to(body, name),
        ExprKind::Parenthesized(inner) => is_invariant(inner, body),
        ExprKind::Unary { expr, .. } => is_invariant(expr, body),
        ExprKind::Binary { op, lhs, rhs, .. } => {
            !matches!(
                op,
                BinOp::Assign
                    | BinOp::AddAssign
                    | BinOp::SubAssign
                    | BinOp::MulAssign
                    | BinOp::DivAssign
            ) && is_invariant(lhs, body)
                && is_invariant(rhs, body)
        }
        ExprKind::FieldAccess { target, .. } => is_invariant(target, body),
        _ => false,
    }
}

/// Whether the body mutates the named variable.
fn assigns_to(body: &Expr, name: &str) -> bool {
    let mut found = false;
    walk_expr(body, &mut |expr| match &expr.kind {
        ExprKind::Binary { op, lhs, .. }
            if matches!(
                op,
                BinOp::Assign
                    | BinOp::AddAssign
                    | BinOp::SubAssign
                    | BinOp::MulAssign
                    | BinOp::DivAssign
            ) =>
        {
            if access_root(lhs) == Some(name) {
                found = true;
            }
        }
        ExprKind::Let { pattern, .. } | ExprKind::For { pattern, .. } => {
            if pattern.bindings().contains(&name) {
                found = true;
            }
        }
        ExprKind::DestructAssign { pattern, .. } => {
            if pattern.bindings().contains(&name) {
                found = true;
            }
        }
        ExprKind::FuncCall { callee, .. } => {
            // A mutating or accessor method call can write through the target.
            if let ExprKind::FieldAccess { target, field } = &callee.kind {
                if crate::methods::is_mutating_method(&field.name)
                    && access_root(target) == Some(name)
                {
                    found = true;
                }
            }
        }
        _ => {}
    });
    found
}

/// The identifier at the root of an access path, if any.
fn access_root(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Ident(name) => Some(name),
        ExprKind::Parenthesized(inner) => access_root(inner),
        ExprKind::FieldAccess { target, .. } => access_root(target),
        ExprKind::FuncCall { callee, .. } => access_root(callee),
        _ => None,
    }
}

/// Whether the loop body can break out of the loop on its own: through
/// `break`, `return`, or a function call.
fn can_diverge(body: &Expr) -> bool {
    let mut diverges = false;
    walk_expr(body, &mut |expr| {
        if matches!(
            expr.kind,
            ExprKind::Break | ExprKind::Return(_) | ExprKind::FuncCall { .. }
        ) {
            diverges = true;
        }
    });
    diverges
}

/// Walks an expression tree in pre-order, including expressions embedded in
/// markup.
pub(crate) fn walk_expr(expr: &Expr, f: &mut impl FnMut(&Expr)) {
    f(expr);
    if let ExprKind::Content(markup) = &expr.kind {
        walk_markup(markup, f);
        return;
    }
    walk_expr_children(expr, &mut |child| walk_expr(child, f));
}

/// Calls `f` on every direct child expression of `expr`.
///
/// Does not recurse and does not descend into markup; callers that need the
/// whole tree use [`walk_expr`].
pub(crate) fn walk_expr_children(expr: &Expr, f: &mut impl FnMut(&Expr)) {
    match &expr.kind {
        ExprKind::None
        | ExprKind::Auto
        | ExprKind::Bool(_)
        | ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Numeric(..)
        | ExprKind::Str(_)
        | ExprKind::Ident(_)
        | ExprKind::Content(_)
        | ExprKind::Break
        | ExprKind::Continue => {}
        ExprKind::Code(exprs) => {
            for expr in exprs {
                f(expr);
            }
        }
        ExprKind::Array(items) => {
            for item in items {
                match item {
                    ArrayItem::Pos(expr) | ArrayItem::Spread(expr) => f(expr),
                }
            }
        }
        ExprKind::Dict(items) => {
            for item in items {
                match item {
                    DictItem::Named(_, expr) | DictItem::Spread(expr) => f(expr),
                    DictItem::Keyed(key, expr) => {
                        f(key);
                        f(expr);
                    }
                }
            }
        }
        ExprKind::Parenthesized(inner)
        | ExprKind::Contextual(inner)
        | ExprKind::Include { source: inner } => f(inner),
        ExprKind::FieldAccess { target, .. } => f(target),
        ExprKind::FuncCall { callee, args } => {
            f(callee);
            for arg in args {
                match arg {
                    crate::ast::ArgItem::Pos(expr)
                    | crate::ast::ArgItem::Named(_, expr)
                    | crate::ast::ArgItem::Spread(expr) => f(expr),
                }
            }
        }
        ExprKind::Closure(closure) => {
            for param in &closure.params {
                if let Param::Named(_, default) = param {
                    f(default);
                }
            }
            f(&closure.body);
        }
        ExprKind::Unary { expr, .. } => f(expr),
        ExprKind::Binary { lhs, rhs, .. } => {
            f(lhs);
            f(rhs);
        }
        ExprKind::Let { init, .. } => {
            if let Some(init) = init {
                f(init);
            }
        }
        ExprKind::DestructAssign { value, .. } => f(value),
        ExprKind::Set(set) => {
            f(&set.target);
            for arg in &set.args {
                match arg {
                    crate::ast::ArgItem::Pos(expr)
                    | crate::ast::ArgItem::Named(_, expr)
                    | crate::ast::ArgItem::Spread(expr) => f(expr),
                }
            }
            if let Some(condition) = &set.condition {
                f(condition);
            }
        }
        ExprKind::Show(show) => {
            if let Some(selector) = &show.selector {
                f(selector);
            }
            f(&show.transform);
        }
        ExprKind::Conditional { condition, if_body, else_body } => {
            f(condition);
            f(if_body);
            if let Some(else_body) = else_body {
                f(else_body);
            }
        }
        ExprKind::While { condition, body } => {
            f(condition);
            f(body);
        }
        ExprKind::For { iterable, body, .. } => {
            f(iterable);
            f(body);
        }
        ExprKind::Import { source, .. } => f(source),
        ExprKind::Return(value) => {
            if let Some(value) = value {
                f(value);
            }
        }
    }
}

/// Walks all expressions embedded in markup.
pub(crate) fn walk_markup(markup: &Markup, f: &mut impl FnMut(&Expr)) {
    for node in &markup.nodes {
        match node {
            MarkupNode::Strong(body) | MarkupNode::Emph(body) => walk_markup(&body.v, f),
            MarkupNode::Heading { body, .. }
            | MarkupNode::ListItem { body, .. }
            | MarkupNode::EnumItem { body, .. }
            | MarkupNode::Equation { body, .. } => walk_markup(body, f),
            MarkupNode::TermItem { term, description, .. } => {
                walk_markup(term, f);
                walk_markup(description, f);
            }
            MarkupNode::Expr(expr) => walk_expr(expr, f),
            _ => {}
        }
    }
}
