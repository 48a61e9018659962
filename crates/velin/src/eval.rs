//! Evaluation of markup into modules.

use crate::{
    ast::{self, ExprKind, MarkupNode},
    bail,
    diag::{At, SourceResult},
    engine::Engine,
    expressions::Eval,
    ops,
    package::identify,
    rules,
    span::Span,
    types::{Content, Elem, ElemKind, Label, Module, Styles},
    value::Value,
    vm::{FlowEvent, Vm, check_forbidden_flow},
    warning,
    world::Source,
};

/// Evaluates a parsed source file and returns the resulting module.
///
/// The module exposes the file's top-level bindings and the content its
/// markup evaluated to. Sources with parse errors are rejected, as are
/// top-level `break`, `continue`, and `return`.
pub fn eval<'w>(engine: &mut Engine<'w>, source: &Source) -> SourceResult<Module> {
    let id = source.id;

    // Prevent cyclic evaluation. Imports check this against the import span;
    // this is the backstop for direct calls.
    if engine.route.contains(id) {
        bail!(Span::detached(), "cyclic import");
    }

    if let Some(error) = source.errors.first() {
        return Err(Box::new(error.clone()));
    }

    engine.route.push(id);
    let result = eval_module(engine, source);
    engine.route.pop();
    result
}

/// Evaluates the world's main file.
pub fn eval_main<'w>(engine: &mut Engine<'w>) -> SourceResult<Module> {
    let id = engine.world.main_file();
    let source = engine
        .world
        .source(id)
        .map_err(String::from)
        .at(Span::detached())?;
    eval(engine, &source)
}

fn eval_module<'w>(engine: &mut Engine<'w>, source: &Source) -> SourceResult<Module> {
    let id = source.id;
    let world = engine.world;
    let scopes = crate::scopes::Scopes::new(Some(world.library()));
    let mut vm = Vm::new(engine, Some(id), scopes);

    let markup = source.markup.clone();
    let content = eval_markup(&mut vm, &mut markup.nodes.iter())?;

    // Flow events may not escape a module.
    check_forbidden_flow(vm.flow.as_ref(), false, false, false)?;

    let name = match id.package() {
        Some(package) => identify(&package.name),
        None => identify(&id.stem()),
    };

    let Vm { scopes, .. } = vm;
    Ok(Module::new(name, scopes.top, content, Some(id)))
}

/// Evaluates a stream of markup nodes.
///
/// Set and show rules style the remaining tail of the stream. Labels attach
/// to the preceding element.
pub(crate) fn eval_markup<'a>(
    vm: &mut Vm<'_, '_>,
    nodes: &mut std::slice::Iter<'a, MarkupNode>,
) -> SourceResult<Content> {
    let flow = vm.flow.take();
    let mut seq = Content::empty();

    while let Some(node) = nodes.next() {
        match node {
            MarkupNode::Expr(expr) => match &expr.kind {
                ExprKind::Set(set) => {
                    let styles = rules::eval_set(vm, set, expr.span)?;
                    if vm.flow.is_some() {
                        break;
                    }
                    let tail = eval_markup(vm, nodes)?;
                    seq = seq.concat(&tail.styled(styles));
                }
                ExprKind::Show(show) => {
                    let recipe = rules::eval_show(vm, show, expr.span)?;
                    if vm.flow.is_some() {
                        break;
                    }
                    let tail = eval_markup(vm, nodes)?;
                    seq = seq.concat(&tail.styled(Styles::from(recipe)));
                }
                _ => {
                    let value = expr.eval(vm)?;
                    seq = seq.concat(&value.display(expr.span));
                }
            },
            MarkupNode::Label(spanned) => {
                if !seq.labelled(Label::new(spanned.v.as_str())) {
                    vm.engine.sink.warn(warning!(
                        spanned.span,
                        "label `<{}>` is not attached to anything",
                        spanned.v
                    ));
                }
            }
            _ => {
                let content = eval_markup_node(vm, node)?;
                seq = seq.concat(&content);
            }
        }

        if vm.flow.is_some() {
            break;
        }
    }

    if flow.is_some() {
        vm.flow = flow;
    }

    Ok(seq)
}

/// Evaluates a single non-label markup node to content.
fn eval_markup_node(vm: &mut Vm<'_, '_>, node: &MarkupNode) -> SourceResult<Content> {
    let span = node.span();
    Ok(match node {
        MarkupNode::Space(_) => Content::elem(Elem::new(ElemKind::Space, span)),
        MarkupNode::Linebreak(_) => Content::elem(Elem::new(ElemKind::Linebreak, span)),
        MarkupNode::Parbreak(_) => Content::elem(Elem::new(ElemKind::Parbreak, span)),
        MarkupNode::Text(text) => Content::text(text.v.as_str(), span),
        MarkupNode::Escape(c) => Content::text(c.v, span),
        MarkupNode::Shorthand(text) => Content::text(shorthand(&text.v), span),
        MarkupNode::SmartQuote { double, .. } => {
            Content::elem(Elem::new(ElemKind::SmartQuote { double: *double }, span))
        }
        MarkupNode::Strong(body) => {
            let inner = eval_markup(vm, &mut body.v.nodes.iter())?;
            Content::elem(Elem::new(ElemKind::Strong(inner), span))
        }
        MarkupNode::Emph(body) => {
            let inner = eval_markup(vm, &mut body.v.nodes.iter())?;
            Content::elem(Elem::new(ElemKind::Emph(inner), span))
        }
        MarkupNode::Raw { text, lang, block, .. } => Content::elem(Elem::new(
            ElemKind::Raw {
                text: text.as_str().into(),
                lang: lang.as_deref().map(Into::into),
                block: *block,
            },
            span,
        )),
        MarkupNode::Link(url) => Content::elem(Elem::new(
            ElemKind::Link { url: url.v.as_str().into(), body: None },
            span,
        )),
        MarkupNode::Ref(target) => Content::elem(Elem::new(
            ElemKind::Ref(Label::new(target.v.as_str())),
            span,
        )),
        MarkupNode::Heading { level, body, .. } => {
            let inner = eval_markup(vm, &mut body.nodes.iter())?;
            Content::elem(Elem::new(ElemKind::Heading { level: *level, body: inner }, span))
        }
        MarkupNode::ListItem { body, .. } => {
            let inner = eval_markup(vm, &mut body.nodes.iter())?;
            Content::elem(Elem::new(ElemKind::ListItem(inner), span))
        }
        MarkupNode::EnumItem { number, body, .. } => {
            let inner = eval_markup(vm, &mut body.nodes.iter())?;
            Content::elem(Elem::new(
                ElemKind::EnumItem { number: *number, body: inner },
                span,
            ))
        }
        MarkupNode::TermItem { term, description, .. } => {
            let term = eval_markup(vm, &mut term.nodes.iter())?;
            let description = eval_markup(vm, &mut description.nodes.iter())?;
            Content::elem(Elem::new(ElemKind::TermItem { term, description }, span))
        }
        MarkupNode::Equation { block, body, .. } => {
            let inner = eval_markup(vm, &mut body.nodes.iter())?;
            Content::elem(Elem::new(
                ElemKind::Equation { block: *block, body: inner },
                span,
            ))
        }
        MarkupNode::Label(_) | MarkupNode::Expr(_) => unreachable!("handled by the stream"),
    })
}

/// Maps a shorthand token to its Unicode replacement.
fn shorthand(token: &str) -> String {
    match token {
        "~" => "\u{00A0}".into(),
        "---" => "\u{2014}".into(),
        "--" => "\u{2013}".into(),
        "-?" => "\u{00AD}".into(),
        "..." => "\u{2026}".into(),
        _ => match token.strip_prefix('-') {
            Some(digit) if digit.chars().all(|c| c.is_ascii_digit()) => {
                format!("\u{2212}{digit}")
            }
            _ => token.into(),
        },
    }
}

/// Evaluates a stream of code expressions, joining their values.
pub(crate) fn eval_code<'a>(
    vm: &mut Vm<'_, '_>,
    exprs: &mut std::slice::Iter<'a, ast::Expr>,
) -> SourceResult<Value> {
    let flow = vm.flow.take();
    let mut output = Value::None;

    while let Some(expr) = exprs.next() {
        let span = expr.span;
        let value = match &expr.kind {
            ExprKind::Set(set) => {
                let styles = rules::eval_set(vm, set, span)?;
                if vm.flow.is_some() {
                    break;
                }
                let tail = eval_code(vm, exprs)?.display(span);
                Value::Content(tail.styled(styles))
            }
            ExprKind::Show(show) => {
                let recipe = rules::eval_show(vm, show, span)?;
                if vm.flow.is_some() {
                    break;
                }
                let tail = eval_code(vm, exprs)?.display(span);
                Value::Content(tail.styled(Styles::from(recipe)))
            }
            _ => expr.eval(vm)?,
        };

        output = ops::join(output, value).at(span)?;

        if let Some(event) = &vm.flow {
            warn_for_discarded_content(vm.engine, event, &output);
            break;
        }
    }

    if flow.is_some() {
        vm.flow = flow;
    }

    Ok(output)
}

/// Emits a warning when content is discarded by an unconditional return.
fn warn_for_discarded_content(engine: &mut Engine, event: &FlowEvent, joined: &Value) {
    let FlowEvent::Return(span, Some(_), false) = event else { return };
    let Value::Content(tree) = joined else { return };
    if tree.is_empty() {
        return;
    }

    engine.sink.warn(warning!(
        *span,
        "this return unconditionally discards the content before it";
        hint: "try omitting the `return` to automatically join all values"
    ));
}
