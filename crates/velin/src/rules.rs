//! Evaluation of set and show rules.

use crate::{
    ast::{ExprKind, SetRule, ShowRule},
    bail, call,
    diag::{At, SourceResult},
    expressions::Eval,
    span::Span,
    types::{Func, Recipe, Selector, SetStyle, Style, Styles, Transformation},
    value::Value,
    vm::Vm,
    warning,
};

/// Evaluates a set rule into styles.
///
/// A rule whose condition is false yields empty styles. The target must be an
/// element function; its stored arguments become a style rule entry keyed by
/// the element's name.
pub(crate) fn eval_set(vm: &mut Vm<'_, '_>, set: &SetRule, span: Span) -> SourceResult<Styles> {
    if let Some(condition) = &set.condition {
        if !condition.eval(vm)?.cast::<bool>().at(condition.span)? {
            return Ok(Styles::new());
        }
    }

    let target = set.target.eval(vm)?;
    let func = target
        .cast::<Func>()
        .map_err(|err| call::hint_if_shadowed(vm, &set.target, err))
        .at(set.target.span)?;
    let Some(elem) = func.element() else {
        bail!(set.target.span, "only element functions can be used in set rules");
    };

    let args = call::eval_args(vm, span, &set.args)?;
    Ok(Styles::from(SetStyle { elem: elem.into(), args, span }))
}

/// Evaluates a show rule into a recipe.
pub(crate) fn eval_show(vm: &mut Vm<'_, '_>, show: &ShowRule, span: Span) -> SourceResult<Recipe> {
    let selector = show
        .selector
        .as_ref()
        .map(|expr| {
            let value = expr.eval(vm)?;
            cast_selector(value, expr.span)
        })
        .transpose()?;

    // A `set` transform is lowered to styles before packing.
    let transform = match &show.transform.kind {
        ExprKind::Set(set) => Transformation::Styles(eval_set(vm, set, show.transform.span)?),
        _ => {
            let value = show.transform.eval(vm)?;
            cast_transform(value, show.transform.span)?
        }
    };

    validate_show(vm, selector.as_ref(), &transform, span);

    Ok(Recipe { span, selector, transform })
}

/// Coerces a value to a showable selector.
fn cast_selector(value: Value, span: Span) -> SourceResult<Selector> {
    Ok(match value {
        Value::Func(func) => match func.element() {
            Some(elem) => Selector::Elem(elem.into()),
            None => bail!(span, "only element functions can be used as selectors"),
        },
        Value::Label(label) => Selector::Label(label),
        Value::Str(pattern) => Selector::Text(pattern),
        Value::Regex(regex) => Selector::Regex(regex),
        Value::Type(ty) => Selector::Elem(ty.to_string().into()),
        _ => bail!(span, "expected selector (function, label, string, regex, or type)"),
    })
}

/// Coerces a value to a show transformation.
fn cast_transform(value: Value, span: Span) -> SourceResult<Transformation> {
    Ok(match value {
        Value::None => Transformation::None,
        Value::Content(content) => Transformation::Content(content),
        Value::Str(text) => {
            Transformation::Content(crate::types::Content::text(text, span))
        }
        Value::Symbol(symbol) => {
            Transformation::Content(crate::types::Content::text(symbol.get(), span))
        }
        Value::Styles(styles) => Transformation::Styles(styles),
        Value::Func(func) => Transformation::Func(func),
        other => bail!(
            span,
            "expected transformation (none, content, styles, or function), got {}",
            other.ty()
        ),
    })
}

/// Emits validation warnings for show rules that do nothing or are
/// deprecated.
fn validate_show(
    vm: &mut Vm<'_, '_>,
    selector: Option<&Selector>,
    transform: &Transformation,
    span: Span,
) {
    let Some(Selector::Elem(name)) = selector else { return };

    if name.as_str() == "page" {
        vm.engine.sink.warn(warning!(
            span, "`show page` has no effect";
            hint: "use `set page(..)` instead"
        ));
    }

    if name.as_str() == "par" {
        if let Transformation::Styles(styles) = transform {
            let deprecated = styles.entries().iter().any(|style| {
                matches!(
                    style,
                    Style::Set(set)
                        if set.elem.as_str() == "block"
                            && set.args.items.iter().any(|arg| {
                                arg.name.as_deref() == Some("spacing")
                            })
                )
            });
            if deprecated {
                vm.engine.sink.warn(warning!(
                    span, "`show par: set block(spacing: ..)` is deprecated";
                    hint: "use `set par(spacing: ..)` instead"
                ));
            }
        }
    }
}
