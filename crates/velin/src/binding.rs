//! Binding and destructuring of patterns.

use crate::{
    access::Access,
    ast::{Destructuring, DestructuringItem, Expr, ExprKind, Pattern},
    bail,
    diag::{At, SourceResult},
    scopes::BindingKind,
    types::{Array, Dict, Str},
    value::Value,
    vm::Vm,
};

/// Destructures a value into the current scope, defining new bindings.
pub fn destructure(vm: &mut Vm<'_, '_>, pattern: &Pattern, value: Value) -> SourceResult<()> {
    destructure_impl(vm, pattern, value, &define)
}

/// Destructures a value into existing bindings, writing through access paths.
pub fn destructure_assign(
    vm: &mut Vm<'_, '_>,
    pattern: &Pattern,
    value: Value,
) -> SourceResult<()> {
    destructure_impl(vm, pattern, value, &assign)
}

/// Defines a binding for a normal pattern element.
fn define(vm: &mut Vm<'_, '_>, expr: &Expr, value: Value) -> SourceResult<()> {
    match &expr.kind {
        ExprKind::Ident(name) => {
            let kind = match &value {
                Value::Func(_) => BindingKind::Closure,
                Value::Module(_) => BindingKind::Module,
                _ => BindingKind::Normal,
            };
            vm.scopes.top.define_kind(name.as_str(), value, expr.span, kind);
            Ok(())
        }
        _ => bail!(expr.span, "cannot define a binding for this expression"),
    }
}

/// Writes a value through an access path for a normal pattern element.
fn assign(vm: &mut Vm<'_, '_>, expr: &Expr, value: Value) -> SourceResult<()> {
    let location = expr.access(vm)?;
    *location = value;
    Ok(())
}

type BindSite = dyn Fn(&mut Vm<'_, '_>, &Expr, Value) -> SourceResult<()>;

fn destructure_impl(
    vm: &mut Vm<'_, '_>,
    pattern: &Pattern,
    value: Value,
    f: &BindSite,
) -> SourceResult<()> {
    match pattern {
        Pattern::Normal(expr) => f(vm, expr, value),
        Pattern::Placeholder(_) => Ok(()),
        Pattern::Parenthesized(inner) => destructure_impl(vm, inner, value, f),
        Pattern::Destructuring(destructuring) => match value {
            Value::Array(array) => destructure_array(vm, destructuring, &array, f),
            Value::Dict(dict) => destructure_dict(vm, destructuring, &dict, f),
            other => bail!(destructuring.span, "cannot destructure {}", other.ty()),
        },
    }
}

fn destructure_array(
    vm: &mut Vm<'_, '_>,
    destructuring: &Destructuring,
    array: &Array,
    f: &BindSite,
) -> SourceResult<()> {
    let len = array.len();
    let mut index = 0;

    for item in &destructuring.items {
        match item {
            DestructuringItem::Pattern(pattern) => {
                let Ok(value) = array.at(index as i64, None) else {
                    bail!(destructuring.span, "not enough elements to destructure");
                };
                destructure_impl(vm, pattern, value, f)?;
                index += 1;
            }
            DestructuringItem::Spread(span, sink) => {
                // The sink collects everything the fixed patterns leave over.
                let fixed_after = destructuring.items[..]
                    .iter()
                    .rev()
                    .take_while(|item| !matches!(item, DestructuringItem::Spread(..)))
                    .filter(|item| matches!(item, DestructuringItem::Pattern(_)))
                    .count();
                let Some(sink_len) = (len - index).checked_sub(fixed_after) else {
                    bail!(destructuring.span, "not enough elements to destructure");
                };
                if let Some(ident) = sink {
                    let taken = array
                        .slice(index as i64, Some((index + sink_len) as i64))
                        .at(*span)?;
                    f(vm, &Expr::ident(ident.name.clone()).spanned(ident.span), Value::Array(taken))?;
                }
                index += sink_len;
            }
            DestructuringItem::Named(name, _) => {
                bail!(name.span, "cannot destructure named pattern from an array");
            }
        }
    }

    if index < len {
        bail!(destructuring.span, "too many elements to destructure");
    }

    Ok(())
}

fn destructure_dict(
    vm: &mut Vm<'_, '_>,
    destructuring: &Destructuring,
    dict: &Dict,
    f: &BindSite,
) -> SourceResult<()> {
    let mut used: Vec<Str> = vec![];

    for item in &destructuring.items {
        match item {
            // A bare identifier destructures the key of the same name.
            DestructuringItem::Pattern(Pattern::Normal(expr)) => {
                let ExprKind::Ident(name) = &expr.kind else {
                    bail!(expr.span, "cannot destructure unnamed pattern from dictionary");
                };
                let value = dict.at(name, None).at(expr.span)?;
                f(vm, expr, value)?;
                used.push(name.as_str().into());
            }
            DestructuringItem::Pattern(pattern) => {
                let span = match pattern {
                    Pattern::Placeholder(span) => *span,
                    _ => destructuring.span,
                };
                bail!(span, "cannot destructure unnamed pattern from dictionary");
            }
            DestructuringItem::Named(name, pattern) => {
                let value = dict.at(&name.name, None).at(name.span)?;
                destructure_impl(vm, pattern, value, f)?;
                used.push(name.name.as_str().into());
            }
            DestructuringItem::Spread(_, sink) => {
                if let Some(ident) = sink {
                    let rest: Dict = dict
                        .iter()
                        .filter(|(key, _)| !used.iter().any(|u| u.as_str() == key.as_str()))
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect();
                    f(
                        vm,
                        &Expr::ident(ident.name.clone()).spanned(ident.span),
                        Value::Dict(rest),
                    )?;
                }
            }
        }
    }

    Ok(())
}
