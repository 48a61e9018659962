use std::fmt;

use crate::{
    bail,
    cast::FromValue,
    diag::{At, SourceResult},
    span::{Span, Spanned},
    types::{Array, Dict, Str},
    value::Value,
};

/// A single argument to a function call.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    /// The span of the whole argument (including a name, if any).
    pub span: Span,
    /// The parameter name for named arguments.
    pub name: Option<Str>,
    /// The argument's value.
    pub value: Spanned<Value>,
}

/// Packed arguments of a function call: a sequence of positional and named
/// items.
///
/// Callees consume arguments through the call protocol: [`expect`](Self::expect)
/// takes the next positional argument, [`find`](Self::find) pops the last
/// named argument with a given name, [`eat`](Self::eat) takes the next
/// positional argument if there is one, and [`finish`](Self::finish) rejects
/// anything left over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    /// The span of the whole argument list.
    pub span: Span,
    /// The remaining arguments, in source order.
    pub items: Vec<Arg>,
}

impl Args {
    /// Creates positional arguments from a list of values.
    pub fn new(span: Span, values: impl IntoIterator<Item = Value>) -> Self {
        let items = values
            .into_iter()
            .map(|value| Arg {
                span,
                name: None,
                value: Spanned::new(value, span),
            })
            .collect();
        Self { span, items }
    }

    /// The number of remaining arguments.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no arguments remain.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends a positional argument.
    pub fn push(&mut self, span: Span, value: Value) {
        self.items.push(Arg { span, name: None, value: Spanned::new(value, span) });
    }

    /// Appends a named argument.
    pub fn push_named(&mut self, span: Span, name: Str, value: Value) {
        self.items.push(Arg { span, name: Some(name), value: Spanned::new(value, span) });
    }

    /// Consumes and casts the next positional argument.
    ///
    /// Fails with `missing argument: {what}` when no positional argument
    /// remains.
    pub fn expect<T: FromValue>(&mut self, what: &str) -> SourceResult<T> {
        match self.eat()? {
            Some(value) => Ok(value),
            None => bail!(self.span, "missing argument: {what}"),
        }
    }

    /// Consumes and casts the next positional argument, if any remains.
    pub fn eat<T: FromValue>(&mut self) -> SourceResult<Option<T>> {
        let Some(index) = self.items.iter().position(|arg| arg.name.is_none()) else {
            return Ok(None);
        };
        let arg = self.items.remove(index);
        T::from_value(arg.value.v).at(arg.value.span).map(Some)
    }

    /// Pops and casts the last named argument with the given name, if present.
    pub fn find<T: FromValue>(&mut self, name: &str) -> SourceResult<Option<T>> {
        let Some(index) = self
            .items
            .iter()
            .rposition(|arg| arg.name.as_deref() == Some(name))
        else {
            return Ok(None);
        };
        let arg = self.items.remove(index);
        T::from_value(arg.value.v).at(arg.value.span).map(Some)
    }

    /// Consumes and casts all remaining positional arguments.
    pub fn all<T: FromValue>(&mut self) -> SourceResult<Vec<T>> {
        let mut values = vec![];
        while let Some(value) = self.eat()? {
            values.push(value);
        }
        Ok(values)
    }

    /// Consumes the first `n` positional arguments, keeping their spans.
    ///
    /// Fails when fewer than `n` positional arguments remain.
    pub fn consume(&mut self, n: usize) -> SourceResult<Vec<Arg>> {
        let mut taken = vec![];
        let mut index = 0;
        while taken.len() < n && index < self.items.len() {
            if self.items[index].name.is_none() {
                taken.push(self.items.remove(index));
            } else {
                index += 1;
            }
        }
        if taken.len() < n {
            bail!(self.span, "not enough arguments");
        }
        Ok(taken)
    }

    /// Takes all remaining arguments out of this list.
    pub fn take(&mut self) -> Self {
        Self { span: self.span, items: std::mem::take(&mut self.items) }
    }

    /// Prepends the arguments of `prior`, used for partially applied
    /// functions where pre-bound arguments come first.
    pub fn chain(mut self, prior: &Self) -> Self {
        let mut items = prior.items.clone();
        items.append(&mut self.items);
        Self { span: self.span, items }
    }

    /// The values of the remaining positional arguments.
    pub fn to_pos(&self) -> Vec<Value> {
        self.items
            .iter()
            .filter(|arg| arg.name.is_none())
            .map(|arg| arg.value.v.clone())
            .collect()
    }

    /// The remaining positional arguments as an array value.
    pub fn pos(&self) -> Array {
        self.to_pos().into_iter().collect()
    }

    /// The remaining named arguments as a dictionary value.
    pub fn named(&self) -> Dict {
        self.items
            .iter()
            .filter_map(|arg| {
                arg.name
                    .clone()
                    .map(|name| (name, arg.value.v.clone()))
            })
            .collect()
    }

    /// The positional argument at `index`, where negative indices count from
    /// the end.
    pub fn at(&self, index: i64, default: Option<Value>) -> crate::diag::StrResult<Value> {
        self.pos().at(index, default)
    }

    /// Fails with `unexpected argument` when any argument remains.
    pub fn finish(self) -> SourceResult<()> {
        let Some(arg) = self.items.first() else { return Ok(()) };
        match &arg.name {
            Some(name) => bail!(arg.span, "unexpected argument: {name}"),
            None => bail!(arg.span, "unexpected argument"),
        }
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("arguments(")?;
        for (index, arg) in self.items.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            if let Some(name) = &arg.name {
                write!(f, "{name}: ")?;
            }
            arg.value.v.fmt(f)?;
        }
        f.write_str(")")
    }
}
