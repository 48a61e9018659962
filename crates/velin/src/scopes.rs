use std::fmt;

use indexmap::IndexMap;

use crate::{
    cast::IntoValue,
    diag::{HintedStrResult, HintedString},
    span::Span,
    types::Str,
    value::Value,
};

/// Who captured a binding into a closure's scope snapshot.
///
/// Captured bindings are read-only; the capturer's category appears in the
/// mutation error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capturer {
    /// A closure captured the binding.
    Function,
    /// A context expression captured the binding.
    Context,
}

impl fmt::Display for Capturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function => f.write_str("function"),
            Self::Context => f.write_str("context expression"),
        }
    }
}

/// What kind of definition a binding stems from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindingKind {
    /// An ordinary let binding or parameter.
    #[default]
    Normal,
    /// A binding of a named closure.
    Closure,
    /// A binding created by an import.
    Module,
}

/// A named slot: a value, the span of its definition, its mutability, and
/// its kind.
#[derive(Debug, Clone)]
pub struct Binding {
    value: Value,
    span: Span,
    capturer: Option<Capturer>,
    kind: BindingKind,
}

impl Binding {
    /// Creates a new mutable binding.
    pub fn new(value: Value, span: Span) -> Self {
        Self { value, span, capturer: None, kind: BindingKind::Normal }
    }

    /// The binding's value.
    pub fn read(&self) -> &Value {
        &self.value
    }

    /// A mutable reference to the value, unless the binding is a read-only
    /// capture.
    pub fn write(&mut self) -> HintedStrResult<&mut Value> {
        match self.capturer {
            None => Ok(&mut self.value),
            Some(capturer) => Err(HintedString::new(format!(
                "variables from outside the {capturer} are read-only and cannot be modified"
            ))),
        }
    }

    /// The span of the binding's definition.
    pub fn span(&self) -> Span {
        self.span
    }

    /// The binding's kind.
    pub fn kind(&self) -> BindingKind {
        self.kind
    }
}

/// An ordered map from names to bindings.
///
/// Iteration yields bindings in definition order, which makes wildcard
/// imports and module export listings deterministic.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    map: IndexMap<Str, Binding>,
}

impl Scope {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a mutable binding with a detached span.
    pub fn define(&mut self, name: impl Into<Str>, value: impl IntoValue) {
        self.define_spanned(name, value, Span::detached());
    }

    /// Defines a mutable binding with the span of its definition site.
    pub fn define_spanned(&mut self, name: impl Into<Str>, value: impl IntoValue, span: Span) {
        self.map.insert(name.into(), Binding::new(value.into_value(), span));
    }

    /// Defines a binding of the given kind.
    pub fn define_kind(
        &mut self,
        name: impl Into<Str>,
        value: impl IntoValue,
        span: Span,
        kind: BindingKind,
    ) {
        let mut binding = Binding::new(value.into_value(), span);
        binding.kind = kind;
        self.map.insert(name.into(), binding);
    }

    /// Defines a read-only binding captured by a closure or context
    /// expression.
    pub fn define_captured(&mut self, name: impl Into<Str>, value: Value, capturer: Capturer) {
        let mut binding = Binding::new(value, Span::detached());
        binding.capturer = Some(capturer);
        self.map.insert(name.into(), binding);
    }

    /// Looks up a binding's value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.map.get(name).map(Binding::read)
    }

    /// Looks up a binding.
    pub fn get_binding(&self, name: &str) -> Option<&Binding> {
        self.map.get(name)
    }

    /// Looks up a binding mutably.
    pub fn get_binding_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.map.get_mut(name)
    }

    /// Whether the scope contains a binding for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// The number of bindings.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the scope has no bindings.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over the bindings in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&Str, &Value)> {
        self.map.iter().map(|(name, binding)| (name, binding.read()))
    }
}

/// The scope stack during evaluation: a hierarchy of lexical scopes over an
/// optional base scope holding the standard library.
///
/// Scopes are entered on block entry and exited on block exit on every path,
/// including through flow events and errors.
#[derive(Debug, Clone)]
pub struct Scopes<'a> {
    /// The active scope.
    pub top: Scope,
    /// The stack of suspended outer scopes, innermost last.
    pub scopes: Vec<Scope>,
    /// The standard library.
    pub base: Option<&'a Scope>,
}

impl<'a> Scopes<'a> {
    /// Creates a new hierarchy of scopes over the given base.
    pub fn new(base: Option<&'a Scope>) -> Self {
        Self { top: Scope::new(), scopes: vec![], base }
    }

    /// Enters a new scope.
    pub fn enter(&mut self) {
        self.scopes.push(std::mem::take(&mut self.top));
    }

    /// Exits the active scope.
    ///
    /// # Panics
    /// Panics when called without a matching `enter`.
    pub fn exit(&mut self) {
        self.top = self.scopes.pop().expect("no pushed scope to exit");
    }

    /// Looks up the value of a variable.
    pub fn get(&self, name: &str) -> HintedStrResult<&Value> {
        std::iter::once(&self.top)
            .chain(self.scopes.iter().rev())
            .find_map(|scope| scope.get(name))
            .or_else(|| self.base.and_then(|base| base.get(name)))
            .ok_or_else(|| unknown_variable(name))
    }

    /// Looks up a slot for mutating a variable.
    ///
    /// Fails for unknown variables, read-only captures, and standard library
    /// constants.
    pub fn get_mut(&mut self, name: &str) -> HintedStrResult<&mut Value> {
        let base = self.base;
        let binding = std::iter::once(&mut self.top)
            .chain(self.scopes.iter_mut().rev())
            .find_map(|scope| scope.get_binding_mut(name));
        match binding {
            Some(binding) => binding.write(),
            None => Err(match base.and_then(|base| base.get(name)) {
                Some(_) => HintedString::new(format!("cannot mutate a constant: {name}")),
                None => unknown_variable(name),
            }),
        }
    }

    /// Whether `name` resolves to a standard library binding that is shadowed
    /// by a local definition.
    pub fn check_std_shadowed(&self, name: &str) -> bool {
        self.base.is_some_and(|base| base.contains(name))
            && std::iter::once(&self.top)
                .chain(self.scopes.iter().rev())
                .any(|scope| scope.contains(name))
    }
}

fn unknown_variable(name: &str) -> HintedString {
    let mut unknown = HintedString::new(format!("unknown variable: {name}"));
    if name.contains('-') {
        unknown.hint("if you meant to use subtraction, try adding spaces around the minus sign");
    }
    unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing_and_exit_restores_outer_binding() {
        let mut scopes = Scopes::new(None);
        scopes.top.define("x", Value::Int(1));
        scopes.enter();
        scopes.top.define("x", Value::Int(2));
        assert_eq!(scopes.get("x").unwrap(), &Value::Int(2));
        scopes.exit();
        assert_eq!(scopes.get("x").unwrap(), &Value::Int(1));
    }

    #[test]
    fn captured_bindings_are_read_only() {
        let mut scopes = Scopes::new(None);
        scopes.top.define_captured("x", Value::Int(1), Capturer::Function);
        let err = scopes.get_mut("x").unwrap_err();
        assert_eq!(
            err.message,
            "variables from outside the function are read-only and cannot be modified"
        );
    }

    #[test]
    fn base_bindings_are_constants() {
        let mut base = Scope::new();
        base.define("range", Value::Int(0));
        let mut scopes = Scopes::new(Some(&base));
        assert!(scopes.get("range").is_ok());
        let err = scopes.get_mut("range").unwrap_err();
        assert_eq!(err.message, "cannot mutate a constant: range");
    }
}
