use std::{fmt, sync::Arc};

use crate::{
    ast,
    diag::SourceResult,
    engine::Engine,
    scopes::Scope,
    span::Span,
    types::{Args, Str},
    value::Value,
};

/// A function value.
///
/// Functions compare by identity: two functions are equal only when they stem
/// from the same definition.
#[derive(Debug, Clone)]
pub struct Func {
    repr: Arc<Repr>,
    span: Span,
}

/// The different kinds of function representations.
#[derive(Debug)]
pub(crate) enum Repr {
    /// A function backed by native Rust code.
    Native(&'static NativeFuncData),
    /// A function defined by a closure expression in source code.
    Closure(Closure),
    /// A function with pre-applied arguments.
    With(Func, Args),
}

/// Defines a native function.
pub struct NativeFuncData {
    /// The function's name.
    pub name: &'static str,
    /// The implementation, driving the argument protocol itself.
    pub func: fn(&mut Engine, &mut Args) -> SourceResult<Value>,
    /// The element name, if this function constructs a content element and
    /// may therefore be the target of set and show rules.
    pub element: Option<&'static str>,
    /// Builds the function's associated scope, if it has one. Declarations in
    /// the scope can be imported from the function and accessed as fields.
    pub scope: Option<fn() -> Scope>,
}

impl fmt::Debug for NativeFuncData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFuncData").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A function defined by a closure expression.
///
/// The closure snapshots the scope chain it was created in; the snapshot
/// outlives the defining scope and its bindings are read-only from inside the
/// closure body.
#[derive(Debug)]
pub struct Closure {
    /// The closure's syntax node.
    pub node: Arc<ast::ClosureExpr>,
    /// The name from the enclosing let binding, if any. Enables recursion.
    pub name: Option<Str>,
    /// The captured bindings, flattened into a single scope.
    pub captured: Scope,
    /// The evaluated default values of named parameters, in parameter order.
    pub defaults: Vec<Value>,
    /// How many positional parameters the closure declares.
    pub num_pos_params: usize,
}

impl Func {
    /// Creates a function from native data.
    pub fn native(data: &'static NativeFuncData) -> Self {
        Self { repr: Arc::new(Repr::Native(data)), span: Span::detached() }
    }

    /// Creates a function from a closure.
    pub fn closure(closure: Closure) -> Self {
        Self { repr: Arc::new(Repr::Closure(closure)), span: Span::detached() }
    }

    /// Creates a function with pre-applied arguments.
    pub fn with(self, args: Args) -> Self {
        let span = self.span;
        Self { repr: Arc::new(Repr::With(self, args)), span }
    }

    /// Attaches a definition span to the function.
    #[must_use]
    pub fn spanned(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The function's definition span.
    pub fn span(&self) -> Span {
        self.span
    }

    /// The function's name, if it has one.
    pub fn name(&self) -> Option<&str> {
        match self.repr.as_ref() {
            Repr::Native(data) => Some(data.name),
            Repr::Closure(closure) => closure.name.as_deref(),
            Repr::With(func, _) => func.name(),
        }
    }

    /// The element this function constructs, if it is an element function.
    pub fn element(&self) -> Option<&'static str> {
        match self.repr.as_ref() {
            Repr::Native(data) => data.element,
            Repr::Closure(_) => None,
            Repr::With(func, _) => func.element(),
        }
    }

    /// The function's associated scope, if it has one.
    pub fn scope(&self) -> Option<Scope> {
        match self.repr.as_ref() {
            Repr::Native(data) => data.scope.map(|build| build()),
            Repr::Closure(_) => None,
            Repr::With(func, _) => func.scope(),
        }
    }

    /// The internal representation.
    pub(crate) fn repr(&self) -> &Repr {
        &self.repr
    }
}

impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.repr, &other.repr)
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => f.write_str("(..) => .."),
        }
    }
}
