use std::{fmt, sync::Arc};

use crate::{
    diag::HintedStrResult,
    scopes::Scope,
    span::FileId,
    types::{Content, Str},
    value::Value,
};

/// An evaluated module, ready for importing or inclusion.
///
/// Modules are cheap to clone; the evaluated state is shared.
#[derive(Debug, Clone)]
pub struct Module(Arc<Repr>);

#[derive(Debug)]
struct Repr {
    /// The module's name, derived from its file stem or package name.
    name: Str,
    /// The top-level bindings, in definition order.
    scope: Scope,
    /// The content the module's markup evaluated to.
    content: Content,
    /// The file the module was evaluated from, if any.
    file: Option<FileId>,
}

impl Module {
    /// Creates a module from its parts.
    pub fn new(name: impl Into<Str>, scope: Scope, content: Content, file: Option<FileId>) -> Self {
        Self(Arc::new(Repr { name: name.into(), scope, content, file }))
    }

    /// The module's name.
    pub fn name(&self) -> &Str {
        &self.0.name
    }

    /// The module's top-level bindings.
    pub fn scope(&self) -> &Scope {
        &self.0.scope
    }

    /// The module's content.
    pub fn content(&self) -> &Content {
        &self.0.content
    }

    /// The file the module was evaluated from, if any.
    pub fn file(&self) -> Option<FileId> {
        self.0.file
    }

    /// Looks up a binding value exported by the module.
    pub fn field(&self, field: &str) -> HintedStrResult<&Value> {
        self.0
            .scope
            .get(field)
            .ok_or_else(|| format!("module `{}` does not contain `{field}`", self.0.name).into())
    }
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<module {}>", self.0.name)
    }
}
