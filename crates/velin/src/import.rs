//! Module imports and includes.

use crate::{
    ast::{Expr, ExprKind, Ident, Imports},
    bail,
    diag::{At, SourceResult, Trace, Tracepoint},
    engine::Engine,
    eval,
    expressions::Eval,
    package::{PackageManifest, PackageSpec, identify},
    scopes::BindingKind,
    span::{FileId, Span},
    types::{Content, Module},
    value::Value,
    vm::Vm,
};

/// Evaluates an import expression.
pub(crate) fn eval_import(vm: &mut Vm<'_, '_>, expr: &Expr) -> SourceResult<Value> {
    let ExprKind::Import { source, new_name, imports } = &expr.kind else {
        unreachable!("eval_import expects an import expression");
    };

    let source_span = source.span;
    let source_value = source.eval(vm)?;
    let resolved = resolve_import_source(vm, source_value, source_span)?;

    match imports {
        None => {
            let name = match new_name {
                Some(ident) => ident.name.clone(),
                None => resolved.default_name(),
            };
            vm.scopes
                .top
                .define_kind(name, resolved.into_value(), expr.span, BindingKind::Module);
        }
        Some(Imports::Wildcard) => {
            // Bindings whose names start with an underscore stay private.
            for (name, value) in resolved.bindings() {
                if name.starts_with('_') {
                    continue;
                }
                vm.scopes
                    .top
                    .define_kind(name, value, expr.span, BindingKind::Module);
            }
        }
        Some(Imports::Items(items)) => {
            let root = resolved.into_value();
            for item in items {
                let mut value = root.clone();
                for component in &item.path {
                    value = resolve_item(&value, component)?;
                }
                let bound = item
                    .rename
                    .as_ref()
                    .or_else(|| item.path.last())
                    .expect("import item without path");
                vm.scopes.top.define_kind(
                    bound.name.clone(),
                    value,
                    bound.span,
                    BindingKind::Module,
                );
            }
        }
    }

    Ok(Value::None)
}

/// Evaluates an include expression to the included module's content.
pub(crate) fn eval_include(vm: &mut Vm<'_, '_>, source: &Expr) -> SourceResult<Content> {
    let source_span = source.span;
    let module = match source.eval(vm)? {
        Value::Str(path) => import_from_path(vm, &path, source_span)?,
        Value::Module(module) => module,
        other => bail!(source_span, "expected path or module, got {}", other.ty()),
    };
    Ok(module.content().clone())
}

/// What an import source resolved to.
enum ImportSource {
    Module(Module),
    Func(crate::types::Func, crate::scopes::Scope),
    Type(crate::value::Type),
}

impl ImportSource {
    /// The name the source binds under when no rename is given.
    fn default_name(&self) -> String {
        match self {
            Self::Module(module) => module.name().as_str().to_owned(),
            Self::Func(func, _) => identify(func.name().unwrap_or("function")),
            Self::Type(ty) => identify(&ty.to_string()),
        }
    }

    /// The exported bindings, in definition order.
    fn bindings(&self) -> Vec<(String, Value)> {
        let scope = match self {
            Self::Module(module) => return collect(module.scope()),
            Self::Func(_, scope) => return collect(scope),
            Self::Type(ty) => ty.scope(),
        };
        collect(&scope)
    }

    /// The source as a value for whole-source and dotted-path binding.
    fn into_value(self) -> Value {
        match self {
            Self::Module(module) => Value::Module(module),
            Self::Func(func, _) => Value::Func(func),
            Self::Type(ty) => Value::Type(ty),
        }
    }
}

fn collect(scope: &crate::scopes::Scope) -> Vec<(String, Value)> {
    scope
        .iter()
        .map(|(name, value)| (name.as_str().to_owned(), value.clone()))
        .collect()
}

/// Coerces an import source value.
fn resolve_import_source(
    vm: &mut Vm<'_, '_>,
    value: Value,
    span: Span,
) -> SourceResult<ImportSource> {
    Ok(match value {
        Value::Str(path) => ImportSource::Module(import_from_path(vm, &path, span)?),
        Value::Module(module) => ImportSource::Module(module),
        Value::Func(func) => match func.scope() {
            Some(scope) => ImportSource::Func(func, scope),
            None => bail!(span, "cannot import from user-defined functions"),
        },
        Value::Type(ty) => ImportSource::Type(ty),
        other => bail!(
            span,
            "expected path, module, function, or type, got {}",
            other.ty()
        ),
    })
}

/// Resolves one component of a dotted import path.
fn resolve_item(value: &Value, component: &Ident) -> SourceResult<Value> {
    value
        .field(&component.name)
        .map_err(|_| crate::error!(component.span, "unresolved import"))
}

/// Loads a module from a path or package specification string.
pub(crate) fn import_from_path(
    vm: &mut Vm<'_, '_>,
    path: &str,
    span: Span,
) -> SourceResult<Module> {
    let id = if path.starts_with('@') {
        let spec: PackageSpec = path.parse().at(span)?;
        resolve_package(vm.engine, &spec, span)?
    } else {
        let Some(current) = vm.file else {
            bail!(span, "cannot access file system from here");
        };
        current.join(path)
    };
    import_file(vm.engine, id, span)
}

/// Resolves a package specification to its entrypoint file.
///
/// The package's manifest is loaded through the world and must match the
/// spec's name and major version, with a minor version of at least the
/// requested one.
fn resolve_package(engine: &mut Engine, spec: &PackageSpec, span: Span) -> SourceResult<FileId> {
    let manifest_id = FileId::new(Some(spec.clone()), "typst.toml");
    let bytes = engine
        .world
        .file(manifest_id)
        .map_err(String::from)
        .at(span)?;
    let manifest = PackageManifest::parse(&bytes).at(span)?;
    manifest.validate(spec).at(span)?;
    Ok(FileId::new(Some(spec.clone()), &manifest.entrypoint))
}

/// Evaluates a file into a module, detecting cycles against the route.
pub(crate) fn import_file(engine: &mut Engine, id: FileId, span: Span) -> SourceResult<Module> {
    if engine.route.contains(id) {
        bail!(span, "cyclic import");
    }
    let source = engine.world.source(id).map_err(String::from).at(span)?;
    eval::eval(engine, &source).trace(|| Tracepoint::Import, span)
}
