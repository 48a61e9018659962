//! Access to mutable locations.

use crate::{
    ast::{Expr, ExprKind},
    bail,
    call,
    diag::{At, SourceResult},
    methods,
    value::Value,
    vm::Vm,
};

/// Re-walks an expression in access mode, producing a stable in-place
/// reference to a value slot.
///
/// The reference stays valid for the duration of one statement; it is not a
/// persistent value.
pub trait Access {
    /// Accesses the value mutably.
    fn access<'a>(&self, vm: &'a mut Vm<'_, '_>) -> SourceResult<&'a mut Value>;
}

impl Access for Expr {
    fn access<'a>(&self, vm: &'a mut Vm<'_, '_>) -> SourceResult<&'a mut Value> {
        match &self.kind {
            ExprKind::Ident(name) => vm.scopes.get_mut(name).at(self.span),
            ExprKind::Parenthesized(inner) => inner.access(vm),
            ExprKind::FieldAccess { target, field } => {
                let value = target.access(vm)?;
                match value {
                    Value::Dict(dict) => dict.at_mut(&field.name).at(field.span),
                    other => {
                        let ty = other.ty();
                        if matches!(
                            other,
                            Value::Content(_)
                                | Value::Module(_)
                                | Value::Func(_)
                                | Value::Symbol(_)
                                | Value::Version(_)
                        ) {
                            bail!(
                                field.span, "fields on {ty} are not yet mutable";
                                hint: "try creating a new {ty} with the updated field value instead"
                            );
                        }
                        bail!(field.span, "cannot mutate fields on {ty}");
                    }
                }
            }
            ExprKind::FuncCall { callee, args } => {
                // Only accessor method calls can appear on an access path.
                let ExprKind::FieldAccess { target, field } = &callee.kind else {
                    bail!(self.span, "cannot mutate a temporary value");
                };
                if !methods::is_accessor_method(&field.name) {
                    bail!(self.span, "cannot mutate a temporary value");
                }
                let args = call::eval_args(vm, self.span, args)?;
                let slot = target.access(vm)?;
                methods::call_access(slot, &field.name, args, self.span)
            }
            _ => bail!(self.span, "cannot mutate a temporary value"),
        }
    }
}
