use crate::{
    ast,
    cast::IntoValue,
    diag::{Error, SourceResult},
    engine::Engine,
    scopes::Scopes,
    span::{FileId, Span},
    value::Value,
    world::World,
};

/// A control flow event that is currently happening.
///
/// At most one event is pending on the VM at any time; emitting another while
/// one is pending is a no-op. The event travels up through the evaluator
/// until a loop (for break and continue) or a function call (for return)
/// catches and clears it.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    /// Stop the innermost loop.
    Break(Span),
    /// Skip to the next iteration of the innermost loop.
    Continue(Span),
    /// Stop execution of the innermost function, optionally with a value.
    ///
    /// The flag records whether the return happened conditionally, inside an
    /// if-else branch or a loop body, as opposed to at the tail of the
    /// function.
    Return(Span, Option<Value>, bool),
}

impl FlowEvent {
    /// The span of the expression that emitted the event.
    pub fn span(&self) -> Span {
        match self {
            Self::Break(span) | Self::Continue(span) | Self::Return(span, _, _) => *span,
        }
    }

    /// Marks a pending return event as conditional.
    pub fn make_conditional(&mut self) {
        if let Self::Return(_, _, conditional) = self {
            *conditional = true;
        }
    }

    /// The error for an event that reached a context it is not allowed in.
    pub fn forbidden(&self) -> Box<Error> {
        let name = match self {
            Self::Break(_) => "break",
            Self::Continue(_) => "continue",
            Self::Return(..) => "return",
        };
        Box::new(Error::new(self.span(), format!("{name} is not allowed here")))
    }
}

/// Checks a pending flow event against what the current context allows.
///
/// Invoked at context boundaries: the top level of a module forbids all
/// three, and non-loop, non-function positions forbid the events their
/// enclosing construct does not handle.
pub fn check_forbidden_flow(
    event: Option<&FlowEvent>,
    allow_break: bool,
    allow_continue: bool,
    allow_return: bool,
) -> SourceResult<()> {
    match event {
        Some(event @ FlowEvent::Break(_)) if !allow_break => Err(event.forbidden()),
        Some(event @ FlowEvent::Continue(_)) if !allow_continue => Err(event.forbidden()),
        Some(event @ FlowEvent::Return(..)) if !allow_return => Err(event.forbidden()),
        _ => Ok(()),
    }
}

/// A virtual machine: the state of a single module or closure body
/// evaluation.
///
/// A new VM is created for each module evaluation and each closure call. The
/// long-lived pieces (route, sink, world access) live on the [`Engine`].
pub struct Vm<'a, 'w> {
    /// The shared evaluation context.
    pub engine: &'a mut Engine<'w>,
    /// The active scope stack.
    pub scopes: Scopes<'w>,
    /// A pending control flow event, if any.
    pub flow: Option<FlowEvent>,
    /// The span whose value the tracer wants to observe.
    pub inspected: Option<Span>,
    /// The file this VM evaluates, if it stems from one.
    pub file: Option<FileId>,
}

impl<'a, 'w> Vm<'a, 'w> {
    /// Creates a new virtual machine.
    pub fn new(engine: &'a mut Engine<'w>, file: Option<FileId>, scopes: Scopes<'w>) -> Self {
        Self { engine, scopes, flow: None, inspected: None, file }
    }

    /// The world the evaluation runs in.
    pub fn world(&self) -> &'w dyn World {
        self.engine.world
    }

    /// Defines a binding in the active scope.
    pub fn define(&mut self, ident: &ast::Ident, value: impl IntoValue) {
        self.scopes
            .top
            .define_spanned(ident.name.clone(), value, ident.span);
    }

    /// Reports an evaluated value to the tracer if its span is inspected.
    pub fn trace(&mut self, span: Span, value: &Value) {
        if self.inspected == Some(span) {
            self.engine.tracer.expr_evaluated(span, value);
        }
    }
}
