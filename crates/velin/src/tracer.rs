use std::sync::{Arc, Mutex};

use crate::{span::Span, value::Value};

/// A single observation reported by the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    /// The span of the inspected expression.
    pub span: Span,
    /// The value the expression evaluated to.
    pub value: Value,
}

/// Receives observations from the evaluator.
///
/// The engine carries exactly one tracer. The VM reports to it whenever an
/// expression whose span matches the inspected span finishes evaluating, which
/// is how IDE-style "what is this value" tooling hooks into the evaluator.
pub trait Tracer: Send {
    /// Called when an inspected expression has been evaluated.
    fn expr_evaluated(&mut self, span: Span, value: &Value);
}

/// A tracer that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn expr_evaluated(&mut self, _span: Span, _value: &Value) {}
}

/// A tracer that records all events into shared storage.
///
/// The recorder hands out a [`TraceHandle`] so the caller can read the events
/// after the evaluation is done, while the engine owns the tracer itself.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

/// Read access to the events collected by a [`RecordingTracer`].
#[derive(Debug, Clone, Default)]
pub struct TraceHandle {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl RecordingTracer {
    /// Creates a recorder and a handle onto its storage.
    pub fn new() -> (Self, TraceHandle) {
        let events = Arc::new(Mutex::new(vec![]));
        (Self { events: Arc::clone(&events) }, TraceHandle { events })
    }
}

impl Tracer for RecordingTracer {
    fn expr_evaluated(&mut self, span: Span, value: &Value) {
        let mut events = self.events.lock().expect("trace storage poisoned");
        events.push(TraceEvent { span, value: value.clone() });
    }
}

impl TraceHandle {
    /// The events recorded so far.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().expect("trace storage poisoned").clone()
    }
}
