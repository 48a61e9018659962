use crate::{
    diag::Sink,
    span::FileId,
    tracer::{NoopTracer, Tracer},
    world::World,
};

/// The maximum nesting depth of function calls.
pub const MAX_CALL_DEPTH: usize = 256;

/// The maximum number of iterations of a single while loop.
pub const MAX_LOOP_ITERATIONS: usize = 10_000;

/// The maximum recursion depth of show rule realization.
pub const MAX_SHOW_DEPTH: usize = 64;

/// The shared context of an evaluation: the world, the evaluation route, the
/// warning sink, and the tracer.
///
/// While [`Vm`](crate::vm::Vm)s come and go with every module and closure
/// body, one engine lives for the whole evaluation.
pub struct Engine<'w> {
    /// The world the evaluation reads files and packages through.
    pub world: &'w dyn World,
    /// The stack of modules currently being evaluated plus the call depth.
    pub route: Route,
    /// Collects warnings.
    pub sink: Sink,
    /// Receives trace events for inspected expressions.
    pub tracer: Box<dyn Tracer>,
}

impl<'w> Engine<'w> {
    /// Creates an engine over a world.
    pub fn new(world: &'w dyn World) -> Self {
        Self {
            world,
            route: Route::default(),
            sink: Sink::new(),
            tracer: Box::new(NoopTracer),
        }
    }

    /// Replaces the tracer.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Box<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }
}

/// The evaluation route: the ordered list of files currently being evaluated,
/// plus the function call depth.
///
/// The file list detects cyclic imports; pushing a file that is already on
/// the route is an error at the import site. Both the file list and the call
/// depth are maintained symmetrically on every path, including errors.
#[derive(Debug, Default)]
pub struct Route {
    files: Vec<FileId>,
    call_depth: usize,
}

impl Route {
    /// Whether the file is already being evaluated.
    pub fn contains(&self, id: FileId) -> bool {
        self.files.contains(&id)
    }

    /// Pushes a file onto the route before its module is evaluated.
    pub fn push(&mut self, id: FileId) {
        self.files.push(id);
    }

    /// Pops the most recently pushed file after its module was evaluated.
    pub fn pop(&mut self) {
        self.files.pop();
    }

    /// The file currently being evaluated, if any.
    pub fn current(&self) -> Option<FileId> {
        self.files.last().copied()
    }

    /// Whether the call depth is within the given limit.
    pub fn within(&self, limit: usize) -> bool {
        self.call_depth < limit
    }

    /// Increments the call depth on call entry.
    pub fn enter_call(&mut self) {
        self.call_depth += 1;
    }

    /// Decrements the call depth on call exit.
    pub fn exit_call(&mut self) {
        self.call_depth -= 1;
    }
}
