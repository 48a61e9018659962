use std::fmt;

use ahash::AHashSet;
use smallvec::SmallVec;

use crate::span::{Span, Spanned};

/// Result type for failures that carry a source span.
pub type SourceResult<T> = Result<T, Box<Error>>;

/// Result type for failures that are plain messages without a span.
///
/// Spans are attached at the call site via the [`At`] trait.
pub type StrResult<T> = Result<T, String>;

/// Result type for failures that are messages plus optional hints.
pub type HintedStrResult<T> = Result<T, HintedString>;

/// How severe a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// A fatal failure of the enclosing evaluation.
    Error,
    /// A non-fatal observation routed through the [`Sink`].
    Warning,
}

/// A diagnostic produced during evaluation.
///
/// Every failure carries a primary span, a human-readable message, zero or
/// more hints, and the tracepoints accumulated while the failure propagated
/// through function calls, imports, and show rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Error {
    /// Whether this is an error or a warning.
    pub severity: Severity,
    /// The primary location of the failure.
    pub span: Span,
    /// The message describing what went wrong.
    pub message: String,
    /// Suggestions on how to fix the problem.
    pub hints: SmallVec<[String; 1]>,
    /// The stack of frames the failure climbed through, innermost first.
    pub trace: Vec<Spanned<Tracepoint>>,
}

impl Error {
    /// Creates a new error with the given span and message.
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            span,
            message: message.into(),
            hints: SmallVec::new(),
            trace: vec![],
        }
    }

    /// Creates a new warning with the given span and message.
    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, ..Self::new(span, message) }
    }

    /// Adds a hint to the diagnostic.
    pub fn hint(&mut self, hint: impl Into<String>) -> &mut Self {
        self.hints.push(hint.into());
        self
    }

    /// Adds a hint and returns the diagnostic.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint(hint);
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Error {}

/// A message with attached hints, not yet located in source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HintedString {
    /// The message.
    pub message: String,
    /// Suggestions on how to fix the problem.
    pub hints: SmallVec<[String; 1]>,
}

impl HintedString {
    /// Creates a hinted string without hints.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), hints: SmallVec::new() }
    }

    /// Adds a hint.
    pub fn hint(&mut self, hint: impl Into<String>) -> &mut Self {
        self.hints.push(hint.into());
        self
    }

    /// Adds a hint and returns the hinted string.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint(hint);
        self
    }
}

impl From<String> for HintedString {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HintedString {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// A part of a diagnostic's trace, describing the frame a failure climbed
/// through while propagating.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tracepoint {
    /// A function call, with the callee's name if it has one.
    Call(Option<String>),
    /// A module import.
    Import,
    /// The application of a show rule.
    Show(String),
}

impl fmt::Display for Tracepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call(Some(name)) => write!(f, "error occurred in this call of function `{name}`"),
            Self::Call(None) => write!(f, "error occurred in this function call"),
            Self::Import => write!(f, "error occurred while importing this module"),
            Self::Show(name) => write!(f, "error occurred while applying show rule to this {name}"),
        }
    }
}

/// Attaches a span to a plain failure, turning it into a [`SourceResult`].
pub trait At<T> {
    /// Locates the failure at `span`.
    fn at(self, span: Span) -> SourceResult<T>;
}

impl<T, S> At<T> for Result<T, S>
where
    S: Into<HintedString>,
{
    fn at(self, span: Span) -> SourceResult<T> {
        self.map_err(|err| {
            let HintedString { message, hints } = err.into();
            let mut error = Error::new(span, message);
            error.hints = hints;
            Box::new(error)
        })
    }
}

/// Adds a tracepoint to a failure as it climbs out of a frame.
pub trait Trace<T> {
    /// Pushes the tracepoint produced by `make_point`, located at `span`, onto
    /// the failure's trace.
    fn trace(self, make_point: impl FnOnce() -> Tracepoint, span: Span) -> Self;
}

impl<T> Trace<T> for SourceResult<T> {
    fn trace(self, make_point: impl FnOnce() -> Tracepoint, span: Span) -> Self {
        self.map_err(|mut err| {
            // A detached frame adds no useful location.
            if !span.is_detached() {
                err.trace.push(Spanned::new(make_point(), span));
            }
            err
        })
    }
}

/// Collects warnings emitted during an evaluation.
///
/// Warnings are deduplicated by span and message, so a loop body that warns on
/// every iteration surfaces the diagnostic once.
#[derive(Debug, Default)]
pub struct Sink {
    warnings: Vec<Error>,
    seen: AHashSet<(Span, String)>,
}

impl Sink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a warning into the sink.
    pub fn warn(&mut self, warning: Error) {
        debug_assert_eq!(warning.severity, Severity::Warning);
        if self.seen.insert((warning.span, warning.message.clone())) {
            self.warnings.push(warning);
        }
    }

    /// The warnings emitted so far, in emission order.
    pub fn warnings(&self) -> &[Error] {
        &self.warnings
    }

    /// Takes all warnings out of the sink.
    pub fn take_warnings(&mut self) -> Vec<Error> {
        self.seen.clear();
        std::mem::take(&mut self.warnings)
    }
}

/// Constructs a boxed [`Error`] from a span, a format string, and optional
/// `hint:` clauses.
#[macro_export]
macro_rules! error {
    ($span:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        ::std::boxed::Box::new($crate::diag::Error::new($span, format!($fmt $(, $arg)*)))
    };
    ($span:expr, $fmt:literal $(, $arg:expr)* ; $(hint: $hint:literal $(, $harg:expr)* );+ $(;)?) => {{
        let mut error = $crate::diag::Error::new($span, format!($fmt $(, $arg)*));
        $(error.hint(format!($hint $(, $harg)*));)+
        ::std::boxed::Box::new(error)
    }};
}

/// Returns early with an error constructed like [`error!`], or with an
/// existing boxed error.
#[macro_export]
macro_rules! bail {
    ($error:expr) => {
        return Err($error)
    };
    ($span:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        return Err($crate::error!($span, $fmt $(, $arg)*))
    };
    ($span:expr, $fmt:literal $(, $arg:expr)* ; $(hint: $hint:literal $(, $harg:expr)* );+ $(;)?) => {
        return Err($crate::error!($span, $fmt $(, $arg)* ; $(hint: $hint $(, $harg)*);+))
    };
}

/// Constructs a warning-severity [`Error`] for the sink.
#[macro_export]
macro_rules! warning {
    ($span:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::diag::Error::warning($span, format!($fmt $(, $arg)*))
    };
    ($span:expr, $fmt:literal $(, $arg:expr)* ; $(hint: $hint:literal $(, $harg:expr)* );+ $(;)?) => {{
        let mut warning = $crate::diag::Error::warning($span, format!($fmt $(, $arg)*));
        $(warning.hint(format!($hint $(, $harg)*));)+
        warning
    }};
}
