#![doc = include_str!("../../../README.md")]

mod access;
mod ast;
mod binding;
mod call;
mod cast;
mod diag;
mod engine;
mod eval;
mod expressions;
mod geom;
mod import;
mod library;
mod methods;
mod ops;
mod package;
mod readers;
mod realize;
mod rules;
mod scopes;
mod span;
mod tracer;
mod types;
mod value;
mod vm;
mod world;

pub use crate::{
    access::Access,
    ast::{
        ArgItem, ArrayItem, BinOp, ClosureExpr, Destructuring, DestructuringItem, DictItem,
        Expr, ExprKind, Ident, ImportItem, Imports, Markup, MarkupNode, Param, Pattern,
        SetRule, ShowRule, UnOp, Unit,
    },
    cast::{FromValue, IntoValue},
    diag::{
        At, Error, HintedStrResult, HintedString, Severity, Sink, SourceResult, StrResult,
        Trace, Tracepoint,
    },
    engine::{Engine, MAX_CALL_DEPTH, MAX_LOOP_ITERATIONS, MAX_SHOW_DEPTH, Route},
    eval::{eval, eval_main},
    expressions::Eval,
    geom::{Angle, Fr, Length, Ratio, Rel},
    library::library,
    package::{PackageManifest, PackageSpec, identify},
    readers::{DataFormat, load},
    realize::{collect_text, realize},
    scopes::{Binding, BindingKind, Capturer, Scope, Scopes},
    span::{FileId, Span, Spanned},
    tracer::{NoopTracer, RecordingTracer, TraceEvent, TraceHandle, Tracer},
    types::{
        Arg, Args, Array, Bytes, Closure, Content, Dict, Duration, Elem, ElemKind, Func,
        Label, Module, NativeFuncData, Recipe, Regex, Selector, SetStyle, Str, Style, Styles,
        Symbol, Transformation, Version,
    },
    value::{Type, Value},
    vm::{FlowEvent, Vm, check_forbidden_flow},
    world::{FileError, FileResult, Source, TestWorld, World},
};
