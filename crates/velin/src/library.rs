//! The minimal standard library.
//!
//! Only the bindings the evaluator core itself exercises are provided: the
//! element functions that set and show rules target, and the handful of
//! natives the language semantics lean on. The full standard library is an
//! external collaborator layered on top through [`World::library`].
//!
//! [`World::library`]: crate::world::World::library

use crate::{
    bail,
    diag::{At, SourceResult},
    engine::Engine,
    error,
    readers::{self, DataFormat},
    scopes::Scope,
    span::FileId,
    types::{
        Args, Content, Dict, Elem, ElemKind, Func, Label, Module, NativeFuncData, Regex, Str,
        Symbol,
    },
    value::Value,
};

/// Builds the standard library scope.
pub fn library() -> Scope {
    let mut scope = Scope::new();

    // Element functions.
    for data in [
        &TEXT, &STRONG, &EMPH, &HEADING, &RAW, &LINK, &REF, &SMARTQUOTE, &IMAGE, &COLUMNS,
        &LIST, &ENUM, &TERMS, &PAR, &PAGE, &BLOCK,
    ] {
        scope.define(data.name, Value::Func(Func::native(data)));
    }

    // General-purpose natives.
    for data in [
        &RANGE, &REPR, &TYPE, &PANIC, &ASSERT, &LABEL, &REGEX, &STRFN, &READ, &JSON, &TOML,
        &TODAY,
    ] {
        scope.define(data.name, Value::Func(Func::native(data)));
    }

    scope.define("sym", Value::Module(sym_module()));

    scope
}

/// The `sym` module with a few common symbols.
fn sym_module() -> Module {
    let mut scope = Scope::new();
    scope.define("bullet", Value::Symbol(Symbol::single('\u{2022}')));
    scope.define("copyright", Value::Symbol(Symbol::single('\u{00A9}')));
    scope.define("dash", Value::Symbol(Symbol::with_variants(
        '\u{2014}',
        [(Str::from("en"), '\u{2013}'), (Str::from("em"), '\u{2014}')],
    )));
    scope.define("arrow", Value::Symbol(Symbol::with_variants(
        '\u{2192}',
        [(Str::from("l"), '\u{2190}'), (Str::from("r"), '\u{2192}')],
    )));
    Module::new("sym", scope, Content::empty(), None)
}

macro_rules! native {
    ($ident:ident, $name:literal, $func:ident) => {
        static $ident: NativeFuncData = NativeFuncData {
            name: $name,
            func: $func,
            element: None,
            scope: None,
        };
    };
    ($ident:ident, $name:literal, $func:ident, elem) => {
        static $ident: NativeFuncData = NativeFuncData {
            name: $name,
            func: $func,
            element: Some($name),
            scope: None,
        };
    };
    ($ident:ident, $name:literal, $func:ident, elem, $scope:ident) => {
        static $ident: NativeFuncData = NativeFuncData {
            name: $name,
            func: $func,
            element: Some($name),
            scope: Some($scope),
        };
    };
}

native!(TEXT, "text", text_impl, elem);
native!(STRONG, "strong", strong_impl, elem);
native!(EMPH, "emph", emph_impl, elem);
native!(HEADING, "heading", heading_impl, elem);
native!(RAW, "raw", raw_impl, elem);
native!(LINK, "link", link_impl, elem);
native!(REF, "ref", ref_impl, elem);
native!(SMARTQUOTE, "smartquote", smartquote_impl, elem);
native!(IMAGE, "image", image_impl, elem);
native!(COLUMNS, "columns", columns_impl, elem);
native!(LIST, "list", list_impl, elem, list_scope);
native!(ENUM, "enum", enum_impl, elem, enum_scope);
native!(TERMS, "terms", terms_impl, elem, terms_scope);
native!(PAR, "par", par_impl, elem);
native!(PAGE, "page", page_impl, elem);
native!(BLOCK, "block", block_impl, elem);

native!(RANGE, "range", range_impl);
native!(REPR, "repr", repr_impl);
native!(TYPE, "type", type_impl);
native!(PANIC, "panic", panic_impl);
native!(ASSERT, "assert", assert_impl);
native!(LABEL, "label", label_impl);
native!(REGEX, "regex", regex_impl);
native!(STRFN, "str", str_impl);
native!(READ, "read", read_impl);
native!(JSON, "json", json_impl);
native!(TOML, "toml", toml_impl);
native!(TODAY, "today", today_impl);

static LIST_ITEM: NativeFuncData =
    NativeFuncData { name: "item", func: list_item_impl, element: Some("list.item"), scope: None };
static ENUM_ITEM: NativeFuncData =
    NativeFuncData { name: "item", func: enum_item_impl, element: Some("enum.item"), scope: None };
static TERMS_ITEM: NativeFuncData = NativeFuncData {
    name: "item",
    func: terms_item_impl,
    element: Some("terms.item"),
    scope: None,
};

fn list_scope() -> Scope {
    let mut scope = Scope::new();
    scope.define("item", Value::Func(Func::native(&LIST_ITEM)));
    scope
}

fn enum_scope() -> Scope {
    let mut scope = Scope::new();
    scope.define("item", Value::Func(Func::native(&ENUM_ITEM)));
    scope
}

fn terms_scope() -> Scope {
    let mut scope = Scope::new();
    scope.define("item", Value::Func(Func::native(&TERMS_ITEM)));
    scope
}

fn text_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let body = args.expect::<Str>("body")?;
    args.take().finish()?;
    Ok(Value::Content(Content::text(body, span)))
}

fn strong_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let body = args.expect::<Content>("body")?;
    args.take().finish()?;
    Ok(Value::Content(Content::elem(Elem::new(ElemKind::Strong(body), span))))
}

fn emph_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let body = args.expect::<Content>("body")?;
    args.take().finish()?;
    Ok(Value::Content(Content::elem(Elem::new(ElemKind::Emph(body), span))))
}

fn heading_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let level = args.find::<i64>("level")?.unwrap_or(1);
    let body = args.expect::<Content>("body")?;
    args.take().finish()?;
    Ok(Value::Content(Content::elem(Elem::new(
        ElemKind::Heading { level, body },
        span,
    ))))
}

fn raw_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let text = args.expect::<Str>("text")?;
    let lang = args.find::<Str>("lang")?;
    let block = args.find::<bool>("block")?.unwrap_or(false);
    args.take().finish()?;
    Ok(Value::Content(Content::elem(Elem::new(
        ElemKind::Raw { text, lang, block },
        span,
    ))))
}

fn link_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let url = args.expect::<Str>("dest")?;
    let body = args.eat::<Content>()?;
    args.take().finish()?;
    Ok(Value::Content(Content::elem(Elem::new(ElemKind::Link { url, body }, span))))
}

fn ref_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let target = args.expect::<Label>("target")?;
    args.take().finish()?;
    Ok(Value::Content(Content::elem(Elem::new(ElemKind::Ref(target), span))))
}

fn smartquote_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let double = args.find::<bool>("double")?.unwrap_or(true);
    args.take().finish()?;
    Ok(Value::Content(Content::elem(Elem::new(
        ElemKind::SmartQuote { double },
        span,
    ))))
}

fn image_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let path = args.expect::<Str>("path")?;
    let alt = args.find::<Str>("alt")?;
    args.take().finish()?;
    Ok(Value::Content(Content::elem(Elem::new(ElemKind::Image { path, alt }, span))))
}

fn columns_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let count = args.eat::<i64>()?.unwrap_or(2);
    let body = args.expect::<Content>("body")?;
    args.take().finish()?;
    Ok(Value::Content(Content::elem(Elem::new(
        ElemKind::Columns { count, body },
        span,
    ))))
}

fn list_item_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let body = args.expect::<Content>("body")?;
    args.take().finish()?;
    Ok(Value::Content(Content::elem(Elem::new(ElemKind::ListItem(body), span))))
}

fn enum_item_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let number = args.find::<i64>("number")?;
    let body = args.expect::<Content>("body")?;
    args.take().finish()?;
    Ok(Value::Content(Content::elem(Elem::new(
        ElemKind::EnumItem { number, body },
        span,
    ))))
}

fn terms_item_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let term = args.expect::<Content>("term")?;
    let description = args.expect::<Content>("description")?;
    args.take().finish()?;
    Ok(Value::Content(Content::elem(Elem::new(
        ElemKind::TermItem { term, description },
        span,
    ))))
}

fn list_impl(engine: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    container_impl(engine, args, "list")
}

fn enum_impl(engine: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    container_impl(engine, args, "enum")
}

fn terms_impl(engine: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    container_impl(engine, args, "terms")
}

fn par_impl(engine: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    container_impl(engine, args, "par")
}

fn page_impl(engine: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    container_impl(engine, args, "page")
}

fn block_impl(engine: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    container_impl(engine, args, "block")
}

/// Shared constructor for container elements: named arguments become fields,
/// positional content becomes the body.
fn container_impl(_: &mut Engine, args: &mut Args, name: &'static str) -> SourceResult<Value> {
    let span = args.span;
    let fields: Dict = args.named();
    args.items.retain(|arg| arg.name.is_none());
    let mut children = args.all::<Content>()?;
    args.take().finish()?;
    let body = match children.len() {
        0 => None,
        1 => children.pop(),
        _ => Some(children.into_iter().fold(Content::empty(), |acc, c| acc.concat(&c))),
    };
    Ok(Value::Content(Content::elem(Elem::new(
        ElemKind::Custom { name: name.into(), fields, body },
        span,
    ))))
}

fn range_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let first = args.expect::<i64>("end")?;
    let second = args.eat::<i64>()?;
    let step = args.find::<i64>("step")?.unwrap_or(1);
    args.take().finish()?;

    if step == 0 {
        bail!(args.span, "step must not be zero");
    }

    let (start, end) = match second {
        Some(end) => (first, end),
        None => (0, first),
    };

    let mut values = vec![];
    let mut current = start;
    while (step > 0 && current < end) || (step < 0 && current > end) {
        values.push(Value::Int(current));
        current += step;
    }

    Ok(Value::Array(values.into_iter().collect()))
}

fn repr_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let value = args.expect::<Value>("value")?;
    args.take().finish()?;
    Ok(Value::Str(value.repr()))
}

fn type_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let value = args.expect::<Value>("value")?;
    args.take().finish()?;
    Ok(Value::Type(value.ty()))
}

fn panic_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let values = args.all::<Value>()?;
    args.take().finish()?;
    if values.is_empty() {
        bail!(span, "panicked");
    }
    let rendered: Vec<String> = values.iter().map(|value| value.repr().into()).collect();
    bail!(span, "panicked with: {}", rendered.join(", "))
}

fn assert_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let condition = args.expect::<bool>("condition")?;
    let message = args.find::<Str>("message")?;
    args.take().finish()?;
    if !condition {
        match message {
            Some(message) => bail!(span, "assertion failed: {message}"),
            None => bail!(span, "assertion failed"),
        }
    }
    Ok(Value::None)
}

fn label_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let name = args.expect::<Str>("name")?;
    args.take().finish()?;
    Ok(Value::Label(Label::new(name)))
}

fn regex_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let pattern = args.expect::<Str>("regex")?;
    args.take().finish()?;
    Ok(Value::Regex(Regex::new(&pattern).at(span)?))
}

fn str_impl(_: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let value = args.expect::<Value>("value")?;
    args.take().finish()?;
    Ok(Value::Str(match value {
        Value::Str(v) => v,
        Value::Int(v) => v.to_string().into(),
        Value::Float(v) => {
            let mut buffer = ryu::Buffer::new();
            buffer.format(v).into()
        }
        Value::Bool(v) => if v { "true" } else { "false" }.into(),
        Value::Label(v) => v.name().clone(),
        Value::Symbol(v) => v.get().into(),
        Value::Version(v) => v.to_string().into(),
        Value::Bytes(v) => std::str::from_utf8(v.as_slice())
            .map_err(|_| error!(span, "bytes are not valid utf-8"))?
            .into(),
        other => bail!(span, "cannot convert {} to string", other.ty()),
    }))
}

/// Resolves a data path relative to the file the call occurs in.
fn resolve_data_path(args: &Args, path: &str) -> SourceResult<FileId> {
    match args.span.file() {
        Some(current) => Ok(current.join(path)),
        None => bail!(args.span, "cannot access file system from here"),
    }
}

fn read_impl(engine: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let path = args.expect::<Str>("path")?;
    let id = resolve_data_path(args, &path)?;
    args.take().finish()?;
    let bytes = engine.world.file(id).map_err(String::from).at(span)?;
    let text = std::str::from_utf8(&bytes)
        .map_err(|_| error!(span, "file is not valid utf-8"))?;
    Ok(Value::Str(text.into()))
}

fn json_impl(engine: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    data_impl(engine, args, DataFormat::Json)
}

fn toml_impl(engine: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    data_impl(engine, args, DataFormat::Toml)
}

fn data_impl(engine: &mut Engine, args: &mut Args, format: DataFormat) -> SourceResult<Value> {
    let span = args.span;
    let path = args.expect::<Str>("path")?;
    let id = resolve_data_path(args, &path)?;
    args.take().finish()?;
    let bytes = engine.world.file(id).map_err(String::from).at(span)?;
    readers::load(format, &bytes).at(span)
}

fn today_impl(engine: &mut Engine, args: &mut Args) -> SourceResult<Value> {
    let span = args.span;
    let offset = args.find::<i64>("offset")?;
    args.take().finish()?;
    let Some((year, month, day)) = engine.world.today(offset) else {
        bail!(span, "date is out of range");
    };
    let mut dict = Dict::new();
    dict.insert("year".into(), Value::Int(i64::from(year)));
    dict.insert("month".into(), Value::Int(i64::from(month)));
    dict.insert("day".into(), Value::Int(i64::from(day)));
    Ok(Value::Dict(dict))
}
