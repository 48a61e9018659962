//! Dispatch of built-in methods on arrays, dictionaries, strings, and other
//! values.
//!
//! Methods come in three dispatch classes: immutable methods consume their
//! receiver by value and return a new value, mutating methods take the
//! receiver as an lvalue, and accessor methods yield a slot inside the
//! receiver when they appear on an access path.

use crate::{
    bail,
    diag::{At, SourceResult},
    engine::Engine,
    error,
    span::Span,
    types::{Args, Array, Func, Str},
    value::{Type, Value},
};

/// Whether a method of the given name mutates its receiver.
pub fn is_mutating_method(method: &str) -> bool {
    matches!(method, "push" | "pop" | "insert" | "remove" | "clear")
}

/// Whether a method of the given name can yield a slot inside its receiver.
pub fn is_accessor_method(method: &str) -> bool {
    matches!(method, "first" | "last" | "at")
}

/// Whether the value has an immutable method of the given name.
pub fn has_method(value: &Value, method: &str) -> bool {
    match value.ty() {
        Type::Array => matches!(
            method,
            "len" | "first"
                | "last"
                | "at"
                | "slice"
                | "contains"
                | "find"
                | "position"
                | "filter"
                | "map"
                | "enumerate"
                | "flatten"
                | "rev"
                | "sorted"
                | "dedup"
                | "zip"
                | "join"
                | "fold"
                | "reduce"
                | "sum"
                | "product"
        ),
        Type::Dict => matches!(
            method,
            "len" | "is-empty" | "at" | "get" | "contains" | "keys" | "values" | "pairs"
                | "filter"
                | "map"
        ),
        Type::Str => matches!(
            method,
            "len" | "first"
                | "last"
                | "at"
                | "slice"
                | "contains"
                | "find"
                | "position"
                | "starts-with"
                | "ends-with"
                | "trim"
                | "split"
                | "replace"
                | "rev"
                | "clusters"
                | "codepoints"
                | "to-upper"
                | "to-lower"
        ),
        Type::Bytes => matches!(method, "len"),
        Type::Args => matches!(method, "pos" | "named" | "at"),
        Type::Version => matches!(method, "at"),
        _ => false,
    }
}

/// Calls an immutable method, consuming the receiver by value.
pub fn call(
    engine: &mut Engine,
    value: Value,
    method: &str,
    mut args: Args,
    span: Span,
) -> SourceResult<Value> {
    let output = match value {
        Value::Array(array) => match method {
            "len" => Value::Int(array.len() as i64),
            "first" => array.first().at(span)?,
            "last" => array.last().at(span)?,
            "at" => {
                let index = args.expect::<i64>("index")?;
                let default = args.find::<Value>("default")?;
                array.at(index, default).at(span)?
            }
            "slice" => {
                let start = args.expect::<i64>("start")?;
                let end = args.eat::<i64>()?;
                Value::Array(array.slice(start, end).at(span)?)
            }
            "contains" => Value::Bool(array.contains(&args.expect::<Value>("value")?)),
            "find" => {
                let searcher = args.expect::<Func>("function")?;
                args.finish()?;
                return array
                    .find(engine, &searcher, span)?
                    .map_or(Ok(Value::None), Ok);
            }
            "position" => {
                let searcher = args.expect::<Func>("function")?;
                args.finish()?;
                return Ok(array
                    .position(engine, &searcher, span)?
                    .map_or(Value::None, Value::Int));
            }
            "filter" => {
                let test = args.expect::<Func>("function")?;
                args.finish()?;
                return array.filter(engine, &test, span).map(Value::Array);
            }
            "map" => {
                let mapper = args.expect::<Func>("function")?;
                args.finish()?;
                return array.map(engine, &mapper, span).map(Value::Array);
            }
            "enumerate" => {
                let start = args.find::<i64>("start")?.unwrap_or(0);
                Value::Array(array.enumerate(start))
            }
            "flatten" => Value::Array(array.flatten()),
            "rev" => Value::Array(array.rev()),
            "sorted" => {
                let key = args.find::<Func>("key")?;
                args.finish()?;
                return array.sorted(engine, key.as_ref(), span).map(Value::Array);
            }
            "dedup" => {
                let key = args.find::<Func>("key")?;
                args.finish()?;
                return array.dedup(engine, key.as_ref(), span).map(Value::Array);
            }
            "zip" => {
                let others = args.all::<Array>()?;
                Value::Array(array.zip(&others))
            }
            "join" => {
                let separator = args.eat::<Value>()?;
                let last = args.find::<Value>("last")?;
                array.join(separator, last).at(span)?
            }
            "fold" => {
                let init = args.expect::<Value>("init")?;
                let folder = args.expect::<Func>("function")?;
                args.finish()?;
                return array.fold(engine, init, &folder, span);
            }
            "reduce" => {
                let reducer = args.expect::<Func>("function")?;
                args.finish()?;
                return array.reduce(engine, &reducer, span);
            }
            "sum" => array.sum(args.find("default")?).at(span)?,
            "product" => array.product(args.find("default")?).at(span)?,
            _ => return missing(Type::Array, method, span),
        },

        Value::Dict(dict) => match method {
            "len" => Value::Int(dict.len() as i64),
            "is-empty" => Value::Bool(dict.is_empty()),
            "at" => {
                let key = args.expect::<Str>("key")?;
                let default = args.find::<Value>("default")?;
                dict.at(&key, default).at(span)?
            }
            "get" => {
                let key = args.expect::<Str>("key")?;
                dict.get(&key)
            }
            "contains" => Value::Bool(dict.contains(&args.expect::<Str>("key")?)),
            "keys" => Value::Array(dict.keys()),
            "values" => Value::Array(dict.values()),
            "pairs" => Value::Array(dict.pairs()),
            "filter" => {
                let test = args.expect::<Func>("function")?;
                args.finish()?;
                return dict.filter(engine, &test, span).map(Value::Dict);
            }
            "map" => {
                let mapper = args.expect::<Func>("function")?;
                args.finish()?;
                return dict.map(engine, &mapper, span).map(Value::Dict);
            }
            _ => return missing(Type::Dict, method, span),
        },

        Value::Str(string) => match method {
            "len" => Value::Int(string.len() as i64),
            "first" => Value::Str(string.first().at(span)?),
            "last" => Value::Str(string.last().at(span)?),
            "at" => {
                let index = args.expect::<i64>("index")?;
                let default = args.find::<Str>("default")?;
                Value::Str(string.at(index, default).at(span)?)
            }
            "slice" => {
                let start = args.expect::<i64>("start")?;
                let end = args.eat::<i64>()?;
                Value::Str(string.slice(start, end).at(span)?)
            }
            "contains" => Value::Bool(string.contains(&args.expect::<Str>("pattern")?)),
            "find" => string
                .find(&args.expect::<Str>("pattern")?)
                .map_or(Value::None, Value::Str),
            "position" => string
                .position(&args.expect::<Str>("pattern")?)
                .map_or(Value::None, Value::Int),
            "starts-with" => {
                Value::Bool(string.starts_with(&args.expect::<Str>("pattern")?))
            }
            "ends-with" => Value::Bool(string.ends_with(&args.expect::<Str>("pattern")?)),
            "trim" => Value::Str(string.trim()),
            "split" => {
                let pattern = args.eat::<Str>()?;
                Value::Array(
                    string
                        .split(pattern.as_deref())
                        .into_iter()
                        .map(Value::Str)
                        .collect(),
                )
            }
            "replace" => {
                let pattern = args.expect::<Str>("pattern")?;
                let with = args.expect::<Str>("replacement")?;
                Value::Str(string.replace(&pattern, &with))
            }
            "rev" => Value::Str(string.rev()),
            "clusters" => {
                Value::Array(string.clusters().into_iter().map(Value::Str).collect())
            }
            "codepoints" => {
                Value::Array(string.codepoints().into_iter().map(Value::Str).collect())
            }
            "to-upper" => Value::Str(string.to_upper()),
            "to-lower" => Value::Str(string.to_lower()),
            _ => return missing(Type::Str, method, span),
        },

        Value::Bytes(bytes) => match method {
            "len" => Value::Int(bytes.len() as i64),
            _ => return missing(Type::Bytes, method, span),
        },

        Value::Args(arguments) => match method {
            "pos" => Value::Array(arguments.pos()),
            "named" => Value::Dict(arguments.named()),
            "at" => {
                let index = args.expect::<i64>("index")?;
                let default = args.find::<Value>("default")?;
                arguments.at(index, default).at(span)?
            }
            _ => return missing(Type::Args, method, span),
        },

        Value::Version(version) => match method {
            "at" => Value::Int(i64::from(
                version.at(args.expect::<i64>("index")?).at(span)?,
            )),
            _ => return missing(Type::Version, method, span),
        },

        other => return missing(other.ty(), method, span),
    };

    args.finish()?;
    Ok(output)
}

/// Calls a mutating method on an lvalue receiver.
pub fn call_mut(
    slot: &mut Value,
    method: &str,
    mut args: Args,
    span: Span,
) -> SourceResult<Value> {
    let output = match slot {
        Value::Array(array) => match method {
            "push" => {
                array.push(args.expect::<Value>("value")?);
                Value::None
            }
            "pop" => array.pop().at(span)?,
            "insert" => {
                let index = args.expect::<i64>("index")?;
                let value = args.expect::<Value>("value")?;
                array.insert(index, value).at(span)?;
                Value::None
            }
            "remove" => {
                let index = args.expect::<i64>("index")?;
                let default = args.find::<Value>("default")?;
                array.remove(index, default).at(span)?
            }
            _ => return missing(Type::Array, method, span),
        },

        Value::Dict(dict) => match method {
            "insert" => {
                let key = args.expect::<Str>("key")?;
                let value = args.expect::<Value>("value")?;
                dict.insert(key, value);
                Value::None
            }
            "remove" => {
                let key = args.expect::<Str>("key")?;
                let default = args.find::<Value>("default")?;
                dict.remove(&key, default).at(span)?
            }
            "clear" => {
                dict.clear();
                Value::None
            }
            _ => return missing(Type::Dict, method, span),
        },

        other => return missing(other.ty(), method, span),
    };

    args.finish()?;
    Ok(output)
}

/// Calls an accessor method on an lvalue receiver, yielding a slot inside the
/// live container.
pub fn call_access<'a>(
    slot: &'a mut Value,
    method: &str,
    mut args: Args,
    span: Span,
) -> SourceResult<&'a mut Value> {
    let output = match slot {
        Value::Array(array) => match method {
            "first" => {
                args.finish()?;
                array.first_mut().at(span)?
            }
            "last" => {
                args.finish()?;
                array.last_mut().at(span)?
            }
            "at" => {
                let index = args.expect::<i64>("index")?;
                args.finish()?;
                array.at_mut(index).at(span)?
            }
            _ => bail!(span, "cannot mutate a temporary value"),
        },
        Value::Dict(dict) => match method {
            "at" => {
                let key = args.expect::<Str>("key")?;
                args.finish()?;
                dict.at_mut(&key).at(span)?
            }
            _ => bail!(span, "cannot mutate a temporary value"),
        },
        _ => bail!(span, "cannot mutate a temporary value"),
    };

    Ok(output)
}

/// The error for a method that does not exist on a type.
fn missing<T>(ty: Type, method: &str, span: Span) -> SourceResult<T> {
    Err(error!(span, "type {ty} has no method `{method}`"))
}
