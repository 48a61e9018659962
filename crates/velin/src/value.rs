use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    ast::Unit,
    diag::{HintedString, HintedStrResult},
    geom::{Angle, Fr, Length, Ratio, Rel},
    ops,
    scopes::Scope,
    span::Span,
    types::{
        Args, Array, Bytes, Content, Dict, Duration, Func, Label, Module, Regex, Str, Styles,
        Symbol, Version, str::repr_str,
    },
};

/// A computed value.
///
/// Values are cheap to clone. The container variants (arrays, dictionaries,
/// content, modules) share their storage and copy on mutation at the
/// evaluator boundary.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The absence of a value.
    #[default]
    None,
    /// A value that indicates a smart default.
    Auto,
    /// A boolean: `true`, `false`.
    Bool(bool),
    /// A signed 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// An absolute length.
    Length(Length),
    /// An angle.
    Angle(Angle),
    /// A ratio of a whole.
    Ratio(Ratio),
    /// A length with absolute and proportional parts.
    Relative(Rel),
    /// A fraction of remaining layout space.
    Fraction(Fr),
    /// A span of time.
    Duration(Duration),
    /// A semantic version.
    Version(Version),
    /// A string.
    Str(Str),
    /// A byte buffer.
    Bytes(Bytes),
    /// A label.
    Label(Label),
    /// A symbol.
    Symbol(Symbol),
    /// A regular expression.
    Regex(Regex),
    /// An array of values.
    Array(Array),
    /// A dictionary mapping strings to values.
    Dict(Dict),
    /// Document content.
    Content(Content),
    /// A type tag.
    Type(Type),
    /// A function.
    Func(Func),
    /// An evaluated module.
    Module(Module),
    /// A collection of style rules and recipes.
    Styles(Styles),
    /// Packed arguments of a function call.
    Args(Args),
}

/// The type tag of a value, used for error messages and runtime dispatch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr,
)]
pub enum Type {
    #[strum(serialize = "none")]
    None,
    #[strum(serialize = "auto")]
    Auto,
    #[strum(serialize = "boolean")]
    Bool,
    #[strum(serialize = "integer")]
    Int,
    #[strum(serialize = "float")]
    Float,
    #[strum(serialize = "length")]
    Length,
    #[strum(serialize = "angle")]
    Angle,
    #[strum(serialize = "ratio")]
    Ratio,
    #[strum(serialize = "relative length")]
    Relative,
    #[strum(serialize = "fraction")]
    Fraction,
    #[strum(serialize = "duration")]
    Duration,
    #[strum(serialize = "version")]
    Version,
    #[strum(serialize = "string")]
    Str,
    #[strum(serialize = "bytes")]
    Bytes,
    #[strum(serialize = "label")]
    Label,
    #[strum(serialize = "symbol")]
    Symbol,
    #[strum(serialize = "regex")]
    Regex,
    #[strum(serialize = "array")]
    Array,
    #[strum(serialize = "dictionary")]
    Dict,
    #[strum(serialize = "content")]
    Content,
    #[strum(serialize = "type")]
    Type,
    #[strum(serialize = "function")]
    Func,
    #[strum(serialize = "module")]
    Module,
    #[strum(serialize = "styles")]
    Styles,
    #[strum(serialize = "arguments")]
    Args,
}

impl Type {
    /// The type's static-method scope.
    ///
    /// Currently no type carries static methods, but the scope is the
    /// attachment point for them and for `import` from a type.
    pub fn scope(self) -> Scope {
        Scope::new()
    }
}

impl Value {
    /// The type tag of this value.
    pub fn ty(&self) -> Type {
        match self {
            Self::None => Type::None,
            Self::Auto => Type::Auto,
            Self::Bool(_) => Type::Bool,
            Self::Int(_) => Type::Int,
            Self::Float(_) => Type::Float,
            Self::Length(_) => Type::Length,
            Self::Angle(_) => Type::Angle,
            Self::Ratio(_) => Type::Ratio,
            Self::Relative(_) => Type::Relative,
            Self::Fraction(_) => Type::Fraction,
            Self::Duration(_) => Type::Duration,
            Self::Version(_) => Type::Version,
            Self::Str(_) => Type::Str,
            Self::Bytes(_) => Type::Bytes,
            Self::Label(_) => Type::Label,
            Self::Symbol(_) => Type::Symbol,
            Self::Regex(_) => Type::Regex,
            Self::Array(_) => Type::Array,
            Self::Dict(_) => Type::Dict,
            Self::Content(_) => Type::Content,
            Self::Type(_) => Type::Type,
            Self::Func(_) => Type::Func,
            Self::Module(_) => Type::Module,
            Self::Styles(_) => Type::Styles,
            Self::Args(_) => Type::Args,
        }
    }

    /// Creates a value from a numeric literal with a unit.
    pub fn numeric(v: f64, unit: Unit) -> Self {
        match unit {
            Unit::Pt => Self::Length(Length::pt(v)),
            Unit::Mm => Self::Length(Length::mm(v)),
            Unit::Cm => Self::Length(Length::cm(v)),
            Unit::In => Self::Length(Length::inches(v)),
            Unit::Em => Self::Relative(Rel::new(Length::zero(), Ratio::new(v))),
            Unit::Deg => Self::Angle(Angle::deg(v)),
            Unit::Rad => Self::Angle(Angle::rad(v)),
            Unit::Percent => Self::Ratio(Ratio::new(v * 0.01)),
            Unit::Fr => Self::Fraction(Fr::new(v)),
        }
    }

    /// Accesses a field on the value.
    pub fn field(&self, field: &str) -> HintedStrResult<Self> {
        match self {
            Self::Dict(dict) => dict.at(field, None).map_err(Into::into),
            Self::Module(module) => module.field(field).map(Clone::clone),
            Self::Func(func) => match func.scope() {
                Some(scope) => scope.get(field).cloned().ok_or_else(|| {
                    HintedString::new(format!(
                        "function `{}` does not contain `{field}`",
                        func.name().unwrap_or("anonymous"),
                    ))
                }),
                None => Err("cannot access fields on user-defined functions".into()),
            },
            Self::Type(ty) => ty.scope().get(field).cloned().ok_or_else(|| {
                HintedString::new(format!("type {ty} does not contain `{field}`"))
            }),
            Self::Symbol(symbol) => symbol.variant(field).map(Self::Symbol).map_err(Into::into),
            Self::Version(version) => match field {
                "major" => Ok(Self::Int(i64::from(version.major))),
                "minor" => Ok(Self::Int(i64::from(version.minor))),
                "patch" => Ok(Self::Int(i64::from(version.patch))),
                _ => Err(format!("version does not contain field \"{field}\"").into()),
            },
            Self::Content(content) => match content.elems() {
                [elem] => elem.field(field).ok_or_else(|| {
                    HintedString::new(format!(
                        "{} does not contain field \"{field}\"",
                        elem.name()
                    ))
                }),
                _ => Err(format!("content does not contain field \"{field}\"").into()),
            },
            _ => Err(format!("cannot access fields on type {}", self.ty()).into()),
        }
    }

    /// Coerces the value to content for joining in markup.
    pub fn display(self, span: Span) -> Content {
        match self {
            Self::None => Content::empty(),
            Self::Content(content) => content,
            Self::Str(text) => Content::text(text, span),
            Self::Symbol(symbol) => Content::text(symbol.get(), span),
            other => Content::text(other.repr(), span),
        }
    }

    /// The value's code representation.
    pub fn repr(&self) -> Str {
        self.to_string().into()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        ops::equal(self, other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Auto => f.write_str("auto"),
            Self::Bool(v) => v.fmt(f),
            Self::Int(v) => v.fmt(f),
            Self::Float(v) => {
                let mut buffer = ryu::Buffer::new();
                f.write_str(buffer.format(*v))
            }
            Self::Length(v) => v.fmt(f),
            Self::Angle(v) => v.fmt(f),
            Self::Ratio(v) => v.fmt(f),
            Self::Relative(v) => v.fmt(f),
            Self::Fraction(v) => v.fmt(f),
            Self::Duration(v) => v.fmt(f),
            Self::Version(v) => v.fmt(f),
            Self::Str(v) => repr_str(f, v),
            Self::Bytes(v) => v.fmt(f),
            Self::Label(v) => v.fmt(f),
            Self::Symbol(v) => v.fmt(f),
            Self::Regex(v) => v.fmt(f),
            Self::Array(v) => v.fmt(f),
            Self::Dict(v) => v.fmt(f),
            Self::Content(v) => v.fmt(f),
            Self::Type(v) => v.fmt(f),
            Self::Func(v) => v.fmt(f),
            Self::Module(v) => v.fmt(f),
            Self::Styles(v) => v.fmt(f),
            Self::Args(v) => v.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_literal_lowering() {
        assert_eq!(Value::numeric(1.0, Unit::In), Value::Length(Length::pt(72.0)));
        assert_eq!(Value::numeric(50.0, Unit::Percent), Value::Ratio(Ratio::new(0.5)));
        assert_eq!(Value::numeric(2.0, Unit::Fr), Value::Fraction(Fr::new(2.0)));
    }

    #[test]
    fn repr_formatting() {
        assert_eq!(Value::Int(3).repr().as_str(), "3");
        assert_eq!(Value::Float(1.5).repr().as_str(), "1.5");
        assert_eq!(Value::Str("a\"b".into()).repr().as_str(), "\"a\\\"b\"");
        assert_eq!(Value::None.repr().as_str(), "none");
    }
}
