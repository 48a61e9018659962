use crate::{
    diag::{HintedString, HintedStrResult},
    geom::{Angle, Fr, Length, Ratio, Rel},
    types::{
        Args, Array, Bytes, Content, Dict, Duration, Func, Label, Module, Regex, Str, Styles,
        Symbol, Version,
    },
    value::Value,
};

/// Conversion of a Rust type into a value.
pub trait IntoValue {
    /// Converts into a value.
    fn into_value(self) -> Value;
}

/// Conversion of a value into a Rust type, with a typed error message on
/// mismatch.
pub trait FromValue: Sized {
    /// Tries to convert a value into this type.
    fn from_value(value: Value) -> HintedStrResult<Self>;
}

impl Value {
    /// Casts the value to the given type.
    pub fn cast<T: FromValue>(self) -> HintedStrResult<T> {
        T::from_value(self)
    }
}

/// The standard mismatch error.
fn mismatch(expected: &str, found: &Value) -> HintedString {
    HintedString::new(format!("expected {expected}, got {}", found.ty()))
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> HintedStrResult<Self> {
        Ok(value)
    }
}

macro_rules! primitive {
    ($ty:ty, $variant:ident, $expected:literal) => {
        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> HintedStrResult<Self> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(mismatch($expected, &other)),
                }
            }
        }
    };
}

primitive!(bool, Bool, "boolean");
primitive!(i64, Int, "integer");
primitive!(Length, Length, "length");
primitive!(Angle, Angle, "angle");
primitive!(Ratio, Ratio, "ratio");
primitive!(Rel, Relative, "relative length");
primitive!(Fr, Fraction, "fraction");
primitive!(Duration, Duration, "duration");
primitive!(Version, Version, "version");
primitive!(Str, Str, "string");
primitive!(Bytes, Bytes, "bytes");
primitive!(Label, Label, "label");
primitive!(Symbol, Symbol, "symbol");
primitive!(Regex, Regex, "regex");
primitive!(Array, Array, "array");
primitive!(Dict, Dict, "dictionary");
primitive!(Func, Func, "function");
primitive!(Module, Module, "module");
primitive!(Styles, Styles, "styles");
primitive!(Args, Args, "arguments");

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl FromValue for f64 {
    /// Integers promote to floats.
    fn from_value(value: Value) -> HintedStrResult<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as Self),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl FromValue for usize {
    fn from_value(value: Value) -> HintedStrResult<Self> {
        match value {
            Value::Int(v) => Self::try_from(v)
                .map_err(|_| HintedString::new(format!("number must be at least zero, got {v}"))),
            other => Err(mismatch("integer", &other)),
        }
    }
}

impl IntoValue for Content {
    fn into_value(self) -> Value {
        Value::Content(self)
    }
}

impl FromValue for Content {
    /// Strings and symbols promote to text content.
    fn from_value(value: Value) -> HintedStrResult<Self> {
        match value {
            Value::Content(v) => Ok(v),
            Value::Str(text) => Ok(Self::text(text, crate::span::Span::detached())),
            Value::Symbol(symbol) => {
                Ok(Self::text(symbol.get(), crate::span::Span::detached()))
            }
            Value::None => Ok(Self::empty()),
            other => Err(mismatch("content", &other)),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self.into())
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.into())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    /// `none` casts to `None`; everything else must cast to `T`.
    fn from_value(value: Value) -> HintedStrResult<Self> {
        match value {
            Value::None => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl IntoValue for Vec<Value> {
    fn into_value(self) -> Value {
        Value::Array(Array::from_vec(self))
    }
}
