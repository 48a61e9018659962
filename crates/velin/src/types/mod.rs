//! The value types of the language.

pub mod args;
pub mod array;
pub mod bytes;
pub mod content;
pub mod dict;
pub mod duration;
pub mod func;
pub mod label;
pub mod module;
pub mod regex;
pub mod str;
pub mod styles;
pub mod symbol;
pub mod version;

pub use self::{
    args::{Arg, Args},
    array::Array,
    bytes::Bytes,
    content::{Content, Elem, ElemKind},
    dict::Dict,
    duration::Duration,
    func::{Closure, Func, NativeFuncData},
    label::Label,
    module::Module,
    regex::Regex,
    str::Str,
    styles::{Recipe, Selector, SetStyle, Style, Styles, Transformation},
    symbol::Symbol,
    version::Version,
};
