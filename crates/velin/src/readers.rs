//! Readers for external data formats.
//!
//! The evaluator consumes these through the `json`, `toml`, and `read`
//! natives. JSON and TOML are implemented; the remaining formats are part of
//! the interface but report themselves as unsupported until a backing
//! implementation is wired in.

use crate::{
    diag::StrResult,
    types::{Array, Dict, Str},
    value::Value,
};

/// A data format the evaluator can be asked to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// JavaScript Object Notation.
    Json,
    /// YAML Ain't Markup Language.
    Yaml,
    /// Tom's Obvious Minimal Language.
    Toml,
    /// Comma-separated values.
    Csv,
    /// Extensible Markup Language.
    Xml,
}

impl DataFormat {
    /// Infers a format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "csv" => Some(Self::Csv),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }

    /// The format's display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Csv => "csv",
            Self::Xml => "xml",
        }
    }
}

/// Loads structured data of the given format into a value.
///
/// Maps preserve their source order.
pub fn load(format: DataFormat, bytes: &[u8]) -> StrResult<Value> {
    match format {
        DataFormat::Json => load_json(bytes),
        DataFormat::Toml => load_toml(bytes),
        other => Err(format!("unsupported data format: {}", other.name())),
    }
}

fn load_json(bytes: &[u8]) -> StrResult<Value> {
    let parsed: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|err| format!("failed to parse JSON ({err})"))?;
    Ok(convert_json(parsed))
}

fn convert_json(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(v) => Value::Bool(v),
        serde_json::Value::Number(v) => match v.as_i64() {
            Some(int) => Value::Int(int),
            None => Value::Float(v.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(v) => Value::Str(v.into()),
        serde_json::Value::Array(values) => {
            Value::Array(values.into_iter().map(convert_json).collect())
        }
        serde_json::Value::Object(map) => Value::Dict(
            map.into_iter()
                .map(|(key, value)| (Str::from(key), convert_json(value)))
                .collect(),
        ),
    }
}

fn load_toml(bytes: &[u8]) -> StrResult<Value> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| "TOML data is not valid utf-8".to_owned())?;
    let doc = text
        .parse::<toml_edit::DocumentMut>()
        .map_err(|err| format!("failed to parse TOML ({err})"))?;
    Ok(convert_toml_table(doc.as_table()))
}

fn convert_toml_table(table: &toml_edit::Table) -> Value {
    let dict: Dict = table
        .iter()
        .map(|(key, item)| (Str::from(key), convert_toml_item(item)))
        .collect();
    Value::Dict(dict)
}

fn convert_toml_item(item: &toml_edit::Item) -> Value {
    match item {
        toml_edit::Item::None => Value::None,
        toml_edit::Item::Value(value) => convert_toml_value(value),
        toml_edit::Item::Table(table) => convert_toml_table(table),
        toml_edit::Item::ArrayOfTables(tables) => Value::Array(
            tables
                .iter()
                .map(|table| convert_toml_table(table))
                .collect::<Array>(),
        ),
    }
}

fn convert_toml_value(value: &toml_edit::Value) -> Value {
    match value {
        toml_edit::Value::String(v) => Value::Str(v.value().as_str().into()),
        toml_edit::Value::Integer(v) => Value::Int(*v.value()),
        toml_edit::Value::Float(v) => Value::Float(*v.value()),
        toml_edit::Value::Boolean(v) => Value::Bool(*v.value()),
        toml_edit::Value::Datetime(v) => Value::Str(v.value().to_string().into()),
        toml_edit::Value::Array(values) => {
            Value::Array(values.iter().map(convert_toml_value).collect())
        }
        toml_edit::Value::InlineTable(table) => Value::Dict(
            table
                .iter()
                .map(|(key, value)| (Str::from(key), convert_toml_value(value)))
                .collect(),
        ),
    }
}
