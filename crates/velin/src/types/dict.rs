use std::{fmt, sync::Arc};

use indexmap::IndexMap;

use crate::{
    diag::{HintedString, HintedStrResult, SourceResult, StrResult},
    engine::Engine,
    span::Span,
    types::{Array, Func, Str},
    value::Value,
};

/// An insertion-ordered mapping from strings to values.
///
/// Keys are unique. Updating an existing key keeps its position; new keys are
/// appended at the end. Merging two dictionaries is right-biased: values from
/// the right side win, while the key order keeps the left side's keys first
/// and appends keys that only the right side has.
///
/// Dictionaries are cheap to clone; the backing storage is shared and copied
/// only when a mutation hits a shared handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict(Arc<IndexMap<Str, Value>>);

impl Dict {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The value for `key`, or the `default` when the key is absent and one
    /// was provided.
    pub fn at(&self, key: &str, default: Option<Value>) -> StrResult<Value> {
        self.0
            .get(key)
            .cloned()
            .or(default)
            .ok_or_else(|| missing_key(key))
    }

    /// A mutable slot for the value at `key`.
    pub fn at_mut(&mut self, key: &str) -> HintedStrResult<&mut Value> {
        let map = Arc::make_mut(&mut self.0);
        if map.contains_key(key) {
            Ok(map.get_mut(key).expect("key was just checked"))
        } else {
            Err(HintedString::new(missing_key(key)).with_hint("use `insert` to add or update values"))
        }
    }

    /// The value for `key`, or `none` when absent.
    pub fn get(&self, key: &str) -> Value {
        self.0.get(key).cloned().unwrap_or(Value::None)
    }

    /// Whether the dictionary contains `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Inserts a value for `key`.
    ///
    /// An existing key keeps its position; a new key is appended.
    pub fn insert(&mut self, key: Str, value: Value) {
        Arc::make_mut(&mut self.0).insert(key, value);
    }

    /// Removes and returns the value for `key`, or the `default` when the key
    /// is absent and one was provided.
    pub fn remove(&mut self, key: &str, default: Option<Value>) -> StrResult<Value> {
        match Arc::make_mut(&mut self.0).shift_remove(key) {
            Some(value) => Ok(value),
            None => default.ok_or_else(|| missing_key(key)),
        }
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        Arc::make_mut(&mut self.0).clear();
    }

    /// The keys, in insertion order.
    pub fn keys(&self) -> Array {
        self.0.keys().map(|key| Value::Str(key.clone())).collect()
    }

    /// The values, in insertion order.
    pub fn values(&self) -> Array {
        self.0.values().cloned().collect()
    }

    /// The `(key, value)` pairs, each as a two-element array.
    pub fn pairs(&self) -> Array {
        self.0
            .iter()
            .map(|(key, value)| {
                Value::Array(Array::from_vec(vec![
                    Value::Str(key.clone()),
                    value.clone(),
                ]))
            })
            .collect()
    }

    /// The entries for which `test(key, value)` returns true.
    pub fn filter(&self, engine: &mut Engine, test: &Func, span: Span) -> SourceResult<Self> {
        use crate::diag::At;
        let mut kept = IndexMap::new();
        for (key, value) in self.iter() {
            let keep = test
                .call_positional(engine, vec![Value::Str(key.clone()), value.clone()], span)?
                .cast::<bool>()
                .at(span)?;
            if keep {
                kept.insert(key.clone(), value.clone());
            }
        }
        Ok(Self(Arc::new(kept)))
    }

    /// The dictionary with every value replaced by `mapper(key, value)`.
    pub fn map(&self, engine: &mut Engine, mapper: &Func, span: Span) -> SourceResult<Self> {
        let mut mapped = IndexMap::new();
        for (key, value) in self.iter() {
            let new =
                mapper.call_positional(engine, vec![Value::Str(key.clone()), value.clone()], span)?;
            mapped.insert(key.clone(), new);
        }
        Ok(Self(Arc::new(mapped)))
    }

    /// Merges two dictionaries with a right bias.
    pub fn merge(&self, other: &Self) -> Self {
        let mut map = (*self.0).clone();
        for (key, value) in other.iter() {
            map.insert(key.clone(), value.clone());
        }
        Self(Arc::new(map))
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, Str, Value> {
        self.0.iter()
    }
}

fn missing_key(key: &str) -> String {
    format!("dictionary does not contain key {:?}", key)
}

impl FromIterator<(Str, Value)> for Dict {
    fn from_iter<T: IntoIterator<Item = (Str, Value)>>(iter: T) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

impl IntoIterator for Dict {
    type Item = (Str, Value);
    type IntoIter = indexmap::map::IntoIter<Str, Value>;

    fn into_iter(self) -> Self::IntoIter {
        Arc::try_unwrap(self.0)
            .unwrap_or_else(|shared| (*shared).clone())
            .into_iter()
    }
}

impl fmt::Display for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(:)");
        }
        f.write_str("(")?;
        for (index, (key, value)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_existing_position() {
        let mut dict = Dict::new();
        dict.insert("a".into(), Value::Int(1));
        dict.insert("b".into(), Value::Int(2));
        dict.insert("a".into(), Value::Int(3));
        let keys: Vec<_> = dict.iter().map(|(k, _)| k.as_str().to_owned()).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(dict.get("a"), Value::Int(3));
    }

    #[test]
    fn merge_is_right_biased() {
        let left: Dict = [("a".into(), Value::Int(1)), ("b".into(), Value::Int(2))]
            .into_iter()
            .collect();
        let right: Dict = [("b".into(), Value::Int(9)), ("c".into(), Value::Int(3))]
            .into_iter()
            .collect();
        let merged = left.merge(&right);
        let keys: Vec<_> = merged.iter().map(|(k, _)| k.as_str().to_owned()).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert_eq!(merged.get("b"), Value::Int(9));
    }
}
