use std::{fmt, sync::Arc};

use crate::{
    diag::{At, SourceResult, StrResult},
    engine::Engine,
    ops,
    span::Span,
    types::Func,
    value::Value,
};

/// An ordered sequence of values.
///
/// Arrays are cheap to clone; the backing storage is shared and copied only
/// when a mutation hits a shared handle. The accessor methods `first`, `last`,
/// and `at` come in reference flavors that yield slots inside the live
/// storage, which is what makes `arr.at(1) = 5` work.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Array(Arc<Vec<Value>>);

impl Array {
    /// Creates an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an array from a vector of values.
    pub fn from_vec(vec: Vec<Value>) -> Self {
        Self(Arc::new(vec))
    }

    /// The number of values in the array.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the array is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The values as a slice.
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Iterates over the values.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// The first value in the array.
    pub fn first(&self) -> StrResult<Value> {
        self.0.first().cloned().ok_or_else(array_is_empty)
    }

    /// A mutable slot for the first value.
    pub fn first_mut(&mut self) -> StrResult<&mut Value> {
        Arc::make_mut(&mut self.0).first_mut().ok_or_else(array_is_empty)
    }

    /// The last value in the array.
    pub fn last(&self) -> StrResult<Value> {
        self.0.last().cloned().ok_or_else(array_is_empty)
    }

    /// A mutable slot for the last value.
    pub fn last_mut(&mut self) -> StrResult<&mut Value> {
        Arc::make_mut(&mut self.0).last_mut().ok_or_else(array_is_empty)
    }

    /// The value at `index`, where a negative index counts from the end.
    ///
    /// Returns the `default` when the index is out of bounds and one was
    /// provided.
    pub fn at(&self, index: i64, default: Option<Value>) -> StrResult<Value> {
        self.locate(index)
            .and_then(|resolved| self.0.get(resolved).cloned())
            .or(default)
            .ok_or_else(|| out_of_bounds_no_default(index, self.len()))
    }

    /// A mutable slot for the value at `index`.
    pub fn at_mut(&mut self, index: i64) -> StrResult<&mut Value> {
        let len = self.len();
        match self.locate(index) {
            Some(resolved) if resolved < len => Ok(&mut Arc::make_mut(&mut self.0)[resolved]),
            _ => Err(out_of_bounds(index, len)),
        }
    }

    /// Appends a value at the end.
    pub fn push(&mut self, value: Value) {
        Arc::make_mut(&mut self.0).push(value);
    }

    /// Removes and returns the last value.
    pub fn pop(&mut self) -> StrResult<Value> {
        Arc::make_mut(&mut self.0).pop().ok_or_else(array_is_empty)
    }

    /// Inserts a value at `index`, shifting everything after it.
    ///
    /// Unlike `at`, the index may also point directly after the last value.
    pub fn insert(&mut self, index: i64, value: Value) -> StrResult<()> {
        let len = self.len();
        let resolved = self
            .locate(index)
            .filter(|&resolved| resolved <= len)
            .ok_or_else(|| out_of_bounds(index, len))?;
        Arc::make_mut(&mut self.0).insert(resolved, value);
        Ok(())
    }

    /// Removes and returns the value at `index`, or the `default` when the
    /// index is out of range and one was provided.
    pub fn remove(&mut self, index: i64, default: Option<Value>) -> StrResult<Value> {
        let len = self.len();
        match self.locate(index).filter(|&resolved| resolved < len) {
            Some(resolved) => Ok(Arc::make_mut(&mut self.0).remove(resolved)),
            None => default.ok_or_else(|| out_of_bounds(index, len)),
        }
    }

    /// Extracts the subslice `start..end`, where both endpoints may be
    /// negative to count from the end and `end` defaults to the length.
    pub fn slice(&self, start: i64, end: Option<i64>) -> StrResult<Self> {
        let len = self.len();
        let start = self
            .locate(start)
            .filter(|&resolved| resolved <= len)
            .ok_or_else(|| out_of_bounds(start, len))?;
        let end = match end {
            Some(end) => self
                .locate(end)
                .filter(|&resolved| resolved <= len)
                .ok_or_else(|| out_of_bounds(end, len))?,
            None => len,
        };
        Ok(Self::from_vec(self.0[start..end.max(start)].to_vec()))
    }

    /// Whether the array contains a value equal to `value`.
    pub fn contains(&self, value: &Value) -> bool {
        self.0.iter().any(|item| ops::equal(item, value))
    }

    /// The first value for which `searcher` returns true.
    pub fn find(&self, engine: &mut Engine, searcher: &Func, span: Span) -> SourceResult<Option<Value>> {
        for item in self.iter() {
            if searcher.call_positional(engine, vec![item.clone()], span)?.cast::<bool>().at(span)? {
                return Ok(Some(item.clone()));
            }
        }
        Ok(None)
    }

    /// The index of the first value for which `searcher` returns true.
    pub fn position(&self, engine: &mut Engine, searcher: &Func, span: Span) -> SourceResult<Option<i64>> {
        for (index, item) in self.iter().enumerate() {
            if searcher.call_positional(engine, vec![item.clone()], span)?.cast::<bool>().at(span)? {
                return Ok(Some(index as i64));
            }
        }
        Ok(None)
    }

    /// The values for which `test` returns true.
    pub fn filter(&self, engine: &mut Engine, test: &Func, span: Span) -> SourceResult<Self> {
        let mut kept = vec![];
        for item in self.iter() {
            if test.call_positional(engine, vec![item.clone()], span)?.cast::<bool>().at(span)? {
                kept.push(item.clone());
            }
        }
        Ok(Self::from_vec(kept))
    }

    /// The array with `mapper` applied to every value.
    pub fn map(&self, engine: &mut Engine, mapper: &Func, span: Span) -> SourceResult<Self> {
        let mut mapped = Vec::with_capacity(self.len());
        for item in self.iter() {
            mapped.push(mapper.call_positional(engine, vec![item.clone()], span)?);
        }
        Ok(Self::from_vec(mapped))
    }

    /// Pairs each value with its index, as `(index, value)` arrays.
    pub fn enumerate(&self, start: i64) -> Self {
        Self::from_vec(
            self.iter()
                .enumerate()
                .map(|(index, value)| {
                    Value::Array(Self::from_vec(vec![
                        Value::Int(start + index as i64),
                        value.clone(),
                    ]))
                })
                .collect(),
        )
    }

    /// Recursively flattens nested arrays into a single flat array.
    pub fn flatten(&self) -> Self {
        let mut flat = Vec::with_capacity(self.len());
        for item in self.iter() {
            if let Value::Array(nested) = item {
                flat.extend(nested.flatten().0.iter().cloned());
            } else {
                flat.push(item.clone());
            }
        }
        Self::from_vec(flat)
    }

    /// The array with its values in reverse order.
    pub fn rev(&self) -> Self {
        Self::from_vec(self.iter().rev().cloned().collect())
    }

    /// The array sorted by the standard ordering, or by a key function.
    ///
    /// The sort is stable. If any comparison (or key call) fails, the sort is
    /// aborted and that error surfaces.
    pub fn sorted(&self, engine: &mut Engine, key: Option<&Func>, span: Span) -> SourceResult<Self> {
        let mut keyed = Vec::with_capacity(self.len());
        for item in self.iter() {
            let key_value = match key {
                Some(key) => key.call_positional(engine, vec![item.clone()], span)?,
                None => item.clone(),
            };
            keyed.push((key_value, item.clone()));
        }

        let mut failure = None;
        keyed.sort_by(|(a, _), (b, _)| {
            ops::compare(a, b).unwrap_or_else(|err| {
                if failure.is_none() {
                    failure = Some(err);
                }
                std::cmp::Ordering::Equal
            })
        });

        match failure {
            Some(err) => Err(err).at(span),
            None => Ok(Self::from_vec(keyed.into_iter().map(|(_, item)| item).collect())),
        }
    }

    /// The array with consecutive duplicates removed, judged by equality of
    /// the values themselves or of their keys.
    pub fn dedup(&self, engine: &mut Engine, key: Option<&Func>, span: Span) -> SourceResult<Self> {
        let mut seen: Vec<Value> = vec![];
        let mut unique = vec![];
        for item in self.iter() {
            let key_value = match key {
                Some(key) => key.call_positional(engine, vec![item.clone()], span)?,
                None => item.clone(),
            };
            if !seen.iter().any(|prior| ops::equal(prior, &key_value)) {
                seen.push(key_value);
                unique.push(item.clone());
            }
        }
        Ok(Self::from_vec(unique))
    }

    /// Zips the array with one or more other arrays, producing an array of
    /// arrays truncated to the shortest input.
    pub fn zip(&self, others: &[Self]) -> Self {
        let len = others
            .iter()
            .map(Self::len)
            .fold(self.len(), usize::min);
        let mut zipped = Vec::with_capacity(len);
        for index in 0..len {
            let mut tuple = Vec::with_capacity(1 + others.len());
            tuple.push(self.0[index].clone());
            tuple.extend(others.iter().map(|other| other.0[index].clone()));
            zipped.push(Value::Array(Self::from_vec(tuple)));
        }
        Self::from_vec(zipped)
    }

    /// Joins the values with the join operation, inserting `separator`
    /// between them and `last` before the final one.
    pub fn join(&self, separator: Option<Value>, last: Option<Value>) -> StrResult<Value> {
        let len = self.len();
        let mut joined = Value::None;
        for (index, item) in self.iter().enumerate() {
            if index > 0 {
                let glue = if index + 1 == len {
                    last.clone().or_else(|| separator.clone())
                } else {
                    separator.clone()
                };
                if let Some(glue) = glue {
                    joined = ops::join(joined, glue)?;
                }
            }
            joined = ops::join(joined, item.clone())?;
        }
        Ok(joined)
    }

    /// Folds the values into an accumulator, starting from `init`.
    pub fn fold(&self, engine: &mut Engine, init: Value, folder: &Func, span: Span) -> SourceResult<Value> {
        let mut acc = init;
        for item in self.iter() {
            acc = folder.call_positional(engine, vec![acc, item.clone()], span)?;
        }
        Ok(acc)
    }

    /// Folds the values pairwise without an initial accumulator.
    ///
    /// Returns `none` for an empty array.
    pub fn reduce(&self, engine: &mut Engine, reducer: &Func, span: Span) -> SourceResult<Value> {
        let mut iter = self.iter();
        let Some(first) = iter.next() else { return Ok(Value::None) };
        let mut acc = first.clone();
        for item in iter {
            acc = reducer.call_positional(engine, vec![acc, item.clone()], span)?;
        }
        Ok(acc)
    }

    /// The sum of all values, or the `default` for an empty array.
    pub fn sum(&self, default: Option<Value>) -> StrResult<Value> {
        let mut iter = self.iter();
        let mut acc = match iter.next() {
            Some(first) => first.clone(),
            None => {
                return default
                    .ok_or_else(|| "cannot calculate sum of empty array with no default".into());
            }
        };
        for item in iter {
            acc = ops::add(acc, item.clone())?;
        }
        Ok(acc)
    }

    /// The product of all values, or the `default` for an empty array.
    pub fn product(&self, default: Option<Value>) -> StrResult<Value> {
        let mut iter = self.iter();
        let mut acc = match iter.next() {
            Some(first) => first.clone(),
            None => {
                return default
                    .ok_or_else(|| "cannot calculate product of empty array with no default".into());
            }
        };
        for item in iter {
            acc = ops::mul(acc, item.clone())?;
        }
        Ok(acc)
    }

    /// Concatenates two arrays.
    pub fn concat(&self, other: &Self) -> Self {
        let mut vec = Vec::with_capacity(self.len() + other.len());
        vec.extend(self.iter().cloned());
        vec.extend(other.iter().cloned());
        Self::from_vec(vec)
    }

    /// Repeats the array `n` times.
    pub fn repeat(&self, n: i64) -> StrResult<Self> {
        let n = usize::try_from(n)
            .map_err(|_| format!("cannot repeat this array {n} times"))?;
        let mut vec = Vec::with_capacity(self.len().saturating_mul(n));
        for _ in 0..n {
            vec.extend(self.iter().cloned());
        }
        Ok(Self::from_vec(vec))
    }

    /// Resolves a signed index, where negative values count from the end.
    ///
    /// The result may be one past the end, which `insert` and `slice` accept.
    fn locate(&self, index: i64) -> Option<usize> {
        let len = self.len() as i64;
        let resolved = if index < 0 { len + index } else { index };
        (0..=len).contains(&resolved).then_some(resolved as usize)
    }
}

fn array_is_empty() -> String {
    "array is empty".into()
}

fn out_of_bounds(index: i64, len: usize) -> String {
    format!("array index out of bounds (index: {index}, len: {len})")
}

fn out_of_bounds_no_default(index: i64, len: usize) -> String {
    format!("array index out of bounds (index: {index}, len: {len}) and no default value was specified")
}

impl FromIterator<Value> for Array {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl IntoIterator for Array {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        Arc::try_unwrap(self.0)
            .unwrap_or_else(|shared| (*shared).clone())
            .into_iter()
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (index, value) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            value.fmt(f)?;
        }
        if self.len() == 1 {
            f.write_str(",")?;
        }
        f.write_str(")")
    }
}
