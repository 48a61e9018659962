use std::{
    borrow::Borrow,
    fmt,
    ops::Deref,
    sync::Arc,
};

use unicode_segmentation::UnicodeSegmentation;

use crate::diag::StrResult;

/// An immutable string value.
///
/// Strings are cheap to clone; the backing buffer is shared. All combining
/// operations allocate a new buffer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Str(Arc<str>);

impl Str {
    /// Creates an empty string.
    pub fn new() -> Self {
        Self(Arc::from(""))
    }

    /// The string viewed as a slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The length of the string in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the string is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenates two strings.
    pub fn concat(&self, other: &str) -> Self {
        let mut buf = String::with_capacity(self.len() + other.len());
        buf.push_str(self);
        buf.push_str(other);
        buf.into()
    }

    /// Repeats the string `n` times.
    pub fn repeat(&self, n: i64) -> StrResult<Self> {
        let n = usize::try_from(n)
            .map_err(|_| format!("cannot repeat this string {n} times"))?;
        Ok(self.0.repeat(n).into())
    }

    /// Extracts the grapheme cluster starting at `index`.
    ///
    /// A negative index counts from the end of the string. If the index is out
    /// of bounds or not on a character boundary, returns the `default` if one
    /// was provided and an error otherwise.
    pub fn at(&self, index: i64, default: Option<Self>) -> StrResult<Self> {
        self.locate(index)
            .filter(|&offset| self.0.is_char_boundary(offset))
            .and_then(|offset| self.0[offset..].graphemes(true).next())
            .map(Into::into)
            .or(default)
            .ok_or_else(|| out_of_bounds(index, self.len()))
    }

    /// Extracts a substring covering the byte range `start..end`, where both
    /// endpoints may be negative to count from the end.
    pub fn slice(&self, start: i64, end: Option<i64>) -> StrResult<Self> {
        let len = self.len();
        let start = self
            .locate(start)
            .ok_or_else(|| out_of_bounds(start, len))?;
        let end = match end {
            Some(end) => self.locate(end).ok_or_else(|| out_of_bounds(end, len))?,
            None => len,
        };
        let range = start..end.max(start);
        if !self.0.is_char_boundary(range.start) || !self.0.is_char_boundary(range.end) {
            return Err(not_a_boundary(start as i64));
        }
        Ok(self.0[range].into())
    }

    /// The first grapheme cluster.
    pub fn first(&self) -> StrResult<Self> {
        self.0
            .graphemes(true)
            .next()
            .map(Into::into)
            .ok_or_else(string_is_empty)
    }

    /// The last grapheme cluster.
    pub fn last(&self) -> StrResult<Self> {
        self.0
            .graphemes(true)
            .next_back()
            .map(Into::into)
            .ok_or_else(string_is_empty)
    }

    /// The byte offset of the first occurrence of `pattern`, if any.
    pub fn position(&self, pattern: &str) -> Option<i64> {
        self.0.find(pattern).map(|offset| offset as i64)
    }

    /// The first match of `pattern`, if any.
    pub fn find(&self, pattern: &str) -> Option<Self> {
        self.0.contains(pattern).then(|| pattern.into())
    }

    /// Whether the string contains `pattern`.
    pub fn contains(&self, pattern: &str) -> bool {
        self.0.contains(pattern)
    }

    /// Whether the string starts with `pattern`.
    pub fn starts_with(&self, pattern: &str) -> bool {
        self.0.starts_with(pattern)
    }

    /// Whether the string ends with `pattern`.
    pub fn ends_with(&self, pattern: &str) -> bool {
        self.0.ends_with(pattern)
    }

    /// The string with leading and trailing whitespace removed.
    pub fn trim(&self) -> Self {
        self.0.trim().into()
    }

    /// Splits the string at occurrences of `pattern`, or at whitespace when no
    /// pattern is given.
    pub fn split(&self, pattern: Option<&str>) -> Vec<Self> {
        match pattern {
            Some(pattern) => self.0.split(pattern).map(Into::into).collect(),
            None => self.0.split_whitespace().map(Into::into).collect(),
        }
    }

    /// Replaces all occurrences of `pattern` with `with`.
    pub fn replace(&self, pattern: &str, with: &str) -> Self {
        self.0.replace(pattern, with).into()
    }

    /// The string with its grapheme clusters reversed.
    pub fn rev(&self) -> Self {
        self.0.graphemes(true).rev().collect::<String>().into()
    }

    /// The grapheme clusters of the string.
    pub fn clusters(&self) -> Vec<Self> {
        self.0.graphemes(true).map(Into::into).collect()
    }

    /// The Unicode codepoints of the string, each as a string.
    pub fn codepoints(&self) -> Vec<Self> {
        self.0.chars().map(Into::into).collect()
    }

    /// The string converted to uppercase.
    pub fn to_upper(&self) -> Self {
        self.0.to_uppercase().into()
    }

    /// The string converted to lowercase.
    pub fn to_lower(&self) -> Self {
        self.0.to_lowercase().into()
    }

    /// Resolves a signed index to a byte offset, where negative values count
    /// from the end. Returns `None` when out of bounds.
    fn locate(&self, index: i64) -> Option<usize> {
        let len = self.len() as i64;
        let resolved = if index < 0 { len + index } else { index };
        (0..=len).contains(&resolved).then_some(resolved as usize)
    }
}

/// The out-of-bounds access error message.
fn out_of_bounds(index: i64, len: usize) -> String {
    format!("string index out of bounds (index: {index}, len: {len})")
}

/// The non-boundary access error message.
fn not_a_boundary(index: i64) -> String {
    format!("string index {index} is not a character boundary")
}

/// The empty-string access error message.
fn string_is_empty() -> String {
    "string is empty".into()
}

/// Writes the string as a quoted, escaped code representation.
pub fn repr_str(f: &mut impl fmt::Write, string: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in string.chars() {
        match c {
            '\\' => f.write_str(r"\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str(r"\n")?,
            '\r' => f.write_str(r"\r")?,
            '\t' => f.write_str(r"\t")?,
            _ => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

impl Default for Str {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Str {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Str {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Str {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Str {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for Str {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<char> for Str {
    fn from(c: char) -> Self {
        Self(Arc::from(c.to_string()))
    }
}

impl From<Str> for String {
    fn from(s: Str) -> Self {
        s.0.to_string()
    }
}

impl PartialEq<str> for Str {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Str {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_indices_count_from_the_end() {
        let s = Str::from("abc");
        assert_eq!(s.at(-1, None).unwrap(), "c");
        assert_eq!(s.at(0, None).unwrap(), "a");
        assert!(s.at(5, None).is_err());
        assert_eq!(s.at(5, Some("x".into())).unwrap(), "x");
    }

    #[test]
    fn slice_and_rev() {
        let s = Str::from("hello");
        assert_eq!(s.slice(1, Some(-1)).unwrap(), "ell");
        assert_eq!(s.rev(), "olleh");
    }
}
