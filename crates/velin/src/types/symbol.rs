use std::{fmt, sync::Arc};

use crate::{diag::StrResult, types::Str};

/// A symbol: a single codepoint, optionally with a chain of named variants
/// that refine it (for example an arrow with `l`, `r`, and `double`
/// modifiers).
///
/// Symbols join with strings and other symbols like text does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    /// The codepoint of the default variant.
    c: char,
    /// Named refinements, each mapping a modifier to a codepoint.
    variants: Arc<[(Str, char)]>,
}

impl Symbol {
    /// Creates a symbol with a single codepoint and no variants.
    pub fn single(c: char) -> Self {
        Self { c, variants: Arc::from([]) }
    }

    /// Creates a symbol with named variants.
    pub fn with_variants(c: char, variants: impl IntoIterator<Item = (Str, char)>) -> Self {
        Self { c, variants: variants.into_iter().collect() }
    }

    /// The symbol's default codepoint.
    pub fn get(&self) -> char {
        self.c
    }

    /// Resolves a variant by modifier name.
    pub fn variant(&self, modifier: &str) -> StrResult<Self> {
        self.variants
            .iter()
            .find(|(name, _)| name.as_str() == modifier)
            .map(|&(_, c)| Self::single(c))
            .ok_or_else(|| format!("unknown symbol modifier: {modifier}"))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}", self.c))
    }
}
