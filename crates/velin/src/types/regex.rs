use std::{fmt, ops::Deref, sync::Arc};

use crate::diag::StrResult;

/// A compiled regular expression, used as a show-rule text selector.
///
/// Regexes compare by pattern.
#[derive(Debug, Clone)]
pub struct Regex(Arc<regex::Regex>);

impl Regex {
    /// Compiles a regular expression.
    ///
    /// A compile failure surfaces as an evaluator error carrying the pattern.
    pub fn new(pattern: &str) -> StrResult<Self> {
        regex::Regex::new(pattern)
            .map(|compiled| Self(Arc::new(compiled)))
            .map_err(|err| format!("failed to compile regular expression `{pattern}` ({err})"))
    }

    /// The source pattern.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for Regex {
    type Target = regex::Regex;

    fn deref(&self) -> &regex::Regex {
        &self.0
    }
}

impl PartialEq for Regex {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "regex({:?})", self.as_str())
    }
}
