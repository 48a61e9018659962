use std::{fmt, sync::Arc};

use crate::{
    span::Span,
    types::{Args, Content, Func, Label, Regex, Str},
    value::Value,
};

/// An ordered collection of style rules and recipes.
///
/// Later entries override earlier ones: when a style property is resolved,
/// the entries are scanned from the end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Styles {
    entries: Arc<Vec<Style>>,
    span: Span,
}

/// A single style entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Style {
    /// A set rule's stored arguments.
    Set(SetStyle),
    /// A show rule.
    Recipe(Recipe),
}

/// The arguments of a set rule, keyed by the element they configure.
#[derive(Debug, Clone, PartialEq)]
pub struct SetStyle {
    /// The name of the element function the rule targets.
    pub elem: Str,
    /// The rule's stored arguments.
    pub args: Args,
    /// The span of the set rule.
    pub span: Span,
}

/// A show rule: a selector deciding which elements are affected and a
/// transformation applied to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    /// The span of the show rule.
    pub span: Span,
    /// What the rule applies to. A rule without a selector transforms
    /// everything.
    pub selector: Option<Selector>,
    /// What to do with matched elements.
    pub transform: Transformation,
}

/// Decides whether a recipe applies to a content element.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Matches elements with the given name.
    Elem(Str),
    /// Matches elements carrying the given label.
    Label(Label),
    /// Matches text by literal pattern.
    Text(Str),
    /// Matches text by regular expression.
    Regex(Regex),
    /// Matches when any of the selectors matches.
    Or(Vec<Selector>),
    /// Matches when all of the selectors match.
    And(Vec<Selector>),
    /// Matches before the anchor selector has matched in document order.
    Before {
        /// The restricted selector.
        selector: Box<Selector>,
        /// The anchor that ends the accepted range.
        end: Box<Selector>,
    },
    /// Matches after the anchor selector has matched in document order.
    After {
        /// The restricted selector.
        selector: Box<Selector>,
        /// The anchor that starts the accepted range.
        start: Box<Selector>,
    },
}

/// What a recipe does with a matched element.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformation {
    /// Removes the element.
    None,
    /// Replaces the element with fixed content.
    Content(Content),
    /// Wraps the element in a styled wrapper carrying additional styles.
    Styles(Styles),
    /// Calls a function with the matched value and uses its result.
    Func(Func),
}

impl Styles {
    /// Creates an empty style collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a style collection holding a single entry.
    pub fn from_style(style: Style) -> Self {
        Self { entries: Arc::new(vec![style]), span: Span::detached() }
    }

    /// Attaches the span of the originating rule.
    #[must_use]
    pub fn spanned(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The span of the originating rule.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Whether the collection has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entries, in declaration order.
    pub fn entries(&self) -> &[Style] {
        &self.entries
    }

    /// Appends an entry.
    pub fn push(&mut self, style: Style) {
        Arc::make_mut(&mut self.entries).push(style);
    }

    /// Appends all entries of `outer`, which thereby take precedence over the
    /// existing ones.
    pub fn apply(&mut self, outer: &Self) {
        Arc::make_mut(&mut self.entries).extend(outer.entries.iter().cloned());
    }

    /// The recipes among the entries, in declaration order.
    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.entries.iter().filter_map(|style| match style {
            Style::Recipe(recipe) => Some(recipe),
            Style::Set(_) => None,
        })
    }

    /// Resolves the value a set rule assigned to `param` of `elem`.
    ///
    /// Entries are scanned from the end, so the set rule declared last wins.
    pub fn resolve(&self, elem: &str, param: &str) -> Option<Value> {
        self.entries.iter().rev().find_map(|style| match style {
            Style::Set(set) if set.elem.as_str() == elem => set
                .args
                .items
                .iter()
                .rev()
                .find(|arg| arg.name.as_deref() == Some(param))
                .map(|arg| arg.value.v.clone()),
            _ => None,
        })
    }
}

impl From<SetStyle> for Styles {
    fn from(set: SetStyle) -> Self {
        let span = set.span;
        Self::from_style(Style::Set(set)).spanned(span)
    }
}

impl From<Recipe> for Styles {
    fn from(recipe: Recipe) -> Self {
        let span = recipe.span;
        Self::from_style(Style::Recipe(recipe)).spanned(span)
    }
}

impl fmt::Display for Styles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "styles(..)")
    }
}
