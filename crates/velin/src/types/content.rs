use std::{fmt, sync::Arc};

use crate::{
    span::Span,
    types::{Dict, Func, Label, Str, Styles},
    value::Value,
};

/// The primary output value: an ordered list of content elements.
///
/// Content is cheap to clone; the element list is shared. Equality is deep
/// structural comparison of the element trees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content(Arc<Vec<Elem>>);

/// A single element inside content.
#[derive(Debug, Clone, PartialEq)]
pub struct Elem {
    /// What the element is.
    pub kind: ElemKind,
    /// A label attached to the element, targetable by references and show
    /// rules.
    pub label: Option<Label>,
    /// The span of the originating syntax.
    pub span: Span,
}

/// The semantic kinds of content elements.
///
/// Every kind has a stable name used for set and show rule matching.
#[derive(Debug, Clone, PartialEq)]
pub enum ElemKind {
    /// Plain text.
    Text(Str),
    /// A single space between words.
    Space,
    /// A forced line break.
    Linebreak,
    /// A paragraph break.
    Parbreak,
    /// A smart quote character.
    SmartQuote {
        /// Whether this is a double quote.
        double: bool,
    },
    /// Strongly emphasized content.
    Strong(Content),
    /// Emphasized content.
    Emph(Content),
    /// Raw (verbatim) text, optionally tagged with a language.
    Raw {
        /// The raw text.
        text: Str,
        /// The language tag.
        lang: Option<Str>,
        /// Whether this is a block-level raw element.
        block: bool,
    },
    /// A link to a URL.
    Link {
        /// The link destination.
        url: Str,
        /// The link body; the URL itself is shown when absent.
        body: Option<Content>,
    },
    /// A reference to a labelled element.
    Ref(Label),
    /// A section heading.
    Heading {
        /// The nesting depth, starting at 1.
        level: i64,
        /// The heading text.
        body: Content,
    },
    /// An item of an unordered list.
    ListItem(Content),
    /// An item of an ordered list.
    EnumItem {
        /// An explicit item number.
        number: Option<i64>,
        /// The item body.
        body: Content,
    },
    /// An item of a term list.
    TermItem {
        /// The term.
        term: Content,
        /// The term's description.
        description: Content,
    },
    /// A mathematical equation.
    Equation {
        /// Whether the equation is displayed on its own line.
        block: bool,
        /// The equation body.
        body: Content,
    },
    /// An image.
    Image {
        /// The path to the image file.
        path: Str,
        /// A description of the image.
        alt: Option<Str>,
    },
    /// A multi-column layout region.
    Columns {
        /// The number of columns.
        count: i64,
        /// The content to lay out.
        body: Content,
    },
    /// A wrapper that applies styles to its body.
    Styled {
        /// The styles to apply.
        styles: Styles,
        /// The styled content.
        body: Content,
    },
    /// A deferred body that runs with access to its styling context.
    Context(Func),
    /// An element defined by the standard library or a user, carrying its
    /// fields as a dictionary.
    Custom {
        /// The element name.
        name: Str,
        /// The element's fields.
        fields: Dict,
        /// The element's body, if it has one.
        body: Option<Content>,
    },
}

impl Elem {
    /// Creates an element of the given kind with a span and no label.
    pub fn new(kind: ElemKind, span: Span) -> Self {
        Self { kind, label: None, span }
    }

    /// The element's name, used for selector matching.
    pub fn name(&self) -> &str {
        match &self.kind {
            ElemKind::Text(_) => "text",
            ElemKind::Space => "space",
            ElemKind::Linebreak => "linebreak",
            ElemKind::Parbreak => "parbreak",
            ElemKind::SmartQuote { .. } => "smartquote",
            ElemKind::Strong(_) => "strong",
            ElemKind::Emph(_) => "emph",
            ElemKind::Raw { .. } => "raw",
            ElemKind::Link { .. } => "link",
            ElemKind::Ref(_) => "ref",
            ElemKind::Heading { .. } => "heading",
            ElemKind::ListItem(_) => "list.item",
            ElemKind::EnumItem { .. } => "enum.item",
            ElemKind::TermItem { .. } => "terms.item",
            ElemKind::Equation { .. } => "equation",
            ElemKind::Image { .. } => "image",
            ElemKind::Columns { .. } => "columns",
            ElemKind::Styled { .. } => "styled",
            ElemKind::Context(_) => "context",
            ElemKind::Custom { name, .. } => name,
        }
    }

    /// The fields the element exposes to field access.
    pub fn field(&self, name: &str) -> Option<Value> {
        if name == "label" {
            return self.label.clone().map(Value::Label);
        }
        match &self.kind {
            ElemKind::Text(text) if name == "text" => Some(Value::Str(text.clone())),
            ElemKind::Strong(body) | ElemKind::Emph(body) | ElemKind::ListItem(body)
                if name == "body" =>
            {
                Some(Value::Content(body.clone()))
            }
            ElemKind::Raw { text, lang, .. } => match name {
                "text" => Some(Value::Str(text.clone())),
                "lang" => Some(lang.clone().map_or(Value::None, Value::Str)),
                _ => None,
            },
            ElemKind::Link { url, body } => match name {
                "dest" => Some(Value::Str(url.clone())),
                "body" => body.clone().map(Value::Content),
                _ => None,
            },
            ElemKind::Ref(target) if name == "target" => Some(Value::Label(target.clone())),
            ElemKind::Heading { level, body } => match name {
                "level" => Some(Value::Int(*level)),
                "body" => Some(Value::Content(body.clone())),
                _ => None,
            },
            ElemKind::EnumItem { number, body } => match name {
                "number" => Some(number.map_or(Value::None, Value::Int)),
                "body" => Some(Value::Content(body.clone())),
                _ => None,
            },
            ElemKind::TermItem { term, description } => match name {
                "term" => Some(Value::Content(term.clone())),
                "description" => Some(Value::Content(description.clone())),
                _ => None,
            },
            ElemKind::Equation { block, body } => match name {
                "block" => Some(Value::Bool(*block)),
                "body" => Some(Value::Content(body.clone())),
                _ => None,
            },
            ElemKind::Image { path, alt } => match name {
                "path" => Some(Value::Str(path.clone())),
                "alt" => Some(alt.clone().map_or(Value::None, Value::Str)),
                _ => None,
            },
            ElemKind::Columns { count, body } => match name {
                "count" => Some(Value::Int(*count)),
                "body" => Some(Value::Content(body.clone())),
                _ => None,
            },
            ElemKind::Styled { body, .. } if name == "body" => {
                Some(Value::Content(body.clone()))
            }
            ElemKind::Custom { fields, body, .. } => {
                if name == "body" {
                    body.clone().map(Value::Content)
                } else {
                    fields.contains(name).then(|| fields.get(name))
                }
            }
            _ => None,
        }
    }

    /// The element's direct child content, if it has any.
    pub fn body(&self) -> Option<&Content> {
        match &self.kind {
            ElemKind::Strong(body)
            | ElemKind::Emph(body)
            | ElemKind::ListItem(body)
            | ElemKind::Heading { body, .. }
            | ElemKind::EnumItem { body, .. }
            | ElemKind::Equation { body, .. }
            | ElemKind::Columns { body, .. }
            | ElemKind::Styled { body, .. } => Some(body),
            ElemKind::Link { body, .. } | ElemKind::Custom { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Returns the element with its body replaced.
    pub(crate) fn with_body(&self, new: Content) -> Self {
        let mut elem = self.clone();
        match &mut elem.kind {
            ElemKind::Strong(body)
            | ElemKind::Emph(body)
            | ElemKind::ListItem(body)
            | ElemKind::Heading { body, .. }
            | ElemKind::EnumItem { body, .. }
            | ElemKind::Equation { body, .. }
            | ElemKind::Columns { body, .. }
            | ElemKind::Styled { body, .. } => *body = new,
            ElemKind::Link { body, .. } | ElemKind::Custom { body, .. } => *body = Some(new),
            _ => {}
        }
        elem
    }
}

impl Content {
    /// Creates empty content.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates content holding a single element.
    pub fn elem(elem: Elem) -> Self {
        Self(Arc::new(vec![elem]))
    }

    /// Creates content from a sequence of elements.
    pub fn sequence(elems: Vec<Elem>) -> Self {
        Self(Arc::new(elems))
    }

    /// Creates a text element from a string.
    pub fn text(text: impl Into<Str>, span: Span) -> Self {
        Self::elem(Elem::new(ElemKind::Text(text.into()), span))
    }

    /// Whether the content holds no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The elements.
    pub fn elems(&self) -> &[Elem] {
        &self.0
    }

    /// Appends an element.
    pub fn push(&mut self, elem: Elem) {
        Arc::make_mut(&mut self.0).push(elem);
    }

    /// Concatenates two pieces of content.
    pub fn concat(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let mut elems = Vec::with_capacity(self.0.len() + other.0.len());
        elems.extend(self.0.iter().cloned());
        elems.extend(other.0.iter().cloned());
        Self::sequence(elems)
    }

    /// Attaches a label to the last element, if there is one.
    ///
    /// Returns whether a target element was found.
    pub fn labelled(&mut self, label: Label) -> bool {
        match Arc::make_mut(&mut self.0).last_mut() {
            Some(elem) => {
                elem.label = Some(label);
                true
            }
            None => false,
        }
    }

    /// Wraps the content in a styled wrapper carrying the given styles.
    ///
    /// Empty styles leave the content untouched.
    #[must_use]
    pub fn styled(self, styles: Styles) -> Self {
        if styles.is_empty() {
            return self;
        }
        let span = styles.span();
        Self::elem(Elem::new(ElemKind::Styled { styles, body: self }, span))
    }

    /// Collects the plain text of the content tree, descending into
    /// child-bearing elements and ignoring structural breaks.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for elem in self.elems() {
            match &elem.kind {
                ElemKind::Text(text) => out.push_str(text),
                ElemKind::Space => out.push(' '),
                ElemKind::Raw { text, .. } => out.push_str(text),
                _ => {
                    if let Some(body) = elem.body() {
                        body.collect_text(out);
                    }
                }
            }
        }
    }
}

impl From<Elem> for Content {
    fn from(elem: Elem) -> Self {
        Self::elem(elem)
    }
}

impl FromIterator<Elem> for Content {
    fn from_iter<T: IntoIterator<Item = Elem>>(iter: T) -> Self {
        Self::sequence(iter.into_iter().collect())
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[..]")
    }
}
