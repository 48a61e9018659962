//! The abstract syntax tree consumed by the evaluator.
//!
//! The parser is an external collaborator: the evaluator consumes these nodes
//! read-only and never looks at raw source text. Hosts (and tests) construct
//! trees through the constructors on [`Expr`], [`Markup`], and friends, which
//! default every span to [`Span::detached`]; a parser wires real spans in via
//! [`Expr::spanned`] and the per-node span fields.

use std::sync::Arc;

use crate::span::{Span, Spanned};

/// A name occurring in source code.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    /// The identifier text.
    pub name: String,
    /// The identifier's location.
    pub span: Span,
}

impl Ident {
    /// Creates an identifier with a detached span.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), span: Span::detached() }
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

/// A numeric literal's unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Points.
    Pt,
    /// Millimeters.
    Mm,
    /// Centimeters.
    Cm,
    /// Inches.
    In,
    /// Font-relative ems.
    Em,
    /// Degrees.
    Deg,
    /// Radians.
    Rad,
    /// A percentage.
    Percent,
    /// A fraction of remaining space.
    Fr,
}

/// A stream of markup nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Markup {
    /// The nodes, in source order.
    pub nodes: Vec<MarkupNode>,
}

impl Markup {
    /// Creates markup from a list of nodes.
    pub fn new(nodes: Vec<MarkupNode>) -> Self {
        Self { nodes }
    }
}

/// A single node of markup.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    /// Whitespace between words.
    Space(Span),
    /// A forced line break: `\`.
    Linebreak(Span),
    /// A paragraph break: a blank line.
    Parbreak(Span),
    /// Plain text.
    Text(Spanned<String>),
    /// An escaped character: `\#`.
    Escape(Spanned<char>),
    /// A shorthand for a Unicode codepoint, for example `~` or `---`.
    Shorthand(Spanned<String>),
    /// A smart quote: `'` or `"`.
    SmartQuote {
        /// Whether this is a double quote.
        double: bool,
        /// The node's location.
        span: Span,
    },
    /// Strong content: `*bold*`.
    Strong(Spanned<Markup>),
    /// Emphasized content: `_emphasized_`.
    Emph(Spanned<Markup>),
    /// Raw text with optional syntax highlighting language.
    Raw {
        /// The raw text.
        text: String,
        /// The language tag.
        lang: Option<String>,
        /// Whether this is a block-level raw element.
        block: bool,
        /// The node's location.
        span: Span,
    },
    /// A hyperlink: `https://example.com`.
    Link(Spanned<String>),
    /// A label attaching to the preceding element: `<name>`.
    Label(Spanned<String>),
    /// A reference to a label: `@name`.
    Ref(Spanned<String>),
    /// A section heading: `== Title`.
    Heading {
        /// The nesting depth, starting at 1.
        level: i64,
        /// The heading text.
        body: Markup,
        /// The node's location.
        span: Span,
    },
    /// An item of an unordered list: `- item`.
    ListItem {
        /// The item body.
        body: Markup,
        /// The node's location.
        span: Span,
    },
    /// An item of an ordered list: `+ item` or `3. item`.
    EnumItem {
        /// An explicit item number.
        number: Option<i64>,
        /// The item body.
        body: Markup,
        /// The node's location.
        span: Span,
    },
    /// An item of a term list: `/ term: description`.
    TermItem {
        /// The term.
        term: Markup,
        /// The description.
        description: Markup,
        /// The node's location.
        span: Span,
    },
    /// A mathematical equation: `$x$`.
    Equation {
        /// Whether the equation is displayed on its own line.
        block: bool,
        /// The equation body.
        body: Markup,
        /// The node's location.
        span: Span,
    },
    /// An embedded expression.
    Expr(Expr),
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// The expression's location.
    pub span: Span,
    /// What kind of expression this is.
    pub kind: ExprKind,
}

/// The different kinds of expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// The `none` literal.
    None,
    /// The `auto` literal.
    Auto,
    /// A boolean literal.
    Bool(bool),
    /// An integer literal.
    Int(i64),
    /// A float literal.
    Float(f64),
    /// A numeric literal with a unit: `12pt`, `50%`.
    Numeric(f64, Unit),
    /// A string literal, with escape sequences still unprocessed.
    Str(String),
    /// An identifier.
    Ident(String),
    /// A code block: `{ .. }`.
    Code(Vec<Expr>),
    /// A content block: `[ .. ]`.
    Content(Markup),
    /// An array literal.
    Array(Vec<ArrayItem>),
    /// A dictionary literal.
    Dict(Vec<DictItem>),
    /// A parenthesized expression.
    Parenthesized(Box<Expr>),
    /// A field access: `target.field`.
    FieldAccess {
        /// The expression to access a field on.
        target: Box<Expr>,
        /// The accessed field.
        field: Ident,
    },
    /// A function call: `callee(..)`.
    FuncCall {
        /// The called expression.
        callee: Box<Expr>,
        /// The call's arguments.
        args: Vec<ArgItem>,
    },
    /// A closure: `(x, y) => ..`.
    Closure(Arc<ClosureExpr>),
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnOp,
        /// The operand.
        expr: Box<Expr>,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinOp,
        /// The left operand.
        lhs: Box<Expr>,
        /// The right operand.
        rhs: Box<Expr>,
    },
    /// A let binding: `let pattern = init`.
    Let {
        /// The bound pattern.
        pattern: Pattern,
        /// The initializing expression.
        init: Option<Box<Expr>>,
    },
    /// A destructuring assignment into existing bindings.
    DestructAssign {
        /// The assigned pattern.
        pattern: Pattern,
        /// The assigned value.
        value: Box<Expr>,
    },
    /// A set rule: `set text(..) if cond`.
    Set(SetRule),
    /// A show rule: `show selector: transform`.
    Show(ShowRule),
    /// A contextual expression: `context body`.
    Contextual(Box<Expr>),
    /// An if-else expression.
    Conditional {
        /// The condition.
        condition: Box<Expr>,
        /// The body to evaluate when the condition is true.
        if_body: Box<Expr>,
        /// The body to evaluate otherwise.
        else_body: Option<Box<Expr>>,
    },
    /// A while loop.
    While {
        /// The loop condition.
        condition: Box<Expr>,
        /// The loop body.
        body: Box<Expr>,
    },
    /// A for loop.
    For {
        /// The pattern binding each item.
        pattern: Pattern,
        /// The iterated expression.
        iterable: Box<Expr>,
        /// The loop body.
        body: Box<Expr>,
    },
    /// A module import.
    Import {
        /// The import source.
        source: Box<Expr>,
        /// A new name for the imported module: `as name`.
        new_name: Option<Ident>,
        /// The imported items, or the whole module when absent.
        imports: Option<Imports>,
    },
    /// A module include.
    Include {
        /// The include source.
        source: Box<Expr>,
    },
    /// A `break` inside a loop.
    Break,
    /// A `continue` inside a loop.
    Continue,
    /// A `return` inside a function, with an optional value.
    Return(Option<Box<Expr>>),
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// The plus operator.
    Pos,
    /// The negation operator.
    Neg,
    /// The boolean `not`.
    Not,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `and`
    And,
    /// `or`
    Or,
    /// `==`
    Eq,
    /// `!=`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    Leq,
    /// `>`
    Gt,
    /// `>=`
    Geq,
    /// `in`
    In,
    /// `not in`
    NotIn,
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `*=`
    MulAssign,
    /// `/=`
    DivAssign,
}

/// An item of an array literal.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayItem {
    /// A plain value.
    Pos(Expr),
    /// A spread of another array: `..arr`.
    Spread(Expr),
}

/// An item of a dictionary literal.
#[derive(Debug, Clone, PartialEq)]
pub enum DictItem {
    /// A named entry: `name: value`.
    Named(Ident, Expr),
    /// An entry with a computed string key: `"key": value`.
    Keyed(Expr, Expr),
    /// A spread of another dictionary: `..dict`.
    Spread(Expr),
}

/// An item of a call's argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgItem {
    /// A positional argument.
    Pos(Expr),
    /// A named argument: `name: value`.
    Named(Ident, Expr),
    /// A spread of an array, dictionary, or argument pack: `..args`.
    Spread(Expr),
}

/// A closure expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureExpr {
    /// The name from the enclosing let binding, if any.
    pub name: Option<Ident>,
    /// The parameters.
    pub params: Vec<Param>,
    /// The body.
    pub body: Expr,
    /// The closure's location.
    pub span: Span,
}

/// A parameter of a closure.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A positional parameter, possibly destructuring.
    Pos(Pattern),
    /// A named parameter with a default value.
    Named(Ident, Expr),
    /// An argument sink: `..rest`.
    Sink(Span, Option<Ident>),
}

/// A binding or assignment pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// A single expression: an identifier when binding, any accessible
    /// expression when assigning.
    Normal(Box<Expr>),
    /// A placeholder discarding the value: `_`.
    Placeholder(Span),
    /// A parenthesized pattern.
    Parenthesized(Box<Pattern>),
    /// A destructuring pattern.
    Destructuring(Destructuring),
}

/// A destructuring pattern: `(a, b, ..rest)` or `(key: a)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Destructuring {
    /// The pattern's location.
    pub span: Span,
    /// The destructured items.
    pub items: Vec<DestructuringItem>,
}

/// An item of a destructuring pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum DestructuringItem {
    /// A positional sub-pattern.
    Pattern(Pattern),
    /// A named sub-pattern, destructuring a dictionary key.
    Named(Ident, Pattern),
    /// A sink collecting unmatched items: `..rest`.
    Spread(Span, Option<Ident>),
}

/// The items of an import.
#[derive(Debug, Clone, PartialEq)]
pub enum Imports {
    /// Import all exported bindings: `*`.
    Wildcard,
    /// Import selected items.
    Items(Vec<ImportItem>),
}

/// A single imported item, possibly a dotted path with a rename.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportItem {
    /// The dotted path to the item.
    pub path: Vec<Ident>,
    /// The binding name override: `as name`.
    pub rename: Option<Ident>,
}

/// A set rule.
#[derive(Debug, Clone, PartialEq)]
pub struct SetRule {
    /// The target element function.
    pub target: Box<Expr>,
    /// The configured arguments.
    pub args: Vec<ArgItem>,
    /// An optional condition guarding the rule.
    pub condition: Option<Box<Expr>>,
}

/// A show rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowRule {
    /// What the rule selects. A rule without a selector transforms
    /// everything.
    pub selector: Option<Box<Expr>>,
    /// The transformation to apply. May be a nested set rule.
    pub transform: Box<Expr>,
}

impl Expr {
    fn new(kind: ExprKind) -> Self {
        Self { span: Span::detached(), kind }
    }

    /// Attaches a span to the expression.
    #[must_use]
    pub fn spanned(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Creates a `none` literal.
    pub fn none() -> Self {
        Self::new(ExprKind::None)
    }

    /// Creates an `auto` literal.
    pub fn auto() -> Self {
        Self::new(ExprKind::Auto)
    }

    /// Creates a boolean literal.
    pub fn bool(v: bool) -> Self {
        Self::new(ExprKind::Bool(v))
    }

    /// Creates an integer literal.
    pub fn int(v: i64) -> Self {
        Self::new(ExprKind::Int(v))
    }

    /// Creates a float literal.
    pub fn float(v: f64) -> Self {
        Self::new(ExprKind::Float(v))
    }

    /// Creates a numeric literal with a unit.
    pub fn numeric(v: f64, unit: Unit) -> Self {
        Self::new(ExprKind::Numeric(v, unit))
    }

    /// Creates a string literal.
    pub fn str(v: impl Into<String>) -> Self {
        Self::new(ExprKind::Str(v.into()))
    }

    /// Creates an identifier expression.
    pub fn ident(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Ident(name.into()))
    }

    /// Creates a code block.
    pub fn code(exprs: Vec<Self>) -> Self {
        Self::new(ExprKind::Code(exprs))
    }

    /// Creates a content block.
    pub fn content(markup: Markup) -> Self {
        Self::new(ExprKind::Content(markup))
    }

    /// Creates an array literal.
    pub fn array(items: Vec<ArrayItem>) -> Self {
        Self::new(ExprKind::Array(items))
    }

    /// Creates an array literal of plain values.
    pub fn array_pos(items: Vec<Self>) -> Self {
        Self::array(items.into_iter().map(ArrayItem::Pos).collect())
    }

    /// Creates a dictionary literal.
    pub fn dict(items: Vec<DictItem>) -> Self {
        Self::new(ExprKind::Dict(items))
    }

    /// Creates a parenthesized expression.
    pub fn paren(inner: Self) -> Self {
        Self::new(ExprKind::Parenthesized(Box::new(inner)))
    }

    /// Creates a field access.
    pub fn field(target: Self, field: impl Into<String>) -> Self {
        Self::new(ExprKind::FieldAccess {
            target: Box::new(target),
            field: Ident::new(field),
        })
    }

    /// Creates a function call.
    pub fn call(callee: Self, args: Vec<ArgItem>) -> Self {
        Self::new(ExprKind::FuncCall { callee: Box::new(callee), args })
    }

    /// Creates a function call with only positional arguments.
    pub fn call_pos(callee: Self, args: Vec<Self>) -> Self {
        Self::call(callee, args.into_iter().map(ArgItem::Pos).collect())
    }

    /// Creates a method call: `target.method(args..)`.
    pub fn method(target: Self, method: impl Into<String>, args: Vec<Self>) -> Self {
        Self::call_pos(Self::field(target, method), args)
    }

    /// Creates a closure expression.
    pub fn closure(params: Vec<Param>, body: Self) -> Self {
        Self::new(ExprKind::Closure(Arc::new(ClosureExpr {
            name: None,
            params,
            body,
            span: Span::detached(),
        })))
    }

    /// Creates a unary operation.
    pub fn unary(op: UnOp, expr: Self) -> Self {
        Self::new(ExprKind::Unary { op, expr: Box::new(expr) })
    }

    /// Creates a binary operation.
    pub fn binary(op: BinOp, lhs: Self, rhs: Self) -> Self {
        Self::new(ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    /// Creates a let binding for a pattern.
    pub fn let_pattern(pattern: Pattern, init: Option<Self>) -> Self {
        Self::new(ExprKind::Let { pattern, init: init.map(Box::new) })
    }

    /// Creates a let binding for a single name.
    pub fn let_bind(name: impl Into<String>, init: Self) -> Self {
        Self::let_pattern(Pattern::Normal(Box::new(Self::ident(name))), Some(init))
    }

    /// Creates a let binding of a named closure: `let f(params..) = body`.
    pub fn let_closure(name: impl Into<String>, params: Vec<Param>, body: Self) -> Self {
        let name = name.into();
        let closure = Self::new(ExprKind::Closure(Arc::new(ClosureExpr {
            name: Some(Ident::new(name.clone())),
            params,
            body,
            span: Span::detached(),
        })));
        Self::let_pattern(Pattern::Normal(Box::new(Self::ident(name))), Some(closure))
    }

    /// Creates a destructuring assignment.
    pub fn destruct_assign(pattern: Pattern, value: Self) -> Self {
        Self::new(ExprKind::DestructAssign { pattern, value: Box::new(value) })
    }

    /// Creates a set rule.
    pub fn set(target: Self, args: Vec<ArgItem>, condition: Option<Self>) -> Self {
        Self::new(ExprKind::Set(SetRule {
            target: Box::new(target),
            args,
            condition: condition.map(Box::new),
        }))
    }

    /// Creates a show rule.
    pub fn show(selector: Option<Self>, transform: Self) -> Self {
        Self::new(ExprKind::Show(ShowRule {
            selector: selector.map(Box::new),
            transform: Box::new(transform),
        }))
    }

    /// Creates a contextual expression.
    pub fn contextual(body: Self) -> Self {
        Self::new(ExprKind::Contextual(Box::new(body)))
    }

    /// Creates an if-else expression.
    pub fn conditional(condition: Self, if_body: Self, else_body: Option<Self>) -> Self {
        Self::new(ExprKind::Conditional {
            condition: Box::new(condition),
            if_body: Box::new(if_body),
            else_body: else_body.map(Box::new),
        })
    }

    /// Creates a while loop.
    pub fn while_loop(condition: Self, body: Self) -> Self {
        Self::new(ExprKind::While { condition: Box::new(condition), body: Box::new(body) })
    }

    /// Creates a for loop.
    pub fn for_loop(pattern: Pattern, iterable: Self, body: Self) -> Self {
        Self::new(ExprKind::For {
            pattern,
            iterable: Box::new(iterable),
            body: Box::new(body),
        })
    }

    /// Creates an import.
    pub fn import(source: Self, new_name: Option<Ident>, imports: Option<Imports>) -> Self {
        Self::new(ExprKind::Import { source: Box::new(source), new_name, imports })
    }

    /// Creates an include.
    pub fn include(source: Self) -> Self {
        Self::new(ExprKind::Include { source: Box::new(source) })
    }

    /// Creates a `break`.
    pub fn break_stmt() -> Self {
        Self::new(ExprKind::Break)
    }

    /// Creates a `continue`.
    pub fn continue_stmt() -> Self {
        Self::new(ExprKind::Continue)
    }

    /// Creates a `return` with an optional value.
    pub fn return_stmt(value: Option<Self>) -> Self {
        Self::new(ExprKind::Return(value.map(Box::new)))
    }
}

impl Pattern {
    /// Creates a pattern binding a single name.
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Normal(Box::new(Expr::ident(name)))
    }

    /// Creates a destructuring pattern of positional names.
    pub fn names(names: &[&str]) -> Self {
        Self::Destructuring(Destructuring {
            span: Span::detached(),
            items: names
                .iter()
                .map(|name| DestructuringItem::Pattern(Self::ident(*name)))
                .collect(),
        })
    }

    /// The identifiers this pattern binds.
    pub fn bindings(&self) -> Vec<&str> {
        let mut names = vec![];
        self.collect_bindings(&mut names);
        names
    }

    fn collect_bindings<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Normal(expr) => {
                if let ExprKind::Ident(name) = &expr.kind {
                    names.push(name);
                }
            }
            Self::Placeholder(_) => {}
            Self::Parenthesized(inner) => inner.collect_bindings(names),
            Self::Destructuring(destructuring) => {
                for item in &destructuring.items {
                    match item {
                        DestructuringItem::Pattern(pattern) => pattern.collect_bindings(names),
                        DestructuringItem::Named(_, pattern) => pattern.collect_bindings(names),
                        DestructuringItem::Spread(_, ident) => {
                            if let Some(ident) = ident {
                                names.push(&ident.name);
                            }
                        }
                    }
                }
            }
        }
    }
}

impl MarkupNode {
    /// Creates a text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(Spanned::new(text.into(), Span::detached()))
    }

    /// Creates a space node.
    pub fn space() -> Self {
        Self::Space(Span::detached())
    }

    /// Creates a shorthand node.
    pub fn shorthand(text: impl Into<String>) -> Self {
        Self::Shorthand(Spanned::new(text.into(), Span::detached()))
    }

    /// Creates a strong node.
    pub fn strong(body: Markup) -> Self {
        Self::Strong(Spanned::new(body, Span::detached()))
    }

    /// Creates an emphasis node.
    pub fn emph(body: Markup) -> Self {
        Self::Emph(Spanned::new(body, Span::detached()))
    }

    /// Creates a heading node.
    pub fn heading(level: i64, body: Markup) -> Self {
        Self::Heading { level, body, span: Span::detached() }
    }

    /// Creates a label node.
    pub fn label(name: impl Into<String>) -> Self {
        Self::Label(Spanned::new(name.into(), Span::detached()))
    }

    /// The node's location.
    pub fn span(&self) -> Span {
        match self {
            Self::Space(span)
            | Self::Linebreak(span)
            | Self::Parbreak(span)
            | Self::SmartQuote { span, .. }
            | Self::Raw { span, .. }
            | Self::Heading { span, .. }
            | Self::ListItem { span, .. }
            | Self::EnumItem { span, .. }
            | Self::TermItem { span, .. }
            | Self::Equation { span, .. } => *span,
            Self::Text(spanned) => spanned.span,
            Self::Escape(spanned) => spanned.span,
            Self::Shorthand(spanned) => spanned.span,
            Self::Strong(spanned) => spanned.span,
            Self::Emph(spanned) => spanned.span,
            Self::Link(spanned) => spanned.span,
            Self::Label(spanned) => spanned.span,
            Self::Ref(spanned) => spanned.span,
            Self::Expr(expr) => expr.span,
        }
    }
}
