//! Tests for set rules, show rules, and realization.

use pretty_assertions::assert_eq;
use velin::{
    ArgItem, Content, Elem, ElemKind, Engine, Expr, Ident, Label, Markup, MarkupNode, Param,
    Pattern, Recipe, Selector, Span, Styles, TestWorld, Transformation, eval_main, realize,
};

/// Evaluates the main markup and realizes its content with no outer styles.
fn eval_and_realize(markup: Markup) -> Result<Content, Box<velin::Error>> {
    let world = TestWorld::new(markup);
    let mut engine = Engine::new(&world);
    let module = eval_main(&mut engine)?;
    realize(&mut engine, module.content(), &Styles::new())
}

#[test]
fn text_show_rule_replaces_matches() {
    // show "foo": "bar"  applied to "foo bar foo"
    let markup = Markup::new(vec![
        MarkupNode::Expr(Expr::show(Some(Expr::str("foo")), Expr::str("bar"))),
        MarkupNode::text("foo bar foo"),
    ]);
    let realized = eval_and_realize(markup).unwrap();
    assert_eq!(realized.plain_text(), "bar bar bar");
}

#[test]
fn regex_show_rule_replaces_matches() {
    // show regex("f.o"): "X"
    let markup = Markup::new(vec![
        MarkupNode::Expr(Expr::show(
            Some(Expr::call_pos(Expr::ident("regex"), vec![Expr::str("f.o")])),
            Expr::str("X"),
        )),
        MarkupNode::text("foo fao bar"),
    ]);
    let realized = eval_and_realize(markup).unwrap();
    assert_eq!(realized.plain_text(), "X X bar");
}

#[test]
fn show_none_hides_elements() {
    // show heading: none
    let markup = Markup::new(vec![
        MarkupNode::Expr(Expr::show(Some(Expr::ident("heading")), Expr::none())),
        MarkupNode::heading(1, Markup::new(vec![MarkupNode::text("Title")])),
        MarkupNode::text("body"),
    ]);
    let realized = eval_and_realize(markup).unwrap();
    assert_eq!(realized.plain_text(), "body");
}

#[test]
fn function_show_rule_receives_the_element() {
    // show heading: it => it.body
    let markup = Markup::new(vec![
        MarkupNode::Expr(Expr::show(
            Some(Expr::ident("heading")),
            Expr::closure(
                vec![Param::Pos(Pattern::ident("it"))],
                Expr::field(Expr::ident("it"), "body"),
            ),
        )),
        MarkupNode::heading(1, Markup::new(vec![MarkupNode::text("Title")])),
    ]);
    let realized = eval_and_realize(markup).unwrap();
    assert_eq!(realized.plain_text(), "Title");
    // The heading element itself is gone.
    assert!(!contains_elem(&realized, "heading"));
}

#[test]
fn label_selector_matches_labelled_elements() {
    // show <target>: none  hides only the labelled heading.
    let markup = Markup::new(vec![
        MarkupNode::Expr(Expr::show(
            Some(Expr::call_pos(Expr::ident("label"), vec![Expr::str("target")])),
            Expr::none(),
        )),
        MarkupNode::heading(1, Markup::new(vec![MarkupNode::text("First")])),
        MarkupNode::label("target"),
        MarkupNode::heading(1, Markup::new(vec![MarkupNode::text("Second")])),
    ]);
    let realized = eval_and_realize(markup).unwrap();
    assert_eq!(realized.plain_text(), "Second");
}

#[test]
fn later_rules_take_precedence_and_cascade() {
    // show "a": "b"; show "b": "c"  =>  "a" becomes "c"? No: rules apply in
    // reverse order, so "b" -> "c" runs first, then the replacement of
    // "a" -> "b" is NOT re-fed to later rules, only to earlier ones. The
    // later rule rewrites the literal "b" first; the earlier rule's output
    // "b" stays.
    let markup = Markup::new(vec![
        MarkupNode::Expr(Expr::show(Some(Expr::str("a")), Expr::str("b"))),
        MarkupNode::Expr(Expr::show(Some(Expr::str("b")), Expr::str("c"))),
        MarkupNode::text("ab"),
    ]);
    let realized = eval_and_realize(markup).unwrap();
    // The literal "b" is rewritten by the later rule; the "a" is rewritten by
    // the earlier rule and its output cascades only to still-earlier rules.
    assert_eq!(realized.plain_text(), "bc");
}

#[test]
fn show_recursion_depth_is_capped() {
    // show heading: it => strong(heading("x"))  recurses and must be cut off.
    let transform = Expr::closure(
        vec![Param::Pos(Pattern::ident("it"))],
        Expr::call_pos(
            Expr::ident("strong"),
            vec![Expr::call_pos(Expr::ident("heading"), vec![Expr::str("x")])],
        ),
    );
    let markup = Markup::new(vec![
        MarkupNode::Expr(Expr::show(Some(Expr::ident("heading")), transform)),
        MarkupNode::heading(1, Markup::new(vec![MarkupNode::text("hi")])),
    ]);
    let err = eval_and_realize(markup).unwrap_err();
    assert_eq!(err.message, "maximum show rule recursion depth exceeded");
}

#[test]
fn set_rule_requires_element_function() {
    // set range(..) is not an element function.
    let markup = Markup::new(vec![MarkupNode::Expr(Expr::set(
        Expr::ident("range"),
        vec![],
        None,
    ))]);
    let world = TestWorld::new(markup);
    let mut engine = Engine::new(&world);
    let err = eval_main(&mut engine).unwrap_err();
    assert_eq!(err.message, "only element functions can be used in set rules");
}

#[test]
fn conditional_set_rule_can_be_disabled() {
    // set text(size: 1) if false  produces no styled wrapper.
    let markup = Markup::new(vec![
        MarkupNode::Expr(Expr::set(
            Expr::ident("text"),
            vec![ArgItem::Named(Ident::new("size"), Expr::int(1))],
            Some(Expr::bool(false)),
        )),
        MarkupNode::text("plain"),
    ]);
    let world = TestWorld::new(markup);
    let mut engine = Engine::new(&world);
    let module = eval_main(&mut engine).unwrap();
    assert!(!contains_elem(module.content(), "styled"));
}

#[test]
fn later_set_rule_wins() {
    // set text(size: 1); set text(size: 2)  =>  resolving size yields 2.
    let markup = Markup::new(vec![
        MarkupNode::Expr(Expr::set(
            Expr::ident("text"),
            vec![ArgItem::Named(Ident::new("size"), Expr::int(1))],
            None,
        )),
        MarkupNode::Expr(Expr::set(
            Expr::ident("text"),
            vec![ArgItem::Named(Ident::new("size"), Expr::int(2))],
            None,
        )),
        MarkupNode::text("x"),
    ]);
    let world = TestWorld::new(markup);
    let mut engine = Engine::new(&world);
    let module = eval_main(&mut engine).unwrap();

    // The tail styling nests the second rule inside the first; flatten the
    // styled wrappers and collect all set entries in application order.
    let mut styles = Styles::new();
    collect_styles(module.content(), &mut styles);
    assert_eq!(styles.resolve("text", "size"), Some(velin::Value::Int(2)));
}

#[test]
fn invalid_selector_is_rejected() {
    let markup = Markup::new(vec![MarkupNode::Expr(Expr::show(
        Some(Expr::int(3)),
        Expr::str("x"),
    ))]);
    let world = TestWorld::new(markup);
    let mut engine = Engine::new(&world);
    let err = eval_main(&mut engine).unwrap_err();
    assert_eq!(
        err.message,
        "expected selector (function, label, string, regex, or type)"
    );
}

#[test]
fn show_page_warns() {
    let markup = Markup::new(vec![
        MarkupNode::Expr(Expr::show(Some(Expr::ident("page")), Expr::none())),
        MarkupNode::text("x"),
    ]);
    let world = TestWorld::new(markup);
    let mut engine = Engine::new(&world);
    eval_main(&mut engine).unwrap();
    let warnings = engine.sink.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "`show page` has no effect");
    assert_eq!(warnings[0].hints[0], "use `set page(..)` instead");
}

#[test]
fn or_selector_accepts_any_branch() {
    let recipe = Recipe {
        span: Span::detached(),
        selector: Some(Selector::Or(vec![
            Selector::Elem("heading".into()),
            Selector::Elem("emph".into()),
        ])),
        transform: Transformation::None,
    };
    let content = Content::sequence(vec![
        Elem::new(
            ElemKind::Heading {
                level: 1,
                body: Content::text("h", Span::detached()),
            },
            Span::detached(),
        ),
        Elem::new(ElemKind::Text("keep".into()), Span::detached()),
        Elem::new(
            ElemKind::Emph(Content::text("e", Span::detached())),
            Span::detached(),
        ),
    ]);

    let world = TestWorld::new(Markup::default());
    let mut engine = Engine::new(&world);
    let realized = realize(&mut engine, &content, &Styles::from(recipe)).unwrap();
    assert_eq!(realized.plain_text(), "keep");
}

#[test]
fn after_selector_matches_only_past_the_anchor() {
    // Hide emphasis, but only after the first heading was seen.
    let recipe = Recipe {
        span: Span::detached(),
        selector: Some(Selector::After {
            selector: Box::new(Selector::Elem("emph".into())),
            start: Box::new(Selector::Elem("heading".into())),
        }),
        transform: Transformation::None,
    };
    let emph = |text: &str| {
        Elem::new(
            ElemKind::Emph(Content::text(text, Span::detached())),
            Span::detached(),
        )
    };
    let content = Content::sequence(vec![
        emph("before"),
        Elem::new(
            ElemKind::Heading {
                level: 1,
                body: Content::text("h", Span::detached()),
            },
            Span::detached(),
        ),
        emph("after"),
    ]);

    let world = TestWorld::new(Markup::default());
    let mut engine = Engine::new(&world);
    let realized = realize(&mut engine, &content, &Styles::from(recipe)).unwrap();
    assert_eq!(realized.plain_text(), "beforeh");
}

#[test]
fn label_attaches_to_preceding_element() {
    let markup = Markup::new(vec![
        MarkupNode::heading(1, Markup::new(vec![MarkupNode::text("Title")])),
        MarkupNode::label("intro"),
    ]);
    let world = TestWorld::new(markup);
    let mut engine = Engine::new(&world);
    let module = eval_main(&mut engine).unwrap();
    let elems = module.content().elems();
    assert_eq!(elems.len(), 1);
    assert_eq!(elems[0].label, Some(Label::new("intro")));
}

/// Whether any element in the tree has the given name.
fn contains_elem(content: &Content, name: &str) -> bool {
    content.elems().iter().any(|elem| {
        elem.name() == name
            || elem.body().is_some_and(|body| contains_elem(body, name))
    })
}

/// Collects the styles of all styled wrappers in application order.
fn collect_styles(content: &Content, out: &mut Styles) {
    for elem in content.elems() {
        if let ElemKind::Styled { styles, body } = &elem.kind {
            out.apply(styles);
            collect_styles(body, out);
        } else if let Some(body) = elem.body() {
            collect_styles(body, out);
        }
    }
}
