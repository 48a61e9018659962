//! Tests for imports, includes, packages, and cycle detection.

use pretty_assertions::assert_eq;
use velin::{
    Engine, Expr, FileId, Ident, ImportItem, Imports, Markup, MarkupNode, PackageSpec,
    Source, TestWorld, Value, eval_main,
};

/// A module that defines `pub = 1` and `_priv = 2` at the top level.
fn lib_markup() -> Markup {
    Markup::new(vec![
        MarkupNode::Expr(Expr::let_bind("pub", Expr::int(1))),
        MarkupNode::Expr(Expr::let_bind("_priv", Expr::int(2))),
    ])
}

/// Builds a world whose main file holds the given markup.
fn world_with_main(main: Markup) -> TestWorld {
    TestWorld::new(main)
}

#[test]
fn plain_import_binds_module_name() {
    // import "lib.typ"; lib.pub
    let main = Markup::new(vec![
        MarkupNode::Expr(Expr::import(Expr::str("lib.typ"), None, None)),
        MarkupNode::Expr(Expr::field(Expr::ident("lib"), "pub")),
    ]);
    let world = world_with_main(main);
    world.add_source("lib.typ", lib_markup());

    let mut engine = Engine::new(&world);
    let module = eval_main(&mut engine).unwrap();
    assert_eq!(module.content().plain_text(), "1");
}

#[test]
fn renamed_import() {
    // import "lib.typ" as helpers; helpers.pub
    let main = Markup::new(vec![
        MarkupNode::Expr(Expr::import(
            Expr::str("lib.typ"),
            Some(Ident::new("helpers")),
            None,
        )),
        MarkupNode::Expr(Expr::field(Expr::ident("helpers"), "pub")),
    ]);
    let world = world_with_main(main);
    world.add_source("lib.typ", lib_markup());

    let mut engine = Engine::new(&world);
    let module = eval_main(&mut engine).unwrap();
    assert_eq!(module.content().plain_text(), "1");
}

#[test]
fn wildcard_import_skips_underscored_names() {
    // import "lib.typ": *
    let main = Markup::new(vec![MarkupNode::Expr(Expr::import(
        Expr::str("lib.typ"),
        None,
        Some(Imports::Wildcard),
    ))]);
    let world = world_with_main(main);
    world.add_source("lib.typ", lib_markup());

    let mut engine = Engine::new(&world);
    let module = eval_main(&mut engine).unwrap();
    assert_eq!(module.scope().get("pub"), Some(&Value::Int(1)));
    assert_eq!(module.scope().get("_priv"), None);
}

#[test]
fn item_import_with_rename() {
    // import "lib.typ": pub as one
    let main = Markup::new(vec![
        MarkupNode::Expr(Expr::import(
            Expr::str("lib.typ"),
            None,
            Some(Imports::Items(vec![ImportItem {
                path: vec![Ident::new("pub")],
                rename: Some(Ident::new("one")),
            }])),
        )),
        MarkupNode::Expr(Expr::ident("one")),
    ]);
    let world = world_with_main(main);
    world.add_source("lib.typ", lib_markup());

    let mut engine = Engine::new(&world);
    let module = eval_main(&mut engine).unwrap();
    assert_eq!(module.content().plain_text(), "1");
}

#[test]
fn missing_item_is_unresolved() {
    let main = Markup::new(vec![MarkupNode::Expr(Expr::import(
        Expr::str("lib.typ"),
        None,
        Some(Imports::Items(vec![ImportItem {
            path: vec![Ident::new("nope")],
            rename: None,
        }])),
    ))]);
    let world = world_with_main(main);
    world.add_source("lib.typ", lib_markup());

    let mut engine = Engine::new(&world);
    let err = eval_main(&mut engine).unwrap_err();
    assert_eq!(err.message, "unresolved import");
}

#[test]
fn cyclic_import_is_detected() {
    // a.typ imports b.typ, which imports a.typ again.
    let main = Markup::new(vec![MarkupNode::Expr(Expr::import(
        Expr::str("a.typ"),
        None,
        None,
    ))]);
    let world = world_with_main(main);
    world.add_source(
        "a.typ",
        Markup::new(vec![MarkupNode::Expr(Expr::import(
            Expr::str("b.typ"),
            None,
            None,
        ))]),
    );
    world.add_source(
        "b.typ",
        Markup::new(vec![MarkupNode::Expr(Expr::import(
            Expr::str("a.typ"),
            None,
            None,
        ))]),
    );

    let mut engine = Engine::new(&world);
    let err = eval_main(&mut engine).unwrap_err();
    assert_eq!(err.message, "cyclic import");
}

#[test]
fn include_yields_content_without_bindings() {
    let main = Markup::new(vec![MarkupNode::Expr(Expr::include(Expr::str(
        "chapter.typ",
    )))]);
    let world = world_with_main(main);
    world.add_source(
        "chapter.typ",
        Markup::new(vec![
            MarkupNode::Expr(Expr::let_bind("hidden", Expr::int(1))),
            MarkupNode::text("chapter text"),
        ]),
    );

    let mut engine = Engine::new(&world);
    let module = eval_main(&mut engine).unwrap();
    assert_eq!(module.content().plain_text(), "chapter text");
    assert_eq!(module.scope().get("hidden"), None);
}

#[test]
fn import_from_function_scope() {
    // import list: item
    let main = Markup::new(vec![
        MarkupNode::Expr(Expr::import(
            Expr::ident("list"),
            None,
            Some(Imports::Items(vec![ImportItem {
                path: vec![Ident::new("item")],
                rename: None,
            }])),
        )),
        MarkupNode::Expr(Expr::call_pos(Expr::ident("item"), vec![Expr::str("x")])),
    ]);
    let world = world_with_main(main);

    let mut engine = Engine::new(&world);
    let module = eval_main(&mut engine).unwrap();
    assert_eq!(module.content().plain_text(), "x");
}

#[test]
fn import_from_user_function_is_rejected() {
    let main = Markup::new(vec![
        MarkupNode::Expr(Expr::let_closure("f", vec![], Expr::int(1))),
        MarkupNode::Expr(Expr::import(Expr::ident("f"), None, None)),
    ]);
    let world = world_with_main(main);

    let mut engine = Engine::new(&world);
    let err = eval_main(&mut engine).unwrap_err();
    assert_eq!(err.message, "cannot import from user-defined functions");
}

#[test]
fn module_name_is_derived_from_file_stem() {
    let main = Markup::new(vec![MarkupNode::Expr(Expr::import(
        Expr::str("my-utils.typ"),
        None,
        None,
    ))]);
    let world = world_with_main(main);
    world.add_source("my-utils.typ", lib_markup());

    let mut engine = Engine::new(&world);
    let module = eval_main(&mut engine).unwrap();
    // The dash maps to an underscore in the binding name.
    assert!(module.scope().get("my_utils").is_some());
}

#[test]
fn package_import_resolves_entrypoint() {
    let spec: PackageSpec = "@preview/example:1.2.0".parse().unwrap();
    let main = Markup::new(vec![
        MarkupNode::Expr(Expr::import(
            Expr::str("@preview/example:1.2.0"),
            None,
            Some(Imports::Wildcard),
        )),
        MarkupNode::Expr(Expr::ident("pub")),
    ]);
    let world = world_with_main(main);
    world.add_file(
        FileId::new(Some(spec.clone()), "typst.toml"),
        b"[package]\nname = \"example\"\nversion = \"1.4.0\"\n".to_vec(),
    );
    world.add_package_source(spec, "lib.typ", lib_markup());

    let mut engine = Engine::new(&world);
    let module = eval_main(&mut engine).unwrap();
    assert_eq!(module.content().plain_text(), "1");
}

#[test]
fn package_manifest_mismatch_is_rejected() {
    let spec: PackageSpec = "@preview/example:2.0.0".parse().unwrap();
    let main = Markup::new(vec![MarkupNode::Expr(Expr::import(
        Expr::str("@preview/example:2.0.0"),
        None,
        None,
    ))]);
    let world = world_with_main(main);
    world.add_file(
        FileId::new(Some(spec.clone()), "typst.toml"),
        b"[package]\nname = \"example\"\nversion = \"1.4.0\"\n".to_vec(),
    );
    world.add_package_source(spec, "lib.typ", lib_markup());

    let mut engine = Engine::new(&world);
    let err = eval_main(&mut engine).unwrap_err();
    assert!(err.message.contains("incompatible version"));
}

#[test]
fn parse_errors_reject_the_module() {
    let main = Markup::new(vec![MarkupNode::Expr(Expr::import(
        Expr::str("broken.typ"),
        None,
        None,
    ))]);
    let world = world_with_main(main);
    let broken = FileId::new(None, "broken.typ");
    world.insert_source(Source::with_errors(
        broken,
        Markup::default(),
        vec![velin::Error::new(velin::Span::detached(), "unexpected token")],
    ));

    let mut engine = Engine::new(&world);
    let err = eval_main(&mut engine).unwrap_err();
    assert_eq!(err.message, "unexpected token");
}

#[test]
fn repeated_imports_share_no_cycle() {
    // Importing the same file twice from different places is fine.
    let main = Markup::new(vec![
        MarkupNode::Expr(Expr::import(Expr::str("lib.typ"), Some(Ident::new("a")), None)),
        MarkupNode::Expr(Expr::import(Expr::str("lib.typ"), Some(Ident::new("b")), None)),
        MarkupNode::Expr(Expr::field(Expr::ident("b"), "pub")),
    ]);
    let world = world_with_main(main);
    world.add_source("lib.typ", lib_markup());

    let mut engine = Engine::new(&world);
    let module = eval_main(&mut engine).unwrap();
    assert_eq!(module.content().plain_text(), "1");
}
