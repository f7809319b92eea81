//! Predicate and alias synthesis tests
//!
//! Where-predicates are checked through the operator builder so the `by()`
//! modulator cycling is exercised the way traversals use it.

use gremlin_ir::expr::{group_key_alias, project_alias};
use gremlin_ir::plan::operator::{ArgSlot, ArgValue};
use gremlin_ir::plan::types::Variable;
use gremlin_ir::traversal::TagPredicate;
use gremlin_ir::{IrError, OpKind, OperatorCollectionBuilder, Traversal};

/// Predicate of the trailing Select built for `traversal`
fn where_expr(traversal: Traversal) -> String {
    let collection = OperatorCollectionBuilder::new(&traversal).build().unwrap();
    let select = collection.iter().last().unwrap();
    assert_eq!(select.kind(), OpKind::Select);
    match select.get_arg(ArgSlot::Predicate) {
        Some(ArgValue::Expr(expr)) => expr,
        other => panic!("Expected a predicate, got {:?}", other),
    }
}

fn tagged() -> Traversal {
    Traversal::v().as_("a").out(&[]).as_("b").out(&[]).as_("c")
}

#[test]
fn test_where_current_against_tag() {
    assert_eq!(where_expr(tagged().where_(TagPredicate::eq("a"))), "@ == @a");
}

#[test]
fn test_where_between_tags() {
    assert_eq!(
        where_expr(tagged().where_start("a", TagPredicate::eq("b"))),
        "@a == @b"
    );
}

#[test]
fn test_where_or_chain() {
    let predicate = TagPredicate::eq("b").or(TagPredicate::eq("c"));
    assert_eq!(
        where_expr(tagged().where_start("a", predicate)),
        "@a == @b || (@a == @c)"
    );
}

#[test]
fn test_where_single_by_applies_to_both_sides() {
    assert_eq!(
        where_expr(tagged().where_(TagPredicate::eq("a")).by_key("age")),
        "@.age && @a.age && @.age == @a.age"
    );
}

#[test]
fn test_where_two_tags_two_bys() {
    assert_eq!(
        where_expr(
            tagged()
                .where_start("a", TagPredicate::eq("b"))
                .by_key("id")
                .by_key("age")
        ),
        "@a.id && @b.age && @a.id == @b.age"
    );
}

#[test]
fn test_where_or_chain_with_cycled_bys() {
    let predicate = TagPredicate::eq("b").or(TagPredicate::eq("c"));
    assert_eq!(
        where_expr(
            tagged()
                .where_start("a", predicate)
                .by_key("id")
                .by_key("age")
                .by_key("id")
        ),
        "@a.id && @b.age && @a.id == @b.age || (@a.id && @c.id && @a.id == @c.id)"
    );
}

#[test]
fn test_where_rejects_ordered_by() {
    let traversal = tagged()
        .where_start("a", TagPredicate::eq("b"))
        .by_order(gremlin_ir::traversal::ByModifier::Identity, "desc");
    assert!(matches!(
        OperatorCollectionBuilder::new(&traversal).build(),
        Err(IrError::UnsupportedPattern(_))
    ));
}

#[test]
fn test_project_alias_literals() {
    assert_eq!(project_alias("@a").unwrap(), "project_a");
    assert_eq!(project_alias("@.name").unwrap(), "name");
    assert_eq!(project_alias("@a.name").unwrap(), "a_name");
    assert_eq!(project_alias("{@a.name, @a.id}").unwrap(), "a_{name, id}");
}

#[test]
fn test_project_alias_rejects_bare_head() {
    assert!(project_alias("@").is_err());
}

#[test]
fn test_group_key_alias() {
    assert_eq!(group_key_alias(&Variable::none()), "groupKeys");
    assert_eq!(group_key_alias(&Variable::property("name")), "groupKeys_name");
    assert_eq!(
        group_key_alias(&Variable::tag_property("a", "name")),
        "groupKeys_a_name"
    );
}
