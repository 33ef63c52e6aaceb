//! Rendering behaviour across whole trees

use reqcheck_expression::prelude::*;

fn or_of_and() -> (ExpressionCollection, reqcheck_core::NodeId) {
    let mut c = ExpressionCollection::new();
    let r1 = c.add_relational("R1");
    let r2 = c.add_relational("R2");
    let r3 = c.add_relational("R3");
    let and = c.add_and([r2, r3]).unwrap();
    let or = c.add_or([r1, and]).unwrap();
    (c, or)
}

#[test]
fn test_or_of_and_as_free_expression() {
    let (c, or) = or_of_and();
    assert_eq!(c.render(or).unwrap(), "(R1) OR ((R2) AND (R3))");
}

#[test]
fn test_or_of_and_nested_under_and() {
    let (mut c, or) = or_of_and();
    let r4 = c.add_relational("R4");
    let outer = c.add_and([or, r4]).unwrap();

    assert_eq!(
        c.render(outer).unwrap(),
        "((R1) OR ((R2) AND (R3))) AND (R4)"
    );
    assert_eq!(
        c.renderer().render_nested(or).unwrap(),
        "((R1) OR ((R2) AND (R3)))"
    );
}

#[test]
fn test_nesting_adds_exactly_one_pair_of_parentheses() {
    let (c, or) = or_of_and();
    let free = c.render(or).unwrap();
    let nested = c.renderer().render_nested(or).unwrap();

    assert_eq!(nested, format!("({})", free));
}

#[test]
fn test_shared_term_renders_in_every_parent() {
    let mut c = ExpressionCollection::new();
    let shared = c.add_relational("S");
    let other = c.add_relational("O");
    let left = c.add_and([shared, other]).unwrap();
    let right = c.add_not(shared).unwrap();
    let top = c.add_xor([left, right]).unwrap();

    assert_eq!(c.render(top).unwrap(), "((S) AND (O)) XOR ( NOT (S))");
}

#[test]
fn test_input_order_is_preserved() {
    let mut c = ExpressionCollection::new();
    let b = c.add_relational("B");
    let a = c.add_relational("A");
    let forward = c.add_or([a, b]).unwrap();
    let backward = c.add_or([b, a]).unwrap();

    assert_eq!(c.render(forward).unwrap(), "(A) OR (B)");
    assert_eq!(c.render(backward).unwrap(), "(B) OR (A)");
}
