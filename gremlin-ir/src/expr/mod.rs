// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Expression and alias synthesis
//!
//! Traversal predicates become expression strings in the IR expression
//! syntax: `@` is the current element, `@a` a tagged element, `.name` a
//! property, and `~id`/`~label` the element id and label. Generated strings
//! are deterministic, so equal traversals always produce equal plans.

pub mod alias;
pub mod parser;

use crate::error::{IrError, IrResult};
use crate::plan::types::{ConstValue, NameOrId, Property, Variable};
use crate::traversal::{Comparator, HasContainer, Predicate, TagPredicate};

pub use alias::{group_key_alias, group_value_alias, project_alias, variable_alias};
pub use parser::{parse_project_expr, referenced_variables, ProjectExpr};

fn compare(left: &str, cmp: Comparator, right: &str) -> String {
    format!("{} {} {}", left, cmp.symbol(), right)
}

fn value_predicate(subject: &str, predicate: &Predicate) -> IrResult<String> {
    match predicate.cmp {
        Comparator::Within | Comparator::Without => match &predicate.value {
            ConstValue::List(_) => Ok(compare(subject, predicate.cmp, &predicate.value.to_string())),
            other => Err(IrError::illegal_argument(
                "Select",
                "predicate",
                format!("{} expects a list, got {}", predicate.cmp.symbol(), other),
            )),
        },
        cmp => Ok(compare(subject, cmp, &predicate.value.to_string())),
    }
}

/// Expression for a single `has()` container on the current element
pub fn container_expr(container: &HasContainer) -> IrResult<String> {
    let subject = Variable {
        tag: None,
        property: Some(Property::parse(&container.key)),
    }
    .to_string();
    match &container.predicate {
        Some(predicate) => value_predicate(&subject, predicate),
        None => Ok(subject),
    }
}

/// Conjunction of all containers, `&&`-joined in order
pub fn has_predicate(containers: &[HasContainer]) -> IrResult<String> {
    let parts = containers
        .iter()
        .map(container_expr)
        .collect::<IrResult<Vec<_>>>()?;
    Ok(parts.join(" && "))
}

/// `@.~id == 1` for one id, `@.~id within [1, 2]` for several
pub fn id_predicate(ids: &[ConstValue]) -> String {
    match ids {
        [id] => compare("@.~id", Comparator::Eq, &id.to_string()),
        _ => compare(
            "@.~id",
            Comparator::Within,
            &ConstValue::List(ids.to_vec()).to_string(),
        ),
    }
}

/// `@.~label == "person"` for one label, `within` for several
pub fn label_predicate(labels: &[String]) -> String {
    match labels {
        [label] => compare(
            "@.~label",
            Comparator::Eq,
            &ConstValue::Str(label.clone()).to_string(),
        ),
        _ => compare(
            "@.~label",
            Comparator::Within,
            &ConstValue::List(labels.iter().map(|l| ConstValue::Str(l.clone())).collect())
                .to_string(),
        ),
    }
}

fn tag_operand(tag: Option<&str>, property: Option<&String>) -> Variable {
    Variable {
        tag: tag.map(|t| NameOrId::Name(t.to_string())),
        property: property.map(|p| Property::parse(p)),
    }
}

fn by_key(by_keys: &[Option<String>], index: usize) -> Option<&String> {
    if by_keys.is_empty() {
        None
    } else {
        by_keys[index % by_keys.len()].as_ref()
    }
}

/// A comparison between two operands; property-qualified operands are
/// guarded by an existence check so elements lacking the property drop out.
fn guarded_compare(left: &Variable, cmp: Comparator, right: &Variable) -> String {
    let mut parts = Vec::with_capacity(3);
    if left.property.is_some() {
        parts.push(left.to_string());
    }
    if right.property.is_some() {
        parts.push(right.to_string());
    }
    parts.push(compare(&left.to_string(), cmp, &right.to_string()));
    parts.join(" && ")
}

fn render_tag_predicate(
    start: &Variable,
    predicate: &TagPredicate,
    by_keys: &[Option<String>],
    next_key: &mut usize,
) -> String {
    match predicate {
        TagPredicate::Compare { cmp, tag } => {
            let right = tag_operand(Some(tag), by_key(by_keys, *next_key));
            *next_key += 1;
            guarded_compare(start, *cmp, &right)
        }
        TagPredicate::And(left, right) => {
            let l = render_tag_predicate(start, left, by_keys, next_key);
            let r = render_tag_predicate(start, right, by_keys, next_key);
            format!("{} && ({})", l, r)
        }
        TagPredicate::Or(left, right) => {
            let l = render_tag_predicate(start, left, by_keys, next_key);
            let r = render_tag_predicate(start, right, by_keys, next_key);
            format!("{} || ({})", l, r)
        }
    }
}

/// Predicate string for `where([startTag,] P)` with its `by()` keys.
///
/// `by_keys` holds one entry per modulator (`None` for `by()`); modulators
/// cycle over the start key followed by every tag of the predicate in order.
pub fn where_predicate(
    start_tag: Option<&str>,
    predicate: &TagPredicate,
    by_keys: &[Option<String>],
) -> String {
    let start = tag_operand(start_tag, by_key(by_keys, 0));
    let mut next_key = 1;
    render_tag_predicate(&start, predicate, by_keys, &mut next_key)
}
