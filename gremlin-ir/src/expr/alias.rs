// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Derived alias names for projections and group-by outputs

use crate::error::{IrError, IrResult};
use crate::expr::parser::{parse_project_expr, ProjectExpr};
use crate::plan::types::Variable;

pub const PROJECT_PREFIX: &str = "project_";
pub const GROUP_KEYS: &str = "groupKeys";
pub const GROUP_VALUES: &str = "groupValues";

/// `a`, `name` or `a_name` for `@a`, `@.name` and `@a.name`
pub fn variable_alias(var: &Variable) -> String {
    match (&var.tag, &var.property) {
        (Some(tag), Some(property)) => format!("{}_{}", tag, property),
        (Some(tag), None) => tag.to_string(),
        (None, Some(property)) => property.to_string(),
        (None, None) => String::new(),
    }
}

/// Alias for one mapping of a multi-column projection.
///
/// | expression | alias |
/// |---|---|
/// | `@a` | `project_a` |
/// | `@.name` | `name` |
/// | `@a.name` | `a_name` |
/// | `{@a.name, @a.id}` | `a_{name, id}` |
/// | `{@.name, @.id}` | `{name, id}` |
pub fn project_alias(expr: &str) -> IrResult<String> {
    match parse_project_expr(expr)? {
        ProjectExpr::Single(var) => match (&var.tag, &var.property) {
            (Some(tag), None) => Ok(format!("{}{}", PROJECT_PREFIX, tag)),
            (_, Some(_)) => Ok(variable_alias(&var)),
            (None, None) => Err(IrError::UnsupportedPattern(format!(
                "cannot derive an alias for projection '{}'",
                expr
            ))),
        },
        ProjectExpr::Group(vars) => {
            let mut properties = Vec::with_capacity(vars.len());
            for var in &vars {
                match &var.property {
                    Some(property) => properties.push(property.to_string()),
                    None => {
                        return Err(IrError::UnsupportedPattern(format!(
                            "every entry of projection group '{}' must name a property",
                            expr
                        )))
                    }
                }
            }
            let group = format!("{{{}}}", properties.join(", "));
            match vars.iter().find_map(|v| v.tag.as_ref()) {
                Some(tag) => Ok(format!("{}_{}", tag, group)),
                None => Ok(group),
            }
        }
    }
}

/// `groupKeys`, or `groupKeys_<alias>` when the key is a tag or property
pub fn group_key_alias(key: &Variable) -> String {
    if key.is_none() {
        GROUP_KEYS.to_string()
    } else {
        format!("{}_{}", GROUP_KEYS, variable_alias(key))
    }
}

pub fn group_value_alias() -> String {
    GROUP_VALUES.to_string()
}
