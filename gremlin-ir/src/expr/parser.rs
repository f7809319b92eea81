// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Parser for tag/property references inside expression strings
//!
//! Grammar:
//! ```text
//! projection := group | variable
//! group      := '{' variable (',' variable)* '}'
//! variable   := '@' tag? ('.' property)?
//! ```
//! Predicates are not parsed in full; `referenced_variables` only scans them
//! for variables, skipping double-quoted string literals.

use crate::error::{IrError, IrResult};
use crate::plan::types::{NameOrId, Property, Variable};
use nom::{
    branch::alt,
    bytes::complete::{escaped, take_while1},
    character::complete::{anychar, char, multispace0, none_of},
    combinator::{all_consuming, map, opt, value},
    multi::{many0, separated_list1},
    sequence::{delimited, preceded, tuple},
    IResult,
};

/// Parsed projection expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectExpr {
    Single(Variable),
    Group(Vec<Variable>),
}

fn tag_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

fn property_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '~')(input)
}

fn variable(input: &str) -> IResult<&str, Variable> {
    let (input, _) = char('@')(input)?;
    let (input, tag) = opt(tag_name)(input)?;
    let (input, property) = opt(preceded(char('.'), property_name))(input)?;
    Ok((
        input,
        Variable {
            tag: tag.map(|t| NameOrId::Name(t.to_string())),
            property: property.map(Property::parse),
        },
    ))
}

fn group(input: &str) -> IResult<&str, Vec<Variable>> {
    delimited(
        tuple((char('{'), multispace0)),
        separated_list1(tuple((multispace0, char(','), multispace0)), variable),
        tuple((multispace0, char('}'))),
    )(input)
}

fn string_literal(input: &str) -> IResult<&str, ()> {
    value(
        (),
        delimited(
            char('"'),
            opt(escaped(none_of("\\\""), '\\', anychar)),
            char('"'),
        ),
    )(input)
}

pub fn parse_project_expr(input: &str) -> IrResult<ProjectExpr> {
    let parsed = all_consuming(delimited(
        multispace0,
        alt((
            map(group, ProjectExpr::Group),
            map(variable, ProjectExpr::Single),
        )),
        multispace0,
    ))(input);

    match parsed {
        Ok((_, expr)) => Ok(expr),
        Err(_) => Err(IrError::UnsupportedPattern(format!(
            "cannot parse projection expression '{}'",
            input
        ))),
    }
}

/// All `@tag.property` references in `expr`, in order of appearance
pub fn referenced_variables(expr: &str) -> IrResult<Vec<Variable>> {
    let parsed = all_consuming(many0(alt((
        map(string_literal, |_| None),
        map(variable, Some),
        map(anychar, |_| None),
    ))))(expr);

    match parsed {
        Ok((_, items)) => Ok(items.into_iter().flatten().collect()),
        Err(_) => Err(IrError::UnsupportedPattern(format!(
            "cannot scan expression '{}'",
            expr
        ))),
    }
}
