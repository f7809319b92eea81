// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Value types shared by logical operators and the accumulated plan
//!
//! The closed enumerations here are the targets of token mapping: the
//! traversal parser hands over direction, order, vertex-option and join-kind
//! tokens as strings and `FromStr` maps them, failing with
//! `IrError::InvalidEnumValue` on anything else.

use crate::error::IrError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A label, tag or property reference given either by name or by id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameOrId {
    Name(String),
    Id(i32),
}

impl NameOrId {
    pub fn name(name: impl Into<String>) -> Self {
        NameOrId::Name(name.into())
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            NameOrId::Name(name) => Some(name),
            NameOrId::Id(_) => None,
        }
    }
}

impl fmt::Display for NameOrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameOrId::Name(name) => write!(f, "{}", name),
            NameOrId::Id(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for NameOrId {
    fn from(name: &str) -> Self {
        NameOrId::Name(name.to_string())
    }
}

impl From<String> for NameOrId {
    fn from(name: String) -> Self {
        NameOrId::Name(name)
    }
}

impl From<i32> for NameOrId {
    fn from(id: i32) -> Self {
        NameOrId::Id(id)
    }
}

/// Constant values appearing in id lookups and predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ConstValue>),
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(b) => write!(f, "{}", b),
            ConstValue::Int(i) => write!(f, "{}", i),
            ConstValue::Float(v) => write!(f, "{:?}", v),
            ConstValue::Str(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            ConstValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for ConstValue {
    fn from(v: i64) -> Self {
        ConstValue::Int(v)
    }
}

impl From<i32> for ConstValue {
    fn from(v: i32) -> Self {
        ConstValue::Int(v as i64)
    }
}

impl From<&str> for ConstValue {
    fn from(v: &str) -> Self {
        ConstValue::Str(v.to_string())
    }
}

impl From<bool> for ConstValue {
    fn from(v: bool) -> Self {
        ConstValue::Bool(v)
    }
}

impl From<f64> for ConstValue {
    fn from(v: f64) -> Self {
        ConstValue::Float(v)
    }
}

/// Binding name attached to an operator's output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alias {
    pub name: NameOrId,
    /// Whether the query wrote it (`as('a')`) or the compiler synthesized it
    pub is_query_given: bool,
}

impl Alias {
    pub fn query_given(name: impl Into<NameOrId>) -> Self {
        Self {
            name: name.into(),
            is_query_given: true,
        }
    }

    pub fn derived(name: impl Into<NameOrId>) -> Self {
        Self {
            name: name.into(),
            is_query_given: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Id,
    Label,
    Key(String),
}

impl Property {
    /// `~id` and `~label` name the element id and label, anything else is a key.
    pub fn parse(key: &str) -> Self {
        match key {
            "~id" => Property::Id,
            "~label" => Property::Label,
            other => Property::Key(other.to_string()),
        }
    }

    pub fn key_name(&self) -> &str {
        match self {
            Property::Id => "~id",
            Property::Label => "~label",
            Property::Key(key) => key,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key_name())
    }
}

/// `@tag.property` reference; both parts absent means the current element
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub tag: Option<NameOrId>,
    pub property: Option<Property>,
}

impl Variable {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn tag(tag: impl Into<NameOrId>) -> Self {
        Self {
            tag: Some(tag.into()),
            property: None,
        }
    }

    pub fn property(key: &str) -> Self {
        Self {
            tag: None,
            property: Some(Property::parse(key)),
        }
    }

    pub fn tag_property(tag: impl Into<NameOrId>, key: &str) -> Self {
        Self {
            tag: Some(tag.into()),
            property: Some(Property::parse(key)),
        }
    }

    pub fn is_none(&self) -> bool {
        self.tag.is_none() && self.property.is_none()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@")?;
        if let Some(tag) = &self.tag {
            write!(f, "{}", tag)?;
        }
        if let Some(property) = &self.property {
            write!(f, ".{}", property)?;
        }
        Ok(())
    }
}

/// Half-open interval `[lower, upper)` used by limits and hop bounds;
/// `lower == upper` is an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub lower: i32,
    pub upper: i32,
}

impl Range {
    pub fn new(lower: i32, upper: i32) -> Self {
        Self { lower, upper }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOpt {
    Vertex,
    Edge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Out,
    In,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderOpt {
    Asc,
    Desc,
    Shuffle,
}

/// Which vertex of an edge a get-vertex operator yields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VOpt {
    Start,
    End,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Semi,
    Anti,
    Times,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggOpt {
    Sum,
    Min,
    Max,
    Count,
    CountDistinct,
    ToList,
    ToSet,
    Avg,
}

/// One aggregate value of a group-by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggFn {
    pub vars: Vec<Variable>,
    pub aggregate: AggOpt,
    pub alias: Alias,
}

fn invalid(enum_name: &'static str, value: &str) -> IrError {
    IrError::InvalidEnumValue {
        enum_name,
        value: value.to_string(),
    }
}

impl FromStr for Direction {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "out" => Ok(Direction::Out),
            "in" => Ok(Direction::In),
            "both" => Ok(Direction::Both),
            _ => Err(invalid("Direction", s)),
        }
    }
}

impl FromStr for OrderOpt {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(OrderOpt::Asc),
            "desc" => Ok(OrderOpt::Desc),
            "shuffle" => Ok(OrderOpt::Shuffle),
            _ => Err(invalid("Order", s)),
        }
    }
}

impl FromStr for VOpt {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(VOpt::Start),
            "end" => Ok(VOpt::End),
            "other" => Ok(VOpt::Other),
            _ => Err(invalid("VOpt", s)),
        }
    }
}

impl VOpt {
    /// `outV()` yields the start vertex and `inV()` the end vertex; `bothV()`
    /// has no single-vertex mapping.
    pub fn from_edge_direction(token: &str) -> Result<Self, IrError> {
        match token.parse::<Direction>() {
            Ok(Direction::Out) => Ok(VOpt::Start),
            Ok(Direction::In) => Ok(VOpt::End),
            _ => Err(invalid("VOpt", token)),
        }
    }
}

impl FromStr for JoinKind {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinKind::Inner),
            "left_outer" => Ok(JoinKind::LeftOuter),
            "right_outer" => Ok(JoinKind::RightOuter),
            "full_outer" => Ok(JoinKind::FullOuter),
            "semi" => Ok(JoinKind::Semi),
            "anti" => Ok(JoinKind::Anti),
            "times" => Ok(JoinKind::Times),
            _ => Err(invalid("JoinKind", s)),
        }
    }
}
