// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Traversal input model
//!
//! A `Traversal` is the ordered step list handed over by the Gremlin parser.
//! Each step carries its kind, the step-specific metadata and the query alias
//! written with `as()`. Direction, order and join-kind values stay as raw
//! tokens here; they are mapped to closed enumerations during translation so
//! that an unknown token surfaces as `IrError::InvalidEnumValue`.
//!
//! Traversals can be deserialized from JSON or assembled with the fluent
//! methods on `Traversal`:
//!
//! ```rust,ignore
//! let t = Traversal::v()
//!     .has_label(&["person"])
//!     .out(&["knows"])
//!     .range(0, 10);
//! ```

use crate::error::IrResult;
use crate::plan::types::ConstValue;
use serde::{Deserialize, Serialize};

/// Comparison operators usable in `has()` and `where()` predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Within,
    Without,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Eq => "==",
            Comparator::Neq => "!=",
            Comparator::Lt => "<",
            Comparator::Lte => "<=",
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
            Comparator::Within => "within",
            Comparator::Without => "without",
        }
    }
}

/// Value predicate of a `has()` container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub cmp: Comparator,
    pub value: ConstValue,
}

impl Predicate {
    pub fn new(cmp: Comparator, value: impl Into<ConstValue>) -> Self {
        Self {
            cmp,
            value: value.into(),
        }
    }

    pub fn eq(value: impl Into<ConstValue>) -> Self {
        Self::new(Comparator::Eq, value)
    }

    pub fn neq(value: impl Into<ConstValue>) -> Self {
        Self::new(Comparator::Neq, value)
    }

    pub fn gt(value: impl Into<ConstValue>) -> Self {
        Self::new(Comparator::Gt, value)
    }

    pub fn lt(value: impl Into<ConstValue>) -> Self {
        Self::new(Comparator::Lt, value)
    }

    pub fn within<V: Into<ConstValue>>(values: impl IntoIterator<Item = V>) -> Self {
        Self {
            cmp: Comparator::Within,
            value: ConstValue::List(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn without<V: Into<ConstValue>>(values: impl IntoIterator<Item = V>) -> Self {
        Self {
            cmp: Comparator::Without,
            value: ConstValue::List(values.into_iter().map(Into::into).collect()),
        }
    }
}

/// `has(key)` or `has(key, predicate)`; `~label` and `~id` address the
/// element label and id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HasContainer {
    pub key: String,
    #[serde(default)]
    pub predicate: Option<Predicate>,
}

/// Predicate over tags, as written in `where(P.eq("a"))`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagPredicate {
    Compare { cmp: Comparator, tag: String },
    And(Box<TagPredicate>, Box<TagPredicate>),
    Or(Box<TagPredicate>, Box<TagPredicate>),
}

impl TagPredicate {
    pub fn compare(cmp: Comparator, tag: impl Into<String>) -> Self {
        TagPredicate::Compare {
            cmp,
            tag: tag.into(),
        }
    }

    pub fn eq(tag: impl Into<String>) -> Self {
        Self::compare(Comparator::Eq, tag)
    }

    pub fn neq(tag: impl Into<String>) -> Self {
        Self::compare(Comparator::Neq, tag)
    }

    pub fn and(self, other: TagPredicate) -> Self {
        TagPredicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: TagPredicate) -> Self {
        TagPredicate::Or(Box::new(self), Box::new(other))
    }
}

/// Content of a `by()` modulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum ByModifier {
    /// `by()` or `by(identity())`
    Identity,
    /// `by('name')`
    Key { key: String },
    /// `by(values('name'))`
    Values { keys: Vec<String> },
    /// `by(valueMap('name', 'id'))`
    ValueMap { keys: Vec<String> },
    /// `by(select('a'))` or `by(select('a').by('name'))`
    Select {
        tag: String,
        #[serde(default)]
        property: Option<String>,
    },
    /// `by(count())`
    Count,
    /// `by(fold())`
    Fold,
    /// Any other nested traversal
    Traversal { traversal: Traversal },
}

/// Step kinds and their metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepKind {
    V {
        #[serde(default)]
        ids: Vec<ConstValue>,
    },
    E {
        #[serde(default)]
        ids: Vec<ConstValue>,
    },
    Has {
        containers: Vec<HasContainer>,
    },
    HasLabel {
        labels: Vec<String>,
    },
    HasId {
        ids: Vec<ConstValue>,
    },
    /// `out()`, `in()`, `both()` and their edge-returning forms
    Vertex {
        direction: String,
        #[serde(default)]
        labels: Vec<String>,
        #[serde(default)]
        edge: bool,
    },
    /// `outV()`, `inV()`, `bothV()`
    EdgeVertex {
        direction: String,
    },
    OtherV,
    PathExpand {
        direction: String,
        #[serde(default)]
        labels: Vec<String>,
        lower: i32,
        upper: i32,
        #[serde(default)]
        whole_path: Option<bool>,
    },
    WherePredicate {
        #[serde(default)]
        start_tag: Option<String>,
        predicate: TagPredicate,
    },
    WhereTraversal {
        traversal: Traversal,
    },
    Not {
        traversal: Traversal,
    },
    Apply {
        traversal: Traversal,
        join_kind: String,
    },
    Union {
        branches: Vec<Traversal>,
    },
    Limit {
        count: i32,
    },
    Range {
        lower: i32,
        upper: i32,
    },
    Order,
    Group,
    GroupCount,
    Count,
    Dedup {
        #[serde(default)]
        tags: Vec<String>,
    },
    Select {
        tags: Vec<String>,
    },
    Values {
        keys: Vec<String>,
    },
    ValueMap {
        #[serde(default)]
        keys: Vec<String>,
    },
    By {
        modifier: ByModifier,
        #[serde(default)]
        order: Option<String>,
    },
    /// A step the parser recognized but this compiler has no translation for
    Unknown {
        name: String,
    },
}

impl StepKind {
    /// Gremlin-style name used in error messages
    pub fn name(&self) -> &str {
        match self {
            StepKind::V { .. } => "V",
            StepKind::E { .. } => "E",
            StepKind::Has { .. } => "has",
            StepKind::HasLabel { .. } => "hasLabel",
            StepKind::HasId { .. } => "hasId",
            StepKind::Vertex { .. } => "vertex",
            StepKind::EdgeVertex { .. } => "edgeVertex",
            StepKind::OtherV => "otherV",
            StepKind::PathExpand { .. } => "pathExpand",
            StepKind::WherePredicate { .. } => "where",
            StepKind::WhereTraversal { .. } => "where",
            StepKind::Not { .. } => "not",
            StepKind::Apply { .. } => "apply",
            StepKind::Union { .. } => "union",
            StepKind::Limit { .. } => "limit",
            StepKind::Range { .. } => "range",
            StepKind::Order => "order",
            StepKind::Group => "group",
            StepKind::GroupCount => "groupCount",
            StepKind::Count => "count",
            StepKind::Dedup { .. } => "dedup",
            StepKind::Select { .. } => "select",
            StepKind::Values { .. } => "values",
            StepKind::ValueMap { .. } => "valueMap",
            StepKind::By { .. } => "by",
            StepKind::Unknown { name } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub kind: StepKind,
    #[serde(default)]
    pub alias: Option<String>,
}

impl Step {
    pub fn new(kind: StepKind) -> Self {
        Self { kind, alias: None }
    }
}

/// An ordered list of steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Traversal {
    pub steps: Vec<Step>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn consts<V: Into<ConstValue>>(ids: impl IntoIterator<Item = V>) -> Vec<ConstValue> {
    ids.into_iter().map(Into::into).collect()
}

impl Traversal {
    /// Anonymous traversal, the `__` of nested steps
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> IrResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn v() -> Self {
        Self::anonymous().step(StepKind::V { ids: Vec::new() })
    }

    pub fn v_ids<V: Into<ConstValue>>(ids: impl IntoIterator<Item = V>) -> Self {
        Self::anonymous().step(StepKind::V { ids: consts(ids) })
    }

    pub fn e() -> Self {
        Self::anonymous().step(StepKind::E { ids: Vec::new() })
    }

    pub fn step(mut self, kind: StepKind) -> Self {
        self.steps.push(Step::new(kind));
        self
    }

    /// Label the most recent step
    pub fn as_(mut self, alias: &str) -> Self {
        if let Some(last) = self.steps.last_mut() {
            last.alias = Some(alias.to_string());
        }
        self
    }

    pub fn has(self, key: &str, predicate: Predicate) -> Self {
        self.step(StepKind::Has {
            containers: vec![HasContainer {
                key: key.to_string(),
                predicate: Some(predicate),
            }],
        })
    }

    pub fn has_key(self, key: &str) -> Self {
        self.step(StepKind::Has {
            containers: vec![HasContainer {
                key: key.to_string(),
                predicate: None,
            }],
        })
    }

    pub fn has_label(self, labels: &[&str]) -> Self {
        self.step(StepKind::HasLabel {
            labels: strings(labels),
        })
    }

    pub fn has_id<V: Into<ConstValue>>(self, ids: impl IntoIterator<Item = V>) -> Self {
        self.step(StepKind::HasId { ids: consts(ids) })
    }

    pub fn vertex(self, direction: &str, labels: &[&str], edge: bool) -> Self {
        self.step(StepKind::Vertex {
            direction: direction.to_string(),
            labels: strings(labels),
            edge,
        })
    }

    pub fn out(self, labels: &[&str]) -> Self {
        self.vertex("out", labels, false)
    }

    pub fn in_(self, labels: &[&str]) -> Self {
        self.vertex("in", labels, false)
    }

    pub fn both(self, labels: &[&str]) -> Self {
        self.vertex("both", labels, false)
    }

    pub fn out_e(self, labels: &[&str]) -> Self {
        self.vertex("out", labels, true)
    }

    pub fn in_e(self, labels: &[&str]) -> Self {
        self.vertex("in", labels, true)
    }

    pub fn both_e(self, labels: &[&str]) -> Self {
        self.vertex("both", labels, true)
    }

    pub fn out_v(self) -> Self {
        self.step(StepKind::EdgeVertex {
            direction: "out".to_string(),
        })
    }

    pub fn in_v(self) -> Self {
        self.step(StepKind::EdgeVertex {
            direction: "in".to_string(),
        })
    }

    pub fn both_v(self) -> Self {
        self.step(StepKind::EdgeVertex {
            direction: "both".to_string(),
        })
    }

    pub fn other_v(self) -> Self {
        self.step(StepKind::OtherV)
    }

    pub fn path_expand(self, direction: &str, labels: &[&str], lower: i32, upper: i32) -> Self {
        self.step(StepKind::PathExpand {
            direction: direction.to_string(),
            labels: strings(labels),
            lower,
            upper,
            whole_path: None,
        })
    }

    pub fn where_(self, predicate: TagPredicate) -> Self {
        self.step(StepKind::WherePredicate {
            start_tag: None,
            predicate,
        })
    }

    pub fn where_start(self, start_tag: &str, predicate: TagPredicate) -> Self {
        self.step(StepKind::WherePredicate {
            start_tag: Some(start_tag.to_string()),
            predicate,
        })
    }

    pub fn where_traversal(self, traversal: Traversal) -> Self {
        self.step(StepKind::WhereTraversal { traversal })
    }

    pub fn not(self, traversal: Traversal) -> Self {
        self.step(StepKind::Not { traversal })
    }

    pub fn apply(self, traversal: Traversal, join_kind: &str) -> Self {
        self.step(StepKind::Apply {
            traversal,
            join_kind: join_kind.to_string(),
        })
    }

    pub fn union(self, branches: Vec<Traversal>) -> Self {
        self.step(StepKind::Union { branches })
    }

    pub fn limit(self, count: i32) -> Self {
        self.step(StepKind::Limit { count })
    }

    pub fn range(self, lower: i32, upper: i32) -> Self {
        self.step(StepKind::Range { lower, upper })
    }

    pub fn order(self) -> Self {
        self.step(StepKind::Order)
    }

    pub fn group(self) -> Self {
        self.step(StepKind::Group)
    }

    pub fn group_count(self) -> Self {
        self.step(StepKind::GroupCount)
    }

    pub fn count(self) -> Self {
        self.step(StepKind::Count)
    }

    pub fn dedup(self, tags: &[&str]) -> Self {
        self.step(StepKind::Dedup {
            tags: strings(tags),
        })
    }

    pub fn select(self, tags: &[&str]) -> Self {
        self.step(StepKind::Select {
            tags: strings(tags),
        })
    }

    pub fn values(self, keys: &[&str]) -> Self {
        self.step(StepKind::Values {
            keys: strings(keys),
        })
    }

    pub fn value_map(self, keys: &[&str]) -> Self {
        self.step(StepKind::ValueMap {
            keys: strings(keys),
        })
    }

    pub fn by(self, modifier: ByModifier) -> Self {
        self.step(StepKind::By {
            modifier,
            order: None,
        })
    }

    pub fn by_key(self, key: &str) -> Self {
        self.by(ByModifier::Key {
            key: key.to_string(),
        })
    }

    pub fn by_order(self, modifier: ByModifier, order: &str) -> Self {
        self.step(StepKind::By {
            modifier,
            order: Some(order.to_string()),
        })
    }

    pub fn unknown(self, name: &str) -> Self {
        self.step(StepKind::Unknown {
            name: name.to_string(),
        })
    }
}
