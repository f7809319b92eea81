// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Logical operator model
//!
//! A `LogicalOperator` is one of thirteen kinds, each with its own set of
//! argument slots. Slots start absent and are filled either through the typed
//! argument structs or through the generic `set_arg`/`get_arg` pair, which
//! rejects slots the kind does not define and values of the wrong type.
//! Required-slot checks happen later, when the operator is appended to a plan.

use crate::error::{IrError, IrResult};
use crate::plan::collection::OperatorCollection;
use crate::plan::types::{
    AggFn, Alias, ConstValue, Direction, JoinKind, NameOrId, OrderOpt, ScanOpt, VOpt, Variable,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of operator kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Scan,
    Select,
    Expand,
    Limit,
    Project,
    OrderBy,
    GroupBy,
    Dedup,
    Sink,
    PathExpand,
    GetVertex,
    Apply,
    Union,
}

impl OpKind {
    /// Slots defined for this kind
    pub fn slots(self) -> &'static [ArgSlot] {
        use ArgSlot as S;
        match self {
            OpKind::Scan => &[S::ScanOpt, S::Labels, S::Properties, S::Ids, S::Predicate, S::Limit],
            OpKind::Select => &[S::Predicate],
            OpKind::Expand => &[
                S::Direction,
                S::IsEdge,
                S::Labels,
                S::Properties,
                S::Predicate,
                S::Limit,
            ],
            OpKind::Limit => &[S::Lower, S::Upper],
            OpKind::Project => &[S::ExprWithAlias],
            OpKind::OrderBy => &[S::OrderPairs, S::Lower, S::Upper],
            OpKind::GroupBy => &[S::GroupKeys, S::GroupValues],
            OpKind::Dedup => &[S::DedupKeys],
            OpKind::Sink => &[S::SinkColumns],
            OpKind::PathExpand => &[
                S::Direction,
                S::IsEdge,
                S::Labels,
                S::Properties,
                S::Predicate,
                S::Limit,
                S::Lower,
                S::Upper,
                S::WholePath,
            ],
            OpKind::GetVertex => &[S::VertexOpt],
            OpKind::Apply => &[S::SubCollection, S::SubRootId, S::JoinKind],
            OpKind::Union => &[S::SubCollections, S::ParentIds],
        }
    }

    pub fn accepts(self, slot: ArgSlot) -> bool {
        self.slots().contains(&slot)
    }

    /// Kinds whose accumulated form carries the alias itself; every other kind
    /// gets a trailing alias node when an alias is set.
    pub fn embeds_alias(self) -> bool {
        matches!(
            self,
            OpKind::Scan
                | OpKind::Expand
                | OpKind::PathExpand
                | OpKind::Project
                | OpKind::GroupBy
                | OpKind::Apply
                | OpKind::GetVertex
        )
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Argument slot names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgSlot {
    ScanOpt,
    Labels,
    Properties,
    Ids,
    Predicate,
    Limit,
    Direction,
    IsEdge,
    Lower,
    Upper,
    ExprWithAlias,
    OrderPairs,
    GroupKeys,
    GroupValues,
    DedupKeys,
    SinkColumns,
    WholePath,
    VertexOpt,
    SubCollection,
    SubRootId,
    JoinKind,
    SubCollections,
    ParentIds,
}

impl fmt::Display for ArgSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgSlot::ScanOpt => "scan_opt",
            ArgSlot::Labels => "labels",
            ArgSlot::Properties => "properties",
            ArgSlot::Ids => "ids",
            ArgSlot::Predicate => "predicate",
            ArgSlot::Limit => "limit",
            ArgSlot::Direction => "direction",
            ArgSlot::IsEdge => "is_edge",
            ArgSlot::Lower => "lower",
            ArgSlot::Upper => "upper",
            ArgSlot::ExprWithAlias => "expr_with_alias",
            ArgSlot::OrderPairs => "order_pairs",
            ArgSlot::GroupKeys => "group_keys",
            ArgSlot::GroupValues => "group_values",
            ArgSlot::DedupKeys => "dedup_keys",
            ArgSlot::SinkColumns => "sink_columns",
            ArgSlot::WholePath => "is_whole_path",
            ArgSlot::VertexOpt => "vopt",
            ArgSlot::SubCollection => "sub_collection",
            ArgSlot::SubRootId => "sub_root_id",
            ArgSlot::JoinKind => "join_kind",
            ArgSlot::SubCollections => "sub_collections",
            ArgSlot::ParentIds => "parent_id_list",
        };
        write!(f, "{}", name)
    }
}

/// Projection expression and the alias its result is bound to
#[derive(Debug, Clone, PartialEq)]
pub struct ExprAlias {
    pub expr: String,
    pub alias: Option<Alias>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderPair {
    pub key: Variable,
    pub order: OrderOpt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyAlias {
    pub key: Variable,
    pub alias: Alias,
}

/// Dynamically typed slot value used by `set_arg`/`get_arg`
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    ScanOpt(ScanOpt),
    Names(Vec<NameOrId>),
    Consts(Vec<ConstValue>),
    Expr(String),
    Int(i32),
    Bool(bool),
    Direction(Direction),
    ExprAliases(Vec<ExprAlias>),
    OrderPairs(Vec<OrderPair>),
    KeyAliases(Vec<KeyAlias>),
    AggFns(Vec<AggFn>),
    Variables(Vec<Variable>),
    VOpt(VOpt),
    JoinKind(JoinKind),
    Collection(OperatorCollection),
    Collections(Vec<OperatorCollection>),
    Ints(Vec<i32>),
}

impl ArgValue {
    fn type_name(&self) -> &'static str {
        match self {
            ArgValue::ScanOpt(_) => "ScanOpt",
            ArgValue::Names(_) => "Names",
            ArgValue::Consts(_) => "Consts",
            ArgValue::Expr(_) => "Expr",
            ArgValue::Int(_) => "Int",
            ArgValue::Bool(_) => "Bool",
            ArgValue::Direction(_) => "Direction",
            ArgValue::ExprAliases(_) => "ExprAliases",
            ArgValue::OrderPairs(_) => "OrderPairs",
            ArgValue::KeyAliases(_) => "KeyAliases",
            ArgValue::AggFns(_) => "AggFns",
            ArgValue::Variables(_) => "Variables",
            ArgValue::VOpt(_) => "VOpt",
            ArgValue::JoinKind(_) => "JoinKind",
            ArgValue::Collection(_) => "Collection",
            ArgValue::Collections(_) => "Collections",
            ArgValue::Ints(_) => "Ints",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanArgs {
    pub scan_opt: Option<ScanOpt>,
    pub labels: Option<Vec<NameOrId>>,
    pub properties: Option<Vec<NameOrId>>,
    /// Element ids looked up through the primary index, OR-combined
    pub ids: Option<Vec<ConstValue>>,
    pub predicate: Option<String>,
    pub limit: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectArgs {
    pub predicate: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandArgs {
    pub direction: Option<Direction>,
    pub is_edge: Option<bool>,
    pub labels: Option<Vec<NameOrId>>,
    pub properties: Option<Vec<NameOrId>>,
    pub predicate: Option<String>,
    pub limit: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LimitArgs {
    pub lower: Option<i32>,
    pub upper: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectArgs {
    pub expr_with_alias: Option<Vec<ExprAlias>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderArgs {
    pub pairs: Option<Vec<OrderPair>>,
    /// Top-k window; both bounds or neither
    pub lower: Option<i32>,
    pub upper: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupArgs {
    pub keys: Option<Vec<KeyAlias>>,
    pub values: Option<Vec<AggFn>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupArgs {
    pub keys: Option<Vec<Variable>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkArgs {
    pub columns: Option<Vec<NameOrId>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathExpandArgs {
    pub expand: ExpandArgs,
    pub lower: Option<i32>,
    pub upper: Option<i32>,
    /// Keep every intermediate vertex instead of only the end points
    pub whole_path: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetVertexArgs {
    pub vopt: Option<VOpt>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyArgs {
    pub sub_collection: Option<OperatorCollection>,
    pub sub_root_id: Option<i32>,
    pub join_kind: Option<JoinKind>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnionArgs {
    pub sub_collections: Option<Vec<OperatorCollection>>,
    pub parent_ids: Option<Vec<i32>>,
}

/// Kind-specific arguments
#[derive(Debug, Clone, PartialEq)]
pub enum OpArgs {
    Scan(ScanArgs),
    Select(SelectArgs),
    Expand(ExpandArgs),
    Limit(LimitArgs),
    Project(ProjectArgs),
    OrderBy(OrderArgs),
    GroupBy(GroupArgs),
    Dedup(DedupArgs),
    Sink(SinkArgs),
    PathExpand(PathExpandArgs),
    GetVertex(GetVertexArgs),
    Apply(ApplyArgs),
    Union(UnionArgs),
}

impl OpArgs {
    pub fn empty(kind: OpKind) -> Self {
        match kind {
            OpKind::Scan => OpArgs::Scan(ScanArgs::default()),
            OpKind::Select => OpArgs::Select(SelectArgs::default()),
            OpKind::Expand => OpArgs::Expand(ExpandArgs::default()),
            OpKind::Limit => OpArgs::Limit(LimitArgs::default()),
            OpKind::Project => OpArgs::Project(ProjectArgs::default()),
            OpKind::OrderBy => OpArgs::OrderBy(OrderArgs::default()),
            OpKind::GroupBy => OpArgs::GroupBy(GroupArgs::default()),
            OpKind::Dedup => OpArgs::Dedup(DedupArgs::default()),
            OpKind::Sink => OpArgs::Sink(SinkArgs::default()),
            OpKind::PathExpand => OpArgs::PathExpand(PathExpandArgs::default()),
            OpKind::GetVertex => OpArgs::GetVertex(GetVertexArgs::default()),
            OpKind::Apply => OpArgs::Apply(ApplyArgs::default()),
            OpKind::Union => OpArgs::Union(UnionArgs::default()),
        }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            OpArgs::Scan(_) => OpKind::Scan,
            OpArgs::Select(_) => OpKind::Select,
            OpArgs::Expand(_) => OpKind::Expand,
            OpArgs::Limit(_) => OpKind::Limit,
            OpArgs::Project(_) => OpKind::Project,
            OpArgs::OrderBy(_) => OpKind::OrderBy,
            OpArgs::GroupBy(_) => OpKind::GroupBy,
            OpArgs::Dedup(_) => OpKind::Dedup,
            OpArgs::Sink(_) => OpKind::Sink,
            OpArgs::PathExpand(_) => OpKind::PathExpand,
            OpArgs::GetVertex(_) => OpKind::GetVertex,
            OpArgs::Apply(_) => OpKind::Apply,
            OpArgs::Union(_) => OpKind::Union,
        }
    }
}

/// A single logical operator: kind-specific arguments plus an optional alias
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalOperator {
    args: OpArgs,
    alias: Option<Alias>,
}

impl LogicalOperator {
    pub fn new(kind: OpKind) -> Self {
        Self::from_args(OpArgs::empty(kind))
    }

    pub fn from_args(args: OpArgs) -> Self {
        Self { args, alias: None }
    }

    pub fn kind(&self) -> OpKind {
        self.args.kind()
    }

    pub fn args(&self) -> &OpArgs {
        &self.args
    }

    pub fn args_mut(&mut self) -> &mut OpArgs {
        &mut self.args
    }

    pub fn alias(&self) -> Option<&Alias> {
        self.alias.as_ref()
    }

    pub fn set_alias(&mut self, alias: Option<Alias>) {
        self.alias = alias;
    }

    pub fn with_alias(mut self, alias: Alias) -> Self {
        self.alias = Some(alias);
        self
    }

    /// Chaining form of `set_arg`
    pub fn with_arg(mut self, slot: ArgSlot, value: ArgValue) -> IrResult<Self> {
        self.set_arg(slot, value)?;
        Ok(self)
    }

    /// Store `value` in `slot`.
    ///
    /// Fails with `IllegalArgument` when the kind does not define the slot or
    /// the value has the wrong type for it.
    pub fn set_arg(&mut self, slot: ArgSlot, value: ArgValue) -> IrResult<()> {
        use ArgSlot as S;
        use ArgValue as V;

        match (&mut self.args, slot, value) {
            (OpArgs::Scan(a), S::ScanOpt, V::ScanOpt(v)) => a.scan_opt = Some(v),
            (OpArgs::Scan(a), S::Labels, V::Names(v)) => a.labels = Some(v),
            (OpArgs::Scan(a), S::Properties, V::Names(v)) => a.properties = Some(v),
            (OpArgs::Scan(a), S::Ids, V::Consts(v)) => a.ids = Some(v),
            (OpArgs::Scan(a), S::Predicate, V::Expr(v)) => a.predicate = Some(v),
            (OpArgs::Scan(a), S::Limit, V::Int(v)) => a.limit = Some(v),

            (OpArgs::Select(a), S::Predicate, V::Expr(v)) => a.predicate = Some(v),

            (OpArgs::Expand(a), slot, value) => set_expand_arg(a, OpKind::Expand, slot, value)?,

            (OpArgs::Limit(a), S::Lower, V::Int(v)) => a.lower = Some(v),
            (OpArgs::Limit(a), S::Upper, V::Int(v)) => a.upper = Some(v),

            (OpArgs::Project(a), S::ExprWithAlias, V::ExprAliases(v)) => {
                a.expr_with_alias = Some(v)
            }

            (OpArgs::OrderBy(a), S::OrderPairs, V::OrderPairs(v)) => a.pairs = Some(v),
            (OpArgs::OrderBy(a), S::Lower, V::Int(v)) => a.lower = Some(v),
            (OpArgs::OrderBy(a), S::Upper, V::Int(v)) => a.upper = Some(v),

            (OpArgs::GroupBy(a), S::GroupKeys, V::KeyAliases(v)) => a.keys = Some(v),
            (OpArgs::GroupBy(a), S::GroupValues, V::AggFns(v)) => a.values = Some(v),

            (OpArgs::Dedup(a), S::DedupKeys, V::Variables(v)) => a.keys = Some(v),

            (OpArgs::Sink(a), S::SinkColumns, V::Names(v)) => a.columns = Some(v),

            (OpArgs::PathExpand(a), S::Lower, V::Int(v)) => a.lower = Some(v),
            (OpArgs::PathExpand(a), S::Upper, V::Int(v)) => a.upper = Some(v),
            (OpArgs::PathExpand(a), S::WholePath, V::Bool(v)) => a.whole_path = Some(v),
            (OpArgs::PathExpand(a), slot, value) => {
                set_expand_arg(&mut a.expand, OpKind::PathExpand, slot, value)?
            }

            (OpArgs::GetVertex(a), S::VertexOpt, V::VOpt(v)) => a.vopt = Some(v),

            (OpArgs::Apply(a), S::SubCollection, V::Collection(v)) => a.sub_collection = Some(v),
            (OpArgs::Apply(a), S::SubRootId, V::Int(v)) => a.sub_root_id = Some(v),
            (OpArgs::Apply(a), S::JoinKind, V::JoinKind(v)) => a.join_kind = Some(v),

            (OpArgs::Union(a), S::SubCollections, V::Collections(v)) => {
                a.sub_collections = Some(v)
            }
            (OpArgs::Union(a), S::ParentIds, V::Ints(v)) => a.parent_ids = Some(v),

            (args, slot, value) => return Err(slot_mismatch(args.kind(), slot, &value)),
        }
        Ok(())
    }

    /// The stored value of `slot`, or `None` when absent or not defined for
    /// this kind.
    pub fn get_arg(&self, slot: ArgSlot) -> Option<ArgValue> {
        use ArgSlot as S;
        use ArgValue as V;

        match (&self.args, slot) {
            (OpArgs::Scan(a), S::ScanOpt) => a.scan_opt.map(V::ScanOpt),
            (OpArgs::Scan(a), S::Labels) => a.labels.clone().map(V::Names),
            (OpArgs::Scan(a), S::Properties) => a.properties.clone().map(V::Names),
            (OpArgs::Scan(a), S::Ids) => a.ids.clone().map(V::Consts),
            (OpArgs::Scan(a), S::Predicate) => a.predicate.clone().map(V::Expr),
            (OpArgs::Scan(a), S::Limit) => a.limit.map(V::Int),

            (OpArgs::Select(a), S::Predicate) => a.predicate.clone().map(V::Expr),

            (OpArgs::Expand(a), slot) => get_expand_arg(a, slot),

            (OpArgs::Limit(a), S::Lower) => a.lower.map(V::Int),
            (OpArgs::Limit(a), S::Upper) => a.upper.map(V::Int),

            (OpArgs::Project(a), S::ExprWithAlias) => {
                a.expr_with_alias.clone().map(V::ExprAliases)
            }

            (OpArgs::OrderBy(a), S::OrderPairs) => a.pairs.clone().map(V::OrderPairs),
            (OpArgs::OrderBy(a), S::Lower) => a.lower.map(V::Int),
            (OpArgs::OrderBy(a), S::Upper) => a.upper.map(V::Int),

            (OpArgs::GroupBy(a), S::GroupKeys) => a.keys.clone().map(V::KeyAliases),
            (OpArgs::GroupBy(a), S::GroupValues) => a.values.clone().map(V::AggFns),

            (OpArgs::Dedup(a), S::DedupKeys) => a.keys.clone().map(V::Variables),

            (OpArgs::Sink(a), S::SinkColumns) => a.columns.clone().map(V::Names),

            (OpArgs::PathExpand(a), S::Lower) => a.lower.map(V::Int),
            (OpArgs::PathExpand(a), S::Upper) => a.upper.map(V::Int),
            (OpArgs::PathExpand(a), S::WholePath) => a.whole_path.map(V::Bool),
            (OpArgs::PathExpand(a), slot) => get_expand_arg(&a.expand, slot),

            (OpArgs::GetVertex(a), S::VertexOpt) => a.vopt.map(V::VOpt),

            (OpArgs::Apply(a), S::SubCollection) => a.sub_collection.clone().map(V::Collection),
            (OpArgs::Apply(a), S::SubRootId) => a.sub_root_id.map(V::Int),
            (OpArgs::Apply(a), S::JoinKind) => a.join_kind.map(V::JoinKind),

            (OpArgs::Union(a), S::SubCollections) => {
                a.sub_collections.clone().map(V::Collections)
            }
            (OpArgs::Union(a), S::ParentIds) => a.parent_ids.clone().map(V::Ints),

            _ => None,
        }
    }
}

fn set_expand_arg(
    a: &mut ExpandArgs,
    kind: OpKind,
    slot: ArgSlot,
    value: ArgValue,
) -> IrResult<()> {
    match (slot, value) {
        (ArgSlot::Direction, ArgValue::Direction(v)) => a.direction = Some(v),
        (ArgSlot::IsEdge, ArgValue::Bool(v)) => a.is_edge = Some(v),
        (ArgSlot::Labels, ArgValue::Names(v)) => a.labels = Some(v),
        (ArgSlot::Properties, ArgValue::Names(v)) => a.properties = Some(v),
        (ArgSlot::Predicate, ArgValue::Expr(v)) => a.predicate = Some(v),
        (ArgSlot::Limit, ArgValue::Int(v)) => a.limit = Some(v),
        (slot, value) => return Err(slot_mismatch(kind, slot, &value)),
    }
    Ok(())
}

fn get_expand_arg(a: &ExpandArgs, slot: ArgSlot) -> Option<ArgValue> {
    match slot {
        ArgSlot::Direction => a.direction.map(ArgValue::Direction),
        ArgSlot::IsEdge => a.is_edge.map(ArgValue::Bool),
        ArgSlot::Labels => a.labels.clone().map(ArgValue::Names),
        ArgSlot::Properties => a.properties.clone().map(ArgValue::Names),
        ArgSlot::Predicate => a.predicate.clone().map(ArgValue::Expr),
        ArgSlot::Limit => a.limit.map(ArgValue::Int),
        _ => None,
    }
}

fn slot_mismatch(kind: OpKind, slot: ArgSlot, value: &ArgValue) -> IrError {
    let reason = if kind.accepts(slot) {
        format!("value of type {} does not fit this slot", value.type_name())
    } else {
        "slot is not defined for this operator".to_string()
    };
    IrError::illegal_argument(kind, slot.to_string(), reason)
}
