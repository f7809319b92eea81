// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Translation of logical operators into accumulator operators
//!
//! This is where required slots are enforced. Each kind lists what it needs;
//! a missing or malformed slot fails with `IrError::IllegalArgument` naming
//! the kind and slot. Kinds that carry their alias natively put it in the
//! translated operator; the rest are aliased by the assembler afterwards.

use crate::error::{IrError, IrResult};
use crate::plan::logical::{
    AggFunction, ApplyOpr, DedupOpr, EdgeExpandOpr, ExpandBase, GetVOpr, GroupByOpr,
    IndexPredicate, KeyMapping, LimitOpr, OrderByOpr, OrderingPair, PathExpandOpr, PlanOpr,
    ProjectMapping, ProjectOpr, QueryParams, ScanOpr, SelectOpr, SinkOpr, UnionOpr,
};
use crate::plan::operator::{
    ApplyArgs, ArgSlot, DedupArgs, ExpandArgs, GetVertexArgs, GroupArgs, LimitArgs,
    LogicalOperator, OpArgs, OpKind, OrderArgs, PathExpandArgs, ProjectArgs, ScanArgs,
    SelectArgs, SinkArgs, UnionArgs,
};
use crate::plan::types::{Alias, NameOrId, Range, Variable};
use std::collections::HashSet;

fn required<T: Clone>(value: &Option<T>, kind: OpKind, slot: ArgSlot) -> IrResult<T> {
    value
        .clone()
        .ok_or_else(|| IrError::missing_slot(kind, slot.to_string()))
}

fn non_empty<T: Clone>(value: &Option<Vec<T>>, kind: OpKind, slot: ArgSlot) -> IrResult<Vec<T>> {
    let items = required(value, kind, slot)?;
    if items.is_empty() {
        return Err(IrError::illegal_argument(
            kind,
            slot.to_string(),
            "list must not be empty",
        ));
    }
    Ok(items)
}

fn checked_range(kind: OpKind, lower: i32, upper: i32) -> IrResult<Range> {
    if lower < 0 {
        return Err(IrError::illegal_argument(
            kind,
            ArgSlot::Lower.to_string(),
            format!("lower bound {} is negative", lower),
        ));
    }
    if lower > upper {
        return Err(IrError::illegal_argument(
            kind,
            ArgSlot::Upper.to_string(),
            format!("lower bound {} exceeds upper bound {}", lower, upper),
        ));
    }
    Ok(Range::new(lower, upper))
}

fn limit_range(kind: OpKind, limit: Option<i32>) -> IrResult<Option<Range>> {
    limit.map(|n| checked_range(kind, 0, n)).transpose()
}

fn native_alias(alias: Option<&Alias>) -> Option<NameOrId> {
    alias.map(|a| a.name.clone())
}

fn reject_alias(op: &LogicalOperator) -> IrResult<()> {
    match op.alias() {
        Some(_) => Err(IrError::UnsupportedAlias(op.kind())),
        None => Ok(()),
    }
}

/// Check what a branch operator needs before any of its sub-plans is
/// appended, so a bad Apply or Union leaves nothing behind.
pub fn check_branch(op: &LogicalOperator) -> IrResult<()> {
    let kind = op.kind();
    match op.args() {
        OpArgs::Apply(ApplyArgs {
            sub_collection,
            sub_root_id,
            join_kind,
        }) => {
            reject_alias(op)?;
            required(join_kind, kind, ArgSlot::JoinKind)?;
            if sub_collection.is_none() && sub_root_id.is_none() {
                return Err(IrError::missing_slot(kind, ArgSlot::SubCollection.to_string()));
            }
            Ok(())
        }
        OpArgs::Union(UnionArgs {
            sub_collections,
            parent_ids,
        }) => match sub_collections {
            Some(branches) if branches.is_empty() => Err(IrError::illegal_argument(
                kind,
                ArgSlot::SubCollections.to_string(),
                "list must not be empty",
            )),
            Some(_) => Ok(()),
            None => non_empty(parent_ids, kind, ArgSlot::ParentIds).map(|_| ()),
        },
        _ => Ok(()),
    }
}

/// Translate `op` into the accumulator's operator form
pub fn to_plan_opr(op: &LogicalOperator) -> IrResult<PlanOpr> {
    let kind = op.kind();
    match op.args() {
        OpArgs::Scan(args) => scan(args, op.alias()),
        OpArgs::Select(SelectArgs { predicate }) => {
            let predicate = required(predicate, kind, ArgSlot::Predicate)?;
            if predicate.trim().is_empty() {
                return Err(IrError::illegal_argument(
                    kind,
                    ArgSlot::Predicate.to_string(),
                    "predicate is empty",
                ));
            }
            Ok(PlanOpr::Select(SelectOpr { predicate }))
        }
        OpArgs::Expand(args) => Ok(PlanOpr::Edge(EdgeExpandOpr {
            base: expand_base(args, kind)?,
            is_edge: required(&args.is_edge, kind, ArgSlot::IsEdge)?,
            alias: native_alias(op.alias()),
        })),
        OpArgs::Limit(LimitArgs { lower, upper }) => {
            let lower = required(lower, kind, ArgSlot::Lower)?;
            let upper = required(upper, kind, ArgSlot::Upper)?;
            Ok(PlanOpr::Limit(LimitOpr {
                range: checked_range(kind, lower, upper)?,
            }))
        }
        OpArgs::Project(args) => project(args, op.alias()),
        OpArgs::OrderBy(args) => order_by(args),
        OpArgs::GroupBy(args) => {
            reject_alias(op)?;
            group_by(args)
        }
        OpArgs::Dedup(DedupArgs { keys }) => {
            let mut keys = required(keys, kind, ArgSlot::DedupKeys)?;
            if keys.is_empty() {
                // Whole-row dedup
                keys.push(Variable::none());
            }
            Ok(PlanOpr::Dedup(DedupOpr { keys }))
        }
        OpArgs::Sink(SinkArgs { columns }) => Ok(PlanOpr::Sink(SinkOpr {
            tags: non_empty(columns, kind, ArgSlot::SinkColumns)?,
        })),
        OpArgs::PathExpand(args) => path_expand(args, op.alias()),
        OpArgs::GetVertex(GetVertexArgs { vopt }) => Ok(PlanOpr::Vertex(GetVOpr {
            opt: required(vopt, kind, ArgSlot::VertexOpt)?,
            alias: native_alias(op.alias()),
        })),
        OpArgs::Apply(ApplyArgs {
            sub_root_id,
            join_kind,
            ..
        }) => {
            reject_alias(op)?;
            let join_kind = required(join_kind, kind, ArgSlot::JoinKind)?;
            let sub_root_id = required(sub_root_id, kind, ArgSlot::SubRootId)?;
            if sub_root_id < 0 {
                return Err(IrError::illegal_argument(
                    kind,
                    ArgSlot::SubRootId.to_string(),
                    "sub-traversal produced no operators",
                ));
            }
            Ok(PlanOpr::Apply(ApplyOpr {
                join_kind,
                sub_root_id,
                alias: None,
            }))
        }
        OpArgs::Union(UnionArgs { parent_ids, .. }) => Ok(PlanOpr::Union(UnionOpr {
            parents: non_empty(parent_ids, kind, ArgSlot::ParentIds)?,
        })),
    }
}

fn scan(args: &ScanArgs, alias: Option<&Alias>) -> IrResult<PlanOpr> {
    let kind = OpKind::Scan;
    let scan_opt = required(&args.scan_opt, kind, ArgSlot::ScanOpt)?;
    let idx_predicate = match &args.ids {
        Some(ids) if ids.is_empty() => {
            return Err(IrError::illegal_argument(
                kind,
                ArgSlot::Ids.to_string(),
                "an empty id list matches nothing",
            ))
        }
        Some(ids) => Some(IndexPredicate { ids: ids.clone() }),
        None => None,
    };
    Ok(PlanOpr::Scan(ScanOpr {
        scan_opt,
        alias: native_alias(alias),
        params: QueryParams {
            tables: args.labels.clone().unwrap_or_default(),
            columns: args.properties.clone().unwrap_or_default(),
            limit: limit_range(kind, args.limit)?,
            predicate: args.predicate.clone(),
        },
        idx_predicate,
    }))
}

fn expand_base(args: &ExpandArgs, kind: OpKind) -> IrResult<ExpandBase> {
    Ok(ExpandBase {
        direction: required(&args.direction, kind, ArgSlot::Direction)?,
        params: QueryParams {
            tables: args.labels.clone().unwrap_or_default(),
            columns: args.properties.clone().unwrap_or_default(),
            limit: limit_range(kind, args.limit)?,
            predicate: args.predicate.clone(),
        },
    })
}

fn path_expand(args: &PathExpandArgs, alias: Option<&Alias>) -> IrResult<PlanOpr> {
    let kind = OpKind::PathExpand;
    let base = expand_base(&args.expand, kind)?;
    required(&args.expand.is_edge, kind, ArgSlot::IsEdge)?;
    let lower = required(&args.lower, kind, ArgSlot::Lower)?;
    let upper = required(&args.upper, kind, ArgSlot::Upper)?;
    Ok(PlanOpr::Path(PathExpandOpr {
        base,
        hop_range: checked_range(kind, lower, upper)?,
        is_whole_path: args.whole_path.unwrap_or(false),
        alias: native_alias(alias),
    }))
}

fn project(args: &ProjectArgs, alias: Option<&Alias>) -> IrResult<PlanOpr> {
    let kind = OpKind::Project;
    let mut mappings = non_empty(&args.expr_with_alias, kind, ArgSlot::ExprWithAlias)?;

    if let Some(alias) = alias {
        match mappings.as_mut_slice() {
            [single] if single.alias.is_none() => single.alias = Some(alias.clone()),
            _ => return Err(IrError::UnsupportedAlias(kind)),
        }
    }

    let mut seen = HashSet::new();
    for mapping in &mappings {
        if let Some(alias) = &mapping.alias {
            if !seen.insert(&alias.name) {
                return Err(IrError::illegal_argument(
                    kind,
                    ArgSlot::ExprWithAlias.to_string(),
                    format!("alias {} is used twice", alias.name),
                ));
            }
        }
    }

    Ok(PlanOpr::Project(ProjectOpr {
        mappings: mappings
            .into_iter()
            .map(|m| ProjectMapping {
                expr: m.expr,
                alias: m.alias.map(|a| a.name),
            })
            .collect(),
        is_append: true,
    }))
}

fn order_by(args: &OrderArgs) -> IrResult<PlanOpr> {
    let kind = OpKind::OrderBy;
    let pairs = non_empty(&args.pairs, kind, ArgSlot::OrderPairs)?;
    let limit = match (args.lower, args.upper) {
        (Some(lower), Some(upper)) => Some(checked_range(kind, lower, upper)?),
        (None, None) => None,
        (Some(_), None) => return Err(IrError::missing_slot(kind, ArgSlot::Upper.to_string())),
        (None, Some(_)) => return Err(IrError::missing_slot(kind, ArgSlot::Lower.to_string())),
    };
    Ok(PlanOpr::OrderBy(OrderByOpr {
        pairs: pairs
            .into_iter()
            .map(|p| OrderingPair {
                key: p.key,
                order: p.order,
            })
            .collect(),
        limit,
    }))
}

fn group_by(args: &GroupArgs) -> IrResult<PlanOpr> {
    let kind = OpKind::GroupBy;
    let keys = required(&args.keys, kind, ArgSlot::GroupKeys)?;
    let values = non_empty(&args.values, kind, ArgSlot::GroupValues)?;
    Ok(PlanOpr::GroupBy(GroupByOpr {
        mappings: keys
            .into_iter()
            .map(|k| KeyMapping {
                key: k.key,
                alias: k.alias.name,
            })
            .collect(),
        functions: values
            .into_iter()
            .map(|f| AggFunction {
                vars: f.vars,
                aggregate: f.aggregate,
                alias: f.alias.name,
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::operator::{ArgValue, ExprAlias};
    use crate::plan::types::{AggFn, AggOpt, ConstValue, JoinKind, ScanOpt};

    fn op(kind: OpKind, slots: Vec<(ArgSlot, ArgValue)>) -> LogicalOperator {
        let mut op = LogicalOperator::new(kind);
        for (slot, value) in slots {
            op.set_arg(slot, value).unwrap();
        }
        op
    }

    fn assert_missing(op: &LogicalOperator, slot: &str) {
        match to_plan_opr(op) {
            Err(IrError::IllegalArgument { slot: s, .. }) => assert_eq!(s, slot),
            other => panic!("expected missing {}, got {:?}", slot, other),
        }
    }

    #[test]
    fn test_required_slots() {
        assert_missing(&LogicalOperator::new(OpKind::Scan), "scan_opt");
        assert_missing(&LogicalOperator::new(OpKind::Select), "predicate");
        assert_missing(&LogicalOperator::new(OpKind::Expand), "direction");
        assert_missing(&LogicalOperator::new(OpKind::Limit), "lower");
        assert_missing(&LogicalOperator::new(OpKind::Project), "expr_with_alias");
        assert_missing(&LogicalOperator::new(OpKind::OrderBy), "order_pairs");
        assert_missing(&LogicalOperator::new(OpKind::GroupBy), "group_keys");
        assert_missing(&LogicalOperator::new(OpKind::Dedup), "dedup_keys");
        assert_missing(&LogicalOperator::new(OpKind::Sink), "sink_columns");
        assert_missing(&LogicalOperator::new(OpKind::GetVertex), "vopt");
        assert_missing(&LogicalOperator::new(OpKind::Apply), "join_kind");
        assert_missing(&LogicalOperator::new(OpKind::Union), "parent_id_list");
    }

    #[test]
    fn test_scan_ids_become_index_predicate() {
        let scan = op(
            OpKind::Scan,
            vec![
                (ArgSlot::ScanOpt, ArgValue::ScanOpt(ScanOpt::Vertex)),
                (ArgSlot::Ids, ArgValue::Consts(vec![ConstValue::Int(1), ConstValue::Int(2)])),
            ],
        );
        match to_plan_opr(&scan).unwrap() {
            PlanOpr::Scan(s) => {
                assert_eq!(s.idx_predicate.unwrap().ids, vec![ConstValue::Int(1), ConstValue::Int(2)]);
                assert!(s.params.tables.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_scan_ids_rejected() {
        let scan = op(
            OpKind::Scan,
            vec![
                (ArgSlot::ScanOpt, ArgValue::ScanOpt(ScanOpt::Vertex)),
                (ArgSlot::Ids, ArgValue::Consts(Vec::new())),
            ],
        );
        assert_missing(&scan, "ids");
    }

    #[test]
    fn test_check_branch() {
        let apply = op(
            OpKind::Apply,
            vec![(ArgSlot::JoinKind, ArgValue::JoinKind(JoinKind::Semi))],
        );
        match check_branch(&apply) {
            Err(IrError::IllegalArgument { slot, .. }) => assert_eq!(slot, "sub_collection"),
            other => panic!("unexpected {:?}", other),
        }

        let aliased = op(
            OpKind::Apply,
            vec![
                (ArgSlot::JoinKind, ArgValue::JoinKind(JoinKind::Semi)),
                (ArgSlot::SubRootId, ArgValue::Int(1)),
            ],
        )
        .with_alias(Alias::query_given("w"));
        assert!(matches!(
            check_branch(&aliased),
            Err(IrError::UnsupportedAlias(OpKind::Apply))
        ));

        let union = op(OpKind::Union, vec![(ArgSlot::ParentIds, ArgValue::Ints(vec![1, 2]))]);
        assert!(check_branch(&union).is_ok());
        assert!(check_branch(&LogicalOperator::new(OpKind::Scan)).is_ok());
    }

    #[test]
    fn test_limit_bounds() {
        let equal = op(
            OpKind::Limit,
            vec![(ArgSlot::Lower, ArgValue::Int(5)), (ArgSlot::Upper, ArgValue::Int(5))],
        );
        assert!(to_plan_opr(&equal).is_ok());

        let inverted = op(
            OpKind::Limit,
            vec![(ArgSlot::Lower, ArgValue::Int(6)), (ArgSlot::Upper, ArgValue::Int(5))],
        );
        assert!(matches!(
            to_plan_opr(&inverted),
            Err(IrError::IllegalArgument { .. })
        ));
    }

    #[test]
    fn test_order_window_needs_both_bounds() {
        let order = op(
            OpKind::OrderBy,
            vec![
                (
                    ArgSlot::OrderPairs,
                    ArgValue::OrderPairs(vec![crate::plan::operator::OrderPair {
                        key: Variable::property("age"),
                        order: crate::plan::types::OrderOpt::Desc,
                    }]),
                ),
                (ArgSlot::Lower, ArgValue::Int(0)),
            ],
        );
        assert_missing(&order, "upper");
    }

    #[test]
    fn test_empty_dedup_keys_mean_whole_row() {
        let dedup = op(OpKind::Dedup, vec![(ArgSlot::DedupKeys, ArgValue::Variables(vec![]))]);
        assert_eq!(
            to_plan_opr(&dedup).unwrap(),
            PlanOpr::Dedup(DedupOpr {
                keys: vec![Variable::none()]
            })
        );
    }

    #[test]
    fn test_group_alias_is_unsupported() {
        let group = op(
            OpKind::GroupBy,
            vec![
                (ArgSlot::GroupKeys, ArgValue::KeyAliases(vec![])),
                (
                    ArgSlot::GroupValues,
                    ArgValue::AggFns(vec![AggFn {
                        vars: vec![],
                        aggregate: AggOpt::Count,
                        alias: Alias::derived("groupValues"),
                    }]),
                ),
            ],
        )
        .with_alias(Alias::query_given("g"));
        assert!(matches!(
            to_plan_opr(&group),
            Err(IrError::UnsupportedAlias(OpKind::GroupBy))
        ));
    }

    #[test]
    fn test_project_alias_rules() {
        let single = op(
            OpKind::Project,
            vec![(
                ArgSlot::ExprWithAlias,
                ArgValue::ExprAliases(vec![ExprAlias {
                    expr: "@.name".to_string(),
                    alias: None,
                }]),
            )],
        )
        .with_alias(Alias::query_given("n"));
        match to_plan_opr(&single).unwrap() {
            PlanOpr::Project(p) => {
                assert!(p.is_append);
                assert_eq!(p.mappings[0].alias, Some(NameOrId::name("n")));
            }
            other => panic!("unexpected {:?}", other),
        }

        let duplicated = op(
            OpKind::Project,
            vec![(
                ArgSlot::ExprWithAlias,
                ArgValue::ExprAliases(vec![
                    ExprAlias {
                        expr: "@a".to_string(),
                        alias: Some(Alias::derived("project_a")),
                    },
                    ExprAlias {
                        expr: "@a".to_string(),
                        alias: Some(Alias::derived("project_a")),
                    },
                ]),
            )],
        );
        assert!(matches!(
            to_plan_opr(&duplicated),
            Err(IrError::IllegalArgument { .. })
        ));
    }

    #[test]
    fn test_path_expand_defaults_to_end_points() {
        let path = op(
            OpKind::PathExpand,
            vec![
                (ArgSlot::Direction, ArgValue::Direction(crate::plan::types::Direction::Out)),
                (ArgSlot::IsEdge, ArgValue::Bool(false)),
                (ArgSlot::Lower, ArgValue::Int(1)),
                (ArgSlot::Upper, ArgValue::Int(3)),
            ],
        );
        match to_plan_opr(&path).unwrap() {
            PlanOpr::Path(p) => {
                assert!(!p.is_whole_path);
                assert_eq!(p.hop_range, Range::new(1, 3));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_apply_requires_sub_root() {
        let apply = op(
            OpKind::Apply,
            vec![(
                ArgSlot::JoinKind,
                ArgValue::JoinKind(crate::plan::types::JoinKind::Semi),
            )],
        );
        assert_missing(&apply, "sub_root_id");
    }
}
