// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Operator collection builder
//!
//! Walks a traversal's steps in order and produces one logical operator per
//! step. Steps that accept `by()` modulators consume the modulators that
//! follow them. The only fusion performed is folding `has`, `hasLabel` and
//! `hasId` steps that directly follow `V()`/`E()` into the scan; an empty
//! label or id list is never fused, since the scan would read it as "any".
//! Nested
//! traversals of `where`, `not`, `apply` and `union` are built recursively.

use crate::error::{IrError, IrResult};
use crate::expr::{self, group_key_alias, group_value_alias, project_alias};
use crate::plan::collection::OperatorCollection;
use crate::plan::operator::{
    ApplyArgs, DedupArgs, ExpandArgs, ExprAlias, GetVertexArgs, GroupArgs, KeyAlias, LimitArgs,
    LogicalOperator, OpArgs, OrderArgs, OrderPair, PathExpandArgs, ProjectArgs, ScanArgs,
    SelectArgs, UnionArgs,
};
use crate::plan::types::{
    AggFn, AggOpt, Alias, ConstValue, Direction, JoinKind, NameOrId, OrderOpt, ScanOpt, VOpt,
    Variable,
};
use crate::traversal::{ByModifier, Comparator, HasContainer, Step, StepKind, Traversal};

/// A `by()` modulator together with its order token and source-step alias
struct Modulator<'a> {
    modifier: &'a ByModifier,
    order: Option<&'a str>,
    alias: Option<&'a str>,
}

impl<'a> Modulator<'a> {
    fn from_step(step: &'a Step) -> Option<Self> {
        match &step.kind {
            StepKind::By { modifier, order } => Some(Self {
                modifier,
                order: order.as_deref(),
                alias: step.alias.as_deref(),
            }),
            _ => None,
        }
    }

    fn reject_order(&self, step: &str) -> IrResult<()> {
        match self.order {
            Some(order) => Err(IrError::UnsupportedPattern(format!(
                "{}().by(.., {}) does not take an order",
                step, order
            ))),
            None => Ok(()),
        }
    }
}

/// The property a modulator selects on the current element, if any
fn modulator_property(modifier: &ByModifier, step: &str) -> IrResult<Option<String>> {
    match modifier {
        ByModifier::Identity => Ok(None),
        ByModifier::Key { key } => Ok(Some(key.clone())),
        ByModifier::Values { keys } if keys.len() == 1 => Ok(Some(keys[0].clone())),
        _ => Err(IrError::UnsupportedPattern(format!(
            "supported pattern is [{0}().by()] or [{0}().by('name')] or [{0}().by(values('name'))]",
            step
        ))),
    }
}

/// The variable a modulator selects, allowing `select(tag)` forms
fn modulator_variable(modifier: &ByModifier, step: &str) -> IrResult<Variable> {
    match modifier {
        ByModifier::Select { tag, property } => Ok(match property {
            Some(p) => Variable::tag_property(tag.as_str(), p),
            None => Variable::tag(tag.as_str()),
        }),
        other => Ok(match modulator_property(other, step)? {
            Some(p) => Variable::property(&p),
            None => Variable::none(),
        }),
    }
}

fn query_alias(step: &Step) -> Option<Alias> {
    step.alias.as_deref().map(Alias::query_given)
}

fn consts_to_labels(value: &ConstValue) -> Option<Vec<NameOrId>> {
    match value {
        ConstValue::Str(s) => Some(vec![NameOrId::name(s.as_str())]),
        ConstValue::List(items) => items
            .iter()
            .map(|item| match item {
                ConstValue::Str(s) => Some(NameOrId::name(s.as_str())),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

fn consts_to_ids(value: &ConstValue) -> Vec<ConstValue> {
    match value {
        ConstValue::List(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Builds the operator collection for one traversal
pub struct OperatorCollectionBuilder<'a> {
    traversal: &'a Traversal,
}

impl<'a> OperatorCollectionBuilder<'a> {
    pub fn new(traversal: &'a Traversal) -> Self {
        Self { traversal }
    }

    pub fn build(&self) -> IrResult<OperatorCollection> {
        let steps = &self.traversal.steps;
        let mut collection = OperatorCollection::new();
        let mut index = 0;
        while index < steps.len() {
            let (op, next) = self.transform_step(index)?;
            log::debug!(
                "Step {} ({}) became {} operator",
                index,
                steps[index].kind.name(),
                op.kind()
            );
            collection.push(op);
            index = next;
        }
        Ok(collection)
    }

    /// Modulators directly following `index`, and the index after them
    fn modulators(&self, index: usize) -> (Vec<Modulator<'a>>, usize) {
        let mut modulators = Vec::new();
        let mut next = index + 1;
        while let Some(m) = self.traversal.steps.get(next).and_then(Modulator::from_step) {
            modulators.push(m);
            next += 1;
        }
        (modulators, next)
    }

    /// Transform the step at `index`; returns the operator and the index of
    /// the next unconsumed step.
    fn transform_step(&self, index: usize) -> IrResult<(LogicalOperator, usize)> {
        let step = &self.traversal.steps[index];
        let next = index + 1;

        let (mut op, next) = match &step.kind {
            StepKind::V { ids } => return self.fuse_scan(index, ScanOpt::Vertex, ids),
            StepKind::E { ids } => return self.fuse_scan(index, ScanOpt::Edge, ids),
            StepKind::Has { containers } => (select(expr::has_predicate(containers)?), next),
            StepKind::HasLabel { labels } => (select(expr::label_predicate(labels)), next),
            StepKind::HasId { ids } => (select(expr::id_predicate(ids)), next),
            StepKind::Vertex {
                direction,
                labels,
                edge,
            } => {
                let args = ExpandArgs {
                    direction: Some(direction.parse::<Direction>()?),
                    is_edge: Some(*edge),
                    labels: names(labels),
                    ..Default::default()
                };
                (LogicalOperator::from_args(OpArgs::Expand(args)), next)
            }
            StepKind::EdgeVertex { direction } => (
                get_vertex(VOpt::from_edge_direction(direction)?),
                next,
            ),
            StepKind::OtherV => (get_vertex(VOpt::Other), next),
            StepKind::PathExpand {
                direction,
                labels,
                lower,
                upper,
                whole_path,
            } => {
                let args = PathExpandArgs {
                    expand: ExpandArgs {
                        direction: Some(direction.parse::<Direction>()?),
                        is_edge: Some(false),
                        labels: names(labels),
                        ..Default::default()
                    },
                    lower: Some(*lower),
                    upper: Some(*upper),
                    whole_path: *whole_path,
                };
                (LogicalOperator::from_args(OpArgs::PathExpand(args)), next)
            }
            StepKind::WherePredicate {
                start_tag,
                predicate,
            } => {
                let (modulators, next) = self.modulators(index);
                let mut by_keys = Vec::with_capacity(modulators.len());
                for m in &modulators {
                    m.reject_order("where")?;
                    by_keys.push(modulator_property(m.modifier, "where")?);
                }
                let predicate = expr::where_predicate(start_tag.as_deref(), predicate, &by_keys);
                (select(predicate), next)
            }
            StepKind::WhereTraversal { traversal } => (apply(traversal, JoinKind::Semi)?, next),
            StepKind::Not { traversal } => (apply(traversal, JoinKind::Anti)?, next),
            StepKind::Apply {
                traversal,
                join_kind,
            } => (apply(traversal, join_kind.parse::<JoinKind>()?)?, next),
            StepKind::Union { branches } => {
                let sub_collections = branches
                    .iter()
                    .map(|b| OperatorCollectionBuilder::new(b).build())
                    .collect::<IrResult<Vec<_>>>()?;
                let args = UnionArgs {
                    sub_collections: Some(sub_collections),
                    parent_ids: None,
                };
                (LogicalOperator::from_args(OpArgs::Union(args)), next)
            }
            StepKind::Limit { count } => (limit(0, *count), next),
            StepKind::Range { lower, upper } => (limit(*lower, *upper), next),
            StepKind::Order => {
                let (modulators, next) = self.modulators(index);
                (order(&modulators)?, next)
            }
            StepKind::Group => {
                let (modulators, next) = self.modulators(index);
                (group(&modulators)?, next)
            }
            StepKind::GroupCount => {
                let (modulators, next) = self.modulators(index);
                (group_count(&modulators)?, next)
            }
            StepKind::Count => {
                // The step alias names the count value; the operator itself
                // stays unaliased.
                let value_alias = step
                    .alias
                    .as_deref()
                    .map(Alias::query_given)
                    .unwrap_or_else(|| Alias::derived(group_value_alias()));
                let args = GroupArgs {
                    keys: Some(Vec::new()),
                    values: Some(vec![AggFn {
                        vars: Vec::new(),
                        aggregate: AggOpt::Count,
                        alias: value_alias,
                    }]),
                };
                return Ok((LogicalOperator::from_args(OpArgs::GroupBy(args)), next));
            }
            StepKind::Dedup { tags } => {
                let (modulators, next) = self.modulators(index);
                (dedup(tags, &modulators)?, next)
            }
            StepKind::Select { tags } => {
                let (modulators, next) = self.modulators(index);
                (select_tags(tags, &modulators)?, next)
            }
            StepKind::Values { keys } => match keys.as_slice() {
                [key] => (project_single(Variable::property(key).to_string()), next),
                _ => {
                    return Err(IrError::UnsupportedPattern(
                        "values() takes exactly one key, use valueMap() for several".to_string(),
                    ))
                }
            },
            StepKind::ValueMap { keys } => {
                if keys.is_empty() {
                    return Err(IrError::UnsupportedPattern(
                        "valueMap() needs at least one key".to_string(),
                    ));
                }
                let vars: Vec<Variable> = keys.iter().map(|k| Variable::property(k)).collect();
                (project_single(value_map_expr(&vars)), next)
            }
            StepKind::By { .. } => {
                return Err(IrError::UnsupportedPattern(format!(
                    "by() at step {} does not follow a step that accepts modulators",
                    index
                )))
            }
            StepKind::Unknown { name } => return Err(IrError::UnsupportedStep(name.clone())),
        };

        op.set_alias(query_alias(step));
        Ok((op, next))
    }

    /// Fold `has`/`hasLabel`/`hasId` steps that directly follow a scan into
    /// it. Filters do not change the element an alias binds, so an alias on
    /// the scan or on a fused filter moves to the fused scan. The scan holds
    /// one alias; a second aliased filter ends fusion.
    fn fuse_scan(
        &self,
        index: usize,
        scan_opt: ScanOpt,
        ids: &[ConstValue],
    ) -> IrResult<(LogicalOperator, usize)> {
        let steps = &self.traversal.steps;
        let mut args = ScanArgs {
            scan_opt: Some(scan_opt),
            ..Default::default()
        };
        if !ids.is_empty() {
            args.ids = Some(ids.to_vec());
        }
        let mut labels: Vec<NameOrId> = Vec::new();
        let mut predicates: Vec<String> = Vec::new();
        let mut alias = steps[index].alias.as_deref();
        let mut next = index + 1;

        while next < steps.len() {
            let step_alias = steps[next].alias.as_deref();
            if alias.is_some() && step_alias.is_some() {
                break;
            }
            match &steps[next].kind {
                StepKind::HasLabel { labels: l } if labels.is_empty() && !l.is_empty() => {
                    labels.extend(l.iter().map(|s| NameOrId::name(s.as_str())));
                }
                StepKind::HasId { ids } if args.ids.is_none() && !ids.is_empty() => {
                    args.ids = Some(ids.clone())
                }
                StepKind::Has { containers } => {
                    for container in containers {
                        self.fuse_container(container, &mut args, &mut labels, &mut predicates)?;
                    }
                }
                other => {
                    if matches!(other, StepKind::HasLabel { .. } | StepKind::HasId { .. }) {
                        log::warn!(
                            "{}() at step {} cannot fuse into the scan, emitting a select",
                            other.name(),
                            next
                        );
                    }
                    break;
                }
            }
            alias = alias.or(step_alias);
            next += 1;
        }

        if next > index + 1 {
            log::debug!("Fused {} step(s) into the scan at step {}", next - index - 1, index);
        }
        if !labels.is_empty() {
            args.labels = Some(labels);
        }
        if !predicates.is_empty() {
            args.predicate = Some(predicates.join(" && "));
        }

        let mut op = LogicalOperator::from_args(OpArgs::Scan(args));
        op.set_alias(alias.map(Alias::query_given));
        Ok((op, next))
    }

    fn fuse_container(
        &self,
        container: &HasContainer,
        args: &mut ScanArgs,
        labels: &mut Vec<NameOrId>,
        predicates: &mut Vec<String>,
    ) -> IrResult<()> {
        if let Some(predicate) = &container.predicate {
            let is_lookup = matches!(predicate.cmp, Comparator::Eq | Comparator::Within);
            if is_lookup && container.key == "~label" && labels.is_empty() {
                if let Some(names) = consts_to_labels(&predicate.value) {
                    if !names.is_empty() {
                        labels.extend(names);
                        return Ok(());
                    }
                }
            }
            if is_lookup && container.key == "~id" && args.ids.is_none() {
                let ids = consts_to_ids(&predicate.value);
                if !ids.is_empty() {
                    args.ids = Some(ids);
                    return Ok(());
                }
            }
        }
        predicates.push(expr::container_expr(container)?);
        Ok(())
    }
}

fn names(labels: &[String]) -> Option<Vec<NameOrId>> {
    if labels.is_empty() {
        None
    } else {
        Some(labels.iter().map(|l| NameOrId::name(l.as_str())).collect())
    }
}

fn select(predicate: String) -> LogicalOperator {
    LogicalOperator::from_args(OpArgs::Select(SelectArgs {
        predicate: Some(predicate),
    }))
}

fn limit(lower: i32, upper: i32) -> LogicalOperator {
    LogicalOperator::from_args(OpArgs::Limit(LimitArgs {
        lower: Some(lower),
        upper: Some(upper),
    }))
}

fn get_vertex(vopt: VOpt) -> LogicalOperator {
    LogicalOperator::from_args(OpArgs::GetVertex(GetVertexArgs { vopt: Some(vopt) }))
}

fn apply(traversal: &Traversal, join_kind: JoinKind) -> IrResult<LogicalOperator> {
    let sub_collection = OperatorCollectionBuilder::new(traversal).build()?;
    Ok(LogicalOperator::from_args(OpArgs::Apply(ApplyArgs {
        sub_collection: Some(sub_collection),
        sub_root_id: None,
        join_kind: Some(join_kind),
    })))
}

fn project_single(expr: String) -> LogicalOperator {
    LogicalOperator::from_args(OpArgs::Project(ProjectArgs {
        expr_with_alias: Some(vec![ExprAlias { expr, alias: None }]),
    }))
}

fn value_map_expr(vars: &[Variable]) -> String {
    let parts: Vec<String> = vars.iter().map(|v| v.to_string()).collect();
    format!("{{{}}}", parts.join(", "))
}

fn order(modulators: &[Modulator<'_>]) -> IrResult<LogicalOperator> {
    let pairs = if modulators.is_empty() {
        vec![OrderPair {
            key: Variable::none(),
            order: OrderOpt::Asc,
        }]
    } else {
        modulators
            .iter()
            .map(|m| {
                Ok(OrderPair {
                    key: modulator_variable(m.modifier, "order")?,
                    order: match m.order {
                        Some(token) => token.parse::<OrderOpt>()?,
                        None => OrderOpt::Asc,
                    },
                })
            })
            .collect::<IrResult<Vec<_>>>()?
    };
    Ok(LogicalOperator::from_args(OpArgs::OrderBy(OrderArgs {
        pairs: Some(pairs),
        lower: None,
        upper: None,
    })))
}

fn group_key(modulator: Option<&Modulator<'_>>, step: &str) -> IrResult<KeyAlias> {
    let Some(m) = modulator else {
        return Ok(KeyAlias {
            key: Variable::none(),
            alias: Alias::derived(group_key_alias(&Variable::none())),
        });
    };
    m.reject_order(step)?;
    let key = modulator_variable(m.modifier, step)?;
    let alias = match m.alias {
        Some(alias) => Alias::query_given(alias),
        None => Alias::derived(group_key_alias(&key)),
    };
    Ok(KeyAlias { key, alias })
}

fn group_value(modulator: Option<&Modulator<'_>>) -> IrResult<AggFn> {
    let aggregate = match modulator.map(|m| m.modifier) {
        None | Some(ByModifier::Identity) | Some(ByModifier::Fold) => AggOpt::ToList,
        Some(ByModifier::Count) => AggOpt::Count,
        Some(_) => {
            return Err(IrError::UnsupportedPattern(
                "supported pattern is [group().by(..).by()] or [group().by(..).by(count())] or [group().by(..).by(fold())]"
                    .to_string(),
            ))
        }
    };
    if let Some(m) = modulator {
        m.reject_order("group")?;
    }
    let alias = match modulator.and_then(|m| m.alias) {
        Some(alias) => Alias::query_given(alias),
        None => Alias::derived(group_value_alias()),
    };
    Ok(AggFn {
        vars: Vec::new(),
        aggregate,
        alias,
    })
}

fn group(modulators: &[Modulator<'_>]) -> IrResult<LogicalOperator> {
    if modulators.len() > 2 {
        return Err(IrError::UnsupportedPattern(
            "supported pattern is [group()] or [group().by(..)] or [group().by(..).by(..)]"
                .to_string(),
        ));
    }
    let key = group_key(modulators.first(), "group")?;
    let value = group_value(modulators.get(1))?;
    Ok(LogicalOperator::from_args(OpArgs::GroupBy(GroupArgs {
        keys: Some(vec![key]),
        values: Some(vec![value]),
    })))
}

fn group_count(modulators: &[Modulator<'_>]) -> IrResult<LogicalOperator> {
    if modulators.len() > 1 {
        return Err(IrError::UnsupportedPattern(
            "supported pattern is [groupCount()] or [groupCount().by(..)]".to_string(),
        ));
    }
    let key = group_key(modulators.first(), "groupCount")?;
    Ok(LogicalOperator::from_args(OpArgs::GroupBy(GroupArgs {
        keys: Some(vec![key]),
        values: Some(vec![AggFn {
            vars: Vec::new(),
            aggregate: AggOpt::Count,
            alias: Alias::derived(group_value_alias()),
        }]),
    })))
}

/// `by()` modulators cycle over the keys they modulate
fn cycled<'m, 'a>(modulators: &'m [Modulator<'a>], index: usize) -> Option<&'m Modulator<'a>> {
    if modulators.is_empty() {
        None
    } else {
        modulators.get(index % modulators.len())
    }
}

fn dedup(tags: &[String], modulators: &[Modulator<'_>]) -> IrResult<LogicalOperator> {
    for m in modulators {
        m.reject_order("dedup")?;
    }
    let keys = if tags.is_empty() {
        modulators
            .iter()
            .map(|m| modulator_variable(m.modifier, "dedup"))
            .collect::<IrResult<Vec<_>>>()?
    } else {
        tags.iter()
            .enumerate()
            .map(|(i, tag)| {
                let property = match cycled(modulators, i) {
                    Some(m) => modulator_property(m.modifier, "dedup")?,
                    None => None,
                };
                Ok(match property {
                    Some(p) => Variable::tag_property(tag.as_str(), &p),
                    None => Variable::tag(tag.as_str()),
                })
            })
            .collect::<IrResult<Vec<_>>>()?
    };
    Ok(LogicalOperator::from_args(OpArgs::Dedup(DedupArgs {
        keys: Some(keys),
    })))
}

fn select_tags(tags: &[String], modulators: &[Modulator<'_>]) -> IrResult<LogicalOperator> {
    if tags.is_empty() {
        return Err(IrError::illegal_argument(
            "select",
            "tags",
            "select() needs at least one tag",
        ));
    }
    let mut exprs = Vec::with_capacity(tags.len());
    for (i, tag) in tags.iter().enumerate() {
        let expr = match cycled(modulators, i) {
            None => Variable::tag(tag.as_str()).to_string(),
            Some(m) => {
                m.reject_order("select")?;
                match m.modifier {
                    ByModifier::ValueMap { keys } if !keys.is_empty() => {
                        let vars: Vec<Variable> = keys
                            .iter()
                            .map(|k| Variable::tag_property(tag.as_str(), k))
                            .collect();
                        value_map_expr(&vars)
                    }
                    other => match modulator_property(other, "select")? {
                        Some(p) => Variable::tag_property(tag.as_str(), &p).to_string(),
                        None => Variable::tag(tag.as_str()).to_string(),
                    },
                }
            }
        };
        exprs.push(expr);
    }

    let expr_with_alias = if exprs.len() == 1 {
        exprs
            .into_iter()
            .map(|expr| ExprAlias { expr, alias: None })
            .collect()
    } else {
        exprs
            .into_iter()
            .map(|expr| {
                let alias = project_alias(&expr)?;
                Ok(ExprAlias {
                    expr,
                    alias: Some(Alias::derived(alias)),
                })
            })
            .collect::<IrResult<Vec<_>>>()?
    };
    Ok(LogicalOperator::from_args(OpArgs::Project(ProjectArgs {
        expr_with_alias: Some(expr_with_alias),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::operator::{ArgSlot, ArgValue, OpKind};
    use crate::traversal::{Predicate, TagPredicate};

    fn build(t: Traversal) -> OperatorCollection {
        OperatorCollectionBuilder::new(&t).build().unwrap()
    }

    fn kinds(c: &OperatorCollection) -> Vec<OpKind> {
        c.iter().map(|op| op.kind()).collect()
    }

    #[test]
    fn test_scan_fusion_labels_and_predicates() {
        let c = build(
            Traversal::v()
                .has_label(&["person"])
                .has("name", Predicate::eq("marko"))
                .out(&["knows"]),
        );
        assert_eq!(kinds(&c), vec![OpKind::Scan, OpKind::Expand]);
        let scan = c.get(0).unwrap();
        assert_eq!(
            scan.get_arg(ArgSlot::Labels),
            Some(ArgValue::Names(vec![NameOrId::name("person")]))
        );
        assert_eq!(
            scan.get_arg(ArgSlot::Predicate),
            Some(ArgValue::Expr("@.name == \"marko\"".to_string()))
        );
    }

    #[test]
    fn test_scan_fusion_carries_alias() {
        let c = build(
            Traversal::v()
                .has_label(&["person"])
                .as_("a")
                .has("age", Predicate::gt(30)),
        );
        assert_eq!(kinds(&c), vec![OpKind::Scan]);
        let scan = c.get(0).unwrap();
        assert_eq!(scan.alias(), Some(&Alias::query_given("a")));
        assert_eq!(
            scan.get_arg(ArgSlot::Predicate),
            Some(ArgValue::Expr("@.age > 30".to_string()))
        );
    }

    #[test]
    fn test_aliased_scan_fuses_id_lookup() {
        let c = build(Traversal::v().as_("a").has_id(vec![1, 2]));
        assert_eq!(kinds(&c), vec![OpKind::Scan]);
        let scan = c.get(0).unwrap();
        assert_eq!(scan.alias(), Some(&Alias::query_given("a")));
        assert_eq!(
            scan.get_arg(ArgSlot::Ids),
            Some(ArgValue::Consts(vec![ConstValue::Int(1), ConstValue::Int(2)]))
        );

        let c = build(Traversal::v().has_label(&["person"]).as_("a").has_id(vec![7]));
        assert_eq!(kinds(&c), vec![OpKind::Scan]);
        let scan = c.get(0).unwrap();
        assert_eq!(scan.alias(), Some(&Alias::query_given("a")));
        assert_eq!(
            scan.get_arg(ArgSlot::Labels),
            Some(ArgValue::Names(vec![NameOrId::name("person")]))
        );
        assert_eq!(
            scan.get_arg(ArgSlot::Ids),
            Some(ArgValue::Consts(vec![ConstValue::Int(7)]))
        );
    }

    #[test]
    fn test_second_alias_ends_fusion() {
        let c = build(Traversal::v().as_("a").has_id(vec![1]).as_("b"));
        assert_eq!(kinds(&c), vec![OpKind::Scan, OpKind::Select]);
        assert_eq!(c.get(0).unwrap().alias(), Some(&Alias::query_given("a")));
        assert_eq!(c.get(0).unwrap().get_arg(ArgSlot::Ids), None);
        assert_eq!(c.get(1).unwrap().alias(), Some(&Alias::query_given("b")));
    }

    #[test]
    fn test_empty_id_lookup_is_not_fused() {
        let c = build(Traversal::v().has_id(Vec::<i32>::new()));
        assert_eq!(kinds(&c), vec![OpKind::Scan, OpKind::Select]);
        assert_eq!(c.get(0).unwrap().get_arg(ArgSlot::Ids), None);
        assert_eq!(
            c.get(1).unwrap().get_arg(ArgSlot::Predicate),
            Some(ArgValue::Expr("@.~id within []".to_string()))
        );

        let c = build(Traversal::v().has("~id", Predicate::within(Vec::<i32>::new())));
        assert_eq!(kinds(&c), vec![OpKind::Scan]);
        let scan = c.get(0).unwrap();
        assert_eq!(scan.get_arg(ArgSlot::Ids), None);
        assert_eq!(
            scan.get_arg(ArgSlot::Predicate),
            Some(ArgValue::Expr("@.~id within []".to_string()))
        );
    }

    #[test]
    fn test_label_container_fuses_into_scan() {
        let c = build(Traversal::v().has("~label", Predicate::within(vec!["person", "software"])));
        assert_eq!(
            c.get(0).unwrap().get_arg(ArgSlot::Labels),
            Some(ArgValue::Names(vec![
                NameOrId::name("person"),
                NameOrId::name("software")
            ]))
        );
    }

    #[test]
    fn test_has_outside_scan_is_select() {
        let c = build(Traversal::v().out(&[]).has_label(&["person"]));
        assert_eq!(kinds(&c), vec![OpKind::Scan, OpKind::Expand, OpKind::Select]);
        assert_eq!(
            c.get(2).unwrap().get_arg(ArgSlot::Predicate),
            Some(ArgValue::Expr("@.~label == \"person\"".to_string()))
        );
    }

    #[test]
    fn test_order_modulators() {
        let c = build(
            Traversal::v()
                .order()
                .by_order(
                    ByModifier::Key {
                        key: "age".to_string(),
                    },
                    "desc",
                )
                .by(ByModifier::Select {
                    tag: "a".to_string(),
                    property: Some("name".to_string()),
                }),
        );
        assert_eq!(
            c.get(1).unwrap().get_arg(ArgSlot::OrderPairs),
            Some(ArgValue::OrderPairs(vec![
                OrderPair {
                    key: Variable::property("age"),
                    order: OrderOpt::Desc,
                },
                OrderPair {
                    key: Variable::tag_property("a", "name"),
                    order: OrderOpt::Asc,
                },
            ]))
        );
    }

    #[test]
    fn test_order_rejects_unknown_token() {
        let t = Traversal::v().order().by_order(ByModifier::Identity, "sideways");
        assert!(matches!(
            OperatorCollectionBuilder::new(&t).build(),
            Err(IrError::InvalidEnumValue { .. })
        ));
    }

    #[test]
    fn test_stray_by_is_rejected() {
        let t = Traversal::v().limit(1).by_key("name");
        assert!(matches!(
            OperatorCollectionBuilder::new(&t).build(),
            Err(IrError::UnsupportedPattern(_))
        ));
    }

    #[test]
    fn test_unknown_step() {
        let t = Traversal::v().unknown("sack");
        match OperatorCollectionBuilder::new(&t).build() {
            Err(IrError::UnsupportedStep(name)) => assert_eq!(name, "sack"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_where_predicate_becomes_select() {
        let c = build(
            Traversal::v()
                .as_("a")
                .out(&[])
                .as_("b")
                .where_start("a", TagPredicate::eq("b"))
                .by_key("id")
                .by_key("age"),
        );
        assert_eq!(c.len(), 3);
        assert_eq!(
            c.get(2).unwrap().get_arg(ArgSlot::Predicate),
            Some(ArgValue::Expr(
                "@a.id && @b.age && @a.id == @b.age".to_string()
            ))
        );
    }

    #[test]
    fn test_nested_traversals() {
        let c = build(
            Traversal::v()
                .where_traversal(Traversal::anonymous().out(&["knows"]))
                .union(vec![
                    Traversal::anonymous().out(&[]),
                    Traversal::anonymous().in_(&[]),
                ]),
        );
        assert_eq!(kinds(&c), vec![OpKind::Scan, OpKind::Apply, OpKind::Union]);
        match c.get(1).unwrap().get_arg(ArgSlot::SubCollection) {
            Some(ArgValue::Collection(sub)) => assert_eq!(kinds(&sub), vec![OpKind::Expand]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            c.get(1).unwrap().get_arg(ArgSlot::JoinKind),
            Some(ArgValue::JoinKind(JoinKind::Semi))
        );
        match c.get(2).unwrap().get_arg(ArgSlot::SubCollections) {
            Some(ArgValue::Collections(branches)) => assert_eq!(branches.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }
}
