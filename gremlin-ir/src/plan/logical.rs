// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Plan accumulator
//!
//! The accumulator owns the growing plan DAG. `IrPlan` talks to it only
//! through the `PlanAccumulator` trait: append an operator under parent ids
//! (or as a detached sub-plan root) and receive the new node id, export the
//! plan as JSON, build the physical buffer, and release. `LogicalPlan` is the
//! in-process implementation; it also tracks which tags each node can see.
//!
//! Node ids are dense and assigned in append order, so the id of a node is
//! also its petgraph index.

use crate::error::ResultCode;
use crate::expr::referenced_variables;
use crate::plan::physical::{JobBuffer, PhysicalPlan};
use crate::plan::types::{
    AggOpt, ConstValue, Direction, JoinKind, NameOrId, OrderOpt, Property, Range, ScanOpt, VOpt,
    Variable,
};
use crate::schema::{self, GraphSchema};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction as EdgeDirection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Table, column, limit and predicate parameters of scans and expansions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    pub tables: Vec<NameOrId>,
    pub columns: Vec<NameOrId>,
    pub limit: Option<Range>,
    pub predicate: Option<String>,
}

/// Primary-key lookup; the ids are OR-combined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPredicate {
    pub ids: Vec<ConstValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOpr {
    pub scan_opt: ScanOpt,
    pub alias: Option<NameOrId>,
    pub params: QueryParams,
    pub idx_predicate: Option<IndexPredicate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOpr {
    pub predicate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandBase {
    pub direction: Direction,
    pub params: QueryParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeExpandOpr {
    pub base: ExpandBase,
    pub is_edge: bool,
    pub alias: Option<NameOrId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitOpr {
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMapping {
    pub expr: String,
    pub alias: Option<NameOrId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectOpr {
    pub mappings: Vec<ProjectMapping>,
    pub is_append: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderingPair {
    pub key: Variable,
    pub order: OrderOpt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByOpr {
    pub pairs: Vec<OrderingPair>,
    pub limit: Option<Range>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMapping {
    pub key: Variable,
    pub alias: NameOrId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggFunction {
    pub vars: Vec<Variable>,
    pub aggregate: AggOpt,
    pub alias: NameOrId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupByOpr {
    pub mappings: Vec<KeyMapping>,
    pub functions: Vec<AggFunction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupOpr {
    pub keys: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkOpr {
    pub tags: Vec<NameOrId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathExpandOpr {
    pub base: ExpandBase,
    pub hop_range: Range,
    pub is_whole_path: bool,
    pub alias: Option<NameOrId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetVOpr {
    pub opt: VOpt,
    pub alias: Option<NameOrId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyOpr {
    pub join_kind: JoinKind,
    pub sub_root_id: i32,
    pub alias: Option<NameOrId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionOpr {
    pub parents: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsOpr {
    pub alias: NameOrId,
}

/// Operator as held by the accumulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanOpr {
    Scan(ScanOpr),
    Select(SelectOpr),
    Edge(EdgeExpandOpr),
    Limit(LimitOpr),
    Project(ProjectOpr),
    OrderBy(OrderByOpr),
    GroupBy(GroupByOpr),
    Dedup(DedupOpr),
    Sink(SinkOpr),
    Path(PathExpandOpr),
    Vertex(GetVOpr),
    Apply(ApplyOpr),
    Union(UnionOpr),
    As(AsOpr),
}

impl PlanOpr {
    pub fn name(&self) -> &'static str {
        match self {
            PlanOpr::Scan(_) => "scan",
            PlanOpr::Select(_) => "select",
            PlanOpr::Edge(_) => "edge",
            PlanOpr::Limit(_) => "limit",
            PlanOpr::Project(_) => "project",
            PlanOpr::OrderBy(_) => "order_by",
            PlanOpr::GroupBy(_) => "group_by",
            PlanOpr::Dedup(_) => "dedup",
            PlanOpr::Sink(_) => "sink",
            PlanOpr::Path(_) => "path",
            PlanOpr::Vertex(_) => "vertex",
            PlanOpr::Apply(_) => "apply",
            PlanOpr::Union(_) => "union",
            PlanOpr::As(_) => "as",
        }
    }

    /// Tags this operator binds for downstream references
    pub fn bound_tags(&self) -> Vec<&NameOrId> {
        match self {
            PlanOpr::Scan(o) => o.alias.iter().collect(),
            PlanOpr::Edge(o) => o.alias.iter().collect(),
            PlanOpr::Path(o) => o.alias.iter().collect(),
            PlanOpr::Vertex(o) => o.alias.iter().collect(),
            PlanOpr::Apply(o) => o.alias.iter().collect(),
            PlanOpr::As(o) => vec![&o.alias],
            PlanOpr::Project(o) => o.mappings.iter().filter_map(|m| m.alias.as_ref()).collect(),
            PlanOpr::GroupBy(o) => o
                .mappings
                .iter()
                .map(|m| &m.alias)
                .chain(o.functions.iter().map(|f| &f.alias))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Variables this operator reads
    fn referenced_variables(&self) -> Result<Vec<Variable>, ResultCode> {
        let parse = |expr: &str| {
            referenced_variables(expr).map_err(|_| ResultCode::ParseExprError)
        };
        let mut vars = Vec::new();
        match self {
            PlanOpr::Scan(o) => {
                if let Some(p) = &o.params.predicate {
                    vars.extend(parse(p)?);
                }
            }
            PlanOpr::Edge(EdgeExpandOpr { base, .. }) | PlanOpr::Path(PathExpandOpr { base, .. }) => {
                if let Some(p) = &base.params.predicate {
                    vars.extend(parse(p)?);
                }
            }
            PlanOpr::Select(o) => vars.extend(parse(&o.predicate)?),
            PlanOpr::Project(o) => {
                for mapping in &o.mappings {
                    vars.extend(parse(&mapping.expr)?);
                }
            }
            PlanOpr::OrderBy(o) => vars.extend(o.pairs.iter().map(|p| p.key.clone())),
            PlanOpr::GroupBy(o) => {
                vars.extend(o.mappings.iter().map(|m| m.key.clone()));
                vars.extend(o.functions.iter().flat_map(|f| f.vars.iter().cloned()));
            }
            PlanOpr::Dedup(o) => vars.extend(o.keys.iter().cloned()),
            PlanOpr::Sink(o) => vars.extend(o.tags.iter().cloned().map(Variable::tag)),
            _ => {}
        }
        Ok(vars)
    }

    /// Operators that need their input partitioned by the current element
    pub fn requires_shuffle(&self) -> bool {
        matches!(
            self,
            PlanOpr::Edge(_)
                | PlanOpr::Path(_)
                | PlanOpr::Vertex(_)
                | PlanOpr::Dedup(_)
                | PlanOpr::GroupBy(_)
        )
    }
}

/// Interface between the plan assembler and whatever accumulates the plan
pub trait PlanAccumulator: Send {
    /// Append `opr` under `parents` and return the new node id.
    ///
    /// An empty parent list or `[-1]` appends a detached root.
    fn append_operator(&mut self, opr: PlanOpr, parents: &[i32]) -> Result<i32, ResultCode>;

    /// Pretty-printed JSON dump of the accumulated plan
    fn plan_json(&self) -> Result<String, ResultCode>;

    /// Append `opr` as a detached sub-plan root. It may reference the tags
    /// visible at node `scope`; `-1` means it sees none.
    fn append_detached(&mut self, opr: PlanOpr, scope: i32) -> Result<i32, ResultCode> {
        let _ = scope;
        self.append_operator(opr, &[-1])
    }

    /// Build the physical buffer; an empty buffer signals failure
    fn build_physical_plan(&self, workers: u32, servers: u32) -> JobBuffer;

    /// Free the accumulated plan. Later calls fail with `PlanReleasedError`.
    fn release(&mut self);
}

#[derive(Serialize)]
struct PlanNodeJson<'a> {
    id: i32,
    opr: &'a PlanOpr,
    children: Vec<i32>,
}

#[derive(Serialize)]
struct PlanJson<'a> {
    nodes: Vec<PlanNodeJson<'a>>,
}

/// In-process plan accumulator backed by a petgraph DAG
#[derive(Debug, Clone)]
pub struct LogicalPlan {
    graph: DiGraph<PlanOpr, ()>,
    /// Bound tag name to the node that bound it
    tags: BTreeMap<NameOrId, i32>,
    /// Tags visible at each node, indexed by node id
    scopes: Vec<BTreeSet<NameOrId>>,
    schema: Option<Arc<GraphSchema>>,
    released: bool,
}

impl Default for LogicalPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl LogicalPlan {
    /// Empty plan validated against the process-wide schema, if one is set
    pub fn new() -> Self {
        Self::with_schema(schema::graph_schema())
    }

    pub fn with_schema(schema: Option<Arc<GraphSchema>>) -> Self {
        Self {
            graph: DiGraph::new(),
            tags: BTreeMap::new(),
            scopes: Vec::new(),
            schema,
            released: false,
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn node(&self, id: i32) -> Option<&PlanOpr> {
        if id < 0 {
            return None;
        }
        self.graph.node_weight(NodeIndex::new(id as usize))
    }

    fn neighbors(&self, id: i32, direction: EdgeDirection) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .graph
            .neighbors_directed(NodeIndex::new(id as usize), direction)
            .map(|n| n.index() as i32)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Children of `id` in ascending order
    pub fn children(&self, id: i32) -> Vec<i32> {
        self.neighbors(id, EdgeDirection::Outgoing)
    }

    pub fn parents(&self, id: i32) -> Vec<i32> {
        self.neighbors(id, EdgeDirection::Incoming)
    }

    pub(crate) fn graph(&self) -> &DiGraph<PlanOpr, ()> {
        &self.graph
    }

    pub fn tag_node(&self, tag: &NameOrId) -> Option<i32> {
        self.tags.get(tag).copied()
    }

    fn resolve_parents(&self, parents: &[i32]) -> Result<Vec<NodeIndex>, ResultCode> {
        // The first node is always a root.
        if self.is_empty() || parents == [-1] {
            return Ok(Vec::new());
        }
        let mut resolved = Vec::with_capacity(parents.len());
        for &parent in parents {
            if parent < 0 {
                return Err(ResultCode::NegativeIndexError);
            }
            if parent as usize >= self.len() {
                return Err(ResultCode::ParentNotFoundError);
            }
            resolved.push(NodeIndex::new(parent as usize));
        }
        Ok(resolved)
    }

    fn validate_schema(&self, opr: &PlanOpr) -> Result<(), ResultCode> {
        let Some(schema) = &self.schema else {
            return Ok(());
        };
        let (tables, is_vertex) = match opr {
            PlanOpr::Scan(o) => (o.params.tables.as_slice(), o.scan_opt == ScanOpt::Vertex),
            PlanOpr::Edge(o) => (o.base.params.tables.as_slice(), false),
            PlanOpr::Path(o) => (o.base.params.tables.as_slice(), false),
            _ => (&[] as &[NameOrId], false),
        };
        for table in tables {
            let known = if is_vertex {
                schema.has_vertex_label(table)
            } else {
                schema.has_edge_label(table)
            };
            if !known {
                log::warn!("Label {} is not defined in the graph schema", table);
                return Err(ResultCode::TableNotExistError);
            }
        }
        for var in opr.referenced_variables()? {
            if let Some(Property::Key(key)) = &var.property {
                if !schema.has_property(key) {
                    log::warn!("Property {} is not defined in the graph schema", key);
                    return Err(ResultCode::ColumnNotExistError);
                }
            }
        }
        Ok(())
    }

    /// Tags an operator appended under `parents` may reference.
    ///
    /// A chained node sees what its parent sees. A node with several parents
    /// (a union) sees only the tags visible in every parent.
    fn visible_tags(&self, parents: &[NodeIndex]) -> BTreeSet<NameOrId> {
        let mut scopes = parents.iter().filter_map(|p| self.scopes.get(p.index()));
        match scopes.next() {
            Some(first) => scopes.fold(first.clone(), |acc, scope| {
                acc.intersection(scope).cloned().collect()
            }),
            None => BTreeSet::new(),
        }
    }

    fn insert_node(
        &mut self,
        opr: PlanOpr,
        parents: Vec<NodeIndex>,
        mut visible: BTreeSet<NameOrId>,
    ) -> Result<i32, ResultCode> {
        self.validate_schema(&opr)?;
        self.validate_tags(&opr, &visible)?;

        let bound: Vec<NameOrId> = opr.bound_tags().into_iter().cloned().collect();
        let node = self.graph.add_node(opr);
        for parent in parents {
            self.graph.add_edge(parent, node, ());
        }
        let id = node.index() as i32;
        for tag in bound {
            visible.insert(tag.clone());
            self.tags.insert(tag, id);
        }
        self.scopes.push(visible);
        Ok(id)
    }

    fn validate_tags(
        &self,
        opr: &PlanOpr,
        visible: &BTreeSet<NameOrId>,
    ) -> Result<(), ResultCode> {
        for var in opr.referenced_variables()? {
            if let Some(tag) = &var.tag {
                if !visible.contains(tag) {
                    log::warn!("Tag {} is referenced before it is bound", tag);
                    return Err(ResultCode::TagNotExistError);
                }
            }
        }
        Ok(())
    }
}

impl PlanAccumulator for LogicalPlan {
    fn append_operator(&mut self, opr: PlanOpr, parents: &[i32]) -> Result<i32, ResultCode> {
        if self.released {
            return Err(ResultCode::PlanReleasedError);
        }
        let parent_nodes = self.resolve_parents(parents)?;
        let visible = self.visible_tags(&parent_nodes);
        self.insert_node(opr, parent_nodes, visible)
    }

    fn append_detached(&mut self, opr: PlanOpr, scope: i32) -> Result<i32, ResultCode> {
        if self.released {
            return Err(ResultCode::PlanReleasedError);
        }
        let visible = if scope < 0 {
            BTreeSet::new()
        } else {
            self.scopes
                .get(scope as usize)
                .cloned()
                .ok_or(ResultCode::ParentNotFoundError)?
        };
        self.insert_node(opr, Vec::new(), visible)
    }

    fn plan_json(&self) -> Result<String, ResultCode> {
        if self.released {
            return Err(ResultCode::PlanReleasedError);
        }
        let nodes = self
            .graph
            .node_indices()
            .map(|idx| {
                let id = idx.index() as i32;
                PlanNodeJson {
                    id,
                    opr: &self.graph[idx],
                    children: self.children(id),
                }
            })
            .collect();
        serde_json::to_string_pretty(&PlanJson { nodes }).map_err(|e| {
            log::error!("Failed to export plan as JSON: {}", e);
            ResultCode::BuildJobError
        })
    }

    fn build_physical_plan(&self, workers: u32, servers: u32) -> JobBuffer {
        if self.released {
            log::error!("Cannot build a physical plan from a released plan");
            return JobBuffer::empty();
        }
        match PhysicalPlan::from_logical(self, workers, servers).and_then(|p| p.encode()) {
            Ok(buffer) => buffer,
            Err(reason) => {
                log::error!("Failed to build physical plan: {}", reason);
                JobBuffer::empty()
            }
        }
    }

    fn release(&mut self) {
        self.graph.clear();
        self.tags.clear();
        self.scopes.clear();
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(alias: Option<&str>) -> PlanOpr {
        PlanOpr::Scan(ScanOpr {
            scan_opt: ScanOpt::Vertex,
            alias: alias.map(NameOrId::name),
            params: QueryParams::default(),
            idx_predicate: None,
        })
    }

    fn select(predicate: &str) -> PlanOpr {
        PlanOpr::Select(SelectOpr {
            predicate: predicate.to_string(),
        })
    }

    #[test]
    fn test_ids_are_assigned_in_append_order() {
        let mut plan = LogicalPlan::with_schema(None);
        assert_eq!(plan.append_operator(scan(None), &[-1]), Ok(0));
        assert_eq!(plan.append_operator(select("@.age > 1"), &[0]), Ok(1));
        assert_eq!(plan.append_operator(select("@.age < 9"), &[1]), Ok(2));
        assert_eq!(plan.children(0), vec![1]);
        assert_eq!(plan.parents(2), vec![1]);
    }

    #[test]
    fn test_first_node_ignores_parents() {
        let mut plan = LogicalPlan::with_schema(None);
        assert_eq!(plan.append_operator(scan(None), &[7]), Ok(0));
        assert!(plan.parents(0).is_empty());
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let mut plan = LogicalPlan::with_schema(None);
        plan.append_operator(scan(None), &[-1]).unwrap();
        assert_eq!(
            plan.append_operator(select("@.age > 1"), &[3]),
            Err(ResultCode::ParentNotFoundError)
        );
        assert_eq!(
            plan.append_operator(select("@.age > 1"), &[-4]),
            Err(ResultCode::NegativeIndexError)
        );
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_detached_root() {
        let mut plan = LogicalPlan::with_schema(None);
        plan.append_operator(scan(None), &[-1]).unwrap();
        let id = plan.append_operator(scan(None), &[-1]).unwrap();
        assert_eq!(id, 1);
        assert!(plan.parents(1).is_empty());
        assert!(plan.children(0).is_empty());
    }

    #[test]
    fn test_unbound_tag_is_rejected() {
        let mut plan = LogicalPlan::with_schema(None);
        plan.append_operator(scan(Some("a")), &[-1]).unwrap();
        assert_eq!(plan.tag_node(&NameOrId::name("a")), Some(0));
        assert!(plan.append_operator(select("@a.age > 1"), &[0]).is_ok());
        assert_eq!(
            plan.append_operator(select("@b.age > 1"), &[1]),
            Err(ResultCode::TagNotExistError)
        );
    }

    #[test]
    fn test_tag_scopes_follow_parents() {
        let mut plan = LogicalPlan::with_schema(None);
        plan.append_operator(scan(Some("a")), &[-1]).unwrap();
        let tag_y = PlanOpr::As(AsOpr {
            alias: NameOrId::name("y"),
        });
        assert_eq!(plan.append_operator(tag_y, &[0]), Ok(1));
        assert_eq!(plan.append_operator(select("@.age > 1"), &[0]), Ok(2));

        // Visible in one parent only
        assert_eq!(
            plan.append_operator(select("@y.age > 1"), &[1, 2]),
            Err(ResultCode::TagNotExistError)
        );
        assert!(plan.append_operator(select("@a.age > 1"), &[1, 2]).is_ok());
        // A sibling chain does not see `y`
        assert_eq!(
            plan.append_operator(select("@y.age > 1"), &[2]),
            Err(ResultCode::TagNotExistError)
        );
    }

    #[test]
    fn test_detached_root_sees_enclosing_scope() {
        let mut plan = LogicalPlan::with_schema(None);
        plan.append_operator(scan(Some("a")), &[-1]).unwrap();
        assert_eq!(plan.append_detached(select("@a.age > 1"), 0), Ok(1));
        assert!(plan.parents(1).is_empty());
        assert_eq!(
            plan.append_detached(select("@a.age > 1"), -1),
            Err(ResultCode::TagNotExistError)
        );
        assert_eq!(
            plan.append_detached(select("@.age > 1"), 9),
            Err(ResultCode::ParentNotFoundError)
        );
    }

    #[test]
    fn test_release_blocks_further_use() {
        let mut plan = LogicalPlan::with_schema(None);
        plan.append_operator(scan(None), &[-1]).unwrap();
        plan.release();
        assert!(plan.is_released());
        assert!(plan.is_empty());
        assert_eq!(
            plan.append_operator(scan(None), &[-1]),
            Err(ResultCode::PlanReleasedError)
        );
        assert!(plan.build_physical_plan(1, 1).is_empty());
    }

    #[test]
    fn test_schema_validation() {
        let schema = GraphSchema::from_json(
            r#"{"vertex_labels": [{"id": 0, "name": "person", "properties": [{"id": 0, "name": "age"}]}]}"#,
        )
        .unwrap();
        let mut plan = LogicalPlan::with_schema(Some(Arc::new(schema)));

        let mut person = scan(None);
        if let PlanOpr::Scan(o) = &mut person {
            o.params.tables = vec![NameOrId::name("software")];
        }
        assert_eq!(
            plan.append_operator(person, &[-1]),
            Err(ResultCode::TableNotExistError)
        );

        plan.append_operator(scan(None), &[-1]).unwrap();
        assert!(plan.append_operator(select("@.age > 1"), &[0]).is_ok());
        assert_eq!(
            plan.append_operator(select("@.weight > 1"), &[1]),
            Err(ResultCode::ColumnNotExistError)
        );
    }

    #[test]
    fn test_plan_json_lists_children() {
        let mut plan = LogicalPlan::with_schema(None);
        plan.append_operator(scan(None), &[-1]).unwrap();
        plan.append_operator(select("@.age > 1"), &[0]).unwrap();
        let json: serde_json::Value = serde_json::from_str(&plan.plan_json().unwrap()).unwrap();
        assert_eq!(json["nodes"][0]["children"], serde_json::json!([1]));
        assert_eq!(
            json["nodes"][1]["opr"]["select"]["predicate"],
            serde_json::json!("@.age > 1")
        );
    }
}
