// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Plan assembler
//!
//! `IrPlan` appends logical operators to a plan accumulator, wiring apply
//! sub-plans and union branches, and produces the physical buffer. It owns
//! the accumulator for its whole life and releases it exactly once: on
//! `close()` or, failing that, on drop. Every error path therefore releases
//! the accumulator as soon as the plan goes out of scope.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut plan = IrPlan::new();
//! let (_first, _last) = plan.append_collection(-1, collection)?;
//! let bytes = plan.to_physical_bytes(1, 1)?;
//! plan.close();
//! ```

use crate::error::{IrError, IrResult};
use crate::plan::collection::OperatorCollection;
use crate::plan::logical::{AsOpr, LogicalPlan, PlanAccumulator, PlanOpr};
use crate::plan::operator::{LogicalOperator, OpArgs};
use crate::plan::transform::{check_branch, to_plan_opr};
use std::path::Path;

/// Lifecycle of an `IrPlan`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    /// Accumulator allocated, nothing appended
    Created,
    /// At least one operator appended
    Building,
    /// Physical buffer produced. Appends are still accepted, but a buffer
    /// built earlier does not reflect them.
    Serialized,
    /// Accumulator released
    Closed,
}

pub struct IrPlan {
    accumulator: Option<Box<dyn PlanAccumulator>>,
    state: PlanState,
}

impl Default for IrPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl IrPlan {
    /// New plan backed by an in-process `LogicalPlan`
    pub fn new() -> Self {
        Self::with_accumulator(Box::new(LogicalPlan::new()))
    }

    pub fn with_accumulator(accumulator: Box<dyn PlanAccumulator>) -> Self {
        Self {
            accumulator: Some(accumulator),
            state: PlanState::Created,
        }
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    fn accumulator(&self) -> IrResult<&dyn PlanAccumulator> {
        self.accumulator.as_deref().ok_or(IrError::UseAfterClose)
    }

    fn accumulator_mut(&mut self) -> IrResult<&mut (dyn PlanAccumulator + 'static)> {
        self.accumulator.as_deref_mut().ok_or(IrError::UseAfterClose)
    }

    fn ensure_appendable(&self) -> IrResult<()> {
        match self.state {
            PlanState::Created | PlanState::Building => Ok(()),
            PlanState::Serialized => {
                log::warn!("Appending to a plan that was already serialized");
                Ok(())
            }
            PlanState::Closed => Err(IrError::UseAfterClose),
        }
    }

    /// Append one operator under `parent_id` (`-1` for none) and return the id
    /// of the last node it produced.
    ///
    /// Apply operators first append their sub-collection as a detached
    /// sub-plan; union operators first append every branch under
    /// `parent_id`. An alias on a kind that cannot carry one natively adds a
    /// trailing alias node, whose id is then returned.
    pub fn append_operator(&mut self, parent_id: i32, op: LogicalOperator) -> IrResult<i32> {
        self.append_node(parent_id, -1, op).map(|(_, last)| last)
    }

    /// Append a collection in order, chaining each operator to the previous
    /// one, and return `(first, last)` node ids.
    ///
    /// An empty collection appends nothing and returns `(parent_id, parent_id)`.
    pub fn append_collection(
        &mut self,
        parent_id: i32,
        collection: OperatorCollection,
    ) -> IrResult<(i32, i32)> {
        self.append_chain(parent_id, -1, collection)
    }

    /// `scope` is the node whose tags a detached root in this chain may use.
    fn append_chain(
        &mut self,
        parent_id: i32,
        scope: i32,
        collection: OperatorCollection,
    ) -> IrResult<(i32, i32)> {
        let mut first = None;
        let mut last = parent_id;
        for op in collection {
            let (own, tail) = self.append_node(last, scope, op)?;
            first.get_or_insert(own);
            last = tail;
        }
        Ok((first.unwrap_or(parent_id), last))
    }

    /// Returns the operator's own node id and the id of the last node
    /// appended for it.
    fn append_node(
        &mut self,
        parent_id: i32,
        scope: i32,
        mut op: LogicalOperator,
    ) -> IrResult<(i32, i32)> {
        self.ensure_appendable()?;
        check_branch(&op)?;
        let kind = op.kind();

        match op.args_mut() {
            OpArgs::Apply(args) => {
                if let Some(sub) = args.sub_collection.take() {
                    // The sub-plan sees the tags bound before the apply.
                    let sub_scope = if parent_id >= 0 { parent_id } else { scope };
                    let (sub_root, _) = self.append_chain(-1, sub_scope, sub)?;
                    args.sub_root_id = Some(sub_root);
                }
            }
            OpArgs::Union(args) => {
                if let Some(branches) = args.sub_collections.take() {
                    let mut parents = Vec::with_capacity(branches.len());
                    for branch in branches {
                        let (_, branch_last) = self.append_chain(parent_id, scope, branch)?;
                        parents.push(branch_last);
                    }
                    args.parent_ids = Some(parents);
                }
            }
            _ => {}
        }

        let opr = to_plan_opr(&op)?;
        let parents = match &opr {
            PlanOpr::Union(union) => union.parents.clone(),
            _ => vec![parent_id],
        };

        let accumulator = self.accumulator_mut()?;
        let appended = if parents.as_slice() == [-1] {
            accumulator.append_detached(opr, scope)
        } else {
            accumulator.append_operator(opr, &parents)
        };
        let id = appended.map_err(|code| IrError::AppendFailed { kind, code })?;
        log::debug!("Appended {} operator as node {} under {:?}", kind, id, parents);

        let mut last = id;
        if let Some(alias) = op.alias() {
            if !kind.embeds_alias() {
                let as_opr = PlanOpr::As(AsOpr {
                    alias: alias.name.clone(),
                });
                last = accumulator
                    .append_operator(as_opr, &[id])
                    .map_err(|code| IrError::AppendFailed { kind, code })?;
                log::debug!("Appended alias {} for node {} as node {}", alias.name, id, last);
            }
        }

        if self.state == PlanState::Created {
            self.state = PlanState::Building;
        }
        Ok((id, last))
    }

    /// Build the physical plan for `workers` per server on `servers` servers.
    ///
    /// The buffer is copied out of the accumulator. A closed plan and an empty
    /// result from the accumulator are both reported as `BuildPhysicalError`.
    pub fn to_physical_bytes(&mut self, workers: u32, servers: u32) -> IrResult<Vec<u8>> {
        let accumulator = self
            .accumulator()
            .map_err(|_| IrError::BuildPhysicalError("plan is already closed".to_string()))?;
        let buffer = accumulator.build_physical_plan(workers, servers);
        if buffer.is_empty() {
            return Err(IrError::BuildPhysicalError(format!(
                "empty physical plan for {} worker(s) on {} server(s)",
                workers, servers
            )));
        }
        self.state = PlanState::Serialized;
        log::debug!("Built physical plan of {} bytes", buffer.len());
        Ok(buffer.into_bytes())
    }

    /// The accumulated plan as pretty-printed JSON
    pub fn plan_as_json(&self) -> IrResult<String> {
        self.accumulator()?
            .plan_json()
            .map_err(|code| IrError::Serialization(format!("plan export failed with {}", code)))
    }

    pub fn write_plan_to_json(&self, path: impl AsRef<Path>) -> IrResult<()> {
        let json = self.plan_as_json()?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Release the accumulator. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(mut accumulator) = self.accumulator.take() {
            accumulator.release();
            log::debug!("Released plan accumulator");
        }
        self.state = PlanState::Closed;
    }

    pub fn is_closed(&self) -> bool {
        self.state == PlanState::Closed
    }
}

impl Drop for IrPlan {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::operator::{ArgSlot, ArgValue, OpKind};
    use crate::plan::types::{Alias, Direction, ScanOpt};

    fn scan() -> LogicalOperator {
        LogicalOperator::new(OpKind::Scan)
            .with_arg(ArgSlot::ScanOpt, ArgValue::ScanOpt(ScanOpt::Vertex))
            .unwrap()
    }

    fn limit(lower: i32, upper: i32) -> LogicalOperator {
        LogicalOperator::new(OpKind::Limit)
            .with_arg(ArgSlot::Lower, ArgValue::Int(lower))
            .unwrap()
            .with_arg(ArgSlot::Upper, ArgValue::Int(upper))
            .unwrap()
    }

    fn expand() -> LogicalOperator {
        LogicalOperator::new(OpKind::Expand)
            .with_arg(ArgSlot::Direction, ArgValue::Direction(Direction::Out))
            .unwrap()
            .with_arg(ArgSlot::IsEdge, ArgValue::Bool(false))
            .unwrap()
    }

    #[test]
    fn test_state_transitions() {
        let mut plan = IrPlan::new();
        assert_eq!(plan.state(), PlanState::Created);
        plan.append_operator(-1, scan()).unwrap();
        assert_eq!(plan.state(), PlanState::Building);
        plan.to_physical_bytes(1, 1).unwrap();
        assert_eq!(plan.state(), PlanState::Serialized);
        assert!(plan.plan_as_json().is_ok());
        assert_eq!(plan.append_operator(0, limit(0, 1)).unwrap(), 1);
        assert_eq!(plan.state(), PlanState::Serialized);
        plan.close();
        assert!(plan.is_closed());
        plan.close();
        assert!(matches!(plan.plan_as_json(), Err(IrError::UseAfterClose)));
        assert!(matches!(
            plan.to_physical_bytes(1, 1),
            Err(IrError::BuildPhysicalError(_))
        ));
        assert!(matches!(
            plan.append_operator(-1, scan()),
            Err(IrError::UseAfterClose)
        ));
    }

    #[test]
    fn test_post_alias_appends_as_node() {
        let mut plan = IrPlan::new();
        plan.append_operator(-1, scan()).unwrap();
        let last = plan
            .append_operator(0, limit(0, 5).with_alias(Alias::query_given("a")))
            .unwrap();
        assert_eq!(last, 2);

        let json: serde_json::Value = serde_json::from_str(&plan.plan_as_json().unwrap()).unwrap();
        assert_eq!(json["nodes"][2]["opr"]["as"]["alias"]["name"], "a");
        assert_eq!(json["nodes"][1]["children"], serde_json::json!([2]));
    }

    #[test]
    fn test_native_alias_has_no_as_node() {
        let mut plan = IrPlan::new();
        let id = plan
            .append_operator(-1, scan().with_alias(Alias::query_given("a")))
            .unwrap();
        assert_eq!(id, 0);
        let json: serde_json::Value = serde_json::from_str(&plan.plan_as_json().unwrap()).unwrap();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 1);
        assert_eq!(json["nodes"][0]["opr"]["scan"]["alias"]["name"], "a");
    }

    #[test]
    fn test_collection_returns_first_and_last() {
        let mut plan = IrPlan::new();
        let collection = OperatorCollection::from(vec![scan(), expand(), limit(0, 10)]);
        assert_eq!(plan.append_collection(-1, collection).unwrap(), (0, 2));
        assert_eq!(
            plan.append_collection(2, OperatorCollection::new()).unwrap(),
            (2, 2)
        );
    }

    #[test]
    fn test_empty_physical_plan_is_an_error() {
        let mut plan = IrPlan::new();
        assert!(matches!(
            plan.to_physical_bytes(1, 1),
            Err(IrError::BuildPhysicalError(_))
        ));
    }
}
