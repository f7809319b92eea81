// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Logical operators, plan assembly and the physical plan
//!
//! A traversal is turned into an `OperatorCollection` by the builder, the
//! collection is appended to an `IrPlan`, and the plan is serialized into a
//! framed physical buffer for the runtime.

pub mod builder;
pub mod collection;
pub mod ir_plan;
pub mod logical;
pub mod operator;
pub mod physical;
pub mod trace;
pub mod transform;
pub mod types;

pub use builder::OperatorCollectionBuilder;
pub use collection::OperatorCollection;
pub use ir_plan::{IrPlan, PlanState};
pub use logical::{LogicalPlan, PlanAccumulator, PlanOpr};
pub use operator::{ArgSlot, ArgValue, LogicalOperator, OpArgs, OpKind};
pub use physical::{JobBuffer, PhysicalPlan, PLAN_MAGIC};
pub use trace::{CompilePhase, PlanTrace, PlanTracer};
