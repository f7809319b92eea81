// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! gremlin-ir - Gremlin traversal to IR plan compiler
//!
//! Compiles a parsed Gremlin traversal into the logical plan of a dataflow
//! graph engine and serializes it into the physical plan buffer the
//! distributed runtime executes.
//!
//! # Pipeline
//!
//! - **Operator building**: `OperatorCollectionBuilder` turns traversal steps
//!   into logical operators, fusing `has` filters into the initial scan
//! - **Plan assembly**: `IrPlan` appends the operators to a plan accumulator,
//!   wiring apply sub-plans and union branches and adding alias nodes
//! - **Serialization**: the accumulator checks the plan and produces a framed
//!   physical buffer for the configured workers and servers
//!
//! # Usage
//!
//! ```rust,ignore
//! use gremlin_ir::{EngineConfig, QueryCompiler, Traversal};
//!
//! let compiler = QueryCompiler::new(EngineConfig::single_node());
//! let traversal = Traversal::v().has_label(&["person"]).out(&["knows"]).range(0, 10);
//! let compiled = compiler.compile(&traversal)?;
//! println!("{}", compiled.trace.format_trace());
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod expr;
pub mod job;
pub mod plan;
pub mod schema;
pub mod traversal;

pub use compiler::{AccumulatorFactory, CompiledPlan, QueryCompiler};
pub use config::EngineConfig;
pub use error::{IrError, IrResult, ResultCode};
pub use job::{JobConfig, JobRequest, JobSubmitter};
pub use plan::{
    IrPlan, LogicalOperator, LogicalPlan, OpKind, OperatorCollection, OperatorCollectionBuilder,
    PhysicalPlan, PlanAccumulator,
};
pub use traversal::Traversal;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
