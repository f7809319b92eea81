// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query compiler - entry point from traversal to physical plan
//!
//! `QueryCompiler` runs the whole pipeline for a traversal: operator
//! building, plan assembly and physical serialization. Each compilation gets
//! its own accumulator from the compiler's factory and releases it before
//! returning, whether compilation succeeded or not.

use crate::config::EngineConfig;
use crate::error::IrResult;
use crate::job::{next_job_id, JobConfig, JobRequest, JobSubmitter};
use crate::plan::builder::OperatorCollectionBuilder;
use crate::plan::collection::OperatorCollection;
use crate::plan::ir_plan::IrPlan;
use crate::plan::logical::{LogicalPlan, PlanAccumulator};
use crate::plan::trace::{CompilePhase, PlanTrace, PlanTracer};
use crate::traversal::Traversal;
use rayon::prelude::*;
use std::sync::Arc;

/// Creates a fresh accumulator for every compilation
pub type AccumulatorFactory = Arc<dyn Fn() -> Box<dyn PlanAccumulator> + Send + Sync>;

/// Physical plan bytes and how they were produced
#[derive(Debug, Clone)]
pub struct CompiledPlan {
    pub bytes: Vec<u8>,
    pub trace: PlanTrace,
}

pub struct QueryCompiler {
    config: EngineConfig,
    factory: AccumulatorFactory,
}

impl QueryCompiler {
    /// Compiler backed by the in-process `LogicalPlan` accumulator
    pub fn new(config: EngineConfig) -> Self {
        let factory: AccumulatorFactory =
            Arc::new(|| -> Box<dyn PlanAccumulator> { Box::new(LogicalPlan::new()) });
        Self::with_accumulator_factory(config, factory)
    }

    pub fn with_accumulator_factory(config: EngineConfig, factory: AccumulatorFactory) -> Self {
        Self { config, factory }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn build_operators(&self, traversal: &Traversal) -> IrResult<OperatorCollection> {
        OperatorCollectionBuilder::new(traversal).build()
    }

    /// Build and append; returns the plan and the number of nodes it holds.
    fn assemble(&self, traversal: &Traversal, tracer: &mut PlanTracer) -> IrResult<(IrPlan, usize)> {
        tracer.start_step();
        let collection = self.build_operators(traversal)?;
        tracer.end_step(
            CompilePhase::BuildOperators,
            format!("{} steps", traversal.steps.len()),
            collection.len(),
        );

        tracer.start_step();
        let mut plan = IrPlan::with_accumulator((self.factory)());
        let (_, last) = plan.append_collection(-1, collection)?;
        let node_count = (last + 1).max(0) as usize;
        tracer.end_step(
            CompilePhase::AssemblePlan,
            "appended to accumulator".to_string(),
            node_count,
        );
        Ok((plan, node_count))
    }

    /// Compile a traversal into a physical plan buffer
    pub fn compile(&self, traversal: &Traversal) -> IrResult<CompiledPlan> {
        let mut tracer = PlanTracer::new();
        let (mut plan, node_count) = self.assemble(traversal, &mut tracer)?;

        tracer.start_step();
        let result = plan.to_physical_bytes(self.config.worker_num, self.config.server_count());
        plan.close();
        let bytes = result?;
        tracer.end_step(
            CompilePhase::SerializePhysical,
            format!(
                "{} workers on {} servers",
                self.config.worker_num,
                self.config.server_count()
            ),
            node_count,
        );

        log::info!(
            "Compiled traversal of {} steps into {} nodes ({} bytes)",
            traversal.steps.len(),
            node_count,
            bytes.len()
        );
        let trace = tracer.finalize(bytes.len());
        Ok(CompiledPlan { bytes, trace })
    }

    /// The assembled plan as pretty-printed JSON, without serializing it
    pub fn explain(&self, traversal: &Traversal) -> IrResult<String> {
        let mut tracer = PlanTracer::new();
        let (mut plan, _) = self.assemble(traversal, &mut tracer)?;
        let json = plan.plan_as_json();
        plan.close();
        json
    }

    /// Compile independent traversals in parallel; results keep input order
    pub fn compile_batch(&self, traversals: &[Traversal]) -> Vec<IrResult<CompiledPlan>> {
        traversals.par_iter().map(|t| self.compile(t)).collect()
    }

    /// Wrap a compiled plan into a request under a fresh job id
    pub fn job_request(&self, compiled: CompiledPlan) -> JobRequest {
        let conf = JobConfig::new(next_job_id(), &self.config);
        JobRequest {
            plan: compiled.bytes,
            conf,
        }
    }

    /// Compile, then hand the job to `submitter`; returns the job id
    pub async fn compile_and_submit(
        &self,
        traversal: &Traversal,
        submitter: &dyn JobSubmitter,
    ) -> IrResult<u64> {
        let compiled = self.compile(traversal)?;
        let request = self.job_request(compiled);
        let job_id = request.conf.job_id;
        log::info!("Submitting job {}", request.conf.job_name);
        submitter.submit(request).await?;
        Ok(job_id)
    }
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
