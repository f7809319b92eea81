// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Runtime hand-off
//!
//! A compiled physical plan is wrapped in a `JobRequest` together with the
//! job configuration derived from the `EngineConfig`, and handed to a
//! `JobSubmitter`. Job ids are process-wide and strictly increasing.

use crate::config::EngineConfig;
use crate::error::IrResult;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static JOB_IDS: Lazy<JobIdGenerator> = Lazy::new(JobIdGenerator::new);

/// Hands out job ids starting at 1
#[derive(Debug)]
pub struct JobIdGenerator {
    counter: AtomicU64,
}

impl Default for JobIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl JobIdGenerator {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Next id from the process-wide generator
pub fn next_job_id() -> u64 {
    JOB_IDS.next_id()
}

pub fn job_name(job_id: u64) -> String {
    format!("ir_plan_{}", job_id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    pub job_id: u64,
    pub job_name: String,
    pub workers: u32,
    pub batch_size: u32,
    pub memory_limit: u64,
    pub output_capacity: u32,
    /// Milliseconds
    pub time_limit: u64,
    /// Indexes of the servers that run the job
    pub servers: Vec<u64>,
}

impl JobConfig {
    pub fn new(job_id: u64, config: &EngineConfig) -> Self {
        Self {
            job_id,
            job_name: job_name(job_id),
            workers: config.worker_num,
            batch_size: config.batch_size,
            memory_limit: config.memory_limit,
            output_capacity: config.output_capacity,
            time_limit: config.timeout_ms,
            servers: (0..config.server_count() as u64).collect(),
        }
    }
}

/// Physical plan buffer plus the configuration to run it with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub plan: Vec<u8>,
    pub conf: JobConfig,
}

/// Delivers job requests to the runtime
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    async fn submit(&self, request: JobRequest) -> IrResult<()>;
}
