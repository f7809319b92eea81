// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
// Engine deployment configuration

use crate::error::{IrError, IrResult};
use serde::{Deserialize, Serialize};

/// Deployment topology and job parameters handed to the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Server addresses, one per server
    pub hosts: Vec<String>,

    /// Workers per server
    pub worker_num: u32,

    /// Records per batch between operators
    pub batch_size: u32,

    /// Memory limit per job in bytes
    pub memory_limit: u64,

    /// Batches buffered per output channel
    pub output_capacity: u32,

    /// Job time limit in milliseconds
    pub timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["localhost:1234".to_string()],
            worker_num: 1,
            batch_size: 1024,
            memory_limit: u32::MAX as u64,
            output_capacity: 16,
            timeout_ms: 240_000,
        }
    }
}

impl EngineConfig {
    /// One server with one worker
    pub fn single_node() -> Self {
        Self::default()
    }

    pub fn cluster(hosts: Vec<String>, worker_num: u32) -> Self {
        Self {
            hosts,
            worker_num,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> IrResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn server_count(&self) -> u32 {
        self.hosts.len() as u32
    }

    /// Check that the deployment can run a job
    pub fn validate(&self) -> IrResult<()> {
        if self.hosts.is_empty() {
            return Err(IrError::illegal_argument(
                "EngineConfig",
                "hosts",
                "at least one host is required",
            ));
        }
        if self.worker_num == 0 {
            return Err(IrError::illegal_argument(
                "EngineConfig",
                "worker_num",
                "must be positive",
            ));
        }
        Ok(())
    }
}
