// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Compilation tracing
//!
//! Records how long each compilation phase took and how many operators it
//! produced, for `explain`-style output and debugging.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Phases of one traversal compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompilePhase {
    /// Traversal steps to logical operators
    BuildOperators,
    /// Logical operators appended to the plan accumulator
    AssemblePlan,
    /// Physical plan built and framed
    SerializePhysical,
}

impl fmt::Display for CompilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilePhase::BuildOperators => write!(f, "Build operators"),
            CompilePhase::AssemblePlan => write!(f, "Assemble plan"),
            CompilePhase::SerializePhysical => write!(f, "Serialize physical plan"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    pub phase: CompilePhase,
    pub description: String,
    pub duration: Duration,
    /// Operators (or nodes, for later phases) the phase produced
    pub operator_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanTrace {
    pub steps: Vec<TraceStep>,
    pub total_duration: Duration,
    /// Size of the physical buffer, zero when compilation stopped early
    pub physical_bytes: usize,
}

/// Builder for a `PlanTrace`
pub struct PlanTracer {
    steps: Vec<TraceStep>,
    start_time: Instant,
    current_step_start: Option<Instant>,
}

impl Default for PlanTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanTracer {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            start_time: Instant::now(),
            current_step_start: None,
        }
    }

    pub fn start_step(&mut self) {
        self.current_step_start = Some(Instant::now());
    }

    /// End the current step and record it
    pub fn end_step(&mut self, phase: CompilePhase, description: String, operator_count: usize) {
        let duration = self
            .current_step_start
            .map(|start| start.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));

        log::debug!(
            "{} finished in {:.3}ms: {}",
            phase,
            duration.as_secs_f64() * 1000.0,
            description
        );
        self.steps.push(TraceStep {
            phase,
            description,
            duration,
            operator_count,
        });
        self.current_step_start = None;
    }

    pub fn finalize(self, physical_bytes: usize) -> PlanTrace {
        PlanTrace {
            steps: self.steps,
            total_duration: self.start_time.elapsed(),
            physical_bytes,
        }
    }
}

impl PlanTrace {
    pub fn step(&self, phase: CompilePhase) -> Option<&TraceStep> {
        self.steps.iter().find(|s| s.phase == phase)
    }

    /// Human-readable summary of the compilation
    pub fn format_trace(&self) -> String {
        let mut output = String::new();

        output.push_str("Compilation Summary\n");
        output.push_str(&"=".repeat(50));
        output.push('\n');
        output.push_str(&format!(
            "Physical Plan: {} bytes | Compile Time: {:.1}ms\n",
            self.physical_bytes,
            self.total_duration.as_secs_f64() * 1000.0
        ));

        if !self.steps.is_empty() {
            output.push_str("\nPhases\n");
            output.push_str(&"-".repeat(30));
            output.push('\n');
            for (i, step) in self.steps.iter().enumerate() {
                output.push_str(&format!(
                    "{}. {}: {} [{} operators] ({:.1}ms)\n",
                    i + 1,
                    step.phase,
                    step.description,
                    step.operator_count,
                    step.duration.as_secs_f64() * 1000.0
                ));
            }
        }

        output
    }
}
