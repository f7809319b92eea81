//! Test utilities for gremlin-ir integration tests
//!
//! - `init_logging`: route `log` output through env_logger once per binary
//! - `load_fixture`: read a JSON golden file from `tests/fixtures`
//! - `RecordingAccumulator`: wraps `LogicalPlan`, records every append,
//!   counts releases and can fail a chosen append
//! - `RecordingSubmitter`: keeps submitted job requests in memory

#![allow(dead_code)]

use async_trait::async_trait;
use gremlin_ir::plan::{JobBuffer, LogicalPlan, PlanAccumulator, PlanOpr};
use gremlin_ir::{IrError, IrResult, JobRequest, JobSubmitter, ResultCode};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn load_fixture(name: &str) -> serde_json::Value {
    let text = std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", name, e));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("Invalid fixture {}: {}", name, e))
}

/// One `append_operator` call as seen by the accumulator
#[derive(Debug, Clone, PartialEq)]
pub struct AppendRecord {
    pub opr: String,
    pub parents: Vec<i32>,
    pub result: Result<i32, ResultCode>,
}

/// Shared view on what a `RecordingAccumulator` saw
#[derive(Debug, Clone, Default)]
pub struct AppendLog {
    pub appends: Arc<Mutex<Vec<AppendRecord>>>,
    pub releases: Arc<AtomicUsize>,
}

impl AppendLog {
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn appends(&self) -> Vec<AppendRecord> {
        self.appends.lock().clone()
    }
}

pub struct RecordingAccumulator {
    inner: LogicalPlan,
    seen: AppendLog,
    /// Zero-based index of the append to fail, and the code to fail with
    fail_at: Option<(usize, ResultCode)>,
    calls: usize,
}

impl RecordingAccumulator {
    pub fn new(seen: AppendLog) -> Self {
        Self {
            inner: LogicalPlan::with_schema(None),
            seen,
            fail_at: None,
            calls: 0,
        }
    }

    pub fn failing_at(seen: AppendLog, index: usize, code: ResultCode) -> Self {
        Self {
            fail_at: Some((index, code)),
            ..Self::new(seen)
        }
    }

    fn record(
        &mut self,
        opr: PlanOpr,
        parents: &[i32],
        append: impl FnOnce(&mut LogicalPlan, PlanOpr) -> Result<i32, ResultCode>,
    ) -> Result<i32, ResultCode> {
        let name = opr.name().to_string();
        let result = match self.fail_at {
            Some((index, code)) if index == self.calls => Err(code),
            _ => append(&mut self.inner, opr),
        };
        self.calls += 1;
        self.seen.appends.lock().push(AppendRecord {
            opr: name,
            parents: parents.to_vec(),
            result,
        });
        result
    }
}

impl PlanAccumulator for RecordingAccumulator {
    fn append_operator(&mut self, opr: PlanOpr, parents: &[i32]) -> Result<i32, ResultCode> {
        self.record(opr, parents, |inner, opr| inner.append_operator(opr, parents))
    }

    fn append_detached(&mut self, opr: PlanOpr, scope: i32) -> Result<i32, ResultCode> {
        self.record(opr, &[-1], |inner, opr| inner.append_detached(opr, scope))
    }

    fn plan_json(&self) -> Result<String, ResultCode> {
        self.inner.plan_json()
    }

    fn build_physical_plan(&self, workers: u32, servers: u32) -> JobBuffer {
        self.inner.build_physical_plan(workers, servers)
    }

    fn release(&mut self) {
        self.seen.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release();
    }
}

/// Submitter that keeps requests instead of sending them
#[derive(Default)]
pub struct RecordingSubmitter {
    pub requests: Mutex<Vec<JobRequest>>,
    pub reject: bool,
}

impl RecordingSubmitter {
    pub fn rejecting() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn submitted(&self) -> Vec<JobRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl JobSubmitter for RecordingSubmitter {
    async fn submit(&self, request: JobRequest) -> IrResult<()> {
        if self.reject {
            return Err(IrError::Submission(format!(
                "runtime refused {}",
                request.conf.job_name
            )));
        }
        self.requests.lock().push(request);
        Ok(())
    }
}
