// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Physical plan and its byte encoding
//!
//! The physical plan is the accumulated DAG checked for consistency and
//! annotated for a deployment of `workers` per server on `servers` servers.
//! It travels to the runtime as a framed buffer:
//!
//! ```text
//! magic: u32 LE | payload length: u32 LE | bincode payload | crc32: u32 LE
//! ```
//!
//! The checksum covers every byte before it.

use crate::error::{IrError, IrResult};
use crate::plan::logical::{LogicalPlan, PlanOpr};
use petgraph::algo::is_cyclic_directed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Frame marker, "IRPL"
pub const PLAN_MAGIC: u32 = 0x4952_504C;

const HEADER_LEN: usize = 8;
const CHECKSUM_LEN: usize = 4;

/// Encoded physical plan. An empty buffer means the build failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobBuffer {
    bytes: Vec<u8>,
}

impl JobBuffer {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for JobBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalNode {
    pub id: i32,
    pub opr: PlanOpr,
    pub children: Vec<i32>,
    /// Repartition the input by the current element before this operator
    pub shuffle: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalPlan {
    pub workers: u32,
    pub servers: u32,
    /// Entry node of the main plan
    pub root: i32,
    /// Entry nodes of apply sub-plans
    pub sub_roots: Vec<i32>,
    pub nodes: Vec<PhysicalNode>,
}

impl PhysicalPlan {
    /// Check the accumulated plan and lay it out for execution.
    ///
    /// Errors are plain reasons; the accumulator reports them only through an
    /// empty buffer and a log line.
    pub fn from_logical(plan: &LogicalPlan, workers: u32, servers: u32) -> Result<Self, String> {
        if workers == 0 || servers == 0 {
            return Err(format!(
                "invalid deployment of {} workers on {} servers",
                workers, servers
            ));
        }
        if plan.is_empty() {
            return Err("plan has no operators".to_string());
        }
        if is_cyclic_directed(plan.graph()) {
            return Err("plan contains a cycle".to_string());
        }

        let len = plan.len() as i32;
        let mut sub_roots = BTreeSet::new();
        for id in 0..len {
            if let Some(PlanOpr::Apply(apply)) = plan.node(id) {
                let root = apply.sub_root_id;
                if root < 0 || root >= len {
                    return Err(format!(
                        "apply node {} references missing sub-plan root {}",
                        id, root
                    ));
                }
                if !plan.parents(root).is_empty() {
                    return Err(format!(
                        "sub-plan root {} of apply node {} has parents",
                        root, id
                    ));
                }
                sub_roots.insert(root);
            }
        }

        let roots: Vec<i32> = (0..len)
            .filter(|id| plan.parents(*id).is_empty() && !sub_roots.contains(id))
            .collect();
        let root = match roots.as_slice() {
            [root] => *root,
            [] => return Err("plan has no entry node".to_string()),
            _ => return Err(format!("plan has dangling roots {:?}", roots)),
        };

        let partitioned = workers.saturating_mul(servers) > 1;
        let mut nodes = Vec::with_capacity(plan.len());
        for id in 0..len {
            let opr = plan
                .node(id)
                .ok_or_else(|| format!("node {} is missing", id))?
                .clone();
            nodes.push(PhysicalNode {
                id,
                shuffle: partitioned && opr.requires_shuffle(),
                opr,
                children: plan.children(id),
            });
        }

        Ok(Self {
            workers,
            servers,
            root,
            sub_roots: sub_roots.into_iter().collect(),
            nodes,
        })
    }

    pub fn is_partitioned(&self) -> bool {
        self.workers.saturating_mul(self.servers) > 1
    }

    /// Frame the bincode payload with magic, length and checksum
    pub fn encode(&self) -> Result<JobBuffer, String> {
        let payload = bincode::serialize(self).map_err(|e| e.to_string())?;
        let payload_len = u32::try_from(payload.len())
            .map_err(|_| format!("payload of {} bytes is too large", payload.len()))?;

        let mut buffer = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
        buffer.extend_from_slice(&PLAN_MAGIC.to_le_bytes());
        buffer.extend_from_slice(&payload_len.to_le_bytes());
        buffer.extend_from_slice(&payload);

        let checksum = crc32fast::hash(&buffer);
        buffer.extend_from_slice(&checksum.to_le_bytes());

        Ok(JobBuffer::from(buffer))
    }

    /// Verify the frame and decode the plan
    pub fn decode(data: &[u8]) -> IrResult<Self> {
        if data.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(IrError::Serialization(format!(
                "physical plan buffer of {} bytes is too short",
                data.len()
            )));
        }

        let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if magic != PLAN_MAGIC {
            return Err(IrError::Serialization(format!(
                "invalid physical plan magic {:#x}",
                magic
            )));
        }

        let payload_len = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
        if data.len() != HEADER_LEN + payload_len + CHECKSUM_LEN {
            return Err(IrError::Serialization(format!(
                "physical plan length mismatch: header says {} payload bytes, buffer has {}",
                payload_len,
                data.len()
            )));
        }

        let checksum_offset = HEADER_LEN + payload_len;
        let expected_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let actual_checksum = crc32fast::hash(&data[..checksum_offset]);
        if expected_checksum != actual_checksum {
            return Err(IrError::Serialization(format!(
                "physical plan checksum mismatch: expected {:#x}, got {:#x}",
                expected_checksum, actual_checksum
            )));
        }

        Ok(bincode::deserialize(&data[HEADER_LEN..checksum_offset])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::logical::{
        ApplyOpr, EdgeExpandOpr, ExpandBase, PlanAccumulator, QueryParams, ScanOpr,
    };
    use crate::plan::types::{Direction, JoinKind, ScanOpt};

    fn scan() -> PlanOpr {
        PlanOpr::Scan(ScanOpr {
            scan_opt: ScanOpt::Vertex,
            alias: None,
            params: QueryParams::default(),
            idx_predicate: None,
        })
    }

    fn expand() -> PlanOpr {
        PlanOpr::Edge(EdgeExpandOpr {
            base: ExpandBase {
                direction: Direction::Out,
                params: QueryParams::default(),
            },
            is_edge: false,
            alias: None,
        })
    }

    fn apply(sub_root_id: i32) -> PlanOpr {
        PlanOpr::Apply(ApplyOpr {
            join_kind: JoinKind::Semi,
            sub_root_id,
            alias: None,
        })
    }

    fn chain() -> LogicalPlan {
        let mut plan = LogicalPlan::with_schema(None);
        plan.append_operator(scan(), &[-1]).unwrap();
        plan.append_operator(expand(), &[0]).unwrap();
        plan
    }

    #[test]
    fn test_encode_decode_frame() {
        let physical = PhysicalPlan::from_logical(&chain(), 2, 1).unwrap();
        assert_eq!(physical.root, 0);
        assert!(physical.nodes[1].shuffle);
        assert!(!physical.nodes[0].shuffle);

        let buffer = physical.encode().unwrap();
        let bytes = buffer.as_bytes();
        assert_eq!(&bytes[..4], &PLAN_MAGIC.to_le_bytes());
        assert_eq!(PhysicalPlan::decode(bytes).unwrap(), physical);
    }

    #[test]
    fn test_single_worker_has_no_shuffle() {
        let physical = PhysicalPlan::from_logical(&chain(), 1, 1).unwrap();
        assert!(!physical.is_partitioned());
        assert!(physical.nodes.iter().all(|n| !n.shuffle));
    }

    #[test]
    fn test_corrupted_buffer_is_rejected() {
        let buffer = PhysicalPlan::from_logical(&chain(), 1, 1)
            .unwrap()
            .encode()
            .unwrap();
        let mut bytes = buffer.into_bytes();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xFF;
        assert!(matches!(
            PhysicalPlan::decode(&bytes),
            Err(IrError::Serialization(msg)) if msg.contains("checksum")
        ));
        assert!(PhysicalPlan::decode(&bytes[..6]).is_err());
    }

    #[test]
    fn test_apply_sub_root_must_exist() {
        let mut plan = chain();
        plan.append_operator(apply(9), &[1]).unwrap();
        let err = PhysicalPlan::from_logical(&plan, 1, 1).unwrap_err();
        assert!(err.contains("missing sub-plan root 9"));
        assert!(plan.build_physical_plan(1, 1).is_empty());
    }

    #[test]
    fn test_apply_sub_plan_is_not_a_dangling_root() {
        let mut plan = chain();
        let sub_root = plan.append_operator(expand(), &[-1]).unwrap();
        plan.append_operator(apply(sub_root), &[1]).unwrap();
        let physical = PhysicalPlan::from_logical(&plan, 1, 1).unwrap();
        assert_eq!(physical.root, 0);
        assert_eq!(physical.sub_roots, vec![sub_root]);
    }

    #[test]
    fn test_dangling_root_is_rejected() {
        let mut plan = chain();
        plan.append_operator(scan(), &[-1]).unwrap();
        assert!(PhysicalPlan::from_logical(&plan, 1, 1)
            .unwrap_err()
            .contains("dangling"));
    }

    #[test]
    fn test_empty_plan_and_zero_workers() {
        assert!(PhysicalPlan::from_logical(&LogicalPlan::with_schema(None), 1, 1).is_err());
        assert!(PhysicalPlan::from_logical(&chain(), 0, 1).is_err());
    }
}
