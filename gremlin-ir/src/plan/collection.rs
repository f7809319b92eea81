// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Ordered operator sequence produced from one traversal

use crate::plan::operator::LogicalOperator;

/// Operators in traversal order; nested traversals live inside Apply and
/// Union operators as their own collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorCollection {
    ops: Vec<LogicalOperator>,
}

impl OperatorCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: LogicalOperator) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LogicalOperator> {
        self.ops.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogicalOperator> {
        self.ops.iter()
    }
}

impl From<Vec<LogicalOperator>> for OperatorCollection {
    fn from(ops: Vec<LogicalOperator>) -> Self {
        Self { ops }
    }
}

impl IntoIterator for OperatorCollection {
    type Item = LogicalOperator;
    type IntoIter = std::vec::IntoIter<LogicalOperator>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a OperatorCollection {
    type Item = &'a LogicalOperator;
    type IntoIter = std::slice::Iter<'a, LogicalOperator>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}
