// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Compiler error types

use crate::plan::operator::OpKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Status codes reported by the plan accumulator.
///
/// The discriminants are stable and are what `native_code()` reports, so they
/// can be logged and compared across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    ParseExprError = 1,
    InvalidRangeError = 2,
    NegativeIndexError = 3,
    BuildJobError = 4,
    ParentNotFoundError = 5,
    ColumnNotExistError = 6,
    TableNotExistError = 7,
    TagNotExistError = 8,
    UnsupportedError = 9,
    PlanReleasedError = 10,
}

impl ResultCode {
    pub fn native_code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.native_code())
    }
}

/// Errors raised while building, assembling or serializing a plan
#[derive(Error, Debug)]
pub enum IrError {
    #[error("Illegal argument for {kind}.{slot}: {reason}")]
    IllegalArgument {
        kind: String,
        slot: String,
        reason: String,
    },

    #[error("Unsupported step: {0}")]
    UnsupportedStep(String),

    #[error("Unsupported pattern: {0}")]
    UnsupportedPattern(String),

    #[error("The query given alias is unsupported in {0} operator")]
    UnsupportedAlias(OpKind),

    #[error("Invalid {enum_name} value: {value}")]
    InvalidEnumValue {
        enum_name: &'static str,
        value: String,
    },

    #[error("Append {kind} operator failed with {code}")]
    AppendFailed { kind: OpKind, code: ResultCode },

    #[error("Build physical plan error: {0}")]
    BuildPhysicalError(String),

    #[error("Plan is used after close")]
    UseAfterClose,

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Job submission error: {0}")]
    Submission(String),
}

impl IrError {
    pub fn illegal_argument(
        kind: impl fmt::Display,
        slot: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        IrError::IllegalArgument {
            kind: kind.to_string(),
            slot: slot.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_slot(kind: OpKind, slot: impl Into<String>) -> Self {
        Self::illegal_argument(kind, slot, "required argument is absent")
    }
}

impl From<serde_json::Error> for IrError {
    fn from(error: serde_json::Error) -> Self {
        IrError::Serialization(error.to_string())
    }
}

impl From<bincode::Error> for IrError {
    fn from(error: bincode::Error) -> Self {
        IrError::Serialization(error.to_string())
    }
}

pub type IrResult<T> = Result<T, IrError>;
