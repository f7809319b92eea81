// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Process-wide graph schema
//!
//! The schema is optional and set at most once per process. Plans created
//! after it is set validate label and property references against it; plans
//! created without it accept any name.
//!
//! # Example
//!
//! ```rust,ignore
//! use gremlin_ir::schema;
//!
//! schema::set_schema_json(r#"{
//!     "vertex_labels": [{"id": 0, "name": "person", "properties": [{"id": 0, "name": "name"}]}],
//!     "edge_labels": [{"id": 0, "name": "knows"}]
//! }"#)?;
//! ```

use crate::error::{IrError, IrResult};
use crate::plan::types::NameOrId;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Initialized at most once; readers get a shared handle
static GRAPH_SCHEMA: OnceCell<Arc<GraphSchema>> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDef {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

impl LabelDef {
    fn matches(&self, label: &NameOrId) -> bool {
        match label {
            NameOrId::Name(name) => &self.name == name,
            NameOrId::Id(id) => self.id == *id,
        }
    }
}

/// Vertex and edge label definitions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSchema {
    #[serde(default)]
    pub vertex_labels: Vec<LabelDef>,
    #[serde(default)]
    pub edge_labels: Vec<LabelDef>,
}

impl GraphSchema {
    pub fn from_json(json: &str) -> IrResult<Self> {
        serde_json::from_str(json).map_err(|e| IrError::Schema(e.to_string()))
    }

    pub fn has_vertex_label(&self, label: &NameOrId) -> bool {
        self.vertex_labels.iter().any(|l| l.matches(label))
    }

    pub fn has_edge_label(&self, label: &NameOrId) -> bool {
        self.edge_labels.iter().any(|l| l.matches(label))
    }

    /// Whether any vertex or edge label defines `name`
    pub fn has_property(&self, name: &str) -> bool {
        self.vertex_labels
            .iter()
            .chain(self.edge_labels.iter())
            .flat_map(|l| l.properties.iter())
            .any(|p| p.name == name)
    }
}

/// Install the process-wide schema.
///
/// Fails with `IrError::Schema` if a schema was already installed.
pub fn set_schema(schema: GraphSchema) -> IrResult<()> {
    GRAPH_SCHEMA
        .set(Arc::new(schema))
        .map_err(|_| IrError::Schema("graph schema is already initialized".to_string()))?;
    log::info!("Graph schema initialized");
    Ok(())
}

pub fn set_schema_json(json: &str) -> IrResult<()> {
    set_schema(GraphSchema::from_json(json)?)
}

/// The installed schema, if any
pub fn graph_schema() -> Option<Arc<GraphSchema>> {
    GRAPH_SCHEMA.get().cloned()
}
