//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Dap4.
//! The Dap4 project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Default Data Tree
//!
//! [`TreeFactory`] builds a [`DataDataset`]: a tree of [`DataNode`] values
//! shaped like the schema. Atomic nodes hold only their buffer layout;
//! values are read lazily from the borrowed buffer, so compiling never
//! copies variable payloads.

use crate::checksum::Checksum;
use crate::config::ByteOrder;
use crate::data::factory::{AtomicLayout, DataFactory, TopLevel};
use crate::data::value::{read_byte_string, read_fixed, DapValue};
use crate::dmr::DapDataset;
use crate::errors::{DapError, Result};
use crate::ids::NodeId;
use crate::types::DapType;

#[derive(Debug, Clone, PartialEq)]
pub enum DataNode {
    Atomic(DataAtomic),
    Structure(DataStructure),
    Sequence(DataSequence),
    CompoundArray(DataCompoundArray),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataAtomic {
    pub var: NodeId,
    pub ty: DapType,
    pub layout: AtomicLayout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataStructure {
    pub var: NodeId,
    pub index: u64,
    pub fields: Vec<DataNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    pub var: NodeId,
    pub index: u64,
    pub fields: Vec<DataNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSequence {
    pub var: NodeId,
    pub index: u64,
    pub records: Vec<DataRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataCompoundArray {
    pub var: NodeId,
    pub instances: Vec<DataNode>,
}

impl DataNode {
    pub fn var(&self) -> NodeId {
        match self {
            DataNode::Atomic(a) => a.var,
            DataNode::Structure(s) => s.var,
            DataNode::Sequence(s) => s.var,
            DataNode::CompoundArray(c) => c.var,
        }
    }

    pub fn as_atomic(&self) -> Option<&DataAtomic> {
        match self {
            DataNode::Atomic(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_structure(&self) -> Option<&DataStructure> {
        match self {
            DataNode::Structure(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&DataSequence> {
        match self {
            DataNode::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_compound_array(&self) -> Option<&DataCompoundArray> {
        match self {
            DataNode::CompoundArray(c) => Some(c),
            _ => None,
        }
    }

    /// Fields of a Structure instance, in declaration order.
    pub fn fields(&self) -> &[DataNode] {
        match self {
            DataNode::Structure(s) => &s.fields,
            _ => &[],
        }
    }
}

impl DataSequence {
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// The default factory: builds [`DataNode`] trees over a borrowed buffer.
#[derive(Debug)]
pub struct TreeFactory<'a> {
    schema: &'a DapDataset,
    buffer: &'a [u8],
    byte_order: ByteOrder,
}

impl<'a> TreeFactory<'a> {
    pub fn new(schema: &'a DapDataset, buffer: &'a [u8], byte_order: ByteOrder) -> Self {
        TreeFactory {
            schema,
            buffer,
            byte_order,
        }
    }
}

impl<'a> DataFactory for TreeFactory<'a> {
    type Node = DataNode;
    type Record = DataRecord;
    type Dataset = DataDataset<'a>;

    fn atomic(&mut self, var: NodeId, ty: DapType, layout: AtomicLayout) -> Result<DataNode> {
        Ok(DataNode::Atomic(DataAtomic { var, ty, layout }))
    }

    fn structure(&mut self, var: NodeId, index: u64, fields: Vec<DataNode>) -> Result<DataNode> {
        Ok(DataNode::Structure(DataStructure { var, index, fields }))
    }

    fn record(&mut self, var: NodeId, index: u64, fields: Vec<DataNode>) -> Result<DataRecord> {
        Ok(DataRecord { var, index, fields })
    }

    fn sequence(&mut self, var: NodeId, index: u64, records: Vec<DataRecord>) -> Result<DataNode> {
        Ok(DataNode::Sequence(DataSequence { var, index, records }))
    }

    fn compound_array(&mut self, var: NodeId, instances: Vec<DataNode>) -> Result<DataNode> {
        Ok(DataNode::CompoundArray(DataCompoundArray { var, instances }))
    }

    fn dataset(&mut self, variables: Vec<TopLevel<DataNode>>) -> Result<DataDataset<'a>> {
        Ok(DataDataset {
            schema: self.schema,
            buffer: self.buffer,
            byte_order: self.byte_order,
            variables,
        })
    }
}

/// Decoded data for one response, tied to its schema and buffer.
#[derive(Debug, Clone)]
pub struct DataDataset<'a> {
    schema: &'a DapDataset,
    buffer: &'a [u8],
    byte_order: ByteOrder,
    variables: Vec<TopLevel<DataNode>>,
}

impl<'a> DataDataset<'a> {
    pub fn schema(&self) -> &'a DapDataset {
        self.schema
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Top-level variables in wire order.
    pub fn variables(&self) -> &[TopLevel<DataNode>] {
        &self.variables
    }

    pub fn variable(&self, var: NodeId) -> Option<&DataNode> {
        self.variables
            .iter()
            .find(|top| top.var == var)
            .map(|top| &top.node)
    }

    pub fn variable_by_name(&self, fqn: &str) -> Option<&DataNode> {
        self.schema
            .find_variable(fqn)
            .and_then(|id| self.variable(id))
    }

    pub fn checksum(&self, var: NodeId) -> Option<Checksum> {
        self.variables
            .iter()
            .find(|top| top.var == var)
            .and_then(|top| top.checksum)
    }

    /// Recompute every attached checksum against the buffer.
    pub fn verify_checksums(&self) -> Result<()> {
        for top in &self.variables {
            if let Some(sum) = top.checksum {
                if !sum.verify(self.buffer) {
                    return Err(DapError::decode(
                        format!(
                            "checksum mismatch for {}: stored {}",
                            self.schema.fqn(top.var),
                            sum.to_hex()
                        ),
                        sum.end,
                    ));
                }
            }
        }
        Ok(())
    }

    /// Field of a Structure instance or record by name.
    pub fn field<'n>(&self, fields: &'n [DataNode], name: &str) -> Option<&'n DataNode> {
        fields
            .iter()
            .find(|f| self.schema.node(f.var()).name() == name)
    }

    /// Read element `index` of an atomic node.
    pub fn read(&self, atomic: &DataAtomic, index: u64) -> Result<DapValue> {
        if index >= atomic.layout.count {
            return Err(DapError::decode(
                format!("index {index} out of range for {} elements", atomic.layout.count),
                atomic.layout.offset,
            ));
        }
        let sort = atomic.ty.atomic_type();
        match sort.size() {
            Some(size) => {
                let offset = atomic.layout.offset + (index as usize) * size;
                read_fixed(self.buffer, offset, sort, self.byte_order)
            }
            None => {
                let offset = atomic
                    .layout
                    .positions
                    .get(index as usize)
                    .copied()
                    .ok_or_else(|| DapError::internal("byte-string positions missing"))?;
                read_byte_string(self.buffer, offset, sort, self.byte_order)
            }
        }
    }

    pub fn read_all(&self, atomic: &DataAtomic) -> Result<Vec<DapValue>> {
        (0..atomic.layout.count).map(|i| self.read(atomic, i)).collect()
    }

    /// Name of the enumeration constant an enum-typed element holds.
    pub fn enum_name(&self, atomic: &DataAtomic, index: u64) -> Result<Option<&'a str>> {
        let Some(id) = atomic.ty.enum_id() else {
            return Ok(None);
        };
        let value = self.read(atomic, index)?;
        Ok(self
            .schema
            .enumeration(id)
            .zip(value.as_u64())
            .and_then(|(e, v)| e.name_of(v)))
    }
}
