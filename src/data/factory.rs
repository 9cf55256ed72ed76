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

//! The pluggable constructor set used by the data compiler.
//!
//! The compiler decides *where* every value lives in the buffer; a
//! [`DataFactory`] decides what in-memory object represents it. Nodes are
//! built bottom-up: the compiler hands each constructor the already-built
//! children, so a factory never needs interior mutability.

use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::errors::Result;
use crate::ids::NodeId;
use crate::types::DapType;

/// Where an atomic variable's values sit in the data buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AtomicLayout {
    /// Offset of the first element.
    pub offset: usize,
    /// Number of elements, the product of the variable's dimensions.
    pub count: u64,
    /// Bytes occupied by all elements, including byte-string prefixes.
    pub length: usize,
    /// For byte-strings, the offset of each element's 8-byte length prefix.
    /// Empty for fixed-size types.
    pub positions: Vec<usize>,
}

/// A top-level variable together with its trailing checksum.
#[derive(Debug, Clone, PartialEq)]
pub struct TopLevel<N> {
    pub var: NodeId,
    pub node: N,
    pub checksum: Option<Checksum>,
}

pub trait DataFactory {
    type Node;
    type Record;
    type Dataset;

    fn atomic(&mut self, var: NodeId, ty: DapType, layout: AtomicLayout) -> Result<Self::Node>;

    /// One instance of a Structure.
    fn structure(&mut self, var: NodeId, index: u64, fields: Vec<Self::Node>) -> Result<Self::Node>;

    /// One record of a Sequence instance.
    fn record(&mut self, var: NodeId, index: u64, fields: Vec<Self::Node>) -> Result<Self::Record>;

    /// One instance of a Sequence with the records read for it.
    fn sequence(
        &mut self,
        var: NodeId,
        index: u64,
        records: Vec<Self::Record>,
    ) -> Result<Self::Node>;

    /// All instances of a dimensioned Structure or Sequence.
    fn compound_array(&mut self, var: NodeId, instances: Vec<Self::Node>) -> Result<Self::Node>;

    fn dataset(&mut self, variables: Vec<TopLevel<Self::Node>>) -> Result<Self::Dataset>;
}
