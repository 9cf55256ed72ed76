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

//! # Data Compiler
//!
//! Walks a DAP4 data buffer once, guided by the schema, and asks a
//! [`DataFactory`] to mint a node for everything it finds.
//!
//! ## Wire Layout
//!
//! Top-level variables appear in declaration order. Within a variable:
//!
//! - fixed-size atomics are `count * size` bytes
//! - each byte-string is an 8-byte length then that many bytes
//! - a Structure is its fields in order, once per instance, unpadded
//! - each Sequence instance is an 8-byte record count (low 32 bits
//!   significant) followed by that many records of all fields
//! - when checksums are on for the DAP part, a 4-byte CRC32 follows each
//!   top-level variable
//!
//! The buffer is length-delimited by construction, so any shortfall aborts
//! the compile with [`DapError::Decode`] and no partial result.

use crate::checksum::{crc32, Checksum, RequestMode, CHECKSUM_SIZE};
use crate::config::CompileOptions;
use crate::data::factory::{AtomicLayout, DataFactory, TopLevel};
use crate::data::tree::{DataDataset, TreeFactory};
use crate::data::value::{read_u32, read_u64, COUNT_SIZE};
use crate::dmr::{DapDataset, VariableKind};
use crate::errors::{DapError, Result};
use crate::ids::NodeId;
use crate::types::DapType;

/// Compile `buffer` against `dataset` using `factory`.
pub fn compile<F: DataFactory>(
    dataset: &DapDataset,
    buffer: &[u8],
    options: CompileOptions,
    factory: &mut F,
) -> Result<F::Dataset> {
    DataCompiler::new(dataset, buffer, options, factory).compile()
}

/// Compile into the default [`DataDataset`] tree.
pub fn compile_tree<'a>(
    dataset: &'a DapDataset,
    buffer: &'a [u8],
    options: CompileOptions,
) -> Result<DataDataset<'a>> {
    let mut factory = TreeFactory::new(dataset, buffer, options.byte_order);
    compile(dataset, buffer, options, &mut factory)
}

/// One compile pass. The cursor is private to this value and the value is
/// consumed by [`DataCompiler::compile`].
pub struct DataCompiler<'s, 'f, F: DataFactory> {
    dataset: &'s DapDataset,
    buffer: &'s [u8],
    options: CompileOptions,
    factory: &'f mut F,
    cursor: usize,
}

impl<'s, 'f, F: DataFactory> DataCompiler<'s, 'f, F> {
    pub fn new(
        dataset: &'s DapDataset,
        buffer: &'s [u8],
        options: CompileOptions,
        factory: &'f mut F,
    ) -> Self {
        DataCompiler {
            dataset,
            buffer,
            options,
            factory,
            cursor: 0,
        }
    }

    pub fn compile(mut self) -> Result<F::Dataset> {
        log::debug!(
            "compiling {} bytes against dataset '{}' (checksum mode {}, {:?} endian)",
            self.buffer.len(),
            self.dataset.name(),
            self.options.checksum_mode,
            self.options.byte_order
        );
        let mut variables = Vec::with_capacity(self.dataset.top_variables().len());
        for &var in self.dataset.top_variables() {
            let start = self.cursor;
            let node = self.compile_variable(var)?;
            let end = self.cursor;
            let checksum = self.read_checksum(start, end)?;
            log::trace!(
                "variable {} occupies bytes {start}..{end}",
                self.dataset.fqn(var)
            );
            variables.push(TopLevel { var, node, checksum });
        }
        if self.cursor < self.buffer.len() {
            log::debug!(
                "{} trailing byte(s) after the last variable",
                self.buffer.len() - self.cursor
            );
        }
        self.factory.dataset(variables)
    }

    fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor)
    }

    fn read_count(&mut self) -> Result<u64> {
        let count = read_u64(self.buffer, self.cursor, self.options.byte_order)
            .map_err(|_| DapError::decode("short serialization: missing count", self.cursor))?;
        self.cursor += COUNT_SIZE;
        Ok(count)
    }

    fn read_checksum(&mut self, start: usize, end: usize) -> Result<Option<Checksum>> {
        if !self.options.checksum_mode.enabled(RequestMode::Dap) {
            return Ok(None);
        }
        if self.remaining() < CHECKSUM_SIZE {
            return Err(DapError::decode(
                "short serialization: missing checksum",
                self.cursor,
            ));
        }
        let stored = read_u32(self.buffer, self.cursor, self.options.byte_order)?;
        self.cursor += CHECKSUM_SIZE;
        let checksum = Checksum { stored, start, end };
        if self.options.verify_checksums {
            let computed = crc32(&self.buffer[start..end]);
            if computed != stored {
                return Err(DapError::decode(
                    format!(
                        "checksum mismatch: stored {} computed {}",
                        checksum.to_hex(),
                        hex::encode(computed.to_be_bytes())
                    ),
                    end,
                ));
            }
        }
        Ok(Some(checksum))
    }

    /// Number of instances a variable's dimensions describe.
    fn instance_count(&self, var: NodeId) -> Result<u64> {
        self.dataset.dim_product(var).ok_or_else(|| {
            DapError::decode(
                format!(
                    "variable {} has a variable-length dimension, which has no wire form here",
                    self.dataset.fqn(var)
                ),
                self.cursor,
            )
        })
    }

    fn compile_variable(&mut self, var: NodeId) -> Result<F::Node> {
        let dataset = self.dataset;
        let variable = dataset
            .variable(var)
            .ok_or_else(|| DapError::internal(format!("{var} is not a variable")))?;
        match &variable.kind {
            VariableKind::Atomic(ty) => self.compile_atomic(var, *ty),
            VariableKind::Structure { fields } => {
                if variable.is_scalar() {
                    return self.compile_structure_instance(var, 0, fields);
                }
                let count = self.instance_count(var)?;
                let mut instances = Vec::new();
                for index in 0..count {
                    instances.push(self.compile_structure_instance(var, index, fields)?);
                }
                self.factory.compound_array(var, instances)
            }
            VariableKind::Sequence { fields } => {
                if variable.is_scalar() {
                    return self.compile_sequence_instance(var, 0, fields);
                }
                let count = self.instance_count(var)?;
                let mut instances = Vec::new();
                for index in 0..count {
                    instances.push(self.compile_sequence_instance(var, index, fields)?);
                }
                self.factory.compound_array(var, instances)
            }
        }
    }

    fn compile_atomic(&mut self, var: NodeId, ty: DapType) -> Result<F::Node> {
        let count = self.instance_count(var)?;
        let offset = self.cursor;
        let layout = match ty.size() {
            Some(size) => {
                let length = usize::try_from(count)
                    .ok()
                    .and_then(|c| c.checked_mul(size))
                    .filter(|&len| len <= self.remaining())
                    .ok_or_else(|| {
                        DapError::decode(
                            format!(
                                "short serialization: {} needs {count} x {size} bytes",
                                self.dataset.fqn(var)
                            ),
                            offset,
                        )
                    })?;
                self.cursor += length;
                AtomicLayout {
                    offset,
                    count,
                    length,
                    positions: Vec::new(),
                }
            }
            None => {
                let (positions, length) = self.scan_byte_strings(count)?;
                self.cursor = offset + length;
                AtomicLayout {
                    offset,
                    count,
                    length,
                    positions,
                }
            }
        };
        self.factory.atomic(var, ty, layout)
    }

    /// Record where each of `count` byte-strings starts and return the total
    /// bytes they occupy. The cursor is left where the scan began.
    fn scan_byte_strings(&mut self, count: u64) -> Result<(Vec<usize>, usize)> {
        let start = self.cursor;
        let mut positions = Vec::new();
        let mut total = 0usize;
        for _ in 0..count {
            positions.push(self.cursor);
            let len = self.read_count()?;
            let len = usize::try_from(len)
                .ok()
                .filter(|&len| len <= self.remaining())
                .ok_or_else(|| {
                    DapError::decode(
                        format!("short serialization: byte-string of {len} bytes"),
                        self.cursor,
                    )
                })?;
            self.cursor += len;
            total += COUNT_SIZE + len;
        }
        self.cursor = start;
        Ok((positions, total))
    }

    fn compile_fields(&mut self, fields: &[NodeId]) -> Result<Vec<F::Node>> {
        let mut nodes = Vec::with_capacity(fields.len());
        for &field in fields {
            nodes.push(self.compile_variable(field)?);
        }
        Ok(nodes)
    }

    fn compile_structure_instance(
        &mut self,
        var: NodeId,
        index: u64,
        fields: &[NodeId],
    ) -> Result<F::Node> {
        let nodes = self.compile_fields(fields)?;
        self.factory.structure(var, index, nodes)
    }

    fn compile_sequence_instance(
        &mut self,
        var: NodeId,
        index: u64,
        fields: &[NodeId],
    ) -> Result<F::Node> {
        let records = self.read_count()? & 0xFFFF_FFFF;
        log::trace!(
            "sequence {}[{index}] carries {records} record(s)",
            self.dataset.fqn(var)
        );
        let mut out = Vec::new();
        for r in 0..records {
            let nodes = self.compile_fields(fields)?;
            out.push(self.factory.record(var, r, nodes)?);
        }
        self.factory.sequence(var, index, out)
    }
}
