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

//! # Data Sources
//!
//! A [`DataSource`] hands over the two halves of a response, DMR text and
//! serialized data, plus the byte order the data was written in. Parsing
//! and compiling stay free of I/O; sources do the reading up front.
//!
//! Drivers that need per-node state keep it in an [`Annotations`] side
//! table instead of on the schema, which stays immutable and shareable.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::chunk::decode_chunked;
use crate::config::{ByteOrder, DapConfig};
use crate::data::compiler::compile_tree;
use crate::data::tree::DataDataset;
use crate::dmr::{DapDataset, DmrParser, DmrResponse};
use crate::errors::{DapError, Result};
use crate::ids::NodeId;

pub trait DataSource {
    /// The DMR document text.
    fn dmr(&self) -> &str;

    /// Serialized data following the DMR.
    fn data(&self) -> &[u8];

    fn byte_order(&self) -> ByteOrder;

    /// Parse the DMR half of the response.
    fn parse(&self, config: &DapConfig) -> Result<DmrResponse> {
        DmrParser::new(config.parser.clone()).parse(self.dmr())
    }

    /// Decode the data half against a schema parsed from this source.
    fn compile<'a>(
        &'a self,
        schema: &'a DapDataset,
        config: &DapConfig,
    ) -> Result<DataDataset<'a>> {
        let mut options = config.compile;
        options.byte_order = self.byte_order();
        compile_tree(schema, self.data(), options)
    }
}

/// A source over bytes already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    dmr: String,
    data: Vec<u8>,
    byte_order: ByteOrder,
}

impl MemorySource {
    pub fn new(dmr: impl Into<String>, data: Vec<u8>, byte_order: ByteOrder) -> Self {
        MemorySource {
            dmr: dmr.into(),
            data,
            byte_order,
        }
    }

    /// Split a chunked response held in memory.
    pub fn from_chunked(bytes: &[u8]) -> Result<Self> {
        let response = decode_chunked(bytes)?;
        if let Some(error) = response.error {
            return Err(DapError::semantic(format!("server returned an error chunk: {error}")));
        }
        Ok(MemorySource::new(response.dmr, response.data, response.byte_order))
    }
}

impl DataSource for MemorySource {
    fn dmr(&self) -> &str {
        &self.dmr
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }
}

/// A source reading a chunked DAP4 response saved to disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    inner: MemorySource,
}

impl FileSource {
    /// Accepts plain paths and `file:` URLs.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let raw = path.as_ref().to_string_lossy();
        let path = match raw.strip_prefix("file:") {
            Some(rest) => PathBuf::from(format!("/{}", rest.trim_start_matches('/'))),
            None => path.as_ref().to_path_buf(),
        };
        let bytes = fs::read(&path)?;
        log::debug!("read {} bytes from {}", bytes.len(), path.display());
        let inner = MemorySource::from_chunked(&bytes)?;
        Ok(FileSource { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for FileSource {
    fn dmr(&self) -> &str {
        self.inner.dmr()
    }

    fn data(&self) -> &[u8] {
        self.inner.data()
    }

    fn byte_order(&self) -> ByteOrder {
        self.inner.byte_order()
    }
}

/// Per-node driver state keyed by schema node identity.
#[derive(Debug, Clone)]
pub struct Annotations<T> {
    entries: HashMap<NodeId, T>,
}

impl<T> Default for Annotations<T> {
    fn default() -> Self {
        Annotations {
            entries: HashMap::new(),
        }
    }
}

impl<T> Annotations<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous annotation, if any.
    pub fn annotate(&mut self, node: NodeId, value: T) -> Option<T> {
        self.entries.insert(node, value)
    }

    pub fn get(&self, node: NodeId) -> Option<&T> {
        self.entries.get(&node)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut T> {
        self.entries.get_mut(&node)
    }

    pub fn remove(&mut self, node: NodeId) -> Option<T> {
        self.entries.remove(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.entries.iter().map(|(id, v)| (*id, v))
    }
}
