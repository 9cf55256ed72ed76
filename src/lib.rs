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


//! # Dap4 Core Library
//!
//! Schema model, parsers and binary decoder for the DAP4 (Data Access
//! Protocol 4) wire protocol.
//!
//! ## Module Overview
//!
//! - **types**: atomic type table, enumeration types and type predicates
//! - **dmr**: the schema tree, its builder, the DMR parser and printer
//! - **ce**: constraint-expression lexer, AST, parser and validation
//! - **data**: the data compiler, the factory seam and the default data tree
//! - **checksum**: checksum modes and CRC32 verification
//! - **chunk**: chunked response framing
//! - **source**: data sources and per-node driver annotations
//! - **config**: parser and compiler options, JSON/YAML loading
//! - **errors**: the error taxonomy
//!
//! ## Feature Flags
//!
//! - `yaml`: load configuration from YAML documents
//! - `full`: enables all features
//!
//! ## Quick Start
//!
//! ```rust
//! use dap4::{compile_tree, parse_dmr, CompileOptions};
//!
//! let dmr = r#"<Dataset name="d" dapVersion="4.0" dmrVersion="1.0">
//!     <Int32 name="x"/>
//! </Dataset>"#;
//! let schema = parse_dmr(dmr)?.into_dataset()?;
//!
//! let mut data = 7i32.to_le_bytes().to_vec();
//! data.extend_from_slice(&dap4::checksum::crc32(&data).to_le_bytes());
//!
//! let tree = compile_tree(&schema, &data, CompileOptions::default())?;
//! # Ok::<(), dap4::DapError>(())
//! ```
//!
//! ## Architecture
//!
//! 1. **DMR text** is parsed into an immutable [`DapDataset`]
//! 2. **Constraints** are parsed independently and validated against it
//! 3. **Data bytes** are compiled against the schema through a [`DataFactory`]
//!
//! A parsed schema is `Send + Sync`; any number of compiles may share it.

pub mod checksum;
pub mod chunk;
pub mod config;
pub mod errors;
pub mod ids;
pub mod source;
pub mod types;

pub mod ce;
pub mod data;
pub mod dmr;

pub use errors::{DapError, Result};
pub use ids::NodeId;
pub use types::{DapType, TypeRegistry, TypeSort};

pub use checksum::{crc32, Checksum, ChecksumMode, RequestMode};
pub use chunk::{decode_chunked, encode_chunked, ChunkedResponse};
pub use config::{ByteOrder, CompileOptions, DapConfig, DapConfigBuilder, DmrParserConfig};
pub use source::{Annotations, DataSource, FileSource, MemorySource};

pub use ce::{parse_ce, parse_ce_with, Constraint};
pub use data::{compile, compile_tree, DapValue, DataDataset, DataFactory, DataNode, TreeFactory};
pub use dmr::{
    parse_dmr, print_dmr, DapAttribute, DapDataset, DapNode, DmrBuilder, DmrParser,
    DmrResponse, ErrorResponse, NodeKind, VariableKind,
};
