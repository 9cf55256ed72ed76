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

//! # DMR Module
//!
//! The schema model and its textual form.
//!
//! ## Modules
//!
//! - **node / attribute**: schema node kinds and metadata attributes
//! - **dataset**: the finished, immutable arena of nodes
//! - **builder**: mutable construction and the `finish` pass
//! - **parser**: DMR document to schema
//! - **printer**: schema to DMR document

pub mod attribute;
pub mod builder;
pub mod dataset;
pub mod node;
pub mod parser;
pub mod printer;

pub use attribute::{AtomicAttribute, ContainerAttribute, DapAttribute, OtherXmlAttribute};
pub use builder::{DimSpec, DmrBuilder};
pub use dataset::{DapDataset, DAP_VERSION, DMR_VERSION};
pub use node::{
    DapDimension, DapEnumConst, DapEnumeration, DapGroup, DapNode, DapVariable, DimRef,
    Namespace, NodeKind, NodeSort, VariableKind,
};
pub use parser::{parse_dmr, DmrParser, DmrResponse, ErrorResponse};
pub use printer::print_dmr;
