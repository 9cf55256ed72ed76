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


//! # Data Module
//!
//! Binary decoding of a DAP4 data response.
//!
//! - **factory**: the constructor set the compiler drives
//! - **compiler**: the single-pass walk over the buffer
//! - **tree**: the default factory and its data tree
//! - **value**: atomic values and their wire encoding

pub mod compiler;
pub mod factory;
pub mod tree;
pub mod value;

pub use compiler::{compile, compile_tree, DataCompiler};
pub use factory::{AtomicLayout, DataFactory, TopLevel};
pub use tree::{
    DataAtomic, DataCompoundArray, DataDataset, DataNode, DataRecord, DataSequence,
    DataStructure, TreeFactory,
};
pub use value::{DapValue, COUNT_SIZE};
