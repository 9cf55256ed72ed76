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

//! # Constraint Expressions
//!
//! Request-time subsetting: which variables to return, which index ranges,
//! and which records of a Sequence.
//!
//! - **lexer**: splits the constraint string into tokens
//! - **ast**: the syntax tree handed to callers
//! - **parser**: the grammar
//! - **validate**: legality against a schema

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod validate;

pub use ast::{
    Clause, Constant, Constraint, DimRedef, Filter, Operator, Primary, Segment, SegmentTree, Slice,
};
pub use parser::parse_ce;
pub use validate::{parse_ce_with, validate};
