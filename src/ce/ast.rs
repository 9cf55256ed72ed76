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

//! Constraint expression syntax tree.
//!
//! The tree is the parser's contract. It records what was asked for and
//! nothing about how to evaluate it.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub dim_redefs: Vec<DimRedef>,
    pub clauses: Vec<Clause>,
}

/// `name=[slice]` rebinding a shared dimension for the rest of the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimRedef {
    pub name: String,
    pub slice: Slice,
}

/// One projected segment tree with an optional selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub projection: SegmentTree,
    pub filter: Option<Filter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentTree {
    pub segment: Segment,
    /// Nested segments; empty for a leaf.
    pub children: Vec<SegmentTree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub slices: Vec<Slice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slice {
    /// `[]`
    Whole,
    /// `[*]` or `[*;n]`.
    VarLength { count: Option<u64> },
    /// `[i]`
    Index(u64),
    /// `[start:stop]`, `[start:stride:stop]`; an open `stop` is written
    /// `[start:]` or `[start:*]`.
    Range {
        start: u64,
        stride: u64,
        stop: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    /// `=~`, regular expression match.
    Match,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primary {
    /// A field path, segments joined by `.`.
    Field(String),
    Constant(Constant),
    Nested(Box<Filter>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    And(Vec<Filter>),
    Not(Box<Filter>),
    Compare {
        op: Operator,
        lhs: Primary,
        rhs: Primary,
    },
    /// `lo op1 mid op2 hi`
    Range {
        op1: Operator,
        op2: Operator,
        lhs: Primary,
        mid: Primary,
        rhs: Primary,
    },
}

impl Slice {
    pub fn range(start: u64, stride: u64, stop: u64) -> Self {
        Slice::Range {
            start,
            stride,
            stop: Some(stop),
        }
    }

    /// Number of indices selected from a dimension of `size` elements,
    /// `None` when the slice does not fit.
    pub fn count(&self, size: u64) -> Option<u64> {
        match *self {
            Slice::Whole | Slice::VarLength { count: None } => Some(size),
            Slice::VarLength { count: Some(n) } => Some(n),
            Slice::Index(i) => (i < size).then_some(1),
            Slice::Range { start, stride, stop } => {
                let stop = stop.unwrap_or(size.checked_sub(1)?);
                if stride == 0 || start > stop || stop >= size {
                    return None;
                }
                Some((stop - start) / stride + 1)
            }
        }
    }
}

impl SegmentTree {
    pub fn leaf(segment: Segment) -> Self {
        SegmentTree {
            segment,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl Segment {
    pub fn new(name: impl Into<String>) -> Self {
        Segment {
            name: name.into(),
            slices: Vec::new(),
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slice::Whole => write!(f, "[]"),
            Slice::VarLength { count: None } => write!(f, "[*]"),
            Slice::VarLength { count: Some(n) } => write!(f, "[*;{n}]"),
            Slice::Index(i) => write!(f, "[{i}]"),
            Slice::Range { start, stride: 1, stop: Some(stop) } => write!(f, "[{start}:{stop}]"),
            Slice::Range { start, stride, stop: Some(stop) } => {
                write!(f, "[{start}:{stride}:{stop}]")
            }
            Slice::Range { start, stride: 1, stop: None } => write!(f, "[{start}:*]"),
            Slice::Range { start, stride, stop: None } => write!(f, "[{start}:{stride}:*]"),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Match => "=~",
        };
        f.write_str(text)
    }
}
