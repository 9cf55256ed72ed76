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

//! Schema node definitions.
//!
//! Every schema entity is a [`DapNode`] stored in the dataset arena. The
//! node's [`NodeKind`] is a closed union; consumers match on it instead of
//! inspecting a runtime sort tag.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dmr::attribute::DapAttribute;
use crate::ids::NodeId;
use crate::types::{DapType, TypeSort};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DapNode {
    /// `None` only for anonymous dimensions.
    pub name: Option<String>,
    /// `None` only for the dataset root.
    pub parent: Option<NodeId>,
    pub attributes: Vec<DapAttribute>,
    pub kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Dataset(DapGroup),
    Group(DapGroup),
    Dimension(DapDimension),
    Enumeration(DapEnumeration),
    Variable(DapVariable),
}

/// Declarations owned by a group or by the dataset root, in document order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DapGroup {
    pub decls: Vec<NodeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DapDimension {
    pub size: u64,
    /// Declared with `<Dimension>` rather than minted from a size reference.
    pub shared: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DapEnumConst {
    pub name: String,
    pub value: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DapEnumeration {
    pub base: TypeSort,
    pub constants: Vec<DapEnumConst>,
}

impl DapEnumeration {
    pub fn new(base: TypeSort) -> Self {
        DapEnumeration {
            base,
            constants: Vec::new(),
        }
    }

    pub fn value_of(&self, name: &str) -> Option<u64> {
        self.constants.iter().find(|c| c.name == name).map(|c| c.value)
    }

    /// First constant declared with `value`.
    pub fn name_of(&self, value: u64) -> Option<&str> {
        self.constants
            .iter()
            .find(|c| c.value == value)
            .map(|c| c.name.as_str())
    }
}

/// A dimension reference on a variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimRef {
    Node(NodeId),
    /// The distinguished variable-length dimension, written `*`.
    VarLength,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VariableKind {
    Atomic(DapType),
    Structure { fields: Vec<NodeId> },
    Sequence { fields: Vec<NodeId> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DapVariable {
    pub kind: VariableKind,
    pub dims: Vec<DimRef>,
    /// Non-owning references to coordinate variables.
    pub maps: Vec<NodeId>,
}

impl DapVariable {
    pub fn new(kind: VariableKind) -> Self {
        DapVariable {
            kind,
            dims: Vec::new(),
            maps: Vec::new(),
        }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn fields(&self) -> &[NodeId] {
        match &self.kind {
            VariableKind::Structure { fields } | VariableKind::Sequence { fields } => fields,
            VariableKind::Atomic(_) => &[],
        }
    }

    pub fn is_compound(&self) -> bool {
        !matches!(self.kind, VariableKind::Atomic(_))
    }

    /// Type of the variable's elements. Compounds report their marker type.
    pub fn base_type(&self) -> DapType {
        match &self.kind {
            VariableKind::Atomic(ty) => *ty,
            VariableKind::Structure { .. } => DapType::STRUCTURE,
            VariableKind::Sequence { .. } => DapType::SEQUENCE,
        }
    }
}

/// Sort tag of a node, used for scope matching and diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeSort {
    Dataset,
    Group,
    Dimension,
    Enumeration,
    Atomic,
    Structure,
    Sequence,
}

impl fmt::Display for NodeSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NodeSort::Dataset => "Dataset",
            NodeSort::Group => "Group",
            NodeSort::Dimension => "Dimension",
            NodeSort::Enumeration => "Enumeration",
            NodeSort::Atomic => "Variable",
            NodeSort::Structure => "Structure",
            NodeSort::Sequence => "Sequence",
        };
        f.write_str(text)
    }
}

/// Name spaces within which fully qualified names are unique. A dimension
/// and a variable may share a name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    Group,
    Dimension,
    Enumeration,
    Variable,
}

impl DapNode {
    pub fn new(name: Option<String>, parent: Option<NodeId>, kind: NodeKind) -> Self {
        DapNode {
            name,
            parent,
            attributes: Vec::new(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn sort(&self) -> NodeSort {
        match &self.kind {
            NodeKind::Dataset(_) => NodeSort::Dataset,
            NodeKind::Group(_) => NodeSort::Group,
            NodeKind::Dimension(_) => NodeSort::Dimension,
            NodeKind::Enumeration(_) => NodeSort::Enumeration,
            NodeKind::Variable(v) => match v.kind {
                VariableKind::Atomic(_) => NodeSort::Atomic,
                VariableKind::Structure { .. } => NodeSort::Structure,
                VariableKind::Sequence { .. } => NodeSort::Sequence,
            },
        }
    }

    pub fn namespace(&self) -> Namespace {
        match &self.kind {
            NodeKind::Dataset(_) | NodeKind::Group(_) => Namespace::Group,
            NodeKind::Dimension(_) => Namespace::Dimension,
            NodeKind::Enumeration(_) => Namespace::Enumeration,
            NodeKind::Variable(_) => Namespace::Variable,
        }
    }

    pub fn is_group_like(&self) -> bool {
        matches!(self.kind, NodeKind::Dataset(_) | NodeKind::Group(_))
    }

    pub fn is_compound_variable(&self) -> bool {
        matches!(&self.kind, NodeKind::Variable(v) if v.is_compound())
    }

    pub fn as_group(&self) -> Option<&DapGroup> {
        match &self.kind {
            NodeKind::Dataset(g) | NodeKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&DapVariable> {
        match &self.kind {
            NodeKind::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_dimension(&self) -> Option<&DapDimension> {
        match &self.kind {
            NodeKind::Dimension(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_enumeration(&self) -> Option<&DapEnumeration> {
        match &self.kind {
            NodeKind::Enumeration(e) => Some(e),
            _ => None,
        }
    }
}
