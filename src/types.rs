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

//! # Dap4 Type System
//!
//! Every DAP4 value has a [`DapType`]. The atomic sorts (Char, the integer
//! widths, the two float widths, String, URL and Opaque) are singletons served
//! from a process-wide table that is written once on first use. Enumerations
//! are types too: each `<Enumeration>` declaration becomes its own
//! [`DapType::Enum`], identified by the declaration's node id.
//!
//! Enumerations are resolved by name through a [`TypeRegistry`], which is
//! created per DMR parse. Enumerations declared in one dataset can therefore
//! never be seen by another dataset's parse.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::ids::NodeId;

/// The sort of a type, including the enumeration and compound markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeSort {
    Char,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    String,
    URL,
    Opaque,
    Enum,
    Structure,
    Sequence,
}

impl TypeSort {
    pub const ATOMIC: [TypeSort; 14] = [
        TypeSort::Char,
        TypeSort::Int8,
        TypeSort::UInt8,
        TypeSort::Int16,
        TypeSort::UInt16,
        TypeSort::Int32,
        TypeSort::UInt32,
        TypeSort::Int64,
        TypeSort::UInt64,
        TypeSort::Float32,
        TypeSort::Float64,
        TypeSort::String,
        TypeSort::URL,
        TypeSort::Opaque,
    ];

    /// Canonical DMR element name for the sort.
    pub fn name(self) -> &'static str {
        match self {
            TypeSort::Char => "Char",
            TypeSort::Int8 => "Int8",
            TypeSort::UInt8 => "UInt8",
            TypeSort::Int16 => "Int16",
            TypeSort::UInt16 => "UInt16",
            TypeSort::Int32 => "Int32",
            TypeSort::UInt32 => "UInt32",
            TypeSort::Int64 => "Int64",
            TypeSort::UInt64 => "UInt64",
            TypeSort::Float32 => "Float32",
            TypeSort::Float64 => "Float64",
            TypeSort::String => "String",
            TypeSort::URL => "URL",
            TypeSort::Opaque => "Opaque",
            TypeSort::Enum => "Enum",
            TypeSort::Structure => "Structure",
            TypeSort::Sequence => "Sequence",
        }
    }

    /// Look a sort up by name. `Byte` is accepted as an alias for `UInt8`.
    pub fn from_name(name: &str) -> Option<TypeSort> {
        if name.eq_ignore_ascii_case("byte") {
            return Some(TypeSort::UInt8);
        }
        sort_table().get(name).copied()
    }

    pub fn is_atomic(self) -> bool {
        !matches!(self, TypeSort::Enum | TypeSort::Structure | TypeSort::Sequence)
    }

    pub fn is_integer_type(self) -> bool {
        matches!(
            self,
            TypeSort::Int8
                | TypeSort::UInt8
                | TypeSort::Int16
                | TypeSort::UInt16
                | TypeSort::Int32
                | TypeSort::UInt32
                | TypeSort::Int64
                | TypeSort::UInt64
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            TypeSort::Char
                | TypeSort::UInt8
                | TypeSort::UInt16
                | TypeSort::UInt32
                | TypeSort::UInt64
        )
    }

    pub fn is_float_type(self) -> bool {
        matches!(self, TypeSort::Float32 | TypeSort::Float64)
    }

    pub fn is_numeric_type(self) -> bool {
        self.is_integer_type() || self.is_float_type()
    }

    pub fn is_string_type(self) -> bool {
        matches!(self, TypeSort::String | TypeSort::URL)
    }

    pub fn is_char_type(self) -> bool {
        self == TypeSort::Char
    }

    pub fn is_opaque_type(self) -> bool {
        self == TypeSort::Opaque
    }

    pub fn is_enum_type(self) -> bool {
        self == TypeSort::Enum
    }

    pub fn is_compound(self) -> bool {
        matches!(self, TypeSort::Structure | TypeSort::Sequence)
    }

    /// Attributes may carry any atomic value except opaque blobs.
    pub fn is_legal_attr_type(self) -> bool {
        (self.is_atomic() && self != TypeSort::Opaque) || self == TypeSort::Enum
    }

    /// Fixed-size sorts serialize without a length prefix. Enumerations are
    /// fixed-size through their base type; see [`DapType::is_fixed_size`].
    pub fn is_fixed_size(self) -> bool {
        self.size().is_some()
    }

    /// Serialized width in bytes, `None` for byte-strings and compounds.
    pub fn size(self) -> Option<usize> {
        match self {
            TypeSort::Char | TypeSort::Int8 | TypeSort::UInt8 => Some(1),
            TypeSort::Int16 | TypeSort::UInt16 => Some(2),
            TypeSort::Int32 | TypeSort::UInt32 | TypeSort::Float32 => Some(4),
            TypeSort::Int64 | TypeSort::UInt64 | TypeSort::Float64 => Some(8),
            TypeSort::String
            | TypeSort::URL
            | TypeSort::Opaque
            | TypeSort::Enum
            | TypeSort::Structure
            | TypeSort::Sequence => None,
        }
    }
}

impl fmt::Display for TypeSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static SORT_TABLE: OnceLock<HashMap<&'static str, TypeSort>> = OnceLock::new();

fn sort_table() -> &'static HashMap<&'static str, TypeSort> {
    SORT_TABLE.get_or_init(|| {
        let mut table = HashMap::new();
        for sort in TypeSort::ATOMIC {
            table.insert(sort.name(), sort);
        }
        table.insert(TypeSort::Enum.name(), TypeSort::Enum);
        table.insert(TypeSort::Structure.name(), TypeSort::Structure);
        table.insert(TypeSort::Sequence.name(), TypeSort::Sequence);
        table
    })
}

/// A type object: an atomic singleton or a declared enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DapType {
    Atomic(TypeSort),
    /// A declared enumeration; `id` is its declaration node.
    Enum { id: NodeId, base: TypeSort },
}

impl DapType {
    pub const CHAR: DapType = DapType::Atomic(TypeSort::Char);
    pub const INT8: DapType = DapType::Atomic(TypeSort::Int8);
    pub const UINT8: DapType = DapType::Atomic(TypeSort::UInt8);
    pub const INT16: DapType = DapType::Atomic(TypeSort::Int16);
    pub const UINT16: DapType = DapType::Atomic(TypeSort::UInt16);
    pub const INT32: DapType = DapType::Atomic(TypeSort::Int32);
    pub const UINT32: DapType = DapType::Atomic(TypeSort::UInt32);
    pub const INT64: DapType = DapType::Atomic(TypeSort::Int64);
    pub const UINT64: DapType = DapType::Atomic(TypeSort::UInt64);
    pub const FLOAT32: DapType = DapType::Atomic(TypeSort::Float32);
    pub const FLOAT64: DapType = DapType::Atomic(TypeSort::Float64);
    pub const STRING: DapType = DapType::Atomic(TypeSort::String);
    pub const URL: DapType = DapType::Atomic(TypeSort::URL);
    pub const OPAQUE: DapType = DapType::Atomic(TypeSort::Opaque);
    pub const STRUCTURE: DapType = DapType::Atomic(TypeSort::Structure);
    pub const SEQUENCE: DapType = DapType::Atomic(TypeSort::Sequence);

    /// Look up a non-enumeration type by name from the fixed table.
    pub fn lookup(name: &str) -> Option<DapType> {
        match TypeSort::from_name(name)? {
            TypeSort::Enum => None,
            sort => Some(DapType::Atomic(sort)),
        }
    }

    pub fn type_sort(&self) -> TypeSort {
        match self {
            DapType::Atomic(sort) => *sort,
            DapType::Enum { .. } => TypeSort::Enum,
        }
    }

    /// The lowest-level sort: the base integer sort for enumerations.
    pub fn atomic_type(&self) -> TypeSort {
        match self {
            DapType::Atomic(sort) => *sort,
            DapType::Enum { base, .. } => *base,
        }
    }

    pub fn enum_id(&self) -> Option<NodeId> {
        match self {
            DapType::Enum { id, .. } => Some(*id),
            DapType::Atomic(_) => None,
        }
    }

    pub fn size(&self) -> Option<usize> {
        self.atomic_type().size()
    }

    pub fn is_fixed_size(&self) -> bool {
        self.size().is_some()
    }

    pub fn is_enum_type(&self) -> bool {
        matches!(self, DapType::Enum { .. })
    }

    pub fn is_unsigned(&self) -> bool {
        self.atomic_type().is_unsigned()
    }

    pub fn is_integer_type(&self) -> bool {
        self.type_sort().is_integer_type()
    }

    pub fn is_float_type(&self) -> bool {
        self.type_sort().is_float_type()
    }

    pub fn is_numeric_type(&self) -> bool {
        self.type_sort().is_numeric_type()
    }

    pub fn is_string_type(&self) -> bool {
        self.type_sort().is_string_type()
    }

    pub fn is_char_type(&self) -> bool {
        self.type_sort().is_char_type()
    }

    pub fn is_opaque_type(&self) -> bool {
        self.type_sort().is_opaque_type()
    }

    pub fn is_compound(&self) -> bool {
        self.type_sort().is_compound()
    }

    pub fn is_legal_attr_type(&self) -> bool {
        self.type_sort().is_legal_attr_type()
    }

    /// Byte-strings carry an 8-byte length prefix on the wire.
    pub fn is_byte_string(&self) -> bool {
        matches!(
            self.atomic_type(),
            TypeSort::String | TypeSort::URL | TypeSort::Opaque
        )
    }
}

/// Per-parse registry of live enumeration types, keyed by FQN.
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    enums: Vec<(String, DapType)>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an enumeration under its fully qualified name. Re-registering
    /// the same FQN keeps the first declaration.
    pub fn register_enum(&mut self, fqn: impl Into<String>, ty: DapType) {
        let fqn = fqn.into();
        if !self.enums.iter().any(|(name, _)| *name == fqn) {
            self.enums.push((fqn, ty));
        }
    }

    /// Resolve a type name: live enumerations by FQN first, then the fixed
    /// atomic table.
    pub fn reify(&self, name: &str) -> Option<DapType> {
        self.enums
            .iter()
            .find(|(fqn, _)| fqn == name)
            .map(|(_, ty)| *ty)
            .or_else(|| DapType::lookup(name))
    }

    pub fn enums(&self) -> impl Iterator<Item = (&str, DapType)> {
        self.enums.iter().map(|(fqn, ty)| (fqn.as_str(), *ty))
    }

    pub fn len(&self) -> usize {
        self.enums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enums.is_empty()
    }
}
