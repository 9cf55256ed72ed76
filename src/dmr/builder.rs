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

//! # Schema Builder
//!
//! [`DmrBuilder`] is the only way to construct a [`DapDataset`]. The DMR
//! parser drives it while walking a document; callers may also drive it
//! directly to synthesize a schema.
//!
//! Named dimension references, enumeration-typed variables and maps are
//! recorded as pending and resolved by [`DmrBuilder::finish`], so a
//! reference may appear before the declaration it names. `finish` also
//! enforces the invariants that need the complete tree: enumerations are
//! non-empty, maps name atomic variables outside their own container, and the
//! dataset speaks the supported protocol versions.
//!
//! ```rust
//! use dap4::dmr::{DimSpec, DmrBuilder};
//! use dap4::types::DapType;
//!
//! let mut builder = DmrBuilder::new("example");
//! let root = builder.root();
//! builder.add_dimension(root, "time", 4)?;
//! let t = builder.add_atomic_variable(root, "t", DapType::FLOAT64)?;
//! builder.add_dim_ref(t, DimSpec::Named("time".into()))?;
//! let dataset = builder.finish()?;
//! assert_eq!(dataset.dim_product(t), Some(4));
//! # Ok::<(), dap4::errors::DapError>(())
//! ```

use std::sync::OnceLock;

use regex::Regex;

use crate::dmr::attribute::DapAttribute;
use crate::dmr::dataset::{group_prefix, DapDataset, DAP_VERSION, DMR_VERSION};
use crate::dmr::node::{
    DapDimension, DapEnumConst, DapEnumeration, DapGroup, DapNode, DapVariable, DimRef,
    Namespace, NodeKind, NodeSort, VariableKind,
};
use crate::errors::{DapError, Result};
use crate::ids::NodeId;
use crate::types::{DapType, TypeRegistry, TypeSort};

/// How a variable names one of its dimensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DimSpec {
    /// Reference to a shared dimension by (possibly relative) name.
    Named(String),
    /// An anonymous dimension of the given size.
    Size(u64),
    VarLength,
}

#[derive(Debug)]
enum Pending {
    EnumType { var: NodeId, name: String },
    Dim { var: NodeId, slot: usize, name: String },
    Map { var: NodeId, name: String },
}

static IDENTIFIER: OnceLock<Option<Regex>> = OnceLock::new();

fn is_identifier(name: &str) -> bool {
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
        .map_or(false, |re| re.is_match(name))
}

#[derive(Debug)]
pub struct DmrBuilder {
    nodes: Vec<DapNode>,
    dap_version: String,
    dmr_version: String,
    registry: TypeRegistry,
    pending: Vec<Pending>,
}

impl DmrBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let root = DapNode::new(
            Some(name.into()),
            None,
            NodeKind::Dataset(DapGroup::default()),
        );
        DmrBuilder {
            nodes: vec![root],
            dap_version: DAP_VERSION.to_string(),
            dmr_version: DMR_VERSION.to_string(),
            registry: TypeRegistry::new(),
            pending: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn set_versions(&mut self, dap_version: impl Into<String>, dmr_version: impl Into<String>) {
        self.dap_version = dap_version.into();
        self.dmr_version = dmr_version.into();
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn node(&self, id: NodeId) -> Option<&DapNode> {
        self.nodes.get(id.index())
    }

    pub fn sort(&self, id: NodeId) -> Option<NodeSort> {
        self.node(id).map(DapNode::sort)
    }

    fn node_checked(&self, id: NodeId) -> Result<&DapNode> {
        self.node(id)
            .ok_or_else(|| DapError::internal(format!("unknown schema node {id}")))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut DapNode> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| DapError::internal(format!("unknown schema node {id}")))
    }

    fn push(&mut self, node: DapNode) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn group_mut(&mut self, group: NodeId) -> Result<&mut DapGroup> {
        match &mut self.node_mut(group)?.kind {
            NodeKind::Dataset(g) | NodeKind::Group(g) => Ok(g),
            _ => Err(DapError::semantic(format!("{group} is not a group"))),
        }
    }

    fn variable_mut(&mut self, var: NodeId) -> Result<&mut DapVariable> {
        match &mut self.node_mut(var)?.kind {
            NodeKind::Variable(v) => Ok(v),
            _ => Err(DapError::semantic(format!("{var} is not a variable"))),
        }
    }

    /// Members of a group or fields of a compound, for duplicate checks.
    fn members(&self, container: NodeId) -> &[NodeId] {
        match self.node(container).map(|n| &n.kind) {
            Some(NodeKind::Dataset(g)) | Some(NodeKind::Group(g)) => &g.decls,
            Some(NodeKind::Variable(v)) => v.fields(),
            _ => &[],
        }
    }

    fn check_unique(&self, container: NodeId, namespace: Namespace, name: &str) -> Result<()> {
        let clash = self.members(container).iter().any(|&m| {
            self.node(m)
                .map(|n| n.namespace() == namespace && n.name.as_deref() == Some(name))
                .unwrap_or(false)
        });
        if clash {
            return Err(DapError::semantic(format!(
                "duplicate declaration of '{name}' in {}",
                self.fqn(container)
            )));
        }
        Ok(())
    }

    fn check_name(name: &str, what: &str) -> Result<()> {
        if name.is_empty() {
            return Err(DapError::semantic(format!("{what} requires a name")));
        }
        Ok(())
    }

    pub fn fqn(&self, id: NodeId) -> String {
        if self.node(id).is_none() {
            return String::new();
        }
        crate::dmr::dataset::fqn_in(&self.nodes, id)
    }

    /// Nearest group enclosing `id`, `id` itself when it is a group.
    pub fn enclosing_group(&self, id: NodeId) -> NodeId {
        let mut current = Some(id);
        while let Some(cur) = current {
            match self.node(cur) {
                Some(node) if node.is_group_like() => return cur,
                Some(node) => current = node.parent,
                None => break,
            }
        }
        NodeId::ROOT
    }

    pub fn add_group(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        Self::check_name(name, "Group")?;
        self.check_unique(parent, Namespace::Group, name)?;
        self.group_mut(parent)?;
        let id = self.push(DapNode::new(
            Some(name.to_string()),
            Some(parent),
            NodeKind::Group(DapGroup::default()),
        ));
        self.group_mut(parent)?.decls.push(id);
        Ok(id)
    }

    pub fn add_dimension(&mut self, group: NodeId, name: &str, size: u64) -> Result<NodeId> {
        Self::check_name(name, "Dimension")?;
        if size == 0 {
            return Err(DapError::semantic(format!(
                "dimension '{name}' must have a positive size"
            )));
        }
        self.check_unique(group, Namespace::Dimension, name)?;
        self.group_mut(group)?;
        let id = self.push(DapNode::new(
            Some(name.to_string()),
            Some(group),
            NodeKind::Dimension(DapDimension { size, shared: true }),
        ));
        self.group_mut(group)?.decls.push(id);
        Ok(id)
    }

    /// Mint an anonymous dimension in the root group. Identical sizes are
    /// never shared.
    pub fn add_anonymous_dimension(&mut self, size: u64) -> Result<NodeId> {
        if size == 0 {
            return Err(DapError::semantic("dimension size must be positive"));
        }
        let id = self.push(DapNode::new(
            None,
            Some(NodeId::ROOT),
            NodeKind::Dimension(DapDimension { size, shared: false }),
        ));
        self.group_mut(NodeId::ROOT)?.decls.push(id);
        Ok(id)
    }

    pub fn add_enumeration(&mut self, group: NodeId, name: &str, base: TypeSort) -> Result<NodeId> {
        Self::check_name(name, "Enumeration")?;
        if !base.is_integer_type() {
            return Err(DapError::semantic(format!(
                "enumeration '{name}' has non-integer base type {base}"
            )));
        }
        self.check_unique(group, Namespace::Enumeration, name)?;
        self.group_mut(group)?;
        let id = self.push(DapNode::new(
            Some(name.to_string()),
            Some(group),
            NodeKind::Enumeration(DapEnumeration::new(base)),
        ));
        self.group_mut(group)?.decls.push(id);
        let fqn = self.fqn(id);
        self.registry.register_enum(fqn, DapType::Enum { id, base });
        Ok(id)
    }

    pub fn add_enum_const(&mut self, enumeration: NodeId, name: &str, value: u64) -> Result<()> {
        if !is_identifier(name) {
            return Err(DapError::semantic(format!(
                "illegal enumeration constant name '{name}'"
            )));
        }
        let owner = self.fqn(enumeration);
        match &mut self.node_mut(enumeration)?.kind {
            NodeKind::Enumeration(e) => {
                if e.constants.iter().any(|c| c.name == name) {
                    return Err(DapError::semantic(format!(
                        "duplicate enumeration constant '{name}' in {owner}"
                    )));
                }
                e.constants.push(DapEnumConst {
                    name: name.to_string(),
                    value,
                });
                Ok(())
            }
            _ => Err(DapError::semantic(format!("{owner} is not an enumeration"))),
        }
    }

    fn add_variable(
        &mut self,
        container: NodeId,
        name: &str,
        kind: VariableKind,
    ) -> Result<NodeId> {
        Self::check_name(name, "Variable")?;
        let parent = self.node_checked(container)?;
        if !parent.is_group_like() && !parent.is_compound_variable() {
            return Err(DapError::semantic(format!(
                "variable '{name}' cannot be declared inside {}",
                parent.sort()
            )));
        }
        self.check_unique(container, Namespace::Variable, name)?;
        let id = self.push(DapNode::new(
            Some(name.to_string()),
            Some(container),
            NodeKind::Variable(DapVariable::new(kind)),
        ));
        match &mut self.node_mut(container)?.kind {
            NodeKind::Dataset(g) | NodeKind::Group(g) => g.decls.push(id),
            NodeKind::Variable(DapVariable {
                kind: VariableKind::Structure { fields } | VariableKind::Sequence { fields },
                ..
            }) => fields.push(id),
            _ => return Err(DapError::internal("variable container changed kind")),
        }
        Ok(id)
    }

    pub fn add_atomic_variable(
        &mut self,
        container: NodeId,
        name: &str,
        ty: DapType,
    ) -> Result<NodeId> {
        if ty.is_compound() {
            return Err(DapError::semantic(format!(
                "variable '{name}' declared atomic with compound type {}",
                ty.type_sort()
            )));
        }
        self.add_variable(container, name, VariableKind::Atomic(ty))
    }

    /// Declare a variable typed by an enumeration resolved at `finish`.
    pub fn add_enum_variable(
        &mut self,
        container: NodeId,
        name: &str,
        enum_name: &str,
    ) -> Result<NodeId> {
        let id = self.add_variable(container, name, VariableKind::Atomic(DapType::UINT32))?;
        self.pending.push(Pending::EnumType {
            var: id,
            name: enum_name.to_string(),
        });
        Ok(id)
    }

    pub fn add_structure(&mut self, container: NodeId, name: &str) -> Result<NodeId> {
        self.add_variable(container, name, VariableKind::Structure { fields: Vec::new() })
    }

    pub fn add_sequence(&mut self, container: NodeId, name: &str) -> Result<NodeId> {
        self.add_variable(container, name, VariableKind::Sequence { fields: Vec::new() })
    }

    pub fn add_dim_ref(&mut self, var: NodeId, spec: DimSpec) -> Result<()> {
        let dim = match &spec {
            DimSpec::Size(size) => DimRef::Node(self.add_anonymous_dimension(*size)?),
            DimSpec::VarLength | DimSpec::Named(_) => DimRef::VarLength,
        };
        let v = self.variable_mut(var)?;
        let slot = v.dims.len();
        v.dims.push(dim);
        if let DimSpec::Named(name) = spec {
            self.pending.push(Pending::Dim { var, slot, name });
        }
        Ok(())
    }

    pub fn add_map(&mut self, var: NodeId, target: &str) -> Result<()> {
        self.variable_mut(var)?;
        self.pending.push(Pending::Map {
            var,
            name: target.to_string(),
        });
        Ok(())
    }

    pub fn add_attribute(&mut self, node: NodeId, attribute: DapAttribute) -> Result<()> {
        let name = attribute.name().to_string();
        let target = self.node_mut(node)?;
        if target.attributes.iter().any(|a| a.name() == name) {
            return Err(DapError::semantic(format!(
                "duplicate attribute '{name}'"
            )));
        }
        target.attributes.push(attribute);
        Ok(())
    }

    /// Resolve a type name as seen from `scope`: enumerations by absolute
    /// FQN, then relative to each enclosing group outward, then the atomic
    /// table.
    pub fn reify(&self, scope: NodeId, name: &str) -> Option<DapType> {
        if name.starts_with('/') {
            return self.registry.reify(name);
        }
        let mut group = Some(self.enclosing_group(scope));
        while let Some(g) = group {
            let candidate = format!("{}{}", group_prefix(&self.nodes, g), name);
            if let Some(ty) = self.registry.reify(&candidate) {
                if ty.is_enum_type() {
                    return Some(ty);
                }
            }
            group = self
                .node(g)
                .and_then(|n| n.parent)
                .map(|p| self.enclosing_group(p));
        }
        DapType::lookup(name)
    }

    /// Scope a map on `var` is checked against: the variable itself when it
    /// is a compound, otherwise its container.
    fn map_scope(&self, var: NodeId) -> Option<NodeId> {
        let node = self.node(var)?;
        if node.is_compound_variable() {
            Some(var)
        } else {
            node.parent
        }
    }

    /// Resolve pending references, validate, and freeze the schema.
    pub fn finish(mut self) -> Result<DapDataset> {
        if self.nodes[0].name().is_empty() {
            return Err(DapError::semantic("Dataset requires a name"));
        }
        if self.dap_version != DAP_VERSION || self.dmr_version != DMR_VERSION {
            return Err(DapError::semantic(format!(
                "version mismatch: dapVersion={} dmrVersion={} \
                 (supported {DAP_VERSION}/{DMR_VERSION})",
                self.dap_version, self.dmr_version
            )));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let NodeKind::Enumeration(e) = &node.kind {
                if e.constants.is_empty() {
                    return Err(DapError::semantic(format!(
                        "enumeration {} declares no constants",
                        crate::dmr::dataset::fqn_in(&self.nodes, NodeId::new(i))
                    )));
                }
            }
        }

        let pending = std::mem::take(&mut self.pending);
        let lookup = DapDataset::from_parts(
            self.nodes.clone(),
            self.dap_version.clone(),
            self.dmr_version.clone(),
        );
        for item in pending {
            match item {
                Pending::EnumType { var, name } => {
                    let ty = self
                        .reify(var, &name)
                        .filter(DapType::is_enum_type)
                        .ok_or_else(|| {
                            DapError::semantic(format!("undefined enumeration '{name}'"))
                        })?;
                    self.variable_mut(var)?.kind = VariableKind::Atomic(ty);
                }
                Pending::Dim { var, slot, name } => {
                    let dim = lookup
                        .resolve(Namespace::Dimension, &name, var)
                        .ok_or_else(|| {
                            DapError::semantic(format!("undefined dimension '{name}'"))
                        })?;
                    let v = self.variable_mut(var)?;
                    match v.dims.get_mut(slot) {
                        Some(d) => *d = DimRef::Node(dim),
                        None => return Err(DapError::internal("dimension slot out of range")),
                    }
                }
                Pending::Map { var, name } => {
                    let target = lookup
                        .resolve(Namespace::Variable, &name, var)
                        .ok_or_else(|| {
                            DapError::semantic(format!("undefined map target '{name}'"))
                        })?;
                    if lookup.node(target).is_compound_variable() {
                        return Err(DapError::semantic(format!(
                            "illegal map '{name}': target must be an atomic variable"
                        )));
                    }
                    let container = lookup.node(target).parent;
                    let container_is_compound = container
                        .map(|c| lookup.node(c).is_compound_variable())
                        .unwrap_or(false);
                    if container_is_compound && container == self.map_scope(var) {
                        return Err(DapError::semantic(format!(
                            "illegal map '{name}': target lies in the map's own container {}",
                            lookup.fqn(var)
                        )));
                    }
                    self.variable_mut(var)?.maps.push(target);
                }
            }
        }
        Ok(DapDataset::from_parts(
            self.nodes,
            self.dap_version,
            self.dmr_version,
        ))
    }
}
