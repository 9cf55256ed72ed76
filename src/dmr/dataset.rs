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

//! The finished, immutable schema.
//!
//! A [`DapDataset`] owns every schema node in an arena and answers
//! navigation queries by [`NodeId`]. It is produced only by
//! [`crate::dmr::DmrBuilder::finish`] and never mutated afterwards, so one
//! dataset may be shared by any number of concurrent decodes.

use std::collections::HashMap;

use crate::dmr::node::{
    DapDimension, DapEnumeration, DapNode, DapVariable, DimRef, Namespace, NodeKind,
};
use crate::ids::NodeId;
use crate::types::DapType;

/// DAP protocol version this crate speaks.
pub const DAP_VERSION: &str = "4.0";
/// DMR document version this crate speaks.
pub const DMR_VERSION: &str = "1.0";

#[derive(Clone, Debug)]
pub struct DapDataset {
    nodes: Vec<DapNode>,
    dap_version: String,
    dmr_version: String,
    top_variables: Vec<NodeId>,
    index: HashMap<(Namespace, String), NodeId>,
}

impl DapDataset {
    pub(crate) fn from_parts(
        nodes: Vec<DapNode>,
        dap_version: String,
        dmr_version: String,
    ) -> Self {
        let mut dataset = DapDataset {
            nodes,
            dap_version,
            dmr_version,
            top_variables: Vec::new(),
            index: HashMap::new(),
        };
        dataset.top_variables = dataset.collect_top_variables();
        dataset.index = dataset.build_index();
        dataset
    }

    /// Variables declared directly in a group, walking groups depth-first in
    /// document order. This is the wire order of a DAP response.
    fn collect_top_variables(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk_group_order(NodeId::ROOT, &mut out);
        out
    }

    fn walk_group_order(&self, group: NodeId, out: &mut Vec<NodeId>) {
        for &decl in self.decls(group) {
            match &self.node(decl).kind {
                NodeKind::Variable(_) => out.push(decl),
                NodeKind::Group(_) => self.walk_group_order(decl, out),
                _ => {}
            }
        }
    }

    fn build_index(&self) -> HashMap<(Namespace, String), NodeId> {
        let mut index = HashMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if node.name.is_none() {
                continue;
            }
            let id = NodeId::new(i);
            index.entry((node.namespace(), self.fqn(id))).or_insert(id);
        }
        index
    }

    pub fn name(&self) -> &str {
        self.node(NodeId::ROOT).name()
    }

    pub fn dap_version(&self) -> &str {
        &self.dap_version
    }

    pub fn dmr_version(&self) -> &str {
        &self.dmr_version
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Panics if `id` was minted by another dataset and is out of range.
    pub fn node(&self, id: NodeId) -> &DapNode {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&DapNode> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &DapNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId::new(i), node))
    }

    pub fn variable(&self, id: NodeId) -> Option<&DapVariable> {
        self.get(id).and_then(DapNode::as_variable)
    }

    pub fn dimension(&self, id: NodeId) -> Option<&DapDimension> {
        self.get(id).and_then(DapNode::as_dimension)
    }

    pub fn enumeration(&self, id: NodeId) -> Option<&DapEnumeration> {
        self.get(id).and_then(DapNode::as_enumeration)
    }

    /// The enumeration declared by `id`, if any, as a type.
    pub fn enum_type(&self, id: NodeId) -> Option<DapType> {
        self.enumeration(id).map(|e| DapType::Enum { id, base: e.base })
    }

    /// Declarations of a group, or nothing for other node kinds.
    pub fn decls(&self, group: NodeId) -> &[NodeId] {
        self.get(group)
            .and_then(DapNode::as_group)
            .map(|g| g.decls.as_slice())
            .unwrap_or(&[])
    }

    pub fn fields(&self, var: NodeId) -> &[NodeId] {
        self.variable(var).map(DapVariable::fields).unwrap_or(&[])
    }

    pub fn top_variables(&self) -> &[NodeId] {
        &self.top_variables
    }

    pub fn is_top_level(&self, var: NodeId) -> bool {
        self.variable(var).is_some()
            && self
                .get(var)
                .and_then(|n| n.parent)
                .map(|p| self.node(p).is_group_like())
                .unwrap_or(false)
    }

    /// Nearest group (or the root) containing `id`, `id` itself if a group.
    pub fn enclosing_group(&self, id: NodeId) -> NodeId {
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.node(cur);
            if node.is_group_like() {
                return cur;
            }
            current = node.parent;
        }
        NodeId::ROOT
    }

    pub fn fqn(&self, id: NodeId) -> String {
        fqn_in(&self.nodes, id)
    }

    pub fn find(&self, namespace: Namespace, fqn: &str) -> Option<NodeId> {
        self.index.get(&(namespace, fqn.to_string())).copied()
    }

    pub fn find_variable(&self, fqn: &str) -> Option<NodeId> {
        self.find(Namespace::Variable, fqn)
    }

    pub fn find_dimension(&self, fqn: &str) -> Option<NodeId> {
        self.find(Namespace::Dimension, fqn)
    }

    pub fn find_enumeration(&self, fqn: &str) -> Option<NodeId> {
        self.find(Namespace::Enumeration, fqn)
    }

    pub fn find_group(&self, fqn: &str) -> Option<NodeId> {
        self.find(Namespace::Group, fqn)
    }

    /// Resolve `name` as seen from `scope`: absolute names directly, relative
    /// names against the nearest enclosing group and then outward.
    pub fn resolve(&self, namespace: Namespace, name: &str, scope: NodeId) -> Option<NodeId> {
        if name.starts_with('/') {
            return self.find(namespace, name);
        }
        let mut group = Some(self.enclosing_group(scope));
        while let Some(g) = group {
            let candidate = format!("{}{}", group_prefix(&self.nodes, g), name);
            if let Some(found) = self.find(namespace, &candidate) {
                return Some(found);
            }
            group = self.node(g).parent.map(|p| self.enclosing_group(p));
        }
        None
    }

    /// Sizes of a variable's dimensions; `None` marks a variable-length one.
    pub fn dim_sizes(&self, var: NodeId) -> Vec<Option<u64>> {
        self.variable(var)
            .map(|v| {
                v.dims
                    .iter()
                    .map(|d| match d {
                        DimRef::Node(id) => self.dimension(*id).map(|dim| dim.size),
                        DimRef::VarLength => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Product of dimension sizes (1 for scalars). `None` when any dimension
    /// is variable-length.
    pub fn dim_product(&self, var: NodeId) -> Option<u64> {
        self.dim_sizes(var)
            .into_iter()
            .try_fold(1u64, |acc, size| size.map(|s| acc.saturating_mul(s)))
    }
}

/// Path prefix under which a group's members are named: `/` for the root,
/// `/g/` for a group `g`.
pub(crate) fn group_prefix(nodes: &[DapNode], group: NodeId) -> String {
    if group == NodeId::ROOT {
        return "/".to_string();
    }
    format!("{}/", fqn_in(nodes, group))
}

pub(crate) fn fqn_in(nodes: &[DapNode], id: NodeId) -> String {
    let node = &nodes[id.index()];
    let Some(parent) = node.parent else {
        return "/".to_string();
    };
    let parent_node = &nodes[parent.index()];
    if parent_node.is_group_like() {
        format!("{}{}", group_prefix(nodes, parent), node.name())
    } else {
        format!("{}.{}", fqn_in(nodes, parent), node.name())
    }
}
