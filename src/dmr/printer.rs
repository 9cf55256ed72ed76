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

//! Renders a [`DapDataset`] back into DMR text. The output parses to an
//! equivalent schema: references are written as absolute FQNs and anonymous
//! dimensions as size references.

use std::fmt::Write;

use quick_xml::escape::escape;

use crate::dmr::attribute::DapAttribute;
use crate::dmr::dataset::DapDataset;
use crate::dmr::node::{DapVariable, DimRef, NodeKind, VariableKind};
use crate::ids::NodeId;
use crate::types::DapType;

pub const DAP_NAMESPACE: &str = "http://xml.opendap.org/ns/DAP/4.0#";

pub fn print_dmr(dataset: &DapDataset) -> String {
    let mut printer = DmrPrinter {
        dataset,
        out: String::new(),
        depth: 0,
    };
    printer.print();
    printer.out
}

struct DmrPrinter<'a> {
    dataset: &'a DapDataset,
    out: String,
    depth: usize,
}

impl<'a> DmrPrinter<'a> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn print(&mut self) {
        let ds = self.dataset;
        self.out
            .push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.line(&format!(
            "<Dataset name=\"{}\" dapVersion=\"{}\" dmrVersion=\"{}\" xmlns=\"{DAP_NAMESPACE}\">",
            escape(ds.name()),
            escape(ds.dap_version()),
            escape(ds.dmr_version()),
        ));
        self.depth += 1;
        self.group_body(ds.root());
        self.depth -= 1;
        self.line("</Dataset>");
    }

    fn group_body(&mut self, group: NodeId) {
        let ds = self.dataset;
        for &decl in ds.decls(group) {
            let node = ds.node(decl);
            match &node.kind {
                NodeKind::Dimension(dim) if dim.shared => {
                    let head = format!(
                        "Dimension name=\"{}\" size=\"{}\"",
                        escape(node.name()),
                        dim.size
                    );
                    self.open_or_empty(&head, "Dimension", decl);
                }
                NodeKind::Dimension(_) => {}
                NodeKind::Enumeration(e) => {
                    self.line(&format!(
                        "<Enumeration name=\"{}\" basetype=\"{}\">",
                        escape(node.name()),
                        e.base
                    ));
                    self.depth += 1;
                    for c in &e.constants {
                        self.line(&format!(
                            "<EnumConst name=\"{}\" value=\"{}\"/>",
                            escape(&c.name),
                            c.value
                        ));
                    }
                    self.attributes(&node.attributes);
                    self.depth -= 1;
                    self.line("</Enumeration>");
                }
                NodeKind::Variable(var) => self.variable(decl, var),
                NodeKind::Group(_) => {
                    self.line(&format!("<Group name=\"{}\">", escape(node.name())));
                    self.depth += 1;
                    self.group_body(decl);
                    self.attributes(&node.attributes);
                    self.depth -= 1;
                    self.line("</Group>");
                }
                NodeKind::Dataset(_) => {}
            }
        }
        if group == ds.root() {
            self.attributes(&ds.node(group).attributes);
        }
    }

    /// Emit a self-closing element when the node has no attributes.
    fn open_or_empty(&mut self, head: &str, tag: &str, id: NodeId) {
        let attributes = &self.dataset.node(id).attributes;
        if attributes.is_empty() {
            self.line(&format!("<{head}/>"));
            return;
        }
        self.line(&format!("<{head}>"));
        self.depth += 1;
        self.attributes(attributes);
        self.depth -= 1;
        self.line(&format!("</{tag}>"));
    }

    fn variable(&mut self, id: NodeId, var: &DapVariable) {
        let ds = self.dataset;
        let node = ds.node(id);
        let name = escape(node.name());
        let (tag, head) = match &var.kind {
            VariableKind::Atomic(DapType::Enum { id: enum_id, .. }) => (
                "Enum".to_string(),
                format!("Enum name=\"{name}\" enum=\"{}\"", escape(&ds.fqn(*enum_id))),
            ),
            VariableKind::Atomic(ty) => {
                let tag = ty.type_sort().name().to_string();
                let head = format!("{tag} name=\"{name}\"");
                (tag, head)
            }
            VariableKind::Structure { .. } => {
                ("Structure".to_string(), format!("Structure name=\"{name}\""))
            }
            VariableKind::Sequence { .. } => {
                ("Sequence".to_string(), format!("Sequence name=\"{name}\""))
            }
        };
        if var.dims.is_empty()
            && var.maps.is_empty()
            && var.fields().is_empty()
            && node.attributes.is_empty()
        {
            self.line(&format!("<{head}/>"));
            return;
        }
        self.line(&format!("<{head}>"));
        self.depth += 1;
        for &field in var.fields() {
            if let Some(field_var) = ds.variable(field) {
                self.variable(field, field_var);
            }
        }
        for dim in &var.dims {
            let text = match dim {
                DimRef::VarLength => "<Dim size=\"*\"/>".to_string(),
                DimRef::Node(dim_id) => {
                    let dim_node = ds.node(*dim_id);
                    match dim_node.as_dimension() {
                        Some(d) if d.shared => {
                            format!("<Dim name=\"{}\"/>", escape(&ds.fqn(*dim_id)))
                        }
                        Some(d) => format!("<Dim size=\"{}\"/>", d.size),
                        None => continue,
                    }
                }
            };
            self.line(&text);
        }
        for &target in &var.maps {
            self.line(&format!("<Map name=\"{}\"/>", escape(&ds.fqn(target))));
        }
        self.attributes(&node.attributes);
        self.depth -= 1;
        self.line(&format!("</{tag}>"));
    }

    fn attributes(&mut self, attributes: &[DapAttribute]) {
        for attribute in attributes {
            self.attribute(attribute);
        }
    }

    fn attribute(&mut self, attribute: &DapAttribute) {
        match attribute {
            DapAttribute::Atomic(a) => {
                let type_name = match a.ty {
                    DapType::Enum { id, .. } => self.dataset.fqn(id),
                    ty => ty.type_sort().name().to_string(),
                };
                self.line(&format!(
                    "<Attribute name=\"{}\" type=\"{}\">",
                    escape(&a.name),
                    escape(&type_name)
                ));
                self.depth += 1;
                for ns in &a.namespaces {
                    self.line(&format!("<Namespace href=\"{}\"/>", escape(ns)));
                }
                for value in &a.values {
                    self.line(&format!("<Value value=\"{}\"/>", escape(value)));
                }
                self.depth -= 1;
                self.line("</Attribute>");
            }
            DapAttribute::Container(c) => {
                self.line(&format!(
                    "<Attribute name=\"{}\" type=\"Container\">",
                    escape(&c.name)
                ));
                self.depth += 1;
                for ns in &c.namespaces {
                    self.line(&format!("<Namespace href=\"{}\"/>", escape(ns)));
                }
                self.attributes(&c.attributes);
                self.depth -= 1;
                self.line("</Attribute>");
            }
            DapAttribute::OtherXml(x) => {
                let mut head = format!("OtherXML name=\"{}\"", escape(&x.name));
                if let Some(href) = &x.href {
                    let _ = write!(head, " href=\"{}\"", escape(href));
                }
                self.line(&format!("<{head}>{}</OtherXML>", x.content));
            }
        }
    }
}
