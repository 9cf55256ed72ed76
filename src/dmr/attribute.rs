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

//! Schema attributes.
//!
//! Attributes are metadata attached to any schema node. They nest: a
//! container attribute holds further attributes, and an OtherXML attribute
//! carries foreign markup that is kept verbatim.

use serde::{Deserialize, Serialize};

use crate::types::DapType;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DapAttribute {
    Atomic(AtomicAttribute),
    Container(ContainerAttribute),
    OtherXml(OtherXmlAttribute),
}

/// A typed attribute holding one or more values in their textual form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtomicAttribute {
    pub name: String,
    pub ty: DapType,
    pub values: Vec<String>,
    pub namespaces: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerAttribute {
    pub name: String,
    pub attributes: Vec<DapAttribute>,
    pub namespaces: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OtherXmlAttribute {
    pub name: String,
    pub href: Option<String>,
    /// Raw markup of the element's children.
    pub content: String,
}

impl DapAttribute {
    pub fn atomic(name: impl Into<String>, ty: DapType, values: Vec<String>) -> Self {
        DapAttribute::Atomic(AtomicAttribute {
            name: name.into(),
            ty,
            values,
            namespaces: Vec::new(),
        })
    }

    pub fn container(name: impl Into<String>) -> Self {
        DapAttribute::Container(ContainerAttribute {
            name: name.into(),
            ..Default::default()
        })
    }

    pub fn name(&self) -> &str {
        match self {
            DapAttribute::Atomic(a) => &a.name,
            DapAttribute::Container(c) => &c.name,
            DapAttribute::OtherXml(x) => &x.name,
        }
    }

    pub fn namespaces_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            DapAttribute::Atomic(a) => Some(&mut a.namespaces),
            DapAttribute::Container(c) => Some(&mut c.namespaces),
            DapAttribute::OtherXml(_) => None,
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            DapAttribute::Atomic(a) => &a.values,
            DapAttribute::Container(_) | DapAttribute::OtherXml(_) => &[],
        }
    }

    /// Find a direct child of a container attribute.
    pub fn child(&self, name: &str) -> Option<&DapAttribute> {
        match self {
            DapAttribute::Container(c) => c.attributes.iter().find(|a| a.name() == name),
            DapAttribute::Atomic(_) | DapAttribute::OtherXml(_) => None,
        }
    }
}

/// Look an attribute up by name in a flat attribute list.
pub fn find_attribute<'a>(attributes: &'a [DapAttribute], name: &str) -> Option<&'a DapAttribute> {
    attributes.iter().find(|a| a.name() == name)
}
