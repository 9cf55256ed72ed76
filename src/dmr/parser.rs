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

//! # DMR Parser
//!
//! Turns a DMR document into a [`DapDataset`], or into an [`ErrorResponse`]
//! when the document is a DAP4 `<Error>`.
//!
//! The XML is tokenized by `quick-xml`; this module interprets the event
//! stream against the DMR grammar. State lives in an explicit stack of
//! [`Scope`] entries: every element pushes one when it opens and pops it
//! when it closes, and reductions (attaching an attribute, a value, a
//! dimension reference) happen against whatever scope is on top. Nothing
//! about the walk depends on the host call stack.
//!
//! Any violation aborts the parse and no partial schema escapes.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::config::DmrParserConfig;
use crate::dmr::attribute::{DapAttribute, OtherXmlAttribute};
use crate::dmr::builder::{DimSpec, DmrBuilder};
use crate::dmr::dataset::{DapDataset, DAP_VERSION, DMR_VERSION};
use crate::errors::{DapError, Result};
use crate::ids::NodeId;
use crate::types::{DapType, TypeSort};

/// A DAP4 `<Error>` document. Receiving one is a normal outcome of a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub http_code: u16,
    pub message: Option<String>,
    pub context: Option<String>,
    pub other_info: Option<String>,
}

impl Default for ErrorResponse {
    fn default() -> Self {
        ErrorResponse {
            http_code: 400,
            message: None,
            context: None,
            other_info: None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum DmrResponse {
    Dataset(DapDataset),
    Error(ErrorResponse),
}

impl DmrResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, DmrResponse::Error(_))
    }

    pub fn dataset(&self) -> Option<&DapDataset> {
        match self {
            DmrResponse::Dataset(ds) => Some(ds),
            DmrResponse::Error(_) => None,
        }
    }

    /// Unwrap the dataset, turning a protocol error into a semantic error.
    pub fn into_dataset(self) -> Result<DapDataset> {
        match self {
            DmrResponse::Dataset(ds) => Ok(ds),
            DmrResponse::Error(err) => Err(DapError::semantic(format!(
                "server returned error {}: {}",
                err.http_code,
                err.message.unwrap_or_default()
            ))),
        }
    }
}

/// Parse a DMR document with the default configuration.
pub fn parse_dmr(document: &str) -> Result<DmrResponse> {
    DmrParser::new(DmrParserConfig::default()).parse(document)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ErrorField {
    Message,
    Context,
    OtherInformation,
}

#[derive(Debug)]
enum Scope {
    /// A schema node: Dataset, Group, Dimension, Enumeration or a variable.
    Node { id: NodeId, tag: String },
    /// Elements with no content of interest: Dim, Map, EnumConst, Namespace.
    Leaf { tag: &'static str },
    Attribute(DapAttribute),
    Value { text: String, from_attr: bool },
    OtherXml { attr: OtherXmlAttribute, depth: usize },
    Error(ErrorResponse),
    ErrorText { field: ErrorField, text: String },
}

impl Scope {
    fn tag(&self) -> &str {
        match self {
            Scope::Node { tag, .. } => tag,
            Scope::Leaf { tag } => tag,
            Scope::Attribute(_) => "Attribute",
            Scope::Value { .. } => "Value",
            Scope::OtherXml { .. } => "OtherXML",
            Scope::Error(_) => "Error",
            Scope::ErrorText { field, .. } => match field {
                ErrorField::Message => "Message",
                ErrorField::Context => "Context",
                ErrorField::OtherInformation => "OtherInformation",
            },
        }
    }
}

/// XML attributes of one element, keys lowercased.
struct XmlAttrs(Vec<(String, String)>);

impl XmlAttrs {
    fn read(element: &BytesStart<'_>) -> Result<Self> {
        let mut out = Vec::new();
        for attr in element.attributes() {
            let attr = attr.map_err(|err| DapError::grammar(err.to_string(), "attribute list"))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_ascii_lowercase();
            let value = attr.unescape_value()?.into_owned();
            out.push((key, value));
        }
        Ok(XmlAttrs(out))
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn name(&self, element: &str) -> Result<String> {
        match self.get("name") {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(DapError::semantic(format!("<{element}> requires a name"))),
        }
    }
}

/// Parse an unbounded decimal literal and keep its low 64 bits.
pub(crate) fn parse_masked_u64(text: &str) -> Option<u64> {
    let text = text.trim();
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude = digits
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(10).wrapping_add((b - b'0') as u64));
    Some(if negative { magnitude.wrapping_neg() } else { magnitude })
}

fn parse_positive_size(text: &str, what: &str) -> Result<u64> {
    match text.trim().parse::<u64>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(DapError::semantic(format!(
            "{what} size must be a positive integer: '{text}'"
        ))),
    }
}

#[derive(Debug, Clone, Default)]
pub struct DmrParser {
    config: DmrParserConfig,
}

impl DmrParser {
    pub fn new(config: DmrParserConfig) -> Self {
        DmrParser { config }
    }

    pub fn parse(&self, document: &str) -> Result<DmrResponse> {
        log::debug!("parsing DMR document ({} bytes)", document.len());
        let mut reader = Reader::from_str(document);
        let xml = reader.config_mut();
        xml.trim_text(true);
        // Closing tags are matched against the scope stack in `close`.
        xml.check_end_names = false;
        let mut state = ParseState::new(&self.config);

        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|err| DapError::grammar(err.to_string(), format!("byte {position}")))?;
            match event {
                Event::Start(e) => {
                    let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if state.capturing() {
                        state.capture_start(&e, false);
                    } else {
                        state.open(&tag, &e)?;
                    }
                }
                Event::Empty(e) => {
                    let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if state.capturing() {
                        state.capture_start(&e, true);
                    } else {
                        state.open(&tag, &e)?;
                        state.close(&tag)?;
                    }
                }
                Event::End(e) => {
                    let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if state.capture_end(&e.name().as_ref().to_vec()) {
                        continue;
                    }
                    state.close(&tag)?;
                }
                Event::Text(t) => {
                    if state.capturing() {
                        state.capture_raw(&String::from_utf8_lossy(&t));
                    } else {
                        state.text(&t.unescape()?)?;
                    }
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c).into_owned();
                    if state.capturing() {
                        state.capture_raw(&format!("<![CDATA[{text}]]>"));
                    } else {
                        state.text(&text)?;
                    }
                }
                Event::Eof => break,
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
        }

        let response = state.into_response()?;
        match &response {
            DmrResponse::Dataset(ds) => log::debug!(
                "parsed DMR dataset '{}' with {} nodes and {} top-level variables",
                ds.name(),
                ds.len(),
                ds.top_variables().len()
            ),
            DmrResponse::Error(err) => log::debug!("parsed DMR error response ({})", err.http_code),
        }
        Ok(response)
    }
}

struct ParseState<'c> {
    config: &'c DmrParserConfig,
    builder: Option<DmrBuilder>,
    scopes: Vec<Scope>,
    error: Option<ErrorResponse>,
    finished: bool,
}

impl<'c> ParseState<'c> {
    fn new(config: &'c DmrParserConfig) -> Self {
        ParseState {
            config,
            builder: None,
            scopes: Vec::new(),
            error: None,
            finished: false,
        }
    }

    fn push(&mut self, scope: Scope) {
        if self.config.trace {
            log::trace!("push <{}> at depth {}", scope.tag(), self.scopes.len());
        }
        self.scopes.push(scope);
    }

    fn builder(&mut self) -> Result<&mut DmrBuilder> {
        self.builder
            .as_mut()
            .ok_or_else(|| DapError::grammar("element outside <Dataset>", "document"))
    }

    /// Innermost schema node on the stack.
    fn current_node(&self) -> Option<NodeId> {
        self.scopes.iter().rev().find_map(|s| match s {
            Scope::Node { id, .. } => Some(*id),
            _ => None,
        })
    }

    /// Node on top of the stack, if the top is a schema node.
    fn top_node(&self) -> Option<NodeId> {
        match self.scopes.last() {
            Some(Scope::Node { id, .. }) => Some(*id),
            _ => None,
        }
    }

    fn top_group(&self) -> Result<NodeId> {
        let id = self.top_node();
        let is_group = match (id, self.builder.as_ref()) {
            (Some(id), Some(b)) => b.node(id).map(|n| n.is_group_like()).unwrap_or(false),
            _ => false,
        };
        match id {
            Some(id) if is_group => Ok(id),
            _ => Err(DapError::grammar(
                "declaration must appear directly inside <Dataset> or <Group>",
                self.location(),
            )),
        }
    }

    fn top_container(&self) -> Result<NodeId> {
        let id = self.top_node();
        let legal = match (id, self.builder.as_ref()) {
            (Some(id), Some(b)) => b
                .node(id)
                .map(|n| n.is_group_like() || n.is_compound_variable())
                .unwrap_or(false),
            _ => false,
        };
        match id {
            Some(id) if legal => Ok(id),
            _ => Err(DapError::grammar(
                "variable must appear inside a group, Structure or Sequence",
                self.location(),
            )),
        }
    }

    fn top_variable(&self) -> Result<NodeId> {
        let id = self.top_node();
        let legal = match (id, self.builder.as_ref()) {
            (Some(id), Some(b)) => b.node(id).and_then(|n| n.as_variable()).is_some(),
            _ => false,
        };
        match id {
            Some(id) if legal => Ok(id),
            _ => Err(DapError::grammar("element must appear inside a variable", self.location())),
        }
    }

    fn location(&self) -> String {
        let path: Vec<&str> = self.scopes.iter().map(Scope::tag).collect();
        format!("/{}", path.join("/"))
    }

    fn capturing(&self) -> bool {
        matches!(self.scopes.last(), Some(Scope::OtherXml { .. }))
    }

    fn capture_raw(&mut self, raw: &str) {
        if let Some(Scope::OtherXml { attr, .. }) = self.scopes.last_mut() {
            attr.content.push_str(raw);
        }
    }

    fn capture_start(&mut self, element: &BytesStart<'_>, empty: bool) {
        let raw = String::from_utf8_lossy(element).into_owned();
        if let Some(Scope::OtherXml { attr, depth }) = self.scopes.last_mut() {
            if empty {
                attr.content.push_str(&format!("<{raw}/>"));
            } else {
                attr.content.push_str(&format!("<{raw}>"));
                *depth += 1;
            }
        }
    }

    /// Returns true when the end tag belonged to captured foreign markup.
    fn capture_end(&mut self, name: &[u8]) -> bool {
        if let Some(Scope::OtherXml { attr, depth }) = self.scopes.last_mut() {
            if *depth > 0 {
                *depth -= 1;
                attr.content
                    .push_str(&format!("</{}>", String::from_utf8_lossy(name)));
                return true;
            }
        }
        false
    }

    fn open(&mut self, tag: &str, element: &BytesStart<'_>) -> Result<()> {
        if self.finished {
            return Err(DapError::grammar(
                format!("content after document root: <{tag}>"),
                "document",
            ));
        }
        let attrs = XmlAttrs::read(element)?;
        if self.scopes.is_empty() {
            return self.open_root(tag, &attrs);
        }
        match tag {
            "Group" => {
                let parent = self.top_group()?;
                let name = attrs.name(tag)?;
                let id = self.builder()?.add_group(parent, &name)?;
                self.push(Scope::Node { id, tag: tag.to_string() });
            }
            "Dimension" => {
                let group = self.top_group()?;
                let name = attrs.name(tag)?;
                let size = attrs
                    .get("size")
                    .ok_or_else(|| {
                        DapError::semantic(format!("dimension '{name}' requires a size"))
                    })?;
                let size = parse_positive_size(size, "dimension")?;
                let id = self.builder()?.add_dimension(group, &name, size)?;
                self.push(Scope::Node { id, tag: tag.to_string() });
            }
            "Enumeration" => {
                let group = self.top_group()?;
                let name = attrs.name(tag)?;
                let base = match attrs.get("basetype") {
                    Some(base) => TypeSort::from_name(base).ok_or_else(|| {
                        DapError::semantic(format!("unknown enumeration base type '{base}'"))
                    })?,
                    None => TypeSort::UInt32,
                };
                let id = self.builder()?.add_enumeration(group, &name, base)?;
                self.push(Scope::Node { id, tag: tag.to_string() });
            }
            "EnumConst" => {
                let enumeration = match (self.top_node(), self.builder.as_ref()) {
                    (Some(id), Some(b))
                        if b.node(id).and_then(|n| n.as_enumeration()).is_some() =>
                    {
                        id
                    }
                    _ => {
                        return Err(DapError::grammar(
                            "<EnumConst> outside <Enumeration>",
                            self.location(),
                        ))
                    }
                };
                let name = attrs.name(tag)?;
                let literal = attrs
                    .get("value")
                    .ok_or_else(|| {
                        DapError::semantic(format!("constant '{name}' requires a value"))
                    })?;
                let value = parse_masked_u64(literal).ok_or_else(|| {
                    DapError::semantic(format!("illegal enumeration constant value '{literal}'"))
                })?;
                self.builder()?.add_enum_const(enumeration, &name, value)?;
                self.push(Scope::Leaf { tag: "EnumConst" });
            }
            "Structure" | "Sequence" => {
                let container = self.top_container()?;
                let name = attrs.name(tag)?;
                let builder = self.builder()?;
                let id = if tag == "Structure" {
                    builder.add_structure(container, &name)?
                } else {
                    builder.add_sequence(container, &name)?
                };
                self.push(Scope::Node { id, tag: tag.to_string() });
            }
            "Enum" => {
                let container = self.top_container()?;
                let name = attrs.name(tag)?;
                let enum_name = attrs
                    .get("enum")
                    .ok_or_else(|| {
                        DapError::semantic(format!("<Enum> '{name}' requires an enum attribute"))
                    })?
                    .to_string();
                let id = self.builder()?.add_enum_variable(container, &name, &enum_name)?;
                self.push(Scope::Node { id, tag: tag.to_string() });
            }
            "Dim" => {
                let var = self.top_variable()?;
                let spec = match (attrs.get("name"), attrs.get("size")) {
                    (Some(name), None) => DimSpec::Named(name.to_string()),
                    (None, Some("*")) => DimSpec::VarLength,
                    (None, Some(size)) => DimSpec::Size(parse_positive_size(size, "dimension")?),
                    _ => {
                        return Err(DapError::semantic(
                            "<Dim> requires exactly one of name or size",
                        ))
                    }
                };
                self.builder()?.add_dim_ref(var, spec)?;
                self.push(Scope::Leaf { tag: "Dim" });
            }
            "Map" => {
                let var = self.top_variable()?;
                let name = attrs.name(tag)?;
                self.builder()?.add_map(var, &name)?;
                self.push(Scope::Leaf { tag: "Map" });
            }
            "Attribute" => self.open_attribute(&attrs)?,
            "Value" => {
                let literal = attrs.get("value").map(str::to_string);
                match self.scopes.last_mut() {
                    Some(Scope::Attribute(DapAttribute::Atomic(attr))) => {
                        if let Some(value) = &literal {
                            attr.values.push(value.clone());
                        }
                    }
                    _ => {
                        return Err(DapError::grammar(
                            "<Value> outside an atomic <Attribute>",
                            self.location(),
                        ))
                    }
                }
                self.push(Scope::Value {
                    text: String::new(),
                    from_attr: literal.is_some(),
                });
            }
            "Namespace" => {
                let href = attrs
                    .get("href")
                    .ok_or_else(|| DapError::semantic("<Namespace> requires an href"))?
                    .to_string();
                match self.scopes.last_mut().and_then(|s| match s {
                    Scope::Attribute(attr) => attr.namespaces_mut(),
                    _ => None,
                }) {
                    Some(namespaces) => namespaces.push(href),
                    None => {
                        return Err(DapError::grammar(
                            "<Namespace> outside <Attribute>",
                            self.location(),
                        ))
                    }
                }
                self.push(Scope::Leaf { tag: "Namespace" });
            }
            "OtherXML" => {
                self.check_attribute_owner()?;
                let name = attrs.name(tag)?;
                self.push(Scope::OtherXml {
                    attr: OtherXmlAttribute {
                        name,
                        href: attrs.get("href").map(str::to_string),
                        content: String::new(),
                    },
                    depth: 0,
                });
            }
            "Message" | "Context" | "OtherInformation" => {
                if !matches!(self.scopes.last(), Some(Scope::Error(_))) {
                    return Err(DapError::grammar(
                        format!("<{tag}> outside <Error>"),
                        self.location(),
                    ));
                }
                let field = match tag {
                    "Message" => ErrorField::Message,
                    "Context" => ErrorField::Context,
                    _ => ErrorField::OtherInformation,
                };
                self.push(Scope::ErrorText {
                    field,
                    text: String::new(),
                });
            }
            other => match TypeSort::from_name(other) {
                Some(sort) if sort.is_atomic() => {
                    let container = self.top_container()?;
                    let name = attrs.name(other)?;
                    let id = self.builder()?.add_atomic_variable(
                        container,
                        &name,
                        DapType::Atomic(sort),
                    )?;
                    self.push(Scope::Node { id, tag: other.to_string() });
                }
                _ => {
                    return Err(DapError::grammar(
                        format!("unexpected element <{other}>"),
                        self.location(),
                    ))
                }
            },
        }
        Ok(())
    }

    fn open_root(&mut self, tag: &str, attrs: &XmlAttrs) -> Result<()> {
        match tag {
            "Dataset" => {
                let name = attrs.name(tag)?;
                let dap_version = attrs.get("dapversion");
                let dmr_version = attrs.get("dmrversion");
                let missing_version = dap_version.is_none() || dmr_version.is_none();
                if self.config.require_versions && missing_version {
                    return Err(DapError::semantic(
                        "<Dataset> must declare dapVersion and dmrVersion",
                    ));
                }
                let mut builder = DmrBuilder::new(name);
                builder.set_versions(
                    dap_version.unwrap_or(DAP_VERSION),
                    dmr_version.unwrap_or(DMR_VERSION),
                );
                let root = builder.root();
                self.builder = Some(builder);
                self.push(Scope::Node {
                    id: root,
                    tag: tag.to_string(),
                });
                Ok(())
            }
            "Error" => {
                let mut response = ErrorResponse::default();
                if let Some(code) = attrs.get("httpcode") {
                    response.http_code = code.trim().parse().map_err(|_| {
                        DapError::semantic(format!("illegal httpcode '{code}'"))
                    })?;
                }
                self.push(Scope::Error(response));
                Ok(())
            }
            other => Err(DapError::grammar(
                format!("document must start with <Dataset> or <Error>, found <{other}>"),
                "document",
            )),
        }
    }

    fn check_attribute_owner(&self) -> Result<()> {
        match self.scopes.last() {
            Some(Scope::Node { .. }) | Some(Scope::Attribute(DapAttribute::Container(_))) => Ok(()),
            _ => Err(DapError::grammar(
                "attribute must be attached to a schema node or container attribute",
                self.location(),
            )),
        }
    }

    fn open_attribute(&mut self, attrs: &XmlAttrs) -> Result<()> {
        self.check_attribute_owner()?;
        let name = attrs.name("Attribute")?;
        let type_name = attrs.get("type").unwrap_or("Int32");
        let attribute = if type_name.eq_ignore_ascii_case("container")
            || type_name.eq_ignore_ascii_case("structure")
        {
            DapAttribute::container(name)
        } else {
            let scope = self.current_node().unwrap_or(NodeId::ROOT);
            let ty = self
                .builder()?
                .reify(scope, type_name)
                .ok_or_else(|| {
                    DapError::semantic(format!("unknown attribute type '{type_name}'"))
                })?;
            if !ty.is_legal_attr_type() {
                return Err(DapError::semantic(format!(
                    "illegal attribute type '{type_name}' for attribute '{name}'"
                )));
            }
            let values = attrs.get("value").map(|v| vec![v.to_string()]).unwrap_or_default();
            DapAttribute::atomic(name, ty, values)
        };
        self.push(Scope::Attribute(attribute));
        Ok(())
    }

    fn attach_attribute(&mut self, attribute: DapAttribute) -> Result<()> {
        match self.scopes.last_mut() {
            Some(Scope::Attribute(DapAttribute::Container(container))) => {
                if container.attributes.iter().any(|a| a.name() == attribute.name()) {
                    return Err(DapError::semantic(format!(
                        "duplicate attribute '{}'",
                        attribute.name()
                    )));
                }
                container.attributes.push(attribute);
                Ok(())
            }
            Some(Scope::Node { id, .. }) => {
                let id = *id;
                self.builder()?.add_attribute(id, attribute)
            }
            _ => Err(DapError::internal("attribute lost its owner")),
        }
    }

    fn close(&mut self, tag: &str) -> Result<()> {
        let scope = self
            .scopes
            .pop()
            .ok_or_else(|| DapError::grammar(format!("unbalanced </{tag}>"), "document"))?;
        if self.config.trace {
            log::trace!("pop <{}> at depth {}", scope.tag(), self.scopes.len());
        }
        if scope.tag() != tag {
            return Err(DapError::semantic(format!(
                "closing </{tag}> does not match opening <{}>",
                scope.tag()
            )));
        }
        match scope {
            Scope::Node { .. } | Scope::Leaf { .. } => {}
            Scope::Attribute(attribute) => {
                if let DapAttribute::Atomic(atomic) = &attribute {
                    if atomic.values.is_empty() {
                        return Err(DapError::semantic(format!(
                            "attribute '{}' has no values",
                            atomic.name
                        )));
                    }
                }
                self.attach_attribute(attribute)?;
            }
            Scope::OtherXml { attr, .. } => self.attach_attribute(DapAttribute::OtherXml(attr))?,
            Scope::Value { text, from_attr } => {
                if !from_attr {
                    if let Some(Scope::Attribute(DapAttribute::Atomic(attr))) =
                        self.scopes.last_mut()
                    {
                        attr.values.push(text);
                    }
                }
            }
            Scope::ErrorText { field, text } => {
                if let Some(Scope::Error(response)) = self.scopes.last_mut() {
                    let slot = match field {
                        ErrorField::Message => &mut response.message,
                        ErrorField::Context => &mut response.context,
                        ErrorField::OtherInformation => &mut response.other_info,
                    };
                    *slot = Some(text);
                }
            }
            Scope::Error(response) => self.error = Some(response),
        }
        if self.scopes.is_empty() {
            self.finished = true;
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        match self.scopes.last_mut() {
            Some(Scope::Value { text: buf, from_attr }) => {
                if *from_attr && !text.trim().is_empty() {
                    return Err(DapError::semantic(
                        "<Value> has both a value attribute and text content",
                    ));
                }
                buf.push_str(text);
            }
            Some(Scope::ErrorText { text: buf, .. }) => buf.push_str(text),
            _ => {
                if !text.trim().is_empty() {
                    log::warn!("ignoring stray text in DMR at {}", self.location());
                }
            }
        }
        Ok(())
    }

    fn into_response(self) -> Result<DmrResponse> {
        if !self.scopes.is_empty() {
            return Err(DapError::grammar(
                "unexpected end of document",
                self.location(),
            ));
        }
        if let Some(error) = self.error {
            return Ok(DmrResponse::Error(error));
        }
        match self.builder {
            Some(builder) => Ok(DmrResponse::Dataset(builder.finish()?)),
            None => Err(DapError::grammar(
                "document contains neither <Dataset> nor <Error>",
                "document",
            )),
        }
    }
}
