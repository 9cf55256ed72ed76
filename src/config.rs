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

//! Configuration for the DMR parser and the data compiler.
//!
//! Both halves have sensible defaults. A [`DapConfigBuilder`] holds only the
//! fields a caller cares about and fills the rest from [`DapConfig::default`],
//! which is also how JSON and YAML documents are loaded: every key is
//! optional.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checksum::ChecksumMode;
use crate::errors::{DapError, Result};

/// Byte order of the serialized data. DAP4 responses declare it in the
/// chunk header; little-endian is the protocol default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmrParserConfig {
    /// Reject a `<Dataset>` that omits `dapVersion` or `dmrVersion`.
    pub require_versions: bool,
    /// Emit `log::trace!` records for every scope push and pop.
    pub trace: bool,
}

impl Default for DmrParserConfig {
    fn default() -> Self {
        DmrParserConfig {
            require_versions: false,
            trace: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    pub checksum_mode: ChecksumMode,
    pub byte_order: ByteOrder,
    /// Recompute each variable's CRC32 and fail on mismatch.
    pub verify_checksums: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            checksum_mode: ChecksumMode::Dap,
            byte_order: ByteOrder::Little,
            verify_checksums: false,
        }
    }
}

impl CompileOptions {
    pub fn new(checksum_mode: ChecksumMode, byte_order: ByteOrder) -> Self {
        CompileOptions {
            checksum_mode,
            byte_order,
            verify_checksums: false,
        }
    }

    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DapConfig {
    pub parser: DmrParserConfig,
    pub compile: CompileOptions,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DapConfigBuilder {
    pub require_versions: Option<bool>,
    pub trace: Option<bool>,
    pub checksum_mode: Option<ChecksumMode>,
    pub byte_order: Option<ByteOrder>,
    pub verify_checksums: Option<bool>,
}

impl DapConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_versions(mut self, value: bool) -> Self {
        self.require_versions = Some(value);
        self
    }

    pub fn trace(mut self, value: bool) -> Self {
        self.trace = Some(value);
        self
    }

    pub fn checksum_mode(mut self, mode: ChecksumMode) -> Self {
        self.checksum_mode = Some(mode);
        self
    }

    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = Some(order);
        self
    }

    pub fn verify_checksums(mut self, value: bool) -> Self {
        self.verify_checksums = Some(value);
        self
    }

    pub fn build(self) -> DapConfig {
        let base = DapConfig::default();
        DapConfig {
            parser: DmrParserConfig {
                require_versions: self
                    .require_versions
                    .unwrap_or(base.parser.require_versions),
                trace: self.trace.unwrap_or(base.parser.trace),
            },
            compile: CompileOptions {
                checksum_mode: self.checksum_mode.unwrap_or(base.compile.checksum_mode),
                byte_order: self.byte_order.unwrap_or(base.compile.byte_order),
                verify_checksums: self
                    .verify_checksums
                    .unwrap_or(base.compile.verify_checksums),
            },
        }
    }

    pub fn from_json(value: &Value) -> Result<DapConfig> {
        let builder: DapConfigBuilder = serde_json::from_value(value.clone())?;
        Ok(builder.build())
    }

    pub fn from_json_str(text: &str) -> Result<DapConfig> {
        let builder: DapConfigBuilder = serde_json::from_str(text)?;
        Ok(builder.build())
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> Result<DapConfig> {
        let builder: DapConfigBuilder = serde_yaml::from_str(text)?;
        Ok(builder.build())
    }

    /// Load from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<DapConfig> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            #[cfg(feature = "yaml")]
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            other => Err(DapError::Serde(format!(
                "unsupported configuration format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}
