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

//! Checksum modes and CRC32 verification for serialized variables.
//!
//! A DAP4 server may append a 4-byte CRC32 after every top-level variable.
//! Whether it did is negotiated out of band, so the compiler is told through
//! [`ChecksumMode`] and only reads the trailer when the mode covers the DAP
//! (data) part of the response.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of bytes a serialized checksum occupies.
pub const CHECKSUM_SIZE: usize = 4;

/// Which half of a request a setting applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestMode {
    Dmr,
    Dap,
}

/// Where checksums are present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumMode {
    None,
    Dmr,
    #[default]
    Dap,
    All,
}

impl ChecksumMode {
    pub fn enabled(self, request: RequestMode) -> bool {
        match self {
            ChecksumMode::None => false,
            ChecksumMode::Dmr => request == RequestMode::Dmr,
            ChecksumMode::Dap => request == RequestMode::Dap,
            ChecksumMode::All => true,
        }
    }

    /// Parse the textual form used in query parameters, case-insensitively.
    pub fn parse(text: &str) -> Option<ChecksumMode> {
        match text.trim().to_ascii_lowercase().as_str() {
            "none" | "false" => Some(ChecksumMode::None),
            "dmr" => Some(ChecksumMode::Dmr),
            "dap" | "true" => Some(ChecksumMode::Dap),
            "all" => Some(ChecksumMode::All),
            _ => None,
        }
    }
}

impl fmt::Display for ChecksumMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ChecksumMode::None => "none",
            ChecksumMode::Dmr => "dmr",
            ChecksumMode::Dap => "dap",
            ChecksumMode::All => "all",
        };
        f.write_str(text)
    }
}

/// IEEE 802.3 CRC32, the polynomial DAP4 servers use for variable checksums.
pub fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// A checksum as read from the wire, together with the bytes it covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub stored: u32,
    /// Start offset of the covered variable in the data buffer.
    pub start: usize,
    /// End offset (exclusive) of the covered variable.
    pub end: usize,
}

impl Checksum {
    pub fn computed(&self, buffer: &[u8]) -> Option<u32> {
        buffer.get(self.start..self.end).map(crc32)
    }

    pub fn verify(&self, buffer: &[u8]) -> bool {
        self.computed(buffer) == Some(self.stored)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.stored.to_be_bytes())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
