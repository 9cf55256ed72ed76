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

//! # Dap4 Error Module
//!
//! This module defines the error types shared by the DMR parser, the
//! constraint-expression parser and the data compiler.
//!
//! ## Error Categories
//!
//! - **Grammar**: malformed DMR or CE text; carries a best-effort location
//! - **Semantic**: well-formed text that violates a schema invariant
//!   (version mismatch, unresolved reference, illegal map, tag mismatch)
//! - **Decode**: the data buffer is shorter than the schema demands
//! - **Io / Serde / Internal**: ambient failures
//!
//! A DAP4 `<Error>` document is *not* an error here: the DMR parser returns
//! it as [`crate::dmr::DmrResponse::Error`], because receiving one is an
//! expected outcome of a request.
//!
//! ## Usage
//!
//! ```rust
//! use dap4::errors::{DapError, Result};
//!
//! fn check_size(size: i64) -> Result<u64> {
//!     if size <= 0 {
//!         return Err(DapError::semantic(format!("dimension size must be positive: {size}")));
//!     }
//!     Ok(size as u64)
//! }
//! ```

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout Dap4.
pub type Result<T> = std::result::Result<T, DapError>;

/// Canonical error enumeration for Dap4.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum DapError {
    /// Malformed DMR or constraint text.
    #[error("grammar error at {location}: {message}")]
    Grammar { message: String, location: String },

    /// Grammatically valid input that breaks a schema invariant.
    #[error("semantic error: {message}")]
    Semantic { message: String },

    /// The serialized data ended before the schema was satisfied.
    #[error("decode error at offset {offset}: {message}")]
    Decode { message: String, offset: usize },

    /// Errors originating from filesystem IO.
    #[error("io error: {0}")]
    Io(String),

    /// Wrapper for configuration (de)serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for DapError {
    fn from(err: io::Error) -> Self {
        DapError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DapError {
    fn from(err: serde_json::Error) -> Self {
        DapError::Serde(err.to_string())
    }
}

#[cfg(feature = "yaml")]
impl From<serde_yaml::Error> for DapError {
    fn from(err: serde_yaml::Error) -> Self {
        DapError::Serde(err.to_string())
    }
}

impl From<quick_xml::Error> for DapError {
    fn from(err: quick_xml::Error) -> Self {
        DapError::grammar(err.to_string(), "xml")
    }
}

impl DapError {
    /// Helper to construct grammar errors.
    pub fn grammar(message: impl Into<String>, location: impl Into<String>) -> Self {
        DapError::Grammar {
            message: message.into(),
            location: location.into(),
        }
    }

    /// Helper to construct semantic errors.
    pub fn semantic<T: Into<String>>(message: T) -> Self {
        DapError::Semantic {
            message: message.into(),
        }
    }

    /// Helper to construct decode errors.
    pub fn decode(message: impl Into<String>, offset: usize) -> Self {
        DapError::Decode {
            message: message.into(),
            offset,
        }
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        DapError::Internal(message.into())
    }

    pub fn is_grammar(&self) -> bool {
        matches!(self, DapError::Grammar { .. })
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, DapError::Semantic { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, DapError::Decode { .. })
    }
}
