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

//! Atomic values and their wire encoding.
//!
//! Fixed-size values are stored in the data buffer's byte order with no
//! padding. Byte-strings (String, URL, Opaque) are an 8-byte length followed
//! by that many bytes. Enumerations are stored as their base integer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ByteOrder;
use crate::errors::{DapError, Result};
use crate::types::TypeSort;

/// Width of the count prefix on byte-strings and Sequence instances.
pub const COUNT_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DapValue {
    Char(u8),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    URL(String),
    Opaque(Vec<u8>),
}

impl DapValue {
    pub fn sort(&self) -> TypeSort {
        match self {
            DapValue::Char(_) => TypeSort::Char,
            DapValue::Int8(_) => TypeSort::Int8,
            DapValue::UInt8(_) => TypeSort::UInt8,
            DapValue::Int16(_) => TypeSort::Int16,
            DapValue::UInt16(_) => TypeSort::UInt16,
            DapValue::Int32(_) => TypeSort::Int32,
            DapValue::UInt32(_) => TypeSort::UInt32,
            DapValue::Int64(_) => TypeSort::Int64,
            DapValue::UInt64(_) => TypeSort::UInt64,
            DapValue::Float32(_) => TypeSort::Float32,
            DapValue::Float64(_) => TypeSort::Float64,
            DapValue::String(_) => TypeSort::String,
            DapValue::URL(_) => TypeSort::URL,
            DapValue::Opaque(_) => TypeSort::Opaque,
        }
    }

    /// Integer value reinterpreted as the 64-bit pattern enumeration
    /// constants are stored in.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            DapValue::Char(v) | DapValue::UInt8(v) => Some(v as u64),
            DapValue::Int8(v) => Some(v as i64 as u64),
            DapValue::Int16(v) => Some(v as i64 as u64),
            DapValue::UInt16(v) => Some(v as u64),
            DapValue::Int32(v) => Some(v as i64 as u64),
            DapValue::UInt32(v) => Some(v as u64),
            DapValue::Int64(v) => Some(v as u64),
            DapValue::UInt64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            DapValue::Float32(v) => Some(v as f64),
            DapValue::Float64(v) => Some(v),
            DapValue::Int8(v) => Some(v as f64),
            DapValue::Int16(v) => Some(v as f64),
            DapValue::Int32(v) => Some(v as f64),
            DapValue::Int64(v) => Some(v as f64),
            _ => self.as_u64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DapValue::String(s) | DapValue::URL(s) => Some(s),
            _ => None,
        }
    }

    /// Append the wire encoding of this value.
    pub fn write_to(&self, out: &mut Vec<u8>, order: ByteOrder) {
        macro_rules! put {
            ($v:expr) => {
                match order {
                    ByteOrder::Little => out.extend_from_slice(&$v.to_le_bytes()),
                    ByteOrder::Big => out.extend_from_slice(&$v.to_be_bytes()),
                }
            };
        }
        match self {
            DapValue::Char(v) | DapValue::UInt8(v) => out.push(*v),
            DapValue::Int8(v) => put!(v),
            DapValue::Int16(v) => put!(v),
            DapValue::UInt16(v) => put!(v),
            DapValue::Int32(v) => put!(v),
            DapValue::UInt32(v) => put!(v),
            DapValue::Int64(v) => put!(v),
            DapValue::UInt64(v) => put!(v),
            DapValue::Float32(v) => put!(v),
            DapValue::Float64(v) => put!(v),
            DapValue::String(s) | DapValue::URL(s) => {
                put!(s.len() as u64);
                out.extend_from_slice(s.as_bytes());
            }
            DapValue::Opaque(bytes) => {
                put!(bytes.len() as u64);
                out.extend_from_slice(bytes);
            }
        }
    }
}

impl fmt::Display for DapValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DapValue::Char(v) => write!(f, "'{}'", *v as char),
            DapValue::Int8(v) => write!(f, "{v}"),
            DapValue::UInt8(v) => write!(f, "{v}"),
            DapValue::Int16(v) => write!(f, "{v}"),
            DapValue::UInt16(v) => write!(f, "{v}"),
            DapValue::Int32(v) => write!(f, "{v}"),
            DapValue::UInt32(v) => write!(f, "{v}"),
            DapValue::Int64(v) => write!(f, "{v}"),
            DapValue::UInt64(v) => write!(f, "{v}"),
            DapValue::Float32(v) => write!(f, "{v}"),
            DapValue::Float64(v) => write!(f, "{v}"),
            DapValue::String(s) | DapValue::URL(s) => write!(f, "{s:?}"),
            DapValue::Opaque(bytes) => write!(f, "0x{}", hex::encode(bytes)),
        }
    }
}

fn take<const N: usize>(buffer: &[u8], offset: usize) -> Result<[u8; N]> {
    buffer
        .get(offset..offset.saturating_add(N))
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| {
            DapError::decode(
                format!("need {N} bytes, {} available", buffer.len().saturating_sub(offset)),
                offset,
            )
        })
}

macro_rules! read_num {
    ($ty:ty, $buffer:expr, $offset:expr, $order:expr) => {{
        let bytes = take::<{ std::mem::size_of::<$ty>() }>($buffer, $offset)?;
        match $order {
            ByteOrder::Little => <$ty>::from_le_bytes(bytes),
            ByteOrder::Big => <$ty>::from_be_bytes(bytes),
        }
    }};
}

pub fn read_u64(buffer: &[u8], offset: usize, order: ByteOrder) -> Result<u64> {
    Ok(read_num!(u64, buffer, offset, order))
}

pub fn read_u32(buffer: &[u8], offset: usize, order: ByteOrder) -> Result<u32> {
    Ok(read_num!(u32, buffer, offset, order))
}

/// Read one fixed-size value of `sort` at `offset`.
pub fn read_fixed(
    buffer: &[u8],
    offset: usize,
    sort: TypeSort,
    order: ByteOrder,
) -> Result<DapValue> {
    let value = match sort {
        TypeSort::Char => DapValue::Char(take::<1>(buffer, offset)?[0]),
        TypeSort::UInt8 => DapValue::UInt8(take::<1>(buffer, offset)?[0]),
        TypeSort::Int8 => DapValue::Int8(read_num!(i8, buffer, offset, order)),
        TypeSort::Int16 => DapValue::Int16(read_num!(i16, buffer, offset, order)),
        TypeSort::UInt16 => DapValue::UInt16(read_num!(u16, buffer, offset, order)),
        TypeSort::Int32 => DapValue::Int32(read_num!(i32, buffer, offset, order)),
        TypeSort::UInt32 => DapValue::UInt32(read_num!(u32, buffer, offset, order)),
        TypeSort::Int64 => DapValue::Int64(read_num!(i64, buffer, offset, order)),
        TypeSort::UInt64 => DapValue::UInt64(read_num!(u64, buffer, offset, order)),
        TypeSort::Float32 => DapValue::Float32(read_num!(f32, buffer, offset, order)),
        TypeSort::Float64 => DapValue::Float64(read_num!(f64, buffer, offset, order)),
        other => {
            return Err(DapError::internal(format!(
                "{other} is not a fixed-size type"
            )))
        }
    };
    Ok(value)
}

/// Read the byte-string whose length prefix starts at `offset`.
pub fn read_byte_string(
    buffer: &[u8],
    offset: usize,
    sort: TypeSort,
    order: ByteOrder,
) -> Result<DapValue> {
    let len = read_u64(buffer, offset, order)?;
    let start = offset + COUNT_SIZE;
    let bytes = usize::try_from(len)
        .ok()
        .and_then(|len| buffer.get(start..start.checked_add(len)?))
        .ok_or_else(|| {
            DapError::decode(format!("byte-string of {len} bytes overruns buffer"), start)
        })?;
    let value = match sort {
        TypeSort::Opaque => DapValue::Opaque(bytes.to_vec()),
        TypeSort::URL => DapValue::URL(String::from_utf8_lossy(bytes).into_owned()),
        _ => DapValue::String(String::from_utf8_lossy(bytes).into_owned()),
    };
    Ok(value)
}
