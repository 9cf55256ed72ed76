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

//! # Chunked Responses
//!
//! A DAP4 data response is a sequence of chunks. Each chunk has a 4-byte
//! header: one flags byte and a 24-bit big-endian payload length. The first
//! chunk carries the DMR text; the rest carry serialized data. The
//! little-endian flag on the data chunks tells the compiler which byte
//! order the server wrote.

use serde::{Deserialize, Serialize};

use crate::config::ByteOrder;
use crate::errors::{DapError, Result};

pub const CHUNK_HEADER_SIZE: usize = 4;
pub const MAX_CHUNK_SIZE: usize = 0x00FF_FFFF;

pub const FLAG_DATA: u8 = 0x00;
pub const FLAG_LAST: u8 = 0x01;
pub const FLAG_ERROR: u8 = 0x02;
pub const FLAG_LITTLE_ENDIAN: u8 = 0x04;

/// A chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub flags: u8,
    pub length: usize,
}

impl ChunkHeader {
    pub fn parse(bytes: [u8; CHUNK_HEADER_SIZE]) -> Self {
        let length = u32::from_be_bytes([0, bytes[1], bytes[2], bytes[3]]) as usize;
        ChunkHeader {
            flags: bytes[0],
            length,
        }
    }

    pub fn to_bytes(self) -> [u8; CHUNK_HEADER_SIZE] {
        let len = (self.length as u32).to_be_bytes();
        [self.flags, len[1], len[2], len[3]]
    }

    pub fn is_last(&self) -> bool {
        self.flags & FLAG_LAST != 0
    }

    pub fn is_error(&self) -> bool {
        self.flags & FLAG_ERROR != 0
    }

    pub fn byte_order(&self) -> ByteOrder {
        if self.flags & FLAG_LITTLE_ENDIAN != 0 {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }
}

/// A dechunked response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkedResponse {
    /// DMR text from the first chunk, trailing line ending removed.
    pub dmr: String,
    /// Concatenated payload of the data chunks.
    pub data: Vec<u8>,
    pub byte_order: ByteOrder,
    /// Error document text, when the server ended with an error chunk.
    pub error: Option<String>,
}

fn read_chunk(bytes: &[u8], offset: usize) -> Result<(ChunkHeader, &[u8])> {
    let header: [u8; CHUNK_HEADER_SIZE] = bytes
        .get(offset..offset + CHUNK_HEADER_SIZE)
        .and_then(|h| h.try_into().ok())
        .ok_or_else(|| DapError::decode("truncated chunk header", offset))?;
    let header = ChunkHeader::parse(header);
    let start = offset + CHUNK_HEADER_SIZE;
    let payload = bytes.get(start..start + header.length).ok_or_else(|| {
        let available = bytes.len().saturating_sub(start);
        DapError::decode(
            format!("chunk declares {} bytes, {available} available", header.length),
            start,
        )
    })?;
    Ok((header, payload))
}

/// Split a chunked response into its DMR text and data bytes.
pub fn decode_chunked(bytes: &[u8]) -> Result<ChunkedResponse> {
    let (header, payload) = read_chunk(bytes, 0)?;
    let text = String::from_utf8(payload.to_vec())
        .map_err(|e| DapError::decode(format!("DMR chunk is not UTF-8: {e}"), CHUNK_HEADER_SIZE))?;
    let mut offset = CHUNK_HEADER_SIZE + header.length;

    if header.is_error() {
        return Ok(ChunkedResponse {
            dmr: String::new(),
            data: Vec::new(),
            byte_order: header.byte_order(),
            error: Some(text),
        });
    }

    let mut response = ChunkedResponse {
        dmr: text.trim_end_matches(['\r', '\n']).to_string(),
        data: Vec::new(),
        byte_order: header.byte_order(),
        error: None,
    };
    let mut last = header.is_last();
    while !last && offset < bytes.len() {
        let (header, payload) = read_chunk(bytes, offset)?;
        offset += CHUNK_HEADER_SIZE + header.length;
        if header.is_error() {
            response.error = Some(String::from_utf8_lossy(payload).into_owned());
            break;
        }
        response.byte_order = header.byte_order();
        response.data.extend_from_slice(payload);
        last = header.is_last();
    }
    if !last && response.error.is_none() {
        log::debug!("chunked response ended without a last-chunk flag");
    }
    log::debug!(
        "dechunked {} DMR bytes and {} data bytes",
        response.dmr.len(),
        response.data.len()
    );
    Ok(response)
}

/// Frame a DMR and data buffer as a chunked response.
pub fn encode_chunked(dmr: &str, data: &[u8], byte_order: ByteOrder, chunk_size: usize) -> Vec<u8> {
    let order_flag = match byte_order {
        ByteOrder::Little => FLAG_LITTLE_ENDIAN,
        ByteOrder::Big => 0,
    };
    let chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
    let mut out = Vec::with_capacity(dmr.len() + data.len() + 16);

    let mut text = dmr.to_string();
    text.push_str("\r\n");
    let dmr_flags = (if data.is_empty() { FLAG_LAST } else { FLAG_DATA }) | order_flag;
    push_chunk(&mut out, dmr_flags, text.as_bytes());

    let mut pieces = data.chunks(chunk_size).peekable();
    while let Some(piece) = pieces.next() {
        let flags = (if pieces.peek().is_none() { FLAG_LAST } else { FLAG_DATA }) | order_flag;
        push_chunk(&mut out, flags, piece);
    }
    out
}

fn push_chunk(out: &mut Vec<u8>, flags: u8, payload: &[u8]) {
    let header = ChunkHeader {
        flags,
        length: payload.len(),
    };
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(payload);
}
