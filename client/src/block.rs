//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Transfer framing
//!
//! Program transfers wrap their payload in STX-delimited frames closed by
//! ETB. Every frame carries the same fixed block-number field.
//!
//! | Frame        | Bytes                                  |
//! |--------------|----------------------------------------|
//! | open load    | `STX 'A' "    0" ETB`                  |
//! | open save    | `STX 'B' "    0" ETB`                  |
//! | data         | `STX 'C' "    0" <block> CR LF ETB`    |
//! | end of file  | `STX 'C' "    0" SUB ETB`              |
//! | close ack    | `STX 'E' "    0" ETB`                  |

use bytes::{BufMut, Bytes, BytesMut};

use crate::program::ProgramFile;

/// Start of text
pub const STX: u8 = 0x02;
/// Enquiry, opens a save block together with STX
pub const ENQ: u8 = 0x05;
/// End of transmission block, closes every frame
pub const ETB: u8 = 0x17;
/// Substitute, marks end of file in a data frame
pub const SUB: u8 = 0x1A;

/// Fixed block-number field
pub const BLOCK_NUMBER: &[u8] = b"    0";
/// Line ending on the wire
pub const CRLF: &[u8] = b"\r\n";
/// A lone ETB acknowledges an opened transfer
pub const FRAME_ACK: &[u8] = &[ETB];
/// Boundary preceding each block of a save stream
pub const SAVE_BOUNDARY: &[u8] = &[ENQ, STX];

/// Bytes a data frame adds around its block
pub const FRAME_OVERHEAD: usize = 2 + BLOCK_NUMBER.len() + CRLF.len() + 1;
/// Largest data frame the controller accepts
pub const MAX_FRAME_LEN: usize = 492;

/// Frame type letter following STX
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameTag {
    /// Open a load
    OpenLoad = b'A',
    /// Open a save
    OpenSave = b'B',
    /// Data or end of file
    Data = b'C',
    /// Close acknowledgment
    End = b'E',
}

fn frame(tag: FrameTag, body: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(body.len() + FRAME_OVERHEAD);
    buf.put_u8(STX);
    buf.put_u8(tag as u8);
    buf.put_slice(BLOCK_NUMBER);
    buf.put_slice(body);
    buf.put_u8(ETB);
    buf.freeze()
}

/// A frame without payload, `STX tag "    0" ETB`
pub fn control_frame(tag: FrameTag) -> Bytes {
    frame(tag, &[])
}

/// Data frame carrying `block`
pub fn data_frame(block: &TransferBlock) -> Bytes {
    let mut body = BytesMut::with_capacity(block.len() + CRLF.len());
    body.put_slice(block.as_bytes());
    body.put_slice(CRLF);
    frame(FrameTag::Data, &body)
}

/// Data frame signalling end of file
pub fn eof_frame() -> Bytes {
    frame(FrameTag::Data, &[SUB])
}

/// A run of whole program lines sent as one data frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferBlock {
    data: Bytes,
    lines: usize,
}

impl TransferBlock {
    /// Block payload, each line followed by LF
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Payload length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the block is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of program lines in the block
    pub fn line_count(&self) -> usize {
        self.lines
    }

    /// Length of the data frame carrying this block
    pub fn frame_len(&self) -> usize {
        self.data.len() + FRAME_OVERHEAD
    }
}

/// Packs program lines into blocks.
///
/// Lines are appended with an LF until the next one would push the data
/// frame past `max_frame_len`. A line is never split, so a single line
/// longer than the limit travels alone in an oversized block. No empty
/// blocks are produced and the blocks concatenate back to the program text.
pub fn split_into_blocks(program: &ProgramFile, max_frame_len: usize) -> Vec<TransferBlock> {
    let mut blocks = Vec::new();
    let mut current = BytesMut::new();
    let mut lines = 0;

    for line in program.lines() {
        let needed = line.len() + 1;
        if lines > 0 && current.len() + needed + FRAME_OVERHEAD > max_frame_len {
            blocks.push(TransferBlock {
                data: current.split().freeze(),
                lines,
            });
            lines = 0;
        }
        current.put_slice(line.as_bytes());
        current.put_u8(b'\n');
        lines += 1;
    }
    if lines > 0 {
        blocks.push(TransferBlock {
            data: current.freeze(),
            lines,
        });
    }
    blocks
}

/// Removes save-stream framing, `ETB? ENQ STX [DE]?`, from `data`.
pub fn strip_control_sequences(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        let start = if data[i..].starts_with(&[ETB, ENQ, STX]) {
            Some(i + 3)
        } else if data[i..].starts_with(SAVE_BOUNDARY) {
            Some(i + 2)
        } else {
            None
        };
        match start {
            Some(mut next) => {
                if matches!(data.get(next), Some(b'D' | b'E')) {
                    next += 1;
                }
                i = next;
            }
            None => {
                out.push(data[i]);
                i += 1;
            }
        }
    }
    out
}
