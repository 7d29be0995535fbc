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

//! Program files on the local filesystem

use std::path::Path;

use memchr::memchr2;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::block::{ETB, strip_control_sequences};
use crate::{ClientError, Result};

/// File name the controller uses for every transfer
pub const TRANSFER_FILE_NAME: &str = "file.as";

/// Name given to the `load` command
pub const TRANSFER_FILE_STEM: &str = "file";

/// Echo of the save request that prefixes captured data
const SAVE_ECHO_PREFIX: &[u8] = b"Bfile.as";

/// A controller program as an ordered list of lines without terminators
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramFile {
    lines: Vec<String>,
}

impl ProgramFile {
    /// Create a program from lines
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Create a program from anything yielding lines
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Split text on LF or CRLF
    pub fn parse(text: &str) -> Self {
        Self::from_lines(text.lines())
    }

    /// Read a program file from disk
    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .await
            .map_err(|e| ClientError::file(path, e))?;
        Ok(Self::parse(&text))
    }

    /// Write the program to disk, one LF-terminated line each.
    ///
    /// The text lands in a sibling temporary file first and is renamed over
    /// `path`, so an existing file is only replaced by a complete one.
    pub async fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut staging = path.as_os_str().to_owned();
        staging.push(".part");
        let staging = Path::new(&staging);

        let mut file = fs::File::create(staging)
            .await
            .map_err(|e| ClientError::file(staging, e))?;
        file.write_all(self.to_text().as_bytes())
            .await
            .map_err(|e| ClientError::file(staging, e))?;
        file.sync_all()
            .await
            .map_err(|e| ClientError::file(staging, e))?;
        drop(file);

        if let Err(e) = fs::rename(staging, path).await {
            let _ = fs::remove_file(staging).await;
            return Err(ClientError::file(path, e));
        }
        Ok(())
    }

    /// Lines in order
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the program has no lines
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Byte length of the text as transferred, one LF per line
    pub fn byte_len(&self) -> usize {
        self.lines.iter().map(|l| l.len() + 1).sum()
    }

    /// Program text with LF line endings
    pub fn to_text(&self) -> String {
        let mut text = String::with_capacity(self.byte_len());
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    /// Rebuilds a program from a raw save capture.
    ///
    /// Framing is stripped and the rest split into lines. Program lines are
    /// kept. Echoes of the save request are dropped. Anything else (blank
    /// lines, ETB residue, `=program` echoes) is returned separately with
    /// ETB removed and an LF appended, for the transcript.
    pub fn from_capture(raw: &[u8]) -> (Self, Vec<Vec<u8>>) {
        let cleaned = strip_control_sequences(raw);
        let mut lines = Vec::new();
        let mut residue = Vec::new();

        for line in split_lines(&cleaned) {
            if !line.is_empty() && line[0] != ETB && line[0] != b'=' {
                if !line.starts_with(SAVE_ECHO_PREFIX) {
                    lines.push(String::from_utf8_lossy(line).into_owned());
                }
                continue;
            }
            let mut note: Vec<u8> = line.iter().copied().filter(|b| *b != ETB).collect();
            note.push(b'\n');
            residue.push(note);
        }
        (Self { lines }, residue)
    }
}

/// Splits on CR, LF or CRLF without yielding a trailing empty line.
fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        match memchr2(b'\r', b'\n', rest) {
            Some(pos) => {
                lines.push(&rest[..pos]);
                let skip = if rest[pos] == b'\r' && rest.get(pos + 1) == Some(&b'\n') {
                    2
                } else {
                    1
                };
                rest = &rest[pos + skip..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}
