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

//! Session transcript
//!
//! When started, everything written to or read from the controller is
//! appended to a text file with save-stream framing removed and CRLF turned
//! into LF. Transfers suspend mirroring and write short banners instead.
//! Failures to write are logged and never interrupt the session.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use crate::block::strip_control_sequences;
use crate::{ClientError, Result};

/// Append-only transcript of controller traffic
#[derive(Debug, Default)]
pub struct Transcript {
    file: Option<File>,
    path: Option<PathBuf>,
    mirroring: bool,
}

impl Transcript {
    /// Create an inactive transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` for appending and start mirroring traffic into it.
    ///
    /// A transcript already open is closed first.
    pub async fn start(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.stop().await;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| ClientError::file(path, e))?;
        debug!(path = %path.display(), "Transcript started");
        self.file = Some(file);
        self.path = Some(path.to_path_buf());
        self.mirroring = true;
        Ok(())
    }

    /// Stop mirroring and close the file. Does nothing when inactive.
    pub async fn stop(&mut self) {
        self.mirroring = false;
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush().await {
                error!("Failed to flush transcript: {}", e);
            }
            if let Some(path) = self.path.take() {
                debug!(path = %path.display(), "Transcript stopped");
            }
        }
    }

    /// Whether a transcript file is open
    pub fn is_active(&self) -> bool {
        self.file.is_some()
    }

    /// Whether traffic is currently mirrored
    pub fn is_mirroring(&self) -> bool {
        self.mirroring && self.file.is_some()
    }

    /// Path of the open transcript
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Pause mirroring, returning the previous state for [`resume`](Self::resume).
    pub fn suspend(&mut self) -> bool {
        std::mem::replace(&mut self.mirroring, false)
    }

    /// Restore the mirroring state returned by [`suspend`](Self::suspend).
    pub fn resume(&mut self, mirroring: bool) {
        self.mirroring = mirroring;
    }

    /// Mirror traffic. Skipped while suspended.
    pub async fn record(&mut self, data: &[u8]) {
        if !self.mirroring || data.is_empty() {
            return;
        }
        let cleaned = normalize(&strip_control_sequences(data));
        self.append(&cleaned).await;
    }

    /// Write a banner line, even while mirroring is suspended.
    pub async fn note(&mut self, text: &str) {
        self.append(text.as_bytes()).await;
    }

    async fn append(&mut self, data: &[u8]) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let result = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = result {
            error!("Failed to write transcript: {}", e);
        }
    }
}

/// CRLF to LF
fn normalize(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut iter = data.iter().peekable();
    while let Some(&byte) = iter.next() {
        if byte == b'\r' && iter.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(byte);
    }
    out
}
