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

//! Program transfer engine
//!
//! # Load
//!
//! 1. Send `load<qualifier> file` and wait briefly for the controller to
//!    react. A `LOAD in progress` banner fails with [`ClientError::Busy`].
//! 2. Send the open-load frame and wait for its ETB acknowledgment.
//! 3. Send each block as a data frame. After each one, answer controller
//!    cues through the transfer resolver until it reports the block done.
//! 4. Drain trailing cues the same way.
//! 5. Send the end-of-file frame and CRLF, wait for the end marker, send
//!    the close acknowledgment and wait for the prompt.
//!
//! Silence is expected while the controller digests a block, so a read
//! that times out is not an error during steps 3 and 4. Three consecutive
//! empty reads end the step instead.
//!
//! # Save
//!
//! 1. Send `save<qualifier> file.as[=program]` and wait for the echo. A
//!    `LOAD in progress` banner, in the echo or instead of the first block,
//!    fails with [`ClientError::Busy`].
//! 2. Send the open-save frame and collect the stream, alternating between
//!    reading to the next `ENQ STX` block boundary and reading to the next
//!    ETB, until the end marker arrives or the controller falls silent.
//! 3. Send close-ack, CRLF and close-ack, then wait for the prompt.
//! 4. Strip the framing and write the program lines to the local file.
//!
//! Transcript mirroring is suspended for both directions and replaced by
//! banners.

use std::path::Path;

use bytes::{Bytes, BytesMut};
use memchr::memmem;
use tracing::{debug, error, info, instrument, warn};

use crate::block::{
    CRLF, FRAME_ACK, FrameTag, MAX_FRAME_LEN, SAVE_BOUNDARY, control_frame, data_frame, eof_frame,
    split_into_blocks,
};
use crate::inquiry::Inquiry;
use crate::program::{ProgramFile, TRANSFER_FILE_NAME, TRANSFER_FILE_STEM};
use crate::terminator::{SAVE_HEAD_TERMINATORS, TRANSFER_TERMINATORS, cue};
use crate::transport::Expect;
use crate::{ClientError, Result, Session};

/// Consecutive empty reads that end a transfer step
pub const SILENT_READ_LIMIT: usize = 3;

/// Transfer phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// No transfer running
    Idle,
    /// Request line sent
    RequestOpened,
    /// Open frame sent
    FramingEstablished,
    /// Moving block `n`
    Transferring(usize),
    /// Answering trailing cues after the last block
    DrainingTrailer,
    /// Closing handshake
    Finalizing,
    /// The last transfer failed
    Aborted,
}

/// Summary of a completed load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Data frames sent
    pub blocks: usize,
    /// Program bytes sent
    pub bytes: usize,
    /// The block loop stopped early on controller silence
    pub stalled: bool,
}

/// Summary of a completed save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    /// Program lines written
    pub lines: usize,
    /// Bytes captured from the controller
    pub captured: usize,
}

/// Counts consecutive empty reads
#[derive(Debug, Default)]
struct Silence {
    empty: usize,
}

impl Silence {
    fn observe(&mut self, response: &Expect) {
        if response.is_empty() {
            self.empty += 1;
        } else {
            self.empty = 0;
        }
    }

    fn exhausted(&self) -> bool {
        self.empty >= SILENT_READ_LIMIT
    }
}

fn qualifier_of(qualifier: Option<&str>) -> Result<&str> {
    match qualifier {
        None => Ok(""),
        Some("") => Err(ClientError::InvalidArgument(
            "qualifier must not be empty".to_string(),
        )),
        Some(q) if q.chars().any(char::is_whitespace) => Err(ClientError::InvalidArgument(
            format!("qualifier {:?} must not contain whitespace", q),
        )),
        Some(q) => Ok(q),
    }
}

impl Session {
    /// Load the program file at `path` into the controller.
    ///
    /// `qualifier` is appended to the `load` keyword (`/Q` and the like).
    #[instrument(skip(self, path), fields(session = %self.name(), path = %path.as_ref().display()))]
    pub async fn load(
        &mut self,
        path: impl AsRef<Path>,
        qualifier: Option<&str>,
    ) -> Result<LoadReport> {
        self.ensure_connected()?;
        qualifier_of(qualifier)?;
        let program = ProgramFile::read(path).await?;
        self.load_program(&program, qualifier).await
    }

    /// Load an in-memory program into the controller.
    pub async fn load_program(
        &mut self,
        program: &ProgramFile,
        qualifier: Option<&str>,
    ) -> Result<LoadReport> {
        self.ensure_connected()?;
        let qualifier = qualifier_of(qualifier)?;

        let mirroring = self.transcript.suspend();
        let result = self.run_load(program, qualifier).await;
        self.transcript.resume(mirroring);
        self.finish_transfer("Load", &result);
        result
    }

    /// Save a program from the controller into the file at `path`.
    ///
    /// `program` selects a single program (`file.as=program`). Without it
    /// everything the qualifier selects is saved. The local file is only
    /// replaced after the transfer completes.
    #[instrument(skip(self, path), fields(session = %self.name(), path = %path.as_ref().display()))]
    pub async fn save(
        &mut self,
        path: impl AsRef<Path>,
        program: Option<&str>,
        qualifier: Option<&str>,
    ) -> Result<SaveReport> {
        let (saved, captured) = self.fetch_capture(program, qualifier).await?;
        saved.write(path).await?;
        info!("Saved {} lines", saved.len());
        Ok(SaveReport {
            lines: saved.len(),
            captured,
        })
    }

    /// Save a program from the controller and return it without touching
    /// the filesystem.
    pub async fn fetch(
        &mut self,
        program: Option<&str>,
        qualifier: Option<&str>,
    ) -> Result<ProgramFile> {
        Ok(self.fetch_capture(program, qualifier).await?.0)
    }

    async fn fetch_capture(
        &mut self,
        program: Option<&str>,
        qualifier: Option<&str>,
    ) -> Result<(ProgramFile, usize)> {
        self.ensure_connected()?;
        let qualifier = qualifier_of(qualifier)?;
        if program.is_some_and(|p| p.trim().is_empty()) {
            return Err(ClientError::InvalidArgument(
                "program name must not be empty".to_string(),
            ));
        }

        let mirroring = self.transcript.suspend();
        let result = self.run_save(program, qualifier).await;
        self.transcript.resume(mirroring);
        self.finish_transfer("Save", &result);

        let capture = result?;
        let (saved, residue) = ProgramFile::from_capture(&capture);
        for note in residue {
            self.transcript.record(&note).await;
        }
        Ok((saved, capture.len()))
    }

    fn enter(&mut self, state: TransferState) {
        debug!("Transfer {:?} -> {:?}", self.transfer_state, state);
        self.transfer_state = state;
    }

    fn finish_transfer<T>(&mut self, kind: &str, result: &Result<T>) {
        match result {
            Ok(_) => {
                metrics::counter!("krcc.transfers.completed").increment(1);
                self.enter(TransferState::Idle);
            }
            Err(e) => {
                metrics::counter!("krcc.transfers.failed").increment(1);
                error!("{} failed: {}", kind, e);
                self.enter(TransferState::Aborted);
            }
        }
    }

    async fn run_load(&mut self, program: &ProgramFile, qualifier: &str) -> Result<LoadReport> {
        let timeout = self.config.timeout;
        let block_timeout = self.config.block_timeout;
        let blocks = split_into_blocks(program, MAX_FRAME_LEN);
        let total = program.byte_len();

        self.enter(TransferState::RequestOpened);
        let request = format!("load{} {}", qualifier, TRANSFER_FILE_STEM);
        self.transcript.note(&format!("{}\n", request)).await;
        self.write(format!("{}\r\n", request).as_bytes()).await?;
        let response = self
            .read_until_any(&TRANSFER_TERMINATORS, self.config.request_timeout)
            .await?;
        self.transcript
            .note(&format!("Loading...({})\n", TRANSFER_FILE_NAME))
            .await;
        if response.contains(cue::LOAD_IN_PROGRESS) {
            self.transcript.note("SAVE/LOAD in progress\n").await;
            return Err(ClientError::Busy);
        }

        self.enter(TransferState::FramingEstablished);
        self.write(&control_frame(FrameTag::OpenLoad)).await?;
        self.read_until(FRAME_ACK, timeout).await?.require(timeout)?;

        let mut silence = Silence::default();
        let mut sent = 0;
        let mut sent_blocks = 0;
        let mut stalled = false;
        'blocks: for (index, block) in blocks.iter().enumerate() {
            self.enter(TransferState::Transferring(index));
            self.write(&data_frame(block)).await?;
            sent += block.len();
            sent_blocks += 1;
            self.progress.report(sent, total);
            loop {
                let response = self
                    .read_until_any(&TRANSFER_TERMINATORS, block_timeout)
                    .await?;
                silence.observe(&response);
                match self.transfer_inquiry.resolve(&response.data) {
                    Inquiry::Abort => return Err(aborted(&response)),
                    Inquiry::Continue(reply) => {
                        self.write(&reply).await?;
                        continue;
                    }
                    Inquiry::Done => {}
                }
                if silence.exhausted() {
                    warn!("Controller silent after block {}", index);
                    stalled = true;
                    break 'blocks;
                }
                break;
            }
        }

        self.progress.report(total, total);

        self.enter(TransferState::DrainingTrailer);
        let mut silence = Silence::default();
        let mut ended = false;
        let end_index = TRANSFER_TERMINATORS.position(cue::END_OF_TRANSFER);
        while !silence.exhausted() {
            let response = self
                .read_until_any(&TRANSFER_TERMINATORS, block_timeout)
                .await?;
            silence.observe(&response);
            match self.transfer_inquiry.resolve(&response.data) {
                Inquiry::Abort => return Err(aborted(&response)),
                Inquiry::Continue(reply) => {
                    self.write(&reply).await?;
                }
                Inquiry::Done if response.matched.is_some() && response.matched == end_index => {
                    ended = true;
                    break;
                }
                Inquiry::Done => {}
            }
        }

        self.enter(TransferState::Finalizing);
        self.write(&eof_frame()).await?;
        self.write(CRLF).await?;
        if !ended {
            self.read_until(cue::END_OF_TRANSFER, timeout)
                .await?
                .require(timeout)?;
        }
        self.write(&control_frame(FrameTag::End)).await?;
        self.read_until(cue::PROMPT_MARK, timeout)
            .await?
            .require(timeout)?;

        info!("Loaded {} bytes in {} blocks", sent, sent_blocks);
        Ok(LoadReport {
            blocks: sent_blocks,
            bytes: sent,
            stalled,
        })
    }

    async fn run_save(&mut self, program: Option<&str>, qualifier: &str) -> Result<Bytes> {
        let timeout = self.config.timeout;

        self.enter(TransferState::RequestOpened);
        let request = match program {
            Some(name) => format!("save{} {}={}", qualifier, TRANSFER_FILE_NAME, name),
            None => format!("save{} {}", qualifier, TRANSFER_FILE_NAME),
        };
        self.transcript.note(&format!("{}\n", request)).await;
        self.write(format!("{}\r\n", request).as_bytes()).await?;
        let response = self
            .read_until(cue::FILE_ECHO, self.config.block_timeout)
            .await?;
        self.transcript
            .note(&format!("Saving...({})\n", TRANSFER_FILE_NAME))
            .await;
        if response.contains(cue::LOAD_IN_PROGRESS) {
            self.transcript.note("SAVE/LOAD in progress\n").await;
            return Err(ClientError::Busy);
        }

        self.enter(TransferState::FramingEstablished);
        self.write(&control_frame(FrameTag::OpenSave)).await?;

        let mut capture = BytesMut::new();
        let mut at_boundary = true;
        let mut block = 0;
        loop {
            if at_boundary {
                self.enter(TransferState::Transferring(block));
                block += 1;
                let head = if block == 1 {
                    self.read_until_any(&SAVE_HEAD_TERMINATORS, timeout).await?
                } else {
                    self.read_until(SAVE_BOUNDARY, timeout).await?
                };
                if head.is_empty() {
                    break;
                }
                if block == 1 && head.contains(cue::LOAD_IN_PROGRESS) {
                    self.transcript.note("SAVE/LOAD in progress\n").await;
                    return Err(ClientError::Busy);
                }
                capture.extend_from_slice(&head.data);
                let rest = self.read_available().await?;
                if rest.is_empty() {
                    break;
                }
                capture.extend_from_slice(&rest);
                if memmem::find(&rest, cue::END_OF_TRANSFER).is_some() {
                    break;
                }
            } else {
                let tail = self.read_until(FRAME_ACK, timeout).await?;
                capture.extend_from_slice(&tail.data);
                if tail.contains(cue::END_OF_TRANSFER) {
                    break;
                }
            }
            at_boundary = !at_boundary;
        }

        self.enter(TransferState::Finalizing);
        let close = control_frame(FrameTag::End);
        self.write(&close).await?;
        self.write(CRLF).await?;
        self.write(&close).await?;
        let trailer = self.read_until(cue::PROMPT_MARK, timeout).await?;
        if !trailer.is_match() {
            warn!("No prompt after save");
        }
        Ok(capture.freeze())
    }
}

fn aborted(response: &Expect) -> ClientError {
    ClientError::Aborted {
        banner: response.text().trim().to_string(),
    }
}
