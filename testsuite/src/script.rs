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

//! Controller behavior and observed traffic

use std::collections::HashMap;

use bytes::Bytes;
use krcc_client::SUB;
use krcc_telnetcodec::TelnetFrame;

/// Output of `WHERE` on the simulated controller
pub const WHERE_OUTPUT: &str = "     JT1       JT2       JT3       JT4       JT5       JT6\r\n                                     0.000    30.000   -60.000     0.000    45.000     0.000";

/// How the simulated controller behaves
#[derive(Debug, Clone)]
pub struct ControllerScript {
    /// Login identifier the controller accepts
    pub login: String,
    /// Open with WILL ECHO, DO TTYPE and a terminal type request
    pub negotiate: bool,
    /// Never print the prompt after login
    pub withhold_prompt: bool,
    /// Answer every load and save with `SAVE/LOAD in progress`
    pub busy: bool,
    /// Acknowledge each data frame with `STX C ETB`
    pub ack_blocks: bool,
    /// Report errors after the first data frame of a load
    pub reject_loads: bool,
    /// Send saves one line per block, each block split across two writes
    pub chunked_saves: bool,
    /// Command outputs. Every step but the last is followed by a wait for a
    /// single key press.
    pub commands: HashMap<String, Vec<String>>,
    /// Program lines held by the controller
    pub program: Vec<String>,
}

impl Default for ControllerScript {
    fn default() -> Self {
        let mut commands = HashMap::new();
        commands.insert("WHERE".to_string(), vec![WHERE_OUTPUT.to_string()]);
        Self {
            login: "as".to_string(),
            negotiate: true,
            withhold_prompt: false,
            busy: false,
            ack_blocks: true,
            reject_loads: false,
            chunked_saves: false,
            commands,
            program: Vec::new(),
        }
    }
}

impl ControllerScript {
    /// Add or replace a command
    pub fn with_command<S: Into<String>>(mut self, command: &str, steps: Vec<S>) -> Self {
        self.commands.insert(
            command.to_string(),
            steps.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Preload program lines
    pub fn with_program<S: Into<String>>(mut self, lines: Vec<S>) -> Self {
        self.program = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Report every transfer as already running
    pub fn busy(mut self) -> Self {
        self.busy = true;
        self
    }

    /// Never acknowledge the login
    pub fn withhold_prompt(mut self) -> Self {
        self.withhold_prompt = true;
        self
    }

    /// Take data frames without acknowledging them
    pub fn without_block_acks(mut self) -> Self {
        self.ack_blocks = false;
        self
    }

    /// Stream saves in delayed chunks instead of a single write
    pub fn chunked_saves(mut self) -> Self {
        self.chunked_saves = true;
        self
    }

    /// Refuse loads with an error report
    pub fn reject_loads(mut self) -> Self {
        self.reject_loads = true;
        self
    }
}

/// A transfer frame received from the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Letter after STX
    pub tag: u8,
    /// Bytes between the block number field and ETB
    pub payload: Bytes,
}

impl Frame {
    /// End-of-file data frame
    pub fn is_eof(&self) -> bool {
        self.tag == b'C' && self.payload[..] == [SUB]
    }

    /// Data frame carrying program text
    pub fn is_data(&self) -> bool {
        self.tag == b'C' && !self.is_eof()
    }

    /// Program lines of a data frame
    pub fn lines(&self) -> Vec<String> {
        let text = String::from_utf8_lossy(&self.payload);
        let text = text.strip_suffix("\r\n").unwrap_or(&*text);
        text.lines().map(str::to_string).collect()
    }
}

/// One unit of client traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// Telnet negotiation
    Negotiation(TelnetFrame),
    /// CRLF-terminated line, terminator removed
    Line(String),
    /// Single key answering a pagination or confirmation cue
    Key(u8),
    /// Transfer frame
    Frame(Frame),
}

/// Everything the controller observed on one connection
#[derive(Debug, Clone, Default)]
pub struct ControllerLog {
    /// Traffic in arrival order
    pub received: Vec<Received>,
    /// Program held when the connection closed
    pub program: Vec<String>,
}

impl ControllerLog {
    /// Received transfer frames
    pub fn frames(&self) -> Vec<&Frame> {
        self.received
            .iter()
            .filter_map(|r| match r {
                Received::Frame(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    /// Received lines
    pub fn lines(&self) -> Vec<&str> {
        self.received
            .iter()
            .filter_map(|r| match r {
                Received::Line(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Received negotiation replies
    pub fn negotiation(&self) -> Vec<&TelnetFrame> {
        self.received
            .iter()
            .filter_map(|r| match r {
                Received::Negotiation(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }
}
