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

//! Shell command exchange

use std::fmt;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tracing::{instrument, warn};

use crate::inquiry::Inquiry;
use crate::terminator::COMMAND_TERMINATORS;
use crate::{ClientError, Result, Session};

/// Accumulated controller output of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    raw: Bytes,
}

impl CommandResponse {
    /// Raw response bytes, including the echo and the final prompt
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Response decoded as text, invalid UTF-8 replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }

    /// Response lines without the echoed command and the trailing prompt
    pub fn body_lines(&self) -> Vec<String> {
        let text = self.text();
        let mut lines: Vec<String> = text.lines().map(|l| l.trim_end().to_string()).collect();
        if lines.last().is_some_and(|l| l.starts_with('>')) {
            lines.pop();
        }
        if !lines.is_empty() {
            lines.remove(0);
        }
        lines
    }

    /// Consume into raw bytes
    pub fn into_bytes(self) -> Bytes {
        self.raw
    }
}

impl fmt::Display for CommandResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.raw))
    }
}

impl Session {
    /// Run a shell command and collect its output up to the next prompt.
    ///
    /// `command` is sent with CRLF. Each terminated chunk is handed to the
    /// command resolver, whose replies (pagination, confirmations) are sent
    /// back until it reports the exchange done. `timeout` bounds every read
    /// and defaults to the session timeout.
    #[instrument(skip(self), fields(session = %self.name()))]
    pub async fn execute(
        &mut self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<CommandResponse> {
        self.ensure_connected()?;
        let timeout = timeout.unwrap_or(self.config.timeout);
        let mut accumulated = BytesMut::new();

        self.write(format!("{}\r\n", command).as_bytes()).await?;
        loop {
            let response = self.read_until_any(&COMMAND_TERMINATORS, timeout).await?;
            accumulated.extend_from_slice(&response.data);
            if !response.is_match() {
                if !response.timed_out {
                    return Err(ClientError::ConnectionClosed);
                }
                warn!("Command {:?} timed out after {:?}", command, timeout);
                return Err(ClientError::ReadTimeout {
                    timeout,
                    partial: accumulated.freeze(),
                });
            }
            match self.command_inquiry.resolve(&response.data) {
                Inquiry::Done => {
                    metrics::counter!("krcc.commands").increment(1);
                    return Ok(CommandResponse {
                        raw: accumulated.freeze(),
                    });
                }
                Inquiry::Continue(reply) => {
                    self.write(&reply).await?;
                }
                Inquiry::Abort => {
                    return Err(ClientError::Aborted {
                        banner: String::from_utf8_lossy(&accumulated).into_owned(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_lines_strip_echo_and_prompt() {
        let response = CommandResponse {
            raw: Bytes::from_static(b"WHERE\r\n     JT1  JT2\r\n     0.0  90.0\r\n>"),
        };
        assert_eq!(response.body_lines(), ["     JT1  JT2", "     0.0  90.0"]);
        assert!(response.text().ends_with('>'));
    }
}
