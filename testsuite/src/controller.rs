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

//! Simulated controller shell

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use krcc_client::{BLOCK_NUMBER, ETB, STX, SessionConfig};
use krcc_telnetcodec::consts::ttype;
use krcc_telnetcodec::{CodecError, TelnetCodec, TelnetFrame, TelnetOption};
use memchr::{memchr, memmem};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::codec::Framed;
use tracing::{debug, info};

use crate::script::{ControllerLog, ControllerScript, Frame, Received};

/// Pause between the writes of a chunked save
const CHUNK_DELAY: Duration = Duration::from_millis(20);

/// Controller shell on a local TCP port serving one connection
pub struct SimulatedController {
    listener: TcpListener,
    script: ControllerScript,
}

impl SimulatedController {
    /// Bind to an ephemeral port on the loopback interface
    pub async fn bind(script: ControllerScript) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener, script })
    }

    /// Bound address
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Session configuration pointing at this controller
    pub fn session_config(&self) -> io::Result<SessionConfig> {
        let addr = self.local_addr()?;
        Ok(SessionConfig::new(addr.ip().to_string(), addr.port())
            .with_login(self.script.login.clone()))
    }

    /// Serve the next connection until the client hangs up
    pub fn spawn(self) -> JoinHandle<io::Result<ControllerLog>> {
        tokio::spawn(async move {
            let (stream, peer) = self.listener.accept().await?;
            info!("Simulated controller accepted {}", peer);
            Dialog::new(stream, self.script).run().await
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Shell,
    Loading,
    Saving { closes: usize },
}

struct Dialog {
    framed: Framed<TcpStream, TelnetCodec>,
    script: ControllerScript,
    inbound: BytesMut,
    mode: Mode,
    logged_in: bool,
    awaiting_key: bool,
    steps: VecDeque<String>,
    incoming: Vec<String>,
    log: ControllerLog,
}

fn io_error(error: CodecError) -> io::Error {
    match error {
        CodecError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

impl Dialog {
    fn new(stream: TcpStream, script: ControllerScript) -> Self {
        let log = ControllerLog {
            received: Vec::new(),
            program: script.program.clone(),
        };
        Self {
            framed: Framed::new(stream, TelnetCodec::new()),
            script,
            inbound: BytesMut::new(),
            mode: Mode::Shell,
            logged_in: false,
            awaiting_key: false,
            steps: VecDeque::new(),
            incoming: Vec::new(),
            log,
        }
    }

    async fn run(mut self) -> io::Result<ControllerLog> {
        if self.script.negotiate {
            self.send_frame(TelnetFrame::Will(TelnetOption::Echo)).await?;
            self.send_frame(TelnetFrame::Do(TelnetOption::TTYPE)).await?;
            self.send_frame(TelnetFrame::Subnegotiate(
                TelnetOption::TTYPE,
                Bytes::from_static(&[ttype::SEND]),
            ))
            .await?;
        }
        self.send(b"login: ").await?;

        while let Some(frame) = self.framed.next().await {
            match frame.map_err(io_error)? {
                TelnetFrame::Data(data) => {
                    self.inbound.extend_from_slice(&data);
                    self.process().await?;
                }
                other => self.log.received.push(Received::Negotiation(other)),
            }
        }
        debug!("Client hung up");
        Ok(self.log)
    }

    async fn send(&mut self, text: &[u8]) -> io::Result<()> {
        self.send_frame(TelnetFrame::Data(Bytes::copy_from_slice(text)))
            .await
    }

    async fn send_frame(&mut self, frame: TelnetFrame) -> io::Result<()> {
        self.framed.send(frame).await.map_err(io_error)
    }

    async fn process(&mut self) -> io::Result<()> {
        while !self.inbound.is_empty() {
            if self.awaiting_key {
                let key = self.inbound.split_to(1)[0];
                self.log.received.push(Received::Key(key));
                self.awaiting_key = false;
                self.next_step().await?;
                continue;
            }
            if self.inbound[0] == STX {
                let Some(end) = memchr(ETB, &self.inbound) else {
                    return Ok(());
                };
                let raw = self.inbound.split_to(end + 1);
                let body = raw.get(2 + BLOCK_NUMBER.len()..raw.len() - 1).unwrap_or_default();
                let frame = Frame {
                    tag: raw.get(1).copied().unwrap_or_default(),
                    payload: Bytes::copy_from_slice(body),
                };
                self.log.received.push(Received::Frame(frame.clone()));
                self.on_frame(frame).await?;
                continue;
            }
            let Some(pos) = memmem::find(&self.inbound, b"\r\n") else {
                return Ok(());
            };
            let raw = self.inbound.split_to(pos + 2);
            let line = String::from_utf8_lossy(&raw[..pos]).into_owned();
            self.log.received.push(Received::Line(line.clone()));
            self.on_line(&line).await?;
        }
        Ok(())
    }

    async fn on_line(&mut self, line: &str) -> io::Result<()> {
        if !self.logged_in {
            if line == self.script.login {
                self.logged_in = true;
                if !self.script.withhold_prompt {
                    self.send(b"\r\n>").await?;
                }
            } else {
                self.send(b"\r\nlogin: ").await?;
            }
            return Ok(());
        }

        let command = line.trim();
        if command.is_empty() {
            return Ok(());
        }
        let echo = format!("{}\r\n", line);
        if command.starts_with("load") || command.starts_with("save") {
            if self.script.busy {
                return self.send(format!("{}SAVE/LOAD in progress\r\n>", echo).as_bytes()).await;
            }
            if command.starts_with("load") {
                self.mode = Mode::Loading;
                self.incoming.clear();
                return self.send(format!("{}Loading...(file.as)\r\n", echo).as_bytes()).await;
            }
            self.mode = Mode::Saving { closes: 0 };
            return self.send(echo.as_bytes()).await;
        }

        match self.script.commands.get(command).cloned() {
            Some(steps) => {
                self.steps = steps.into();
                self.send(echo.as_bytes()).await?;
                self.next_step().await
            }
            None => self.send(format!("{}Unknown command\r\n>", echo).as_bytes()).await,
        }
    }

    async fn next_step(&mut self) -> io::Result<()> {
        let Some(step) = self.steps.pop_front() else {
            return self.send(b"\r\n>").await;
        };
        if self.steps.is_empty() {
            self.send(format!("{}\r\n>", step).as_bytes()).await
        } else {
            self.awaiting_key = true;
            self.send(step.as_bytes()).await
        }
    }

    async fn send_chunked(&mut self) -> io::Result<()> {
        for line in self.log.program.clone() {
            let (head, tail) = line.as_bytes().split_at(line.len() / 2);
            let mut block = b"\x05\x02D".to_vec();
            block.extend_from_slice(head);
            self.send(&block).await?;
            sleep(CHUNK_DELAY).await;

            let mut block = tail.to_vec();
            block.extend_from_slice(b"\r\n\x17");
            self.send(&block).await?;
            sleep(CHUNK_DELAY).await;
        }
        self.send(b"\x05\x02E\x17").await
    }

    async fn on_frame(&mut self, frame: Frame) -> io::Result<()> {
        match (self.mode, frame.tag) {
            (Mode::Loading, b'A') => self.send(b"\x02A\x17").await,
            (Mode::Loading, b'C') if frame.is_eof() => {
                self.log.program = std::mem::take(&mut self.incoming);
                self.send(b"\x05\x02E\x17").await
            }
            (Mode::Loading, b'C') => {
                if self.script.reject_loads {
                    self.mode = Mode::Shell;
                    return self.send(b"\r\n1 errors\r\n>").await;
                }
                self.incoming.extend(frame.lines());
                if self.script.ack_blocks {
                    self.send(b"\x02C\x17").await?;
                }
                Ok(())
            }
            (Mode::Loading, b'E') => {
                self.mode = Mode::Shell;
                self.send(b"\r\n>").await
            }
            (Mode::Saving { .. }, b'B') if self.script.chunked_saves => self.send_chunked().await,
            (Mode::Saving { .. }, b'B') => {
                let mut stream = b"\x05\x02D".to_vec();
                for line in &self.log.program {
                    stream.extend_from_slice(line.as_bytes());
                    stream.extend_from_slice(b"\r\n");
                }
                stream.extend_from_slice(b"\x17\x05\x02E\x17");
                self.send(&stream).await
            }
            (Mode::Saving { closes }, b'E') => {
                if closes == 0 {
                    self.mode = Mode::Saving { closes: 1 };
                    return Ok(());
                }
                self.mode = Mode::Shell;
                self.send(b"\r\n>").await
            }
            (mode, tag) => {
                debug!("Ignoring frame {:?} in {:?}", tag as char, mode);
                Ok(())
            }
        }
    }
}
