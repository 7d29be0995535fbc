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

//! Telnet transport
//!
//! [`Transport`] owns the framed connection to the controller. Telnet
//! negotiation is answered inline while reading, and received data collects
//! in a pending buffer that the bounded read primitives consume up to the
//! first completed terminator.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{FutureExt, SinkExt, StreamExt};
use krcc_telnetcodec::consts::ttype;
use krcc_telnetcodec::{TelnetCodec, TelnetFrame, TelnetOption};
use memchr::memmem;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout, timeout_at};
use tokio_util::codec::Framed;
use tracing::{debug, trace, warn};

use crate::terminator::first_match;
use crate::{ClientError, Result};

/// A duplex byte stream the transport can run over
pub trait Link: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> Link for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Answers Telnet option negotiation from the controller
pub trait Negotiator: Send + Sync {
    /// Reply to `frame`, or `None` to stay silent
    fn respond(&self, frame: &TelnetFrame) -> Option<TelnetFrame>;
}

/// Fixed negotiation table of the controller shell.
///
/// | Received            | Reply                       |
/// |---------------------|-----------------------------|
/// | WILL ECHO           | DO ECHO                     |
/// | DO TTYPE            | WILL TTYPE                  |
/// | SB TTYPE SEND       | SB TTYPE IS `terminal_type` |
///
/// Anything else is logged and left unanswered.
#[derive(Debug, Clone)]
pub struct FixedNegotiator {
    terminal_type: String,
}

impl FixedNegotiator {
    /// Create a negotiator reporting `terminal_type`
    pub fn new(terminal_type: impl Into<String>) -> Self {
        Self {
            terminal_type: terminal_type.into(),
        }
    }
}

impl Default for FixedNegotiator {
    fn default() -> Self {
        Self::new("VT100")
    }
}

impl Negotiator for FixedNegotiator {
    fn respond(&self, frame: &TelnetFrame) -> Option<TelnetFrame> {
        match frame {
            TelnetFrame::Will(TelnetOption::Echo) => Some(TelnetFrame::Do(TelnetOption::Echo)),
            TelnetFrame::Do(TelnetOption::TTYPE) => Some(TelnetFrame::Will(TelnetOption::TTYPE)),
            TelnetFrame::Subnegotiate(TelnetOption::TTYPE, payload)
                if payload.first() == Some(&ttype::SEND) =>
            {
                let mut reply = Vec::with_capacity(self.terminal_type.len() + 1);
                reply.push(ttype::IS);
                reply.extend_from_slice(self.terminal_type.as_bytes());
                Some(TelnetFrame::Subnegotiate(TelnetOption::TTYPE, reply.into()))
            }
            other => {
                warn!("Unexpected telnet negotiation: {:?}", other);
                None
            }
        }
    }
}

/// Outcome of a bounded read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expect {
    /// Index of the terminator that completed the read
    pub matched: Option<usize>,
    /// Bytes consumed, ending with the terminator when one matched
    pub data: Bytes,
    /// The read gave up because its deadline expired
    pub timed_out: bool,
}

impl Expect {
    /// Whether a terminator completed the read
    pub fn is_match(&self) -> bool {
        self.matched.is_some()
    }

    /// Whether no bytes were consumed
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the consumed bytes contain `needle`
    pub fn contains(&self, needle: &[u8]) -> bool {
        memmem::find(&self.data, needle).is_some()
    }

    /// Text of the consumed bytes
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    /// The consumed bytes if a terminator matched, otherwise an error
    /// carrying them.
    pub fn require(self, timeout: Duration) -> Result<Bytes> {
        match (self.matched, self.timed_out) {
            (Some(_), _) => Ok(self.data),
            (None, true) => Err(ClientError::ReadTimeout {
                timeout,
                partial: self.data,
            }),
            (None, false) => Err(ClientError::ConnectionClosed),
        }
    }
}

/// Telnet connection to a controller
pub struct Transport {
    framed: Framed<Box<dyn Link>, TelnetCodec>,
    negotiator: Arc<dyn Negotiator>,
    pending: BytesMut,
    eof: bool,
    closed: bool,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("pending", &self.pending.len())
            .field("eof", &self.eof)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Transport {
    /// Wrap an established link
    pub fn new(link: impl Link + 'static, negotiator: Arc<dyn Negotiator>) -> Self {
        let link: Box<dyn Link> = Box::new(link);
        Self {
            framed: Framed::new(link, TelnetCodec::new()),
            negotiator,
            pending: BytesMut::new(),
            eof: false,
            closed: false,
        }
    }

    /// Dial `host:port` over TCP
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        nodelay: bool,
        negotiator: Arc<dyn Negotiator>,
    ) -> Result<Self> {
        let address = format!("{}:{}", host, port);
        debug!("Connecting to {}", address);
        let stream = match timeout(connect_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ClientError::Connect { address, source }),
            Err(_) => {
                return Err(ClientError::Connect {
                    address,
                    source: io::Error::new(io::ErrorKind::TimedOut, "connection timed out"),
                })
            }
        };
        stream
            .set_nodelay(nodelay)
            .map_err(|source| ClientError::Connect {
                address: address.clone(),
                source,
            })?;
        metrics::counter!("krcc.transport.connections").increment(1);
        Ok(Self::new(stream, negotiator))
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes received but not yet consumed
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Write `data` with IAC escaping and flush it.
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(ClientError::ConnectionClosed);
        }
        if data.is_empty() {
            return Ok(0);
        }
        self.framed
            .send(TelnetFrame::Data(Bytes::copy_from_slice(data)))
            .await?;
        metrics::counter!("krcc.transport.bytes_sent").increment(data.len() as u64);
        Ok(data.len())
    }

    /// Read until `pattern` or until `timeout` expires.
    pub async fn read_until(&mut self, pattern: &[u8], timeout: Duration) -> Result<Expect> {
        self.read_until_any(&[pattern], timeout).await
    }

    /// Read until any of `patterns` completes or until `timeout` expires.
    ///
    /// On a match the bytes up to and including the earliest completed
    /// terminator are consumed. On expiry everything received is consumed
    /// and returned unmatched. A closed peer returns what is left the same
    /// way, and fails with [`ClientError::ConnectionClosed`] once nothing
    /// is left.
    pub async fn read_until_any(&mut self, patterns: &[&[u8]], timeout: Duration) -> Result<Expect> {
        if self.closed {
            return Err(ClientError::ConnectionClosed);
        }
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(found) = first_match(patterns, &self.pending) {
                return Ok(Expect {
                    matched: Some(found.index),
                    data: self.pending.split_to(found.end).freeze(),
                    timed_out: false,
                });
            }
            if self.eof {
                if self.pending.is_empty() {
                    return Err(ClientError::ConnectionClosed);
                }
                return Ok(self.take_unmatched(false));
            }
            match timeout_at(deadline, self.framed.next()).await {
                Ok(Some(frame)) => self.handle(frame?).await?,
                Ok(None) => {
                    debug!("Controller closed the connection");
                    self.eof = true;
                }
                Err(_) => {
                    metrics::counter!("krcc.transport.read_timeouts").increment(1);
                    trace!("Read expired with {} bytes pending", self.pending.len());
                    return Ok(self.take_unmatched(true));
                }
            }
        }
    }

    /// Consume whatever has already arrived without waiting.
    pub async fn read_available(&mut self) -> Result<Bytes> {
        if self.closed {
            return Err(ClientError::ConnectionClosed);
        }
        while !self.eof {
            match self.framed.next().now_or_never() {
                Some(Some(frame)) => self.handle(frame?).await?,
                Some(None) => self.eof = true,
                None => break,
            }
        }
        Ok(self.pending.split().freeze())
    }

    /// Shut the connection down. Closing twice is not an error.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.pending.clear();
        if let Err(e) = self.framed.get_mut().shutdown().await {
            if e.kind() != io::ErrorKind::NotConnected {
                warn!("Error shutting down connection: {}", e);
            }
        }
        Ok(())
    }

    fn take_unmatched(&mut self, timed_out: bool) -> Expect {
        Expect {
            matched: None,
            data: self.pending.split().freeze(),
            timed_out,
        }
    }

    async fn handle(&mut self, frame: TelnetFrame) -> Result<()> {
        match frame {
            TelnetFrame::Data(data) => {
                metrics::counter!("krcc.transport.bytes_received").increment(data.len() as u64);
                self.pending.extend_from_slice(&data);
            }
            frame if frame.is_negotiation() => {
                if let Some(reply) = self.negotiator.respond(&frame) {
                    debug!("Negotiation {:?} -> {:?}", frame, reply);
                    self.framed.send(reply).await?;
                }
            }
            other => trace!("Ignoring telnet command {:?}", other),
        }
        Ok(())
    }
}
