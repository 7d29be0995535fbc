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

//! Controller session lifecycle
//!
//! A [`Session`] moves from disconnected to connected when the transport
//! opens, and to authenticated once the login handshake sees the shell
//! prompt. Commands and transfers require the authenticated state. A failed
//! login tears the transport down again.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info, instrument, warn};

use crate::inquiry::{CommandInquiry, InquiryPolicy, TransferInquiry};
use crate::progress::{LogProgress, ProgressReporter};
use crate::terminator::{Terminators, cue};
use crate::transcript::Transcript;
use crate::transfer::TransferState;
use crate::transport::{Expect, FixedNegotiator, Link, Negotiator, Transport};
use crate::{ClientError, Result, SessionConfig};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport
    Disconnected,
    /// Transport open, login pending
    Connected,
    /// Logged in at the shell prompt
    Authenticated,
}

/// Interactive session with one robot controller
pub struct Session {
    pub(crate) config: SessionConfig,
    state: SessionState,
    transport: Option<Transport>,
    negotiator: Arc<dyn Negotiator>,
    pub(crate) transcript: Transcript,
    pub(crate) command_inquiry: Box<dyn InquiryPolicy>,
    pub(crate) transfer_inquiry: Box<dyn InquiryPolicy>,
    pub(crate) progress: Box<dyn ProgressReporter>,
    pub(crate) transfer_state: TransferState,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name())
            .field("state", &self.state)
            .field("transfer_state", &self.transfer_state)
            .field("transcript", &self.transcript.path())
            .finish()
    }
}

impl Session {
    /// Create a disconnected session
    pub fn new(config: SessionConfig) -> Self {
        let negotiator = Arc::new(FixedNegotiator::new(config.terminal_type.clone()));
        Self {
            config,
            state: SessionState::Disconnected,
            transport: None,
            negotiator,
            transcript: Transcript::new(),
            command_inquiry: Box::new(CommandInquiry),
            transfer_inquiry: Box::new(TransferInquiry),
            progress: Box::new(LogProgress),
            transfer_state: TransferState::Idle,
        }
    }

    /// Create a session and connect it right away
    pub async fn open(config: SessionConfig) -> Result<Self> {
        let mut session = Self::new(config);
        session.connect().await?;
        Ok(session)
    }

    /// Log in over an already established link
    pub async fn attach(config: SessionConfig, link: impl Link + 'static) -> Result<Self> {
        let mut session = Self::new(config);
        session.transport = Some(Transport::new(link, session.negotiator.clone()));
        session.state = SessionState::Connected;
        session.login().await?;
        Ok(session)
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether commands and transfers may run
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Transfer phase, `Idle` outside of loads and saves
    pub fn transfer_state(&self) -> TransferState {
        self.transfer_state
    }

    /// Diagnostic descriptor, see [`SessionConfig::name`]
    pub fn name(&self) -> String {
        self.config.name()
    }

    /// Replace the negotiation policy used by later connections
    pub fn set_negotiator(&mut self, negotiator: impl Negotiator + 'static) {
        self.negotiator = Arc::new(negotiator);
    }

    /// Replace the resolver consulted by [`execute`](Self::execute)
    pub fn set_command_inquiry(&mut self, policy: impl InquiryPolicy + 'static) {
        self.command_inquiry = Box::new(policy);
    }

    /// Replace the resolver consulted during loads
    pub fn set_transfer_inquiry(&mut self, policy: impl InquiryPolicy + 'static) {
        self.transfer_inquiry = Box::new(policy);
    }

    /// Replace the load progress reporter
    pub fn set_progress(&mut self, reporter: impl ProgressReporter + 'static) {
        self.progress = Box::new(reporter);
    }

    /// Connect and log in, retrying refused or timed out connections.
    #[instrument(skip(self), fields(session = %self.name()))]
    pub async fn connect(&mut self) -> Result<()> {
        if self.state != SessionState::Disconnected {
            self.disconnect().await?;
        }
        let attempts = self.config.max_connect_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.connect_once().await {
                Ok(()) => return Ok(()),
                Err(e @ ClientError::Connect { .. }) if attempt < attempts => {
                    warn!(
                        "Connection attempt {}/{} failed: {}",
                        attempt, attempts, e
                    );
                    tokio::time::sleep(self.config.reconnect_delay).await;
                }
                Err(e) => {
                    error!("Connection error: {}", e);
                    return Err(e);
                }
            }
        }
    }

    async fn connect_once(&mut self) -> Result<()> {
        let transport = Transport::connect(
            &self.config.host,
            self.config.port,
            self.config.connect_timeout,
            self.config.tcp_nodelay,
            self.negotiator.clone(),
        )
        .await?;
        self.transport = Some(transport);
        self.state = SessionState::Connected;
        self.login().await
    }

    /// Drop the current connection and connect with `config`.
    pub async fn reconnect(&mut self, config: SessionConfig) -> Result<()> {
        self.disconnect().await?;
        if config.terminal_type != self.config.terminal_type {
            self.negotiator = Arc::new(FixedNegotiator::new(config.terminal_type.clone()));
        }
        self.config = config;
        self.connect().await
    }

    async fn login(&mut self) -> Result<()> {
        let timeout = self.config.timeout;
        let result = async {
            self.read_until(cue::LOGIN, timeout).await?.require(timeout)?;
            let login = format!("{}\r\n", self.config.login);
            self.write(login.as_bytes()).await?;
            self.read_until(cue::PROMPT_MARK, timeout)
                .await?
                .require(timeout)?;
            Ok::<_, ClientError>(())
        }
        .await;

        match result {
            Ok(()) => {
                self.state = SessionState::Authenticated;
                info!("Logged in to {}", self.config.address());
                Ok(())
            }
            Err(e) => {
                error!("Login failed: {}", e);
                if let Some(mut transport) = self.transport.take() {
                    transport.close().await?;
                }
                self.state = SessionState::Disconnected;
                Err(match e {
                    ClientError::ReadTimeout { timeout, .. } => {
                        ClientError::Login(format!("no prompt within {:?}", timeout))
                    }
                    ClientError::ConnectionClosed => {
                        ClientError::Login("connection closed by controller".to_string())
                    }
                    other => other,
                })
            }
        }
    }

    /// Close the transport. Disconnecting twice is not an error.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await?;
            info!("Disconnected from {}", self.config.address());
        }
        self.state = SessionState::Disconnected;
        self.transfer_state = TransferState::Idle;
        Ok(())
    }

    /// Mirror traffic into `path`, appending to an existing file
    pub async fn start_transcript(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.transcript.start(path).await
    }

    /// Stop mirroring and close the transcript
    pub async fn stop_transcript(&mut self) {
        self.transcript.stop().await
    }

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if self.state == SessionState::Authenticated && self.transport.is_some() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    fn transport(&mut self) -> Result<&mut Transport> {
        self.transport.as_mut().ok_or(ClientError::NotConnected)
    }

    pub(crate) async fn write(&mut self, data: &[u8]) -> Result<usize> {
        let written = self.transport()?.write_raw(data).await?;
        debug!("Sent {:?}", String::from_utf8_lossy(data));
        self.transcript.record(data).await;
        Ok(written)
    }

    pub(crate) async fn read_until(
        &mut self,
        pattern: &[u8],
        timeout: std::time::Duration,
    ) -> Result<Expect> {
        let response = self.transport()?.read_until(pattern, timeout).await?;
        self.observe(&response.data).await;
        Ok(response)
    }

    pub(crate) async fn read_until_any(
        &mut self,
        terminators: &Terminators,
        timeout: std::time::Duration,
    ) -> Result<Expect> {
        let response = self
            .transport()?
            .read_until_any(terminators.patterns(), timeout)
            .await?;
        self.observe(&response.data).await;
        Ok(response)
    }

    pub(crate) async fn read_available(&mut self) -> Result<Bytes> {
        let data = self.transport()?.read_available().await?;
        self.observe(&data).await;
        Ok(data)
    }

    async fn observe(&mut self, data: &[u8]) {
        if !data.is_empty() {
            debug!("Received {:?}", String::from_utf8_lossy(data));
            self.transcript.record(data).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
    use tracing_test::traced_test;

    fn config() -> SessionConfig {
        SessionConfig::new("controller", 23).with_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    #[traced_test]
    async fn attach_logs_in() {
        let (client, mut server) = duplex(1024);
        let controller = tokio::spawn(async move {
            server.write_all(b"login: ").await.unwrap();
            let mut buf = [0u8; 4];
            server.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"as\r\n");
            server.write_all(b"\r\n>").await.unwrap();
            server
        });
        let session = Session::attach(config(), client).await.unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
        assert!(session.is_connected());
        assert!(logs_contain("Logged in to controller:23"));
        controller.await.unwrap();
    }

    #[tokio::test]
    async fn login_timeout_leaves_session_disconnected() {
        let (client, _server) = duplex(1024);
        let err = Session::attach(config(), client).await.unwrap_err();
        assert!(matches!(err, ClientError::Login(_)));
    }

    #[tokio::test]
    async fn new_session_is_not_connected() {
        let mut session = Session::new(config());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(matches!(
            session.ensure_connected(),
            Err(ClientError::NotConnected)
        ));
        session.disconnect().await.unwrap();
        session.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn connect_refused_is_connect_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let config = SessionConfig::new("127.0.0.1", port)
            .with_connect_timeout(Duration::from_millis(500))
            .with_max_connect_attempts(2)
            .with_reconnect_delay(Duration::from_millis(10));
        let err = Session::open(config).await.unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
    }
}
