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

//! Session configuration

use std::time::Duration;

/// Robot controller session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Controller hostname or IP address
    pub host: String,

    /// Controller port
    pub port: u16,

    /// Login identifier sent at the `login: ` prompt
    pub login: String,

    /// Default per-read timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Wait for the controller's first answer to a `load` request
    pub request_timeout: Duration,

    /// Wait for each block acknowledgment and trailer cue during a transfer
    pub block_timeout: Duration,

    /// Disable Nagle's algorithm on the socket
    pub tcp_nodelay: bool,

    /// Terminal type reported during negotiation
    pub terminal_type: String,

    /// Delay between connection attempts
    pub reconnect_delay: Duration,

    /// Connection attempts before giving up (at least one is always made)
    pub max_connect_attempts: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 23,
            login: "as".to_string(),
            timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(20),
            request_timeout: Duration::from_secs(2),
            block_timeout: Duration::from_secs(1),
            tcp_nodelay: false,
            terminal_type: "VT100".to_string(),
            reconnect_delay: Duration::from_secs(1),
            max_connect_attempts: 1,
        }
    }
}

impl SessionConfig {
    /// Create a new session configuration with the given host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the login identifier
    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = login.into();
        self
    }

    /// Set the default per-read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the short timeouts used by the transfer protocol
    pub fn with_transfer_timeouts(mut self, request: Duration, block: Duration) -> Self {
        self.request_timeout = request;
        self.block_timeout = block;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn with_tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set the terminal type
    pub fn with_terminal_type(mut self, terminal_type: impl Into<String>) -> Self {
        self.terminal_type = terminal_type.into();
        self
    }

    /// Set the reconnection delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the maximum connection attempts
    pub fn with_max_connect_attempts(mut self, attempts: usize) -> Self {
        self.max_connect_attempts = attempts;
        self
    }

    /// Get the controller address as a string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Human-readable session descriptor for diagnostics.
    ///
    /// `TCP login@host, port, timeout_ms` with `,TCP_NODELAY` appended when
    /// Nagle's algorithm is disabled.
    pub fn name(&self) -> String {
        format!(
            "TCP {}@{}, {}, {}{}",
            self.login,
            self.host,
            self.port,
            self.timeout.as_millis(),
            if self.tcp_nodelay { ",TCP_NODELAY" } else { "" }
        )
    }
}
