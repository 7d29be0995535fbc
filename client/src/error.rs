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

//! Client error types

use bytes::Bytes;
use krcc_telnetcodec::CodecError;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Client result type
pub type Result<T> = std::result::Result<T, ClientError>;

/// Local file failures, split the way callers usually react to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileErrorKind {
    /// The file does not exist
    NotFound,
    /// The process may not read or write the file
    PermissionDenied,
    /// The file exists or is held open elsewhere
    AlreadyExists,
    /// Anything else, including invalid UTF-8 content
    Other,
}

impl From<io::ErrorKind> for FileErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => FileErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => FileErrorKind::PermissionDenied,
            io::ErrorKind::AlreadyExists => FileErrorKind::AlreadyExists,
            _ => FileErrorKind::Other,
        }
    }
}

impl std::fmt::Display for FileErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileErrorKind::NotFound => write!(f, "not found"),
            FileErrorKind::PermissionDenied => write!(f, "permission denied"),
            FileErrorKind::AlreadyExists => write!(f, "already exists"),
            FileErrorKind::Other => write!(f, "file error"),
        }
    }
}

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport could not be established
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        /// `host:port` that was dialed
        address: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// The login handshake failed or timed out
    #[error("Login failed: {0}")]
    Login(String),

    /// The session is not authenticated
    #[error("Not connected")]
    NotConnected,

    /// A bounded read expired before any terminator was seen
    #[error("Read timeout after {timeout:?} ({} bytes received)", .partial.len())]
    ReadTimeout {
        /// The timeout that expired
        timeout: Duration,
        /// Everything received before the timeout
        partial: Bytes,
    },

    /// The controller already runs a save or load
    #[error("SAVE/LOAD in progress")]
    Busy,

    /// The controller reported errors during a transfer
    #[error("Transfer aborted by controller: {banner}")]
    Aborted {
        /// Controller output that triggered the abort
        banner: String,
    },

    /// A local program file could not be read or written
    #[error("File {kind}: {}: {source}", .path.display())]
    File {
        /// Path of the program file
        path: PathBuf,
        /// Classified failure
        kind: FileErrorKind,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The controller closed the connection
    #[error("Connection closed by controller")]
    ConnectionClosed,

    /// A caller-supplied argument was rejected before any I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Telnet layer failure
    #[error("Protocol error: {0}")]
    Codec(#[from] CodecError),

    /// I/O error outside the Telnet layer
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Unclassified fault
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ClientError {
    /// Wraps an I/O error raised while touching `path`.
    pub fn file(path: &Path, source: io::Error) -> Self {
        ClientError::File {
            path: path.to_path_buf(),
            kind: source.kind().into(),
            source,
        }
    }

    /// Check if the error is recoverable
    ///
    /// Only an expired read is; the session stays usable and the caller may
    /// re-issue the whole operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ClientError::ReadTimeout { .. })
    }

    /// Check if the error is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ClientError::Connect { .. }
                | ClientError::Login(_)
                | ClientError::NotConnected
                | ClientError::ConnectionClosed
                | ClientError::Io(_)
        )
    }

    /// Check if the error is a transport or protocol fault outside the named kinds
    pub fn is_unexpected(&self) -> bool {
        matches!(
            self,
            ClientError::Codec(_)
                | ClientError::Io(_)
                | ClientError::ConnectionClosed
                | ClientError::Unexpected(_)
        )
    }
}
