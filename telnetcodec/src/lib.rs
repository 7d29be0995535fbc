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

//! # KRCC Telnet Codec
//!
//! The Telnet layer beneath a robot controller terminal session. Controllers
//! speak a character-mode Telnet dialect: a handful of options are negotiated
//! at login, after which the stream is plain text interleaved with the
//! control-character framing of the program transfer protocol.
//!
//! This crate only separates those two concerns. [`TelnetCodec`] implements
//! the tokio-util [`Decoder`] and [`Encoder`] traits, turning raw bytes into
//! [`TelnetFrame`]s (coalesced data runs and command frames) and back.
//! Policy, such as which options to accept, belongs to the caller.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use futures::{SinkExt, StreamExt};
//! use krcc_telnetcodec::{TelnetCodec, TelnetFrame, TelnetOption};
//! use tokio::net::TcpStream;
//! use tokio_util::codec::Framed;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TcpStream::connect("192.168.0.2:23").await?;
//! let mut framed = Framed::new(stream, TelnetCodec::new());
//! while let Some(frame) = framed.next().await {
//!     match frame? {
//!         TelnetFrame::Data(text) => print!("{}", String::from_utf8_lossy(&text)),
//!         TelnetFrame::Will(TelnetOption::Echo) => {
//!             framed.send(TelnetFrame::Do(TelnetOption::Echo)).await?;
//!         }
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Protocol Details
//!
//! - 2-byte commands: `IAC <command>`
//! - 3-byte negotiation: `IAC <DO|DONT|WILL|WONT> <option>`
//! - Subnegotiation: `IAC SB <option> <data...> IAC SE`
//! - A literal 0xFF is sent as `IAC IAC`
//!
//! [`Decoder`]: tokio_util::codec::Decoder
//! [`Encoder`]: tokio_util::codec::Encoder

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod codec;
pub mod consts;
mod frame;
mod options;
mod result;

pub use self::codec::{DEFAULT_SUBNEGOTIATION_LIMIT, TelnetCodec};
pub use self::frame::TelnetFrame;
pub use self::options::TelnetOption;
pub use self::result::{CodecError, CodecResult};
