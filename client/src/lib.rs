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

//! # Robot Controller Client
//!
//! Async client for the Telnet shell of Kawasaki-style robot controllers.
//!
//! ## Features
//!
//! - **Session Lifecycle** - Connect, log in, reconnect and disconnect
//! - **Command Exchange** - Run shell commands, answering pagination and
//!   confirmation cues automatically
//! - **Program Transfer** - Load and save programs over the block protocol
//! - **Transcript** - Mirror traffic into a text file for operators
//!
//! ## Quick Start
//!
//! ```no_run
//! use krcc_client::{Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new("192.168.0.2", 23).with_tcp_nodelay(true);
//!     let mut session = Session::open(config).await?;
//!
//!     let position = session.execute("WHERE", None).await?;
//!     println!("{}", position);
//!
//!     session.load("main.as", None).await?;
//!     session.save("backup.as", Some("main"), None).await?;
//!     session.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Resolvers
//!
//! ```no_run
//! # use krcc_client::{Inquiry, Session};
//! # fn example(session: &mut Session) {
//! session.set_command_inquiry(|response: &[u8]| {
//!     if response.ends_with(b"\n>") {
//!         Inquiry::Done
//!     } else {
//!         Inquiry::Continue(bytes::Bytes::from_static(b" "))
//!     }
//! });
//! # }
//! ```

mod block;
mod command;
mod config;
mod error;
mod inquiry;
mod program;
mod progress;
mod session;
pub mod terminator;
mod transcript;
mod transfer;
mod transport;

pub use block::{
    BLOCK_NUMBER, ENQ, ETB, FRAME_OVERHEAD, FrameTag, MAX_FRAME_LEN, STX, SUB, TransferBlock,
    control_frame, data_frame, eof_frame, split_into_blocks, strip_control_sequences,
};
pub use command::CommandResponse;
pub use config::SessionConfig;
pub use error::{ClientError, FileErrorKind, Result};
pub use inquiry::{
    COMMAND_RULES, CommandInquiry, Inquiry, InquiryPolicy, InquiryRule, RuleTable, TRANSFER_RULES,
    TransferInquiry, Verdict,
};
pub use program::{ProgramFile, TRANSFER_FILE_NAME};
pub use progress::{LogProgress, ProgressReporter};
pub use session::{Session, SessionState};
pub use transcript::Transcript;
pub use transfer::{LoadReport, SILENT_READ_LIMIT, SaveReport, TransferState};
pub use transport::{Expect, FixedNegotiator, Link, Negotiator, Transport};
