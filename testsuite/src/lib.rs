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

//! # Robot Controller Test Suite
//!
//! A [`SimulatedController`] listens on a loopback port and plays the
//! controller side of the shell: Telnet negotiation, login, scripted
//! command output and the program transfer handshake. Everything the client
//! sends is recorded in a [`ControllerLog`] returned when the client hangs
//! up.
//!
//! ```no_run
//! use krcc_client::Session;
//! use krcc_testsuite::{ControllerScript, SimulatedController};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = SimulatedController::bind(ControllerScript::default()).await?;
//! let config = controller.session_config()?;
//! let handle = controller.spawn();
//!
//! let mut session = Session::open(config).await?;
//! session.execute("WHERE", None).await?;
//! session.disconnect().await?;
//!
//! let log = handle.await??;
//! assert!(log.lines().contains(&"WHERE"));
//! # Ok(())
//! # }
//! ```

mod controller;
mod script;

pub use controller::SimulatedController;
pub use script::{ControllerLog, ControllerScript, Frame, Received, WHERE_OUTPUT};
