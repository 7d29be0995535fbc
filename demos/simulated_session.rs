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

//! Runs a full session against the simulated controller
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=debug cargo run --example simulated_session
//! ```

use krcc_client::{ProgramFile, Session};
use krcc_testsuite::{ControllerScript, SimulatedController};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("krcc_client=info".parse()?),
        )
        .init();

    let controller = SimulatedController::bind(ControllerScript::default()).await?;
    let config = controller.session_config()?;
    let handle = controller.spawn();

    let mut session = Session::open(config).await?;
    info!("Connected: {}", session.name());

    let position = session.execute("WHERE", None).await?;
    for line in position.body_lines() {
        info!("{}", line);
    }

    let program = ProgramFile::from_lines([".PROGRAM demo()", "  HOME", ".END"]);
    let report = session.load_program(&program, None).await?;
    info!("Loaded {} bytes in {} blocks", report.bytes, report.blocks);

    let saved = session.fetch(Some("demo"), None).await?;
    info!("Controller holds {} lines", saved.len());

    session.disconnect().await?;
    let log = handle.await??;
    info!("Controller received {} messages", log.received.len());
    Ok(())
}
