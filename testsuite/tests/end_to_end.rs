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

use std::time::Duration;

use krcc_client::{
    ClientError, ProgramFile, SILENT_READ_LIMIT, Session, SessionConfig, SessionState,
    TransferState, eof_frame,
};
use krcc_telnetcodec::{TelnetFrame, TelnetOption};
use krcc_testsuite::{ControllerLog, ControllerScript, Received, SimulatedController, WHERE_OUTPUT};
use tokio::task::JoinHandle;

const PROGRAM: &str = ".PROGRAM main()\n  HOME\n  JMOVE #pick\n.END\n";

type ControllerTask = JoinHandle<std::io::Result<ControllerLog>>;

async fn start(script: ControllerScript) -> (SessionConfig, ControllerTask) {
    let controller = SimulatedController::bind(script).await.unwrap();
    let config = controller
        .session_config()
        .unwrap()
        .with_timeout(Duration::from_secs(2))
        .with_transfer_timeouts(Duration::from_millis(200), Duration::from_millis(100));
    (config, controller.spawn())
}

#[tokio::test]
async fn where_returns_coordinates() {
    let (config, controller) = start(ControllerScript::default()).await;
    let mut session = Session::open(config).await.unwrap();
    assert_eq!(session.state(), SessionState::Authenticated);

    let response = session.execute("WHERE", None).await.unwrap();
    let body = response.body_lines();
    assert!(body[0].contains("JT1"));
    assert!(body[1].contains("30.000"));
    assert_eq!(response.text(), format!("WHERE\r\n{}\r\n>", WHERE_OUTPUT));

    session.disconnect().await.unwrap();
    let log = controller.await.unwrap().unwrap();
    assert_eq!(log.lines(), ["as", "WHERE"]);
    assert_eq!(
        log.negotiation(),
        [
            &TelnetFrame::Do(TelnetOption::Echo),
            &TelnetFrame::Will(TelnetOption::TTYPE),
            &TelnetFrame::Subnegotiate(TelnetOption::TTYPE, bytes::Bytes::from_static(b"\x00VT100")),
        ]
    );
}

#[tokio::test]
async fn paged_command_is_continued() {
    let script = ControllerScript::default().with_command(
        "LIST",
        vec!["page 1\r\nPress SPACE key to continue.", "\r\npage 2"],
    );
    let (config, controller) = start(script).await;
    let mut session = Session::open(config).await.unwrap();

    let response = session.execute("LIST", None).await.unwrap();
    let text = response.text();
    assert!(text.contains("page 1"));
    assert!(text.contains("page 2"));

    session.disconnect().await.unwrap();
    let log = controller.await.unwrap().unwrap();
    assert!(log.received.contains(&Received::Key(b' ')));
}

#[tokio::test]
async fn load_sends_one_block_and_finalizes_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.as");
    std::fs::write(&path, PROGRAM).unwrap();

    let (config, controller) = start(ControllerScript::default()).await;
    let mut session = Session::open(config).await.unwrap();
    let report = session.load(&path, None).await.unwrap();
    assert_eq!(report.blocks, 1);
    assert_eq!(report.bytes, PROGRAM.len());
    assert_eq!(session.transfer_state(), TransferState::Idle);

    session.disconnect().await.unwrap();
    let log = controller.await.unwrap().unwrap();
    let frames = log.frames();
    let tags: Vec<u8> = frames.iter().map(|f| f.tag).collect();
    assert_eq!(tags, b"ACCE");
    assert!(frames[1].is_data());
    assert_eq!(frames[1].lines(), ProgramFile::parse(PROGRAM).lines());
    assert!(frames[2].is_eof());
    assert_eq!(&eof_frame()[2..7], b"    0");

    let order: Vec<&Received> = log
        .received
        .iter()
        .filter(|r| !matches!(r, Received::Negotiation(_)))
        .collect();
    assert_eq!(order[1], &Received::Line("load file".to_string()));
    assert!(matches!(order[4], Received::Frame(f) if f.is_eof()));
    assert_eq!(order[5], &Received::Line(String::new()));
    assert!(matches!(order[6], Received::Frame(f) if f.tag == b'E'));
    assert_eq!(log.program, ProgramFile::parse(PROGRAM).lines());
}

#[tokio::test]
async fn busy_controller_receives_no_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.as");
    std::fs::write(&path, PROGRAM).unwrap();

    let (config, controller) = start(ControllerScript::default().busy()).await;
    let mut session = Session::open(config).await.unwrap();
    let err = session.load(&path, None).await.unwrap_err();
    assert!(matches!(err, ClientError::Busy));
    assert_eq!(session.transfer_state(), TransferState::Aborted);

    session.disconnect().await.unwrap();
    let log = controller.await.unwrap().unwrap();
    assert!(log.frames().is_empty());
}

#[tokio::test]
async fn busy_save_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backup.as");

    let (config, controller) = start(ControllerScript::default().busy()).await;
    let mut session = Session::open(config).await.unwrap();
    let err = session.save(&path, None, None).await.unwrap_err();
    assert!(matches!(err, ClientError::Busy));
    assert!(!path.exists());

    session.disconnect().await.unwrap();
    controller.await.unwrap().unwrap();
}

#[tokio::test]
async fn silent_controller_stalls_load() {
    let program = ProgramFile::from_lines((0..10).map(|i| format!("{:0>199}", i)));
    let (config, controller) = start(ControllerScript::default().without_block_acks()).await;
    let mut session = Session::open(config).await.unwrap();
    let report = session.load_program(&program, None).await.unwrap();
    assert!(report.stalled);
    assert_eq!(report.blocks, SILENT_READ_LIMIT);
    assert_eq!(session.transfer_state(), TransferState::Idle);

    session.disconnect().await.unwrap();
    let log = controller.await.unwrap().unwrap();
    let frames = log.frames();
    assert_eq!(frames.iter().filter(|f| f.is_data()).count(), SILENT_READ_LIMIT);
    assert!(frames[frames.len() - 2].is_eof());
    assert_eq!(frames[frames.len() - 1].tag, b'E');
    assert_eq!(log.program, program.lines()[..6]);
}

#[tokio::test]
async fn chunked_save_is_reassembled() {
    let lines = [".PROGRAM main()", "  HOME", "  JMOVE #pick", ".END"];
    let script = ControllerScript::default()
        .with_program(lines.to_vec())
        .chunked_saves();
    let (config, controller) = start(script).await;
    let mut session = Session::open(config).await.unwrap();

    let saved = session.fetch(Some("main"), None).await.unwrap();
    assert_eq!(saved.lines(), lines);
    assert_eq!(session.transfer_state(), TransferState::Idle);
    let response = session.execute("WHERE", None).await.unwrap();
    assert!(response.text().contains("JT1"));

    session.disconnect().await.unwrap();
    let log = controller.await.unwrap().unwrap();
    let tags: Vec<u8> = log.frames().iter().map(|f| f.tag).collect();
    assert_eq!(tags, b"BEE");
}

#[tokio::test]
async fn rejected_load_is_aborted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.as");
    std::fs::write(&path, PROGRAM).unwrap();

    let (config, controller) = start(ControllerScript::default().reject_loads()).await;
    let mut session = Session::open(config).await.unwrap();
    let err = session.load(&path, None).await.unwrap_err();
    assert!(matches!(err, ClientError::Aborted { .. }));

    session.disconnect().await.unwrap();
    let log = controller.await.unwrap().unwrap();
    assert_eq!(log.frames().len(), 2);
}

#[tokio::test]
async fn load_then_save_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("main.as");
    let backup = dir.path().join("backup.as");
    let transcript = dir.path().join("session.log");
    std::fs::write(&source, PROGRAM).unwrap();

    let (config, controller) = start(ControllerScript::default()).await;
    let mut session = Session::open(config).await.unwrap();
    session.start_transcript(&transcript).await.unwrap();

    session.load(&source, None).await.unwrap();
    let report = session.save(&backup, Some("main"), None).await.unwrap();
    assert_eq!(report.lines, 4);
    assert_eq!(std::fs::read_to_string(&backup).unwrap(), PROGRAM);

    session.stop_transcript().await;
    session.disconnect().await.unwrap();
    let log = controller.await.unwrap().unwrap();
    assert!(log.lines().contains(&"save file.as=main"));

    let text = std::fs::read_to_string(&transcript).unwrap();
    assert!(text.contains("Loading...(file.as)"));
    assert!(text.contains("Saving...(file.as)"));
    assert!(text.contains("=main"));
    assert!(!text.contains("JMOVE"));
}

#[tokio::test]
async fn commands_require_connection() {
    let mut session = Session::new(SessionConfig::new("127.0.0.1", 23));
    assert!(matches!(
        session.execute("WHERE", None).await,
        Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
async fn login_without_prompt_times_out() {
    let (config, controller) = start(ControllerScript::default().withhold_prompt()).await;
    let config = config.with_timeout(Duration::from_millis(300));
    let err = Session::open(config).await.unwrap_err();
    assert!(matches!(err, ClientError::Login(_)));
    let log = controller.await.unwrap().unwrap();
    assert_eq!(log.lines(), ["as"]);
}
