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

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use krcc_client::{
    ClientError, FrameTag, Inquiry, MAX_FRAME_LEN, ProgramFile, SILENT_READ_LIMIT, Session,
    SessionConfig, TransferState, control_frame, data_frame, eof_frame, split_into_blocks,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

fn config() -> SessionConfig {
    SessionConfig::new("controller", 23)
        .with_timeout(Duration::from_secs(2))
        .with_transfer_timeouts(Duration::from_millis(100), Duration::from_millis(100))
}

async fn expect(server: &mut DuplexStream, expected: &[u8]) {
    let mut buf = vec![0u8; expected.len()];
    server.read_exact(&mut buf).await.unwrap();
    assert_eq!(
        String::from_utf8_lossy(&buf),
        String::from_utf8_lossy(expected)
    );
}

async fn logged_in() -> (Session, DuplexStream) {
    let (client, mut server) = duplex(8192);
    let peer = tokio::spawn(async move {
        server.write_all(b"login: ").await.unwrap();
        expect(&mut server, b"as\r\n").await;
        server.write_all(b"\r\n>").await.unwrap();
        server
    });
    let session = Session::attach(config(), client).await.unwrap();
    (session, peer.await.unwrap())
}

#[tokio::test]
async fn execute_answers_pagination() {
    let (mut session, mut server) = logged_in().await;
    let peer = tokio::spawn(async move {
        expect(&mut server, b"LIST\r\n").await;
        server
            .write_all(b"LIST\r\nline 1\r\nPress SPACE key to continue.")
            .await
            .unwrap();
        expect(&mut server, b" ").await;
        server.write_all(b"\r\nline 2\r\n>").await.unwrap();
        server
    });
    let response = session.execute("LIST", None).await.unwrap();
    let text = response.text();
    assert!(text.contains("line 1"));
    assert!(text.ends_with("line 2\r\n>"));
    peer.await.unwrap();
}

#[tokio::test]
async fn execute_confirms_yes_no() {
    let (mut session, mut server) = logged_in().await;
    let peer = tokio::spawn(async move {
        expect(&mut server, b"ERESET\r\n").await;
        server.write_all(b"ERESET\r\nYes:1, No:0").await.unwrap();
        expect(&mut server, b"1").await;
        server.write_all(b"\r\n>").await.unwrap();
        server
    });
    session.execute("ERESET", None).await.unwrap();
    peer.await.unwrap();
}

#[tokio::test]
async fn execute_timeout_keeps_session_usable() {
    let (mut session, mut server) = logged_in().await;
    let peer = tokio::spawn(async move {
        expect(&mut server, b"WHERE\r\n").await;
        server.write_all(b"WHERE\r\npartial").await.unwrap();
        expect(&mut server, b"ID\r\n").await;
        server.write_all(b"ID\r\nv1\r\n>").await.unwrap();
        server
    });
    let err = session
        .execute("WHERE", Some(Duration::from_millis(100)))
        .await
        .unwrap_err();
    match err {
        ClientError::ReadTimeout { partial, .. } => assert_eq!(partial, "WHERE\r\npartial"),
        other => panic!("unexpected {:?}", other),
    }
    assert!(session.is_connected());
    let response = session.execute("ID", None).await.unwrap();
    assert_eq!(response.body_lines(), ["v1"]);
    peer.await.unwrap();
}

#[tokio::test]
async fn custom_inquiry_can_abort() {
    let (mut session, mut server) = logged_in().await;
    session.set_command_inquiry(|response: &[u8]| {
        if response.windows(5).any(|w| w == b"Error") {
            Inquiry::Abort
        } else if response.ends_with(b"continue.") {
            Inquiry::Continue(Bytes::from_static(b" "))
        } else {
            Inquiry::Done
        }
    });
    let peer = tokio::spawn(async move {
        expect(&mut server, b"BAD
").await;
        server
            .write_all(b"BAD\r\npage 1\r\nPress SPACE key to continue.")
            .await
            .unwrap();
        expect(&mut server, b" ").await;
        server.write_all(b"\r\nError\r\n>").await.unwrap();
        server
    });
    let err = session.execute("BAD", None).await.unwrap_err();
    match err {
        ClientError::Aborted { banner } => {
            assert!(banner.starts_with("BAD\r\npage 1"));
            assert!(banner.ends_with("Error\r\n>"));
        }
        other => panic!("unexpected {:?}", other),
    }
    peer.await.unwrap();
}

#[tokio::test]
async fn operations_require_login() {
    let mut session = Session::new(config());
    assert!(matches!(
        session.execute("WHERE", None).await,
        Err(ClientError::NotConnected)
    ));
    assert!(matches!(
        session.load("missing.as", None).await,
        Err(ClientError::NotConnected)
    ));
    assert!(matches!(
        session.fetch(None, None).await,
        Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
async fn load_rejects_empty_qualifier() {
    let (mut session, _server) = logged_in().await;
    let program = ProgramFile::from_lines([".PROGRAM a()", ".END"]);
    assert!(matches!(
        session.load_program(&program, Some("")).await,
        Err(ClientError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn load_answers_menu_and_finalizes() {
    let (mut session, mut server) = logged_in().await;
    let dir = tempfile::tempdir().unwrap();
    let transcript = dir.path().join("session.log");
    session.start_transcript(&transcript).await.unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    session.set_progress(move |sent: usize, total: usize| recorder.lock().unwrap().push((sent, total)));

    let program = ProgramFile::from_lines([".PROGRAM a()", "  HOME", ".END"]);
    let peer = tokio::spawn(async move {
        expect(&mut server, b"load/Q file\r\n").await;
        server.write_all(b"load/Q file\r\n").await.unwrap();
        expect(&mut server, &control_frame(FrameTag::OpenLoad)).await;
        server.write_all(b"\x17").await.unwrap();
        expect(&mut server, b"\x02C    0.PROGRAM a()\n  HOME\n.END\n\r\n\x17").await;
        server
            .write_all(b"1:Yes, 0:No / 2:Load all, 3:Exit")
            .await
            .unwrap();
        expect(&mut server, b"2\r\n").await;
        server.write_all(b"\x02C\x17").await.unwrap();
        expect(&mut server, &eof_frame()).await;
        expect(&mut server, b"\r\n").await;
        server.write_all(b"\x05\x02E\x17").await.unwrap();
        expect(&mut server, &control_frame(FrameTag::End)).await;
        server.write_all(b"\r\n>").await.unwrap();
        server
    });

    let report = session.load_program(&program, Some("/Q")).await.unwrap();
    assert_eq!(report.blocks, 1);
    assert_eq!(report.bytes, program.byte_len());
    assert!(!report.stalled);
    assert_eq!(session.transfer_state(), TransferState::Idle);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(report.bytes, report.bytes), (report.bytes, report.bytes)]
    );
    peer.await.unwrap();

    session.stop_transcript().await;
    let text = std::fs::read_to_string(&transcript).unwrap();
    assert!(text.contains("Loading...(file.as)"));
    assert!(!text.contains(".PROGRAM"));
}

#[tokio::test]
async fn load_aborts_on_error_report() {
    let (mut session, mut server) = logged_in().await;
    let program = ProgramFile::from_lines([".PROGRAM a()", ".END"]);
    let peer = tokio::spawn(async move {
        expect(&mut server, b"load file\r\n").await;
        expect(&mut server, &control_frame(FrameTag::OpenLoad)).await;
        server.write_all(b"\x02A\x17").await.unwrap();
        expect(&mut server, b"\x02C    0.PROGRAM a()\n.END\n\r\n\x17").await;
        server.write_all(b"\r\n2 errors\r\n").await.unwrap();
        server
    });
    let err = session.load_program(&program, None).await.unwrap_err();
    match err {
        ClientError::Aborted { banner } => assert!(banner.contains("errors")),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(session.transfer_state(), TransferState::Aborted);
    assert!(session.is_connected());
    peer.await.unwrap();
}

#[tokio::test]
async fn load_reports_busy_controller() {
    let (mut session, mut server) = logged_in().await;
    let program = ProgramFile::from_lines([".PROGRAM a()", ".END"]);
    let peer = tokio::spawn(async move {
        expect(&mut server, b"load file\r\n").await;
        server
            .write_all(b"load file\r\nSAVE/LOAD in progress\r\n>")
            .await
            .unwrap();
        let mut rest = Vec::new();
        server.read_to_end(&mut rest).await.unwrap();
        rest
    });
    let err = session.load_program(&program, None).await.unwrap_err();
    assert!(matches!(err, ClientError::Busy));
    session.disconnect().await.unwrap();
    assert!(peer.await.unwrap().is_empty());
}

#[tokio::test]
async fn load_stalls_after_silent_blocks() {
    let (mut session, mut server) = logged_in().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    session.set_progress(move |sent: usize, total: usize| recorder.lock().unwrap().push((sent, total)));

    let program = ProgramFile::from_lines((0..10).map(|i| format!("{:0>199}", i)));
    let blocks = split_into_blocks(&program, MAX_FRAME_LEN);
    assert_eq!(blocks.len(), 5);
    let sent: Vec<_> = blocks.iter().take(SILENT_READ_LIMIT).map(data_frame).collect();
    let peer = tokio::spawn(async move {
        expect(&mut server, b"load file\r\n").await;
        expect(&mut server, &control_frame(FrameTag::OpenLoad)).await;
        server.write_all(b"\x02A\x17").await.unwrap();
        for frame in &sent {
            expect(&mut server, frame).await;
        }
        expect(&mut server, &eof_frame()).await;
        expect(&mut server, b"\r\n").await;
        server.write_all(b"\x05\x02E\x17").await.unwrap();
        expect(&mut server, &control_frame(FrameTag::End)).await;
        server.write_all(b"\r\n>").await.unwrap();
        server
    });

    let report = session.load_program(&program, None).await.unwrap();
    assert!(report.stalled);
    assert_eq!(report.blocks, SILENT_READ_LIMIT);
    let expected: usize = blocks.iter().take(SILENT_READ_LIMIT).map(|b| b.len()).sum();
    assert_eq!(report.bytes, expected);
    let total = program.byte_len();
    assert_eq!(seen.lock().unwrap().last(), Some(&(total, total)));
    assert_eq!(session.transfer_state(), TransferState::Idle);
    peer.await.unwrap();
}

#[tokio::test]
async fn save_reports_busy_without_waiting_for_timeout() {
    let (mut session, mut server) = logged_in().await;
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("main.as");
    let peer = tokio::spawn(async move {
        expect(&mut server, b"save file.as\r\n").await;
        server.write_all(b"save file.as\r\n").await.unwrap();
        expect(&mut server, &control_frame(FrameTag::OpenSave)).await;
        server.write_all(b"SAVE/LOAD in progress\r\n>").await.unwrap();
        server
    });

    let started = Instant::now();
    let err = session.save(&target, None, None).await.unwrap_err();
    assert!(matches!(err, ClientError::Busy));
    assert!(started.elapsed() < session.config().timeout);
    assert!(!target.exists());
    peer.await.unwrap();
}
