// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle specs: termination, the inert abort tag, and tolerance
//! of unknown or malformed inbound traffic.

use crate::prelude::*;

#[tokio::test]
async fn session_end_unblocks_the_session_and_hangs_up() {
    let (handler, mut orchestrator) = Orchestrator::start().await;
    let provider = ScriptedProvider::new();
    let session = spawn_session(&handler, provider);

    orchestrator.handshake().await;
    orchestrator.send_control(MessageType::SessionEnd).await;

    tokio::time::timeout(SPEC_WAIT, session).await.unwrap().unwrap();
    assert!(orchestrator.engine_hung_up().await);

    let err = handler.send_log(TestMessageLevel::Informational, "late").await.unwrap_err();
    assert!(matches!(err, HostError::NotConnected));
}

#[tokio::test]
async fn session_abort_leaves_the_session_running() {
    let (_handler, mut orchestrator) = Orchestrator::start().await;

    orchestrator.send_control(MessageType::SessionAbort).await;

    // The engine is still listening and negotiating
    orchestrator.handshake().await;
}

#[tokio::test]
async fn unknown_message_types_are_skipped() {
    let (_handler, mut orchestrator) = Orchestrator::start().await;

    orchestrator
        .send_control(MessageType::Unknown("TestSession.FutureFeature".to_string()))
        .await;

    orchestrator.handshake().await;
}

#[tokio::test]
async fn malformed_frames_do_not_kill_the_receive_path() {
    let (_handler, mut orchestrator) = Orchestrator::start().await;

    orchestrator.send_raw(b"this is not an envelope").await;

    orchestrator.handshake().await;
}
