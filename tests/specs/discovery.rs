// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery flow specs: queueing before the provider arrives, progress
//! batches, and the completion payload.

use crate::prelude::*;

#[tokio::test]
async fn requests_sent_before_the_provider_run_exactly_once_after_it_arrives() {
    let (handler, mut orchestrator) = Orchestrator::start().await;
    let provider = ScriptedProvider::new();

    orchestrator.handshake().await;
    orchestrator
        .send(MessageType::DiscoveryInitialize, &vec!["adapter.dll".to_string()])
        .await;
    orchestrator
        .send(
            MessageType::StartDiscovery,
            &DiscoveryCriteria {
                sources: vec!["a.dll".to_string()],
                ..DiscoveryCriteria::default()
            },
        )
        .await;

    // Nothing may reach a provider that has not been supplied yet
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(provider.calls().is_empty());

    spawn_session(&handler, Arc::clone(&provider) as Arc<dyn OperationProvider>);

    let found = orchestrator.recv().await;
    assert_eq!(found.message_type, MessageType::TestCasesFound);
    let complete = orchestrator.recv().await;
    assert_eq!(complete.message_type, MessageType::DiscoveryComplete);

    assert_eq!(provider.calls(), [Call::DiscoveryInitialize, Call::DiscoverTests]);
}

#[tokio::test]
async fn discovered_batches_and_completion_reach_the_orchestrator() {
    let (handler, mut orchestrator) = Orchestrator::start().await;
    let provider = ScriptedProvider::new();
    spawn_session(&handler, provider);

    orchestrator.handshake().await;
    orchestrator
        .send(
            MessageType::StartDiscovery,
            &DiscoveryCriteria {
                sources: vec!["a.dll".to_string(), "b.dll".to_string()],
                ..DiscoveryCriteria::default()
            },
        )
        .await;

    let found = orchestrator.recv().await;
    let cases = deserialize_payload::<Vec<TestCase>>(&found).unwrap();
    assert_eq!(cases, [test_case("a.dll"), test_case("b.dll")]);

    let complete = orchestrator.recv().await;
    let payload = deserialize_payload::<DiscoveryCompletePayload>(&complete).unwrap();
    assert_eq!(payload.total_tests, 2);
    assert!(!payload.is_aborted);
    assert_eq!(payload.last_discovered_tests, Some(Vec::new()));
}

#[tokio::test]
async fn queued_operations_run_in_arrival_order() {
    let (handler, mut orchestrator) = Orchestrator::start().await;
    let provider = ScriptedProvider::new();
    spawn_session(&handler, Arc::clone(&provider) as Arc<dyn OperationProvider>);

    orchestrator.handshake().await;
    orchestrator
        .send(MessageType::ExecutionInitialize, &Vec::<String>::new())
        .await;
    orchestrator
        .send(
            MessageType::StartDiscovery,
            &DiscoveryCriteria {
                sources: vec!["a.dll".to_string()],
                ..DiscoveryCriteria::default()
            },
        )
        .await;

    let complete = orchestrator.recv().await; // TestCasesFound
    assert_eq!(complete.message_type, MessageType::TestCasesFound);
    assert_eq!(provider.calls(), [Call::ExecutionInitialize, Call::DiscoverTests]);
}
