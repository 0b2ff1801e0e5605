//! End-to-end tests for the chat controller against a real SQLite store.

mod common;

use common::*;
use screwit_core::{ChatController, MessageClient, ScrewitError, SessionClient};
use screwit_types::{ChatState, MessageRole, SessionStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

const SETTLE: Duration = Duration::from_secs(3);

async fn wait_for_state(rx: &mut watch::Receiver<ChatState>, pred: impl FnMut(&ChatState) -> bool) {
    timeout(SETTLE, rx.wait_for(pred))
        .await
        .expect("state did not settle in time")
        .expect("controller dropped");
}

#[tokio::test]
async fn test_pizza_party_scenario() {
    let store = memory_store();
    let sessions = SessionClient::new(store.clone());
    let messages = MessageClient::new(store.clone());
    let chat = simulated_controller(store, Duration::from_millis(200));
    chat.attach_user(Some(test_user("u1"))).await;

    let session = chat
        .create_new_chat(
            "Pizza party for 50 people with vegetarian options and a live DJ set",
            &capability_options(),
        )
        .await
        .unwrap();
    assert!(session.title.chars().count() <= 50);
    assert!(session.title.ends_with("..."));

    chat.send_message("Book a DJ", &capability_options()).await.unwrap();

    let stored = sessions.require(session.id).await.unwrap();
    assert_eq!(stored.message_count, 1);
    assert_eq!(stored.last_message.as_deref(), Some("Book a DJ"));

    chat.wait_for_pending_replies().await;

    let stored = sessions.require(session.id).await.unwrap();
    assert_eq!(stored.message_count, 2);

    let history = messages.list_for_session(session.id, 100).await.unwrap();
    assert_eq!(history.len(), 2);
    let reply = &history[1];
    assert_eq!(reply.role, MessageRole::Assistant);
    let metadata = reply.metadata.as_ref().unwrap();
    assert_eq!(
        metadata.sources,
        vec!["Amazon API", "Instacart API", "Restaurant Database"]
    );
    let enabled: Vec<_> = metadata.agent_options.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(enabled, vec!["restaurants", "events"]);

    let mut rx = chat.subscribe_state();
    wait_for_state(&mut rx, |s| s.active_messages.len() == 2).await;
    wait_for_state(&mut rx, |s| {
        s.sessions.first().map(|x| x.message_count) == Some(2)
    })
    .await;
}

#[tokio::test]
async fn test_archived_session_hidden_from_list_but_readable() {
    let store = memory_store();
    let sessions = SessionClient::new(store.clone());
    let chat = simulated_controller(store, Duration::from_millis(10));
    chat.attach_user(Some(test_user("u1"))).await;

    let session = chat.create_new_chat("Senior formal", &capability_options()).await.unwrap();
    chat.archive_chat(session.id).await.unwrap();

    assert!(sessions.list_for_user("u1", 50).await.unwrap().is_empty());
    let archived = sessions.get(session.id).await.unwrap().unwrap();
    assert_eq!(archived.status, SessionStatus::Archived);

    let mut rx = chat.subscribe_state();
    wait_for_state(&mut rx, |s| s.sessions.is_empty()).await;
}

#[tokio::test]
async fn test_reply_for_left_session_does_not_leak() {
    let store = memory_store();
    let messages = MessageClient::new(store.clone());
    let chat = simulated_controller(store, Duration::from_millis(150));
    chat.attach_user(Some(test_user("u1"))).await;

    let first = chat.create_new_chat("Tailgate", &capability_options()).await.unwrap();
    chat.send_message("Order burgers", &capability_options()).await.unwrap();

    let second = chat.create_new_chat("Trivia night", &capability_options()).await.unwrap();
    chat.wait_for_pending_replies().await;

    // The reply lands in the session it was requested for.
    assert_eq!(messages.count_for_session(first.id).await.unwrap(), 2);
    assert_eq!(messages.count_for_session(second.id).await.unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let state = chat.state();
    assert_eq!(state.active_session_id, Some(second.id));
    assert!(state.active_messages.is_empty());

    chat.switch_to_chat(first.id).await.unwrap();
    let state = chat.state();
    assert_eq!(state.active_session_id, Some(first.id));
    assert_eq!(state.active_messages.len(), 2);
}

#[tokio::test]
async fn test_new_messages_follow_active_session_after_switch() {
    let store = memory_store();
    let chat = simulated_controller(store, Duration::from_millis(10));
    chat.attach_user(Some(test_user("u1"))).await;

    let first = chat.create_new_chat("Block party", &capability_options()).await.unwrap();
    chat.create_new_chat("Movie night", &capability_options()).await.unwrap();
    chat.switch_to_chat(first.id).await.unwrap();

    chat.send_message("Rent a projector", &capability_options()).await.unwrap();
    chat.wait_for_pending_replies().await;

    let mut rx = chat.subscribe_state();
    wait_for_state(&mut rx, |s| {
        s.active_session_id == Some(first.id) && s.active_messages.len() == 2
    })
    .await;
}

#[tokio::test]
async fn test_store_failure_surfaces_as_error_message() {
    let chat = ChatController::new(
        Arc::new(FailingStore::new()),
        Arc::new(FailingPlanner),
        fast_config(Duration::from_millis(10)),
    );
    chat.attach_user(Some(test_user("u1"))).await;

    let err = chat.create_new_chat("Formal", &capability_options()).await.unwrap_err();
    assert!(matches!(err, ScrewitError::Store(_)));

    let state = chat.state();
    assert_eq!(state.error.as_deref(), Some("Store error: unavailable"));
    assert!(!state.loading);
    assert!(state.sessions.is_empty());
    assert!(state.active_session_id.is_none());
}

#[tokio::test]
async fn test_planner_failure_is_swallowed() {
    let store = memory_store();
    let messages = MessageClient::new(store.clone());
    let chat = ChatController::new(
        store,
        Arc::new(FailingPlanner),
        fast_config(Duration::from_millis(10)),
    );
    chat.attach_user(Some(test_user("u1"))).await;

    let session = chat.create_new_chat("Dance marathon", &capability_options()).await.unwrap();
    chat.send_message("Find a venue", &capability_options()).await.unwrap();
    chat.wait_for_pending_replies().await;

    assert_eq!(messages.count_for_session(session.id).await.unwrap(), 1);
    assert!(chat.state().error.is_none());
}

#[tokio::test]
async fn test_planner_timeout_is_swallowed() {
    let store = memory_store();
    let messages = MessageClient::new(store.clone());
    let config = screwit_core::ChatConfig {
        planner_timeout: Duration::from_millis(50),
        ..fast_config(Duration::from_millis(10))
    };
    let chat = ChatController::new(store, Arc::new(StalledPlanner), config);
    chat.attach_user(Some(test_user("u1"))).await;

    let session = chat.create_new_chat("Ice sculptures", &capability_options()).await.unwrap();
    chat.send_message("Order ice", &capability_options()).await.unwrap();

    timeout(SETTLE, chat.wait_for_pending_replies())
        .await
        .expect("timed-out reply should finish");

    assert_eq!(messages.count_for_session(session.id).await.unwrap(), 1);
    assert!(chat.state().error.is_none());
}
