//! Integration tests for the registration handshake
//!
//! These tests drive a socket over the scripted mock transport.

#[macro_use]
mod common;

use common::*;
use futures::StreamExt;
use resocket::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_register_is_sent_with_configured_token() {
    let transport = MockTransport::new();
    let socket = mock_socket(transport.clone());
    let mut events = socket.connection();

    next_matching(&mut events, ApplicationEvent::is_connected).await;
    let connection = transport.next_connection().await;
    let sent = connection.wait_sent(1).await;
    verbose_println!("sent: {:?}", sent);

    assert_eq!(sent, vec![r#"{"type":"register","auth_token":"asdf"}"#.to_string()]);
    assert!(!socket.session().is_registered());
}

#[tokio::test(start_paused = true)]
async fn test_registered_sets_session_to_that_sender() {
    let transport = MockTransport::with_responder(Responder::RegisterOnly);
    let socket = mock_socket(transport.clone());
    let mut events = socket.connection();

    let connected = next_matching(&mut events, ApplicationEvent::is_connected).await;
    next_matching(&mut events, |e| e.message() == Some(&Message::Registered)).await;

    let registered = tokio::time::timeout(Duration::from_secs(1), socket.session().wait_connected())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(Some(&registered), connected.sender());
    assert_eq!(socket.current_sender(), Some(registered));
}

#[tokio::test(start_paused = true)]
async fn test_no_handshake_timeout() {
    let transport = MockTransport::new();
    let socket = mock_socket(transport.clone());
    let _events = socket.connection();

    let connection = transport.next_connection().await;
    connection.wait_sent(1).await;
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert!(!socket.session().is_registered());
    assert_eq!(transport.opens(), 1, "unanswered register must not reconnect");
    assert_eq!(socket.connection_state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_resets_session() {
    let transport = MockTransport::with_responder(Responder::RegisterOnly);
    let socket = mock_socket(transport.clone());
    let mut events = socket.connection();

    socket.session().wait_connected().await.unwrap();
    let mut watch = socket.session().watch();

    let connection = transport.next_connection().await;
    connection.remote_close(1000, "bye");
    next_matching(&mut events, ApplicationEvent::is_disconnected).await;

    watch.wait_for(|state| state.is_none()).await.unwrap();
    assert!(socket.current_sender().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stale_sender_fails_after_disconnect() {
    let transport = MockTransport::new();
    let socket = mock_socket(transport.clone());
    let mut events = socket.connection();

    let connected = next_matching(&mut events, ApplicationEvent::is_connected).await;
    let sender = connected.sender().cloned().unwrap();
    assert!(sender.is_alive());

    transport.next_connection().await.remote_close(1000, "bye");
    next_matching(&mut events, ApplicationEvent::is_disconnected).await;

    assert!(!sender.is_alive());
    assert_eq!(
        sender.send(&Message::ping("late")),
        Err(SocketError::StaleSender {
            connection_id: sender.connection_id()
        })
    );

    // The next connection hands out a fresh sender
    let reconnected = next_matching(&mut events, ApplicationEvent::is_connected).await;
    let fresh = reconnected.sender().cloned().unwrap();
    assert_ne!(fresh, sender);
    assert!(fresh.send(&Message::ping("hi")).is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_resets_session() {
    let transport = MockTransport::with_responder(Responder::RegisterOnly);
    let socket = mock_socket(transport.clone());
    let events = socket.connection();

    let sender = socket.session().wait_connected().await.unwrap();
    let mut watch = socket.session().watch();

    drop(events);

    watch.wait_for(|state| state.is_none()).await.unwrap();
    assert!(!sender.is_alive());
    transport.wait_streams_dropped(1).await;
}

#[tokio::test(start_paused = true)]
async fn test_register_failure_is_swallowed() {
    let transport = MockTransport::manual();
    let socket = mock_socket(transport.clone());
    let mut events = socket.connection();

    let connection = transport.next_connection().await;
    connection.handle.close();
    connection.connect();
    next_matching(&mut events, ApplicationEvent::is_connected).await;

    // The connection keeps delivering events after the failed register
    connection.push_registered();
    next_matching(&mut events, |e| e.message() == Some(&Message::Registered)).await;
    assert!(connection.sent_texts().is_empty());
    assert_eq!(transport.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connected_and_registered_stream() {
    let transport = MockTransport::with_responder(Responder::RegisterOnly);
    let socket = mock_socket(transport.clone());

    let mut states = socket.connected_and_registered();
    assert_eq!(states.next().await, Some(None));

    let registered = states.next().await.unwrap();
    assert!(registered.is_some(), "holding the stream opens the connection");
    assert_eq!(transport.opens(), 1);

    transport.next_connection().await.remote_close(1001, "going away");
    assert_eq!(states.next().await, Some(None));
}
