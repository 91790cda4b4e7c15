//! Integration tests for the viewer connection against an in-process
//! WebSocket peer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use screencast_core::{decode, encode, ConnectionState, Decoded, Envelope};
use screencast_viewer::application::{EnvelopeSink, SendOutcome};
use screencast_viewer::infrastructure::Connection;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

const WAIT: Duration = Duration::from_secs(5);

/// Accepts one WebSocket connection and hands it to `peer`.  Returns the URL.
async fn spawn_peer<F, Fut>(peer: F) -> String
where
    F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        peer(ws).await;
    });
    format!("ws://{addr}")
}

fn text(envelope: &Envelope) -> Message {
    Message::Text(encode(envelope).unwrap())
}

/// Reads until the viewer closes, answering its close handshake.
async fn drain(ws: &mut WebSocketStream<TcpStream>) {
    while let Some(Ok(_)) = ws.next().await {}
}

async fn wait_for_state(conn: &Connection, state: ConnectionState) {
    let mut status = conn.watch_status();
    timeout(WAIT, status.wait_for(|s| s.state == state))
        .await
        .expect("timed out waiting for state")
        .expect("status sender dropped");
}

#[tokio::test]
async fn test_handshake_reaches_open() {
    let endpoint = spawn_peer(|mut ws| async move { drain(&mut ws).await }).await;
    let conn = Connection::new(None);

    let _inbound = conn.connect(&endpoint).unwrap();

    wait_for_state(&conn, ConnectionState::Open).await;
}

#[tokio::test]
async fn test_bad_frames_are_dropped_and_connection_survives() {
    // Arrange: malformed JSON, an unknown kind, a binary frame, then a real message
    let endpoint = spawn_peer(|mut ws| async move {
        ws.send(Message::Text("{not json".to_string())).await.unwrap();
        ws.send(Message::Text(r#"{"type":"unknown_future_type","data":"x"}"#.to_string()))
            .await
            .unwrap();
        ws.send(Message::Text(r#"{"type":"file","fileName":"a"}"#.to_string()))
            .await
            .unwrap();
        ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
        ws.send(text(&Envelope::chat("still here"))).await.unwrap();
        drain(&mut ws).await;
    })
    .await;
    let conn = Connection::new(None);

    // Act
    let mut inbound = conn.connect(&endpoint).unwrap();
    let first = timeout(WAIT, inbound.recv()).await.unwrap();

    // Assert: only the valid envelope comes through, and the link is still open
    assert_eq!(first, Some(Envelope::chat("still here")));
    assert_eq!(conn.state(), ConnectionState::Open);
    conn.close();
}

#[tokio::test]
async fn test_sends_arrive_in_order() {
    // Arrange: the peer reports every decoded envelope
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let endpoint = spawn_peer(move |mut ws| async move {
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(raw) = msg {
                if let Ok(Decoded::Envelope(envelope)) = decode(&raw) {
                    let _ = seen_tx.send(envelope);
                }
            }
        }
    })
    .await;
    let conn = Connection::new(None);
    let _inbound = conn.connect(&endpoint).unwrap();
    wait_for_state(&conn, ConnectionState::Open).await;

    // Act
    let sent = [
        Envelope::chat("one"),
        Envelope::frame_request(7),
        Envelope::file("b.bin", b"\x00\x01"),
        Envelope::chat("two"),
    ];
    for envelope in &sent {
        assert_eq!(conn.send(envelope), SendOutcome::Sent);
    }

    // Assert
    for expected in sent {
        let got = timeout(WAIT, seen_rx.recv()).await.unwrap().unwrap();
        assert_eq!(got, expected);
    }
    conn.close();
}

#[tokio::test]
async fn test_remote_close_moves_open_to_closed() {
    // Arrange: the peer closes as soon as the handshake is done
    let endpoint = spawn_peer(|mut ws| async move {
        ws.close(None).await.unwrap();
        drain(&mut ws).await;
    })
    .await;
    let conn = Connection::new(None);

    // Act
    let mut inbound = conn.connect(&endpoint).unwrap();
    let end = timeout(WAIT, inbound.recv()).await.unwrap();

    // Assert
    assert!(end.is_none());
    wait_for_state(&conn, ConnectionState::Closed).await;
    assert!(conn.status().detail.is_none());
    assert!(matches!(
        conn.send(&Envelope::chat("late")),
        SendOutcome::Suppressed { .. }
    ));
}

#[tokio::test]
async fn test_dropped_socket_is_reported_as_an_error() {
    // Arrange: the peer vanishes without a close handshake
    let endpoint = spawn_peer(|ws| async move { drop(ws) }).await;
    let conn = Connection::new(None);

    // Act
    let mut inbound = conn.connect(&endpoint).unwrap();
    let end = timeout(WAIT, inbound.recv()).await.unwrap();

    // Assert
    assert!(end.is_none());
    wait_for_state(&conn, ConnectionState::Closed).await;
    assert!(conn.status().detail.is_some());
}

#[tokio::test]
async fn test_close_stops_delivery_and_completes_handshake() {
    // Arrange: the peer keeps chatting until the viewer closes
    let endpoint = spawn_peer(|mut ws| async move {
        for i in 0..50 {
            if ws.send(text(&Envelope::chat(format!("msg {i}")))).await.is_err() {
                return;
            }
        }
        drain(&mut ws).await;
    })
    .await;
    let conn: Arc<Connection> = Connection::new(None);
    let mut inbound = conn.connect(&endpoint).unwrap();
    assert!(timeout(WAIT, inbound.recv()).await.unwrap().is_some());

    // Act
    conn.close();

    // Assert
    assert_eq!(inbound.recv().await, None);
    timeout(WAIT, conn.wait_until_closed()).await.unwrap();
    assert!(conn.status().detail.is_none());
}

#[tokio::test]
async fn test_reconnect_after_close() {
    let first = spawn_peer(|mut ws| async move { drain(&mut ws).await }).await;
    let second = spawn_peer(|mut ws| async move {
        ws.send(text(&Envelope::chat("second peer"))).await.unwrap();
        drain(&mut ws).await;
    })
    .await;
    let conn = Connection::new(None);

    let _inbound = conn.connect(&first).unwrap();
    wait_for_state(&conn, ConnectionState::Open).await;
    conn.close();
    timeout(WAIT, conn.wait_until_closed()).await.unwrap();

    let mut inbound = conn.connect(&second).unwrap();
    let got = timeout(WAIT, inbound.recv()).await.unwrap();

    assert_eq!(got, Some(Envelope::chat("second peer")));
    conn.close();
}

#[tokio::test]
async fn test_close_completes_while_inbound_queue_is_full() {
    // Arrange: more chats than the inbound queue holds, none of them read
    let endpoint = spawn_peer(|mut ws| async move {
        for i in 0..200 {
            ws.send(text(&Envelope::chat(format!("msg {i}")))).await.unwrap();
        }
        drain(&mut ws).await;
    })
    .await;
    let conn = Connection::new(None);
    let mut inbound = conn.connect(&endpoint).unwrap();
    let first = timeout(WAIT, inbound.recv()).await.unwrap();
    assert_eq!(first, Some(Envelope::chat("msg 0")));
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Act
    conn.close();

    // Assert: nothing more is delivered and the handshake still finishes
    assert!(inbound.recv().await.is_none());
    timeout(WAIT, conn.wait_until_closed())
        .await
        .expect("close did not reach Closed");
    assert!(conn.status().detail.is_none());
}
