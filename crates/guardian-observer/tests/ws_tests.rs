//! Integration tests for the `/ws` telemetry stream.
//!
//! Each test serves the full router on an ephemeral localhost port and
//! connects a real `WebSocket` client.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use guardian_core::hub::BroadcastHub;
use guardian_core::machine::{Machine, UnitIdentity};
use guardian_core::operator::OperatorState;
use guardian_core::physics::{FixedNoise, ThermalModel};
use guardian_core::state::MachineState;
use guardian_observer::server::start_server;
use guardian_observer::state::{AppState, ObserverSettings};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn make_test_state() -> Arc<AppState> {
    let machine = Machine::new(
        MachineState::default(),
        Box::new(ThermalModel),
        Box::new(FixedNoise(0.0)),
        UnitIdentity::default(),
    );
    Arc::new(AppState::new(
        Arc::new(machine),
        Arc::new(BroadcastHub::new()),
        Arc::new(OperatorState::new(1000)),
        ObserverSettings::default(),
    ))
}

/// Serve the router on `127.0.0.1:0` and connect one client to `/ws`.
async fn serve_and_connect(state: &Arc<AppState>) -> Client {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_state = Arc::clone(state);
    tokio::spawn(async move {
        start_server(listener, server_state, std::future::pending()).await
    });

    let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    client
}

/// Poll the hub until it holds `expected` observers or a second passes.
async fn wait_for_observers(hub: &BroadcastHub, expected: usize) {
    for _ in 0..100 {
        if hub.observer_count().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(hub.observer_count().await, expected);
}

/// Read the next text frame as JSON, skipping control frames.
async fn next_json(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn client_receives_snapshots_in_tick_order() {
    let state = make_test_state();
    let mut client = serve_and_connect(&state).await;
    wait_for_observers(&state.hub, 1).await;

    // Inbound text is drained without closing the stream.
    client.send(Message::Text("hello".into())).await.unwrap();

    for _ in 0..3 {
        let snapshot = state.machine.tick().await.unwrap();
        let report = state.hub.broadcast(&snapshot).await;
        assert_eq!(report.delivered, 1);
    }

    for expected in 1..=3_u64 {
        let frame = next_json(&mut client).await;
        assert_eq!(frame["tick"], expected);
        assert_eq!(frame["unit_id"], "HB-001");
        assert_eq!(frame["system_status"], "NORMAL");
    }
    assert_eq!(state.hub.observer_count().await, 1);
}

#[tokio::test]
async fn closing_the_client_unregisters_the_observer() {
    let state = make_test_state();
    let mut client = serve_and_connect(&state).await;
    wait_for_observers(&state.hub, 1).await;

    client.close(None).await.unwrap();
    wait_for_observers(&state.hub, 0).await;

    let snapshot = state.machine.tick().await.unwrap();
    assert_eq!(state.hub.broadcast(&snapshot).await.delivered, 0);
}

#[tokio::test]
async fn each_client_gets_its_own_observer() {
    let state = make_test_state();
    let mut first = serve_and_connect(&state).await;
    let mut second = serve_and_connect(&state).await;
    wait_for_observers(&state.hub, 2).await;

    let snapshot = state.machine.tick().await.unwrap();
    assert_eq!(state.hub.broadcast(&snapshot).await.delivered, 2);
    assert_eq!(next_json(&mut first).await["tick"], 1);
    assert_eq!(next_json(&mut second).await["tick"], 1);

    first.close(None).await.unwrap();
    wait_for_observers(&state.hub, 1).await;
}

#[tokio::test]
async fn ping_is_answered_and_observer_stays_registered() {
    let state = make_test_state();
    let mut client = serve_and_connect(&state).await;
    wait_for_observers(&state.hub, 1).await;

    client.send(Message::Ping(vec![7_u8].into())).await.unwrap();
    let pong = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Some(Ok(Message::Pong(data))) = client.next().await {
                return data;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(pong.as_ref(), &[7_u8]);
    assert_eq!(state.hub.observer_count().await, 1);
}

#[tokio::test]
async fn disconnect_all_ends_the_client_stream() {
    let state = make_test_state();
    let mut client = serve_and_connect(&state).await;
    wait_for_observers(&state.hub, 1).await;

    assert_eq!(state.hub.disconnect_all().await, 1);

    // The server side drops the socket; the client sees a close or the
    // end of the stream.
    let ended = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match client.next().await {
                None | Some(Err(_) | Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok());
}
