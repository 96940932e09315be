//! End-to-end tests over real WebSocket connections.
//!
//! Each test starts a server on an ephemeral port and drives it with
//! tokio-tungstenite clients.

use futures::{SinkExt, StreamExt};
use omok_server::records::MatchRecord;
use omok_server::{create_server_with_config, GameServer, MatchRecorder, ServerConfig, ServerError};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct CollectingRecorder {
    records: Mutex<Vec<MatchRecord>>,
}

#[async_trait::async_trait]
impl MatchRecorder for CollectingRecorder {
    async fn record(&self, record: MatchRecord) -> Result<(), ServerError> {
        self.records.lock().await.push(record);
        Ok(())
    }
}

fn test_config() -> ServerConfig {
    ServerConfig {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        ..ServerConfig::default()
    }
}

async fn start(server: GameServer) -> (Arc<GameServer>, SocketAddr) {
    let server = Arc::new(server);
    let listener = server.bind().expect("bind");
    let addr = listener.local_addr().unwrap();
    let running = server.clone();
    tokio::spawn(async move { running.serve(listener).await });
    (server, addr)
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/omock")).await.expect("connect");
    client
}

async fn send(client: &mut Client, value: Value) {
    client.send(Message::text(value.to_string())).await.expect("send");
}

/// Next JSON message, or `None` once the server has closed the connection.
async fn recv(client: &mut Client) -> Option<Value> {
    loop {
        let frame = timeout(WAIT, client.next()).await.expect("timed out waiting for frame");
        match frame {
            Some(Ok(Message::Text(text))) => return Some(serde_json::from_str(text.as_str()).unwrap()),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

async fn expect(client: &mut Client, kind: &str) -> Value {
    let message = recv(client).await.unwrap_or_else(|| panic!("closed while waiting for {kind}"));
    assert_eq!(message["type"], kind, "unexpected message {message}");
    message["payload"].clone()
}

async fn join(client: &mut Client, room: &str, player: &str) -> Value {
    send(client, json!({"type": "joinGame", "payload": {"roomId": room, "playerId": player}})).await;
    let role = expect(client, "assignRole").await;
    expect(client, "state").await;
    role
}

async fn mv(client: &mut Client, row: i64, col: i64) {
    send(client, json!({"type": "move", "payload": {"row": row, "col": col}})).await;
}

/// Joins two clients to `room` and consumes the game start messages.
async fn pair(addr: SocketAddr, room: &str) -> (Client, Client) {
    let mut black = connect(addr).await;
    let mut white = connect(addr).await;
    assert_eq!(join(&mut black, room, "alice").await["role"], "black");
    assert_eq!(join(&mut white, room, "bob").await["role"], "white");
    for client in [&mut black, &mut white] {
        let start = expect(client, "gameStart").await;
        assert_eq!(start["blackPlayer"], "alice");
        assert_eq!(start["whitePlayer"], "bob");
        assert_eq!(start["currentTurn"], "black");
        expect(client, "state").await;
    }
    (black, white)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_five_in_a_row_over_websocket() {
    let recorder = Arc::new(CollectingRecorder::default());
    let server = create_server_with_config(test_config()).with_recorder(recorder.clone());
    let (server, addr) = start(server).await;
    let (mut black, mut white) = pair(addr, "r1").await;

    let white_moves = [(0, 0), (0, 2), (0, 4), (0, 6)];
    for (i, col) in (7..=10).enumerate() {
        mv(&mut black, 7, col).await;
        for client in [&mut black, &mut white] {
            let payload = expect(client, "move").await;
            assert_eq!(payload["player"], "black");
            assert_eq!(payload["nextTurn"], "white");
        }

        let (row, wcol) = white_moves[i];
        mv(&mut white, row, wcol).await;
        for client in [&mut black, &mut white] {
            let payload = expect(client, "move").await;
            assert_eq!(payload["player"], "white");
            assert_eq!(payload["moveNo"], (i as u64 + 1) * 2);
        }
    }

    mv(&mut black, 7, 11).await;
    for client in [&mut black, &mut white] {
        let payload = expect(client, "move").await;
        assert_eq!(payload["moveNo"], 9);
        let over = expect(client, "gameOver").await;
        assert_eq!(over["winner"], "black");
        assert_eq!(over["reason"], "fiveInARow");
        assert_eq!(over["moveNo"], 9);
    }

    // The recorder task runs independently of the game path.
    let mut recorded = Vec::new();
    for _ in 0..50 {
        recorded = recorder.records.lock().await.clone();
        if !recorded.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].winner_id, "alice");
    assert_eq!(recorded[0].player2_id, "bob");

    server.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_third_join_is_refused_and_closed() {
    let (server, addr) = start(create_server_with_config(test_config())).await;
    let (_black, _white) = pair(addr, "r1").await;

    let mut third = connect(addr).await;
    send(&mut third, json!({"type": "joinGame", "payload": {"roomId": "r1", "playerId": "carol"}})).await;
    let error = expect(&mut third, "error").await;
    assert_eq!(error["code"], 4091);
    assert_eq!(error["message"], "Room is full");
    assert!(recv(&mut third).await.is_none());

    server.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_first_message_must_be_join() {
    let (server, addr) = start(create_server_with_config(test_config())).await;
    let mut client = connect(addr).await;

    send(&mut client, json!({"type": "move", "payload": {"row": 7, "col": 7}})).await;
    let error = expect(&mut client, "error").await;
    assert_eq!(error["code"], 4009);
    assert_eq!(error["message"], "First message must be joinGame");
    assert!(recv(&mut client).await.is_none());
    assert_eq!(server.registry().room_count().await, 0);

    server.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_non_utf8_binary_first_frame_closes() {
    let (server, addr) = start(create_server_with_config(test_config())).await;
    let mut client = connect(addr).await;

    client
        .send(Message::binary(vec![0xff, 0xfe, 0x00]))
        .await
        .expect("send");
    let error = expect(&mut client, "error").await;
    assert_eq!(error["code"], 4009);
    assert!(recv(&mut client).await.is_none());
    assert_eq!(server.registry().room_count().await, 0);

    server.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ping_sync_and_unsupported() {
    let (server, addr) = start(create_server_with_config(test_config())).await;
    let mut client = connect(addr).await;
    join(&mut client, "solo", "alice").await;

    send(&mut client, json!({"type": "Ping"})).await;
    let pong = expect(&mut client, "pong").await;
    assert!(pong["serverTs"].as_str().unwrap().ends_with("+09:00"));

    send(&mut client, json!({"type": "SYNC"})).await;
    let state = expect(&mut client, "state").await;
    assert_eq!(state["roomId"], "solo");
    assert_eq!(state["blackPlayerId"], "alice");
    assert!(state["whitePlayerId"].is_null());
    assert_eq!(state["board"].as_array().unwrap().len(), 15);

    send(&mut client, json!({"type": "chat", "payload": {"text": "hi"}})).await;
    let error = expect(&mut client, "error").await;
    assert_eq!(error["code"], 4999);

    mv(&mut client, 7, 7).await;
    assert_eq!(expect(&mut client, "error").await["code"], 4090);

    // Still open after non-fatal errors.
    send(&mut client, json!({"type": "ping"})).await;
    expect(&mut client, "pong").await;

    server.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_disconnect_frees_role() {
    let (server, addr) = start(create_server_with_config(test_config())).await;
    let (black, mut white) = pair(addr, "r1").await;
    drop(black);

    // Wait for the server to notice the disconnect.
    let registry = server.registry();
    let mut freed = false;
    for _ in 0..100 {
        let room = registry.get("r1").await.expect("room kept while white is seated");
        if room.snapshot().await.black_player_id.is_none() {
            freed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(freed);

    let mut newcomer = connect(addr).await;
    assert_eq!(join(&mut newcomer, "r1", "dave").await["role"], "black");
    let start = expect(&mut white, "gameStart").await;
    assert_eq!(start["blackPlayer"], "dave");

    server.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_closes_seated_clients() {
    let (server, addr) = start(create_server_with_config(test_config())).await;
    let mut client = connect(addr).await;
    join(&mut client, "r1", "alice").await;

    server.shutdown().await.unwrap();
    assert!(recv(&mut client).await.is_none());
    assert_eq!(server.registry().room_count().await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_limit() {
    let config = ServerConfig {
        max_connections: 1,
        ..test_config()
    };
    let (server, addr) = start(create_server_with_config(config)).await;
    let mut first = connect(addr).await;
    join(&mut first, "r1", "alice").await;

    // The second socket is dropped right after accept, so the handshake fails.
    assert!(connect_async(format!("ws://{addr}/")).await.is_err());
    assert_eq!(server.connection_count(), 1);

    server.shutdown().await.unwrap();
}
