//! Integration tests against fake A2S servers on loopback.
//!
//! Each fake server is a `tokio::net::UdpSocket` bound to an OS-chosen
//! port, answering requests from a background task and recording every
//! request it receives.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::UdpSocket;

use sourcetrack::{
    info, player, query_all, query_endpoint, Endpoint, ErrorKind, QueryConfig, QueryOutcome,
    ServerInfo,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const CHALLENGE: [u8; 4] = [0x01, 0x02, 0x03, 0x04];

type Requests = Arc<Mutex<Vec<Vec<u8>>>>;

fn info_reply(name: &str, map: &str, players: u8, max_players: u8) -> Vec<u8> {
    let mut raw: Vec<u8> = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x49];
    for field in [name, map, "svencoop", "Sven Co-op"] {
        raw.extend_from_slice(field.as_bytes());
        raw.push(0);
    }
    raw.extend_from_slice(&[0x00, 0x00, players, max_players]);
    raw
}

fn challenge_reply() -> Vec<u8> {
    let mut raw: Vec<u8> = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x41];
    raw.extend_from_slice(&CHALLENGE);
    raw
}

fn player_reply(players: &[(&str, f32)]) -> Vec<u8> {
    let mut raw: Vec<u8> = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x44, players.len() as u8];
    for (index, (name, duration)) in players.iter().enumerate() {
        raw.push(index as u8);
        raw.extend_from_slice(name.as_bytes());
        raw.push(0);
        raw.extend_from_slice(&7i32.to_le_bytes());
        raw.extend_from_slice(&duration.to_le_bytes());
    }
    raw
}

/// Bind a fake server and answer each request with `handler`'s reply, if any.
async fn fake_server<F>(mut handler: F) -> (Endpoint, Requests)
where
    F: FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind fake server");
    let addr: SocketAddr = socket.local_addr().expect("local addr");
    let requests: Requests = Arc::new(Mutex::new(Vec::new()));

    let seen = requests.clone();
    tokio::spawn(async move {
        let mut buf = [0u8; 1400];
        loop {
            let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                return;
            };
            seen.lock().unwrap().push(buf[..len].to_vec());
            if let Some(reply) = handler(&buf[..len]) {
                let _ = socket.send_to(&reply, peer).await;
            }
        }
    });

    (Endpoint::new("127.0.0.1", addr.port()).unwrap(), requests)
}

/// A well-behaved server that challenges player queries once.
async fn challenging_server(name: &'static str, players: Vec<(&'static str, f32)>) -> (Endpoint, Requests) {
    fake_server(move |req| match (req[4], &req[5..]) {
        (0x54, _) => Some(info_reply(name, "svencoop1", players.len() as u8, 12)),
        (0x55, [0xFF, 0xFF, 0xFF, 0xFF]) => Some(challenge_reply()),
        (0x55, c) if c == CHALLENGE => Some(player_reply(&players)),
        _ => None,
    })
    .await
}

/// A bound socket that never reads or replies. Keep it alive for the test.
async fn silent_server() -> (Endpoint, UdpSocket) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind silent server");
    let port = socket.local_addr().unwrap().port();
    (Endpoint::new("127.0.0.1", port).unwrap(), socket)
}

fn short_config() -> QueryConfig {
    QueryConfig {
        timeout: Duration::from_millis(300),
        concurrent: false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn info_query_decodes_known_fields() {
    let (endpoint, requests) =
        fake_server(|_| Some(info_reply("Alpha", "de_dust", 3, 10))).await;

    let info = info::query(&endpoint, Duration::from_secs(2)).await.unwrap();
    assert_eq!(
        info,
        ServerInfo {
            server_name: "Alpha".to_owned(),
            map_name: "de_dust".to_owned(),
            players: 3,
            max_players: 10,
        }
    );

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].len(), 25);
    assert_eq!(&requests[0][..5], &[0xFF, 0xFF, 0xFF, 0xFF, 0x54]);
}

#[tokio::test]
async fn info_query_answers_challenge() {
    let (endpoint, requests) = fake_server(|req| {
        if req.len() == 25 {
            Some(challenge_reply())
        } else {
            Some(info_reply("Beta", "osprey", 1, 8))
        }
    })
    .await;

    let info = info::query(&endpoint, Duration::from_secs(2)).await.unwrap();
    assert_eq!(info.server_name, "Beta");

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(&requests[1][25..], &CHALLENGE);
}

#[tokio::test]
async fn truncated_info_reply_is_malformed() {
    let (endpoint, _requests) = fake_server(|_| {
        let mut raw = info_reply("Alpha", "de_dust", 3, 10);
        raw.pop();
        Some(raw)
    })
    .await;

    let err = info::query(&endpoint, Duration::from_secs(2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}

#[tokio::test]
async fn player_query_sends_challenge_back() {
    let (endpoint, requests) =
        challenging_server("Alpha", vec![("Gordon", 120.0), ("", 5.5)]).await;

    let players = player::query(&endpoint, Duration::from_secs(2)).await.unwrap();
    assert_eq!(players.len(), 2);
    assert_eq!(players[0].name, "Gordon");
    assert_eq!(players[0].duration_secs, 120.0);
    assert_eq!(players[1].name, "");

    let requests = requests.lock().unwrap();
    assert_eq!(
        *requests,
        vec![
            vec![0xFF, 0xFF, 0xFF, 0xFF, 0x55, 0xFF, 0xFF, 0xFF, 0xFF],
            vec![0xFF, 0xFF, 0xFF, 0xFF, 0x55, 0x01, 0x02, 0x03, 0x04],
        ]
    );
}

#[tokio::test]
async fn player_query_empty_server() {
    let (endpoint, requests) = fake_server(|_| Some(player_reply(&[]))).await;

    let players = player::query(&endpoint, Duration::from_secs(2)).await.unwrap();
    assert!(players.is_empty());
    // answered without a challenge round
    assert_eq!(requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn player_query_second_challenge_is_violation() {
    let (endpoint, requests) = fake_server(|_| Some(challenge_reply())).await;

    let err = player::query(&endpoint, Duration::from_secs(2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    assert_eq!(requests.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn silent_server_times_out_without_leaking_sockets() {
    let (endpoint, _socket) = silent_server().await;
    let deadline = Duration::from_millis(50);

    let started = tokio::time::Instant::now();
    let err = info::query(&endpoint, deadline).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(started.elapsed() >= deadline);

    // every timed-out query must have released its socket
    for _ in 0..64 {
        let err = player::query(&endpoint, deadline).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}

#[tokio::test]
async fn closed_port_is_network_error() {
    let port = {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.local_addr().unwrap().port()
    };
    let endpoint = Endpoint::new("127.0.0.1", port).unwrap();

    let err = info::query(&endpoint, Duration::from_secs(2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkError);
}

#[tokio::test]
async fn query_endpoint_reports_info_and_players() {
    let (endpoint, _requests) = challenging_server("Alpha", vec![("Gordon", 1.0)]).await;

    match query_endpoint(&endpoint, &short_config()).await {
        QueryOutcome::Success { info, players } => {
            assert_eq!(info.server_name, "Alpha");
            assert_eq!(info.max_players, 12);
            assert_eq!(players.len(), 1);
        }
        outcome => panic!("expected success, got {:?}", outcome),
    }
}

#[tokio::test]
async fn pass_continues_after_failed_endpoint() {
    let (silent, _socket) = silent_server().await;
    let (good, _requests) = challenging_server("Alpha", vec![]).await;

    let results = query_all(&[silent.clone(), good.clone()], &short_config()).await;
    assert_eq!(results.len(), 2);

    assert_eq!(results[0].0, silent);
    assert_eq!(results[0].1.kind(), Some(ErrorKind::Timeout));

    assert_eq!(results[1].0, good);
    assert!(results[1].1.is_success());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_endpoints_do_not_interfere() {
    let (first, _r1) = challenging_server("First", vec![("one", 1.0)]).await;
    let (second, _r2) = challenging_server("Second", vec![("two", 2.0), ("three", 3.0)]).await;
    let (silent, _socket) = silent_server().await;

    let config = QueryConfig {
        concurrent: true,
        ..short_config()
    };
    let endpoints = vec![first.clone(), silent.clone(), second.clone()];
    let results = query_all(&endpoints, &config).await;

    assert_eq!(
        results.iter().map(|(e, _)| e.clone()).collect::<Vec<_>>(),
        endpoints
    );
    match &results[0].1 {
        QueryOutcome::Success { info, players } => {
            assert_eq!(info.server_name, "First");
            assert_eq!(players.len(), 1);
            assert_eq!(players[0].name, "one");
        }
        outcome => panic!("expected success, got {:?}", outcome),
    }
    assert_eq!(results[1].1.kind(), Some(ErrorKind::Timeout));
    match &results[2].1 {
        QueryOutcome::Success { info, players } => {
            assert_eq!(info.server_name, "Second");
            assert_eq!(players.len(), 2);
        }
        outcome => panic!("expected success, got {:?}", outcome),
    }
}
