//! End-to-end tests over loopback TCP: a fake SoC talks to the real
//! dispatcher and the real client talks to a fake SoC listener.

use std::net::Ipv6Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use wisun_bragentd::bus::BusBridge;
use wisun_bragentd::msg::{Msg, MsgCode, MAX_FRAME_SIZE};
use wisun_bragentd::server::AgentServer;
use wisun_bragentd::settings::{NetworkSize, Settings};
use wisun_bragentd::topology::{encode_topology_payload, TopologyEntry};
use wisun_bragentd::{Session, SocClient};

fn addr(last: u16) -> Ipv6Addr {
    Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, last)
}

fn topology_frame(entries: &[TopologyEntry]) -> Vec<u8> {
    let payload = encode_topology_payload(entries);
    let mut frame = Vec::new();
    frame.extend_from_slice(&MsgCode::GetTopology.as_u32().to_be_bytes());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    frame
}

async fn send_and_collect(target: std::net::SocketAddr, bytes: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(target).await.unwrap();
    stream.write_all(bytes).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();
    reply
}

#[tokio::test]
async fn topology_push_reaches_routing_graph() {
    let session = Session::new(11501);
    let client = SocClient::new(session.clone());
    let (bridge, notifier) = BusBridge::channel(session.clone(), client);
    let server = AgentServer::start(session.clone(), Some(notifier), 0)
        .await
        .unwrap();
    let target = server.local_addr();

    let entries = vec![
        TopologyEntry {
            target: addr(1),
            preferred: Ipv6Addr::UNSPECIFIED,
            backup: Ipv6Addr::UNSPECIFIED,
        },
        TopologyEntry {
            target: addr(2),
            preferred: addr(1),
            backup: Ipv6Addr::UNSPECIFIED,
        },
    ];
    let frame = topology_frame(&entries);
    assert_eq!(frame.len(), 8 + 96);
    send_and_collect(target, &frame).await;
    // sequential accept loop: this connection is only accepted once the
    // topology push has been fully applied
    send_and_collect(target, &Msg::request(MsgCode::StartBr).encode().unwrap()).await;

    let graph = bridge.routing_graph().await;
    assert_eq!(graph.len(), 2);
    assert_eq!(graph[0].target, addr(1));
    assert_eq!(graph[0].preferred, None);
    assert!(!graph[0].has_preferred);
    assert!(graph[1].has_preferred);
    assert_eq!(graph[1].preferred, Some(addr(1)));

    server.stop().await;
}

#[tokio::test]
async fn config_install_and_query_roundtrip() {
    let session = Session::new(11501);
    let server = AgentServer::start(session.clone(), None, 0).await.unwrap();
    let target = server.local_addr();

    let pushed = Settings {
        network_name: "Field Trial".to_string(),
        network_size: NetworkSize::Medium,
        pan_id: 0xBEEF,
        ..Settings::default()
    };
    send_and_collect(target, &Msg::set_config(&pushed).encode().unwrap()).await;

    // query what the agent now holds
    let reply_bytes = send_and_collect(
        target,
        &Msg::request(MsgCode::GetConfigParams).encode().unwrap(),
    )
    .await;
    let reply = Msg::decode(&reply_bytes).unwrap();
    assert_eq!(reply.code, MsgCode::SetConfigParams);
    assert_eq!(Settings::from_wire(&reply.payload).unwrap(), pushed);

    // the session now targets the pushing peer on the SoC port
    let endpoint = session.endpoint().await;
    assert_eq!(endpoint.ip(), &Ipv6Addr::LOCALHOST);
    assert_eq!(endpoint.port(), 11501);

    server.stop().await;
}

#[tokio::test]
async fn outbound_exchanges_never_overlap() {
    let listener = TcpListener::bind((Ipv6Addr::LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));
    {
        let in_flight = in_flight.clone();
        let max_seen = max_seen.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let in_flight = in_flight.clone();
                let max_seen = max_seen.clone();
                tokio::spawn(async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    let mut buf = vec![0u8; MAX_FRAME_SIZE];
                    let n = stream.read(&mut buf).await.unwrap();
                    assert!(Msg::decode(&buf[..n]).is_ok());
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    // close without replying
                });
            }
        });
    }

    let session = Session::new(port);
    let client = SocClient::new(session);
    let mut tasks = Vec::new();
    for _ in 0..4 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            client
                .send_request(&Msg::request(MsgCode::StartBr))
                .await
                .unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_connection_leaves_listener_healthy() {
    let session = Session::new(11501);
    let server = AgentServer::start(session.clone(), None, 0).await.unwrap();
    let target = server.local_addr();

    // declared payload longer than anything the sender ships
    let mut truncated = Vec::new();
    truncated.extend_from_slice(&MsgCode::GetTopology.as_u32().to_be_bytes());
    truncated.extend_from_slice(&96u32.to_be_bytes());
    truncated.extend_from_slice(&[0u8; 10]);
    send_and_collect(target, &truncated).await;

    // ragged topology payload
    let mut ragged = Vec::new();
    ragged.extend_from_slice(&MsgCode::GetTopology.as_u32().to_be_bytes());
    ragged.extend_from_slice(&49u32.to_be_bytes());
    ragged.extend_from_slice(&[0u8; 49]);
    send_and_collect(target, &ragged).await;
    assert!(session.topology().await.is_empty());

    let reply_bytes = send_and_collect(
        target,
        &Msg::request(MsgCode::GetConfigParams).encode().unwrap(),
    )
    .await;
    assert_eq!(
        Msg::decode(&reply_bytes).unwrap().code,
        MsgCode::SetConfigParams
    );

    server.stop().await;
}
