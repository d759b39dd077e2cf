//! Integration tests for the TCP transport.
//!
//! These spin up a real listener on loopback and talk to it with a plain
//! `tokio::net::TcpStream` client.

use strife_transport::{Connection, TcpTransport, Transport};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn bind_local() -> (TcpTransport, String) {
    let transport = TcpTransport::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = transport.local_addr().expect("bound address").to_string();
    (transport, addr)
}

#[tokio::test]
async fn test_tcp_accept_and_send_receive() {
    let (mut transport, addr) = bind_local().await;

    let server_handle = tokio::spawn(async move {
        transport.accept().await.expect("should accept")
    });

    let mut client = TcpStream::connect(&addr).await.expect("client connects");
    let server_conn = server_handle.await.expect("task should complete");

    assert!(server_conn.id().into_inner() > 0);
    assert_eq!(
        server_conn.peer_addr(),
        client.local_addr().expect("client address")
    );

    // --- Server sends, client receives ---
    server_conn
        .send(b"hello from server")
        .await
        .expect("send should succeed");
    let mut buf = [0u8; 17];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello from server");

    // --- Client sends, server receives ---
    client.write_all(b"hello from client").await.unwrap();
    let mut received = Vec::new();
    while received.len() < 17 {
        let chunk = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        received.extend(chunk);
    }
    assert_eq!(received, b"hello from client");

    server_conn.close().await.expect("close should succeed");
}

#[tokio::test]
async fn test_tcp_recv_returns_none_on_client_close() {
    let (mut transport, addr) = bind_local().await;

    let server_handle = tokio::spawn(async move {
        transport.accept().await.expect("should accept")
    });

    let client = TcpStream::connect(&addr).await.unwrap();
    let server_conn = server_handle.await.unwrap();

    drop(client);

    let result = server_conn.recv().await.expect("recv should not error");
    assert!(result.is_none(), "should return None on client close");
}

#[tokio::test]
async fn test_tcp_connection_ids_are_unique() {
    let (mut transport, addr) = bind_local().await;

    let server_handle = tokio::spawn(async move {
        let a = transport.accept().await.unwrap();
        let b = transport.accept().await.unwrap();
        (a, b)
    });

    let _c1 = TcpStream::connect(&addr).await.unwrap();
    let _c2 = TcpStream::connect(&addr).await.unwrap();
    let (a, b) = server_handle.await.unwrap();
    assert_ne!(a.id(), b.id());
}
