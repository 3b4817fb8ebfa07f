//! End-to-end handshake scenarios driven over a real duplex byte stream
//! (no in-process shortcuts): scenario 1 "Tiny ping" and scenario 6
//! "Handshake auth failure".

use std::time::Duration;

use ncp_connection::{ClientErrorKind, Connection, ConnectionOptions, FieldData, Identifier};
use tokio::io::duplex;

fn ident(s: &str) -> Identifier {
    Identifier::try_from(s).unwrap()
}

#[tokio::test]
async fn tiny_ping_round_trips_end_to_end() {
    let (client_stream, server_stream) = duplex(4096);

    let client_fut = Connection::establish_client(client_stream, "node-a", |nonce| nonce.to_vec(), ConnectionOptions::default());
    let server_fut = Connection::establish_server(
        server_stream,
        &|_id: &str, nonce: &[u8], response: &[u8]| nonce == response,
        ConnectionOptions::default(),
    );

    let (client, server) = tokio::join!(client_fut, server_fut);
    let client = client.expect("client handshake succeeds");
    let server = server.expect("server handshake succeeds");

    let server_task = tokio::spawn(async move {
        let field = server.recv().await.expect("server receives PING");
        assert_eq!(field.field.name, ident("PING"));
        server
            .send_packet(field.packet_type, field.packet_id, vec![FieldData::new(ident("PONG"), vec![])])
            .await
            .expect("server replies");
        server.close().await;
    });

    let mut response = client
        .send_and_recv(ident("NCPT"), vec![FieldData::new(ident("PING"), vec![])])
        .await
        .expect("client sends PING");
    let reply = response.next().await.expect("client receives PONG");
    assert_eq!(reply.field.name, ident("PONG"));

    client.close().await;
    server_task.await.expect("server task completes");
}

#[tokio::test]
async fn handshake_auth_failure_rejects_the_client() {
    let (client_stream, server_stream) = duplex(4096);

    let client_fut = Connection::establish_client(client_stream, "node-a", |nonce| nonce.to_vec(), ConnectionOptions::default());
    // Rejects every response, matching a nonce the client never sends back unmodified.
    let server_fut = Connection::establish_server(server_stream, &|_id: &str, _nonce: &[u8], _response: &[u8]| false, ConnectionOptions::default());

    let (client_result, server_result) = tokio::join!(client_fut, server_fut);

    let client_error = client_result.expect_err("client handshake is rejected");
    match client_error.kind {
        ClientErrorKind::Authentication { code, .. } => assert_eq!(code, Some(1)),
        other => panic!("expected Authentication error, got {other:?}"),
    }

    server_result.expect_err("server handshake reports the rejection too");
}

#[tokio::test]
async fn handshake_never_completes_without_a_peer() {
    let (client_stream, _server_stream) = duplex(4096);

    // Nobody drives the server side, so the client's `LINK HELO` read never completes
    // and `establish_client` must not resolve to a spurious `Ready` connection.
    let result = tokio::time::timeout(
        Duration::from_millis(200),
        Connection::establish_client(client_stream, "node-a", |nonce| nonce.to_vec(), ConnectionOptions::default()),
    )
    .await;

    assert!(result.is_err(), "establish_client resolved without a peer driving the handshake");
}
