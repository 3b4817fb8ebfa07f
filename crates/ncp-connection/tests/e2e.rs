//! Connection-level properties and end-to-end scenarios 2-4 from spec §8,
//! exercised over a real duplex byte stream with both handshake sides
//! driven concurrently.

use std::time::Duration;

use ncp_connection::{ConnectionErrorKind, ConnectionOptions, FieldData, Identifier, Parameter};
use tokio::io::duplex;

type DuplexConnection = ncp_connection::Connection<tokio::io::DuplexStream>;

fn ident(s: &str) -> Identifier {
    Identifier::try_from(s).unwrap()
}

async fn handshake_pair(options: ConnectionOptions) -> (DuplexConnection, DuplexConnection) {
    let (client_stream, server_stream) = duplex(8192);

    let client_fut = DuplexConnection::establish_client(client_stream, "node-a", |nonce| nonce.to_vec(), options.clone());
    let server_fut = DuplexConnection::establish_server(
        server_stream,
        &|_id: &str, nonce: &[u8], response: &[u8]| nonce == response,
        options,
    );

    let (client, server) = tokio::join!(client_fut, server_fut);
    (client.expect("client handshake succeeds"), server.expect("server handshake succeeds"))
}

#[tokio::test]
async fn typed_params_round_trip_through_the_wire() {
    let (client, server) = handshake_pair(ConnectionOptions::default()).await;

    let server_task = tokio::spawn(async move {
        let field = server.recv().await.expect("field received");
        assert_eq!(field.field.name, ident("DSPC"));
        assert_eq!(field.field.param("FREQ").unwrap().value, ncp_pdu::ParamValue::U32(2_400_000_000));
        assert_eq!(field.field.param("GAIN").unwrap().value, ncp_pdu::ParamValue::I32(-5));
        assert_eq!(field.field.param("NAME").unwrap().value, ncp_pdu::ParamValue::Str("rx0".to_owned()));
        server.close().await;
    });

    client
        .send(
            ident("CTRL"),
            vec![FieldData::new(
                ident("DSPC"),
                vec![
                    Parameter::new(ident("FREQ"), 2_400_000_000u32),
                    Parameter::new(ident("GAIN"), -5i32),
                    Parameter::new(ident("NAME"), "rx0"),
                ],
            )],
        )
        .await
        .expect("send succeeds");

    server_task.await.expect("server task completes");
    client.close().await;
}

#[tokio::test]
async fn u16_array_round_trips_element_for_element() {
    let (client, server) = handshake_pair(ConnectionOptions::default()).await;

    let server_task = tokio::spawn(async move {
        let field = server.recv().await.expect("field received");
        let value = &field.field.param("DATA").unwrap().value;
        assert_eq!(*value, ncp_pdu::ParamValue::U16Array(vec![1, 2, 3, 4, 5]));
        server.close().await;
    });

    client
        .send(
            ident("CTRL"),
            vec![FieldData::new(ident("ARAY"), vec![Parameter::new(ident("DATA"), vec![1u16, 2, 3, 4, 5])])],
        )
        .await
        .expect("send succeeds");

    server_task.await.expect("server task completes");
    client.close().await;
}

#[tokio::test]
async fn error_field_surfaces_as_command_error() {
    let (client, server) = handshake_pair(ConnectionOptions::default()).await;

    let server_task = tokio::spawn(async move {
        let field = server.recv().await.expect("field received");
        server
            .send_packet(
                field.packet_type,
                field.packet_id,
                vec![FieldData::new(
                    field.field.name,
                    vec![Parameter::new(ident("ERRC"), 42i32), Parameter::new(ident("ERRO"), "bad")],
                )],
            )
            .await
            .expect("reply sent");
        server.close().await;
    });

    let mut response = client
        .send_and_recv(ident("CTRL"), vec![FieldData::new(ident("DSPC"), vec![])])
        .await
        .expect("send_and_recv succeeds");
    let error = response.next().await.expect_err("ERRC field surfaces as a command error automatically");
    match error.kind {
        ConnectionErrorKind::Command { code, detail, .. } => {
            assert_eq!(code, 42);
            assert_eq!(detail.as_deref(), Some("bad"));
        }
        other => panic!("expected Command error, got {other:?}"),
    }

    server_task.await.expect("server task completes");
    client.close().await;
}

#[tokio::test]
async fn send_and_recv_ignores_fields_from_other_packet_ids() {
    let (client, server) = handshake_pair(ConnectionOptions::default()).await;

    let server_task = tokio::spawn(async move {
        let first = server.recv().await.expect("first field received");
        // Replies under an unrelated packet id first; the correlated waiter must not see it.
        server
            .send_packet(first.packet_type, first.packet_id + 1000, vec![FieldData::new(ident("NOPE"), vec![])])
            .await
            .expect("unrelated reply sent");
        server
            .send_packet(first.packet_type, first.packet_id, vec![FieldData::new(ident("OKOK"), vec![])])
            .await
            .expect("correlated reply sent");
        server.close().await;
    });

    let mut response = client
        .send_and_recv(ident("CTRL"), vec![FieldData::new(ident("DSPC"), vec![])])
        .await
        .expect("send_and_recv succeeds");
    let reply = tokio::time::timeout(Duration::from_secs(1), response.next())
        .await
        .expect("did not time out")
        .expect("correlated reply received");
    assert_eq!(reply.field.name, ident("OKOK"));

    server_task.await.expect("server task completes");
    client.close().await;
}

#[tokio::test]
async fn concurrent_sends_produce_contiguous_non_interleaved_frames() {
    let (client, server) = handshake_pair(ConnectionOptions::default()).await;
    let client = std::sync::Arc::new(client);

    let server_task = tokio::spawn(async move {
        let mut names = Vec::new();
        for _ in 0..20 {
            let field = server.recv().await.expect("field received");
            names.push(field.field.name);
        }
        server.close().await;
        names
    });

    let mut senders = Vec::new();
    for i in 0..20 {
        let client = client.clone();
        let name = ident(if i % 2 == 0 { "EVEN" } else { "ODDD" });
        senders.push(tokio::spawn(async move {
            client.send(ident("CTRL"), vec![FieldData::new(name, vec![])]).await.expect("send succeeds");
        }));
    }
    for sender in senders {
        sender.await.expect("sender task completes");
    }

    let names = server_task.await.expect("server task completes");
    assert_eq!(names.len(), 20);
    for name in names {
        assert!(name == ident("EVEN") || name == ident("ODDD"));
    }

    client.close().await;
}

#[tokio::test]
async fn read_timeout_fails_waiters_with_network_timeout() {
    let options = ConnectionOptions {
        read_timeout: Duration::from_millis(50),
        ..ConnectionOptions::default()
    };
    let (client, server) = handshake_pair(options).await;
    // Keep the server side alive but silent so the client's reader sees no bytes at all.
    std::mem::forget(server);

    let error = client.recv().await.expect_err("read_timeout elapses with no inbound bytes");
    match error.kind {
        ConnectionErrorKind::NetworkTimeout => {}
        other => panic!("expected NetworkTimeout, got {other:?}"),
    }

    client.close().await;
}

#[tokio::test]
async fn peer_half_close_drains_buffered_fields_then_closes() {
    let (client, server) = handshake_pair(ConnectionOptions::default()).await;

    server
        .send(ident("CTRL"), vec![FieldData::new(ident("ONE"), vec![])])
        .await
        .expect("first send");
    server
        .send(ident("CTRL"), vec![FieldData::new(ident("TWO"), vec![])])
        .await
        .expect("second send");
    // `close()` alone only changes server-side state; the duplex write half actually
    // closes (and the client observes EOF) once the last `Connection` handle drops.
    server.close().await;
    drop(server);

    let first = client.recv().await.expect("first buffered field");
    assert_eq!(first.field.name, ident("ONE"));
    let second = client.recv().await.expect("second buffered field");
    assert_eq!(second.field.name, ident("TWO"));

    let error = client.recv().await.expect_err("connection closes after buffered fields are drained");
    assert!(matches!(error.kind, ConnectionErrorKind::Closed));

    client.close().await;
}
