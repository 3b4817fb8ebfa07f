//! The core NCP connection: packet framing plus a background reader task
//! that demultiplexes inbound fields to registered consumers (spec §4.3).

mod connection;
mod error;
mod field_data;
mod options;
mod reader;
mod recv;
mod state;
mod waiter;

/// Bounded mailbox capacity for both the general `recv()` queue and each
/// `recv_field`/`send_and_recv` waiter (spec §9 "Backpressure").
pub(crate) const GENERAL_QUEUE_CAPACITY: usize = 64;
pub(crate) const WAITER_CAPACITY: usize = 64;

pub use connection::{Connection, ConnectionHandler};
pub use error::{ClientError, ClientErrorKind, ConnectionError, ConnectionErrorExt, ConnectionErrorKind, ConnectionResult};
pub use field_data::FieldData;
pub use options::{ConnectionOptions, ServerOptions};
pub use recv::{RecvField, Response};
pub use state::ConnectionState;

pub use ncp_acceptor::AuthPredicate;
pub use ncp_pdu::{Identifier, ParamValue, Parameter};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::duplex;

    fn ident(s: &str) -> Identifier {
        Identifier::try_from(s).unwrap()
    }

    async fn handshake_pair() -> (Connection<tokio::io::DuplexStream>, Connection<tokio::io::DuplexStream>) {
        let (client_stream, server_stream) = duplex(4096);

        let client_fut = Connection::establish_client(client_stream, "node-a", |nonce| nonce.to_vec(), ConnectionOptions::default());
        let server_fut = Connection::establish_server(server_stream, &|_id: &str, nonce: &[u8], response: &[u8]| nonce == response, ConnectionOptions::default());

        let (client, server) = tokio::join!(client_fut, server_fut);
        (client.expect("client handshake succeeds"), server.expect("server handshake succeeds"))
    }

    #[tokio::test]
    async fn handshake_establishes_ready_connection() {
        let (client, server) = handshake_pair().await;
        client.close().await;
        server.close().await;
    }

    #[tokio::test]
    async fn send_and_recv_round_trips_a_field() {
        let (client, server) = handshake_pair().await;

        let server_task = tokio::spawn(async move {
            let field = server.recv().await.expect("field received");
            assert_eq!(field.field.name, ident("PING"));
            server
                .send_packet(field.packet_type, field.packet_id, vec![FieldData::new(ident("PONG"), vec![])])
                .await
                .expect("reply sent");
        });

        let mut response = client
            .send_and_recv(ident("NCPT"), vec![FieldData::new(ident("PING"), vec![])])
            .await
            .expect("send_and_recv succeeds");
        let reply = response.next().await.expect("reply received");
        assert_eq!(reply.field.name, ident("PONG"));

        server_task.await.expect("server task completes");
    }

    #[tokio::test]
    async fn recv_field_ignores_non_matching_fields() {
        let (client, server) = handshake_pair().await;

        let server_task = tokio::spawn(async move {
            server
                .send(ident("NCPT"), vec![FieldData::new(ident("OTHR"), vec![])])
                .await
                .expect("first send");
            server
                .send(ident("NCPT"), vec![FieldData::new(ident("WANT"), vec![])])
                .await
                .expect("second send");
        });

        let field = tokio::time::timeout(Duration::from_secs(1), client.recv_field(ident("NCPT"), ident("WANT")))
            .await
            .expect("did not time out")
            .expect("field received");
        assert_eq!(field.field.name, ident("WANT"));

        server_task.await.expect("server task completes");
    }
}
